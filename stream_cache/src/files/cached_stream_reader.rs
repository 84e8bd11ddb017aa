use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::cache::{CacheConfig, CacheStrategy, MemCache, ReadStatus};
use crate::error::CacheError;
use crate::files::ByteSource;

/**
 * CachedStreamReader turns a slow sequential ByteSource into a Read + Seek stream with bounded memory.
 *
 * A filler thread pulls chunks from the source and writes them into a shared cache, ahead of the reader. When the
 * cache is full the filler parks on "space available" instead of reading more, so a runaway source can never use
 * more than the cache's fixed buffers.
 *
 * Seeks that land inside the cached window (recent history, or data already fetched but not read) are served from
 * memory. Anything else is sent to the filler, which repositions the real source and resets the cache there. Sources
 * that can't reposition (pipes, stdin, decoders) fail those seeks with ErrorKind::Unsupported.
 *
 * Reads block until data arrives or the source ends. Use try_read() for the non-blocking variant.
 */

// Filler read size
const READ_CHUNK: usize = 64 * 1024;

// Longest single sleep of any wait here. Waits are re-checked after each one.
const POLL: Duration = Duration::from_millis(50);

enum Command {
    Reposition(u64),
    Stop,
}

pub struct CachedStreamReader {
    cache: Arc<dyn CacheStrategy>,
    control: Sender<Command>,
    replies: Receiver<io::Result<u64>>,
    filler: Option<JoinHandle<()>>,
}

impl CachedStreamReader {
    pub fn new<S: ByteSource + 'static>(source: S, config: CacheConfig) -> Self {
        Self::with_cache(source, Arc::new(MemCache::new(config)), READ_CHUNK)
    }

    pub fn with_cache<S: ByteSource + 'static>(
        source: S,
        cache: Arc<dyn CacheStrategy>,
        chunk_size: usize,
    ) -> Self {
        assert!(chunk_size > 0, "chunk_size must be > 0");
        // Replies are bounded so a reader that stops listening can't pile them up
        let (control, commands) = crossbeam_channel::unbounded();
        let (reply_tx, replies) = crossbeam_channel::bounded(1);

        // A reopened stream starts from scratch at offset 0
        if let Err(err) = cache.open() {
            log::warn!("cache open failed: {err}");
        }

        let filler_cache = Arc::clone(&cache);
        let filler = thread::spawn(move || {
            Filler::new(Box::new(source), filler_cache, commands, reply_tx, chunk_size).run()
        });

        Self {
            cache,
            control,
            replies,
            filler: Some(filler),
        }
    }

    /// Source offset of the next byte read() returns.
    pub fn position(&self) -> u64 {
        self.cache.position()
    }

    /// True once the source is exhausted and every fetched byte has been read.
    pub fn is_eof(&self) -> bool {
        self.cache.is_end_of_input() && self.cache.available() == 0
    }

    /// Wait until at least `min_bytes` are ready, the source ends, or `timeout` passes. Returns the bytes ready.
    pub fn wait(&self, min_bytes: usize, timeout: Duration) -> usize {
        self.cache.wait_for_data(min_bytes, timeout)
    }

    /// Non-blocking read. `WouldBlock` means the filler hasn't caught up yet.
    pub fn try_read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        Ok(self.cache.read(buf)?)
    }

    fn filler_stopped(&self) -> bool {
        self.filler.as_ref().is_none_or(|h| h.is_finished())
    }

    // Ask the filler to move the real source
    fn reposition(&mut self, target: u64, miss: CacheError) -> io::Result<u64> {
        log::debug!("repositioning source to {target}: {miss}");
        if self.control.send(Command::Reposition(target)).is_err() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cache filler has stopped"));
        }
        match self.replies.recv() {
            Ok(Ok(pos)) => Ok(pos),
            // Report the window miss; the source just can't help with it
            Ok(Err(err)) if err.kind() == io::ErrorKind::Unsupported => Err(miss.into()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(io::Error::new(io::ErrorKind::BrokenPipe, "cache filler has stopped")),
        }
    }
}

impl Drop for CachedStreamReader {
    fn drop(&mut self) {
        // The filler may be parked in a blocking source read (stdin); it exits on its next turn
        let _ = self.control.send(Command::Stop);
        if let Some(handle) = self.filler.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
        let _ = self.cache.close();
    }
}

impl Read for CachedStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.cache.read(buf)? {
                ReadStatus::Data(n) => return Ok(n),
                ReadStatus::EndOfStream => return Ok(0),
                ReadStatus::WouldBlock => {
                    if self.filler_stopped() {
                        return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cache filler has stopped"));
                    }
                    self.cache.wait_for_data(1, POLL);
                }
            }
        }
    }
}

impl Seek for CachedStreamReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let current = self.cache.position();
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(n) => current.checked_add_signed(n).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "invalid seek to a negative or overflowing position")
            })?,
            // We can't know where a stream ends until it does
            SeekFrom::End(_) => {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "stream length is unknown"));
            }
        };

        if target == current {
            return Ok(current);
        }

        match self.cache.seek(SeekFrom::Start(target)) {
            Ok(pos) => Ok(pos),
            Err(miss @ CacheError::OutOfWindow { .. }) => self.reposition(target, miss),
            Err(err) => Err(err.into()),
        }
    }
}

// Runs on the filler thread: source -> cache
struct Filler {
    source: Box<dyn ByteSource>,
    cache: Arc<dyn CacheStrategy>,
    commands: Receiver<Command>,
    replies: Sender<io::Result<u64>>,
    chunk: Vec<u8>,
    // chunk[pending..filled] is read from the source but not yet accepted by the cache
    pending: usize,
    filled: usize,
    at_end: bool,
}

impl Filler {
    fn new(
        source: Box<dyn ByteSource>,
        cache: Arc<dyn CacheStrategy>,
        commands: Receiver<Command>,
        replies: Sender<io::Result<u64>>,
        chunk_size: usize,
    ) -> Self {
        Self {
            source,
            cache,
            commands,
            replies,
            chunk: vec![0u8; chunk_size],
            pending: 0,
            filled: 0,
            at_end: false,
        }
    }

    // Next control request, if any. Blocks briefly once there is nothing left to fetch. None on disconnect.
    fn next_command(&self) -> Option<Option<Command>> {
        if self.at_end {
            match self.commands.recv_timeout(POLL) {
                Ok(cmd) => Some(Some(cmd)),
                Err(RecvTimeoutError::Timeout) => Some(None),
                Err(RecvTimeoutError::Disconnected) => None,
            }
        } else {
            match self.commands.try_recv() {
                Ok(cmd) => Some(Some(cmd)),
                Err(TryRecvError::Empty) => Some(None),
                Err(TryRecvError::Disconnected) => None,
            }
        }
    }

    fn run(mut self) {
        log::trace!("filler started");
        while let Some(command) = self.next_command() {
            match command {
                Some(Command::Stop) => break,
                Some(Command::Reposition(pos)) => {
                    if !self.reposition(pos) {
                        break;
                    }
                }
                None if self.at_end => {}
                None if self.pending < self.filled => self.push(),
                None => self.fetch(),
            }
        }
        log::trace!("filler exiting");
    }

    fn reposition(&mut self, pos: u64) -> bool {
        let result = self.source.reposition(pos);
        match &result {
            Ok(pos) => {
                // Whatever we were holding belongs to the old position
                self.pending = 0;
                self.filled = 0;
                self.cache.reset(*pos);
                self.at_end = false;
            }
            // The source stays where it was, so keep streaming from there
            Err(err) => log::debug!("source reposition to {pos} failed: {err}"),
        }
        self.replies.send(result).is_ok()
    }

    fn push(&mut self) {
        match self.cache.write(&self.chunk[self.pending..self.filled]) {
            Ok(0) => {
                self.cache.wait_for_space(POLL);
            }
            Ok(n) => self.pending += n,
            Err(err) => {
                log::error!("cache rejected source data: {err}");
                self.finish();
            }
        }
    }

    fn fetch(&mut self) {
        match self.source.read(&mut self.chunk) {
            Ok(0) => {
                log::trace!("source exhausted");
                self.finish();
            }
            Ok(n) => {
                self.pending = 0;
                self.filled = n;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                log::warn!("source read failed: {err}");
                self.finish();
            }
        }
    }

    fn finish(&mut self) {
        self.at_end = true;
        self.pending = 0;
        self.filled = 0;
        self.cache.set_end_of_input();
    }
}
