// Mock byte source helper

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use super::ByteSource;

/**
 * MockSource produces `size` bytes of a repeating pattern, at most `chunk_size` bytes per read, optionally
 * sleeping before each read to imitate a slow network or disk. The byte at offset `n` is always
 * `pattern[n % pattern.len()]`, so tests can check any range with `expected`.
 */
pub struct MockSource {
    pattern: Vec<u8>,
    size: u64,
    pos: u64,
    pub chunk_size: usize,
    delay: Option<Duration>,
    seekable: bool,
    repositions: Arc<AtomicUsize>,
}

impl fmt::Debug for MockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSource")
         .field("pattern_len", &self.pattern.len())
         .field("bytes", &self.size)
         .field("pos", &self.pos)
         .finish()
    }
}

impl MockSource {
    pub fn new(pattern: &[u8], size: u64, chunk_size: usize) -> Self {
        assert!(!pattern.is_empty(), "MockSource pattern must not be empty");
        assert!(chunk_size > 0, "MockSource chunk_size must be > 0");
        Self {
            pattern: pattern.to_vec(),
            size,
            pos: 0,
            chunk_size,
            delay: None,
            seekable: true,
            repositions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose bytes are their own offsets, mod 251.
    pub fn counting(size: u64, chunk_size: usize) -> Self {
        let pattern: Vec<u8> = (0..251u8).collect();
        Self::new(&pattern, size, chunk_size)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    /// Counts successful `reposition` calls, readable after the source has moved to another thread.
    pub fn reposition_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.repositions)
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The bytes this source produces at offsets `start..end`.
    pub fn expected(&self, start: u64, end: u64) -> Vec<u8> {
        let n = self.pattern.len() as u64;
        (start..end.min(self.size))
            .map(|ofs| self.pattern[(ofs % n) as usize])
            .collect()
    }
}

impl Read for MockSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let remain = self.size.saturating_sub(self.pos);
        let len = (buf.len() as u64).min(remain).min(self.chunk_size as u64) as usize;
        let n = self.pattern.len() as u64;
        for (i, byte) in buf[..len].iter_mut().enumerate() {
            *byte = self.pattern[((self.pos + i as u64) % n) as usize];
        }
        self.pos += len as u64;
        Ok(len)
    }
}

impl ByteSource for MockSource {
    fn reposition(&mut self, pos: u64) -> io::Result<u64> {
        if !self.seekable {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "MockSource is unseekable"));
        }
        self.pos = pos.min(self.size);
        self.repositions.fetch_add(1, Ordering::SeqCst);
        Ok(self.pos)
    }
}
