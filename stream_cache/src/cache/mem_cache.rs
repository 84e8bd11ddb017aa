use std::io::SeekFrom;
use std::mem;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::timeout::Timeout;
use crate::cache::{CacheConfig, CacheStrategy, ReadStatus, RingBuffer, Window};
use crate::error::{CacheError, Result};

/**
 * MemCache keeps a bounded window of a sequential source in memory so a reader can seek around recently
 * fetched data without making the source reposition.
 *
 * The window is made of three ring buffers of equal capacity, laid out by source offset:
 *
 * ```text
 *      [ history ][ active ][ overflow ]
 *                 ^cursor
 * ```
 *
 * `history` holds bytes already delivered to the reader, newest last. `active` holds fetched bytes not yet
 * delivered. `overflow` holds bytes that were in `active` when a backward seek pushed older bytes in front of
 * them and there was no room left; they are promoted back into `active` by `read` once they fit. New source
 * bytes are refused while `overflow` holds anything, since they belong after it.
 *
 * The three together always cover one contiguous range of the source with no gaps or repeats, and every
 * reshuffle is a move between buffers. A fourth, always-empty `scratch` buffer gives the backward seek
 * somewhere to stage bytes.
 */
pub struct MemCache {
    config: CacheConfig,
    state: Mutex<State>,
    // Raised by write
    data_available: Condvar,
    // Raised by read and seek
    space_available: Condvar,
}

struct State {
    active: RingBuffer,
    history: RingBuffer,
    overflow: RingBuffer,
    scratch: RingBuffer,
    cursor: u64,
    end_of_input: bool,
}

impl std::fmt::Debug for MemCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemCache")
         .field("config", &self.config)
         .field("window", &self.window())
         .finish()
    }
}

impl State {
    fn new(capacity: usize) -> Self {
        Self {
            active: RingBuffer::new(capacity),
            history: RingBuffer::new(capacity),
            overflow: RingBuffer::new(capacity),
            scratch: RingBuffer::new(capacity),
            cursor: 0,
            end_of_input: false,
        }
    }

    fn clear(&mut self, cursor: u64) {
        self.active.clear();
        self.history.clear();
        self.overflow.clear();
        self.scratch.clear();
        self.cursor = cursor;
    }

    // Source offset just past the last cached byte. Never overflows, see `writable`.
    fn end(&self) -> u64 {
        self.cursor + (self.active.readable() + self.overflow.readable()) as u64
    }

    fn window(&self) -> Window {
        let history = self.history.readable();
        let active = self.active.readable();
        let overflow = self.overflow.readable();
        Window {
            start: self.cursor - history as u64,
            cursor: self.cursor,
            end: self.end(),
            history,
            active,
            overflow,
        }
    }

    // Evict just enough of the oldest history to fit `n` more bytes
    fn make_history_room(&mut self, n: usize) -> Result<()> {
        let deficit = n.saturating_sub(self.history.writable());
        if deficit > 0 && !self.history.skip(deficit) {
            log::error!("failed to evict {deficit} bytes of history to make room for {n}");
            return Err(CacheError::Internal("history eviction"));
        }
        Ok(())
    }

    // Deliver `buf.len()` bytes to the reader and remember them in history
    fn deliver(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = buf.len();
        self.make_history_room(n)?;
        if !self.active.read(buf) {
            log::error!("failed to read {n} bytes from active; readable: {}", self.active.readable());
            return Err(CacheError::Internal("active read"));
        }
        if !self.history.write(buf) {
            log::error!("failed to copy {n} bytes to history; writable: {}", self.history.writable());
            return Err(CacheError::Internal("history write"));
        }
        self.cursor += n as u64;
        Ok(())
    }

    // Skip `n` bytes forward, moving them to history as if they had been read
    fn skip_forward(&mut self, n: usize) -> Result<()> {
        self.make_history_room(n)?;
        if !self.active.transfer(&mut self.history, n) {
            log::error!("failed to move {n} bytes from active to history");
            return Err(CacheError::Internal("forward seek"));
        }
        self.cursor += n as u64;
        Ok(())
    }

    // Step back `back` bytes into history. The newest `back` bytes of history go in front of active, and
    // whatever no longer fits in active moves in front of overflow.
    fn rewind(&mut self, back: usize) -> Result<()> {
        debug_assert!(self.scratch.is_empty());
        debug_assert!(back <= self.history.readable());
        let keep = self.history.readable() - back;

        // scratch <- older history; history keeps the newest `back` bytes. Then trade places.
        if !self.history.transfer(&mut self.scratch, keep) {
            return Err(Self::reshuffle_failed("split history"));
        }
        mem::swap(&mut self.history, &mut self.scratch);

        // Fill the rest of scratch from the front of active; it becomes the new active.
        let room = self.scratch.writable().min(self.active.readable());
        if !self.active.transfer(&mut self.scratch, room) {
            return Err(Self::reshuffle_failed("refill active"));
        }
        mem::swap(&mut self.active, &mut self.scratch);

        // Anything left of the old active now precedes the parked overflow bytes.
        if !self.scratch.is_empty() {
            if !self.scratch.append(&mut self.overflow) {
                return Err(Self::reshuffle_failed("park overflow"));
            }
            mem::swap(&mut self.overflow, &mut self.scratch);
        }

        self.cursor -= back as u64;
        Ok(())
    }

    fn reshuffle_failed(step: &'static str) -> CacheError {
        log::error!("backward seek reshuffle failed at '{step}'; cache window may be corrupt");
        CacheError::Internal(step)
    }

    // Move parked bytes back into active once they all fit
    fn promote_overflow(&mut self) -> Result<bool> {
        if self.overflow.is_empty() || self.active.writable() < self.overflow.readable() {
            return Ok(false);
        }
        if !self.active.append(&mut self.overflow) {
            log::error!("failed to promote {} overflow bytes", self.overflow.readable());
            return Err(CacheError::Internal("overflow promotion"));
        }
        Ok(true)
    }

    // Also stops at the last representable source offset, so `cursor` and `end` stay within u64
    fn writable(&self) -> usize {
        if !self.overflow.is_empty() {
            return 0;
        }
        let room = u64::MAX - self.end();
        self.active.writable().min(usize::try_from(room).unwrap_or(usize::MAX))
    }
}

impl MemCache {
    pub fn new(config: CacheConfig) -> Self {
        log::trace!("MemCache::new {:?}", config);
        Self {
            state: Mutex::new(State::new(config.capacity)),
            config,
            data_available: Condvar::new(),
            space_available: Condvar::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(CacheConfig::with_capacity(capacity))
    }

    /// Capacity of each of the three buffers.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// A snapshot of the cached ranges. Stale as soon as the lock is released.
    pub fn window(&self) -> Window {
        self.lock().window()
    }

    /// Copy of every cached byte, history then active then overflow, i.e. source range `window().start..end`.
    pub fn window_bytes(&self) -> Vec<u8> {
        let state = self.lock();
        let mut out = state.history.to_vec();
        out.extend(state.active.to_vec());
        out.extend(state.overflow.to_vec());
        out
    }

    // The state is restored to a consistent window before any unlock, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Number of readable bytes to wait for if `target` is a little past the buffered data
    fn lookahead_target(&self, state: &State, target: u64) -> Option<usize> {
        if !self.config.lookahead_enabled() || state.end_of_input {
            return None;
        }
        let ahead = target.checked_sub(state.cursor)?;
        let active = state.active.readable() as u64;
        if ahead < active || ahead >= active.saturating_add(self.config.lookahead_bytes) {
            return None;
        }
        if !state.overflow.is_empty() {
            log::debug!("seek to {target}: not waiting, writes are held back by overflow");
            return None;
        }
        let wanted = ahead + 1;
        if wanted > state.active.capacity() as u64 {
            log::debug!("seek to {target}: {wanted} bytes ahead can never fit in the active buffer");
            return None;
        }
        Some(wanted as usize)
    }
}

impl CacheStrategy for MemCache {
    fn open(&self) -> Result<()> {
        log::trace!("open");
        let mut state = self.lock();
        state.clear(0);
        state.end_of_input = false;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        log::trace!("close");
        self.lock().clear(0);
        Ok(())
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        // Leftovers from a backward seek must be used up before we take any more from the source
        let n = data.len().min(state.writable());
        if n == 0 {
            return Ok(0);
        }
        if !state.active.write(&data[..n]) {
            log::warn!("failed to write {n} bytes to cache; writable: {}", state.active.writable());
            return Err(CacheError::Internal("active write"));
        }
        self.data_available.notify_all();
        Ok(n)
    }

    fn read(&self, buf: &mut [u8]) -> Result<ReadStatus> {
        let mut state = self.lock();
        if state.active.is_empty() {
            return Ok(if state.end_of_input {
                ReadStatus::EndOfStream
            } else {
                ReadStatus::WouldBlock
            });
        }

        let n = buf.len().min(state.active.readable());
        state.deliver(&mut buf[..n])?;

        if state.promote_overflow()? {
            log::trace!("promoted overflow; {} bytes active", state.active.readable());
            self.data_available.notify_all();
        }
        if n > 0 {
            self.space_available.notify_all();
        }
        Ok(ReadStatus::Data(n))
    }

    fn wait_for_data(&self, min_bytes: usize, timeout: Duration) -> usize {
        let mut timeout = Timeout::after(timeout);
        let mut state = self.lock();
        while !state.end_of_input && state.active.readable() < min_bytes {
            let Some(poll) = timeout.next_poll(self.config.poll_interval) else {
                break;
            };
            state = self
                .data_available
                .wait_timeout(state, poll)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.active.readable()
    }

    fn wait_for_space(&self, timeout: Duration) -> usize {
        let mut timeout = Timeout::after(timeout);
        let mut state = self.lock();
        while state.writable() == 0 {
            let Some(poll) = timeout.next_poll(self.config.poll_interval) else {
                break;
            };
            state = self
                .space_available
                .wait_timeout(state, poll)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.writable()
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let SeekFrom::Start(target) = pos else {
            log::error!("only SeekFrom::Start is supported by the cache; got {:?}", pos);
            return Err(CacheError::UnsupportedSeekMode);
        };

        let mut state = self.lock();

        // A little past what we have; give the filler a chance before failing over to a source seek
        if let Some(wanted) = self.lookahead_target(&state, target) {
            log::debug!("seek to {target}: waiting for {wanted} bytes from {}", state.cursor);
            drop(state);
            self.wait_for_data(wanted, self.config.lookahead_wait);
            state = self.lock();
        }

        // Anything may have moved while we were waiting
        let window = state.window();
        let active_end = window.cursor + window.active as u64;

        if (window.cursor..active_end).contains(&target) {
            state.skip_forward((target - window.cursor) as usize)?;
        } else if (window.start..window.cursor).contains(&target) {
            state.rewind((window.cursor - target) as usize)?;
            log::trace!("rewound to {target}: {:?}", state.window());
        } else {
            log::debug!("seek to {target} outside of cached window {}..{}", window.start, active_end);
            return Err(CacheError::OutOfWindow {
                target,
                window_start: window.start,
                window_end: active_end,
            });
        }

        self.space_available.notify_all();
        Ok(state.cursor)
    }

    fn reset(&self, pos: u64) {
        log::trace!("reset to {pos}");
        let mut state = self.lock();
        state.clear(pos);
        state.end_of_input = false;
        self.space_available.notify_all();
    }

    fn set_end_of_input(&self) {
        self.lock().end_of_input = true;
        self.data_available.notify_all();
    }

    fn clear_end_of_input(&self) {
        self.lock().end_of_input = false;
    }

    fn is_end_of_input(&self) -> bool {
        self.lock().end_of_input
    }

    fn position(&self) -> u64 {
        self.lock().cursor
    }

    fn available(&self) -> usize {
        self.lock().active.readable()
    }
}
