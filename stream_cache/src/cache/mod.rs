// Read-ahead cache between a sequential source filler and a seeking reader

mod config;
mod mem_cache;
mod ring_buffer;
mod timeout;

pub use config::CacheConfig;
pub use mem_cache::MemCache;
pub use ring_buffer::RingBuffer;

use std::io::SeekFrom;
use std::time::Duration;

use crate::error::Result;

/// Outcome of a non-blocking read from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were copied out.
    Data(usize),
    /// Nothing buffered and the source is exhausted. Every later read returns this too, until a reset.
    EndOfStream,
    /// Nothing buffered yet; the filler has not caught up.
    WouldBlock,
}

/// Byte ranges held by the cache, as source offsets.
///
/// `start..cursor` is history, `cursor..cursor + active` is ready to read and the `overflow` bytes after that
/// are parked until the reader makes room for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub cursor: u64,
    pub end: u64,
    pub history: usize,
    pub active: usize,
    pub overflow: usize,
}

/// The interface a source-stream collaborator drives. One filler thread calls `write`, one reader thread calls
/// `read` and `seek`; both may block in the `wait_*` helpers.
pub trait CacheStrategy: Send + Sync {
    /// Empty every buffer and rewind to offset 0.
    fn open(&self) -> Result<()>;
    fn close(&self) -> Result<()>;

    /// Accept up to `data.len()` bytes from the source. Returns how many were taken; 0 means try again later.
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Copy up to `buf.len()` bytes out to the reader. Never blocks.
    fn read(&self, buf: &mut [u8]) -> Result<ReadStatus>;

    /// Block until at least `min_bytes` are readable, the source ends, or `timeout` passes.
    /// Returns the number of readable bytes, which may be less than asked for.
    fn wait_for_data(&self, min_bytes: usize, timeout: Duration) -> usize;

    /// Block until `write` would accept something, or `timeout` passes. Returns how many bytes it would accept.
    fn wait_for_space(&self, timeout: Duration) -> usize;

    /// Move the read position within the cached window without touching the source.
    /// Returns the new position.
    fn seek(&self, pos: SeekFrom) -> Result<u64>;

    /// Drop everything and restart at `pos`, after the caller repositioned the real source.
    fn reset(&self, pos: u64);

    fn set_end_of_input(&self);
    fn clear_end_of_input(&self);
    fn is_end_of_input(&self) -> bool;

    /// Source offset of the next byte `read` will return.
    fn position(&self) -> u64;

    /// Bytes `read` can return right now.
    fn available(&self) -> usize;
}
