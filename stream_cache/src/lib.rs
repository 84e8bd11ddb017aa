//! Bounded read-ahead cache for slow sequential byte sources.
//!
//! [`MemCache`] holds a window of recently fetched bytes around the reader's position so that short seeks,
//! backward or forward, are served from memory. [`files::CachedStreamReader`] drives one from a background
//! filler thread and exposes the result as `Read + Seek`.

pub mod cache;
pub mod error;
pub mod files;

pub use cache::{CacheConfig, CacheStrategy, MemCache, ReadStatus, RingBuffer, Window};
pub use error::CacheError;
pub use files::{ByteSource, CachedStreamReader};
