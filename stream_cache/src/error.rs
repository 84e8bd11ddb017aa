use std::io;

/// Failures reported by the cache. Backpressure, would-block and end-of-stream are not errors; they are
/// reported through the return values of `write` and `read`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Only absolute seeks reach the cache. Relative seeks are resolved by the caller.
    #[error("only absolute seeks are supported by the cache")]
    UnsupportedSeekMode,

    /// The target is not held in memory. The caller must reposition the real source and `reset` the cache.
    #[error("seek to {target} is outside the cached window [{window_start}, {window_end})")]
    OutOfWindow {
        target: u64,
        window_start: u64,
        window_end: u64,
    },

    /// A buffer move failed even though the capacities were checked first. The window may be corrupt.
    #[error("cache buffer accounting failed: {0}")]
    Internal(&'static str),

    #[error("source error: {0}")]
    Source(#[from] io::Error),
}

impl From<CacheError> for io::Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Source(err) => err,
            CacheError::UnsupportedSeekMode => io::Error::new(io::ErrorKind::InvalidInput, err),
            CacheError::OutOfWindow { .. } => io::Error::new(io::ErrorKind::Unsupported, err),
            CacheError::Internal(_) => io::Error::other(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
