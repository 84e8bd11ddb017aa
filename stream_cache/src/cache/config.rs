use std::time::Duration;

// 5 MiB per buffer
const DEFAULT_CAPACITY: usize = 5 * 1024 * 1024;
const DEFAULT_LOOKAHEAD_BYTES: u64 = 100_000;
const DEFAULT_LOOKAHEAD_WAIT: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sizing and seek policy for a `MemCache`. Fixed once the cache is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Capacity in bytes of each of the active, history and overflow buffers. A fourth buffer of the same size is
    /// kept for backward seeks, so a cache holds `4 * capacity` bytes.
    pub capacity: usize,

    /// How far past the buffered data a seek may land and still wait for the filler instead of failing.
    /// Zero disables the wait.
    pub lookahead_bytes: u64,

    /// Longest time a seek waits for the filler to reach its target.
    pub lookahead_wait: Duration,

    /// Upper bound on each sleep of the blocking waits, so a missed wakeup costs at most this much.
    pub poll_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            lookahead_bytes: DEFAULT_LOOKAHEAD_BYTES,
            lookahead_wait: DEFAULT_LOOKAHEAD_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn lookahead(mut self, bytes: u64, wait: Duration) -> Self {
        self.lookahead_bytes = bytes;
        self.lookahead_wait = wait;
        self
    }

    pub fn no_lookahead(self) -> Self {
        self.lookahead(0, Duration::ZERO)
    }

    pub fn poll_interval(mut self, poll: Duration) -> Self {
        self.poll_interval = poll;
        self
    }

    pub(crate) fn lookahead_enabled(&self) -> bool {
        self.lookahead_bytes > 0 && !self.lookahead_wait.is_zero()
    }
}
