/// A latching deadline we can poll to decide whether a bounded wait is over.
use std::time::{Duration, Instant};

pub(crate) enum Timeout {
    Future(Instant),
    TimedOut,
}

impl Timeout {
    pub(crate) fn after(limit: Duration) -> Self {
        match Instant::now().checked_add(limit) {
            Some(t) => Timeout::Future(t),
            // Too far away to represent; treat it as a very long wait
            None => Timeout::Future(Instant::now() + Duration::from_secs(60 * 60 * 24 * 365)),
        }
    }

    // Checks if timer expired and sets the timed-out latch if so
    pub(crate) fn is_timed_out(&mut self) -> bool {
        if let Timeout::Future(t) = self {
            if Instant::now() >= *t {
                *self = Timeout::TimedOut;
            }
        }
        matches!(self, Timeout::TimedOut)
    }

    /// How long to sleep before checking again: at most `poll`, never past the deadline.
    pub(crate) fn next_poll(&mut self, poll: Duration) -> Option<Duration> {
        if self.is_timed_out() {
            return None;
        }
        match self {
            Timeout::Future(t) => Some(t.saturating_duration_since(Instant::now()).min(poll)),
            Timeout::TimedOut => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Timeout;
    use std::time::Duration;

    #[test]
    fn test_latches() {
        let mut t = Timeout::after(Duration::ZERO);
        assert!(t.is_timed_out());
        assert!(t.next_poll(Duration::from_millis(50)).is_none());
        assert!(t.is_timed_out());
    }

    #[test]
    fn test_poll_is_bounded() {
        let mut t = Timeout::after(Duration::from_secs(10));
        assert!(!t.is_timed_out());
        let poll = t.next_poll(Duration::from_millis(50)).unwrap();
        assert!(poll <= Duration::from_millis(50));
    }
}
