use std::time::Duration;

/// A monotonic point in time.
///
/// Every time-dependent operation in this crate takes the current `Instant` as
/// an argument instead of reading the clock itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    inner: std::time::Instant,
}

impl Instant {
    pub fn now() -> Self {
        Self {
            inner: std::time::Instant::now(),
        }
    }

    /// Time passed between `self` and `now`, zero if `now` is earlier.
    pub fn elapsed(&self, now: &Self) -> Duration {
        now.inner.saturating_duration_since(self.inner)
    }

    pub fn add_millis(&mut self, millis: u32) {
        self.inner += Duration::from_millis(u64::from(millis));
    }

    pub fn add_duration(&mut self, duration: Duration) {
        self.inner += duration;
    }

    pub fn offset(&self, duration: Duration) -> Self {
        Self {
            inner: self.inner + duration,
        }
    }
}
