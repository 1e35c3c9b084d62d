use super::*;

/// Counts calls instead of measuring time: one call to
/// [`timeout`](TimeoutStatus::timeout) stands for one microsecond.
///
/// Only meant for unit tests, where it makes every wait deterministic.
pub struct FakeTimeoutStatus {
    timeout: MicrosDurationU32,
    count: u32,
}

impl FakeTimeoutStatus {
    pub fn new(timeout: MicrosDurationU32) -> Self {
        Self { timeout, count: 0 }
    }
}

impl TimeoutStatus for FakeTimeoutStatus {
    #[inline]
    fn timeout(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count >= self.timeout.ticks()
    }
}
