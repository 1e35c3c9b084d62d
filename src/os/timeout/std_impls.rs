use super::*;
use std::time::{Duration, Instant};

/// [`TimeoutStatus`] implementation for `std`.
pub struct StdTimeoutStatus {
    timeout: Duration,
    start_time: Instant,
}

impl StdTimeoutStatus {
    pub fn new(timeout: MicrosDurationU32) -> Self {
        Self {
            timeout: Duration::from_micros(timeout.ticks().into()),
            start_time: Instant::now(),
        }
    }
}

impl TimeoutStatus for StdTimeoutStatus {
    #[inline]
    fn timeout(&mut self) -> bool {
        self.start_time.elapsed() >= self.timeout
    }
}
