use super::*;

/// [`TimeoutStatus`] measured in ticks of a [`TickInstant`].
///
/// Elapsed ticks are accumulated on every check, so the counter may wrap
/// any number of times during a long timeout as long as it is checked at
/// least once per wrap.
pub struct TickTimeoutStatus<T: TickInstant> {
    tick: T,
    timeout_tick: u64,
    elapsed_tick: u64,
}

impl<T> TickTimeoutStatus<T>
where
    T: TickInstant,
{
    pub fn new(timeout: MicrosDurationU32) -> Self {
        let freq = T::frequency().raw() as u64;
        Self {
            tick: T::now(),
            timeout_tick: (timeout.ticks() as u64 * freq).div_ceil(1_000_000),
            elapsed_tick: 0,
        }
    }
}

impl<T> TimeoutStatus for TickTimeoutStatus<T>
where
    T: TickInstant,
{
    #[inline]
    fn timeout(&mut self) -> bool {
        let now = T::now();
        self.elapsed_tick = self
            .elapsed_tick
            .saturating_add(now.tick_since(self.tick) as u64);
        self.tick = now;
        self.elapsed_tick >= self.timeout_tick
    }
}
