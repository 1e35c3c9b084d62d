pub mod fake_impls;
#[cfg(feature = "std")]
pub mod std_impls;
pub mod tick;

pub use fake_impls::*;
pub use fugit::{ExtU32, HertzU32, MicrosDurationU32};
#[cfg(feature = "std")]
pub use std_impls::*;
pub use tick::*;

pub trait TimeoutStatus {
    /// Check if the time limit expires. This function may sleeps for a while,
    /// depends on the implementation.
    fn timeout(&mut self) -> bool;
}

/// A free running hardware counter.
///
/// On the F2838x one of the 32-bit CPU timers counting down from
/// `0xFFFF_FFFF` fits:
///
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Timer2(u32);
///
/// impl TickInstant for Timer2 {
///     fn frequency() -> HertzU32 {
///         200.MHz()
///     }
///     fn now() -> Self {
///         Timer2(cpu_timer2_counter())
///     }
///     fn tick_since(self, earlier: Self) -> u32 {
///         earlier.0.wrapping_sub(self.0)
///     }
/// }
/// ```
pub trait TickInstant: Copy {
    /// Counting rate of the ticks.
    fn frequency() -> HertzU32;
    fn now() -> Self;
    /// Returns the amount of ticks elapsed from another instant to this one.
    fn tick_since(self, earlier: Self) -> u32;
}
