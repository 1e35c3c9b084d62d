//! Time units and clock configuration
//!
//! Frequencies and durations are [`fugit`] types. The `fugit::RateExtU32`
//! trait adds methods like `.Hz()`, `.kHz()`, `.MHz()` to `u32`, and
//! [`U32Ext`] adds `.bps()` for serial bit rates.
//!
//! ```rust
//! use f2838x_hal::{prelude::*, time::Clocks};
//!
//! let clocks = Clocks::default();
//! assert_eq!(clocks.sysclk, 200.MHz::<1, 1>());
//! assert_eq!(clocks.lspclk, 50_000.kHz::<1, 1>());
//! let baud = 115_200.bps();
//! assert_eq!(baud.0, 115_200);
//! ```

use core::ops;

pub use fugit::{HertzU32, MicrosDurationU32, RateExtU32};

/// Bits per second
#[l::maybe_derive_format]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Debug)]
pub struct Bps(pub u32);

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Bps`
    fn bps(self) -> Bps;
}

impl U32Ext for u32 {
    fn bps(self) -> Bps {
        Bps(self)
    }
}

macro_rules! impl_arithmetic {
    ($wrapper:ty, $wrapped:ty) => {
        impl ops::Mul<$wrapped> for $wrapper {
            type Output = Self;
            fn mul(self, rhs: $wrapped) -> Self {
                Self(self.0 * rhs)
            }
        }
    };
}

impl_arithmetic!(Bps, u32);

/// Clock tree as seen by the communication modules. The clock tree itself
/// is set up elsewhere, these values only feed the divider calculations.
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clocks {
    /// Feeds the I2C prescaler.
    pub sysclk: HertzU32,
    /// Low speed peripheral clock, feeds SPI and SCI.
    pub lspclk: HertzU32,
}

impl Default for Clocks {
    fn default() -> Self {
        Self {
            sysclk: 200.MHz(),
            lspclk: 50.MHz(),
        }
    }
}

impl Clocks {
    pub fn sysclk(mut self, sysclk: HertzU32) -> Self {
        self.sysclk = sysclk;
        self
    }

    pub fn lspclk(mut self, lspclk: HertzU32) -> Self {
        self.lspclk = lspclk;
        self
    }
}
