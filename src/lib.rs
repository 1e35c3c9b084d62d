#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Interrupt driven drivers for the I2C, SPI and SCI (UART) modules of the
//! TMS320F2838x.
//!
//! Every driver is split in two halves created by the same constructor: a
//! foreground handle that starts transfers and reports their status, and an
//! interrupt handler that moves words between the hardware FIFOs and the
//! driver owned buffers. The register level work is done by a type that
//! implements the peripheral trait of the driver ([`i2c::I2cPeriph`],
//! [`spi::SpiPeriph`], [`uart::UartPeriph`]).
//!
//! On bare metal the drivers wait through [`os::RawOs`], which measures
//! timeouts with an [`os::TickInstant`] such as a free running CPU timer.

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod atomic_cell;
pub mod i2c;
pub mod os;
pub mod prelude;
pub mod spi;
pub mod time;
pub mod transfer;
pub mod uart;

#[cfg(test)]
pub(crate) mod mock;

pub use critical_section;
pub use embedded_hal;
pub use embedded_io;
pub use fugit;

pub trait Steal {
    /// Steal an instance of this peripheral
    ///
    /// # Safety
    ///
    /// Ensure that the new instance of the peripheral cannot be used in a way
    /// that may race with any existing instances, for example by only
    /// accessing read-only or write-only registers, or by consuming the
    /// original peripheral and using critical sections to coordinate
    /// access between multiple new instances.
    ///
    /// The drivers in this crate hand one stolen instance to the interrupt
    /// handler and keep the original in the foreground handle.
    unsafe fn steal(&self) -> Self;
}
