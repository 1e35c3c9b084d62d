//! I2C master driven by the FIFO and stop-condition interrupts.
//!
//! ```ignore
//! let (mut i2c, mut it) = I2cMaster::<RawOs<Timer2>, _>::new(periph);
//! i2c.init(I2cClock::Khz400, &Clocks::default());
//! // in the I2C interrupt: it.handler();
//!
//! i2c.set_write_data(&[0x10, 0x20]);
//! if i2c.start_write_read(0x50u8, 2, 4) {
//!     while i2c.status() == TransferState::InProgress {}
//! }
//! ```

mod i2c_master_it;
pub use i2c_master_it::*;

use crate::{time::Clocks, transfer::FifoPeriph};
use embedded_hal::i2c::ErrorKind;
pub use embedded_hal::i2c::NoAcknowledgeSource;

/// Register level access to one I2C module.
///
/// The module runs with its FIFOs enabled. The byte counter stops the
/// module after the programmed number of bytes; a stop requested with
/// [`send_stop`](Self::send_stop) is generated once the counter reaches
/// zero.
pub trait I2cPeriph: FifoPeriph {
    /// Master mode, 8 data bits, FIFOs enabled and reset, module released
    /// from reset.
    fn config(&mut self, dividers: ClockDividers);

    /// The bus busy bit.
    fn is_bus_busy(&self) -> bool;
    /// A requested stop condition has not been generated yet.
    fn is_stop_pending(&self) -> bool;
    /// Read and clean the error flags.
    fn get_and_clean_error(&mut self) -> Option<Error>;
    /// Read and clean a status flag.
    fn get_and_clean_flag(&mut self, flag: Flag) -> bool;

    fn set_direction(&mut self, dir: Direction);
    fn set_slave_addr(&mut self, addr: Address);
    fn set_byte_count(&mut self, count: usize);

    fn send_start(&mut self);
    fn send_stop(&mut self);
    /// Start again without releasing the bus.
    #[inline]
    fn send_repeated_start(&mut self) {
        self.send_start();
    }

    fn set_interrupt(&mut self, event: Event, enable: bool);
    /// Clears the FIFO interrupt flags and acknowledges the interrupt group.
    fn ack_interrupt(&mut self);
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flag {
    /// Stop condition detected
    StopDetected,
    /// Register access ready, the byte counter reached zero without a stop
    AccessReady,
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    StopDetected,
    NoAcknowledge,
    AccessReady,
    /// TX FIFO is empty
    TxFifo,
    /// RX FIFO reached its threshold
    RxFifo,
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Transmit,
    Receive,
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Address {
    Seven(u8),
    Ten(u16),
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Self::Seven(value)
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Self::Ten(value)
    }
}

// Clock ------------------------------------------------------------

/// SCL frequency.
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum I2cClock {
    #[default]
    Khz100,
    Khz400,
}

/// Register values of the clock generator.
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClockDividers {
    /// Module clock = sysclk / (prescaler + 1), must end up between 7 and 12 MHz.
    pub prescaler: u8,
    pub clk_high: u16,
    pub clk_low: u16,
}

impl I2cClock {
    /// Module clock of 10 MHz at the default 200 MHz sysclk.
    const MODULE_CLOCK: u32 = 10_000_000;

    pub fn dividers(self, clocks: &Clocks) -> ClockDividers {
        let prescaler = (clocks.sysclk.raw() / Self::MODULE_CLOCK).clamp(1, 256) - 1;
        let (clk_high, clk_low) = match self {
            Self::Khz100 => (42, 42),
            Self::Khz400 => (5, 4),
        };
        ClockDividers {
            prescaler: prescaler as u8,
            clk_high,
            clk_low,
        }
    }

    /// Nominal SCL frequency in Hz.
    pub fn bus_hz(self) -> u32 {
        match self {
            Self::Khz100 => 100_000,
            Self::Khz400 => 400_000,
        }
    }
}

// Error ------------------------------------------------------------

#[l::maybe_derive_format]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[non_exhaustive]
pub enum Error {
    /// No ack received
    NoAcknowledge(NoAcknowledgeSource),
    /// Arbitration was lost
    ArbitrationLoss,
    /// The bus was busy or a transfer was still running
    Busy,
    /// Length is zero or does not fit the channel buffer
    Buffer,
    Timeout,
    Other,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {
            Self::ArbitrationLoss => ErrorKind::ArbitrationLoss,
            Self::NoAcknowledge(nack) => ErrorKind::NoAcknowledge(nack),
            Self::Busy | Self::Buffer | Self::Timeout | Self::Other => ErrorKind::Other,
        }
    }
}
