//! SPI master driven by the RX FIFO threshold interrupt.
//!
//! Every transmitted word clocks one word in, so the RX interrupt alone
//! tracks the progress of a transfer. The handler refills the TX FIFO each
//! time it drains the RX FIFO.

mod spi_master_it;
pub use spi_master_it::*;

use crate::{fugit::HertzU32, time::Clocks, transfer::FifoPeriph};
use embedded_hal::spi::ErrorKind;
pub use embedded_hal::spi::{MODE_0, MODE_1, MODE_2, MODE_3, Mode, Phase, Polarity};

/// Register level access to one SPI module in master mode with 8 bit
/// characters and FIFOs enabled.
pub trait SpiPeriph: FifoPeriph {
    /// Master mode, talk enabled, FIFOs reset, module released from reset.
    fn config(&mut self, mode: Mode, baud_register: u8);

    /// A word is still being shifted or waits in the TX FIFO.
    fn is_busy(&self) -> bool;
    /// Drive the slave select line of `slave` low and all others high.
    fn select(&mut self, slave: SlaveSelect);
    fn deselect_all(&mut self);
    /// Read and clean the RX overrun flag.
    fn get_and_clean_error(&mut self) -> Option<Error>;

    fn set_interrupt(&mut self, event: Event, enable: bool);
    /// Clears the RX FIFO interrupt flag and acknowledges the interrupt group.
    fn ack_interrupt(&mut self);
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// RX FIFO reached its threshold
    RxFifo,
    Overrun,
}

/// Slave select lines, driven as GPIOs.
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlaveSelect {
    Slave1,
    Slave2,
}

// Config -----------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub bitrate: HertzU32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: MODE_0,
            bitrate: HertzU32::MHz(1),
        }
    }
}

impl Config {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn bitrate(mut self, bitrate: HertzU32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Value of the baud rate register, `lspclk / bitrate - 1`.
    ///
    /// Values below 3 select `lspclk / 4` on this module, so the result is
    /// clamped to `3..=127`.
    pub fn baud_register(&self, clocks: &Clocks) -> u8 {
        let div = clocks.lspclk.raw() / self.bitrate.raw().max(1);
        div.saturating_sub(1).clamp(3, 127) as u8
    }

    /// Bitrate the module actually runs with.
    pub fn actual_bitrate(&self, clocks: &Clocks) -> HertzU32 {
        clocks.lspclk / (self.baud_register(clocks) as u32 + 1)
    }
}

// Error ------------------------------------------------------------

/// SPI error
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Overrun occurred
    Overrun,
    Busy,
    Buffer,
    Timeout,
    Other,
}

impl embedded_hal::spi::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {
            Self::Overrun => ErrorKind::Overrun,
            Self::Busy | Self::Buffer | Self::Timeout | Self::Other => ErrorKind::Other,
        }
    }
}
