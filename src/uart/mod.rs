//! SCI (UART) with independent interrupt driven TX and RX channels.
//!
//! ```ignore
//! let mut uart = Uart::new(periph);
//! uart.init(&Config::default(), &Clocks::default());
//! let (mut tx, mut tx_it, mut rx, mut rx_it, timer) = uart.into_tx_rx::<RawOs<Timer2>, 64>();
//! // in the SCI TX interrupt: tx_it.handler();
//! // in the SCI RX interrupt: rx_it.handler();
//! // in a 1 ms timer interrupt: timer.tick();
//!
//! rx.start_receive(8, Some(100));
//! ```

mod uart_it;
pub use uart_it::*;

use crate::{
    os::MicrosDurationU32,
    time::{Bps, Clocks},
    transfer::FifoPeriph,
};
use core::fmt::Display;
use embedded_io as e_io;

/// Register level access to one SCI module with FIFOs enabled.
pub trait UartPeriph: FifoPeriph {
    /// Frame format and baud divider. Transmitter and receiver stay
    /// disabled, FIFOs are enabled and their interrupts disabled.
    fn config(&mut self, config: &Config, divider: u16);

    fn enable_tx(&mut self, enable: bool);
    fn enable_rx(&mut self, enable: bool);
    /// TX FIFO and shift register are empty.
    fn is_tx_complete(&self) -> bool;
    /// Read and clean the receive error flags.
    fn get_and_clean_error(&mut self) -> Option<Error>;

    fn set_interrupt(&mut self, event: Event, enable: bool);
    /// Clears the FIFO interrupt flag of `event` and acknowledges the
    /// interrupt group.
    fn ack_interrupt(&mut self, event: Event);
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// TX FIFO is empty
    TxFifo,
    /// RX FIFO reached its threshold
    RxFifo,
}

// Config -----------------------------------------------------------

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataBits {
    Bits5,
    Bits6,
    Bits7,
    Bits8,
}

impl DataBits {
    pub fn bits(self) -> u8 {
        match self {
            Self::Bits5 => 5,
            Self::Bits6 => 6,
            Self::Bits7 => 7,
            Self::Bits8 => 8,
        }
    }
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Parity {
    ParityNone,
    ParityEven,
    ParityOdd,
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopBits {
    /// 1 stop bit
    STOP1,
    /// 2 stop bits
    STOP2,
}

#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    pub baudrate: Bps,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            baudrate: Bps(115_200),
            data_bits: DataBits::Bits8,
            parity: Parity::ParityNone,
            stop_bits: StopBits::STOP1,
        }
    }
}

impl Config {
    pub fn baudrate(mut self, baudrate: Bps) -> Self {
        self.baudrate = baudrate;
        self
    }

    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn parity_none(mut self) -> Self {
        self.parity = Parity::ParityNone;
        self
    }

    pub fn parity_even(mut self) -> Self {
        self.parity = Parity::ParityEven;
        self
    }

    pub fn parity_odd(mut self) -> Self {
        self.parity = Parity::ParityOdd;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Baud divider `lspclk / (baud * 8) - 1`. The high byte goes to the
    /// high baud register, the low byte to the low one.
    pub fn divider(&self, clocks: &Clocks) -> u16 {
        let div = clocks.lspclk.raw() / (self.baudrate * 8).0.max(1);
        div.saturating_sub(1).min(u16::MAX as u32) as u16
    }

    /// Bits on the line per word, start and stop bits included.
    pub fn frame_bits(&self) -> u32 {
        let parity = match self.parity {
            Parity::ParityNone => 0,
            _ => 1,
        };
        let stop = match self.stop_bits {
            StopBits::STOP1 => 1,
            StopBits::STOP2 => 2,
        };
        1 + self.data_bits.bits() as u32 + parity + stop
    }
}

/// Line time of `words` frames.
pub fn calculate_timeout(config: &Config, words: usize) -> MicrosDurationU32 {
    let bits = config.frame_bits() as u64 * words as u64;
    let us = (bits * 1_000_000).div_ceil(config.baudrate.0.max(1) as u64);
    MicrosDurationU32::from_ticks(us.min(u32::MAX as u64) as u32)
}

// Error ------------------------------------------------------------

/// UART error
#[l::maybe_derive_format]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The peripheral receive buffer was overrun.
    Overrun,
    /// Received data does not conform to the peripheral configuration.
    FrameFormat,
    /// Parity check failed.
    Parity,
    /// A break condition was detected on the line.
    Break,
    /// The channel is busy with another transfer.
    Busy,
    /// Length is zero or does not fit the channel buffer.
    Buffer,
    /// The reception countdown expired.
    Timeout,
    Other,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Overrun => write!(f, "UART overrun error"),
            Error::FrameFormat => write!(f, "UART frame format error"),
            Error::Parity => write!(f, "UART parity error"),
            Error::Break => write!(f, "UART break detected"),
            Error::Busy => write!(f, "UART busy"),
            Error::Buffer => write!(f, "UART buffer length error"),
            Error::Timeout => write!(f, "UART timeout"),
            Error::Other => write!(f, "UART other error"),
        }
    }
}

impl core::error::Error for Error {}

impl embedded_io::Error for Error {
    #[inline]
    fn kind(&self) -> e_io::ErrorKind {
        match self {
            Error::Overrun | Error::FrameFormat | Error::Parity | Error::Break => {
                e_io::ErrorKind::InvalidData
            }
            Error::Busy => e_io::ErrorKind::WriteZero,
            Error::Buffer => e_io::ErrorKind::InvalidInput,
            Error::Timeout => e_io::ErrorKind::TimedOut,
            Error::Other => e_io::ErrorKind::Other,
        }
    }
}
