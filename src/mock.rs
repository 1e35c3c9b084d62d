//! Simulated peripherals for the driver tests.
//!
//! Each mock is a handle to shared registers, so a test keeps a clone to look
//! at after giving the original to a driver. `writes` counts every call
//! that would write a register.

use crate::{
    Steal,
    i2c::{self, Address, ClockDividers, Direction, I2cPeriph, NoAcknowledgeSource},
    spi::{self, Mode, SlaveSelect, SpiPeriph},
    transfer::FifoPeriph,
    uart::{self, UartPeriph},
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

// FIFO -------------------------------------------------------------

pub struct MockFifo {
    depth: usize,
    tx: VecDeque<u8>,
    rx: VecDeque<u8>,
    pub rx_threshold: usize,
}

impl MockFifo {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            tx: VecDeque::new(),
            rx: VecDeque::new(),
            rx_threshold: 0,
        }
    }

    /// Everything the driver pushed since the last call.
    pub fn take_tx(&mut self) -> Vec<u8> {
        self.tx.drain(..).collect()
    }

    pub fn feed_rx(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    pub fn tx_is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl FifoPeriph for MockFifo {
    fn fifo_depth(&self) -> usize {
        self.depth
    }

    fn tx_fifo_space(&self) -> usize {
        self.depth.saturating_sub(self.tx.len())
    }

    fn rx_fifo_count(&self) -> usize {
        self.rx.len()
    }

    fn tx_fifo_push(&mut self, word: u8) {
        self.tx.push_back(word);
    }

    fn rx_fifo_pop(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn set_rx_threshold(&mut self, level: usize) {
        self.rx_threshold = level;
    }
}

/// Shared register handle with a FIFO and a write counter.
macro_rules! mock_periph {
    ($name:ident, $regs:ident) => {
        #[derive(Clone)]
        pub struct $name(Arc<Mutex<$regs>>);

        impl $name {
            pub fn new(depth: usize) -> Self {
                Self(Arc::new(Mutex::new($regs::new(depth))))
            }

            pub fn regs(&self) -> MutexGuard<'_, $regs> {
                self.0.lock().unwrap()
            }

            pub fn feed_rx(&self, data: &[u8]) {
                self.regs().fifo.feed_rx(data);
            }
        }

        impl Steal for $name {
            unsafe fn steal(&self) -> Self {
                self.clone()
            }
        }

        impl FifoPeriph for $name {
            fn fifo_depth(&self) -> usize {
                self.regs().fifo.fifo_depth()
            }

            fn tx_fifo_space(&self) -> usize {
                self.regs().fifo.tx_fifo_space()
            }

            fn rx_fifo_count(&self) -> usize {
                self.regs().fifo.rx_fifo_count()
            }

            fn tx_fifo_push(&mut self, word: u8) {
                let mut regs = self.regs();
                regs.writes += 1;
                regs.fifo.tx_fifo_push(word);
            }

            fn rx_fifo_pop(&mut self) -> u8 {
                self.regs().fifo.rx_fifo_pop()
            }

            fn set_rx_threshold(&mut self, level: usize) {
                let mut regs = self.regs();
                regs.writes += 1;
                regs.fifo.set_rx_threshold(level);
            }
        }
    };
}

fn set_enabled<E: PartialEq>(list: &mut Vec<E>, event: E, enable: bool) {
    list.retain(|e| *e != event);
    if enable {
        list.push(event);
    }
}

// I2C --------------------------------------------------------------

pub struct I2cRegs {
    pub fifo: MockFifo,
    pub writes: usize,
    pub dividers: Option<ClockDividers>,
    pub enabled: Vec<i2c::Event>,
    pub addr: Option<Address>,
    pub direction: Option<Direction>,
    pub byte_count: usize,
    pub starts: usize,
    pub stops: usize,
    pub acks: usize,
    pub bus_busy: bool,
    pub stop_pending: bool,
    pub stop_detected: bool,
    pub access_ready: bool,
    pub nack: bool,
    pub arbitration_loss: bool,
}

impl I2cRegs {
    fn new(depth: usize) -> Self {
        Self {
            fifo: MockFifo::new(depth),
            writes: 0,
            dividers: None,
            enabled: Vec::new(),
            addr: None,
            direction: None,
            byte_count: 0,
            starts: 0,
            stops: 0,
            acks: 0,
            bus_busy: false,
            stop_pending: false,
            stop_detected: false,
            access_ready: false,
            nack: false,
            arbitration_loss: false,
        }
    }

    pub fn interrupt(&self, event: i2c::Event) -> bool {
        self.enabled.contains(&event)
    }
}

mock_periph!(MockI2c, I2cRegs);

impl MockI2c {
    /// Words the module has put on the bus.
    pub fn shift_out(&self) -> Vec<u8> {
        self.regs().fifo.take_tx()
    }

    /// The requested stop condition was generated.
    pub fn complete_stop(&self) {
        let mut regs = self.regs();
        regs.stop_pending = false;
        regs.bus_busy = false;
        regs.stop_detected = true;
    }
}

impl I2cPeriph for MockI2c {
    fn config(&mut self, dividers: ClockDividers) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.dividers = Some(dividers);
    }

    fn is_bus_busy(&self) -> bool {
        self.regs().bus_busy
    }

    fn is_stop_pending(&self) -> bool {
        self.regs().stop_pending
    }

    fn get_and_clean_error(&mut self) -> Option<i2c::Error> {
        let mut regs = self.regs();
        if regs.nack {
            regs.nack = false;
            Some(i2c::Error::NoAcknowledge(NoAcknowledgeSource::Unknown))
        } else if regs.arbitration_loss {
            regs.arbitration_loss = false;
            Some(i2c::Error::ArbitrationLoss)
        } else {
            None
        }
    }

    fn get_and_clean_flag(&mut self, flag: i2c::Flag) -> bool {
        let mut regs = self.regs();
        let bit = match flag {
            i2c::Flag::StopDetected => &mut regs.stop_detected,
            i2c::Flag::AccessReady => &mut regs.access_ready,
        };
        core::mem::take(bit)
    }

    fn set_direction(&mut self, dir: Direction) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.direction = Some(dir);
    }

    fn set_slave_addr(&mut self, addr: Address) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.addr = Some(addr);
    }

    fn set_byte_count(&mut self, count: usize) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.byte_count = count;
    }

    fn send_start(&mut self) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.starts += 1;
        regs.bus_busy = true;
    }

    fn send_stop(&mut self) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.stops += 1;
        regs.stop_pending = true;
    }

    fn set_interrupt(&mut self, event: i2c::Event, enable: bool) {
        let mut regs = self.regs();
        regs.writes += 1;
        set_enabled(&mut regs.enabled, event, enable);
    }

    fn ack_interrupt(&mut self) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.acks += 1;
    }
}

// SPI --------------------------------------------------------------

pub struct SpiRegs {
    pub fifo: MockFifo,
    pub writes: usize,
    pub config: Option<(Mode, u8)>,
    pub enabled: Vec<spi::Event>,
    pub selected: Option<SlaveSelect>,
    pub acks: usize,
    pub busy: bool,
    pub overrun: bool,
}

impl SpiRegs {
    fn new(depth: usize) -> Self {
        Self {
            fifo: MockFifo::new(depth),
            writes: 0,
            config: None,
            enabled: Vec::new(),
            selected: None,
            acks: 0,
            busy: false,
            overrun: false,
        }
    }

    pub fn interrupt(&self, event: spi::Event) -> bool {
        self.enabled.contains(&event)
    }
}

mock_periph!(MockSpi, SpiRegs);

impl MockSpi {
    /// Shifts out everything in the TX FIFO. For every word sent the word
    /// at the same position of `replies` is shifted in, `0xFF` past its end.
    pub fn clock_in(&self, replies: &[u8]) -> Vec<u8> {
        let mut regs = self.regs();
        let sent = regs.fifo.take_tx();
        let received: Vec<u8> = (0..sent.len())
            .map(|i| replies.get(i).copied().unwrap_or(0xFF))
            .collect();
        regs.fifo.feed_rx(&received);
        sent
    }
}

impl SpiPeriph for MockSpi {
    fn config(&mut self, mode: Mode, baud_register: u8) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.config = Some((mode, baud_register));
    }

    fn is_busy(&self) -> bool {
        let regs = self.regs();
        regs.busy || !regs.fifo.tx_is_empty()
    }

    fn select(&mut self, slave: SlaveSelect) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.selected = Some(slave);
    }

    fn deselect_all(&mut self) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.selected = None;
    }

    fn get_and_clean_error(&mut self) -> Option<spi::Error> {
        core::mem::take(&mut self.regs().overrun).then_some(spi::Error::Overrun)
    }

    fn set_interrupt(&mut self, event: spi::Event, enable: bool) {
        let mut regs = self.regs();
        regs.writes += 1;
        set_enabled(&mut regs.enabled, event, enable);
    }

    fn ack_interrupt(&mut self) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.acks += 1;
    }
}

// UART -------------------------------------------------------------

pub struct UartRegs {
    pub fifo: MockFifo,
    pub writes: usize,
    pub config: Option<(uart::Config, u16)>,
    pub enabled: Vec<uart::Event>,
    pub tx_enabled: bool,
    pub rx_enabled: bool,
    /// Last word still in the shift register.
    pub shifting: bool,
    pub error: Option<uart::Error>,
    pub acks: usize,
}

impl UartRegs {
    fn new(depth: usize) -> Self {
        Self {
            fifo: MockFifo::new(depth),
            writes: 0,
            config: None,
            enabled: Vec::new(),
            tx_enabled: false,
            rx_enabled: false,
            shifting: false,
            error: None,
            acks: 0,
        }
    }

    pub fn interrupt(&self, event: uart::Event) -> bool {
        self.enabled.contains(&event)
    }
}

mock_periph!(MockUart, UartRegs);

impl MockUart {
    /// Moves the TX FIFO into the shift register. The line stays busy
    /// until [`line_idle`](Self::line_idle).
    pub fn shift_out(&self) -> Vec<u8> {
        let mut regs = self.regs();
        let sent = regs.fifo.take_tx();
        if !sent.is_empty() {
            regs.shifting = true;
        }
        sent
    }

    pub fn line_idle(&self) {
        self.regs().shifting = false;
    }
}

impl UartPeriph for MockUart {
    fn config(&mut self, config: &uart::Config, divider: u16) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.config = Some((*config, divider));
    }

    fn enable_tx(&mut self, enable: bool) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.tx_enabled = enable;
    }

    fn enable_rx(&mut self, enable: bool) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.rx_enabled = enable;
    }

    fn is_tx_complete(&self) -> bool {
        let regs = self.regs();
        regs.fifo.tx_is_empty() && !regs.shifting
    }

    fn get_and_clean_error(&mut self) -> Option<uart::Error> {
        self.regs().error.take()
    }

    fn set_interrupt(&mut self, event: uart::Event, enable: bool) {
        let mut regs = self.regs();
        regs.writes += 1;
        set_enabled(&mut regs.enabled, event, enable);
    }

    fn ack_interrupt(&mut self, _event: uart::Event) {
        let mut regs = self.regs();
        regs.writes += 1;
        regs.acks += 1;
    }
}
