use super::*;
use crate::{
    Steal,
    os::{self, Arc, MicrosDurationU32, NotifierIsr, OsInterface},
    transfer::{Channel, ChannelData, Cursor, TransferBuffer, TransferState},
};
use embedded_hal::i2c::{self, Operation};

/// Capacity of the channel buffers when not given, the depth of the
/// hardware FIFOs.
pub const DEFAULT_BUFFER_SIZE: usize = 16;

// Master -----------------------------------------------------------

pub struct I2cMaster<OS: OsInterface, I2C, const N: usize = DEFAULT_BUFFER_SIZE> {
    i2c: I2C,
    channel: Arc<Channel<N, Error>>,
    waiter: OS::NotifyReceiver,
    byte_period: MicrosDurationU32,
}

impl<OS, I2C, const N: usize> I2cMaster<OS, I2C, N>
where
    OS: OsInterface,
    I2C: I2cPeriph + Steal,
{
    pub fn new(i2c: I2C) -> (Self, InterruptHandler<OS, I2C, N>) {
        let (notifier, waiter) = OS::notifier();
        let channel = Channel::new();
        let it = InterruptHandler {
            i2c: unsafe { i2c.steal() },
            channel: Arc::clone(&channel),
            notifier,
        };
        (
            Self {
                i2c,
                channel,
                waiter,
                byte_period: byte_period(I2cClock::default()),
            },
            it,
        )
    }
}

impl<OS, I2C, const N: usize> I2cMaster<OS, I2C, N>
where
    OS: OsInterface,
    I2C: I2cPeriph,
{
    /// Configures the module, clears both buffers and sets the channel
    /// `Idle`. The stop-detected and no-acknowledge interrupts stay enabled
    /// from now on.
    pub fn init(&mut self, clock: I2cClock, clocks: &Clocks) {
        disable_transfer_interrupts(&mut self.i2c);
        self.i2c.config(clock.dividers(clocks));
        self.i2c.set_interrupt(Event::StopDetected, true);
        self.i2c.set_interrupt(Event::NoAcknowledge, true);
        self.byte_period = byte_period(clock);
        critical_section::with(|cs| {
            let mut d = self.channel.borrow(cs);
            d.write.clear();
            d.read.clear();
            d.cursor = Cursor::default();
            d.error = None;
        });
        self.channel.set_state(TransferState::Idle);
    }

    /// Channel state. Reports `InProgress` as long as the module still has
    /// a stop condition to generate, even if the interrupt handler already
    /// marked the transfer done.
    pub fn status(&self) -> TransferState {
        if self.i2c.is_stop_pending() {
            TransferState::InProgress
        } else {
            self.channel.state()
        }
    }

    /// See [`Channel::reset_to_idle`].
    #[inline]
    pub fn reset_to_idle(&mut self) -> bool {
        self.channel.reset_to_idle()
    }

    #[inline]
    pub fn init_write_buffer(&mut self) -> bool {
        self.channel.init_write_buffer()
    }

    #[inline]
    pub fn init_read_buffer(&mut self) -> bool {
        self.channel.init_read_buffer()
    }

    /// Runs `f` on the write buffer, `None` while a transfer is running.
    #[inline]
    pub fn with_write_buffer<R>(
        &mut self,
        f: impl FnOnce(&mut TransferBuffer<N>) -> R,
    ) -> Option<R> {
        self.channel.with_write_buffer(f)
    }

    /// Copies `data` to the front of the write buffer.
    pub fn set_write_data(&mut self, data: &[u8]) -> bool {
        data.len() <= N && self.channel.with_write_buffer(|b| b.copy_from(data)).is_some()
    }

    /// Copy of the read buffer, `None` while a transfer is running.
    #[inline]
    pub fn read_buffer(&self) -> Option<TransferBuffer<N>> {
        self.channel.read_buffer()
    }

    /// Copies the front of the read buffer into `buf`.
    pub fn read_data(&self, buf: &mut [u8]) -> Option<usize> {
        self.channel.read_buffer().map(|b| b.copy_to(buf))
    }

    #[inline]
    pub fn last_error(&self) -> Option<Error> {
        self.channel.last_error()
    }

    fn can_start(&self) -> bool {
        !self.channel.state().is_in_progress()
            && !self.i2c.is_bus_busy()
            && !self.i2c.is_stop_pending()
    }

    /// Sends `n` bytes of the write buffer to `addr`, followed by a stop.
    ///
    /// Returns `false` without touching the module when a transfer is
    /// running, the bus is busy, a stop is still pending or `n` is not in
    /// `1..=N`.
    pub fn start_write(&mut self, addr: impl Into<Address>, n: usize) -> bool {
        if !Channel::<N, Error>::count_in_range(n) || !self.can_start() {
            return false;
        }
        let addr = addr.into();
        let i2c = &mut self.i2c;
        let channel = &self.channel;
        critical_section::with(|cs| {
            channel.begin(cs, Cursor::write(n));
            let mut d = channel.borrow(cs);
            let d = &mut *d;
            i2c.set_direction(Direction::Transmit);
            i2c.set_slave_addr(addr);
            d.cursor.fill(i2c, &d.write);
            i2c.set_byte_count(n);
            if !d.cursor.is_tx_done() {
                i2c.set_interrupt(Event::TxFifo, true);
            }
            i2c.send_start();
            i2c.send_stop();
        });
        true
    }

    /// Reads `n` bytes from `addr` into the read buffer, followed by a stop.
    ///
    /// Rejected under the same conditions as [`start_write`](Self::start_write).
    pub fn start_read(&mut self, addr: impl Into<Address>, n: usize) -> bool {
        if !Channel::<N, Error>::count_in_range(n) || !self.can_start() {
            return false;
        }
        let addr = addr.into();
        let i2c = &mut self.i2c;
        let channel = &self.channel;
        critical_section::with(|cs| {
            channel.begin(cs, Cursor::read(n));
            let d = channel.borrow(cs);
            i2c.flush_rx_fifo();
            i2c.set_direction(Direction::Receive);
            i2c.set_slave_addr(addr);
            i2c.set_byte_count(n);
            i2c.set_rx_threshold(d.cursor.rx_threshold(i2c.fifo_depth()));
            i2c.set_interrupt(Event::RxFifo, true);
            i2c.send_start();
            i2c.send_stop();
        });
        true
    }

    /// Sends `write_len` bytes, then reads `read_len` bytes after a
    /// repeated start, then stops.
    ///
    /// Both lengths have to be in `1..=N`.
    pub fn start_write_read(
        &mut self,
        addr: impl Into<Address>,
        write_len: usize,
        read_len: usize,
    ) -> bool {
        if !Channel::<N, Error>::count_in_range(write_len)
            || !Channel::<N, Error>::count_in_range(read_len)
            || !self.can_start()
        {
            return false;
        }
        let addr = addr.into();
        let i2c = &mut self.i2c;
        let channel = &self.channel;
        critical_section::with(|cs| {
            channel.begin(cs, Cursor::write_then_read(write_len, read_len));
            let mut d = channel.borrow(cs);
            let d = &mut *d;
            i2c.set_direction(Direction::Transmit);
            i2c.set_slave_addr(addr);
            d.cursor.fill(i2c, &d.write);
            i2c.set_byte_count(write_len);
            if !d.cursor.is_tx_done() {
                i2c.set_interrupt(Event::TxFifo, true);
            }
            // no stop, the handler continues with a repeated start
            i2c.set_interrupt(Event::AccessReady, true);
            i2c.send_start();
        });
        true
    }

    /// Waits until the channel leaves `InProgress`, see [`status`](Self::status).
    /// A timeout leaves the transfer running, use [`abort`](Self::abort) to
    /// stop it.
    pub fn wait(&mut self, timeout: MicrosDurationU32) -> Result<TransferState, Error> {
        let i2c = &self.i2c;
        let channel = &self.channel;
        os::wait_with::<OS, _>(&mut self.waiter, timeout, || {
            let state = if i2c.is_stop_pending() {
                TransferState::InProgress
            } else {
                channel.state()
            };
            (!state.is_in_progress()).then_some(state)
        })
        .ok_or(Error::Timeout)
    }

    /// Stops a running transfer, the channel ends in `Error` with
    /// [`Error::Timeout`] as cause. Returns `false` if nothing was running.
    pub fn abort(&mut self) -> bool {
        let i2c = &mut self.i2c;
        let channel = &self.channel;
        let aborted = critical_section::with(|cs| {
            if !channel.state().is_in_progress() {
                return false;
            }
            disable_transfer_interrupts(i2c);
            i2c.send_stop();
            channel.fail(cs, Error::Timeout)
        });
        if aborted {
            l::warn!("i2c: transfer aborted");
        }
        aborted
    }

    /// Bus time for `bytes` data bytes plus address and some slack.
    fn transaction_timeout(&self, bytes: usize) -> MicrosDurationU32 {
        self.byte_period * (bytes as u32 + 4) * 2
    }

    /// Runs a transfer that was just started to its end and turns the
    /// result into a `Result`. The channel is `Idle` afterwards.
    fn complete(&mut self, bytes: usize) -> Result<(), Error> {
        let rst = match self.wait(self.transaction_timeout(bytes)) {
            Ok(TransferState::Finished) => Ok(()),
            Ok(TransferState::Error) => Err(self.last_error().unwrap_or(Error::Other)),
            Ok(_) => Err(Error::Other),
            Err(e) => {
                self.abort();
                Err(e)
            }
        };
        self.reset_to_idle();
        rst
    }

    fn check_len(len: usize) -> Result<(), Error> {
        if Channel::<N, Error>::count_in_range(len) {
            Ok(())
        } else {
            Err(Error::Buffer)
        }
    }

    fn inner_transaction(
        &mut self,
        addr: Address,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        match operations {
            [] => Ok(()),
            [Operation::Write(data)] => {
                Self::check_len(data.len())?;
                self.set_write_data(data);
                if !self.start_write(addr, data.len()) {
                    return Err(Error::Busy);
                }
                self.complete(data.len())
            }
            [Operation::Read(buf)] => {
                Self::check_len(buf.len())?;
                if !self.start_read(addr, buf.len()) {
                    return Err(Error::Busy);
                }
                self.complete(buf.len())?;
                self.read_data(buf);
                Ok(())
            }
            [Operation::Write(data), Operation::Read(buf)] => {
                Self::check_len(data.len())?;
                Self::check_len(buf.len())?;
                self.set_write_data(data);
                if !self.start_write_read(addr, data.len(), buf.len()) {
                    return Err(Error::Busy);
                }
                self.complete(data.len() + buf.len())?;
                self.read_data(buf);
                Ok(())
            }
            // the sequencer only knows write, read and write-then-read
            _ => Err(Error::Other),
        }
    }
}

fn byte_period(clock: I2cClock) -> MicrosDurationU32 {
    // 9 clocks per byte, rounded up
    MicrosDurationU32::from_ticks((9_000_000 / clock.bus_hz()).max(1))
}

fn disable_transfer_interrupts(i2c: &mut impl I2cPeriph) {
    i2c.set_interrupt(Event::TxFifo, false);
    i2c.set_interrupt(Event::RxFifo, false);
    i2c.set_interrupt(Event::AccessReady, false);
}

// Implement embedded-hal traits ------------------------------------

impl<OS, I2C, const N: usize> i2c::ErrorType for I2cMaster<OS, I2C, N>
where
    OS: OsInterface,
    I2C: I2cPeriph,
{
    type Error = Error;
}

impl<OS, I2C, const N: usize> i2c::I2c<i2c::SevenBitAddress> for I2cMaster<OS, I2C, N>
where
    OS: OsInterface,
    I2C: I2cPeriph,
{
    #[inline]
    fn transaction(
        &mut self,
        address: i2c::SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.inner_transaction(Address::Seven(address), operations)
    }
}

impl<OS, I2C, const N: usize> i2c::I2c<i2c::TenBitAddress> for I2cMaster<OS, I2C, N>
where
    OS: OsInterface,
    I2C: I2cPeriph,
{
    #[inline]
    fn transaction(
        &mut self,
        address: i2c::TenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.inner_transaction(Address::Ten(address), operations)
    }
}

// Interrupt Handler ------------------------------------------------

pub struct InterruptHandler<OS: OsInterface, I2C, const N: usize = DEFAULT_BUFFER_SIZE> {
    i2c: I2C,
    channel: Arc<Channel<N, Error>>,
    notifier: OS::Notifier,
}

impl<OS, I2C, const N: usize> InterruptHandler<OS, I2C, N>
where
    OS: OsInterface,
    I2C: I2cPeriph,
{
    pub fn handler(&mut self) {
        let i2c = &mut self.i2c;
        let channel = &self.channel;
        let done = critical_section::with(|cs| {
            let stopped = i2c.get_and_clean_flag(Flag::StopDetected);

            if let Some(err) = i2c.get_and_clean_error() {
                i2c.send_stop();
                disable_transfer_interrupts(i2c);
                let failed = channel.fail(cs, err);
                if failed {
                    l::debug!("i2c: transfer failed");
                }
                return failed;
            }

            if !channel.state().is_in_progress() {
                i2c.get_and_clean_flag(Flag::AccessReady);
                return false;
            }

            let mut d = channel.borrow(cs);
            let d: &mut ChannelData<N, Error> = &mut d;
            if d.cursor.rx_len == 0 {
                // write phase
                d.cursor.fill(i2c, &d.write);
                if d.cursor.is_tx_done() {
                    i2c.set_interrupt(Event::TxFifo, false);
                }

                if d.cursor.pending_rx_len > 0 {
                    if i2c.get_and_clean_flag(Flag::AccessReady) {
                        i2c.set_interrupt(Event::AccessReady, false);
                        let n = d.cursor.start_pending_read();
                        i2c.set_direction(Direction::Receive);
                        i2c.set_byte_count(n);
                        i2c.set_rx_threshold(d.cursor.rx_threshold(i2c.fifo_depth()));
                        i2c.set_interrupt(Event::RxFifo, true);
                        i2c.send_repeated_start();
                        i2c.send_stop();
                    }
                    false
                } else if stopped && d.cursor.is_tx_done() {
                    channel.set_state(TransferState::Finished);
                    true
                } else {
                    false
                }
            } else {
                // read phase
                d.cursor.drain(i2c, &mut d.read);
                if d.cursor.is_rx_done() {
                    i2c.set_interrupt(Event::RxFifo, false);
                    channel.set_state(TransferState::Finished);
                    true
                } else {
                    i2c.set_rx_threshold(d.cursor.rx_threshold(i2c.fifo_depth()));
                    false
                }
            }
        });

        self.i2c.ack_interrupt();
        if done {
            self.notifier.notify_from_isr();
        }
    }
}
