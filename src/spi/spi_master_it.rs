use super::*;
use crate::{
    Steal,
    os::{self, Arc, MicrosDurationU32, NotifierIsr, OsInterface},
    transfer::{Channel, ChannelData, Cursor, TransferBuffer, TransferState},
};

/// Capacity of the channel buffers when not given.
pub const DEFAULT_BUFFER_SIZE: usize = 50;

// Master -----------------------------------------------------------

pub struct SpiMaster<OS: OsInterface, SPI, const N: usize = DEFAULT_BUFFER_SIZE> {
    spi: SPI,
    channel: Arc<Channel<N, Error>>,
    waiter: OS::NotifyReceiver,
    byte_period: MicrosDurationU32,
}

impl<OS, SPI, const N: usize> SpiMaster<OS, SPI, N>
where
    OS: OsInterface,
    SPI: SpiPeriph + Steal,
{
    pub fn new(spi: SPI) -> (Self, InterruptHandler<OS, SPI, N>) {
        let (notifier, waiter) = OS::notifier();
        let channel = Channel::new();
        let it = InterruptHandler {
            spi: unsafe { spi.steal() },
            channel: Arc::clone(&channel),
            notifier,
        };
        let byte_period = byte_period(Config::default().bitrate);
        (
            Self {
                spi,
                channel,
                waiter,
                byte_period,
            },
            it,
        )
    }
}

impl<OS, SPI, const N: usize> SpiMaster<OS, SPI, N>
where
    OS: OsInterface,
    SPI: SpiPeriph,
{
    /// Configures the module, releases both slave selects, clears both
    /// buffers and sets the channel `Idle`.
    pub fn init(&mut self, config: &Config, clocks: &Clocks) {
        self.spi.set_interrupt(Event::RxFifo, false);
        self.spi.deselect_all();
        self.spi.config(config.mode, config.baud_register(clocks));
        self.spi.set_interrupt(Event::Overrun, true);
        self.byte_period = byte_period(config.actual_bitrate(clocks));
        critical_section::with(|cs| {
            let mut d = self.channel.borrow(cs);
            d.write.clear();
            d.read.clear();
            d.cursor = Cursor::default();
            d.error = None;
        });
        self.channel.set_state(TransferState::Idle);
    }

    #[inline]
    pub fn status(&self) -> TransferState {
        self.channel.state()
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

    #[inline]
    pub fn with_write_buffer<R>(
        &mut self,
        f: impl FnOnce(&mut TransferBuffer<N>) -> R,
    ) -> Option<R> {
        self.channel.with_write_buffer(f)
    }

    pub fn set_write_data(&mut self, data: &[u8]) -> bool {
        data.len() <= N && self.channel.with_write_buffer(|b| b.copy_from(data)).is_some()
    }

    #[inline]
    pub fn read_buffer(&self) -> Option<TransferBuffer<N>> {
        self.channel.read_buffer()
    }

    pub fn read_data(&self, buf: &mut [u8]) -> Option<usize> {
        self.channel.read_buffer().map(|b| b.copy_to(buf))
    }

    /// Words stored in the read buffer by the last transfer.
    #[inline]
    pub fn received(&self) -> usize {
        self.channel.received()
    }

    #[inline]
    pub fn last_error(&self) -> Option<Error> {
        self.channel.last_error()
    }

    /// Exchanges `n` words: the first `n` words of the write buffer go out,
    /// the words clocked in land in the read buffer.
    ///
    /// Returns `false` without touching the module when a transfer is
    /// running, the module is still shifting or `n` is not in `1..=N`.
    pub fn start_transfer(&mut self, slave: SlaveSelect, n: usize) -> bool {
        Channel::<N, Error>::count_in_range(n) && self.start(slave, Cursor::duplex(n))
    }

    /// Sends `n` words of the write buffer, the words clocked in are
    /// dropped and the read buffer stays untouched.
    pub fn start_write(&mut self, slave: SlaveSelect, n: usize) -> bool {
        Channel::<N, Error>::count_in_range(n) && self.start(slave, Cursor::duplex_write(n))
    }

    /// Clocks out `n` dummy words and stores the words clocked in.
    pub fn start_read(&mut self, slave: SlaveSelect, n: usize) -> bool {
        Channel::<N, Error>::count_in_range(n) && self.start(slave, Cursor::duplex_read(n))
    }

    /// Sends `write_len` words, then clocks out `read_len` dummy words
    /// within the same slave select. Only the words clocked in during the
    /// second part are stored, from the start of the read buffer.
    pub fn start_write_read(
        &mut self,
        slave: SlaveSelect,
        write_len: usize,
        read_len: usize,
    ) -> bool {
        Channel::<N, Error>::count_in_range(write_len)
            && Channel::<N, Error>::count_in_range(read_len)
            && self.start(slave, Cursor::duplex_write_read(write_len, read_len))
    }

    fn start(&mut self, slave: SlaveSelect, cursor: Cursor) -> bool {
        if self.channel.state().is_in_progress() || self.spi.is_busy() {
            return false;
        }

        let spi = &mut self.spi;
        let channel = &self.channel;
        critical_section::with(|cs| {
            channel.begin(cs, cursor);
            let mut d = channel.borrow(cs);
            let d = &mut *d;
            spi.flush_rx_fifo();
            spi.select(slave);
            d.cursor.fill(spi, &d.write);
            spi.set_rx_threshold(d.cursor.rx_threshold(spi.fifo_depth()));
            spi.set_interrupt(Event::RxFifo, true);
        });
        true
    }

    /// Waits until the channel leaves `InProgress`. A timeout leaves the
    /// transfer running.
    pub fn wait(&mut self, timeout: MicrosDurationU32) -> Result<TransferState, Error> {
        let channel = &self.channel;
        os::wait_with::<OS, _>(&mut self.waiter, timeout, || {
            let state = channel.state();
            (!state.is_in_progress()).then_some(state)
        })
        .ok_or(Error::Timeout)
    }

    /// Stops a running transfer and releases the slave select. The channel
    /// ends in `Error` with [`Error::Timeout`] as cause.
    pub fn abort(&mut self) -> bool {
        let spi = &mut self.spi;
        let channel = &self.channel;
        let aborted = critical_section::with(|cs| {
            if !channel.state().is_in_progress() {
                return false;
            }
            spi.set_interrupt(Event::RxFifo, false);
            spi.deselect_all();
            channel.fail(cs, Error::Timeout)
        });
        if aborted {
            l::warn!("spi: transfer aborted");
        }
        aborted
    }

    /// Full duplex exchange of `buf` with `slave`, blocking up to `timeout`.
    /// The channel is `Idle` afterwards.
    pub fn transfer_in_place(
        &mut self,
        slave: SlaveSelect,
        buf: &mut [u8],
        timeout: MicrosDurationU32,
    ) -> Result<(), Error> {
        if !Channel::<N, Error>::count_in_range(buf.len()) {
            return Err(Error::Buffer);
        }
        self.set_write_data(buf);
        if !self.start_transfer(slave, buf.len()) {
            return Err(Error::Busy);
        }

        let rst = match self.wait(timeout) {
            Ok(TransferState::Finished) => {
                self.read_data(buf);
                Ok(())
            }
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

    /// Time one word takes on the bus.
    #[inline]
    pub fn byte_period(&self) -> MicrosDurationU32 {
        self.byte_period
    }
}

fn byte_period(bitrate: HertzU32) -> MicrosDurationU32 {
    MicrosDurationU32::from_ticks(8_000_000_u32.div_ceil(bitrate.raw().max(1)))
}

// Interrupt Handler ------------------------------------------------

pub struct InterruptHandler<OS: OsInterface, SPI, const N: usize = DEFAULT_BUFFER_SIZE> {
    spi: SPI,
    channel: Arc<Channel<N, Error>>,
    notifier: OS::Notifier,
}

impl<OS, SPI, const N: usize> InterruptHandler<OS, SPI, N>
where
    OS: OsInterface,
    SPI: SpiPeriph,
{
    pub fn handler(&mut self) {
        let spi = &mut self.spi;
        let channel = &self.channel;
        let done = critical_section::with(|cs| {
            if let Some(err) = spi.get_and_clean_error() {
                if !channel.state().is_in_progress() {
                    return false;
                }
                spi.set_interrupt(Event::RxFifo, false);
                spi.deselect_all();
                l::debug!("spi: transfer failed");
                return channel.fail(cs, err);
            }

            if !channel.state().is_in_progress() {
                return false;
            }

            let mut d = channel.borrow(cs);
            let d: &mut ChannelData<N, Error> = &mut d;
            d.cursor.drain(spi, &mut d.read);
            if d.cursor.is_rx_done() {
                spi.set_interrupt(Event::RxFifo, false);
                spi.deselect_all();
                channel.set_state(TransferState::Finished);
                true
            } else {
                d.cursor.fill(spi, &d.write);
                spi.set_rx_threshold(d.cursor.rx_threshold(spi.fifo_depth()));
                false
            }
        });

        self.spi.ack_interrupt();
        if done {
            self.notifier.notify_from_isr();
        }
    }
}
