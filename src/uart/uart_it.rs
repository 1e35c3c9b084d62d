//! UART interrupt implementation

use super::*;
use crate::{
    Steal,
    os::{self, Arc, MicrosDurationU32, NotifierIsr, OsInterface, TimeoutStatus},
    transfer::{Channel, ChannelData, Cursor, TransferBuffer, TransferState},
};
use core::sync::atomic::{AtomicU32, Ordering};
use embedded_io::{ErrorType, Read, Write};

/// Capacity of the channel buffers when not given.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Idle line time, in words, after which a reception counts as complete.
pub const MESSAGE_GAP_WORDS: usize = 2;

// Wrapper ----------------------------------------------------------

pub struct Uart<U> {
    uart: U,
    config: Config,
}

impl<U> Uart<U>
where
    U: UartPeriph + Steal,
{
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            config: Config::default(),
        }
    }

    /// Programs frame format and baud divider. Both directions stay
    /// disabled until a transfer is started.
    pub fn init(&mut self, config: &Config, clocks: &Clocks) {
        self.uart.set_interrupt(Event::TxFifo, false);
        self.uart.set_interrupt(Event::RxFifo, false);
        self.uart.enable_tx(false);
        self.uart.enable_rx(false);
        self.uart.config(config, config.divider(clocks));
        self.config = *config;
    }

    /// Splits into the TX channel, the RX channel and their interrupt
    /// handlers. The [`RxTimer`] drives the reception timeout.
    #[allow(clippy::type_complexity)]
    pub fn into_tx_rx<OS: OsInterface, const N: usize>(
        self,
    ) -> (
        UartTx<OS, U, N>,
        UartTxHandler<OS, U, N>,
        UartRx<OS, U, N>,
        UartRxHandler<OS, U, N>,
        RxTimer,
    ) {
        let (tx, tx_it) = unsafe { UartTx::new(self.uart.steal(), self.config) };
        let (rx, rx_it, timer) = UartRx::new(self.uart, self.config);
        (tx, tx_it, rx, rx_it, timer)
    }
}

// RX timer ---------------------------------------------------------

/// Countdown of a running reception, in ticks of whatever periodic
/// interrupt calls [`tick`](Self::tick).
#[derive(Clone)]
pub struct RxTimer {
    countdown: Arc<AtomicU32>,
}

impl RxTimer {
    const DISARMED: u32 = u32::MAX;

    fn new() -> Self {
        Self {
            countdown: Arc::new(AtomicU32::new(Self::DISARMED)),
        }
    }

    /// Decrements the countdown unless it is disarmed or already expired.
    pub fn tick(&self) {
        let _ = self
            .countdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| match v {
                0 | Self::DISARMED => None,
                v => Some(v - 1),
            });
    }

    fn arm(&self, ticks: Option<u32>) {
        let ticks = ticks.map_or(Self::DISARMED, |t| t.min(Self::DISARMED - 1));
        self.countdown.store(ticks, Ordering::Release);
    }

    fn disarm(&self) {
        self.countdown.store(Self::DISARMED, Ordering::Release);
    }

    pub fn is_expired(&self) -> bool {
        self.countdown.load(Ordering::Acquire) == 0
    }

    /// Ticks left, `None` when disarmed.
    pub fn remaining(&self) -> Option<u32> {
        match self.countdown.load(Ordering::Acquire) {
            Self::DISARMED => None,
            v => Some(v),
        }
    }
}

// TX ---------------------------------------------------------------

pub struct UartTx<OS: OsInterface, U, const N: usize = DEFAULT_BUFFER_SIZE> {
    uart: U,
    channel: Arc<Channel<N, Error>>,
    waiter: OS::NotifyReceiver,
    timeout: MicrosDurationU32,
}

impl<OS, U, const N: usize> UartTx<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph + Steal,
{
    fn new(uart: U, config: Config) -> (Self, UartTxHandler<OS, U, N>) {
        let (notifier, waiter) = OS::notifier();
        let channel = Channel::new();
        let it = UartTxHandler {
            uart: unsafe { uart.steal() },
            channel: Arc::clone(&channel),
            notifier,
        };
        (
            Self {
                uart,
                channel,
                waiter,
                timeout: calculate_timeout(&config, N + 4),
            },
            it,
        )
    }
}

impl<OS, U, const N: usize> UartTx<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph,
{
    /// Reports `InProgress` until the last word left the shift register.
    pub fn status(&self) -> TransferState {
        tx_status(&self.uart, &self.channel)
    }

    #[inline]
    pub fn reset_to_idle(&mut self) -> bool {
        self.channel.reset_to_idle()
    }

    #[inline]
    pub fn init_write_buffer(&mut self) -> bool {
        self.channel.init_write_buffer()
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
    pub fn last_error(&self) -> Option<Error> {
        self.channel.last_error()
    }

    /// Sends the first `n` words of the write buffer.
    ///
    /// Returns `false` while the previous transmission is still running or
    /// still shifting out, or when `n` is not in `1..=N`.
    pub fn start_transmit(&mut self, n: usize) -> bool {
        if !Channel::<N, Error>::count_in_range(n) || self.status().is_in_progress() {
            return false;
        }

        let uart = &mut self.uart;
        let channel = &self.channel;
        critical_section::with(|cs| {
            channel.begin(cs, Cursor::write(n));
            let mut d = channel.borrow(cs);
            let d = &mut *d;
            uart.enable_tx(true);
            d.cursor.fill(uart, &d.write);
            uart.set_interrupt(Event::TxFifo, true);
        });
        true
    }

    pub fn wait(&mut self, timeout: MicrosDurationU32) -> Result<TransferState, Error> {
        let uart = &self.uart;
        let channel = &self.channel;
        os::wait_with::<OS, _>(&mut self.waiter, timeout, || {
            let state = tx_status(uart, channel);
            (!state.is_in_progress()).then_some(state)
        })
        .ok_or(Error::Timeout)
    }

    /// Stops refilling the TX FIFO. Words already in the FIFO still go out.
    pub fn abort(&mut self) -> bool {
        let uart = &mut self.uart;
        let channel = &self.channel;
        let aborted = critical_section::with(|cs| {
            if !channel.state().is_in_progress() {
                return false;
            }
            uart.set_interrupt(Event::TxFifo, false);
            channel.fail(cs, Error::Timeout)
        });
        if aborted {
            l::warn!("uart: transmission aborted");
        }
        aborted
    }
}

fn tx_status<U: UartPeriph, const N: usize>(
    uart: &U,
    channel: &Channel<N, Error>,
) -> TransferState {
    let state = channel.state();
    if !state.is_in_progress() && !uart.is_tx_complete() {
        TransferState::InProgress
    } else {
        state
    }
}

impl<OS: OsInterface, U: UartPeriph, const N: usize> ErrorType for UartTx<OS, U, N> {
    type Error = Error;
}

impl<OS, U, const N: usize> Write for UartTx<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph,
{
    /// Queues up to `N` words and returns without waiting for them to be
    /// sent.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        match self.wait(self.timeout) {
            Ok(TransferState::Error) => {
                self.reset_to_idle();
                return Err(self.last_error().unwrap_or(Error::Other));
            }
            Ok(_) => {}
            Err(_) => return Err(Error::Busy),
        }
        self.reset_to_idle();

        let n = buf.len().min(N);
        self.set_write_data(&buf[..n]);
        if self.start_transmit(n) {
            Ok(n)
        } else {
            Err(Error::Busy)
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match self.wait(self.timeout) {
            Ok(TransferState::Error) => Err(self.last_error().unwrap_or(Error::Other)),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// TX interrupt -----------------

pub struct UartTxHandler<OS: OsInterface, U, const N: usize = DEFAULT_BUFFER_SIZE> {
    uart: U,
    channel: Arc<Channel<N, Error>>,
    notifier: OS::Notifier,
}

impl<OS, U, const N: usize> UartTxHandler<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph,
{
    pub fn handler(&mut self) {
        let uart = &mut self.uart;
        let channel = &self.channel;
        let done = critical_section::with(|cs| {
            if !channel.state().is_in_progress() {
                uart.set_interrupt(Event::TxFifo, false);
                return false;
            }

            let mut d = channel.borrow(cs);
            let d: &mut ChannelData<N, Error> = &mut d;
            if d.cursor.is_tx_done() {
                // the shift register may still be busy, `status` covers that
                uart.set_interrupt(Event::TxFifo, false);
                channel.set_state(TransferState::Finished);
                return true;
            }
            d.cursor.fill(uart, &d.write);
            false
        });

        self.uart.ack_interrupt(Event::TxFifo);
        if done {
            self.notifier.notify_from_isr();
        }
    }
}

// RX ---------------------------------------------------------------

/// Progress seen by the previous status poll.
struct RxProgress<T> {
    received: usize,
    fifo_count: usize,
    /// Started whenever a poll sees new words.
    quiet: Option<T>,
}

impl<T> RxProgress<T> {
    const fn new() -> Self {
        Self {
            received: 0,
            fifo_count: 0,
            quiet: None,
        }
    }
}

pub struct UartRx<OS: OsInterface, U, const N: usize = DEFAULT_BUFFER_SIZE> {
    uart: U,
    channel: Arc<Channel<N, Error>>,
    timer: RxTimer,
    progress: RxProgress<OS::Timeout>,
    waiter: OS::NotifyReceiver,
    timeout: MicrosDurationU32,
    gap: MicrosDurationU32,
}

impl<OS, U, const N: usize> UartRx<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph + Steal,
{
    fn new(uart: U, config: Config) -> (Self, UartRxHandler<OS, U, N>, RxTimer) {
        let (notifier, waiter) = OS::notifier();
        let channel = Channel::new();
        let timer = RxTimer::new();
        let it = UartRxHandler {
            uart: unsafe { uart.steal() },
            channel: Arc::clone(&channel),
            timer: timer.clone(),
            notifier,
        };
        (
            Self {
                uart,
                channel,
                timer: timer.clone(),
                progress: RxProgress::new(),
                waiter,
                timeout: calculate_timeout(&config, N + 4),
                gap: calculate_timeout(&config, MESSAGE_GAP_WORDS),
            },
            it,
            timer,
        )
    }
}

impl<OS, U, const N: usize> UartRx<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph,
{
    /// Evaluates a running reception and returns the channel state.
    ///
    /// Once some data has arrived and neither the word count nor the RX
    /// FIFO level changed for the line time of [`MESSAGE_GAP_WORDS`] words,
    /// the message is taken as complete: the FIFO is drained and the channel
    /// ends `Finished` with [`received`](Self::received) below the requested
    /// count. When the [`RxTimer`] expired the channel ends in `Error` with
    /// [`Error::Timeout`].
    pub fn status(&mut self) -> TransferState {
        rx_status::<OS, _, N>(
            &mut self.uart,
            &self.channel,
            &self.timer,
            &mut self.progress,
            self.gap,
        )
    }

    #[inline]
    pub fn reset_to_idle(&mut self) -> bool {
        self.channel.reset_to_idle()
    }

    #[inline]
    pub fn init_read_buffer(&mut self) -> bool {
        self.channel.init_read_buffer()
    }

    #[inline]
    pub fn read_buffer(&self) -> Option<TransferBuffer<N>> {
        self.channel.read_buffer()
    }

    pub fn read_data(&self, buf: &mut [u8]) -> Option<usize> {
        self.channel.read_buffer().map(|b| b.copy_to(buf))
    }

    #[inline]
    pub fn received(&self) -> usize {
        self.channel.received()
    }

    #[inline]
    pub fn last_error(&self) -> Option<Error> {
        self.channel.last_error()
    }

    /// Receives up to `n` words. `timeout` is the number of [`RxTimer`]
    /// ticks after which the reception is stopped, `None` waits forever.
    ///
    /// Stale words in the RX FIFO are dropped. Returns `false` while a
    /// reception is running or when `n` is not in `1..=N`.
    pub fn start_receive(&mut self, n: usize, timeout: Option<u32>) -> bool {
        if !Channel::<N, Error>::count_in_range(n) || self.channel.state().is_in_progress() {
            return false;
        }

        let uart = &mut self.uart;
        let channel = &self.channel;
        let timer = &self.timer;
        let progress = &mut self.progress;
        critical_section::with(|cs| {
            channel.begin(cs, Cursor::read(n));
            let d = channel.borrow(cs);
            uart.flush_rx_fifo();
            uart.get_and_clean_error();
            *progress = RxProgress::new();
            timer.arm(timeout);
            uart.set_rx_threshold(d.cursor.rx_threshold(uart.fifo_depth()));
            uart.set_interrupt(Event::RxFifo, true);
            uart.enable_rx(true);
        });
        true
    }

    /// Polls [`status`](Self::status) until the reception ends. A timeout
    /// leaves the reception running.
    pub fn wait(&mut self, timeout: MicrosDurationU32) -> Result<TransferState, Error> {
        let uart = &mut self.uart;
        let channel = &self.channel;
        let timer = &self.timer;
        let progress = &mut self.progress;
        let gap = self.gap;
        os::wait_with::<OS, _>(&mut self.waiter, timeout, || {
            let state = rx_status::<OS, _, N>(uart, channel, timer, progress, gap);
            (!state.is_in_progress()).then_some(state)
        })
        .ok_or(Error::Timeout)
    }

    /// Stops a running reception, the channel ends in `Error` with
    /// [`Error::Timeout`].
    pub fn abort(&mut self) -> bool {
        let uart = &mut self.uart;
        let channel = &self.channel;
        let timer = &self.timer;
        let aborted = critical_section::with(|cs| {
            if !channel.state().is_in_progress() {
                return false;
            }
            stop_rx(uart, timer);
            channel.fail(cs, Error::Timeout)
        });
        if aborted {
            l::warn!("uart: reception aborted");
        }
        aborted
    }
}

fn stop_rx<U: UartPeriph>(uart: &mut U, timer: &RxTimer) {
    uart.enable_rx(false);
    uart.set_interrupt(Event::RxFifo, false);
    timer.disarm();
}

fn rx_status<OS: OsInterface, U: UartPeriph, const N: usize>(
    uart: &mut U,
    channel: &Channel<N, Error>,
    timer: &RxTimer,
    progress: &mut RxProgress<OS::Timeout>,
    gap: MicrosDurationU32,
) -> TransferState {
    if !channel.state().is_in_progress() {
        return channel.state();
    }

    critical_section::with(|cs| {
        // the handler may have finished in the meantime
        if !channel.state().is_in_progress() {
            return;
        }

        let ended = {
            let mut d = channel.borrow(cs);
            let d: &mut ChannelData<N, Error> = &mut d;
            let received = d.cursor.rx_i;
            let fifo_count = uart.rx_fifo_count();
            if received != progress.received || fifo_count != progress.fifo_count {
                progress.received = received;
                progress.fifo_count = fifo_count;
                progress.quiet = Some(OS::start_timeout(gap));
            }

            let quiet = progress.quiet.as_mut().is_some_and(|t| t.timeout());
            if quiet && (received > 0 || fifo_count > 0) {
                d.cursor.drain(uart, &mut d.read);
                true
            } else {
                false
            }
        };

        if ended {
            stop_rx(uart, timer);
            l::debug!("uart: message ended early");
            channel.set_state(TransferState::Finished);
        } else if timer.is_expired() {
            stop_rx(uart, timer);
            channel.fail(cs, Error::Timeout);
        }
    });
    channel.state()
}

impl<OS: OsInterface, U: UartPeriph, const N: usize> ErrorType for UartRx<OS, U, N> {
    type Error = Error;
}

impl<OS, U, const N: usize> Read for UartRx<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph,
{
    /// Receives up to `min(buf.len(), N)` words and returns once they all
    /// arrived or the line went quiet after at least one word.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.channel.reset_to_idle() {
            return Err(Error::Busy);
        }

        let n = buf.len().min(N);
        if !self.start_receive(n, None) {
            return Err(Error::Busy);
        }

        let rst = match self.wait(self.timeout) {
            Ok(TransferState::Finished) => {
                let n = self.received().min(n);
                self.read_data(&mut buf[..n]);
                Ok(n)
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
}

// RX interrupt -----------------

pub struct UartRxHandler<OS: OsInterface, U, const N: usize = DEFAULT_BUFFER_SIZE> {
    uart: U,
    channel: Arc<Channel<N, Error>>,
    timer: RxTimer,
    notifier: OS::Notifier,
}

impl<OS, U, const N: usize> UartRxHandler<OS, U, N>
where
    OS: OsInterface,
    U: UartPeriph,
{
    pub fn handler(&mut self) {
        let uart = &mut self.uart;
        let channel = &self.channel;
        let timer = &self.timer;
        let done = critical_section::with(|cs| {
            if let Some(err) = uart.get_and_clean_error() {
                if !channel.state().is_in_progress() {
                    return false;
                }
                stop_rx(uart, timer);
                l::debug!("uart: reception failed");
                return channel.fail(cs, err);
            }

            if !channel.state().is_in_progress() {
                return false;
            }

            let mut d = channel.borrow(cs);
            let d: &mut ChannelData<N, Error> = &mut d;
            d.cursor.drain(uart, &mut d.read);
            if d.cursor.is_rx_done() {
                stop_rx(uart, timer);
                channel.set_state(TransferState::Finished);
                true
            } else {
                uart.set_rx_threshold(d.cursor.rx_threshold(uart.fifo_depth()));
                false
            }
        });

        self.uart.ack_interrupt(Event::RxFifo);
        if done {
            self.notifier.notify_from_isr();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock::MockUart, os::FakeOs, prelude::*};

    type Parts<const N: usize> = (
        UartTx<FakeOs, MockUart, N>,
        UartTxHandler<FakeOs, MockUart, N>,
        UartRx<FakeOs, MockUart, N>,
        UartRxHandler<FakeOs, MockUart, N>,
        RxTimer,
    );

    fn setup<const N: usize>() -> (Parts<N>, MockUart) {
        let periph = MockUart::new(16);
        let dev = periph.clone();
        let mut uart = Uart::new(periph);
        uart.init(&Config::default(), &Clocks::default());
        (uart.into_tx_rx::<FakeOs, N>(), dev)
    }

    #[test]
    fn init_configures_module() {
        let (_, dev) = setup::<64>();
        let regs = dev.regs();
        assert_eq!(regs.config, Some((Config::default(), 53)));
        assert!(!regs.tx_enabled);
        assert!(!regs.rx_enabled);
    }

    #[test]
    fn transmit_longer_than_fifo() {
        let ((mut tx, mut tx_it, ..), dev) = setup::<64>();
        let data: Vec<u8> = (0..20).collect();
        assert!(tx.set_write_data(&data));
        assert!(tx.start_transmit(20));
        assert!(dev.regs().tx_enabled);
        assert!(dev.regs().interrupt(Event::TxFifo));
        assert!(!tx.start_transmit(1));

        let mut sent = dev.shift_out();
        assert_eq!(sent.len(), 16);
        tx_it.handler();
        assert_eq!(tx.status(), TransferState::InProgress);
        sent.extend(dev.shift_out());
        tx_it.handler();
        assert_eq!(sent, data);
        assert!(!dev.regs().interrupt(Event::TxFifo));

        // last word still in the shift register
        assert_eq!(tx.status(), TransferState::InProgress);
        assert!(!tx.start_transmit(1));
        dev.line_idle();
        assert_eq!(tx.status(), TransferState::Finished);
        assert!(tx.reset_to_idle());
        assert_eq!(tx.status(), TransferState::Idle);
    }

    #[test]
    fn abort_transmission() {
        let ((mut tx, mut tx_it, ..), dev) = setup::<64>();
        assert!(!tx.abort());
        let data: Vec<u8> = (0..20).collect();
        assert!(tx.set_write_data(&data));
        assert!(tx.start_transmit(20));
        assert_eq!(dev.shift_out().len(), 16);

        assert!(tx.abort());
        assert!(!dev.regs().interrupt(Event::TxFifo));
        assert_eq!(tx.last_error(), Some(Error::Timeout));
        // a late interrupt does not refill
        tx_it.handler();
        assert!(dev.regs().fifo.tx_is_empty());
        dev.line_idle();
        assert_eq!(tx.status(), TransferState::Error);
        assert!(!tx.abort());
        assert!(tx.reset_to_idle());
        assert!(tx.start_transmit(4));
    }

    #[test]
    fn transmit_count_bounds() {
        let ((mut tx, ..), dev) = setup::<64>();
        let writes = dev.regs().writes;
        assert!(!tx.start_transmit(0));
        assert!(!tx.start_transmit(65));
        assert_eq!(dev.regs().writes, writes);
    }

    #[test]
    fn receive_in_chunks() {
        let ((_, _, mut rx, mut rx_it, _), dev) = setup::<64>();
        dev.feed_rx(&[0xEE, 0xEE]);
        assert!(rx.start_receive(20, None));
        assert!(dev.regs().rx_enabled);
        assert_eq!(dev.regs().fifo.rx_threshold, 16);
        // stale words were dropped
        assert_eq!(dev.regs().fifo.rx_fifo_count(), 0);

        dev.feed_rx(&(0..16).collect::<Vec<u8>>());
        rx_it.handler();
        assert_eq!(dev.regs().fifo.rx_threshold, 4);
        assert_eq!(rx.status(), TransferState::InProgress);

        dev.feed_rx(&[16, 17, 18, 19]);
        rx_it.handler();
        assert_eq!(rx.status(), TransferState::Finished);
        assert!(!dev.regs().rx_enabled);
        assert_eq!(rx.received(), 20);
        assert_eq!(&rx.read_buffer().unwrap()[..20], &(0..20).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn message_ends_early() {
        let ((_, _, mut rx, _rx_it, _), dev) = setup::<64>();
        assert!(rx.start_receive(10, None));
        assert_eq!(rx.status(), TransferState::InProgress);

        // below the threshold, no interrupt
        dev.feed_rx(&[1, 2, 3]);
        // each poll of the fake clock is 1 µs, the gap is 174 µs
        for _ in 0..100 {
            assert_eq!(rx.status(), TransferState::InProgress);
        }
        assert_eq!(rx.wait(1_000.micros()), Ok(TransferState::Finished));
        assert_eq!(rx.received(), 3);
        assert_eq!(&rx.read_buffer().unwrap()[..4], &[1, 2, 3, 0]);
        assert!(!dev.regs().rx_enabled);
    }

    #[test]
    fn slow_words_do_not_end_message() {
        let ((_, _, mut rx, mut rx_it, _), dev) = setup::<64>();
        assert!(rx.start_receive(10, None));
        for i in 0..10 {
            assert_eq!(rx.status(), TransferState::InProgress);
            dev.feed_rx(&[i]);
            rx_it.handler();
            if i < 9 {
                // words keep arriving within the gap
                for _ in 0..150 {
                    assert_eq!(rx.status(), TransferState::InProgress);
                }
            }
        }
        assert_eq!(rx.status(), TransferState::Finished);
        assert_eq!(rx.received(), 10);
        assert_eq!(&rx.read_buffer().unwrap()[..10], &(0..10).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn reception_times_out() {
        let ((_, _, mut rx, _rx_it, timer), dev) = setup::<64>();
        assert!(rx.start_receive(4, Some(2)));
        assert_eq!(timer.remaining(), Some(2));
        timer.tick();
        assert_eq!(rx.status(), TransferState::InProgress);
        timer.tick();
        timer.tick();
        assert!(timer.is_expired());
        assert_eq!(rx.status(), TransferState::Error);
        assert_eq!(rx.last_error(), Some(Error::Timeout));
        assert_eq!(timer.remaining(), None);
        assert!(!dev.regs().rx_enabled);

        assert!(rx.reset_to_idle());
        assert!(rx.start_receive(4, None));
        timer.tick();
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn receive_error_stops_reception() {
        let ((_, _, mut rx, mut rx_it, _), dev) = setup::<64>();
        assert!(rx.start_receive(4, None));
        dev.feed_rx(&[1, 2]);
        dev.regs().error = Some(Error::FrameFormat);
        rx_it.handler();
        assert_eq!(rx.status(), TransferState::Error);
        assert_eq!(rx.last_error(), Some(Error::FrameFormat));
        assert_eq!(rx.received(), 0);
        assert!(!rx.start_receive(65, None));
    }

    #[test]
    fn io_traits() {
        let ((mut tx, mut tx_it, mut rx, _rx_it, _), dev) = setup::<8>();
        assert_eq!(tx.write(&[]), Ok(0));
        assert_eq!(tx.write(&(0..12).collect::<Vec<u8>>()), Ok(8));
        assert_eq!(dev.shift_out(), (0..8).collect::<Vec<u8>>());
        // no interrupt, the flush runs into its timeout
        assert_eq!(tx.flush(), Err(Error::Timeout));
        tx_it.handler();
        dev.line_idle();
        assert_eq!(tx.flush(), Ok(()));

        dev.feed_rx(&[0xAA]);
        let mut buf = [0; 4];
        // the stale word is dropped before the reception starts
        assert_eq!(rx.read(&mut buf), Err(Error::Timeout));
        assert_eq!(rx.status(), TransferState::Idle);
    }
}
