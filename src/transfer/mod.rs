//! Building blocks shared by the interrupt driven drivers.
//!
//! A channel owns one [`TransferState`], a write and a read
//! [`TransferBuffer`] and the [`Cursor`] of the running transfer. The
//! foreground handle and the interrupt handler of a driver both hold an
//! [`Arc`] of the same [`Channel`].
//!
//! # Sharing rules
//!
//! - The state is an [`AtomicCell`]. The handler publishes a terminal state
//!   with `Release` after it finished writing the buffers, the foreground
//!   reads it with `Acquire`.
//! - Buffers and cursor are only accessed inside a critical section.
//! - The foreground only writes buffers and cursor while the state is not
//!   [`TransferState::InProgress`]; the handler only writes them while it is.

mod buffer;
mod cursor;
mod state;

pub use buffer::*;
pub use cursor::*;
pub use state::*;

use crate::{
    atomic_cell::{AtomicCell, Ordering},
    os::Arc,
};
use core::cell::{RefCell, RefMut};
use critical_section::{CriticalSection, Mutex};

/// FIFO side of a peripheral.
pub trait FifoPeriph {
    /// Number of words the hardware FIFOs hold.
    fn fifo_depth(&self) -> usize;
    /// Free words in the TX FIFO.
    fn tx_fifo_space(&self) -> usize;
    /// Words waiting in the RX FIFO.
    fn rx_fifo_count(&self) -> usize;
    fn tx_fifo_push(&mut self, word: u8);
    fn rx_fifo_pop(&mut self) -> u8;
    /// The RX interrupt is raised when the RX FIFO holds at least `level`
    /// words.
    fn set_rx_threshold(&mut self, level: usize);

    /// Drop everything in the RX FIFO.
    fn flush_rx_fifo(&mut self) {
        while self.rx_fifo_count() > 0 {
            self.rx_fifo_pop();
        }
    }
}

/// Data of a channel that is guarded by a critical section.
pub struct ChannelData<const N: usize, E> {
    pub write: TransferBuffer<N>,
    pub read: TransferBuffer<N>,
    pub cursor: Cursor,
    pub error: Option<E>,
}

/// State shared by the foreground handle and the interrupt handler.
pub struct Channel<const N: usize, E> {
    state: AtomicCell<TransferState>,
    data: Mutex<RefCell<ChannelData<N, E>>>,
}

impl<const N: usize, E: Copy> Channel<N, E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AtomicCell::new(TransferState::Idle),
            data: Mutex::new(RefCell::new(ChannelData {
                write: TransferBuffer::new(),
                read: TransferBuffer::new(),
                cursor: Cursor::default(),
                error: None,
            })),
        })
    }

    /// `true` if `n` words fit into a buffer of this channel.
    #[inline]
    pub const fn count_in_range(n: usize) -> bool {
        n >= 1 && n <= N
    }

    #[inline]
    pub fn state(&self) -> TransferState {
        self.state.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_state(&self, state: TransferState) {
        self.state.store(state, Ordering::Release);
    }

    #[inline]
    pub fn borrow<'cs>(&'cs self, cs: CriticalSection<'cs>) -> RefMut<'cs, ChannelData<N, E>> {
        self.data.borrow_ref_mut(cs)
    }

    /// Marks the channel busy and initializes the cursor of a new transfer.
    /// The caller has already checked that the channel is not in progress.
    pub fn begin(&self, cs: CriticalSection<'_>, cursor: Cursor) {
        let mut d = self.borrow(cs);
        d.cursor = cursor;
        d.error = None;
        self.set_state(TransferState::InProgress);
    }

    /// Sets `Idle` unless a transfer is in progress.
    pub fn reset_to_idle(&self) -> bool {
        if self.state().is_in_progress() {
            false
        } else {
            self.set_state(TransferState::Idle);
            true
        }
    }

    /// Gives access to the write buffer unless a transfer is in progress.
    pub fn with_write_buffer<R>(&self, f: impl FnOnce(&mut TransferBuffer<N>) -> R) -> Option<R> {
        if self.state().is_in_progress() {
            return None;
        }
        Some(critical_section::with(|cs| f(&mut self.borrow(cs).write)))
    }

    /// Copy of the read buffer, `None` while a transfer is in progress.
    pub fn read_buffer(&self) -> Option<TransferBuffer<N>> {
        if self.state().is_in_progress() {
            return None;
        }
        Some(critical_section::with(|cs| self.borrow(cs).read))
    }

    pub fn init_write_buffer(&self) -> bool {
        self.with_write_buffer(|b| b.clear()).is_some()
    }

    pub fn init_read_buffer(&self) -> bool {
        if self.state().is_in_progress() {
            return false;
        }
        critical_section::with(|cs| self.borrow(cs).read.clear());
        true
    }

    /// Words stored in the read buffer by the last transfer.
    pub fn received(&self) -> usize {
        critical_section::with(|cs| self.borrow(cs).cursor.received())
    }

    /// Cause of the last [`TransferState::Error`].
    pub fn last_error(&self) -> Option<E> {
        critical_section::with(|cs| self.borrow(cs).error)
    }

    /// Ends the running transfer with `Error`. Does nothing if no transfer
    /// is in progress. Returns `true` if the state was changed.
    pub fn fail(&self, cs: CriticalSection<'_>, err: E) -> bool {
        if !self.state().is_in_progress() {
            return false;
        }
        self.borrow(cs).error = Some(err);
        self.set_state(TransferState::Error);
        true
    }
}
