use core::{marker::PhantomData, sync::atomic::AtomicUsize};

pub use core::sync::atomic::Ordering;

/// Stores a small `Copy` value in an [`AtomicUsize`] so it can be shared
/// between foreground code and an interrupt handler without locking.
pub struct AtomicCell<M: AtomicCellMember> {
    value: AtomicUsize,
    _m: PhantomData<M>,
}

unsafe impl<M: AtomicCellMember> Send for AtomicCell<M> {}
unsafe impl<M: AtomicCellMember> Sync for AtomicCell<M> {}

impl<M: AtomicCellMember> AtomicCell<M> {
    pub fn new(value: M) -> Self {
        Self {
            value: AtomicUsize::new(value.to_num()),
            _m: PhantomData,
        }
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> M {
        M::from_num(self.value.load(order))
    }

    #[inline]
    pub fn store(&self, value: M, order: Ordering) {
        self.value.store(value.to_num(), order);
    }
}

pub trait AtomicCellMember: Copy {
    fn to_num(self) -> usize;
    /// Values that were never produced by [`to_num`](Self::to_num) must map
    /// to some valid value instead of panicking.
    fn from_num(value: usize) -> Self;
}
