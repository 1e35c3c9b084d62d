use super::*;
use core::marker::PhantomData;
cfg_if::cfg_if! {
    if #[cfg(any(test, feature = "std"))] {
        pub use std::sync::Arc;
    } else {
        pub use alloc::sync::Arc;
    }
}

// Raw --------------------------------------------------------------

/// Bare metal implementation without a scheduler. Waiting spins on an
/// atomic flag and timeouts are measured with the tick source `T`.
pub struct RawOs<T> {
    _t: PhantomData<fn() -> T>,
}

impl<T: TickInstant + 'static> OsInterface for RawOs<T> {
    type Notifier = AtomicNotifier;
    type NotifyReceiver = AtomicNotifyReceiver<T>;
    type Timeout = TickTimeoutStatus<T>;

    fn start_timeout(dur: MicrosDurationU32) -> Self::Timeout {
        TickTimeoutStatus::new(dur)
    }

    fn notifier() -> (Self::Notifier, Self::NotifyReceiver) {
        AtomicNotifier::new()
    }
}

// STD --------------------------------------------------------------

/// Hosted implementation, used when the drivers are exercised from threads.
pub struct StdOs {}
#[cfg(feature = "std")]
impl OsInterface for StdOs {
    type Notifier = StdNotifier;
    type NotifyReceiver = StdNotifyReceiver;
    type Timeout = StdTimeoutStatus;

    fn start_timeout(dur: MicrosDurationU32) -> Self::Timeout {
        StdTimeoutStatus::new(dur)
    }

    fn notifier() -> (Self::Notifier, Self::NotifyReceiver) {
        StdNotifier::new()
    }
}

// Fake -------------------------------------------------------------

/// This implementation is only for unit testing. Timeouts count polls, see
/// [`FakeTimeoutStatus`], and the receiver never blocks.
pub struct FakeOs {}
impl OsInterface for FakeOs {
    type Notifier = FakeNotifier;
    type NotifyReceiver = FakeNotifier;
    type Timeout = FakeTimeoutStatus;

    fn start_timeout(dur: MicrosDurationU32) -> Self::Timeout {
        FakeTimeoutStatus::new(dur)
    }

    fn notifier() -> (Self::Notifier, Self::NotifyReceiver) {
        FakeNotifier::new()
    }
}

// Tests ------------------------------------------------------------
