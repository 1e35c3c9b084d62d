use super::*;
use core::{
    marker::PhantomData,
    sync::atomic::{AtomicBool, Ordering},
};

#[derive(Default)]
pub struct FakeNotifier;

impl FakeNotifier {
    pub fn new() -> (Self, Self) {
        (Self {}, Self {})
    }
}

impl NotifierIsr for FakeNotifier {
    fn notify_from_isr(&mut self) {}
}

impl NotifyReceiver for FakeNotifier {
    fn take(&mut self, _timeout: MicrosDurationU32) -> bool {
        true
    }
}

// Atomic -----------------------------------------------------------

/// Notifier for bare metal. The receiver spins on the flag until it is set
/// or a [`TickTimeoutStatus`] over `T` expires.
pub struct AtomicNotifier {
    flag: Arc<AtomicBool>,
}

impl AtomicNotifier {
    pub fn new<T: TickInstant>() -> (Self, AtomicNotifyReceiver<T>) {
        let s = Self {
            flag: Arc::new(AtomicBool::new(false)),
        };
        let r = AtomicNotifyReceiver {
            flag: Arc::clone(&s.flag),
            _t: PhantomData,
        };
        (s, r)
    }
}

impl NotifierIsr for AtomicNotifier {
    fn notify_from_isr(&mut self) {
        self.flag.store(true, Ordering::Release)
    }
}

pub struct AtomicNotifyReceiver<T> {
    flag: Arc<AtomicBool>,
    _t: PhantomData<fn() -> T>,
}

impl<T: TickInstant> NotifyReceiver for AtomicNotifyReceiver<T> {
    fn take(&mut self, timeout: MicrosDurationU32) -> bool {
        let mut t = TickTimeoutStatus::<T>::new(timeout);
        loop {
            if self
                .flag
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
            if t.timeout() {
                return false;
            }
        }
    }
}

#[cfg(feature = "std")]
pub use std_impl::*;
#[cfg(feature = "std")]
mod std_impl {
    use super::*;
    use std::time::Instant;

    /// Notifier for hosted builds, the "interrupt" runs on another thread.
    pub struct StdNotifier {
        flag: Arc<AtomicBool>,
    }

    impl StdNotifier {
        pub fn new() -> (Self, StdNotifyReceiver) {
            let s = Self {
                flag: Arc::new(AtomicBool::new(false)),
            };
            let r = StdNotifyReceiver {
                flag: Arc::clone(&s.flag),
            };
            (s, r)
        }
    }

    impl NotifierIsr for StdNotifier {
        fn notify_from_isr(&mut self) {
            self.flag.store(true, Ordering::Release)
        }
    }

    pub struct StdNotifyReceiver {
        flag: Arc<AtomicBool>,
    }

    impl NotifyReceiver for StdNotifyReceiver {
        fn take(&mut self, timeout: MicrosDurationU32) -> bool {
            let now = Instant::now();
            loop {
                if self
                    .flag
                    .compare_exchange(true, false, Ordering::SeqCst, Ordering::Acquire)
                    .is_ok()
                {
                    return true;
                }
                if now.elapsed().as_micros() >= timeout.ticks().into() {
                    return false;
                }
                std::thread::yield_now();
            }
        }
    }

}
