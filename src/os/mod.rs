//! See [`OsInterface`]

pub mod notifier;
pub mod notifier_impls;
pub mod os_impls;
pub mod timeout;

pub use notifier::*;
pub use notifier_impls::*;
pub use os_impls::*;
pub use timeout::*;

pub use fugit::{ExtU32, MicrosDurationU32};

/// Adapter for the execution environment the drivers run in.
///
/// The interrupt handlers only ever call [`NotifierIsr::notify_from_isr`];
/// the foreground side waits on the paired [`NotifyReceiver`]. On bare metal
/// [`RawOs`] measures timeouts with a hardware [`TickInstant`]. [`FakeOs`]
/// counts polls instead and is only meant for unit tests.
///
/// ```
/// use f2838x_hal::os::*;
///
/// fn os_interface<OS: OsInterface>() {
///     let (mut n, mut r) = OS::notifier();
///     n.notify_from_isr();
///     assert!(r.take(1.millis()));
///
///     let mut t = OS::start_timeout(1.millis());
///     assert!(!t.timeout());
/// }
///
/// os_interface::<FakeOs>();
/// ```
pub trait OsInterface: Send + Sync + 'static {
    type Notifier: NotifierIsr;
    type NotifyReceiver: NotifyReceiver;
    type Timeout: TimeoutStatus;

    fn start_timeout(dur: MicrosDurationU32) -> Self::Timeout;
    fn notifier() -> (Self::Notifier, Self::NotifyReceiver);
}

/// Maximum time a single [`NotifyReceiver::take`] blocks inside
/// [`wait_with`]. Conditions that are not signalled by an interrupt (like a
/// pending stop condition) are re-checked at least this often.
pub const POLL_INTERVAL: MicrosDurationU32 = MicrosDurationU32::micros(100);

/// Calls `f` until it returns `Some` or `timeout` expires.
///
/// `f` is always called once more after the timeout expired, so a condition
/// that became true during the last sleep is not reported as a timeout.
pub fn wait_with<OS, T>(
    waiter: &mut OS::NotifyReceiver,
    timeout: MicrosDurationU32,
    mut f: impl FnMut() -> Option<T>,
) -> Option<T>
where
    OS: OsInterface,
{
    let mut t = OS::start_timeout(timeout);
    loop {
        if let Some(rst) = f() {
            return Some(rst);
        }
        if t.timeout() {
            return f();
        }
        let slice = if timeout < POLL_INTERVAL {
            timeout
        } else {
            POLL_INTERVAL
        };
        waiter.take(slice);
    }
}
