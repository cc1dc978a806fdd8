//! Process-wide signal-safety coordinator.
//!
//! Every motor vended by any [`crate::MotorShield`] is registered here so
//! that a terminating signal can de-energize the hardware before the
//! process dies: steppers get their cooperative stop flag raised, DC motors
//! are switched fully off.
//!
//! Signal work never happens in async-signal-handler context. A dedicated
//! watcher thread blocks on [`signal_hook::iterator::Signals`]; when a
//! signal arrives it runs [`emergency_stop_all`] with full access to
//! normal locks and the I2C bus, then chains onward by re-running the
//! signal's default disposition. Actions other crates registered through
//! signal-hook before or after ours stay installed.
//!
//! The registry itself is a pre-sized slot table guarded by one mutex.
//! Registration and removal are explicit lifecycle calls tied to shield
//! construction and destruction; the stop path only ever downgrades weak
//! handles and performs motor calls, it never allocates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Once, Weak};

use parking_lot::Mutex;
use signal_hook::consts::SIGINT;
#[cfg(feature = "sighup")]
use signal_hook::consts::SIGHUP;
#[cfg(feature = "sigpipe")]
use signal_hook::consts::SIGPIPE;
use signal_hook::iterator::Signals;
use signal_hook::low_level;

/// Registry capacity: enough for several stacked shields' worth of motors.
const MAX_MOTORS: usize = 16;

/// Best-effort stop interface every registered motor exposes.
///
/// Implementations must be safe to call from any thread and must swallow
/// bus errors: the process may be terminating and there is nobody left to
/// report them to.
pub(crate) trait EmergencyStop: Send + Sync {
    fn emergency_stop(&self);
}

/// Opaque handle returned by [`register`], used to drop the entry again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Registration(u64);

struct Entry {
    id: u64,
    motor: Weak<dyn EmergencyStop>,
}

static REGISTRY: Mutex<heapless::Vec<Entry, MAX_MOTORS>> = Mutex::new(heapless::Vec::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static INSTALL: Once = Once::new();

/// Add a motor to the registry. Returns `None` (with a diagnostic) if the
/// slot table is full; stopping then stays best-effort for the motors that
/// did fit.
pub(crate) fn register(motor: Weak<dyn EmergencyStop>) -> Option<Registration> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let mut registry = REGISTRY.lock();
    match registry.push(Entry { id, motor }) {
        Ok(()) => Some(Registration(id)),
        Err(_) => {
            log::warn!("Signal-safety registry full ({} motors), motor not covered", MAX_MOTORS);
            None
        }
    }
}

/// Remove a previously registered motor.
pub(crate) fn unregister(registration: Registration) {
    let mut registry = REGISTRY.lock();
    if let Some(pos) = registry.iter().position(|e| e.id == registration.0) {
        registry.swap_remove(pos);
    }
}

/// Install the signal watcher. Idempotent; the first shield that asks for
/// signal safety pays for the thread.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        #[allow(unused_mut)]
        let mut signals = vec![SIGINT];
        #[cfg(feature = "sighup")]
        signals.push(SIGHUP);
        #[cfg(feature = "sigpipe")]
        signals.push(SIGPIPE);

        match Signals::new(&signals) {
            Ok(mut signals) => {
                std::thread::spawn(move || {
                    for signal in signals.forever() {
                        log::warn!("Signal {} received, stopping all motors", signal);
                        emergency_stop_all();
                        // Chain to the signal's default disposition; for
                        // SIGINT/SIGHUP that terminates the process.
                        let _ = low_level::emulate_default_handler(signal);
                    }
                });
            }
            Err(e) => {
                log::warn!("Could not install signal handlers: {}", e);
            }
        }
    });
}

/// Stop every registered motor: steppers receive a cooperative stop
/// request, DC motors are driven fully off. Errors are swallowed.
///
/// This is the exact routine the signal path runs; it is public so
/// applications can trigger the same emergency stop manually.
pub fn emergency_stop_all() {
    let registry = REGISTRY.lock();
    for entry in registry.iter() {
        if let Some(motor) = entry.motor.upgrade() {
            motor.emergency_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    // Both tests touch the process-wide registry; serialize them.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    struct Probe {
        stops: AtomicU32,
    }

    impl EmergencyStop for Probe {
        fn emergency_stop(&self) {
            self.stops.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_register_stop_unregister() {
        let _guard = TEST_LOCK.lock();
        let probe = Arc::new(Probe {
            stops: AtomicU32::new(0),
        });
        let probe_dyn: Arc<dyn EmergencyStop> = probe.clone();
        let weak: Weak<dyn EmergencyStop> = Arc::downgrade(&probe_dyn);
        let registration = register(weak).unwrap();

        emergency_stop_all();
        assert_eq!(probe.stops.load(Ordering::Relaxed), 1);

        unregister(registration);
        emergency_stop_all();
        assert_eq!(probe.stops.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_dead_entries_are_skipped() {
        let _guard = TEST_LOCK.lock();
        let probe = Arc::new(Probe {
            stops: AtomicU32::new(0),
        });
        let probe_dyn: Arc<dyn EmergencyStop> = probe.clone();
        let weak: Weak<dyn EmergencyStop> = Arc::downgrade(&probe_dyn);
        let registration = register(weak).unwrap();

        drop(probe);
        // Upgrade fails, nothing to call; must not panic.
        emergency_stop_all();
        unregister(registration);
    }
}
