//! Timer resource lifecycle.
//!
//! The single OS timer lives inside the `Ready` variant of a mutex-guarded
//! slot, so it can only be reached while the guard is held and the state is
//! ready. The condition variable signals lifecycle transitions to threads
//! waiting for readiness.
//!
//! ```text
//! UNINITIALIZED --create--> READY --destroy--> DESTROYING --cleanup--> UNINITIALIZED
//! ```

use core::fmt;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::driver::{ExpiryHook, OsTimer, TimerDriver, TimerId};
use crate::error::{EventError, TimerError};
use crate::timespec::TimerSpec;

/// Observable lifecycle state of the timer resource.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Destroying,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Ready => "READY",
            Self::Destroying => "DESTROYING",
        };
        f.write_str(name)
    }
}

enum Slot {
    Uninitialized,
    Ready(Box<dyn OsTimer>),
    Destroying,
}

impl Slot {
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Uninitialized => Lifecycle::Uninitialized,
            Self::Ready(_) => Lifecycle::Ready,
            Self::Destroying => Lifecycle::Destroying,
        }
    }
}

pub(crate) struct TimerResource {
    slot: Mutex<Slot>,
    transition: Condvar,
    readiness_timeout: Duration,
}

impl TimerResource {
    pub(crate) fn new(readiness_timeout: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::Uninitialized),
            transition: Condvar::new(),
            readiness_timeout,
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.slot.lock().lifecycle()
    }

    pub(crate) fn timer_id(&self) -> Option<TimerId> {
        match &*self.slot.lock() {
            Slot::Ready(timer) => Some(timer.id()),
            _ => None,
        }
    }

    /// Creates the OS timer unless one is already ready.
    ///
    /// Returns `Ok(false)` for the benign already-ready case.
    pub(crate) fn create(
        &self,
        driver: &dyn TimerDriver,
        on_expiry: ExpiryHook,
    ) -> Result<bool, TimerError> {
        let mut slot = self.slot.lock();
        if let Slot::Ready(timer) = &*slot {
            warn!("timer already READY ({}), create skipped", timer.id());
            return Ok(false);
        }

        let timer = driver.create(on_expiry)?;
        debug!("{}: {} -> READY", timer.id(), slot.lifecycle());
        *slot = Slot::Ready(timer);
        self.transition.notify_all();
        Ok(true)
    }

    /// Runs `op` against the ready timer, waiting up to the readiness timeout
    /// for a `READY` broadcast if necessary.
    ///
    /// The timeout counts from entry, so time spent blocked on the lock is
    /// part of it.
    pub(crate) fn with_ready<R>(
        &self,
        op: impl FnOnce(&mut dyn OsTimer) -> R,
    ) -> Result<R, EventError> {
        let deadline = Instant::now().checked_add(self.readiness_timeout);
        let mut slot = self.slot.lock();
        self.wait_ready(&mut slot, deadline)?;
        match &mut *slot {
            Slot::Ready(timer) => Ok(op(&mut **timer)),
            other => Err(self.not_ready(other.lifecycle())),
        }
    }

    /// A `None` deadline (timeout too large to represent) waits indefinitely.
    fn wait_ready(
        &self,
        slot: &mut MutexGuard<'_, Slot>,
        deadline: Option<Instant>,
    ) -> Result<(), EventError> {
        while !matches!(**slot, Slot::Ready(_)) {
            let Some(deadline) = deadline else {
                self.transition.wait(slot);
                continue;
            };
            if self.transition.wait_until(slot, deadline).timed_out()
                && !matches!(**slot, Slot::Ready(_))
            {
                return Err(self.not_ready(slot.lifecycle()));
            }
        }
        Ok(())
    }

    fn not_ready(&self, state: Lifecycle) -> EventError {
        EventError::NotReady {
            state,
            waited: self.readiness_timeout,
        }
    }

    /// Tears the timer down. Returns `false`, with no action taken, when the
    /// timer is not ready.
    pub(crate) fn destroy(&self) -> bool {
        let mut slot = self.slot.lock();
        let timer = match std::mem::replace(&mut *slot, Slot::Destroying) {
            Slot::Ready(timer) => timer,
            previous => {
                warn!("destroy skipped: timer not READY (state={})", previous.lifecycle());
                *slot = previous;
                return false;
            }
        };
        self.transition.notify_all();

        let id = timer.id();
        debug!("{id}: READY -> DESTROYING");
        let mut timer = timer;
        // Best effort: the timer is deleted regardless.
        let _ = timer.set_time(&TimerSpec::DISARMED);
        if let Err(err) = timer.delete() {
            error!("{id}: timer delete failed: {err}");
        }

        *slot = Slot::Uninitialized;
        self.transition.notify_all();
        debug!("{id}: DESTROYING -> UNINITIALIZED");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTimerDriver;
    use std::sync::Arc;
    use std::thread;

    fn noop_hook() -> ExpiryHook {
        Arc::new(|| {})
    }

    #[test]
    fn create_is_idempotent_while_ready() {
        let driver = MockTimerDriver::new();
        let resource = TimerResource::new(Duration::from_millis(50));

        assert!(resource.create(&driver, noop_hook()).unwrap());
        let id = resource.timer_id();
        assert!(!resource.create(&driver, noop_hook()).unwrap());

        assert_eq!(driver.created(), 1);
        assert_eq!(resource.timer_id(), id);
        assert_eq!(resource.lifecycle(), Lifecycle::Ready);
    }

    #[test]
    fn destroy_requires_ready() {
        let driver = MockTimerDriver::new();
        let resource = TimerResource::new(Duration::from_millis(50));

        assert!(!resource.destroy());
        assert_eq!(driver.deleted(), 0);
        assert_eq!(resource.lifecycle(), Lifecycle::Uninitialized);

        resource.create(&driver, noop_hook()).unwrap();
        assert!(resource.destroy());
        assert_eq!(driver.deleted(), 1);
        assert_eq!(resource.lifecycle(), Lifecycle::Uninitialized);
        assert_eq!(resource.timer_id(), None);
    }

    #[test]
    fn with_ready_times_out_softly() {
        let resource = TimerResource::new(Duration::from_millis(20));
        let started = Instant::now();

        let result = resource.with_ready(|_| ());

        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(matches!(
            result,
            Err(EventError::NotReady {
                state: Lifecycle::Uninitialized,
                ..
            })
        ));
    }

    #[test]
    fn readiness_timeout_includes_lock_wait() {
        let resource = Arc::new(TimerResource::new(Duration::from_millis(30)));
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();

        let holder = {
            let resource = Arc::clone(&resource);
            thread::spawn(move || {
                let _slot = resource.slot.lock();
                locked_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
            })
        };
        locked_rx.recv().unwrap();

        let started = Instant::now();
        let result = resource.with_ready(|_| ());
        let elapsed = started.elapsed();
        holder.join().unwrap();

        assert!(matches!(result, Err(EventError::NotReady { .. })));
        // Lock released at ~100ms; no fresh 30ms wait starts after that.
        assert!(
            elapsed < Duration::from_millis(125),
            "waited {elapsed:?} past the deadline"
        );
    }

    #[test]
    fn waiter_wakes_on_ready_broadcast() {
        let driver = MockTimerDriver::new();
        let resource = Arc::new(TimerResource::new(Duration::from_secs(2)));

        let waiter = {
            let resource = Arc::clone(&resource);
            thread::spawn(move || resource.with_ready(|timer| timer.id()))
        };
        thread::sleep(Duration::from_millis(20));
        resource.create(&driver, noop_hook()).unwrap();

        let id = waiter.join().unwrap().unwrap();
        assert_eq!(Some(id), resource.timer_id());
    }

    #[test]
    fn delete_failure_still_uninitializes() {
        let driver = MockTimerDriver::new();
        let resource = TimerResource::new(Duration::from_millis(50));
        resource.create(&driver, noop_hook()).unwrap();

        driver.fail_delete(true);
        assert!(resource.destroy());
        assert_eq!(resource.lifecycle(), Lifecycle::Uninitialized);
    }
}
