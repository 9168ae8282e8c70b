//! Thread-backed monotonic interval timer.
//!
//! Each timer owns one notification thread that sleeps on a condition
//! variable until the programmed deadline (absolute, [`Instant`] based, so
//! wall-clock adjustments do not move it) and then runs the expiry hook.
//! Periodic timers re-arm from the previous deadline rather than from the
//! wake-up time, so they do not drift.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, trace};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::driver::{ExpiryHook, OsTimer, TimerDriver, TimerId};
use crate::error::TimerError;
use crate::timespec::TimerSpec;

const DEFAULT_THREAD_NAME: &str = "pal-os-event";

/// [`TimerDriver`] that delivers expiry on a dedicated thread per timer.
#[derive(Debug, Clone)]
pub struct ThreadTimerDriver {
    thread_name: String,
}

impl ThreadTimerDriver {
    pub fn new() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Names the notification threads of timers created by this driver.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Default for ThreadTimerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for ThreadTimerDriver {
    fn create(&self, on_expiry: ExpiryHook) -> Result<Box<dyn OsTimer>, TimerError> {
        let id = TimerId::next();
        let shared = Arc::new(Shared {
            schedule: Mutex::new(Schedule::default()),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || notification_thread(id, &worker, &on_expiry))
            .map_err(TimerError::Create)?;

        debug!("{id} created on thread '{}'", self.thread_name);
        drop(handle);
        Ok(Box::new(ThreadTimer { id, shared }))
    }
}

#[derive(Debug, Default)]
struct Schedule {
    deadline: Option<Instant>,
    interval: Option<Duration>,
    shutdown: bool,
}

struct Shared {
    schedule: Mutex<Schedule>,
    wake: Condvar,
}

impl Shared {
    fn shut_down(&self) {
        let mut schedule = self.schedule.lock();
        schedule.shutdown = true;
        schedule.deadline = None;
        self.wake.notify_all();
    }
}

/// Timer created by [`ThreadTimerDriver`].
///
/// Dropping it has the same effect as [`OsTimer::delete`].
pub struct ThreadTimer {
    id: TimerId,
    shared: Arc<Shared>,
}

impl OsTimer for ThreadTimer {
    fn id(&self) -> TimerId {
        self.id
    }

    fn set_time(&mut self, spec: &TimerSpec) -> Result<(), TimerError> {
        let (Some(value), Some(interval)) = (spec.value.to_duration(), spec.interval.to_duration())
        else {
            return Err(TimerError::InvalidSpec(*spec));
        };

        // Expiries beyond what `Instant` can represent are rejected.
        let deadline = if spec.is_disarm() {
            None
        } else {
            let Some(deadline) = Instant::now().checked_add(value) else {
                return Err(TimerError::InvalidSpec(*spec));
            };
            if deadline.checked_add(interval).is_none() {
                return Err(TimerError::InvalidSpec(*spec));
            }
            Some(deadline)
        };

        let mut schedule = self.shared.schedule.lock();
        if schedule.shutdown {
            return Err(TimerError::Deleted(self.id));
        }

        schedule.deadline = deadline;
        schedule.interval = deadline.and((!interval.is_zero()).then_some(interval));
        trace!("{} programmed: {spec}", self.id);
        self.shared.wake.notify_all();
        Ok(())
    }

    fn delete(self: Box<Self>) -> Result<(), TimerError> {
        // Drop does the work; the notification thread is never joined because
        // it may be blocked inside the hook on a lock the deleting thread holds.
        Ok(())
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shared.shut_down();
        debug!("{} deleted", self.id);
    }
}

fn notification_thread(id: TimerId, shared: &Shared, on_expiry: &ExpiryHook) {
    let mut schedule = shared.schedule.lock();
    loop {
        if schedule.shutdown {
            break;
        }

        let Some(deadline) = schedule.deadline else {
            shared.wake.wait(&mut schedule);
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            shared.wake.wait_until(&mut schedule, deadline);
            continue;
        }

        schedule.deadline = schedule
            .interval
            .and_then(|period| next_deadline(deadline, period, now));
        if schedule.interval.is_some() && schedule.deadline.is_none() {
            error!("{id}: next period out of range, timer stopped");
            schedule.interval = None;
        }
        fire(id, &mut schedule, on_expiry);
    }
    trace!("{id} notification thread exiting");
}

fn fire(id: TimerId, schedule: &mut MutexGuard<'_, Schedule>, on_expiry: &ExpiryHook) {
    MutexGuard::unlocked(schedule, || {
        if panic::catch_unwind(AssertUnwindSafe(|| (**on_expiry)())).is_err() {
            error!("{id}: expiry callback panicked");
        }
    });
}

/// Next periodic deadline after `now`, skipping periods that were missed.
///
/// `None` when the deadline cannot be represented as an [`Instant`].
fn next_deadline(previous: Instant, period: Duration, now: Instant) -> Option<Instant> {
    let next = previous.checked_add(period)?;
    if next > now {
        return Some(next);
    }
    let behind = now.duration_since(previous).as_nanos();
    let skipped = behind / period.as_nanos();
    trace!("poll timer overrun by {} period(s)", skipped.saturating_sub(1));
    let skipped = u32::try_from(skipped).unwrap_or(u32::MAX);
    previous.checked_add(period.checked_mul(skipped.saturating_add(1))?)
}
