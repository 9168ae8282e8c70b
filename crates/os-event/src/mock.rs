//! Recording timer driver for tests.
//!
//! Nothing fires on its own: expiry is simulated with
//! [`MockTimerDriver::fire`], which runs the live timer's hook on the calling
//! thread.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::{ExpiryHook, OsTimer, TimerDriver, TimerId};
use crate::error::TimerError;
use crate::timespec::TimerSpec;

#[derive(Default)]
struct MockState {
    created: usize,
    deleted: usize,
    live: Option<LiveTimer>,
    history: Vec<(TimerId, TimerSpec)>,
    fail_create: bool,
    fail_set_time: bool,
    fail_delete: bool,
}

struct LiveTimer {
    id: TimerId,
    spec: TimerSpec,
    hook: ExpiryHook,
}

/// Cloneable handle onto a shared recording driver.
#[derive(Clone, Default)]
pub struct MockTimerDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockTimerDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers created so far.
    pub fn created(&self) -> usize {
        self.state.lock().created
    }

    /// Number of timers deleted so far.
    pub fn deleted(&self) -> usize {
        self.state.lock().deleted
    }

    /// Identity of the timer that currently exists, if any.
    pub fn live_timer(&self) -> Option<TimerId> {
        self.state.lock().live.as_ref().map(|timer| timer.id)
    }

    /// Programming currently held by the live timer.
    pub fn current_spec(&self) -> Option<TimerSpec> {
        self.state.lock().live.as_ref().map(|timer| timer.spec)
    }

    /// Every successful `set_time` call, oldest first.
    pub fn history(&self) -> Vec<(TimerId, TimerSpec)> {
        self.state.lock().history.clone()
    }

    pub fn last_spec(&self) -> Option<TimerSpec> {
        self.state.lock().history.last().map(|(_, spec)| *spec)
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }

    pub fn fail_set_time(&self, fail: bool) {
        self.state.lock().fail_set_time = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().fail_delete = fail;
    }

    /// Simulates one expiry of the live timer.
    ///
    /// Returns `false` when there is no armed timer. A one-shot programming is
    /// cleared before the hook runs, as the OS does.
    pub fn fire(&self) -> bool {
        let hook = {
            let mut state = self.state.lock();
            let Some(live) = state.live.as_mut() else {
                return false;
            };
            if live.spec.is_disarm() {
                return false;
            }
            if !live.spec.is_periodic() {
                live.spec = TimerSpec::DISARMED;
            }
            Arc::clone(&live.hook)
        };
        (*hook)();
        true
    }
}

impl TimerDriver for MockTimerDriver {
    fn create(&self, on_expiry: ExpiryHook) -> Result<Box<dyn OsTimer>, TimerError> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(TimerError::Create(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "mock timer table full",
            )));
        }

        let id = TimerId::next();
        state.created += 1;
        state.live = Some(LiveTimer {
            id,
            spec: TimerSpec::DISARMED,
            hook: on_expiry,
        });
        Ok(Box::new(MockTimer {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockTimer {
    id: TimerId,
    state: Arc<Mutex<MockState>>,
}

impl OsTimer for MockTimer {
    fn id(&self) -> TimerId {
        self.id
    }

    fn set_time(&mut self, spec: &TimerSpec) -> Result<(), TimerError> {
        let mut state = self.state.lock();
        if state.fail_set_time {
            return Err(TimerError::Io(io::Error::from(io::ErrorKind::InvalidInput)));
        }
        if !spec.is_valid() {
            return Err(TimerError::InvalidSpec(*spec));
        }
        match state.live.as_mut() {
            Some(live) if live.id == self.id => live.spec = *spec,
            _ => return Err(TimerError::Deleted(self.id)),
        }
        state.history.push((self.id, *spec));
        Ok(())
    }

    fn delete(self: Box<Self>) -> Result<(), TimerError> {
        let mut state = self.state.lock();
        if state.fail_delete {
            return Err(TimerError::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        }
        if state.live.as_ref().map(|live| live.id) == Some(self.id) {
            state.live = None;
        }
        state.deleted += 1;
        Ok(())
    }
}
