//! OS interval timer abstraction.
//!
//! The scheduler never holds a raw OS handle. It asks a [`TimerDriver`] for
//! a boxed [`OsTimer`] and keeps that box behind its own lock. Expiry is
//! delivered asynchronously by the driver through an [`ExpiryHook`], on a
//! thread the driver owns.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::TimerError;
use crate::timespec::TimerSpec;

/// Callback run by the driver each time a timer expires.
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an OS timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocates a process-unique identity for a new driver timer.
    pub fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A created OS timer (object-safe).
pub trait OsTimer: Send {
    fn id(&self) -> TimerId;

    /// Programs the next expiry relative to now. A zero value disarms the
    /// timer; a zero interval makes it fire once.
    fn set_time(&mut self, spec: &TimerSpec) -> Result<(), TimerError>;

    /// Deletes the timer. No expiry is delivered afterwards.
    fn delete(self: Box<Self>) -> Result<(), TimerError>;
}

/// Factory for OS timers with asynchronous, thread-delivered expiry.
pub trait TimerDriver: Send + Sync {
    fn create(&self, on_expiry: ExpiryHook) -> Result<Box<dyn OsTimer>, TimerError>;
}

impl<D: TimerDriver + ?Sized> TimerDriver for Arc<D> {
    fn create(&self, on_expiry: ExpiryHook) -> Result<Box<dyn OsTimer>, TimerError> {
        (**self).create(on_expiry)
    }
}
