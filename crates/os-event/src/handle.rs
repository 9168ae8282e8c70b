//! Event handle and callback registration.

use core::fmt;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque value handed back to the callback unmodified.
pub type EventContext = Arc<dyn Any + Send + Sync>;

/// Callback run when a registered one-shot is delivered.
pub type EventCallback = Arc<dyn Fn(EventContext) + Send + Sync>;

/// A callback together with its context.
///
/// The pair is registered and consumed as one unit, so a callback can never
/// run with another registration's context.
#[derive(Clone)]
pub struct Registration {
    callback: EventCallback,
    context: EventContext,
}

impl Registration {
    pub fn new<F>(callback: F, context: EventContext) -> Self
    where
        F: Fn(EventContext) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            context,
        }
    }

    pub fn from_parts(callback: EventCallback, context: EventContext) -> Self {
        Self { callback, context }
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Consumes the registration and runs the callback with its context.
    pub fn invoke(self) {
        (*self.callback)(self.context)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("callback", &Arc::as_ptr(&self.callback))
            .field("context", &Arc::as_ptr(&self.context))
            .finish()
    }
}

/// Per-scheduler event record.
///
/// Holds the "event started" flag and at most one pending registration.
/// Handles are only produced by [`EventScheduler::create`](crate::EventScheduler::create).
pub struct EventHandle {
    triggered: AtomicBool,
    registration: Mutex<Option<Registration>>,
    expirations: AtomicU64,
}

impl EventHandle {
    pub(crate) fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            registration: Mutex::new(None),
            expirations: AtomicU64::new(0),
        }
    }

    /// Whether an event has been started and not stopped since.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Whether a callback is waiting to be delivered.
    pub fn is_registered(&self) -> bool {
        self.registration.lock().is_some()
    }

    /// Number of timer expiries observed on this handle.
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// Sets the triggered flag. Returns `false` if it was already set.
    pub(crate) fn mark_triggered(&self) -> bool {
        self.triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_triggered(&self) {
        self.triggered.store(false, Ordering::Release);
    }

    /// Installs a registration, returning the one it replaced.
    pub(crate) fn register(&self, registration: Registration) -> Option<Registration> {
        self.registration.lock().replace(registration)
    }

    /// Takes the pending registration, leaving the handle empty.
    pub(crate) fn take(&self) -> Option<Registration> {
        self.registration.lock().take()
    }

    pub(crate) fn record_expiry(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandle")
            .field("triggered", &self.is_triggered())
            .field("registered", &self.is_registered())
            .field("expirations", &self.expirations())
            .finish()
    }
}
