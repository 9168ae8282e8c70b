//! Timer expiry notifier.
//!
//! Runs on the driver's notification thread. The registration is taken out
//! of the handle before the callback runs, so one expiry delivers at most one
//! callback even if that callback registers again.

use std::sync::Arc;

use log::trace;

use crate::driver::ExpiryHook;
use crate::handle::EventHandle;

/// Builds the hook handed to the timer driver for `handle`.
pub(crate) fn expiry_notifier(handle: Arc<EventHandle>) -> ExpiryHook {
    Arc::new(move || notify(&handle))
}

pub(crate) fn notify(handle: &EventHandle) {
    handle.record_expiry();
    match handle.take() {
        Some(registration) => registration.invoke(),
        None => trace!("expiry with no registered callback"),
    }
}
