//! Process-wide scheduler.
//!
//! The secure-element stack expects one timer and one event handle for the
//! whole process. These free functions reach a lazily created
//! [`EventScheduler`] backed by [`ThreadTimerDriver`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use pal_os_event::{global, EventContext, Registration};
//!
//! let poll = Registration::new(|_ctx| { /* poll the secure element */ }, Arc::new(()) as EventContext);
//! let handle = global::create(Some(poll)).expect("timer");
//! global::arm().ok();
//! // ...
//! global::disarm().ok();
//! global::destroy_event(&handle);
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::SchedulerConfig;
use crate::error::EventResult;
use crate::handle::{EventHandle, Registration};
use crate::scheduler::EventScheduler;
use crate::thread_timer::ThreadTimerDriver;

static SCHEDULER: OnceCell<EventScheduler> = OnceCell::new();

/// Installs the configuration of the process-wide scheduler.
///
/// Must run before any other function in this module. Returns the
/// configuration back if the scheduler already exists.
pub fn configure(config: SchedulerConfig) -> Result<(), SchedulerConfig> {
    let mut pending = Some(config);
    SCHEDULER.get_or_init(|| {
        let config = pending.take().unwrap_or_default();
        EventScheduler::with_config(ThreadTimerDriver::new(), config)
    });
    match pending {
        Some(config) => Err(config),
        None => Ok(()),
    }
}

/// The process-wide scheduler, created with the default configuration on
/// first use.
pub fn scheduler() -> &'static EventScheduler {
    SCHEDULER.get_or_init(|| EventScheduler::new(ThreadTimerDriver::new()))
}

pub fn create(registration: Option<Registration>) -> EventResult<Arc<EventHandle>> {
    scheduler().create(registration)
}

pub fn start(handle: &EventHandle, registration: Registration) -> EventResult<()> {
    scheduler().start(handle, registration)
}

pub fn stop(handle: &EventHandle) {
    scheduler().stop(handle)
}

pub fn arm() -> EventResult<()> {
    scheduler().arm()
}

pub fn disarm() -> EventResult<()> {
    scheduler().disarm()
}

pub fn register_callback_oneshot(
    handle: &EventHandle,
    registration: Registration,
    delay_us: u32,
) -> EventResult<()> {
    scheduler().register_oneshot(handle, registration, delay_us)
}

pub fn trigger_registered_callback() -> bool {
    scheduler().trigger_registered_callback()
}

pub fn destroy() -> bool {
    scheduler().destroy()
}

pub fn destroy_event(handle: &EventHandle) -> bool {
    scheduler().destroy_handle(handle)
}
