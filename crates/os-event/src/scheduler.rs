//! Event scheduler built on the shared OS timer.
//!
//! One scheduler owns one timer resource and one [`EventHandle`]. All timer
//! access is serialized by the resource lock; the handle's registration is
//! handed off with an atomic take, so whichever of the expiry notifier or
//! [`EventScheduler::trigger_registered_callback`] gets there first delivers
//! it.

use std::process;
use std::sync::Arc;

use log::{error, trace, warn};

use crate::config::{FailurePolicy, SchedulerConfig, FATAL_EXIT_CODE};
use crate::driver::{TimerDriver, TimerId};
use crate::error::{EventError, EventResult};
use crate::handle::{EventHandle, Registration};
use crate::notifier::expiry_notifier;
use crate::resource::{Lifecycle, TimerResource};
use crate::timespec::{Timespec, TimerSpec, START_DELAY_US};

pub struct EventScheduler {
    driver: Box<dyn TimerDriver>,
    resource: TimerResource,
    handle: Arc<EventHandle>,
    config: SchedulerConfig,
}

impl EventScheduler {
    pub fn new<D: TimerDriver + 'static>(driver: D) -> Self {
        Self::with_config(driver, SchedulerConfig::default())
    }

    pub fn with_config<D: TimerDriver + 'static>(driver: D, config: SchedulerConfig) -> Self {
        Self {
            driver: Box::new(driver),
            resource: TimerResource::new(config.readiness_timeout),
            handle: Arc::new(EventHandle::new()),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current lifecycle state of the timer resource.
    pub fn lifecycle(&self) -> Lifecycle {
        self.resource.lifecycle()
    }

    /// Identity of the OS timer, present only while it is ready.
    pub fn timer_id(&self) -> Option<TimerId> {
        self.resource.timer_id()
    }

    /// Creates the timer if needed and returns the event handle.
    ///
    /// When a registration is supplied the event is started with the
    /// protocol start delay. Creating while the timer is already ready only
    /// logs a warning.
    ///
    /// # Errors
    ///
    /// [`EventError::ResourceExhausted`] if the OS timer cannot be created
    /// (only returned under [`FailurePolicy::Report`]).
    pub fn create(&self, registration: Option<Registration>) -> EventResult<Arc<EventHandle>> {
        trace!("create >");
        let hook = expiry_notifier(Arc::clone(&self.handle));
        if let Err(err) = self.resource.create(&*self.driver, hook) {
            return Err(self.escalate(EventError::ResourceExhausted(err)));
        }

        if let Some(registration) = registration {
            if let Err(err) = self.start(&self.handle, registration) {
                warn!("create: initial start abandoned: {err}");
            }
        }
        trace!("create <");
        Ok(Arc::clone(&self.handle))
    }

    /// Starts an event unless one is already running on `handle`.
    pub fn start(&self, handle: &EventHandle, registration: Registration) -> EventResult<()> {
        if !handle.mark_triggered() {
            trace!("start: event already triggered");
            return Ok(());
        }
        self.register_oneshot(handle, registration, START_DELAY_US)
    }

    /// Clears the triggered flag. The armed timer is left as it is.
    pub fn stop(&self, handle: &EventHandle) {
        handle.clear_triggered();
    }

    /// Arms the periodic poll timer (1 ms, then every ~295 ms).
    ///
    /// # Errors
    ///
    /// [`EventError::NotReady`] if the timer did not become ready in time;
    /// [`EventError::SetTime`] (unrecoverable) if programming failed.
    pub fn arm(&self) -> EventResult<()> {
        self.program_poll("arm", &TimerSpec::POLL)
    }

    /// Cancels any pending or periodic expiry. Errors as for [`arm`](Self::arm).
    pub fn disarm(&self) -> EventResult<()> {
        self.program_poll("disarm", &TimerSpec::DISARMED)
    }

    /// Registers `registration` on `handle` and programs a one-shot expiry
    /// after `delay_us` microseconds.
    pub fn register_oneshot(
        &self,
        handle: &EventHandle,
        registration: Registration,
        delay_us: u32,
    ) -> EventResult<()> {
        self.register_oneshot_after(handle, registration, Timespec::from_micros(delay_us))
    }

    /// Like [`register_oneshot`](Self::register_oneshot) with an explicit
    /// delay.
    ///
    /// An invalid delay is rejected before anything is stored. A readiness
    /// timeout or a programming failure leaves the registration in place but
    /// the timer untouched; both are soft failures.
    pub fn register_oneshot_after(
        &self,
        handle: &EventHandle,
        registration: Registration,
        delay: Timespec,
    ) -> EventResult<()> {
        trace!("oneshot > {delay}");
        if !delay.is_valid() {
            error!("oneshot: invalid delay {delay}");
            return Err(EventError::InvalidDelay(delay));
        }

        if !self.owns(handle) {
            warn!("oneshot: handle belongs to another scheduler, expiry will not reach it");
        }
        handle.register(registration);

        let spec = TimerSpec::oneshot(delay);
        match self.resource.with_ready(|timer| timer.set_time(&spec)) {
            Ok(Ok(())) => {
                trace!("oneshot <");
                Ok(())
            }
            Ok(Err(err)) => {
                error!("oneshot: set_time failed: {err}");
                Err(EventError::OneshotFailed(err))
            }
            Err(err) => {
                error!("oneshot: {err}");
                Err(err)
            }
        }
    }

    /// Delivers the pending registration on the calling thread.
    ///
    /// Returns `false` if nothing was registered.
    pub fn trigger_registered_callback(&self) -> bool {
        match self.handle.take() {
            Some(registration) => {
                registration.invoke();
                true
            }
            None => false,
        }
    }

    /// Destroys the timer. Returns `false` (a logged no-op) when the timer
    /// is not ready.
    pub fn destroy(&self) -> bool {
        trace!("destroy >");
        let destroyed = self.resource.destroy();
        trace!("destroy <");
        destroyed
    }

    /// Same as [`destroy`](Self::destroy); the handle is not consulted.
    pub fn destroy_handle(&self, _handle: &EventHandle) -> bool {
        self.destroy()
    }

    fn program_poll(&self, op: &str, spec: &TimerSpec) -> EventResult<()> {
        trace!("{op} >");
        let programmed = self
            .resource
            .with_ready(|timer| timer.set_time(spec))
            .map_err(|err| {
                error!("{op}: {err}");
                err
            })?;
        if let Err(err) = programmed {
            return Err(self.escalate(EventError::SetTime(err)));
        }
        trace!("{op} <");
        Ok(())
    }

    fn escalate(&self, err: EventError) -> EventError {
        error!("unrecoverable timer failure: {err}");
        match self.config.failure_policy {
            FailurePolicy::Terminate => process::exit(FATAL_EXIT_CODE),
            FailurePolicy::Report => err,
        }
    }

    fn owns(&self, handle: &EventHandle) -> bool {
        std::ptr::eq(handle, Arc::as_ptr(&self.handle))
    }
}
