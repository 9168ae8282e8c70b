//! # pal-os-event
//!
//! Timer and event services of the Linux platform abstraction layer. A
//! secure-element host stack uses them to pace polling of its interface:
//! a single shared OS interval timer that is safely created, armed,
//! disarmed, re-armed and destroyed from any thread, plus one event handle
//! carrying at most one pending callback.
//!
//! ## Module Overview
//! - [`timespec`]  – `timespec`/`itimerspec` mirrors and protocol constants.
//! - [`driver`]    – Object-safe OS timer seam ([`TimerDriver`], [`OsTimer`]).
//! - [`thread_timer`] – Monotonic, thread-delivered timer driver.
//! - [`handle`]    – Event handle and callback registration.
//! - [`scheduler`] – Create/start/stop/arm/disarm/one-shot/trigger/destroy.
//! - [`global`]    – The process-wide scheduler and its free functions.
//!
//! Unrecoverable timer failures follow the configured [`FailurePolicy`];
//! everything else is logged through the [`log`] facade and returned as a
//! soft [`EventError`].

pub mod config;
pub mod driver;
pub mod error;
pub mod global;
pub mod handle;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod notifier;
mod resource;
pub mod scheduler;
pub mod thread_timer;
pub mod timespec;

pub use config::{FailurePolicy, SchedulerConfig, SchedulerConfigBuilder, FATAL_EXIT_CODE};
pub use driver::{ExpiryHook, OsTimer, TimerDriver, TimerId};
pub use error::{EventError, EventResult, TimerError};
pub use handle::{EventCallback, EventContext, EventHandle, Registration};
pub use resource::Lifecycle;
pub use scheduler::EventScheduler;
pub use thread_timer::ThreadTimerDriver;
pub use timespec::{Timespec, TimerSpec};
#[cfg(test)]
mod tests;
