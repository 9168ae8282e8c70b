//! Error types for the timer driver and the event scheduler.

use core::time::Duration;
use std::io;

use thiserror::Error;

use crate::driver::TimerId;
use crate::resource::Lifecycle;
use crate::timespec::{Timespec, TimerSpec};

/// Failures reported by a [`TimerDriver`](crate::driver::TimerDriver) or
/// one of its timers.
#[derive(Error, Debug)]
pub enum TimerError {
    #[error("timer creation failed: {0}")]
    Create(#[source] io::Error),
    #[error("invalid timer programming ({0})")]
    InvalidSpec(TimerSpec),
    #[error("timer {0} has been deleted")]
    Deleted(TimerId),
    #[error("timer backend error: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced by [`EventScheduler`](crate::EventScheduler) operations.
///
/// [`ResourceExhausted`](Self::ResourceExhausted) and
/// [`SetTime`](Self::SetTime) are unrecoverable: under the default
/// [`FailurePolicy`](crate::FailurePolicy) the process exits before they can
/// be observed. The remaining variants are soft failures; the operation was
/// abandoned without touching the timer.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("timer resource exhausted: {0}")]
    ResourceExhausted(#[source] TimerError),
    #[error("failed to program poll timer: {0}")]
    SetTime(#[source] TimerError),
    #[error("timer not ready after {waited:?} (state={state})")]
    NotReady { state: Lifecycle, waited: Duration },
    #[error("invalid one-shot delay {0}")]
    InvalidDelay(Timespec),
    #[error("failed to program one-shot: {0}")]
    OneshotFailed(#[source] TimerError),
}

impl EventError {
    /// Whether the caller must treat this error as non-continuable.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_) | Self::SetTime(_))
    }
}

pub type EventResult<T> = Result<T, EventError>;
