//! Scheduler configuration.

use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::timespec::DEFAULT_READINESS_TIMEOUT;

/// Exit status used when an unrecoverable timer failure terminates the
/// process.
pub const FATAL_EXIT_CODE: i32 = 1;

/// What to do with an unrecoverable timer failure.
///
/// Upper layers assume `arm`/`disarm` either worked or the process is gone.
/// `Report` hands the error back instead; callers that choose it must stop
/// driving the secure element when [`EventError::is_unrecoverable`] is true.
///
/// [`EventError::is_unrecoverable`]: crate::EventError::is_unrecoverable
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and exit the process with [`FATAL_EXIT_CODE`].
    #[default]
    Terminate,
    /// Return the error to the caller.
    Report,
}

/// Configuration for an [`EventScheduler`](crate::EventScheduler).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Longest time an operation waits for the timer to become ready.
    pub readiness_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            failure_policy: FailurePolicy::Terminate,
        }
    }
}

impl SchedulerConfig {
    /// Creates a new scheduler configuration builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

/// Builder for [`SchedulerConfig`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Sets the readiness wait bound.
    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.config.readiness_timeout = timeout;
        self
    }

    /// Sets the unrecoverable-failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Builds the scheduler configuration.
    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}
