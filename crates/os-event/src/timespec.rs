//! Time values exchanged with the OS timer.
//!
//! [`Timespec`] and [`TimerSpec`] mirror the kernel's `timespec` and
//! `itimerspec` so that a programmed expiry can be inspected field by field.
//! The protocol constants served by this PAL live here as well; the values
//! are fixed by the calling secure-element stack and must not be tuned.

use core::fmt;
use core::time::Duration;

/// Nanoseconds per second.
pub const NSEC_PER_SEC: i64 = 1_000_000_000;

/// Nanoseconds per microsecond.
const NSEC_PER_USEC: i64 = 1_000;

/// Delay used when an event is started, in microseconds.
pub const START_DELAY_US: u32 = 1_000;

/// First expiry of the periodic poll timer, in nanoseconds.
pub const ARM_INITIAL_NS: i64 = 1_000_000;

/// Period of the poll timer, in nanoseconds.
pub const ARM_INTERVAL_NS: i64 = 294_967_296;

/// Upper bound on waiting for the timer to become ready.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_millis(50);

/// Seconds plus nanoseconds, as handed to the OS timer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

impl Timespec {
    pub const ZERO: Timespec = Timespec { sec: 0, nsec: 0 };

    pub const fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }

    /// Splits a microsecond delay into whole seconds and a nanosecond
    /// remainder.
    pub const fn from_micros(us: u32) -> Self {
        let total_ns = us as i64 * NSEC_PER_USEC;
        Self {
            sec: total_ns / NSEC_PER_SEC,
            nsec: total_ns % NSEC_PER_SEC,
        }
    }

    pub const fn from_nanos(ns: i64) -> Self {
        Self {
            sec: ns / NSEC_PER_SEC,
            nsec: ns % NSEC_PER_SEC,
        }
    }

    /// `true` when the seconds are non-negative and the remainder lies in
    /// `[0, 1e9)`.
    pub const fn is_valid(&self) -> bool {
        self.sec >= 0 && self.nsec >= 0 && self.nsec < NSEC_PER_SEC
    }

    pub const fn is_zero(&self) -> bool {
        self.sec == 0 && self.nsec == 0
    }

    /// Converts to a [`Duration`], or `None` if the value is not valid.
    pub fn to_duration(&self) -> Option<Duration> {
        if !self.is_valid() {
            return None;
        }
        Some(Duration::new(self.sec as u64, self.nsec as u32))
    }
}

impl From<Duration> for Timespec {
    fn from(value: Duration) -> Self {
        Self {
            sec: value.as_secs().min(i64::MAX as u64) as i64,
            nsec: i64::from(value.subsec_nanos()),
        }
    }
}

impl fmt::Display for Timespec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s+{}ns", self.sec, self.nsec)
    }
}

/// Expiry programming for an interval timer.
///
/// A zero `value` disarms the timer. A zero `interval` makes it one-shot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerSpec {
    pub value: Timespec,
    pub interval: Timespec,
}

impl TimerSpec {
    pub const DISARMED: TimerSpec = TimerSpec {
        value: Timespec::ZERO,
        interval: Timespec::ZERO,
    };

    /// The periodic poll schedule: 1 ms to the first expiry, then every
    /// ~295 ms.
    pub const POLL: TimerSpec = TimerSpec {
        value: Timespec::from_nanos(ARM_INITIAL_NS),
        interval: Timespec::from_nanos(ARM_INTERVAL_NS),
    };

    pub const fn oneshot(value: Timespec) -> Self {
        Self {
            value,
            interval: Timespec::ZERO,
        }
    }

    pub const fn periodic(value: Timespec, interval: Timespec) -> Self {
        Self { value, interval }
    }

    pub const fn is_disarm(&self) -> bool {
        self.value.is_zero()
    }

    pub const fn is_periodic(&self) -> bool {
        !self.interval.is_zero()
    }

    pub const fn is_valid(&self) -> bool {
        self.value.is_valid() && self.interval.is_valid()
    }
}

impl fmt::Display for TimerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value={} interval={}", self.value, self.interval)
    }
}
