//! GPIO line abstraction

use core::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GpioResult;

/// GPIO line levels
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Inactive
    Low,
    /// Active
    High,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        value == Level::High
    }
}

/// A single line on a GPIO chip: device path plus line offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinePin {
    chip: PathBuf,
    offset: u32,
}

impl LinePin {
    pub fn new(chip: impl Into<PathBuf>, offset: u32) -> Self {
        Self {
            chip: chip.into(),
            offset,
        }
    }

    /// GPIO chip device, e.g. `/dev/gpiochip0`
    pub fn chip(&self) -> &Path {
        &self.chip
    }

    /// Line offset within the chip
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl fmt::Display for LinePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chip.display(), self.offset)
    }
}

/// Line writer (object-safe)
///
/// Each call is one complete request session: open the chip, request the
/// line as an output driven to `level`, and release everything before
/// returning, whether or not the request succeeded.
pub trait LineDriver: Send + Sync {
    fn write_line(&self, pin: &LinePin, level: Level) -> GpioResult<()>;
}

impl<D: LineDriver + ?Sized> LineDriver for &D {
    fn write_line(&self, pin: &LinePin, level: Level) -> GpioResult<()> {
        (**self).write_line(pin, level)
    }
}
