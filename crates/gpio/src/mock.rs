//! Recording line driver for tests.

use std::io;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{GpioError, GpioResult};
use crate::line::{Level, LineDriver, LinePin};

#[derive(Debug, Default)]
struct MockState {
    writes: Vec<(LinePin, Level)>,
    fail_open: bool,
    fail_request: bool,
}

/// [`LineDriver`] that records every write instead of touching hardware.
///
/// Clones share state, so a test can keep one clone for inspection while a
/// [`PalGpio`](crate::PalGpio) owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockLineDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockLineDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    /// Successful writes, oldest first.
    pub fn writes(&self) -> Vec<(LinePin, Level)> {
        self.state().writes.clone()
    }

    pub fn last_level(&self) -> Option<Level> {
        self.state().writes.last().map(|(_, level)| *level)
    }

    /// Fail the next writes as if the chip could not be opened.
    pub fn fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// Fail the next writes as if the kernel refused the line request.
    pub fn fail_request(&self, fail: bool) {
        self.state().fail_request = fail;
    }
}

impl LineDriver for MockLineDriver {
    fn write_line(&self, pin: &LinePin, level: Level) -> GpioResult<()> {
        let mut state = self.state();
        if state.fail_open {
            return Err(GpioError::OpenChip {
                chip: pin.chip().to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        if state.fail_request {
            return Err(GpioError::RequestLine {
                chip: pin.chip().to_path_buf(),
                offset: pin.offset(),
                source: io::Error::new(io::ErrorKind::Other, "device or resource busy"),
            });
        }
        state.writes.push((pin.clone(), level));
        Ok(())
    }
}
