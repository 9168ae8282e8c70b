//! PAL GPIO context
//!
//! [`PalGpio`] owns a line driver and, optionally, the line it drives. A
//! context without a line accepts every call and touches no hardware.

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{error, trace};

use crate::error::{GpioError, GpioResult};
use crate::line::{Level, LineDriver, LinePin};

/// GPIO context for one output line
#[derive(Debug)]
pub struct PalGpio<D: LineDriver> {
    driver: D,
    line: Option<LinePin>,
}

impl<D: LineDriver> PalGpio<D> {
    /// Context with no line attached.
    pub fn new(driver: D) -> Self {
        Self { driver, line: None }
    }

    pub fn with_line(driver: D, line: LinePin) -> Self {
        Self {
            driver,
            line: Some(line),
        }
    }

    pub fn line(&self) -> Option<&LinePin> {
        self.line.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Nothing is held between writes, so there is nothing to set up.
    pub fn init(&mut self) -> GpioResult<()> {
        trace!("gpio init {:?}", self.line);
        Ok(())
    }

    pub fn deinit(&mut self) -> GpioResult<()> {
        trace!("gpio deinit {:?}", self.line);
        Ok(())
    }

    pub fn set_high(&mut self) -> GpioResult<()> {
        self.write(Level::High)
    }

    pub fn set_low(&mut self) -> GpioResult<()> {
        self.write(Level::Low)
    }

    fn write(&self, level: Level) -> GpioResult<()> {
        let Some(line) = &self.line else {
            return Ok(());
        };
        self.driver.write_line(line, level).map_err(|err| {
            error!("failed to drive {line} {level:?}: {err}");
            err
        })
    }
}

impl<D: LineDriver> ErrorType for PalGpio<D> {
    type Error = GpioError;
}

impl<D: LineDriver> OutputPin for PalGpio<D> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        PalGpio::set_low(self)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        PalGpio::set_high(self)
    }
}
