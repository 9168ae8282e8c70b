//! Common error types for GPIO line operations

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// GPIO line errors
#[derive(Error, Debug)]
pub enum GpioError {
    /// The GPIO chip device could not be opened
    #[error("failed to open chip {}: {source}", chip.display())]
    OpenChip {
        chip: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The kernel refused the line request
    #[error("line request failed (dev={} offset={offset}): {source}", chip.display())]
    RequestLine {
        chip: PathBuf,
        offset: u32,
        #[source]
        source: io::Error,
    },
    /// Consumer label longer than the kernel accepts
    #[error("consumer label too long: {0:?}")]
    InvalidConsumer(String),
}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// Result type for GPIO operations
pub type GpioResult<T> = Result<T, GpioError>;
