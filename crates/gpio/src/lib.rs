//! # pal-gpio
//!
//! GPIO collaborator of the Linux platform abstraction layer: drives the
//! reset and power lines of a secure element high or low.
//!
//! ## Module Overview
//! - [`line`]  – Levels, line references and the [`LineDriver`] seam.
//! - [`cdev`]  – Linux GPIO character-device backend (uAPI v2).
//! - [`pal`]   – [`PalGpio`] context, also an `embedded-hal` output pin.
//!
//! Failures are logged and returned as [`GpioError`]; none are fatal.

#[cfg(target_os = "linux")]
pub mod cdev;
pub mod error;
pub mod line;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pal;

#[cfg(target_os = "linux")]
pub use cdev::CdevDriver;
pub use error::{GpioError, GpioResult};
pub use line::{Level, LineDriver, LinePin};
pub use pal::PalGpio;
