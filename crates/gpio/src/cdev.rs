//! Linux GPIO character-device backend (uAPI v2).
//!
//! Every write opens the chip, issues `GPIO_V2_GET_LINE_IOCTL` for one output
//! line with the requested value, and closes both the request and the chip
//! descriptors before returning. Descriptors are owned by [`File`] and
//! [`OwnedFd`], so they are released on every path.

use core::mem;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use heapless::String;
use log::{debug, error};

use crate::error::{GpioError, GpioResult};
use crate::line::{Level, LineDriver, LinePin};

const GPIO_MAX_NAME_SIZE: usize = 32;
const GPIO_V2_LINES_MAX: usize = 64;
const GPIO_V2_LINE_NUM_ATTRS_MAX: usize = 10;

const GPIO_V2_LINE_FLAG_OUTPUT: u64 = 1 << 3;
const GPIO_V2_LINE_ATTR_ID_OUTPUT_VALUES: u32 = 2;

const GPIO_IOC_MAGIC: u32 = 0xB4;
const GPIO_V2_GET_LINE_NR: u32 = 0x07;
const GPIO_V2_GET_LINE_IOCTL: u32 =
    iowr(GPIO_IOC_MAGIC, GPIO_V2_GET_LINE_NR, mem::size_of::<LineRequest>());

/// Consumer label reported to the kernel for requested lines.
pub const DEFAULT_CONSUMER: &str = "trustm";

/// Consumer label, NUL padded to the kernel's fixed name size.
pub type Consumer = String<GPIO_MAX_NAME_SIZE>;

const fn iowr(ty: u32, nr: u32, size: usize) -> u32 {
    const IOC_READ_WRITE: u32 = 3;
    (IOC_READ_WRITE << 30) | ((size as u32) << 16) | (ty << 8) | nr
}

/// `struct gpio_v2_line_attribute`; the union is carried as its `u64` arm.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct LineAttribute {
    id: u32,
    padding: u32,
    value: u64,
}

/// `struct gpio_v2_line_config_attribute`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct LineConfigAttribute {
    attr: LineAttribute,
    mask: u64,
}

/// `struct gpio_v2_line_config`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct LineConfig {
    flags: u64,
    num_attrs: u32,
    padding: [u32; 5],
    attrs: [LineConfigAttribute; GPIO_V2_LINE_NUM_ATTRS_MAX],
}

/// `struct gpio_v2_line_request`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct LineRequest {
    offsets: [u32; GPIO_V2_LINES_MAX],
    consumer: [u8; GPIO_MAX_NAME_SIZE],
    config: LineConfig,
    num_lines: u32,
    event_buffer_size: u32,
    padding: [u32; 5],
    fd: i32,
}

impl LineRequest {
    /// One output line driven to `level`.
    fn single_output(offset: u32, level: Level, consumer: &str) -> Self {
        let mut attrs = [LineConfigAttribute::default(); GPIO_V2_LINE_NUM_ATTRS_MAX];
        attrs[0] = LineConfigAttribute {
            attr: LineAttribute {
                id: GPIO_V2_LINE_ATTR_ID_OUTPUT_VALUES,
                padding: 0,
                value: u64::from(bool::from(level)),
            },
            mask: 1,
        };

        let mut offsets = [0u32; GPIO_V2_LINES_MAX];
        offsets[0] = offset;

        let mut label = [0u8; GPIO_MAX_NAME_SIZE];
        let bytes = consumer.as_bytes();
        let len = bytes.len().min(GPIO_MAX_NAME_SIZE - 1);
        label[..len].copy_from_slice(&bytes[..len]);

        Self {
            offsets,
            consumer: label,
            config: LineConfig {
                flags: GPIO_V2_LINE_FLAG_OUTPUT,
                num_attrs: 1,
                padding: [0; 5],
                attrs,
            },
            num_lines: 1,
            event_buffer_size: 0,
            padding: [0; 5],
            fd: -1,
        }
    }
}

/// Line descriptor from a `GPIO_V2_GET_LINE_IOCTL` return code and the
/// request's `fd` field. errno is only consulted when the call itself failed.
fn returned_fd(rc: libc::c_int, fd: RawFd) -> io::Result<RawFd> {
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    if fd < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("kernel returned invalid line descriptor {fd}"),
        ));
    }
    Ok(fd)
}

/// [`LineDriver`] over `/dev/gpiochipN`.
#[derive(Debug, Clone)]
pub struct CdevDriver {
    consumer: Consumer,
}

impl CdevDriver {
    pub fn new() -> Self {
        let mut consumer = Consumer::new();
        // DEFAULT_CONSUMER is far below the capacity.
        let _ = consumer.push_str(DEFAULT_CONSUMER);
        Self { consumer }
    }

    /// Uses `consumer` as the label shown by `gpioinfo` for requested lines.
    pub fn with_consumer(mut self, consumer: &str) -> GpioResult<Self> {
        // One byte is reserved for the terminating NUL.
        if consumer.len() >= GPIO_MAX_NAME_SIZE {
            return Err(GpioError::InvalidConsumer(consumer.to_owned()));
        }
        self.consumer.clear();
        self.consumer
            .push_str(consumer)
            .map_err(|()| GpioError::InvalidConsumer(consumer.to_owned()))?;
        Ok(self)
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    fn open_chip(pin: &LinePin) -> GpioResult<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(pin.chip())
            .map_err(|source| {
                error!("failed to open chip {}: {source}", pin.chip().display());
                GpioError::OpenChip {
                    chip: pin.chip().to_path_buf(),
                    source,
                }
            })
    }

    fn request_output(&self, chip: &File, pin: &LinePin, level: Level) -> GpioResult<OwnedFd> {
        let mut request = LineRequest::single_output(pin.offset(), level, &self.consumer);

        // SAFETY: `request` is a properly laid out `gpio_v2_line_request` that
        // outlives the call, and `chip` is an open GPIO chip descriptor.
        let rc = unsafe {
            libc::ioctl(
                chip.as_raw_fd(),
                GPIO_V2_GET_LINE_IOCTL as _,
                &mut request as *mut LineRequest,
            )
        };
        let fd = returned_fd(rc, request.fd).map_err(|source| {
            error!(
                "request_lines failed (dev={} offset={}): {source}",
                pin.chip().display(),
                pin.offset()
            );
            GpioError::RequestLine {
                chip: pin.chip().to_path_buf(),
                offset: pin.offset(),
                source,
            }
        })?;

        // SAFETY: on success the kernel hands back a fresh descriptor that
        // nothing else owns.
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}

impl Default for CdevDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDriver for CdevDriver {
    fn write_line(&self, pin: &LinePin, level: Level) -> GpioResult<()> {
        let chip = Self::open_chip(pin)?;
        let request = self.request_output(&chip, pin, level)?;
        debug!("{pin} driven {level:?}");
        drop(request);
        drop(chip);
        Ok(())
    }
}
