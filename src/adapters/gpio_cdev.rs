//! GPIO character-device adapter (`/dev/gpiochipN`, uAPI v1).
//!
//! Implements [`GpioPort`] for edge monitoring and provides an
//! [`OutputPin`] for the buzzer.  Each request opens the chip, asks the
//! kernel for a line fd and keeps both open until the returned handle is
//! dropped.
//!
//! | ioctl                          | nr   | Use                             |
//! |--------------------------------|------|---------------------------------|
//! | `GPIO_GET_LINEHANDLE_IOCTL`    | 0x03 | output line for the buzzer      |
//! | `GPIO_GET_LINEEVENT_IOCTL`     | 0x04 | input line, both edges          |
//! | `GPIOHANDLE_GET_LINE_VALUES`   | 0x08 | current level                   |
//! | `GPIOHANDLE_SET_LINE_VALUES`   | 0x09 | drive the output                |

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use embedded_hal::digital::{self, OutputPin};
use log::{debug, warn};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, poll};

use crate::app::ports::{CONSUMER_LABEL_LEN, EdgeLine, GpioPort, LineRequest};
use crate::error::HardwareError;
use crate::events::{EdgeEvent, EdgeKind, Level};

mod sys {
    use super::CONSUMER_LABEL_LEN;

    pub const GPIOHANDLES_MAX: usize = 64;

    pub const GPIOHANDLE_REQUEST_INPUT: u32 = 1 << 0;
    pub const GPIOHANDLE_REQUEST_OUTPUT: u32 = 1 << 1;
    pub const GPIOEVENT_REQUEST_BOTH_EDGES: u32 = 0x3;

    pub const GPIOEVENT_EVENT_RISING_EDGE: u32 = 0x01;
    pub const GPIOEVENT_EVENT_FALLING_EDGE: u32 = 0x02;

    /// `struct gpioevent_data`: u64 timestamp, u32 id, 4 bytes padding.
    pub const EVENT_DATA_LEN: usize = 16;

    #[repr(C)]
    pub struct GpioHandleRequest {
        pub lineoffsets: [u32; GPIOHANDLES_MAX],
        pub flags: u32,
        pub default_values: [u8; GPIOHANDLES_MAX],
        pub consumer_label: [u8; CONSUMER_LABEL_LEN],
        pub lines: u32,
        pub fd: i32,
    }

    #[repr(C)]
    pub struct GpioEventRequest {
        pub lineoffset: u32,
        pub handleflags: u32,
        pub eventflags: u32,
        pub consumer_label: [u8; CONSUMER_LABEL_LEN],
        pub fd: i32,
    }

    #[repr(C)]
    pub struct GpioHandleData {
        pub values: [u8; GPIOHANDLES_MAX],
    }

    nix::ioctl_readwrite!(get_linehandle, 0xB4, 0x03, GpioHandleRequest);
    nix::ioctl_readwrite!(get_lineevent, 0xB4, 0x04, GpioEventRequest);
    nix::ioctl_readwrite!(get_line_values, 0xB4, 0x08, GpioHandleData);
    nix::ioctl_readwrite!(set_line_values, 0xB4, 0x09, GpioHandleData);
}

fn label_bytes(request: &LineRequest) -> [u8; CONSUMER_LABEL_LEN] {
    let mut label = [0u8; CONSUMER_LABEL_LEN];
    // Keep the final byte as the NUL terminator.
    let bytes = request.consumer.as_bytes();
    let n = bytes.len().min(CONSUMER_LABEL_LEN - 1);
    label[..n].copy_from_slice(&bytes[..n]);
    label
}

fn errno_kind(e: Errno) -> io::ErrorKind {
    io::Error::from(e).kind()
}

/// Entry point for `/dev/gpiochipN` line requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdevGpio;

impl CdevGpio {
    pub fn new() -> Self {
        Self
    }

    fn open_chip(chip: u32) -> Result<File, HardwareError> {
        let path = format!("/dev/gpiochip{chip}");
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| HardwareError::ChipOpen { chip, kind: e.kind() })
    }

    /// Request `request.line` as an output driven LOW.
    pub fn request_output(&self, request: &LineRequest) -> Result<CdevOutput, HardwareError> {
        let chip = Self::open_chip(request.chip)?;

        let mut req = sys::GpioHandleRequest {
            lineoffsets: [0; sys::GPIOHANDLES_MAX],
            flags: sys::GPIOHANDLE_REQUEST_OUTPUT,
            default_values: [0; sys::GPIOHANDLES_MAX],
            consumer_label: label_bytes(request),
            lines: 1,
            fd: -1,
        };
        req.lineoffsets[0] = request.line;

        // SAFETY: `req` is a properly initialised `gpiohandle_request` that
        // outlives the call; the kernel only writes `fd`.
        unsafe { sys::get_linehandle(chip.as_raw_fd(), &mut req) }.map_err(|e| {
            HardwareError::LineRequest {
                chip: request.chip,
                line: request.line,
                kind: errno_kind(e),
            }
        })?;

        // SAFETY: on success the kernel returned a new fd we now own.
        let line = unsafe { OwnedFd::from_raw_fd(req.fd) };
        debug!("gpiochip{}: line {} requested as output", request.chip, request.line);
        Ok(CdevOutput { line, _chip: chip })
    }
}

impl GpioPort for CdevGpio {
    type Line = CdevLine;

    fn request_edges(&self, request: &LineRequest) -> Result<CdevLine, HardwareError> {
        let chip = Self::open_chip(request.chip)?;

        let mut req = sys::GpioEventRequest {
            lineoffset: request.line,
            handleflags: sys::GPIOHANDLE_REQUEST_INPUT,
            eventflags: sys::GPIOEVENT_REQUEST_BOTH_EDGES,
            consumer_label: label_bytes(request),
            fd: -1,
        };

        // SAFETY: `req` is a properly initialised `gpioevent_request` that
        // outlives the call; the kernel only writes `fd`.
        unsafe { sys::get_lineevent(chip.as_raw_fd(), &mut req) }.map_err(|e| {
            HardwareError::LineRequest {
                chip: request.chip,
                line: request.line,
                kind: errno_kind(e),
            }
        })?;

        // SAFETY: on success the kernel returned a new fd we now own.
        let events = File::from(unsafe { OwnedFd::from_raw_fd(req.fd) });
        debug!("gpiochip{}: line {} requested for both edges", request.chip, request.line);
        Ok(CdevLine { events, _chip: chip })
    }
}

/// Input line with edge detection.  Dropping it closes the line and chip.
pub struct CdevLine {
    events: File,
    _chip: File,
}

impl EdgeLine for CdevLine {
    fn wait_edge(&mut self, timeout: Duration) -> Result<Option<EdgeEvent>, HardwareError> {
        let millis = timeout.as_millis().min(u128::from(u16::MAX)) as u16;
        let mut fds = [PollFd::new(self.events.as_fd(), PollFlags::POLLIN | PollFlags::POLLPRI)];

        match poll(&mut fds, millis) {
            Ok(0) | Err(Errno::EINTR) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(HardwareError::LineIo(errno_kind(e))),
        }

        let mut record = [0u8; sys::EVENT_DATA_LEN];
        self.events
            .read_exact(&mut record)
            .map_err(|e| HardwareError::LineIo(e.kind()))?;

        let id = u32::from_ne_bytes([record[8], record[9], record[10], record[11]]);
        let kind = match id {
            sys::GPIOEVENT_EVENT_RISING_EDGE => EdgeKind::Rising,
            sys::GPIOEVENT_EVENT_FALLING_EDGE => EdgeKind::Falling,
            other => {
                warn!("gpio: unknown event id {}", other);
                return Ok(None);
            }
        };
        Ok(Some(EdgeEvent::new(kind)))
    }

    fn level(&mut self) -> Result<Level, HardwareError> {
        let mut data = sys::GpioHandleData {
            values: [0; sys::GPIOHANDLES_MAX],
        };
        // SAFETY: `data` is a valid `gpiohandle_data` for the duration of
        // the call and the fd is a live line-event fd.
        unsafe { sys::get_line_values(self.events.as_raw_fd(), &mut data) }
            .map_err(|e| HardwareError::LineIo(errno_kind(e)))?;
        Ok(Level::from(data.values[0] != 0))
    }
}

/// Failure to drive an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdevPinError(pub io::ErrorKind);

impl digital::Error for CdevPinError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Output line.  Dropping it releases the line; the kernel leaves the
/// level where it was last set.
pub struct CdevOutput {
    line: OwnedFd,
    _chip: File,
}

impl CdevOutput {
    fn write_level(&mut self, high: bool) -> Result<(), CdevPinError> {
        let mut data = sys::GpioHandleData {
            values: [0; sys::GPIOHANDLES_MAX],
        };
        data.values[0] = u8::from(high);
        // SAFETY: `data` is a valid `gpiohandle_data` for the duration of
        // the call and the fd is a live line-handle fd.
        unsafe { sys::set_line_values(self.line.as_raw_fd(), &mut data) }
            .map(|_| ())
            .map_err(|e| CdevPinError(errno_kind(e)))
    }
}

impl digital::ErrorType for CdevOutput {
    type Error = CdevPinError;
}

impl OutputPin for CdevOutput {
    fn set_low(&mut self) -> Result<(), CdevPinError> {
        self.write_level(false)
    }

    fn set_high(&mut self) -> Result<(), CdevPinError> {
        self.write_level(true)
    }
}
