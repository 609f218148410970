//! Unified error types for the monitoring core.
//!
//! One `Error` enum that every subsystem converts into.  All variants are
//! `Copy` so they can be handed across the monitor threads and logged
//! without allocation.
//!
//! | Family                | Raised by                      | Handling                      |
//! |-----------------------|--------------------------------|-------------------------------|
//! | [`HardwareError`]     | line monitor `start()`         | surfaced to the caller        |
//! | [`BusError`]          | bus transactions               | recovered locally (no value)  |
//! | [`ActuatorError`]     | actuator construction / writes | logged, calls become no-ops   |

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A GPIO chip or line could not be opened or configured.
    Hardware(HardwareError),
    /// A shared-bus transaction failed part-way.
    Bus(BusError),
    /// An actuator could not be driven.
    Actuator(ActuatorError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware unavailable: {e}"),
            Self::Bus(e) => write!(f, "bus transaction failed: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware (GPIO) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// `/dev/gpiochipN` could not be opened.
    ChipOpen { chip: u32, kind: io::ErrorKind },
    /// The line could not be requested for edge events.
    LineRequest { chip: u32, line: u32, kind: io::ErrorKind },
    /// Waiting on or reading from a requested line failed.
    LineIo(io::ErrorKind),
    /// `start()` called on a monitor that already owns a line.
    AlreadyRunning,
    /// The worker thread could not be created.
    ThreadSpawn,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipOpen { chip, kind } => write!(f, "gpiochip{chip} open failed ({kind})"),
            Self::LineRequest { chip, line, kind } => {
                write!(f, "gpiochip{chip} line {line} request failed ({kind})")
            }
            Self::LineIo(kind) => write!(f, "line I/O failed ({kind})"),
            Self::AlreadyRunning => write!(f, "monitor already running"),
            Self::ThreadSpawn => write!(f, "worker thread spawn failed"),
        }
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Every step of an open → select → write → read → close sequence can fail
/// independently; the variant records which one did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    Open(io::ErrorKind),
    Select { address: u8, kind: io::ErrorKind },
    Write(io::ErrorKind),
    Read(io::ErrorKind),
    /// Fewer bytes than requested came back.
    ShortTransfer { expected: usize, actual: usize },
    /// The identity register did not hold the expected device id.
    IdentityMismatch { expected: u16, actual: u16 },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(kind) => write!(f, "bus open failed ({kind})"),
            Self::Select { address, kind } => {
                write!(f, "address select 0x{address:02X} failed ({kind})")
            }
            Self::Write(kind) => write!(f, "write failed ({kind})"),
            Self::Read(kind) => write!(f, "read failed ({kind})"),
            Self::ShortTransfer { expected, actual } => {
                write!(f, "short transfer ({actual} of {expected} bytes)")
            }
            Self::IdentityMismatch { expected, actual } => {
                write!(f, "device id 0x{actual:04X}, expected 0x{expected:04X}")
            }
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// The output line could not be acquired at construction time.
    Unavailable,
    /// Setting the output level failed.
    WriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "actuator unavailable"),
            Self::WriteFailed => write!(f, "output write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
