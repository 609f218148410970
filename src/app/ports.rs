//! Port traits: the boundary between the monitoring core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ core (monitors, sensors, coordinator)
//! ```
//!
//! Driven adapters (GPIO character device, i2c-dev, camera process, log
//! sinks) implement these traits.  The core consumes them through generics
//! or `Arc<dyn …>`, so nothing in `drivers`, `sensors` or `control` touches
//! a device node directly and every component is testable with mocks.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::events::SensorSample;
use crate::error::{BusError, HardwareError, Result};
use crate::events::{EdgeEvent, Level};

/// Kernel limit for a GPIO consumer label.
pub const CONSUMER_LABEL_LEN: usize = 32;

// ───────────────────────────────────────────────────────────────
// GPIO input port (driven adapter: hardware → core)
// ───────────────────────────────────────────────────────────────

/// Identifies one digital input line and who is holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub chip: u32,
    pub line: u32,
    pub consumer: heapless::String<CONSUMER_LABEL_LEN>,
}

impl LineRequest {
    /// Build a request; labels longer than the kernel limit are truncated.
    pub fn new(chip: u32, line: u32, consumer: &str) -> Self {
        let mut label = heapless::String::new();
        for c in consumer.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        Self {
            chip,
            line,
            consumer: label,
        }
    }
}

/// Opens GPIO lines for both-edge notification.
pub trait GpioPort {
    type Line: EdgeLine + Send + 'static;

    /// Open the chip, request the line for rising and falling edges.
    /// Dropping the returned line releases it and the chip handle.
    fn request_edges(&self, request: &LineRequest) -> core::result::Result<Self::Line, HardwareError>;
}

/// A line requested for edge events.
pub trait EdgeLine {
    /// Block for at most `timeout`.  `Ok(None)` means the wait timed out.
    fn wait_edge(&mut self, timeout: Duration) -> core::result::Result<Option<EdgeEvent>, HardwareError>;

    /// Current logic level of the line.
    fn level(&mut self) -> core::result::Result<Level, HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: core ↔ shared I²C bus)
// ───────────────────────────────────────────────────────────────

/// Raw steps of one bus transaction.  Callers never use this directly;
/// [`SharedBus`](crate::sensors::bus::SharedBus) sequences the steps under
/// the bus lock.
pub trait BusPort: Send {
    fn open(&mut self) -> core::result::Result<(), BusError>;
    fn select(&mut self, address: u8) -> core::result::Result<(), BusError>;
    fn write(&mut self, bytes: &[u8]) -> core::result::Result<(), BusError>;
    /// Fill `buf` completely or fail.
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<(), BusError>;
    /// Release the bus handle.  Safe to call when not open.
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event listeners (core → core)
// ───────────────────────────────────────────────────────────────

/// Receives every edge dispatched by a [`LineMonitor`](crate::drivers::line_monitor::LineMonitor).
///
/// Called on the monitor's worker thread.  Implementations must return
/// promptly: a slow listener delays delivery of later edges on that line.
pub trait EdgeListener: Send + Sync {
    fn on_edge(&self, event: &EdgeEvent) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (core → hardware / collaborators)
// ───────────────────────────────────────────────────────────────

/// Binary alert output shared by several logical owners.
pub trait Alarm: Send + Sync {
    fn activate(&self);
    fn deactivate(&self);

    /// Sound for `duration`.  The output lock is not held across the sleep,
    /// so another owner may toggle in between.
    fn pulse(&self, duration: Duration) {
        self.activate();
        std::thread::sleep(duration);
        self.deactivate();
    }
}

/// Frame-capture / preview collaborator.  The core only starts and stops it.
pub trait CameraPort: Send {
    fn start(&mut self) -> io::Result<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Outbound data ports (core → telemetry / display)
// ───────────────────────────────────────────────────────────────

/// Telemetry publisher.  Returns `false` when no subscriber is attached;
/// callers log and move on.
pub trait SamplePublisher: Send + Sync {
    fn publish(&self, sample: &SensorSample) -> bool;
}

/// Display sink.  Marshalling onto a UI thread is the implementor's job.
pub trait DisplayPort: Send + Sync {
    fn update(&self, value: f64);
}
