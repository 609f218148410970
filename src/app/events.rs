//! Outbound sensor samples.
//!
//! Sensor readers emit these through the
//! [`SamplePublisher`](super::ports::SamplePublisher) port.  Adapters on the
//! other side decide what to do with them: log, publish to a telemetry
//! topic, feed a plot.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// One valid reading, tagged with the sensor it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSample {
    pub id: u32,
    pub value: f64,
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl SensorSample {
    /// Stamp a value with the current wall-clock time.
    pub fn now(id: u32, value: f64) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            id,
            value,
            timestamp_ms,
        }
    }
}
