//! Log-based publisher and display adapters.
//!
//! Stand-ins for a telemetry bus and a UI: samples go to the log as JSON
//! lines, display updates as plain values.  A DDS or MQTT publisher would
//! implement the same [`SamplePublisher`] trait.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{info, warn};

use crate::app::events::SensorSample;
use crate::app::ports::{DisplayPort, SamplePublisher};

/// Writes every sample as one `TELEM | {json}` log line.
#[derive(Debug, Default)]
pub struct LogPublisher {
    published: AtomicU64,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl SamplePublisher for LogPublisher {
    fn publish(&self, sample: &SensorSample) -> bool {
        match serde_json::to_string(sample) {
            Ok(json) => {
                info!("TELEM | {}", json);
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!("TELEM | sample {} not serialisable: {}", sample.id, e);
                false
            }
        }
    }
}

/// Logs the latest value shown for one channel.
#[derive(Debug)]
pub struct LogDisplay {
    channel: String,
}

impl LogDisplay {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

impl DisplayPort for LogDisplay {
    fn update(&self, value: f64) {
        info!("DISPLAY | {} = {:.2}", self.channel, value);
    }
}
