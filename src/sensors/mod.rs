//! Sensor subsystem: the shared bus and the TMP117 readers on it.
//!
//! Every [`TemperatureSensor`](tmp117::TemperatureSensor) holds an
//! `Arc<SharedBus>`; the bus lock is what keeps their transactions apart.

pub mod bus;
pub mod tmp117;

use serde::{Deserialize, Serialize};

/// Where a value falls relative to the alert band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Normal,
    High,
}

/// Inclusive comfort band.  Only values strictly outside it alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: 15.0,
            high: 30.0,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, value: f64) -> Band {
        if value > self.high {
            Band::High
        } else if value < self.low {
            Band::Low
        } else {
            Band::Normal
        }
    }
}
