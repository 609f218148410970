//! Edge events produced by line monitors.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────────┐
//! │ GPIO line   │────▶│ LineMonitor  │────▶│ listener 1 (motion) │
//! │ (both edges)│     │ worker thread│────▶│ listener 2 (alert)  │
//! └─────────────┘     └──────────────┘     └─────────────────────┘
//! ```
//!
//! Events are plain `Copy` values: created by the worker, handed to every
//! listener by reference, and dropped after the dispatch cycle.

use std::time::Instant;

/// Direction of a detected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Rising,
    Falling,
}

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// One transition observed on a monitored line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub kind: EdgeKind,
    /// Monotonic time at which the event was read from the line.
    pub timestamp: Instant,
}

impl EdgeEvent {
    pub fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            timestamp: Instant::now(),
        }
    }

    pub fn rising() -> Self {
        Self::new(EdgeKind::Rising)
    }

    pub fn falling() -> Self {
        Self::new(EdgeKind::Falling)
    }
}
