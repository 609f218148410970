//! Audible motion alert.
//!
//! Sounds the shared alarm for a fixed duration on every motion rising
//! edge.  Runs on the motion monitor's worker thread, after the camera
//! coordinator in registration order.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::app::ports::{Alarm, EdgeListener};
use crate::error::Result;
use crate::events::{EdgeEvent, EdgeKind};

pub struct MotionAlert {
    alarm: Arc<dyn Alarm>,
    duration: Duration,
}

impl MotionAlert {
    pub fn new(alarm: Arc<dyn Alarm>, duration: Duration) -> Self {
        Self { alarm, duration }
    }
}

impl EdgeListener for MotionAlert {
    fn on_edge(&self, event: &EdgeEvent) -> Result<()> {
        if event.kind == EdgeKind::Rising {
            info!("Motion alert: sounding buzzer for {:?}", self.duration);
            self.alarm.pulse(self.duration);
        }
        Ok(())
    }
}
