//! System configuration parameters
//!
//! All tunable parameters for the monitoring system.  Defaults reproduce the
//! reference wiring in [`pins`](crate::pins); a JSON file may override any
//! subset of fields.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::{CONSUMER_LABEL_LEN, LineRequest};
use crate::control::motion::MotionPolicy;
use crate::error::{Error, Result};
use crate::pins;
use crate::sensors::Thresholds;

/// Bounds for a single line-monitor wait.
pub const MIN_WAIT_TIMEOUT_MS: u64 = 1_000;
pub const MAX_WAIT_TIMEOUT_MS: u64 = 5_000;

/// One TMP117 on the shared bus and the GPIO line carrying its ALERT pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Stable id used in logs and published samples
    pub id: u32,
    /// 7-bit bus address
    pub address: u8,
    /// GPIO line wired to the sensor's ALERT (data-ready) pin
    pub alert_line: u32,
    /// Consumer label shown by the kernel for the ALERT line
    pub consumer: String,
    pub thresholds: Thresholds,
    /// Reject devices whose Device_ID register is not a TMP117
    pub verify_identity: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            id: 1,
            address: pins::TMP117_1_ADDR,
            alert_line: pins::TMP117_1_ALERT_LINE,
            consumer: "TMP117 ALERT 1".into(),
            thresholds: Thresholds::default(),
            verify_identity: true,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- GPIO ---
    /// `/dev/gpiochipN` index
    pub gpio_chip: u32,
    pub motion_line: u32,
    pub motion_consumer: String,
    pub buzzer_line: u32,
    pub buzzer_consumer: String,
    /// Bounded wait per monitor loop iteration (milliseconds)
    pub wait_timeout_ms: u64,
    /// Emit one falling edge for an ALERT line already LOW at start-up
    pub synthesize_initial_falling: bool,

    // --- Bus / sensors ---
    pub i2c_bus: String,
    pub sensors: Vec<SensorConfig>,
    /// Buzzer pulse on an out-of-band reading (seconds)
    pub alert_secs: u64,
    /// Pointer-write to result-read delay (milliseconds)
    pub settle_ms: u64,
    /// Power-up wait before the first register access (milliseconds)
    pub boot_ms: u64,

    // --- Motion ---
    pub motion_policy: MotionPolicy,
    /// Inactivity window before the camera is stopped (seconds)
    pub motion_window_secs: u64,
    /// Coordinator tick (milliseconds)
    pub motion_tick_ms: u64,
    /// Buzzer pulse on motion (seconds); 0 disables the motion alert
    pub motion_alert_secs: u64,
    /// Preview command started while motion is active
    pub camera_command: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // GPIO
            gpio_chip: pins::GPIO_CHIP,
            motion_line: pins::MOTION_LINE,
            motion_consumer: "Motion Sensor".into(),
            buzzer_line: pins::BUZZER_LINE,
            buzzer_consumer: "Buzzer".into(),
            wait_timeout_ms: 1_000,
            synthesize_initial_falling: true,

            // Bus / sensors
            i2c_bus: pins::I2C_BUS_PATH.into(),
            sensors: vec![
                SensorConfig::default(),
                SensorConfig {
                    id: 2,
                    address: pins::TMP117_2_ADDR,
                    alert_line: pins::TMP117_2_ALERT_LINE,
                    consumer: "TMP117 ALERT 2".into(),
                    ..SensorConfig::default()
                },
            ],
            alert_secs: 1,
            settle_ms: 1,
            boot_ms: 200,

            // Motion
            motion_policy: MotionPolicy::TopUp,
            motion_window_secs: 10,
            motion_tick_ms: 1_000,
            motion_alert_secs: 1,
            camera_command: vec!["rpicam-hello".into(), "-t".into(), "0".into()],
        }
    }
}

impl SystemConfig {
    /// Read a JSON file.  Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            error!("Config: cannot read {}: {}", path.display(), e);
            Error::Config("config file unreadable")
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            error!("Config: {} is not valid: {}", path.display(), e);
            Error::Config("config file malformed")
        })?;
        config.validate()?;
        info!("Config: loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_WAIT_TIMEOUT_MS..=MAX_WAIT_TIMEOUT_MS).contains(&self.wait_timeout_ms) {
            return Err(Error::Config("wait_timeout_ms must be within 1000..=5000"));
        }
        if self.motion_window_secs == 0 {
            return Err(Error::Config("motion_window_secs must be non-zero"));
        }
        if self.motion_tick_ms == 0 || self.motion_tick_ms > self.motion_window_secs.saturating_mul(1_000) {
            return Err(Error::Config("motion_tick_ms must be within 1..=window"));
        }
        if self.camera_command.is_empty() {
            return Err(Error::Config("camera_command is empty"));
        }

        let labels = self
            .sensors
            .iter()
            .map(|s| s.consumer.as_str())
            .chain([self.motion_consumer.as_str(), self.buzzer_consumer.as_str()]);
        for label in labels {
            if label.len() > CONSUMER_LABEL_LEN {
                return Err(Error::Config("consumer label longer than 32 bytes"));
            }
        }

        let mut addresses = HashSet::new();
        for sensor in &self.sensors {
            if sensor.thresholds.low >= sensor.thresholds.high {
                return Err(Error::Config("sensor low threshold must be below high"));
            }
            if sensor.address > 0x7F {
                return Err(Error::Config("sensor address is not a 7-bit address"));
            }
            if !addresses.insert(sensor.address) {
                return Err(Error::Config("duplicate sensor address"));
            }
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn motion_window(&self) -> Duration {
        Duration::from_secs(self.motion_window_secs)
    }

    pub fn motion_tick(&self) -> Duration {
        Duration::from_millis(self.motion_tick_ms)
    }

    pub fn motion_request(&self) -> LineRequest {
        LineRequest::new(self.gpio_chip, self.motion_line, &self.motion_consumer)
    }

    pub fn buzzer_request(&self) -> LineRequest {
        LineRequest::new(self.gpio_chip, self.buzzer_line, &self.buzzer_consumer)
    }

    pub fn alert_request(&self, sensor: &SensorConfig) -> LineRequest {
        LineRequest::new(self.gpio_chip, sensor.alert_line, &sensor.consumer)
    }
}
