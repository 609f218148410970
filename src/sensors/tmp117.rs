//! TMP117 digital temperature sensor on the shared I²C bus.
//!
//! The sensor runs in continuous-conversion mode with its ALERT pin
//! configured as a data-ready flag: the pin goes LOW when a fresh result is
//! in the temperature register and returns HIGH once the register is read.
//! A [`LineMonitor`](crate::drivers::line_monitor::LineMonitor) on the ALERT
//! line calls [`on_edge`](TemperatureSensor) and the falling edge triggers
//! one bus read.
//!
//! Register map (big-endian, 16 bit):
//!
//! | Reg  | Name          | Use                                         |
//! |------|---------------|---------------------------------------------|
//! | 0x00 | Temp_Result   | signed, 7.8125 m°C / LSB                    |
//! | 0x01 | Configuration | MOD=00 (CC), CONV=100 (1 s), DR/Alert_EN=1  |
//! | 0x0F | Device_ID     | 0x0117 in bits 11:0                         |

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::events::SensorSample;
use crate::app::ports::{Alarm, BusPort, DisplayPort, EdgeListener, SamplePublisher};
use crate::error::{BusError, Result};
use crate::events::{EdgeEvent, EdgeKind};
use crate::sensors::bus::SharedBus;
use crate::sensors::{Band, Thresholds};

pub const REG_TEMP_RESULT: u8 = 0x00;
pub const REG_CONFIG: u8 = 0x01;
pub const REG_DEVICE_ID: u8 = 0x0F;

/// Device id in bits 11:0 of `Device_ID`; bits 15:12 hold the revision.
pub const DEVICE_ID: u16 = 0x0117;
const DEVICE_ID_MASK: u16 = 0x0FFF;

/// Continuous conversion, 1 s cycle, no averaging, ALERT pin = data ready.
pub const CONFIG_CONTINUOUS_1S: u16 = 0x0204;

/// °C per LSB of `Temp_Result`.
pub const RESOLUTION_C: f64 = 0.007_812_5;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1);
pub const DEFAULT_BOOT_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_ALERT_DURATION: Duration = Duration::from_secs(1);

/// Convert a raw big-endian result register to °C.
pub fn raw_to_celsius(raw: [u8; 2]) -> f64 {
    f64::from(i16::from_be_bytes(raw)) * RESOLUTION_C
}

/// A complete, valid reading.  A failed read has no reading at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub raw: [u8; 2],
    pub celsius: f64,
}

impl TemperatureReading {
    pub fn from_raw(raw: [u8; 2]) -> Self {
        Self {
            raw,
            celsius: raw_to_celsius(raw),
        }
    }
}

pub struct TemperatureSensor<B> {
    id: u32,
    address: u8,
    bus: Arc<SharedBus<B>>,
    alarm: Arc<dyn Alarm>,
    thresholds: Thresholds,
    alert_duration: Duration,
    settle_delay: Duration,
    boot_delay: Duration,
    verify_identity: bool,
    publisher: Option<Arc<dyn SamplePublisher>>,
    display: Option<Arc<dyn DisplayPort>>,
}

impl<B: BusPort> TemperatureSensor<B> {
    pub fn new(id: u32, address: u8, bus: Arc<SharedBus<B>>, alarm: Arc<dyn Alarm>) -> Self {
        Self {
            id,
            address,
            bus,
            alarm,
            thresholds: Thresholds::default(),
            alert_duration: DEFAULT_ALERT_DURATION,
            settle_delay: DEFAULT_SETTLE_DELAY,
            boot_delay: DEFAULT_BOOT_DELAY,
            verify_identity: true,
            publisher: None,
            display: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_alert_duration(mut self, duration: Duration) -> Self {
        self.alert_duration = duration;
        self
    }

    /// Delay between writing the register pointer and reading the result.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Power-up wait inside `initialize()` before the first register access.
    pub fn with_boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay;
        self
    }

    pub fn with_identity_check(mut self, verify: bool) -> Self {
        self.verify_identity = verify;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn SamplePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_display(mut self, display: Arc<dyn DisplayPort>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check identity and switch the device to continuous conversion.
    ///
    /// Failures are logged and reported as `false`; they never affect other
    /// sensors on the bus.
    pub fn initialize(&self) -> bool {
        let boot_delay = self.boot_delay;
        let verify = self.verify_identity;

        // Boot wait happens off the bus so other sensors keep reading.
        if !boot_delay.is_zero() {
            thread::sleep(boot_delay);
        }

        let result = self.bus.transaction(self.address, |s| {
            let id = u16::from_be_bytes(s.read_register::<2>(REG_DEVICE_ID)?);
            info!("TMP117[{}]: detected device id 0x{:04X}", self.id, id);
            if verify && (id & DEVICE_ID_MASK) != DEVICE_ID {
                return Err(BusError::IdentityMismatch {
                    expected: DEVICE_ID,
                    actual: id,
                });
            }

            s.write_register_u16(REG_CONFIG, CONFIG_CONTINUOUS_1S)
        });

        match result {
            Ok(()) => {
                info!(
                    "TMP117[{}]: initialised at 0x{:02X} (continuous, 1 s)",
                    self.id, self.address
                );
                true
            }
            Err(e) => {
                error!("TMP117[{}]: initialise at 0x{:02X} failed: {}", self.id, self.address, e);
                false
            }
        }
    }

    /// One complete read of `Temp_Result`, or the failing step.
    pub fn try_read(&self) -> core::result::Result<TemperatureReading, BusError> {
        let settle = self.settle_delay;
        let raw = self.bus.transaction(self.address, |s| {
            s.write(&[REG_TEMP_RESULT])?;
            thread::sleep(settle);
            let mut buf = [0u8; 2];
            s.read(&mut buf)?;
            Ok(buf)
        })?;
        Ok(TemperatureReading::from_raw(raw))
    }

    /// `None` is the no-value result: any bus failure yields it, never a
    /// stale or zero reading.  Nothing is retried here; the next data-ready
    /// edge is the retry.
    pub fn read_sample(&self) -> Option<TemperatureReading> {
        match self.try_read() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("TMP117[{}]: read failed: {}", self.id, e);
                None
            }
        }
    }

    /// Log one reading right after start-up, before the first data-ready edge.
    pub fn read_startup(&self) -> Option<TemperatureReading> {
        let reading = self.read_sample();
        match reading {
            Some(r) => info!("TMP117[{}]: startup temperature {:.2} °C", self.id, r.celsius),
            None => warn!("TMP117[{}]: startup read failed", self.id),
        }
        reading
    }

    fn forward(&self, reading: &TemperatureReading) {
        if let Some(publisher) = &self.publisher {
            let sample = SensorSample::now(self.id, reading.celsius);
            if !publisher.publish(&sample) {
                debug!("TMP117[{}]: sample not published (no subscriber)", self.id);
            }
        }
        if let Some(display) = &self.display {
            display.update(reading.celsius);
        }
    }

    fn check_thresholds(&self, celsius: f64) {
        let band = self.thresholds.classify(celsius);
        if band == Band::Normal {
            return;
        }
        warn!(
            "TMP117[{}]: ALERT {:.2} °C is {:?} (band {:.1}..{:.1}), sounding buzzer",
            self.id, celsius, band, self.thresholds.low, self.thresholds.high
        );
        self.alarm.pulse(self.alert_duration);
    }
}

impl<B: BusPort> EdgeListener for TemperatureSensor<B> {
    fn on_edge(&self, event: &EdgeEvent) -> Result<()> {
        match event.kind {
            EdgeKind::Rising => {
                debug!("TMP117[{}]: data-ready cleared", self.id);
            }
            EdgeKind::Falling => {
                let Some(reading) = self.read_sample() else {
                    return Ok(());
                };
                info!("TMP117[{}]: {:.2} °C", self.id, reading.celsius);
                self.forward(&reading);
                self.check_thresholds(reading.celsius);
            }
        }
        Ok(())
    }
}
