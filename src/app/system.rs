//! System wiring. Builds every component from [`SystemConfig`] and the
//! injected ports, and owns their lifecycle.
//!
//! ```text
//!   motion line ──▶ LineMonitor ──▶ MotionCoordinator ──▶ camera
//!                               └─▶ MotionAlert ─────────┐
//!   ALERT 1     ──▶ LineMonitor ──▶ TemperatureSensor ───┼─▶ shared buzzer
//!   ALERT 2     ──▶ LineMonitor ──▶ TemperatureSensor ───┘
//!                                        │
//!                                 SharedBus (one lock)
//! ```
//!
//! Start order: sensors initialise, monitors start, startup reads, then
//! the coordinator's timer.  Stop runs in reverse.  A component that fails
//! to start is logged and skipped; the rest keep running.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::app::ports::{Alarm, BusPort, CameraPort, DisplayPort, GpioPort, LineRequest, SamplePublisher};
use crate::config::SystemConfig;
use crate::control::alert::MotionAlert;
use crate::control::motion::MotionCoordinator;
use crate::drivers::line_monitor::LineMonitor;
use crate::error::Result;
use crate::sensors::bus::SharedBus;
use crate::sensors::tmp117::TemperatureSensor;

/// Everything the core needs from the outside world.
pub struct Ports<G, B, C> {
    pub gpio: G,
    pub bus: B,
    pub camera: C,
    pub alarm: Arc<dyn Alarm>,
    pub publisher: Option<Arc<dyn SamplePublisher>>,
    pub display: Option<Arc<dyn DisplayPort>>,
}

/// Snapshot of what is up after `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemStatus {
    pub sensors_initialized: usize,
    pub sensor_monitors_running: usize,
    pub motion_monitor_running: bool,
    pub coordinator_running: bool,
}

struct SensorUnit<G: GpioPort, B> {
    sensor: Arc<TemperatureSensor<B>>,
    monitor: LineMonitor<G>,
    request: LineRequest,
    initialized: bool,
}

pub struct MonitoringSystem<G: GpioPort, B: BusPort + 'static, C: CameraPort + 'static> {
    alarm: Arc<dyn Alarm>,
    sensors: Vec<SensorUnit<G, B>>,
    motion: LineMonitor<G>,
    motion_request: LineRequest,
    coordinator: MotionCoordinator<C>,
    running: bool,
}

impl<G, B, C> MonitoringSystem<G, B, C>
where
    G: GpioPort + Clone,
    B: BusPort + 'static,
    C: CameraPort + 'static,
{
    /// Validate `config` and build every component.  Nothing is started.
    pub fn build(config: &SystemConfig, ports: Ports<G, B, C>) -> Result<Self> {
        config.validate()?;

        let bus = Arc::new(SharedBus::new(ports.bus));
        let wait_timeout = config.wait_timeout();

        let sensors = config
            .sensors
            .iter()
            .map(|sc| {
                let mut sensor = TemperatureSensor::new(sc.id, sc.address, Arc::clone(&bus), Arc::clone(&ports.alarm))
                    .with_thresholds(sc.thresholds)
                    .with_alert_duration(Duration::from_secs(config.alert_secs))
                    .with_settle_delay(Duration::from_millis(config.settle_ms))
                    .with_boot_delay(Duration::from_millis(config.boot_ms))
                    .with_identity_check(sc.verify_identity);
                if let Some(publisher) = &ports.publisher {
                    sensor = sensor.with_publisher(Arc::clone(publisher));
                }
                if let Some(display) = &ports.display {
                    sensor = sensor.with_display(Arc::clone(display));
                }
                let sensor = Arc::new(sensor);

                let monitor = LineMonitor::new(ports.gpio.clone())
                    .with_wait_timeout(wait_timeout)
                    .with_initial_falling(config.synthesize_initial_falling);
                monitor.register(sensor.clone());

                SensorUnit {
                    sensor,
                    monitor,
                    request: config.alert_request(sc),
                    initialized: false,
                }
            })
            .collect();

        let coordinator = MotionCoordinator::new(
            ports.camera,
            config.motion_policy,
            config.motion_window(),
            config.motion_tick(),
        );
        let motion = LineMonitor::new(ports.gpio).with_wait_timeout(wait_timeout);
        motion.register(coordinator.listener());
        if config.motion_alert_secs > 0 {
            motion.register(Arc::new(MotionAlert::new(
                Arc::clone(&ports.alarm),
                Duration::from_secs(config.motion_alert_secs),
            )));
        }

        Ok(Self {
            alarm: ports.alarm,
            sensors,
            motion,
            motion_request: config.motion_request(),
            coordinator,
            running: false,
        })
    }

    /// Bring everything up.  Failures are logged per component; the
    /// returned status says what actually runs.
    pub fn start(&mut self) -> SystemStatus {
        if self.running {
            return self.status();
        }
        info!("System: starting ({} sensors)", self.sensors.len());

        for unit in &mut self.sensors {
            unit.initialized = unit.sensor.initialize();
        }

        for unit in &mut self.sensors {
            if let Err(e) = unit.monitor.start(&unit.request) {
                error!("System: sensor {} monitor not started: {}", unit.sensor.id(), e);
            }
        }
        if let Err(e) = self.motion.start(&self.motion_request) {
            error!("System: motion monitor not started: {}", e);
        }

        for unit in self.sensors.iter().filter(|u| u.initialized) {
            unit.sensor.read_startup();
        }

        if let Err(e) = self.coordinator.start_monitoring() {
            error!("System: motion coordinator not started: {}", e);
        }

        self.running = true;
        let status = self.status();
        if status.sensors_initialized < self.sensors.len() {
            warn!(
                "System: {}/{} sensors initialised",
                status.sensors_initialized,
                self.sensors.len()
            );
        }
        info!("System: running {:?}", status);
        status
    }

    /// Tear down in reverse start order.  No-op when not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        info!("System: stopping");
        self.coordinator.stop_monitoring();
        self.motion.stop();
        for unit in self.sensors.iter_mut().rev() {
            unit.monitor.stop();
        }
        self.alarm.deactivate();
        self.running = false;
        info!("System: stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            sensors_initialized: self.sensors.iter().filter(|u| u.initialized).count(),
            sensor_monitors_running: self.sensors.iter().filter(|u| u.monitor.is_running()).count(),
            motion_monitor_running: self.motion.is_running(),
            coordinator_running: self.coordinator.is_monitoring(),
        }
    }

    pub fn coordinator(&self) -> &MotionCoordinator<C> {
        &self.coordinator
    }
}

impl<G: GpioPort, B: BusPort + 'static, C: CameraPort + 'static> Drop for MonitoringSystem<G, B, C> {
    fn drop(&mut self) {
        // Fields drop in declaration order; stop the coordinator first so
        // the camera is released before the monitors are joined.
        self.coordinator.stop_monitoring();
    }
}
