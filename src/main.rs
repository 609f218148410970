//! SmartMon main entry point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  CdevGpio       I2cDevBus     ProcessCamera   LogPublisher   │
//! │  (GpioPort)     (BusPort)     (CameraPort)    (Sample/Disp.) │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │ MonitoringSystem                                   │      │
//! │  │ LineMonitors · TMP117 sensors · MotionCoordinator  │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use smartmon::adapters::camera::ProcessCamera;
use smartmon::adapters::gpio_cdev::CdevGpio;
use smartmon::adapters::i2c_dev::I2cDevBus;
use smartmon::adapters::log_sink::{LogDisplay, LogPublisher};
use smartmon::app::system::{MonitoringSystem, Ports};
use smartmon::config::SystemConfig;
use smartmon::drivers::buzzer::Buzzer;

const CONFIG_ENV: &str = "SMARTMON_CONFIG";

fn load_config() -> SystemConfig {
    let Some(path) = std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok()) else {
        info!("Config: no file given, using defaults");
        return SystemConfig::default();
    };
    match SystemConfig::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load from {} failed ({}), using defaults", path, e);
            SystemConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartMon v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config (file or defaults) ──────────────────────────
    let config = load_config();

    // ── 3. Adapters ───────────────────────────────────────────
    let gpio = CdevGpio::new();
    let buzzer = Buzzer::from_request(gpio.request_output(&config.buzzer_request()));
    let camera = ProcessCamera::new(&config.camera_command).context("camera command")?;

    let ports = Ports {
        gpio,
        bus: I2cDevBus::new(config.i2c_bus.clone()),
        camera,
        alarm: Arc::new(buzzer),
        publisher: Some(Arc::new(LogPublisher::new())),
        display: Some(Arc::new(LogDisplay::new("temperature"))),
    };

    // ── 4. Run until Enter ────────────────────────────────────
    let mut system = MonitoringSystem::build(&config, ports).context("invalid configuration")?;
    system.start();

    info!("Press Enter to stop");
    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        warn!("stdin read failed ({}), shutting down", e);
    }

    system.stop();
    info!("Goodbye");
    Ok(())
}
