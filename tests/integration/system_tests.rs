//! Full wiring through `MonitoringSystem` with every port mocked.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use smartmon::app::system::{MonitoringSystem, Ports};
use smartmon::config::SystemConfig;
use smartmon::events::{EdgeKind, Level};

use crate::mock_hw::{
    BusControl, MockBus, MockCamera, MockDisplay, MockGpio, MockPublisher, RecordingAlarm, wait_until,
};

/// 25 °C and 35 °C.
const RAW_NORMAL: i16 = 3200;
const RAW_HOT: i16 = 4480;

struct Rig {
    system: MonitoringSystem<MockGpio, MockBus, MockCamera>,
    gpio: MockGpio,
    bus: Arc<BusControl>,
    camera: MockCamera,
    alarm: Arc<RecordingAlarm>,
    publisher: Arc<MockPublisher>,
    display: Arc<MockDisplay>,
    motion_tx: Sender<EdgeKind>,
    alert_tx: Vec<Sender<EdgeKind>>,
}

fn test_config() -> SystemConfig {
    SystemConfig {
        alert_secs: 0,
        settle_ms: 0,
        boot_ms: 0,
        motion_tick_ms: 10,
        motion_window_secs: 1,
        motion_alert_secs: 0,
        ..SystemConfig::default()
    }
}

fn rig(config: &SystemConfig, alert_level: Level) -> Rig {
    let gpio = MockGpio::new();
    let motion_tx = gpio.line(config.motion_line, Level::Low);
    let alert_tx = config
        .sensors
        .iter()
        .map(|s| gpio.line(s.alert_line, alert_level))
        .collect();

    let (bus, control) = MockBus::new();
    control.add_tmp117(config.sensors[0].address, RAW_NORMAL);
    control.add_tmp117(config.sensors[1].address, RAW_HOT);

    let camera = MockCamera::default();
    let alarm = Arc::new(RecordingAlarm::default());
    let publisher = Arc::new(MockPublisher::default());
    let display = Arc::new(MockDisplay::default());

    let ports = Ports {
        gpio: gpio.clone(),
        bus,
        camera: camera.clone(),
        alarm: alarm.clone(),
        publisher: Some(publisher.clone()),
        display: Some(display.clone()),
    };
    let system = MonitoringSystem::build(config, ports).unwrap();

    Rig {
        system,
        gpio,
        bus: control,
        camera,
        alarm,
        publisher,
        display,
        motion_tx,
        alert_tx,
    }
}

#[test]
fn start_brings_everything_up_and_stop_releases_it() {
    let mut rig = rig(&test_config(), Level::High);
    let status = rig.system.start();

    assert_eq!(status.sensors_initialized, 2);
    assert_eq!(status.sensor_monitors_running, 2);
    assert!(status.motion_monitor_running);
    assert!(status.coordinator_running);
    assert_eq!(rig.gpio.open_lines(), 3);

    // Continuous-conversion config written to both devices.
    for address in [0x48u8, 0x49] {
        let config = rig.bus.registers.lock().unwrap()[&address][&0x01];
        assert_eq!(u16::from_be_bytes(config), 0x0204);
    }

    rig.system.stop();
    assert!(!rig.system.is_running());
    assert_eq!(rig.gpio.open_lines(), 0);
    rig.system.stop();
}

#[test]
fn data_ready_edges_publish_and_alert() {
    let mut rig = rig(&test_config(), Level::High);
    rig.system.start();
    let published_at_start = rig.publisher.samples.lock().unwrap().len();

    rig.alert_tx[0].send(EdgeKind::Falling).unwrap();
    rig.alert_tx[1].send(EdgeKind::Falling).unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        rig.publisher.samples.lock().unwrap().len() == published_at_start + 2
    }));
    assert!(wait_until(Duration::from_secs(1), || rig.alarm.pulses() == 1));

    let samples = rig.publisher.samples.lock().unwrap().clone();
    let mut ids: Vec<u32> = samples[published_at_start..].iter().map(|s| s.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
    assert!(rig.display.values.lock().unwrap().contains(&35.0));

    rig.system.stop();
    assert_eq!(rig.alarm.last(), Some(false));
}

#[test]
fn latched_low_alert_lines_are_read_at_start() {
    let mut rig = rig(&test_config(), Level::Low);
    rig.system.start();

    // One synthesized falling edge per sensor.
    assert!(wait_until(Duration::from_secs(2), || rig.alarm.pulses() == 1));
    assert!(wait_until(Duration::from_secs(1), || {
        rig.display.values.lock().unwrap().iter().filter(|v| **v == 25.0).count() >= 1
    }));
    rig.system.stop();
}

#[test]
fn failed_alert_line_is_skipped() {
    let config = test_config();
    let mut rig = rig(&config, Level::High);
    rig.gpio.fail_line(config.sensors[1].alert_line);

    let status = rig.system.start();
    assert_eq!(status.sensor_monitors_running, 1);
    assert!(status.motion_monitor_running);
    assert!(status.coordinator_running);

    rig.system.stop();
    assert_eq!(rig.gpio.open_lines(), 0);
}

#[test]
fn motion_starts_camera_and_stop_shuts_it_down() {
    let mut rig = rig(&test_config(), Level::High);
    rig.system.start();

    rig.motion_tx.send(EdgeKind::Rising).unwrap();
    assert!(wait_until(Duration::from_secs(1), || rig.camera.running()));
    assert!(rig.system.coordinator().is_active());

    rig.system.stop();
    assert!(!rig.camera.running());
    assert_eq!(rig.camera.starts(), 1);
    assert_eq!(rig.camera.stops(), 1);
}

#[test]
fn invalid_config_is_rejected_at_build() {
    let mut config = test_config();
    config.sensors[1].address = config.sensors[0].address;

    let (bus, _control) = MockBus::new();
    let ports = Ports {
        gpio: MockGpio::new(),
        bus,
        camera: MockCamera::default(),
        alarm: Arc::new(RecordingAlarm::default()),
        publisher: None,
        display: None,
    };
    assert!(MonitoringSystem::build(&config, ports).is_err());
}
