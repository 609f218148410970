//! Line monitor lifecycle and dispatch against a channel-fed mock line.

use std::sync::Arc;
use std::time::{Duration, Instant};

use smartmon::app::ports::{EdgeListener, LineRequest};
use smartmon::drivers::line_monitor::{LineMonitor, MonitorState};
use smartmon::error::{Error, HardwareError, Result};
use smartmon::events::{EdgeEvent, EdgeKind, Level};

use crate::mock_hw::{MockGpio, RecordingListener, wait_until};

const LINE: u32 = 17;

fn request() -> LineRequest {
    LineRequest::new(0, LINE, "test monitor")
}

struct FailingListener;

impl EdgeListener for FailingListener {
    fn on_edge(&self, _event: &EdgeEvent) -> Result<()> {
        Err(Error::Config("listener refused"))
    }
}

struct PanickingListener;

impl EdgeListener for PanickingListener {
    fn on_edge(&self, _event: &EdgeEvent) -> Result<()> {
        panic!("listener blew up");
    }
}

#[test]
fn stop_is_bounded_by_wait_timeout() {
    let gpio = MockGpio::new();
    let _tx = gpio.line(LINE, Level::High);
    let mut mon = LineMonitor::new(gpio).with_wait_timeout(Duration::from_millis(50));
    mon.start(&request()).unwrap();

    let t0 = Instant::now();
    mon.stop();
    assert!(t0.elapsed() < Duration::from_millis(500), "stop took {:?}", t0.elapsed());
    assert_eq!(mon.state(), MonitorState::Idle);
}

#[test]
fn stop_releases_line_and_is_idempotent() {
    let gpio = MockGpio::new();
    let _tx = gpio.line(LINE, Level::High);
    let mut mon = LineMonitor::new(gpio.clone()).with_wait_timeout(Duration::from_millis(20));

    mon.stop();
    mon.start(&request()).unwrap();
    assert_eq!(gpio.open_lines(), 1);

    mon.stop();
    assert_eq!(gpio.open_lines(), 0);
    mon.stop();
    assert_eq!(gpio.open_lines(), 0);
    assert!(!mon.is_running());
}

#[test]
fn no_dispatch_after_stop() {
    let gpio = MockGpio::new();
    let tx = gpio.line(LINE, Level::High);
    let rec = Arc::new(RecordingListener::default());
    let mut mon = LineMonitor::new(gpio).with_wait_timeout(Duration::from_millis(20));
    mon.register(rec.clone());
    mon.start(&request()).unwrap();

    tx.send(EdgeKind::Rising).unwrap();
    assert!(wait_until(Duration::from_secs(1), || rec.count() == 1));
    mon.stop();

    // The receiver is gone with the line; sending may fail and must not
    // reach the listener either way.
    let _ = tx.send(EdgeKind::Falling);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(rec.count(), 1);
}

#[test]
fn drop_stops_worker_and_releases_line() {
    let gpio = MockGpio::new();
    let _tx = gpio.line(LINE, Level::High);
    {
        let mut mon = LineMonitor::new(gpio.clone()).with_wait_timeout(Duration::from_millis(20));
        mon.start(&request()).unwrap();
        assert_eq!(gpio.open_lines(), 1);
    }
    assert_eq!(gpio.open_lines(), 0);
}

#[test]
fn failing_and_panicking_listeners_do_not_block_others() {
    let gpio = MockGpio::new();
    let tx = gpio.line(LINE, Level::High);
    let rec = Arc::new(RecordingListener::default());
    let mut mon = LineMonitor::new(gpio).with_wait_timeout(Duration::from_millis(20));
    mon.register(Arc::new(FailingListener));
    mon.register(Arc::new(PanickingListener));
    mon.register(rec.clone());
    assert_eq!(mon.listener_count(), 3);
    mon.start(&request()).unwrap();

    tx.send(EdgeKind::Rising).unwrap();
    tx.send(EdgeKind::Falling).unwrap();
    assert!(wait_until(Duration::from_secs(1), || rec.count() == 2));
    assert!(mon.is_running());
    mon.stop();

    assert_eq!(*rec.events.lock().unwrap(), vec![EdgeKind::Rising, EdgeKind::Falling]);
}

#[test]
fn failed_request_leaves_monitor_idle() {
    let gpio = MockGpio::new();
    gpio.fail_line(LINE);
    let mut mon = LineMonitor::new(gpio.clone());

    let err = mon.start(&request()).unwrap_err();
    assert!(matches!(err, Error::Hardware(HardwareError::LineRequest { line: LINE, .. })));
    assert_eq!(mon.state(), MonitorState::Idle);
    assert_eq!(gpio.open_lines(), 0);
}

#[test]
fn request_carries_consumer_label() {
    let gpio = MockGpio::new();
    let _tx = gpio.line(LINE, Level::High);
    let mut mon = LineMonitor::new(gpio.clone()).with_wait_timeout(Duration::from_millis(20));
    mon.start(&request()).unwrap();
    mon.stop();

    let requests = gpio.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].consumer.as_str(), "test monitor");
}
