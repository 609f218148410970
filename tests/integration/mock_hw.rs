//! Mock hardware adapters for integration tests.
//!
//! Each mock records what the core did to it so tests can assert on the
//! full history without touching `/dev/gpiochip*` or `/dev/i2c-*`.  Test
//! code keeps a cloned handle (or an `Arc` to the shared control block)
//! after moving the adapter into the system.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use smartmon::app::events::SensorSample;
use smartmon::app::ports::{
    Alarm, BusPort, CameraPort, DisplayPort, EdgeLine, EdgeListener, GpioPort, LineRequest, SamplePublisher,
};
use smartmon::error::{BusError, HardwareError, Result};
use smartmon::events::{EdgeEvent, EdgeKind, Level};

/// Longest a mock line blocks per wait, so monitors stop quickly in tests.
const MOCK_WAIT_SLICE: Duration = Duration::from_millis(10);

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Default)]
struct GpioInner {
    receivers: HashMap<u32, Receiver<EdgeKind>>,
    levels: HashMap<u32, Level>,
    failing: HashSet<u32>,
    requests: Vec<LineRequest>,
}

/// GPIO port whose lines are fed from channels.
#[derive(Clone, Default)]
pub struct MockGpio {
    inner: Arc<Mutex<GpioInner>>,
    open_lines: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `line` and return the sender that injects its edges.
    pub fn line(&self, line: u32, level: Level) -> Sender<EdgeKind> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock().unwrap();
        inner.receivers.insert(line, rx);
        inner.levels.insert(line, level);
        tx
    }

    /// Make every request for `line` fail.
    pub fn fail_line(&self, line: u32) {
        self.inner.lock().unwrap().failing.insert(line);
    }

    /// Lines currently requested and not yet released.
    pub fn open_lines(&self) -> usize {
        self.open_lines.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LineRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl GpioPort for MockGpio {
    type Line = MockLine;

    fn request_edges(&self, request: &LineRequest) -> core::result::Result<MockLine, HardwareError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());
        let busy = HardwareError::LineRequest {
            chip: request.chip,
            line: request.line,
            kind: io::ErrorKind::ResourceBusy,
        };
        if inner.failing.contains(&request.line) {
            return Err(busy);
        }
        let rx = inner.receivers.remove(&request.line).ok_or(busy)?;
        let level = inner.levels.get(&request.line).copied().unwrap_or(Level::High);
        self.open_lines.fetch_add(1, Ordering::SeqCst);
        Ok(MockLine {
            rx,
            level,
            open_lines: Arc::clone(&self.open_lines),
        })
    }
}

pub struct MockLine {
    rx: Receiver<EdgeKind>,
    level: Level,
    open_lines: Arc<AtomicUsize>,
}

impl EdgeLine for MockLine {
    fn wait_edge(&mut self, timeout: Duration) -> core::result::Result<Option<EdgeEvent>, HardwareError> {
        Ok(self
            .rx
            .recv_timeout(timeout.min(MOCK_WAIT_SLICE))
            .ok()
            .map(EdgeEvent::new))
    }

    fn level(&mut self) -> core::result::Result<Level, HardwareError> {
        Ok(self.level)
    }
}

impl Drop for MockLine {
    fn drop(&mut self) {
        self.open_lines.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Bus ───────────────────────────────────────────────────────

/// Shared control block for [`MockBus`].
#[derive(Default)]
pub struct BusControl {
    /// address → register → big-endian value
    pub registers: Mutex<HashMap<u8, HashMap<u8, [u8; 2]>>>,
    pub fail_open: AtomicBool,
    pub fail_select: AtomicBool,
    pub fail_write: AtomicBool,
    pub fail_read: AtomicBool,
    /// Sleep inside every read, with the bus held.
    pub read_delay: Mutex<Duration>,
    /// Transactions open at once; stays at most 1 under the bus lock.
    pub concurrent: AtomicUsize,
    pub overlap_seen: AtomicBool,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

#[allow(dead_code)]
impl BusControl {
    pub fn set_register(&self, address: u8, register: u8, value: u16) {
        self.registers
            .lock()
            .unwrap()
            .entry(address)
            .or_default()
            .insert(register, value.to_be_bytes());
    }

    /// A TMP117 at `address` reporting `raw` in its result register.
    pub fn add_tmp117(&self, address: u8, raw: i16) {
        self.set_register(address, 0x0F, 0x0117);
        self.set_register(address, 0x00, raw as u16);
    }
}

pub struct MockBus {
    pub control: Arc<BusControl>,
    selected: Option<u8>,
    pointer: u8,
    open: bool,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> (Self, Arc<BusControl>) {
        let control = Arc::new(BusControl::default());
        let bus = Self {
            control: Arc::clone(&control),
            selected: None,
            pointer: 0,
            open: false,
        };
        (bus, control)
    }
}

impl BusPort for MockBus {
    fn open(&mut self) -> core::result::Result<(), BusError> {
        if self.control.fail_open.load(Ordering::SeqCst) {
            return Err(BusError::Open(io::ErrorKind::NotFound));
        }
        if self.control.concurrent.fetch_add(1, Ordering::SeqCst) > 0 {
            self.control.overlap_seen.store(true, Ordering::SeqCst);
        }
        self.control.opens.fetch_add(1, Ordering::SeqCst);
        self.open = true;
        Ok(())
    }

    fn select(&mut self, address: u8) -> core::result::Result<(), BusError> {
        if self.control.fail_select.load(Ordering::SeqCst) {
            return Err(BusError::Select {
                address,
                kind: io::ErrorKind::NotFound,
            });
        }
        self.selected = Some(address);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> core::result::Result<(), BusError> {
        if self.control.fail_write.load(Ordering::SeqCst) {
            return Err(BusError::Write(io::ErrorKind::BrokenPipe));
        }
        self.pointer = bytes[0];
        if let (Some(address), [register, hi, lo]) = (self.selected, bytes) {
            self.control.set_register(address, *register, u16::from_be_bytes([*hi, *lo]));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<(), BusError> {
        if self.control.fail_read.load(Ordering::SeqCst) {
            return Err(BusError::Read(io::ErrorKind::TimedOut));
        }
        let delay = *self.control.read_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let address = self.selected.ok_or(BusError::Read(io::ErrorKind::NotConnected))?;
        let value = self
            .control
            .registers
            .lock()
            .unwrap()
            .get(&address)
            .and_then(|regs| regs.get(&self.pointer).copied())
            .ok_or(BusError::Read(io::ErrorKind::NotFound))?;
        buf.copy_from_slice(&value[..buf.len()]);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.control.concurrent.fetch_sub(1, Ordering::SeqCst);
            self.control.closes.fetch_add(1, Ordering::SeqCst);
        }
        self.open = false;
        self.selected = None;
    }
}

// ── Camera ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct CameraLog {
    pub running: bool,
    pub starts: usize,
    pub stops: usize,
}

#[derive(Clone, Default)]
pub struct MockCamera {
    pub log: Arc<Mutex<CameraLog>>,
}

#[allow(dead_code)]
impl MockCamera {
    pub fn running(&self) -> bool {
        self.log.lock().unwrap().running
    }

    pub fn starts(&self) -> usize {
        self.log.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.log.lock().unwrap().stops
    }
}

impl CameraPort for MockCamera {
    fn start(&mut self) -> io::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.running = true;
        log.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.running = false;
        log.stops += 1;
    }

    fn is_running(&self) -> bool {
        self.running()
    }
}

// ── Alarm ─────────────────────────────────────────────────────

/// Records every level change in order.
#[derive(Default)]
pub struct RecordingAlarm {
    pub levels: Mutex<Vec<bool>>,
}

#[allow(dead_code)]
impl RecordingAlarm {
    pub fn pulses(&self) -> usize {
        self.levels.lock().unwrap().iter().filter(|on| **on).count()
    }

    pub fn last(&self) -> Option<bool> {
        self.levels.lock().unwrap().last().copied()
    }
}

impl Alarm for RecordingAlarm {
    fn activate(&self) {
        self.levels.lock().unwrap().push(true);
    }

    fn deactivate(&self) {
        self.levels.lock().unwrap().push(false);
    }
}

// ── Publisher / display ───────────────────────────────────────

#[derive(Default)]
pub struct MockPublisher {
    pub samples: Mutex<Vec<SensorSample>>,
}

impl SamplePublisher for MockPublisher {
    fn publish(&self, sample: &SensorSample) -> bool {
        self.samples.lock().unwrap().push(*sample);
        true
    }
}

#[derive(Default)]
pub struct MockDisplay {
    pub values: Mutex<Vec<f64>>,
}

impl DisplayPort for MockDisplay {
    fn update(&self, value: f64) {
        self.values.lock().unwrap().push(value);
    }
}

// ── Listener ──────────────────────────────────────────────────

/// Listener that records edge kinds.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<EdgeKind>>,
}

#[allow(dead_code)]
impl RecordingListener {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl EdgeListener for RecordingListener {
    fn on_edge(&self, event: &EdgeEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.kind);
        Ok(())
    }
}

/// Poll `cond` every 5 ms for up to `limit`.
#[allow(dead_code)]
pub fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + limit;
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
