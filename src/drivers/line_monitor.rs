//! Edge-triggered line monitor.
//!
//! Owns one GPIO input line requested for both edges and runs a dedicated
//! worker thread that turns the blocking hardware wait into a multicast
//! stream of [`EdgeEvent`]s.
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──start()──▶ Running ──stop()──▶ Stopping ──join──▶ Idle
//! ```
//!
//! The worker waits with a timeout (1 s by default), re-checks the stop
//! flag on every timeout, and dispatches each genuine edge synchronously
//! before waiting again.  `stop()` therefore returns within one wait
//! timeout plus the time the current dispatch takes.
//!
//! ## Dispatch isolation
//!
//! Listeners run in registration order on the worker thread.  A listener
//! that returns `Err` or panics is logged and skipped; the remaining
//! listeners still see the event.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::ports::{CONSUMER_LABEL_LEN, EdgeLine, EdgeListener, GpioPort, LineRequest};
use crate::drivers::worker;
use crate::error::{HardwareError, Result};
use crate::events::{EdgeEvent, Level};

/// Default bounded wait per loop iteration.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a failed wait so a broken line cannot spin the CPU.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

type ListenerList = Arc<Mutex<Vec<Arc<dyn EdgeListener>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopping,
}

pub struct LineMonitor<G: GpioPort> {
    gpio: G,
    listeners: ListenerList,
    wait_timeout: Duration,
    synthesize_initial_falling: bool,
    state: MonitorState,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<G::Line>>,
    label: heapless::String<CONSUMER_LABEL_LEN>,
}

impl<G: GpioPort> LineMonitor<G> {
    pub fn new(gpio: G) -> Self {
        Self {
            gpio,
            listeners: Arc::new(Mutex::new(Vec::new())),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            synthesize_initial_falling: false,
            state: MonitorState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            label: heapless::String::new(),
        }
    }

    /// Upper bound on a single hardware wait, and so on `stop()` latency.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// When set, a line that already reads LOW at start-up produces one
    /// synthetic `Falling` event before the first wait.  Needed for
    /// latched active-low outputs (TMP117 data-ready) that would otherwise
    /// never produce another edge.
    pub fn with_initial_falling(mut self, enabled: bool) -> Self {
        self.synthesize_initial_falling = enabled;
        self
    }

    /// Append a listener.  Dispatch order is registration order.
    pub fn register(&self, listener: Arc<dyn EdgeListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// Request the line and spawn the worker.
    ///
    /// On any failure no thread is left behind and the monitor stays `Idle`.
    pub fn start(&mut self, request: &LineRequest) -> Result<()> {
        if self.state != MonitorState::Idle {
            return Err(HardwareError::AlreadyRunning.into());
        }

        let line = self.gpio.request_edges(request).map_err(|e| {
            error!("Monitor[{}]: {}", request.consumer, e);
            e
        })?;

        self.label = request.consumer.clone();
        self.stop_flag.store(false, Ordering::Release);

        let ctx = WorkerContext {
            label: self.label.clone(),
            listeners: Arc::clone(&self.listeners),
            stop_flag: Arc::clone(&self.stop_flag),
            wait_timeout: self.wait_timeout,
            synthesize_initial_falling: self.synthesize_initial_falling,
        };

        let name = format!("gpio-{}-{}", request.chip, request.line);
        // `line` is dropped (released) with the closure if the spawn fails.
        let handle = worker::spawn_named(&name, worker::DEFAULT_STACK_KB, move || ctx.run(line))?;

        self.worker = Some(handle);
        self.state = MonitorState::Running;
        info!(
            "Monitor[{}]: watching gpiochip{} line {} (timeout {:?})",
            self.label, request.chip, request.line, self.wait_timeout
        );
        Ok(())
    }

    /// Signal the worker, wait for it to exit, then release the line.
    /// No-op when not running.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        self.state = MonitorState::Stopping;
        self.stop_flag.store(true, Ordering::Release);

        match handle.join() {
            Ok(line) => drop(line),
            Err(_) => error!("Monitor[{}]: worker panicked", self.label),
        }

        self.state = MonitorState::Idle;
        info!("Monitor[{}]: stopped, line released", self.label);
    }

    /// Deliver `event` to every registered listener, in order, on the
    /// calling thread.
    pub fn dispatch(&self, event: &EdgeEvent) {
        dispatch_to(&self.label, &self.listeners, event);
    }
}

impl<G: GpioPort> Drop for LineMonitor<G> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Worker ────────────────────────────────────────────────────

struct WorkerContext {
    label: heapless::String<CONSUMER_LABEL_LEN>,
    listeners: ListenerList,
    stop_flag: Arc<AtomicBool>,
    wait_timeout: Duration,
    synthesize_initial_falling: bool,
}

impl WorkerContext {
    fn run<L: EdgeLine>(self, mut line: L) -> L {
        if self.synthesize_initial_falling {
            match line.level() {
                Ok(Level::Low) => {
                    info!("Monitor[{}]: line already LOW, synthesizing falling edge", self.label);
                    dispatch_to(&self.label, &self.listeners, &EdgeEvent::falling());
                }
                Ok(Level::High) => {}
                Err(e) => warn!("Monitor[{}]: initial level read failed: {}", self.label, e),
            }
        }

        while !self.stop_flag.load(Ordering::Acquire) {
            match line.wait_edge(self.wait_timeout) {
                Ok(Some(event)) => dispatch_to(&self.label, &self.listeners, &event),
                Ok(None) => {}
                Err(e) => {
                    warn!("Monitor[{}]: wait failed: {}", self.label, e);
                    std::thread::sleep(ERROR_BACKOFF.min(self.wait_timeout));
                }
            }
        }

        debug!("Monitor[{}]: worker exiting", self.label);
        line
    }
}

fn dispatch_to(label: &str, listeners: &ListenerList, event: &EdgeEvent) {
    // Snapshot so a listener may register further listeners without deadlock.
    let snapshot: Vec<Arc<dyn EdgeListener>> = listeners
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    for (index, listener) in snapshot.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| listener.on_edge(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Monitor[{}]: listener #{} failed: {}", label, index, e),
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("non-string panic");
                error!("Monitor[{}]: listener #{} panicked: {}", label, index, msg);
            }
        }
    }
}
