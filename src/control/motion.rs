//! Motion-activated camera coordinator.
//!
//! Subscribes to the motion line monitor, starts the camera on motion and
//! stops it after an inactivity window.  A background thread ticks once
//! per `tick` (1 s by default) and applies the configured policy:
//!
//! | Policy     | On motion                          | On tick                                   |
//! |------------|------------------------------------|-------------------------------------------|
//! | `TopUp`    | countdown = window/tick, start cam | countdown −1; 0 ⇒ stop, >0 ⇒ keep running |
//! | `Deadline` | last_motion = now, start cam       | now − last_motion ≥ window ⇒ stop         |
//!
//! Every pulse also re-phases the timer: the next tick lands one full
//! `tick` after the pulse, so the camera never stops before a whole window
//! has passed since the last motion.  Both policies give the same answer
//! for a single pulse.  They differ under periodic pulses: `TopUp` counts
//! ticks, so its expiry is rounded up to a whole tick; `Deadline` measures
//! wall time from the last pulse.
//!
//! All state (camera handle, active flag, countdown, last motion time)
//! lives behind one mutex shared by the event thread and the tick thread.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::{CameraPort, EdgeListener};
use crate::drivers::worker;
use crate::error::Result;
use crate::events::{EdgeEvent, EdgeKind};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPolicy {
    /// Re-arm a shared countdown on every pulse.
    #[default]
    TopUp,
    /// Track only the most recent pulse time.
    Deadline,
}

struct ActuationState<C> {
    camera: C,
    active: bool,
    last_motion: Option<Instant>,
    countdown: u32,
    /// Pulse time the timer thread has not re-phased to yet.
    rearm: Option<Instant>,
    monitoring: bool,
}

struct Shared<C> {
    state: Mutex<ActuationState<C>>,
    wake: Condvar,
    policy: MotionPolicy,
    window: Duration,
    tick: Duration,
}

impl<C: CameraPort> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, ActuationState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of ticks a fresh pulse keeps the camera alive for.
    fn window_ticks(&self) -> u32 {
        let tick = self.tick.as_nanos().max(1);
        u32::try_from(self.window.as_nanos().div_ceil(tick))
            .unwrap_or(u32::MAX)
            .max(1)
    }

    fn motion_at(&self, now: Instant) {
        let mut st = self.lock();
        st.last_motion = Some(now);
        st.rearm = Some(now);
        if self.policy == MotionPolicy::TopUp {
            st.countdown = self.window_ticks();
        }
        debug!("Motion: detected ({:?}, countdown={})", self.policy, st.countdown);
        Self::ensure_started(&mut st);
        drop(st);
        self.wake.notify_all();
    }

    fn tick_at(&self, now: Instant) {
        let mut st = self.lock();
        self.evaluate(&mut st, now);
    }

    fn evaluate(&self, st: &mut ActuationState<C>, now: Instant) {
        match self.policy {
            MotionPolicy::TopUp => {
                st.countdown = st.countdown.saturating_sub(1);
                if st.countdown > 0 {
                    Self::ensure_started(st);
                } else {
                    Self::ensure_stopped(st, "countdown expired");
                }
            }
            MotionPolicy::Deadline => {
                let expired = st
                    .last_motion
                    .is_none_or(|last| now.saturating_duration_since(last) >= self.window);
                if expired {
                    Self::ensure_stopped(st, "inactivity window elapsed");
                }
            }
        }
    }

    fn ensure_started(st: &mut ActuationState<C>) {
        if st.active {
            return;
        }
        match st.camera.start() {
            Ok(()) => {
                st.active = true;
                info!("Motion: camera started");
            }
            Err(e) => error!("Motion: camera start failed: {}", e),
        }
    }

    fn ensure_stopped(st: &mut ActuationState<C>, reason: &str) {
        if !st.active {
            return;
        }
        st.camera.stop();
        st.active = false;
        info!("Motion: camera stopped ({})", reason);
    }

    fn run(&self) {
        let mut st = self.lock();
        let mut next_tick = Instant::now() + self.tick;
        while st.monitoring {
            // Checked under the same lock hold as `evaluate`, so a pulse is
            // never followed by a tick from the old phase.
            if let Some(pulse) = st.rearm.take() {
                next_tick = pulse + self.tick;
            }
            let now = Instant::now();
            if now >= next_tick {
                self.evaluate(&mut st, now);
                next_tick += self.tick;
                continue;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(st, next_tick - now)
                .unwrap_or_else(PoisonError::into_inner);
            st = guard;
        }
        debug!("Motion: timer thread exiting");
    }
}

impl<C: CameraPort> EdgeListener for Shared<C> {
    fn on_edge(&self, event: &EdgeEvent) -> Result<()> {
        match event.kind {
            EdgeKind::Rising => self.motion_at(event.timestamp),
            EdgeKind::Falling => debug!("Motion: ended"),
        }
        Ok(())
    }
}

pub struct MotionCoordinator<C: CameraPort + 'static> {
    shared: Arc<Shared<C>>,
    worker: Option<JoinHandle<()>>,
}

impl<C: CameraPort + 'static> MotionCoordinator<C> {
    pub fn new(camera: C, policy: MotionPolicy, window: Duration, tick: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ActuationState {
                    camera,
                    active: false,
                    last_motion: None,
                    countdown: 0,
                    rearm: None,
                    monitoring: false,
                }),
                wake: Condvar::new(),
                policy,
                window,
                tick,
            }),
            worker: None,
        }
    }

    pub fn with_defaults(camera: C, policy: MotionPolicy) -> Self {
        Self::new(camera, policy, DEFAULT_WINDOW, DEFAULT_TICK)
    }

    /// Handle to register with the motion line monitor.
    pub fn listener(&self) -> Arc<dyn EdgeListener> {
        Arc::clone(&self.shared) as Arc<dyn EdgeListener>
    }

    pub fn policy(&self) -> MotionPolicy {
        self.shared.policy
    }

    /// Record a motion pulse now.  Safe to call from any thread.
    pub fn on_motion(&self) {
        self.shared.motion_at(Instant::now());
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock().active
    }

    pub fn is_monitoring(&self) -> bool {
        self.worker.is_some()
    }

    /// Inspect the camera under the coordinator lock.
    pub fn with_camera<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.shared.lock().camera)
    }

    /// Spawn the timer thread.  No-op when already monitoring.
    pub fn start_monitoring(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        self.shared.lock().monitoring = true;
        let shared = Arc::clone(&self.shared);
        match worker::spawn_named("motion-timer", worker::DEFAULT_STACK_KB, move || shared.run()) {
            Ok(handle) => {
                self.worker = Some(handle);
                info!(
                    "Motion: monitoring ({:?}, window {:?}, tick {:?})",
                    self.shared.policy, self.shared.window, self.shared.tick
                );
                Ok(())
            }
            Err(e) => {
                self.shared.lock().monitoring = false;
                Err(e.into())
            }
        }
    }

    /// Join the timer thread and stop the camera if it is still running.
    /// No-op when not monitoring.
    pub fn stop_monitoring(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        self.shared.lock().monitoring = false;
        self.shared.wake.notify_all();
        if handle.join().is_err() {
            error!("Motion: timer thread panicked");
        }

        let mut st = self.shared.lock();
        Shared::<C>::ensure_stopped(&mut st, "monitoring stopped");
        info!("Motion: monitoring stopped");
    }
}

impl<C: CameraPort + 'static> Drop for MotionCoordinator<C> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
