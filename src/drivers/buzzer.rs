//! Shared buzzer driver.
//!
//! One physical buzzer, several logical owners (motion alert, each
//! temperature sensor).  Every level change goes through the buzzer's own
//! mutex so interleaved `activate()` / `deactivate()` calls from different
//! threads are applied one at a time.  There is no queue and no priority:
//! callers block until the lock is free.
//!
//! ## Missing hardware
//!
//! If the output line could not be acquired, the driver is built without a
//! pin.  Every call then still takes the lock but touches nothing, and
//! nothing is raised: a missing buzzer must not take the sensors down.

use std::sync::{Mutex, PoisonError};

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::Alarm;
use crate::error::ActuatorError;

struct BuzzerState<P> {
    pin: Option<P>,
    active: bool,
}

pub struct Buzzer<P> {
    state: Mutex<BuzzerState<P>>,
}

impl<P: OutputPin + Send> Buzzer<P> {
    pub fn new(pin: P) -> Self {
        Self {
            state: Mutex::new(BuzzerState {
                pin: Some(pin),
                active: false,
            }),
        }
    }

    /// A buzzer whose line could not be acquired.  All calls are no-ops.
    pub fn unavailable() -> Self {
        Self {
            state: Mutex::new(BuzzerState {
                pin: None,
                active: false,
            }),
        }
    }

    /// Build from the outcome of a line request, logging a failure once.
    pub fn from_request<E: core::fmt::Display>(pin: Result<P, E>) -> Self {
        match pin {
            Ok(pin) => Self::new(pin),
            Err(e) => {
                warn!("Buzzer: {} ({}), alerts will be silent", ActuatorError::Unavailable, e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.lock().pin.is_some()
    }

    /// Last level successfully applied to the pin.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    fn set(&self, on: bool) {
        let mut state = self.lock();
        let Some(pin) = state.pin.as_mut() else {
            return;
        };

        let result = if on { pin.set_high() } else { pin.set_low() };
        match result {
            Ok(()) => {
                debug!("Buzzer: {}", if on { "on" } else { "off" });
                state.active = on;
            }
            Err(e) => warn!("Buzzer: {} ({:?})", ActuatorError::WriteFailed, e),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BuzzerState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: OutputPin + Send> Alarm for Buzzer<P> {
    fn activate(&self) {
        self.set(true);
    }

    fn deactivate(&self) {
        self.set(false);
    }
}
