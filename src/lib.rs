//! SmartMon monitoring core.
//!
//! Edge-triggered GPIO line monitors, TMP117 temperature sensors sharing one
//! I²C bus, a shared buzzer and a motion-driven camera coordinator.  Device
//! access goes through the port traits in [`app::ports`]; the Linux
//! adapters behind them are gated by the `linux` feature.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod sensors;
