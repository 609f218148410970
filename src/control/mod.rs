//! Control logic driven by line events: camera activation and audible alerts.

pub mod alert;
pub mod motion;
