//! Application core.
//!
//! Port traits in [`ports`] keep everything below this layer testable
//! without real peripherals; [`system`] wires the components together.

pub mod events;
pub mod ports;
pub mod system;
