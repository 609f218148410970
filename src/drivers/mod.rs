//! Line monitoring, the shared buzzer and worker-thread helpers.

pub mod buzzer;
pub mod line_monitor;
pub mod worker;
