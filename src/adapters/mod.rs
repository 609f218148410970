//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements               | Connects to                   |
//! |------------|--------------------------|-------------------------------|
//! | `gpio_cdev`| GpioPort, OutputPin      | `/dev/gpiochipN` (uAPI v1)    |
//! | `i2c_dev`  | BusPort                  | `/dev/i2c-N`                  |
//! | `camera`   | CameraPort               | preview child process         |
//! | `log_sink` | SamplePublisher          | log output (JSON lines)       |
//! |            | DisplayPort              | log output                    |
//!
//! The device-node adapters are Linux only and sit behind the `linux`
//! feature; the rest build everywhere.

pub mod camera;
pub mod log_sink;

#[cfg(feature = "linux")]
pub mod gpio_cdev;
#[cfg(feature = "linux")]
pub mod i2c_dev;
