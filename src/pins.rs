//! GPIO line and bus address assignments for the Raspberry Pi 5 carrier.
//!
//! Single source of truth for the default wiring.  [`SystemConfig`]
//! defaults are built from these; a deployed config file can override any
//! of them.
//!
//! [`SystemConfig`]: crate::config::SystemConfig

// ---------------------------------------------------------------------------
// GPIO controller
// ---------------------------------------------------------------------------

/// `/dev/gpiochip0`: the RP1 controller exposing the 40-pin header.
pub const GPIO_CHIP: u32 = 0;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// PIR motion sensor OUT pin.  HIGH while motion is present.
pub const MOTION_LINE: u32 = 22;

/// TMP117 #1 ALERT pin (data-ready, active LOW, open drain).
pub const TMP117_1_ALERT_LINE: u32 = 17;
/// TMP117 #2 ALERT pin.
pub const TMP117_2_ALERT_LINE: u32 = 27;

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Active buzzer, driven HIGH to sound.
pub const BUZZER_LINE: u32 = 25;

// ---------------------------------------------------------------------------
// I²C bus
// ---------------------------------------------------------------------------

/// `/dev/i2c-1`: the header I²C bus.
pub const I2C_BUS_PATH: &str = "/dev/i2c-1";

/// TMP117 with ADD0 tied to GND.
pub const TMP117_1_ADDR: u8 = 0x48;
/// TMP117 with ADD0 tied to V+.
pub const TMP117_2_ADDR: u8 = 0x49;
