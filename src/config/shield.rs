//! Shield configuration from TOML.

use heapless::String;
use serde::Deserialize;

/// Shield-level configuration: which bus the PCA9685 sits on and how its
/// PWM clock is programmed.
#[derive(Debug, Clone, Deserialize)]
pub struct ShieldConfig {
    /// I2C device path (e.g. `/dev/i2c-1`). Informational: the crate never
    /// opens the device itself, the caller does.
    #[serde(default = "default_device")]
    pub device: String<32>,

    /// Seven-bit I2C address of the shield.
    #[serde(default = "default_address")]
    pub address: u8,

    /// PWM carrier frequency in Hz.
    #[serde(default = "default_frequency", rename = "pwm_frequency_hz")]
    pub pwm_frequency: f64,
}

fn default_device() -> String<32> {
    String::try_from("/dev/i2c-1").unwrap_or_default()
}

fn default_address() -> u8 {
    0x60
}

fn default_frequency() -> f64 {
    1600.0
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            address: default_address(),
            pwm_frequency: default_frequency(),
        }
    }
}
