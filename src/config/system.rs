//! System configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::motor::{DcMotorConfig, StepperConfig};
use super::shield::ShieldConfig;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Shield bus/frequency settings.
    #[serde(default)]
    pub shield: ShieldConfig,

    /// Named stepper configurations.
    #[serde(default)]
    pub steppers: FnvIndexMap<String<32>, StepperConfig, 2>,

    /// Named DC motor configurations.
    #[serde(default)]
    pub motors: FnvIndexMap<String<32>, DcMotorConfig, 4>,
}

impl SystemConfig {
    /// Get a stepper configuration by name.
    pub fn stepper(&self, name: &str) -> Option<&StepperConfig> {
        self.steppers
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// Get a DC motor configuration by name.
    pub fn motor(&self, name: &str) -> Option<&DcMotorConfig> {
        self.motors
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all stepper names.
    pub fn stepper_names(&self) -> impl Iterator<Item = &str> {
        self.steppers.keys().map(|s| s.as_str())
    }

    /// List all DC motor names.
    pub fn motor_names(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SystemConfig {
        let toml = r#"
[shield]
address = 0x60
pwm_frequency_hz = 1600.0

[steppers.turret]
port = 1
steps_per_revolution = 200
microsteps = 16
rpm = 30.0

[motors.agitator]
port = 3
speed = 128
"#;
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let config = test_config();

        assert!(config.stepper("turret").is_some());
        assert!(config.stepper("missing").is_none());
        assert!(config.motor("agitator").is_some());
        assert!(config.motor("turret").is_none());
    }

    #[test]
    fn test_shield_section() {
        let config = test_config();

        assert_eq!(config.shield.address, 0x60);
        assert!((config.shield.pwm_frequency - 1600.0).abs() < 1e-9);
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: SystemConfig = toml::from_str("").unwrap();

        assert_eq!(config.shield.address, 0x60);
        assert_eq!(config.stepper_names().count(), 0);
        assert_eq!(config.motor_names().count(), 0);
    }
}
