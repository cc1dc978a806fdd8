//! Motor configuration from TOML.

use serde::Deserialize;

use super::units::Resolution;

/// Stepper motor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StepperConfig {
    /// Shield stepper port (1 or 2).
    pub port: u8,

    /// Base steps per revolution (typically 200 for 1.8° motors).
    pub steps_per_revolution: u16,

    /// Microstep resolution.
    #[serde(default)]
    pub microsteps: Resolution,

    /// Optional initial speed in RPM, applied when the motor is vended.
    #[serde(default)]
    pub rpm: Option<f64>,
}

/// DC motor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DcMotorConfig {
    /// Shield DC motor port (1 through 4).
    pub port: u8,

    /// Optional initial 8-bit throttle, applied when the motor is vended.
    #[serde(default)]
    pub speed: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepper_defaults() {
        let config: StepperConfig = toml::from_str(
            r#"
port = 1
steps_per_revolution = 200
"#,
        )
        .unwrap();

        assert_eq!(config.microsteps, Resolution::DEFAULT);
        assert!(config.rpm.is_none());
    }

    #[test]
    fn test_stepper_rejects_bad_microsteps() {
        let result: Result<StepperConfig, _> = toml::from_str(
            r#"
port = 1
steps_per_revolution = 200
microsteps = 48
"#,
        );

        assert!(result.is_err());
    }
}
