//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::SystemConfig;

/// Validate a parsed configuration.
///
/// Checks port ranges, port uniqueness within each motor class, RPM and
/// frequency positivity. Parsing already rejects unsupported microstep
/// resolutions via the [`super::units::Resolution`] deserializer.
///
/// # Errors
///
/// Returns the first violation found as a `ConfigError`.
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    if config.shield.pwm_frequency <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidFrequency(
            config.shield.pwm_frequency,
        )));
    }

    let mut stepper_ports: heapless::Vec<u8, 2> = heapless::Vec::new();
    for (_, stepper) in config.steppers.iter() {
        if stepper.port == 0 || stepper.port > 2 {
            return Err(Error::Config(ConfigError::InvalidStepperPort(stepper.port)));
        }
        if stepper_ports.contains(&stepper.port) {
            return Err(Error::Config(ConfigError::DuplicatePort { port: stepper.port }));
        }
        let _ = stepper_ports.push(stepper.port);

        if let Some(rpm) = stepper.rpm {
            if rpm <= 0.0 {
                return Err(Error::Config(ConfigError::InvalidRpm(rpm)));
            }
        }
    }

    let mut motor_ports: heapless::Vec<u8, 4> = heapless::Vec::new();
    for (_, motor) in config.motors.iter() {
        if motor.port == 0 || motor.port > 4 {
            return Err(Error::Config(ConfigError::InvalidDcPort(motor.port)));
        }
        if motor_ports.contains(&motor.port) {
            return Err(Error::Config(ConfigError::DuplicatePort { port: motor.port }));
        }
        let _ = motor_ports.push(motor.port);
    }

    Ok(())
}
