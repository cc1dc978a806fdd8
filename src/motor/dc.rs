//! DC motor control.
//!
//! A DC motor is two direction pins plus one PWM throttle channel on the
//! expander; there is no state machine behind it. Instances are vended by
//! [`crate::MotorShield::get_motor`] and share the shield's bus handle.

use std::sync::Arc;

use embedded_hal::i2c::I2c;
use parking_lot::Mutex;

use crate::bus::Pca9685;
use crate::error::Result;
use crate::safety::EmergencyStop;

use super::phase::Direction;

/// Channel assignment for one DC motor port.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DcPins {
    pub pwm: u8,
    pub in1: u8,
    pub in2: u8,
}

/// Object that controls and keeps state for a single DC motor.
pub struct DcMotor<I2C> {
    pwm: Arc<Mutex<Pca9685<I2C>>>,
    pins: DcPins,
    /// Shield port (1-based), for diagnostics.
    port: u8,
}

impl<I2C: I2c> DcMotor<I2C> {
    pub(crate) fn new(pwm: Arc<Mutex<Pca9685<I2C>>>, pins: DcPins, port: u8) -> Self {
        Self { pwm, pins, port }
    }

    /// The shield port this motor is attached to (1 through 4).
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Control the motor direction and action.
    ///
    /// `Forward` and `Backward` energize the H-bridge accordingly;
    /// `Release` lets the motor coast. The inactive pin is always dropped
    /// before the active pin is raised so the bridge never sees both high.
    pub fn run(&self, dir: Direction) -> Result<()> {
        let mut pwm = self.pwm.lock();
        match dir {
            Direction::Forward => {
                pwm.set_pin(self.pins.in2, false)?;
                pwm.set_pin(self.pins.in1, true)?;
            }
            Direction::Backward => {
                pwm.set_pin(self.pins.in1, false)?;
                pwm.set_pin(self.pins.in2, true)?;
            }
            Direction::Release => {
                pwm.set_pin(self.pins.in1, false)?;
                pwm.set_pin(self.pins.in2, false)?;
            }
            Direction::Brake => {
                log::debug!("Brake not implemented for DC motor {}", self.port);
            }
        }
        Ok(())
    }

    /// Set the throttle from an 8-bit value (0 off, 255 full on).
    pub fn set_speed(&self, speed: u8) -> Result<()> {
        self.pwm.lock().set_duty(self.pins.pwm, u16::from(speed) * 16)
    }

    /// Set the throttle at the expander's native 12-bit resolution.
    pub fn set_speed_fine(&self, speed: u16) -> Result<()> {
        self.pwm.lock().set_duty(self.pins.pwm, speed.min(4095))
    }

    /// Turn the motor off completely.
    pub fn full_off(&self) -> Result<()> {
        self.pwm.lock().set_duty(self.pins.pwm, 0)
    }

    /// Turn the motor on at full speed.
    pub fn full_on(&self) -> Result<()> {
        self.pwm.lock().set_duty(self.pins.pwm, 4095)
    }
}

impl<I2C: I2c + Send> EmergencyStop for DcMotor<I2C> {
    fn emergency_stop(&self) {
        // Best effort: the process may be going down.
        let _ = self.full_off();
    }
}
