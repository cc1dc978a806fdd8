//! Motor shield controller.
//!
//! Owns the PCA9685 handle and the PWM frequency, lazily constructs DC and
//! stepper motor instances bound to the shield's fixed pin maps, and wires
//! every vended motor into the process-wide signal-safety registry.

use std::sync::{Arc, Weak};

use embedded_hal::i2c::I2c;
use parking_lot::Mutex;

use crate::bus::{self, Pca9685};
use crate::config::units::Resolution;
use crate::config::{DcMotorConfig, ShieldConfig, StepperConfig};
use crate::error::{ConfigError, Error, Result};
use crate::safety::{self, EmergencyStop, Registration};

use super::dc::{DcMotor, DcPins};
use super::stepper::{StepperMotor, StepperPins};

/// Default PWM carrier frequency in Hz: a little audible but efficient.
pub const DEFAULT_FREQUENCY: f64 = 1600.0;

/// Channel maps for the four DC ports.
const DC_PINS: [DcPins; 4] = [
    DcPins { pwm: 8, in1: 10, in2: 9 },
    DcPins { pwm: 13, in1: 11, in2: 12 },
    DcPins { pwm: 2, in1: 4, in2: 3 },
    DcPins { pwm: 7, in1: 5, in2: 6 },
];

/// Channel maps for the two stepper ports. A stepper port spans two DC
/// ports' worth of channels.
const STEPPER_PINS: [StepperPins; 2] = [
    StepperPins { pwm_a: 8, ain1: 10, ain2: 9, pwm_b: 13, bin1: 11, bin2: 12 },
    StepperPins { pwm_a: 2, ain1: 4, ain2: 3, pwm_b: 7, bin1: 5, bin2: 6 },
];

/// Object that controls and keeps state for the entire motor shield.
///
/// Create DC and stepper motor instances through [`MotorShield::get_motor`]
/// and [`MotorShield::get_stepper`]. The shield owns the motor slots;
/// vended handles are `Arc` clones, so the bus handle stays alive as long
/// as any motor does.
pub struct MotorShield<I2C>
where
    I2C: I2c,
{
    pwm: Arc<Mutex<Pca9685<I2C>>>,
    frequency: f64,
    initialized: bool,
    dc_motors: [Option<Arc<DcMotor<I2C>>>; 4],
    steppers: [Option<Arc<StepperMotor<I2C>>>; 2],
    registrations: heapless::Vec<Registration, 6>,
}

impl<I2C: I2c + Send + 'static> MotorShield<I2C> {
    /// Create the shield controller for the expander at `address` on the
    /// given bus, with signal safety: the first shield created this way
    /// installs the process-wide handlers that stop every registered motor
    /// on SIGINT (and SIGHUP/SIGPIPE with the corresponding features).
    pub fn new(i2c: I2C, address: u8) -> Self {
        safety::install();
        Self::without_signal_safety(i2c, address)
    }

    /// Create the shield controller without touching signal dispositions.
    pub fn without_signal_safety(i2c: I2C, address: u8) -> Self {
        Self {
            pwm: Arc::new(Mutex::new(Pca9685::new(i2c, address))),
            frequency: DEFAULT_FREQUENCY,
            initialized: false,
            dc_motors: [None, None, None, None],
            steppers: [None, None],
            registrations: heapless::Vec::new(),
        }
    }

    /// Initialize the PWM driver: reset, program the carrier frequency and
    /// turn off all channels.
    ///
    /// # Errors
    ///
    /// Bus failures during the sequence; the shield stays uninitialized.
    pub fn begin(&mut self, frequency: f64) -> Result<()> {
        {
            let mut pwm = self.pwm.lock();
            pwm.reset()?;
            pwm.set_pwm_freq(frequency)?;
            for channel in 0..bus::CHANNELS {
                pwm.set_pwm(channel, 0, 0)?;
            }
        }
        self.frequency = frequency;
        self.initialized = true;
        Ok(())
    }

    /// Initialize using a [`ShieldConfig`]'s frequency.
    pub fn begin_from_config(&mut self, config: &ShieldConfig) -> Result<()> {
        self.begin(config.pwm_frequency)
    }

    /// The programmed PWM frequency.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Get the DC motor on `port` (1 through 4), constructing it on first
    /// request.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotInitialized` before [`MotorShield::begin`],
    /// `ConfigError::InvalidDcPort` for ports outside 1-4.
    pub fn get_motor(&mut self, port: u8) -> Result<Arc<DcMotor<I2C>>> {
        if !self.initialized {
            return Err(Error::Config(ConfigError::NotInitialized));
        }
        if port == 0 || port > 4 {
            return Err(Error::Config(ConfigError::InvalidDcPort(port)));
        }
        let slot = usize::from(port - 1);

        if let Some(motor) = &self.dc_motors[slot] {
            return Ok(Arc::clone(motor));
        }
        let motor = Arc::new(DcMotor::new(Arc::clone(&self.pwm), DC_PINS[slot], port));
        let motor_dyn: Arc<dyn EmergencyStop> = motor.clone();
        let weak: Weak<dyn EmergencyStop> = Arc::downgrade(&motor_dyn);
        if let Some(registration) = safety::register(weak) {
            let _ = self.registrations.push(registration);
        }
        self.dc_motors[slot] = Some(Arc::clone(&motor));
        Ok(motor)
    }

    /// Get the stepper on `port` (1 or 2) with the given steps per
    /// revolution and microstep resolution, constructing it on first
    /// request. Later requests return the existing instance; its
    /// parameters are not changed.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotInitialized` before [`MotorShield::begin`],
    /// `ConfigError::InvalidStepperPort` for ports outside 1-2.
    pub fn get_stepper(
        &mut self,
        steps_per_rev: u16,
        port: u8,
        resolution: Resolution,
    ) -> Result<Arc<StepperMotor<I2C>>> {
        if !self.initialized {
            return Err(Error::Config(ConfigError::NotInitialized));
        }
        if port == 0 || port > 2 {
            return Err(Error::Config(ConfigError::InvalidStepperPort(port)));
        }
        let slot = usize::from(port - 1);

        if let Some(motor) = &self.steppers[slot] {
            return Ok(Arc::clone(motor));
        }
        let motor = Arc::new(StepperMotor::new(
            Arc::clone(&self.pwm),
            STEPPER_PINS[slot],
            port,
            steps_per_rev,
            resolution,
        ));
        let motor_dyn: Arc<dyn EmergencyStop> = motor.clone();
        let weak: Weak<dyn EmergencyStop> = Arc::downgrade(&motor_dyn);
        if let Some(registration) = safety::register(weak) {
            let _ = self.registrations.push(registration);
        }
        self.steppers[slot] = Some(Arc::clone(&motor));
        Ok(motor)
    }

    /// Vend a stepper described by a [`StepperConfig`], applying its RPM
    /// if one is configured.
    pub fn stepper_from_config(
        &mut self,
        config: &StepperConfig,
    ) -> Result<Arc<StepperMotor<I2C>>> {
        let stepper =
            self.get_stepper(config.steps_per_revolution, config.port, config.microsteps)?;
        if let Some(rpm) = config.rpm {
            stepper.set_speed(rpm)?;
        }
        Ok(stepper)
    }

    /// Vend a DC motor described by a [`DcMotorConfig`], applying its
    /// initial speed if one is configured.
    pub fn motor_from_config(&mut self, config: &DcMotorConfig) -> Result<Arc<DcMotor<I2C>>> {
        let motor = self.get_motor(config.port)?;
        if let Some(speed) = config.speed {
            motor.set_speed(speed)?;
        }
        Ok(motor)
    }

    /// Set the PWM output on a channel, managing the 'all on or off'
    /// special encoding (values above 4095 select fully-on).
    pub fn set_pwm(&self, channel: u8, value: u16) -> Result<()> {
        if !self.initialized {
            return Err(Error::Config(ConfigError::NotInitialized));
        }
        self.pwm.lock().set_duty(channel, value)
    }

    /// Set a PWM channel as if it were a GPIO pin.
    pub fn set_pin(&self, channel: u8, value: bool) -> Result<()> {
        if !self.initialized {
            return Err(Error::Config(ConfigError::NotInitialized));
        }
        self.pwm.lock().set_pin(channel, value)
    }
}

impl<I2C> Drop for MotorShield<I2C>
where
    I2C: I2c,
{
    fn drop(&mut self) {
        // Unhook from the signal registry first so the coordinator cannot
        // race the teardown, then de-energize whatever was vended. All
        // best effort: the bus may already be gone.
        for registration in self.registrations.iter() {
            safety::unregister(*registration);
        }
        for stepper in self.steppers.iter().flatten() {
            stepper.stop_motor();
            let _ = stepper.release();
        }
        for motor in self.dc_motors.iter().flatten() {
            let _ = motor.full_off();
        }
    }
}
