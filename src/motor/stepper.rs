//! Stepper motor execution controller.
//!
//! Owns the timing side of stepping: RPM to microseconds-per-step
//! conversion, the periodic tick that advances the phase engine, blocking
//! and detached execution, and cooperative cancellation.
//!
//! Concurrency layout: `op_lock` serializes whole stepping operations and
//! speed/resolution changes, so two `step` calls on one motor can never
//! interleave phase advances. The tick thread itself never takes
//! `op_lock`; it works exclusively through the single-writer atomics below
//! (`phase`, `moving`, the per-operation remaining counter) and signals
//! completion through `done`. Readers of those atomics tolerate a
//! staleness of one tick by design, which keeps the tick handler short and
//! free of locks shared with a waiting caller.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;
use parking_lot::{Condvar, Mutex};

use crate::bus::Pca9685;
use crate::clock::Ticker;
use crate::config::units::Resolution;
use crate::error::{ConfigError, Error, Result};
use crate::safety::EmergencyStop;

use super::phase::{self, Direction, Style};

/// Per-step callback, invoked from the tick context after each successful
/// phase advance. Context travels in the closure's captures.
pub type StepCallback<I2C> = Box<dyn FnMut(&StepperMotor<I2C>) + Send>;

/// Channel assignment for one stepper port.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepperPins {
    pub pwm_a: u8,
    pub ain1: u8,
    pub ain2: u8,
    pub pwm_b: u8,
    pub bin1: u8,
    pub bin2: u8,
}

/// Object that controls and keeps state for a single stepper motor.
///
/// Vended as an `Arc` by [`crate::MotorShield::get_stepper`]; the `Arc`
/// receiver on [`StepperMotor::step`] is what lets the tick thread and
/// detached executions hold onto the motor.
pub struct StepperMotor<I2C> {
    pwm: Arc<Mutex<Pca9685<I2C>>>,
    pins: StepperPins,
    /// Shield port (1-based), for diagnostics.
    port: u8,
    steps_per_rev: u16,

    /// Serializes stepping operations and speed/resolution changes.
    op_lock: Mutex<()>,
    /// Wakes a blocked `step` caller when the tick loop finishes.
    done: Condvar,

    // Single-writer fields, read without the lock (see module docs).
    phase: AtomicU16,
    us_per_step: AtomicU64,
    microsteps: AtomicU16,
    moving: AtomicBool,
    stop: AtomicBool,
}

impl<I2C: I2c> StepperMotor<I2C> {
    pub(crate) fn new(
        pwm: Arc<Mutex<Pca9685<I2C>>>,
        pins: StepperPins,
        port: u8,
        steps_per_rev: u16,
        resolution: Resolution,
    ) -> Self {
        Self {
            pwm,
            pins,
            port,
            steps_per_rev,
            op_lock: Mutex::new(()),
            done: Condvar::new(),
            phase: AtomicU16::new(0),
            us_per_step: AtomicU64::new(0),
            microsteps: AtomicU16::new(resolution.value()),
            moving: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        }
    }

    /// The shield port this motor is attached to (1 or 2).
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Steps per revolution this motor was vended with.
    pub fn steps_per_revolution(&self) -> u16 {
        self.steps_per_rev
    }

    /// Current phase index, in `[0, 4 * microsteps)`. May lag a live
    /// stepping operation by one tick.
    pub fn phase_index(&self) -> u16 {
        self.phase.load(Ordering::Relaxed)
    }

    /// Current microstep resolution.
    pub fn resolution(&self) -> Resolution {
        Resolution::coerce(self.microsteps.load(Ordering::Relaxed))
    }

    /// Set the stepping speed in RPM.
    ///
    /// Returns `Ok(false)` without applying anything when the motor is
    /// mid-operation and the lock cannot be taken without blocking; treat
    /// that as "try again", not as an error.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidRpm` for zero or negative RPM; no timing state
    /// is touched in that case.
    pub fn set_speed(&self, rpm: f64) -> Result<bool> {
        if rpm <= 0.0 {
            return Err(Error::Config(ConfigError::InvalidRpm(rpm)));
        }
        match self.op_lock.try_lock() {
            Some(_guard) => {
                let us = (60_000_000.0 / (f64::from(self.steps_per_rev) * rpm)) as u64;
                self.us_per_step.store(us, Ordering::Relaxed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Set the microstep resolution.
    ///
    /// Unsupported values fall back to the library default (16) with a
    /// logged diagnostic; that is deliberately not a failure. Returns
    /// `false` when the motor is mid-operation and nothing was applied.
    pub fn set_resolution(&self, microsteps: u16) -> bool {
        match self.op_lock.try_lock() {
            Some(_guard) => {
                let resolution = Resolution::coerce(microsteps);
                self.microsteps.store(resolution.value(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// The configured step period in microseconds.
    ///
    /// # Errors
    ///
    /// `ConfigError::SpeedNotSet` until a positive RPM has been applied.
    pub fn step_period(&self) -> Result<u64> {
        match self.us_per_step.load(Ordering::Relaxed) {
            0 => Err(Error::Config(ConfigError::SpeedNotSet)),
            us => Ok(us),
        }
    }

    /// Whether a stepping operation is currently running. Lock-free.
    pub fn is_moving(&self) -> bool {
        self.moving.load(Ordering::Relaxed)
    }

    /// Request a cooperative stop of the running operation.
    ///
    /// Observed once per tick; a stop landing mid-microstep is honored
    /// only after the current full step completes, so the coils are never
    /// left at an intermediate energization. No-op while idle.
    pub fn stop_motor(&self) {
        if self.moving.load(Ordering::Relaxed) {
            self.stop.store(true, Ordering::Relaxed);
        }
    }

    /// Release all pins of the stepper motor so it free-spins.
    ///
    /// Valid in any motion state; does not itself stop a running
    /// operation.
    pub fn release(&self) -> Result<()> {
        let mut pwm = self.pwm.lock();
        pwm.set_pin(self.pins.ain1, false)?;
        pwm.set_pin(self.pins.ain2, false)?;
        pwm.set_pin(self.pins.bin1, false)?;
        pwm.set_pin(self.pins.bin2, false)?;
        pwm.set_duty(self.pins.pwm_a, 0)?;
        pwm.set_duty(self.pins.pwm_b, 0)?;
        Ok(())
    }

    /// Advance the motor by one phase step, writing the new coil duties
    /// and latch pattern to the expander. Returns the new phase index.
    ///
    /// No delays are involved; timed stepping is [`StepperMotor::step`].
    pub fn one_step(&self, dir: Direction, style: Style) -> Result<u16> {
        let t = phase::transition(
            self.phase.load(Ordering::Relaxed),
            dir,
            style,
            self.resolution(),
        );
        self.phase.store(t.phase, Ordering::Relaxed);
        log::trace!(
            "stepper {}: phase {}, pwmA = {}, pwmB = {}, latch 0x{:02x}",
            self.port,
            t.phase,
            t.coil_a,
            t.coil_b,
            t.latch
        );

        let mut pwm = self.pwm.lock();
        pwm.set_duty(self.pins.pwm_a, t.coil_a)?;
        pwm.set_duty(self.pins.pwm_b, t.coil_b)?;
        pwm.set_pin(self.pins.ain2, t.latch & 0x1 != 0)?;
        pwm.set_pin(self.pins.bin1, t.latch & 0x2 != 0)?;
        pwm.set_pin(self.pins.ain1, t.latch & 0x4 != 0)?;
        pwm.set_pin(self.pins.bin2, t.latch & 0x8 != 0)?;
        Ok(t.phase)
    }
}

impl<I2C: I2c + Send + 'static> StepperMotor<I2C> {
    /// Step the motor with the previously configured speed.
    ///
    /// The per-tick delay is the configured step period for `Single` and
    /// `Double`, halved for `Interleave`, and divided by the microstep
    /// count for `Microstep` (each requested step then expands into that
    /// many microsteps).
    ///
    /// With `blocking` set, the calling thread holds the motor for the
    /// whole operation and returns when it finishes or is stopped.
    /// Otherwise a detached thread performs the identical sequence and the
    /// caller returns immediately; poll [`StepperMotor::is_moving`] or use
    /// the callback to observe progress. Either way the motor's operation
    /// lock is the sole serialization point, so concurrent `step` calls
    /// queue rather than interleave.
    ///
    /// # Errors
    ///
    /// `ConfigError::SpeedNotSet` when no speed was ever applied; nothing
    /// is written to the hardware in that case.
    pub fn step(
        self: &Arc<Self>,
        steps: u16,
        dir: Direction,
        style: Style,
        blocking: bool,
        callback: Option<StepCallback<I2C>>,
    ) -> Result<()> {
        if self.us_per_step.load(Ordering::Relaxed) == 0 {
            return Err(Error::Config(ConfigError::SpeedNotSet));
        }
        if blocking {
            self.run_steps(steps, dir, style, callback);
        } else {
            let motor = Arc::clone(self);
            thread::spawn(move || motor.run_steps(steps, dir, style, callback));
        }
        Ok(())
    }

    /// The full stepping sequence: acquire the motor, arm the tick clock,
    /// wait out the nominal duration, then tear the clock down.
    fn run_steps(
        self: &Arc<Self>,
        steps: u16,
        dir: Direction,
        style: Style,
        callback: Option<StepCallback<I2C>>,
    ) {
        let mut guard = self.op_lock.lock();

        let msteps = self.resolution().value();
        let mut uspers = self.us_per_step.load(Ordering::Relaxed);
        let mut total = u32::from(steps);
        match style {
            Style::Interleave => uspers /= 2,
            Style::Microstep => {
                uspers /= u64::from(msteps);
                total *= u32::from(msteps);
            }
            _ => {}
        }
        let uspers = uspers.max(1);

        self.stop.store(false, Ordering::Relaxed);
        self.moving.store(true, Ordering::Relaxed);

        let remaining = Arc::new(AtomicU32::new(total));
        let motor = Arc::clone(self);
        let counter = Arc::clone(&remaining);
        let mut callback = callback;
        let ticker = Ticker::start(Duration::from_micros(uspers), move || {
            motor.tick(&counter, dir, style, msteps, &mut callback);
        });

        let nominal = Duration::from_micros(uspers.saturating_mul(u64::from(total)));
        if self.done.wait_for(&mut guard, nominal).timed_out() {
            // Clock drift: the ticks are behind the nominal schedule, so
            // fall back to polling the remaining-step counter. Also bounded
            // by the stop flag, so a cancelled move cannot poll forever.
            // A stop mid-microstep still waits for the step boundary,
            // matching the tick loop's own rule.
            loop {
                let rem = remaining.load(Ordering::Relaxed);
                let mid_step = style == Style::Microstep && rem % u32::from(msteps) != 0;
                if rem == 0 || (self.stop.load(Ordering::Relaxed) && !mid_step) {
                    break;
                }
                thread::sleep(Duration::from_micros(uspers));
            }
        }
        drop(ticker);
        self.moving.store(false, Ordering::Relaxed);
    }

    /// One tick of the stepping clock.
    fn tick(
        &self,
        remaining: &AtomicU32,
        dir: Direction,
        style: Style,
        msteps: u16,
        callback: &mut Option<StepCallback<I2C>>,
    ) {
        let rem = remaining.load(Ordering::Relaxed);

        // Partway through a microstepped full step the stop flag must
        // wait: keep stepping until an integral step boundary so the
        // coils are not left at an undefined intermediate energization.
        if style == Style::Microstep && rem % u32::from(msteps) != 0 {
            self.moving.store(true, Ordering::Relaxed);
            self.advance_once(dir, style, callback);
            remaining.fetch_sub(1, Ordering::Relaxed);
            return; // must not reach the unblock check mid-step
        }

        if rem > 0 && !self.stop.load(Ordering::Relaxed) {
            self.moving.store(true, Ordering::Relaxed);
            self.advance_once(dir, style, callback);
            remaining.fetch_sub(1, Ordering::Relaxed);
        }

        if remaining.load(Ordering::Relaxed) == 0 || self.stop.load(Ordering::Relaxed) {
            self.moving.store(false, Ordering::Relaxed);
            self.done.notify_all();
        }
    }

    /// One phase advance plus the user callback.
    fn advance_once(
        &self,
        dir: Direction,
        style: Style,
        callback: &mut Option<StepCallback<I2C>>,
    ) {
        if let Err(e) = self.one_step(dir, style) {
            log::warn!("stepper {}: phase advance failed: {}", self.port, e);
        }
        if let Some(cb) = callback.as_mut() {
            // A panicking callback must not corrupt the stepping loop.
            if catch_unwind(AssertUnwindSafe(|| cb(self))).is_err() {
                log::warn!("stepper {}: step callback panicked", self.port);
            }
        }
    }
}

impl<I2C: I2c + Send> EmergencyStop for StepperMotor<I2C> {
    fn emergency_stop(&self) {
        self.stop_motor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::Mock;

    const PINS: StepperPins = StepperPins {
        pwm_a: 8,
        ain1: 10,
        ain2: 9,
        pwm_b: 13,
        bin1: 11,
        bin2: 12,
    };

    /// A motor over a mock with zero expectations: any bus traffic fails
    /// the test immediately. The returned handle verifies that on `done`.
    fn quiet_motor() -> (Arc<StepperMotor<Mock>>, Mock) {
        let i2c = Mock::new(&[]);
        let handle = i2c.clone();
        let pwm = Arc::new(Mutex::new(Pca9685::new(i2c, 0x60)));
        let motor = Arc::new(StepperMotor::new(pwm, PINS, 1, 200, Resolution::DEFAULT));
        (motor, handle)
    }

    #[test]
    fn test_set_speed_formula() {
        let (motor, mut i2c) = quiet_motor();
        assert_eq!(motor.set_speed(60.0), Ok(true));
        // 60_000_000 / (200 * 60) = 5000
        assert_eq!(motor.step_period(), Ok(5000));
        drop(motor);
        i2c.done();
    }

    #[test]
    fn test_set_speed_rejects_non_positive() {
        let (motor, mut i2c) = quiet_motor();
        assert!(matches!(
            motor.set_speed(0.0),
            Err(Error::Config(ConfigError::InvalidRpm(_)))
        ));
        assert!(matches!(
            motor.set_speed(-5.0),
            Err(Error::Config(ConfigError::InvalidRpm(_)))
        ));
        // no timing state was mutated
        assert_eq!(
            motor.step_period(),
            Err(Error::Config(ConfigError::SpeedNotSet))
        );
        drop(motor);
        i2c.done();
    }

    #[test]
    fn test_step_requires_speed() {
        let (motor, mut i2c) = quiet_motor();
        let result = motor.step(10, Direction::Forward, Style::Single, true, None);
        assert_eq!(result, Err(Error::Config(ConfigError::SpeedNotSet)));
        drop(motor);
        i2c.done();
    }

    #[test]
    fn test_stop_motor_idle_is_noop() {
        let (motor, mut i2c) = quiet_motor();
        motor.stop_motor();
        assert!(!motor.is_moving());
        assert!(!motor.stop.load(Ordering::Relaxed));
        drop(motor);
        i2c.done();
    }

    #[test]
    fn test_set_resolution_coerces_invalid() {
        let (motor, mut i2c) = quiet_motor();
        assert!(motor.set_resolution(48));
        assert_eq!(motor.resolution(), Resolution::DEFAULT);
        assert!(motor.set_resolution(256));
        assert_eq!(motor.resolution(), Resolution::STEP256);
        drop(motor);
        i2c.done();
    }
}
