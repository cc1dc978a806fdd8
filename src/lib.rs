//! # motorshield
//!
//! PCA9685 motor shield control for DC and stepper motors, with
//! software-timed stepping driven from the host.
//!
//! ## Features
//!
//! - **embedded-hal 1.0**: the shield is generic over any `I2c` bus (on a
//!   Raspberry Pi, hand it a `linux_embedded_hal::I2cdev`)
//! - **Four stepping styles**: single, double, interleaved and microstepped
//!   coil drive, at 8 through 512 microsteps per step
//! - **Blocking and detached stepping**: a step operation either occupies
//!   the calling thread or runs on its own, with per-step callbacks and
//!   cooperative cancellation either way
//! - **Signal safety**: SIGINT stops every motor the process has vended
//!   before the process dies
//! - **Configuration-driven**: describe the shield and its motors in TOML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use motorshield::{Direction, MotorShield, Resolution, Style};
//!
//! let i2c = linux_embedded_hal::I2cdev::new("/dev/i2c-1")?;
//! let mut shield = MotorShield::new(i2c, 0x60);
//! shield.begin(1600.0)?;
//!
//! let stepper = shield.get_stepper(200, 1, Resolution::STEP16)?;
//! stepper.set_speed(30.0)?;
//! stepper.step(200, Direction::Forward, Style::Double, true, None)?;
//! stepper.release()?;
//! ```
//!
//! ## Cargo features
//!
//! - `sighup`: also intercept SIGHUP in the signal-safety coordinator
//! - `sigpipe`: also intercept SIGPIPE

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod motor;
pub mod safety;

// Re-exports for ergonomic API
pub use bus::Pca9685;
pub use config::{load_config, validate_config, SystemConfig};
pub use error::{Error, Result};
pub use motor::{DcMotor, Direction, MotorShield, StepperMotor, Style};
pub use safety::emergency_stop_all;

// Unit types
pub use config::units::Resolution;
