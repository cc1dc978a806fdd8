//! Motor module for motorshield.
//!
//! Provides the shield controller plus the DC and stepper motor types it
//! vends, and the stepper phase engine underneath them.

mod curve;
mod dc;
mod phase;
mod shield;
mod stepper;

pub use dc::DcMotor;
pub use phase::{Direction, Style};
pub use shield::{MotorShield, DEFAULT_FREQUENCY};
pub use stepper::{StepCallback, StepperMotor};
