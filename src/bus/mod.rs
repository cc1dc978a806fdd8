//! PCA9685 register protocol layer.
//!
//! Encodes/decodes the expander's register map and performs retrying I2C
//! transactions. Has no knowledge of motors.

mod pca9685;

pub use pca9685::{Pca9685, CHANNELS};
