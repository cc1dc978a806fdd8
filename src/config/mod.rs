//! Configuration module for motorshield.
//!
//! Provides types for loading and validating shield and motor configurations
//! from TOML files or pre-parsed strings.

mod loader;
mod motor;
mod shield;
mod system;
pub mod units;
mod validation;

pub use loader::{load_config, parse_config};
pub use motor::{DcMotorConfig, StepperConfig};
pub use shield::ShieldConfig;
pub use system::SystemConfig;
pub use validation::validate_config;

// Re-export unit types at config level
pub use units::Resolution;
