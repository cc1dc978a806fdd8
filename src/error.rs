//! Error types for the motorshield library.
//!
//! Splits failures into two kinds so callers can pick a retry policy:
//! [`ConfigError`] is a caller bug and is never worth retrying, while
//! [`BusError`] is environmental (the I2C transaction retry budget was
//! exhausted) and may succeed on a later attempt. Contention on a motor's
//! operation lock is not an error at all: the affected setters return
//! `Ok(false)` ("not applied, try again").

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all motorshield operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration or usage error (caller bug, never retried internally)
    Config(ConfigError),
    /// I2C transaction failure after exhausting the retry budget
    Bus(BusError),
}

/// Configuration and usage errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// File I/O error while loading configuration
    IoError(heapless::String<128>),
    /// Invalid microstep resolution (must be 8, 16, 32, 64, 128, 256 or 512)
    InvalidMicrosteps(u16),
    /// DC motor port out of range (valid: 1-4)
    InvalidDcPort(u8),
    /// Stepper port out of range (valid: 1-2)
    InvalidStepperPort(u8),
    /// PWM channel out of range (valid: 0-15)
    InvalidChannel(u8),
    /// Requested RPM is zero or negative
    InvalidRpm(f64),
    /// PWM frequency is zero or negative
    InvalidFrequency(f64),
    /// A stepping operation was requested before any speed was set
    SpeedNotSet,
    /// The shield was used before `begin()` initialized it
    NotInitialized,
    /// Two motors in the configuration share a port
    DuplicatePort {
        /// The contested port number
        port: u8,
    },
}

/// I2C transaction errors, raised after the bounded retry budget (10
/// attempts) is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A register read never completed
    ReadExhausted {
        /// Register address of the failed read
        register: u8,
    },
    /// A register write never completed
    WriteExhausted {
        /// Register address of the failed write
        register: u8,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Bus(e) => write!(f, "Bus error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 8, 16, 32, 64, 128, 256, 512", v)
            }
            ConfigError::InvalidDcPort(p) => write!(f, "DC motor port {} out of range [1-4]", p),
            ConfigError::InvalidStepperPort(p) => {
                write!(f, "Stepper port {} out of range [1-2]", p)
            }
            ConfigError::InvalidChannel(c) => write!(f, "PWM channel {} out of range [0-15]", c),
            ConfigError::InvalidRpm(rpm) => {
                write!(f, "Motor speed can not be negative or zero (got {})", rpm)
            }
            ConfigError::InvalidFrequency(freq) => {
                write!(f, "PWM frequency must be positive (got {})", freq)
            }
            ConfigError::SpeedNotSet => {
                write!(f, "RPM has to be set before stepping the motor")
            }
            ConfigError::NotInitialized => {
                write!(f, "Shield not initialized, invoke begin() first")
            }
            ConfigError::DuplicatePort { port } => {
                write!(f, "Port {} assigned to more than one motor", port)
            }
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::ReadExhausted { register } => {
                write!(f, "Read of register 0x{:02x} failed after 10 attempts", register)
            }
            BusError::WriteExhausted { register } => {
                write!(f, "Write to register 0x{:02x} failed after 10 attempts", register)
            }
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Error::Bus(e)
    }
}

impl std::error::Error for Error {}

impl std::error::Error for ConfigError {}

impl std::error::Error for BusError {}
