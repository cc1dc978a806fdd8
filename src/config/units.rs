//! Unit types for motor quantities.
//!
//! Provides the validated microstep resolution type used by the stepper
//! engine and by the TOML configuration layer.

use serde::Deserialize;

use crate::error::ConfigError;

/// Microstep resolution: microsteps per full step (8, 16, 32, 64, 128, 256
/// or 512).
///
/// Validated at construction. One electrical cycle of the stepper spans
/// `4 × resolution` phase positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution(u16);

impl Resolution {
    /// 8 microsteps per step.
    pub const STEP8: Self = Self(8);
    /// 16 microsteps per step.
    pub const STEP16: Self = Self(16);
    /// 32 microsteps per step.
    pub const STEP32: Self = Self(32);
    /// 64 microsteps per step.
    pub const STEP64: Self = Self(64);
    /// 128 microsteps per step.
    pub const STEP128: Self = Self(128);
    /// 256 microsteps per step.
    pub const STEP256: Self = Self(256);
    /// 512 microsteps per step (maximum resolution).
    pub const STEP512: Self = Self(512);

    /// The library default, used when an unsupported value is coerced.
    pub const DEFAULT: Self = Self::STEP16;

    /// Valid resolution values.
    pub(crate) const VALID_VALUES: [u16; 7] = [8, 16, 32, 64, 128, 256, 512];

    /// Create a new Resolution with validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMicrosteps` if the value is unsupported.
    pub fn new(value: u16) -> Result<Self, ConfigError> {
        if Self::VALID_VALUES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidMicrosteps(value))
        }
    }

    /// Create a Resolution, falling back to [`Resolution::DEFAULT`] with a
    /// logged diagnostic when the value is unsupported.
    pub fn coerce(value: u16) -> Self {
        match Self::new(value) {
            Ok(res) => res,
            Err(_) => {
                log::warn!(
                    "Microsteps {} not valid, setting microsteps to {}",
                    value,
                    Self::DEFAULT.value()
                );
                Self::DEFAULT
            }
        }
    }

    /// Get the raw microsteps-per-step value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Number of phase positions in one electrical cycle (`4 × microsteps`).
    #[inline]
    pub const fn cycle_len(self) -> u16 {
        self.0 * 4
    }

    /// Check if a value is a supported resolution.
    #[inline]
    pub fn is_valid(value: u16) -> bool {
        Self::VALID_VALUES.contains(&value)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u16> for Resolution {
    type Error = ConfigError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use core::fmt::Write;
        let value = u16::deserialize(deserializer)?;
        Resolution::new(value).map_err(|e| {
            let mut buf = heapless::String::<128>::new();
            let _ = write!(buf, "{}", e);
            serde::de::Error::custom(buf.as_str())
        })
    }
}
