//! PCA9685 16-channel PWM expander driver.
//!
//! Generic over an embedded-hal 1.0 I2C bus. Every register transaction is
//! retried up to 10 times before the failure surfaces as a [`BusError`];
//! the expander occasionally NAKs mid-transfer under bus load and a
//! bounded retry rides it out.

use embedded_hal::i2c::I2c;

use crate::error::{BusError, ConfigError, Error, Result};

/// MODE1 register address.
const MODE1: u8 = 0x00;
/// Prescale register address.
const PRESCALE: u8 = 0xFE;
/// First per-channel register; channel `n` occupies `0x06 + 4n .. +3`.
const LED0_ON_L: u8 = 0x06;

/// MODE1 sleep bit: oscillator off, prescale becomes writable.
const MODE1_SLEEP: u8 = 0x10;
/// MODE1 restart + auto-increment + all-call, applied after programming.
const MODE1_AUTOINC: u8 = 0xA1;

/// Internal oscillator frequency in Hz.
const OSC_CLOCK_HZ: f64 = 25_000_000.0;
/// PWM counter resolution (12 bit).
const PWM_RESOLUTION: f64 = 4096.0;
/// Empirical overshoot compensation for the frequency setting.
const FREQ_CORRECTION: f64 = 0.9;

/// Transaction attempts before a register access is reported failed.
const RETRY_LIMIT: u32 = 10;

/// Number of PWM channels on the expander.
pub const CHANNELS: u8 = 16;

/// PCA9685 driver bound to one I2C address.
pub struct Pca9685<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Pca9685<I2C> {
    /// Create a driver for the expander at `address` on the given bus.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Release the underlying bus.
    pub fn into_inner(self) -> I2C {
        self.i2c
    }

    /// Reset the expander: MODE1 back to power-on defaults.
    pub fn reset(&mut self) -> Result<()> {
        self.write8(MODE1, 0x00)
    }

    /// Program the PWM carrier frequency.
    ///
    /// Applies the 0.9 correction factor, computes the prescale divider,
    /// then walks the sleep/program/restore sequence the chip requires:
    /// the prescale register only accepts writes while the oscillator
    /// sleeps, and the oscillator needs 5 ms to restart afterwards.
    ///
    /// # Errors
    ///
    /// Any read or write in the sequence that exhausts its retries aborts
    /// the whole operation; the caller must not assume the old frequency
    /// is still programmed.
    pub fn set_pwm_freq(&mut self, freq: f64) -> Result<()> {
        if freq <= 0.0 {
            return Err(Error::Config(ConfigError::InvalidFrequency(freq)));
        }
        log::debug!("Attempting to set freq: {}", freq);
        let corrected = freq * FREQ_CORRECTION;

        let prescaleval = OSC_CLOCK_HZ / PWM_RESOLUTION / corrected - 1.0;
        let prescale = (prescaleval + 0.5).floor() as u8;
        log::debug!("Estimated pre-scale: {}, final: {}", prescaleval, prescale);

        let oldmode = self.read8(MODE1)?;
        let sleepmode = (oldmode & 0x7F) | MODE1_SLEEP;
        self.write8(MODE1, sleepmode)?;
        self.write8(PRESCALE, prescale)?;
        self.write8(MODE1, oldmode)?;
        std::thread::sleep(std::time::Duration::from_millis(5));
        self.write8(MODE1, oldmode | MODE1_AUTOINC)?;

        Ok(())
    }

    /// Set the raw on/off tick pair for a channel in a single 5-byte write.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidChannel` for channels above 15, or
    /// `BusError::WriteExhausted` after the retry budget.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        if channel >= CHANNELS {
            return Err(Error::Config(ConfigError::InvalidChannel(channel)));
        }
        let register = LED0_ON_L + 4 * channel;
        log::debug!("Setting PWM {}: 0x{:04x} -> 0x{:04x}", channel, on, off);

        let buf = [
            register,
            on as u8,
            (on >> 8) as u8,
            off as u8,
            (off >> 8) as u8,
        ];
        let mut attempts = RETRY_LIMIT;
        while attempts > 0 {
            if self.i2c.write(self.address, &buf).is_ok() {
                return Ok(());
            }
            attempts -= 1;
        }
        log::debug!("Failed to write to register 0x{:02x}", register);
        Err(Error::Bus(BusError::WriteExhausted { register }))
    }

    /// Set a channel's duty cycle, managing the 'all on' special encoding.
    ///
    /// Values above 4095 select the chip's fully-on encoding
    /// (`on = 4096, off = 0`); everything else maps to `(0, value)`.
    pub fn set_duty(&mut self, channel: u8, value: u16) -> Result<()> {
        if value > 4095 {
            self.set_pwm(channel, 4096, 0)
        } else {
            self.set_pwm(channel, 0, value)
        }
    }

    /// Drive a channel as if it were a GPIO: full-on or full-off.
    pub fn set_pin(&mut self, channel: u8, value: bool) -> Result<()> {
        if value {
            self.set_pwm(channel, 4096, 0)
        } else {
            self.set_pwm(channel, 0, 0)
        }
    }

    /// Read one 8-bit register via a combined write/read transfer.
    ///
    /// # Errors
    ///
    /// `BusError::ReadExhausted` after the retry budget.
    pub fn read8(&mut self, register: u8) -> Result<u8> {
        let mut data = [0u8; 1];
        let mut attempts = RETRY_LIMIT;
        while attempts > 0 {
            if self
                .i2c
                .write_read(self.address, &[register], &mut data)
                .is_ok()
            {
                return Ok(data[0]);
            }
            attempts -= 1;
        }
        Err(Error::Bus(BusError::ReadExhausted { register }))
    }

    /// Write one 8-bit register.
    ///
    /// # Errors
    ///
    /// `BusError::WriteExhausted` after the retry budget.
    pub fn write8(&mut self, register: u8, value: u8) -> Result<()> {
        let buf = [register, value];
        let mut attempts = RETRY_LIMIT;
        while attempts > 0 {
            if self.i2c.write(self.address, &buf).is_ok() {
                return Ok(());
            }
            attempts -= 1;
        }
        Err(Error::Bus(BusError::WriteExhausted { register }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    const ADDR: u8 = 0x60;

    #[test]
    fn test_prescale_for_1600_hz() {
        // round(25e6 / 4096 / (1600 * 0.9) - 1) == 3
        let expectations = [
            Transaction::write_read(ADDR, vec![MODE1], vec![0x00]),
            Transaction::write(ADDR, vec![MODE1, 0x10]),
            Transaction::write(ADDR, vec![PRESCALE, 3]),
            Transaction::write(ADDR, vec![MODE1, 0x00]),
            Transaction::write(ADDR, vec![MODE1, 0xA1]),
        ];
        let mut pca = Pca9685::new(Mock::new(&expectations), ADDR);

        pca.set_pwm_freq(1600.0).unwrap();
        pca.into_inner().done();
    }

    #[test]
    fn test_set_duty_full_on_encoding() {
        let expectations = [
            // 4096 -> special full-on pair
            Transaction::write(ADDR, vec![LED0_ON_L + 4 * 2, 0x00, 0x10, 0x00, 0x00]),
            // plain value -> (0, value)
            Transaction::write(ADDR, vec![LED0_ON_L + 4 * 2, 0x00, 0x00, 0xFF, 0x0F]),
        ];
        let mut pca = Pca9685::new(Mock::new(&expectations), ADDR);

        pca.set_duty(2, 4096).unwrap();
        pca.set_duty(2, 4095).unwrap();
        pca.into_inner().done();
    }

    #[test]
    fn test_set_pin_encodings() {
        let expectations = [
            Transaction::write(ADDR, vec![LED0_ON_L, 0x00, 0x10, 0x00, 0x00]),
            Transaction::write(ADDR, vec![LED0_ON_L, 0x00, 0x00, 0x00, 0x00]),
        ];
        let mut pca = Pca9685::new(Mock::new(&expectations), ADDR);

        pca.set_pin(0, true).unwrap();
        pca.set_pin(0, false).unwrap();
        pca.into_inner().done();
    }

    #[test]
    fn test_invalid_channel_rejected_without_traffic() {
        let mut pca = Pca9685::new(Mock::new(&[]), ADDR);

        assert_eq!(
            pca.set_pwm(16, 0, 0),
            Err(Error::Config(ConfigError::InvalidChannel(16)))
        );
        pca.into_inner().done();
    }
}
