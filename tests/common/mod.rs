//! Shared test helpers.
//!
//! [`FakeBus`] is a permissive I2C double for exercising the stepping
//! engine end to end: it accepts every transaction and records all writes.
//! Clones share state, so a test can keep a handle while the shield owns
//! the bus.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use parking_lot::Mutex;

#[derive(Default)]
struct BusState {
    writes: Vec<Vec<u8>>,
}

/// Recording in-memory I2C bus.
#[derive(Clone, Default)]
pub struct FakeBus {
    state: Arc<Mutex<BusState>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of write transactions seen so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// The most recent `(on, off)` pair written to a PWM channel, if any.
    pub fn last_pwm(&self, channel: u8) -> Option<(u16, u16)> {
        let register = 0x06 + 4 * channel;
        let state = self.state.lock();
        state.writes.iter().rev().find_map(|w| {
            if w.len() == 5 && w[0] == register {
                Some((
                    u16::from(w[1]) | u16::from(w[2]) << 8,
                    u16::from(w[3]) | u16::from(w[4]) << 8,
                ))
            } else {
                None
            }
        })
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => state.writes.push(bytes.to_vec()),
                Operation::Read(buffer) => buffer.fill(0),
            }
        }
        Ok(())
    }
}
