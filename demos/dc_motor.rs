//! Basic DC motor control example.
//!
//! Demonstrates bringing up the shield, vending a DC motor and driving it
//! through a short throttle sweep.
//!
//! This example uses an in-memory I2C bus so it runs without hardware; on
//! a real host, hand `MotorShield::new` a `linux_embedded_hal::I2cdev`
//! opened on the shield's bus instead.

use std::thread;
use std::time::Duration;

use motorshield::{Direction, MotorShield};

/// Loopback I2C bus for demonstration.
#[derive(Default)]
struct LoopbackBus;

impl embedded_hal::i2c::ErrorType for LoopbackBus {
    type Error = embedded_hal::i2c::ErrorKind;
}

impl embedded_hal::i2c::I2c for LoopbackBus {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [embedded_hal::i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        // In real code this is the kernel's i2c-dev transfer
        for op in operations.iter_mut() {
            if let embedded_hal::i2c::Operation::Read(buffer) = op {
                buffer.fill(0);
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== DC Motor Example ===\n");

    let mut shield = MotorShield::new(LoopbackBus, 0x60);
    shield.begin(1600.0)?;
    println!("Shield up at {} Hz", shield.frequency());

    let motor = shield.get_motor(1)?;

    println!("Ramping up forward...");
    motor.run(Direction::Forward)?;
    for speed in (0..=255u8).step_by(17) {
        motor.set_speed(speed)?;
        thread::sleep(Duration::from_millis(20));
    }

    println!("Reversing at half throttle...");
    motor.run(Direction::Backward)?;
    motor.set_speed(128)?;
    thread::sleep(Duration::from_millis(500));

    println!("Coasting to a stop");
    motor.run(Direction::Release)?;
    motor.full_off()?;

    Ok(())
}
