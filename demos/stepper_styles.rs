//! Stepper styles example.
//!
//! Walks one stepper through all four stepping styles, then runs a
//! detached move with a per-step progress callback.
//!
//! Uses an in-memory I2C bus so it runs without hardware; swap in a
//! `linux_embedded_hal::I2cdev` for a real shield.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use motorshield::{Direction, MotorShield, Resolution, Style};

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
        for op in operations.iter_mut() {
            if let embedded_hal::i2c::Operation::Read(buffer) = op {
                buffer.fill(0);
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Stepper Styles Example ===\n");

    let mut shield = MotorShield::new(LoopbackBus, 0x60);
    shield.begin(1600.0)?;

    let stepper = shield.get_stepper(200, 1, Resolution::STEP16)?;
    stepper.set_speed(300.0)?;
    println!(
        "200 steps/rev at 300 RPM: {} us per step",
        stepper.step_period()?
    );

    for (name, style) in [
        ("single", Style::Single),
        ("double", Style::Double),
        ("interleave", Style::Interleave),
        ("microstep", Style::Microstep),
    ] {
        println!("Stepping 50 forward, {}", name);
        stepper.step(50, Direction::Forward, style, true, None)?;
        println!("  phase index now {}", stepper.phase_index());
    }

    println!("\nDetached move with progress callback...");
    let progress = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&progress);
    stepper.step(
        100,
        Direction::Backward,
        Style::Double,
        false,
        Some(Box::new(move |_motor| {
            counter.fetch_add(1, Ordering::Relaxed);
        })),
    )?;

    loop {
        thread::sleep(Duration::from_millis(50));
        println!("  {} steps done", progress.load(Ordering::Relaxed));
        if !stepper.is_moving() && progress.load(Ordering::Relaxed) > 0 {
            break;
        }
    }

    stepper.release()?;
    println!("Released");

    Ok(())
}
