//! Threaded stepping tests over the recording fake bus.
//!
//! Timing assertions here are deliberately loose: stepping is best-effort
//! and bounded by the host scheduler, so the tests check ordering and
//! final state rather than wall-clock precision.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::FakeBus;
use motorshield::{Direction, MotorShield, Resolution, Style};

fn shield_with_stepper(
    steps_per_rev: u16,
    resolution: Resolution,
    rpm: f64,
) -> (
    MotorShield<FakeBus>,
    Arc<motorshield::StepperMotor<FakeBus>>,
    FakeBus,
) {
    let bus = FakeBus::new();
    let mut shield = MotorShield::without_signal_safety(bus.clone(), 0x60);
    shield.begin(1600.0).expect("begin should succeed");
    let stepper = shield
        .get_stepper(steps_per_rev, 1, resolution)
        .expect("stepper should vend");
    assert_eq!(stepper.set_speed(rpm), Ok(true));
    (shield, stepper, bus)
}

/// Wait until the motor reports idle, with a hard cap.
fn wait_for_idle(stepper: &motorshield::StepperMotor<FakeBus>, cap: Duration) {
    let deadline = Instant::now() + cap;
    while stepper.is_moving() {
        assert!(Instant::now() < deadline, "motor did not stop in time");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_blocking_step_returns_phase_to_start() {
    // 3000 RPM on 200 steps/rev: 100 us per step
    let (_shield, stepper, bus) = shield_with_stepper(200, Resolution::STEP16, 3000.0);
    assert_eq!(stepper.step_period(), Ok(100));

    let writes_before = bus.write_count();
    let start_phase = stepper.phase_index();
    stepper
        .step(64, Direction::Forward, Style::Single, true, None)
        .expect("step should run");

    // 64 full steps of 16 microsteps each = 16 whole electrical cycles
    assert_eq!(stepper.phase_index(), start_phase);
    assert!(!stepper.is_moving());
    // each advance writes 2 PWM duties + 4 pins
    assert_eq!(bus.write_count() - writes_before, 64 * 6);
}

#[test]
fn test_blocking_step_takes_roughly_nominal_time() {
    // 1500 RPM on 200 steps/rev: 200 us per step, 50 steps -> 10 ms nominal
    let (_shield, stepper, _bus) = shield_with_stepper(200, Resolution::STEP16, 1500.0);

    let started = Instant::now();
    stepper
        .step(50, Direction::Forward, Style::Double, true, None)
        .expect("step should run");
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(8), "finished too fast: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "took far too long: {:?}", elapsed);
}

#[test]
fn test_interleave_halves_the_tick_period() {
    // 600 RPM on 200 steps/rev: 500 us per step, halved to 250 us per tick.
    // 40 interleaved steps advance 40 half-steps = 20 full steps.
    let (_shield, stepper, _bus) = shield_with_stepper(200, Resolution::STEP16, 600.0);

    let start_phase = stepper.phase_index();
    let started = Instant::now();
    stepper
        .step(40, Direction::Forward, Style::Interleave, true, None)
        .expect("step should run");
    let elapsed = started.elapsed();

    // 40 ticks at 250 us is 10 ms nominal
    assert!(elapsed >= Duration::from_millis(8));
    let advanced = i32::from(stepper.phase_index()) - i32::from(start_phase);
    assert_eq!(advanced.rem_euclid(64), 40 * 8 % 64);
}

#[test]
fn test_nonblocking_step_and_stop() {
    // 150 RPM on 200 steps/rev: 2000 us per step; 1000 steps is 2 s nominal
    let (_shield, stepper, _bus) = shield_with_stepper(200, Resolution::STEP16, 150.0);

    stepper
        .step(1000, Direction::Forward, Style::Double, false, None)
        .expect("step should start");

    thread::sleep(Duration::from_millis(50));
    assert!(stepper.is_moving());

    stepper.stop_motor();
    wait_for_idle(&stepper, Duration::from_secs(1));
    assert!(!stepper.is_moving());
}

#[test]
fn test_step_callback_runs_per_step() {
    let (_shield, stepper, _bus) = shield_with_stepper(200, Resolution::STEP16, 3000.0);

    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    stepper
        .step(
            10,
            Direction::Forward,
            Style::Single,
            true,
            Some(Box::new(move |_motor| {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
        )
        .expect("step should run");

    assert_eq!(count.load(Ordering::Relaxed), 10);
}

#[test]
fn test_microstep_stop_completes_full_step() {
    // 18.75 RPM on 200 steps/rev: 16000 us per step, 1000 us per microstep
    let (_shield, stepper, _bus) = shield_with_stepper(200, Resolution::STEP16, 18.75);
    assert_eq!(stepper.step_period(), Ok(16000));

    stepper
        .step(8, Direction::Forward, Style::Microstep, false, None)
        .expect("step should start");

    // Land a stop request partway through a full step.
    thread::sleep(Duration::from_millis(20));
    stepper.stop_motor();
    wait_for_idle(&stepper, Duration::from_secs(3));

    // The engine must have run on to an integral step boundary.
    assert_eq!(stepper.phase_index() % 16, 0);
}

#[test]
fn test_release_zeroes_coils() {
    let (_shield, stepper, bus) = shield_with_stepper(200, Resolution::STEP16, 60.0);

    stepper.release().expect("release should succeed");

    // stepper port 1 channels: pins 9/10/11/12 low, PWM 8/13 zeroed
    for channel in [9u8, 10, 11, 12, 8, 13] {
        assert_eq!(bus.last_pwm(channel), Some((0, 0)));
    }
}

#[test]
fn test_concurrent_steps_serialize() {
    // Two short operations queued on one motor: both complete, and the
    // total write count matches both having fully run.
    let (_shield, stepper, bus) = shield_with_stepper(200, Resolution::STEP16, 3000.0);

    let writes_before = bus.write_count();
    stepper
        .step(20, Direction::Forward, Style::Single, false, None)
        .expect("step should start");
    stepper
        .step(20, Direction::Backward, Style::Single, false, None)
        .expect("step should queue");

    // generous cap: two 2 ms operations plus scheduling
    thread::sleep(Duration::from_millis(50));
    wait_for_idle(&stepper, Duration::from_secs(3));
    thread::sleep(Duration::from_millis(20));

    assert_eq!(bus.write_count() - writes_before, 2 * 20 * 6);
}
