//! Stepper phase engine.
//!
//! Pure, deterministic mapping from `(phase, direction, style)` to the next
//! phase index, the two coil PWM duties and the direction-pin latch
//! pattern. The phase index lives in `[0, 4N)` where `N` is the microstep
//! resolution; it is renormalized into that range after every update and is
//! never left negative.

use crate::config::units::Resolution;

use super::curve::curve_for;

/// Direction of motor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Advance the phase index.
    Forward,
    /// Walk the phase index backwards.
    Backward,
    /// Active braking. Not implemented by the shield hardware.
    Brake,
    /// De-energize (DC motors: coast).
    Release,
}

/// Stepping style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// One coil energized at a time, full-step advance.
    Single,
    /// Two adjacent coils energized, full-step advance.
    Double,
    /// Alternates single/double every half-step.
    Interleave,
    /// One microstep per call, duties from the sine curve.
    Microstep,
}

/// Result of one phase advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    /// New phase index, in `[0, 4N)`.
    pub phase: u16,
    /// PWM duty for the A coil pair.
    pub coil_a: u16,
    /// PWM duty for the B coil pair.
    pub coil_b: u16,
    /// Direction-pin pattern: bit0 AIN2, bit1 BIN1, bit2 AIN1, bit3 BIN2.
    pub latch: u8,
}

/// Compute one phase advance.
///
/// `Single` and `Double` move a full step but first realign from an
/// intermediate phase (an odd half-step for `Single`, an even one for
/// `Double`). `Interleave` moves a half-step. `Microstep` moves one
/// microstep unit and blends the two coils along the quarter-wave curve,
/// mirrored per quadrant. Directions other than `Forward` walk backwards.
pub(crate) fn transition(
    phase: u16,
    dir: Direction,
    style: Style,
    resolution: Resolution,
) -> Transition {
    let n = i32::from(resolution.value());
    let half = n / 2;
    let cycle = n * 4;
    let forward = dir == Direction::Forward;
    let mut step = i32::from(phase);

    let mut coil_a = 4095u16;
    let mut coil_b = 4095u16;

    match style {
        Style::Single => {
            if (step / half) % 2 != 0 {
                // at an odd half-step, realign to the next full step
                step += if forward { half } else { -half };
            } else {
                step += if forward { n } else { -n };
            }
        }
        Style::Double => {
            if (step / half) % 2 == 0 {
                // at a full step, realign to the next half-step
                step += if forward { half } else { -half };
            } else {
                step += if forward { n } else { -n };
            }
        }
        Style::Interleave => {
            step += if forward { half } else { -half };
        }
        Style::Microstep => {
            step += if forward { 1 } else { -1 };
            step = step.rem_euclid(cycle);

            let curve = curve_for(resolution);
            let nn = n as usize;
            let s = step as usize;
            let (a, b) = if s < nn {
                (curve[nn - s], curve[s])
            } else if s < 2 * nn {
                (curve[s - nn], curve[2 * nn - s])
            } else if s < 3 * nn {
                (curve[3 * nn - s], curve[s - 2 * nn])
            } else {
                (curve[s - 3 * nn], curve[4 * nn - s])
            };
            coil_a = a;
            coil_b = b;
        }
    }

    let phase = step.rem_euclid(cycle) as u16;

    let latch = match style {
        Style::Microstep => match phase / resolution.value() {
            0 => 0x03,
            1 => 0x06,
            2 => 0x0C,
            _ => 0x09,
        },
        _ => match phase / (resolution.value() / 2) {
            0 => 0x01, // coil 1 only
            1 => 0x03, // coils 1+2
            2 => 0x02, // coil 2 only
            3 => 0x06, // coils 2+3
            4 => 0x04, // coil 3 only
            5 => 0x0C, // coils 3+4
            6 => 0x08, // coil 4 only
            _ => 0x09, // coils 1+4
        },
    };

    Transition {
        phase,
        coil_a,
        coil_b,
        latch,
    }
}
