//! Microstep duty curves.
//!
//! One sinusoidal quarter-wave table per supported resolution, shared
//! read-only for the process lifetime. A table for resolution `N` holds
//! `N + 1` points of `floor(4095 * sin(pi/2 * i / N))`; the last point is
//! the beginning of the next step.

use std::sync::LazyLock;

use crate::config::units::Resolution;

static CURVES: LazyLock<[Vec<u16>; 7]> =
    LazyLock::new(|| Resolution::VALID_VALUES.map(build_curve));

fn build_curve(n: u16) -> Vec<u16> {
    (0..=n)
        .map(|i| {
            let angle = std::f64::consts::FRAC_PI_2 * f64::from(i) / f64::from(n);
            (4095.0 * angle.sin()).floor() as u16
        })
        .collect()
}

/// The quarter-wave duty table for a resolution.
pub(crate) fn curve_for(resolution: Resolution) -> &'static [u16] {
    let idx = match resolution.value() {
        8 => 0,
        16 => 1,
        32 => 2,
        64 => 3,
        128 => 4,
        256 => 5,
        _ => 6,
    };
    &CURVES[idx]
}
