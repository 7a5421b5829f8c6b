//! Math backend and small helpers shared by the oscillator.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` sine for hot paths
//! - Side-effect free helpers that are easy to test
//!
//! Conventions:
//! - Phase is in **radians**, frequencies in **Hz**, amplitude is linear `[0, 1]`.
//! - Everything is `f64`; the oscillator narrows to `f32` only at its output.

#![allow(clippy::excessive_precision)]

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // libm (C math) in no_std
    if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f64) -> f64 { libm::sin(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f64) -> f64 { x.sin() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π
pub const TAU: f64 = core::f64::consts::TAU;

/// Lowest frequency the oscillator will ever produce.
pub const MIN_FREQUENCY_HZ: f64 = 20.0;

/// Highest frequency the oscillator will ever produce.
pub const MAX_FREQUENCY_HZ: f64 = 22_000.0;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Clamp into the audible range. `NaN` becomes the lowest audible frequency.
#[inline]
pub fn clamp_frequency(hz: f64) -> f64 {
    if hz.is_nan() {
        return MIN_FREQUENCY_HZ;
    }
    clamp(hz, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
}

/// Clamp a linear gain into `[0, 1]`. `NaN` is silence.
#[inline]
pub fn clamp_amplitude(gain: f64) -> f64 {
    if gain.is_nan() {
        return 0.0;
    }
    clamp(gain, 0.0, 1.0)
}

/// Wrap a non-negative phase back into `[0, 2π)`.
///
/// One subtraction is enough whenever the per-sample increment is below 2π,
/// which holds for every audible frequency at 44.1 kHz and up. The loop only
/// runs again for very low device rates.
#[inline]
pub fn wrap_phase(mut phase: f64) -> f64 {
    while phase >= TAU {
        phase -= TAU;
    }
    phase
}

/// Phase advance per sample for `hz` at `sr`.
#[inline]
pub fn phase_increment(hz: f64, sr: f64) -> f64 {
    TAU * hz / sr
}

// --------------------------------- Fast trig -------------------------------------

/// Sine of a wrapped phase `x ∈ [0, 2π)`.
///
/// With `fast-math` the argument is folded into `[-π/2, π/2]` and fed to a
/// 9th-order odd polynomial (max abs error ~4e-6, at ±π/2); otherwise the backend's
/// exact `sin` is used.
#[inline]
pub fn sin(x: f64) -> f64 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            use core::f64::consts::{FRAC_PI_2, PI};
            let mut xr = if x > PI { x - TAU } else { x };
            if xr > FRAC_PI_2 {
                xr = PI - xr;
            } else if xr < -FRAC_PI_2 {
                xr = -PI - xr;
            }
            let x2 = xr * xr;
            let x3 = x2 * xr;
            // Horner form of x - x³/3! + x⁵/5! - x⁷/7! + x⁹/9!
            xr + x3 * (-1.0 / 6.0 + x2 * (1.0 / 120.0 + x2 * (-1.0 / 5040.0 + x2 * (1.0 / 362_880.0))))
        } else {
            m_sin(x)
        }
    }
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn frequency_clamps_to_audible_range() {
        assert_eq!(clamp_frequency(50_000.0), MAX_FREQUENCY_HZ);
        assert_eq!(clamp_frequency(1.0), MIN_FREQUENCY_HZ);
        assert_eq!(clamp_frequency(-440.0), MIN_FREQUENCY_HZ);
        assert_eq!(clamp_frequency(f64::INFINITY), MAX_FREQUENCY_HZ);
        assert_eq!(clamp_frequency(f64::NAN), MIN_FREQUENCY_HZ);
        assert_eq!(clamp_frequency(440.0), 440.0);
    }

    #[test]
    fn amplitude_clamps_to_unit_range() {
        assert_eq!(clamp_amplitude(1.5), 1.0);
        assert_eq!(clamp_amplitude(-0.2), 0.0);
        assert_eq!(clamp_amplitude(f64::NAN), 0.0);
        assert_eq!(clamp_amplitude(0.25), 0.25);
    }

    #[test]
    fn wrap_keeps_phase_below_tau() {
        assert_eq!(wrap_phase(0.0), 0.0);
        assert!((wrap_phase(TAU + 0.5) - 0.5).abs() < 1e-12);
        assert_eq!(wrap_phase(TAU), 0.0);
        let p = wrap_phase(3.0 * TAU + 1.0);
        assert!((0.0..TAU).contains(&p), "p={p}");
    }

    #[test]
    fn sine_matches_reference_over_one_turn() {
        let tol = if cfg!(feature = "fast-math") { 1e-5 } else { 1e-12 };
        for i in 0..4096 {
            let x = TAU * f64::from(i) / 4096.0;
            assert!((sin(x) - x.sin()).abs() < tol, "x={x}");
        }
        // the fold points are where the polynomial is weakest
        for x in [FRAC_PI_2, 3.0 * FRAC_PI_2, PI, TAU - 1e-9] {
            assert!((sin(x) - x.sin()).abs() < tol, "x={x}");
        }
    }
}
