//! Phase-continuous sine oscillator driven by a [`FrequencyProgram`].
//!
//! The oscillator knows nothing about playback: it is a pure function of its
//! accumulated phase and the elapsed time its caller hands in. Every input is
//! clamped once, at construction, so no sample is ever produced outside the
//! audible range or above unity gain.
//!
//! Sweeps interpolate **frequency**, not phase, so phase is integrated sample
//! by sample instead of being computed in closed form. That keeps the waveform
//! continuous across blocks no matter how the caller slices time.

use crate::dsp::{clamp, clamp_amplitude, clamp_frequency, lerp, phase_increment, sin, wrap_phase};

/// What frequency the oscillator plays at a given elapsed time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FrequencyProgram {
    /// Fixed pitch.
    Constant { hz: f64 },
    /// Linear chirp from `start_hz` to `end_hz` over `duration_secs`, then
    /// holds `end_hz`.
    Sweep { start_hz: f64, end_hz: f64, duration_secs: f64 },
}

impl FrequencyProgram {
    /// Constant tone, clamped to the audible range.
    #[inline]
    pub fn constant(hz: f64) -> Self {
        Self::Constant { hz: clamp_frequency(hz) }
    }

    /// Linear sweep with both endpoints clamped to the audible range.
    /// A non-positive (or `NaN`) duration makes the sweep start at its end.
    #[inline]
    pub fn sweep(start_hz: f64, end_hz: f64, duration_secs: f64) -> Self {
        Self::Sweep {
            start_hz: clamp_frequency(start_hz),
            end_hz: clamp_frequency(end_hz),
            duration_secs: if duration_secs > 0.0 { duration_secs } else { 0.0 },
        }
    }

    /// Sweep progress in `[0, 1]` at `elapsed` seconds. Always 1 for a constant tone.
    #[inline]
    pub fn progress(&self, elapsed: f64) -> f64 {
        match *self {
            Self::Constant { .. } => 1.0,
            Self::Sweep { duration_secs, .. } => {
                if duration_secs <= 0.0 || elapsed.is_nan() {
                    1.0
                } else {
                    clamp(elapsed / duration_secs, 0.0, 1.0)
                }
            }
        }
    }

    /// Instantaneous frequency (Hz) at `elapsed` seconds.
    #[inline]
    pub fn frequency_at(&self, elapsed: f64) -> f64 {
        match *self {
            Self::Constant { hz } => hz,
            Self::Sweep { start_hz, end_hz, .. } => lerp(start_hz, end_hz, self.progress(elapsed)),
        }
    }
}

/// Sine oscillator state: running phase plus the session-fixed sample rate,
/// amplitude and frequency program.
#[derive(Copy, Clone, Debug)]
pub struct Oscillator {
    phase: f64, // radians, [0, 2π)
    sample_rate: u32,
    amplitude: f64,
    program: FrequencyProgram,
}

impl Oscillator {
    /// Build an oscillator at phase 0.
    ///
    /// `amplitude` is clamped to `[0, 1]`. A zero `sample_rate` is treated as 1
    /// so the per-sample increment stays finite.
    pub fn new(program: FrequencyProgram, amplitude: f64, sample_rate: u32) -> Self {
        // Re-clamp in case the caller built the enum variant by hand.
        let program = match program {
            FrequencyProgram::Constant { hz } => FrequencyProgram::constant(hz),
            FrequencyProgram::Sweep { start_hz, end_hz, duration_secs } => {
                FrequencyProgram::sweep(start_hz, end_hz, duration_secs)
            }
        };
        Self {
            phase: 0.0,
            sample_rate: sample_rate.max(1),
            amplitude: clamp_amplitude(amplitude),
            program,
        }
    }

    #[inline] pub fn phase(&self) -> f64 { self.phase }
    #[inline] pub fn sample_rate(&self) -> u32 { self.sample_rate }
    #[inline] pub fn amplitude(&self) -> f64 { self.amplitude }
    #[inline] pub fn program(&self) -> &FrequencyProgram { &self.program }

    /// Back to phase 0; program and gain are untouched.
    #[inline] pub fn reset(&mut self) { self.phase = 0.0; }

    /// Frequency (Hz) the next sample would use at `elapsed` seconds.
    #[inline]
    pub fn instantaneous_frequency(&self, elapsed: f64) -> f64 {
        self.program.frequency_at(elapsed)
    }

    /// Phase advance (radians) applied after a sample taken at `elapsed` seconds.
    #[inline]
    pub fn phase_increment(&self, elapsed: f64) -> f64 {
        phase_increment(self.instantaneous_frequency(elapsed), f64::from(self.sample_rate))
    }

    /// Produce one normalized sample in `[-1, 1]` and advance the phase.
    ///
    /// `elapsed` is the playback time in seconds; only sweeps look at it.
    #[inline]
    pub fn next_sample(&mut self, elapsed: f64) -> f32 {
        let out = sin(self.phase) * self.amplitude;
        self.phase = wrap_phase(self.phase + self.phase_increment(elapsed));
        out as f32
    }

    /// Fill every slot of `block`, using `block_start` (seconds) as the
    /// elapsed time for the whole block.
    #[inline]
    pub fn fill(&mut self, block: &mut [f32], block_start: f64) {
        // Frequency is constant within a block, so compute the step once.
        let inc = self.phase_increment(block_start);
        for y in block.iter_mut() {
            *y = (sin(self.phase) * self.amplitude) as f32;
            self.phase = wrap_phase(self.phase + inc);
        }
    }

    /// Lazy, infinite sample stream whose clock starts at `start` seconds and
    /// advances by one sample period per item.
    #[inline]
    pub fn samples(&mut self, start: f64) -> Samples<'_> {
        Samples { osc: self, n: 0, start }
    }
}

/// Iterator returned by [`Oscillator::samples`]. Never ends.
#[derive(Debug)]
pub struct Samples<'a> {
    osc: &'a mut Oscillator,
    n: u64,
    start: f64,
}

impl Iterator for Samples<'_> {
    type Item = f32;

    #[inline]
    fn next(&mut self) -> Option<f32> {
        #[allow(clippy::cast_precision_loss)]
        let t = self.start + self.n as f64 / f64::from(self.osc.sample_rate);
        self.n += 1;
        Some(self.osc.next_sample(t))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, TAU};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SR: u32 = 44_100;

    /// Count sign changes in a buffer (negative <-> non-negative).
    fn zero_crossings(buf: &[f32]) -> usize {
        buf.windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count()
    }

    fn render(osc: &mut Oscillator, n: usize) -> Vec<f32> {
        osc.samples(0.0).take(n).collect()
    }

    #[test]
    fn first_sample_is_silent_and_phase_starts_at_zero() {
        let mut osc = Oscillator::new(FrequencyProgram::constant(440.0), 1.0, SR);
        assert_eq!(osc.phase(), 0.0);
        assert_eq!(osc.next_sample(0.0), 0.0);
    }

    #[test]
    fn crossing_rate_tracks_frequency() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut freqs = vec![MIN_FREQUENCY_HZ, 440.0, 1000.0, 10_000.0, MAX_FREQUENCY_HZ];
        freqs.extend((0..16).map(|_| rng.gen_range(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ)));

        for f in freqs {
            let mut osc = Oscillator::new(FrequencyProgram::constant(f), 1.0, SR);
            // one second window: a sine crosses zero twice per cycle
            let buf = render(&mut osc, SR as usize);
            let expected = 2.0 * f;
            let got = zero_crossings(&buf) as f64;
            assert!(
                (got - expected).abs() <= expected * 0.01 + 2.0,
                "f={f} expected~{expected} got={got}"
            );
        }
    }

    #[test]
    fn out_of_range_frequencies_behave_like_the_nearest_bound() {
        let mut high = Oscillator::new(FrequencyProgram::constant(50_000.0), 1.0, SR);
        let mut top = Oscillator::new(FrequencyProgram::constant(22_000.0), 1.0, SR);
        assert_eq!(render(&mut high, 4096), render(&mut top, 4096));

        let mut low = Oscillator::new(FrequencyProgram::constant(1.0), 1.0, SR);
        let mut bottom = Oscillator::new(FrequencyProgram::constant(20.0), 1.0, SR);
        assert_eq!(render(&mut low, 4096), render(&mut bottom, 4096));
    }

    #[test]
    fn hand_built_programs_are_clamped_too() {
        let osc = Oscillator::new(
            FrequencyProgram::Sweep { start_hz: 5.0, end_hz: 90_000.0, duration_secs: 1.0 },
            3.0,
            SR,
        );
        assert_eq!(osc.instantaneous_frequency(0.0), MIN_FREQUENCY_HZ);
        assert_eq!(osc.instantaneous_frequency(1.0), MAX_FREQUENCY_HZ);
        assert_eq!(osc.amplitude(), 1.0);
    }

    #[test]
    fn output_is_bounded_by_amplitude() {
        let mut osc = Oscillator::new(FrequencyProgram::constant(997.0), 0.3, SR);
        for s in osc.samples(0.0).take(SR as usize) {
            assert!(s.abs() <= 0.3 + 1e-6, "s={s}");
        }
    }

    #[test]
    fn phase_stays_wrapped_over_long_runs() {
        let mut osc = Oscillator::new(FrequencyProgram::constant(21_999.0), 1.0, SR);
        for _ in 0..(10 * SR) {
            osc.next_sample(0.0);
            assert!((0.0..TAU).contains(&osc.phase()));
        }
    }

    #[test]
    fn phase_stays_wrapped_at_low_sample_rates() {
        // increment > 2π here; wrapping must still land in range
        let mut osc = Oscillator::new(FrequencyProgram::constant(22_000.0), 1.0, 8_000);
        for _ in 0..1000 {
            osc.next_sample(0.0);
            assert!((0.0..TAU).contains(&osc.phase()));
        }
    }

    #[test]
    fn phase_is_continuous_across_block_boundaries() {
        let mut osc = Oscillator::new(FrequencyProgram::constant(440.0), 1.0, SR);
        let mut block = [0.0f32; 512];
        let inc = osc.phase_increment(0.0);

        // phase used for the last slot of block N
        let mut probe = osc;
        probe.fill(&mut block[..511], 0.0);
        let last = probe.phase();

        osc.fill(&mut block, 0.0);
        let carried = osc.phase();
        assert!((wrap_phase(last + inc) - carried).abs() < 1e-12);

        // the next block's first sample is sin(carried)
        let mut next = [0.0f32; 512];
        osc.fill(&mut next, 512.0 / f64::from(SR));
        assert!((f64::from(next[0]) - carried.sin()).abs() < 1e-4);

        // and it matches a single uninterrupted run
        let mut reference = Oscillator::new(FrequencyProgram::constant(440.0), 1.0, SR);
        let whole: Vec<f32> = (0..1024).map(|_| reference.next_sample(0.0)).collect();
        assert_eq!(&whole[..512], &block[..]);
        assert_eq!(&whole[512..], &next[..]);
    }

    #[test]
    fn sweep_frequency_is_linear_and_clamped_at_endpoints() {
        let p = FrequencyProgram::sweep(200.0, 2000.0, 3.0);
        for ms in [0u32, 1, 250, 1000, 1500, 2999, 3000] {
            let t = f64::from(ms) / 1000.0;
            let expected = 200.0 + 1800.0 * (t / 3.0);
            assert!((p.frequency_at(t) - expected).abs() < 1e-9, "t={t}");
        }
        assert_eq!(p.frequency_at(-1.0), 200.0);
        assert_eq!(p.frequency_at(10.0), 2000.0);
    }

    #[test]
    fn downward_sweep_is_supported() {
        let p = FrequencyProgram::sweep(2000.0, 200.0, 2.0);
        assert_eq!(p.frequency_at(0.0), 2000.0);
        assert!((p.frequency_at(1.0) - 1100.0).abs() < 1e-9);
        assert_eq!(p.frequency_at(2.0), 200.0);
    }

    #[test]
    fn degenerate_sweep_duration_jumps_to_end() {
        let p = FrequencyProgram::sweep(300.0, 900.0, 0.0);
        assert_eq!(p.progress(0.0), 1.0);
        assert_eq!(p.frequency_at(0.0), 900.0);
        let p = FrequencyProgram::sweep(300.0, 900.0, f64::NAN);
        assert_eq!(p.frequency_at(0.0), 900.0);
    }

    #[test]
    fn sweep_block_uses_block_start_frequency() {
        let mut osc = Oscillator::new(FrequencyProgram::sweep(200.0, 2000.0, 3.0), 1.0, SR);
        let mut block = [0.0f32; 256];
        let t = 1.5;
        let inc = osc.phase_increment(t);
        assert!((inc - TAU * 1100.0 / f64::from(SR)).abs() < 1e-12);
        osc.fill(&mut block, t);
        assert!((osc.phase() - wrap_phase(256.0 * inc % TAU)).abs() < 1e-9);
    }

    #[test]
    fn zero_amplitude_is_silence() {
        let mut osc = Oscillator::new(FrequencyProgram::constant(440.0), 0.0, SR);
        assert!(osc.samples(0.0).take(1000).all(|s| s == 0.0));
    }

    #[test]
    fn reset_returns_to_phase_zero() {
        let mut osc = Oscillator::new(FrequencyProgram::constant(440.0), 1.0, SR);
        let _ = render(&mut osc, 100);
        assert!(osc.phase() > 0.0);
        osc.reset();
        assert_eq!(osc.phase(), 0.0);
    }
}
