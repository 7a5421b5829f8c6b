#![cfg_attr(not(feature = "std"), no_std)]
//! Sonic Core: phase-continuous sine/sweep oscillator, no_std-ready.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` for `sin`
//! - `fast-math`: polynomial sine instead of the backend's exact one
//!
//! Modules
//! - [`dsp`]        : math backend, audible-range clamps, phase wrap
//! - [`oscillator`] : `Oscillator` + `FrequencyProgram` (constant tone / linear sweep)
//!
//! Design
//! - No heap allocations; the oscillator is a small `Copy` value
//! - Inputs are clamped at construction, never per sample
//! - The oscillator has no notion of playback or stopping; its caller drives it

pub mod dsp;
pub mod oscillator;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        clamp_amplitude, clamp_frequency, wrap_phase, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, TAU,
    };
    pub use crate::oscillator::{FrequencyProgram, Oscillator, Samples};
}
