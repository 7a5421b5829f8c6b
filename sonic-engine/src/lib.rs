//! Sonic Engine: playback session, sink contract and host command surface.
//!
//! Crate layout:
//! - [`session`]  : `Player`, the single playback slot and its generation loop
//! - [`sink`]     : `AudioOutput` / `SinkWriter` / `SinkRelease` and the bounded block queue
//! - [`device`]   : cpal-backed output (feature `realtime`)
//! - [`commands`] : `Controller`, the generate tone / sweep / stop method set
//! - [`config`]   : `PlayerConfig`
//! - [`error`]    : `SinkError`, `PlaybackError`
//!
//! Exactly one session plays at a time. Starting always stops first, and
//! every failure ends in silence rather than in an error the host must handle.

pub mod commands;
pub mod config;
#[cfg(feature = "realtime")]
pub mod device;
pub mod error;
pub mod session;
pub mod sink;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use commands::{Command, Controller, SweepRequest, ToneRequest};
pub use config::PlayerConfig;
pub use error::{PlaybackError, SinkError};
pub use session::{Player, SessionState, ToneSpec};
pub use sink::{AudioOutput, OpenSink, SinkRelease, SinkWriter};
pub use sonic_core::oscillator::{FrequencyProgram, Oscillator};
