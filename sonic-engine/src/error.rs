//! Error kinds for the sink and the playback session.
//!
//! Out-of-range configuration is never an error: frequencies, gain and sweep
//! length are clamped before anything is generated. What remains are resource
//! and runtime failures, and every one of them resolves to "nothing is
//! playing".

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The output device or resource could not be acquired.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    /// The sink was released; the write was dropped.
    #[error("sink closed")]
    Closed,
    /// The device failed after it was opened.
    #[error("audio device error: {0}")]
    Device(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("could not open sink")]
    SinkUnavailable(#[source] SinkError),
    #[error("generation loop fault: {0}")]
    LoopFault(String),
}
