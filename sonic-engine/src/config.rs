//! Player configuration.

use std::time::Duration;

/// Sample rate requested from the sink unless configured otherwise.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Samples per generated block (~23 ms at 44.1 kHz).
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;
/// How long `stop` waits for the generation loop before releasing the sink anyway.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(500);
/// Shortest sweep accepted; shorter requests are stretched to this.
pub const MIN_SWEEP: Duration = Duration::from_millis(100);

/// Knobs for a [`Player`](crate::session::Player). All fixed for a session's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerConfig {
    pub sample_rate: u32,
    pub block_frames: usize,
    pub stop_grace: Duration,
    pub min_sweep: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_frames: DEFAULT_BLOCK_FRAMES,
            stop_grace: DEFAULT_STOP_GRACE,
            min_sweep: MIN_SWEEP,
        }
    }
}

impl PlayerConfig {
    #[inline] pub fn with_sample_rate(mut self, sr: u32) -> Self { self.sample_rate = sr.max(1); self }
    #[inline] pub fn with_block_frames(mut self, n: usize) -> Self { self.block_frames = n.max(1); self }
    #[inline] pub fn with_stop_grace(mut self, d: Duration) -> Self { self.stop_grace = d; self }
    #[inline] pub fn with_min_sweep(mut self, d: Duration) -> Self { self.min_sweep = d; self }

    /// Wall-clock length of one block at the configured rate.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / f64::from(self.sample_rate.max(1)))
    }
}
