//! Host-facing command surface.
//!
//! Mirrors the plugin method set: `generateTone`, `generateSweep`, `stopTone`
//! and `getPlatformVersion`. Every generate/stop command answers `true`:
//! failures are logged and resolve to "nothing is playing", they are not
//! reported back to the host a second time.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::config::PlayerConfig;
use crate::session::{Player, SessionState, ToneSpec};
use crate::sink::AudioOutput;

/// Arguments of `generateTone`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToneRequest {
    pub frequency: f64,
    pub volume: f64,
    pub duration_ms: Option<u64>,
}

impl Default for ToneRequest {
    fn default() -> Self {
        Self { frequency: 440.0, volume: 1.0, duration_ms: None }
    }
}

/// Arguments of `generateSweep`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepRequest {
    pub start_frequency: f64,
    pub end_frequency: f64,
    pub duration_ms: u64,
    pub volume: f64,
}

impl Default for SweepRequest {
    fn default() -> Self {
        Self { start_frequency: 200.0, end_frequency: 2000.0, duration_ms: 3000, volume: 1.0 }
    }
}

impl From<ToneRequest> for ToneSpec {
    fn from(r: ToneRequest) -> Self {
        ToneSpec::tone(r.frequency, r.volume, r.duration_ms.map(Duration::from_millis))
    }
}

impl From<SweepRequest> for ToneSpec {
    fn from(r: SweepRequest) -> Self {
        ToneSpec::sweep(
            r.start_frequency,
            r.end_frequency,
            Duration::from_millis(r.duration_ms),
            r.volume,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    GenerateTone(ToneRequest),
    GenerateSweep(SweepRequest),
    StopTone,
}

/// Dispatches host commands onto a [`Player`].
#[derive(Debug)]
pub struct Controller {
    player: Player,
}

impl Controller {
    pub fn new(output: Arc<dyn AudioOutput>, config: PlayerConfig) -> Self {
        Self { player: Player::new(output, config) }
    }

    /// Controller on the default cpal output device.
    #[cfg(feature = "realtime")]
    pub fn with_default_output(config: PlayerConfig) -> Self {
        Self::new(Arc::new(crate::device::CpalOutput::default()), config)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn handle(&self, command: Command) -> bool {
        debug!("command: {command:?}");
        match command {
            Command::GenerateTone(r) => self.generate_tone(r),
            Command::GenerateSweep(r) => self.generate_sweep(r),
            Command::StopTone => self.stop_tone(),
        }
    }

    pub fn generate_tone(&self, request: ToneRequest) -> bool {
        self.start(request.into(), "generateTone")
    }

    pub fn generate_sweep(&self, request: SweepRequest) -> bool {
        self.start(request.into(), "generateSweep")
    }

    pub fn stop_tone(&self) -> bool {
        self.player.stop();
        true
    }

    pub fn state(&self) -> SessionState {
        self.player.state()
    }

    /// `"<os> <arch>"` of the running host.
    pub fn platform_version() -> String {
        format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Host teardown (plugin detached): stop and go idle.
    pub fn detach(&self) {
        self.player.stop();
    }

    fn start(&self, spec: ToneSpec, what: &str) -> bool {
        if let Err(e) = self.player.start(spec) {
            warn!("{what} failed, staying silent: {e}");
        }
        true
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::{Event, ScriptedOutput};
    use sonic_core::oscillator::FrequencyProgram;
    use std::thread;

    fn controller(out: &ScriptedOutput) -> Controller {
        let _ = env_logger::builder().is_test(true).try_init();
        Controller::new(Arc::new(out.clone()), PlayerConfig::default().with_block_frames(441))
    }

    #[test]
    fn defaults_match_the_method_table() {
        let t = ToneRequest::default();
        assert_eq!((t.frequency, t.volume, t.duration_ms), (440.0, 1.0, None));
        let s = SweepRequest::default();
        assert_eq!(
            (s.start_frequency, s.end_frequency, s.duration_ms, s.volume),
            (200.0, 2000.0, 3000, 1.0)
        );
    }

    #[test]
    fn out_of_range_tone_is_clamped_not_rejected() {
        let high: ToneSpec = ToneRequest { frequency: 50_000.0, ..Default::default() }.into();
        let top: ToneSpec = ToneRequest { frequency: 22_000.0, ..Default::default() }.into();
        assert_eq!(high, top);

        let low: ToneSpec = ToneRequest { frequency: 1.0, ..Default::default() }.into();
        let bottom: ToneSpec = ToneRequest { frequency: 20.0, ..Default::default() }.into();
        assert_eq!(low, bottom);
    }

    #[test]
    fn sweep_request_maps_to_a_self_stopping_sweep() {
        let spec: ToneSpec = SweepRequest::default().into();
        assert_eq!(spec.duration, Some(Duration::from_millis(3000)));
        assert_eq!(spec.program, FrequencyProgram::sweep(200.0, 2000.0, 3.0));
    }

    #[test]
    fn stop_answers_true_even_when_idle() {
        let out = ScriptedOutput::new();
        let c = controller(&out);
        assert!(c.handle(Command::StopTone));
        assert!(c.handle(Command::StopTone));
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn generate_reports_success_even_when_the_sink_is_missing() {
        let out = ScriptedOutput::new();
        out.fail_open(true);
        let c = controller(&out);
        assert!(c.generate_tone(ToneRequest::default()));
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn tone_while_sweeping_replaces_the_sweep() {
        let out = ScriptedOutput::new();
        let c = controller(&out);
        assert!(c.handle(Command::GenerateSweep(SweepRequest::default())));
        assert!(out.wait_for(Duration::from_secs(2), |o| !o.blocks_for(1).is_empty()));

        assert!(c.handle(Command::GenerateTone(ToneRequest::default())));
        assert!(out.closed(1));
        assert_eq!(out.max_live_sinks(), 1);
        assert_eq!(c.state(), SessionState::Running);

        c.detach();
        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(out.live_sinks(), 0);
    }

    #[test]
    fn tone_with_duration_goes_idle_on_its_own() {
        let out = ScriptedOutput::new();
        let c = controller(&out);
        assert!(c.generate_tone(ToneRequest { duration_ms: Some(500), ..Default::default() }));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(c.state(), SessionState::Running);
        assert!(c.player().wait_until_idle(Duration::from_secs(2)));
        assert!(out.events().contains(&Event::Closed { sink: 1 }));
    }

    #[test]
    fn platform_version_names_the_os() {
        assert!(Controller::platform_version().starts_with(std::env::consts::OS));
    }
}
