//! Playback session: one live generation at a time.
//!
//! A [`Player`] owns a single slot. `start` always tears down whatever is in
//! the slot first (sink released, loop acknowledged) before it opens the next
//! sink, so two sessions never overlap. The generation loop runs on its own
//! thread, pulls blocks from the oscillator and pushes them into the sink;
//! the sink's blocking `write` is the only pacing.
//!
//! State machine: `Idle -> Running` on `start`; `Running -> Idle` on `stop`,
//! on duration expiry (the loop stops its own session) or on a loop fault.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use sonic_core::oscillator::{FrequencyProgram, Oscillator};

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, SinkError};
use crate::sink::{AudioOutput, OpenSink, SinkRelease, SinkWriter};

/// What to play.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToneSpec {
    pub program: FrequencyProgram,
    /// Linear gain, clamped to `[0, 1]` by the oscillator.
    pub amplitude: f64,
    /// Stop by itself after this long. `None` plays until `stop`.
    pub duration: Option<Duration>,
}

impl ToneSpec {
    /// Constant tone.
    pub fn tone(hz: f64, amplitude: f64, duration: Option<Duration>) -> Self {
        Self { program: FrequencyProgram::constant(hz), amplitude, duration }
    }

    /// Linear sweep that stops itself once it reaches `end_hz`.
    pub fn sweep(start_hz: f64, end_hz: f64, duration: Duration, amplitude: f64) -> Self {
        Self {
            program: FrequencyProgram::sweep(start_hz, end_hz, duration.as_secs_f64()),
            amplitude,
            duration: Some(duration),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

/// Owner of the single playback slot.
pub struct Player {
    output: Arc<dyn AudioOutput>,
    config: PlayerConfig,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

struct Shared {
    slot: Mutex<Option<ActiveSession>>,
    idle: Condvar,
    /// Mirrors "the slot holds a session"; only written under the slot lock.
    /// Stays set across a restart.
    playing: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        // a panicking holder must not wedge teardown
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ActiveSession {
    id: u64,
    running: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    exited: Receiver<()>,
    release: Box<dyn SinkRelease>,
    started: Instant,
    duration: Option<Duration>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Player {
    pub fn new(output: Arc<dyn AudioOutput>, config: PlayerConfig) -> Self {
        Self {
            output,
            config,
            shared: Arc::new(Shared {
                slot: Mutex::new(None),
                idle: Condvar::new(),
                playing: AtomicBool::new(false),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Never blocks, even while `start`/`stop` wait out the grace period.
    pub fn state(&self) -> SessionState {
        if self.shared.playing.load(Ordering::Acquire) {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Time since the current session started, if one is running.
    pub fn elapsed(&self) -> Option<Duration> {
        self.shared.lock().as_ref().map(|s| s.started.elapsed())
    }

    /// Block until the player is idle or `timeout` passes. Returns whether it is idle.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let guard = self.shared.lock();
        let (guard, _) = self
            .shared
            .idle
            .wait_timeout_while(guard, timeout, |slot| slot.is_some())
            .unwrap_or_else(PoisonError::into_inner);
        guard.is_none()
    }

    /// Apply session-level preconditions: sweeps shorter than the configured
    /// minimum are stretched to it, and a sweep session always lasts exactly
    /// as long as its sweep (any separate `duration` is replaced).
    pub fn prepare(&self, mut spec: ToneSpec) -> ToneSpec {
        if let FrequencyProgram::Sweep { start_hz, end_hz, duration_secs } = spec.program {
            let d = Duration::try_from_secs_f64(duration_secs)
                .unwrap_or(Duration::ZERO)
                .max(self.config.min_sweep);
            spec.program = FrequencyProgram::sweep(start_hz, end_hz, d.as_secs_f64());
            spec.duration = Some(d);
        }
        spec
    }

    /// Stop whatever is playing, then start `spec`.
    ///
    /// An error means nothing is playing afterwards; the previous session is
    /// gone either way.
    pub fn start(&self, spec: ToneSpec) -> Result<(), PlaybackError> {
        let spec = self.prepare(spec);
        let mut slot = self.shared.lock();
        let previous = teardown(&mut slot, self.config.stop_grace, "restart");

        let result = self.launch(&mut slot, spec);
        self.shared.playing.store(result.is_ok(), Ordering::Release);
        if result.is_err() {
            self.shared.idle.notify_all();
        }
        drop(slot);

        if let Some(handle) = previous {
            join_worker(handle);
        }
        result
    }

    /// Stop the current session. A no-op when idle; never fails.
    pub fn stop(&self) {
        let mut slot = self.shared.lock();
        let handle = teardown(&mut slot, self.config.stop_grace, "stop");
        self.shared.playing.store(false, Ordering::Release);
        self.shared.idle.notify_all();
        drop(slot);

        if let Some(handle) = handle {
            join_worker(handle);
        }
    }

    fn launch(
        &self,
        slot: &mut Option<ActiveSession>,
        spec: ToneSpec,
    ) -> Result<(), PlaybackError> {
        let OpenSink { writer, mut release, sample_rate } =
            self.output.open(self.config.sample_rate, 1).map_err(|e| {
                error!("sink unavailable: {e}");
                PlaybackError::SinkUnavailable(e)
            })?;
        if sample_rate != self.config.sample_rate {
            warn!("sink runs at {sample_rate} Hz (requested {})", self.config.sample_rate);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let running = Arc::new(AtomicBool::new(true));
        let (exit_tx, exited) = bounded(1);
        let started = Instant::now();

        let generation = Generation {
            id,
            osc: Oscillator::new(spec.program, spec.amplitude, sample_rate),
            writer,
            running: Arc::clone(&running),
            started,
            duration: spec.duration,
            block_frames: self.config.block_frames,
            shared: Arc::downgrade(&self.shared),
        };

        let worker = thread::Builder::new()
            .name(format!("sonic-gen-{id}"))
            .spawn(move || generation.run(ExitAck(exit_tx)))
            .map_err(|e| {
                error!("could not spawn generation thread: {e}");
                release.close();
                PlaybackError::LoopFault(e.to_string())
            })?;

        info!(
            "session {id} started: {:?} amp={:.3} sr={sample_rate} duration={:?}",
            spec.program, spec.amplitude, spec.duration
        );
        *slot = Some(ActiveSession {
            id,
            running,
            worker,
            exited,
            release,
            started,
            duration: spec.duration,
        });
        Ok(())
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Empty the slot: signal the loop, wait up to `grace` for it to acknowledge,
/// release the sink. Returns the worker handle when the loop did acknowledge,
/// so the caller can join it after dropping the lock.
fn teardown(
    slot: &mut Option<ActiveSession>,
    grace: Duration,
    why: &str,
) -> Option<JoinHandle<()>> {
    let mut session = slot.take()?;
    session.running.store(false, Ordering::Release);

    let acked = match session.exited.recv_timeout(grace) {
        Ok(()) => true,
        // the ack sender is dropped once the loop is gone, so this counts too
        Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    };
    session.release.close();

    let ran = session.started.elapsed();
    if acked {
        info!("session {} stopped ({why}) after {ran:?}", session.id);
        Some(session.worker)
    } else {
        warn!(
            "session {} did not exit within {grace:?}; sink released anyway, worker detached",
            session.id
        );
        if let Some(d) = session.duration {
            debug!("session {} had duration {d:?}", session.id);
        }
        None
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        // panics inside the loop are caught; this only covers the reaper
        error!("generation thread panicked during exit");
    }
}

// ------------------------------- Generation loop ----------------------------------

/// Dropping this tells `stop` the loop is out, including during unwinding.
struct ExitAck(Sender<()>);

impl Drop for ExitAck {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

#[derive(Debug)]
enum Exit {
    /// `running` was cleared from outside.
    Cancelled,
    /// The configured duration elapsed.
    Expired,
    Fault(PlaybackError),
}

struct Generation {
    id: u64,
    osc: Oscillator,
    writer: Box<dyn SinkWriter>,
    running: Arc<AtomicBool>,
    started: Instant,
    duration: Option<Duration>,
    block_frames: usize,
    shared: Weak<Shared>,
}

impl Generation {
    fn run(mut self, ack: ExitAck) {
        let exit = match panic::catch_unwind(AssertUnwindSafe(|| self.pump())) {
            Ok(exit) => exit,
            Err(payload) => Exit::Fault(PlaybackError::LoopFault(panic_message(&*payload))),
        };
        drop(self.writer);
        drop(ack);

        debug!("session {} loop exited: {exit:?}", self.id);
        match exit {
            Exit::Cancelled => {}
            Exit::Expired => reap(&self.shared, self.id, "duration elapsed"),
            Exit::Fault(e) => {
                error!("session {}: {e}", self.id);
                reap(&self.shared, self.id, "fault");
            }
        }
    }

    fn pump(&mut self) -> Exit {
        let mut block = vec![0.0f32; self.block_frames];
        loop {
            let elapsed = self.started.elapsed();
            if self.duration.is_some_and(|d| elapsed >= d) {
                return Exit::Expired;
            }
            self.osc.fill(&mut block, elapsed.as_secs_f64());

            if !self.running.load(Ordering::Acquire) {
                return Exit::Cancelled;
            }
            match self.writer.write(&block) {
                Ok(()) => {}
                Err(SinkError::Closed) if !self.running.load(Ordering::Acquire) => {
                    return Exit::Cancelled;
                }
                Err(e) => return Exit::Fault(PlaybackError::LoopFault(e.to_string())),
            }
        }
    }
}

/// Self-stop: clear the slot if it still holds session `id`.
fn reap(shared: &Weak<Shared>, id: u64, why: &str) {
    let Some(shared) = shared.upgrade() else { return };
    let mut slot = shared.lock();
    if slot.as_ref().is_some_and(|s| s.id == id) {
        if let Some(mut session) = slot.take() {
            session.release.close();
            info!("session {id} stopped ({why}) after {:?}", session.started.elapsed());
            // this thread is the worker; dropping its own handle detaches it
            drop(session.worker);
        }
        shared.playing.store(false, Ordering::Release);
        shared.idle.notify_all();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in generation loop".to_string()
    }
}

// ------------------------------------ Tests --------------------------------------
