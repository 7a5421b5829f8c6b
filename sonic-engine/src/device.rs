//! cpal-backed [`AudioOutput`]: the real speaker.
//!
//! The generator side writes mono `f32` blocks into a bounded [`block_queue`];
//! the device callback drains it, converts to the device sample format and
//! copies the mono sample into every channel. `cpal::Stream` is not `Send`, so
//! each open sink gets a small device thread that builds the stream, plays it
//! and drops it when the sink is released.

use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::{bounded, Sender};
use log::{debug, error, info};

use crate::error::SinkError;
use crate::sink::{block_queue, AudioOutput, BlockReader, OpenSink, SinkRelease};

/// Blocks queued between generator and device by default.
pub const DEFAULT_QUEUE_BLOCKS: usize = 2;

/// Output on the default (or a named) cpal device.
#[derive(Clone, Debug)]
pub struct CpalOutput {
    device_name: Option<String>,
    queue_blocks: usize,
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self { device_name: None, queue_blocks: DEFAULT_QUEUE_BLOCKS }
    }
}

impl CpalOutput {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name, ..Self::default() }
    }

    /// How many blocks may sit between generator and device (min 1).
    pub fn with_queue_blocks(mut self, n: usize) -> Self {
        self.queue_blocks = n.max(1);
        self
    }
}

impl AudioOutput for CpalOutput {
    fn open(&self, sample_rate: u32, channels: u16) -> Result<OpenSink, SinkError> {
        let (writer, reader) = block_queue(self.queue_blocks);
        let (ready_tx, ready_rx) = bounded::<Result<u32, SinkError>>(1);
        let (close_tx, close_rx) = bounded::<()>(1);
        let name = self.device_name.clone();

        let thread = thread::Builder::new()
            .name("sonic-device".into())
            .spawn(move || {
                let stream = match start_stream(name.as_deref(), sample_rate, channels, reader) {
                    Ok((stream, granted)) => {
                        let _ = ready_tx.send(Ok(granted));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // park until released (message or sender dropped)
                let _ = close_rx.recv();
                if let Err(e) = stream.pause() {
                    debug!("pause on release failed: {e}");
                }
                drop(stream);
            })
            .map_err(|e| SinkError::Unavailable(format!("device thread: {e}")))?;

        let granted = match ready_rx.recv() {
            Ok(res) => res,
            Err(_) => Err(SinkError::Unavailable("device thread exited".into())),
        };
        let granted = match granted {
            Ok(sr) => sr,
            Err(e) => {
                let _ = thread.join();
                return Err(e);
            }
        };

        Ok(OpenSink {
            writer: Box::new(writer),
            release: Box::new(DeviceRelease { close_tx: Some(close_tx), thread: Some(thread) }),
            sample_rate: granted,
        })
    }
}

/// Stops the stream and joins its device thread. Dropping the stream drops
/// the queue reader, which turns any pending or later write into `Closed`.
struct DeviceRelease {
    close_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SinkRelease for DeviceRelease {
    fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                error!("audio device thread panicked");
            }
        }
    }
}

impl Drop for DeviceRelease {
    fn drop(&mut self) {
        self.close();
    }
}

// ------------------------------- Device selection --------------------------------

/// Names of all output devices on the default host.
pub fn list_output_devices() -> Result<Vec<String>, SinkError> {
    let host = cpal::default_host();
    let devices = host.output_devices().map_err(|e| SinkError::Unavailable(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device, SinkError> {
    let host = cpal::default_host();
    if let Some(name) = name {
        let devices = host.output_devices().map_err(|e| SinkError::Unavailable(e.to_string()))?;
        for d in devices {
            if d.name().is_ok_and(|n| n == name) {
                return Ok(d);
            }
        }
        return Err(SinkError::Unavailable(format!("requested device not found: {name}")));
    }
    host.default_output_device()
        .ok_or_else(|| SinkError::Unavailable("no default output device".into()))
}

/// Supported config closest to the requested rate and channel count; the
/// device default when it exposes no ranges at all.
fn choose_config(
    device: &cpal::Device,
    req_sr: u32,
    req_ch: u16,
) -> Result<cpal::SupportedStreamConfig, SinkError> {
    let ranges = device
        .supported_output_configs()
        .map_err(|e| SinkError::Unavailable(e.to_string()))?;

    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in ranges {
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;
        let ch_pen = u64::from(range.channels().abs_diff(req_ch));
        let sr_pen = if (sr_min..=sr_max).contains(&req_sr) {
            0
        } else {
            u64::from(sr_min.abs_diff(req_sr).min(sr_max.abs_diff(req_sr)))
        };
        // a rate mismatch is worse than extra channels (we duplicate mono anyway)
        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    match best {
        Some((_, range)) => {
            let sr = req_sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            Ok(range.with_sample_rate(cpal::SampleRate(sr)))
        }
        None => device
            .default_output_config()
            .map_err(|e| SinkError::Unavailable(e.to_string())),
    }
}

fn start_stream(
    name: Option<&str>,
    sample_rate: u32,
    channels: u16,
    reader: BlockReader,
) -> Result<(cpal::Stream, u32), SinkError> {
    let device = pick_device(name)?;
    let sup = choose_config(&device, sample_rate, channels)?;
    let format = sup.sample_format();
    let cfg: cpal::StreamConfig = sup.config();

    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, reader)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, reader)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, reader)?,
        other => {
            return Err(SinkError::Unavailable(format!("unsupported device sample format: {other:?}")))
        }
    };
    stream.play().map_err(|e| SinkError::Unavailable(e.to_string()))?;

    info!(
        "output open on {:?}: {} Hz, {} ch, {:?}",
        device.name().unwrap_or_default(),
        cfg.sample_rate.0,
        cfg.channels,
        format
    );
    Ok((stream, cfg.sample_rate.0))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut reader: BlockReader,
) -> Result<cpal::Stream, SinkError>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels.max(1));
    let failed = reader.fail_flag();
    // sized for typical callback lengths; grows once if a host asks for more
    let mut mono = vec![0.0f32; 4096];

    let err_fn = move |e: cpal::StreamError| {
        error!("[cpal] stream error: {e}");
        failed.store(true, std::sync::atomic::Ordering::Release);
    };

    device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _| {
                let frames = output.len() / channels;
                if mono.len() < frames {
                    mono.resize(frames, 0.0);
                }
                reader.read(&mut mono[..frames]);
                for (frame, &s) in output.chunks_mut(channels).zip(mono.iter()) {
                    let v: T = T::from_sample(s.clamp(-1.0, 1.0));
                    for ch in frame.iter_mut() {
                        *ch = v;
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| SinkError::Unavailable(e.to_string()))
}
