//! Sink contract: where generated blocks go.
//!
//! A sink is opened once per session at a fixed sample rate, mono. Opening
//! yields two halves:
//! - [`SinkWriter`] moves into the generation loop. `write` blocks until the
//!   device has room, which is what paces generation.
//! - [`SinkRelease`] stays with the session. `close` is idempotent, and any
//!   write in flight or issued afterwards fails with [`SinkError::Closed`]
//!   instead of touching released resources.
//!
//! [`block_queue`] is the bounded hand-off used by the cpal adapter: a
//! blocking writer on the producer side and a non-blocking reader for the
//! audio callback, with buffers recycled so the steady state does not allocate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};

use crate::error::SinkError;

/// Producer half of an open sink.
pub trait SinkWriter: Send {
    /// Submit one complete block of normalized samples. Blocks until accepted.
    fn write(&mut self, block: &[f32]) -> Result<(), SinkError>;
}

/// Control half of an open sink.
pub trait SinkRelease: Send {
    /// Release the underlying resource. Calling it again is a no-op.
    fn close(&mut self);
}

/// An opened sink plus the sample rate it actually runs at.
pub struct OpenSink {
    pub writer: Box<dyn SinkWriter>,
    pub release: Box<dyn SinkRelease>,
    pub sample_rate: u32,
}

impl std::fmt::Debug for OpenSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSink")
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

/// Something that can hand out sinks (an audio device, a test double).
pub trait AudioOutput: Send + Sync {
    /// Open a sink. `sample_rate` is a request; the granted rate is in the result.
    fn open(&self, sample_rate: u32, channels: u16) -> Result<OpenSink, SinkError>;
}

// ------------------------------- Bounded block queue -------------------------------

/// Blocking producer side of [`block_queue`].
#[derive(Debug)]
pub struct BlockWriter {
    filled_tx: Sender<Vec<f32>>,
    free_rx: Receiver<Vec<f32>>,
    failed: Arc<AtomicBool>,
}

/// Non-blocking consumer side of [`block_queue`], meant for the audio callback.
#[derive(Debug)]
pub struct BlockReader {
    filled_rx: Receiver<Vec<f32>>,
    free_tx: Sender<Vec<f32>>,
    current: Vec<f32>,
    pos: usize,
    failed: Arc<AtomicBool>,
}

/// Bounded queue holding at most `depth` blocks in flight (min 1).
///
/// Dropping the reader closes the queue: a writer blocked in `write` wakes up
/// with [`SinkError::Closed`], and so does every later write.
pub fn block_queue(depth: usize) -> (BlockWriter, BlockReader) {
    let depth = depth.max(1);
    let (filled_tx, filled_rx) = bounded(depth);
    // reader holds one block, the queue holds `depth`, the writer may hold one
    let (free_tx, free_rx) = bounded(depth + 2);
    let failed = Arc::new(AtomicBool::new(false));
    (
        BlockWriter { filled_tx, free_rx, failed: Arc::clone(&failed) },
        BlockReader { filled_rx, free_tx, current: Vec::new(), pos: 0, failed },
    )
}

impl SinkWriter for BlockWriter {
    fn write(&mut self, block: &[f32]) -> Result<(), SinkError> {
        if self.failed.load(Ordering::Acquire) {
            return Err(SinkError::Device("output stream reported an error".into()));
        }
        let mut buf = self.free_rx.try_recv().unwrap_or_default();
        buf.clear();
        buf.extend_from_slice(block);
        self.filled_tx.send(buf).map_err(|_| SinkError::Closed)
    }
}

impl BlockReader {
    /// Copy queued samples into `out`; whatever the queue cannot cover is
    /// filled with silence. Returns how many samples came from the queue.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let mut filled = 0;
        while filled < out.len() {
            if self.pos == self.current.len() && !self.advance() {
                break;
            }
            let n = (out.len() - filled).min(self.current.len() - self.pos);
            out[filled..filled + n].copy_from_slice(&self.current[self.pos..self.pos + n]);
            filled += n;
            self.pos += n;
        }
        out[filled..].fill(0.0);
        filled
    }

    /// Mark the device as failed; the writer's next `write` reports it.
    pub fn fail(&self) {
        self.failed.store(true, Ordering::Release);
    }

    /// A handle the device error callback can use to call [`BlockReader::fail`]
    /// without owning the reader.
    pub fn fail_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    fn advance(&mut self) -> bool {
        match self.filled_rx.try_recv() {
            Ok(next) => {
                let done = std::mem::replace(&mut self.current, next);
                self.pos = 0;
                if done.capacity() > 0 {
                    // full or writer gone: just drop it
                    let _ = self.free_tx.try_send(done);
                }
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }
}

// ------------------------------------ Tests --------------------------------------


// ------------------------------- Test double -------------------------------------
