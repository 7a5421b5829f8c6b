//! sonic: play a test tone or a frequency sweep on an audio device.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use sonic_engine::device::{list_output_devices, CpalOutput, DEFAULT_QUEUE_BLOCKS};
use sonic_engine::{Player, PlayerConfig, SweepRequest, ToneRequest, ToneSpec};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Output device name (see `sonic devices`); default device if omitted.
    #[arg(long, global = true)]
    device: Option<String>,

    /// Requested sample rate; the device may grant a different one.
    #[arg(long, global = true, default_value_t = sonic_engine::config::DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Samples per generated block.
    #[arg(long, global = true, default_value_t = sonic_engine::config::DEFAULT_BLOCK_FRAMES)]
    block_frames: usize,

    /// Blocks queued between generator and device.
    #[arg(long, global = true, default_value_t = DEFAULT_QUEUE_BLOCKS)]
    queue_blocks: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// List output devices.
    Devices,

    /// Constant sine tone.
    Tone {
        #[arg(long, default_value_t = 440.0)]
        frequency: f64,
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
        /// Stop after this many milliseconds; plays until killed if omitted.
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Linear sweep between two frequencies.
    Sweep {
        #[arg(long, default_value_t = 200.0)]
        start_frequency: f64,
        #[arg(long, default_value_t = 2000.0)]
        end_frequency: f64,
        /// Sweep length in milliseconds (at least 100).
        #[arg(long, default_value_t = 3000)]
        duration: u64,
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let spec: ToneSpec = match cli.command {
        Commands::Devices => {
            println!("Available output devices:");
            for name in list_output_devices()? {
                println!("- {name}");
            }
            return Ok(());
        }
        Commands::Tone { frequency, volume, duration } => {
            ToneRequest { frequency, volume, duration_ms: duration }.into()
        }
        Commands::Sweep { start_frequency, end_frequency, duration, volume } => {
            SweepRequest { start_frequency, end_frequency, duration_ms: duration, volume }.into()
        }
    };

    let output = CpalOutput::new(cli.output.device).with_queue_blocks(cli.output.queue_blocks);
    let config = PlayerConfig::default()
        .with_sample_rate(cli.output.sample_rate)
        .with_block_frames(cli.output.block_frames);
    let player = Player::new(Arc::new(output), config);

    let spec = player.prepare(spec);
    player.start(spec).context("could not start playback")?;
    match spec.duration {
        Some(d) => {
            info!("playing for {d:?}");
            // one grace period on top for the last blocks and teardown
            if !player.wait_until_idle(d + player.config().stop_grace) {
                player.stop();
            }
        }
        None => {
            info!("playing until interrupted (Ctrl+C)");
            while !player.wait_until_idle(Duration::from_secs(1)) {}
            bail!("playback ended unexpectedly; see the log for the cause");
        }
    }
    Ok(())
}
