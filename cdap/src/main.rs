//! cdap - CD audio player, main entry point
//!
//! Binds a raw disc image to the stream engine, starts the audio output
//! device, and plays a block run from the command line.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cdap::audio::{AudioOutput, SinkRing};
use cdap::config::Config;
use cdap::playback::geometry::{BUFFER_FRAMES, SECTOR_SIZE};
use cdap::playback::types::{PlayRequest, PlaybackMode};
use cdap::playback::StreamEngine;
use cdap::source::FileBlockSource;

/// Command-line arguments for cdap
#[derive(Parser, Debug)]
#[command(name = "cdap")]
#[command(about = "Stream a raw CD audio image to an output device")]
#[command(version)]
struct Args {
    /// Raw disc image to play (2352-byte sectors)
    #[arg(required_unless_present = "list_devices")]
    image: Option<PathBuf>,

    /// Audio output device name (default: system default device)
    #[arg(short, long, env = "CDAP_DEVICE")]
    device: Option<String>,

    /// Logical block address to start from
    #[arg(long, default_value_t = 0)]
    lba: u32,

    /// Number of blocks to play (default: rest of the image)
    #[arg(long)]
    blocks: Option<u32>,

    /// Output volume, 0.0 (silent) to 1.0 (full)
    #[arg(long, default_value_t = 1.0)]
    volume: f32,

    /// List available audio output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Path to TOML configuration file
    #[arg(short, long, env = "CDAP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cdap={}", config.logging.level).into());
    match config.logging.file.as_ref() {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::sync::Arc::new(file))
                        .with_ansi(false),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to enumerate audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let image = args.image.context("An image path is required")?;

    info!("Starting cdap");
    info!("Image: {}", image.display());

    // Open the image and work out the run bounds
    let source = FileBlockSource::open(&image)
        .with_context(|| format!("Failed to open image {}", image.display()))?;
    let total_blocks = (source.len_bytes()? / SECTOR_SIZE as u64) as u32;
    let num_blocks = args
        .blocks
        .unwrap_or_else(|| total_blocks.saturating_sub(args.lba));
    info!(
        "Playing blocks {}..{} of {}",
        args.lba,
        args.lba.saturating_add(num_blocks),
        total_blocks
    );

    // Audio path: engine -> ring -> device callback
    let (sink, consumer) = SinkRing::new(BUFFER_FRAMES).split();

    let device = args.device.or(config.audio_device);
    let mut output = AudioOutput::new(device, config.output_buffer_size)
        .context("Failed to open audio output device")?;
    info!(
        "Audio device: {} @ {} Hz, {} channels",
        output.device_name(),
        output.sample_rate(),
        output.channels()
    );
    output.set_volume(args.volume);
    output.start(consumer).context("Failed to start audio stream")?;

    let (mut engine, handle) = StreamEngine::new(Box::new(sink));
    engine.set_idle_poll(Duration::from_millis(config.idle_poll_ms));
    let engine_task = engine.spawn();

    handle.bind(Box::new(source));
    handle.play_request(PlayRequest::FromBlock {
        lba: args.lba,
        num_blocks,
    });

    // Run until the playback stops or we are interrupted
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Interrupted, shutting down");
        }
        _ = wait_for_stop(&handle) => {
            match handle.last_stop_reason() {
                Some(reason) => info!("Playback stopped: {}", reason),
                None => info!("Playback stopped"),
            }
            // Let the sink drain what it still holds
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    handle.shutdown();
    let _ = engine_task.await;
    output.stop().context("Failed to stop audio stream")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolve when the engine has returned to `Stopped`.
async fn wait_for_stop(handle: &cdap::PlayerHandle) {
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if handle.mode() == PlaybackMode::Stopped {
            return;
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
