//! polyrhythm - terminal polyrhythm player and kaleidoscope
//!
//! Run with: cargo run -- --bpm 60

mod app;
mod audio;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};

use app::{App, Settings};

#[derive(Parser, Debug)]
#[command(name = "polyrhythm", version, about = "Play random polyrhythms and watch them turn")]
struct Args {
    /// Tempo in beats per minute
    #[arg(long, default_value_t = 45.0)]
    bpm: f64,

    /// Seed for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,

    /// Fewest rhythms per session
    #[arg(long, default_value_t = 2)]
    min_rhythms: usize,

    /// How far the clock runs ahead of the speakers, in milliseconds
    #[arg(long, default_value_t = 30)]
    latency_ms: u64,

    /// Run silent on the system clock
    #[arg(long)]
    no_audio: bool,

    /// Write debug logs to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Some(path) = &args.log {
        init_logging(path)?;
    }

    App::new(Settings {
        bpm: args.bpm,
        seed: args.seed,
        min_rhythms: args.min_rhythms,
        latency: Duration::from_millis(args.latency_ms),
        audio: !args.no_audio,
    })
    .run()
}

/// Logs go to a file; the terminal belongs to the UI
fn init_logging(path: &Path) -> EyreResult<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();
    Ok(())
}
