//! saavy-rack - play or render one of the rack's patches
//!
//! Run with: cargo run -- pad
//!           cargo run -- particle --sample drums.wav --render out.wav --seconds 20

mod app;
mod patch;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use patch::{PatchKind, Settings};

#[derive(Debug, Parser)]
#[command(name = "saavy-rack", version, about = "Realtime modular synth engines")]
struct Cli {
    /// Which patch to run
    #[arg(value_enum, default_value_t = PatchKind::Pad)]
    patch: PatchKind,

    /// Tempo of the shared clock
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,

    /// WAV file for the particle or wavetable patch
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Render to this WAV file instead of playing live
    #[arg(long)]
    render: Option<PathBuf>,

    /// Length of an offline render
    #[arg(long, default_value_t = 10.0)]
    seconds: f32,

    /// Sample rate of an offline render
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Seed for the stochastic modules
    #[arg(long)]
    seed: Option<u64>,

    /// Start a looper build-up after this many seconds
    #[arg(long)]
    build_at: Option<f32>,

    /// End the build-up after this many seconds
    #[arg(long)]
    release_at: Option<f32>,

    /// Run the output through delay and reverb
    #[arg(long)]
    fx: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings {
        kind: cli.patch,
        sample_rate: cli.sample_rate as f32,
        bpm: cli.bpm.clamp(30.0, 300.0),
        sample: cli.sample.as_deref(),
        seed: cli.seed,
        build_at: cli.build_at,
        release_at: cli.release_at,
        fx: cli.fx,
    };

    match cli.render.as_deref() {
        Some(path) => app::render(&settings, cli.seconds, path),
        None => app::play(&mut settings),
    }
}
