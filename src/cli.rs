//! Command-line interface for Pixel Arena
//!
//! Runs a quick AI-vs-AI duel by default, or a full headless configuration.

use clap::Parser;
use std::path::PathBuf;

/// Two-hero arena combat simulator
#[derive(Parser, Debug)]
#[command(name = "pixel-arena")]
#[command(about = "Two-hero arena combat simulator")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Left hero class for a quick duel (ignored with --headless)
    #[arg(long, default_value = "Wizard")]
    pub left: String,

    /// Right hero class for a quick duel (ignored with --headless)
    #[arg(long, default_value = "Barbarian")]
    pub right: String,

    /// Output path for the match report
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Random seed, overriding the config file
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum match duration in seconds, overriding the config file
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Simulation ticks per frame, overriding the config file
    #[arg(long)]
    pub speed: Option<f32>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
