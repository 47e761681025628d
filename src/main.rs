//! Pixel Arena - two-hero arena combat
//!
//! Runs a headless configuration, or a quick AI-vs-AI duel between two classes.

use pixel_arena::cli::parse_args;
use pixel_arena::headless::{run_headless_match, HeadlessMatchConfig};

fn main() {
    let args = parse_args();

    let loaded = match &args.headless {
        Some(path) => HeadlessMatchConfig::load_from_file(path),
        None => HeadlessMatchConfig::from_json(&format!(
            r#"{{"left": "{}", "right": "{}"}}"#,
            args.left, args.right
        )),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(2);
        }
    };

    // Command-line flags override the file
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }
    if let Some(secs) = args.max_duration {
        config.max_duration_secs = secs;
    }
    if let Some(speed) = args.speed {
        config.ticks_per_frame = speed;
    }
    if let Some(output) = &args.output {
        config.output_path = Some(output.display().to_string());
    }
    if let Err(err) = config.validate() {
        eprintln!("Invalid configuration: {}", err);
        std::process::exit(2);
    }

    if let Err(err) = run_headless_match(config) {
        eprintln!("Headless run failed: {}", err);
        std::process::exit(1);
    }
}
