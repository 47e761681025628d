//! Headless match runner
//!
//! Plays duels, ladder runs and dungeon runs with no window, for balance
//! sweeps and integration tests. Results come back as a `HeadlessReport`
//! and can be written to JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --headless match_config.json --seed 42
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "left": "Wizard",
//!   "right": "Barbarian",
//!   "left_followers": ["Fire Imp"],
//!   "max_duration_secs": 120,
//!   "random_seed": 42
//! }
//! ```
//!
//! Ladder and dungeon runs set `"mode"` and `"rounds"`; dungeon encounters
//! may list their monsters in `"right"` and `"waves"`.

pub mod config;
pub mod runner;

pub use config::HeadlessMatchConfig;
pub use runner::{run_headless, run_headless_match, HeadlessReport, MatchReport};
