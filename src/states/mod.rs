//! Match setup and the match engine
//!
//! `match_config` describes what to play; `play_match` plays it.

pub mod match_config;
pub mod play_match;

pub use match_config::{MatchSetup, SideSetup};
