//! Pixel Arena - Two-Hero Arena Combat Engine
//!
//! A real-time, tick-based duel engine: two heroes with class kits, status
//! effects, projectiles and followers fight until one falls. Arena duels,
//! ladder runs and dungeon waves share the same match controller.
//!
//! This library exposes the engine, its Bevy shell and the headless runner
//! for testing and reuse.

pub mod cli;
pub mod combat;
pub mod error;
pub mod headless;
pub mod states;

// Re-export commonly used types
pub use combat::log::{CombatLog, CombatLogEntry, CombatLogEventType};
pub use error::{ActionRejection, CombatError, ConfigError};
pub use headless::HeadlessMatchConfig;
pub use states::match_config::{
    Controller, CustomBuild, GameMode, HeroClass, HeroSpec, MatchSetup, Side, SideSetup, StatBuff,
};
pub use states::play_match::abilities::{AbilityKey, ActionIntent};
pub use states::play_match::ability_config::ClassCatalog;
pub use states::play_match::match_flow::{EndReason, Match, MatchPhase, Outcome};
pub use states::play_match::results::{HeroSnapshot, MatchResult};
