//! Play Match - 2D Duel Arena
//!
//! This module handles the match simulation where two heroes battle each other
//! on a horizontal arena strip.
//!
//! ## Combat System
//! - **Abilities**: Catalog-driven kits, validated before any state changes
//! - **Status Effects**: One instance per kind, folded into derived stats
//! - **Auto-Attacks**: Melee resolves at once, ranged attacks fly as projectiles
//! - **Damage Over Time**: Independent bleed and poison stacks, non-stacking burn
//! - **Followers**: Arena followers and the ranger pet fight on their own timers
//! - **Win Conditions**: The first hero to fall loses; dungeons queue waves
//!
//! ## Flow
//! 1. `Match::new` builds both sides from a `MatchSetup`
//! 2. `Match::start` opens the gates
//! 3. `Match::tick` advances one fixed 50 ms step:
//!    - Upkeep: cooldowns, regen, effect expiry, ultimate strikes, DoTs
//!    - Intents: human queue or `class_ai` policy, Left before Right
//!    - Movement, auto-attacks, projectiles, followers
//!    - Terminal check
//! 4. `Match::teardown` hands back the `MatchResult`

// Submodules
pub mod abilities;
pub mod ability_config;
pub mod auras;
pub mod class_ai;
pub mod combat_core;
pub mod components;
pub mod constants;
pub mod followers;
pub mod match_flow;
pub mod modes;
pub mod projectiles;
pub mod results;
pub mod utils;

// Re-exports
pub use abilities::{AbilityKey, ActionIntent};
pub use ability_config::ClassCatalog;
pub use components::{GameRng, Hero};
pub use match_flow::{EndReason, Match, MatchPhase, Outcome};
pub use results::{HeroSnapshot, MatchResult};
