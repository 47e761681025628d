//! Shared Utility Functions
//!
//! This module contains helpers used by multiple combat modules.
//! Having them here breaks circular dependencies between abilities, combat_core
//! and followers.

use crate::combat::log::CombatLog;
use crate::states::match_config::Side;

use super::ability_config::ClassCatalog;
use super::components::{GameRng, Hero};

/// Everything a resolution step needs besides the heroes themselves.
pub struct CombatEnv<'a> {
    /// Current match time in milliseconds
    pub now: u64,
    pub rng: &'a mut GameRng,
    pub log: &'a mut CombatLog,
    pub catalog: &'a ClassCatalog,
    /// Heroes that died during this step, in the order they fell
    pub fallen: Vec<Side>,
}

impl<'a> CombatEnv<'a> {
    pub fn new(
        now: u64,
        rng: &'a mut GameRng,
        log: &'a mut CombatLog,
        catalog: &'a ClassCatalog,
    ) -> Self {
        log.set_time_ms(now);
        Self {
            now,
            rng,
            log,
            catalog,
            fallen: Vec::new(),
        }
    }
}

/// Split the hero pair into (actor, opponent) for the given side.
pub fn pair_mut(heroes: &mut [Hero; 2], side: Side) -> (&mut Hero, &mut Hero) {
    let (left, right) = heroes.split_at_mut(1);
    match side {
        Side::Left => (&mut left[0], &mut right[0]),
        Side::Right => (&mut right[0], &mut left[0]),
    }
}

/// Helper to generate a consistent combatant ID for the combat log.
///
/// Format: "{side} {name}" e.g., "Left Voltaris"
pub fn combatant_id(hero: &Hero) -> String {
    format!("{} {}", hero.side.name(), hero.name)
}

/// Horizontal distance between two heroes. Everyone stands on the ground line.
pub fn gap(a: &Hero, b: &Hero) -> f32 {
    (a.position.x - b.position.x).abs()
}
