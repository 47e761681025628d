//! Match results and per-hero snapshots
//!
//! Snapshots are read-only copies of a hero's state, suitable for display and
//! for writing to disk. They never hold references into the live match.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::states::match_config::{GameMode, HeroClass, Side};

use super::abilities::AbilityKey;
use super::ability_config::ResourceKind;
use super::components::auras::EffectKind;
use super::components::Hero;
use super::match_flow::{EndReason, Match, Outcome};

/// One active status effect as seen from outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    pub kind: EffectKind,
    pub remaining_ms: u64,
    pub magnitude: f32,
}

/// A follower as seen from outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerSnapshot {
    pub name: String,
    pub health: f32,
    pub max_health: f32,
    pub is_pet: bool,
    pub damage_dealt: f32,
}

/// Read-only view of one hero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSnapshot {
    pub name: String,
    pub class: HeroClass,
    pub side: Side,
    /// Arena position (x, y)
    pub position: [f32; 2],
    pub health: f32,
    pub max_health: f32,
    /// (kind, current, max) of the secondary resource, if the hero has one
    pub resource: Option<(ResourceKind, f32, f32)>,
    pub combo: f32,
    pub charge: u8,
    pub effects: Vec<EffectSnapshot>,
    pub bleed_stacks: usize,
    pub poison_stacks: usize,
    /// Remaining cooldown per ability, in milliseconds (0 = ready)
    pub cooldowns: BTreeMap<AbilityKey, u64>,
    /// Single-use abilities already spent
    pub spent: Vec<AbilityKey>,
    pub followers: Vec<FollowerSnapshot>,
    pub alive: bool,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
}

impl HeroSnapshot {
    pub fn capture(hero: &Hero, now: u64) -> Self {
        Self {
            name: hero.name.clone(),
            class: hero.class,
            side: hero.side,
            position: [hero.position.x, hero.position.y],
            health: hero.current_health,
            max_health: hero.max_health,
            resource: hero.resource.map(|pool| (pool.kind, pool.current, pool.max)),
            combo: hero.combo,
            charge: hero.charge,
            effects: hero
                .effects
                .iter_active(now)
                .map(|(kind, effect)| EffectSnapshot {
                    kind,
                    remaining_ms: effect.remaining_ms(now),
                    magnitude: effect.magnitude,
                })
                .collect(),
            bleed_stacks: hero.bleed_stacks(),
            poison_stacks: hero.poison_stacks(),
            cooldowns: hero
                .slots
                .iter()
                .map(|(key, slot)| (*key, slot.remaining_ms))
                .collect(),
            spent: hero
                .slots
                .iter()
                .filter(|(_, slot)| slot.used)
                .map(|(key, _)| *key)
                .collect(),
            followers: hero
                .living_followers()
                .map(|f| FollowerSnapshot {
                    name: f.name.clone(),
                    health: f.current_health,
                    max_health: f.max_health,
                    is_pet: f.is_pet,
                    damage_dealt: f.damage_dealt,
                })
                .collect(),
            alive: hero.is_alive(),
            damage_dealt: hero.damage_dealt,
            damage_taken: hero.damage_taken,
            healing_done: hero.healing_done,
        }
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            self.health / self.max_health
        }
    }
}

/// Final outcome of a resolved match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub mode: GameMode,
    /// None for an aborted match
    pub winner: Option<Side>,
    pub reason: EndReason,
    /// Match time from gates opening to resolution
    pub duration_ms: u64,
    /// Final snapshots, left then right
    pub heroes: [HeroSnapshot; 2],
    /// Successful ability uses per side
    pub ability_usage: [BTreeMap<AbilityKey, u32>; 2],
    /// Dungeon monsters defeated (0 outside dungeons)
    pub waves_cleared: u32,
    /// Seed the match RNG was built from; replaying it reproduces the match
    pub seed: u64,
}

impl MatchResult {
    pub(super) fn from_match(game: &Match, outcome: Outcome) -> Self {
        let now = game.now();
        let usage = |side: Side| {
            game.hero(side)
                .slots
                .iter()
                .filter(|(_, slot)| slot.uses > 0)
                .map(|(key, slot)| (*key, slot.uses))
                .collect()
        };
        Self {
            mode: game.mode(),
            winner: outcome.winner,
            reason: outcome.reason,
            duration_ms: now,
            heroes: [game.snapshot(Side::Left), game.snapshot(Side::Right)],
            ability_usage: [usage(Side::Left), usage(Side::Right)],
            waves_cleared: game.waves_cleared(),
            seed: game.seed(),
        }
    }

    pub fn winner_snapshot(&self) -> Option<&HeroSnapshot> {
        self.winner.map(|side| &self.heroes[side.index()])
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_ms as f32 / 1000.0
    }

    /// Write the result as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::play_match::ability_config::ClassCatalog;
    use crate::states::play_match::components::auras::StatModifiers;

    #[test]
    fn test_snapshot_reports_remaining_effect_time() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut hero = Hero::from_class(HeroClass::Wizard, Side::Left, &catalog).unwrap();
        hero.effects
            .apply(EffectKind::Shield, 1000, 3000, 250.0, StatModifiers::default());

        let snapshot = HeroSnapshot::capture(&hero, 2500);
        assert_eq!(
            snapshot.effects,
            vec![EffectSnapshot {
                kind: EffectKind::Shield,
                remaining_ms: 1500,
                magnitude: 250.0,
            }]
        );
        assert_eq!(snapshot.resource.map(|r| r.0), Some(ResourceKind::Mana));
        assert_eq!(snapshot.cooldowns.len(), 4);
        assert!(snapshot.spent.is_empty());
    }

    #[test]
    fn test_snapshot_drops_expired_effects() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut hero = Hero::from_class(HeroClass::Barbarian, Side::Right, &catalog).unwrap();
        hero.effects
            .apply(EffectKind::Stun, 0, 500, 0.0, StatModifiers::default());
        assert!(HeroSnapshot::capture(&hero, 500).effects.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let catalog = ClassCatalog::builtin().unwrap();
        let hero = Hero::from_class(HeroClass::Ranger, Side::Left, &catalog).unwrap();
        let json = serde_json::to_string(&HeroSnapshot::capture(&hero, 0)).unwrap();
        assert!(json.contains("\"HuntersMark\""));
        assert!(json.contains("\"Pyralis\""));
    }
}
