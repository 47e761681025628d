//! Match configuration data structures
//!
//! Identity types shared by every layer of the engine (sides, classes, modes,
//! controllers) and the `MatchSetup` handed to the mode controller.

use serde::{Deserialize, Serialize};

use super::play_match::abilities::AbilityKey;
use super::play_match::ability_config::BaseStats;

/// One of the two sides of the arena. Left always resolves first within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides in deterministic resolution order
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Direction the hero faces at spawn (+1 = towards the right edge)
    pub fn spawn_facing(self) -> i8 {
        match self {
            Side::Left => 1,
            Side::Right => -1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

/// Playable hero classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeroClass {
    Wizard,
    Ranger,
    Assassin,
    Barbarian,
    /// Player-assembled build or generated opponent (monsters included)
    Custom,
}

impl HeroClass {
    /// The four catalog classes, in ladder order
    pub fn all() -> &'static [HeroClass] {
        &[
            HeroClass::Wizard,
            HeroClass::Ranger,
            HeroClass::Assassin,
            HeroClass::Barbarian,
        ]
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            HeroClass::Wizard => "Wizard",
            HeroClass::Ranger => "Ranger",
            HeroClass::Assassin => "Assassin",
            HeroClass::Barbarian => "Barbarian",
            HeroClass::Custom => "Custom",
        }
    }

    /// Get a short description
    pub fn description(&self) -> &'static str {
        match self {
            HeroClass::Wizard => "Mana caster, stacks charge for stronger spells",
            HeroClass::Ranger => "Ranged bleeds, summons a goading hound",
            HeroClass::Assassin => "Energy, combo points and stealth burst",
            HeroClass::Barbarian => "Rage grows as health falls",
            HeroClass::Custom => "Assembled from the shared skill pool",
        }
    }
}

/// Which game mode is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// One-off duel, optionally with arena followers on either side
    Arena,
    /// Sequence of increasingly strong AI opponents
    Ladder,
    /// Waves of dungeon monsters against one hero
    Dungeon,
}

/// Where a side's intents come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Intents are queued from outside via `Match::submit_intent`
    Human,
    /// Intents come from the class AI policy every tick
    Ai,
}

/// A player-assembled hero: stats, an optional generic resource pool,
/// up to two skills and an optional ultimate from the shared pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomBuild {
    pub name: String,
    pub stats: BaseStats,
    /// Generic resource pool size (0 = no resource)
    #[serde(default)]
    pub resource_max: f32,
    /// Generic resource regen per second
    #[serde(default)]
    pub resource_regen: f32,
    #[serde(default)]
    pub skills: Vec<AbilityKey>,
    #[serde(default)]
    pub ultimate: Option<AbilityKey>,
    /// Ranged custom heroes shoot arrows instead of swinging
    #[serde(default)]
    pub ranged: bool,
}

/// How to build one side's hero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeroSpec {
    /// A catalog class with its default stats
    Class(HeroClass),
    /// A custom build (used by generated ladder opponents too)
    Custom(CustomBuild),
    /// A dungeon monster from the catalog roster, by name
    Monster(String),
}

/// Stat deltas folded into a hero before the match starts
/// (equipment, arena follower buffs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBuff {
    #[serde(default)]
    pub hp: f32,
    #[serde(default)]
    pub base_damage: f32,
    #[serde(default)]
    pub attack_speed: f32,
    #[serde(default)]
    pub defense: f32,
    #[serde(default)]
    pub evasion: f32,
    #[serde(default)]
    pub move_speed: f32,
    #[serde(default)]
    pub resource: f32,
}

/// One side of a match before it starts
#[derive(Debug, Clone, PartialEq)]
pub struct SideSetup {
    pub hero: HeroSpec,
    pub controller: Controller,
    /// Equipment and other pre-match stat deltas
    pub buffs: Vec<StatBuff>,
    /// Arena follower template names from the player's collection
    pub followers: Vec<String>,
}

impl SideSetup {
    pub fn ai(hero: HeroSpec) -> Self {
        Self {
            hero,
            controller: Controller::Ai,
            buffs: Vec::new(),
            followers: Vec::new(),
        }
    }

    pub fn human(hero: HeroSpec) -> Self {
        Self {
            controller: Controller::Human,
            ..Self::ai(hero)
        }
    }
}

/// Everything the mode controller needs to build a match
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSetup {
    pub mode: GameMode,
    pub left: SideSetup,
    pub right: SideSetup,
    /// Further dungeon monsters queued behind the right side's first hero
    pub waves: Vec<HeroSpec>,
    /// Seed for the match RNG (None = entropy)
    pub random_seed: Option<u64>,
}

impl MatchSetup {
    /// A plain AI-vs-AI arena duel between two catalog classes
    pub fn arena(left: HeroClass, right: HeroClass, random_seed: Option<u64>) -> Self {
        Self {
            mode: GameMode::Arena,
            left: SideSetup::ai(HeroSpec::Class(left)),
            right: SideSetup::ai(HeroSpec::Class(right)),
            waves: Vec::new(),
            random_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opponent_is_involution() {
        for side in Side::BOTH {
            assert_eq!(side.opponent().opponent(), side);
            assert_ne!(side.opponent(), side);
        }
    }

    #[test]
    fn test_side_indices_are_distinct() {
        assert_eq!(Side::Left.index(), 0);
        assert_eq!(Side::Right.index(), 1);
    }

    #[test]
    fn test_catalog_classes_exclude_custom() {
        assert_eq!(HeroClass::all().len(), 4);
        assert!(!HeroClass::all().contains(&HeroClass::Custom));
    }
}
