//! Ladder and dungeon runs
//!
//! A run is a chain of matches. It only builds the next `MatchSetup` and
//! records results; each encounter is played by a fresh `Match`.
//!
//! ## Ladder
//! The fixed class sequence comes first, skipping the player's own class.
//! After that every opponent is a generated custom build whose stats grow
//! with the player's wins. One loss ends the run.
//!
//! ## Dungeon
//! Each floor is one encounter: a queue of monsters drawn from the roster up
//! to the floor's tier, fought back to back by the same hero.

use bevy::prelude::*;

use crate::states::match_config::{
    Controller, CustomBuild, GameMode, HeroClass, HeroSpec, MatchSetup, Side, SideSetup,
};

use super::ability_config::{BaseStats, ClassCatalog, LadderConfig};
use super::components::GameRng;
use super::constants::*;
use super::match_flow::EndReason;
use super::results::MatchResult;

// ============================================================================
// Ladder
// ============================================================================

/// One finished ladder fight
#[derive(Debug, Clone, PartialEq)]
pub struct LadderRecord {
    pub opponent: String,
    pub won: bool,
    /// Player health left at the end (0 on a loss)
    pub health_left: f32,
}

/// A ladder run in progress
#[derive(Debug, Clone)]
pub struct LadderRun {
    player: SideSetup,
    wins: u32,
    /// Position in the fixed class sequence
    sequence_index: usize,
    active: bool,
    history: Vec<LadderRecord>,
    rng: GameRng,
}

impl LadderRun {
    pub fn new(player: SideSetup, seed: Option<u64>) -> Self {
        let rng = seed.map(GameRng::from_seed).unwrap_or_default();
        Self {
            player,
            wins: 0,
            sequence_index: 0,
            active: true,
            history: Vec::new(),
            rng,
        }
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn history(&self) -> &[LadderRecord] {
        &self.history
    }

    fn player_class(&self) -> Option<HeroClass> {
        match self.player.hero {
            HeroSpec::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The next opponent, without advancing the run
    pub fn next_opponent(&mut self, catalog: &ClassCatalog) -> Option<HeroSpec> {
        if !self.active {
            return None;
        }
        let config = catalog.ladder();
        let player_class = self.player_class();
        while let Some(&class) = config.sequence.get(self.sequence_index) {
            if Some(class) != player_class {
                return Some(HeroSpec::Class(class));
            }
            self.sequence_index += 1;
        }
        Some(HeroSpec::Custom(generate_ladder_opponent(
            self.wins,
            config,
            &mut self.rng,
        )))
    }

    /// Build the next ladder match. None once the run is over.
    pub fn next_match(&mut self, catalog: &ClassCatalog, seed: Option<u64>) -> Option<MatchSetup> {
        let opponent = self.next_opponent(catalog)?;
        Some(MatchSetup {
            mode: GameMode::Ladder,
            left: self.player.clone(),
            right: SideSetup {
                hero: opponent,
                controller: Controller::Ai,
                buffs: Vec::new(),
                followers: Vec::new(),
            },
            waves: Vec::new(),
            random_seed: seed,
        })
    }

    /// Record a finished ladder match. A win advances the run, anything else ends it.
    pub fn record(&mut self, result: &MatchResult) {
        if !self.active {
            warn!("Ignoring a ladder result after the run ended");
            return;
        }
        let won = result.winner == Some(Side::Left);
        let player = &result.heroes[Side::Left.index()];
        self.history.push(LadderRecord {
            opponent: result.heroes[Side::Right.index()].name.clone(),
            won,
            health_left: if won { player.health } else { 0.0 },
        });

        if won {
            self.wins += 1;
            self.sequence_index += 1;
            info!("Ladder win #{} against {}", self.wins, result.heroes[1].name);
        } else {
            self.active = false;
            info!("Ladder run over after {} wins", self.wins);
        }
    }
}

/// Tier of generated opponents after `wins` wins
pub fn ladder_tier(wins: u32, config: &LadderConfig) -> u32 {
    wins.saturating_sub(config.wins_before_tiers).min(config.max_tier)
}

/// Roll a generated ladder opponent: tier-scaled stats, two distinct skills
/// and one ultimate from the shared pools.
pub fn generate_ladder_opponent(wins: u32, config: &LadderConfig, rng: &mut GameRng) -> CustomBuild {
    let tier = ladder_tier(wins, config) as f32;
    let per = &config.per_tier;
    let ranged = rng.roll(0.5);
    let stats = BaseStats {
        hp: (config.base.hp + per.hp * tier).round(),
        base_damage: (config.base.base_damage + per.base_damage * tier).round(),
        attack_speed: config.base.attack_speed + (per.attack_speed * tier).min(config.attack_speed_cap),
        defense: (config.base.defense + per.defense * tier).round(),
        evasion: (config.base.evasion + per.evasion * tier).min(config.evasion_cap),
        move_speed: (config.base.move_speed + per.move_speed * tier).round(),
        attack_range: if ranged {
            config.base.attack_range
        } else {
            MELEE_RANGE
        },
    };

    let mut skills = Vec::with_capacity(2);
    let mut pool = config.skill_pool.clone();
    while skills.len() < 2 && !pool.is_empty() {
        skills.push(pool.swap_remove(rng.pick_index(pool.len())));
    }
    let ultimate = (!config.ultimate_pool.is_empty())
        .then(|| config.ultimate_pool[rng.pick_index(config.ultimate_pool.len())]);
    let name = if config.names.is_empty() {
        "Challenger".to_string()
    } else {
        config.names[rng.pick_index(config.names.len())].clone()
    };

    debug!("Generated ladder opponent {} at tier {}", name, tier);
    CustomBuild {
        name,
        stats,
        resource_max: config.resource,
        resource_regen: config.resource_regen,
        skills,
        ultimate,
        ranged,
    }
}

// ============================================================================
// Dungeon
// ============================================================================

/// A dungeon run: one encounter per floor until the hero falls
#[derive(Debug, Clone)]
pub struct DungeonRun {
    player: SideSetup,
    floor: u32,
    monsters_slain: u32,
    active: bool,
    rng: GameRng,
}

impl DungeonRun {
    pub fn new(player: SideSetup, seed: Option<u64>) -> Self {
        let rng = seed.map(GameRng::from_seed).unwrap_or_default();
        Self {
            player,
            floor: 1,
            monsters_slain: 0,
            active: true,
            rng,
        }
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    pub fn monsters_slain(&self) -> u32 {
        self.monsters_slain
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Build the current floor's encounter. None once the run is over.
    pub fn next_match(&mut self, catalog: &ClassCatalog, seed: Option<u64>) -> Option<MatchSetup> {
        if !self.active {
            return None;
        }
        let mut monsters = roll_encounter(self.floor, catalog, &mut self.rng);
        if monsters.is_empty() {
            warn!("Monster roster is empty, ending the dungeon run");
            self.active = false;
            return None;
        }
        let first = monsters.remove(0);
        Some(MatchSetup {
            mode: GameMode::Dungeon,
            left: self.player.clone(),
            right: SideSetup::ai(first),
            waves: monsters,
            random_seed: seed,
        })
    }

    /// Record a finished encounter. Clearing every wave moves to the next floor.
    pub fn record(&mut self, result: &MatchResult) {
        if !self.active {
            return;
        }
        self.monsters_slain += result.waves_cleared;
        if result.reason == EndReason::WavesCleared {
            info!("Dungeon floor {} cleared", self.floor);
            self.floor += 1;
        } else {
            info!(
                "Dungeon run over on floor {} ({} monsters slain)",
                self.floor, self.monsters_slain
            );
            self.active = false;
        }
    }
}

/// Highest monster tier that can appear on `floor`
pub fn floor_tier(floor: u32, catalog: &ClassCatalog) -> u32 {
    floor.div_ceil(2).clamp(1, catalog.max_monster_tier())
}

/// Number of monsters queued on `floor`
pub fn floor_waves(floor: u32) -> u32 {
    (DUNGEON_BASE_WAVES + floor.saturating_sub(1) / DUNGEON_FLOORS_PER_EXTRA_WAVE).min(DUNGEON_MAX_WAVES)
}

/// Draw the monsters of one encounter from the roster up to the floor's tier
pub fn roll_encounter(floor: u32, catalog: &ClassCatalog, rng: &mut GameRng) -> Vec<HeroSpec> {
    let tier = floor_tier(floor, catalog);
    let pool: Vec<&str> = catalog
        .monsters_up_to_tier(tier)
        .map(|m| m.name.as_str())
        .collect();
    if pool.is_empty() {
        return Vec::new();
    }
    (0..floor_waves(floor))
        .map(|_| HeroSpec::Monster(pool[rng.pick_index(pool.len())].to_string()))
        .collect()
}
