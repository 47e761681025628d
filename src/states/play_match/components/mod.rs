//! Hero State & Resource Model
//!
//! This module contains the data every hero carries through a match: health,
//! the optional secondary resource pool, derived stats, combat counters
//! (combo, charge), the cooldown map, the status-effect map, stacking
//! damage-over-time and owned followers.
//!
//! ## Module Structure
//! - `auras`: status effect data types (EffectKind, ActiveEffect, StatModifiers, DotStack)
//!
//! ## Invariants
//! - `0 <= current_health <= max_health`
//! - resource in `[0, max]`
//! - cooldowns are unsigned and only count down
//! - at most one active instance of each `EffectKind`
//! - the death transition is reported exactly once

pub mod auras;

use bevy::math::Vec2;
use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::states::match_config::{CustomBuild, HeroClass, HeroSpec, Side, StatBuff};

use super::abilities::AbilityKey;
use super::ability_config::{
    AttackStyle, BaseStats, ClassCatalog, ClassScaling, MonsterTemplate, ResourceKind,
    ResourcePoolConfig,
};
use super::auras::ActiveEffects;
use super::constants::*;
use super::followers::Follower;
use super::projectiles::ProjectileKind;
use auras::{DotKind, DotStack, EffectKind};

// ============================================================================
// Random Number Generation
// ============================================================================

/// Seeded random number generator for deterministic match simulation.
///
/// When a seed is provided (e.g., via headless config), the same seed will
/// always produce the same match outcome. Without a seed, uses system entropy.
#[derive(Resource, Clone, Debug)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    /// Create a new GameRng with a specific seed for deterministic behavior
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new GameRng with random entropy (non-deterministic)
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }

    /// Bernoulli trial. `chance <= 0` never succeeds, `chance >= 1` always does.
    pub fn roll(&mut self, chance: f32) -> bool {
        if chance <= 0.0 {
            return false;
        }
        self.random_f32() < chance
    }

    /// Uniform index into a collection of `len` items (`len` must be non-zero)
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

// ============================================================================
// Resources & Cooldowns
// ============================================================================

/// A hero's secondary resource pool (mana, energy or generic resource)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourcePool {
    pub kind: ResourceKind,
    pub current: f32,
    pub max: f32,
    /// Regeneration per second
    pub regen: f32,
}

impl ResourcePool {
    pub fn full(config: &ResourcePoolConfig) -> Self {
        Self {
            kind: config.kind,
            current: config.max,
            max: config.max,
            regen: config.regen,
        }
    }

    /// Regenerate for `dt_ms` milliseconds, clamped to max
    pub fn regen_tick(&mut self, dt_ms: u64) {
        self.current = (self.current + self.regen * dt_ms as f32 / 1000.0).min(self.max);
    }

    /// Spend `amount` if available. Returns false (and spends nothing) otherwise.
    pub fn spend(&mut self, amount: f32) -> bool {
        if self.current + f32::EPSILON < amount {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        true
    }
}

/// Cooldown bookkeeping for one ability in a hero's kit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbilitySlot {
    /// Milliseconds until the ability is ready again
    pub remaining_ms: u64,
    /// Set once a single-use ability has fired
    pub used: bool,
    /// Times the ability was successfully used this match
    pub uses: u32,
}

/// Periodic strikes of an active ultimate window (Thunderstorm)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrikeSequence {
    pub ability: AbilityKey,
    pub remaining: u32,
    pub timer_ms: u64,
}

/// Result of removing health from a hero
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HealthLoss {
    /// Health actually removed
    pub lost: f32,
    /// True only on the transition from alive to dead
    pub died: bool,
}

// ============================================================================
// Hero
// ============================================================================

/// One combatant's full mutable state.
#[derive(Clone, Debug, PartialEq)]
pub struct Hero {
    pub name: String,
    pub class: HeroClass,
    pub side: Side,
    /// +1 faces right, -1 faces left
    pub facing: i8,
    pub position: Vec2,

    // === Resources ===
    pub max_health: f32,
    pub current_health: f32,
    pub resource: Option<ResourcePool>,

    // === Capability table (copied from the catalog, then buffed) ===
    pub stats: BaseStats,
    pub attack: AttackStyle,
    pub scaling: ClassScaling,
    /// Kit in AI priority order
    pub abilities: Vec<AbilityKey>,
    pub slots: BTreeMap<AbilityKey, AbilitySlot>,

    // === Counters ===
    pub combo: f32,
    pub charge: u8,
    /// Milliseconds since charge was last gained
    pub charge_idle_ms: u64,
    /// Milliseconds until the next auto-attack
    pub attack_timer_ms: f32,
    /// Auto-attacks launched this match
    pub attack_count: u32,

    // === Status ===
    pub effects: ActiveEffects,
    pub dots: SmallVec<[DotStack; 8]>,
    pub strikes: Option<StrikeSequence>,

    // === Followers ===
    pub followers: Vec<Follower>,
    pub next_follower_id: u32,

    // === Statistics ===
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    /// Damage over time not yet reported to the combat log: bleed, poison, burn
    pub pending_dot_log: [f32; 3],

    dead: bool,
}

impl Hero {
    fn blank(
        name: String,
        class: HeroClass,
        side: Side,
        stats: BaseStats,
        attack: AttackStyle,
        scaling: ClassScaling,
        resource: Option<ResourcePool>,
        abilities: Vec<AbilityKey>,
    ) -> Self {
        let slots = abilities
            .iter()
            .map(|key| (*key, AbilitySlot::default()))
            .collect();
        let spawn_x = match side {
            Side::Left => ARENA_MIN_X + SPAWN_INSET,
            Side::Right => ARENA_MAX_X - SPAWN_INSET,
        };

        Self {
            name,
            class,
            side,
            facing: side.spawn_facing(),
            position: Vec2::new(spawn_x, GROUND_Y),
            max_health: stats.hp,
            current_health: stats.hp,
            resource,
            stats,
            attack,
            scaling,
            abilities,
            slots,
            combo: 0.0,
            charge: 0,
            charge_idle_ms: 0,
            attack_timer_ms: 0.0,
            attack_count: 0,
            effects: ActiveEffects::default(),
            dots: SmallVec::new(),
            strikes: None,
            followers: Vec::new(),
            next_follower_id: 0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            healing_done: 0.0,
            pending_dot_log: [0.0; 3],
            dead: false,
        }
    }

    /// Build a hero for one of the four catalog classes
    pub fn from_class(class: HeroClass, side: Side, catalog: &ClassCatalog) -> Result<Self, ConfigError> {
        let definition = catalog.class(class).ok_or_else(|| {
            ConfigError::Invalid(format!("{:?} is not defined in the catalog", class))
        })?;

        Ok(Self::blank(
            definition.name.clone(),
            class,
            side,
            definition.stats,
            definition.attack,
            definition.scaling.clone(),
            definition.resource.as_ref().map(ResourcePool::full),
            definition.abilities.clone(),
        ))
    }

    /// Build a custom hero (player build or generated ladder opponent)
    pub fn from_custom(build: &CustomBuild, side: Side) -> Self {
        let resource = (build.resource_max > 0.0).then(|| ResourcePool {
            kind: ResourceKind::Resource,
            current: build.resource_max,
            max: build.resource_max,
            regen: build.resource_regen,
        });
        let mut abilities: Vec<AbilityKey> = Vec::new();
        if let Some(ultimate) = build.ultimate {
            abilities.push(ultimate);
        }
        abilities.extend(build.skills.iter().copied());
        let attack = if build.ranged {
            AttackStyle::Ranged(ProjectileKind::Arrow)
        } else {
            AttackStyle::Melee
        };
        let scaling = ClassScaling {
            combo_attack_speed: 0.04,
            max_combo: 5.0,
            combo_per_hit: 0.5,
            preferred_range: if build.ranged { 300.0 } else { 50.0 },
            ..ClassScaling::default()
        };

        Self::blank(
            build.name.clone(),
            HeroClass::Custom,
            side,
            build.stats,
            attack,
            scaling,
            resource,
            abilities,
        )
    }

    /// Build a dungeon monster. Monsters have no kit and swing in melee.
    pub fn from_monster(template: &MonsterTemplate, side: Side) -> Self {
        let stats = BaseStats {
            hp: template.hp,
            base_damage: template.damage,
            attack_speed: 0.8 + (template.tier.saturating_sub(1)) as f32 * 0.15,
            defense: template.defense,
            evasion: template.evasion,
            move_speed: 100.0,
            attack_range: 70.0,
        };
        let scaling = ClassScaling {
            preferred_range: 50.0,
            ..ClassScaling::default()
        };

        Self::blank(
            template.name.clone(),
            HeroClass::Custom,
            side,
            stats,
            AttackStyle::Melee,
            scaling,
            None,
            Vec::new(),
        )
    }

    pub fn from_spec(spec: &HeroSpec, side: Side, catalog: &ClassCatalog) -> Result<Self, ConfigError> {
        match spec {
            HeroSpec::Class(class) => Self::from_class(*class, side, catalog),
            HeroSpec::Custom(build) => Ok(Self::from_custom(build, side)),
            HeroSpec::Monster(name) => catalog
                .monsters()
                .iter()
                .find(|m| &m.name == name)
                .map(|template| Self::from_monster(template, side))
                .ok_or_else(|| ConfigError::Invalid(format!("unknown monster '{}'", name))),
        }
    }

    /// Fold pre-match stat deltas into the hero. Call before the match starts.
    pub fn apply_buff(&mut self, buff: &StatBuff) {
        self.stats.hp += buff.hp;
        self.max_health += buff.hp;
        self.current_health += buff.hp;
        self.stats.base_damage += buff.base_damage;
        self.stats.attack_speed += buff.attack_speed;
        self.stats.defense = (self.stats.defense + buff.defense).max(0.0);
        self.stats.evasion = (self.stats.evasion + buff.evasion).clamp(0.0, EVASION_CAP);
        self.stats.move_speed += buff.move_speed;
        if let Some(pool) = self.resource.as_mut() {
            pool.max += buff.resource;
            pool.current += buff.resource;
        }
    }

    // === Health ===

    pub fn is_alive(&self) -> bool {
        self.current_health > 0.0
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            self.current_health / self.max_health
        } else {
            0.0
        }
    }

    /// Missing health as a fraction, used by rage scaling
    pub fn missing_health_fraction(&self) -> f32 {
        1.0 - self.health_fraction()
    }

    /// Remove health, clamped at zero (or at 1 while Last Stand holds).
    /// Damage to a dead hero is ignored.
    pub fn take_health(&mut self, amount: f32, now: u64) -> HealthLoss {
        debug_assert!(amount >= 0.0, "take_health: negative amount {}", amount);
        if self.dead || amount <= 0.0 {
            return HealthLoss::default();
        }

        let floor = if self.effects.is_active(EffectKind::LastStand, now) {
            1.0_f32.min(self.current_health)
        } else {
            0.0
        };
        let before = self.current_health;
        self.current_health = (self.current_health - amount).max(floor);
        let lost = before - self.current_health;
        self.damage_taken += lost;

        let died = self.current_health <= 0.0;
        if died {
            self.current_health = 0.0;
            self.dead = true;
        }
        HealthLoss { lost, died }
    }

    /// Restore health without exceeding max. Dead heroes are never revived.
    pub fn restore_health(&mut self, amount: f32) -> f32 {
        if self.dead || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_health;
        self.current_health = (self.current_health + amount).min(self.max_health);
        let healed = self.current_health - before;
        self.healing_done += healed;
        healed
    }

    // === Resource ===

    pub fn resource_amount(&self) -> f32 {
        self.resource.map(|pool| pool.current).unwrap_or(0.0)
    }

    /// Regenerate the resource pool. Generic resource pools stop while stunned.
    pub fn regen_tick(&mut self, dt_ms: u64, now: u64) {
        let stunned = self.is_stunned(now);
        if let Some(pool) = self.resource.as_mut() {
            if pool.kind == ResourceKind::Resource && stunned {
                return;
            }
            pool.regen_tick(dt_ms);
        }
    }

    // === Cooldowns ===

    /// Count every cooldown down by `dt_ms`, stopping at zero
    pub fn tick_cooldowns(&mut self, dt_ms: u64) {
        for slot in self.slots.values_mut() {
            slot.remaining_ms = slot.remaining_ms.saturating_sub(dt_ms);
        }
    }

    pub fn slot(&self, ability: AbilityKey) -> Option<&AbilitySlot> {
        self.slots.get(&ability)
    }

    pub fn knows(&self, ability: AbilityKey) -> bool {
        self.slots.contains_key(&ability)
    }

    /// Ready means known, off cooldown and not spent
    pub fn is_ready(&self, ability: AbilityKey) -> bool {
        self.slot(ability)
            .map(|slot| slot.remaining_ms == 0 && !slot.used)
            .unwrap_or(false)
    }

    // === Counters ===

    pub fn gain_combo(&mut self, amount: f32) {
        self.combo = (self.combo + amount).min(self.scaling.max_combo).max(0.0);
    }

    pub fn gain_charge(&mut self, amount: u8) {
        if self.scaling.max_charge == 0 {
            return;
        }
        self.charge = self.charge.saturating_add(amount).min(self.scaling.max_charge);
        self.charge_idle_ms = 0;
    }

    /// Decay charge and combo over `dt_ms` of match time
    pub fn decay_counters(&mut self, dt_ms: u64) {
        if self.scaling.charge_decay_ms > 0 && self.charge > 0 {
            self.charge_idle_ms += dt_ms;
            if self.charge_idle_ms >= self.scaling.charge_decay_ms {
                self.charge -= 1;
                self.charge_idle_ms = 0;
            }
        }
        if self.combo > 0.0 && self.attack_timer_ms > COMBO_DECAY_IDLE_MS {
            self.combo = (self.combo - self.scaling.combo_decay * dt_ms as f32 / 1000.0).max(0.0);
        }
    }

    // === Status queries ===

    pub fn is_stunned(&self, now: u64) -> bool {
        self.effects.is_active(EffectKind::Stun, now)
    }

    pub fn is_stealthed(&self, now: u64) -> bool {
        self.effects.is_active(EffectKind::Stealth, now)
    }

    pub fn ultimate_active(&self, now: u64) -> bool {
        self.effects.any_ultimate_active(now)
    }

    // === Damage over time ===

    /// Live bleed stacks (the `blN` query)
    pub fn bleed_stacks(&self) -> usize {
        self.dots.iter().filter(|s| s.kind == DotKind::Bleed).count()
    }

    pub fn poison_stacks(&self) -> usize {
        self.dots.iter().filter(|s| s.kind == DotKind::Poison).count()
    }

    /// Add a stack sized from current health. At `cap` stacks of that family
    /// the oldest one is replaced.
    pub fn add_dot(&mut self, kind: DotKind, now: u64, cap: usize) {
        let stack = DotStack {
            kind,
            per_second: self.current_health * DOT_HP_FRACTION_PER_SEC,
            expires_at: now + DOT_STACK_DURATION_MS,
        };
        let count = self.dots.iter().filter(|s| s.kind == kind).count();
        if cap > 0 && count >= cap {
            if let Some(oldest) = self
                .dots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.kind == kind)
                .min_by_key(|(_, s)| s.expires_at)
                .map(|(i, _)| i)
            {
                self.dots.remove(oldest);
            }
        }
        self.dots.push(stack);
    }

    /// Drop expired stacks and return this tick's damage per family `[bleed, poison]`
    pub fn drain_dots(&mut self, now: u64, dt_ms: u64) -> [f32; 2] {
        let start = now.saturating_sub(dt_ms);
        let mut damage = [0.0; 2];
        for stack in self.dots.iter().filter(|s| s.expires_at > start) {
            let index = match stack.kind {
                DotKind::Bleed => 0,
                DotKind::Poison => 1,
            };
            let applied = stack.expires_at.saturating_sub(DOT_STACK_DURATION_MS);
            let covered = stack.expires_at.min(now).saturating_sub(start.max(applied));
            damage[index] += stack.per_second * covered as f32 / 1000.0;
        }
        self.dots.retain(|s| now < s.expires_at);
        damage
    }

    // === Followers ===

    pub fn living_followers(&self) -> impl Iterator<Item = &Follower> {
        self.followers.iter().filter(|f| f.alive)
    }

    pub fn follower_mut(&mut self, id: u32) -> Option<&mut Follower> {
        self.followers.iter_mut().find(|f| f.id == id && f.alive)
    }

    /// Take the next follower id for this hero
    pub fn allocate_follower_id(&mut self) -> u32 {
        let id = self.next_follower_id;
        self.next_follower_id += 1;
        id
    }

    /// Debug-only invariant validation.
    pub fn debug_validate(&self) {
        debug_assert!(
            self.current_health >= 0.0,
            "Hero health cannot be negative: {}",
            self.current_health
        );
        debug_assert!(
            self.current_health <= self.max_health + 0.001,
            "Hero health ({}) cannot exceed max_health ({})",
            self.current_health,
            self.max_health
        );
        if let Some(pool) = &self.resource {
            debug_assert!(
                pool.current >= 0.0 && pool.current <= pool.max + 0.001,
                "Hero {} {} out of range: {}/{}",
                self.name,
                pool.kind.name(),
                pool.current,
                pool.max
            );
        }
    }

    /// Check the invariants the engine promises, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !(self.current_health >= 0.0 && self.current_health <= self.max_health + 0.001) {
            return Err(format!(
                "{} health {} outside [0, {}]",
                self.name, self.current_health, self.max_health
            ));
        }
        if let Some(pool) = &self.resource {
            if !(pool.current >= 0.0 && pool.current <= pool.max + 0.001) {
                return Err(format!(
                    "{} {} {} outside [0, {}]",
                    self.name,
                    pool.kind.name(),
                    pool.current,
                    pool.max
                ));
            }
        }
        if self.scaling.max_combo >= 0.0 && self.combo > self.scaling.max_combo + 0.001 {
            return Err(format!("{} combo {} above cap", self.name, self.combo));
        }
        if self.dead && self.current_health > 0.0 {
            return Err(format!("{} is flagged dead with health left", self.name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard() -> Hero {
        let catalog = ClassCatalog::builtin().unwrap();
        Hero::from_class(HeroClass::Wizard, Side::Left, &catalog).unwrap()
    }

    #[test]
    fn test_take_health_reports_death_once() {
        let mut hero = wizard();
        let first = hero.take_health(hero.max_health * 2.0, 0);
        assert!(first.died);
        assert_eq!(hero.current_health, 0.0);

        let second = hero.take_health(100.0, 0);
        assert!(!second.died, "Death must only be reported once");
        assert_eq!(second.lost, 0.0);
    }

    #[test]
    fn test_restore_health_clamps_and_never_revives() {
        let mut hero = wizard();
        hero.take_health(500.0, 0);
        let healed = hero.restore_health(10_000.0);
        assert_eq!(healed, 500.0);
        assert_eq!(hero.current_health, hero.max_health);

        hero.take_health(hero.max_health, 0);
        assert_eq!(hero.restore_health(100.0), 0.0);
        assert!(!hero.is_alive());
    }

    #[test]
    fn test_regen_clamps_to_max() {
        let mut hero = wizard();
        let pool = hero.resource.as_mut().unwrap();
        pool.current = pool.max - 1.0;
        hero.regen_tick(1000, 0);
        let pool = hero.resource.unwrap();
        assert_eq!(pool.current, pool.max);
    }

    #[test]
    fn test_cooldowns_stop_at_zero() {
        let mut hero = wizard();
        hero.slots.get_mut(&AbilityKey::LightningBolt).unwrap().remaining_ms = 30;
        hero.tick_cooldowns(50);
        assert_eq!(hero.slot(AbilityKey::LightningBolt).unwrap().remaining_ms, 0);
    }

    #[test]
    fn test_charge_caps_and_decays() {
        let mut hero = wizard();
        hero.gain_charge(20);
        assert_eq!(hero.charge, hero.scaling.max_charge);
        hero.decay_counters(hero.scaling.charge_decay_ms);
        assert_eq!(hero.charge, hero.scaling.max_charge - 1);
    }

    #[test]
    fn test_dot_cap_replaces_oldest() {
        let mut hero = wizard();
        hero.add_dot(DotKind::Bleed, 0, 2);
        hero.add_dot(DotKind::Bleed, 100, 2);
        hero.add_dot(DotKind::Bleed, 200, 2);
        assert_eq!(hero.bleed_stacks(), 2);
        assert!(hero.dots.iter().all(|s| s.expires_at >= 100 + DOT_STACK_DURATION_MS));
    }

    #[test]
    fn test_buff_folds_into_stats() {
        let mut hero = wizard();
        let before = hero.max_health;
        hero.apply_buff(&StatBuff {
            hp: 200.0,
            defense: 10.0,
            ..StatBuff::default()
        });
        assert_eq!(hero.max_health, before + 200.0);
        assert_eq!(hero.current_health, hero.max_health);
        assert!(hero.check_invariants().is_ok());
    }
}
