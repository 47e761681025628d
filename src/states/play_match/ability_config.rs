//! Data-Driven Class Catalog
//!
//! Classes, abilities, follower templates, dungeon monsters and ladder
//! settings are defined in `assets/config/classes.ron` instead of being
//! hardcoded. A copy of the file is embedded at compile time so the engine
//! works from any working directory; `load_class_catalog` reads the file from
//! disk for balance iteration without recompiling.
//!
//! ## Capability table
//! Each `ClassDefinition` carries the class's resource pool descriptor, its
//! skill list and its scaling hooks. Engine systems read these values; they
//! never branch on the class name.
//!
//! ## Usage
//! ```ignore
//! let catalog = ClassCatalog::builtin()?;
//! let chain = catalog.get(AbilityKey::ChainLightning).unwrap();
//! println!("Chain Lightning costs {}", chain.cost);
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::states::match_config::{HeroClass, StatBuff};

use super::abilities::AbilityKey;
use super::components::auras::{DotKind, EffectSpec};
use super::followers::FollowerAbility;
use super::projectiles::ProjectileKind;

/// Path of the catalog relative to the working directory
pub const CATALOG_PATH: &str = "assets/config/classes.ron";

const BUILTIN_CATALOG: &str = include_str!("../../../assets/config/classes.ron");

/// Core stats every hero (and monster) starts from
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: f32,
    pub base_damage: f32,
    /// Auto-attacks per second
    pub attack_speed: f32,
    pub defense: f32,
    /// Chance to evade auto-attacks, 0.0-1.0
    #[serde(default)]
    pub evasion: f32,
    /// Arena units per second
    pub move_speed: f32,
    /// Maximum auto-attack distance
    pub attack_range: f32,
}

/// The three flavours of secondary resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Mana,
    Energy,
    /// Generic pool used by custom builds
    Resource,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Mana => "mana",
            ResourceKind::Energy => "energy",
            ResourceKind::Resource => "resource",
        }
    }
}

/// Secondary resource pool descriptor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourcePoolConfig {
    pub kind: ResourceKind,
    pub max: f32,
    /// Regeneration per second
    pub regen: f32,
}

fn default_dot_stack_cap() -> usize {
    8
}

/// Per-class scaling hooks. Every field defaults to "no effect".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassScaling {
    /// Attack speed gained per combo point
    #[serde(default)]
    pub combo_attack_speed: f32,
    #[serde(default)]
    pub max_combo: f32,
    /// Combo points gained per landed auto-attack
    #[serde(default)]
    pub combo_per_hit: f32,
    /// Combo lost per second while not attacking
    #[serde(default)]
    pub combo_decay: f32,
    /// Damage gained per point of charge
    #[serde(default)]
    pub charge_damage: f32,
    #[serde(default)]
    pub max_charge: u8,
    /// Charge gained per landed auto-attack
    #[serde(default)]
    pub charge_per_hit: u8,
    /// One point of charge decays after this long without a gain (0 = never)
    #[serde(default)]
    pub charge_decay_ms: u64,
    /// Damage bonus at 0 HP, scaled linearly by missing health
    #[serde(default)]
    pub rage_damage: f32,
    /// Attack speed bonus at 0 HP, scaled linearly by missing health
    #[serde(default)]
    pub rage_attack_speed: f32,
    /// Base lifesteal fraction on all damage dealt
    #[serde(default)]
    pub lifesteal: f32,
    /// Spell damage bonus fraction
    #[serde(default)]
    pub spell_damage: f32,
    /// Auto-attack speed bonus fraction
    #[serde(default)]
    pub cast_speed: f32,
    /// Chance to ignore a stun
    #[serde(default)]
    pub stun_resist: f32,
    /// Fraction of incoming slows ignored
    #[serde(default)]
    pub slow_resist: f32,
    /// Chance to halve incoming spell damage
    #[serde(default)]
    pub spell_resist: f32,
    /// Every Nth landed auto-attack applies a bleed (0 = never)
    #[serde(default)]
    pub bleed_every: u32,
    /// Only melee hits count towards `bleed_every`
    #[serde(default)]
    pub bleed_melee_only: bool,
    /// Maximum bleed/poison stacks this class keeps on a target
    #[serde(default = "default_dot_stack_cap")]
    pub dot_stack_cap: usize,
    /// Melee damage bonus fraction
    #[serde(default)]
    pub melee_bonus: f32,
    /// Auto-attack damage spread (+/- fraction)
    #[serde(default)]
    pub damage_variance: f32,
    /// Distance the AI tries to hold from its opponent
    #[serde(default)]
    pub preferred_range: f32,
}

impl Default for ClassScaling {
    fn default() -> Self {
        Self {
            combo_attack_speed: 0.0,
            max_combo: 0.0,
            combo_per_hit: 0.0,
            combo_decay: 0.0,
            charge_damage: 0.0,
            max_charge: 0,
            charge_per_hit: 0,
            charge_decay_ms: 0,
            rage_damage: 0.0,
            rage_attack_speed: 0.0,
            lifesteal: 0.0,
            spell_damage: 0.0,
            cast_speed: 0.0,
            stun_resist: 0.0,
            slow_resist: 0.0,
            spell_resist: 0.0,
            bleed_every: 0,
            bleed_melee_only: false,
            dot_stack_cap: default_dot_stack_cap(),
            melee_bonus: 0.0,
            damage_variance: 0.0,
            preferred_range: 0.0,
        }
    }
}

/// Capability table entry for one class
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    pub stats: BaseStats,
    #[serde(default)]
    pub resource: Option<ResourcePoolConfig>,
    /// Skill list in AI priority order, ultimate included
    pub abilities: Vec<AbilityKey>,
    /// How auto-attacks are delivered
    pub attack: AttackStyle,
    #[serde(default)]
    pub scaling: ClassScaling,
}

/// How a hero's auto-attacks reach the target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackStyle {
    /// Always resolves immediately
    Melee,
    /// Always fires a projectile; weaker at point-blank range
    Ranged(ProjectileKind),
    /// Melee inside melee range, thrown projectile beyond it
    Hybrid(ProjectileKind),
}

impl AttackStyle {
    pub fn projectile(&self) -> Option<ProjectileKind> {
        match self {
            AttackStyle::Melee => None,
            AttackStyle::Ranged(kind) | AttackStyle::Hybrid(kind) => Some(*kind),
        }
    }

    /// Whether an attack at this distance is a melee swing
    pub fn is_melee_at(&self, distance: f32, melee_range: f32) -> bool {
        match self {
            AttackStyle::Melee => true,
            AttackStyle::Ranged(_) => false,
            AttackStyle::Hybrid(_) => distance <= melee_range,
        }
    }
}

/// When an ability may be activated
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum AbilityTrigger {
    #[default]
    Manual,
    /// Unlocks once the caster's health fraction is at or below the value
    HpThreshold(f32),
}

/// Where an ability moves its caster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityMovement {
    /// Teleport to the far side of the opponent
    BehindTarget,
    /// Dash up to the opponent, stopping just in front of it
    ToTarget,
}

/// Complete ability configuration loaded from RON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityConfig {
    /// Display name of the ability
    pub name: String,

    // === Economy ===
    /// Resource cost (mana, energy or generic resource)
    #[serde(default)]
    pub cost: f32,
    /// Cooldown after use in milliseconds
    #[serde(default)]
    pub cooldown_ms: u64,
    /// Usable once per match
    #[serde(default)]
    pub single_use: bool,
    #[serde(default)]
    pub trigger: AbilityTrigger,
    /// Charge points required on the caster
    #[serde(default)]
    pub min_charge: u8,

    // === Range ===
    /// Maximum distance to the opponent (None = any distance)
    #[serde(default)]
    pub range: Option<f32>,
    #[serde(default)]
    pub min_range: f32,

    // === Damage ===
    /// Base damage per hit before scaling and mitigation
    #[serde(default)]
    pub damage: f32,
    /// Spell hits use spell dodge, spell damage bonus and spell resist
    #[serde(default)]
    pub spell: bool,
    /// Number of periodic hits during the ability's window (ultimates)
    #[serde(default)]
    pub hits: u32,
    /// Milliseconds between periodic hits
    #[serde(default)]
    pub interval_ms: u64,
    /// Fraction of damage dealt returned as healing
    #[serde(default)]
    pub heal_fraction: f32,
    /// Fraction of the hit that bounces to an enemy follower
    #[serde(default)]
    pub bounce: f32,

    // === Counters ===
    #[serde(default)]
    pub combo_gain: f32,
    /// Set combo to the class maximum
    #[serde(default)]
    pub fill_combo: bool,
    #[serde(default)]
    pub charge_gain: u8,

    // === Effects ===
    /// Reposition the caster relative to the opponent
    #[serde(default)]
    pub movement: Option<AbilityMovement>,
    /// Follower template summoned on use
    #[serde(default)]
    pub summon: Option<String>,
    /// Status effects applied on use
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
    /// Status effects applied by every periodic hit
    #[serde(default)]
    pub hit_effects: Vec<EffectSpec>,
    /// Damage-over-time stacks put on the opponent after the effects land
    #[serde(default)]
    pub dots: Vec<DotKind>,
}

impl AbilityConfig {
    /// Returns true if this ability deals direct damage
    pub fn is_damage(&self) -> bool {
        self.damage > 0.0
    }

    /// Returns true if this ability is a threshold-gated ultimate
    pub fn is_ultimate(&self) -> bool {
        matches!(self.trigger, AbilityTrigger::HpThreshold(_))
    }

    /// Health fraction at or below which the ability unlocks
    pub fn threshold(&self) -> Option<f32> {
        match self.trigger {
            AbilityTrigger::HpThreshold(fraction) => Some(fraction),
            AbilityTrigger::Manual => None,
        }
    }
}

/// Arena follower or summoned pet template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowerTemplate {
    pub name: String,
    pub hp: f32,
    pub damage: f32,
    pub attack_speed: f32,
    pub defense: f32,
    pub range: f32,
    #[serde(default)]
    pub move_speed: f32,
    /// Stat deltas granted to the owning hero at match setup
    #[serde(default)]
    pub buff: StatBuff,
    #[serde(default)]
    pub ability: Option<FollowerAbilityConfig>,
    /// Melee attackers inside this range hit the follower instead (0 = never goads)
    #[serde(default)]
    pub goad_range: f32,
}

/// A follower's own ability, on its own cooldown
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowerAbilityConfig {
    pub name: String,
    pub cooldown_ms: u64,
    pub effect: FollowerAbility,
}

/// Dungeon monster roster entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub name: String,
    pub hp: f32,
    pub damage: f32,
    pub defense: f32,
    pub tier: u32,
    #[serde(default)]
    pub evasion: f32,
}

/// Ladder opponent generation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Fixed opening opponents, skipping the player's own class
    pub sequence: Vec<HeroClass>,
    /// Names handed to generated opponents
    pub names: Vec<String>,
    /// Generated opponent stats at tier 0
    pub base: BaseStats,
    /// Stat growth per tier
    pub per_tier: StatBuff,
    /// Wins before generated opponents start gaining tiers
    pub wins_before_tiers: u32,
    pub max_tier: u32,
    /// Cap on attack speed gained from tiers
    pub attack_speed_cap: f32,
    /// Cap on evasion gained from tiers
    pub evasion_cap: f32,
    /// Generic resource pool of generated opponents
    pub resource: f32,
    pub resource_regen: f32,
    pub skill_pool: Vec<AbilityKey>,
    pub ultimate_pool: Vec<AbilityKey>,
}

/// Root structure for the classes.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogFile {
    pub classes: HashMap<HeroClass, ClassDefinition>,
    pub abilities: HashMap<AbilityKey, AbilityConfig>,
    pub followers: Vec<FollowerTemplate>,
    /// Template name summoned by Summon Pet
    pub pet: String,
    pub monsters: Vec<MonsterTemplate>,
    pub ladder: LadderConfig,
}

/// Resource containing the immutable catalog.
///
/// Shared by the mode controller, AI policies and the headless runner.
#[derive(Resource, Debug, Clone)]
pub struct ClassCatalog {
    classes: HashMap<HeroClass, ClassDefinition>,
    abilities: HashMap<AbilityKey, AbilityConfig>,
    followers: Vec<FollowerTemplate>,
    pet: String,
    monsters: Vec<MonsterTemplate>,
    ladder: LadderConfig,
}

impl ClassCatalog {
    /// Create from a parsed catalog file
    pub fn new(file: CatalogFile) -> Self {
        Self {
            classes: file.classes,
            abilities: file.abilities,
            followers: file.followers,
            pet: file.pet,
            monsters: file.monsters,
            ladder: file.ladder,
        }
    }

    /// Parse and validate a catalog from RON text
    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = ron::from_str(contents)?;
        let catalog = Self::new(file);
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_ron_str(BUILTIN_CATALOG)
    }

    /// Get the capability table entry for a catalog class
    pub fn class(&self, class: HeroClass) -> Option<&ClassDefinition> {
        self.classes.get(&class)
    }

    /// Get the configuration for an ability
    pub fn get(&self, ability: AbilityKey) -> Option<&AbilityConfig> {
        self.abilities.get(&ability)
    }

    /// Get the configuration for an ability, panicking if not found.
    /// Use this when the ability must exist (validated at load).
    pub fn get_unchecked(&self, ability: AbilityKey) -> &AbilityConfig {
        self.abilities
            .get(&ability)
            .unwrap_or_else(|| panic!("Ability {:?} not found in catalog", ability))
    }

    pub fn follower(&self, name: &str) -> Option<&FollowerTemplate> {
        self.followers.iter().find(|f| f.name == name)
    }

    /// Template summoned by Summon Pet
    pub fn pet(&self) -> Option<&FollowerTemplate> {
        self.follower(&self.pet)
    }

    pub fn monsters(&self) -> &[MonsterTemplate] {
        &self.monsters
    }

    /// Monsters at or below the given tier, in catalog order
    pub fn monsters_up_to_tier(&self, tier: u32) -> impl Iterator<Item = &MonsterTemplate> {
        self.monsters.iter().filter(move |m| m.tier <= tier)
    }

    pub fn max_monster_tier(&self) -> u32 {
        self.monsters.iter().map(|m| m.tier).max().unwrap_or(1)
    }

    pub fn ladder(&self) -> &LadderConfig {
        &self.ladder
    }

    /// Check the catalog is complete and internally consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing_classes: Vec<HeroClass> = HeroClass::all()
            .iter()
            .copied()
            .filter(|class| !self.classes.contains_key(class))
            .collect();
        if !missing_classes.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "missing class definitions: {:?}",
                missing_classes
            )));
        }

        let missing_abilities: Vec<AbilityKey> = AbilityKey::all()
            .iter()
            .copied()
            .filter(|key| !self.abilities.contains_key(key))
            .collect();
        if !missing_abilities.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "missing ability definitions: {:?}",
                missing_abilities
            )));
        }

        for (key, ability) in &self.abilities {
            if let Some(threshold) = ability.threshold() {
                if !(threshold > 0.0 && threshold <= 1.0) {
                    return Err(ConfigError::Invalid(format!(
                        "{:?} threshold {} must be in (0, 1]",
                        key, threshold
                    )));
                }
            }
            if ability.cost < 0.0 {
                return Err(ConfigError::Invalid(format!("{:?} has a negative cost", key)));
            }
            if let Some(summon) = &ability.summon {
                if self.follower(summon).is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "{:?} summons unknown follower '{}'",
                        key, summon
                    )));
                }
            }
        }

        for (class, definition) in &self.classes {
            if definition.stats.hp <= 0.0 {
                return Err(ConfigError::Invalid(format!("{:?} has no health", class)));
            }
            if !(0.0..=1.0).contains(&definition.stats.evasion) {
                return Err(ConfigError::Invalid(format!(
                    "{:?} evasion {} out of range",
                    class, definition.stats.evasion
                )));
            }
        }

        if self.pet().is_none() {
            return Err(ConfigError::Invalid(format!(
                "pet template '{}' is not a known follower",
                self.pet
            )));
        }

        if self.ladder.names.is_empty() {
            return Err(ConfigError::Invalid("ladder needs at least one name".to_string()));
        }

        Ok(())
    }
}

/// Load the catalog from assets/config/classes.ron
pub fn load_class_catalog() -> Result<ClassCatalog, ConfigError> {
    load_class_catalog_from(Path::new(CATALOG_PATH))
}

/// Load the catalog from an explicit path
pub fn load_class_catalog_from(path: &Path) -> Result<ClassCatalog, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let catalog = ClassCatalog::from_ron_str(&contents)?;

    info!(
        "Loaded {} classes and {} abilities from {}",
        catalog.classes.len(),
        catalog.abilities.len(),
        path.display()
    );

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = ClassCatalog::builtin().expect("builtin catalog should parse");
        for class in HeroClass::all() {
            assert!(catalog.class(*class).is_some(), "{:?} missing", class);
        }
    }

    #[test]
    fn test_reference_values() {
        let catalog = ClassCatalog::builtin().unwrap();

        let chain = catalog.get_unchecked(AbilityKey::ChainLightning);
        assert_eq!(chain.damage, 260.0);
        assert_eq!(chain.cooldown_ms, 5000);
        assert_eq!(chain.cost, 40.0);

        let bolt = catalog.get_unchecked(AbilityKey::LightningBolt);
        assert_eq!(bolt.damage, 140.0);
        assert_eq!(bolt.cooldown_ms, 2200);

        let shield = catalog.get_unchecked(AbilityKey::StaticShield);
        assert_eq!(shield.effects[0].magnitude, 380.0);

        let storm = catalog.get_unchecked(AbilityKey::Thunderstorm);
        assert_eq!(storm.hits, 5);
        assert_eq!(storm.damage, 200.0);
        assert_eq!(storm.threshold(), Some(0.25));

        let step = catalog.get_unchecked(AbilityKey::ShadowStep);
        assert_eq!(step.cost, 25.0);
        assert_eq!(step.cooldown_ms, 3500);

        let rain = catalog.get_unchecked(AbilityKey::RainOfFire);
        assert_eq!(rain.threshold(), Some(0.2));

        let berserker = catalog.get_unchecked(AbilityKey::Berserker);
        assert_eq!(berserker.threshold(), Some(0.3));
    }

    #[test]
    fn test_ultimates_are_single_use() {
        let catalog = ClassCatalog::builtin().unwrap();
        for key in AbilityKey::all() {
            let ability = catalog.get_unchecked(*key);
            if ability.is_ultimate() {
                assert!(ability.single_use, "{:?} ultimate should be single-use", key);
            }
        }
    }

    #[test]
    fn test_missing_pet_fails_validation() {
        let broken = BUILTIN_CATALOG.replace("pet: \"Hunting Hound\"", "pet: \"Nobody\"");
        let result = ClassCatalog::from_ron_str(&broken);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
