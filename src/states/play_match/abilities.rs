//! Ability System
//!
//! Validates and executes hero abilities. Ability data (costs, cooldowns,
//! damage, effects) is loaded from `assets/config/classes.ron` via the
//! `ability_config` module; this module owns the key enum, the precondition
//! checks and the execution of each declared effect.
//!
//! ## Preconditions (in order)
//! 1. Caster alive and not stunned
//! 2. Ability in the caster's kit
//! 3. Off cooldown
//! 4. Not already spent (single-use)
//! 5. Enough resource and charge
//! 6. Health threshold (ultimates), then range
//!
//! A rejected cast mutates nothing.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::log::CombatLogEventType;
use crate::error::ActionRejection;
use crate::states::match_config::Side;

use super::ability_config::{AbilityConfig, AbilityMovement, ClassCatalog};
use super::auras::apply_effect_spec;
use super::combat_core::{damage_follower, resolve_ability_hit};
use super::components::auras::{EffectKind, EffectSpec, EffectTarget};
use super::components::{Hero, StrikeSequence};
use super::constants::*;
use super::followers::spawn_follower;
use super::projectiles::TargetRef;
use super::utils::{combatant_id, gap, pair_mut, CombatEnv};

/// Every ability in the catalog.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum AbilityKey {
    // Wizard
    ChainLightning,
    LightningBolt,
    StaticShield,
    Thunderstorm,
    // Ranger
    HuntersMark,
    Bloodlust,
    SummonPet,
    RainOfFire,
    // Assassin
    ShadowStep,
    Envenom,
    SmokeBomb,
    DeathMark,
    // Barbarian
    Charge,
    WarCry,
    Berserker,
    // Custom build pool
    Riposte,
    Thorns,
    ExposeWeakness,
    Ignite,
    LastStand,
    PrimalFury,
}

impl AbilityKey {
    pub fn all() -> &'static [AbilityKey] {
        &[
            AbilityKey::ChainLightning,
            AbilityKey::LightningBolt,
            AbilityKey::StaticShield,
            AbilityKey::Thunderstorm,
            AbilityKey::HuntersMark,
            AbilityKey::Bloodlust,
            AbilityKey::SummonPet,
            AbilityKey::RainOfFire,
            AbilityKey::ShadowStep,
            AbilityKey::Envenom,
            AbilityKey::SmokeBomb,
            AbilityKey::DeathMark,
            AbilityKey::Charge,
            AbilityKey::WarCry,
            AbilityKey::Berserker,
            AbilityKey::Riposte,
            AbilityKey::Thorns,
            AbilityKey::ExposeWeakness,
            AbilityKey::Ignite,
            AbilityKey::LastStand,
            AbilityKey::PrimalFury,
        ]
    }
}

/// A request to use an ability, from a human queue or an AI policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionIntent {
    pub ability: AbilityKey,
    /// Damage abilities may aim at an enemy follower instead of the hero
    pub target: Option<TargetRef>,
}

impl ActionIntent {
    pub fn new(ability: AbilityKey) -> Self {
        Self {
            ability,
            target: None,
        }
    }

    pub fn at(ability: AbilityKey, target: TargetRef) -> Self {
        Self {
            ability,
            target: Some(target),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check every precondition for `caster` using `ability` against `opponent`.
pub fn validate_cast(
    caster: &Hero,
    opponent: &Hero,
    ability: AbilityKey,
    catalog: &ClassCatalog,
    now: u64,
) -> Result<(), ActionRejection> {
    if !caster.is_alive() {
        return Err(ActionRejection::Dead);
    }
    if caster.is_stunned(now) {
        return Err(ActionRejection::Stunned);
    }

    let (Some(slot), Some(config)) = (caster.slot(ability), catalog.get(ability)) else {
        return Err(ActionRejection::UnknownAbility(ability));
    };

    if slot.remaining_ms > 0 {
        return Err(ActionRejection::OnCooldown {
            ability,
            remaining_ms: slot.remaining_ms,
        });
    }
    if config.single_use && slot.used {
        return Err(ActionRejection::AlreadyUsed(ability));
    }

    let available = caster.resource_amount();
    if config.cost > 0.0 && available < config.cost {
        return Err(ActionRejection::InsufficientResource {
            ability,
            needed: config.cost,
            available,
        });
    }
    if caster.charge < config.min_charge {
        return Err(ActionRejection::InsufficientResource {
            ability,
            needed: config.min_charge as f32,
            available: caster.charge as f32,
        });
    }

    if let Some(threshold) = config.threshold() {
        if caster.health_fraction() > threshold {
            return Err(ActionRejection::ThresholdNotMet {
                ability,
                threshold: threshold * 100.0,
            });
        }
    }

    let distance = gap(caster, opponent);
    let too_far = config
        .range
        .map(|range| distance > range + RANGE_TOLERANCE)
        .unwrap_or(false);
    if too_far || distance < config.min_range {
        return Err(ActionRejection::OutOfRange { ability, distance });
    }

    Ok(())
}

// ============================================================================
// Execution
// ============================================================================

/// Validate, pay for and execute an ability for `side`.
pub fn cast(
    heroes: &mut [Hero; 2],
    side: Side,
    intent: ActionIntent,
    env: &mut CombatEnv,
) -> Result<(), ActionRejection> {
    let now = env.now;
    let catalog = env.catalog;
    {
        let (caster, opponent) = pair_mut(heroes, side);
        validate_cast(caster, opponent, intent.ability, catalog, now)?;
    }
    let config = catalog.get_unchecked(intent.ability);

    let (caster, opponent) = pair_mut(heroes, side);
    commit(caster, intent.ability, config);

    if config.is_ultimate() {
        env.log.log(
            CombatLogEventType::Ultimate,
            format!("{} unleashes {}!", caster.name, config.name),
        );
        info!("{} activates {} at {}ms", combatant_id(caster), config.name, now);
    } else {
        env.log.log(
            CombatLogEventType::SpellCast,
            format!("{} casts {}", caster.name, config.name),
        );
    }

    execute(caster, opponent, intent, config, env);
    Ok(())
}

/// Pay the cost and start the cooldown
fn commit(caster: &mut Hero, ability: AbilityKey, config: &AbilityConfig) {
    if config.cost > 0.0 {
        if let Some(pool) = caster.resource.as_mut() {
            let paid = pool.spend(config.cost);
            debug_assert!(paid, "commit: validated cast could not pay {}", config.cost);
        }
    }
    if let Some(slot) = caster.slots.get_mut(&ability) {
        slot.remaining_ms = config.cooldown_ms;
        slot.used |= config.single_use;
        slot.uses += 1;
    }
}

fn execute(
    caster: &mut Hero,
    opponent: &mut Hero,
    intent: ActionIntent,
    config: &AbilityConfig,
    env: &mut CombatEnv,
) {
    let now = env.now;

    if let Some(movement) = config.movement {
        move_caster(caster, opponent, movement);
    }

    // Direct damage (periodic hits run through `process_strikes`)
    let mut landed = true;
    if config.is_damage() && config.hits == 0 {
        match intent.target {
            Some(TargetRef::Follower(id)) if opponent.follower_mut(id).is_some() => {
                damage_follower(caster, opponent, id, config.damage, &config.name, env);
            }
            _ => {
                let report =
                    resolve_ability_hit(caster, opponent, config.damage, config.spell, &config.name, env);
                landed = !report.evaded;
                if landed && config.bounce > 0.0 {
                    bounce_to_follower(caster, opponent, config, env);
                }
            }
        }
    }

    if config.charge_gain > 0 {
        caster.gain_charge(config.charge_gain);
    }
    if config.fill_combo {
        caster.combo = caster.scaling.max_combo;
    } else if config.combo_gain > 0.0 {
        caster.gain_combo(config.combo_gain);
    }

    let bleeds = opponent.bleed_stacks();
    for spec in &config.effects {
        match spec.target {
            EffectTarget::Caster => {
                let spec = scaled_spec(caster, spec);
                let anchor = caster.position;
                apply_effect_spec(caster, &spec, anchor, bleeds, env);
            }
            EffectTarget::Opponent if landed && opponent.is_alive() => {
                apply_effect_spec(opponent, spec, caster.position, bleeds, env);
            }
            EffectTarget::Opponent => {}
        }
    }
    if landed && opponent.is_alive() {
        let cap = caster.scaling.dot_stack_cap;
        for kind in &config.dots {
            opponent.add_dot(*kind, now, cap);
        }
    }

    if config.hits > 0 {
        caster.strikes = Some(StrikeSequence {
            ability: intent.ability,
            remaining: config.hits,
            timer_ms: config.interval_ms,
        });
    }

    if let Some(name) = &config.summon {
        summon(caster, name, env);
    }

    debug!("{} resolved {} at {}ms", combatant_id(caster), config.name, now);
}

/// Riposte's counter scales with the caster's damage and evasion
fn scaled_spec(caster: &Hero, spec: &EffectSpec) -> EffectSpec {
    let mut spec = spec.clone();
    if spec.kind == EffectKind::Riposte && spec.magnitude <= 0.0 {
        spec.magnitude = caster.stats.base_damage * 0.8 + caster.stats.evasion * 400.0;
    }
    spec
}

fn move_caster(caster: &mut Hero, opponent: &Hero, movement: AbilityMovement) {
    let direction = if opponent.position.x >= caster.position.x { 1.0 } else { -1.0 };
    let x = match movement {
        AbilityMovement::BehindTarget => opponent.position.x + direction * SHADOW_STEP_OFFSET,
        AbilityMovement::ToTarget => opponent.position.x - direction * CHARGE_STOP_DISTANCE,
    };
    caster.position.x = x.clamp(ARENA_MIN_X, ARENA_MAX_X);
    caster.facing = if opponent.position.x >= caster.position.x { 1 } else { -1 };
}

/// Part of the hit arcs to the nearest enemy follower
fn bounce_to_follower(caster: &mut Hero, opponent: &mut Hero, config: &AbilityConfig, env: &mut CombatEnv) {
    let origin = opponent.position.x;
    let nearest = opponent
        .living_followers()
        .map(|f| (f.id, (f.position.x - origin).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id);
    if let Some(id) = nearest {
        let label = format!("{} (bounce)", config.name);
        damage_follower(caster, opponent, id, config.damage * config.bounce, &label, env);
    }
}

fn summon(caster: &mut Hero, name: &str, env: &mut CombatEnv) {
    let Some(template) = env.catalog.follower(name) else {
        warn!("{} tried to summon unknown follower '{}'", caster.name, name);
        return;
    };
    let is_pet = env.catalog.pet().map(|pet| pet.name == name).unwrap_or(false);
    if is_pet {
        // A new pet replaces the old one
        caster.followers.retain(|f| !f.is_pet);
    }
    spawn_follower(caster, template, is_pet);
    env.log.log(
        CombatLogEventType::Summon,
        format!("{} summons {}!", caster.name, template.name),
    );
}

// ============================================================================
// Periodic Hits
// ============================================================================

/// Run pending ultimate strikes (Thunderstorm) for both heroes.
pub fn process_strikes(heroes: &mut [Hero; 2], dt_ms: u64, env: &mut CombatEnv) {
    for side in Side::BOTH {
        let (caster, opponent) = pair_mut(heroes, side);
        let Some(mut strikes) = caster.strikes.take() else {
            continue;
        };
        if !caster.is_alive() || !opponent.is_alive() {
            continue;
        }

        strikes.timer_ms = strikes.timer_ms.saturating_sub(dt_ms);
        if strikes.timer_ms == 0 && strikes.remaining > 0 {
            let Some(config) = env.catalog.get(strikes.ability) else {
                continue;
            };
            let report =
                resolve_ability_hit(caster, opponent, config.damage, config.spell, &config.name, env);

            let heal = report.dealt * config.heal_fraction;
            if heal > 0.0 {
                let healed = caster.restore_health(heal);
                if healed > 0.0 {
                    let id = combatant_id(caster);
                    env.log.log_heal(
                        id.clone(),
                        id,
                        config.name.clone(),
                        healed,
                        format!("{} +{}", caster.name, healed.round()),
                    );
                }
            }
            if !report.evaded && opponent.is_alive() {
                let bleeds = opponent.bleed_stacks();
                for spec in &config.hit_effects {
                    apply_effect_spec(opponent, spec, caster.position, bleeds, env);
                }
            }

            strikes.remaining -= 1;
            strikes.timer_ms = config.interval_ms;
        }

        if strikes.remaining > 0 {
            caster.strikes = Some(strikes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::log::CombatLog;
    use crate::states::match_config::HeroClass;
    use crate::states::play_match::components::auras::DotKind;
    use crate::states::play_match::components::GameRng;

    fn setup(left: HeroClass, right: HeroClass) -> (ClassCatalog, [Hero; 2]) {
        let catalog = ClassCatalog::builtin().unwrap();
        let heroes = [
            Hero::from_class(left, Side::Left, &catalog).unwrap(),
            Hero::from_class(right, Side::Right, &catalog).unwrap(),
        ];
        (catalog, heroes)
    }

    #[test]
    fn test_every_key_is_in_the_catalog() {
        let catalog = ClassCatalog::builtin().unwrap();
        for key in AbilityKey::all() {
            assert!(catalog.get(*key).is_some(), "{:?} missing from catalog", key);
        }
        assert_eq!(AbilityKey::all().len(), 21);
    }

    #[test]
    fn test_lightning_bolt_goes_on_cooldown() {
        let (catalog, mut heroes) = setup(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[1].position.x = heroes[0].position.x + 300.0;
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        let mana = heroes[0].resource_amount();
        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::LightningBolt), &mut env).unwrap();
        assert_eq!(heroes[0].resource_amount(), mana - 20.0);
        assert_eq!(heroes[0].slot(AbilityKey::LightningBolt).unwrap().remaining_ms, 2200);

        let again = cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::LightningBolt), &mut env);
        assert_eq!(
            again,
            Err(ActionRejection::OnCooldown {
                ability: AbilityKey::LightningBolt,
                remaining_ms: 2200
            })
        );

        heroes[0].tick_cooldowns(2200);
        assert!(heroes[0].is_ready(AbilityKey::LightningBolt));
    }

    #[test]
    fn test_rejection_mutates_nothing() {
        let (catalog, mut heroes) = setup(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[0].resource.as_mut().unwrap().current = 10.0;
        let before = heroes.clone();
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        let result = cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::ChainLightning), &mut env);
        assert!(matches!(result, Err(ActionRejection::InsufficientResource { .. })));
        assert_eq!(heroes[0], before[0]);
        assert_eq!(heroes[1], before[1]);
        drop(env);
        assert!(log.entries.is_empty());
    }

    #[test]
    fn test_stunned_hero_cannot_cast() {
        let (catalog, mut heroes) = setup(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[0].effects.apply(
            EffectKind::Stun,
            0,
            450,
            0.0,
            Default::default(),
        );
        let result = validate_cast(&heroes[0], &heroes[1], AbilityKey::StaticShield, &catalog, 100);
        assert_eq!(result, Err(ActionRejection::Stunned));
        let result = validate_cast(&heroes[0], &heroes[1], AbilityKey::StaticShield, &catalog, 450);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_ultimate_needs_threshold_and_is_single_use() {
        let (catalog, mut heroes) = setup(HeroClass::Barbarian, HeroClass::Wizard);
        let result = validate_cast(&heroes[0], &heroes[1], AbilityKey::Berserker, &catalog, 0);
        assert!(matches!(result, Err(ActionRejection::ThresholdNotMet { .. })));

        heroes[0].current_health = heroes[0].max_health * 0.25;
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::Berserker), &mut env).unwrap();
        assert!(heroes[0].effects.is_active(EffectKind::Berserk, 0));

        let again = validate_cast(&heroes[0], &heroes[1], AbilityKey::Berserker, &catalog, 0);
        assert_eq!(again, Err(ActionRejection::AlreadyUsed(AbilityKey::Berserker)));
    }

    #[test]
    fn test_unknown_ability_is_rejected() {
        let (catalog, heroes) = setup(HeroClass::Wizard, HeroClass::Barbarian);
        let result = validate_cast(&heroes[0], &heroes[1], AbilityKey::Charge, &catalog, 0);
        assert_eq!(result, Err(ActionRejection::UnknownAbility(AbilityKey::Charge)));
    }

    #[test]
    fn test_charge_dashes_in_front_of_target() {
        let (catalog, mut heroes) = setup(HeroClass::Barbarian, HeroClass::Wizard);
        heroes[1].position.x = heroes[0].position.x + 300.0;
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        let before = heroes[1].current_health;
        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::Charge), &mut env).unwrap();
        assert!((gap(&heroes[0], &heroes[1]) - CHARGE_STOP_DISTANCE).abs() < 1e-3);
        assert!(heroes[1].current_health < before, "Charge never misses");
    }

    #[test]
    fn test_shadow_step_lands_behind_and_stealths() {
        let (catalog, mut heroes) = setup(HeroClass::Assassin, HeroClass::Wizard);
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::ShadowStep), &mut env).unwrap();
        assert!(heroes[0].position.x > heroes[1].position.x, "Assassin is behind the wizard");
        assert!(heroes[0].is_stealthed(0));
        assert_eq!(heroes[0].combo, 2.0);
    }

    #[test]
    fn test_hunters_mark_slows_per_bleed_then_bleeds() {
        let (catalog, mut heroes) = setup(HeroClass::Ranger, HeroClass::Wizard);
        heroes[1].add_dot(DotKind::Bleed, 0, 8);
        heroes[1].add_dot(DotKind::Bleed, 0, 8);
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::HuntersMark), &mut env).unwrap();

        // Slow counts the two stacks that were there before the mark
        let slow = heroes[1].effects.get(EffectKind::Slow).unwrap().magnitude;
        let expected = 0.02 * (1.0 - heroes[1].scaling.slow_resist);
        assert!((slow - expected).abs() < 1e-6, "slow {}", slow);
        assert_eq!(heroes[1].bleed_stacks(), 3);
        assert!(heroes[0].effects.is_active(EffectKind::HuntersMark, 0));
    }

    #[test]
    fn test_summon_pet_replaces_previous_pet() {
        let (catalog, mut heroes) = setup(HeroClass::Ranger, HeroClass::Barbarian);
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::SummonPet), &mut env).unwrap();
        heroes[0].slots.get_mut(&AbilityKey::SummonPet).unwrap().remaining_ms = 0;
        cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::SummonPet), &mut env).unwrap();
        let pets: Vec<_> = heroes[0].living_followers().filter(|f| f.is_pet).collect();
        assert_eq!(pets.len(), 1);
        assert!(pets[0].goads());
    }

    #[test]
    fn test_thunderstorm_strikes_five_times() {
        let (catalog, mut heroes) = setup(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[0].current_health = heroes[0].max_health * 0.2;
        heroes[1].scaling.spell_resist = 0.0;
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();

        {
            let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
            cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::Thunderstorm), &mut env).unwrap();
        }
        let health_before = heroes[0].current_health;

        let mut now = 0;
        while now < 2500 {
            now += TICK_MS;
            let mut env = CombatEnv::new(now, &mut rng, &mut log, &catalog);
            process_strikes(&mut heroes, TICK_MS, &mut env);
        }
        assert!(heroes[0].strikes.is_none());
        let hits = log
            .entries
            .iter()
            .filter(|e| e.detail.as_ref().map(|d| d.ability == "Thunderstorm").unwrap_or(false))
            .filter(|e| e.event_type == CombatLogEventType::Damage)
            .count();
        assert_eq!(hits, 5);
        assert!(heroes[0].current_health > health_before, "Strikes heal the wizard");
    }

    #[test]
    fn test_first_thunderstorm_strike_waits_one_interval() {
        let (catalog, mut heroes) = setup(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[0].current_health = heroes[0].max_health * 0.2;
        heroes[1].scaling.spell_resist = 0.0;
        heroes[1].stats.evasion = 0.0;
        let interval = catalog.get_unchecked(AbilityKey::Thunderstorm).interval_ms;
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();

        {
            let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
            cast(&mut heroes, Side::Left, ActionIntent::new(AbilityKey::Thunderstorm), &mut env).unwrap();
        }
        let untouched = heroes[1].current_health;

        let mut now = 0;
        while now + TICK_MS < interval {
            now += TICK_MS;
            let mut env = CombatEnv::new(now, &mut rng, &mut log, &catalog);
            process_strikes(&mut heroes, TICK_MS, &mut env);
            assert_eq!(heroes[1].current_health, untouched, "struck early at {}ms", now);
        }

        now += TICK_MS;
        let mut env = CombatEnv::new(now, &mut rng, &mut log, &catalog);
        process_strikes(&mut heroes, TICK_MS, &mut env);
        assert_eq!(now, interval);
        assert!(heroes[1].current_health < untouched);
        assert_eq!(heroes[0].strikes.unwrap().remaining, 4);
    }
}
