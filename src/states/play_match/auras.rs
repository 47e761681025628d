//! Status Effect Engine
//!
//! Owns the per-hero effect map and everything that reads it:
//! - Applying, refreshing and expiring effects
//! - Folding active effects into derived stats (attack speed, evasion, damage multipliers)
//! - Follow-ups that run when an effect expires (Bloodlust heal, Death Mark detonation,
//!   Last Stand heal)
//!
//! ## Fold order
//! Every derived stat starts from the base stat, adds flat bonuses, then applies all
//! percentage multipliers as one compounded product. Iteration goes through a
//! `BTreeMap`, so the product is computed in the same order every time.

use bevy::math::Vec2;
use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::combat::log::CombatLogEventType;
use crate::states::match_config::Side;

use super::abilities::AbilityKey;
use super::components::auras::{ActiveEffect, EffectKind, EffectSpec, StatModifiers, Zone};
use super::components::Hero;
use super::constants::*;
use super::utils::{combatant_id, pair_mut, CombatEnv};

// ============================================================================
// Effect Map
// ============================================================================

/// All timed effects on one hero. At most one instance per `EffectKind`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveEffects {
    effects: BTreeMap<EffectKind, ActiveEffect>,
}

impl ActiveEffects {
    /// Present and not yet past its end timestamp
    pub fn is_active(&self, kind: EffectKind, now: u64) -> bool {
        self.get_active(kind, now).is_some()
    }

    pub fn get(&self, kind: EffectKind) -> Option<&ActiveEffect> {
        self.effects.get(&kind)
    }

    pub fn get_active(&self, kind: EffectKind, now: u64) -> Option<&ActiveEffect> {
        self.effects.get(&kind).filter(|effect| now < effect.end_ms)
    }

    pub fn get_mut(&mut self, kind: EffectKind) -> Option<&mut ActiveEffect> {
        self.effects.get_mut(&kind)
    }

    /// Apply or refresh an effect. The end timestamp always becomes
    /// `now + duration_ms` and magnitude overwrites; only kinds that carry
    /// stored damage keep their accumulator across a refresh.
    pub fn apply(
        &mut self,
        kind: EffectKind,
        now: u64,
        duration_ms: u64,
        magnitude: f32,
        modifiers: StatModifiers,
    ) -> &mut ActiveEffect {
        let end_ms = now + duration_ms;
        let effect = self
            .effects
            .entry(kind)
            .or_insert_with(|| ActiveEffect::new(end_ms, magnitude));
        effect.end_ms = end_ms;
        effect.magnitude = magnitude;
        effect.modifiers = modifiers;
        effect.zone = None;
        if !kind.carries_stored() {
            effect.stored = 0.0;
        }
        effect
    }

    pub fn remove(&mut self, kind: EffectKind) -> Option<ActiveEffect> {
        self.effects.remove(&kind)
    }

    /// Remove every effect with `now >= end_ms`, returned in declaration order.
    pub fn expire(&mut self, now: u64) -> Vec<(EffectKind, ActiveEffect)> {
        let expired: Vec<EffectKind> = self
            .effects
            .iter()
            .filter(|(_, effect)| now >= effect.end_ms)
            .map(|(kind, _)| *kind)
            .collect();

        expired
            .into_iter()
            .filter_map(|kind| self.effects.remove(&kind).map(|effect| (kind, effect)))
            .collect()
    }

    pub fn iter_active(&self, now: u64) -> impl Iterator<Item = (EffectKind, &ActiveEffect)> {
        self.effects
            .iter()
            .filter(move |(_, effect)| now < effect.end_ms)
            .map(|(kind, effect)| (*kind, effect))
    }

    /// Add HP damage taken while Death Mark is active to its accumulator
    pub fn store_marked_damage(&mut self, amount: f32, now: u64) {
        if let Some(mark) = self.effects.get_mut(&EffectKind::DeathMark) {
            if now < mark.end_ms {
                mark.stored += amount;
            }
        }
    }

    /// Add damage dealt while Bloodlust is active to its accumulator
    pub fn store_bloodlust_damage(&mut self, amount: f32, now: u64) {
        if let Some(bloodlust) = self.effects.get_mut(&EffectKind::Bloodlust) {
            if now < bloodlust.end_ms {
                bloodlust.stored += amount;
            }
        }
    }

    pub fn any_ultimate_active(&self, now: u64) -> bool {
        self.iter_active(now).any(|(kind, _)| kind.is_ultimate_window())
    }

    /// Number of stored effect instances (expired-but-unprocessed included)
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

// ============================================================================
// Derived Stats
// ============================================================================

/// What the fold functions need to know about the other side of the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surroundings {
    pub now: u64,
    pub opponent_position: Vec2,
    pub opponent_bleeds: usize,
}

impl Surroundings {
    pub fn facing(opponent: &Hero, now: u64) -> Self {
        Self {
            now,
            opponent_position: opponent.position,
            opponent_bleeds: opponent.bleed_stacks(),
        }
    }
}

/// Rage multipliers (damage, attack speed) from missing health.
/// Recomputed from the current health fraction every time they are read.
pub fn rage_multipliers(hero: &Hero) -> (f32, f32) {
    let missing = hero.missing_health_fraction().clamp(0.0, 1.0);
    (
        1.0 + hero.scaling.rage_damage * missing,
        1.0 + hero.scaling.rage_attack_speed * missing,
    )
}

/// Auto-attacks per second after every active modifier. Zero while stunned.
pub fn effective_attack_speed(hero: &Hero, env: &Surroundings) -> f32 {
    if hero.is_stunned(env.now) {
        return 0.0;
    }

    let scaling = &hero.scaling;
    let (_, rage_speed) = rage_multipliers(hero);
    let mut product = (1.0 + scaling.cast_speed)
        * (1.0 + hero.combo * scaling.combo_attack_speed)
        * rage_speed;

    for (kind, effect) in hero.effects.iter_active(env.now) {
        product *= (1.0 + effect.modifiers.attack_speed).max(0.0);
        if kind == EffectKind::Bloodlust {
            product *= 1.0 + effect.magnitude * env.opponent_bleeds as f32;
        }
    }

    (hero.stats.attack_speed * product).max(0.0)
}

/// Chance to evade an incoming auto-attack.
pub fn effective_evasion(hero: &Hero, env: &Surroundings) -> f32 {
    if hero.effects.is_active(EffectKind::RainOfFire, env.now) {
        return 1.0;
    }

    let mut evasion = hero.stats.evasion;
    for (kind, effect) in hero.effects.iter_active(env.now) {
        evasion += effect.modifiers.evasion;
        if kind == EffectKind::SmokeBomb {
            let inside = effect
                .zone
                .map(|zone| zone.contains(env.opponent_position))
                .unwrap_or(true);
            if inside {
                evasion += effect.magnitude;
            }
        }
    }

    evasion.clamp(0.0, EVASION_CAP)
}

/// Multiplier on everything the hero deals (charge, rage, ultimates, buffs).
pub fn outgoing_damage_multiplier(hero: &Hero, now: u64) -> f32 {
    damage_multiplier(hero, now, 0.0)
}

/// Multiplier on spells. The spell damage bonus adds to the charge bonus
/// instead of compounding with it.
pub fn spell_damage_multiplier(hero: &Hero, now: u64) -> f32 {
    damage_multiplier(hero, now, hero.scaling.spell_damage)
}

fn damage_multiplier(hero: &Hero, now: u64, flat_bonus: f32) -> f32 {
    let (rage_damage, _) = rage_multipliers(hero);
    let mut product = (1.0 + flat_bonus + hero.charge as f32 * hero.scaling.charge_damage) * rage_damage;
    for (_, effect) in hero.effects.iter_active(now) {
        product *= (1.0 + effect.modifiers.damage).max(0.0);
    }
    product
}

/// Multiplier on everything the hero takes (Shocked, Vulnerable).
pub fn damage_taken_multiplier(hero: &Hero, now: u64) -> f32 {
    hero.effects
        .iter_active(now)
        .map(|(_, effect)| (1.0 + effect.modifiers.damage_taken).max(0.0))
        .product()
}

/// Fraction of dealt damage returned to the attacker as health.
pub fn lifesteal_fraction(hero: &Hero, now: u64) -> f32 {
    hero.scaling.lifesteal
        + hero
            .effects
            .iter_active(now)
            .map(|(_, effect)| effect.modifiers.lifesteal)
            .sum::<f32>()
}

// ============================================================================
// Applying Effects
// ============================================================================

/// Apply one catalog effect spec to `target`.
///
/// `anchor` is where zone effects are centred (the caster's position).
/// Returns false when the effect was resisted or ignored.
pub fn apply_effect_spec(
    target: &mut Hero,
    spec: &EffectSpec,
    anchor: Vec2,
    opponent_bleeds: usize,
    env: &mut CombatEnv,
) -> bool {
    let now = env.now;
    let mut magnitude = spec.magnitude;
    let mut modifiers = spec.modifiers;
    if spec.per_bleed {
        magnitude *= opponent_bleeds as f32;
    }

    match spec.kind {
        EffectKind::Stun => {
            if target.is_stealthed(now) || !target.is_alive() {
                return false;
            }
            if env.rng.roll(target.scaling.stun_resist) {
                env.log.log(
                    CombatLogEventType::Stun,
                    format!("{} resists the stun!", target.name),
                );
                return false;
            }
        }
        EffectKind::Slow => {
            // Slow is carried as a negative attack speed contribution
            let slow = magnitude * (1.0 - target.scaling.slow_resist);
            modifiers.attack_speed = -slow.clamp(0.0, 1.0);
            magnitude = slow;
        }
        _ => {}
    }

    let effect = target
        .effects
        .apply(spec.kind, now, spec.duration_ms, magnitude, modifiers);
    if spec.radius > 0.0 {
        effect.zone = Some(Zone {
            center: anchor,
            radius: spec.radius,
        });
    }

    match spec.kind {
        EffectKind::Stun => env.log.log(
            CombatLogEventType::Stun,
            format!("{} STUNNED {}ms!", target.name, spec.duration_ms),
        ),
        EffectKind::Shocked => env.log.log(
            CombatLogEventType::Shock,
            format!("{} is shocked", target.name),
        ),
        EffectKind::Stealth => env.log.log(
            CombatLogEventType::StealthEnter,
            format!("{} vanishes into the shadows", target.name),
        ),
        EffectKind::Slow => debug!(
            "{} slowed by {:.0}% for {}ms",
            target.name,
            magnitude * 100.0,
            spec.duration_ms
        ),
        _ => {}
    }
    true
}

// ============================================================================
// Expiry
// ============================================================================

/// Expire every effect that ended at or before `env.now` and run its follow-up.
/// Left is processed before Right; within a hero, effects run in declaration order.
pub fn process_expirations(heroes: &mut [Hero; 2], env: &mut CombatEnv) {
    let now = env.now;
    for side in Side::BOTH {
        let expired = heroes[side.index()].effects.expire(now);
        for (kind, effect) in expired {
            let (hero, opponent) = pair_mut(heroes, side);
            match kind {
                EffectKind::Bloodlust => {
                    let fraction = env.catalog.get_unchecked(AbilityKey::Bloodlust).heal_fraction;
                    let healed = hero.restore_health(effect.stored * fraction);
                    if healed > 0.0 {
                        let id = combatant_id(hero);
                        env.log.log_heal(
                            id.clone(),
                            id,
                            "Bloodlust".to_string(),
                            healed,
                            format!("Bloodlust heal {}", healed.round()),
                        );
                    }
                }
                EffectKind::DeathMark => {
                    let burst = effect.stored * effect.magnitude;
                    if burst > 0.0 {
                        let loss = hero.take_health(burst, now);
                        opponent.damage_dealt += loss.lost;
                        env.log.log(
                            CombatLogEventType::Ultimate,
                            format!("Death Mark pops {}!", loss.lost.round()),
                        );
                        if loss.died {
                            report_death(hero, env);
                        }
                    }
                }
                EffectKind::LastStand => {
                    let fraction = env.catalog.get_unchecked(AbilityKey::LastStand).heal_fraction;
                    let healed = hero.restore_health(hero.max_health * fraction);
                    if healed > 0.0 {
                        env.log.log(
                            CombatLogEventType::Heal,
                            format!("{} Last Stand ends, heals {}", hero.name, healed.round()),
                        );
                    }
                }
                EffectKind::Thunderstorm => {
                    hero.strikes = None;
                }
                EffectKind::Shield => {
                    debug!("{} shield fades with {:.0} left", hero.name, effect.magnitude);
                }
                _ => {}
            }
        }
    }
}

/// Log a hero's death. Callers only invoke this on the death transition.
pub fn report_death(hero: &Hero, env: &mut CombatEnv) {
    env.log.log(
        CombatLogEventType::Death,
        format!("{} has been defeated!", hero.name),
    );
    info!("{} died at {}ms", combatant_id(hero), env.now);
    env.fallen.push(hero.side);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::log::CombatLog;
    use crate::states::match_config::HeroClass;
    use crate::states::play_match::ability_config::ClassCatalog;
    use crate::states::play_match::components::GameRng;

    fn pair(catalog: &ClassCatalog) -> [Hero; 2] {
        [
            Hero::from_class(HeroClass::Assassin, Side::Left, catalog).unwrap(),
            Hero::from_class(HeroClass::Barbarian, Side::Right, catalog).unwrap(),
        ]
    }

    #[test]
    fn test_is_active_ends_exactly_at_end_timestamp() {
        let mut effects = ActiveEffects::default();
        effects.apply(EffectKind::Stun, 1000, 450, 0.0, StatModifiers::default());
        assert!(effects.is_active(EffectKind::Stun, 1449));
        assert!(!effects.is_active(EffectKind::Stun, 1450));
    }

    #[test]
    fn test_reapply_refreshes_single_instance() {
        let mut effects = ActiveEffects::default();
        effects.apply(EffectKind::Slow, 0, 1000, 0.25, StatModifiers::default());
        effects.apply(EffectKind::Slow, 500, 1000, 0.1, StatModifiers::default());
        assert_eq!(effects.len(), 1);
        let slow = effects.get(EffectKind::Slow).unwrap();
        assert_eq!(slow.end_ms, 1500);
        assert_eq!(slow.magnitude, 0.1, "Magnitude overwrites on refresh");
    }

    #[test]
    fn test_death_mark_keeps_stored_on_refresh() {
        let mut effects = ActiveEffects::default();
        effects.apply(EffectKind::DeathMark, 0, 3500, 0.9, StatModifiers::default());
        effects.store_marked_damage(400.0, 100);
        effects.apply(EffectKind::DeathMark, 200, 3500, 0.9, StatModifiers::default());
        assert_eq!(effects.get(EffectKind::DeathMark).unwrap().stored, 400.0);
    }

    #[test]
    fn test_expire_returns_declaration_order() {
        let mut effects = ActiveEffects::default();
        effects.apply(EffectKind::LastStand, 0, 100, 0.0, StatModifiers::default());
        effects.apply(EffectKind::Stun, 0, 100, 0.0, StatModifiers::default());
        effects.apply(EffectKind::Bloodlust, 0, 100, 0.0, StatModifiers::default());
        effects.apply(EffectKind::Shield, 0, 5000, 380.0, StatModifiers::default());

        let expired: Vec<EffectKind> = effects.expire(100).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            expired,
            vec![EffectKind::Stun, EffectKind::Bloodlust, EffectKind::LastStand]
        );
        assert!(effects.is_active(EffectKind::Shield, 100));
    }

    #[test]
    fn test_stunned_attack_speed_is_zero() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut heroes = pair(&catalog);
        heroes[1]
            .effects
            .apply(EffectKind::Stun, 0, 450, 0.0, StatModifiers::default());
        let env = Surroundings::facing(&heroes[0], 10);
        assert_eq!(effective_attack_speed(&heroes[1], &env), 0.0);
    }

    #[test]
    fn test_combo_raises_attack_speed() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut heroes = pair(&catalog);
        let env = Surroundings::facing(&heroes[1], 0);
        let base = effective_attack_speed(&heroes[0], &env);
        heroes[0].combo = 5.0;
        let boosted = effective_attack_speed(&heroes[0], &env);
        assert!((boosted / base - 1.30).abs() < 1e-4, "5 combo = +30% attack speed");
    }

    #[test]
    fn test_rage_scales_with_missing_health() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut heroes = pair(&catalog);
        let barbarian = &mut heroes[1];
        assert_eq!(rage_multipliers(barbarian), (1.0, 1.0));
        barbarian.current_health = barbarian.max_health * 0.5;
        let (damage, speed) = rage_multipliers(barbarian);
        assert!((damage - 1.225).abs() < 1e-4);
        assert!((speed - 1.175).abs() < 1e-4);
    }

    #[test]
    fn test_smoke_bomb_only_counts_inside_zone() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut heroes = pair(&catalog);
        heroes[0].stats.evasion = 0.0;
        let anchor = heroes[0].position;
        let effect = heroes[0].effects.apply(
            EffectKind::SmokeBomb,
            0,
            4000,
            0.45,
            StatModifiers::default(),
        );
        effect.zone = Some(Zone {
            center: anchor,
            radius: 120.0,
        });

        let far = Surroundings::facing(&heroes[1], 0);
        assert_eq!(effective_evasion(&heroes[0], &far), 0.0);

        heroes[1].position.x = anchor.x + 60.0;
        let near = Surroundings::facing(&heroes[1], 0);
        assert!((effective_evasion(&heroes[0], &near) - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_slow_respects_slow_resist() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut heroes = pair(&catalog);
        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        let war_cry = catalog.get_unchecked(AbilityKey::WarCry).effects[0].clone();
        let anchor = heroes[0].position;
        apply_effect_spec(&mut heroes[1], &war_cry, anchor, 0, &mut env);
        let slow = heroes[1].effects.get(EffectKind::Slow).unwrap();
        assert!((slow.magnitude - 0.15).abs() < 1e-6, "Barbarian ignores 40% of slows");
        assert!((slow.modifiers.attack_speed + 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_death_mark_detonates_and_resets() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut heroes = pair(&catalog);
        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();

        heroes[1]
            .effects
            .apply(EffectKind::DeathMark, 0, 3500, 0.9, StatModifiers::default());
        heroes[1].effects.store_marked_damage(300.0, 100);
        heroes[1].effects.store_marked_damage(200.0, 900);
        let before = heroes[1].current_health;

        let mut env = CombatEnv::new(3500, &mut rng, &mut log, &catalog);
        process_expirations(&mut heroes, &mut env);

        assert!((before - heroes[1].current_health - 450.0).abs() < 1e-3);
        assert!(heroes[1].effects.get(EffectKind::DeathMark).is_none());
        assert_eq!(log.filter_by_type(CombatLogEventType::Ultimate).len(), 1);
    }
}
