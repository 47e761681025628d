//! Combat Core
//!
//! Handles core combat mechanics:
//! - Movement (approach/retreat to preferred range, pet goading)
//! - Auto-attacks (melee resolves immediately, ranged launches a projectile)
//! - Damage resolution (evasion, multipliers, defense, shields, reflects, lifesteal)
//! - Damage over time (bleed, poison, burn)
//!
//! ## Damage pipeline
//! 1. Evasion roll (auto-attacks) or spell dodge roll (spells, evasion x 0.6)
//! 2. Raw damage x attacker multipliers x defense mitigation
//! 3. x defender damage-taken multiplier
//! 4. Shield absorbs first, overflow reaches health
//! 5. Death Mark stores the health damage, Thorns and Riposte answer, lifesteal heals

use bevy::prelude::*;

use crate::combat::log::CombatLogEventType;
use crate::states::match_config::Side;

use super::auras::{
    damage_taken_multiplier, effective_evasion, lifesteal_fraction, outgoing_damage_multiplier,
    report_death, spell_damage_multiplier, Surroundings,
};
use super::components::auras::{DotKind, EffectKind};
use super::components::{GameRng, Hero};
use super::constants::*;
use super::followers::{kill_follower, roll_follower_damage};
use super::projectiles::{Projectile, TargetRef};
use super::utils::{combatant_id, gap, pair_mut, CombatEnv};

// ============================================================================
// Formulas
// ============================================================================

/// Fraction of damage that gets through `defense`. Each 3 defense mitigates 1%, capped at 80%.
pub fn mitigation(defense: f32) -> f32 {
    1.0 - (defense.max(0.0) / DEFENSE_SCALE).min(MAX_MITIGATION)
}

/// Returns true if the attack is evaded.
pub fn roll_evasion(evasion: f32, rng: &mut GameRng) -> bool {
    rng.roll(evasion)
}

/// Outcome of one damage application against a hero
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitReport {
    pub evaded: bool,
    pub absorbed: f32,
    /// Health actually removed
    pub dealt: f32,
    pub died: bool,
}

// ============================================================================
// Incoming Damage
// ============================================================================

/// Apply already-mitigated damage from `attacker` to `defender`.
///
/// Runs the damage-taken multiplier, shield absorption (with reflect), health
/// loss, Death Mark storage, Thorns, Riposte and the attacker's lifesteal.
pub fn apply_incoming_damage(
    attacker: &mut Hero,
    defender: &mut Hero,
    amount: f32,
    label: &str,
    env: &mut CombatEnv,
) -> HitReport {
    debug_assert!(amount >= 0.0, "apply_incoming_damage: negative damage {}", amount);
    let now = env.now;
    let mut report = HitReport::default();
    if !defender.is_alive() {
        return report;
    }

    let mut remaining = amount * damage_taken_multiplier(defender, now);

    // Shield absorbs first
    let mut shield_broken = false;
    let mut reflect = 0.0;
    if let Some(shield) = defender.effects.get_mut(EffectKind::Shield) {
        if now < shield.end_ms && remaining > 0.0 {
            debug_assert!(shield.magnitude >= 0.0, "shield has negative capacity");
            let absorbed = shield.magnitude.min(remaining);
            shield.magnitude -= absorbed;
            remaining -= absorbed;
            report.absorbed = absorbed;
            reflect = shield.modifiers.reflect;
            shield_broken = shield.magnitude <= 0.0;
        }
    }
    if report.absorbed > 0.0 {
        env.log.log(
            CombatLogEventType::Shock,
            format!("Shield {}, reflect {}", report.absorbed.round(), reflect.round()),
        );
        if reflect > 0.0 {
            let loss = attacker.take_health(reflect, now);
            defender.damage_dealt += loss.lost;
            if loss.died {
                report_death(attacker, env);
            }
        }
    }
    if shield_broken {
        defender.effects.remove(EffectKind::Shield);
        env.log.log(CombatLogEventType::SpellCast, "Shield breaks!".to_string());
    }

    if remaining > 0.0 {
        let loss = defender.take_health(remaining, now);
        report.dealt = loss.lost;
        report.died = loss.died;
        defender.effects.store_marked_damage(loss.lost, now);
    }

    attacker.damage_dealt += report.dealt + report.absorbed;
    attacker.effects.store_bloodlust_damage(report.dealt, now);

    env.log.log_damage(
        combatant_id(attacker),
        combatant_id(defender),
        label.to_string(),
        report.dealt,
        format!("{} > {} {}", attacker.name, defender.name, report.dealt.round()),
    );
    if report.died {
        report_death(defender, env);
    }

    if report.dealt > 0.0 && attacker.is_alive() {
        // Thorns returns a share of the health damage
        if let Some(thorns) = defender.effects.get_active(EffectKind::Thorns, now) {
            let returned = report.dealt * thorns.magnitude;
            let loss = attacker.take_health(returned, now);
            defender.damage_dealt += loss.lost;
            if loss.lost > 0.0 {
                env.log.log_damage(
                    combatant_id(defender),
                    combatant_id(attacker),
                    "Thorns".to_string(),
                    loss.lost,
                    format!("Thorns > {} {}", attacker.name, loss.lost.round()),
                );
            }
            if loss.died {
                report_death(attacker, env);
            }
        }

        // Riposte counters once and is consumed
        if defender.is_alive() && defender.effects.is_active(EffectKind::Riposte, now) {
            if let Some(riposte) = defender.effects.remove(EffectKind::Riposte) {
                let loss = attacker.take_health(riposte.magnitude, now);
                defender.damage_dealt += loss.lost;
                env.log.log_damage(
                    combatant_id(defender),
                    combatant_id(attacker),
                    "Riposte".to_string(),
                    loss.lost,
                    format!("{} ripostes {}!", defender.name, loss.lost.round()),
                );
                if loss.died {
                    report_death(attacker, env);
                }
            }
        }
    }

    // Lifesteal after mitigation
    let steal = report.dealt * lifesteal_fraction(attacker, now);
    if steal > 0.0 {
        let healed = attacker.restore_health(steal);
        if healed > 0.0 {
            debug!("{} lifesteals {:.0}", attacker.name, healed);
        }
    }

    report
}

// ============================================================================
// Ability Hits
// ============================================================================

/// Resolve an ability's direct hit on the enemy hero.
///
/// Spells roll spell dodge, gain the caster's spell damage bonus and can be
/// half-resisted. Physical hits (Charge) always connect.
pub fn resolve_ability_hit(
    caster: &mut Hero,
    target: &mut Hero,
    base_damage: f32,
    spell: bool,
    label: &str,
    env: &mut CombatEnv,
) -> HitReport {
    let now = env.now;
    if spell {
        let dodge = effective_evasion(target, &Surroundings::facing(caster, now)) * SPELL_DODGE_FACTOR;
        if roll_evasion(dodge, env.rng) {
            env.log.log(CombatLogEventType::Miss, format!("{} DODGED!", label));
            return HitReport {
                evaded: true,
                ..HitReport::default()
            };
        }
    }

    let multiplier = if spell {
        spell_damage_multiplier(caster, now)
    } else {
        outgoing_damage_multiplier(caster, now)
    };
    let mut damage = base_damage * multiplier * mitigation(target.stats.defense);
    if spell && env.rng.roll(target.scaling.spell_resist) {
        damage *= SPELL_RESIST_FACTOR;
        env.log.log(
            CombatLogEventType::Miss,
            format!("{} resists {}", target.name, label),
        );
    }

    apply_incoming_damage(caster, target, damage, label, env)
}

/// Damage an enemy follower with a hero's hit. Arena followers take reduced,
/// rounded damage; pets take the full mitigated amount.
pub fn damage_follower(
    attacker: &mut Hero,
    owner: &mut Hero,
    follower_id: u32,
    raw_damage: f32,
    label: &str,
    env: &mut CombatEnv,
) -> f32 {
    let Some(follower) = owner.follower_mut(follower_id) else {
        return 0.0;
    };

    let damage = if follower.is_pet {
        raw_damage * mitigation(follower.defense)
    } else {
        let defense = follower.defense;
        roll_follower_damage(raw_damage * (1.0 - FOLLOWER_DAMAGE_REDUCTION), defense, env)
    };

    let Some(follower) = owner.follower_mut(follower_id) else {
        return 0.0;
    };
    let name = follower.name.clone();
    let died = follower.take_damage(damage);
    attacker.damage_dealt += damage;
    attacker.effects.store_bloodlust_damage(damage, env.now);
    env.log.log_damage(
        combatant_id(attacker),
        name.clone(),
        label.to_string(),
        damage,
        format!("{} > {} {}", attacker.name, name, damage.round()),
    );
    if died {
        kill_follower(owner, follower_id, env);
    }
    damage
}

// ============================================================================
// Auto-Attacks
// ============================================================================

/// Choose what an auto-attack hits: a goading pet in reach, sometimes a nearby
/// arena follower, otherwise the enemy hero.
pub fn pick_attack_target(attacker: &Hero, enemy: &Hero, rng: &mut GameRng) -> TargetRef {
    let reach = attacker.stats.attack_range;
    let hero_distance = gap(attacker, enemy);

    if let Some(pet) = enemy.living_followers().find(|f| f.goads()) {
        let distance = (pet.position.x - attacker.position.x).abs();
        if distance <= reach && distance <= pet.goad_range {
            return TargetRef::Follower(pet.id);
        }
    }

    let nearest = enemy
        .living_followers()
        .filter(|f| !f.is_pet)
        .map(|f| (f.id, (f.position.x - attacker.position.x).abs()))
        .filter(|(_, distance)| *distance <= reach + 20.0)
        .min_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((id, distance)) = nearest {
        if distance < hero_distance * HERO_FOLLOWER_PREFERENCE || rng.roll(HERO_FOLLOWER_DISTRACTION) {
            return TargetRef::Follower(id);
        }
    }

    TargetRef::Hero
}

/// Try to start an auto-attack for `side`. Returns false when the attacker
/// cannot act or nothing is in reach, so the caller retries shortly.
pub fn launch_auto_attack(
    heroes: &mut [Hero; 2],
    side: Side,
    projectiles: &mut Vec<Projectile>,
    env: &mut CombatEnv,
) -> bool {
    let now = env.now;
    let (attacker, enemy) = pair_mut(heroes, side);
    if !attacker.is_alive() || !enemy.is_alive() || attacker.is_stunned(now) {
        return false;
    }

    let distance = gap(attacker, enemy);
    if distance > attacker.stats.attack_range + RANGE_TOLERANCE {
        return false;
    }

    attacker.attack_count += 1;
    let target = pick_attack_target(attacker, enemy, env.rng);
    let target_position = match target {
        TargetRef::Hero => enemy.position,
        TargetRef::Follower(id) => enemy
            .living_followers()
            .find(|f| f.id == id)
            .map(|f| f.position)
            .unwrap_or(enemy.position),
    };

    // Stealth breaks as the attack leaves; the hit keeps the bonus
    let stealth_strike = attacker.is_stealthed(now);
    if stealth_strike {
        attacker.effects.remove(EffectKind::Stealth);
        env.log.log(
            CombatLogEventType::StealthEnter,
            format!("{} breaks stealth!", attacker.name),
        );
    }

    let melee = attacker.attack.is_melee_at(distance, MELEE_RANGE);
    match attacker.attack.projectile() {
        Some(kind) if !melee => {
            let mut projectile =
                Projectile::launch(side, kind, attacker.position, target_position, target);
            projectile.launch_distance = distance;
            projectile.stealth_strike = stealth_strike;
            projectiles.push(projectile);
        }
        _ => {
            resolve_auto_attack(heroes, side, target, false, distance, stealth_strike, env);
        }
    }
    true
}

/// Auto-attack damage spread, drawn only once the hit has connected.
fn roll_variance(attacker: &Hero, rng: &mut GameRng) -> f32 {
    let spread = attacker.scaling.damage_variance;
    if spread > 0.0 {
        1.0 + (rng.random_f32() - 0.5) * 2.0 * spread
    } else {
        1.0
    }
}

/// Resolve a landed auto-attack (melee swing or projectile impact).
pub fn resolve_auto_attack(
    heroes: &mut [Hero; 2],
    side: Side,
    target: TargetRef,
    ranged: bool,
    distance: f32,
    stealth_strike: bool,
    env: &mut CombatEnv,
) {
    let now = env.now;
    let (attacker, enemy) = pair_mut(heroes, side);
    if !enemy.is_alive() {
        return;
    }
    let melee = !ranged;

    let mut damage = attacker.stats.base_damage * outgoing_damage_multiplier(attacker, now);
    if ranged && distance < MELEE_RANGE {
        damage *= RANGED_MELEE_PENALTY;
    }
    if stealth_strike {
        damage *= STEALTH_DAMAGE_MULTIPLIER;
    }
    if melee {
        damage *= 1.0 + attacker.scaling.melee_bonus;
    }

    if let TargetRef::Follower(id) = target {
        let is_pet = enemy.living_followers().any(|f| f.id == id && f.is_pet);
        let raw = if is_pet {
            damage * roll_variance(attacker, env.rng)
        } else {
            attacker.stats.base_damage
        };
        let dealt = damage_follower(attacker, enemy, id, raw, "Attack", env);
        if dealt > 0.0 && is_pet {
            attacker.gain_combo(attacker.scaling.combo_per_hit);
        }
        return;
    }

    // Hunter's Mark makes the next attack unmissable
    let guaranteed = attacker.effects.remove(EffectKind::HuntersMark).is_some();
    let evasion = effective_evasion(enemy, &Surroundings::facing(attacker, now));
    if !guaranteed && roll_evasion(evasion, env.rng) {
        env.log.log(
            CombatLogEventType::Miss,
            format!("{} misses", attacker.name),
        );
        return;
    }

    let damage = damage * roll_variance(attacker, env.rng) * mitigation(enemy.stats.defense);
    apply_incoming_damage(attacker, enemy, damage, "Attack", env);

    // On-hit procs
    attacker.gain_charge(attacker.scaling.charge_per_hit);
    attacker.gain_combo(attacker.scaling.combo_per_hit);
    let cap = attacker.scaling.dot_stack_cap;
    let every = attacker.scaling.bleed_every;
    if every > 0
        && (melee || !attacker.scaling.bleed_melee_only)
        && attacker.attack_count % every == 0
    {
        enemy.add_dot(DotKind::Bleed, now, cap);
    }
    if attacker.effects.is_active(EffectKind::RainOfFire, now) {
        enemy.add_dot(DotKind::Bleed, now, cap);
    }
    if attacker.effects.is_active(EffectKind::Envenom, now)
        || attacker.effects.is_active(EffectKind::PrimalFury, now)
    {
        enemy.add_dot(DotKind::Poison, now, cap);
    }
}

/// Resolve every projectile that landed this tick, in launch order.
pub fn resolve_projectiles(heroes: &mut [Hero; 2], landed: Vec<Projectile>, env: &mut CombatEnv) {
    for projectile in landed {
        if heroes.iter().any(|h| !h.is_alive()) {
            return;
        }
        resolve_auto_attack(
            heroes,
            projectile.owner,
            projectile.target,
            true,
            projectile.launch_distance,
            projectile.stealth_strike,
            env,
        );
    }
}

// ============================================================================
// Movement
// ============================================================================

/// Move one hero towards (or away from) the distance it wants to hold.
pub fn move_hero(heroes: &mut [Hero; 2], side: Side, dt_ms: u64, now: u64) {
    let (hero, enemy) = pair_mut(heroes, side);
    if !hero.is_alive() || hero.is_stunned(now) {
        return;
    }

    let direction = if enemy.position.x >= hero.position.x { 1.0 } else { -1.0 };
    hero.facing = direction as i8;
    let slow = hero
        .effects
        .get_active(EffectKind::Slow, now)
        .map(|s| s.magnitude)
        .unwrap_or(0.0);
    let step = hero.stats.move_speed * (1.0 - slow).max(0.0) * dt_ms as f32 / 1000.0;
    let distance = gap(hero, enemy);

    // A goading pet pulls attackers towards it
    if let Some(pet) = enemy.living_followers().find(|f| f.goads()) {
        let pet_distance = (pet.position.x - hero.position.x).abs();
        if pet_distance < pet.goad_range && pet_distance > MELEE_RANGE {
            let towards = (pet.position.x - hero.position.x).signum();
            hero.position.x = (hero.position.x + towards * step).clamp(ARENA_MIN_X, ARENA_MAX_X);
            return;
        }
    }

    let hold = hero.scaling.preferred_range.min(hero.stats.attack_range);
    let ranged = hold > MELEE_RANGE * 2.0;
    let delta = if hero.is_stealthed(now) {
        direction * step * 1.3
    } else if distance > hold + RANGE_TOLERANCE {
        direction * step
    } else if ranged && distance < hold - 2.0 * RANGE_TOLERANCE && !hero.ultimate_active(now) {
        -direction * step
    } else {
        0.0
    };

    hero.position.x = (hero.position.x + delta).clamp(ARENA_MIN_X, ARENA_MAX_X);
}

// ============================================================================
// Damage Over Time
// ============================================================================

/// Tick bleed, poison and burn on both heroes. Damage is credited to the
/// opponent and folded into one log line per second.
pub fn tick_damage_over_time(heroes: &mut [Hero; 2], dt_ms: u64, env: &mut CombatEnv) {
    let now = env.now;
    let flush = now % DOT_LOG_INTERVAL_MS == 0;

    for side in Side::BOTH {
        let (hero, opponent) = pair_mut(heroes, side);
        let [bleed, poison] = hero.drain_dots(now, dt_ms);
        let burn = hero
            .effects
            .get_active(EffectKind::Burn, now)
            .map(|b| b.magnitude * dt_ms as f32 / 1000.0)
            .unwrap_or(0.0);

        for (slot, amount) in [bleed, poison, burn].into_iter().enumerate() {
            if amount <= 0.0 || !hero.is_alive() {
                continue;
            }
            // Death Mark only collects direct hits
            let loss = hero.take_health(amount, now);
            opponent.damage_dealt += loss.lost;
            hero.pending_dot_log[slot] += loss.lost;
            if loss.died {
                report_death(hero, env);
            }
        }

        if flush || !hero.is_alive() {
            let name = hero.name.clone();
            let pending = std::mem::take(&mut hero.pending_dot_log);
            let kinds = [
                (CombatLogEventType::BleedTick, "bleeds"),
                (CombatLogEventType::PoisonTick, "poison"),
                (CombatLogEventType::Damage, "burns"),
            ];
            for ((event_type, verb), amount) in kinds.into_iter().zip(pending) {
                if amount >= 0.5 {
                    env.log.log(event_type, format!("{} {} {}", name, verb, amount.round()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::log::CombatLog;
    use crate::states::match_config::HeroClass;
    use crate::states::play_match::ability_config::ClassCatalog;
    use crate::states::play_match::components::auras::StatModifiers;

    fn duel(left: HeroClass, right: HeroClass) -> (ClassCatalog, [Hero; 2]) {
        let catalog = ClassCatalog::builtin().unwrap();
        let heroes = [
            Hero::from_class(left, Side::Left, &catalog).unwrap(),
            Hero::from_class(right, Side::Right, &catalog).unwrap(),
        ];
        (catalog, heroes)
    }

    #[test]
    fn test_mitigation_formula() {
        assert_eq!(mitigation(0.0), 1.0);
        assert!((mitigation(60.0) - 0.8).abs() < 1e-6);
        assert!((mitigation(10_000.0) - 0.2).abs() < 1e-6, "Mitigation caps at 80%");
    }

    #[test]
    fn test_shield_absorbs_first_then_overflows() {
        let (catalog, mut heroes) = duel(HeroClass::Wizard, HeroClass::Barbarian);
        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        heroes[1].effects.apply(
            EffectKind::Shield,
            0,
            5000,
            380.0,
            StatModifiers {
                reflect: 45.0,
                ..StatModifiers::default()
            },
        );
        let before = heroes[1].current_health;
        let (attacker, defender) = pair_mut(&mut heroes, Side::Left);
        let report = apply_incoming_damage(attacker, defender, 760.0, "Test", &mut env);

        assert_eq!(report.absorbed, 380.0);
        assert_eq!(report.dealt, 380.0);
        assert_eq!(heroes[1].current_health, before - 380.0);
        assert!(!heroes[1].effects.is_active(EffectKind::Shield, 0));
        assert_eq!(heroes[0].current_health, heroes[0].max_health - 45.0, "Shield reflects");
    }

    #[test]
    fn test_dead_hero_takes_no_more_damage() {
        let (catalog, mut heroes) = duel(HeroClass::Barbarian, HeroClass::Wizard);
        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        let (attacker, defender) = pair_mut(&mut heroes, Side::Left);
        let first = apply_incoming_damage(attacker, defender, 99_999.0, "Test", &mut env);
        let second = apply_incoming_damage(attacker, defender, 500.0, "Test", &mut env);
        assert!(first.died);
        assert!(!second.died);
        assert_eq!(env.fallen, vec![Side::Right]);
        drop(env);
        assert_eq!(log.filter_by_type(CombatLogEventType::Death).len(), 1);
        assert_eq!(heroes[1].current_health, 0.0);
    }

    #[test]
    fn test_last_stand_keeps_one_health() {
        let (catalog, mut heroes) = duel(HeroClass::Barbarian, HeroClass::Wizard);
        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        heroes[1]
            .effects
            .apply(EffectKind::LastStand, 0, 3000, 0.0, StatModifiers::default());

        let (attacker, defender) = pair_mut(&mut heroes, Side::Left);
        let report = apply_incoming_damage(attacker, defender, 99_999.0, "Test", &mut env);
        assert!(!report.died);
        assert_eq!(heroes[1].current_health, 1.0);
    }

    #[test]
    fn test_riposte_is_consumed() {
        let (catalog, mut heroes) = duel(HeroClass::Wizard, HeroClass::Barbarian);
        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        heroes[1]
            .effects
            .apply(EffectKind::Riposte, 0, 6000, 150.0, StatModifiers::default());

        let (attacker, defender) = pair_mut(&mut heroes, Side::Left);
        apply_incoming_damage(attacker, defender, 100.0, "Test", &mut env);
        apply_incoming_damage(attacker, defender, 100.0, "Test", &mut env);
        assert_eq!(heroes[0].current_health, heroes[0].max_health - 150.0);
        assert!(heroes[1].effects.get(EffectKind::Riposte).is_none());
    }

    #[test]
    fn test_hunters_mark_cannot_miss() {
        let (catalog, mut heroes) = duel(HeroClass::Ranger, HeroClass::Assassin);
        let mut rng = GameRng::from_seed(9);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        heroes[1]
            .effects
            .apply(EffectKind::SmokeBomb, 0, 4000, 0.95, StatModifiers::default());
        heroes[0]
            .effects
            .apply(EffectKind::HuntersMark, 0, 8000, 0.0, StatModifiers::default());

        let before = heroes[1].current_health;
        resolve_auto_attack(&mut heroes, Side::Left, TargetRef::Hero, true, 300.0, false, &mut env);
        assert!(heroes[1].current_health < before);
        assert!(heroes[0].effects.get(EffectKind::HuntersMark).is_none());
    }

    #[test]
    fn test_evasion_is_rolled_before_damage_spread() {
        let (catalog, mut template) = duel(HeroClass::Barbarian, HeroClass::Wizard);
        template[1].stats.evasion = 0.95;
        let (mut misses, mut hits) = (0, 0);

        for seed in 0..200 {
            let mut heroes = template.clone();
            let mut reference = GameRng::from_seed(seed);
            let evasion_draw = reference.random_f32();
            let evaded = evasion_draw < 0.95;
            if !evaded {
                reference.random_f32();
            }

            let mut rng = GameRng::from_seed(seed);
            let mut log = CombatLog::default();
            let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
            resolve_auto_attack(&mut heroes, Side::Left, TargetRef::Hero, false, 50.0, false, &mut env);

            // A miss draws nothing beyond the evasion roll
            assert_eq!(env.rng.random_f32(), reference.random_f32(), "seed {}", seed);
            let untouched = heroes[1].current_health == heroes[1].max_health;
            assert_eq!(untouched, evaded, "seed {}", seed);
            if evaded {
                misses += 1;
            } else {
                hits += 1;
            }
        }
        assert!(misses > 0);
        assert!(hits > 0);
    }

    #[test]
    fn test_bleed_every_third_ranger_hit() {
        let (catalog, mut heroes) = duel(HeroClass::Ranger, HeroClass::Barbarian);
        let mut rng = GameRng::from_seed(2);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        for count in 1..=3 {
            heroes[0].attack_count = count;
            resolve_auto_attack(&mut heroes, Side::Left, TargetRef::Hero, true, 300.0, false, &mut env);
        }
        assert_eq!(heroes[1].bleed_stacks(), 1);
    }

    #[test]
    fn test_bleed_ticks_one_percent_per_second() {
        let (catalog, mut heroes) = duel(HeroClass::Ranger, HeroClass::Barbarian);
        let mut rng = GameRng::from_seed(2);
        let mut log = CombatLog::default();
        heroes[1].add_dot(DotKind::Bleed, 0, 8);
        let max = heroes[1].max_health;

        let mut now = 0;
        while now < DOT_STACK_DURATION_MS {
            now += TICK_MS;
            let mut env = CombatEnv::new(now, &mut rng, &mut log, &catalog);
            tick_damage_over_time(&mut heroes, TICK_MS, &mut env);
        }
        let lost = max - heroes[1].current_health;
        assert!((lost - max * 0.01 * 2.0).abs() < 1.0, "lost {}", lost);
        assert!(!log.filter_by_type(CombatLogEventType::BleedTick).is_empty());
    }

    #[test]
    fn test_spell_bonus_adds_to_charge_bonus() {
        let (catalog, mut heroes) = duel(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[0].charge = 5;
        heroes[1].stats.defense = 0.0;
        heroes[1].stats.evasion = 0.0;
        heroes[1].scaling.spell_resist = 0.0;
        let mut rng = GameRng::from_seed(4);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);

        let (caster, target) = pair_mut(&mut heroes, Side::Left);
        let report = resolve_ability_hit(caster, target, 140.0, true, "Lightning Bolt", &mut env);

        // 140 * (1 + 0.08 + 5 * 0.06)
        assert!(!report.evaded);
        assert!((report.dealt - 193.2).abs() < 0.01, "dealt {}", report.dealt);
    }

    #[test]
    fn test_death_mark_ignores_damage_over_time() {
        let (catalog, mut heroes) = duel(HeroClass::Assassin, HeroClass::Barbarian);
        let mut rng = GameRng::from_seed(2);
        let mut log = CombatLog::default();
        heroes[1]
            .effects
            .apply(EffectKind::DeathMark, 0, 3500, 0.9, StatModifiers::default());
        heroes[1].add_dot(DotKind::Bleed, 0, 8);
        heroes[1].add_dot(DotKind::Poison, 0, 8);
        let before = heroes[1].current_health;

        let mut now = 0;
        while now < 2000 {
            now += TICK_MS;
            let mut env = CombatEnv::new(now, &mut rng, &mut log, &catalog);
            tick_damage_over_time(&mut heroes, TICK_MS, &mut env);
        }
        assert!(heroes[1].current_health < before);
        assert_eq!(heroes[1].effects.get(EffectKind::DeathMark).unwrap().stored, 0.0);

        let mut env = CombatEnv::new(now, &mut rng, &mut log, &catalog);
        let (attacker, defender) = pair_mut(&mut heroes, Side::Left);
        let report = apply_incoming_damage(attacker, defender, 120.0, "Test", &mut env);
        assert_eq!(heroes[1].effects.get(EffectKind::DeathMark).unwrap().stored, report.dealt);
    }

    #[test]
    fn test_melee_hero_closes_distance() {
        let (_, mut heroes) = duel(HeroClass::Barbarian, HeroClass::Wizard);
        let before = gap(&heroes[0], &heroes[1]);
        move_hero(&mut heroes, Side::Left, 1000, 0);
        assert!(gap(&heroes[0], &heroes[1]) < before);
    }
}
