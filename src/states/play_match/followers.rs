//! Follower & Pet Combat
//!
//! Followers are simplified combatants owned by a hero: fixed damage, their
//! own attack timer and an optional ability on its own cooldown. Two origins:
//! - arena followers from a player's collection, spawned at match start
//! - the ranger pet, summoned by Summon Pet; it deals no damage but goads
//!   attackers that come within its goad range
//!
//! A dead follower never comes back. It is flagged dead the moment it hits
//! 0 HP and dropped from the owner's list at the end of the tick.

use bevy::math::Vec2;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::log::CombatLogEventType;
use crate::states::match_config::Side;

use super::ability_config::{FollowerAbilityConfig, FollowerTemplate};
use super::auras::report_death;
use super::components::auras::{DotKind, EffectKind, StatModifiers};
use super::components::Hero;
use super::constants::*;
use super::utils::{combatant_id, pair_mut, CombatEnv};

/// What a follower's ability does when its cooldown comes up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FollowerAbility {
    /// Flat damage to the current target
    Strike { damage: f32 },
    /// Flat damage plus a short stun on the enemy hero
    StunStrike { damage: f32, stun_ms: u64 },
    /// Slows the enemy hero
    Frostbite { slow: f32, duration_ms: u64 },
    /// Sets the enemy hero on fire
    Scorch { per_second: f32, duration_ms: u64 },
    /// Adds bleed stacks to the enemy hero
    Bleed { stacks: u32 },
    /// Adds poison stacks to the enemy hero
    Poison { stacks: u32 },
    /// Heals the follower itself
    Mend { heal: f32 },
    /// Damages the target and heals the owner by the same amount
    LifeDrain { amount: f32 },
    /// Shields the owner
    Ward { shield: f32, duration_ms: u64 },
}

/// A living (or just-killed) follower.
#[derive(Debug, Clone, PartialEq)]
pub struct Follower {
    pub id: u32,
    pub name: String,
    pub owner: Side,
    pub max_health: f32,
    pub current_health: f32,
    pub alive: bool,
    pub damage: f32,
    pub attack_speed: f32,
    pub defense: f32,
    pub range: f32,
    pub move_speed: f32,
    pub position: Vec2,
    pub attack_timer_ms: f32,
    pub ability: Option<FollowerAbilityConfig>,
    pub ability_timer_ms: u64,
    /// Attackers inside this range hit the follower instead of its owner (0 = never)
    pub goad_range: f32,
    /// Summoned pets take full hero damage; arena followers take reduced damage
    pub is_pet: bool,
    pub damage_dealt: f32,
}

impl Follower {
    pub fn from_template(
        template: &FollowerTemplate,
        id: u32,
        owner: Side,
        position: Vec2,
        is_pet: bool,
    ) -> Self {
        Self {
            id,
            name: template.name.clone(),
            owner,
            max_health: template.hp,
            current_health: template.hp,
            alive: true,
            damage: template.damage,
            attack_speed: template.attack_speed,
            defense: template.defense,
            range: template.range,
            move_speed: template.move_speed,
            position,
            attack_timer_ms: 0.0,
            ability_timer_ms: template.ability.as_ref().map(|a| a.cooldown_ms).unwrap_or(0),
            ability: template.ability.clone(),
            goad_range: template.goad_range,
            is_pet,
            damage_dealt: 0.0,
        }
    }

    pub fn goads(&self) -> bool {
        self.alive && self.goad_range > 0.0
    }

    /// Remove health; returns true on the death transition only
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.alive {
            return false;
        }
        self.current_health = (self.current_health - amount.max(0.0)).max(0.0);
        if self.current_health <= 0.0 {
            self.alive = false;
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        if self.alive {
            self.current_health = (self.current_health + amount).min(self.max_health);
        }
    }
}

/// Follower damage after the follower defense cap and the 0.85-1.15 roll, rounded.
pub fn roll_follower_damage(base: f32, defense: f32, env: &mut CombatEnv) -> f32 {
    let mitigation = (defense.max(0.0) / DEFENSE_SCALE).min(FOLLOWER_MAX_MITIGATION);
    let variance = FOLLOWER_VARIANCE_MIN + env.rng.random_f32() * FOLLOWER_VARIANCE_SPREAD;
    (base * (1.0 - mitigation) * variance).round()
}

/// Create a follower for `owner` beside it and return its id.
pub fn spawn_follower(owner: &mut Hero, template: &FollowerTemplate, is_pet: bool) -> u32 {
    let id = owner.allocate_follower_id();
    let slot = owner.followers.len() as f32;
    let x = (owner.position.x + owner.facing as f32 * (40.0 + slot * 20.0))
        .clamp(ARENA_MIN_X, ARENA_MAX_X);
    let follower = Follower::from_template(
        template,
        id,
        owner.side,
        Vec2::new(x, owner.position.y),
        is_pet,
    );
    owner.followers.push(follower);
    id
}

/// Mark a follower dead and run the owner's on-death hooks.
pub fn kill_follower(owner: &mut Hero, id: u32, env: &mut CombatEnv) {
    let Some(follower) = owner.followers.iter_mut().find(|f| f.id == id) else {
        return;
    };
    follower.alive = false;
    follower.current_health = 0.0;
    let is_pet = follower.is_pet;
    let name = follower.name.clone();

    if is_pet {
        env.log.log(
            CombatLogEventType::Summon,
            format!("{}'s pet slain!", owner.name),
        );
        if let Some(bloodlust) = owner.effects.get_mut(EffectKind::Bloodlust) {
            if env.now < bloodlust.end_ms {
                bloodlust.end_ms += PET_DEATH_BLOODLUST_EXTENSION_MS;
            }
        }
    } else {
        env.log.log(CombatLogEventType::Death, format!("{} slain!", name));
    }
}

/// Drop dead followers from both heroes
pub fn remove_dead_followers(heroes: &mut [Hero; 2]) {
    for hero in heroes.iter_mut() {
        hero.followers.retain(|f| f.alive);
    }
}

/// Where a follower swings this tick
#[derive(Debug, Clone, Copy, PartialEq)]
enum FollowerTarget {
    Hero,
    Follower(u32),
}

/// Nearest living enemy follower, unless the enemy hero is closer than 70% of that distance.
fn pick_follower_target(position: Vec2, enemy: &Hero) -> (FollowerTarget, Vec2) {
    let hero_distance = (enemy.position.x - position.x).abs();
    let nearest = enemy
        .living_followers()
        .map(|f| (f.id, f.position, (f.position.x - position.x).abs()))
        .min_by(|a, b| a.2.total_cmp(&b.2));

    match nearest {
        Some((id, target_position, distance))
            if hero_distance >= distance * FOLLOWER_HERO_PREFERENCE =>
        {
            (FollowerTarget::Follower(id), target_position)
        }
        _ => (FollowerTarget::Hero, enemy.position),
    }
}

/// Advance every living follower by one tick: move, auto-attack, ability.
/// Left's followers act before Right's.
pub fn tick_followers(heroes: &mut [Hero; 2], env: &mut CombatEnv, dt_ms: u64) {
    for side in Side::BOTH {
        let count = heroes[side.index()].followers.len();
        for index in 0..count {
            if heroes.iter().any(|h| !h.is_alive()) {
                return;
            }
            let (owner, enemy) = pair_mut(heroes, side);
            let Some(follower) = owner.followers.get_mut(index) else {
                continue;
            };
            if !follower.alive {
                continue;
            }

            let (target, target_position) = pick_follower_target(follower.position, enemy);
            let distance = (target_position.x - follower.position.x).abs();
            let dt = dt_ms as f32 / 1000.0;

            if distance > follower.range {
                let direction = (target_position.x - follower.position.x).signum();
                follower.position.x = (follower.position.x + direction * follower.move_speed * dt)
                    .clamp(ARENA_MIN_X, ARENA_MAX_X);
            }

            // Auto-attack
            follower.attack_timer_ms -= dt_ms as f32;
            let swing = follower.attack_timer_ms <= 0.0
                && distance <= follower.range + RANGE_TOLERANCE
                && follower.damage > 0.0;
            if follower.attack_timer_ms <= 0.0 && follower.attack_speed > 0.0 {
                follower.attack_timer_ms = if swing {
                    1000.0 / follower.attack_speed
                } else {
                    0.0
                };
            }
            let base_damage = follower.damage;
            let follower_id = follower.id;
            let follower_name = follower.name.clone();

            if swing {
                strike(owner, follower_id, &follower_name, enemy, target, base_damage, "Attack", env);
            }

            // Ability
            let Some(follower) = owner.followers.get_mut(index) else {
                continue;
            };
            let ability = match follower.ability.as_ref() {
                Some(config) if follower.alive => {
                    follower.ability_timer_ms = follower.ability_timer_ms.saturating_sub(dt_ms);
                    if follower.ability_timer_ms == 0 {
                        follower.ability_timer_ms = config.cooldown_ms;
                        Some(config.clone())
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(config) = ability {
                if enemy.is_alive() {
                    use_follower_ability(owner, index, enemy, target, &config, env);
                }
            }
        }
    }
}

/// Apply a follower's hit to the chosen target. Returns the damage dealt.
#[allow(clippy::too_many_arguments)]
fn strike(
    owner: &mut Hero,
    follower_id: u32,
    follower_name: &str,
    enemy: &mut Hero,
    target: FollowerTarget,
    base_damage: f32,
    label: &str,
    env: &mut CombatEnv,
) -> f32 {
    let dealt = match target {
        FollowerTarget::Hero => {
            let damage = roll_follower_damage(base_damage, enemy.stats.defense, env);
            let loss = enemy.take_health(damage, env.now);
            enemy.effects.store_marked_damage(loss.lost, env.now);
            env.log.log_damage(
                follower_name.to_string(),
                combatant_id(enemy),
                label.to_string(),
                loss.lost,
                format!("{} > {} {}", follower_name, enemy.name, loss.lost.round()),
            );
            if loss.died {
                report_death(enemy, env);
            }
            loss.lost
        }
        FollowerTarget::Follower(id) => {
            let Some(victim) = enemy.follower_mut(id) else {
                return 0.0;
            };
            let damage = roll_follower_damage(base_damage, victim.defense, env);
            let victim_name = victim.name.clone();
            let died = victim.take_damage(damage);
            env.log.log_damage(
                follower_name.to_string(),
                victim_name.clone(),
                label.to_string(),
                damage,
                format!("{} > {} {}", follower_name, victim_name, damage),
            );
            if died {
                kill_follower(enemy, id, env);
                env.log.log(
                    CombatLogEventType::Summon,
                    format!("{} slays {}!", follower_name, victim_name),
                );
            }
            damage
        }
    };

    if let Some(follower) = owner.followers.iter_mut().find(|f| f.id == follower_id) {
        follower.damage_dealt += dealt;
    }
    owner.damage_dealt += dealt;
    dealt
}

fn use_follower_ability(
    owner: &mut Hero,
    index: usize,
    enemy: &mut Hero,
    target: FollowerTarget,
    config: &FollowerAbilityConfig,
    env: &mut CombatEnv,
) {
    let (follower_id, follower_name) = match owner.followers.get(index) {
        Some(f) => (f.id, f.name.clone()),
        None => return,
    };
    let now = env.now;
    env.log.log(
        CombatLogEventType::SpellCast,
        format!("{} uses {}!", follower_name, config.name),
    );

    match config.effect {
        FollowerAbility::Strike { damage } => {
            strike(owner, follower_id, &follower_name, enemy, target, damage, &config.name, env);
        }
        FollowerAbility::StunStrike { damage, stun_ms } => {
            strike(owner, follower_id, &follower_name, enemy, target, damage, &config.name, env);
            if enemy.is_alive() && !enemy.is_stealthed(now) && !env.rng.roll(enemy.scaling.stun_resist) {
                enemy
                    .effects
                    .apply(EffectKind::Stun, now, stun_ms, 0.0, StatModifiers::default());
                env.log.log(
                    CombatLogEventType::Stun,
                    format!("{} STUNNED {}ms!", enemy.name, stun_ms),
                );
            }
        }
        FollowerAbility::Frostbite { slow, duration_ms } => {
            let slow = slow * (1.0 - enemy.scaling.slow_resist);
            let modifiers = StatModifiers {
                attack_speed: -slow,
                ..StatModifiers::default()
            };
            enemy
                .effects
                .apply(EffectKind::Slow, now, duration_ms, slow, modifiers);
        }
        FollowerAbility::Scorch {
            per_second,
            duration_ms,
        } => {
            enemy.effects.apply(
                EffectKind::Burn,
                now,
                duration_ms,
                per_second,
                StatModifiers::default(),
            );
        }
        FollowerAbility::Bleed { stacks } => {
            for _ in 0..stacks {
                enemy.add_dot(DotKind::Bleed, now, owner.scaling.dot_stack_cap);
            }
        }
        FollowerAbility::Poison { stacks } => {
            for _ in 0..stacks {
                enemy.add_dot(DotKind::Poison, now, owner.scaling.dot_stack_cap);
            }
        }
        FollowerAbility::Mend { heal } => {
            if let Some(follower) = owner.followers.get_mut(index) {
                follower.heal(heal);
            }
        }
        FollowerAbility::LifeDrain { amount } => {
            let dealt = strike(owner, follower_id, &follower_name, enemy, target, amount, &config.name, env);
            let healed = owner.restore_health(dealt);
            if healed > 0.0 {
                env.log.log_heal(
                    follower_name.clone(),
                    combatant_id(owner),
                    config.name.clone(),
                    healed,
                    format!("{} drains {} for {}", follower_name, healed.round(), owner.name),
                );
            }
        }
        FollowerAbility::Ward {
            shield,
            duration_ms,
        } => {
            let current = owner
                .effects
                .get_active(EffectKind::Shield, now)
                .map(|s| (s.magnitude, s.modifiers))
                .unwrap_or((0.0, StatModifiers::default()));
            owner
                .effects
                .apply(EffectKind::Shield, now, duration_ms, current.0 + shield, current.1);
            debug!("{} wards {} for {}", follower_name, owner.name, shield);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::log::CombatLog;
    use crate::states::match_config::HeroClass;
    use crate::states::play_match::ability_config::ClassCatalog;
    use crate::states::play_match::components::GameRng;

    fn setup() -> (ClassCatalog, [Hero; 2]) {
        let catalog = ClassCatalog::builtin().unwrap();
        let heroes = [
            Hero::from_class(HeroClass::Ranger, Side::Left, &catalog).unwrap(),
            Hero::from_class(HeroClass::Barbarian, Side::Right, &catalog).unwrap(),
        ];
        (catalog, heroes)
    }

    #[test]
    fn test_follower_damage_stays_in_variance_band() {
        let (catalog, _) = setup();
        let mut rng = GameRng::from_seed(7);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        for _ in 0..200 {
            let damage = roll_follower_damage(100.0, 30.0, &mut env);
            assert!((76.0..=104.0).contains(&damage), "got {}", damage);
            assert_eq!(damage, damage.round());
        }
    }

    #[test]
    fn test_follower_defense_caps_at_seventy_percent() {
        let (catalog, _) = setup();
        let mut rng = GameRng::from_seed(3);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        let damage = roll_follower_damage(100.0, 1000.0, &mut env);
        assert!(damage <= 35.0);
    }

    #[test]
    fn test_dead_followers_are_removed_and_stay_dead() {
        let (catalog, mut heroes) = setup();
        let template = catalog.follower("Fire Imp").unwrap().clone();
        let id = spawn_follower(&mut heroes[0], &template, false);

        let follower = heroes[0].follower_mut(id).unwrap();
        assert!(follower.take_damage(10_000.0));
        assert!(!follower.take_damage(10.0), "Death is reported once");
        follower.heal(500.0);
        assert_eq!(follower.current_health, 0.0, "Dead followers are not healed");

        remove_dead_followers(&mut heroes);
        assert!(heroes[0].followers.is_empty());

        let next = spawn_follower(&mut heroes[0], &template, false);
        assert_ne!(next, id, "Follower ids are never reused");
    }

    #[test]
    fn test_pet_death_extends_bloodlust() {
        let (catalog, mut heroes) = setup();
        let pet = catalog.pet().unwrap().clone();
        let id = spawn_follower(&mut heroes[0], &pet, true);
        heroes[0]
            .effects
            .apply(EffectKind::Bloodlust, 0, 2500, 0.05, StatModifiers::default());

        let mut rng = GameRng::from_seed(1);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(1000, &mut rng, &mut log, &catalog);
        kill_follower(&mut heroes[0], id, &mut env);
        assert_eq!(heroes[0].effects.get(EffectKind::Bloodlust).unwrap().end_ms, 3000);
    }

    #[test]
    fn test_follower_prefers_closer_hero() {
        let (catalog, mut heroes) = setup();
        let template = catalog.follower("Stone Golem").unwrap().clone();
        let id = spawn_follower(&mut heroes[1], &template, false);
        heroes[1].follower_mut(id).unwrap().position.x = 500.0;
        heroes[1].position.x = 300.0;

        let (target, _) = pick_follower_target(Vec2::new(250.0, GROUND_Y), &heroes[1]);
        assert_eq!(target, FollowerTarget::Hero);

        let (target, _) = pick_follower_target(Vec2::new(480.0, GROUND_Y), &heroes[1]);
        assert_eq!(target, FollowerTarget::Follower(id));
    }

    #[test]
    fn test_followers_attack_enemy_hero() {
        let (catalog, mut heroes) = setup();
        let template = catalog.follower("Frost Wolf").unwrap().clone();
        spawn_follower(&mut heroes[0], &template, false);
        heroes[0].followers[0].position.x = heroes[1].position.x - 20.0;

        let mut rng = GameRng::from_seed(5);
        let mut log = CombatLog::default();
        let mut env = CombatEnv::new(0, &mut rng, &mut log, &catalog);
        let before = heroes[1].current_health;
        tick_followers(&mut heroes, &mut env, TICK_MS);
        assert!(heroes[1].current_health < before);
    }
}
