//! Combat Constants
//!
//! Centralized location for magic numbers used throughout the combat system.
//! Class-specific numbers live in the catalog; these are the engine-wide ones.

// ============================================================================
// Timing
// ============================================================================

/// Fixed simulation step in milliseconds. Every tick advances match time by this much.
pub const TICK_MS: u64 = 50;

/// Delay before retrying an auto-attack that found no target in range.
pub const ATTACK_RETRY_MS: f32 = 80.0;

/// Combo decays only once the next swing is further away than this.
pub const COMBO_DECAY_IDLE_MS: f32 = 200.0;

/// Damage-over-time is folded into one log line per interval.
pub const DOT_LOG_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Arena Geometry
// ============================================================================

/// Left wall of the walkable arena
pub const ARENA_MIN_X: f32 = 65.0;

/// Right wall of the walkable arena
pub const ARENA_MAX_X: f32 = 935.0;

/// Ground line heroes stand on
pub const GROUND_Y: f32 = 400.0;

/// Spawn distance from each wall
pub const SPAWN_INSET: f32 = 115.0;

/// Melee reach. Ranged attacks inside this distance take the point-blank penalty.
pub const MELEE_RANGE: f32 = 55.0;

// ============================================================================
// Damage Formula
// ============================================================================

/// Defense divisor: each 3 points of defense mitigates 1% of damage.
pub const DEFENSE_SCALE: f32 = 300.0;

/// Maximum fraction of damage defense can mitigate on heroes.
pub const MAX_MITIGATION: f32 = 0.8;

/// Maximum fraction of damage defense can mitigate on followers.
pub const FOLLOWER_MAX_MITIGATION: f32 = 0.7;

/// Damage multiplier for ranged attacks fired at point-blank range.
pub const RANGED_MELEE_PENALTY: f32 = 0.7;

/// Damage multiplier for the first hit out of stealth.
pub const STEALTH_DAMAGE_MULTIPLIER: f32 = 3.0;

/// Evasion never exceeds this (ultimate windows that grant full evasion excepted).
pub const EVASION_CAP: f32 = 0.95;

/// Spell dodge chance is the target's evasion scaled by this.
pub const SPELL_DODGE_FACTOR: f32 = 0.6;

/// A resisted spell deals this fraction of its damage.
pub const SPELL_RESIST_FACTOR: f32 = 0.5;

/// Heroes deal this much less damage to arena followers.
pub const FOLLOWER_DAMAGE_REDUCTION: f32 = 0.30;

/// Follower damage rolls uniformly in [min, min + spread].
pub const FOLLOWER_VARIANCE_MIN: f32 = 0.85;
pub const FOLLOWER_VARIANCE_SPREAD: f32 = 0.3;

/// A follower keeps attacking the enemy hero unless another follower is this much closer.
pub const FOLLOWER_HERO_PREFERENCE: f32 = 0.7;

/// A hero switches to an enemy follower when it is this much closer than the enemy hero.
pub const HERO_FOLLOWER_PREFERENCE: f32 = 0.8;

/// Chance a hero swings at a nearby enemy follower regardless of distance.
pub const HERO_FOLLOWER_DISTRACTION: f32 = 0.25;

// ============================================================================
// Damage Over Time
// ============================================================================

/// Lifetime of a single bleed or poison stack.
pub const DOT_STACK_DURATION_MS: u64 = 2000;

/// Each stack deals this fraction of the target's HP at application, per second.
pub const DOT_HP_FRACTION_PER_SEC: f32 = 0.01;

// ============================================================================
// Projectiles & Movement
// ============================================================================

/// Projectiles that have not landed after this long are discarded as misses.
pub const PROJECTILE_TIMEOUT_MS: u64 = 2000;

/// Shadow Step lands this far behind the target.
pub const SHADOW_STEP_OFFSET: f32 = 50.0;

/// Charge stops this far in front of the target.
pub const CHARGE_STOP_DISTANCE: f32 = 45.0;

/// Heroes stop approaching once within this tolerance of their preferred range.
pub const RANGE_TOLERANCE: f32 = 15.0;

/// Bloodlust is extended by this much when the owner's pet dies.
pub const PET_DEATH_BLOODLUST_EXTENSION_MS: u64 = 500;

// ============================================================================
// AI Thresholds
// ============================================================================

/// Wizards raise Static Shield below this health fraction.
pub const SHIELD_HP_THRESHOLD: f32 = 0.65;

/// Assassins throw Smoke Bomb below this health fraction.
pub const SMOKE_BOMB_HP_THRESHOLD: f32 = 0.55;

/// Shadow Step is only worth it beyond this distance.
pub const SHADOW_STEP_MIN_DISTANCE: f32 = 100.0;

/// Envenom is cast once the assassin is this close.
pub const ENVENOM_REACH: f32 = MELEE_RANGE + 60.0;

/// Defensive custom skills (Riposte, Thorns, Last Stand) are used below this health fraction.
pub const DEFENSIVE_HP_THRESHOLD: f32 = 0.7;

// ============================================================================
// Dungeon
// ============================================================================

/// Monsters in a first-floor encounter
pub const DUNGEON_BASE_WAVES: u32 = 1;

/// One more monster joins the queue every this many floors
pub const DUNGEON_FLOORS_PER_EXTRA_WAVE: u32 = 3;

pub const DUNGEON_MAX_WAVES: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_divides_a_second() {
        assert_eq!(1000 % TICK_MS, 0);
        assert_eq!(DOT_LOG_INTERVAL_MS % TICK_MS, 0);
    }

    #[test]
    fn test_range_constants_are_positive() {
        assert!(MELEE_RANGE > 0.0);
        assert!(SHADOW_STEP_OFFSET > 0.0);
        assert!(CHARGE_STOP_DISTANCE > 0.0);
        assert!(ARENA_MAX_X > ARENA_MIN_X + 2.0 * SPAWN_INSET);
    }

    #[test]
    fn test_mitigation_caps_are_fractions() {
        assert!(MAX_MITIGATION > 0.0 && MAX_MITIGATION < 1.0);
        assert!(FOLLOWER_MAX_MITIGATION > 0.0 && FOLLOWER_MAX_MITIGATION < 1.0);
        assert!(EVASION_CAP < 1.0);
    }

    #[test]
    fn test_hp_thresholds_are_valid() {
        assert!(SHIELD_HP_THRESHOLD > 0.0 && SHIELD_HP_THRESHOLD <= 1.0);
        assert!(SMOKE_BOMB_HP_THRESHOLD > 0.0 && SMOKE_BOMB_HP_THRESHOLD <= 1.0);
        assert!(DEFENSIVE_HP_THRESHOLD > 0.0 && DEFENSIVE_HP_THRESHOLD <= 1.0);
    }
}
