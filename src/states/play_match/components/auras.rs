//! Status Effect Data Types
//!
//! Every timed buff and debuff on a hero is one `ActiveEffect` keyed by its
//! `EffectKind`; there is at most one instance of each kind per hero.
//! Stacking damage-over-time (bleed, poison) is kept apart as `DotStack`s
//! because each stack ticks and expires on its own.
//!
//! ## Types
//! - `EffectKind`: every named effect, in expiry-processing order
//! - `StatModifiers`: the stat bundle an effect contributes while active
//! - `ActiveEffect`: one live effect instance
//! - `EffectSpec`: catalog description of an effect an ability applies
//! - `DotStack`: one independent bleed or poison stack

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// Every named status effect. Declaration order is the order in which
/// simultaneous expirations are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    /// No actions, no auto-attacks
    Stun,
    /// Attack speed reduction (modifiers carry the negative attack speed)
    Slow,
    /// Takes extra damage from everything
    Shocked,
    /// Takes extra damage (Expose Weakness)
    Vulnerable,
    /// Flat damage per second, non-stacking
    Burn,
    /// Absorbs damage; magnitude is the remaining shield HP
    Shield,
    /// Reflects a share of damage taken; magnitude is the share
    Thorns,
    /// Counters the next hit taken; magnitude is the counter damage
    Riposte,
    /// Evasion up, next hit triples and breaks stealth, immune to stuns
    Stealth,
    /// Auto-attacks add poison stacks
    Envenom,
    /// Evasion up while the opponent stands inside the zone
    SmokeBomb,
    /// Attack speed scales with the opponent's bleed stacks; heals on expiry
    Bloodlust,
    /// Next auto-attack cannot miss
    HuntersMark,
    /// Stores damage taken; detonates on expiry
    DeathMark,
    /// Wizard ultimate window: periodic lightning strikes
    Thunderstorm,
    /// Ranger ultimate window: rapid fire, every hit bleeds, untouchable
    RainOfFire,
    /// Barbarian ultimate window
    Berserk,
    /// Cannot drop below 1 HP; heals on expiry
    LastStand,
    /// Attack speed up, hits poison
    PrimalFury,
}

impl EffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Stun => "Stun",
            EffectKind::Slow => "Slow",
            EffectKind::Shocked => "Shocked",
            EffectKind::Vulnerable => "Vulnerable",
            EffectKind::Burn => "Burn",
            EffectKind::Shield => "Shield",
            EffectKind::Thorns => "Thorns",
            EffectKind::Riposte => "Riposte",
            EffectKind::Stealth => "Stealth",
            EffectKind::Envenom => "Envenom",
            EffectKind::SmokeBomb => "Smoke Bomb",
            EffectKind::Bloodlust => "Bloodlust",
            EffectKind::HuntersMark => "Hunter's Mark",
            EffectKind::DeathMark => "Death Mark",
            EffectKind::Thunderstorm => "Thunderstorm",
            EffectKind::RainOfFire => "Rain of Fire",
            EffectKind::Berserk => "Berserk",
            EffectKind::LastStand => "Last Stand",
            EffectKind::PrimalFury => "Primal Fury",
        }
    }

    /// Ultimate windows opened by threshold-gated abilities
    pub fn is_ultimate_window(&self) -> bool {
        matches!(
            self,
            EffectKind::Thunderstorm
                | EffectKind::RainOfFire
                | EffectKind::Berserk
                | EffectKind::LastStand
                | EffectKind::PrimalFury
        )
    }

    /// Whether refreshing this effect keeps the damage it has stored so far.
    /// Magnitude itself always overwrites on refresh.
    pub fn carries_stored(&self) -> bool {
        matches!(self, EffectKind::DeathMark)
    }
}

/// Stat contributions of one active effect. Percentages are fractions
/// (0.25 = +25%); negative values are penalties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatModifiers {
    /// Outgoing damage multiplier contribution
    #[serde(default)]
    pub damage: f32,
    /// Attack speed multiplier contribution
    #[serde(default)]
    pub attack_speed: f32,
    /// Flat evasion added before clamping
    #[serde(default)]
    pub evasion: f32,
    /// Incoming damage multiplier contribution
    #[serde(default)]
    pub damage_taken: f32,
    /// Extra lifesteal fraction on dealt damage
    #[serde(default)]
    pub lifesteal: f32,
    /// Flat damage returned to an attacker per hit absorbed
    #[serde(default)]
    pub reflect: f32,
}

impl StatModifiers {
    pub fn is_empty(&self) -> bool {
        *self == StatModifiers::default()
    }
}

/// Circular area an effect is anchored to (Smoke Bomb)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub center: Vec2,
    pub radius: f32,
}

impl Zone {
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.radius
    }
}

/// A single live status effect instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    /// Absolute match time (ms) at which the effect ends. Active while `now < end_ms`.
    pub end_ms: u64,
    /// Kind-specific strength (shield HP, slow fraction, burn per second, ...)
    pub magnitude: f32,
    /// Stat bundle folded into derived stats while active
    pub modifiers: StatModifiers,
    /// Accumulator (death mark stored damage, bloodlust damage dealt)
    pub stored: f32,
    /// Optional area the effect is bound to
    pub zone: Option<Zone>,
}

impl ActiveEffect {
    pub fn new(end_ms: u64, magnitude: f32) -> Self {
        Self {
            end_ms,
            magnitude,
            modifiers: StatModifiers::default(),
            stored: 0.0,
            zone: None,
        }
    }

    pub fn remaining_ms(&self, now: u64) -> u64 {
        self.end_ms.saturating_sub(now)
    }
}

/// Who an ability's effect lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectTarget {
    Caster,
    #[default]
    Opponent,
}

/// Catalog description of a status effect applied by an ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: EffectKind,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Kind-specific strength
    #[serde(default)]
    pub magnitude: f32,
    #[serde(default)]
    pub modifiers: StatModifiers,
    #[serde(default)]
    pub target: EffectTarget,
    /// Zone radius, anchored at the caster's position when applied (0 = no zone)
    #[serde(default)]
    pub radius: f32,
    /// Magnitude is multiplied by the target's bleed stacks
    #[serde(default)]
    pub per_bleed: bool,
}

/// The two stacking damage-over-time families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DotKind {
    Bleed,
    Poison,
}

/// One independent damage-over-time stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotStack {
    pub kind: DotKind,
    /// Damage dealt per second while the stack lives
    pub per_second: f32,
    /// Absolute match time (ms) at which the stack falls off
    pub expires_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_order_follows_declaration() {
        assert!(EffectKind::Stun < EffectKind::Shield);
        assert!(EffectKind::Bloodlust < EffectKind::DeathMark);
        assert!(EffectKind::DeathMark < EffectKind::LastStand);
    }

    #[test]
    fn test_only_death_mark_carries_stored_damage() {
        assert!(EffectKind::DeathMark.carries_stored());
        assert!(!EffectKind::Shield.carries_stored());
        assert!(!EffectKind::Bloodlust.carries_stored());
    }

    #[test]
    fn test_zone_contains_edge() {
        let zone = Zone {
            center: Vec2::new(100.0, 0.0),
            radius: 120.0,
        };
        assert!(zone.contains(Vec2::new(220.0, 0.0)));
        assert!(!zone.contains(Vec2::new(221.0, 0.0)));
    }
}
