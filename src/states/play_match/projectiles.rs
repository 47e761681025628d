//! Projectile Flight
//!
//! Ranged auto-attacks travel from the attacker to the target's position at
//! launch. Damage is resolved at impact by `combat_core`; this module only
//! tracks flight time and decides when a projectile lands or is discarded.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::states::match_config::Side;

use super::constants::PROJECTILE_TIMEOUT_MS;

/// The three projectile kinds heroes fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    Bolt,
    Dagger,
    Arrow,
}

impl ProjectileKind {
    /// Travel speed in arena units per second
    pub fn speed(&self) -> f32 {
        match self {
            ProjectileKind::Bolt => 650.0,
            ProjectileKind::Dagger => 550.0,
            ProjectileKind::Arrow => 520.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProjectileKind::Bolt => "bolt",
            ProjectileKind::Dagger => "dagger",
            ProjectileKind::Arrow => "arrow",
        }
    }
}

/// What a projectile (or any attack) is aimed at, on the opposing side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRef {
    Hero,
    Follower(u32),
}

/// Result of advancing a projectile by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    InFlight,
    Landed,
    TimedOut,
}

/// A projectile in the air.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub owner: Side,
    pub kind: ProjectileKind,
    pub origin: Vec2,
    pub target_position: Vec2,
    pub target: TargetRef,
    /// Attacker-to-target distance when fired (drives the point-blank penalty)
    pub launch_distance: f32,
    pub elapsed_ms: u64,
    pub time_of_flight_ms: u64,
    /// Fired out of stealth: lands with the stealth damage multiplier
    pub stealth_strike: bool,
}

impl Projectile {
    pub fn launch(
        owner: Side,
        kind: ProjectileKind,
        origin: Vec2,
        target_position: Vec2,
        target: TargetRef,
    ) -> Self {
        let launch_distance = origin.distance(target_position);
        let time_of_flight_ms = (launch_distance / kind.speed() * 1000.0).ceil() as u64;
        Self {
            owner,
            kind,
            origin,
            target_position,
            target,
            launch_distance,
            elapsed_ms: 0,
            time_of_flight_ms,
            stealth_strike: false,
        }
    }

    /// Current position along the straight flight path
    pub fn position(&self) -> Vec2 {
        if self.time_of_flight_ms == 0 {
            return self.target_position;
        }
        let progress = (self.elapsed_ms as f32 / self.time_of_flight_ms as f32).min(1.0);
        self.origin.lerp(self.target_position, progress)
    }

    pub fn advance(&mut self, dt_ms: u64) -> Flight {
        self.elapsed_ms += dt_ms;
        if self.elapsed_ms >= self.time_of_flight_ms {
            Flight::Landed
        } else if self.elapsed_ms >= PROJECTILE_TIMEOUT_MS {
            Flight::TimedOut
        } else {
            Flight::InFlight
        }
    }
}

/// Advance every projectile. Landed projectiles are returned in launch order;
/// timed-out ones are dropped and counted.
pub fn step_projectiles(projectiles: &mut Vec<Projectile>, dt_ms: u64) -> (Vec<Projectile>, usize) {
    let mut landed = Vec::new();
    let mut timed_out = 0;
    let mut in_flight = Vec::with_capacity(projectiles.len());

    for mut projectile in projectiles.drain(..) {
        match projectile.advance(dt_ms) {
            Flight::InFlight => in_flight.push(projectile),
            Flight::Landed => landed.push(projectile),
            Flight::TimedOut => timed_out += 1,
        }
    }

    *projectiles = in_flight;
    (landed, timed_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_flight_from_speed() {
        let bolt = Projectile::launch(
            Side::Left,
            ProjectileKind::Bolt,
            Vec2::new(0.0, 0.0),
            Vec2::new(325.0, 0.0),
            TargetRef::Hero,
        );
        assert_eq!(bolt.time_of_flight_ms, 500);
    }

    #[test]
    fn test_projectile_lands_after_flight() {
        let mut arrows = vec![Projectile::launch(
            Side::Right,
            ProjectileKind::Arrow,
            Vec2::ZERO,
            Vec2::new(104.0, 0.0),
            TargetRef::Hero,
        )];
        let (landed, _) = step_projectiles(&mut arrows, 150);
        assert!(landed.is_empty());
        let (landed, _) = step_projectiles(&mut arrows, 50);
        assert_eq!(landed.len(), 1);
        assert!(arrows.is_empty());
    }

    #[test]
    fn test_long_flights_time_out() {
        let mut daggers = vec![Projectile::launch(
            Side::Left,
            ProjectileKind::Dagger,
            Vec2::ZERO,
            Vec2::new(5000.0, 0.0),
            TargetRef::Follower(3),
        )];
        let (landed, timed_out) = step_projectiles(&mut daggers, PROJECTILE_TIMEOUT_MS);
        assert!(landed.is_empty());
        assert_eq!(timed_out, 1);
    }

    #[test]
    fn test_position_interpolates() {
        let mut bolt = Projectile::launch(
            Side::Left,
            ProjectileKind::Bolt,
            Vec2::ZERO,
            Vec2::new(650.0, 0.0),
            TargetRef::Hero,
        );
        bolt.advance(500);
        assert!((bolt.position().x - 325.0).abs() < 1e-3);
    }
}
