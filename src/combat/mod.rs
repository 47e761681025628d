//! Combat system
//!
//! The Bevy shell around the match engine:
//! - `ActiveMatch` owns the running `Match`
//! - `PendingIntents` collects human input between frames
//! - Systems advance the match by whole ticks, publish log lines and
//!   rejections as events, and refresh `HeroSnapshots` every frame
//! - Combat logging (`log`)

use bevy::prelude::*;
use std::sync::Arc;

pub mod events;
pub mod log;
pub mod systems;

use crate::error::ConfigError;
use crate::states::match_config::{MatchSetup, Side};
use crate::states::play_match::abilities::ActionIntent;
use crate::states::play_match::ability_config::ClassCatalog;
use crate::states::play_match::match_flow::Match;
use crate::states::play_match::results::HeroSnapshot;

use events::*;
use systems::*;

/// Plugin for the combat system
pub struct CombatPlugin {
    pub catalog: Arc<ClassCatalog>,
}

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Combat events
            .add_event::<CombatLogEvent>()
            .add_event::<ActionRejectedEvent>()
            .add_event::<MatchResolvedEvent>()
            // Resources
            .insert_resource(SharedCatalog(self.catalog.clone()))
            .init_resource::<ActiveMatch>()
            .init_resource::<PendingIntents>()
            .init_resource::<HeroSnapshots>()
            .init_resource::<SimulationSpeed>()
            // Systems
            .add_systems(
                Update,
                (
                    submit_pending_intents,
                    advance_match,
                    publish_combat_log,
                    refresh_snapshots,
                    finish_match,
                )
                    .chain(),
            );
    }
}

/// The immutable catalog, shared with every match
#[derive(Resource, Clone)]
pub struct SharedCatalog(pub Arc<ClassCatalog>);

/// The match currently being simulated, if any
#[derive(Resource, Default)]
pub struct ActiveMatch {
    pub game: Option<Match>,
    /// Log entries already published as events
    published: usize,
}

impl ActiveMatch {
    /// Replace any previous match with a new one and open its gates
    pub fn begin(&mut self, setup: MatchSetup, catalog: Arc<ClassCatalog>) -> Result<(), ConfigError> {
        let mut game = Match::new(setup, catalog)?;
        game.start();
        self.game = Some(game);
        self.published = 0;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.phase().is_live())
    }
}

/// Human intents waiting to be handed to the match
#[derive(Resource, Default)]
pub struct PendingIntents {
    pub queue: Vec<(Side, ActionIntent)>,
}

impl PendingIntents {
    pub fn push(&mut self, side: Side, intent: ActionIntent) {
        self.queue.push((side, intent));
    }
}

/// Latest read-only view of both heroes, left then right
#[derive(Resource, Default)]
pub struct HeroSnapshots {
    pub heroes: Option<[HeroSnapshot; 2]>,
}

/// Controls the speed of the combat simulation in ticks per frame
#[derive(Resource)]
pub struct SimulationSpeed {
    /// Ticks per frame (0.0 = paused, 0.5 = every other frame, 1.0 = normal)
    pub multiplier: f32,
    /// Fractional ticks carried over to the next frame
    carry: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SimulationSpeed {
    pub fn new(multiplier: f32) -> Self {
        Self {
            multiplier: multiplier.max(0.0),
            carry: 0.0,
        }
    }

    pub fn pause(&mut self) {
        self.multiplier = 0.0;
    }

    pub fn half_speed(&mut self) {
        self.multiplier = 0.5;
    }

    pub fn normal_speed(&mut self) {
        self.multiplier = 1.0;
    }

    pub fn double_speed(&mut self) {
        self.multiplier = 2.0;
    }

    pub fn triple_speed(&mut self) {
        self.multiplier = 3.0;
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }

    /// Whole ticks to run this frame
    pub fn ticks_this_frame(&mut self) -> u32 {
        self.carry += self.multiplier;
        let ticks = self.carry.floor();
        self.carry -= ticks;
        ticks as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_speed_ticks_every_other_frame() {
        let mut speed = SimulationSpeed::default();
        speed.half_speed();
        let ticks: Vec<u32> = (0..4).map(|_| speed.ticks_this_frame()).collect();
        assert_eq!(ticks, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_paused_never_ticks() {
        let mut speed = SimulationSpeed::new(3.0);
        assert_eq!(speed.ticks_this_frame(), 3);
        speed.pause();
        assert!(speed.is_paused());
        assert_eq!(speed.ticks_this_frame(), 0);
    }
}
