//! Combat systems
//!
//! ECS systems that drive the active match. They run chained in `Update`:
//! intents in, ticks, log and snapshot out, then teardown.

use bevy::prelude::*;

use crate::error::CombatError;
use crate::states::match_config::Side;
use crate::states::play_match::results::HeroSnapshot;

use super::events::*;
use super::{ActiveMatch, HeroSnapshots, PendingIntents, SimulationSpeed};

/// Hand queued human intents to the match
pub fn submit_pending_intents(
    mut active: ResMut<ActiveMatch>,
    mut pending: ResMut<PendingIntents>,
    mut rejected: EventWriter<ActionRejectedEvent>,
) {
    let Some(game) = active.game.as_mut() else {
        pending.queue.clear();
        return;
    };
    for (side, intent) in pending.queue.drain(..) {
        if let Err(CombatError::InvalidAction { side, rejection }) = game.submit_intent(side, intent) {
            rejected.send(ActionRejectedEvent { side, rejection });
        }
    }
}

/// Run this frame's share of ticks
pub fn advance_match(
    mut active: ResMut<ActiveMatch>,
    mut speed: ResMut<SimulationSpeed>,
    mut rejected: EventWriter<ActionRejectedEvent>,
) {
    let ticks = speed.ticks_this_frame();
    let Some(game) = active.game.as_mut() else {
        return;
    };
    for _ in 0..ticks {
        // Defects are restored and logged inside tick()
        let _ = game.tick();
    }
    for (side, rejection) in game.take_rejections() {
        rejected.send(ActionRejectedEvent { side, rejection });
    }
}

/// Publish log lines appended since the last frame
pub fn publish_combat_log(mut active: ResMut<ActiveMatch>, mut writer: EventWriter<CombatLogEvent>) {
    let active = &mut *active;
    let Some(game) = active.game.as_ref() else {
        return;
    };
    let fresh = game.log().since(active.published);
    for entry in fresh {
        writer.send(CombatLogEvent {
            entry: entry.clone(),
        });
    }
    active.published += fresh.len();
}

pub fn refresh_snapshots(active: Res<ActiveMatch>, mut snapshots: ResMut<HeroSnapshots>) {
    snapshots.heroes = active
        .game
        .as_ref()
        .map(|game| [game.snapshot(Side::Left), game.snapshot(Side::Right)]);
}

/// Tear down a resolved match and announce its result
pub fn finish_match(mut active: ResMut<ActiveMatch>, mut resolved: EventWriter<MatchResolvedEvent>) {
    let Some(game) = active.game.as_mut() else {
        return;
    };
    if let Some(result) = game.teardown() {
        info!(
            "{} ({:?} in {:.1}s)",
            result
                .winner_snapshot()
                .map(|hero: &HeroSnapshot| format!("{} wins", hero.name))
                .unwrap_or_else(|| "No winner".to_string()),
            result.reason,
            result.duration_secs()
        );
        resolved.send(MatchResolvedEvent { result });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::CombatPlugin;
    use crate::states::match_config::{HeroClass, MatchSetup};
    use crate::states::play_match::ability_config::ClassCatalog;
    use std::sync::Arc;

    fn app_with_match(seed: u64) -> App {
        let catalog = Arc::new(ClassCatalog::builtin().unwrap());
        let mut app = App::new();
        app.add_plugins(CombatPlugin {
            catalog: catalog.clone(),
        });
        app.world_mut()
            .resource_mut::<ActiveMatch>()
            .begin(
                MatchSetup::arena(HeroClass::Wizard, HeroClass::Ranger, Some(seed)),
                catalog,
            )
            .unwrap();
        app
    }

    #[test]
    fn test_one_tick_per_frame_at_normal_speed() {
        let mut app = app_with_match(3);
        app.update();
        app.update();
        let active = app.world().resource::<ActiveMatch>();
        assert_eq!(active.game.as_ref().unwrap().now(), 100);
        assert!(app.world().resource::<HeroSnapshots>().heroes.is_some());
    }

    #[test]
    fn test_match_resolves_and_publishes_result() {
        let mut app = app_with_match(8);
        app.world_mut().resource_mut::<SimulationSpeed>().multiplier = 200.0;

        let mut result = None;
        for _ in 0..400 {
            app.update();
            let events = app.world().resource::<Events<MatchResolvedEvent>>();
            if let Some(event) = events.get_reader().read(events).next() {
                result = Some(event.result.clone());
                break;
            }
        }
        let result = result.expect("match resolves before the frame limit");
        assert!(result.winner.is_some());
        assert!(!app.world().resource::<ActiveMatch>().is_running());
    }
}
