//! Headless match execution
//!
//! Runs matches without any graphical output, suitable for automated testing.
//! A single Bevy app (`MinimalPlugins` + `CombatPlugin`) plays every match
//! of an invocation; ladder and dungeon runs feed it one setup after another.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::combat::events::MatchResolvedEvent;
use crate::combat::log::CombatLogEntry;
use crate::combat::{ActiveMatch, CombatPlugin, SimulationSpeed};
use crate::error::ConfigError;
use crate::states::match_config::{GameMode, MatchSetup, Side};
use crate::states::play_match::ability_config::{load_class_catalog, ClassCatalog};
use crate::states::play_match::modes::{DungeonRun, LadderRun};
use crate::states::play_match::results::MatchResult;

use super::config::HeadlessMatchConfig;

/// One played match with its full combat log
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub result: MatchResult,
    pub log: Vec<CombatLogEntry>,
}

/// Everything a headless invocation produced
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub mode: GameMode,
    pub matches: Vec<MatchReport>,
}

impl HeadlessReport {
    /// Matches won by the left side
    pub fn left_wins(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.result.winner == Some(Side::Left))
            .count()
    }

    /// Write the report as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Resource to track headless match state
#[derive(Resource, Default)]
pub struct HeadlessMatchState {
    /// Match time after which the active match is aborted
    pub max_duration_ms: u64,
    /// Result of the last match, once it resolves
    pub result: Option<MatchResult>,
}

/// Plugin for headless match execution
pub struct HeadlessPlugin {
    pub max_duration_ms: u64,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(HeadlessMatchState {
            max_duration_ms: self.max_duration_ms,
            result: None,
        })
        .add_systems(
            PostUpdate,
            (headless_enforce_time_limit, headless_capture_result).chain(),
        );
    }
}

/// Abort matches that outlast the configured duration
fn headless_enforce_time_limit(mut active: ResMut<ActiveMatch>, state: Res<HeadlessMatchState>) {
    let Some(game) = active.game.as_mut() else {
        return;
    };
    if game.phase().is_live() && game.now() >= state.max_duration_ms {
        info!("Match timed out after {:.1}s", game.now() as f32 / 1000.0);
        game.abort();
    }
}

fn headless_capture_result(
    mut resolved: EventReader<MatchResolvedEvent>,
    mut state: ResMut<HeadlessMatchState>,
) {
    for event in resolved.read() {
        state.result = Some(event.result.clone());
    }
}

/// Build the headless app around a catalog
pub fn build_headless_app(catalog: Arc<ClassCatalog>, max_duration_ms: u64, ticks_per_frame: f32) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(CombatPlugin { catalog })
        .add_plugins(HeadlessPlugin { max_duration_ms })
        .insert_resource(SimulationSpeed::new(ticks_per_frame));
    app
}

/// Play one match to completion inside the app
pub fn play_match(app: &mut App, setup: MatchSetup) -> Result<MatchReport, ConfigError> {
    let catalog = app.world().resource::<crate::combat::SharedCatalog>().0.clone();
    app.world_mut().resource_mut::<HeadlessMatchState>().result = None;
    app.world_mut()
        .resource_mut::<ActiveMatch>()
        .begin(setup, catalog)?;

    loop {
        app.update();
        if let Some(result) = app.world_mut().resource_mut::<HeadlessMatchState>().result.take() {
            let log = app
                .world()
                .resource::<ActiveMatch>()
                .game
                .as_ref()
                .map(|game| game.log().entries.clone())
                .unwrap_or_default();
            return Ok(MatchReport { result, log });
        }
    }
}

/// Play everything the configuration asks for
pub fn run_headless(
    config: &HeadlessMatchConfig,
    catalog: Arc<ClassCatalog>,
) -> Result<HeadlessReport, ConfigError> {
    config.check_against(&catalog)?;
    let mut app = build_headless_app(catalog.clone(), config.max_duration_ms(), config.ticks_per_frame);
    let mut matches = Vec::new();
    // Each round gets its own seed so a seeded run stays reproducible
    let round_seed = |round: u32| config.random_seed.map(|seed| seed.wrapping_add(round as u64));

    match config.to_match_setup(&catalog)? {
        Some(setup) => matches.push(play_match(&mut app, setup)?),
        None if config.mode == GameMode::Ladder => {
            let mut run = LadderRun::new(config.left_side()?, config.random_seed);
            for round in 0..config.rounds {
                let Some(setup) = run.next_match(&catalog, round_seed(round)) else {
                    break;
                };
                let report = play_match(&mut app, setup)?;
                run.record(&report.result);
                matches.push(report);
            }
            info!("Ladder run finished with {} wins", run.wins());
        }
        None => {
            let mut run = DungeonRun::new(config.left_side()?, config.random_seed);
            for round in 0..config.rounds {
                let Some(setup) = run.next_match(&catalog, round_seed(round)) else {
                    break;
                };
                let report = play_match(&mut app, setup)?;
                run.record(&report.result);
                matches.push(report);
            }
            info!(
                "Dungeon run reached floor {} ({} monsters slain)",
                run.floor(),
                run.monsters_slain()
            );
        }
    }

    Ok(HeadlessReport {
        mode: config.mode,
        matches,
    })
}

/// Run a headless invocation from the command line
pub fn run_headless_match(config: HeadlessMatchConfig) -> Result<HeadlessReport, ConfigError> {
    // The file on disk wins so balance changes need no rebuild
    let catalog = match load_class_catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("Using the built-in catalog ({})", err);
            ClassCatalog::builtin()?
        }
    };
    catalog.validate()?;

    // Install logging once, in a throwaway app
    App::new().add_plugins(LogPlugin::default()).update();

    println!("Starting headless simulation...");
    println!("  Mode: {:?}", config.mode);
    println!("  Left: {:?}", config.left.as_deref().unwrap_or("custom build"));
    println!("  Max duration: {:.0}s", config.max_duration_secs);

    let report = run_headless(&config, Arc::new(catalog))?;

    for (index, m) in report.matches.iter().enumerate() {
        let result = &m.result;
        println!(
            "Match {}: {} vs {}: {} ({:?}, {:.1}s, seed {})",
            index + 1,
            result.heroes[0].name,
            result.heroes[1].name,
            result
                .winner_snapshot()
                .map(|h| format!("{} wins", h.name))
                .unwrap_or_else(|| "no winner".to_string()),
            result.reason,
            result.duration_secs(),
            result.seed
        );
    }

    if let Some(path) = &config.output_path {
        report.save_to_file(Path::new(path))?;
        println!("Report saved to: {}", path);
    }
    Ok(report)
}
