//! Match Flow
//!
//! Handles the overall flow of a match:
//! - Building both sides from a `MatchSetup` (heroes, buffs, arena followers)
//! - The one-way phase machine `Setup -> InProgress -> Resolved -> Teardown`
//! - The fixed-step tick and its resolution order
//! - Dungeon wave advancement and match end detection
//!
//! ## Tick order
//! 1. Upkeep: cooldowns, regen, counter decay, effect expiry, ultimate strikes, DoTs
//! 2. Intents: Left then Right (human queue or AI policy)
//! 3. Movement
//! 4. Auto-attacks
//! 5. Projectiles
//! 6. Followers
//! 7. Terminal check: the first hero to fall loses
//!
//! Every tick runs against a checkpoint. If the step panics or leaves a hero
//! outside its invariants, the checkpoint is restored and the defect is logged.

use bevy::prelude::*;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::error::{CombatError, ConfigError};
use crate::states::match_config::{Controller, GameMode, HeroSpec, MatchSetup, Side, SideSetup};

use super::abilities::{cast, validate_cast, ActionIntent};
use super::ability_config::ClassCatalog;
use super::auras::{effective_attack_speed, process_expirations, Surroundings};
use super::abilities::process_strikes;
use super::class_ai::decide_for;
use super::combat_core::{launch_auto_attack, move_hero, resolve_projectiles, tick_damage_over_time};
use super::components::{GameRng, Hero};
use super::constants::*;
use super::followers::{remove_dead_followers, spawn_follower, tick_followers};
use super::projectiles::{step_projectiles, Projectile};
use super::results::{HeroSnapshot, MatchResult};
use super::utils::{pair_mut, CombatEnv};
use crate::error::ActionRejection;

// ============================================================================
// Phases
// ============================================================================

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EndReason {
    /// A hero's health reached zero
    Knockout,
    /// The dungeon hero defeated the last queued wave
    WavesCleared,
    /// Forfeit, disconnect or an external time limit
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// None when the match was aborted
    pub winner: Option<Side>,
    pub reason: EndReason,
}

/// Lifecycle of a match. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Setup,
    InProgress,
    Resolved(Outcome),
    Teardown,
}

impl MatchPhase {
    pub fn is_live(&self) -> bool {
        matches!(self, MatchPhase::Setup | MatchPhase::InProgress)
    }
}

/// Intents queued for one side, consumed at the next tick
pub type IntentQueue = SmallVec<[ActionIntent; 4]>;

/// Everything a tick can change except the clock. Restored when a tick fails;
/// time still moves on so a repeating defect cannot stall the match.
struct Checkpoint {
    phase: MatchPhase,
    heroes: [Hero; 2],
    pending: [IntentQueue; 2],
    projectiles: Vec<Projectile>,
    waves: VecDeque<HeroSpec>,
    waves_cleared: u32,
    rng: GameRng,
    log_len: usize,
    rejections_len: usize,
    timed_out: usize,
}

// ============================================================================
// Match
// ============================================================================

/// One encounter between two sides. Owns every piece of mutable combat state.
pub struct Match {
    mode: GameMode,
    phase: MatchPhase,
    heroes: [Hero; 2],
    controllers: [Controller; 2],
    pending: [IntentQueue; 2],
    projectiles: Vec<Projectile>,
    waves: VecDeque<HeroSpec>,
    waves_cleared: u32,
    rng: GameRng,
    log: CombatLog,
    catalog: Arc<ClassCatalog>,
    now: u64,
    seed: u64,
    /// Rejections from queued intents, drained by the application shell
    rejections: Vec<(Side, ActionRejection)>,
    /// Projectiles discarded without landing
    timed_out: usize,
}

impl Match {
    /// Build both sides. Equipment buffs and arena follower buffs are folded
    /// into the heroes here, before the first tick.
    pub fn new(setup: MatchSetup, catalog: Arc<ClassCatalog>) -> Result<Self, ConfigError> {
        let seed = setup.random_seed.unwrap_or_else(rand::random);
        let left = build_side(&setup.left, Side::Left, &catalog)?;
        let right = build_side(&setup.right, Side::Right, &catalog)?;

        if setup.mode != GameMode::Dungeon && !setup.waves.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{:?} matches do not take monster waves",
                setup.mode
            )));
        }

        info!(
            "Match set up: {:?}, {} vs {} (seed {})",
            setup.mode, left.name, right.name, seed
        );

        Ok(Self {
            mode: setup.mode,
            phase: MatchPhase::Setup,
            heroes: [left, right],
            controllers: [setup.left.controller, setup.right.controller],
            pending: Default::default(),
            projectiles: Vec::new(),
            waves: setup.waves.into_iter().collect(),
            waves_cleared: 0,
            rng: GameRng::from_seed(seed),
            log: CombatLog::default(),
            catalog,
            now: 0,
            seed,
            rejections: Vec::new(),
            timed_out: 0,
        })
    }

    // === Accessors ===

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Match time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn hero(&self, side: Side) -> &Hero {
        &self.heroes[side.index()]
    }

    pub fn heroes(&self) -> &[Hero; 2] {
        &self.heroes
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    pub fn waves_remaining(&self) -> usize {
        self.waves.len()
    }

    pub fn waves_cleared(&self) -> u32 {
        self.waves_cleared
    }

    pub fn take_rejections(&mut self) -> Vec<(Side, ActionRejection)> {
        std::mem::take(&mut self.rejections)
    }

    pub fn snapshot(&self, side: Side) -> HeroSnapshot {
        HeroSnapshot::capture(self.hero(side), self.now)
    }

    // === Lifecycle ===

    /// Open the gates. Only valid from `Setup`; returns false otherwise.
    pub fn start(&mut self) -> bool {
        if self.phase != MatchPhase::Setup {
            warn!("start() called while the match is {:?}", self.phase);
            return false;
        }
        self.phase = MatchPhase::InProgress;
        self.log.set_time_ms(self.now);
        self.log.log(
            CombatLogEventType::MatchEvent,
            format!(
                "Gates open! {} vs {}",
                self.heroes[0].name, self.heroes[1].name
            ),
        );
        true
    }

    /// Force `Resolved(Aborted)` from any live phase.
    pub fn abort(&mut self) {
        if !self.phase.is_live() {
            return;
        }
        self.phase = MatchPhase::Resolved(Outcome {
            winner: None,
            reason: EndReason::Aborted,
        });
        self.log.set_time_ms(self.now);
        self.log
            .log(CombatLogEventType::MatchEvent, "Match aborted".to_string());
        info!("Match aborted at {}ms", self.now);
    }

    /// Move a resolved match to `Teardown` and hand back its result.
    pub fn teardown(&mut self) -> Option<MatchResult> {
        let result = self.result()?;
        self.phase = MatchPhase::Teardown;
        self.projectiles.clear();
        Some(result)
    }

    /// The final result, once the match is resolved
    pub fn result(&self) -> Option<MatchResult> {
        match self.phase {
            MatchPhase::Resolved(outcome) => Some(MatchResult::from_match(self, outcome)),
            _ => None,
        }
    }

    // === Input ===

    /// Queue an ability for a human-controlled side. The intent is checked
    /// now and again when it resolves at the next tick.
    pub fn submit_intent(&mut self, side: Side, intent: ActionIntent) -> Result<(), CombatError> {
        if self.phase != MatchPhase::InProgress {
            warn!(
                "Dropping {:?} from {:?}: match is {:?}",
                intent.ability, side, self.phase
            );
            return Err(CombatError::StateDesync {
                side,
                phase: self.phase,
            });
        }

        let (me, enemy) = (&self.heroes[side.index()], &self.heroes[side.opponent().index()]);
        if let Err(rejection) = validate_cast(me, enemy, intent.ability, &self.catalog, self.now) {
            debug!("{:?} intent rejected: {}", side, rejection);
            return Err(CombatError::InvalidAction { side, rejection });
        }

        self.pending[side.index()].push(intent);
        Ok(())
    }

    // === Simulation ===

    /// Advance the match by one fixed tick. A no-op outside `InProgress`.
    pub fn tick(&mut self) -> Result<(), CombatError> {
        if self.phase != MatchPhase::InProgress {
            return Ok(());
        }

        let checkpoint = self.checkpoint();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.step()));
        let defect = match outcome {
            Ok(()) => self
                .heroes
                .iter()
                .map(Hero::check_invariants)
                .find_map(Result::err),
            Err(payload) => Some(panic_message(payload)),
        };

        if let Some(message) = defect {
            error!(
                "Tick at {}ms failed, restoring last consistent state: {}",
                self.now, message
            );
            self.restore(checkpoint);
            return Err(CombatError::InvariantViolation(message));
        }
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            phase: self.phase,
            heroes: self.heroes.clone(),
            pending: self.pending.clone(),
            projectiles: self.projectiles.clone(),
            waves: self.waves.clone(),
            waves_cleared: self.waves_cleared,
            rng: self.rng.clone(),
            log_len: self.log.entries.len(),
            rejections_len: self.rejections.len(),
            timed_out: self.timed_out,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.phase = checkpoint.phase;
        self.heroes = checkpoint.heroes;
        self.pending = checkpoint.pending;
        self.projectiles = checkpoint.projectiles;
        self.waves = checkpoint.waves;
        self.waves_cleared = checkpoint.waves_cleared;
        self.rng = checkpoint.rng;
        self.log.entries.truncate(checkpoint.log_len);
        self.rejections.truncate(checkpoint.rejections_len);
        self.timed_out = checkpoint.timed_out;
    }

    /// Tick until the match resolves or `max_ticks` pass. Returns ticks run.
    pub fn run_until_resolved(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while self.phase == MatchPhase::InProgress && ticks < max_ticks {
            // Defects are logged inside tick(); the loop keeps going
            let _ = self.tick();
            ticks += 1;
        }
        ticks
    }

    fn step(&mut self) {
        self.now += TICK_MS;
        let now = self.now;
        let heroes = &mut self.heroes;
        let mut env = CombatEnv::new(now, &mut self.rng, &mut self.log, &self.catalog);

        // Upkeep
        for hero in heroes.iter_mut() {
            hero.tick_cooldowns(TICK_MS);
            hero.regen_tick(TICK_MS, now);
            hero.decay_counters(TICK_MS);
        }
        process_expirations(heroes, &mut env);
        process_strikes(heroes, TICK_MS, &mut env);
        tick_damage_over_time(heroes, TICK_MS, &mut env);

        // Intents, Left before Right
        for side in Side::BOTH {
            if heroes.iter().any(|h| !h.is_alive()) {
                break;
            }
            let intents: IntentQueue = match self.controllers[side.index()] {
                Controller::Human => std::mem::take(&mut self.pending[side.index()]),
                Controller::Ai => {
                    let (me, enemy) = (&heroes[side.index()], &heroes[side.opponent().index()]);
                    decide_for(me, enemy, env.catalog, now).into_iter().collect()
                }
            };
            for intent in intents {
                if let Err(rejection) = cast(heroes, side, intent, &mut env) {
                    debug!("{:?} {:?} rejected at {}ms: {}", side, intent.ability, now, rejection);
                    self.rejections.push((side, rejection));
                }
            }
        }

        // Movement
        for side in Side::BOTH {
            move_hero(heroes, side, TICK_MS, now);
        }

        // Auto-attacks
        for side in Side::BOTH {
            if heroes.iter().any(|h| !h.is_alive()) {
                break;
            }
            tick_auto_attack(heroes, side, &mut self.projectiles, &mut env);
        }

        // Projectiles
        let (landed, timed_out) = step_projectiles(&mut self.projectiles, TICK_MS);
        self.timed_out += timed_out;
        resolve_projectiles(heroes, landed, &mut env);

        // Followers
        tick_followers(heroes, &mut env, TICK_MS);
        remove_dead_followers(heroes);

        let fallen = std::mem::take(&mut env.fallen);
        drop(env);
        self.check_terminal(fallen);
    }

    fn check_terminal(&mut self, fallen: Vec<Side>) {
        let first = fallen
            .first()
            .copied()
            .or_else(|| Side::BOTH.into_iter().find(|s| !self.heroes[s.index()].is_alive()));
        let Some(loser) = first else {
            return;
        };

        // A dungeon hero that fells a monster faces the next wave
        if self.mode == GameMode::Dungeon && loser == Side::Right && self.heroes[0].is_alive() {
            self.waves_cleared += 1;
            if let Some(next) = self.waves.pop_front() {
                self.spawn_wave(next);
                return;
            }
            self.resolve(Outcome {
                winner: Some(Side::Left),
                reason: EndReason::WavesCleared,
            });
            return;
        }

        self.resolve(Outcome {
            winner: Some(loser.opponent()),
            reason: EndReason::Knockout,
        });
    }

    fn spawn_wave(&mut self, spec: HeroSpec) {
        match Hero::from_spec(&spec, Side::Right, &self.catalog) {
            Ok(monster) => {
                self.log.log(
                    CombatLogEventType::MatchEvent,
                    format!("Wave {}: {} appears!", self.waves_cleared + 1, monster.name),
                );
                info!("Dungeon wave {} spawned: {}", self.waves_cleared + 1, monster.name);
                self.heroes[Side::Right.index()] = monster;
                self.projectiles.retain(|p| p.owner == Side::Left);
                self.pending[Side::Right.index()].clear();
            }
            Err(err) => {
                error!("Could not spawn dungeon wave: {}", err);
                self.resolve(Outcome {
                    winner: Some(Side::Left),
                    reason: EndReason::WavesCleared,
                });
            }
        }
    }

    fn resolve(&mut self, outcome: Outcome) {
        debug_assert!(self.phase == MatchPhase::InProgress, "resolve() from {:?}", self.phase);
        let message = match outcome.winner {
            Some(side) => format!("{} WINS!", self.heroes[side.index()].name),
            None => "No winner".to_string(),
        };
        self.log.log(CombatLogEventType::MatchEvent, message);
        info!(
            "Match resolved at {}ms: {:?} ({:?})",
            self.now, outcome.winner, outcome.reason
        );
        if self.timed_out > 0 {
            debug!("{} projectiles timed out without landing", self.timed_out);
        }
        self.phase = MatchPhase::Resolved(outcome);
    }
}

/// Build one side's hero, fold in its buffs and bring out its arena followers.
fn build_side(setup: &SideSetup, side: Side, catalog: &ClassCatalog) -> Result<Hero, ConfigError> {
    let mut hero = Hero::from_spec(&setup.hero, side, catalog)?;
    for buff in &setup.buffs {
        hero.apply_buff(buff);
    }
    for name in &setup.followers {
        let template = catalog
            .follower(name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown follower '{}'", name)))?;
        hero.apply_buff(&template.buff);
        spawn_follower(&mut hero, template, false);
    }
    Ok(hero)
}

/// Count down the swing timer and attack when it runs out. A swing that finds
/// nothing in reach retries shortly after.
fn tick_auto_attack(
    heroes: &mut [Hero; 2],
    side: Side,
    projectiles: &mut Vec<Projectile>,
    env: &mut CombatEnv,
) {
    let now = env.now;
    let speed = {
        let (hero, enemy) = pair_mut(heroes, side);
        hero.attack_timer_ms -= TICK_MS as f32;
        if hero.attack_timer_ms > 0.0 {
            return;
        }
        effective_attack_speed(hero, &Surroundings::facing(enemy, now))
    };

    let attacked = speed > 0.0 && launch_auto_attack(heroes, side, projectiles, env);
    let hero = &mut heroes[side.index()];
    hero.attack_timer_ms = if attacked {
        1000.0 / speed
    } else {
        ATTACK_RETRY_MS
    };
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tick panicked".to_string()
    }
}
