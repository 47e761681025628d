//! JSON configuration parsing for headless mode
//!
//! Parses JSON match configurations and converts them to `MatchSetup`s.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::states::match_config::{
    CustomBuild, GameMode, HeroClass, HeroSpec, MatchSetup, SideSetup, StatBuff,
};
use crate::states::play_match::ability_config::ClassCatalog;

/// Headless match configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessMatchConfig {
    /// Arena, Ladder or Dungeon (default: Arena)
    #[serde(default = "default_mode")]
    pub mode: GameMode,
    /// Left hero class name ("Wizard", "Ranger", "Assassin", "Barbarian")
    #[serde(default)]
    pub left: Option<String>,
    /// Right hero: a class name in arena mode, a monster name in dungeon mode.
    /// Ignored on the ladder, which picks its own opponents.
    #[serde(default)]
    pub right: Option<String>,
    /// Custom build for the left side (overrides `left`)
    #[serde(default)]
    pub left_build: Option<CustomBuild>,
    /// Custom build for the right side (overrides `right`, arena only)
    #[serde(default)]
    pub right_build: Option<CustomBuild>,
    /// Arena follower template names brought by each side
    #[serde(default)]
    pub left_followers: Vec<String>,
    #[serde(default)]
    pub right_followers: Vec<String>,
    /// Equipment stat deltas for each side
    #[serde(default)]
    pub left_buffs: Vec<StatBuff>,
    #[serde(default)]
    pub right_buffs: Vec<StatBuff>,
    /// Dungeon monsters queued behind `right`
    #[serde(default)]
    pub waves: Vec<String>,
    /// Matches to play in a ladder or dungeon run (default: 1)
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Custom output path for the match report (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Maximum match duration in seconds (default: 300)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Simulation ticks per frame (default: 20)
    #[serde(default = "default_ticks_per_frame")]
    pub ticks_per_frame: f32,
    /// Random seed for deterministic match reproduction
    /// If provided, the match will use a seeded RNG for reproducible results
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_mode() -> GameMode {
    GameMode::Arena
}

fn default_rounds() -> u32 {
    1
}

fn default_max_duration() -> f32 {
    300.0
}

fn default_ticks_per_frame() -> f32 {
    20.0
}

impl HeadlessMatchConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: HeadlessMatchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that need no catalog
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.left.is_none() && self.left_build.is_none() {
            return invalid("left needs a class name or a left_build");
        }
        if let Some(name) = &self.left {
            Self::parse_class(name)?;
        }

        match self.mode {
            GameMode::Arena => {
                match (&self.right, &self.right_build) {
                    (None, None) => return invalid("arena matches need a right class or right_build"),
                    (Some(name), None) => {
                        Self::parse_class(name)?;
                    }
                    _ => {}
                }
                if !self.waves.is_empty() {
                    return invalid("waves are only used in dungeon mode");
                }
            }
            GameMode::Ladder => {
                if self.right.is_some() || self.right_build.is_some() {
                    return invalid("ladder opponents are generated, drop right/right_build");
                }
            }
            GameMode::Dungeon => {
                if self.right_build.is_some() || !self.right_followers.is_empty() {
                    return invalid("dungeon monsters take no builds or followers");
                }
            }
        }

        if self.rounds == 0 {
            return invalid("rounds must be at least 1");
        }
        // Validate max duration
        if self.max_duration_secs <= 0.0 {
            return invalid("max_duration_secs must be positive");
        }
        if self.ticks_per_frame <= 0.0 {
            return invalid("ticks_per_frame must be positive");
        }
        Ok(())
    }

    /// Parse a class name string into HeroClass
    pub fn parse_class(name: &str) -> Result<HeroClass, ConfigError> {
        HeroClass::all()
            .iter()
            .copied()
            .find(|class| class.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Unknown class: '{}'. Valid classes: Wizard, Ranger, Assassin, Barbarian",
                    name
                ))
            })
    }

    pub fn max_duration_ms(&self) -> u64 {
        (self.max_duration_secs * 1000.0) as u64
    }

    fn hero_spec(name: &Option<String>, build: &Option<CustomBuild>) -> Result<HeroSpec, ConfigError> {
        match (build, name) {
            (Some(build), _) => Ok(HeroSpec::Custom(build.clone())),
            (None, Some(name)) => Ok(HeroSpec::Class(Self::parse_class(name)?)),
            (None, None) => invalid("missing hero"),
        }
    }

    /// The player's side (ladder and dungeon runs always put the player on the left)
    pub fn left_side(&self) -> Result<SideSetup, ConfigError> {
        Ok(SideSetup {
            buffs: self.left_buffs.clone(),
            followers: self.left_followers.clone(),
            ..SideSetup::ai(Self::hero_spec(&self.left, &self.left_build)?)
        })
    }

    /// Check every name against the catalog
    pub fn check_against(&self, catalog: &ClassCatalog) -> Result<(), ConfigError> {
        for name in self.left_followers.iter().chain(&self.right_followers) {
            if catalog.follower(name).is_none() {
                return invalid(&format!("unknown follower '{}'", name));
            }
        }
        let monsters = self.right.iter().filter(|_| self.mode == GameMode::Dungeon);
        for name in monsters.chain(&self.waves) {
            if !catalog.monsters().iter().any(|m| &m.name == name) {
                return invalid(&format!("unknown monster '{}'", name));
            }
        }
        for build in self.left_build.iter().chain(&self.right_build) {
            if build.skills.len() > 2 {
                return invalid(&format!("{} has more than two skills", build.name));
            }
            for key in build.skills.iter().chain(&build.ultimate) {
                if catalog.get(*key).is_none() {
                    return invalid(&format!("{} uses unknown ability {:?}", build.name, key));
                }
            }
        }
        Ok(())
    }

    /// The single arena match, or a dungeon encounter with explicit waves.
    /// None when the mode generates its own encounters.
    pub fn to_match_setup(&self, catalog: &ClassCatalog) -> Result<Option<MatchSetup>, ConfigError> {
        self.check_against(catalog)?;
        let left = self.left_side()?;
        let setup = match self.mode {
            GameMode::Arena => MatchSetup {
                mode: GameMode::Arena,
                left,
                right: SideSetup {
                    buffs: self.right_buffs.clone(),
                    followers: self.right_followers.clone(),
                    ..SideSetup::ai(Self::hero_spec(&self.right, &self.right_build)?)
                },
                waves: Vec::new(),
                random_seed: self.random_seed,
            },
            GameMode::Dungeon => match &self.right {
                Some(first) => MatchSetup {
                    mode: GameMode::Dungeon,
                    left,
                    right: SideSetup::ai(HeroSpec::Monster(first.clone())),
                    waves: self.waves.iter().cloned().map(HeroSpec::Monster).collect(),
                    random_seed: self.random_seed,
                },
                None => return Ok(None),
            },
            GameMode::Ladder => return Ok(None),
        };
        Ok(Some(setup))
    }
}

fn invalid<T>(message: &str) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(message.to_string()))
}
