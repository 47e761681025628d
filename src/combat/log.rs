//! Combat logging
//!
//! Records all combat events for display and post-match analysis.
//! The log is append-only: entries are never edited or removed during a match.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

/// A single entry in the combat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatLogEntry {
    /// Timestamp in match time (seconds since match start)
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
    /// Who hit whom with what, for damage and healing events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<HitDetail>,
}

/// Structured payload of a damage or healing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitDetail {
    pub source: String,
    pub target: String,
    pub ability: String,
    pub amount: f32,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatLogEventType {
    /// Damage dealt by auto-attacks, abilities and followers
    Damage,
    /// Healing done
    Heal,
    /// Ability cast
    SpellCast,
    /// Accumulated bleed damage
    BleedTick,
    /// Evaded or timed-out attack
    Miss,
    /// Hero or follower died
    Death,
    /// Ultimate cast, strike or detonation
    Ultimate,
    /// Follower summoned
    Summon,
    /// Shocked applied
    Shock,
    /// Hero entered stealth
    StealthEnter,
    /// Accumulated poison damage
    PoisonTick,
    /// Stun applied or resisted
    Stun,
    /// Match event (start, end, waves, aborts)
    MatchEvent,
}

/// The combat log storing all events of one match
#[derive(Resource, Debug, Clone, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current match time in seconds
    pub match_time: f32,
}

impl CombatLog {
    /// Clear the log for a new match
    pub fn clear(&mut self) {
        self.entries.clear();
        self.match_time = 0.0;
    }

    /// Set the clock from match milliseconds
    pub fn set_time_ms(&mut self, now_ms: u64) {
        self.match_time = now_ms as f32 / 1000.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            detail: None,
        });
    }

    /// Add a damage entry with structured data for post-match aggregation
    pub fn log_damage(
        &mut self,
        source: String,
        target: String,
        ability: String,
        amount: f32,
        message: String,
    ) {
        self.log_detailed(CombatLogEventType::Damage, source, target, ability, amount, message);
    }

    /// Add a healing entry with structured data
    pub fn log_heal(
        &mut self,
        source: String,
        target: String,
        ability: String,
        amount: f32,
        message: String,
    ) {
        self.log_detailed(CombatLogEventType::Heal, source, target, ability, amount, message);
    }

    fn log_detailed(
        &mut self,
        event_type: CombatLogEventType,
        source: String,
        target: String,
        ability: String,
        amount: f32,
        message: String,
    ) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            detail: Some(HitDetail {
                source,
                target,
                ability,
                amount,
            }),
        });
    }

    /// Total damage per ability dealt by `source`
    pub fn damage_by_ability(&self, source: &str) -> HashMap<String, f32> {
        let mut totals = HashMap::new();
        for detail in self
            .entries
            .iter()
            .filter(|e| e.event_type == CombatLogEventType::Damage)
            .filter_map(|e| e.detail.as_ref())
            .filter(|d| d.source == source)
        {
            *totals.entry(detail.ability.clone()).or_insert(0.0) += detail.amount;
        }
        totals
    }

    /// Total damage taken by `target` from every source
    pub fn damage_taken_by(&self, target: &str) -> f32 {
        self.entries
            .iter()
            .filter(|e| e.event_type == CombatLogEventType::Damage)
            .filter_map(|e| e.detail.as_ref())
            .filter(|d| d.target == target)
            .map(|d| d.amount)
            .sum()
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get only HP-changing events (damage, healing and damage over time)
    pub fn hp_changes_only(&self) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CombatLogEventType::Damage
                        | CombatLogEventType::Heal
                        | CombatLogEventType::BleedTick
                        | CombatLogEventType::PoisonTick
                )
            })
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Entries appended since the first `seen` entries
    pub fn since(&self, seen: usize) -> &[CombatLogEntry] {
        &self.entries[seen.min(self.entries.len())..]
    }

    /// Write the log as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
