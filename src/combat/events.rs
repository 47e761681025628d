//! Combat events
//!
//! Bevy events published by the match shell so presentation and tooling can
//! react without reaching into the match.

use bevy::prelude::*;

use crate::error::ActionRejection;
use crate::states::match_config::Side;
use crate::states::play_match::results::MatchResult;

use super::log::CombatLogEntry;

/// A new combat log line, published in log order
#[derive(Event, Debug, Clone)]
pub struct CombatLogEvent {
    pub entry: CombatLogEntry,
}

/// An intent was refused, at submission or when it resolved
#[derive(Event, Debug, Clone, Copy)]
pub struct ActionRejectedEvent {
    pub side: Side,
    pub rejection: ActionRejection,
}

/// The active match resolved and was torn down
#[derive(Event, Debug, Clone)]
pub struct MatchResolvedEvent {
    pub result: MatchResult,
}
