//! Error taxonomy for the combat engine.
//!
//! - `ActionRejection`: a requested action failed a precondition. Recoverable,
//!   nothing was mutated.
//! - `CombatError`: what the mode controller reports to its callers.
//! - `ConfigError`: catalog and headless configuration loading.

use thiserror::Error;

use crate::states::match_config::Side;
use crate::states::play_match::abilities::AbilityKey;
use crate::states::play_match::match_flow::MatchPhase;

/// Why an ability request was refused. Checked in this order: liveness and
/// stun, cooldown, single-use flag, resource, then threshold and range.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ActionRejection {
    #[error("caster is dead")]
    Dead,

    #[error("caster is stunned")]
    Stunned,

    #[error("{ability:?} is on cooldown for another {remaining_ms}ms")]
    OnCooldown { ability: AbilityKey, remaining_ms: u64 },

    #[error("{0:?} has already been used this match")]
    AlreadyUsed(AbilityKey),

    #[error("{ability:?} needs {needed:.0} resource, caster has {available:.0}")]
    InsufficientResource {
        ability: AbilityKey,
        needed: f32,
        available: f32,
    },

    #[error("{ability:?} unlocks at {threshold:.0}% health")]
    ThresholdNotMet { ability: AbilityKey, threshold: f32 },

    #[error("{ability:?} target is {distance:.0} away")]
    OutOfRange { ability: AbilityKey, distance: f32 },

    #[error("{0:?} is not in this hero's kit")]
    UnknownAbility(AbilityKey),
}

/// Errors surfaced by the mode controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CombatError {
    #[error("invalid action from {side:?}: {rejection}")]
    InvalidAction {
        side: Side,
        rejection: ActionRejection,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("intent from {side:?} arrived while the match is {phase:?}")]
    StateDesync { side: Side, phase: MatchPhase },
}

/// Errors raised while loading catalogs and match configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, CombatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_name_the_ability() {
        let rejection = ActionRejection::OnCooldown {
            ability: AbilityKey::ChainLightning,
            remaining_ms: 1200,
        };
        assert_eq!(
            rejection.to_string(),
            "ChainLightning is on cooldown for another 1200ms"
        );
    }

    #[test]
    fn test_invalid_action_wraps_rejection() {
        let err = CombatError::InvalidAction {
            side: Side::Left,
            rejection: ActionRejection::Stunned,
        };
        assert_eq!(err.to_string(), "invalid action from Left: caster is stunned");
    }
}
