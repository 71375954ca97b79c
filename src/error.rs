//! Error taxonomy
//!
//! Every failure in the core is recoverable: callers get a `Result`, the
//! tick driver turns it into a `SimEvent`, and the loop keeps running.

use thiserror::Error;

use crate::sim::ability::AbilityId;
use crate::sim::entity::EntityKind;

/// Why an ability refused to activate. Rejection never mutates the ability.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationError {
    #[error("ability is cooling down")]
    OnCooldown,

    #[error("ability is already active")]
    AlreadyActive,

    #[error("no charges left")]
    NoCharges,

    #[error("no targets in range")]
    NoTargets,
}

/// Why a targeting transition was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Ability is not in its targeting phase
    #[error("not targeting")]
    NotTargeting,
    /// Targeting has no candidate left to commit to
    #[error("no valid target")]
    NoValidTarget,
    /// Selected target has fallen behind the player
    #[error("target is behind the player")]
    TargetBehind,
    /// Ability has no targeting phase at all
    #[error("ability has no targeting phase")]
    NotSupported,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("pool exhausted for {0:?}, spawn dropped")]
    PoolExhausted(EntityKind),

    #[error("unknown ability id: {0}")]
    InvalidAbilityId(String),

    #[error("invalid state transition for {ability:?}: {reason}")]
    InvalidStateTransition {
        ability: AbilityId,
        reason: TransitionReason,
    },

    #[error("stale landing prediction discarded ({overdue:.2}s overdue)")]
    StalePrediction { overdue: f32 },

    #[error("{ability:?} activation rejected: {source}")]
    Activation {
        ability: AbilityId,
        #[source]
        source: ActivationError,
    },
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_message() {
        let err = SimError::InvalidStateTransition {
            ability: AbilityId::Grapple,
            reason: TransitionReason::TargetBehind,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition for Grapple: target is behind the player"
        );
        assert_eq!(TransitionReason::NotSupported.to_string(), "ability has no targeting phase");
    }
}
