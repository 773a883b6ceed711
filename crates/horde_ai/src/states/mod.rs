//! Behaviour states
//!
//! Each state owns its own timers and exposes the same small lifecycle:
//! `enter`, `update` and `exit`. `update` returns a [`StateOutcome`] that the
//! coordinator inspects; states never call back into the coordinator.
//! `exit` is idempotent and is the only place a state clears its timers, so
//! normal and forced exits share one teardown path.

pub mod chasing;
pub mod detecting;
pub mod idle;
pub mod wander_path;
pub mod wandering;

pub use chasing::ChasingState;
pub use detecting::{DetectingState, InvestigationPhase};
pub use idle::IdleState;
pub use wander_path::{WanderDirection, WanderPath, WanderStep};
pub use wandering::WanderingState;

use crate::animation::Animator;
use crate::body::Locomotion;
use crate::tracking::{AgentId, ChaseTracker};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four behaviour states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Standing still
    Idle,
    /// Walking the wander path
    Wandering,
    /// Investigating a far sighting
    Detecting,
    /// Pursuing a bound target
    Chasing,
}

impl BehaviorState {
    /// Engaged states are bound to a target or a sighting
    pub fn is_engaged(&self) -> bool {
        matches!(self, Self::Detecting | Self::Chasing)
    }

    /// Passive states have no target
    pub fn is_passive(&self) -> bool {
        !self.is_engaged()
    }

    /// State name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Wandering => "Wandering",
            Self::Detecting => "Detecting",
            Self::Chasing => "Chasing",
        }
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a chase stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChaseEndReason {
    /// The target stayed lost for the whole persistence window
    PersistenceExpired,
    /// The target was despawned
    TargetGone,
    /// The target got further away than the maximum chase distance
    OutOfRange,
    /// Someone called `force_exit_current_state`
    Forced,
    /// The chase moved on to a different target
    Retargeted,
}

/// Result of a state update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    /// Nothing for the coordinator to do
    Running,
    /// Investigation reached the point and finished waiting
    InvestigationComplete,
    /// Investigation ran out of time
    TimedOut,
    /// Investigation aborted because the target was lost
    LostTarget,
    /// The chase is over
    ChaseEnded(ChaseEndReason),
}

impl StateOutcome {
    /// Whether the active state has finished
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Collaborators a state may touch while it runs
pub struct StateContext<'a> {
    /// Agent being driven
    pub agent: AgentId,
    /// Transform and movement
    pub body: &'a mut dyn Locomotion,
    /// Animation playback
    pub animator: &'a mut dyn Animator,
    /// Chase relationship bookkeeping
    pub tracker: &'a dyn ChaseTracker,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification() {
        assert!(BehaviorState::Chasing.is_engaged());
        assert!(BehaviorState::Detecting.is_engaged());
        assert!(BehaviorState::Idle.is_passive());
        assert!(BehaviorState::Wandering.is_passive());
        assert_eq!(BehaviorState::Wandering.to_string(), "Wandering");
    }

    #[test]
    fn test_outcome_terminal() {
        assert!(!StateOutcome::Running.is_terminal());
        assert!(StateOutcome::ChaseEnded(ChaseEndReason::OutOfRange).is_terminal());
    }
}
