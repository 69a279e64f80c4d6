//! Session phase state machine.
//!
//! ```text
//! idle → validating → probing → transferring ⇄ paused
//!                                    ↓
//!                     completed | cancelled | failed
//! ```
//!
//! YouTube sessions go straight from `validating` to `transferring`.
//! Cancel is accepted from every non-terminal phase.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of a download session as seen by the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Validating,
    Probing,
    Transferring,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

/// Rejected phase change.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("cannot move from {from:?} to {to:?}")]
pub struct PhaseError {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

impl SessionPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Probing => "probing",
            Self::Transferring => "transferring",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether `self → to` is a legal edge.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        use SessionPhase::{
            Cancelled, Completed, Failed, Idle, Paused, Probing, Transferring, Validating,
        };

        if self.is_terminal() {
            return false;
        }

        match (*self, to) {
            (_, Cancelled) => true,
            (Idle, Validating)
            | (Validating, Probing | Transferring | Failed)
            | (Probing, Transferring | Failed)
            | (Transferring, Paused | Completed | Failed)
            | (Paused, Transferring | Failed) => true,
            _ => false,
        }
    }
}

/// Tracks the current phase and enforces legal transitions.
#[derive(Clone, Debug)]
pub struct PhaseMachine {
    current: SessionPhase,
}

impl PhaseMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: SessionPhase::Idle,
        }
    }

    #[must_use]
    pub const fn current(&self) -> SessionPhase {
        self.current
    }

    /// Move to `to`, or report why the edge is illegal.
    pub fn transition(&mut self, to: SessionPhase) -> Result<SessionPhase, PhaseError> {
        if self.current.can_transition_to(to) {
            self.current = to;
            Ok(to)
        } else {
            Err(PhaseError {
                from: self.current,
                to,
            })
        }
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_file() {
        let mut machine = PhaseMachine::new();
        for phase in [
            SessionPhase::Validating,
            SessionPhase::Probing,
            SessionPhase::Transferring,
            SessionPhase::Paused,
            SessionPhase::Transferring,
            SessionPhase::Completed,
        ] {
            machine.transition(phase).unwrap();
        }
        assert_eq!(machine.current(), SessionPhase::Completed);
    }

    #[test]
    fn test_youtube_skips_probing() {
        let mut machine = PhaseMachine::new();
        machine.transition(SessionPhase::Validating).unwrap();
        machine.transition(SessionPhase::Transferring).unwrap();
    }

    #[test]
    fn test_pause_only_from_transferring() {
        let mut machine = PhaseMachine::new();
        machine.transition(SessionPhase::Validating).unwrap();
        let err = machine.transition(SessionPhase::Paused).unwrap_err();
        assert_eq!(err.from, SessionPhase::Validating);
        assert_eq!(err.to, SessionPhase::Paused);
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for start in [
            SessionPhase::Idle,
            SessionPhase::Validating,
            SessionPhase::Probing,
            SessionPhase::Transferring,
            SessionPhase::Paused,
        ] {
            assert!(start.can_transition_to(SessionPhase::Cancelled), "{start:?}");
        }
    }

    #[test]
    fn test_terminal_is_final() {
        let mut machine = PhaseMachine::new();
        machine.transition(SessionPhase::Cancelled).unwrap();
        assert!(machine.transition(SessionPhase::Validating).is_err());
        assert!(machine.transition(SessionPhase::Cancelled).is_err());
    }

    #[test]
    fn test_completed_requires_transfer() {
        assert!(!SessionPhase::Probing.can_transition_to(SessionPhase::Completed));
        assert!(!SessionPhase::Paused.can_transition_to(SessionPhase::Completed));
    }
}
