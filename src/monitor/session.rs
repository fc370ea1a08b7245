//! Monitoring session phase machine.

use serde::{Deserialize, Serialize};

/// Phase of a monitoring session.
///
/// `Disabled` is terminal: reaching it means monitoring was switched off
/// and any in-flight processing has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the next poll timer tick.
    Idle,
    /// Querying the mailbox for candidates.
    Polling,
    /// Blocked on the human approval prompt for one candidate.
    AwaitingApproval,
    /// Running the approved candidate through the pipeline.
    Processing,
    /// Enforcing the spacing delay before the next candidate.
    Cooldown,
    /// Monitoring switched off; terminal.
    Disabled,
}

impl SessionPhase {
    /// Whether a transition to `target` is part of the session machine.
    ///
    /// `Idle` is reachable from any active phase via explicit stop, and
    /// `Disabled` from any phase once the enabled flag drops.
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;

        if self.is_terminal() {
            return false;
        }
        match (self, target) {
            (_, Idle) | (_, Disabled) => true,
            (Idle, Polling) => true,
            (Polling, AwaitingApproval) => true,
            (AwaitingApproval, Processing) => true,
            // Decline skips Processing and moves to the next candidate.
            (AwaitingApproval, Polling) => true,
            (Processing, Cooldown) => true,
            (Cooldown, Polling) => true,
            // Cooldown applies before the next approval prompt too.
            (Polling, Cooldown) => true,
            (Cooldown, AwaitingApproval) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Processing => "processing",
            Self::Cooldown => "cooldown",
            Self::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}
