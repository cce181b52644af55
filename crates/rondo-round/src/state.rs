//! Round lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a round.
///
/// States are totally ordered. A round only moves forward, except through
/// an explicit reset when the round is restarted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Collecting VRF shares.
    #[default]
    ShareVrf,
    /// Random seed is known.
    VrfComplete,
    /// Generating a block.
    Generating,
    /// A block was generated.
    Generated,
    /// Collecting block proposals from other miners.
    CollectingBlockProposals,
    /// Verification of proposals timed out.
    VerificationTimedOut,
    /// A finalization pipeline owns the round.
    Finalizing,
    /// The round is committed.
    Finalized,
}

impl RoundState {
    /// Returns the state name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShareVrf => "share_vrf",
            Self::VrfComplete => "vrf_complete",
            Self::Generating => "generating",
            Self::Generated => "generated",
            Self::CollectingBlockProposals => "collecting_block_proposals",
            Self::VerificationTimedOut => "verification_timed_out",
            Self::Finalizing => "finalizing",
            Self::Finalized => "finalized",
        }
    }

    /// Returns true for the finalizing and finalized states.
    pub fn is_finalizing_or_finalized(&self) -> bool {
        *self >= Self::Finalizing
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        let states = [
            RoundState::ShareVrf,
            RoundState::VrfComplete,
            RoundState::Generating,
            RoundState::Generated,
            RoundState::CollectingBlockProposals,
            RoundState::VerificationTimedOut,
            RoundState::Finalizing,
            RoundState::Finalized,
        ];

        for pair in states.windows(2) {
            assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_finalizing_or_finalized() {
        assert!(!RoundState::VerificationTimedOut.is_finalizing_or_finalized());
        assert!(RoundState::Finalizing.is_finalizing_or_finalized());
        assert!(RoundState::Finalized.is_finalizing_or_finalized());
    }

    #[test]
    fn test_state_serde_name() {
        let json = serde_json::to_string(&RoundState::VrfComplete).unwrap();
        assert_eq!(json, "\"vrf_complete\"");
    }
}
