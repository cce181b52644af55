//! VRF share entity.

use rondo_storage::Entity;
use rondo_types::NodeKey;
use serde::{Deserialize, Serialize};

/// One participant's VRF contribution for a round and timeout epoch.
///
/// A round deduplicates shares by [`party`](Self::party), never by payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfShare {
    /// Round the share belongs to.
    pub round: i64,

    /// Share payload.
    pub share: String,

    /// Timeout epoch the share was produced in.
    pub round_timeout_count: i32,

    /// Key of the contributing node.
    party: NodeKey,
}

impl VrfShare {
    /// Creates a new share.
    pub fn new(
        round: i64,
        share: impl Into<String>,
        round_timeout_count: i32,
        party: impl Into<NodeKey>,
    ) -> Self {
        Self {
            round,
            share: share.into(),
            round_timeout_count,
            party: party.into(),
        }
    }

    /// Returns the contributing node's key.
    pub fn party(&self) -> &str {
        &self.party
    }
}

impl Entity for VrfShare {
    const NAME: &'static str = "vrfs";

    /// Shares are addressed by round; every contributor of a round writes
    /// to the same key.
    fn key(&self) -> String {
        self.round.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rondo_storage::{MemoryStore, Repository};
    use std::sync::Arc;

    #[test]
    fn test_key_is_round_number() {
        let share = VrfShare::new(1234, "payload", 2, "miner-1");
        assert_eq!(share.key(), "1234");
        assert_eq!(share.party(), "miner-1");
    }

    #[test]
    fn test_repository_roundtrip() {
        let repo: Repository<VrfShare> = Repository::new(Arc::new(MemoryStore::new()));
        let share = VrfShare::new(9, "abcdef", 1, "miner-3");

        repo.write(&share).unwrap();
        assert_eq!(repo.read("9").unwrap(), share);

        repo.delete(&share).unwrap();
        assert!(repo.read("9").is_err());
    }

    #[test]
    fn test_shares_of_one_round_share_a_key() {
        let repo: Repository<VrfShare> = Repository::new(Arc::new(MemoryStore::new()));
        repo.write(&VrfShare::new(4, "a", 0, "miner-1")).unwrap();
        repo.write(&VrfShare::new(4, "b", 0, "miner-2")).unwrap();

        assert_eq!(repo.read("4").unwrap().party(), "miner-2");
    }
}
