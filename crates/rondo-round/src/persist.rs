//! Persisted form of a round.

use crate::config::RoundConfig;
use crate::error::Result;
use crate::round::{Round, RoundSnapshot};
use crate::state::RoundState;
use rondo_storage::{Entity, Repository};
use serde::{Deserialize, Serialize};

/// Scalar state of a round as written to a round store.
///
/// Blocks, shares and votes are not persisted; they are rebuilt from the
/// network when a node restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number.
    pub number: i64,
    /// Random seed (0 until set).
    pub random_seed: i64,
    /// Whether the seed has been applied.
    pub has_random_seed: bool,
    /// Hash of the finalized block, empty until finalized.
    #[serde(default)]
    pub block_hash: String,
    /// VRF output.
    #[serde(default)]
    pub vrf_output: String,
    /// Lifecycle state.
    pub state: RoundState,
    /// Agreed timeout count.
    pub timeout_count: i32,
    /// Soft timeouts since the last restart.
    #[serde(default)]
    pub soft_timeout_count: u32,
}

impl Entity for RoundRecord {
    const NAME: &'static str = "round";

    fn key(&self) -> String {
        self.number.to_string()
    }
}

impl Round {
    /// Captures the round's persistent fields.
    pub fn to_record(&self) -> RoundRecord {
        let snapshot = self.snapshot();
        RoundRecord {
            number: self.number(),
            random_seed: snapshot.random_seed,
            has_random_seed: snapshot.has_random_seed,
            block_hash: snapshot.block_hash,
            vrf_output: snapshot.vrf_output,
            state: snapshot.state,
            timeout_count: snapshot.timeout_count,
            soft_timeout_count: snapshot.soft_timeout_count,
        }
    }

    /// Rebuilds a round from a record.
    pub fn from_record(record: RoundRecord, config: &RoundConfig) -> Self {
        Round::restore(
            record.number,
            config,
            RoundSnapshot {
                random_seed: record.random_seed,
                has_random_seed: record.has_random_seed,
                vrf_output: record.vrf_output,
                block_hash: record.block_hash,
                state: record.state,
                soft_timeout_count: record.soft_timeout_count,
                timeout_count: record.timeout_count,
            },
        )
    }

    /// Writes the round to `repo`.
    pub fn persist(&self, repo: &Repository<RoundRecord>) -> Result<()> {
        repo.write(&self.to_record())?;
        tracing::debug!(round = self.number(), store = repo.name(), "round persisted");
        Ok(())
    }

    /// Reads round `number` from `repo`.
    pub fn load(repo: &Repository<RoundRecord>, number: i64, config: &RoundConfig) -> Result<Self> {
        let record = repo.read(&number.to_string())?;
        Ok(Self::from_record(record, config))
    }

    /// Deletes the round from `repo`.
    pub fn remove(&self, repo: &Repository<RoundRecord>) -> Result<()> {
        repo.delete(&self.to_record())?;
        Ok(())
    }
}
