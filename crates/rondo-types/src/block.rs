//! Block view consumed by round bookkeeping.
//!
//! Block content, hashing and ticket cryptography live outside this layer.
//! A round only needs the identifying hash, the proposer's rank, the chain
//! weight and the notarization evidence gathered so far.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// A verifier's signed attestation that a block is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationTicket {
    /// Key of the node that verified the block.
    pub verifier_id: String,
    /// Signature over the block hash.
    pub signature: String,
}

impl VerificationTicket {
    /// Creates a new verification ticket.
    pub fn new(verifier_id: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            verifier_id: verifier_id.into(),
            signature: signature.into(),
        }
    }
}

/// A block proposed for a round.
///
/// Blocks are shared as `Arc<Block>` between rounds and the rest of the
/// node. Identity fields are fixed at construction; only the ticket set and
/// the notarized flag change afterwards.
#[derive(Debug)]
pub struct Block {
    /// Block hash (hex).
    pub hash: String,

    /// Round the block was produced for.
    pub round: i64,

    /// Proposer's position in the round permutation. Lower is preferred;
    /// a negative rank means the block is unranked.
    pub round_rank: i64,

    /// Cumulative chain weight up to and including this block.
    pub chain_weight: u64,

    /// Key of the proposing miner.
    pub miner_id: String,

    /// Random seed of the round the block was built on.
    pub round_random_seed: i64,

    /// Timeout epoch of the round when the block was built.
    pub round_timeout_count: i32,

    tickets: RwLock<Vec<VerificationTicket>>,
    notarized: AtomicBool,
}

impl Block {
    /// Creates an unranked block with no tickets.
    pub fn new(hash: impl Into<String>, round: i64) -> Self {
        Self {
            hash: hash.into(),
            round,
            round_rank: -1,
            chain_weight: 0,
            miner_id: String::new(),
            round_random_seed: 0,
            round_timeout_count: 0,
            tickets: RwLock::new(Vec::new()),
            notarized: AtomicBool::new(false),
        }
    }

    /// Sets the round rank.
    pub fn with_round_rank(mut self, rank: i64) -> Self {
        self.round_rank = rank;
        self
    }

    /// Sets the chain weight.
    pub fn with_chain_weight(mut self, weight: u64) -> Self {
        self.chain_weight = weight;
        self
    }

    /// Sets the proposing miner.
    pub fn with_miner_id(mut self, miner_id: impl Into<String>) -> Self {
        self.miner_id = miner_id.into();
        self
    }

    /// Sets the round random seed the block was built on.
    pub fn with_round_random_seed(mut self, seed: i64) -> Self {
        self.round_random_seed = seed;
        self
    }

    /// Sets the timeout epoch the block was built in.
    pub fn with_round_timeout_count(mut self, count: i32) -> Self {
        self.round_timeout_count = count;
        self
    }

    /// Sets the initial verification tickets.
    pub fn with_tickets(self, tickets: Vec<VerificationTicket>) -> Self {
        self.merge_verification_tickets(&tickets);
        self
    }

    /// Returns a copy of the verification tickets.
    pub fn verification_tickets(&self) -> Vec<VerificationTicket> {
        self.tickets.read().clone()
    }

    /// Returns the number of verification tickets.
    pub fn ticket_count(&self) -> usize {
        self.tickets.read().len()
    }

    /// Adds a ticket unless the verifier already has one on this block.
    pub fn add_verification_ticket(&self, ticket: VerificationTicket) -> bool {
        let mut tickets = self.tickets.write();
        if tickets.iter().any(|t| t.verifier_id == ticket.verifier_id) {
            return false;
        }
        tickets.push(ticket);
        true
    }

    /// Merges tickets into this block, skipping verifiers already present.
    ///
    /// Returns the number of tickets added.
    pub fn merge_verification_tickets(&self, incoming: &[VerificationTicket]) -> usize {
        let mut tickets = self.tickets.write();
        let mut added = 0;
        for ticket in incoming {
            if tickets.iter().any(|t| t.verifier_id == ticket.verifier_id) {
                continue;
            }
            tickets.push(ticket.clone());
            added += 1;
        }
        added
    }

    /// Returns true once the block has been marked notarized.
    pub fn is_notarized(&self) -> bool {
        self.notarized.load(Ordering::Acquire)
    }

    /// Marks the block notarized.
    pub fn set_notarized(&self) {
        self.notarized.store(true, Ordering::Release);
    }
}

impl Clone for Block {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash.clone(),
            round: self.round,
            round_rank: self.round_rank,
            chain_weight: self.chain_weight,
            miner_id: self.miner_id.clone(),
            round_random_seed: self.round_random_seed,
            round_timeout_count: self.round_timeout_count,
            tickets: RwLock::new(self.verification_tickets()),
            notarized: AtomicBool::new(self.is_notarized()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_builder() {
        let block = Block::new("abc", 7)
            .with_round_rank(2)
            .with_chain_weight(40)
            .with_miner_id("miner-1");

        assert_eq!(block.hash, "abc");
        assert_eq!(block.round, 7);
        assert_eq!(block.round_rank, 2);
        assert_eq!(block.chain_weight, 40);
        assert_eq!(block.miner_id, "miner-1");
        assert!(!block.is_notarized());
    }

    #[test]
    fn test_new_block_is_unranked() {
        assert_eq!(Block::new("abc", 1).round_rank, -1);
    }

    #[test]
    fn test_ticket_dedup_by_verifier() {
        let block = Block::new("abc", 1);
        assert!(block.add_verification_ticket(VerificationTicket::new("v1", "s1")));
        assert!(!block.add_verification_ticket(VerificationTicket::new("v1", "s2")));
        assert_eq!(block.ticket_count(), 1);
    }

    #[test]
    fn test_merge_tickets() {
        let block = Block::new("abc", 1).with_tickets(vec![VerificationTicket::new("v1", "s1")]);
        let added = block.merge_verification_tickets(&[
            VerificationTicket::new("v1", "s1"),
            VerificationTicket::new("v2", "s2"),
            VerificationTicket::new("v3", "s3"),
        ]);

        assert_eq!(added, 2);
        let ids: Vec<_> = block
            .verification_tickets()
            .into_iter()
            .map(|t| t.verifier_id)
            .collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let block = Block::new("abc", 1);
        block.set_notarized();
        let copy = block.clone();
        copy.add_verification_ticket(VerificationTicket::new("v1", "s1"));

        assert!(copy.is_notarized());
        assert_eq!(block.ticket_count(), 0);
        assert_eq!(copy.ticket_count(), 1);
    }

    #[test]
    fn test_ticket_serde() {
        let ticket = VerificationTicket::new("v1", "deadbeef");
        let json = serde_json::to_string(&ticket).unwrap();
        let back: VerificationTicket = serde_json::from_str(&json).unwrap();
        assert_eq!(ticket, back);
    }
}
