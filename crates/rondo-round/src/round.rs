//! The per-round aggregate.
//!
//! A [`Round`] collects everything a node learns about one round: VRF
//! shares and the resulting seed, the miner permutation derived from it,
//! proposed and notarized blocks, and the timeout votes used to agree on
//! how many times the round has been retried.
//!
//! All bookkeeping goes through one read/write lock. The timeout tally has
//! its own mutex so vote traffic never waits behind block bookkeeping.

use crate::config::RoundConfig;
use crate::error::{Result, RoundError};
use crate::fatal::precondition_violation;
use crate::ranks;
use crate::state::RoundState;
use crate::timeout::TimeoutTally;
use crate::vrf_share::VrfShare;
use parking_lot::{Mutex, RwLock};
use rondo_types::{Block, Node, NodeKey, Pool, GENESIS_ROUND};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// State guarded by the round's main lock.
#[derive(Debug, Default)]
struct RoundInner {
    random_seed: i64,
    has_random_seed: bool,
    vrf_output: String,
    block: Option<Arc<Block>>,
    block_hash: String,
    state: RoundState,
    /// State held before `set_finalizing` claimed the round.
    pre_finalizing: Option<RoundState>,
    miner_perm: Option<Vec<usize>>,
    /// Sorted ascending by rank, unranked blocks last.
    proposed_blocks: Vec<Arc<Block>>,
    /// Sorted descending by chain weight.
    notarized_blocks: Vec<Arc<Block>>,
    shares: HashMap<NodeKey, VrfShare>,
    soft_timeout_count: u32,
    vrf_start_time: Option<Instant>,
}

impl RoundInner {
    /// Moves the state forward; never backwards.
    fn set_state(&mut self, state: RoundState) -> bool {
        if state <= self.state {
            return false;
        }
        self.state = state;
        true
    }

    fn set_random_seed(&mut self, seed: i64) {
        self.random_seed = seed;
        self.has_random_seed = true;
        self.miner_perm = None;
    }

    /// Inserts a proposed block unless its hash is already known. Returns
    /// the stored block and whether it was inserted.
    fn add_proposed_block(&mut self, block: Arc<Block>) -> (Arc<Block>, bool) {
        if let Some(existing) = self
            .proposed_blocks
            .iter()
            .find(|b| b.hash == block.hash)
        {
            return (existing.clone(), false);
        }

        self.proposed_blocks.push(block.clone());
        self.proposed_blocks.sort_by_key(|b| rank_key(b));
        (block, true)
    }
}

/// Sort key placing ranked blocks first, lowest rank first.
fn rank_key(block: &Block) -> (bool, i64) {
    (block.round_rank < 0, block.round_rank)
}

/// Copies `from`'s tickets onto `to`. The source snapshot is taken before
/// the destination is locked, so two block locks are never held together.
fn merge_tickets(to: &Block, from: &Block) -> usize {
    let snapshot = from.verification_tickets();
    to.merge_verification_tickets(&snapshot)
}

/// Bookkeeping for a single round.
#[derive(Debug)]
pub struct Round {
    number: i64,
    inner: RwLock<RoundInner>,
    timeouts: Mutex<TimeoutTally>,
}

impl Round {
    /// Creates an empty round in the [`RoundState::ShareVrf`] state.
    pub fn new(number: i64) -> Self {
        Self::with_config(number, &RoundConfig::default())
    }

    /// Creates an empty round using the timeout cap from `config`.
    pub fn with_config(number: i64, config: &RoundConfig) -> Self {
        Self {
            number,
            inner: RwLock::new(RoundInner::default()),
            timeouts: Mutex::new(TimeoutTally::with_cap(config.timeout_cap)),
        }
    }

    /// Returns the round number.
    pub fn number(&self) -> i64 {
        self.number
    }

    /// Returns the storage key of the round.
    pub fn key(&self) -> String {
        self.number.to_string()
    }

    // ----- random seed and VRF -----

    /// Returns the round's random seed (0 until set).
    pub fn random_seed(&self) -> i64 {
        self.inner.read().random_seed
    }

    /// Returns true once a random seed has been applied.
    pub fn has_random_seed(&self) -> bool {
        self.inner.read().has_random_seed
    }

    /// Applies the seed produced by VRF share aggregation and moves the
    /// round to [`RoundState::VrfComplete`].
    ///
    /// The seed is set once; later calls are ignored and return false.
    pub fn set_random_seed(&self, seed: i64) -> bool {
        let mut inner = self.inner.write();
        if inner.has_random_seed {
            tracing::debug!(round = self.number, seed, "random seed already set");
            return false;
        }
        inner.set_random_seed(seed);
        inner.set_state(RoundState::VrfComplete);
        tracing::debug!(round = self.number, seed, "random seed set");
        true
    }

    /// Applies the seed carried by a notarized block received from a peer.
    ///
    /// Same set-once rule as [`set_random_seed`](Self::set_random_seed), but
    /// the round state is left untouched.
    pub fn set_random_seed_for_notarized_block(&self, seed: i64) -> bool {
        let mut inner = self.inner.write();
        if inner.has_random_seed {
            return false;
        }
        inner.set_random_seed(seed);
        tracing::debug!(round = self.number, seed, "random seed set from notarized block");
        true
    }

    /// Returns the VRF output.
    pub fn vrf_output(&self) -> String {
        self.inner.read().vrf_output.clone()
    }

    /// Stores the VRF output.
    pub fn set_vrf_output(&self, output: impl Into<String>) {
        self.inner.write().vrf_output = output.into();
    }

    /// Stores a VRF share unless `threshold` shares are already held or the
    /// contributor already has a share in this round.
    pub fn add_vrf_share(&self, share: VrfShare, threshold: usize) -> bool {
        let mut inner = self.inner.write();
        if inner.shares.len() >= threshold {
            tracing::debug!(
                round = self.number,
                party = %share.party(),
                threshold,
                "vrf share rejected, threshold reached"
            );
            return false;
        }
        if inner.shares.contains_key(share.party()) {
            tracing::debug!(round = self.number, party = %share.party(), "duplicate vrf share");
            return false;
        }

        inner.set_state(RoundState::ShareVrf);
        tracing::trace!(
            round = self.number,
            party = %share.party(),
            shares = inner.shares.len() + 1,
            threshold,
            "vrf share added"
        );
        inner.shares.insert(share.party().to_string(), share);
        true
    }

    /// Stores a late VRF share regardless of the threshold. Duplicates from
    /// the same contributor are still rejected.
    pub fn add_additional_vrf_share(&self, share: VrfShare) -> bool {
        let mut inner = self.inner.write();
        if inner.shares.contains_key(share.party()) {
            return false;
        }
        inner.shares.insert(share.party().to_string(), share);
        true
    }

    /// Returns true if the share's contributor already has a share stored.
    pub fn vrf_share_exists(&self, share: &VrfShare) -> bool {
        self.inner.read().shares.contains_key(share.party())
    }

    /// Returns a copy of the stored shares keyed by contributor.
    pub fn vrf_shares(&self) -> HashMap<NodeKey, VrfShare> {
        self.inner.read().shares.clone()
    }

    /// Returns the number of stored shares.
    pub fn vrf_share_count(&self) -> usize {
        self.inner.read().shares.len()
    }

    // ----- miner ranks -----

    /// Derives the miner permutation from the random seed.
    ///
    /// The permutation is cached until the seed changes, the round is
    /// restarted or a pool of a different size is passed.
    ///
    /// # Panics
    ///
    /// Panics if no random seed has been set.
    #[track_caller]
    pub fn compute_miner_ranks(&self, pool: &Pool) {
        let mut inner = self.inner.write();
        if !inner.has_random_seed {
            precondition_violation(self.number, "miner ranks computed without a random seed");
        }
        if let Some(perm) = &inner.miner_perm {
            if perm.len() == pool.size() {
                return;
            }
        }

        inner.miner_perm = Some(ranks::compute_miner_ranks(inner.random_seed, pool.size()));
        tracing::debug!(
            round = self.number,
            seed = inner.random_seed,
            miners = pool.size(),
            "miner ranks computed"
        );
    }

    /// Returns true once the miner permutation is available.
    pub fn is_ranks_computed(&self) -> bool {
        self.inner.read().miner_perm.is_some()
    }

    /// Returns the rank of `miner`, or `None` if its set index lies outside
    /// the permutation.
    ///
    /// # Panics
    ///
    /// Panics if the ranks have not been computed.
    #[track_caller]
    pub fn miner_rank(&self, miner: &Node) -> Option<usize> {
        let inner = self.inner.read();
        let Some(perm) = &inner.miner_perm else {
            precondition_violation(self.number, "miner rank requested before ranks were computed");
        };

        let rank = perm.get(miner.set_index).copied();
        if rank.is_none() {
            tracing::warn!(
                round = self.number,
                node = %miner.id,
                set_index = miner.set_index,
                miners = perm.len(),
                "node index missing from the miner permutation"
            );
        }
        rank
    }

    /// Returns the pool's nodes ordered by rank, best first. Nodes outside
    /// the permutation are placed last.
    ///
    /// # Panics
    ///
    /// Panics if the ranks have not been computed.
    #[track_caller]
    pub fn miners_by_rank(&self, pool: &Pool) -> Vec<Arc<Node>> {
        let inner = self.inner.read();
        let Some(perm) = &inner.miner_perm else {
            precondition_violation(self.number, "miners by rank requested before ranks were computed");
        };

        let mut nodes = pool.copy_nodes();
        nodes.sort_by_key(|node| match perm.get(node.set_index) {
            Some(rank) => (false, *rank),
            None => {
                tracing::warn!(
                    round = self.number,
                    node = %node.id,
                    set_index = node.set_index,
                    "node index missing from the miner permutation"
                );
                (true, node.set_index)
            }
        });
        nodes
    }

    // ----- blocks -----

    /// Records a proposed block. The first block seen with a hash is kept;
    /// a duplicate returns the stored block and false.
    pub fn add_proposed_block(&self, block: Arc<Block>) -> (Arc<Block>, bool) {
        let mut inner = self.inner.write();
        let (stored, added) = inner.add_proposed_block(block);
        if added {
            tracing::trace!(round = self.number, hash = %stored.hash, rank = stored.round_rank, "proposed block added");
        } else {
            tracing::debug!(round = self.number, hash = %stored.hash, "duplicate proposed block");
        }
        (stored, added)
    }

    /// Returns the proposed blocks, best rank first.
    pub fn proposed_blocks(&self) -> Vec<Arc<Block>> {
        self.inner.read().proposed_blocks.clone()
    }

    /// Returns the best ranked proposed block.
    pub fn best_ranked_proposed_block(&self) -> Option<Arc<Block>> {
        self.inner.read().proposed_blocks.first().cloned()
    }

    /// Records a notarized block.
    ///
    /// The block is also recorded as proposed. Tickets are merged into any
    /// stored block with the same hash. A notarized block already holding
    /// the same rank is evicted. Returns the stored block and whether the
    /// block was newly inserted.
    pub fn add_notarized_block(&self, block: Arc<Block>) -> (Arc<Block>, bool) {
        let mut inner = self.inner.write();

        let (proposed, _) = inner.add_proposed_block(block.clone());
        if !Arc::ptr_eq(&proposed, &block) {
            merge_tickets(&proposed, &block);
        }

        if let Some(existing) = inner
            .notarized_blocks
            .iter()
            .find(|b| b.hash == block.hash)
            .cloned()
        {
            if !Arc::ptr_eq(&existing, &block) {
                merge_tickets(&existing, &block);
                merge_tickets(&block, &existing);
            }
            tracing::debug!(
                round = self.number,
                hash = %block.hash,
                "notarized block already present, tickets merged"
            );
            return (existing, false);
        }

        if let Some(pos) = inner
            .notarized_blocks
            .iter()
            .position(|b| b.round_rank == block.round_rank)
        {
            let evicted = inner.notarized_blocks.remove(pos);
            tracing::info!(
                round = self.number,
                hash = %evicted.hash,
                rank = evicted.round_rank,
                miner = %evicted.miner_id,
                seed = evicted.round_random_seed,
                timeout_count = evicted.round_timeout_count,
                "replacing notarized block with the same rank"
            );
        }

        block.set_notarized();
        let better = match &inner.block {
            None => true,
            Some(current) => {
                block.round_rank >= 0
                    && (current.round_rank < 0 || block.round_rank < current.round_rank)
            }
        };
        if better {
            inner.block = Some(block.clone());
        }

        inner.notarized_blocks.push(block.clone());
        inner
            .notarized_blocks
            .sort_by(|a, b| b.chain_weight.cmp(&a.chain_weight));

        tracing::debug!(
            round = self.number,
            hash = %block.hash,
            rank = block.round_rank,
            weight = block.chain_weight,
            "reached notarization"
        );
        (block, true)
    }

    /// Replaces the stored instance of `block` (matched by hash) in both
    /// block lists. Used once a block has been re-fetched in full.
    pub fn update_notarized_block(&self, block: Arc<Block>) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        for slot in inner
            .proposed_blocks
            .iter_mut()
            .chain(inner.notarized_blocks.iter_mut())
        {
            if slot.hash == block.hash {
                *slot = block.clone();
            }
        }
        if inner
            .block
            .as_ref()
            .is_some_and(|current| current.hash == block.hash)
        {
            inner.block = Some(block);
        }
    }

    /// Returns the notarized blocks, heaviest first.
    pub fn notarized_blocks(&self) -> Vec<Arc<Block>> {
        self.inner.read().notarized_blocks.clone()
    }

    /// Returns the notarized block with the greatest chain weight.
    pub fn heaviest_notarized_block(&self) -> Option<Arc<Block>> {
        self.inner.read().notarized_blocks.first().cloned()
    }

    /// Returns the notarized block with the best rank.
    pub fn best_ranked_notarized_block(&self) -> Option<Arc<Block>> {
        let inner = self.inner.read();
        match inner.notarized_blocks.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            blocks => blocks.iter().min_by_key(|b| rank_key(b)).cloned(),
        }
    }

    /// Returns the best block seen so far, or the finalized block.
    pub fn block(&self) -> Option<Arc<Block>> {
        self.inner.read().block.clone()
    }

    /// Returns the hash of the finalized block (empty until finalized).
    pub fn block_hash(&self) -> String {
        self.inner.read().block_hash.clone()
    }

    // ----- lifecycle -----

    /// Returns the current state.
    pub fn state(&self) -> RoundState {
        self.inner.read().state
    }

    /// Advances to `state` if it is ahead of the current state.
    pub fn set_state(&self, state: RoundState) -> bool {
        let mut inner = self.inner.write();
        let from = inner.state;
        let applied = inner.set_state(state);
        if applied {
            tracing::debug!(round = self.number, from = %from, to = %state, "round state changed");
        }
        applied
    }

    /// Forces the state, including backwards. Reserved for restarts.
    pub fn reset_state(&self, state: RoundState) {
        self.inner.write().state = state;
    }

    /// Commits `block` as the round's block and marks the round finalized.
    pub fn finalize(&self, block: Arc<Block>) {
        let mut inner = self.inner.write();
        inner.state = RoundState::Finalized;
        inner.pre_finalizing = None;
        inner.block_hash = block.hash.clone();
        tracing::debug!(round = self.number, hash = %block.hash, "round finalized");
        inner.block = Some(block);
    }

    /// Claims the round for finalization. Returns true for exactly one
    /// caller; false if the round is already finalizing or finalized.
    pub fn set_finalizing(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state.is_finalizing_or_finalized() {
            return false;
        }
        inner.pre_finalizing = Some(inner.state);
        inner.state = RoundState::Finalizing;
        true
    }

    /// Releases a finalization claim that did not complete, returning the
    /// round to the state it held before [`set_finalizing`](Self::set_finalizing).
    ///
    /// A finalized round is never touched. Returns true if a claim was
    /// released.
    pub fn reset_finalizing_state_if_not_finalized(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state != RoundState::Finalizing {
            return false;
        }
        let previous = inner.pre_finalizing.take().unwrap_or_default();
        inner.state = previous;
        tracing::info!(round = self.number, state = %previous, "finalization claim released");
        true
    }

    /// Returns true while finalization is in progress.
    pub fn is_finalizing(&self) -> bool {
        self.inner.read().state == RoundState::Finalizing
    }

    /// Returns true once finalized. The genesis round is always finalized.
    pub fn is_finalized(&self) -> bool {
        self.number == GENESIS_ROUND || self.inner.read().state == RoundState::Finalized
    }

    /// Clears the round so it can be redone.
    ///
    /// Blocks, shares, the seed and the rank cache are dropped and the
    /// state goes back to [`RoundState::ShareVrf`]. The VRF output and the
    /// timeout tally survive.
    pub fn restart(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state.is_finalizing_or_finalized() {
            return Err(RoundError::RestartFinalized(self.number));
        }

        let vrf_output = std::mem::take(&mut inner.vrf_output);
        let vrf_start_time = inner.vrf_start_time;
        *inner = RoundInner {
            vrf_output,
            vrf_start_time,
            ..RoundInner::default()
        };
        tracing::info!(round = self.number, "round restarted");
        Ok(())
    }

    // ----- soft timeouts and timing -----

    /// Records a soft timeout.
    pub fn inc_soft_timeout_count(&self) {
        let mut inner = self.inner.write();
        inner.soft_timeout_count = inner.soft_timeout_count.saturating_add(1);
    }

    /// Returns the number of soft timeouts since the last restart.
    pub fn soft_timeout_count(&self) -> u32 {
        self.inner.read().soft_timeout_count
    }

    /// Records when VRF share collection started.
    pub fn set_vrf_start_time(&self, at: Instant) {
        self.inner.write().vrf_start_time = Some(at);
    }

    /// Returns when VRF share collection started.
    pub fn vrf_start_time(&self) -> Option<Instant> {
        self.inner.read().vrf_start_time
    }

    // ----- timeout votes -----

    /// Records `voter`'s vote for timeout count `num`. Only the first vote
    /// of a voter counts until the next increment.
    pub fn add_timeout_vote(&self, num: i32, voter: &str) -> bool {
        let added = self.timeouts.lock().add_vote(num, voter);
        if added {
            tracing::trace!(round = self.number, num, voter, "timeout vote added");
        } else {
            tracing::debug!(round = self.number, voter, "duplicate timeout vote");
        }
        added
    }

    /// Closes the current vote epoch and bumps the timeout count by one.
    ///
    /// Returns the most voted count (ties go to the larger count), or `None`
    /// if nobody voted.
    pub fn increment_timeout_count(&self) -> Option<i32> {
        let mut tally = self.timeouts.lock();
        let winner = tally.increment();
        tracing::debug!(
            round = self.number,
            timeout_count = tally.count(),
            winner = ?winner,
            "timeout count incremented"
        );
        winner
    }

    /// Raises the timeout count to `count` if it is greater than the
    /// current one.
    pub fn set_timeout_count(&self, count: i32) -> bool {
        self.timeouts.lock().set_count(count)
    }

    /// Returns the timeout count.
    pub fn timeout_count(&self) -> i32 {
        self.timeouts.lock().count()
    }

    /// Returns the votes of the current epoch, keyed by candidate count.
    pub fn timeout_votes(&self) -> HashMap<i32, u32> {
        self.timeouts.lock().votes()
    }

    // ----- persistence support -----

    pub(crate) fn restore(number: i64, config: &RoundConfig, snapshot: RoundSnapshot) -> Self {
        let round = Self::with_config(number, config);
        {
            let mut inner = round.inner.write();
            inner.random_seed = snapshot.random_seed;
            inner.has_random_seed = snapshot.has_random_seed;
            inner.vrf_output = snapshot.vrf_output;
            inner.block_hash = snapshot.block_hash;
            inner.state = snapshot.state;
            inner.soft_timeout_count = snapshot.soft_timeout_count;
        }
        round.timeouts.lock().set_count(snapshot.timeout_count);
        round
    }

    pub(crate) fn snapshot(&self) -> RoundSnapshot {
        let inner = self.inner.read();
        RoundSnapshot {
            random_seed: inner.random_seed,
            has_random_seed: inner.has_random_seed,
            vrf_output: inner.vrf_output.clone(),
            block_hash: inner.block_hash.clone(),
            state: inner.state,
            soft_timeout_count: inner.soft_timeout_count,
            timeout_count: self.timeouts.lock().count(),
        }
    }
}

/// Scalar fields of a round, as persisted.
#[derive(Debug, Clone, Default)]
pub(crate) struct RoundSnapshot {
    pub(crate) random_seed: i64,
    pub(crate) has_random_seed: bool,
    pub(crate) vrf_output: String,
    pub(crate) block_hash: String,
    pub(crate) state: RoundState,
    pub(crate) soft_timeout_count: u32,
    pub(crate) timeout_count: i32,
}
