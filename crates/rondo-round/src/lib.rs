//! Per-round consensus bookkeeping.
//!
//! A miner tracks every round it takes part in through a [`Round`]:
//!
//! 1. VRF shares are collected until the round seed is known.
//! 2. The seed derives a deterministic miner permutation, giving every
//!    proposer a rank.
//! 3. Proposed and notarized blocks are merged as they arrive, keeping at
//!    most one notarized block per rank.
//! 4. When the round stalls, miners vote on the timeout count and the
//!    round is restarted.
//! 5. Once finalized, the round's record can be archived and older
//!    snapshots pruned from a [`RoundStorage`].
//!
//! # Example
//!
//! ```
//! use rondo_round::{Round, RoundState, VrfShare};
//! use rondo_types::{Block, Node, Pool};
//! use std::sync::Arc;
//!
//! let round = Round::new(12);
//! assert!(round.add_vrf_share(VrfShare::new(12, "share", 0, "miner-0"), 1));
//! round.set_random_seed(0x5eed);
//!
//! let pool = Pool::from_nodes((0..4).map(|i| Node::new(format!("miner-{}", i), i)));
//! round.compute_miner_ranks(&pool);
//!
//! let block = Arc::new(Block::new("b1", 12).with_round_rank(0).with_chain_weight(3));
//! round.add_notarized_block(block.clone());
//! round.finalize(block);
//! assert_eq!(round.state(), RoundState::Finalized);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod fatal;
mod intake;
mod persist;
mod ranks;
mod round;
mod round_storage;
mod state;
mod timeout;
mod vrf_share;

pub use config::{RoundConfig, DEFAULT_PRUNE_BELOW_COUNT};
pub use error::{Result, RoundError};
pub use intake::{TimeoutVoteMessage, VrfShareMessage};
pub use persist::RoundRecord;
pub use ranks::compute_miner_ranks;
pub use round::Round;
pub use round_storage::{prune_round_storage, RoundStartingStorage, RoundStorage};
pub use state::RoundState;
pub use vrf_share::VrfShare;
