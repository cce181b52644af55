//! Common types used throughout `rondo`.
//!
//! The round bookkeeping layer treats blocks, miners and signatures as
//! inputs produced elsewhere in the node. This crate defines the minimal
//! shape of those inputs:
//!
//! - [`Block`]: a proposed or notarized block with its rank, weight and
//!   accumulated verification tickets.
//! - [`Node`] and [`Pool`]: the miner set a round ranks.
//! - [`SignatureVerifier`]: the capability used to admit authenticated
//!   messages, with an Ed25519 implementation.

#![warn(missing_docs)]

mod block;
mod error;
mod node;
mod verify;

pub use block::{Block, VerificationTicket};
pub use error::VerifyError;
pub use node::{Node, NodeKey, Pool};
pub use verify::{Ed25519Verifier, SignatureVerifier};

/// Round number of the genesis round.
pub const GENESIS_ROUND: i64 = 0;
