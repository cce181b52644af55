//! Round bookkeeping error types.

use rondo_storage::StorageError;
use rondo_types::VerifyError;
use thiserror::Error;

/// Errors that can occur during round bookkeeping.
///
/// Duplicate or late contributions are not errors; those calls return
/// `false` or the already-stored value instead.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The round is not stored (prune target or persisted lookup).
    #[error("round entity not found: {0}")]
    EntityNotFound(i64),

    /// A finalizing or finalized round cannot be restarted.
    #[error("can't restart round {0}: already finalizing or finalized")]
    RestartFinalized(i64),

    /// A message was delivered to the wrong round.
    #[error("message for round {got} delivered to round {expected}")]
    RoundMismatch {
        /// Round the message was delivered to.
        expected: i64,
        /// Round named in the message.
        got: i64,
    },

    /// The hash carried by a message does not match its content.
    #[error("hash mismatch for message from {0}")]
    HashMismatch(String),

    /// The signature did not verify.
    #[error("invalid signature from {0}")]
    InvalidSignature(String),

    /// The signature could not be checked.
    #[error("verification failed: {0}")]
    Verification(#[from] VerifyError),

    /// The configuration is invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A persistence operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A specialized Result type for round operations.
pub type Result<T> = std::result::Result<T, RoundError>;
