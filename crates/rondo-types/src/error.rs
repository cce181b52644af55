//! Signature verification error types.

use thiserror::Error;

/// Errors that can occur while verifying a message signature.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The verifier's public key could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The signature is not valid hex or has the wrong length.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signed hash is not valid hex.
    #[error("malformed hash: {0}")]
    MalformedHash(String),

    /// The node has no public key to verify against.
    #[error("node {0} has no public key")]
    MissingKey(String),
}
