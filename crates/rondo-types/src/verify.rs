//! Signature verification capability.
//!
//! Messages reach a round only after their signature has been checked.
//! Round bookkeeping never depends on a concrete scheme; it asks a
//! [`SignatureVerifier`] whether a signature over a hash is valid.

use crate::error::VerifyError;
use ed25519_consensus::{Signature, VerificationKey};
use std::sync::Arc;

/// Verifies signatures over hex-encoded hashes.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `Ok(true)` if `signature` is a valid signature over `hash`.
    ///
    /// Malformed inputs are errors; a well-formed but wrong signature is
    /// `Ok(false)`.
    fn verify(&self, signature: &str, hash: &str) -> Result<bool, VerifyError>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for Arc<T> {
    fn verify(&self, signature: &str, hash: &str) -> Result<bool, VerifyError> {
        (**self).verify(signature, hash)
    }
}

/// Ed25519 verifier bound to one public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    key: VerificationKey,
}

impl Ed25519Verifier {
    /// Creates a verifier from raw public key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, VerifyError> {
        let key = VerificationKey::try_from(bytes)
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Creates a verifier from a hex-encoded public key.
    pub fn from_hex(public_key: &str) -> Result<Self, VerifyError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(public_key, &mut bytes)
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Returns the hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signature: &str, hash: &str) -> Result<bool, VerifyError> {
        let mut sig_bytes = [0u8; 64];
        hex::decode_to_slice(signature, &mut sig_bytes)
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
        let message = hex::decode(hash).map_err(|e| VerifyError::MalformedHash(e.to_string()))?;

        let signature = Signature::from(sig_bytes);
        Ok(self.key.verify(&signature, &message).is_ok())
    }
}
