//! Admission of signed round messages.
//!
//! A message is handed to its round only after the round number matches,
//! the carried hash matches the content and the sender's signature over
//! that hash verifies.

use crate::config::RoundConfig;
use crate::error::{Result, RoundError};
use crate::round::Round;
use crate::vrf_share::VrfShare;
use rondo_types::SignatureVerifier;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn hash_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn put_str(data: &mut Vec<u8>, s: &str) {
    data.extend_from_slice(&(s.len() as u32).to_le_bytes());
    data.extend_from_slice(s.as_bytes());
}

/// Checks the round, the hash and the signature of a message.
fn check(
    round: &Round,
    message_round: i64,
    sender: &str,
    expected_hash: &str,
    hash: &str,
    signature: &str,
    verifier: &dyn SignatureVerifier,
) -> Result<()> {
    if message_round != round.number() {
        return Err(RoundError::RoundMismatch {
            expected: round.number(),
            got: message_round,
        });
    }
    if hash != expected_hash {
        return Err(RoundError::HashMismatch(sender.to_string()));
    }
    if !verifier.verify(signature, hash)? {
        tracing::debug!(round = round.number(), sender, "rejected message with invalid signature");
        return Err(RoundError::InvalidSignature(sender.to_string()));
    }
    Ok(())
}

/// A VRF share as received from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfShareMessage {
    /// The share being delivered.
    pub share: VrfShare,
    /// Hex SHA-256 of [`signing_data`](Self::signing_data).
    pub hash: String,
    /// Sender's signature over the hash (hex).
    pub signature: String,
}

impl VrfShareMessage {
    /// Wraps a share, filling in its hash. The signature is left empty.
    pub fn new(share: VrfShare) -> Self {
        let mut msg = Self {
            share,
            hash: String::new(),
            signature: String::new(),
        };
        msg.hash = msg.signing_hash();
        msg
    }

    /// Sets the signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Returns the bytes the hash is computed over.
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"VRF_SHARE:");
        data.extend_from_slice(&self.share.round.to_le_bytes());
        data.extend_from_slice(&self.share.round_timeout_count.to_le_bytes());
        put_str(&mut data, self.share.party());
        put_str(&mut data, &self.share.share);
        data
    }

    /// Returns the hex SHA-256 of the signing data.
    pub fn signing_hash(&self) -> String {
        hash_hex(&self.signing_data())
    }

    /// Verifies the message and adds the share to `round`.
    ///
    /// Returns the result of [`Round::add_vrf_share`].
    pub fn admit(
        self,
        round: &Round,
        verifier: &dyn SignatureVerifier,
        threshold: usize,
    ) -> Result<bool> {
        check(
            round,
            self.share.round,
            self.share.party(),
            &self.signing_hash(),
            &self.hash,
            &self.signature,
            verifier,
        )?;
        Ok(round.add_vrf_share(self.share, threshold))
    }

    /// Same as [`admit`](Self::admit) with the configured VRF threshold.
    pub fn admit_with_config(
        self,
        round: &Round,
        verifier: &dyn SignatureVerifier,
        config: &RoundConfig,
    ) -> Result<bool> {
        self.admit(round, verifier, config.vrf_threshold)
    }
}

/// A timeout vote as received from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutVoteMessage {
    /// Round the vote is for.
    pub round: i64,
    /// Timeout count the voter proposes.
    pub num: i32,
    /// Key of the voting node.
    pub voter: String,
    /// Hex SHA-256 of [`signing_data`](Self::signing_data).
    pub hash: String,
    /// Voter's signature over the hash (hex).
    pub signature: String,
}

impl TimeoutVoteMessage {
    /// Creates a vote, filling in its hash. The signature is left empty.
    pub fn new(round: i64, num: i32, voter: impl Into<String>) -> Self {
        let mut msg = Self {
            round,
            num,
            voter: voter.into(),
            hash: String::new(),
            signature: String::new(),
        };
        msg.hash = msg.signing_hash();
        msg
    }

    /// Sets the signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Returns the bytes the hash is computed over.
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"TIMEOUT_VOTE:");
        data.extend_from_slice(&self.round.to_le_bytes());
        data.extend_from_slice(&self.num.to_le_bytes());
        put_str(&mut data, &self.voter);
        data
    }

    /// Returns the hex SHA-256 of the signing data.
    pub fn signing_hash(&self) -> String {
        hash_hex(&self.signing_data())
    }

    /// Verifies the vote and records it in `round`.
    ///
    /// Returns the result of [`Round::add_timeout_vote`].
    pub fn admit(&self, round: &Round, verifier: &dyn SignatureVerifier) -> Result<bool> {
        check(
            round,
            self.round,
            &self.voter,
            &self.signing_hash(),
            &self.hash,
            &self.signature,
            verifier,
        )?;
        Ok(round.add_timeout_vote(self.num, &self.voter))
    }
}
