//! Opaque proof payloads.
//!
//! The orchestrator never inspects proof bytes. It threads them between
//! composition levels and leaves verification to the circuits downstream.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An opaque proof blob, hex-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof(#[serde(with = "hex::serde")] pub Vec<u8>);

impl Proof {
    /// The designated empty proof used to pad odd merge levels.
    pub fn empty() -> Self {
        Proof(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An opaque verification key blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey(#[serde(with = "hex::serde")] pub Vec<u8>);

impl VerificationKey {
    /// Stable digest used to key registry lookups.
    pub fn key_hash(&self) -> String {
        hex::encode(Sha256::digest(&self.0))
    }
}

/// A leaf proof together with the verification key it was produced under.
///
/// Tube and AVM jobs return this shape; the orchestrator later wraps the vk
/// into a [`VkWitness`] when assembling base rollup inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAndVk {
    pub proof: Proof,
    pub verification_key: VerificationKey,
}

/// Output of a composition job: the circuit's public inputs blob plus the
/// recursive proof and its verification key. This is what tree slots hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupProofOutput {
    #[serde(with = "hex::serde")]
    pub public_inputs: Vec<u8>,
    pub proof: Proof,
    pub verification_key: VerificationKey,
}

impl RollupProofOutput {
    /// The designated padding output paired with the last entry of an odd
    /// merge level.
    pub fn padding() -> Self {
        RollupProofOutput {
            public_inputs: Vec::new(),
            proof: Proof::empty(),
            verification_key: VerificationKey(Vec::new()),
        }
    }
}

/// Sibling-path witness that a verification key is registered in the
/// canonical key tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkWitness {
    pub verification_key: VerificationKey,
    pub index: u32,
    pub sibling_path: Vec<String>,
}
