//! Processed transactions and their externally supplied proving hints.

use serde::{Deserialize, Serialize};

use crate::Proof;

/// Transaction hash, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(#[serde(with = "hex::serde")] pub [u8; 32]);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Inputs for the AVM circuit: the public-execution trace and the public
/// inputs it commits to. Produced by the simulator, opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvmCircuitInputs {
    #[serde(with = "hex::serde")]
    pub public_inputs: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub execution_trace: Vec<u8>,
}

/// An externally produced, immutable record of a transaction ready for
/// proving. Read-only to the orchestrator.
///
/// A transaction requires an AVM proof exactly when it carries AVM circuit
/// inputs (public calls were made during execution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTx {
    pub tx_hash: TxHash,
    /// Public inputs of the kernel circuit that closed the client-side
    /// execution; carried forward into the tube data for the base rollup.
    #[serde(with = "hex::serde")]
    pub kernel_public_inputs: Vec<u8>,
    /// The recursive proof wrapping the client-side private execution.
    pub client_ivc_proof: Proof,
    /// Present iff the transaction made public calls.
    pub avm_inputs: Option<AvmCircuitInputs>,
}

impl ProcessedTx {
    pub fn require_avm_proof(&self) -> bool {
        self.avm_inputs.is_some()
    }
}

/// Witness material for the private base rollup circuit. Supplied by the
/// caller at admission, opaque to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateBaseRollupHints {
    #[serde(with = "hex::serde")]
    pub witness: Vec<u8>,
}

/// Witness material for the public base rollup circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicBaseRollupHints {
    #[serde(with = "hex::serde")]
    pub witness: Vec<u8>,
}

/// Base rollup hints, tagged private-or-public.
///
/// The tag must agree with the transaction's AVM requirement; the
/// orchestrator treats a mismatch as a fatal internal-consistency error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseRollupHints {
    Private(PrivateBaseRollupHints),
    Public(PublicBaseRollupHints),
}

impl BaseRollupHints {
    pub fn is_public(&self) -> bool {
        matches!(self, BaseRollupHints::Public(_))
    }
}
