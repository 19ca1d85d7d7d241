//! Typed inputs per job kind.
//!
//! The orchestrator assembles these, saves them to the input store, and puts
//! the returned uri on the job. Workers fetch and hand them to the circuit.

use serde::{Deserialize, Serialize};

use crate::{
    AvmCircuitInputs, PrivateBaseRollupHints, Proof, ProvingJobType, PublicBaseRollupHints,
    RollupProofOutput, TreeSnapshot, VkWitness,
};

/// Inputs to the tube circuit: the client IVC proof to wrap, plus whether
/// the transaction continues into public execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeInputs {
    pub has_public_calls: bool,
    pub client_ivc_proof: Proof,
}

/// Inputs to the AVM circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvmInputs {
    pub inputs: AvmCircuitInputs,
}

/// A tube proof prepared for base rollup consumption: public inputs carried
/// forward, the proof itself, and the vk witness locating its key in the
/// canonical key tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeData {
    #[serde(with = "hex::serde")]
    pub public_inputs: Vec<u8>,
    pub proof: Proof,
    pub vk_witness: VkWitness,
}

/// An AVM proof prepared for public base rollup consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvmProofData {
    #[serde(with = "hex::serde")]
    pub public_inputs: Vec<u8>,
    pub proof: Proof,
    pub vk_witness: VkWitness,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateBaseRollupInputs {
    pub tube_data: TubeData,
    pub hints: PrivateBaseRollupHints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicBaseRollupInputs {
    pub tube_data: TubeData,
    pub avm_data: AvmProofData,
    pub hints: PublicBaseRollupHints,
}

/// Two sibling proofs to combine. `right` is the designated padding output
/// when the level below had an odd tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRollupInputs {
    pub left: RollupProofOutput,
    pub right: RollupProofOutput,
}

/// Wraps a completed block tree root into the block root proof that feeds
/// the epoch-level tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRootInputs {
    pub block_index: u32,
    /// Archive snapshot at block start, captured when the block was opened.
    pub start_archive: TreeSnapshot,
    pub inner: RollupProofOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMergeInputs {
    pub left: RollupProofOutput,
    pub right: RollupProofOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRootInputs {
    pub epoch: u64,
    pub left: RollupProofOutput,
    pub right: RollupProofOutput,
}

/// The typed input payload for any job kind, stored content-addressed and
/// referenced from the job by uri.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProvingJobInputs {
    Tube(TubeInputs),
    Avm(AvmInputs),
    PrivateBaseRollup(PrivateBaseRollupInputs),
    PublicBaseRollup(PublicBaseRollupInputs),
    MergeRollup(MergeRollupInputs),
    BlockRoot(BlockRootInputs),
    BlockMerge(BlockMergeInputs),
    EpochRoot(EpochRootInputs),
}

impl ProvingJobInputs {
    pub fn job_type(&self) -> ProvingJobType {
        match self {
            ProvingJobInputs::Tube(_) => ProvingJobType::Tube,
            ProvingJobInputs::Avm(_) => ProvingJobType::Avm,
            ProvingJobInputs::PrivateBaseRollup(_) => ProvingJobType::PrivateBaseRollup,
            ProvingJobInputs::PublicBaseRollup(_) => ProvingJobType::PublicBaseRollup,
            ProvingJobInputs::MergeRollup(_) => ProvingJobType::MergeRollup,
            ProvingJobInputs::BlockRoot(_) => ProvingJobType::BlockRoot,
            ProvingJobInputs::BlockMerge(_) => ProvingJobType::BlockMerge,
            ProvingJobInputs::EpochRoot(_) => ProvingJobType::EpochRoot,
        }
    }
}
