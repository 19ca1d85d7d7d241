//! Per-transaction proving state.
//!
//! Tracks which sub-proofs of one transaction have landed and assembles the
//! correctly shaped base rollup inputs once all required slots are filled.

use std::collections::HashMap;

use prover_types::{
    AvmInputs, AvmProofData, BaseRollupHints, ProcessedTx, ProofAndVk, PrivateBaseRollupInputs,
    ProvingJobInputs, ProvingJobType, PublicBaseRollupInputs, TreeKind, TreeSnapshot, TubeData,
    TubeInputs,
};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::vk_tree::{VkRegistry, AVM_VK_INDEX, TUBE_VK_INDEX};

/// Which sub-proofs of a transaction have landed so far.
///
/// An explicit machine rather than a pair of optional fields, so `ready()`
/// is a total function of the current state: arrival order does not matter
/// and there are no hidden preconditions.
#[derive(Debug, Clone)]
enum ProofSlots {
    Empty,
    TubeOnly(ProofAndVk),
    AvmOnly(ProofAndVk),
    Both { tube: ProofAndVk, avm: ProofAndVk },
}

impl ProofSlots {
    fn with_tube(self, tube: ProofAndVk) -> Self {
        match self {
            ProofSlots::Empty | ProofSlots::TubeOnly(_) => ProofSlots::TubeOnly(tube),
            ProofSlots::AvmOnly(avm) | ProofSlots::Both { avm, .. } => {
                ProofSlots::Both { tube, avm }
            }
        }
    }

    fn with_avm(self, avm: ProofAndVk) -> Self {
        match self {
            ProofSlots::Empty | ProofSlots::AvmOnly(_) => ProofSlots::AvmOnly(avm),
            ProofSlots::TubeOnly(tube) | ProofSlots::Both { tube, .. } => {
                ProofSlots::Both { tube, avm }
            }
        }
    }

    fn tube(&self) -> Option<&ProofAndVk> {
        match self {
            ProofSlots::TubeOnly(tube) | ProofSlots::Both { tube, .. } => Some(tube),
            ProofSlots::Empty | ProofSlots::AvmOnly(_) => None,
        }
    }

    fn avm(&self) -> Option<&ProofAndVk> {
        match self {
            ProofSlots::AvmOnly(avm) | ProofSlots::Both { avm, .. } => Some(avm),
            ProofSlots::Empty | ProofSlots::TubeOnly(_) => None,
        }
    }
}

/// Proving state of a single transaction.
///
/// Created at admission, fed by tube/avm resolutions, consumed when the base
/// rollup job is enqueued. Setters are idempotent: a late duplicate proof
/// overwrites, never appends.
#[derive(Debug)]
pub struct TxProvingState {
    tx: ProcessedTx,
    hints: BaseRollupHints,
    snapshots: HashMap<TreeKind, TreeSnapshot>,
    slots: ProofSlots,
}

impl TxProvingState {
    pub fn new(
        tx: ProcessedTx,
        hints: BaseRollupHints,
        snapshots: HashMap<TreeKind, TreeSnapshot>,
    ) -> Self {
        Self {
            tx,
            hints,
            snapshots,
            slots: ProofSlots::Empty,
        }
    }

    pub fn tx(&self) -> &ProcessedTx {
        &self.tx
    }

    pub fn snapshots(&self) -> &HashMap<TreeKind, TreeSnapshot> {
        &self.snapshots
    }

    pub fn require_avm_proof(&self) -> bool {
        self.tx.require_avm_proof()
    }

    /// True once every required sub-proof slot is filled: tube always, avm
    /// only when the transaction made public calls.
    pub fn ready(&self) -> bool {
        match (&self.slots, self.require_avm_proof()) {
            (ProofSlots::Both { .. }, _) => true,
            (ProofSlots::TubeOnly(_), false) => true,
            _ => false,
        }
    }

    pub fn set_tube_proof(&mut self, tube: ProofAndVk) {
        self.slots = std::mem::replace(&mut self.slots, ProofSlots::Empty).with_tube(tube);
    }

    pub fn set_avm_proof(&mut self, avm: ProofAndVk) {
        self.slots = std::mem::replace(&mut self.slots, ProofSlots::Empty).with_avm(avm);
    }

    /// Inputs for this transaction's tube job. Available from admission;
    /// readiness is only required for base rollup assembly.
    pub fn tube_inputs(&self) -> TubeInputs {
        TubeInputs {
            has_public_calls: self.require_avm_proof(),
            client_ivc_proof: self.tx.client_ivc_proof.clone(),
        }
    }

    /// Inputs for this transaction's AVM job.
    pub fn avm_inputs(&self) -> Result<AvmInputs> {
        let inputs = self
            .tx
            .avm_inputs
            .clone()
            .ok_or(OrchestratorError::AvmNotRequired)?;
        Ok(AvmInputs { inputs })
    }

    /// Assemble the base rollup job for this transaction: shape chosen
    /// strictly from the AVM requirement, consulting the matching hint
    /// bundle. A mismatched hint tag is a fatal internal-consistency error,
    /// surfaced here rather than silently coerced.
    pub fn base_rollup_type_and_inputs(
        &self,
        registry: &VkRegistry,
        config: &OrchestratorConfig,
    ) -> Result<(ProvingJobType, ProvingJobInputs)> {
        if self.require_avm_proof() {
            Ok((
                ProvingJobType::PublicBaseRollup,
                ProvingJobInputs::PublicBaseRollup(self.public_base_inputs(registry, config)?),
            ))
        } else {
            Ok((
                ProvingJobType::PrivateBaseRollup,
                ProvingJobInputs::PrivateBaseRollup(self.private_base_inputs(registry, config)?),
            ))
        }
    }

    fn private_base_inputs(
        &self,
        registry: &VkRegistry,
        config: &OrchestratorConfig,
    ) -> Result<PrivateBaseRollupInputs> {
        let tube_data = self.tube_data(registry, config)?;
        let hints = match &self.hints {
            BaseRollupHints::Private(hints) => hints.clone(),
            BaseRollupHints::Public(_) => {
                return Err(OrchestratorError::MismatchedHints {
                    expected: "private",
                    got: "public",
                })
            }
        };
        Ok(PrivateBaseRollupInputs { tube_data, hints })
    }

    fn public_base_inputs(
        &self,
        registry: &VkRegistry,
        config: &OrchestratorConfig,
    ) -> Result<PublicBaseRollupInputs> {
        let tube_data = self.tube_data(registry, config)?;

        let avm = self.slots.avm().ok_or(OrchestratorError::TxNotReady)?;
        let avm_inputs = self
            .tx
            .avm_inputs
            .as_ref()
            .ok_or(OrchestratorError::AvmNotRequired)?;
        // The AVM key always sits at its designated index.
        let avm_data = AvmProofData {
            public_inputs: avm_inputs.public_inputs.clone(),
            proof: avm.proof.clone(),
            vk_witness: registry.witness_at(&avm.verification_key, AVM_VK_INDEX),
        };

        let hints = match &self.hints {
            BaseRollupHints::Public(hints) => hints.clone(),
            BaseRollupHints::Private(_) => {
                return Err(OrchestratorError::MismatchedHints {
                    expected: "public",
                    got: "private",
                })
            }
        };

        Ok(PublicBaseRollupInputs {
            tube_data,
            avm_data,
            hints,
        })
    }

    fn tube_data(&self, registry: &VkRegistry, config: &OrchestratorConfig) -> Result<TubeData> {
        let tube = self.slots.tube().ok_or(OrchestratorError::TxNotReady)?;

        let vk_index = match registry.index_of(&tube.verification_key) {
            Some(index) => index,
            None if config.use_default_vk_index_on_miss => TUBE_VK_INDEX,
            None => return Err(OrchestratorError::UnknownVerificationKey),
        };

        Ok(TubeData {
            public_inputs: self.tx.kernel_public_inputs.clone(),
            proof: tube.proof.clone(),
            vk_witness: registry.witness_at(&tube.verification_key, vk_index),
        })
    }
}
