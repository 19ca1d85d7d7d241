//! Proving jobs: the schedulable units of the composition hierarchy.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ProofAndVk, RollupProofOutput};

/// The closed set of proving job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvingJobType {
    Tube,
    Avm,
    PrivateBaseRollup,
    PublicBaseRollup,
    MergeRollup,
    BlockRoot,
    BlockMerge,
    EpochRoot,
}

impl ProvingJobType {
    /// Position of this job kind in the composition hierarchy. The queue
    /// serves lower levels first to keep the critical path short.
    pub fn tree_level(&self) -> u8 {
        match self {
            ProvingJobType::Tube | ProvingJobType::Avm => 0,
            ProvingJobType::PrivateBaseRollup | ProvingJobType::PublicBaseRollup => 1,
            ProvingJobType::MergeRollup => 2,
            ProvingJobType::BlockRoot => 3,
            ProvingJobType::BlockMerge => 4,
            ProvingJobType::EpochRoot => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvingJobType::Tube => "tube",
            ProvingJobType::Avm => "avm",
            ProvingJobType::PrivateBaseRollup => "private-base-rollup",
            ProvingJobType::PublicBaseRollup => "public-base-rollup",
            ProvingJobType::MergeRollup => "merge-rollup",
            ProvingJobType::BlockRoot => "block-root",
            ProvingJobType::BlockMerge => "block-merge",
            ProvingJobType::EpochRoot => "epoch-root",
        }
    }
}

impl std::fmt::Display for ProvingJobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a job's slot in the composition hierarchy.
///
/// Leaf jobs (tube/avm/base) use level 0 with `index` = tx index within the
/// block. Block-level merges use their tree level. Epoch-level jobs
/// (block-merge/epoch-root) set `block` to 0 and address the epoch tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePosition {
    pub block: u32,
    pub level: u32,
    pub index: u64,
}

impl TreePosition {
    pub fn new(block: u32, level: u32, index: u64) -> Self {
        Self {
            block,
            level,
            index,
        }
    }
}

/// Stable job identity: sha256 over (epoch, type, position), hex-encoded.
///
/// Resubmitting the same logical unit of work derives the same id, so late
/// results from a superseded lease are recognized rather than re-applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProvingJobId(pub String);

impl ProvingJobId {
    pub fn derive(epoch: u64, job_type: ProvingJobType, position: TreePosition) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(epoch.to_be_bytes());
        hasher.update(job_type.as_str().as_bytes());
        hasher.update(position.block.to_be_bytes());
        hasher.update(position.level.to_be_bytes());
        hasher.update(position.index.to_be_bytes());
        ProvingJobId(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProvingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-addressed pointer to a job's input payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofUri(pub String);

impl std::fmt::Display for ProofUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of schedulable work as served to workers.
///
/// Inputs travel by reference; workers fetch the payload from the input
/// store using `inputs_uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingJob {
    pub id: ProvingJobId,
    pub job_type: ProvingJobType,
    pub epoch: u64,
    pub position: TreePosition,
    pub inputs_uri: ProofUri,
}

/// Typed result payloads, one variant per job kind.
///
/// The queue validates the pairing at its boundary; a mismatched variant is
/// a caller bug, never a retryable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProvingJobResult {
    Tube(ProofAndVk),
    Avm(ProofAndVk),
    PrivateBaseRollup(RollupProofOutput),
    PublicBaseRollup(RollupProofOutput),
    MergeRollup(RollupProofOutput),
    BlockRoot(RollupProofOutput),
    BlockMerge(RollupProofOutput),
    EpochRoot(RollupProofOutput),
}

impl ProvingJobResult {
    pub fn job_type(&self) -> ProvingJobType {
        match self {
            ProvingJobResult::Tube(_) => ProvingJobType::Tube,
            ProvingJobResult::Avm(_) => ProvingJobType::Avm,
            ProvingJobResult::PrivateBaseRollup(_) => ProvingJobType::PrivateBaseRollup,
            ProvingJobResult::PublicBaseRollup(_) => ProvingJobType::PublicBaseRollup,
            ProvingJobResult::MergeRollup(_) => ProvingJobType::MergeRollup,
            ProvingJobResult::BlockRoot(_) => ProvingJobType::BlockRoot,
            ProvingJobResult::BlockMerge(_) => ProvingJobType::BlockMerge,
            ProvingJobResult::EpochRoot(_) => ProvingJobType::EpochRoot,
        }
    }

    pub fn matches(&self, job_type: ProvingJobType) -> bool {
        self.job_type() == job_type
    }

    /// The rollup output carried by composition results; `None` for leaf
    /// (tube/avm) results.
    pub fn rollup_output(&self) -> Option<&RollupProofOutput> {
        match self {
            ProvingJobResult::Tube(_) | ProvingJobResult::Avm(_) => None,
            ProvingJobResult::PrivateBaseRollup(out)
            | ProvingJobResult::PublicBaseRollup(out)
            | ProvingJobResult::MergeRollup(out)
            | ProvingJobResult::BlockRoot(out)
            | ProvingJobResult::BlockMerge(out)
            | ProvingJobResult::EpochRoot(out) => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Proof, VerificationKey};

    #[test]
    fn test_job_id_stable_across_derivations() {
        let a = ProvingJobId::derive(3, ProvingJobType::MergeRollup, TreePosition::new(0, 1, 4));
        let b = ProvingJobId::derive(3, ProvingJobType::MergeRollup, TreePosition::new(0, 1, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_job_id_distinguishes_identity_fields() {
        let base = ProvingJobId::derive(3, ProvingJobType::MergeRollup, TreePosition::new(0, 1, 4));
        assert_ne!(
            base,
            ProvingJobId::derive(4, ProvingJobType::MergeRollup, TreePosition::new(0, 1, 4))
        );
        assert_ne!(
            base,
            ProvingJobId::derive(3, ProvingJobType::BlockMerge, TreePosition::new(0, 1, 4))
        );
        assert_ne!(
            base,
            ProvingJobId::derive(3, ProvingJobType::MergeRollup, TreePosition::new(0, 2, 4))
        );
    }

    #[test]
    fn test_result_type_pairing() {
        let leaf = ProvingJobResult::Tube(ProofAndVk {
            proof: Proof(vec![1]),
            verification_key: VerificationKey(vec![2]),
        });
        assert!(leaf.matches(ProvingJobType::Tube));
        assert!(!leaf.matches(ProvingJobType::Avm));
        assert!(leaf.rollup_output().is_none());

        let merge = ProvingJobResult::MergeRollup(RollupProofOutput::padding());
        assert!(merge.matches(ProvingJobType::MergeRollup));
        assert!(merge.rollup_output().is_some());
    }

    #[test]
    fn test_tree_level_ordering_leaves_first() {
        assert!(ProvingJobType::Tube.tree_level() < ProvingJobType::PrivateBaseRollup.tree_level());
        assert!(
            ProvingJobType::PublicBaseRollup.tree_level() < ProvingJobType::MergeRollup.tree_level()
        );
        assert!(ProvingJobType::MergeRollup.tree_level() < ProvingJobType::EpochRoot.tree_level());
    }
}
