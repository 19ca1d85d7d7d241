//! Canonical verification-key registry.
//!
//! The protocol fixes a small tree of registered verification keys; circuits
//! prove key membership with a sibling path. The registry here mirrors that
//! build-time table: key hash → index, plus the path for each index. Paths
//! are opaque to the orchestrator; it only threads them into proof inputs.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use prover_types::{VerificationKey, VkWitness};

/// Designated index of the tube circuit's key in the canonical tree.
pub const TUBE_VK_INDEX: u32 = 0;
/// Designated index of the AVM circuit's key.
pub const AVM_VK_INDEX: u32 = 1;
/// Height of the canonical key tree.
pub const VK_TREE_HEIGHT: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct VkRegistry {
    by_hash: HashMap<String, u32>,
    paths: HashMap<u32, Vec<String>>,
}

impl VkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key at an index, precomputing its sibling path.
    pub fn register_key(&mut self, vk: &VerificationKey, index: u32) {
        self.by_hash.insert(vk.key_hash(), index);
        self.paths.insert(index, derive_sibling_path(index));
    }

    /// Index of a registered key, if any.
    pub fn index_of(&self, vk: &VerificationKey) -> Option<u32> {
        self.by_hash.get(&vk.key_hash()).copied()
    }

    /// Sibling path for an index. Indices without a registered key still
    /// have a well-defined path (the tree is fixed; unregistered leaves are
    /// empty).
    pub fn sibling_path(&self, index: u32) -> Vec<String> {
        self.paths
            .get(&index)
            .cloned()
            .unwrap_or_else(|| derive_sibling_path(index))
    }

    /// Assemble the membership witness for a key at a known index.
    pub fn witness_at(&self, vk: &VerificationKey, index: u32) -> VkWitness {
        VkWitness {
            verification_key: vk.clone(),
            index,
            sibling_path: self.sibling_path(index),
        }
    }
}

fn derive_sibling_path(index: u32) -> Vec<String> {
    (0..VK_TREE_HEIGHT)
        .map(|level| {
            let mut hasher = Sha256::new();
            hasher.update(b"vk-tree-sibling");
            hasher.update(index.to_be_bytes());
            hasher.update((level as u32).to_be_bytes());
            hex::encode(hasher.finalize())
        })
        .collect()
}
