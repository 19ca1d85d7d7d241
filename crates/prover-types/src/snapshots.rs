//! Merkle tree snapshots attached to transactions.
//!
//! Tree storage lives outside this system. The orchestrator only threads
//! immutable snapshot values through to proof inputs.

use serde::{Deserialize, Serialize};

/// The world-state trees a transaction carries snapshots for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    NoteHash,
    Nullifier,
    PublicData,
    L1ToL2Message,
    Archive,
}

impl TreeKind {
    pub const ALL: [TreeKind; 5] = [
        TreeKind::NoteHash,
        TreeKind::Nullifier,
        TreeKind::PublicData,
        TreeKind::L1ToL2Message,
        TreeKind::Archive,
    ];
}

/// Immutable snapshot of one tree: root plus next free leaf index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    #[serde(with = "hex::serde")]
    pub root: [u8; 32],
    pub next_available_leaf_index: u64,
}

impl TreeSnapshot {
    pub fn new(root: [u8; 32], next_available_leaf_index: u64) -> Self {
        Self {
            root,
            next_available_leaf_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TreeKind::L1ToL2Message).unwrap();
        assert_eq!(json, "\"l1_to_l2_message\"");
    }
}
