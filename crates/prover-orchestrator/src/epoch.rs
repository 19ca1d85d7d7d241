//! Per-block and per-epoch proving state.
//!
//! A block owns one composition tree over its transactions' base rollup
//! outputs. An epoch owns its blocks plus, for multi-block epochs, a second
//! tree over the block root proofs. Epochs in flight are fully independent;
//! nothing here is shared across epoch boundaries.

use std::collections::HashMap;

use prover_types::{EpochState, TreeKind, TreeSnapshot};

use crate::tree::ProvingTree;
use crate::tx_proving_state::TxProvingState;

#[derive(Debug)]
pub(crate) struct BlockProvingState {
    pub block_index: u32,
    pub num_txs: usize,
    /// Transactions admitted so far; indexes into `txs`.
    pub admitted: usize,
    /// Per-tx state, dropped once the tx's base rollup output lands in the
    /// tree.
    pub txs: Vec<Option<TxProvingState>>,
    /// Composition tree over base rollup outputs.
    pub tree: ProvingTree,
    /// World-state snapshots captured when the block was opened.
    pub start_state: HashMap<TreeKind, TreeSnapshot>,
}

impl BlockProvingState {
    pub fn new(
        block_index: u32,
        num_txs: usize,
        start_state: HashMap<TreeKind, TreeSnapshot>,
    ) -> Self {
        let mut txs = Vec::with_capacity(num_txs);
        txs.resize_with(num_txs, || None);
        Self {
            block_index,
            num_txs,
            admitted: 0,
            txs,
            tree: ProvingTree::new(num_txs),
            start_state,
        }
    }
}

#[derive(Debug)]
pub(crate) struct EpochProvingState {
    pub epoch: u64,
    pub num_blocks: u32,
    pub blocks: Vec<BlockProvingState>,
    /// Tree over block root proofs; only multi-block epochs have one. A
    /// single-block epoch completes at its block tree root.
    pub epoch_tree: Option<ProvingTree>,
    pub state: EpochState,
}

impl EpochProvingState {
    pub fn new(epoch: u64, num_blocks: u32) -> Self {
        Self {
            epoch,
            num_blocks,
            blocks: Vec::new(),
            epoch_tree: (num_blocks > 1).then(|| ProvingTree::new(num_blocks as usize)),
            state: EpochState::InProgress,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.state, EpochState::InProgress)
    }

    /// Drop all per-tx and per-tree memory, keeping only the terminal state
    /// for status queries.
    pub fn release(&mut self) {
        self.blocks = Vec::new();
        self.epoch_tree = None;
    }
}
