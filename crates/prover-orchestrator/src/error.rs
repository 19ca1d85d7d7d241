//! Error definitions for the orchestrator.
//!
//! Everything here is fatal for the owning epoch: transient worker failures
//! never surface as these errors (the queue retries them), so an
//! `OrchestratorError` during event handling aborts the run.

use prover_types::EpochState;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    /// Epoch was never started.
    #[error("Unknown epoch {0}")]
    UnknownEpoch(u64),

    /// A second `start_epoch` for the same epoch number.
    #[error("Epoch {0} already started")]
    EpochAlreadyStarted(u64),

    /// Work arrived for an epoch that already completed, failed, or was
    /// cancelled.
    #[error("Epoch {epoch} is not accepting work ({state:?})")]
    EpochNotInProgress { epoch: u64, state: EpochState },

    /// More blocks started than declared at `start_epoch`.
    #[error("All {num_blocks} blocks of epoch {epoch} already started")]
    TooManyBlocks { epoch: u64, num_blocks: u32 },

    #[error("Unknown block {block_index} in epoch {epoch}")]
    UnknownBlock { epoch: u64, block_index: u32 },

    /// More transactions admitted than the block declared.
    #[error("Block {block_index} of epoch {epoch} is full ({num_txs} txs)")]
    BlockFull {
        epoch: u64,
        block_index: u32,
        num_txs: usize,
    },

    /// A block must admit at least one transaction.
    #[error("Block in epoch {0} declared with zero transactions")]
    EmptyBlock(u64),

    /// Base rollup assembly requested before all required sub-proofs landed.
    #[error("Tx not ready for proving base rollup")]
    TxNotReady,

    /// The externally supplied hint bundle's tag disagrees with the
    /// transaction's proof requirements. A programming error upstream,
    /// never retried.
    #[error("Mismatched base rollup hints: expected {expected}, got {got}")]
    MismatchedHints {
        expected: &'static str,
        got: &'static str,
    },

    /// AVM inputs requested for a transaction with no public calls.
    #[error("Transaction does not require an AVM proof")]
    AvmNotRequired,

    /// A tube verification key missing from the registry while the default
    /// index fallback is disabled.
    #[error("Verification key not registered in the canonical key tree")]
    UnknownVerificationKey,

    #[error("Input store error: {0}")]
    InputStore(String),

    #[error("Root proof publication failed: {0}")]
    Publish(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
