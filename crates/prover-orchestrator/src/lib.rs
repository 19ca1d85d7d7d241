//! # Proving Orchestrator
//!
//! The "brain" of the epoch prover: turns admitted transactions into a
//! hierarchy of proving jobs and composes the results into one root proof.
//!
//! ```text
//!   txs ──admit──► ┌───────────────────────────────────────────┐
//!                  │              ORCHESTRATOR                 │
//!                  │                                           │
//!                  │  1. Per tx: tube (+ avm) leaf jobs        │
//!                  │  2. Ready tx → base rollup job            │
//!                  │  3. Base/merge results → composition tree │
//!                  │  4. Both children ready → merge job       │
//!                  │  5. Root proof → publisher sink           │
//!                  └───────────────────────────────────────────┘
//!                       │               ▲
//!                  enqueue jobs    queue events
//!                       ▼               │
//!                  ┌───────────────────────────────────────────┐
//!                  │               JOB QUEUE                   │
//!                  └───────────────────────────────────────────┘
//!                       │         │         │
//!                    Worker 1  Worker 2  Worker 3
//! ```
//!
//! The control loop is logically single-threaded per epoch: it reacts to one
//! queue event at a time, so tree mutation and job-eligibility computation
//! need no internal locking beyond the epoch table itself. Only the job
//! queue boundary is genuinely concurrent.

mod collaborators;
mod config;
mod epoch;
mod error;
mod orchestrator;
mod tree;
mod tx_proving_state;
mod vk_tree;

#[cfg(test)]
mod tests;

pub use collaborators::{
    CollectingRootSink, MemoryInputStore, ProvingInputStore, RootProofSink, SnapshotProvider,
    StaticSnapshotProvider,
};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use orchestrator::ProvingOrchestrator;
pub use tree::{EligibleMerge, ProvingTree};
pub use tx_proving_state::TxProvingState;
pub use vk_tree::{VkRegistry, AVM_VK_INDEX, TUBE_VK_INDEX, VK_TREE_HEIGHT};
