//! # Prover Types
//!
//! Shared data model and wire types for the distributed epoch prover:
//! proof blobs, transaction records, tree snapshots, proving jobs and their
//! typed inputs/results, plus the request/response types of the job queue
//! protocol spoken between broker and workers.
//!
//! Everything here is plain data. The queue and orchestrator crates own the
//! behavior; workers only ever see these types over the wire.

mod inputs;
mod job;
mod proofs;
mod serialization_test;
mod snapshots;
mod status;
mod tx;
mod wire;

pub use inputs::{
    AvmInputs, AvmProofData, BlockMergeInputs, BlockRootInputs, EpochRootInputs,
    MergeRollupInputs, PrivateBaseRollupInputs, ProvingJobInputs, PublicBaseRollupInputs,
    TubeData, TubeInputs,
};
pub use job::{ProofUri, ProvingJob, ProvingJobId, ProvingJobResult, ProvingJobType, TreePosition};
pub use proofs::{Proof, ProofAndVk, RollupProofOutput, VerificationKey, VkWitness};
pub use snapshots::{TreeKind, TreeSnapshot};
pub use status::{EpochFailure, EpochState, EpochStatus, JobCounts};
pub use tx::{
    AvmCircuitInputs, BaseRollupHints, PrivateBaseRollupHints, ProcessedTx,
    PublicBaseRollupHints, TxHash,
};
pub use wire::{
    AdmitTxRequest, ApiResponse, HeartbeatRequest, JobAck, LeaseId, ProvingJobLease,
    PullJobResponse, RejectRequest, ResolveRequest, StartBlockRequest, StartEpochRequest,
};
