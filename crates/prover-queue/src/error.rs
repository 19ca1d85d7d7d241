//! Error definitions for the job queue.

use prover_types::{ProvingJobId, ProvingJobType};
use thiserror::Error;

/// Errors returned across the queue boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Job id was never enqueued (or belongs to a different broker).
    #[error("Unknown proving job: {0}")]
    UnknownJob(ProvingJobId),

    /// The job already failed terminally; late results are refused.
    #[error("Proving job {job_id} is dead after {attempts} attempts")]
    JobDead {
        job_id: ProvingJobId,
        attempts: u32,
    },

    /// Result payload shape does not match the job's declared type. This is
    /// a caller bug, not a retryable failure.
    #[error("Result type mismatch for job {job_id}: expected {expected}, got {got}")]
    ResultTypeMismatch {
        job_id: ProvingJobId,
        expected: ProvingJobType,
        got: ProvingJobType,
    },
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
