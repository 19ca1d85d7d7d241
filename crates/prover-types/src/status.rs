//! Per-epoch run status exposed to the admission caller.

use serde::{Deserialize, Serialize};

use crate::{ProvingJobId, ProvingJobType};

/// Job counts for one epoch, by queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub pending: usize,
    pub leased: usize,
    pub resolved: usize,
    pub dead: usize,
    pub cancelled: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.pending + self.leased + self.resolved + self.dead + self.cancelled
    }
}

/// Why an epoch run failed. Cancellation is deliberately not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EpochFailure {
    /// A job exhausted its retry budget.
    RetriesExhausted {
        job_id: ProvingJobId,
        job_type: ProvingJobType,
    },
    /// An internal-consistency violation (mismatched hints, wrong result
    /// shape). Never retried; retrying cannot fix a logic error.
    Internal { detail: String },
}

/// Lifecycle of an epoch proving run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EpochState {
    InProgress,
    Complete,
    Failed { failure: EpochFailure },
    Cancelled,
}

/// Snapshot of an epoch run for the status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochStatus {
    pub epoch: u64,
    pub state: EpochState,
    pub jobs: JobCounts,
}
