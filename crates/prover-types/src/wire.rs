//! Request/response types for the job queue protocol and the admission API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BaseRollupHints, ProcessedTx, ProvingJob, ProvingJobId, ProvingJobResult, TreeKind,
    TreeSnapshot,
};

/// JSON envelope for every broker response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success { data: T },
    Error { message: String },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            message: message.into(),
        }
    }
}

/// Identity of one lease on one job. A new lease gets a new id, so late
/// calls from a superseded holder are recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub Uuid);

impl LeaseId {
    pub fn fresh() -> Self {
        LeaseId(Uuid::new_v4())
    }
}

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a worker holds after a successful pull: the job plus the lease it
/// must heartbeat inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingJobLease {
    pub job: ProvingJob,
    pub lease_id: LeaseId,
    pub lease_timeout_ms: u64,
}

/// Response to a pull; `lease` is absent when no eligible work exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullJobResponse {
    pub lease: Option<ProvingJobLease>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub job_id: ProvingJobId,
    pub lease_id: LeaseId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub job_id: ProvingJobId,
    pub lease_id: LeaseId,
    pub result: ProvingJobResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub job_id: ProvingJobId,
    pub lease_id: LeaseId,
    pub reason: String,
}

/// Ack payload echoed for heartbeat/resolve/reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAck {
    pub job_id: ProvingJobId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartEpochRequest {
    pub epoch: u64,
    pub num_blocks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBlockRequest {
    pub num_txs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitTxRequest {
    pub block_index: u32,
    pub tx: ProcessedTx,
    pub hints: BaseRollupHints,
    pub snapshots: HashMap<TreeKind, TreeSnapshot>,
}
