//! # Prover Broker
//!
//! HTTP surface of the proving job queue. Workers speak the four-call
//! protocol (`pull`, `heartbeat`, `resolve`, `reject`); the sequencer side
//! drives admission (`epochs`, `blocks`, `txs`) and reads run status.
//!
//! ## Endpoints
//!
//! ### Worker protocol
//! - `POST /jobs/pull` - Lease one eligible job, or none
//! - `POST /jobs/heartbeat` - Extend a held lease
//! - `POST /jobs/resolve` - Deliver a typed result
//! - `POST /jobs/reject` - Report a failed attempt
//!
//! ### Admission & status
//! - `GET /health` - Health check
//! - `POST /epochs` - Start an epoch run
//! - `POST /epochs/:epoch/blocks` - Open the next block
//! - `POST /epochs/:epoch/txs` - Admit a transaction
//! - `POST /epochs/:epoch/cancel` - Cooperatively cancel the run
//! - `GET /epochs/:epoch/status` - Job counts and run state

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use prover_orchestrator::ProvingOrchestrator;
use prover_queue::ProvingJobQueue;
use prover_types::{
    AdmitTxRequest, ApiResponse, EpochStatus, HeartbeatRequest, JobAck, PullJobResponse,
    RejectRequest, ResolveRequest, StartBlockRequest, StartEpochRequest,
};

/// Shared broker state: the queue for the worker side, the orchestrator for
/// the admission side.
#[derive(Clone)]
pub struct BrokerState {
    pub queue: Arc<ProvingJobQueue>,
    pub orchestrator: Arc<ProvingOrchestrator>,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response to opening a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBlockResponse {
    pub block_index: u32,
}

/// Build the broker router.
pub fn broker_router(state: BrokerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Worker protocol
        .route("/jobs/pull", post(pull_job_handler))
        .route("/jobs/heartbeat", post(heartbeat_handler))
        .route("/jobs/resolve", post(resolve_handler))
        .route("/jobs/reject", post(reject_handler))
        // Admission & status
        .route("/epochs", post(start_epoch_handler))
        .route("/epochs/:epoch/blocks", post(start_block_handler))
        .route("/epochs/:epoch/txs", post(admit_tx_handler))
        .route("/epochs/:epoch/cancel", post(cancel_epoch_handler))
        .route("/epochs/:epoch/status", get(epoch_status_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
    }))
}

async fn pull_job_handler(State(state): State<BrokerState>) -> Json<ApiResponse<PullJobResponse>> {
    let lease = state.queue.get_proving_job().await;
    Json(ApiResponse::success(PullJobResponse { lease }))
}

async fn heartbeat_handler(
    State(state): State<BrokerState>,
    Json(request): Json<HeartbeatRequest>,
) -> Json<ApiResponse<JobAck>> {
    state
        .queue
        .heartbeat(&request.job_id, request.lease_id)
        .await;
    Json(ApiResponse::success(JobAck {
        job_id: request.job_id,
    }))
}

async fn resolve_handler(
    State(state): State<BrokerState>,
    Json(request): Json<ResolveRequest>,
) -> Json<ApiResponse<JobAck>> {
    match state
        .queue
        .resolve_proving_job(&request.job_id, request.lease_id, request.result)
        .await
    {
        Ok(()) => Json(ApiResponse::success(JobAck {
            job_id: request.job_id,
        })),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

async fn reject_handler(
    State(state): State<BrokerState>,
    Json(request): Json<RejectRequest>,
) -> Json<ApiResponse<JobAck>> {
    state
        .queue
        .reject_proving_job(&request.job_id, request.lease_id, request.reason)
        .await;
    Json(ApiResponse::success(JobAck {
        job_id: request.job_id,
    }))
}

async fn start_epoch_handler(
    State(state): State<BrokerState>,
    Json(request): Json<StartEpochRequest>,
) -> Json<ApiResponse<StartEpochRequest>> {
    info!(
        "Admission: start epoch {} ({} blocks)",
        request.epoch, request.num_blocks
    );
    match state
        .orchestrator
        .start_epoch(request.epoch, request.num_blocks)
        .await
    {
        Ok(()) => Json(ApiResponse::success(request)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

async fn start_block_handler(
    State(state): State<BrokerState>,
    Path(epoch): Path<u64>,
    Json(request): Json<StartBlockRequest>,
) -> Json<ApiResponse<StartBlockResponse>> {
    match state.orchestrator.start_block(epoch, request.num_txs).await {
        Ok(block_index) => Json(ApiResponse::success(StartBlockResponse { block_index })),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

async fn admit_tx_handler(
    State(state): State<BrokerState>,
    Path(epoch): Path<u64>,
    Json(request): Json<AdmitTxRequest>,
) -> Json<ApiResponse<()>> {
    match state
        .orchestrator
        .admit_transaction(
            epoch,
            request.block_index,
            request.tx,
            request.hints,
            request.snapshots,
        )
        .await
    {
        Ok(()) => Json(ApiResponse::success(())),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

async fn cancel_epoch_handler(
    State(state): State<BrokerState>,
    Path(epoch): Path<u64>,
) -> Json<ApiResponse<()>> {
    match state.orchestrator.cancel_epoch(epoch).await {
        Ok(()) => Json(ApiResponse::success(())),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

async fn epoch_status_handler(
    State(state): State<BrokerState>,
    Path(epoch): Path<u64>,
) -> Json<ApiResponse<EpochStatus>> {
    match state.orchestrator.run_status(epoch).await {
        Some(status) => Json(ApiResponse::success(status)),
        None => Json(ApiResponse::error(format!("Epoch {} not found", epoch))),
    }
}
