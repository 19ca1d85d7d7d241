//! # Prover Worker
//!
//! Binary entrypoint: polls the broker for jobs, heartbeats while proving,
//! and reports results or failures. Stateless; run as many replicas as the
//! proving load needs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use tracing::{error, info, warn};

use prover_types::ProvingJobLease;
use prover_worker::{BrokerClient, CircuitProver, MockProver};

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "prover-worker")]
#[command(about = "Pull-model proving worker for the epoch prover swarm", long_about = None)]
struct Args {
    /// Worker ID (unique identifier, for logs only)
    #[arg(long, env = "WORKER_ID", default_value = "1")]
    worker_id: u32,

    /// Broker base URL
    #[arg(long, default_value = "http://localhost:8080", env = "BROKER_URL")]
    broker_url: String,

    /// Idle poll interval in milliseconds
    #[arg(long, default_value = "500", env = "POLL_INTERVAL_MS")]
    poll_interval_ms: u64,

    /// Heartbeat interval in milliseconds; keep well inside the lease
    #[arg(long, default_value = "10000", env = "HEARTBEAT_INTERVAL_MS")]
    heartbeat_interval_ms: u64,

    /// Mock proving delay in milliseconds (simulates proving time)
    #[arg(long, default_value = "500", env = "MOCK_DELAY_MS")]
    mock_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prover_worker=debug".into()),
        )
        .init();

    let args = Args::parse();

    info!(
        "Starting prover worker {} against {}",
        args.worker_id, args.broker_url
    );

    let client = BrokerClient::new(args.broker_url.clone());
    let prover: Arc<dyn CircuitProver> = Arc::new(MockProver::new(args.mock_delay_ms));

    loop {
        match client.pull_job().await {
            Ok(Some(lease)) => {
                process_job(&args, &client, prover.clone(), lease).await;
            }
            Ok(None) => {
                // Jitter idle polls so a fleet does not stampede the broker.
                let jitter = rand::rng().random_range(0..args.poll_interval_ms / 2 + 1);
                tokio::time::sleep(Duration::from_millis(args.poll_interval_ms + jitter)).await;
            }
            Err(e) => {
                warn!("Failed to pull job from broker: {}", e);
                tokio::time::sleep(Duration::from_millis(args.poll_interval_ms * 2)).await;
            }
        }
    }
}

/// Prove one leased job, heartbeating until the result is delivered.
async fn process_job(
    args: &Args,
    client: &BrokerClient,
    prover: Arc<dyn CircuitProver>,
    lease: ProvingJobLease,
) {
    let job = lease.job.clone();
    info!(
        "Worker {} leased {} job {} (epoch {})",
        args.worker_id, job.job_type, job.id, job.epoch
    );

    // Heartbeat ticker for the duration of the proof.
    let heartbeat = {
        let client = client.clone();
        let job_id = job.id.clone();
        let lease_id = lease.lease_id;
        let interval = Duration::from_millis(args.heartbeat_interval_ms);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = client.heartbeat(&job_id, lease_id).await {
                    warn!("Heartbeat for job {} failed: {}", job_id, e);
                }
            }
        })
    };

    // Proving is CPU-bound; keep it off the async runtime.
    let prove_job = job.clone();
    let result = tokio::task::spawn_blocking(move || prover.prove(&prove_job)).await;

    heartbeat.abort();

    match result {
        Ok(Ok(proof)) => {
            if let Err(e) = client.resolve(&job.id, lease.lease_id, proof).await {
                error!("Failed to resolve job {}: {}", job.id, e);
            } else {
                info!("Worker {} resolved job {}", args.worker_id, job.id);
            }
        }
        Ok(Err(e)) => {
            warn!("Proving failed for job {}: {}", job.id, e);
            if let Err(e) = client.reject(&job.id, lease.lease_id, e.to_string()).await {
                error!("Failed to reject job {}: {}", job.id, e);
            }
        }
        Err(e) => {
            error!("Prover task panicked for job {}: {}", job.id, e);
            let _ = client
                .reject(&job.id, lease.lease_id, format!("prover panicked: {e}"))
                .await;
        }
    }
}
