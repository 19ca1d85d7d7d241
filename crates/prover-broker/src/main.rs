//! # Prover Broker
//!
//! Binary entrypoint: wires the job queue, the orchestrator, and the HTTP
//! surface together, spawns the lease reclaimer and the orchestrator control
//! loop, and serves the worker swarm.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use prover_broker::{broker_router, BrokerState};
use prover_orchestrator::{
    MemoryInputStore, OrchestratorConfig, ProvingOrchestrator, RootProofSink,
    StaticSnapshotProvider, VkRegistry,
};
use prover_queue::{spawn_reclaimer, ProvingJobQueue, QueueConfig};
use prover_types::RollupProofOutput;

#[derive(Parser, Debug, Clone)]
#[command(name = "prover-broker")]
#[command(about = "Proving job broker for the epoch prover swarm", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Lease duration in milliseconds; workers must heartbeat inside this
    #[arg(long, default_value = "30000", env = "LEASE_TIMEOUT_MS")]
    lease_timeout_ms: u64,

    /// Failed attempts allowed per job before it goes dead
    #[arg(long, default_value = "3", env = "MAX_RETRIES")]
    max_retries: u32,

    /// Interval between expired-lease sweeps in milliseconds
    #[arg(long, default_value = "1000", env = "RECLAIM_INTERVAL_MS")]
    reclaim_interval_ms: u64,

    /// Fall back to the designated tube vk index when a key lookup misses
    #[arg(long, default_value = "true", env = "DEFAULT_VK_FALLBACK", action = clap::ArgAction::Set)]
    default_vk_fallback: bool,
}

/// Root sink for standalone runs: completed roots are logged; publishing to
/// L1 is a separate service's concern.
struct LogRootSink;

impl RootProofSink for LogRootSink {
    fn publish_root(&self, epoch: u64, root: &RollupProofOutput) -> Result<()> {
        info!(
            "Epoch {} root proof ready ({} proof bytes)",
            epoch,
            root.proof.0.len()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prover_broker=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting prover broker on {}:{}", args.host, args.port);
    info!("Lease timeout: {}ms", args.lease_timeout_ms);
    info!("Retry budget: {}", args.max_retries);
    info!("Default vk fallback: {}", args.default_vk_fallback);

    let (queue, events) = ProvingJobQueue::new(QueueConfig {
        lease_duration: Duration::from_millis(args.lease_timeout_ms),
        max_retries: args.max_retries,
        reclaim_interval: Duration::from_millis(args.reclaim_interval_ms),
    });

    let orchestrator = Arc::new(ProvingOrchestrator::new(
        queue.clone(),
        OrchestratorConfig {
            use_default_vk_index_on_miss: args.default_vk_fallback,
        },
        VkRegistry::new(),
        Arc::new(MemoryInputStore::new()),
        Arc::new(StaticSnapshotProvider::empty()),
        Arc::new(LogRootSink),
    ));

    // Background tasks: lease reclamation and the orchestrator control loop.
    spawn_reclaimer(queue.clone());
    let runner = orchestrator.clone();
    tokio::spawn(async move { runner.run(events).await });

    let app = broker_router(BrokerState {
        queue,
        orchestrator,
    });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Broker listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
