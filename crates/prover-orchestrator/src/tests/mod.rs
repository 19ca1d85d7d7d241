//! End-to-end tests: orchestrator + queue + in-process mock workers.


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use prover_queue::{ProvingJobQueue, QueueConfig};
use prover_types::{
    AvmCircuitInputs, BaseRollupHints, EpochState, PrivateBaseRollupHints, ProcessedTx, Proof,
    ProofAndVk, ProofUri, ProvingJob, ProvingJobId, ProvingJobResult, ProvingJobType,
    PublicBaseRollupHints, RollupProofOutput, TreeKind, TreePosition, TreeSnapshot, TxHash,
    VerificationKey,
};

use crate::{
    CollectingRootSink, MemoryInputStore, OrchestratorConfig, ProvingOrchestrator,
    StaticSnapshotProvider, VkRegistry,
};

// ============================================================================
// Harness
// ============================================================================

pub(crate) struct TestHarness {
    pub queue: Arc<ProvingJobQueue>,
    pub orchestrator: Arc<ProvingOrchestrator>,
    pub sink: Arc<CollectingRootSink>,
    pub store: Arc<MemoryInputStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_configs(
            QueueConfig {
                lease_duration: Duration::from_secs(30),
                max_retries: 2,
                reclaim_interval: Duration::from_millis(20),
            },
            OrchestratorConfig::default(),
        )
    }

    pub fn with_configs(queue_config: QueueConfig, config: OrchestratorConfig) -> Self {
        let (queue, events) = ProvingJobQueue::new(queue_config);
        let sink = Arc::new(CollectingRootSink::new());
        let store = Arc::new(MemoryInputStore::new());
        let orchestrator = Arc::new(ProvingOrchestrator::new(
            queue.clone(),
            config,
            VkRegistry::new(),
            store.clone(),
            Arc::new(StaticSnapshotProvider::empty()),
            sink.clone(),
        ));

        let runner = orchestrator.clone();
        tokio::spawn(async move { runner.run(events).await });

        Self {
            queue,
            orchestrator,
            sink,
            store,
        }
    }

    /// Poll the run status until `pred` holds or a 5s deadline passes.
    pub async fn wait_for_state(&self, epoch: u64, pred: fn(&EpochState) -> bool) -> EpochState {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(status) = self.orchestrator.run_status(epoch).await {
                if pred(&status.state) {
                    return status.state;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for epoch {epoch} state"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// ============================================================================
// Mock workers
// ============================================================================

/// Deterministic fake result for a job, derived from its id so expected
/// outputs are recomputable in assertions.
pub(crate) fn fake_result(job: &ProvingJob) -> ProvingJobResult {
    let seed = hex::decode(job.id.as_str()).expect("job ids are hex");
    let proof = Proof(seed.clone());
    let vk = VerificationKey(seed[..4].to_vec());
    let output = RollupProofOutput {
        public_inputs: seed[..8].to_vec(),
        proof: proof.clone(),
        verification_key: vk.clone(),
    };
    let leaf = ProofAndVk {
        proof,
        verification_key: vk,
    };
    match job.job_type {
        ProvingJobType::Tube => ProvingJobResult::Tube(leaf),
        ProvingJobType::Avm => ProvingJobResult::Avm(leaf),
        ProvingJobType::PrivateBaseRollup => ProvingJobResult::PrivateBaseRollup(output),
        ProvingJobType::PublicBaseRollup => ProvingJobResult::PublicBaseRollup(output),
        ProvingJobType::MergeRollup => ProvingJobResult::MergeRollup(output),
        ProvingJobType::BlockRoot => ProvingJobResult::BlockRoot(output),
        ProvingJobType::BlockMerge => ProvingJobResult::BlockMerge(output),
        ProvingJobType::EpochRoot => ProvingJobResult::EpochRoot(output),
    }
}

/// The output the mock worker will produce for a given logical job.
pub(crate) fn expected_output(
    epoch: u64,
    job_type: ProvingJobType,
    position: TreePosition,
) -> RollupProofOutput {
    let job = ProvingJob {
        id: ProvingJobId::derive(epoch, job_type, position),
        job_type,
        epoch,
        position,
        inputs_uri: ProofUri(String::new()),
    };
    fake_result(&job)
        .rollup_output()
        .expect("composition job")
        .clone()
}

/// Pull-resolve loop. Exits after ~250ms with no work and returns the job
/// types it served, in order.
pub(crate) fn spawn_worker(
    queue: Arc<ProvingJobQueue>,
    store: Arc<MemoryInputStore>,
) -> JoinHandle<Vec<ProvingJobType>> {
    spawn_worker_with(queue, store, None)
}

/// Like [`spawn_worker`], but rejects every job of `reject_type`.
pub(crate) fn spawn_worker_with(
    queue: Arc<ProvingJobQueue>,
    store: Arc<MemoryInputStore>,
    reject_type: Option<ProvingJobType>,
) -> JoinHandle<Vec<ProvingJobType>> {
    use crate::collaborators::ProvingInputStore;

    tokio::spawn(async move {
        let mut served = Vec::new();
        let mut idle = 0;
        loop {
            match queue.get_proving_job().await {
                Some(lease) => {
                    idle = 0;
                    served.push(lease.job.job_type);
                    // A real worker fetches its inputs before proving.
                    store
                        .load_inputs(&lease.job.inputs_uri)
                        .expect("inputs stored before enqueue");
                    if reject_type == Some(lease.job.job_type) {
                        queue
                            .reject_proving_job(&lease.job.id, lease.lease_id, "simulated failure")
                            .await;
                    } else {
                        let result = fake_result(&lease.job);
                        queue
                            .resolve_proving_job(&lease.job.id, lease.lease_id, result)
                            .await
                            .expect("resolve accepted");
                    }
                }
                None => {
                    idle += 1;
                    if idle > 50 {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
        served
    })
}

// ============================================================================
// Transaction fixtures
// ============================================================================

pub(crate) fn tx_snapshots() -> HashMap<TreeKind, TreeSnapshot> {
    TreeKind::ALL
        .iter()
        .map(|&kind| (kind, TreeSnapshot::new([3u8; 32], 64)))
        .collect()
}

pub(crate) fn private_tx(tag: u8) -> (ProcessedTx, BaseRollupHints) {
    let tx = ProcessedTx {
        tx_hash: TxHash([tag; 32]),
        kernel_public_inputs: vec![tag, 0x01],
        client_ivc_proof: Proof(vec![tag, 0x02]),
        avm_inputs: None,
    };
    let hints = BaseRollupHints::Private(PrivateBaseRollupHints {
        witness: vec![tag, 0x03],
    });
    (tx, hints)
}

pub(crate) fn public_tx(tag: u8) -> (ProcessedTx, BaseRollupHints) {
    let tx = ProcessedTx {
        tx_hash: TxHash([tag; 32]),
        kernel_public_inputs: vec![tag, 0x01],
        client_ivc_proof: Proof(vec![tag, 0x02]),
        avm_inputs: Some(AvmCircuitInputs {
            public_inputs: vec![tag, 0x04],
            execution_trace: vec![tag, 0x05],
        }),
    };
    let hints = BaseRollupHints::Public(PublicBaseRollupHints {
        witness: vec![tag, 0x06],
    });
    (tx, hints)
}
