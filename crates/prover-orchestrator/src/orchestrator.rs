//! The top-level proving controller.
//!
//! One instance drives any number of independent epoch runs: it admits
//! transactions, enqueues leaf jobs, consumes queue events, walks results up
//! the composition trees, and publishes each epoch's root proof. Transient
//! worker failures never reach this layer (the queue retries them); what
//! does reach it is terminal: resolutions, dead jobs, and its own
//! internal-consistency checks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use prover_queue::{ProvingJobQueue, QueueEvent};
use prover_types::{
    BaseRollupHints, BlockMergeInputs, BlockRootInputs, EpochFailure, EpochRootInputs,
    EpochState, EpochStatus, MergeRollupInputs, ProcessedTx, ProofAndVk, ProvingJob,
    ProvingJobId, ProvingJobInputs, ProvingJobResult, ProvingJobType, RollupProofOutput,
    TreeKind, TreePosition, TreeSnapshot,
};

use crate::collaborators::{ProvingInputStore, RootProofSink, SnapshotProvider};
use crate::config::OrchestratorConfig;
use crate::epoch::{BlockProvingState, EpochProvingState};
use crate::error::{OrchestratorError, Result};
use crate::tx_proving_state::TxProvingState;
use crate::vk_tree::VkRegistry;

pub struct ProvingOrchestrator {
    queue: Arc<ProvingJobQueue>,
    config: OrchestratorConfig,
    vk_registry: VkRegistry,
    input_store: Arc<dyn ProvingInputStore>,
    snapshots: Arc<dyn SnapshotProvider>,
    sink: Arc<dyn RootProofSink>,
    epochs: Mutex<HashMap<u64, EpochProvingState>>,
}

impl ProvingOrchestrator {
    pub fn new(
        queue: Arc<ProvingJobQueue>,
        config: OrchestratorConfig,
        vk_registry: VkRegistry,
        input_store: Arc<dyn ProvingInputStore>,
        snapshots: Arc<dyn SnapshotProvider>,
        sink: Arc<dyn RootProofSink>,
    ) -> Self {
        Self {
            queue,
            config,
            vk_registry,
            input_store,
            snapshots,
            sink,
            epochs: Mutex::new(HashMap::new()),
        }
    }

    /// The control loop: react to queue events until the queue side closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<QueueEvent>) {
        info!("Proving orchestrator started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("Queue event stream closed, orchestrator stopping");
    }

    /// Begin a proving run for an epoch of `num_blocks` blocks.
    pub async fn start_epoch(&self, epoch: u64, num_blocks: u32) -> Result<()> {
        let mut epochs = self.epochs.lock().await;
        if epochs.contains_key(&epoch) {
            return Err(OrchestratorError::EpochAlreadyStarted(epoch));
        }
        info!("Starting epoch {} ({} blocks)", epoch, num_blocks);
        epochs.insert(epoch, EpochProvingState::new(epoch, num_blocks));
        Ok(())
    }

    /// Open the next block of an epoch, fixing its transaction count (and
    /// with it the block tree geometry). Returns the block index.
    pub async fn start_block(&self, epoch: u64, num_txs: usize) -> Result<u32> {
        let mut epochs = self.epochs.lock().await;
        let ep = in_progress(&mut epochs, epoch)?;
        if num_txs == 0 {
            return Err(OrchestratorError::EmptyBlock(epoch));
        }
        if ep.blocks.len() as u32 >= ep.num_blocks {
            return Err(OrchestratorError::TooManyBlocks {
                epoch,
                num_blocks: ep.num_blocks,
            });
        }
        let block_index = ep.blocks.len() as u32;
        let start_state = self.snapshots.all();
        ep.blocks
            .push(BlockProvingState::new(block_index, num_txs, start_state));
        info!(
            "Started block {} of epoch {} ({} txs)",
            block_index, epoch, num_txs
        );
        Ok(block_index)
    }

    /// Admit one transaction into a block: create its proving state and
    /// enqueue its leaf jobs (tube always, AVM iff the tx made public
    /// calls).
    pub async fn admit_transaction(
        &self,
        epoch: u64,
        block_index: u32,
        tx: ProcessedTx,
        hints: BaseRollupHints,
        snapshots: HashMap<TreeKind, TreeSnapshot>,
    ) -> Result<()> {
        let mut epochs = self.epochs.lock().await;
        let ep = in_progress(&mut epochs, epoch)?;
        let block = ep
            .blocks
            .get_mut(block_index as usize)
            .ok_or(OrchestratorError::UnknownBlock { epoch, block_index })?;
        if block.admitted >= block.num_txs {
            return Err(OrchestratorError::BlockFull {
                epoch,
                block_index,
                num_txs: block.num_txs,
            });
        }

        let tx_index = block.admitted as u64;
        block.admitted += 1;

        let state = TxProvingState::new(tx, hints, snapshots);
        let position = TreePosition::new(block_index, 0, tx_index);

        info!(
            "Admitted tx {} to epoch {} block {} at index {} (avm: {})",
            state.tx().tx_hash,
            epoch,
            block_index,
            tx_index,
            state.require_avm_proof()
        );

        self.enqueue_job(
            epoch,
            ProvingJobType::Tube,
            position,
            &ProvingJobInputs::Tube(state.tube_inputs()),
        )
        .await?;
        if state.require_avm_proof() {
            let avm_inputs = state.avm_inputs()?;
            self.enqueue_job(
                epoch,
                ProvingJobType::Avm,
                position,
                &ProvingJobInputs::Avm(avm_inputs),
            )
            .await?;
        }

        block.txs[tx_index as usize] = Some(state);
        Ok(())
    }

    /// Cooperatively cancel an epoch: stop serving its jobs and discard its
    /// in-memory state. Not an error state; in-flight results for it are
    /// accepted and discarded by the queue.
    pub async fn cancel_epoch(&self, epoch: u64) -> Result<()> {
        let mut epochs = self.epochs.lock().await;
        let ep = epochs
            .get_mut(&epoch)
            .ok_or(OrchestratorError::UnknownEpoch(epoch))?;
        if !ep.is_in_progress() {
            debug!("Cancel for epoch {} in state {:?}, ignoring", epoch, ep.state);
            return Ok(());
        }
        warn!("Cancelling epoch {}", epoch);
        ep.state = EpochState::Cancelled;
        ep.release();
        drop(epochs);
        self.queue.cancel_epoch(epoch).await;
        Ok(())
    }

    /// Run-status query: epoch lifecycle state plus job counts.
    pub async fn run_status(&self, epoch: u64) -> Option<EpochStatus> {
        let state = {
            let epochs = self.epochs.lock().await;
            epochs.get(&epoch)?.state.clone()
        };
        let jobs = self.queue.counts_for_epoch(epoch).await;
        Some(EpochStatus { epoch, state, jobs })
    }

    /// Apply one queue event. Public so tests can drive the loop
    /// deterministically.
    pub async fn handle_event(&self, event: QueueEvent) {
        match event {
            QueueEvent::Resolved { job, result } => {
                let epoch = job.epoch;
                let mut epochs = self.epochs.lock().await;
                let Some(ep) = epochs.get_mut(&epoch) else {
                    debug!("Result for unknown epoch {}, discarding", epoch);
                    return;
                };
                if !ep.is_in_progress() {
                    debug!(
                        "Result for epoch {} in state {:?}, discarding",
                        epoch, ep.state
                    );
                    return;
                }
                if let Err(err) = self.handle_resolved(ep, &job, result).await {
                    // Internal-consistency violation: retrying cannot fix a
                    // logic error, so the epoch aborts immediately.
                    error!(
                        "Fatal error handling result of {} job {} for epoch {}: {}",
                        job.job_type, job.id, epoch, err
                    );
                    ep.state = EpochState::Failed {
                        failure: EpochFailure::Internal {
                            detail: err.to_string(),
                        },
                    };
                    ep.release();
                    drop(epochs);
                    self.queue.cancel_epoch(epoch).await;
                }
            }
            QueueEvent::Dead { job, reason } => {
                let epoch = job.epoch;
                let mut epochs = self.epochs.lock().await;
                let Some(ep) = epochs.get_mut(&epoch) else {
                    return;
                };
                if !ep.is_in_progress() {
                    return;
                }
                error!(
                    "Job {} ({}) exhausted its retry budget, failing epoch {}: {}",
                    job.id, job.job_type, epoch, reason
                );
                ep.state = EpochState::Failed {
                    failure: EpochFailure::RetriesExhausted {
                        job_id: job.id.clone(),
                        job_type: job.job_type,
                    },
                };
                ep.release();
                drop(epochs);
                self.queue.cancel_epoch(epoch).await;
            }
        }
    }

    async fn handle_resolved(
        &self,
        ep: &mut EpochProvingState,
        job: &ProvingJob,
        result: ProvingJobResult,
    ) -> Result<()> {
        match result {
            ProvingJobResult::Tube(proof) => self.on_leaf_proof(ep, job, proof, false).await,
            ProvingJobResult::Avm(proof) => self.on_leaf_proof(ep, job, proof, true).await,
            ProvingJobResult::PrivateBaseRollup(out) | ProvingJobResult::PublicBaseRollup(out) => {
                self.on_base_resolved(ep, job, out).await
            }
            ProvingJobResult::MergeRollup(out) => self.on_merge_resolved(ep, job, out).await,
            ProvingJobResult::BlockRoot(out) => self.on_block_root_resolved(ep, job, out).await,
            ProvingJobResult::BlockMerge(out) | ProvingJobResult::EpochRoot(out) => {
                self.on_epoch_merge_resolved(ep, job, out).await
            }
        }
    }

    /// A tube or AVM proof landed: feed the tx state and, once every
    /// required slot is filled, enqueue the base rollup job.
    async fn on_leaf_proof(
        &self,
        ep: &mut EpochProvingState,
        job: &ProvingJob,
        proof: ProofAndVk,
        is_avm: bool,
    ) -> Result<()> {
        let epoch = ep.epoch;
        let block_index = job.position.block;
        let tx_index = job.position.index;
        let block = block_mut(ep, epoch, block_index)?;

        let Some(tx_state) = block.txs.get_mut(tx_index as usize).and_then(Option::as_mut)
        else {
            debug!(
                "Leaf proof for consumed tx {} of block {}, discarding",
                tx_index, block_index
            );
            return Ok(());
        };

        if is_avm {
            tx_state.set_avm_proof(proof);
        } else {
            tx_state.set_tube_proof(proof);
        }

        if tx_state.ready() {
            let (job_type, inputs) =
                tx_state.base_rollup_type_and_inputs(&self.vk_registry, &self.config)?;
            debug!(
                "Tx {} of epoch {} block {} ready, enqueueing {}",
                tx_index, epoch, block_index, job_type
            );
            self.enqueue_job(epoch, job_type, job.position, &inputs)
                .await?;
        }
        Ok(())
    }

    /// A base rollup output becomes a leaf of the block tree; the tx state
    /// that produced it is no longer needed.
    async fn on_base_resolved(
        &self,
        ep: &mut EpochProvingState,
        job: &ProvingJob,
        out: RollupProofOutput,
    ) -> Result<()> {
        let epoch = ep.epoch;
        let block_index = job.position.block;
        let block = block_mut(ep, epoch, block_index)?;
        block.tree.set(0, job.position.index, out);
        block.txs[job.position.index as usize] = None;
        self.advance_block_tree(ep, block_index).await
    }

    async fn on_merge_resolved(
        &self,
        ep: &mut EpochProvingState,
        job: &ProvingJob,
        out: RollupProofOutput,
    ) -> Result<()> {
        let epoch = ep.epoch;
        let block_index = job.position.block;
        let block = block_mut(ep, epoch, block_index)?;
        block.tree.set(job.position.level, job.position.index, out);
        self.advance_block_tree(ep, block_index).await
    }

    /// Enqueue every newly eligible merge of a block tree; on completion,
    /// hand the block root upward.
    async fn advance_block_tree(
        &self,
        ep: &mut EpochProvingState,
        block_index: u32,
    ) -> Result<()> {
        let epoch = ep.epoch;
        let block = block_mut(ep, epoch, block_index)?;

        for merge in block.tree.eligible_merges() {
            let inputs = ProvingJobInputs::MergeRollup(MergeRollupInputs {
                left: merge.left,
                right: merge.right,
            });
            self.enqueue_job(
                epoch,
                ProvingJobType::MergeRollup,
                TreePosition::new(block_index, merge.level, merge.index),
                &inputs,
            )
            .await?;
        }

        if block.tree.is_complete() {
            let root = block
                .tree
                .root()
                .cloned()
                .expect("complete tree has a root");
            self.on_block_complete(ep, block_index, root).await?;
        }
        Ok(())
    }

    async fn on_block_complete(
        &self,
        ep: &mut EpochProvingState,
        block_index: u32,
        root: RollupProofOutput,
    ) -> Result<()> {
        let epoch = ep.epoch;
        info!("Block {} of epoch {} fully proven", block_index, epoch);

        if ep.num_blocks == 1 {
            // Single-block epoch: the block tree root is the epoch root.
            return self.complete_epoch(ep, root);
        }

        let block = block_mut(ep, epoch, block_index)?;
        let start_archive = block
            .start_state
            .get(&TreeKind::Archive)
            .copied()
            .unwrap_or_else(|| TreeSnapshot::new([0u8; 32], 0));
        let inputs = ProvingJobInputs::BlockRoot(BlockRootInputs {
            block_index: block.block_index,
            start_archive,
            inner: root,
        });
        self.enqueue_job(
            epoch,
            ProvingJobType::BlockRoot,
            TreePosition::new(block_index, 0, 0),
            &inputs,
        )
        .await
    }

    /// A block root proof becomes a leaf of the epoch-level tree.
    async fn on_block_root_resolved(
        &self,
        ep: &mut EpochProvingState,
        job: &ProvingJob,
        out: RollupProofOutput,
    ) -> Result<()> {
        let block_index = job.position.block;
        if let Some(tree) = ep.epoch_tree.as_mut() {
            tree.set(0, block_index as u64, out);
        } else {
            warn!(
                "Block root for single-block epoch {}, discarding",
                ep.epoch
            );
            return Ok(());
        }
        self.advance_epoch_tree(ep).await
    }

    async fn on_epoch_merge_resolved(
        &self,
        ep: &mut EpochProvingState,
        job: &ProvingJob,
        out: RollupProofOutput,
    ) -> Result<()> {
        if let Some(tree) = ep.epoch_tree.as_mut() {
            tree.set(job.position.level, job.position.index, out);
        }
        self.advance_epoch_tree(ep).await
    }

    /// Enqueue eligible epoch-level merges. Pairs of block roots combine
    /// through block-merge jobs; the topmost pairing is the epoch root job.
    async fn advance_epoch_tree(&self, ep: &mut EpochProvingState) -> Result<()> {
        let epoch = ep.epoch;
        let Some(tree) = ep.epoch_tree.as_ref() else {
            return Ok(());
        };

        let root_level = tree.root_level();
        let merges = tree.eligible_merges();
        for merge in merges {
            let (job_type, inputs) = if merge.level == root_level {
                (
                    ProvingJobType::EpochRoot,
                    ProvingJobInputs::EpochRoot(EpochRootInputs {
                        epoch,
                        left: merge.left,
                        right: merge.right,
                    }),
                )
            } else {
                (
                    ProvingJobType::BlockMerge,
                    ProvingJobInputs::BlockMerge(BlockMergeInputs {
                        left: merge.left,
                        right: merge.right,
                    }),
                )
            };
            self.enqueue_job(
                epoch,
                job_type,
                TreePosition::new(0, merge.level, merge.index),
                &inputs,
            )
            .await?;
        }

        let root = ep
            .epoch_tree
            .as_ref()
            .filter(|t| t.is_complete())
            .and_then(|t| t.root().cloned());
        if let Some(root) = root {
            self.complete_epoch(ep, root)?;
        }
        Ok(())
    }

    /// Deliver the root proof and release the epoch's state.
    fn complete_epoch(&self, ep: &mut EpochProvingState, root: RollupProofOutput) -> Result<()> {
        let epoch = ep.epoch;
        info!("Epoch {} fully proven, publishing root proof", epoch);
        self.sink
            .publish_root(epoch, &root)
            .map_err(|e| OrchestratorError::Publish(e.to_string()))?;
        ep.state = EpochState::Complete;
        ep.release();
        Ok(())
    }

    /// Save typed inputs and enqueue the job under its stable identity.
    /// Re-derivations collapse onto the existing queue record.
    async fn enqueue_job(
        &self,
        epoch: u64,
        job_type: ProvingJobType,
        position: TreePosition,
        inputs: &ProvingJobInputs,
    ) -> Result<()> {
        let inputs_uri = self
            .input_store
            .save_inputs(inputs)
            .map_err(|e| OrchestratorError::InputStore(e.to_string()))?;
        let job = ProvingJob {
            id: ProvingJobId::derive(epoch, job_type, position),
            job_type,
            epoch,
            position,
            inputs_uri,
        };
        self.queue.enqueue(job).await;
        Ok(())
    }
}

fn in_progress(
    epochs: &mut HashMap<u64, EpochProvingState>,
    epoch: u64,
) -> Result<&mut EpochProvingState> {
    let ep = epochs
        .get_mut(&epoch)
        .ok_or(OrchestratorError::UnknownEpoch(epoch))?;
    if !ep.is_in_progress() {
        return Err(OrchestratorError::EpochNotInProgress {
            epoch,
            state: ep.state.clone(),
        });
    }
    Ok(ep)
}

fn block_mut(
    ep: &mut EpochProvingState,
    epoch: u64,
    block_index: u32,
) -> Result<&mut BlockProvingState> {
    ep.blocks
        .get_mut(block_index as usize)
        .ok_or(OrchestratorError::UnknownBlock { epoch, block_index })
}
