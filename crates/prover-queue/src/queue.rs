//! The job queue state machine.
//!
//! All worker-facing calls funnel through one `Mutex`-guarded table, so job
//! transitions are atomic with respect to concurrent callers: two workers
//! cannot lease the same job, and a resolve racing a reclamation picks one
//! deterministic outcome (resolve wins until someone else holds a lease).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use prover_types::{
    JobCounts, LeaseId, ProvingJob, ProvingJobId, ProvingJobLease, ProvingJobResult,
};

use crate::error::{QueueError, Result};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a lease lives without a heartbeat.
    pub lease_duration: Duration,
    /// How many times a job may return to the pool after a failed attempt
    /// before going dead.
    pub max_retries: u32,
    /// How often the background reclaimer sweeps expired leases.
    pub reclaim_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(30),
            max_retries: 3,
            reclaim_interval: Duration::from_secs(1),
        }
    }
}

/// Events pushed to the orchestrator as jobs reach terminal states.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A job resolved successfully; carries the job descriptor so the
    /// consumer can route the result without a lookup.
    Resolved {
        job: ProvingJob,
        result: ProvingJobResult,
    },
    /// A job exhausted its retry budget.
    Dead { job: ProvingJob, reason: String },
}

/// Diagnostic view of one job's retry history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDiagnostics {
    pub retries: u32,
    pub last_reason: Option<String>,
}

/// Internal job lifecycle state.
#[derive(Debug, Clone)]
enum JobState {
    Pending,
    Leased { lease_id: LeaseId, deadline: Instant },
    Resolved,
    Dead,
    Cancelled,
}

#[derive(Debug)]
struct JobRecord {
    job: ProvingJob,
    state: JobState,
    /// Admission order, tie-broken after tree level during selection.
    seq: u64,
    retries: u32,
    result: Option<ProvingJobResult>,
    last_reason: Option<String>,
}

#[derive(Debug, Default)]
struct QueueInner {
    jobs: HashMap<ProvingJobId, JobRecord>,
    next_seq: u64,
}

/// The shared job queue. Clone the `Arc` freely; all state lives behind
/// one lock.
pub struct ProvingJobQueue {
    inner: Mutex<QueueInner>,
    config: QueueConfig,
    events: mpsc::UnboundedSender<QueueEvent>,
}

impl ProvingJobQueue {
    /// Create a queue and the event stream its consumer reads from.
    pub fn new(config: QueueConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<QueueEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(Self {
            inner: Mutex::new(QueueInner::default()),
            config,
            events,
        });
        (queue, rx)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add a job to the pool. Idempotent: re-deriving the same logical unit
    /// of work collapses onto the existing record and returns `false`.
    pub async fn enqueue(&self, job: ProvingJob) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.jobs.contains_key(&job.id) {
            debug!("Job {} already enqueued, ignoring resubmission", job.id);
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        debug!(
            "Enqueued {} job {} (epoch {}, seq {})",
            job.job_type, job.id, job.epoch, seq
        );
        inner.jobs.insert(
            job.id.clone(),
            JobRecord {
                job,
                state: JobState::Pending,
                seq,
                retries: 0,
                result: None,
                last_reason: None,
            },
        );
        true
    }

    /// Lease one pending job, or `None` if no eligible work exists.
    ///
    /// Selection prefers the lowest tree level (leaves before merges), then
    /// earliest admission, then job id for determinism.
    pub async fn get_proving_job(&self) -> Option<ProvingJobLease> {
        let mut inner = self.inner.lock().await;

        let best = inner
            .jobs
            .values()
            .filter(|r| matches!(r.state, JobState::Pending))
            .min_by(|a, b| {
                (a.job.job_type.tree_level(), a.seq, &a.job.id)
                    .cmp(&(b.job.job_type.tree_level(), b.seq, &b.job.id))
            })
            .map(|r| r.job.id.clone())?;

        let lease_id = LeaseId::fresh();
        let deadline = Instant::now() + self.config.lease_duration;
        let record = inner.jobs.get_mut(&best).expect("selected job exists");
        record.state = JobState::Leased { lease_id, deadline };

        debug!(
            "Leased {} job {} (lease {}, attempt {})",
            record.job.job_type,
            record.job.id,
            lease_id,
            record.retries + 1
        );

        Some(ProvingJobLease {
            job: record.job.clone(),
            lease_id,
            lease_timeout_ms: self.config.lease_duration.as_millis() as u64,
        })
    }

    /// Extend the lease deadline of a job still held by `lease_id`.
    /// Anything else (unknown job, stale lease, terminal state) is a no-op
    /// success so straggling workers never see spurious errors.
    pub async fn heartbeat(&self, job_id: &ProvingJobId, lease_id: LeaseId) {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.jobs.get_mut(job_id) else {
            return;
        };
        if let JobState::Leased {
            lease_id: held,
            deadline,
        } = &mut record.state
        {
            if *held == lease_id {
                *deadline = Instant::now() + self.config.lease_duration;
            }
        }
    }

    /// Deliver a result for a job.
    ///
    /// The first resolution wins and is pushed to the orchestrator.
    /// Duplicates (already resolved, or a stale lease after reassignment)
    /// are accepted and discarded. Unknown or dead jobs are errors, as is a
    /// result whose shape does not match the job's declared type.
    pub async fn resolve_proving_job(
        &self,
        job_id: &ProvingJobId,
        lease_id: LeaseId,
        result: ProvingJobResult,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::UnknownJob(job_id.clone()))?;

        if !result.matches(record.job.job_type) {
            return Err(QueueError::ResultTypeMismatch {
                job_id: job_id.clone(),
                expected: record.job.job_type,
                got: result.job_type(),
            });
        }

        match &record.state {
            JobState::Dead => Err(QueueError::JobDead {
                job_id: job_id.clone(),
                attempts: record.retries,
            }),
            JobState::Resolved => {
                debug!("Duplicate resolution for job {}, discarding", job_id);
                Ok(())
            }
            JobState::Cancelled => {
                debug!("Result for cancelled job {}, discarding", job_id);
                Ok(())
            }
            JobState::Leased { lease_id: held, .. } if *held != lease_id => {
                // The job was reclaimed and re-leased; the late result is a
                // harmless no-op and the live lease keeps going.
                debug!("Stale resolution for re-leased job {}, discarding", job_id);
                Ok(())
            }
            // A matching lease, or a reclaimed-but-not-yet-re-leased job:
            // the resolve wins.
            JobState::Leased { .. } | JobState::Pending => {
                record.state = JobState::Resolved;
                record.result = Some(result.clone());
                info!("Job {} resolved ({})", record.job.id, record.job.job_type);
                let _ = self.events.send(QueueEvent::Resolved {
                    job: record.job.clone(),
                    result,
                });
                Ok(())
            }
        }
    }

    /// Worker-reported failure. Returns the job to the pool or kills it
    /// once the retry budget is spent. Stale and duplicate rejects are
    /// no-op acks.
    pub async fn reject_proving_job(
        &self,
        job_id: &ProvingJobId,
        lease_id: LeaseId,
        reason: impl Into<String>,
    ) {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.jobs.get_mut(job_id) else {
            return;
        };
        match &record.state {
            JobState::Leased { lease_id: held, .. } if *held == lease_id => {
                Self::fail_attempt(record, reason.into(), self.config.max_retries, &self.events);
            }
            _ => {
                debug!("Stale reject for job {}, ignoring", job_id);
            }
        }
    }

    /// Sweep expired leases: each one is treated exactly as an implicit
    /// reject. Returns how many jobs were reclaimed.
    pub async fn reclaim_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let mut reclaimed = 0;
        for record in inner.jobs.values_mut() {
            if let JobState::Leased { deadline, .. } = &record.state {
                if *deadline <= now {
                    warn!(
                        "Lease expired for {} job {} (attempt {})",
                        record.job.job_type,
                        record.job.id,
                        record.retries + 1
                    );
                    Self::fail_attempt(
                        record,
                        "lease expired".to_string(),
                        self.config.max_retries,
                        &self.events,
                    );
                    reclaimed += 1;
                }
            }
        }
        reclaimed
    }

    /// Stop serving all non-terminal jobs of an epoch. In-flight results
    /// for cancelled jobs are later accepted and discarded.
    pub async fn cancel_epoch(&self, epoch: u64) -> usize {
        let mut inner = self.inner.lock().await;
        let mut cancelled = 0;
        for record in inner.jobs.values_mut() {
            if record.job.epoch == epoch
                && matches!(record.state, JobState::Pending | JobState::Leased { .. })
            {
                record.state = JobState::Cancelled;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!("Cancelled {} outstanding jobs for epoch {}", cancelled, epoch);
        }
        cancelled
    }

    /// Stored result of a resolved job. Results are kept keyed by job id so
    /// duplicate completions can be recognized after the fact.
    pub async fn get_result(&self, job_id: &ProvingJobId) -> Option<ProvingJobResult> {
        let inner = self.inner.lock().await;
        inner.jobs.get(job_id).and_then(|r| r.result.clone())
    }

    /// Retry count and last failure reason for a job, for postmortems.
    pub async fn job_diagnostics(&self, job_id: &ProvingJobId) -> Option<JobDiagnostics> {
        let inner = self.inner.lock().await;
        inner.jobs.get(job_id).map(|r| JobDiagnostics {
            retries: r.retries,
            last_reason: r.last_reason.clone(),
        })
    }

    /// Job counts for one epoch, for the run-status query.
    pub async fn counts_for_epoch(&self, epoch: u64) -> JobCounts {
        let inner = self.inner.lock().await;
        let mut counts = JobCounts::default();
        for record in inner.jobs.values() {
            if record.job.epoch != epoch {
                continue;
            }
            match record.state {
                JobState::Pending => counts.pending += 1,
                JobState::Leased { .. } => counts.leased += 1,
                JobState::Resolved => counts.resolved += 1,
                JobState::Dead => counts.dead += 1,
                JobState::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    fn fail_attempt(
        record: &mut JobRecord,
        reason: String,
        max_retries: u32,
        events: &mpsc::UnboundedSender<QueueEvent>,
    ) {
        record.retries += 1;
        record.last_reason = Some(reason.clone());
        if record.retries > max_retries {
            record.state = JobState::Dead;
            warn!(
                "Job {} dead after {} attempts: {}",
                record.job.id, record.retries, reason
            );
            let _ = events.send(QueueEvent::Dead {
                job: record.job.clone(),
                reason,
            });
        } else {
            record.state = JobState::Pending;
            debug!(
                "Job {} returned to pool (attempt {} of {}): {}",
                record.job.id,
                record.retries,
                max_retries + 1,
                reason
            );
        }
    }
}

/// Spawn the background reclamation loop. Runs until the queue is dropped.
pub fn spawn_reclaimer(queue: Arc<ProvingJobQueue>) -> tokio::task::JoinHandle<()> {
    let interval = queue.config().reclaim_interval;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let reclaimed = queue.reclaim_expired().await;
            if reclaimed > 0 {
                info!("Reclaimed {} expired leases", reclaimed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prover_types::{
        Proof, ProofAndVk, ProofUri, ProvingJobType, RollupProofOutput, TreePosition,
        VerificationKey,
    };

    fn job(epoch: u64, job_type: ProvingJobType, index: u64) -> ProvingJob {
        let position = TreePosition::new(0, 0, index);
        ProvingJob {
            id: ProvingJobId::derive(epoch, job_type, position),
            job_type,
            epoch,
            position,
            inputs_uri: ProofUri(format!("mem://{job_type}/{index}")),
        }
    }

    fn tube_result() -> ProvingJobResult {
        ProvingJobResult::Tube(ProofAndVk {
            proof: Proof(vec![1]),
            verification_key: VerificationKey(vec![2]),
        })
    }

    fn merge_result() -> ProvingJobResult {
        ProvingJobResult::MergeRollup(RollupProofOutput::padding())
    }

    fn test_queue() -> (Arc<ProvingJobQueue>, mpsc::UnboundedReceiver<QueueEvent>) {
        ProvingJobQueue::new(QueueConfig {
            lease_duration: Duration::from_secs(30),
            max_retries: 2,
            reclaim_interval: Duration::from_millis(100),
        })
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let (queue, _rx) = test_queue();
        assert!(queue.get_proving_job().await.is_none());
    }

    #[tokio::test]
    async fn test_pull_leases_each_job_once() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;

        let lease = queue.get_proving_job().await.expect("job available");
        assert_eq!(lease.job.job_type, ProvingJobType::Tube);
        // The same job must not be leased twice while the lease is live.
        assert!(queue.get_proving_job().await.is_none());
    }

    #[tokio::test]
    async fn test_selection_prefers_leaves_then_admission_order() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::MergeRollup, 0)).await;
        queue.enqueue(job(1, ProvingJobType::Tube, 1)).await;
        queue.enqueue(job(1, ProvingJobType::Tube, 2)).await;

        let first = queue.get_proving_job().await.unwrap();
        assert_eq!(first.job.job_type, ProvingJobType::Tube);
        assert_eq!(first.job.position.index, 1);

        let second = queue.get_proving_job().await.unwrap();
        assert_eq!(second.job.job_type, ProvingJobType::Tube);
        assert_eq!(second.job.position.index, 2);

        let third = queue.get_proving_job().await.unwrap();
        assert_eq!(third.job.job_type, ProvingJobType::MergeRollup);
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent_on_job_id() {
        let (queue, _rx) = test_queue();
        assert!(queue.enqueue(job(1, ProvingJobType::Tube, 0)).await);
        assert!(!queue.enqueue(job(1, ProvingJobType::Tube, 0)).await);

        queue.get_proving_job().await.unwrap();
        assert!(queue.get_proving_job().await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_emits_event_once() {
        let (queue, mut rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let lease = queue.get_proving_job().await.unwrap();

        queue
            .resolve_proving_job(&lease.job.id, lease.lease_id, tube_result())
            .await
            .unwrap();
        // Duplicate resolution is accepted and discarded.
        queue
            .resolve_proving_job(&lease.job.id, lease.lease_id, tube_result())
            .await
            .unwrap();

        let event = rx.try_recv().expect("one event");
        assert!(matches!(event, QueueEvent::Resolved { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_unknown_job_errors() {
        let (queue, _rx) = test_queue();
        let ghost = job(9, ProvingJobType::Tube, 0);
        let err = queue
            .resolve_proving_job(&ghost.id, LeaseId::fresh(), tube_result())
            .await
            .unwrap_err();
        assert_eq!(err, QueueError::UnknownJob(ghost.id));
    }

    #[tokio::test]
    async fn test_resolve_type_mismatch_errors() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let lease = queue.get_proving_job().await.unwrap();

        let err = queue
            .resolve_proving_job(&lease.job.id, lease.lease_id, merge_result())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::ResultTypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_reject_returns_job_to_pool() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let lease = queue.get_proving_job().await.unwrap();

        queue
            .reject_proving_job(&lease.job.id, lease.lease_id, "prover crashed")
            .await;

        let release = queue.get_proving_job().await.expect("job back in pool");
        assert_eq!(release.job.id, lease.job.id);
        assert_ne!(release.lease_id, lease.lease_id);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_goes_dead() {
        let (queue, mut rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;

        // max_retries = 2, so the third failed attempt is terminal.
        for _ in 0..3 {
            let lease = queue.get_proving_job().await.unwrap();
            queue
                .reject_proving_job(&lease.job.id, lease.lease_id, "boom")
                .await;
        }

        assert!(queue.get_proving_job().await.is_none());
        let event = rx.try_recv().unwrap();
        match event {
            QueueEvent::Dead { reason, .. } => assert_eq!(reason, "boom"),
            other => panic!("expected dead event, got {:?}", other),
        }

        // Results for dead jobs are refused.
        let dead = job(1, ProvingJobType::Tube, 0);
        let err = queue
            .resolve_proving_job(&dead.id, LeaseId::fresh(), tube_result())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::JobDead { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_extends_lease() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let lease = queue.get_proving_job().await.unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        queue.heartbeat(&lease.job.id, lease.lease_id).await;

        // Past the original deadline but inside the extended one.
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(queue.reclaim_expired().await, 0);

        // No further heartbeat: the extended lease eventually expires.
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(queue.reclaim_expired().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_heartbeat_is_noop() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let lease = queue.get_proving_job().await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.reclaim_expired().await, 1);
        let release = queue.get_proving_job().await.unwrap();

        // The first worker's heartbeat must not extend the new lease.
        queue.heartbeat(&lease.job.id, lease.lease_id).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.reclaim_expired().await, 1);

        let _ = release;
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_resolve_before_relase_wins() {
        let (queue, mut rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let lease = queue.get_proving_job().await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.reclaim_expired().await, 1);

        // Reclaimed but nobody re-leased yet: the straggler's result wins.
        queue
            .resolve_proving_job(&lease.job.id, lease.lease_id, tube_result())
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            QueueEvent::Resolved { .. }
        ));
        assert!(queue.get_proving_job().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_resolve_after_relase_is_discarded() {
        let (queue, mut rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        let first = queue.get_proving_job().await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.reclaim_expired().await, 1);
        let second = queue.get_proving_job().await.expect("re-leased");

        // The straggler's result is a harmless no-op; the live lease still
        // owns the job.
        queue
            .resolve_proving_job(&first.job.id, first.lease_id, tube_result())
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());

        queue
            .resolve_proving_job(&second.job.id, second.lease_id, tube_result())
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            QueueEvent::Resolved { .. }
        ));
    }

    #[tokio::test]
    async fn test_cancel_epoch_stops_serving_and_discards_results() {
        let (queue, mut rx) = test_queue();
        queue.enqueue(job(5, ProvingJobType::Tube, 0)).await;
        queue.enqueue(job(5, ProvingJobType::Tube, 1)).await;
        queue.enqueue(job(6, ProvingJobType::Tube, 0)).await;

        let in_flight = queue.get_proving_job().await.unwrap();
        assert_eq!(in_flight.job.epoch, 5);

        assert_eq!(queue.cancel_epoch(5).await, 2);

        // Only epoch 6 work is served now.
        let next = queue.get_proving_job().await.unwrap();
        assert_eq!(next.job.epoch, 6);

        // The in-flight result for the cancelled epoch is accepted and
        // discarded, with no event.
        queue
            .resolve_proving_job(&in_flight.job.id, in_flight.lease_id, tube_result())
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_result_stored_and_diagnostics_recorded() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;

        let lease = queue.get_proving_job().await.unwrap();
        assert_eq!(queue.get_result(&lease.job.id).await, None);
        queue
            .reject_proving_job(&lease.job.id, lease.lease_id, "oom")
            .await;

        let diagnostics = queue.job_diagnostics(&lease.job.id).await.unwrap();
        assert_eq!(diagnostics.retries, 1);
        assert_eq!(diagnostics.last_reason.as_deref(), Some("oom"));

        let lease = queue.get_proving_job().await.unwrap();
        queue
            .resolve_proving_job(&lease.job.id, lease.lease_id, tube_result())
            .await
            .unwrap();
        assert_eq!(queue.get_result(&lease.job.id).await, Some(tube_result()));
    }

    #[tokio::test]
    async fn test_counts_for_epoch() {
        let (queue, _rx) = test_queue();
        queue.enqueue(job(1, ProvingJobType::Tube, 0)).await;
        queue.enqueue(job(1, ProvingJobType::Tube, 1)).await;
        queue.enqueue(job(2, ProvingJobType::Tube, 0)).await;

        let lease = queue.get_proving_job().await.unwrap();
        queue
            .resolve_proving_job(&lease.job.id, lease.lease_id, tube_result())
            .await
            .unwrap();

        let counts = queue.counts_for_epoch(1).await;
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.resolved, 1);
        assert_eq!(counts.total(), 2);
    }
}
