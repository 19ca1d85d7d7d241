//! Circuit prover seam.
//!
//! The real circuits live outside this repository; a worker deployment
//! plugs them in behind [`CircuitProver`]. The [`MockProver`] ships for
//! swarm bring-up and load testing: it burns configurable wall-clock time
//! and returns deterministic payloads of the correct shape for the job
//! type.

use std::time::Duration;

use sha2::{Digest, Sha256};
use thiserror::Error;

use prover_types::{
    Proof, ProofAndVk, ProvingJob, ProvingJobResult, ProvingJobType, RollupProofOutput,
    VerificationKey,
};

/// Errors that can occur during proof generation
#[derive(Error, Debug)]
pub enum ProverError {
    #[error("Circuit execution failed: {0}")]
    Execution(String),

    #[error("Failed to fetch inputs at {0}")]
    InputsUnavailable(String),

    #[error("Job type {0} not supported by this worker")]
    Unsupported(ProvingJobType),
}

/// Computes a proof of the job's declared type. Implementations run on a
/// blocking thread; proving is CPU-bound.
pub trait CircuitProver: Send + Sync {
    fn prove(&self, job: &ProvingJob) -> Result<ProvingJobResult, ProverError>;
}

/// Deterministic fake prover: result bytes are derived from the job id, so
/// any two workers produce identical output for the same job.
pub struct MockProver {
    delay: Duration,
}

impl MockProver {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }
}

impl CircuitProver for MockProver {
    fn prove(&self, job: &ProvingJob) -> Result<ProvingJobResult, ProverError> {
        // Simulate proving time; callers run this on a blocking thread.
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut hasher = Sha256::new();
        hasher.update(b"mock-proof");
        hasher.update(job.id.as_str().as_bytes());
        let digest = hasher.finalize().to_vec();

        let proof = Proof(digest.clone());
        let vk = VerificationKey(digest[..8].to_vec());
        let output = RollupProofOutput {
            public_inputs: digest[..16].to_vec(),
            proof: proof.clone(),
            verification_key: vk.clone(),
        };
        let leaf = ProofAndVk {
            proof,
            verification_key: vk,
        };

        Ok(match job.job_type {
            ProvingJobType::Tube => ProvingJobResult::Tube(leaf),
            ProvingJobType::Avm => ProvingJobResult::Avm(leaf),
            ProvingJobType::PrivateBaseRollup => ProvingJobResult::PrivateBaseRollup(output),
            ProvingJobType::PublicBaseRollup => ProvingJobResult::PublicBaseRollup(output),
            ProvingJobType::MergeRollup => ProvingJobResult::MergeRollup(output),
            ProvingJobType::BlockRoot => ProvingJobResult::BlockRoot(output),
            ProvingJobType::BlockMerge => ProvingJobResult::BlockMerge(output),
            ProvingJobType::EpochRoot => ProvingJobResult::EpochRoot(output),
        })
    }
}
