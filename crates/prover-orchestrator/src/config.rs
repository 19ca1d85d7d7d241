//! Orchestrator configuration.

/// Configuration for a proving orchestrator instance.
///
/// Lease duration and retry budget live in the queue's own
/// [`prover_queue::QueueConfig`]; this covers orchestrator-side policy.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// When a tube verification key is not found in the canonical key
    /// registry, fall back to the designated tube vk index instead of
    /// failing the epoch. Transitional behavior inherited from deployments
    /// whose tube keys are not yet registered; disable once they are.
    pub use_default_vk_index_on_miss: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            use_default_vk_index_on_miss: true,
        }
    }
}
