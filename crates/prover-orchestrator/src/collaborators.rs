//! External collaborator seams.
//!
//! The orchestrator consumes three capabilities it does not own: saving
//! typed job inputs behind content-addressed pointers, reading current tree
//! snapshots, and handing off completed root proofs. Each is a trait with
//! an in-memory implementation used by tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tokio::sync::Notify;

use prover_types::{ProofUri, ProvingJobInputs, RollupProofOutput, TreeKind, TreeSnapshot};

/// Stores typed job inputs and hands back an opaque, content-addressed
/// pointer workers can fetch them by.
pub trait ProvingInputStore: Send + Sync {
    fn save_inputs(&self, inputs: &ProvingJobInputs) -> anyhow::Result<ProofUri>;
    fn load_inputs(&self, uri: &ProofUri) -> anyhow::Result<ProvingJobInputs>;
}

/// Supplies the current snapshot of each world-state tree.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self, kind: TreeKind) -> TreeSnapshot;

    fn all(&self) -> HashMap<TreeKind, TreeSnapshot> {
        TreeKind::ALL
            .iter()
            .map(|&kind| (kind, self.snapshot(kind)))
            .collect()
    }
}

/// Accepts the completed root proof of an epoch for publishing.
pub trait RootProofSink: Send + Sync {
    fn publish_root(&self, epoch: u64, root: &RollupProofOutput) -> anyhow::Result<()>;
}

/// In-memory content-addressed input store: uri = sha256 of the serialized
/// payload under a `mem://` scheme.
#[derive(Default)]
pub struct MemoryInputStore {
    entries: Mutex<HashMap<String, ProvingJobInputs>>,
}

impl MemoryInputStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProvingInputStore for MemoryInputStore {
    fn save_inputs(&self, inputs: &ProvingJobInputs) -> anyhow::Result<ProofUri> {
        let encoded = serde_json::to_vec(inputs)?;
        let uri = format!("mem://{}", hex::encode(Sha256::digest(&encoded)));
        self.entries
            .lock()
            .expect("input store lock poisoned")
            .insert(uri.clone(), inputs.clone());
        Ok(ProofUri(uri))
    }

    fn load_inputs(&self, uri: &ProofUri) -> anyhow::Result<ProvingJobInputs> {
        self.entries
            .lock()
            .expect("input store lock poisoned")
            .get(&uri.0)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no inputs stored at {uri}"))
    }
}

/// Snapshot provider over a fixed snapshot table.
pub struct StaticSnapshotProvider {
    snapshots: HashMap<TreeKind, TreeSnapshot>,
}

impl StaticSnapshotProvider {
    pub fn new(snapshots: HashMap<TreeKind, TreeSnapshot>) -> Self {
        Self { snapshots }
    }

    /// All-zero snapshots for every tree kind.
    pub fn empty() -> Self {
        Self {
            snapshots: TreeKind::ALL
                .iter()
                .map(|&kind| (kind, TreeSnapshot::new([0u8; 32], 0)))
                .collect(),
        }
    }
}

impl SnapshotProvider for StaticSnapshotProvider {
    fn snapshot(&self, kind: TreeKind) -> TreeSnapshot {
        self.snapshots
            .get(&kind)
            .copied()
            .unwrap_or_else(|| TreeSnapshot::new([0u8; 32], 0))
    }
}

/// Sink that collects published roots and wakes waiters; used by tests and
/// local runs.
#[derive(Default)]
pub struct CollectingRootSink {
    published: Mutex<Vec<(u64, RollupProofOutput)>>,
    notify: Notify,
}

impl CollectingRootSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(u64, RollupProofOutput)> {
        self.published.lock().expect("sink lock poisoned").clone()
    }

    pub fn root_for(&self, epoch: u64) -> Option<RollupProofOutput> {
        self.published
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .find(|(e, _)| *e == epoch)
            .map(|(_, root)| root.clone())
    }

    /// Wait until a root for `epoch` has been published.
    pub async fn wait_for_root(&self, epoch: u64) -> RollupProofOutput {
        loop {
            let notified = self.notify.notified();
            if let Some(root) = self.root_for(epoch) {
                return root;
            }
            notified.await;
        }
    }
}

impl RootProofSink for CollectingRootSink {
    fn publish_root(&self, epoch: u64, root: &RollupProofOutput) -> anyhow::Result<()> {
        self.published
            .lock()
            .expect("sink lock poisoned")
            .push((epoch, root.clone()));
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prover_types::{Proof, TubeInputs};

    #[test]
    fn test_input_store_roundtrip_and_content_addressing() {
        let store = MemoryInputStore::new();
        let inputs = ProvingJobInputs::Tube(TubeInputs {
            has_public_calls: false,
            client_ivc_proof: Proof(vec![1, 2, 3]),
        });

        let uri = store.save_inputs(&inputs).unwrap();
        assert!(uri.0.starts_with("mem://"));
        assert_eq!(store.load_inputs(&uri).unwrap(), inputs);

        // Same payload, same address.
        assert_eq!(store.save_inputs(&inputs).unwrap(), uri);
    }

    #[test]
    fn test_input_store_unknown_uri_errors() {
        let store = MemoryInputStore::new();
        assert!(store.load_inputs(&ProofUri("mem://missing".into())).is_err());
    }
}
