//! Run manifest emitted by an engine after it accepts and executes a plan.
//!
//! Two runs of the same pipeline with the same options produce the same
//! `plan_hash`; the output digest is order-insensitive, so it is stable even
//! though merged outputs carry no ordering guarantee.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    pub job_name: String,

    /// Stable hash of the physical plan (nodes, bindings, collection table).
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Number of physical nodes evaluated.
    pub nodes_executed: usize,

    /// Digest over the sorted contents of every plan output.
    pub outputs_digest: Option<Hash256>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(job_name: impl Into<String>, plan_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            job_name: job_name.into(),
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            nodes_executed: 0,
            outputs_digest: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(
        mut self,
        finished_ms: u64,
        nodes_executed: usize,
        outputs_digest: Option<Hash256>,
    ) -> Self {
        self.finished_ms = finished_ms;
        self.nodes_executed = nodes_executed;
        self.outputs_digest = outputs_digest;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}
