//! Runtime: execute a PhysicalPlan in arena order and emit a RunManifest.
//!
//! Behavior:
//! - Instantiates operators via `runnel-operators::registry`.
//! - Special-cases the `memory` key: an external source reading a batch
//!   registered on the engine with [`LocalEngine::with_source`].
//! - Walks `plan.nodes` sequentially; every input precedes its consumers.
//! - Keeps every node's batch until the end, so a node consumed several
//!   times (or listed twice by one union) is computed once.
//! - Enforces `max_batch_rows` on every materialized batch.
//! - Emits a `RunManifest` with a stable plan hash and an order-insensitive
//!   digest of the outputs.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, info_span, trace};

use runnel_core::coder::Coder;
use runnel_core::config::PipelineOptions;
use runnel_core::graph::Pipeline;
use runnel_core::id::{CollectionId, NodeId};
use runnel_core::manifest::RunManifest;
use runnel_core::value::Batch;

use runnel_operators::registry::Registry;
use runnel_operators::traits::{OpError, Operator};

use runnel_translate::engine::ExecutionEngine;
use runnel_translate::error::RunError;
use runnel_translate::physical::PhysicalPlan;
use runnel_translate::traversal::PipelineRunner;

use crate::metrics::emit_span;
use crate::replay::{hash_outputs, hash_plan};

/// Operator key for in-memory external sources. Config: `{"key": "<name>"}`.
pub const MEMORY_SOURCE: &str = "memory";

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("operator registry: {0}")]
    Registry(String),
    #[error("operator exec: {0}")]
    Operator(String),
    #[error("invalid plan: {0}")]
    Invalid(String),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("node {node} produced {rows} rows, over the limit of {limit}")]
    BatchLimit {
        node: NodeId,
        rows: usize,
        limit: usize,
    },
}

/// Everything a local run produced.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub manifest: RunManifest,
    /// One batch per physical node, indexed by `NodeId`.
    pub batches: Vec<Batch>,
    /// Logical collection → node, copied from the plan.
    pub collections: BTreeMap<CollectionId, NodeId>,
    pub outputs: Vec<CollectionId>,
}

impl RunResult {
    /// Materialized contents of a translated collection.
    pub fn collection(&self, id: CollectionId) -> Option<&Batch> {
        self.collections
            .get(&id)
            .and_then(|node| self.batches.get(node.index()))
    }

    /// Terminal collections with their contents, in output order.
    pub fn outputs(&self) -> impl Iterator<Item = (CollectionId, &Batch)> + '_ {
        self.outputs
            .iter()
            .filter_map(|c| self.collection(*c).map(|b| (*c, b)))
    }
}

/// Single-threaded engine that materializes every node in memory.
pub struct LocalEngine {
    options: PipelineOptions,
    registry: Registry,
    memory_store: HashMap<String, Batch>,
}

impl LocalEngine {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            registry: Registry::new(),
            memory_store: HashMap::new(),
        }
    }

    /// Register data for `memory` source nodes bound under `key`.
    pub fn with_source(mut self, key: impl Into<String>, batch: Batch) -> Self {
        self.memory_store.insert(key.into(), batch);
        self
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn instantiate(
        &self,
        key: &str,
        config: &serde_json::Value,
    ) -> Result<Box<dyn Operator>, ExecError> {
        if key == MEMORY_SOURCE {
            let name = config
                .get("key")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ExecError::Invalid("memory source without 'key'".into()))?;
            let batch = self.memory_store.get(name).cloned().ok_or_else(|| {
                ExecError::Invalid(format!("no data registered for memory source '{name}'"))
            })?;
            return Ok(Box::new(SourceOp { batch }));
        }
        self.registry
            .make(key, config)
            .ok_or_else(|| ExecError::Registry(format!("unknown operator key '{key}'")))?
            .map_err(|e| ExecError::Operator(format!("{key}: {e}")))
    }

    /// Execute a translated plan and return every node's batch plus a manifest.
    pub fn run_plan(&self, plan: &PhysicalPlan) -> Result<RunResult, ExecError> {
        let _span = info_span!("execute", job = %plan.job_name, nodes = plan.len()).entered();

        let plan_hash = hash_plan(plan)?;
        let mut manifest = RunManifest::new(plan.job_name.clone(), plan_hash, now_millis());

        let limit = self.options.max_batch_rows;
        let mut batches: Vec<Batch> = Vec::with_capacity(plan.len());
        for (idx, node) in plan.nodes.iter().enumerate() {
            if node.id.index() != idx {
                return Err(ExecError::Invalid(format!(
                    "node {} stored at position {idx}",
                    node.id
                )));
            }

            // Gather input batches in declared order.
            let mut inputs: Vec<&Batch> = Vec::with_capacity(node.inputs.len());
            for dep in &node.inputs {
                let batch = batches.get(dep.index()).ok_or_else(|| {
                    ExecError::Invalid(format!("node {} reads {dep} before it exists", node.id))
                })?;
                inputs.push(batch);
            }

            let op = self.instantiate(&node.binding.key, &node.binding.config)?;
            let out = op
                .eval(&inputs, &node.coder)
                .map_err(|e| ExecError::Operator(format!("{} ({}): {e}", node.label, op.name())))?;

            if out.len() > limit {
                return Err(ExecError::BatchLimit {
                    node: node.id,
                    rows: out.len(),
                    limit,
                });
            }
            trace!(node = %node.id, op = op.name(), inputs = inputs.len(), rows = out.len(), "executed node");
            batches.push(out);
        }

        let outputs = plan
            .outputs
            .iter()
            .map(|c| {
                plan.collections
                    .get(c)
                    .and_then(|n| batches.get(n.index()))
                    .ok_or_else(|| ExecError::Invalid(format!("output {c} has no node")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let outputs_digest = hash_outputs(outputs.iter().copied())?;
        let output_rows: usize = outputs.iter().map(|b| b.len()).sum();

        manifest = manifest.finish(now_millis(), batches.len(), outputs_digest);
        info!(
            nodes = manifest.nodes_executed,
            output_rows,
            plan_hash = %manifest.plan_hash.short(),
            "run complete"
        );
        emit_span(
            "run",
            &[
                ("job", manifest.job_name.clone()),
                ("duration_ms", manifest.duration_ms().to_string()),
                ("output_rows", output_rows.to_string()),
            ],
        );

        Ok(RunResult {
            manifest,
            batches,
            collections: plan.collections.clone(),
            outputs: plan.outputs.clone(),
        })
    }
}

impl ExecutionEngine for LocalEngine {
    type Output = RunResult;
    type Error = ExecError;

    fn name(&self) -> &'static str {
        "local"
    }

    fn execute(&mut self, plan: &PhysicalPlan) -> Result<RunResult, ExecError> {
        self.run_plan(plan)
    }
}

/// Translate `pipeline` with the default translators and run it locally.
pub fn run_local(
    pipeline: &Pipeline,
    options: PipelineOptions,
) -> Result<RunResult, RunError<ExecError>> {
    debug!(pipeline = %pipeline.name, runner = %options.runner, "starting local run");
    let mut runner = PipelineRunner::new(LocalEngine::new(options.clone()), options);
    runner.run(pipeline)
}

// --- helpers ---

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// External source backed by the engine's memory store.
struct SourceOp {
    batch: Batch,
}

impl Operator for SourceOp {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn eval(&self, _inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError> {
        if self.batch.coder != *output_coder {
            return Err(OpError::Exec(format!(
                "source data is {} but the collection is {output_coder}",
                self.batch.coder
            )));
        }
        Ok(self.batch.clone())
    }
}
