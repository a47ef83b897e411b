//! Traversal driver: translate a whole pipeline, then run it.
//!
//! The driver asks the context for every leaf collection. Because the context
//! memoizes and always translates inputs first, the outer order does not
//! matter: every reachable collection ends up translated exactly once, in
//! dependency order.
//!
//! Cycles never reach an engine: a cycle reachable from a leaf fails while
//! walking that leaf, and one with no path to a leaf is caught by a final
//! sweep over produced collections.

use runnel_core::config::PipelineOptions;
use runnel_core::graph::Pipeline;
use tracing::{debug, info, info_span};

use crate::context::TranslationContext;
use crate::engine::ExecutionEngine;
use crate::error::{Result, RunError};
use crate::physical::PhysicalPlan;
use crate::registry::TranslatorRegistry;

/// Translate `pipeline` in a fresh context.
pub fn translate(
    pipeline: &Pipeline,
    registry: &TranslatorRegistry,
    options: &PipelineOptions,
) -> Result<PhysicalPlan> {
    translate_with(TranslationContext::new(pipeline, registry, options))
}

/// Finish a pass on a prepared context (e.g. one with bound sources).
pub fn translate_with(mut ctx: TranslationContext<'_>) -> Result<PhysicalPlan> {
    let pipeline = ctx.pipeline();
    let _span = info_span!("translate", pipeline = %pipeline.name).entered();

    let leaves = pipeline.leaves();
    for leaf in &leaves {
        ctx.get_or_translate(*leaf)?;
    }
    // A produced collection no leaf reaches can only feed a cycle (a cycle
    // has no leaf of its own). Sweep them so the cycle is reported.
    for c in pipeline.collections() {
        if c.producer.is_some() && ctx.lookup(c.id).is_none() {
            ctx.get_or_translate(c.id)?;
        }
    }
    let plan = ctx.into_plan(leaves);
    info!(
        nodes = plan.len(),
        collections = plan.collections.len(),
        outputs = plan.outputs.len(),
        "translation complete"
    );
    Ok(plan)
}

/// Translates pipelines and hands each plan to an engine.
pub struct PipelineRunner<E> {
    registry: TranslatorRegistry,
    options: PipelineOptions,
    engine: E,
}

impl<E: ExecutionEngine> PipelineRunner<E> {
    pub fn new(engine: E, options: PipelineOptions) -> Self {
        Self::with_registry(TranslatorRegistry::with_defaults(), engine, options)
    }

    pub fn with_registry(registry: TranslatorRegistry, engine: E, options: PipelineOptions) -> Self {
        Self {
            registry,
            options,
            engine,
        }
    }

    pub fn registry_mut(&mut self) -> &mut TranslatorRegistry {
        &mut self.registry
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Translate only.
    pub fn translate(&self, pipeline: &Pipeline) -> Result<PhysicalPlan> {
        translate(pipeline, &self.registry, &self.options)
    }

    /// Translate, then execute. Nothing reaches the engine if translation fails.
    pub fn run(&mut self, pipeline: &Pipeline) -> std::result::Result<E::Output, RunError<E::Error>> {
        let plan = self.translate(pipeline)?;
        debug!(engine = self.engine.name(), job = %plan.job_name, "handing plan to engine");
        self.engine.execute(&plan).map_err(RunError::Engine)
    }
}
