//! Translation context: the per-pass side table from logical collections to
//! physical nodes.
//!
//! Invariants:
//! - a collection maps to at most one node for the lifetime of the context;
//!   a second request returns the cached `NodeId`
//! - each transform is handed to its translator at most once per pass, no
//!   matter how many consumers its output has
//! - inputs are translated before the transform that consumes them
//!
//! The walk uses an explicit stack instead of recursion. Collections on the
//! active path are tracked so a cycle fails fast with `CyclicGraph`.
//!
//! A context belongs to exactly one pass. It is not shared across threads or
//! across pipelines; build a new one per `translate` call.

use std::collections::{HashMap, HashSet};

use runnel_core::config::PipelineOptions;
use runnel_core::error::Error as GraphError;
use runnel_core::graph::Pipeline;
use runnel_core::id::{CollectionId, NodeId, TransformId};
use tracing::{debug, trace};

use crate::error::{Result, TranslateError};
use crate::physical::{OperatorBinding, PhysicalPlan, PlanBuilder};
use crate::registry::{TranslatedInput, TranslationRequest, TranslatorRegistry};

enum Visit {
    /// Make sure the producer's inputs are scheduled, then come back.
    Enter(CollectionId),
    /// All inputs are translated; translate the producer.
    Exit(CollectionId),
}

pub struct TranslationContext<'a> {
    pipeline: &'a Pipeline,
    registry: &'a TranslatorRegistry,
    options: &'a PipelineOptions,
    plan: PlanBuilder,
    translated: HashMap<CollectionId, NodeId>,
    translations: HashMap<TransformId, usize>,
}

impl<'a> TranslationContext<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        registry: &'a TranslatorRegistry,
        options: &'a PipelineOptions,
    ) -> Self {
        Self {
            pipeline,
            registry,
            options,
            plan: PlanBuilder::new(),
            translated: HashMap::new(),
            translations: HashMap::new(),
        }
    }

    pub fn pipeline(&self) -> &'a Pipeline {
        self.pipeline
    }

    pub fn options(&self) -> &'a PipelineOptions {
        self.options
    }

    /// Bind a producer-less (declared) collection to an externally supplied
    /// source operator. Must happen before anything consuming it is translated.
    pub fn bind_source(
        &mut self,
        collection: CollectionId,
        binding: OperatorBinding,
    ) -> Result<NodeId> {
        let c = self.pipeline.collection(collection)?;
        if let Some(producer) = c.producer {
            return Err(GraphError::AlreadyProduced {
                collection,
                producer,
            }
            .into());
        }
        if let Some(existing) = self.translated.get(&collection) {
            return Err(TranslateError::Invariant(format!(
                "{collection} is already bound to node {existing}"
            )));
        }
        let label = format!("Source{}", collection.get());
        let node = self
            .plan
            .add(label, binding, Vec::new(), c.coder.clone(), c.window)?;
        self.translated.insert(collection, node);
        debug!(%collection, %node, "bound external source");
        Ok(node)
    }

    /// Cached node for `collection`, if it has been translated.
    pub fn lookup(&self, collection: CollectionId) -> Option<NodeId> {
        self.translated.get(&collection).copied()
    }

    /// How many times `transform` was handed to a translator in this pass (0 or 1).
    pub fn translations(&self, transform: TransformId) -> usize {
        self.translations.get(&transform).copied().unwrap_or(0)
    }

    /// Number of collections with a physical node.
    pub fn translated_len(&self) -> usize {
        self.translated.len()
    }

    pub fn plan(&self) -> &PlanBuilder {
        &self.plan
    }

    /// Return the node for `target`, translating it and any untranslated
    /// ancestors first.
    pub fn get_or_translate(&mut self, target: CollectionId) -> Result<NodeId> {
        if let Some(node) = self.lookup(target) {
            trace!(collection = %target, %node, "translation cache hit");
            return Ok(node);
        }

        let mut stack = vec![Visit::Enter(target)];
        let mut path: Vec<CollectionId> = Vec::new();
        let mut on_path: HashSet<CollectionId> = HashSet::new();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(c) => {
                    if self.translated.contains_key(&c) {
                        continue;
                    }
                    if on_path.contains(&c) {
                        let mut cycle = path.clone();
                        cycle.push(c);
                        return Err(TranslateError::CyclicGraph {
                            collection: c,
                            path: cycle,
                        });
                    }
                    let producer = self
                        .pipeline
                        .collection(c)?
                        .producer
                        .ok_or(TranslateError::UntranslatableGraph { collection: c })?;
                    let transform = self.pipeline.transform(producer)?;

                    path.push(c);
                    on_path.insert(c);
                    stack.push(Visit::Exit(c));
                    // Reverse so inputs are translated in declared order.
                    for input in transform.inputs.as_slice().iter().rev() {
                        if !self.translated.contains_key(input) {
                            stack.push(Visit::Enter(*input));
                        }
                    }
                }
                Visit::Exit(c) => {
                    path.pop();
                    on_path.remove(&c);
                    self.translate_producer(c)?;
                }
            }
        }

        self.lookup(target).ok_or_else(|| {
            TranslateError::Invariant(format!("{target} left untranslated after walk"))
        })
    }

    /// Translate the producer of `collection`; all of its inputs are done.
    fn translate_producer(&mut self, collection: CollectionId) -> Result<()> {
        let pipeline = self.pipeline;
        let output = pipeline.collection(collection)?;
        let producer = output
            .producer
            .ok_or(TranslateError::UntranslatableGraph { collection })?;
        let transform = pipeline.transform(producer)?;

        let mut inputs = Vec::with_capacity(transform.inputs.len());
        for id in transform.inputs.iter() {
            let node = self.lookup(id).ok_or_else(|| {
                TranslateError::Invariant(format!(
                    "input {id} of {} not translated before its consumer",
                    transform.label
                ))
            })?;
            inputs.push(TranslatedInput {
                collection: pipeline.collection(id)?,
                node,
            });
        }

        let registry = self.registry;
        let translator = registry.translator_for(transform.transform.urn())?;
        let req = TranslationRequest {
            transform,
            inputs: &inputs,
            output,
            options: self.options,
        };
        let node = translator.translate(&req, &mut self.plan)?;
        if !self.plan.contains(node) {
            return Err(TranslateError::Invariant(format!(
                "translator '{}' returned unknown node {node}",
                translator.name()
            )));
        }

        self.translated.insert(collection, node);
        *self.translations.entry(producer).or_default() += 1;
        debug!(
            urn = transform.transform.urn(),
            label = %transform.label,
            %collection,
            %node,
            inputs = inputs.len(),
            "translated transform"
        );
        Ok(())
    }

    /// Hand the nodes and the collection table to a `PhysicalPlan`.
    pub fn into_plan(self, outputs: Vec<CollectionId>) -> PhysicalPlan {
        let windows = self
            .translated
            .keys()
            .filter_map(|c| Some((*c, self.pipeline.collection(*c).ok()?.window)))
            .collect();
        PhysicalPlan {
            job_name: self.options.job_name.clone(),
            nodes: self.plan.into_nodes(),
            collections: self.translated.into_iter().collect(),
            windows,
            outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_core::coder::Coder;
    use runnel_core::graph::{CollectionList, Transform};
    use runnel_core::value::Value;
    use runnel_core::window::WindowFn;

    use crate::physical::op;

    fn ints(n: i64) -> Vec<Value> {
        (1..=n).map(Value::I64).collect()
    }

    #[test]
    fn repeated_requests_return_same_node() {
        let mut p = Pipeline::new("t");
        let a = p.create(ints(3), Coder::Int64).unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);

        let first = ctx.get_or_translate(a).unwrap();
        let second = ctx.get_or_translate(a).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.plan().len(), 1);
    }

    #[test]
    fn inputs_translate_in_declared_order() {
        let mut p = Pipeline::new("t");
        let a = p.create(ints(1), Coder::Int64).unwrap();
        let b = p.create(ints(2), Coder::Int64).unwrap();
        let m = p.flatten(&CollectionList::of(b).and(a), None).unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);

        ctx.get_or_translate(m).unwrap();
        assert_eq!(ctx.lookup(b), Some(NodeId::new(0)));
        assert_eq!(ctx.lookup(a), Some(NodeId::new(1)));
        assert_eq!(ctx.lookup(m), Some(NodeId::new(2)));
    }

    #[test]
    fn declared_collection_without_source_is_untranslatable() {
        let mut p = Pipeline::new("t");
        let slot = p.declare(Coder::Int64, WindowFn::Global);
        let m = p.flatten(&CollectionList::of(slot), None).unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);

        assert!(matches!(
            ctx.get_or_translate(m),
            Err(TranslateError::UntranslatableGraph { collection }) if collection == slot
        ));
    }

    #[test]
    fn bound_source_satisfies_declared_collection() {
        let mut p = Pipeline::new("t");
        let slot = p.declare(Coder::Int64, WindowFn::Global);
        let other = p.create(ints(2), Coder::Int64).unwrap();
        let m = p.flatten(&CollectionList::of(slot).and(other), None).unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);

        let src = ctx
            .bind_source(slot, OperatorBinding::bare(op::EMPTY))
            .unwrap();
        let node = ctx.get_or_translate(m).unwrap();
        let plan = ctx.into_plan(vec![m]);
        assert_eq!(plan.node(node).unwrap().inputs[0], src);
    }

    #[test]
    fn bind_source_rejects_produced_collections() {
        let mut p = Pipeline::new("t");
        let a = p.create(ints(1), Coder::Int64).unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);
        assert!(matches!(
            ctx.bind_source(a, OperatorBinding::bare(op::EMPTY)),
            Err(TranslateError::Graph(GraphError::AlreadyProduced { .. }))
        ));
    }

    #[test]
    fn self_loop_is_cyclic() {
        let mut p = Pipeline::new("t");
        let slot = p.declare(Coder::Int64, WindowFn::Global);
        p.produce_into(Transform::Flatten, CollectionList::of(slot), slot)
            .unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);
        match ctx.get_or_translate(slot) {
            Err(TranslateError::CyclicGraph { collection, path }) => {
                assert_eq!(collection, slot);
                assert_eq!(path, vec![slot, slot]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn failed_translation_leaves_no_mapping() {
        let mut p = Pipeline::new("t");
        let a = p.create(ints(1), Coder::Int64).unwrap();
        let b = p
            .create(vec![Value::Str("x".into())], Coder::Utf8)
            .unwrap();
        let m = p
            .flatten(&CollectionList::of(a).and(b), Some(Coder::Int64))
            .unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions::default();
        let mut ctx = TranslationContext::new(&p, &registry, &options);

        assert!(matches!(
            ctx.get_or_translate(m),
            Err(TranslateError::IncompatibleElementType { .. })
        ));
        assert_eq!(ctx.lookup(m), None);
        assert_eq!(ctx.translated_len(), 2);
    }
}
