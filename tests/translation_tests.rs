//! Translation pass properties: memoization, dispatch, cycles, hand-off.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use runnel_core::coder::Coder;
use runnel_core::config::PipelineOptions;
use runnel_core::graph::{urn, CollectionList, MapFn, Pipeline, Transform};
use runnel_core::id::NodeId;
use runnel_core::value::Value;
use runnel_core::window::WindowFn;
use runnel_exec::LocalEngine;
use runnel_translate::error::{Result, RunError, TranslateError};
use runnel_translate::physical::{PhysicalPlan, PlanBuilder};
use runnel_translate::translators::FlattenTranslator;
use runnel_translate::{
    translate, ExecutionEngine, PipelineRunner, TransformTranslator, TranslationContext,
    TranslationRequest, TranslatorRegistry,
};

fn ints(range: std::ops::RangeInclusive<i64>) -> Vec<Value> {
    range.map(Value::I64).collect()
}

/// Delegates to the flatten translator and counts calls.
struct CountingFlatten {
    calls: Arc<AtomicUsize>,
}

impl TransformTranslator for CountingFlatten {
    fn name(&self) -> &'static str {
        "counting-flatten"
    }

    fn translate(&self, req: &TranslationRequest<'_>, plan: &mut PlanBuilder) -> Result<NodeId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FlattenTranslator.translate(req, plan)
    }
}

/// Records whether it was asked to execute anything.
#[derive(Default)]
struct RecordingEngine {
    plans: Vec<usize>,
}

#[derive(Debug, thiserror::Error)]
#[error("never raised")]
struct NeverFails;

impl ExecutionEngine for RecordingEngine {
    type Output = usize;
    type Error = NeverFails;

    fn name(&self) -> &'static str {
        "recording"
    }

    fn execute(&mut self, plan: &PhysicalPlan) -> std::result::Result<usize, NeverFails> {
        self.plans.push(plan.len());
        Ok(plan.len())
    }
}

#[test]
fn test_shared_merge_translated_once() {
    let mut p = Pipeline::new("shared");
    let a = p.create(ints(1..=3), Coder::Int64).unwrap();
    let b = p.create(ints(4..=6), Coder::Int64).unwrap();
    let m = p.flatten(&CollectionList::of(a).and(b), None).unwrap();
    // Three consumers of the merged collection.
    let x = p.map(m, MapFn::Add(1)).unwrap();
    let y = p.map(m, MapFn::Mul(2)).unwrap();
    let z = p.flatten(&CollectionList::of(m).and(x), None).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TranslatorRegistry::with_defaults();
    registry.register(
        urn::FLATTEN,
        CountingFlatten {
            calls: Arc::clone(&calls),
        },
    );
    let options = PipelineOptions::default();
    let mut ctx = TranslationContext::new(&p, &registry, &options);

    let first = ctx.get_or_translate(m).unwrap();
    for leaf in [y, z] {
        ctx.get_or_translate(leaf).unwrap();
    }
    assert_eq!(ctx.get_or_translate(m).unwrap(), first);

    // Two flattens in the graph (m and z), each translated once.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let producer = p.collection(m).unwrap().producer.unwrap();
    assert_eq!(ctx.translations(producer), 1);
}

#[test]
fn test_plan_is_dependency_ordered() {
    let mut p = Pipeline::new("order");
    let a = p.create(ints(1..=2), Coder::Int64).unwrap();
    let b = p.create(ints(3..=4), Coder::Int64).unwrap();
    let m1 = p.flatten(&CollectionList::of(a).and(b), None).unwrap();
    let m2 = p.flatten(&CollectionList::of(b).and(m1), None).unwrap();
    p.map(m2, MapFn::Identity).unwrap();

    let registry = TranslatorRegistry::with_defaults();
    let plan = translate(&p, &registry, &PipelineOptions::default()).unwrap();
    for node in &plan.nodes {
        for input in &node.inputs {
            assert!(input.index() < node.id.index(), "{input} after {}", node.id);
        }
    }
    assert_eq!(plan.len(), 5);
}

#[test]
fn test_unregistered_transform_is_unsupported() {
    let mut p = Pipeline::new("custom");
    let a = p.create(ints(1..=2), Coder::Int64).unwrap();
    p.apply(
        Transform::Custom {
            urn: "acme:transform:dedupe:v1".into(),
            payload: serde_json::json!({}),
        },
        CollectionList::of(a),
        Coder::Int64,
    )
    .unwrap();

    let registry = TranslatorRegistry::with_defaults();
    match translate(&p, &registry, &PipelineOptions::default()) {
        Err(TranslateError::UnsupportedTransform { urn }) => {
            assert_eq!(urn, "acme:transform:dedupe:v1")
        }
        other => panic!("expected UnsupportedTransform, got {other:?}"),
    }
}

#[test]
fn test_cycle_between_two_merges_is_reported() {
    // a = flatten(b), b = flatten(a), c = map(b): a -> b -> a.
    let mut p = Pipeline::new("cycle");
    let a = p.declare(Coder::Int64, WindowFn::Global);
    let b = p.flatten(&CollectionList::of(a), None).unwrap();
    p.produce_into(Transform::Flatten, CollectionList::of(b), a)
        .unwrap();
    let c = p.map(b, MapFn::Identity).unwrap();

    let registry = TranslatorRegistry::with_defaults();
    match translate(&p, &registry, &PipelineOptions::default()) {
        Err(TranslateError::CyclicGraph { collection, path }) => {
            assert_eq!(collection, b);
            assert_eq!(path, vec![c, b, a, b]);
        }
        other => panic!("expected CyclicGraph, got {other:?}"),
    }
}

#[test]
fn test_cycle_without_leaves_is_reported() {
    let mut p = Pipeline::new("closed-loop");
    let a = p.declare(Coder::Int64, WindowFn::Global);
    let b = p.flatten(&CollectionList::of(a), None).unwrap();
    p.produce_into(Transform::Flatten, CollectionList::of(b), a)
        .unwrap();
    assert!(p.leaves().is_empty());

    let registry = TranslatorRegistry::with_defaults();
    assert!(matches!(
        translate(&p, &registry, &PipelineOptions::default()),
        Err(TranslateError::CyclicGraph { .. })
    ));
}

#[test]
fn test_deep_chain_does_not_overflow() {
    let mut p = Pipeline::new("deep");
    let mut tip = p.create(ints(1..=1), Coder::Int64).unwrap();
    for _ in 0..20_000 {
        tip = p.flatten(&CollectionList::of(tip), None).unwrap();
    }

    let registry = TranslatorRegistry::with_defaults();
    let plan = translate(&p, &registry, &PipelineOptions::default()).unwrap();
    // Every one-input flatten aliases the create node.
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.collections[&tip], NodeId::new(0));
}

#[test]
fn test_engine_not_called_when_translation_fails() {
    let mut p = Pipeline::new("bad");
    let a = p.create(ints(1..=2), Coder::Int64).unwrap();
    let s = p
        .create(vec![Value::Str("x".into())], Coder::Utf8)
        .unwrap();
    p.flatten(&CollectionList::of(a).and(s), None).unwrap();

    let mut runner = PipelineRunner::new(RecordingEngine::default(), PipelineOptions::default());
    assert!(matches!(
        runner.run(&p),
        Err(RunError::Translate(TranslateError::IncompatibleElementType { .. }))
    ));
    assert!(runner.engine().plans.is_empty());

    let mut ok = Pipeline::new("good");
    ok.create(ints(1..=2), Coder::Int64).unwrap();
    assert_eq!(runner.run(&ok).unwrap(), 1);
    assert_eq!(runner.engine().plans, vec![1]);
}

#[test]
fn test_same_pipeline_hashes_the_same() {
    let build = || {
        let mut p = Pipeline::new("stable");
        let a = p.create(ints(1..=5), Coder::Int64).unwrap();
        let b = p.create(ints(6..=9), Coder::Int64).unwrap();
        p.flatten(&CollectionList::of(a).and(b), None).unwrap();
        p
    };
    let options = PipelineOptions::default();
    let mut first = PipelineRunner::new(LocalEngine::new(options.clone()), options.clone());
    let mut second = PipelineRunner::new(LocalEngine::new(options.clone()), options);
    let r1 = first.run(&build()).unwrap();
    let r2 = second.run(&build()).unwrap();
    assert_eq!(r1.manifest.plan_hash, r2.manifest.plan_hash);
    assert_eq!(r1.manifest.outputs_digest, r2.manifest.outputs_digest);
    assert_ne!(r1.manifest.id, r2.manifest.id);
}
