//! YAML → `Pipeline` parser for DAG-shaped pipelines.
//!
//! Example:
//! ```yaml
//! name: merge-demo
//! options: { alias_single_input_flatten: true }
//! steps:
//!   - { id: low,  op: create, coder: i64, values: [1, 2, 3] }
//!   - { id: high, op: create, coder: i64, values: [11, 12] }
//!   - { id: all,  op: flatten, inputs: [low, high] }
//!   - { id: none, op: flatten, inputs: [], coder: utf8 }
//!   - { id: big,  op: filter, input: all, expr: "> 2" }
//!   - { id: out,  op: map, input: big, fn: add, arg: 100 }
//!   - { id: win,  op: window, input: all, size_ms: 60000 }
//! ```
//!
//! Steps may only reference steps defined above them.

use std::collections::BTreeMap;

use runnel_core::coder::Coder;
use runnel_core::config::{PipelineOptions, RunnerKind};
use runnel_core::graph::{CollectionList, MapFn, Pipeline, Predicate, Transform};
use runnel_core::id::CollectionId;
use runnel_core::value::Value;
use runnel_core::window::WindowFn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DslError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("step '{step}': unknown input '{input}'")]
    UnknownInput { step: String, input: String },

    #[error("duplicate step id '{0}'")]
    DuplicateStep(String),

    #[error("step '{step}': unknown coder '{coder}'")]
    UnknownCoder { step: String, coder: String },

    #[error("step '{step}': {reason}")]
    InvalidStep { step: String, reason: String },

    #[error(transparent)]
    Graph(#[from] runnel_core::error::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Option<PipelineConfig>,
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub id: String,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op")]
pub enum Step {
    #[serde(rename = "create")]
    Create {
        coder: String,
        values: Vec<serde_json::Value>,
    },

    #[serde(rename = "flatten")]
    Flatten {
        inputs: Vec<String>,
        #[serde(default)]
        coder: Option<String>,
    },

    #[serde(rename = "map")]
    Map {
        input: String,
        #[serde(rename = "fn")]
        func: String,
        #[serde(default)]
        arg: Option<i64>,
    },

    #[serde(rename = "filter")]
    Filter { input: String, expr: String },

    #[serde(rename = "window")]
    Window {
        input: String,
        /// Omit for the global window.
        #[serde(default)]
        size_ms: Option<u64>,
    },
}

/// Option overrides carried in the pipeline file; unset fields keep the
/// environment/default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub job_name: Option<String>,
    pub runner: Option<String>,
    pub alias_single_input_flatten: Option<bool>,
    pub validate_create_values: Option<bool>,
    pub max_batch_rows: Option<usize>,
}

impl PipelineConfig {
    pub fn apply_to(&self, opts: &mut PipelineOptions) -> Result<(), DslError> {
        if let Some(name) = &self.job_name {
            opts.job_name = name.clone();
        }
        if let Some(runner) = &self.runner {
            opts.runner = runner.parse::<RunnerKind>()?;
        }
        if let Some(v) = self.alias_single_input_flatten {
            opts.alias_single_input_flatten = v;
        }
        if let Some(v) = self.validate_create_values {
            opts.validate_create_values = v;
        }
        if let Some(v) = self.max_batch_rows {
            opts.max_batch_rows = v;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPipeline {
    pub pipeline: Pipeline,
    pub config: PipelineConfig,
    /// Step id → the collection it produced.
    pub steps: BTreeMap<String, CollectionId>,
}

impl ParsedPipeline {
    pub fn collection(&self, step: &str) -> Option<CollectionId> {
        self.steps.get(step).copied()
    }

    /// Step id for a collection, for printing results.
    pub fn step_of(&self, collection: CollectionId) -> Option<&str> {
        self.steps
            .iter()
            .find(|(_, c)| **c == collection)
            .map(|(s, _)| s.as_str())
    }
}

fn parse_coder(step: &str, s: &str) -> Result<Coder, DslError> {
    Coder::parse(s).ok_or_else(|| DslError::UnknownCoder {
        step: step.to_string(),
        coder: s.to_string(),
    })
}

fn parse_map_fn(step: &str, name: &str, arg: Option<i64>) -> Result<MapFn, DslError> {
    let need_arg = || {
        arg.ok_or_else(|| DslError::InvalidStep {
            step: step.to_string(),
            reason: format!("map fn '{name}' needs an integer 'arg'"),
        })
    };
    Ok(match name {
        "identity" => MapFn::Identity,
        "add" => MapFn::Add(need_arg()?),
        "mul" => MapFn::Mul(need_arg()?),
        "format" => MapFn::Format,
        "pair_with_one" => MapFn::PairWithOne,
        other => {
            return Err(DslError::InvalidStep {
                step: step.to_string(),
                reason: format!("unknown map fn '{other}'"),
            })
        }
    })
}

pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<ParsedPipeline, DslError> {
    let doc: PipelineDef = serde_yaml::from_str(yaml_src)?;
    let mut pipeline = Pipeline::new(doc.name.unwrap_or_else(|| "pipeline".to_string()));
    let mut steps: BTreeMap<String, CollectionId> = BTreeMap::new();

    for StepDef { id, step } in doc.steps {
        if steps.contains_key(&id) {
            return Err(DslError::DuplicateStep(id));
        }
        let resolve = |input: &str| {
            steps
                .get(input)
                .copied()
                .ok_or_else(|| DslError::UnknownInput {
                    step: id.clone(),
                    input: input.to_string(),
                })
        };

        let collection = match step {
            Step::Create { coder, values } => {
                let coder = parse_coder(&id, &coder)?;
                let values = values
                    .iter()
                    .map(|v| {
                        Value::from_json(v, &coder).ok_or_else(|| DslError::InvalidStep {
                            step: id.clone(),
                            reason: format!("value {v} is not a {coder}"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                pipeline.apply_named(
                    id.as_str(),
                    Transform::Create { values },
                    CollectionList::empty(),
                    coder,
                )?
            }
            Step::Flatten { inputs, coder } => {
                let list = inputs
                    .iter()
                    .map(|i| resolve(i))
                    .collect::<Result<CollectionList, _>>()?;
                let coder = coder.map(|c| parse_coder(&id, &c)).transpose()?;
                let coder = match (coder, list.iter().next()) {
                    (Some(c), _) => c,
                    (None, Some(first)) => pipeline.collection(first)?.coder.clone(),
                    (None, None) => return Err(runnel_core::error::Error::MissingCoder.into()),
                };
                pipeline.apply_named(
                    id.as_str(),
                    Transform::Flatten,
                    list,
                    coder,
                )?
            }
            Step::Map { input, func, arg } => {
                let input = resolve(&input)?;
                let func = parse_map_fn(&id, &func, arg)?;
                let in_coder = pipeline.collection(input)?.coder.clone();
                let coder = func.output_coder(&in_coder).ok_or_else(|| DslError::InvalidStep {
                    step: id.clone(),
                    reason: format!("map fn {func:?} does not apply to {in_coder}"),
                })?;
                pipeline.apply_named(
                    id.as_str(),
                    Transform::Map { func },
                    CollectionList::of(input),
                    coder,
                )?
            }
            Step::Filter { input, expr } => {
                let input = resolve(&input)?;
                let coder = pipeline.collection(input)?.coder.clone();
                let predicate =
                    Predicate::parse(&expr, &coder).ok_or_else(|| DslError::InvalidStep {
                        step: id.clone(),
                        reason: format!("cannot parse predicate '{expr}' for {coder}"),
                    })?;
                pipeline.apply_named(
                    id.as_str(),
                    Transform::Filter { predicate },
                    CollectionList::of(input),
                    coder,
                )?
            }
            Step::Window { input, size_ms } => {
                let input = resolve(&input)?;
                let window = match size_ms {
                    Some(size_ms) => WindowFn::Fixed { size_ms },
                    None => WindowFn::Global,
                };
                let coder = pipeline.collection(input)?.coder.clone();
                pipeline.apply_named(
                    id.as_str(),
                    Transform::WindowInto { window },
                    CollectionList::of(input),
                    coder,
                )?
            }
        };
        steps.insert(id, collection);
    }

    Ok(ParsedPipeline {
        pipeline,
        config: doc.options.unwrap_or_default(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"
name: demo
options:
  alias_single_input_flatten: false
steps:
  - { id: low, op: create, coder: i64, values: [1, 2, 3] }
  - { id: high, op: create, coder: i64, values: [11, 12] }
  - { id: all, op: flatten, inputs: [low, high] }
  - { id: none, op: flatten, inputs: [], coder: utf8 }
  - { id: big, op: filter, input: all, expr: "> 2" }
  - { id: out, op: map, input: big, fn: add, arg: 100 }
"#;

    #[test]
    fn parses_dag_with_flatten() {
        let parsed = parse_yaml_pipeline(DEMO).unwrap();
        assert_eq!(parsed.pipeline.name, "demo");
        assert_eq!(parsed.config.alias_single_input_flatten, Some(false));

        let all = parsed.collection("all").unwrap();
        let producer = parsed
            .pipeline
            .collection(all)
            .unwrap()
            .producer
            .unwrap();
        let t = parsed.pipeline.transform(producer).unwrap();
        assert_eq!(t.transform, Transform::Flatten);
        assert_eq!(t.label, "all");
        assert_eq!(
            t.inputs.as_slice(),
            &[
                parsed.collection("low").unwrap(),
                parsed.collection("high").unwrap()
            ]
        );

        let none = parsed.collection("none").unwrap();
        assert_eq!(parsed.pipeline.collection(none).unwrap().coder, Coder::Utf8);
        assert_eq!(parsed.step_of(none), Some("none"));

        let mut leaves = parsed.pipeline.leaves();
        leaves.sort();
        let mut expected = vec![none, parsed.collection("out").unwrap()];
        expected.sort();
        assert_eq!(leaves, expected);
    }

    #[test]
    fn forward_reference_is_rejected() {
        let src = r#"
steps:
  - { id: all, op: flatten, inputs: [later] }
  - { id: later, op: create, coder: i64, values: [1] }
"#;
        assert!(matches!(
            parse_yaml_pipeline(src),
            Err(DslError::UnknownInput { input, .. }) if input == "later"
        ));
    }

    #[test]
    fn empty_flatten_without_coder_is_rejected() {
        let src = "steps:\n  - { id: e, op: flatten, inputs: [] }\n";
        assert!(matches!(
            parse_yaml_pipeline(src),
            Err(DslError::Graph(runnel_core::error::Error::MissingCoder))
        ));
    }

    #[test]
    fn bad_literal_names_step() {
        let src = "steps:\n  - { id: c, op: create, coder: i64, values: [\"x\"] }\n";
        assert!(matches!(
            parse_yaml_pipeline(src),
            Err(DslError::InvalidStep { step, .. }) if step == "c"
        ));
    }

    #[test]
    fn config_overrides_options() {
        let mut opts = PipelineOptions::default();
        let cfg = PipelineConfig {
            job_name: Some("from-file".into()),
            max_batch_rows: Some(10),
            ..Default::default()
        };
        cfg.apply_to(&mut opts).unwrap();
        assert_eq!(opts.job_name, "from-file");
        assert_eq!(opts.max_batch_rows, 10);
        assert!(opts.alias_single_input_flatten);
    }
}
