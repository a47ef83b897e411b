#![forbid(unsafe_code)]
//! runnel-translate: logical `Pipeline` → `PhysicalPlan`, then hand-off to an engine.
//!
//! Design:
//! - `context::TranslationContext` memoizes collection → physical node for one
//!   pass and walks producers depth-first, detecting cycles on the active path.
//! - `registry::TranslatorRegistry` dispatches by transform URN to a
//!   `TransformTranslator`; `translators` holds the built-in ones (flatten is
//!   the multi-input reference implementation).
//! - `traversal` drives a pass from the pipeline's leaves and runs the result
//!   on any `engine::ExecutionEngine`.
//! - Physical nodes bind operator *keys* plus a JSON config; engines
//!   instantiate operators from those (see `runnel-operators`).
//!
//! Translation is synchronous and never touches element data.

pub mod context;
pub mod cost;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod physical;
pub mod registry;
pub mod translators;
pub mod traversal;

pub use context::TranslationContext;
pub use cost::{estimate_rows, PlanEstimate};
pub use dsl::yaml::{parse_yaml_pipeline, DslError, ParsedPipeline, PipelineConfig};
pub use engine::ExecutionEngine;
pub use error::{RunError, TranslateError};
pub use physical::{OperatorBinding, PhysicalNode, PhysicalPlan, PlanBuilder};
pub use registry::{TransformTranslator, TranslatedInput, TranslationRequest, TranslatorRegistry};
pub use traversal::{translate, translate_with, PipelineRunner};
