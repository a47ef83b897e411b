//! Convenient re-exports for downstream crates.

pub use crate::coder::Coder;
pub use crate::config::{PipelineOptions, RunnerKind};
pub use crate::error::{Error, Result};
pub use crate::graph::{
    CmpOp, Collection, CollectionList, MapFn, Pipeline, Predicate, Transform, TransformNode,
};
pub use crate::hash::Hash256;
pub use crate::id::{CollectionId, NodeId, TransformId};
pub use crate::manifest::{ManifestId, RunManifest};
pub use crate::value::{Batch, Value};
pub use crate::window::WindowFn;
