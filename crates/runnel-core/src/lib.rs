#![forbid(unsafe_code)]
//! runnel-core: shared vocabulary for the pipeline translation engine.
//!
//! - strongly-typed ids for collections, transforms, and physical nodes
//! - coders (element-type descriptors) and the values they describe
//! - windowing descriptors
//! - the logical `Pipeline` graph (arena of collections and transforms)
//! - pipeline options, plan hashing, and run manifests
//!
//! No translation or execution logic lives here.

pub mod coder;
pub mod config;
pub mod error;
pub mod graph;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod value;
pub mod window;

/// Version string stamped into run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
