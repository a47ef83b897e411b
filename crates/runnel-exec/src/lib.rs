#![forbid(unsafe_code)]
//! runnel-exec: the local engine, deterministic plan/output hashing, and metrics.
//!
//! The local engine evaluates a `PhysicalPlan` node by node in arena order
//! (inputs always precede consumers), keeps every node's batch so fan-out
//! works, and emits a `RunManifest`.

pub mod metrics;
pub mod replay;
pub mod runtime;

pub use runtime::{run_local, ExecError, LocalEngine, RunResult};
