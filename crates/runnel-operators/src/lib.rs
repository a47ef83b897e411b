#![forbid(unsafe_code)]
//! runnel-operators: in-memory batch operators for the local engine.
//!
//! Design intent:
//! - Pure and synchronous; each operator turns fully materialized input
//!   batches into one output batch.
//! - Operators are instantiated by key from a JSON config (`registry`), the
//!   same shape the translator writes into physical node bindings.
//! - Operators never reorder across inputs in a way callers may rely on;
//!   `union` happens to concatenate, but that is not part of its contract.

pub mod registry;
pub mod traits;

pub mod filter;
pub mod map;
pub mod union;
pub mod values;

pub use registry::Registry;
pub use traits::{OpError, Operator};
