//! Operator trait + common interfaces.
//!
//! The exec runtime instantiates one operator per physical node and calls
//! `eval` once, in plan order, with the batches of the node's inputs.

use runnel_core::coder::Coder;
use runnel_core::value::Batch;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Trait that all operators must implement.
///
/// Invariants:
/// - `eval` must be deterministic given the same inputs.
/// - The output batch carries `output_coder`, the coder of the node.
pub trait Operator: Send + Sync + 'static {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Evaluate the node. `inputs` are in the node's declared input order; a
    /// node that lists the same input twice sees that batch twice.
    fn eval(&self, inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError>;
}

/// The one input of a unary operator.
pub(crate) fn single<'a>(name: &str, inputs: &[&'a Batch]) -> Result<&'a Batch, OpError> {
    match inputs {
        [only] => Ok(only),
        other => Err(OpError::Plan(format!(
            "{name} expects one input, got {}",
            other.len()
        ))),
    }
}
