//! Leaf operators: literal values and the typed empty batch.

use runnel_core::coder::Coder;
use runnel_core::value::{Batch, Value};

use crate::traits::{OpError, Operator};

/// Emits a fixed list of values.
#[derive(Debug, Clone, Default)]
pub struct Values {
    pub values: Vec<Value>,
}

impl Operator for Values {
    fn name(&self) -> &'static str {
        "values"
    }

    fn eval(&self, inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError> {
        if !inputs.is_empty() {
            return Err(OpError::Plan(format!(
                "values takes no inputs, got {}",
                inputs.len()
            )));
        }
        if let Some(bad) = self.values.iter().find(|v| !output_coder.accepts(v)) {
            return Err(OpError::Exec(format!(
                "literal {bad:?} does not fit coder {output_coder}"
            )));
        }
        Ok(Batch::new(output_coder.clone(), self.values.clone()))
    }
}

/// Emits nothing, typed by the node's coder. Also stands in for external
/// sources bound without data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl Operator for Empty {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn eval(&self, _inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError> {
        Ok(Batch::empty(output_coder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_checks_coder() {
        let op = Values {
            values: vec![Value::I64(1), Value::Str("x".into())],
        };
        assert!(op.eval(&[], &Coder::Int64).is_err());

        let op = Values {
            values: vec![Value::I64(1), Value::I64(2)],
        };
        let out = op.eval(&[], &Coder::Int64).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_is_typed() {
        let out = Empty.eval(&[], &Coder::Utf8).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.coder, Coder::Utf8);
    }
}
