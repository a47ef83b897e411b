//! Filter operator with simple predicate evaluation.
//!
//! Keeps elements for which `element OP operand` holds, where OP ∈ {==, !=, <, <=, >, >=}.

use std::cmp::Ordering;

use runnel_core::coder::Coder;
use runnel_core::graph::{CmpOp, Predicate};
use runnel_core::value::{Batch, Value};

use crate::traits::{single, OpError, Operator};

#[derive(Debug, Clone)]
pub struct Filter {
    pub predicate: Predicate,
}

impl Operator for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn eval(&self, inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError> {
        let input = single(self.name(), inputs)?;

        let mut kept = Vec::new();
        for val in &input.values {
            if eval_predicate(val, &self.predicate)? {
                kept.push(val.clone());
            }
        }
        Ok(Batch::new(output_coder.clone(), kept))
    }
}

/// Evaluate a simple comparison predicate
fn eval_predicate(val: &Value, pred: &Predicate) -> Result<bool, OpError> {
    use Value::*;

    let ord = match (val, &pred.operand) {
        (Bool(a), Bool(b)) => match pred.op {
            CmpOp::Eq => return Ok(a == b),
            CmpOp::Ne => return Ok(a != b),
            op => {
                return Err(OpError::Exec(format!(
                    "unsupported op '{}' for bool",
                    op.symbol()
                )))
            }
        },
        (I32(a), I32(b)) => a.cmp(b),
        (I64(a), I64(b)) => a.cmp(b),
        (I32(a), I64(b)) => i64::from(*a).cmp(b),
        (I64(a), I32(b)) => a.cmp(&i64::from(*b)),
        // NaN compares false under every operator except !=.
        (F64(a), F64(b)) => match a.partial_cmp(b) {
            Some(ord) => ord,
            None => return Ok(pred.op == CmpOp::Ne),
        },
        (Str(a), Str(b)) => a.cmp(b),
        (v, lit) => {
            return Err(OpError::Exec(format!(
                "cannot compare {v:?} with {lit:?}"
            )))
        }
    };

    Ok(match pred.op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    })
}
