//! Lightweight element values and materialized batches.
//!
//! The local engine moves `Value`s around; distributed engines would work on
//! encoded bytes instead. Nothing in translation inspects values except the
//! `create` translator, which checks them against the declared coder.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::coder::Coder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Kv(Box<Value>, Box<Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn kv(key: Value, value: Value) -> Self {
        Value::Kv(Box::new(key), Box::new(value))
    }

    /// Build a value of `coder` from a JSON/YAML literal.
    pub fn from_json(json: &serde_json::Value, coder: &Coder) -> Option<Value> {
        use serde_json::Value as J;
        Some(match (coder, json) {
            (Coder::Boolean, J::Bool(b)) => Value::Bool(*b),
            (Coder::Int32, J::Number(n)) => Value::I32(i32::try_from(n.as_i64()?).ok()?),
            (Coder::Int64, J::Number(n)) => Value::I64(n.as_i64()?),
            (Coder::Float64, J::Number(n)) => Value::F64(n.as_f64()?),
            (Coder::Utf8, J::String(s)) => Value::Str(s.clone()),
            (Coder::Bytes, J::String(s)) => Value::Bytes(s.as_bytes().to_vec()),
            (Coder::Kv(kc, vc), J::Array(pair)) if pair.len() == 2 => {
                Value::kv(Value::from_json(&pair[0], kc)?, Value::from_json(&pair[1], vc)?)
            }
            (Coder::Iterable(ec), J::Array(items)) => Value::List(
                items
                    .iter()
                    .map(|i| Value::from_json(i, ec))
                    .collect::<Option<Vec<_>>>()?,
            ),
            _ => return None,
        })
    }

    /// Total order used to compare batches as multisets. Values of different
    /// variants order by variant rank.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (I32(a), I32(b)) => a.cmp(b),
            (I64(a), I64(b)) => a.cmp(b),
            (F64(a), F64(b)) => a.total_cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Kv(ak, av), Kv(bk, bv)) => ak.total_cmp(bk).then_with(|| av.total_cmp(bv)),
            (List(a), List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::I32(_) => 1,
            Value::I64(_) => 2,
            Value::F64(_) => 3,
            Value::Str(_) => 4,
            Value::Bytes(_) => 5,
            Value::Kv(..) => 6,
            Value::List(_) => 7,
        }
    }
}

/// A fully materialized collection: every element plus the coder describing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub coder: Coder,
    pub values: Vec<Value>,
}

impl Batch {
    pub fn new(coder: Coder, values: Vec<Value>) -> Self {
        Self { coder, values }
    }

    pub fn empty(coder: Coder) -> Self {
        Self {
            coder,
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the batch in canonical order, for multiset comparisons.
    pub fn sorted(&self) -> Batch {
        let mut values = self.values.clone();
        values.sort_by(|a, b| a.total_cmp(b));
        Batch {
            coder: self.coder.clone(),
            values,
        }
    }
}
