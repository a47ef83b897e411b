//! Element-wise map operator.

use runnel_core::coder::Coder;
use runnel_core::graph::MapFn;
use runnel_core::value::{Batch, Value};

use crate::traits::{single, OpError, Operator};

#[derive(Debug, Clone)]
pub struct Map {
    pub func: MapFn,
}

impl Default for Map {
    fn default() -> Self {
        Self {
            func: MapFn::Identity,
        }
    }
}

impl Operator for Map {
    fn name(&self) -> &'static str {
        "map"
    }

    fn eval(&self, inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError> {
        let input = single(self.name(), inputs)?;

        // Identity is a pass-through
        if self.func == MapFn::Identity {
            return Ok(Batch::new(output_coder.clone(), input.values.clone()));
        }

        let values = input
            .values
            .iter()
            .map(|v| apply(self.func, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Batch::new(output_coder.clone(), values))
    }
}

fn apply(func: MapFn, v: &Value) -> Result<Value, OpError> {
    let overflow = || OpError::Exec(format!("{func:?} overflows on {v:?}"));
    Ok(match (func, v) {
        (MapFn::Identity, v) => v.clone(),
        (MapFn::Add(n), Value::I32(i)) => Value::I32(
            i32::try_from(n)
                .ok()
                .and_then(|n| i.checked_add(n))
                .ok_or_else(overflow)?,
        ),
        (MapFn::Add(n), Value::I64(i)) => Value::I64(i.checked_add(n).ok_or_else(overflow)?),
        (MapFn::Add(n), Value::F64(f)) => Value::F64(f + n as f64),
        (MapFn::Mul(n), Value::I32(i)) => Value::I32(
            i32::try_from(n)
                .ok()
                .and_then(|n| i.checked_mul(n))
                .ok_or_else(overflow)?,
        ),
        (MapFn::Mul(n), Value::I64(i)) => Value::I64(i.checked_mul(n).ok_or_else(overflow)?),
        (MapFn::Mul(n), Value::F64(f)) => Value::F64(f * n as f64),
        (MapFn::Format, v) => Value::Str(render(v)),
        (MapFn::PairWithOne, v) => Value::kv(v.clone(), Value::I64(1)),
        (func, v) => {
            return Err(OpError::Exec(format!(
                "map fn {func:?} does not apply to {v:?}"
            )))
        }
    })
}

/// Plain-text rendering used by `MapFn::Format`.
pub fn render(v: &Value) -> String {
    match v {
        Value::Bool(b) => b.to_string(),
        Value::I32(i) => i.to_string(),
        Value::I64(i) => i.to_string(),
        Value::F64(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Kv(k, v) => format!("({}, {})", render(k), render(v)),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}
