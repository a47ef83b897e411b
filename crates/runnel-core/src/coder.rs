//! Coders: element-type descriptors attached to every logical collection.
//!
//! Pure data; no encoding happens in this workspace. Two collections are
//! compatible exactly when their coders are structurally equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coder {
    Boolean,
    Int32,
    Int64,
    Float64,
    Utf8,
    Bytes,
    Kv(Box<Coder>, Box<Coder>),
    Iterable(Box<Coder>),
}

impl Coder {
    pub fn kv(key: Coder, value: Coder) -> Self {
        Coder::Kv(Box::new(key), Box::new(value))
    }

    pub fn iterable(elem: Coder) -> Self {
        Coder::Iterable(Box::new(elem))
    }

    /// True when `value` can be encoded by this coder. Nulls are never accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Coder::Boolean, Value::Bool(_))
            | (Coder::Int32, Value::I32(_))
            | (Coder::Int64, Value::I64(_))
            | (Coder::Float64, Value::F64(_))
            | (Coder::Utf8, Value::Str(_))
            | (Coder::Bytes, Value::Bytes(_)) => true,
            (Coder::Kv(kc, vc), Value::Kv(k, v)) => kc.accepts(k) && vc.accepts(v),
            (Coder::Iterable(ec), Value::List(items)) => items.iter().all(|i| ec.accepts(i)),
            _ => false,
        }
    }

    /// Parse the short names used by the YAML DSL (`i64`, `kv<utf8,i64>`, ...).
    pub fn parse(s: &str) -> Option<Coder> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if let Some(inner) = lower
            .strip_prefix("kv<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let (k, v) = split_top_level(inner)?;
            return Some(Coder::kv(Coder::parse(k)?, Coder::parse(v)?));
        }
        if let Some(inner) = lower
            .strip_prefix("iterable<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Some(Coder::iterable(Coder::parse(inner)?));
        }
        Some(match lower.as_str() {
            "boolean" | "bool" => Coder::Boolean,
            "int32" | "i32" => Coder::Int32,
            "int64" | "i64" | "varint" => Coder::Int64,
            "float64" | "f64" | "double" => Coder::Float64,
            "utf8" | "string" | "str" => Coder::Utf8,
            "bytes" | "binary" => Coder::Bytes,
            _ => return None,
        })
    }
}

/// Split `a,b` at the first comma that is not nested inside `<...>`.
fn split_top_level(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

impl fmt::Display for Coder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coder::Boolean => f.write_str("bool"),
            Coder::Int32 => f.write_str("i32"),
            Coder::Int64 => f.write_str("i64"),
            Coder::Float64 => f.write_str("f64"),
            Coder::Utf8 => f.write_str("utf8"),
            Coder::Bytes => f.write_str("bytes"),
            Coder::Kv(k, v) => write!(f, "kv<{k},{v}>"),
            Coder::Iterable(e) => write!(f, "iterable<{e}>"),
        }
    }
}
