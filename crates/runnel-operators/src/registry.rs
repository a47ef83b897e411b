//! Operator registry: instantiate operators from a key plus JSON config.
//!
//! Keys match the `OperatorBinding::key` values written by the translators.
//! Engines may register additional keys (e.g. for external sources).

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::filter::Filter;
use crate::map::Map;
use crate::traits::{OpError, Operator};
use crate::union::Union;
use crate::values::{Empty, Values};

/// Builds an operator from its binding config.
pub type Factory = fn(&serde_json::Value) -> Result<Box<dyn Operator>, OpError>;

pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry with the built-in operators.
    pub fn new() -> Self {
        let mut r = Self {
            factories: HashMap::new(),
        };
        r.register("values", |cfg| {
            Ok(Box::new(Values {
                values: field(cfg, "values")?,
            }))
        });
        r.register("empty", |_| Ok(Box::new(Empty)));
        r.register("union", |_| Ok(Box::new(Union)));
        r.register("map", |cfg| {
            Ok(Box::new(Map {
                func: field(cfg, "func")?,
            }))
        });
        r.register("filter", |cfg| {
            Ok(Box::new(Filter {
                predicate: field(cfg, "predicate")?,
            }))
        });
        r
    }

    pub fn register(&mut self, key: impl Into<String>, factory: Factory) {
        self.factories.insert(key.into(), factory);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// `None` when `key` is not registered.
    pub fn make(
        &self,
        key: &str,
        config: &serde_json::Value,
    ) -> Option<Result<Box<dyn Operator>, OpError>> {
        self.factories.get(key).map(|f| f(config))
    }
}

fn field<T: DeserializeOwned>(cfg: &serde_json::Value, name: &str) -> Result<T, OpError> {
    let raw = cfg
        .get(name)
        .cloned()
        .ok_or_else(|| OpError::Config(format!("missing '{name}'")))?;
    serde_json::from_value(raw).map_err(|e| OpError::Config(format!("'{name}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_core::coder::Coder;
    use runnel_core::graph::MapFn;
    use runnel_core::value::{Batch, Value};

    #[test]
    fn builds_from_config() {
        let r = Registry::new();
        let op = r
            .make("map", &serde_json::json!({ "func": MapFn::Mul(3) }))
            .unwrap()
            .unwrap();
        assert_eq!(op.name(), "map");
        let input = Batch::new(Coder::Int64, vec![Value::I64(2)]);
        let out = op.eval(&[&input], &Coder::Int64).unwrap();
        assert_eq!(out.values, vec![Value::I64(6)]);
    }

    #[test]
    fn unknown_key_and_bad_config() {
        let r = Registry::new();
        assert!(r.make("shuffle", &serde_json::Value::Null).is_none());
        assert!(matches!(
            r.make("filter", &serde_json::json!({})),
            Some(Err(OpError::Config(_)))
        ));
    }
}
