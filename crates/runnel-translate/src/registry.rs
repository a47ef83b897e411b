//! Transform translator trait and the URN-keyed registry that dispatches to it.

use std::collections::HashMap;

use runnel_core::config::PipelineOptions;
use runnel_core::graph::{urn, Collection, TransformNode};
use runnel_core::id::NodeId;
use tracing::debug;

use crate::error::{Result, TranslateError};
use crate::physical::PlanBuilder;
use crate::translators::{
    CreateTranslator, FilterTranslator, FlattenTranslator, MapTranslator, WindowIntoTranslator,
};

/// An input of the transform being translated, already present in the plan.
#[derive(Debug, Clone, Copy)]
pub struct TranslatedInput<'a> {
    pub collection: &'a Collection,
    pub node: NodeId,
}

/// Everything a translator may look at for one transform node.
#[derive(Debug)]
pub struct TranslationRequest<'a> {
    pub transform: &'a TransformNode,
    /// In the transform's declared input order (duplicates preserved).
    pub inputs: &'a [TranslatedInput<'a>],
    pub output: &'a Collection,
    pub options: &'a PipelineOptions,
}

impl TranslationRequest<'_> {
    /// Shorthand for translator-specific validation failures.
    pub fn invalid(&self, reason: impl Into<String>) -> TranslateError {
        TranslateError::InvalidTransform {
            transform: self.transform.label.clone(),
            reason: reason.into(),
        }
    }

    /// The single input of a unary transform.
    pub fn single_input(&self) -> Result<&TranslatedInput<'_>> {
        match self.inputs {
            [only] => Ok(only),
            other => Err(self.invalid(format!("expects one input, got {}", other.len()))),
        }
    }
}

/// Translates one transform kind.
///
/// Invariants:
/// - Implementations are pure with respect to `req`: all state lives in the
///   translation context.
/// - The returned node must exist in `plan`: either freshly added or one of
///   the inputs' nodes (aliasing).
pub trait TransformTranslator: Send + Sync + 'static {
    /// Human-readable translator name (stable).
    fn name(&self) -> &'static str;

    fn translate(&self, req: &TranslationRequest<'_>, plan: &mut PlanBuilder) -> Result<NodeId>;
}

/// Maps transform URNs to translators.
#[derive(Default)]
pub struct TranslatorRegistry {
    translators: HashMap<String, Box<dyn TransformTranslator>>,
}

impl TranslatorRegistry {
    /// An empty registry; every transform is unsupported until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in translators.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        r.register(urn::CREATE, CreateTranslator);
        r.register(urn::FLATTEN, FlattenTranslator);
        r.register(urn::MAP, MapTranslator);
        r.register(urn::FILTER, FilterTranslator);
        r.register(urn::WINDOW_INTO, WindowIntoTranslator);
        r
    }

    /// Register `translator` for `urn`, returning the one it replaces.
    pub fn register(
        &mut self,
        urn: impl Into<String>,
        translator: impl TransformTranslator,
    ) -> Option<Box<dyn TransformTranslator>> {
        let urn = urn.into();
        let previous = self.translators.insert(urn.clone(), Box::new(translator));
        if let Some(prev) = &previous {
            debug!(%urn, replaced = prev.name(), "translator replaced");
        }
        previous
    }

    pub fn translator_for(&self, urn: &str) -> Result<&dyn TransformTranslator> {
        self.translators
            .get(urn)
            .map(|t| t.as_ref())
            .ok_or_else(|| TranslateError::UnsupportedTransform {
                urn: urn.to_string(),
            })
    }

    pub fn contains(&self, urn: &str) -> bool {
        self.translators.contains_key(urn)
    }

    /// Registered URNs, sorted.
    pub fn urns(&self) -> Vec<&str> {
        let mut urns: Vec<&str> = self.translators.keys().map(String::as_str).collect();
        urns.sort_unstable();
        urns
    }
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field("urns", &self.urns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_builtin_urns() {
        let r = TranslatorRegistry::with_defaults();
        for u in [urn::CREATE, urn::FLATTEN, urn::MAP, urn::FILTER, urn::WINDOW_INTO] {
            assert!(r.contains(u), "missing {u}");
        }
        assert_eq!(r.translator_for(urn::FLATTEN).unwrap().name(), "flatten");
    }

    #[test]
    fn unknown_urn_is_unsupported() {
        let r = TranslatorRegistry::new();
        match r.translator_for("acme:transform:shuffle:v1") {
            Err(TranslateError::UnsupportedTransform { urn }) => {
                assert_eq!(urn, "acme:transform:shuffle:v1")
            }
            other => panic!("unexpected: {:?}", other.map(|t| t.name())),
        }
    }

    #[test]
    fn register_returns_replaced() {
        let mut r = TranslatorRegistry::new();
        assert!(r.register(urn::FLATTEN, FlattenTranslator).is_none());
        let prev = r.register(urn::FLATTEN, FlattenTranslator);
        assert_eq!(prev.map(|t| t.name()), Some("flatten"));
    }
}
