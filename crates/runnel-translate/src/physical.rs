//! Physical plan: an arena of operator-bound nodes plus the logical → physical table.
//!
//! Nodes reference inputs by `NodeId` and may only reference nodes created
//! before them, so arena order is a valid execution order. A node with
//! several consumers appears once.

use std::collections::BTreeMap;
use std::fmt;

use runnel_core::coder::Coder;
use runnel_core::id::{CollectionId, NodeId};
use runnel_core::window::WindowFn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TranslateError};

/// Operator keys understood by the built-in engine.
pub mod op {
    pub const VALUES: &str = "values";
    pub const EMPTY: &str = "empty";
    pub const UNION: &str = "union";
    pub const MAP: &str = "map";
    pub const FILTER: &str = "filter";
}

/// Which operator an engine should instantiate for a node, and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorBinding {
    pub key: String,
    pub config: serde_json::Value,
}

impl OperatorBinding {
    pub fn new(key: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            config,
        }
    }

    /// Binding with no parameters.
    pub fn bare(key: impl Into<String>) -> Self {
        Self::new(key, serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalNode {
    pub id: NodeId,
    /// Label of the transform (or source) this node was created for.
    pub label: String,
    pub binding: OperatorBinding,
    pub inputs: Vec<NodeId>,
    pub coder: Coder,
    pub window: WindowFn,
}

/// Append-only node arena used while translating.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    nodes: Vec<PhysicalNode>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Every input must already be in the arena.
    pub fn add(
        &mut self,
        label: impl Into<String>,
        binding: OperatorBinding,
        inputs: Vec<NodeId>,
        coder: Coder,
        window: WindowFn,
    ) -> Result<NodeId> {
        let id = NodeId::from_index(self.nodes.len());
        if let Some(bad) = inputs.iter().find(|i| !self.contains(**i)) {
            return Err(TranslateError::Invariant(format!(
                "node {id} references unknown input {bad}"
            )));
        }
        self.nodes.push(PhysicalNode {
            id,
            label: label.into(),
            binding,
            inputs,
            coder,
            window,
        });
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&PhysicalNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn into_nodes(self) -> Vec<PhysicalNode> {
        self.nodes
    }
}

/// The unit handed to an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalPlan {
    pub job_name: String,
    /// In execution order.
    pub nodes: Vec<PhysicalNode>,
    /// Every translated logical collection and the node that materializes it.
    /// Aliased collections share a node.
    pub collections: BTreeMap<CollectionId, NodeId>,
    /// Logical windowing of every translated collection. An aliased collection
    /// may differ from its node, e.g. after a window-into.
    #[serde(default)]
    pub windows: BTreeMap<CollectionId, WindowFn>,
    /// Terminal collections of the pipeline, in id order.
    pub outputs: Vec<CollectionId>,
}

impl PhysicalPlan {
    pub fn node(&self, id: NodeId) -> Option<&PhysicalNode> {
        self.nodes.get(id.index())
    }

    pub fn node_for(&self, collection: CollectionId) -> Option<&PhysicalNode> {
        self.collections
            .get(&collection)
            .and_then(|id| self.node(*id))
    }

    /// Collections whose logical windowing differs from the node that holds them.
    pub fn rewindowed(&self) -> Vec<(CollectionId, NodeId, WindowFn)> {
        self.collections
            .iter()
            .filter_map(|(c, n)| {
                let window = *self.windows.get(c)?;
                let node = self.node(*n)?;
                (node.window != window).then_some((*c, *n, window))
            })
            .collect()
    }

    /// Nodes that consume `id`, in execution order.
    pub fn consumers_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.inputs.contains(&id))
            .map(|n| n.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan {} ({} nodes)", self.job_name, self.nodes.len())?;
        for n in &self.nodes {
            let inputs: Vec<String> = n.inputs.iter().map(|i| format!("#{}", i.get())).collect();
            writeln!(
                f,
                "  #{} {}({}) {} : {} {}",
                n.id.get(),
                n.binding.key,
                inputs.join(", "),
                n.label,
                n.coder,
                n.window
            )?;
        }
        for (c, node, window) in self.rewindowed() {
            writeln!(f, "  window {} = #{} as {}", c.get(), node.get(), window)?;
        }
        for c in &self.outputs {
            let window = self
                .windows
                .get(c)
                .map(|w| format!(" {w}"))
                .unwrap_or_default();
            match self.collections.get(c) {
                Some(node) => writeln!(f, "  output {} <- #{}{}", c.get(), node.get(), window)?,
                None => writeln!(f, "  output {} <- ?{}", c.get(), window)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_unknown_inputs() {
        let mut b = PlanBuilder::new();
        let a = b
            .add("a", OperatorBinding::bare(op::EMPTY), vec![], Coder::Int64, WindowFn::Global)
            .unwrap();
        let err = b
            .add(
                "u",
                OperatorBinding::bare(op::UNION),
                vec![a, NodeId::new(5)],
                Coder::Int64,
                WindowFn::Global,
            )
            .unwrap_err();
        assert!(matches!(err, TranslateError::Invariant(_)));
        assert_eq!(b.len(), 1);
    }
}
