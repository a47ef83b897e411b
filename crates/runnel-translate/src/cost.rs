//! Coarse row estimates over a physical plan, for `explain` output.
//!
//! Walks the nodes in execution order. `values` nodes know their size,
//! `union` sums its inputs (duplicates counted), `map` preserves cardinality,
//! and `filter` applies a selectivity guess by comparison operator. Unknown
//! operator keys (external sources) estimate as 0.

use std::collections::BTreeMap;

use runnel_core::graph::{CmpOp, Predicate};
use runnel_core::id::NodeId;
use serde::{Deserialize, Serialize};

use crate::physical::{op, PhysicalNode, PhysicalPlan};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanEstimate {
    pub rows: BTreeMap<NodeId, u64>,
    /// Sum of estimated rows over the plan outputs.
    pub output_rows: u64,
    /// Widest union in the plan.
    pub max_fan_in: usize,
}

/// Estimate filter selectivity from the comparison operator.
fn estimate_filter_selectivity(op: CmpOp) -> f64 {
    match op {
        // Equality: assume moderate selectivity
        CmpOp::Eq => 0.1,
        // Not-equal: high selectivity
        CmpOp::Ne => 0.9,
        // Range predicates
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => 0.33,
    }
}

fn node_rows(node: &PhysicalNode, rows: &BTreeMap<NodeId, u64>) -> u64 {
    let input = |i: usize| {
        node.inputs
            .get(i)
            .and_then(|id| rows.get(id))
            .copied()
            .unwrap_or(0)
    };
    match node.binding.key.as_str() {
        op::VALUES => node
            .binding
            .config
            .get("values")
            .and_then(|v| v.as_array())
            .map(|a| a.len() as u64)
            .unwrap_or(0),
        op::EMPTY => 0,
        op::UNION => node
            .inputs
            .iter()
            .map(|id| rows.get(id).copied().unwrap_or(0))
            .sum(),
        op::MAP => input(0),
        op::FILTER => {
            let selectivity = node
                .binding
                .config
                .get("predicate")
                .cloned()
                .and_then(|p| serde_json::from_value::<Predicate>(p).ok())
                .map(|p| estimate_filter_selectivity(p.op))
                .unwrap_or(0.5);
            let in_rows = input(0);
            if in_rows == 0 {
                0
            } else {
                ((in_rows as f64 * selectivity) as u64).max(1)
            }
        }
        _ => 0,
    }
}

pub fn estimate_rows(plan: &PhysicalPlan) -> PlanEstimate {
    let mut est = PlanEstimate::default();
    for node in &plan.nodes {
        let r = node_rows(node, &est.rows);
        est.rows.insert(node.id, r);
        if node.binding.key == op::UNION {
            est.max_fan_in = est.max_fan_in.max(node.inputs.len());
        }
    }
    est.output_rows = plan
        .outputs
        .iter()
        .filter_map(|c| plan.collections.get(c))
        .map(|n| est.rows.get(n).copied().unwrap_or(0))
        .sum();
    est
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_core::coder::Coder;
    use runnel_core::config::PipelineOptions;
    use runnel_core::graph::{CollectionList, Pipeline};
    use runnel_core::value::Value;

    use crate::registry::TranslatorRegistry;
    use crate::traversal::translate;

    #[test]
    fn union_sums_and_filter_shrinks() {
        let mut p = Pipeline::new("t");
        let a = p.create((1..=10).map(Value::I64).collect(), Coder::Int64).unwrap();
        let b = p.create((1..=30).map(Value::I64).collect(), Coder::Int64).unwrap();
        let m = p.flatten(&CollectionList::of(a).and(b).and(a), None).unwrap();
        let f = p
            .filter(m, Predicate::new(CmpOp::Eq, Value::I64(3)))
            .unwrap();
        let registry = TranslatorRegistry::with_defaults();
        let plan = translate(&p, &registry, &PipelineOptions::default()).unwrap();

        let est = estimate_rows(&plan);
        assert_eq!(est.rows[&plan.collections[&m]], 50);
        assert_eq!(est.rows[&plan.collections[&f]], 5);
        assert_eq!(est.output_rows, 5);
        assert_eq!(est.max_fan_in, 3);
    }
}
