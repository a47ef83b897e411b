//! Deterministic replay & provenance helpers.
//!
//! The plan hash covers the serialized nodes, bindings, and collection table,
//! so two translations of the same pipeline under the same options hash the
//! same. The outputs digest hashes each output batch in canonical (sorted)
//! order, because a merged collection has no element order to preserve.

use runnel_core::hash::{hash_serde, Hash256};
use runnel_core::value::Batch;
use runnel_translate::physical::PhysicalPlan;

use crate::ExecError;

/// Hash the nodes and the collection table into one stable digest.
pub fn hash_plan(plan: &PhysicalPlan) -> Result<Hash256, ExecError> {
    let nodes = hash_serde(&plan.nodes).map_err(|e| ExecError::Hash(e.to_string()))?;
    let table = hash_serde(&plan.collections).map_err(|e| ExecError::Hash(e.to_string()))?;
    Ok(nodes.combine(&table))
}

/// Order-insensitive digest of one batch.
pub fn hash_batch(batch: &Batch) -> Result<Hash256, ExecError> {
    hash_serde(&batch.sorted()).map_err(|e| ExecError::Hash(e.to_string()))
}

/// Combine per-output digests in output order. `None` when there are no outputs.
pub fn hash_outputs<'a>(
    batches: impl IntoIterator<Item = &'a Batch>,
) -> Result<Option<Hash256>, ExecError> {
    let mut acc: Option<Hash256> = None;
    for batch in batches {
        let h = hash_batch(batch)?;
        acc = Some(match acc {
            Some(prev) => prev.combine(&h),
            None => h,
        });
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_core::coder::Coder;
    use runnel_core::value::Value;

    #[test]
    fn batch_digest_ignores_order() {
        let a = Batch::new(Coder::Int64, vec![Value::I64(2), Value::I64(1)]);
        let b = Batch::new(Coder::Int64, vec![Value::I64(1), Value::I64(2)]);
        assert_eq!(hash_batch(&a).unwrap(), hash_batch(&b).unwrap());

        let c = Batch::new(Coder::Int64, vec![Value::I64(1), Value::I64(1)]);
        assert_ne!(hash_batch(&a).unwrap(), hash_batch(&c).unwrap());
    }

    #[test]
    fn no_outputs_no_digest() {
        assert_eq!(hash_outputs(std::iter::empty()).unwrap(), None);
    }
}
