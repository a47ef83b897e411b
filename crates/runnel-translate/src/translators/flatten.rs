//! Flatten: union N same-typed collections into one.
//!
//! Policy:
//! - every input must carry the output's coder and windowing; the first
//!   mismatch is reported with both collection ids, nothing is coerced
//! - N = 0 yields an `empty` node typed by the declared output coder
//! - N = 1 aliases the input node (unless disabled in the options)
//! - N ≥ 2 yields one `union` node over the inputs in declared order
//!
//! The union is a multiset union: duplicates survive, including an input
//! listed twice. Element order across inputs is unspecified; engines may
//! interleave inputs however they like and consumers must not rely on it.
//! Nothing is materialized here.

use runnel_core::coder::Coder;
use runnel_core::id::{CollectionId, NodeId};
use runnel_core::window::WindowFn;

use crate::error::{Result, TranslateError};
use crate::physical::{op, OperatorBinding, PlanBuilder};
use crate::registry::{TransformTranslator, TranslatedInput, TranslationRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenTranslator;

impl TransformTranslator for FlattenTranslator {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn translate(&self, req: &TranslationRequest<'_>, plan: &mut PlanBuilder) -> Result<NodeId> {
        check_compatible(req)?;
        let output = req.output;

        match req.inputs {
            [] => plan.add(
                req.transform.label.as_str(),
                OperatorBinding::bare(op::EMPTY),
                Vec::new(),
                output.coder.clone(),
                output.window,
            ),
            [only] if req.options.alias_single_input_flatten => Ok(only.node),
            inputs => plan.add(
                req.transform.label.as_str(),
                OperatorBinding::bare(op::UNION),
                inputs.iter().map(|i| i.node).collect(),
                output.coder.clone(),
                output.window,
            ),
        }
    }
}

/// Compare every input against the first one, then the first one against the
/// declared output. Reporting against the first input names a concrete pair.
fn check_compatible(req: &TranslationRequest<'_>) -> Result<()> {
    let Some(first) = req.inputs.first() else {
        return Ok(());
    };
    for other in &req.inputs[1..] {
        check_pair(first, other.collection.id, &other.collection.coder, other.collection.window)?;
    }
    let output = req.output;
    check_pair(first, output.id, &output.coder, output.window)
}

fn check_pair(
    first: &TranslatedInput<'_>,
    right: CollectionId,
    right_coder: &Coder,
    right_window: WindowFn,
) -> Result<()> {
    let left = first.collection;
    if left.coder != *right_coder {
        return Err(TranslateError::IncompatibleElementType {
            left: left.id,
            left_coder: left.coder.clone(),
            right,
            right_coder: right_coder.clone(),
        });
    }
    if left.window != right_window {
        return Err(TranslateError::IncompatibleWindowing {
            left: left.id,
            left_window: left.window,
            right,
            right_window,
        });
    }
    Ok(())
}
