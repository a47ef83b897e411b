//! Unary element-wise transforms: map, filter, window-into.

use runnel_core::coder::Coder;
use runnel_core::graph::Transform;
use runnel_core::id::{CollectionId, NodeId};

use crate::error::{Result, TranslateError};
use crate::physical::{op, OperatorBinding, PlanBuilder};
use crate::registry::{TransformTranslator, TranslationRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct MapTranslator;

impl TransformTranslator for MapTranslator {
    fn name(&self) -> &'static str {
        "map"
    }

    fn translate(&self, req: &TranslationRequest<'_>, plan: &mut PlanBuilder) -> Result<NodeId> {
        let Transform::Map { func } = &req.transform.transform else {
            return Err(req.invalid("map translator got a different transform"));
        };
        let input = req.single_input()?;
        let in_coder = &input.collection.coder;
        let produced = func
            .output_coder(in_coder)
            .ok_or_else(|| req.invalid(format!("{func:?} does not apply to {in_coder}")))?;
        if produced != req.output.coder {
            return Err(req.invalid(format!(
                "{func:?} produces {produced} but the output is declared {}",
                req.output.coder
            )));
        }

        let binding = OperatorBinding::new(op::MAP, serde_json::json!({ "func": func }));
        plan.add(
            req.transform.label.as_str(),
            binding,
            vec![input.node],
            produced,
            req.output.window,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterTranslator;

impl TransformTranslator for FilterTranslator {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn translate(&self, req: &TranslationRequest<'_>, plan: &mut PlanBuilder) -> Result<NodeId> {
        let Transform::Filter { predicate } = &req.transform.transform else {
            return Err(req.invalid("filter translator got a different transform"));
        };
        let input = req.single_input()?;
        same_coder(req, input.collection.id, &input.collection.coder)?;
        if !input.collection.coder.accepts(&predicate.operand) {
            return Err(req.invalid(format!(
                "operand {:?} is not a {}",
                predicate.operand, input.collection.coder
            )));
        }

        let binding = OperatorBinding::new(
            op::FILTER,
            serde_json::json!({ "predicate": predicate }),
        );
        plan.add(
            req.transform.label.as_str(),
            binding,
            vec![input.node],
            req.output.coder.clone(),
            req.output.window,
        )
    }
}

/// Re-windowing changes no elements in a batch engine, so the output aliases
/// the input node. Downstream multi-input transforms still see the new
/// windowing through the logical collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowIntoTranslator;

impl TransformTranslator for WindowIntoTranslator {
    fn name(&self) -> &'static str {
        "window_into"
    }

    fn translate(&self, req: &TranslationRequest<'_>, _plan: &mut PlanBuilder) -> Result<NodeId> {
        let input = req.single_input()?;
        same_coder(req, input.collection.id, &input.collection.coder)?;
        Ok(input.node)
    }
}

fn same_coder(
    req: &TranslationRequest<'_>,
    input: CollectionId,
    coder: &Coder,
) -> Result<()> {
    if *coder != req.output.coder {
        return Err(TranslateError::IncompatibleElementType {
            left: input,
            left_coder: coder.clone(),
            right: req.output.id,
            right_coder: req.output.coder.clone(),
        });
    }
    Ok(())
}
