//! Create: a root transform carrying literal values.

use runnel_core::graph::Transform;
use runnel_core::id::NodeId;

use crate::error::Result;
use crate::physical::{op, OperatorBinding, PlanBuilder};
use crate::registry::{TransformTranslator, TranslationRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTranslator;

impl TransformTranslator for CreateTranslator {
    fn name(&self) -> &'static str {
        "create"
    }

    fn translate(&self, req: &TranslationRequest<'_>, plan: &mut PlanBuilder) -> Result<NodeId> {
        let Transform::Create { values } = &req.transform.transform else {
            return Err(req.invalid("create translator got a different transform"));
        };
        if !req.inputs.is_empty() {
            return Err(req.invalid(format!(
                "create takes no inputs, got {}",
                req.inputs.len()
            )));
        }

        let coder = &req.output.coder;
        if req.options.validate_create_values {
            if let Some((idx, bad)) = values.iter().enumerate().find(|(_, v)| !coder.accepts(v)) {
                return Err(req.invalid(format!(
                    "value #{idx} ({bad:?}) does not match coder {coder}"
                )));
            }
        }

        let binding = OperatorBinding::new(
            op::VALUES,
            serde_json::json!({ "values": serde_json::to_value(values)? }),
        );
        plan.add(
            req.transform.label.as_str(),
            binding,
            Vec::new(),
            coder.clone(),
            req.output.window,
        )
    }
}

#[cfg(test)]
mod tests {
    use runnel_core::coder::Coder;
    use runnel_core::config::PipelineOptions;
    use runnel_core::graph::Pipeline;
    use runnel_core::value::Value;

    use crate::error::TranslateError;
    use crate::registry::TranslatorRegistry;
    use crate::traversal::translate;

    fn mixed() -> Pipeline {
        let mut p = Pipeline::new("t");
        p.create(vec![Value::I64(1), Value::Str("x".into())], Coder::Int64)
            .unwrap();
        p
    }

    #[test]
    fn literals_checked_against_coder() {
        let registry = TranslatorRegistry::with_defaults();
        assert!(matches!(
            translate(&mixed(), &registry, &PipelineOptions::default()),
            Err(TranslateError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn unchecked_when_validation_is_off() {
        let registry = TranslatorRegistry::with_defaults();
        let options = PipelineOptions {
            validate_create_values: false,
            ..Default::default()
        };
        let plan = translate(&mixed(), &registry, &options).unwrap();
        assert_eq!(plan.len(), 1);
    }
}
