//! Attribute and annotation advice

use super::diagnostics as d;
use super::{
    ensure_first_implementation, Advice, AdviceContext, AdviceImplementationResult, AdviceInfo,
    AdviceKind, AdviceOutcome, OverrideStrategy,
};
use crate::diagnostics::DiagnosticBag;
use crate::error::Result;
use crate::model::AttributeDecl;
use crate::transformation::TransformationKind;
use serde_json::Value;
use tracing::debug;

fn require_target(ctx: &AdviceContext<'_>, info: &AdviceInfo, advice: AdviceKind, diagnostics: &mut DiagnosticBag) {
    if ctx.compilation.declaration(info.target).is_none() {
        diagnostics.report(info.wrong_target_kind(ctx.compilation, advice));
    }
}

/// Add an attribute to a declaration
///
/// An attribute of the same type already present is a conflict resolved by
/// the strategy: `Default` and `Fail` report it, `Override` replaces every
/// instance, `New` adds another one.
#[derive(Debug)]
pub struct IntroduceAttributeAdvice {
    info: AdviceInfo,
    attribute: AttributeDecl,
    strategy: OverrideStrategy,
    implemented: bool,
}

impl IntroduceAttributeAdvice {
    pub fn new(info: AdviceInfo, attribute: AttributeDecl, strategy: OverrideStrategy) -> Self {
        Self {
            info,
            attribute,
            strategy,
            implemented: false,
        }
    }
}

impl Advice for IntroduceAttributeAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceAttribute
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        require_target(ctx, &self.info, self.kind(), diagnostics);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let target = self.info.target;
        let declaration = compilation.require_declaration(target)?;
        let exists = declaration
            .attributes()
            .iter()
            .any(|a| a.is(&self.attribute.type_name));

        let introduce = TransformationKind::IntroduceAttribute {
            target,
            attribute: self.attribute.clone(),
        };
        if !exists {
            return Ok(AdviceImplementationResult::success(
                AdviceOutcome::Default,
                Some(target),
                vec![introduce],
            ));
        }

        debug!(
            attribute = %self.attribute.type_name,
            target = %compilation.display_name(target),
            strategy = ?self.strategy,
            "attribute already present"
        );
        match self.strategy {
            OverrideStrategy::Default | OverrideStrategy::Fail => {
                let name = compilation.display_name(target);
                Ok(AdviceImplementationResult::failed([d::CANNOT_INTRODUCE_ATTRIBUTE_ALREADY_EXISTS
                    .create(&[
                        self.info.aspect.as_str(),
                        self.attribute.type_name.as_str(),
                        name.as_str(),
                    ])
                    .on(name)]))
            }
            OverrideStrategy::Ignore => Ok(AdviceImplementationResult::ignored(Some(target))),
            OverrideStrategy::Override => Ok(AdviceImplementationResult::success(
                AdviceOutcome::Override,
                Some(target),
                vec![
                    TransformationKind::RemoveAttributes {
                        target,
                        attribute_type: self.attribute.type_name.clone(),
                    },
                    introduce,
                ],
            )),
            OverrideStrategy::New => Ok(AdviceImplementationResult::success(
                AdviceOutcome::New,
                Some(target),
                vec![introduce],
            )),
        }
    }
}

/// Remove every attribute of a type from a declaration
#[derive(Debug)]
pub struct RemoveAttributesAdvice {
    info: AdviceInfo,
    attribute_type: String,
    implemented: bool,
}

impl RemoveAttributesAdvice {
    pub fn new(info: AdviceInfo, attribute_type: impl Into<String>) -> Self {
        Self {
            info,
            attribute_type: attribute_type.into(),
            implemented: false,
        }
    }
}

impl Advice for RemoveAttributesAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::RemoveAttributes
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        require_target(ctx, &self.info, self.kind(), diagnostics);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let declaration = ctx.compilation.require_declaration(self.info.target)?;
        let present = declaration.attributes().iter().any(|a| a.is(&self.attribute_type));
        if !present {
            return Ok(AdviceImplementationResult::success(
                AdviceOutcome::Default,
                Some(self.info.target),
                Vec::new(),
            ));
        }
        Ok(AdviceImplementationResult::success(
            AdviceOutcome::Default,
            Some(self.info.target),
            vec![TransformationKind::RemoveAttributes {
                target: self.info.target,
                attribute_type: self.attribute_type.clone(),
            }],
        ))
    }
}

/// Attach an opaque annotation for later pipeline stages
#[derive(Debug)]
pub struct AddAnnotationAdvice {
    info: AdviceInfo,
    annotation: Value,
    implemented: bool,
}

impl AddAnnotationAdvice {
    pub fn new(info: AdviceInfo, annotation: Value) -> Self {
        Self {
            info,
            annotation,
            implemented: false,
        }
    }
}

impl Advice for AddAnnotationAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::AddAnnotation
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        require_target(ctx, &self.info, self.kind(), diagnostics);
        Ok(())
    }

    fn implement(&mut self, _ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        Ok(AdviceImplementationResult::success(
            AdviceOutcome::Default,
            Some(self.info.target),
            vec![TransformationKind::AddAnnotation {
                target: self.info.target,
                annotation: self.annotation.clone(),
            }],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaverConfig;
    use crate::model::{Compilation, DeclId};
    use rstest::rstest;

    const MODEL: &str = r#"
types:
  - name: App.Service
    attributes:
      - type: Serializable
"#;

    fn introduce(strategy: OverrideStrategy) -> AdviceImplementationResult {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let ty: DeclId = compilation.find_type("App.Service").unwrap().id();
        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(&compilation, &mut ids, &config);
        let mut advice = IntroduceAttributeAdvice::new(
            AdviceInfo::new("Mark", None, ty),
            AttributeDecl::new("SerializableAttribute"),
            strategy,
        );
        advice.implement(&mut ctx).unwrap()
    }

    #[rstest]
    #[case(OverrideStrategy::Default, AdviceOutcome::Error, 0)]
    #[case(OverrideStrategy::Fail, AdviceOutcome::Error, 0)]
    #[case(OverrideStrategy::Ignore, AdviceOutcome::Ignore, 0)]
    #[case(OverrideStrategy::Override, AdviceOutcome::Override, 2)]
    #[case(OverrideStrategy::New, AdviceOutcome::New, 1)]
    fn test_existing_attribute(
        #[case] strategy: OverrideStrategy,
        #[case] outcome: AdviceOutcome,
        #[case] transformations: usize,
    ) {
        let result = introduce(strategy);
        assert_eq!(result.outcome, outcome);
        assert_eq!(result.transformations.len(), transformations);
        if outcome == AdviceOutcome::Error {
            assert_eq!(result.diagnostics[0].id, "LAMA0523");
        }
    }
}
