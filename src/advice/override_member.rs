//! Override advice
//!
//! Overriding never introduces a member by name: the template body replaces
//! the body of an existing declaration. Two targets need a structural change
//! first. A field is promoted to a property so it has accessors to wrap, and
//! an implicit constructor is materialized so it has a body.

use super::diagnostics as d;
use super::introduce::BindingScope;
use super::{
    ensure_first_implementation, Advice, AdviceContext, AdviceImplementationResult, AdviceInfo,
    AdviceKind, AdviceOutcome,
};
use crate::builders::{ConstructorBuilder, PropertyBuilder};
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::error::{Error, Result};
use crate::model::{Compilation, Declaration, DeclarationKind, MethodDecl, MethodKind};
use crate::object_reader::ObjectReader;
use crate::templates::{
    select_getter_template, select_method_template, GetterTemplateSelector, MethodTemplateSelector,
    TemplateMember,
};
use crate::transformation::{OverrideTemplates, TransformationKind};
use tracing::debug;

/// `CannotOverrideAbstractMember` when the target has no body to wrap
fn abstract_target(compilation: &Compilation, info: &AdviceInfo) -> Option<Diagnostic> {
    let member = compilation.declaration(info.target)?.member()?;
    if !member.is_abstract {
        return None;
    }
    let name = compilation.display_name(info.target);
    Some(
        d::CANNOT_OVERRIDE_ABSTRACT_MEMBER
            .create(&[info.aspect.as_str(), name.as_str()])
            .on(name),
    )
}

/// Report `CannotApplyAdviceOnTargetKind` unless the target has one of `kinds`
fn expect_target_kind(
    compilation: &Compilation,
    info: &AdviceInfo,
    advice: AdviceKind,
    kinds: &[DeclarationKind],
    diagnostics: &mut DiagnosticBag,
) -> bool {
    let accepted = compilation
        .declaration(info.target)
        .is_some_and(|decl| kinds.contains(&decl.kind()));
    if !accepted {
        diagnostics.report(info.wrong_target_kind(compilation, advice));
    }
    accepted
}

fn overridden(info: &AdviceInfo, transformations: Vec<TransformationKind>) -> AdviceImplementationResult {
    debug!(aspect = %info.aspect, target = %info.target, count = transformations.len(), "member overridden");
    AdviceImplementationResult::success(AdviceOutcome::Default, Some(info.target), transformations)
}

/// Override of a method or operator body
///
/// The template variant is chosen from the async and iterator shape of the
/// target at implementation time.
#[derive(Debug)]
pub struct OverrideMethodAdvice {
    info: AdviceInfo,
    selector: MethodTemplateSelector,
    args: ObjectReader,
    implemented: bool,
}

impl OverrideMethodAdvice {
    pub fn new(info: AdviceInfo, selector: MethodTemplateSelector, args: ObjectReader) -> Self {
        Self {
            info,
            selector,
            args,
            implemented: false,
        }
    }
}

impl Advice for OverrideMethodAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::OverrideMethod
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let overridable = compilation.method(self.info.target).is_some_and(|m| {
            matches!(
                m.method_kind,
                MethodKind::Default | MethodKind::Operator | MethodKind::ConversionOperator
            )
        });
        if !overridable {
            diagnostics.report(self.info.wrong_target_kind(compilation, self.kind()));
        }
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        if let Some(diagnostic) = abstract_target(compilation, &self.info) {
            return Ok(AdviceImplementationResult::failed([diagnostic]));
        }
        let method = compilation.method(self.info.target).ok_or_else(|| {
            Error::AssertionFailed(format!("{} is not a method", self.info.target))
        })?;

        let template = select_method_template(compilation, method, &self.selector);
        debug!(
            template = %template.name,
            selected = ?template.selected_kind,
            interpreted = ?template.interpreted_kind,
            "method template selected"
        );
        let bound = BindingScope::existing(compilation).bind(&template, self.info.target, &[], &self.args)?;
        Ok(overridden(
            &self.info,
            vec![TransformationKind::OverrideMember {
                target: self.info.target,
                templates: OverrideTemplates::Method { template: bound },
            }],
        ))
    }
}

/// Override of the accessors of a field or property
///
/// A field is first promoted to an auto-property keeping its id; the
/// templates are then bound to the accessors of the promoted property.
#[derive(Debug)]
pub struct OverrideFieldOrPropertyAdvice {
    info: AdviceInfo,
    getter: GetterTemplateSelector,
    setter: Option<TemplateMember<MethodDecl>>,
    args: ObjectReader,
    implemented: bool,
}

impl OverrideFieldOrPropertyAdvice {
    pub fn new(
        info: AdviceInfo,
        getter: GetterTemplateSelector,
        setter: Option<TemplateMember<MethodDecl>>,
        args: ObjectReader,
    ) -> Result<Self> {
        if getter.default_template.is_none() && setter.is_none() {
            return Err(Error::InvalidAdviceParameters(
                "overriding a field or property needs a getter or a setter template".into(),
            ));
        }
        Ok(Self {
            info,
            getter,
            setter,
            args,
            implemented: false,
        })
    }
}

impl Advice for OverrideFieldOrPropertyAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::OverrideFieldOrProperty
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        expect_target_kind(
            ctx.compilation,
            &self.info,
            self.kind(),
            &[DeclarationKind::Field, DeclarationKind::Property],
            diagnostics,
        );
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let target = self.info.target;

        let promoted = match compilation.declaration(target) {
            Some(Declaration::Field(_)) => {
                let builder = PropertyBuilder::promote(compilation, target, ctx.ids, self.info.aspect.as_str())?;
                Some(builder.freeze())
            }
            Some(Declaration::Property(_)) => {
                if let Some(diagnostic) = abstract_target(compilation, &self.info) {
                    return Ok(AdviceImplementationResult::failed([diagnostic]));
                }
                None
            }
            _ => {
                return Err(Error::AssertionFailed(format!(
                    "{} is neither a field nor a property",
                    compilation.display_name(target)
                )))
            }
        };

        let templates = {
            let scope = match &promoted {
                Some(property) => BindingScope::with_introduced(compilation, property),
                None => BindingScope::existing(compilation),
            };
            let getter = match scope.declaration(target) {
                Some(Declaration::Property(p)) => p.getter.and_then(|id| match scope.declaration(id) {
                    Some(Declaration::Method(m)) => Some(m),
                    _ => None,
                }),
                _ => None,
            };
            let getter_template = match getter {
                Some(accessor) => select_getter_template(compilation, accessor, &self.getter, self.setter.is_none())?,
                None => None,
            };
            scope.bind_accessors(target, getter_template.as_ref(), self.setter.as_ref(), &self.args)?
        };

        let mut transformations = Vec::with_capacity(2);
        if let Some(property) = promoted {
            debug!(field = %compilation.display_name(target), "promoting field to property");
            transformations.push(TransformationKind::PromoteField { field: target, property });
        }
        transformations.push(TransformationKind::OverrideMember { target, templates });
        Ok(overridden(&self.info, transformations))
    }
}

#[derive(Debug)]
pub struct OverrideIndexerAdvice {
    info: AdviceInfo,
    getter: Option<TemplateMember<MethodDecl>>,
    setter: Option<TemplateMember<MethodDecl>>,
    args: ObjectReader,
    implemented: bool,
}

impl OverrideIndexerAdvice {
    pub fn new(
        info: AdviceInfo,
        getter: Option<TemplateMember<MethodDecl>>,
        setter: Option<TemplateMember<MethodDecl>>,
        args: ObjectReader,
    ) -> Result<Self> {
        if getter.is_none() && setter.is_none() {
            return Err(Error::InvalidAdviceParameters(
                "overriding an indexer needs a getter or a setter template".into(),
            ));
        }
        Ok(Self {
            info,
            getter,
            setter,
            args,
            implemented: false,
        })
    }
}

impl Advice for OverrideIndexerAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::OverrideIndexer
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        expect_target_kind(ctx.compilation, &self.info, self.kind(), &[DeclarationKind::Indexer], diagnostics);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        if let Some(diagnostic) = abstract_target(compilation, &self.info) {
            return Ok(AdviceImplementationResult::failed([diagnostic]));
        }
        let templates = BindingScope::existing(compilation).bind_accessors(
            self.info.target,
            self.getter.as_ref(),
            self.setter.as_ref(),
            &self.args,
        )?;
        Ok(overridden(
            &self.info,
            vec![TransformationKind::OverrideMember {
                target: self.info.target,
                templates,
            }],
        ))
    }
}

/// Override of event accessors; each accessor template is optional and bound
/// on its own
#[derive(Debug)]
pub struct OverrideEventAdvice {
    info: AdviceInfo,
    adder: Option<TemplateMember<MethodDecl>>,
    remover: Option<TemplateMember<MethodDecl>>,
    raiser: Option<TemplateMember<MethodDecl>>,
    args: ObjectReader,
    implemented: bool,
}

impl OverrideEventAdvice {
    pub fn new(
        info: AdviceInfo,
        adder: Option<TemplateMember<MethodDecl>>,
        remover: Option<TemplateMember<MethodDecl>>,
        raiser: Option<TemplateMember<MethodDecl>>,
        args: ObjectReader,
    ) -> Result<Self> {
        if adder.is_none() && remover.is_none() && raiser.is_none() {
            return Err(Error::InvalidAdviceParameters(
                "overriding an event needs at least one accessor template".into(),
            ));
        }
        Ok(Self {
            info,
            adder,
            remover,
            raiser,
            args,
            implemented: false,
        })
    }
}

impl Advice for OverrideEventAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::OverrideEvent
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        expect_target_kind(ctx.compilation, &self.info, self.kind(), &[DeclarationKind::Event], diagnostics);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        if let Some(diagnostic) = abstract_target(compilation, &self.info) {
            return Ok(AdviceImplementationResult::failed([diagnostic]));
        }
        let templates = BindingScope::existing(compilation).bind_event_accessors(
            self.info.target,
            self.adder.as_ref(),
            self.remover.as_ref(),
            self.raiser.as_ref(),
            &self.args,
        )?;
        Ok(overridden(
            &self.info,
            vec![TransformationKind::OverrideMember {
                target: self.info.target,
                templates,
            }],
        ))
    }
}

#[derive(Debug)]
pub struct OverrideConstructorAdvice {
    info: AdviceInfo,
    template: TemplateMember<MethodDecl>,
    args: ObjectReader,
    implemented: bool,
}

impl OverrideConstructorAdvice {
    pub fn new(info: AdviceInfo, template: TemplateMember<MethodDecl>, args: ObjectReader) -> Self {
        Self {
            info,
            template,
            args,
            implemented: false,
        }
    }
}

impl Advice for OverrideConstructorAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::OverrideConstructor
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        expect_target_kind(ctx.compilation, &self.info, self.kind(), &[DeclarationKind::Constructor], diagnostics);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let target = self.info.target;
        let is_implicit = compilation.constructor(target).is_some_and(|c| c.is_implicit);

        if !is_implicit {
            let bound = BindingScope::existing(compilation).bind(&self.template, target, &[], &self.args)?;
            return Ok(overridden(
                &self.info,
                vec![TransformationKind::OverrideMember {
                    target,
                    templates: OverrideTemplates::Method { template: bound },
                }],
            ));
        }

        let member = ConstructorBuilder::materialize(compilation, target, self.info.aspect.as_str())?.freeze();
        let bound = BindingScope::with_introduced(compilation, &member).bind(&self.template, target, &[], &self.args)?;
        debug!(constructor = %compilation.display_name(target), "materializing implicit constructor");
        Ok(overridden(
            &self.info,
            vec![
                TransformationKind::IntroduceMember { member },
                TransformationKind::OverrideMember {
                    target,
                    templates: OverrideTemplates::Method { template: bound },
                },
            ],
        ))
    }
}

#[derive(Debug)]
pub struct OverrideFinalizerAdvice {
    info: AdviceInfo,
    template: TemplateMember<MethodDecl>,
    args: ObjectReader,
    implemented: bool,
}

impl OverrideFinalizerAdvice {
    pub fn new(info: AdviceInfo, template: TemplateMember<MethodDecl>, args: ObjectReader) -> Self {
        Self {
            info,
            template,
            args,
            implemented: false,
        }
    }
}

impl Advice for OverrideFinalizerAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::OverrideFinalizer
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        expect_target_kind(ctx.compilation, &self.info, self.kind(), &[DeclarationKind::Finalizer], diagnostics);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let bound = BindingScope::existing(compilation).bind(&self.template, self.info.target, &[], &self.args)?;
        Ok(overridden(
            &self.info,
            vec![TransformationKind::OverrideMember {
                target: self.info.target,
                templates: OverrideTemplates::Method { template: bound },
            }],
        ))
    }
}
