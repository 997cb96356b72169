//! Initializer advice: code run before a constructor body
//!
//! A type-level instance initializer runs before every root instance
//! constructor, that is every constructor not delegating to `this(...)`.
//! Implicit constructors are materialized first. A type-level static
//! initializer needs a static constructor and introduces one when missing.

use super::diagnostics as d;
use super::{
    ensure_first_implementation, Advice, AdviceContext, AdviceImplementationResult, AdviceInfo,
    AdviceKind, AdviceOutcome,
};
use crate::builders::ConstructorBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{ConstructorInitializerKind, DeclId, Declaration, MethodDecl};
use crate::object_reader::ObjectReader;
use crate::templates::{PartiallyBoundTemplateMethod, TemplateMember};
use crate::transformation::{InitializerBody, TransformationKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where an initializer is inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitializerTarget {
    /// Before every root instance constructor of the target type
    #[default]
    BeforeInstanceConstructor,
    /// Before the static constructor of the target type
    BeforeTypeConstructor,
    /// Before the target constructor only
    Constructor,
}

/// Code of the initializer
#[derive(Debug, Clone)]
pub enum InitializerSource {
    /// Template method without run-time parameters
    Template(TemplateMember<MethodDecl>),
    /// A statement inserted verbatim
    Statement(String),
}

#[derive(Debug)]
pub struct AddInitializerAdvice {
    info: AdviceInfo,
    target: InitializerTarget,
    source: InitializerSource,
    args: ObjectReader,
    partial: Option<PartiallyBoundTemplateMethod>,
    implemented: bool,
}

impl AddInitializerAdvice {
    pub fn new(info: AdviceInfo, target: InitializerTarget, source: InitializerSource, args: ObjectReader) -> Self {
        Self {
            info,
            target,
            source,
            args,
            partial: None,
            implemented: false,
        }
    }

    fn body(&self, ctx: &AdviceContext<'_>) -> Result<InitializerBody> {
        match (&self.source, &self.partial) {
            (InitializerSource::Template(_), Some(partial)) => Ok(InitializerBody::Template {
                template: partial.bind_to(ctx.compilation, &[])?,
            }),
            (InitializerSource::Template(template), None) => Err(Error::AssertionFailed(format!(
                "the initializer template '{}' was not initialized",
                template.name
            ))),
            (InitializerSource::Statement(text), _) => Ok(InitializerBody::Statement { text: text.clone() }),
        }
    }
}

impl Advice for AddInitializerAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::AddInitializer
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        match (self.target, compilation.declaration(self.info.target)) {
            (InitializerTarget::BeforeInstanceConstructor, Some(Declaration::Type(t))) if t.is_static => {
                let type_name = compilation.display_name(self.info.target);
                diagnostics.report(
                    d::CANNOT_ADD_INITIALIZER_TO_STATIC_TYPE
                        .create(&[self.info.aspect.as_str(), type_name.as_str()])
                        .on(type_name.clone()),
                );
                return Ok(());
            }
            (InitializerTarget::BeforeInstanceConstructor, Some(Declaration::Type(t)))
            | (InitializerTarget::BeforeTypeConstructor, Some(Declaration::Type(t)))
                if !t.is_interface() => {}
            (InitializerTarget::Constructor, Some(Declaration::Constructor(_))) => {}
            _ => {
                diagnostics.report(self.info.wrong_target_kind(compilation, self.kind()));
                return Ok(());
            }
        }

        if let InitializerSource::Template(template) = &self.source {
            let partial = PartiallyBoundTemplateMethod::new(compilation, template, &self.args)?;
            if !partial.run_time_parameters.is_empty() {
                return Err(Error::InvalidTemplateSignature(format!(
                    "the initializer template '{}' cannot have run-time parameters",
                    template.name
                )));
            }
            self.partial = Some(partial);
        }
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let aspect = self.info.aspect.as_str();
        let mut transformations = Vec::new();

        let constructors: Vec<DeclId> = match self.target {
            InitializerTarget::BeforeInstanceConstructor => compilation
                .constructors_of(self.info.target)
                .into_iter()
                .filter(|id| {
                    compilation
                        .constructor(*id)
                        .is_some_and(|c| c.initializer.kind != ConstructorInitializerKind::This)
                })
                .collect(),
            InitializerTarget::BeforeTypeConstructor => match compilation.static_constructor_of(self.info.target) {
                Some(id) => vec![id],
                None => {
                    let builder = ConstructorBuilder::new(ctx.ids, self.info.target, true, aspect);
                    let id = builder.base.id;
                    debug!(ty = %compilation.display_name(self.info.target), "introducing static constructor");
                    transformations.push(TransformationKind::IntroduceMember { member: builder.freeze() });
                    vec![id]
                }
            },
            InitializerTarget::Constructor => vec![self.info.target],
        };

        for constructor in constructors {
            if compilation.constructor(constructor).is_some_and(|c| c.is_implicit) {
                let builder = ConstructorBuilder::materialize(compilation, constructor, aspect)?;
                transformations.push(TransformationKind::IntroduceMember { member: builder.freeze() });
            }
            transformations.push(TransformationKind::AddInitializer {
                constructor,
                body: self.body(ctx)?,
            });
        }

        debug!(
            aspect = %self.info.aspect,
            target = %compilation.display_name(self.info.target),
            count = transformations.len(),
            "initializer added"
        );
        Ok(AdviceImplementationResult::success(
            AdviceOutcome::Default,
            Some(self.info.target),
            transformations,
        ))
    }
}
