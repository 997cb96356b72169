use super::{
    implement_introduction, require_target_type, resolve_scope, take_draft, validate_draft,
    BindingScope, BuildHook, IntroductionSettings, OverrideBinder,
};
use crate::advice::{
    Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind, AdviceOutcome,
    OverrideStrategy,
};
use crate::builders::ConstructorBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{ConstructorInitializer, ConstructorInitializerKind, DeclId, DeclarationKind, MethodDecl};
use crate::templates::{PartiallyBoundTemplateMethod, TemplateMember};
use crate::transformation::OverrideTemplates;

/// Constructor whose body comes from a method template
///
/// Run-time parameters of the template become constructor parameters. A new
/// instance constructor of a class calls the base parameterless constructor.
pub struct IntroduceConstructorAdvice {
    info: AdviceInfo,
    template: TemplateMember<MethodDecl>,
    settings: IntroductionSettings,
    build: Option<BuildHook<ConstructorBuilder>>,
    partial: Option<PartiallyBoundTemplateMethod>,
    draft: Option<ConstructorBuilder>,
}

impl IntroduceConstructorAdvice {
    pub fn new(
        info: AdviceInfo,
        template: TemplateMember<MethodDecl>,
        settings: IntroductionSettings,
        build: Option<BuildHook<ConstructorBuilder>>,
    ) -> Self {
        Self {
            info,
            template,
            settings,
            build,
            partial: None,
            draft: None,
        }
    }
}

impl Advice for IntroduceConstructorAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceConstructor
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };
        let partial = PartiallyBoundTemplateMethod::new(compilation, &self.template, &self.settings.args)?;
        let is_static = resolve_scope(&self.settings, self.template.info.scope, ctx.config)
            .resolve(self.template.is_static, target.is_static);
        if is_static && !partial.run_time_parameters.is_empty() {
            return Err(Error::InvalidTemplateSignature(format!(
                "the template '{}' has run-time parameters and cannot be a static constructor",
                self.template.name
            )));
        }

        let mut builder = ConstructorBuilder::new(ctx.ids, self.info.target, is_static, self.info.aspect.as_str());
        if let Some(accessibility) = self.template.info.accessibility.filter(|_| !is_static) {
            builder.base.accessibility = accessibility;
        }
        for p in &partial.run_time_parameters {
            let parameter = builder.add_parameter(ctx.ids, p.name.clone(), p.ty.clone());
            parameter.ref_kind = p.ref_kind;
            parameter.default_value = p.default_value.clone();
        }
        if !is_static && compilation.is_class(self.info.target) {
            if let Some(base) = compilation.base_type_of(self.info.target) {
                builder.initializer = ConstructorInitializer {
                    kind: ConstructorInitializerKind::Base,
                    target: compilation.constructors_of_exact_signature(base, &[], false),
                    arguments: Vec::new(),
                };
            }
        }
        if let Some(build) = &self.build {
            build(&mut builder);
        }

        validate_draft(compilation, &self.info, DeclarationKind::Constructor, &builder.base, target, diagnostics);
        self.partial = Some(partial);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let partial = take_draft(&mut self.partial, &self.info)?;
        let compilation = ctx.compilation;
        let strategy = ctx.config.introduction_strategy(self.settings.strategy);
        let existing = compilation.constructors_of_exact_signature(
            builder.base.declaring_type,
            &builder.parameter_types(),
            builder.base.is_static,
        );

        let template = &self.template;
        let args = &self.settings.args;
        let bind = move |scope: &BindingScope<'_>, id: DeclId| -> Result<OverrideTemplates> {
            let template = if scope.is_introduced(id) {
                partial.bind_to(scope.compilation(), &scope.parameter_names(id))?
            } else {
                scope.bind(template, id, &[], args)?
            };
            Ok(OverrideTemplates::Method { template })
        };

        // An implicit constructor has no body to override; it is replaced by
        // an explicit one under the same id
        let implicit = existing.filter(|id| compilation.constructor(*id).is_some_and(|c| c.is_implicit));
        if let (Some(id), OverrideStrategy::Override | OverrideStrategy::New) = (implicit, strategy) {
            let mut materialized = ConstructorBuilder::materialize(compilation, id, self.info.aspect.as_str())?;
            materialized.base.attributes = builder.base.attributes.clone();
            let mut result = implement_introduction(
                ctx,
                &self.info,
                materialized,
                None,
                strategy,
                false,
                Some(&bind as OverrideBinder<'_>),
            )?;
            result.outcome = AdviceOutcome::Override;
            return Ok(result);
        }

        implement_introduction(ctx, &self.info, builder, existing, strategy, false, Some(&bind as OverrideBinder<'_>))
    }
}
