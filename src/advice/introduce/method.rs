use super::{
    apply_template, implement_introduction, require_target_type, take_draft, validate_draft,
    BindingScope, BuildHook, IntroductionSettings, OverrideBinder,
};
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind};
use crate::builders::MethodBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::Result;
use crate::model::{DeclId, Declaration, DeclarationKind, MethodDecl};
use crate::templates::{PartiallyBoundTemplateMethod, TemplateMember};
use crate::transformation::OverrideTemplates;

pub struct IntroduceMethodAdvice {
    info: AdviceInfo,
    template: TemplateMember<MethodDecl>,
    settings: IntroductionSettings,
    build: Option<BuildHook<MethodBuilder>>,
    partial: Option<PartiallyBoundTemplateMethod>,
    draft: Option<MethodBuilder>,
}

impl IntroduceMethodAdvice {
    pub fn new(
        info: AdviceInfo,
        template: TemplateMember<MethodDecl>,
        settings: IntroductionSettings,
        build: Option<BuildHook<MethodBuilder>>,
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

impl Advice for IntroduceMethodAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceMethod
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };
        let method = compilation.require(self.template.declaration)?;
        let partial = PartiallyBoundTemplateMethod::new(compilation, &self.template, &self.settings.args)?;

        let name = self.template.introduced_name(self.settings.name.as_deref());
        let mut builder = MethodBuilder::new(ctx.ids, self.info.target, name, self.info.aspect.as_str());
        apply_template(
            &mut builder.base,
            &self.template,
            Some(&method.member),
            &self.settings,
            target,
            ctx.config,
        );
        builder.return_type = partial.return_type.clone();
        builder.return_ref_kind = method.return_ref_kind;
        builder.type_parameters = partial.run_time_type_parameters.clone();
        builder.is_async = method.is_async;
        builder.is_iterator = method.is_iterator;
        for p in &partial.run_time_parameters {
            let parameter = builder.add_parameter(ctx.ids, p.name.clone(), p.ty.clone());
            parameter.ref_kind = p.ref_kind;
            parameter.default_value = p.default_value.clone();
        }
        if let Some(build) = &self.build {
            build(&mut builder);
        }

        validate_draft(
            compilation,
            &self.info,
            DeclarationKind::Method,
            &builder.base,
            target,
            diagnostics,
        );
        self.partial = Some(partial);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let partial = take_draft(&mut self.partial, &self.info)?;
        let compilation = ctx.compilation;
        let declaring_type = builder.base.declaring_type;

        // Same-named methods with other signatures are overloads, not conflicts
        let existing = compilation
            .find_closest_visible_method(declaring_type, &builder.base.name, &builder.parameter_types())
            .or_else(|| {
                compilation
                    .find_closest_uniquely_named_member(declaring_type, &builder.base.name)
                    .filter(|id| !matches!(compilation.declaration(*id), Some(Declaration::Method(_))))
            });

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

        implement_introduction(
            ctx,
            &self.info,
            builder,
            existing,
            self.settings.strategy,
            false,
            Some(&bind as OverrideBinder<'_>),
        )
    }
}
