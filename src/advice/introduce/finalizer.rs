use super::{
    implement_introduction, require_target_type, take_draft, validate_draft, BindingScope,
    IntroductionSettings, OverrideBinder,
};
use crate::advice::diagnostics as d;
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind};
use crate::builders::MethodBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::Result;
use crate::model::{DeclId, DeclarationKind, MethodDecl};
use crate::templates::{PartiallyBoundTemplateMethod, TemplateMember};
use crate::transformation::OverrideTemplates;

/// Finalizer introduced into a class; it always overrides the inherited one
pub struct IntroduceFinalizerAdvice {
    info: AdviceInfo,
    template: TemplateMember<MethodDecl>,
    settings: IntroductionSettings,
    partial: Option<PartiallyBoundTemplateMethod>,
    draft: Option<MethodBuilder>,
}

impl IntroduceFinalizerAdvice {
    pub fn new(info: AdviceInfo, template: TemplateMember<MethodDecl>, settings: IntroductionSettings) -> Self {
        Self {
            info,
            template,
            settings,
            partial: None,
            draft: None,
        }
    }
}

impl Advice for IntroduceFinalizerAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceFinalizer
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };
        if !compilation.is_class(self.info.target) {
            let type_name = compilation.display_name(self.info.target);
            diagnostics.report(
                d::CANNOT_INTRODUCE_FINALIZER_INTO_NON_CLASS
                    .create(&[self.info.aspect.as_str(), type_name.as_str()])
                    .on(type_name.clone()),
            );
            return Ok(());
        }

        let partial = PartiallyBoundTemplateMethod::new(compilation, &self.template, &self.settings.args)?;
        let builder = MethodBuilder::finalizer(ctx.ids, self.info.target, self.info.aspect.as_str());
        validate_draft(compilation, &self.info, DeclarationKind::Finalizer, &builder.base, target, diagnostics);
        self.partial = Some(partial);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let partial = take_draft(&mut self.partial, &self.info)?;
        let existing = ctx.compilation.finalizer_of(builder.base.declaring_type);

        let template = &self.template;
        let args = &self.settings.args;
        let bind = move |scope: &BindingScope<'_>, id: DeclId| -> Result<OverrideTemplates> {
            let template = if scope.is_introduced(id) {
                partial.bind_to(scope.compilation(), &[])?
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
