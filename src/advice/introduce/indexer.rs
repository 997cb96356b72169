use super::{
    apply_template, implement_introduction, require_target_type, take_draft, validate_draft,
    BindingScope, BuildHook, IntroductionSettings, OverrideBinder,
};
use crate::advice::diagnostics as d;
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind};
use crate::builders::IndexerBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{DeclId, DeclarationKind, MethodDecl, TypeRef};
use crate::templates::TemplateMember;
use crate::transformation::OverrideTemplates;

/// Indexer introduced from individual accessor templates
///
/// Index parameters are visible to both accessor templates by name.
pub struct IntroduceIndexerAdvice {
    info: AdviceInfo,
    ty: TypeRef,
    parameters: Vec<(String, TypeRef)>,
    getter: Option<TemplateMember<MethodDecl>>,
    setter: Option<TemplateMember<MethodDecl>>,
    settings: IntroductionSettings,
    build: Option<BuildHook<IndexerBuilder>>,
    draft: Option<IndexerBuilder>,
}

impl IntroduceIndexerAdvice {
    pub fn new(
        info: AdviceInfo,
        ty: TypeRef,
        parameters: Vec<(String, TypeRef)>,
        getter: Option<TemplateMember<MethodDecl>>,
        setter: Option<TemplateMember<MethodDecl>>,
        settings: IntroductionSettings,
        build: Option<BuildHook<IndexerBuilder>>,
    ) -> Result<Self> {
        if getter.is_none() && setter.is_none() {
            return Err(Error::InvalidAdviceParameters(
                "an indexer needs a getter or a setter template".into(),
            ));
        }
        Ok(Self {
            info,
            ty,
            parameters,
            getter,
            setter,
            settings,
            build,
            draft: None,
        })
    }
}

impl Advice for IntroduceIndexerAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceIndexer
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };
        let type_name = compilation.display_name(self.info.target);
        let args = [self.info.aspect.as_str(), type_name.as_str()];

        if self.parameters.is_empty() {
            diagnostics.report(
                d::CANNOT_INTRODUCE_INDEXER_WITHOUT_PARAMETERS
                    .create(&args)
                    .on(type_name.clone()),
            );
            return Ok(());
        }

        let mut builder = IndexerBuilder::new(
            ctx.ids,
            self.info.target,
            self.ty.clone(),
            self.getter.is_some(),
            self.setter.is_some(),
            self.info.aspect.as_str(),
        );
        if let Some(primary) = self.getter.as_ref().or(self.setter.as_ref()) {
            let method = compilation.require(primary.declaration)?;
            apply_template(&mut builder.base, primary, Some(&method.member), &self.settings, target, ctx.config);
        }
        for (name, ty) in &self.parameters {
            builder.add_parameter(ctx.ids, name.clone(), ty.clone());
        }
        if let Some(build) = &self.build {
            build(&mut builder);
        }

        if builder.base.is_static {
            diagnostics.report(d::CANNOT_INTRODUCE_STATIC_INDEXER.create(&args).on(type_name));
            return Ok(());
        }
        validate_draft(compilation, &self.info, DeclarationKind::Indexer, &builder.base, target, diagnostics);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let existing = ctx
            .compilation
            .find_closest_visible_indexer(builder.base.declaring_type, &builder.parameter_types());

        let getter = self.getter.as_ref();
        let setter = self.setter.as_ref();
        let args = &self.settings.args;
        let bind = move |scope: &BindingScope<'_>, id: DeclId| -> Result<OverrideTemplates> {
            scope.bind_accessors(id, getter, setter, args)
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
