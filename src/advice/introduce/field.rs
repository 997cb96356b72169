use super::{
    apply_template, implement_introduction, require_target_type, resolve_scope, take_draft,
    validate_draft, BuildHook, IntroductionSettings,
};
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind};
use crate::builders::FieldBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::Result;
use crate::model::{DeclarationKind, FieldDecl, TypeRef, Writeability};
use crate::templates::TemplateMember;

/// Where the introduced field comes from
#[derive(Debug, Clone)]
pub enum FieldSource {
    Template(TemplateMember<FieldDecl>),
    /// Declared programmatically; the name is required
    Declared { name: String, ty: TypeRef },
}

/// Fields have no override semantics: the field is its own implementation
pub struct IntroduceFieldAdvice {
    info: AdviceInfo,
    source: FieldSource,
    settings: IntroductionSettings,
    build: Option<BuildHook<FieldBuilder>>,
    draft: Option<FieldBuilder>,
}

impl IntroduceFieldAdvice {
    pub fn new(
        info: AdviceInfo,
        source: FieldSource,
        settings: IntroductionSettings,
        build: Option<BuildHook<FieldBuilder>>,
    ) -> Self {
        Self {
            info,
            source,
            settings,
            build,
            draft: None,
        }
    }
}

impl Advice for IntroduceFieldAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceField
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };

        let mut builder = match &self.source {
            FieldSource::Template(template) => {
                let field = compilation.require(template.declaration)?;
                let name = template.introduced_name(self.settings.name.as_deref());
                let mut builder = FieldBuilder::new(
                    ctx.ids,
                    self.info.target,
                    name,
                    field.ty.clone(),
                    self.info.aspect.as_str(),
                );
                apply_template(&mut builder.base, template, Some(&field.member), &self.settings, target, ctx.config);
                builder.writeability = field.writeability;
                builder.initializer = field.initializer.clone();
                builder
            }
            FieldSource::Declared { name, ty } => {
                let name = self.settings.name.clone().unwrap_or_else(|| name.clone());
                let mut builder = FieldBuilder::new(ctx.ids, self.info.target, name, ty.clone(), self.info.aspect.as_str());
                builder.base.is_static = resolve_scope(&self.settings, None, ctx.config).resolve(false, target.is_static);
                builder
            }
        };
        if let Some(build) = &self.build {
            build(&mut builder);
        }
        if target.is_struct() && target.is_readonly && !builder.base.is_static {
            builder.writeability = Writeability::ConstructorOnly;
        }

        validate_draft(compilation, &self.info, DeclarationKind::Field, &builder.base, target, diagnostics);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let existing = ctx
            .compilation
            .find_closest_uniquely_named_member(builder.base.declaring_type, &builder.base.name);
        let has_initializer = builder.initializer.is_some();
        implement_introduction(ctx, &self.info, builder, existing, self.settings.strategy, has_initializer, None)
    }
}
