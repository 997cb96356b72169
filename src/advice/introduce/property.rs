use super::{
    apply_template, implement_introduction, require_target_type, resolve_scope, take_draft,
    validate_draft, BindingScope, BuildHook, IntroductionSettings, OverrideBinder,
};
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind};
use crate::builders::PropertyBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{DeclId, DeclarationKind, MethodDecl, PropertyDecl, TypeRef, Writeability};
use crate::templates::TemplateMember;
use crate::transformation::OverrideTemplates;

/// Where the introduced property comes from
#[derive(Debug, Clone)]
pub enum PropertySource {
    /// A template property; an auto-property template has no override semantics
    Template(TemplateMember<PropertyDecl>),
    /// Accessor templates given individually
    Accessors {
        name: String,
        ty: TypeRef,
        getter: Option<TemplateMember<MethodDecl>>,
        setter: Option<TemplateMember<MethodDecl>>,
    },
    /// Programmatic auto-property
    Auto { name: String, ty: TypeRef },
}

pub struct IntroducePropertyAdvice {
    info: AdviceInfo,
    source: PropertySource,
    settings: IntroductionSettings,
    build: Option<BuildHook<PropertyBuilder>>,
    getter: Option<TemplateMember<MethodDecl>>,
    setter: Option<TemplateMember<MethodDecl>>,
    draft: Option<PropertyBuilder>,
}

impl IntroducePropertyAdvice {
    pub fn new(
        info: AdviceInfo,
        source: PropertySource,
        settings: IntroductionSettings,
        build: Option<BuildHook<PropertyBuilder>>,
    ) -> Result<Self> {
        if let PropertySource::Accessors { getter: None, setter: None, .. } = &source {
            return Err(Error::InvalidAdviceParameters(
                "a property needs a getter or a setter template".into(),
            ));
        }
        Ok(Self {
            info,
            source,
            settings,
            build,
            getter: None,
            setter: None,
            draft: None,
        })
    }

    fn has_override_semantics(&self) -> bool {
        self.getter.is_some() || self.setter.is_some()
    }
}

impl Advice for IntroducePropertyAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceProperty
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };
        let aspect = self.info.aspect.as_str();

        let mut builder = match &self.source {
            PropertySource::Template(template) => {
                let property = compilation.require(template.declaration)?;
                let name = template.introduced_name(self.settings.name.as_deref());
                let mut builder = PropertyBuilder::new(
                    ctx.ids,
                    self.info.target,
                    name,
                    property.ty.clone(),
                    property.getter.is_some(),
                    property.setter.is_some(),
                    aspect,
                );
                apply_template(&mut builder.base, template, Some(&property.member), &self.settings, target, ctx.config);
                builder.ref_kind = property.ref_kind;
                builder.writeability = property.writeability;
                if property.is_auto {
                    builder.is_auto = true;
                    builder.initializer = property.initializer.clone();
                } else {
                    self.getter = property
                        .getter
                        .map(|g| TemplateMember::<MethodDecl>::accessor_of(compilation, template, g))
                        .transpose()?;
                    self.setter = property
                        .setter
                        .map(|s| TemplateMember::<MethodDecl>::accessor_of(compilation, template, s))
                        .transpose()?;
                }
                builder
            }
            PropertySource::Accessors { name, ty, getter, setter } => {
                let name = self.settings.name.clone().unwrap_or_else(|| name.clone());
                let mut builder = PropertyBuilder::new(
                    ctx.ids,
                    self.info.target,
                    name,
                    ty.clone(),
                    getter.is_some(),
                    setter.is_some(),
                    aspect,
                );
                let primary = getter.as_ref().or(setter.as_ref()).ok_or_else(|| {
                    Error::InvalidAdviceParameters("a property needs a getter or a setter template".into())
                })?;
                let method = compilation.require(primary.declaration)?;
                apply_template(&mut builder.base, primary, Some(&method.member), &self.settings, target, ctx.config);
                self.getter = getter.clone();
                self.setter = setter.clone();
                builder
            }
            PropertySource::Auto { name, ty } => {
                let name = self.settings.name.clone().unwrap_or_else(|| name.clone());
                let mut builder = PropertyBuilder::new(ctx.ids, self.info.target, name, ty.clone(), true, true, aspect);
                builder.is_auto = true;
                builder.writeability = Writeability::All;
                builder.base.is_static = resolve_scope(&self.settings, None, ctx.config).resolve(false, target.is_static);
                builder
            }
        };
        if let Some(build) = &self.build {
            build(&mut builder);
        }

        validate_draft(compilation, &self.info, DeclarationKind::Property, &builder.base, target, diagnostics);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let existing = ctx
            .compilation
            .find_closest_uniquely_named_member(builder.base.declaring_type, &builder.base.name);
        let has_initializer = builder.initializer.is_some();

        let getter = self.getter.as_ref();
        let setter = self.setter.as_ref();
        let args = &self.settings.args;
        let bind = move |scope: &BindingScope<'_>, id: DeclId| -> Result<OverrideTemplates> {
            scope.bind_accessors(id, getter, setter, args)
        };
        let bind = self
            .has_override_semantics()
            .then_some(&bind as OverrideBinder<'_>);

        implement_introduction(ctx, &self.info, builder, existing, self.settings.strategy, has_initializer, bind)
    }
}
