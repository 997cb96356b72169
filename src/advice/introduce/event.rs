use super::{
    apply_template, implement_introduction, require_target_type, resolve_scope, take_draft,
    validate_draft, BindingScope, BuildHook, IntroductionSettings, OverrideBinder,
};
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind};
use crate::builders::EventBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{DeclId, DeclarationKind, EventDecl, MethodDecl, TypeRef};
use crate::templates::TemplateMember;
use crate::transformation::OverrideTemplates;

/// Where the introduced event comes from
#[derive(Debug, Clone)]
pub enum EventSource {
    /// A template event; a template event field has no override semantics
    Template(TemplateMember<EventDecl>),
    /// Programmatic event field
    Field { name: String, ty: TypeRef },
}

#[derive(Debug, Clone)]
struct EventTemplates {
    adder: Option<TemplateMember<MethodDecl>>,
    remover: Option<TemplateMember<MethodDecl>>,
    raiser: Option<TemplateMember<MethodDecl>>,
}

pub struct IntroduceEventAdvice {
    info: AdviceInfo,
    source: EventSource,
    settings: IntroductionSettings,
    build: Option<BuildHook<EventBuilder>>,
    templates: Option<EventTemplates>,
    draft: Option<EventBuilder>,
}

impl IntroduceEventAdvice {
    pub fn new(
        info: AdviceInfo,
        source: EventSource,
        settings: IntroductionSettings,
        build: Option<BuildHook<EventBuilder>>,
    ) -> Self {
        Self {
            info,
            source,
            settings,
            build,
            templates: None,
            draft: None,
        }
    }
}

impl Advice for IntroduceEventAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceEvent
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
            EventSource::Template(template) => {
                let event = compilation.require(template.declaration)?;
                let name = template.introduced_name(self.settings.name.as_deref());
                let mut builder = EventBuilder::new(ctx.ids, self.info.target, name, event.ty.clone(), aspect);
                apply_template(&mut builder.base, template, Some(&event.member), &self.settings, target, ctx.config);
                if event.is_event_field {
                    builder.is_event_field = true;
                    builder.initializer = event.initializer.clone();
                } else {
                    let accessor = |id: DeclId| TemplateMember::<MethodDecl>::accessor_of(compilation, template, id);
                    self.templates = Some(EventTemplates {
                        adder: Some(accessor(event.adder)?),
                        remover: Some(accessor(event.remover)?),
                        raiser: event.raiser.map(accessor).transpose()?,
                    });
                    if event.raiser.is_some() {
                        builder.add_raiser(ctx.ids);
                    }
                }
                builder
            }
            EventSource::Field { name, ty } => {
                let name = self.settings.name.clone().unwrap_or_else(|| name.clone());
                let mut builder = EventBuilder::new(ctx.ids, self.info.target, name, ty.clone(), aspect);
                builder.is_event_field = true;
                builder.base.is_static = resolve_scope(&self.settings, None, ctx.config).resolve(false, target.is_static);
                builder
            }
        };
        if let Some(build) = &self.build {
            build(&mut builder);
        }

        validate_draft(compilation, &self.info, DeclarationKind::Event, &builder.base, target, diagnostics);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let existing = ctx
            .compilation
            .find_closest_uniquely_named_member(builder.base.declaring_type, &builder.base.name);
        let has_initializer = builder.initializer.is_some();

        let templates = self.templates.as_ref();
        let args = &self.settings.args;
        let bind = move |scope: &BindingScope<'_>, id: DeclId| -> Result<OverrideTemplates> {
            let Some(t) = templates else {
                return Err(Error::AssertionFailed("an event field has no accessor templates".into()));
            };
            scope.bind_event_accessors(id, t.adder.as_ref(), t.remover.as_ref(), t.raiser.as_ref(), args)
        };
        let bind = templates.map(|_| &bind as OverrideBinder<'_>);

        implement_introduction(ctx, &self.info, builder, existing, self.settings.strategy, has_initializer, bind)
    }
}
