//! Introduction advice
//!
//! Every introduction has the same shape: resolve the name and scope, build a
//! draft from the template, validate it against the target type, then run the
//! conflict state machine in `implement`. Unless the member has no body to
//! inject (fields, auto-properties, event fields), the introduction is paired
//! with an override transformation binding the template to the new member.

mod constructor;
mod event;
mod field;
mod finalizer;
mod indexer;
mod method;
mod operator;
mod property;

pub use constructor::IntroduceConstructorAdvice;
pub use event::{EventSource, IntroduceEventAdvice};
pub use field::{FieldSource, IntroduceFieldAdvice};
pub use finalizer::IntroduceFinalizerAdvice;
pub use indexer::IntroduceIndexerAdvice;
pub use method::IntroduceMethodAdvice;
pub use operator::{IntroduceOperatorAdvice, OperatorSignature};
pub use property::{IntroducePropertyAdvice, PropertySource};

use super::conflict::{resolve_conflict, ConflictCandidate, Resolution};
use super::diagnostics as d;
use super::{
    struct_fields, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceOutcome,
    IntroductionScope, OverrideStrategy,
};
use crate::builders::{IntroducedMember, MemberBuilderBase, MemberDraft};
use crate::config::WeaverConfig;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{
    Compilation, DeclId, Declaration, DeclarationKind, MemberInfo, MethodDecl, TypeDecl, TypeRef,
};
use crate::object_reader::ObjectReader;
use crate::templates::{
    bind_template, copyable_attributes, BindingTarget, BoundTemplateMethod, TemplateMember,
};
use crate::transformation::{OverrideTemplates, TransformationKind};
use tracing::debug;

/// Request settings shared by every introduction
#[derive(Debug, Clone, Default)]
pub struct IntroductionSettings {
    /// Overrides the template name
    pub name: Option<String>,
    pub scope: IntroductionScope,
    pub strategy: OverrideStrategy,
    /// Compile-time template arguments
    pub args: ObjectReader,
}

/// Customization applied to a draft after the template has been copied
pub type BuildHook<B> = Box<dyn Fn(&mut B)>;

/// Copy the template modifiers onto `base` and resolve staticity
///
/// The explicit scope wins over the scope of the template attribute, which
/// wins over the configured default.
pub(crate) fn apply_template<T>(
    base: &mut MemberBuilderBase,
    template: &TemplateMember<T>,
    template_member: Option<&MemberInfo>,
    settings: &IntroductionSettings,
    target: &TypeDecl,
    config: &WeaverConfig,
) {
    base.accessibility = template.accessibility;
    base.is_virtual = template
        .info
        .is_virtual
        .unwrap_or_else(|| template_member.is_some_and(|m| m.is_virtual));
    base.is_sealed = template
        .info
        .is_sealed
        .unwrap_or_else(|| template_member.is_some_and(|m| m.is_sealed));
    base.is_static = resolve_scope(settings, template.info.scope, config)
        .resolve(template.is_static, target.is_static);
    if let Some(member) = template_member {
        base.attributes = copyable_attributes(&member.attributes, &config.templates.excluded_attributes);
    }
}

pub(crate) fn resolve_scope(
    settings: &IntroductionSettings,
    template_scope: Option<IntroductionScope>,
    config: &WeaverConfig,
) -> IntroductionScope {
    [
        settings.scope,
        template_scope.unwrap_or_default(),
        config.introduction.default_scope,
    ]
    .into_iter()
    .find(|s| *s != IntroductionScope::Default)
    .unwrap_or_default()
}

/// Reject drafts that can never be legal in `target`
pub(crate) fn validate_draft(
    compilation: &Compilation,
    info: &AdviceInfo,
    kind: DeclarationKind,
    base: &MemberBuilderBase,
    target: &TypeDecl,
    diagnostics: &mut DiagnosticBag,
) {
    let type_name = compilation.display_name(base.declaring_type);
    let kind_name = kind.to_string();
    let args = [
        info.aspect.as_str(),
        kind_name.as_str(),
        base.name.as_str(),
        type_name.as_str(),
    ];

    let descriptor = if target.is_interface() {
        Some(d::CANNOT_INTRODUCE_INTO_INTERFACE)
    } else if base.is_static && base.is_virtual {
        Some(d::CANNOT_INTRODUCE_STATIC_VIRTUAL_MEMBER)
    } else if base.is_static && base.is_sealed {
        Some(d::CANNOT_INTRODUCE_STATIC_SEALED_MEMBER)
    } else if !base.is_static && target.is_static {
        Some(d::CANNOT_INTRODUCE_INSTANCE_MEMBER_INTO_STATIC_TYPE)
    } else if base.is_virtual && target.forbids_virtual_members() {
        Some(d::CANNOT_INTRODUCE_VIRTUAL_TO_TARGET_TYPE)
    } else {
        None
    };

    if let Some(descriptor) = descriptor {
        diagnostics.report(descriptor.create(&args).on(type_name.clone()));
    }
}

/// Declarations visible while binding: the snapshot, plus the member an
/// advice is about to introduce
pub(crate) struct BindingScope<'a> {
    compilation: &'a Compilation,
    introduced: Option<&'a IntroducedMember>,
}

impl<'a> BindingScope<'a> {
    pub(crate) fn existing(compilation: &'a Compilation) -> Self {
        Self {
            compilation,
            introduced: None,
        }
    }

    pub(crate) fn with_introduced(compilation: &'a Compilation, member: &'a IntroducedMember) -> Self {
        Self {
            compilation,
            introduced: Some(member),
        }
    }

    pub(crate) fn compilation(&self) -> &'a Compilation {
        self.compilation
    }

    pub(crate) fn is_introduced(&self, id: DeclId) -> bool {
        self.introduced
            .is_some_and(|m| m.declarations.iter().any(|(i, _)| *i == id))
    }

    pub(crate) fn declaration(&self, id: DeclId) -> Option<&'a Declaration> {
        self.introduced
            .and_then(|m| m.declarations.iter().find(|(i, _)| *i == id).map(|(_, d)| d))
            .or_else(|| self.compilation.declaration(id))
    }

    fn require(&self, id: DeclId) -> Result<&'a Declaration> {
        self.declaration(id)
            .ok_or_else(|| Error::AssertionFailed(format!("unknown declaration {}", id)))
    }

    fn parameters(&self, ids: &[DeclId]) -> Vec<(String, TypeRef)> {
        ids.iter()
            .filter_map(|id| match self.declaration(*id) {
                Some(Declaration::Parameter(p)) => Some((p.name.clone(), p.ty.clone())),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn parameter_names(&self, owner: DeclId) -> Vec<String> {
        let ids = match self.declaration(owner) {
            Some(Declaration::Method(m)) => m.parameters.clone(),
            Some(Declaration::Constructor(c)) => c.parameters.clone(),
            Some(Declaration::Indexer(i)) => i.parameters.clone(),
            _ => Vec::new(),
        };
        self.parameters(&ids).into_iter().map(|(name, _)| name).collect()
    }

    /// Signature of a method, accessor, finalizer or constructor; accessors of
    /// indexers see the index parameters first
    pub(crate) fn binding_target(&self, id: DeclId, index_parameters: &[DeclId]) -> Result<BindingTarget> {
        match self.require(id)? {
            Declaration::Method(m) => {
                let mut parameters = self.parameters(index_parameters);
                parameters.extend(self.parameters(&m.parameters));
                Ok(BindingTarget {
                    return_type: m.return_type.clone(),
                    parameters,
                    type_parameters: m.type_parameters.iter().map(|p| p.name.clone()).collect(),
                    operator_kind: m.operator_kind,
                })
            }
            Declaration::Constructor(c) => Ok(BindingTarget {
                return_type: TypeRef::Void,
                parameters: self.parameters(&c.parameters),
                type_parameters: Vec::new(),
                operator_kind: crate::model::OperatorKind::None,
            }),
            other => Err(Error::AssertionFailed(format!(
                "cannot bind a template to a {}",
                other.kind()
            ))),
        }
    }

    pub(crate) fn bind(
        &self,
        template: &TemplateMember<MethodDecl>,
        target: DeclId,
        index_parameters: &[DeclId],
        args: &ObjectReader,
    ) -> Result<BoundTemplateMethod> {
        let target = self.binding_target(target, index_parameters)?;
        bind_template(self.compilation, template, &target, args)
    }

    /// Bind getter and setter templates to a property or indexer
    pub(crate) fn bind_accessors(
        &self,
        member: DeclId,
        getter: Option<&TemplateMember<MethodDecl>>,
        setter: Option<&TemplateMember<MethodDecl>>,
        args: &ObjectReader,
    ) -> Result<OverrideTemplates> {
        let (getter_id, setter_id, index) = match self.require(member)? {
            Declaration::Property(p) => (p.getter, p.setter, Vec::new()),
            Declaration::Indexer(i) => (i.getter, i.setter, i.parameters.clone()),
            other => {
                return Err(Error::AssertionFailed(format!(
                    "{} has no get or set accessors",
                    other.kind()
                )))
            }
        };
        Ok(OverrideTemplates::Accessors {
            getter: self.bind_optional(getter, getter_id, &index, args)?,
            setter: self.bind_optional(setter, setter_id, &index, args)?,
        })
    }

    /// Bind add, remove and raise templates to an event; each is independent
    pub(crate) fn bind_event_accessors(
        &self,
        member: DeclId,
        adder: Option<&TemplateMember<MethodDecl>>,
        remover: Option<&TemplateMember<MethodDecl>>,
        raiser: Option<&TemplateMember<MethodDecl>>,
        args: &ObjectReader,
    ) -> Result<OverrideTemplates> {
        let Declaration::Event(event) = self.require(member)? else {
            return Err(Error::AssertionFailed(format!(
                "{} is not an event",
                self.compilation.display_name(member)
            )));
        };
        Ok(OverrideTemplates::EventAccessors {
            adder: self.bind_optional(adder, Some(event.adder), &[], args)?,
            remover: self.bind_optional(remover, Some(event.remover), &[], args)?,
            raiser: self.bind_optional(raiser, event.raiser, &[], args)?,
        })
    }

    fn bind_optional(
        &self,
        template: Option<&TemplateMember<MethodDecl>>,
        accessor: Option<DeclId>,
        index: &[DeclId],
        args: &ObjectReader,
    ) -> Result<Option<BoundTemplateMethod>> {
        match (template, accessor) {
            (Some(template), Some(accessor)) => Ok(Some(self.bind(template, accessor, index, args)?)),
            _ => Ok(None),
        }
    }
}

/// Binds the override of the member `id` visible through the scope
pub(crate) type OverrideBinder<'b> = &'b dyn Fn(&BindingScope<'_>, DeclId) -> Result<OverrideTemplates>;

/// Run the conflict state machine for `builder`
///
/// `bind` is `None` for members without override semantics. When
/// `has_initializer` is set and the target is a struct, the transformations
/// giving the struct an explicit parameterless constructor are added.
pub(crate) fn implement_introduction<B: MemberDraft>(
    ctx: &mut AdviceContext<'_>,
    info: &AdviceInfo,
    mut builder: B,
    existing: Option<DeclId>,
    strategy: OverrideStrategy,
    has_initializer: bool,
    bind: Option<OverrideBinder<'_>>,
) -> Result<AdviceImplementationResult> {
    let compilation = ctx.compilation;
    let strategy = ctx.config.introduction_strategy(strategy);
    let resolution = {
        let base = builder.base();
        let candidate = ConflictCandidate {
            kind: builder.kind(),
            name: &base.name,
            is_static: base.is_static,
            value_type: builder.value_type(),
            target_type: base.declaring_type,
        };
        resolve_conflict(compilation, &info.aspect, candidate, existing, strategy)?
    };

    let outcome = match resolution {
        Resolution::Fail(diagnostic) => return Ok(AdviceImplementationResult::failed([diagnostic])),
        Resolution::Ignore(id) => return Ok(AdviceImplementationResult::ignored(Some(id))),
        Resolution::OverrideExisting(id) => {
            let mut transformations = Vec::new();
            if let Some(bind) = bind {
                let templates = bind(&BindingScope::existing(compilation), id)?;
                transformations.push(TransformationKind::OverrideMember {
                    target: id,
                    templates,
                });
            }
            debug!(aspect = %info.aspect, member = %compilation.display_name(id), "overriding existing member");
            return Ok(AdviceImplementationResult::success(
                AdviceOutcome::Override,
                Some(id),
                transformations,
            ));
        }
        Resolution::Introduce => AdviceOutcome::Default,
        Resolution::IntroduceOverride(id) => {
            let base = builder.base_mut();
            base.is_override = true;
            base.is_virtual = false;
            base.is_new = false;
            base.overridden = Some(id);
            AdviceOutcome::Override
        }
        Resolution::IntroduceNew(id) => {
            let base = builder.base_mut();
            base.is_new = true;
            base.overridden = Some(id);
            AdviceOutcome::New
        }
    };

    let member = builder.freeze();
    let id = member.member;
    let declaring_type = member.declaring_type;
    let is_static = builder.base().is_static;
    let templates = match bind {
        Some(bind) => Some(bind(&BindingScope::with_introduced(compilation, &member), id)?),
        None => None,
    };

    debug!(aspect = %info.aspect, member = member.name(), ?outcome, "introducing member");
    let mut transformations = vec![TransformationKind::IntroduceMember { member }];
    if let Some(templates) = templates {
        transformations.push(TransformationKind::OverrideMember {
            target: id,
            templates,
        });
    }
    if has_initializer && !is_static {
        transformations.extend(struct_fields::parameterless_constructor(ctx, info, declaring_type)?);
    }

    Ok(AdviceImplementationResult::success(outcome, Some(id), transformations))
}

/// Take the draft out of an advice; `implement` runs once
pub(crate) fn take_draft<B>(draft: &mut Option<B>, info: &AdviceInfo) -> Result<B> {
    draft.take().ok_or_else(|| {
        Error::AssertionFailed(format!(
            "advice of '{}' on {} was implemented twice or never initialized",
            info.aspect, info.target
        ))
    })
}

/// The target type of an introduction, or the wrong-kind diagnostic
pub(crate) fn require_target_type<'c>(
    compilation: &'c Compilation,
    info: &AdviceInfo,
    advice: super::AdviceKind,
    diagnostics: &mut DiagnosticBag,
) -> Option<&'c TypeDecl> {
    let target = compilation.type_decl(info.target);
    if target.is_none() {
        diagnostics.report(info.wrong_target_kind(compilation, advice));
    }
    target
}
