use super::{InterfaceMemberSpecification, InterfaceSpecification};
use crate::advice::diagnostics as d;
use crate::advice::introduce::BindingScope;
use crate::advice::{
    AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceOutcome,
    InterfaceMemberOverrideStrategy, OverrideStrategy,
};
use crate::builders::{EventBuilder, IntroducedMember, MemberDraft, MethodBuilder, PropertyBuilder};
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::model::{
    Accessibility, Compilation, DeclId, Declaration, EventDecl, MethodDecl, PropertyDecl, TypeRef,
};
use crate::object_reader::ObjectReader;
use crate::templates::{copyable_attributes, TemplateMember};
use crate::transformation::{OverrideTemplates, TransformationKind};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Resolve conflicts with the target type and emit the interface transformations
pub(super) fn implement(
    ctx: &mut AdviceContext<'_>,
    info: &AdviceInfo,
    interface: &TypeRef,
    strategy: OverrideStrategy,
    plan: &[InterfaceSpecification],
    args: &ObjectReader,
) -> Result<AdviceImplementationResult> {
    let compilation = ctx.compilation;
    let target = info.target;
    let aspect = info.aspect.as_str();

    if compilation.implements_interface(target, interface) {
        if strategy == OverrideStrategy::Ignore {
            debug!(aspect, interface = %interface, "interface already implemented, ignoring");
            return Ok(AdviceImplementationResult::ignored(Some(target)));
        }
        let type_name = compilation.display_name(target);
        let interface_name = interface.to_string();
        return Ok(AdviceImplementationResult::failed([d::INTERFACE_IS_ALREADY_IMPLEMENTED
            .create(&[aspect, interface_name.as_str(), type_name.as_str()])
            .on(type_name)]));
    }

    let implemented = compilation.all_implemented_interfaces(target);
    let mut transformations = Vec::new();
    let mut diagnostics = Vec::new();

    for specification in plan {
        if implemented.contains(&specification.interface) {
            trace!(interface = %specification.interface, "inherited from the target hierarchy");
            continue;
        }
        let substitution = compilation.substitution_for(&specification.interface);
        let mut member_map = Vec::with_capacity(specification.members.len());

        for member in &specification.members {
            let implementation = MemberImplementation {
                ctx: &mut *ctx,
                info,
                specification,
                member,
                substitution: &substitution,
                args,
            };
            match implementation.run()? {
                Ok((id, mut emitted)) => {
                    member_map.push((member.interface_member, id));
                    transformations.append(&mut emitted);
                }
                Err(mut reported) => diagnostics.append(&mut reported),
            }
        }

        transformations.push(TransformationKind::IntroduceInterface {
            target_type: target,
            interface: specification.interface.clone(),
            member_map,
        });
    }

    if !diagnostics.is_empty() {
        return Ok(AdviceImplementationResult::failed(diagnostics));
    }
    debug!(
        aspect,
        interface = %interface,
        ty = %compilation.display_name(target),
        count = transformations.len(),
        "interface implemented"
    );
    Ok(AdviceImplementationResult::success(
        AdviceOutcome::Default,
        Some(target),
        transformations,
    ))
}

/// Member id and transformations, or the diagnostics preventing it
type MemberOutcome = std::result::Result<(DeclId, Vec<TransformationKind>), Vec<Diagnostic>>;

struct MemberImplementation<'c, 'a, 'p> {
    ctx: &'c mut AdviceContext<'a>,
    info: &'p AdviceInfo,
    specification: &'p InterfaceSpecification,
    member: &'p InterfaceMemberSpecification,
    substitution: &'p BTreeMap<String, TypeRef>,
    args: &'p ObjectReader,
}

impl MemberImplementation<'_, '_, '_> {
    fn run(mut self) -> Result<MemberOutcome> {
        let compilation = self.ctx.compilation;
        let interface_member = compilation.require_declaration(self.member.interface_member)?;
        let template = self
            .member
            .template
            .map(|id| compilation.require_declaration(id))
            .transpose()?;

        let mut is_explicit = self.member.is_explicit;
        let mut redirect_to = self.member.redirect_to;

        if !is_explicit {
            if let Some(existing) = self.existing_member(compilation, interface_member) {
                match self.member.when_exists {
                    InterfaceMemberOverrideStrategy::Default | InterfaceMemberOverrideStrategy::Fail => {
                        let member_name = compilation.display_name(self.member.interface_member);
                        let type_name = compilation.display_name(self.info.target);
                        let existing_name = compilation.display_name(existing);
                        return Ok(Err(vec![d::IMPLICIT_INTERFACE_MEMBER_ALREADY_EXISTS
                            .create(&[
                                self.info.aspect.as_str(),
                                member_name.as_str(),
                                type_name.as_str(),
                                existing_name.as_str(),
                            ])
                            .on(type_name.clone())]));
                    }
                    InterfaceMemberOverrideStrategy::MakeExplicit => {
                        trace!(member = %self.member.name, "existing member, implementing explicitly");
                        is_explicit = true;
                        redirect_to = Some(existing);
                    }
                }
            }
        }

        if let (Declaration::Property(required), Some(Declaration::Property(provided))) = (interface_member, template) {
            let problems = self.accessor_problems(compilation, required, provided, is_explicit);
            if !problems.is_empty() {
                return Ok(Err(problems));
            }
        }

        let introduced = self.build(compilation, interface_member, template, is_explicit)?;
        let id = introduced.member;
        let body = match (redirect_to, self.member.template) {
            (Some(target), _) => Some(TransformationKind::RedirectMember { source: id, target }),
            (None, Some(template)) => self
                .bind(compilation, &introduced, template)?
                .map(|templates| TransformationKind::OverrideMember { target: id, templates }),
            (None, None) => {
                return Err(Error::AssertionFailed(format!(
                    "interface member '{}' has neither a template nor a redirection",
                    self.member.name
                )))
            }
        };

        debug!(
            member = introduced.name(),
            explicit = is_explicit,
            redirected = redirect_to.is_some(),
            "implementing interface member"
        );
        let mut transformations = vec![TransformationKind::IntroduceMember { member: introduced }];
        transformations.extend(body);
        Ok(Ok((id, transformations)))
    }

    /// Visible member of the target type an implicit implementation would clash with
    fn existing_member(&self, compilation: &Compilation, interface_member: &Declaration) -> Option<DeclId> {
        let target = self.info.target;
        match interface_member {
            Declaration::Method(m) => {
                let parameter_types: Vec<TypeRef> = compilation
                    .parameter_types(&m.parameters)
                    .iter()
                    .map(|t| t.substitute(self.substitution))
                    .collect();
                compilation.find_closest_visible_method(target, &m.member.name, &parameter_types)
            }
            _ => compilation.find_closest_uniquely_named_member(target, interface_member.name()),
        }
    }

    /// `InterfacePropertyIsMissingAccessor` and `ExplicitInterfacePropertyHasSuperficialAccessor`
    fn accessor_problems(
        &self,
        compilation: &Compilation,
        required: &PropertyDecl,
        provided: &PropertyDecl,
        is_explicit: bool,
    ) -> Vec<Diagnostic> {
        let member_name = compilation.display_name(self.member.interface_member);
        let template_name = self
            .member
            .template
            .map(|id| compilation.display_name(id))
            .unwrap_or_default();
        let setter_name = if required.writeability == crate::model::Writeability::InitOnly {
            "init"
        } else {
            "set"
        };
        let mut problems = Vec::new();
        for (accessor, in_interface, in_template) in [
            ("get", required.getter.is_some(), provided.getter.is_some()),
            (setter_name, required.setter.is_some(), provided.setter.is_some()),
        ] {
            let descriptor = match (in_interface, in_template) {
                (true, false) => d::INTERFACE_PROPERTY_IS_MISSING_ACCESSOR,
                (false, true) if is_explicit => d::EXPLICIT_INTERFACE_PROPERTY_HAS_SUPERFICIAL_ACCESSOR,
                _ => continue,
            };
            problems.push(
                descriptor
                    .create(&[
                        self.info.aspect.as_str(),
                        member_name.as_str(),
                        template_name.as_str(),
                        accessor,
                    ])
                    .on(template_name.clone()),
            );
        }
        problems
    }

    fn build(
        &mut self,
        compilation: &Compilation,
        interface_member: &Declaration,
        template: Option<&Declaration>,
        is_explicit: bool,
    ) -> Result<IntroducedMember> {
        let interface_name = compilation
            .type_decl(self.specification.declaration)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| self.specification.interface.to_string());
        let name = if is_explicit {
            format!("{}.{}", interface_name, self.member.name)
        } else {
            self.member.name.clone()
        };
        let attributes = template
            .map(|t| copyable_attributes(t.attributes(), &self.ctx.config.templates.excluded_attributes))
            .unwrap_or_default();
        let target = self.info.target;
        let aspect = self.info.aspect.as_str();
        let ids = &mut *self.ctx.ids;

        let mut draft: Box<dyn MemberDraft> = match interface_member {
            Declaration::Method(m) => {
                let mut builder = MethodBuilder::new(ids, target, name, aspect);
                builder.return_type = m.return_type.substitute(self.substitution);
                builder.return_ref_kind = m.return_ref_kind;
                builder.is_async = matches!(template, Some(Declaration::Method(t)) if t.is_async);
                for id in &m.parameters {
                    if let Some(Declaration::Parameter(p)) = compilation.declaration(*id) {
                        let parameter = builder.add_parameter(ids, p.name.clone(), p.ty.substitute(self.substitution));
                        parameter.ref_kind = p.ref_kind;
                    }
                }
                Box::new(builder)
            }
            Declaration::Property(p) => {
                let mut builder = PropertyBuilder::new(
                    ids,
                    target,
                    name,
                    p.ty.substitute(self.substitution),
                    p.getter.is_some(),
                    p.setter.is_some(),
                    aspect,
                );
                builder.ref_kind = p.ref_kind;
                builder.writeability = p.writeability;
                if let Some(Declaration::Property(t)) = template {
                    builder.is_auto = t.is_auto;
                    builder.initializer = t.initializer.clone();
                }
                Box::new(builder)
            }
            Declaration::Event(e) => {
                let mut builder = EventBuilder::new(ids, target, name, e.ty.substitute(self.substitution), aspect);
                if let Some(Declaration::Event(t)) = template {
                    builder.is_event_field = t.is_event_field;
                    builder.initializer = t.initializer.clone();
                    if t.raiser.is_some() {
                        builder.add_raiser(ids);
                    }
                }
                Box::new(builder)
            }
            other => {
                return Err(Error::AssertionFailed(format!(
                    "cannot implement an interface {}",
                    other.kind()
                )))
            }
        };

        let base = draft.base_mut();
        base.accessibility = if is_explicit {
            Accessibility::Private
        } else {
            Accessibility::Public
        };
        base.explicit_interface = is_explicit.then(|| self.specification.interface.clone());
        base.attributes = attributes;
        Ok(draft.freeze())
    }

    /// Override templates for the introduced member; `None` when the member
    /// has no body to inject
    fn bind(
        &self,
        compilation: &Compilation,
        introduced: &IntroducedMember,
        template: DeclId,
    ) -> Result<Option<OverrideTemplates>> {
        let scope = BindingScope::with_introduced(compilation, introduced);
        let id = introduced.member;
        match compilation.require_declaration(template)? {
            Declaration::Method(_) => {
                let template = TemplateMember::<MethodDecl>::from_declaration(compilation, template)?;
                Ok(Some(OverrideTemplates::Method {
                    template: scope.bind(&template, id, &[], self.args)?,
                }))
            }
            Declaration::Property(p) if p.is_auto => Ok(None),
            Declaration::Property(p) => {
                let owner = TemplateMember::<PropertyDecl>::from_declaration(compilation, template)?;
                let accessor = |id: Option<DeclId>| {
                    id.map(|id| TemplateMember::<MethodDecl>::accessor_of(compilation, &owner, id))
                        .transpose()
                };
                let getter = accessor(p.getter)?;
                let setter = accessor(p.setter)?;
                scope
                    .bind_accessors(id, getter.as_ref(), setter.as_ref(), self.args)
                    .map(Some)
            }
            Declaration::Event(e) if e.is_event_field => Ok(None),
            Declaration::Event(e) => {
                let owner = TemplateMember::<EventDecl>::from_declaration(compilation, template)?;
                let accessor = |id: Option<DeclId>| {
                    id.map(|id| TemplateMember::<MethodDecl>::accessor_of(compilation, &owner, id))
                        .transpose()
                };
                let adder = accessor(Some(e.adder))?;
                let remover = accessor(Some(e.remover))?;
                let raiser = accessor(e.raiser)?;
                scope
                    .bind_event_accessors(id, adder.as_ref(), remover.as_ref(), raiser.as_ref(), self.args)
                    .map(Some)
            }
            other => Err(Error::AssertionFailed(format!(
                "a {} cannot be an interface member template",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ImplementInterfaceAdvice, MemberRedirection};
    use crate::advice::{Advice, AdviceContext, AdviceInfo, AdviceOutcome, OverrideStrategy};
    use crate::config::WeaverConfig;
    use crate::diagnostics::DiagnosticBag;
    use crate::model::{Accessibility, Compilation, Declaration, TypeRef};
    use crate::object_reader::ObjectReader;
    use crate::transformation::TransformationKind;
    use pretty_assertions::assert_eq;

    const MODEL: &str = r#"
types:
  - name: Ns.IFoo
    kind: interface
    members:
      - kind: method
        name: M
        accessibility: public
        is_abstract: true
  - name: Ns.IBox
    kind: interface
    type_parameters:
      - name: T
    members:
      - kind: property
        name: Value
        type: T
        accessibility: public
        is_abstract: true
        get: {}
  - name: Ns.IOverloads
    kind: interface
    members:
      - kind: method
        name: M
        accessibility: public
        is_abstract: true
        parameters:
          - name: value
            type: int
      - kind: method
        name: M
        accessibility: public
        is_abstract: true
        parameters:
          - name: value
            type: string
  - name: Aspects.Explicit
    members:
      - kind: method
        name: M
        accessibility: public
        attributes:
          - type: InterfaceMember
            arguments:
              WhenExists: make_explicit
  - name: Aspects.Strict
    members:
      - kind: method
        name: M
        accessibility: public
        attributes:
          - type: InterfaceMember
  - name: Aspects.Boxing
    members:
      - kind: property
        name: Value
        type: int
        accessibility: public
        attributes:
          - type: InterfaceMember
        get: {}
  - name: Aspects.Empty
  - name: App.Target
    members:
      - kind: method
        name: M
        accessibility: public
  - name: App.Fresh
  - name: App.Overloads
    members:
      - kind: method
        name: TakeInt
        accessibility: public
        parameters:
          - name: value
            type: int
      - kind: method
        name: TakeText
        accessibility: public
        parameters:
          - name: value
            type: string
"#;

    struct Run {
        diagnostics: DiagnosticBag,
        result: Option<crate::advice::AdviceImplementationResult>,
    }

    fn run(compilation: &Compilation, aspect: &str, target: &str, interface: TypeRef, redirections: Vec<MemberRedirection>) -> Run {
        let aspect_type = compilation.find_type(aspect).unwrap().id();
        let target = compilation.find_type(target).unwrap().id();
        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(compilation, &mut ids, &config);
        let mut advice = ImplementInterfaceAdvice::new(
            AdviceInfo::new(aspect, Some(aspect_type), target),
            interface,
            OverrideStrategy::Default,
            redirections,
            ObjectReader::empty(),
        )
        .unwrap();
        let mut diagnostics = DiagnosticBag::new();
        advice.initialize(&mut ctx, &mut diagnostics).unwrap();
        if diagnostics.has_errors() {
            return Run { diagnostics, result: None };
        }
        let result = advice.implement(&mut ctx).unwrap();
        Run {
            diagnostics,
            result: Some(result),
        }
    }

    #[test]
    fn test_make_explicit_redirects_to_existing_member() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let run = run(&compilation, "Aspects.Explicit", "App.Target", TypeRef::named("Ns.IFoo"), Vec::new());
        let result = run.result.unwrap();
        assert_eq!(result.outcome, AdviceOutcome::Default);
        assert!(result.diagnostics.is_empty());

        let names: Vec<_> = result.transformations.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["introduce_member", "redirect_member", "introduce_interface"]);

        let TransformationKind::IntroduceMember { member } = &result.transformations[0] else {
            panic!("expected an introduced member");
        };
        assert_eq!(member.name(), "Ns.IFoo.M");
        let info = member.declaration().and_then(Declaration::member).unwrap();
        assert_eq!(info.explicit_interface, Some(TypeRef::named("Ns.IFoo")));
        assert_eq!(info.accessibility, Accessibility::Private);

        let target = compilation.find_type("App.Target").unwrap().id();
        let existing = compilation.find_closest_visible_method(target, "M", &[]).unwrap();
        assert!(matches!(
            &result.transformations[1],
            TransformationKind::RedirectMember { source, target } if *source == member.member && *target == existing
        ));
    }

    #[test]
    fn test_implicit_member_conflict_fails() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let run = run(&compilation, "Aspects.Strict", "App.Target", TypeRef::named("Ns.IFoo"), Vec::new());
        let result = run.result.unwrap();
        assert!(result.is_failed());
        assert_eq!(result.diagnostics[0].id, "LAMA0515");
    }

    #[test]
    fn test_implicit_member_binds_template() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let run = run(&compilation, "Aspects.Strict", "App.Fresh", TypeRef::named("Ns.IFoo"), Vec::new());
        let result = run.result.unwrap();
        let names: Vec<_> = result.transformations.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["introduce_member", "override_member", "introduce_interface"]);
        let TransformationKind::IntroduceMember { member } = &result.transformations[0] else {
            panic!("expected an introduced member");
        };
        assert_eq!(member.name(), "M");
    }

    #[test]
    fn test_generic_interface_members_are_substituted() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let interface = TypeRef::generic("Ns.IBox", vec![TypeRef::named("int")]);
        let run = run(&compilation, "Aspects.Boxing", "App.Fresh", interface.clone(), Vec::new());
        let result = run.result.unwrap();
        let TransformationKind::IntroduceMember { member } = &result.transformations[0] else {
            panic!("expected an introduced member");
        };
        assert_eq!(member.declaration().and_then(Declaration::value_type), Some(&TypeRef::named("int")));
        assert!(matches!(
            result.transformations.last(),
            Some(TransformationKind::IntroduceInterface { interface: i, member_map, .. })
                if *i == interface && member_map.len() == 1
        ));
    }

    #[test]
    fn test_missing_template_is_reported() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let run = run(&compilation, "Aspects.Empty", "App.Fresh", TypeRef::named("Ns.IFoo"), Vec::new());
        assert!(run.result.is_none());
        assert_eq!(run.diagnostics.iter().next().unwrap().id, "LAMA0512");
    }

    #[test]
    fn test_redirection_without_template_is_explicit() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let target = compilation.find_type("App.Target").unwrap().id();
        let existing = compilation.find_closest_visible_method(target, "M", &[]).unwrap();
        let redirections = vec![MemberRedirection {
            interface_member: "M".to_string(),
            target: existing,
        }];
        let run = run(&compilation, "Aspects.Empty", "App.Target", TypeRef::named("Ns.IFoo"), redirections);
        let result = run.result.unwrap();
        let TransformationKind::IntroduceMember { member } = &result.transformations[0] else {
            panic!("expected an introduced member");
        };
        assert_eq!(member.name(), "Ns.IFoo.M");
        assert_eq!(result.transformations[1].name(), "redirect_member");
    }

    #[test]
    fn test_redirections_follow_overload_signatures() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let target = compilation.find_type("App.Overloads").unwrap().id();
        let take_int = compilation
            .find_closest_visible_method(target, "TakeInt", &[TypeRef::named("int")])
            .unwrap();
        let take_text = compilation
            .find_closest_visible_method(target, "TakeText", &[TypeRef::named("string")])
            .unwrap();
        let redirections = vec![
            MemberRedirection {
                interface_member: "M".to_string(),
                target: take_text,
            },
            MemberRedirection {
                interface_member: "M".to_string(),
                target: take_int,
            },
        ];
        let run = run(&compilation, "Aspects.Empty", "App.Overloads", TypeRef::named("Ns.IOverloads"), redirections);
        let result = run.result.unwrap();
        let redirected: Vec<_> = result
            .transformations
            .iter()
            .filter_map(|t| match t {
                TransformationKind::RedirectMember { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(redirected, vec![take_int, take_text]);
    }

    #[test]
    fn test_redirection_with_other_signature_is_not_used() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let target = compilation.find_type("App.Overloads").unwrap().id();
        let take_int = compilation
            .find_closest_visible_method(target, "TakeInt", &[TypeRef::named("int")])
            .unwrap();
        let redirections = vec![MemberRedirection {
            interface_member: "M".to_string(),
            target: take_int,
        }];
        let run = run(&compilation, "Aspects.Empty", "App.Overloads", TypeRef::named("Ns.IOverloads"), redirections);
        assert!(run.result.is_none());
        let ids: Vec<_> = run.diagnostics.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["LAMA0512"]);
    }

    #[test]
    fn test_unbound_generic_interface_is_not_implemented() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let aspect_type = compilation.find_type("Aspects.Boxing").unwrap().id();
        let target = compilation.find_type("App.Fresh").unwrap().id();
        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(&compilation, &mut ids, &config);
        let mut advice = ImplementInterfaceAdvice::new(
            AdviceInfo::new("Boxing", Some(aspect_type), target),
            TypeRef::named("Ns.IBox"),
            OverrideStrategy::Fail,
            Vec::new(),
            ObjectReader::empty(),
        )
        .unwrap();
        let err = advice.initialize(&mut ctx, &mut DiagnosticBag::new()).unwrap_err();
        assert!(matches!(err, crate::error::Error::NotImplemented(_)));
    }

    #[test]
    fn test_interface_strategy_is_validated() {
        let result = ImplementInterfaceAdvice::new(
            AdviceInfo::new("Any", None, crate::model::DeclId(0)),
            TypeRef::named("Ns.IFoo"),
            OverrideStrategy::New,
            Vec::new(),
            ObjectReader::empty(),
        );
        assert!(matches!(result, Err(crate::error::Error::ArgumentOutOfRange(_))));
    }
}
