use super::{InterfaceMemberSpecification, InterfaceSpecification, MemberRedirection};
use crate::advice::diagnostics as d;
use crate::advice::AdviceInfo;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{Accessibility, Compilation, DeclId, Declaration, MethodKind, TypeRef};
use crate::templates::{TemplateAttributeKind, TemplateInfo};
use std::collections::BTreeMap;
use tracing::trace;

/// `InterfaceMember` templates of the aspect type, closest type first
fn interface_templates(compilation: &Compilation, aspect_type: Option<DeclId>) -> Result<Vec<(DeclId, TemplateInfo)>> {
    let Some(aspect_type) = aspect_type else {
        return Ok(Vec::new());
    };
    let mut templates = Vec::new();
    for ty in compilation.hierarchy(aspect_type) {
        for (id, decl) in compilation.members_of(ty) {
            let info = TemplateInfo::from_attributes(decl.attributes())?;
            if info.attribute == Some(TemplateAttributeKind::InterfaceMember) {
                templates.push((id, info));
            }
        }
    }
    Ok(templates)
}

/// Structural equality of an interface member and a template, after
/// substituting the interface's generic arguments
pub(super) fn signature_matches(
    compilation: &Compilation,
    member: &Declaration,
    substitution: &BTreeMap<String, TypeRef>,
    template: &Declaration,
) -> bool {
    match (member, template) {
        (Declaration::Method(m), Declaration::Method(t)) => {
            let parameters = |ids: &[DeclId]| -> Vec<(TypeRef, crate::model::RefKind)> {
                ids.iter()
                    .filter_map(|id| match compilation.declaration(*id) {
                        Some(Declaration::Parameter(p)) => Some((p.ty.substitute(substitution), p.ref_kind)),
                        _ => None,
                    })
                    .collect()
            };
            m.return_type.substitute(substitution) == t.return_type
                && m.return_ref_kind == t.return_ref_kind
                && parameters(&m.parameters) == parameters(&t.parameters)
        }
        (Declaration::Property(m), Declaration::Property(t)) => {
            m.ty.substitute(substitution) == t.ty && m.ref_kind == t.ref_kind
        }
        (Declaration::Event(m), Declaration::Event(t)) => m.ty.substitute(substitution) == t.ty,
        _ => false,
    }
}

/// Whether the template and all of its accessors are public
fn is_fully_public(compilation: &Compilation, template: &Declaration) -> bool {
    let accessor_public = |id: Option<DeclId>| {
        id.and_then(|id| compilation.method(id))
            .is_none_or(|m| m.member.accessibility == Accessibility::Public)
    };
    let Some(member) = template.member() else {
        return false;
    };
    if member.accessibility != Accessibility::Public {
        return false;
    }
    match template {
        Declaration::Property(p) => accessor_public(p.getter) && accessor_public(p.setter),
        Declaration::Event(e) => accessor_public(Some(e.adder)) && accessor_public(Some(e.remover)),
        _ => true,
    }
}

/// Expand `interface` and match each member with a template or redirection
///
/// Data-dependent problems go to `diagnostics`; requests that can never be
/// valid are errors.
pub(super) fn plan(
    compilation: &Compilation,
    info: &AdviceInfo,
    interface: &TypeRef,
    redirections: &[MemberRedirection],
    diagnostics: &mut DiagnosticBag,
) -> Result<Vec<InterfaceSpecification>> {
    let declaration_id = compilation
        .resolve_type_ref(interface)
        .ok_or_else(|| Error::InvalidAdviceParameters(format!("the type '{}' is not in the compilation", interface)))?;
    let declaration = compilation
        .type_decl(declaration_id)
        .filter(|t| t.is_interface())
        .ok_or_else(|| Error::InvalidAdviceParameters(format!("the type '{}' is not an interface", interface)))?;

    if !declaration.type_parameters.is_empty() {
        if interface.args().is_empty() {
            return Err(Error::NotImplemented(format!(
                "implementing the unbound generic interface '{}'",
                interface
            )));
        }
        if interface.args() == declaration.type_ref().args() {
            return Err(Error::InvalidAdviceParameters(format!(
                "'{}' is the canonical generic instance; provide concrete type arguments",
                interface
            )));
        }
    }

    let templates = interface_templates(compilation, info.template_type)?;
    let aspect = info.aspect.as_str();
    let mut plan = Vec::new();

    for current in compilation.interface_closure(interface) {
        let Some(current_id) = compilation.resolve_type_ref(&current) else {
            return Err(Error::InvalidAdviceParameters(format!(
                "the interface '{}' extended by '{}' is not in the compilation",
                current, interface
            )));
        };
        let substitution = compilation.substitution_for(&current);
        let interface_name = current.to_string();
        let mut members = Vec::new();

        for (member_id, member) in compilation.members_of(current_id) {
            match member {
                Declaration::Indexer(_) => {
                    return Err(Error::NotImplemented(format!(
                        "implementing the indexer of '{}'",
                        interface_name
                    )))
                }
                Declaration::Method(m) if m.method_kind != MethodKind::Default => continue,
                Declaration::Method(_) | Declaration::Property(_) | Declaration::Event(_) => {}
                _ => continue,
            }
            let member_name = compilation.display_name(member_id);
            // Overloads share a name, so the target signature picks the redirection
            let redirect_to = redirections
                .iter()
                .find(|r| {
                    r.interface_member == member.name()
                        && compilation
                            .declaration(r.target)
                            .is_some_and(|t| signature_matches(compilation, member, &substitution, t))
                })
                .map(|r| r.target);

            let named: Vec<&(DeclId, TemplateInfo)> = templates
                .iter()
                .filter(|(id, _)| compilation.declaration(*id).is_some_and(|t| t.name() == member.name()))
                .collect();
            let matching = named.iter().find(|(id, _)| {
                compilation
                    .declaration(*id)
                    .is_some_and(|t| signature_matches(compilation, member, &substitution, t))
            });

            let (template, is_explicit, when_exists) = match (matching, named.first(), redirect_to) {
                (Some((id, template_info)), _, _) => {
                    let template = compilation.require_declaration(*id)?;
                    if !template_info.is_explicit && !is_fully_public(compilation, template) {
                        let template_name = compilation.display_name(*id);
                        diagnostics.report(
                            d::IMPLICIT_INTERFACE_IMPLEMENTATION_HAS_TO_BE_PUBLIC
                                .create(&[aspect, interface_name.as_str(), template_name.as_str()])
                                .on(template_name.clone()),
                        );
                    }
                    (Some(*id), template_info.is_explicit, template_info.when_exists)
                }
                (None, _, Some(_)) => (None, true, Default::default()),
                (None, Some((id, _)), None) => {
                    let template_name = compilation.display_name(*id);
                    diagnostics.report(
                        d::DECLARATIVE_INTERFACE_MEMBER_DOES_NOT_MATCH
                            .create(&[
                                aspect,
                                interface_name.as_str(),
                                template_name.as_str(),
                                member_name.as_str(),
                            ])
                            .on(template_name.clone()),
                    );
                    continue;
                }
                (None, None, None) => {
                    diagnostics.report(
                        d::MISSING_DECLARATIVE_INTERFACE_MEMBER
                            .create(&[aspect, interface_name.as_str(), member_name.as_str()])
                            .on(member_name.clone()),
                    );
                    continue;
                }
            };

            trace!(member = %member_name, ?template, is_explicit, "interface member planned");
            members.push(InterfaceMemberSpecification {
                interface_member: member_id,
                kind: member.kind(),
                name: member.name().to_string(),
                template,
                is_explicit,
                when_exists,
                redirect_to: if template.is_some() { None } else { redirect_to },
            });
        }

        plan.push(InterfaceSpecification {
            interface: current,
            declaration: current_id,
            members,
        });
    }

    Ok(plan)
}
