//! Folding transformations into a new snapshot
//!
//! Structural transformations (introduced members, parameters, interfaces,
//! attributes, promotions) change the declaration graph. Override-like
//! transformations only need to be recorded: bodies are the expander's job.

use super::{Compilation, ConstructorInitializerKind, DeclId, Declaration};
use crate::builders::IntroducedMember;
use crate::error::{Error, Result};
use crate::transformation::{Transformation, TransformationKind};
use im::OrdMap;
use tracing::trace;

impl Compilation {
    /// New snapshot with `transformations` applied in order; `self` is untouched
    pub fn apply(&self, transformations: &[Transformation]) -> Result<Compilation> {
        let mut declarations = self.declarations_map().clone();
        let mut next_id = self.id_allocator().peek();

        for transformation in transformations {
            trace!(transformation = %transformation, "folding");
            fold(&mut declarations, &mut next_id, &transformation.kind)?;
        }

        Ok(self.with_changes(declarations, transformations, next_id))
    }
}

fn missing(id: DeclId) -> Error {
    Error::AssertionFailed(format!("transformation targets unknown declaration {}", id))
}

fn insert_member(
    declarations: &mut OrdMap<DeclId, Declaration>,
    next_id: &mut u32,
    member: &IntroducedMember,
) -> Result<()> {
    if !member.replaces_existing && declarations.contains_key(&member.member) {
        return Err(Error::AssertionFailed(format!(
            "declaration {} is introduced twice",
            member.member
        )));
    }
    for (id, declaration) in &member.declarations {
        declarations.insert(*id, declaration.clone());
        *next_id = (*next_id).max(id.0 + 1);
    }
    if !member.replaces_existing {
        match declarations.get_mut(&member.declaring_type) {
            Some(Declaration::Type(t)) => t.members.push(member.member),
            _ => return Err(missing(member.declaring_type)),
        }
    }
    Ok(())
}

fn fold(
    declarations: &mut OrdMap<DeclId, Declaration>,
    next_id: &mut u32,
    kind: &TransformationKind,
) -> Result<()> {
    match kind {
        TransformationKind::IntroduceMember { member } => insert_member(declarations, next_id, member)?,
        TransformationKind::PromoteField { field, property } => {
            if !matches!(declarations.get(field), Some(Declaration::Field(_))) {
                return Err(missing(*field));
            }
            insert_member(declarations, next_id, property)?;
        }
        TransformationKind::IntroduceParameter {
            constructor,
            parameter_id,
            parameter,
        } => {
            declarations.insert(*parameter_id, Declaration::Parameter(parameter.clone()));
            *next_id = (*next_id).max(parameter_id.0 + 1);
            match declarations.get_mut(constructor) {
                Some(Declaration::Constructor(c)) => c.parameters.push(*parameter_id),
                _ => return Err(missing(*constructor)),
            }
        }
        TransformationKind::IntroduceConstructorInitializerArgument {
            constructor, value, ..
        } => match declarations.get_mut(constructor) {
            Some(Declaration::Constructor(c)) => {
                if c.initializer.kind == ConstructorInitializerKind::None {
                    c.initializer.kind = ConstructorInitializerKind::Base;
                }
                c.initializer.arguments.push(value.clone());
            }
            _ => return Err(missing(*constructor)),
        },
        TransformationKind::IntroduceInterface {
            target_type,
            interface,
            ..
        } => match declarations.get_mut(target_type) {
            Some(Declaration::Type(t)) => {
                if !t.interfaces.contains(interface) {
                    t.interfaces.push(interface.clone());
                }
            }
            _ => return Err(missing(*target_type)),
        },
        TransformationKind::IntroduceAttribute { target, attribute } => {
            let declaration = declarations.get_mut(target).ok_or_else(|| missing(*target))?;
            declaration.attributes_mut().push(attribute.clone());
        }
        TransformationKind::RemoveAttributes {
            target,
            attribute_type,
        } => {
            let declaration = declarations.get_mut(target).ok_or_else(|| missing(*target))?;
            declaration.attributes_mut().retain(|a| !a.is(attribute_type));
        }
        TransformationKind::OverrideMember { target, .. }
        | TransformationKind::Contract { target, .. }
        | TransformationKind::AddAnnotation { target, .. } => {
            if !declarations.contains_key(target) {
                return Err(missing(*target));
            }
        }
        TransformationKind::RedirectMember { source, target } => {
            for id in [source, target] {
                if !declarations.contains_key(id) {
                    return Err(missing(*id));
                }
            }
        }
        TransformationKind::AddInitializer { constructor, .. } => {
            if !matches!(declarations.get(constructor), Some(Declaration::Constructor(_))) {
                return Err(missing(*constructor));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdviceKind;
    use crate::builders::FieldBuilder;
    use crate::model::{AttributeDecl, TypeRef};
    use crate::transformation::TransformationOrder;

    const MODEL: &str = r#"
types:
  - name: Ns.Order
    members:
      - kind: field
        name: total
        type: decimal
        attributes: [{type: Obsolete}]
"#;

    fn wrap(kind: TransformationKind) -> Transformation {
        Transformation {
            kind,
            advice: AdviceKind::IntroduceField,
            aspect: "Test".into(),
            aspect_instance: 0,
            step: 0,
            target_type: None,
            order: TransformationOrder::default(),
        }
    }

    #[test]
    fn test_apply_introduces_member_into_new_snapshot() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let order = compilation.find_type("Ns.Order").unwrap().id();
        let mut ids = compilation.id_allocator();
        let field = FieldBuilder::new(&mut ids, order, "count", TypeRef::named("int"), "Test").freeze();
        let field_id = field.member;

        let next = compilation
            .apply(&[wrap(TransformationKind::IntroduceMember { member: field })])
            .unwrap();

        assert_eq!(next.revision(), compilation.revision() + 1);
        assert!(next.declaration(field_id).is_some());
        assert!(compilation.declaration(field_id).is_none());
        assert_eq!(next.members_of(order).count(), 2);
        assert_eq!(next.id_allocator().peek(), field_id.0 + 1);
        assert_eq!(next.transformations().count(), 1);
    }

    #[test]
    fn test_attribute_add_and_remove() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let order = compilation.find_type("Ns.Order").unwrap().id();
        let (field, _) = compilation.members_of(order).next().unwrap();

        let next = compilation
            .apply(&[
                wrap(TransformationKind::RemoveAttributes {
                    target: field,
                    attribute_type: "ObsoleteAttribute".into(),
                }),
                wrap(TransformationKind::IntroduceAttribute {
                    target: field,
                    attribute: AttributeDecl::new("NonSerialized"),
                }),
            ])
            .unwrap();
        let attrs = next.declaration(field).unwrap().attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].type_name, "NonSerialized");
    }

    #[test]
    fn test_unknown_target_is_assertion() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let err = compilation
            .apply(&[wrap(TransformationKind::AddAnnotation {
                target: DeclId(999),
                annotation: serde_json::Value::Null,
            })])
            .unwrap_err();
        assert!(matches!(err, Error::AssertionFailed(_)));
    }
}
