//! Conflict resolution between an introduced member and an existing one
//!
//! The compatibility gates (kind, staticity, value type) run before the
//! strategy is looked at, so `New` or `Override` never silently replace a
//! member of a different shape.

use super::diagnostics as d;
use super::OverrideStrategy;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::model::{Compilation, DeclId, DeclarationKind, TypeRef};
use crate::templates::verify_template_type;
use tracing::debug;

/// Shape of the member an advice wants to introduce
#[derive(Debug, Clone, Copy)]
pub struct ConflictCandidate<'a> {
    pub kind: DeclarationKind,
    pub name: &'a str,
    pub is_static: bool,
    pub value_type: Option<&'a TypeRef>,
    pub target_type: DeclId,
}

/// How an introduction proceeds
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No conflicting member
    Introduce,
    /// Override the member declared by the target type; nothing is introduced
    OverrideExisting(DeclId),
    /// Introduce a member overriding an ancestor member
    IntroduceOverride(DeclId),
    /// Introduce a member hiding an ancestor member
    IntroduceNew(DeclId),
    /// Keep the existing member
    Ignore(DeclId),
    Fail(Diagnostic),
}

impl Resolution {
    /// Existing member involved in the decision
    pub fn existing(&self) -> Option<DeclId> {
        match self {
            Resolution::OverrideExisting(id)
            | Resolution::IntroduceOverride(id)
            | Resolution::IntroduceNew(id)
            | Resolution::Ignore(id) => Some(*id),
            Resolution::Introduce | Resolution::Fail(_) => None,
        }
    }
}

/// Decide what to do with `candidate` given the closest `existing` member
///
/// `strategy` must already be resolved from `OverrideStrategy::Default`.
pub fn resolve_conflict(
    compilation: &Compilation,
    aspect: &str,
    candidate: ConflictCandidate<'_>,
    existing: Option<DeclId>,
    strategy: OverrideStrategy,
) -> Result<Resolution> {
    let Some(existing_id) = existing else {
        return Ok(Resolution::Introduce);
    };
    if strategy == OverrideStrategy::Default {
        return Err(Error::AssertionFailed(
            "the override strategy must be resolved before conflict resolution".into(),
        ));
    }

    let existing = compilation.require_declaration(existing_id)?;
    let member = existing.member().ok_or_else(|| {
        Error::AssertionFailed(format!(
            "{} is not a member",
            compilation.display_name(existing_id)
        ))
    })?;

    let kind = candidate.kind.to_string();
    let target = compilation.display_name(candidate.target_type);
    let existing_name = compilation.display_name(existing_id);
    let fail = |descriptor: crate::diagnostics::DiagnosticDescriptor, extra: &[String]| {
        let mut args = vec![
            aspect.to_string(),
            kind.clone(),
            candidate.name.to_string(),
            target.clone(),
        ];
        args.extend_from_slice(extra);
        Resolution::Fail(descriptor.create(&args).on(target.clone()))
    };

    if existing.kind() != candidate.kind {
        debug!(existing = %existing_name, "different kind");
        return Ok(fail(
            d::CANNOT_INTRODUCE_WITH_DIFFERENT_KIND,
            &[existing_name.clone(), existing.kind().to_string()],
        ));
    }
    if member.is_static != candidate.is_static {
        debug!(existing = %existing_name, "different staticity");
        return Ok(fail(
            d::CANNOT_INTRODUCE_WITH_DIFFERENT_STATICITY,
            &[existing_name.clone()],
        ));
    }
    if let (Some(introduced), Some(existing_type)) = (candidate.value_type, existing.value_type()) {
        if !verify_template_type(compilation, introduced, existing_type) {
            debug!(existing = %existing_name, "different value type");
            return Ok(fail(
                d::CANNOT_INTRODUCE_DIFFERENT_EXISTING_RETURN_TYPE,
                &[
                    existing_name.clone(),
                    existing_type.to_string(),
                    introduced.to_string(),
                ],
            ));
        }
    }

    let same_type = member.declaring_type == candidate.target_type;
    let is_field = candidate.kind == DeclarationKind::Field;
    let declaring_type = compilation.display_name(member.declaring_type);

    let resolution = match strategy {
        OverrideStrategy::Fail | OverrideStrategy::Default => {
            fail(d::CANNOT_INTRODUCE_MEMBER_ALREADY_EXISTS, &[declaring_type])
        }
        OverrideStrategy::Ignore => Resolution::Ignore(existing_id),
        OverrideStrategy::New if same_type && is_field => fail(
            d::CANNOT_INTRODUCE_NEW_MEMBER_WHEN_IT_ALREADY_EXISTS,
            &[existing_name.clone()],
        ),
        OverrideStrategy::New if same_type => Resolution::OverrideExisting(existing_id),
        OverrideStrategy::New => Resolution::IntroduceNew(existing_id),
        OverrideStrategy::Override if is_field => {
            fail(d::CANNOT_INTRODUCE_OVERRIDE_OF_SEALED, &[existing_name.clone()])
        }
        OverrideStrategy::Override if same_type => Resolution::OverrideExisting(existing_id),
        OverrideStrategy::Override if member.is_sealed || !member.is_overridable() => {
            fail(d::CANNOT_INTRODUCE_OVERRIDE_OF_SEALED, &[existing_name.clone()])
        }
        OverrideStrategy::Override => Resolution::IntroduceOverride(existing_id),
    };

    debug!(
        candidate = candidate.name,
        existing = %existing_name,
        ?strategy,
        ?resolution,
        "conflict resolved"
    );
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
types:
  - name: App.Base
    members:
      - kind: method
        name: Run
        returns: void
        accessibility: public
        is_virtual: true
      - kind: method
        name: Stop
        returns: void
        accessibility: public
      - kind: field
        name: count
        type: int
        accessibility: protected
  - name: App.Derived
    base_type: App.Base
    members:
      - kind: method
        name: Local
        returns: int
"#;

    fn candidate<'a>(kind: DeclarationKind, name: &'a str, ty: &'a TypeRef, target: DeclId) -> ConflictCandidate<'a> {
        ConflictCandidate {
            kind,
            name,
            is_static: false,
            value_type: Some(ty),
            target_type: target,
        }
    }

    #[test]
    fn test_gates_run_before_strategy() {
        let c = Compilation::from_yaml(MODEL).unwrap();
        let derived = c.find_type("App.Derived").unwrap().id();
        let existing = c.find_closest_uniquely_named_member(derived, "count");
        let void = TypeRef::Void;
        for strategy in [OverrideStrategy::New, OverrideStrategy::Override, OverrideStrategy::Ignore] {
            let r = resolve_conflict(
                &c,
                "A",
                candidate(DeclarationKind::Method, "count", &void, derived),
                existing,
                strategy,
            )
            .unwrap();
            let Resolution::Fail(diag) = r else {
                panic!("expected failure for {:?}", strategy);
            };
            assert_eq!(diag.id, "LAMA0508");
        }
    }

    #[test]
    fn test_override_of_non_virtual_ancestor_fails() {
        let c = Compilation::from_yaml(MODEL).unwrap();
        let derived = c.find_type("App.Derived").unwrap().id();
        let existing = c.find_closest_visible_method(derived, "Stop", &[]);
        let void = TypeRef::Void;
        let r = resolve_conflict(
            &c,
            "A",
            candidate(DeclarationKind::Method, "Stop", &void, derived),
            existing,
            OverrideStrategy::Override,
        )
        .unwrap();
        assert!(matches!(r, Resolution::Fail(d) if d.id == "LAMA0502"));
    }

    #[test]
    fn test_default_strategy_is_an_assertion() {
        let c = Compilation::from_yaml(MODEL).unwrap();
        let derived = c.find_type("App.Derived").unwrap().id();
        let existing = c.find_closest_visible_method(derived, "Run", &[]);
        let void = TypeRef::Void;
        assert!(resolve_conflict(
            &c,
            "A",
            candidate(DeclarationKind::Method, "Run", &void, derived),
            existing,
            OverrideStrategy::Default,
        )
        .is_err());
    }
}
