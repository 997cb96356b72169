//! Explicit parameterless constructors for structs gaining initialized members
//!
//! A struct field initializer only runs from an explicit constructor, so an
//! introduced instance field, auto-property or event field with an initializer
//! needs one. An implicit constructor is materialized under its own id; a
//! struct with no parameterless constructor gets a new one.

use super::{AdviceContext, AdviceInfo};
use crate::builders::ConstructorBuilder;
use crate::error::Result;
use crate::model::DeclId;
use crate::transformation::TransformationKind;
use tracing::debug;

/// Transformations giving `declaring_type` an explicit parameterless
/// constructor; empty for classes or when one already exists
pub(crate) fn parameterless_constructor(
    ctx: &mut AdviceContext<'_>,
    info: &AdviceInfo,
    declaring_type: DeclId,
) -> Result<Vec<TransformationKind>> {
    let compilation = ctx.compilation;
    if !compilation
        .type_decl(declaring_type)
        .is_some_and(|t| t.is_struct())
    {
        return Ok(Vec::new());
    }

    let builder = match compilation.constructors_of_exact_signature(declaring_type, &[], false) {
        Some(id) => match compilation.constructor(id) {
            Some(ctor) if ctor.is_implicit => ConstructorBuilder::materialize(compilation, id, info.aspect.as_str())?,
            _ => return Ok(Vec::new()),
        },
        None => ConstructorBuilder::new(ctx.ids, declaring_type, false, info.aspect.as_str()),
    };

    debug!(
        aspect = %info.aspect,
        target = %compilation.display_name(declaring_type),
        materialized = builder.replaces_implicit,
        "adding parameterless struct constructor"
    );
    Ok(vec![TransformationKind::IntroduceMember {
        member: builder.freeze(),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaverConfig;
    use crate::model::Compilation;

    const MODEL: &str = r#"
types:
  - name: App.Implicit
    kind: struct
  - name: App.Explicit
    kind: struct
    members:
      - kind: constructor
        accessibility: public
  - name: App.WithParameters
    kind: struct
    members:
      - kind: constructor
        accessibility: public
        parameters:
          - name: x
            type: int
  - name: App.Class
"#;

    fn run(compilation: &Compilation, name: &str) -> Vec<TransformationKind> {
        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(compilation, &mut ids, &config);
        let target = compilation.find_type(name).unwrap().id();
        parameterless_constructor(&mut ctx, &AdviceInfo::new("A", None, target), target).unwrap()
    }

    #[test]
    fn test_struct_constructor_cases() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();

        let implicit = run(&compilation, "App.Implicit");
        assert!(matches!(
            &implicit[..],
            [TransformationKind::IntroduceMember { member }] if member.replaces_existing
        ));

        assert!(run(&compilation, "App.Explicit").is_empty());
        assert!(run(&compilation, "App.Class").is_empty());

        let added = run(&compilation, "App.WithParameters");
        assert!(matches!(
            &added[..],
            [TransformationKind::IntroduceMember { member }] if !member.replaces_existing
        ));
    }
}
