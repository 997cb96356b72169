//! Constructor parameter introduction
//!
//! Appending a parameter to a constructor breaks every `this(...)` or
//! `base(...)` call site reaching it. Each chained constructor is visited
//! depth first; the pull strategy decides what the call site passes, and may
//! append a parameter to the chained constructor too, which continues the walk.
//! Implicit constructors are materialized before anything is attached to them.

use super::diagnostics as d;
use super::{ensure_first_implementation, Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind, AdviceOutcome};
use crate::builders::ConstructorBuilder;
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::error::{Error, Result};
use crate::model::{Compilation, DeclId, Declaration, Expression, ParameterDecl, ParameterPosition, RefKind, TypeRef};
use crate::transformation::TransformationKind;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// What a chained constructor passes for an appended parameter
#[derive(Debug, Clone, PartialEq)]
pub enum PullAction {
    /// Pass the parameter's default value, or `default`
    DoNotPull,
    /// Forward a parameter the chained constructor already has
    UseExistingParameter(String),
    /// Append a parameter to the chained constructor and forward it
    AppendParameterAndPull {
        name: String,
        ty: TypeRef,
        default_value: Option<Expression>,
    },
}

/// Decides the pull action for a chained constructor given the parameter
/// appended to the constructor it calls
pub type PullStrategy = Rc<dyn Fn(&Compilation, DeclId, &ParameterDecl) -> PullAction>;

pub struct IntroduceParameterAdvice {
    info: AdviceInfo,
    name: String,
    ty: TypeRef,
    default_value: Option<Expression>,
    pull: Option<PullStrategy>,
    implemented: bool,
}

impl fmt::Debug for IntroduceParameterAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntroduceParameterAdvice")
            .field("info", &self.info)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default_value", &self.default_value)
            .field("pull", &self.pull.is_some())
            .finish()
    }
}

/// Traversal state of one implementation
struct Walk<'p> {
    aspect: &'p str,
    pull: Option<&'p PullStrategy>,
    visited: BTreeSet<DeclId>,
    materialized: BTreeSet<DeclId>,
    transformations: Vec<TransformationKind>,
    /// Constructors already declaring the name they were asked to append
    conflicts: Vec<Diagnostic>,
}

impl IntroduceParameterAdvice {
    pub fn new(
        info: AdviceInfo,
        name: impl Into<String>,
        ty: TypeRef,
        default_value: Option<Expression>,
        pull: Option<PullStrategy>,
    ) -> Self {
        Self {
            info,
            name: name.into(),
            ty,
            default_value,
            pull,
            implemented: false,
        }
    }

}

impl Walk<'_> {
    fn materialize(&mut self, compilation: &Compilation, constructor: DeclId) -> Result<()> {
        let is_implicit = compilation.constructor(constructor).is_some_and(|c| c.is_implicit);
        if is_implicit && self.materialized.insert(constructor) {
            let builder = ConstructorBuilder::materialize(compilation, constructor, self.aspect)?;
            self.transformations
                .push(TransformationKind::IntroduceMember { member: builder.freeze() });
        }
        Ok(())
    }

    fn append(
        &mut self,
        ctx: &mut AdviceContext<'_>,
        constructor: DeclId,
        name: String,
        ty: TypeRef,
        default_value: Option<Expression>,
    ) -> Result<()> {
        let compilation = ctx.compilation;
        if !self.visited.insert(constructor) {
            return Err(Error::AssertionFailed(format!(
                "constructor chain reaches {} twice",
                compilation.display_name(constructor)
            )));
        }
        let existing = compilation.constructor(constructor).ok_or_else(|| {
            Error::AssertionFailed(format!("{} is not a constructor", constructor))
        })?;
        let taken = existing
            .parameters
            .iter()
            .filter_map(|id| compilation.declaration(*id))
            .any(|p| p.name() == name);
        if taken {
            let constructor_name = compilation.display_name(constructor);
            debug!(constructor = %constructor_name, parameter = %name, "parameter name already taken");
            self.conflicts.push(
                d::CANNOT_INTRODUCE_PARAMETER_ALREADY_EXISTS
                    .create(&[self.aspect, name.as_str(), constructor_name.as_str()])
                    .on(constructor_name.clone()),
            );
            return Ok(());
        }
        self.materialize(compilation, constructor)?;

        let parameter_id = ctx.ids.allocate();
        let parameter = ParameterDecl {
            name,
            ty,
            ref_kind: RefKind::None,
            position: ParameterPosition::Index(existing.parameters.len() as u32),
            owner: constructor,
            default_value,
            attributes: Vec::new(),
        };
        trace!(
            constructor = %compilation.display_name(constructor),
            parameter = %parameter.name,
            "appending parameter"
        );
        self.transformations.push(TransformationKind::IntroduceParameter {
            constructor,
            parameter_id,
            parameter: parameter.clone(),
        });

        for chained in compilation.chained_constructors(constructor) {
            let action = match self.pull {
                Some(pull) => pull(compilation, chained, &parameter),
                None => PullAction::DoNotPull,
            };
            let value = match action {
                PullAction::DoNotPull => parameter
                    .default_value
                    .clone()
                    .unwrap_or_else(Expression::default_literal),
                PullAction::UseExistingParameter(name) => Expression::new(name),
                PullAction::AppendParameterAndPull {
                    name,
                    ty,
                    default_value,
                } => {
                    self.append(ctx, chained, name.clone(), ty, default_value)?;
                    Expression::new(name)
                }
            };
            self.materialize(compilation, chained)?;
            self.transformations
                .push(TransformationKind::IntroduceConstructorInitializerArgument {
                    constructor: chained,
                    parameter: parameter_id,
                    value,
                });
        }
        Ok(())
    }
}

impl Advice for IntroduceParameterAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceParameter
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        match compilation.declaration(self.info.target) {
            Some(Declaration::Constructor(c)) if c.member.is_static => {
                let constructor_name = compilation.display_name(self.info.target);
                diagnostics.report(
                    d::CANNOT_INTRODUCE_PARAMETER_INTO_STATIC_CONSTRUCTOR
                        .create(&[self.info.aspect.as_str(), self.name.as_str(), constructor_name.as_str()])
                        .on(constructor_name.clone()),
                );
            }
            Some(Declaration::Constructor(_)) => {}
            _ => diagnostics.report(self.info.wrong_target_kind(compilation, self.kind())),
        }
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let constructor = self.info.target;

        let mut walk = Walk {
            aspect: self.info.aspect.as_str(),
            pull: self.pull.as_ref(),
            visited: BTreeSet::new(),
            materialized: BTreeSet::new(),
            transformations: Vec::new(),
            conflicts: Vec::new(),
        };
        walk.append(ctx, constructor, self.name.clone(), self.ty.clone(), self.default_value.clone())?;
        if !walk.conflicts.is_empty() {
            return Ok(AdviceImplementationResult::failed(walk.conflicts));
        }

        debug!(
            aspect = %self.info.aspect,
            constructor = %compilation.display_name(constructor),
            parameter = %self.name,
            constructors = walk.visited.len(),
            "parameter introduced"
        );
        let parameter = walk.transformations.iter().find_map(|t| match t {
            TransformationKind::IntroduceParameter { parameter_id, .. } => Some(*parameter_id),
            _ => None,
        });
        Ok(AdviceImplementationResult::success(
            AdviceOutcome::Default,
            parameter,
            walk.transformations,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaverConfig;

    const MODEL: &str = r#"
types:
  - name: App.Base
    members:
      - kind: constructor
        accessibility: public
        parameters:
          - name: id
            type: int
  - name: App.Derived
    base_type: App.Base
    members:
      - kind: constructor
        accessibility: public
        initializer:
          kind: base
          arguments: ["0"]
  - name: App.Holder
    is_static: true
    members:
      - kind: constructor
        is_static: true
"#;

    fn constructor_of(compilation: &Compilation, name: &str) -> DeclId {
        let ty = compilation.find_type(name).unwrap().id();
        compilation.constructors_of(ty)[0]
    }

    #[test]
    fn test_default_pull_passes_default_literal() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let base = constructor_of(&compilation, "App.Base");
        let derived = constructor_of(&compilation, "App.Derived");

        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(&compilation, &mut ids, &config);
        let mut advice = IntroduceParameterAdvice::new(
            AdviceInfo::new("Inject", None, base),
            "logger",
            TypeRef::named("ILogger"),
            None,
            None,
        );
        let mut diagnostics = DiagnosticBag::new();
        advice.initialize(&mut ctx, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());

        let result = advice.implement(&mut ctx).unwrap();
        assert_eq!(result.transformations.len(), 2);
        assert!(matches!(
            &result.transformations[1],
            TransformationKind::IntroduceConstructorInitializerArgument { constructor, value, .. }
                if *constructor == derived && value.0 == "default"
        ));
        assert!(advice.implement(&mut ctx).is_err());
    }

    #[test]
    fn test_duplicate_parameter_fails() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let base = constructor_of(&compilation, "App.Base");
        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(&compilation, &mut ids, &config);
        let mut advice = IntroduceParameterAdvice::new(
            AdviceInfo::new("Inject", None, base),
            "id",
            TypeRef::named("int"),
            None,
            None,
        );
        let result = advice.implement(&mut ctx).unwrap();
        assert!(result.is_failed());
        assert_eq!(result.diagnostics[0].id, "LAMA0521");
    }

    #[test]
    fn test_static_constructor_is_rejected() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let holder = compilation.find_type("App.Holder").unwrap().id();
        let cctor = compilation.static_constructor_of(holder).unwrap();
        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(&compilation, &mut ids, &config);
        let mut advice = IntroduceParameterAdvice::new(
            AdviceInfo::new("Inject", None, cctor),
            "x",
            TypeRef::named("int"),
            None,
            None,
        );
        let mut diagnostics = DiagnosticBag::new();
        advice.initialize(&mut ctx, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.iter().next().unwrap().id, "LAMA0520");
    }
}
