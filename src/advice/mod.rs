//! Advice: one unit of transformation intent
//!
//! Every advice goes through two phases:
//!
//! 1. `initialize` validates the request independently of the current state of
//!    the target (template shape, builder flags). Errors reported here abort
//!    the whole aspect.
//! 2. `implement` looks at the current snapshot, resolves conflicts with
//!    existing members and returns the transformations to enqueue, or a failed
//!    or ignored outcome.
//!
//! Advice values are single use: `implement` runs at most once.

pub mod attributes;
pub mod conflict;
pub mod contract;
pub mod diagnostics;
pub mod initializer;
pub mod interface;
pub mod introduce;
pub mod override_member;
pub mod parameter;
pub mod struct_fields;

pub use attributes::{AddAnnotationAdvice, IntroduceAttributeAdvice, RemoveAttributesAdvice};
pub use conflict::{resolve_conflict, ConflictCandidate, Resolution};
pub use contract::ContractAdvice;
pub use initializer::{AddInitializerAdvice, InitializerSource, InitializerTarget};
pub use interface::{
    ImplementInterfaceAdvice, InterfaceMemberSpecification, InterfaceSpecification,
    MemberRedirection,
};
pub use introduce::{
    IntroduceConstructorAdvice, IntroduceEventAdvice, IntroduceFieldAdvice,
    IntroduceFinalizerAdvice, IntroduceIndexerAdvice, IntroduceMethodAdvice,
    IntroduceOperatorAdvice, IntroducePropertyAdvice, IntroductionSettings,
};
pub use override_member::{
    OverrideConstructorAdvice, OverrideEventAdvice, OverrideFieldOrPropertyAdvice,
    OverrideFinalizerAdvice, OverrideIndexerAdvice, OverrideMethodAdvice,
};
pub use parameter::{IntroduceParameterAdvice, PullAction, PullStrategy};

use crate::config::WeaverConfig;
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::error::Result;
use crate::model::{Compilation, DeclId, Declaration, IdAllocator, Ref, RefKind, Writeability};
use crate::object_reader::ObjectReader;
use crate::templates::PartiallyBoundTemplateMethod;
use crate::transformation::TransformationKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when an introduced member collides with an existing one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStrategy {
    #[default]
    Default,
    Fail,
    Ignore,
    Override,
    New,
}

/// Whether an introduced member is static
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntroductionScope {
    /// Staticity of the template
    #[default]
    Default,
    Instance,
    Static,
    /// Staticity of the target type
    Target,
}

impl IntroductionScope {
    pub fn resolve(self, template_is_static: bool, target_type_is_static: bool) -> bool {
        match self {
            IntroductionScope::Default => template_is_static,
            IntroductionScope::Instance => false,
            IntroductionScope::Static => true,
            IntroductionScope::Target => target_type_is_static,
        }
    }
}

/// Per-member conflict policy of an interface implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceMemberOverrideStrategy {
    #[default]
    Default,
    Fail,
    MakeExplicit,
}

/// One tag per advice type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    IntroduceMethod,
    IntroduceOperator,
    IntroduceField,
    IntroduceProperty,
    IntroduceIndexer,
    IntroduceEvent,
    IntroduceConstructor,
    IntroduceFinalizer,
    IntroduceParameter,
    OverrideMethod,
    OverrideFieldOrProperty,
    OverrideIndexer,
    OverrideEvent,
    OverrideConstructor,
    OverrideFinalizer,
    ImplementInterface,
    AddContract,
    AddInitializer,
    IntroduceAttribute,
    RemoveAttributes,
    AddAnnotation,
}

impl AdviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AdviceKind::IntroduceMethod => "introduce_method",
            AdviceKind::IntroduceOperator => "introduce_operator",
            AdviceKind::IntroduceField => "introduce_field",
            AdviceKind::IntroduceProperty => "introduce_property",
            AdviceKind::IntroduceIndexer => "introduce_indexer",
            AdviceKind::IntroduceEvent => "introduce_event",
            AdviceKind::IntroduceConstructor => "introduce_constructor",
            AdviceKind::IntroduceFinalizer => "introduce_finalizer",
            AdviceKind::IntroduceParameter => "introduce_parameter",
            AdviceKind::OverrideMethod => "override_method",
            AdviceKind::OverrideFieldOrProperty => "override_field_or_property",
            AdviceKind::OverrideIndexer => "override_indexer",
            AdviceKind::OverrideEvent => "override_event",
            AdviceKind::OverrideConstructor => "override_constructor",
            AdviceKind::OverrideFinalizer => "override_finalizer",
            AdviceKind::ImplementInterface => "implement_interface",
            AdviceKind::AddContract => "add_contract",
            AdviceKind::AddInitializer => "add_initializer",
            AdviceKind::IntroduceAttribute => "introduce_attribute",
            AdviceKind::RemoveAttributes => "remove_attributes",
            AdviceKind::AddAnnotation => "add_annotation",
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported to the aspect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdviceOutcome {
    /// Introduced, or applied with no conflict
    #[default]
    Default,
    /// An existing member was overridden
    Override,
    /// The introduced member hides an existing one
    New,
    /// Nothing was done; an existing declaration was kept
    Ignore,
    Error,
}

/// Result handed back to the aspect for one advice
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceResult<T> {
    pub outcome: AdviceOutcome,
    /// Introduced, overridden, or conflicting declaration
    pub declaration: Option<Ref<T>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> AdviceResult<T> {
    pub fn new(outcome: AdviceOutcome, declaration: Option<DeclId>) -> Self {
        Self {
            outcome,
            declaration: declaration.map(Ref::new),
            diagnostics: Vec::new(),
        }
    }

    pub fn error(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            outcome: AdviceOutcome::Error,
            declaration: None,
            diagnostics,
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome == AdviceOutcome::Error
    }

    pub fn id(&self) -> Option<DeclId> {
        self.declaration.map(|r| r.id())
    }
}

/// What `implement` produced
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceImplementationResult {
    pub outcome: AdviceOutcome,
    pub transformations: Vec<TransformationKind>,
    pub diagnostics: Vec<Diagnostic>,
    pub declaration: Option<DeclId>,
}

impl AdviceImplementationResult {
    pub fn success(
        outcome: AdviceOutcome,
        declaration: Option<DeclId>,
        transformations: Vec<TransformationKind>,
    ) -> Self {
        Self {
            outcome,
            transformations,
            diagnostics: Vec::new(),
            declaration,
        }
    }

    pub fn ignored(existing: Option<DeclId>) -> Self {
        Self::success(AdviceOutcome::Ignore, existing, Vec::new())
    }

    pub fn failed(diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        Self {
            outcome: AdviceOutcome::Error,
            transformations: Vec::new(),
            diagnostics: diagnostics.into_iter().collect(),
            declaration: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == AdviceOutcome::Error
    }
}

/// Identity of the advice: which aspect asked for what on which declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceInfo {
    /// Short name of the aspect type
    pub aspect: String,
    /// Type declaring the templates, when the aspect has one
    pub template_type: Option<DeclId>,
    pub target: DeclId,
}

impl AdviceInfo {
    pub fn new(aspect: impl Into<String>, template_type: Option<DeclId>, target: DeclId) -> Self {
        Self {
            aspect: aspect.into(),
            template_type,
            target,
        }
    }

    /// `CannotApplyAdviceOnTargetKind` for this advice's target
    pub fn wrong_target_kind(&self, compilation: &Compilation, advice: AdviceKind) -> Diagnostic {
        let target = compilation.display_name(self.target);
        let kind = compilation
            .declaration(self.target)
            .map(|d| d.kind().to_string())
            .unwrap_or_else(|| "missing declaration".to_string());
        diagnostics::CANNOT_APPLY_ADVICE_ON_TARGET_KIND
            .create(&[self.aspect.as_str(), advice.as_str(), target.as_str(), kind.as_str()])
            .on(target)
    }
}

/// Mark an advice as implemented; a second call is an invariant violation
pub(crate) fn ensure_first_implementation(implemented: &mut bool, info: &AdviceInfo) -> Result<()> {
    if std::mem::replace(implemented, true) {
        return Err(crate::error::Error::AssertionFailed(format!(
            "advice of '{}' on {} was implemented twice",
            info.aspect, info.target
        )));
    }
    Ok(())
}

/// Everything an advice may read or allocate while it runs
pub struct AdviceContext<'a> {
    pub compilation: &'a Compilation,
    pub ids: &'a mut IdAllocator,
    pub config: &'a WeaverConfig,
}

impl<'a> AdviceContext<'a> {
    pub fn new(compilation: &'a Compilation, ids: &'a mut IdAllocator, config: &'a WeaverConfig) -> Self {
        Self {
            compilation,
            ids,
            config,
        }
    }
}

pub trait Advice {
    fn kind(&self) -> AdviceKind;

    fn info(&self) -> &AdviceInfo;

    fn target(&self) -> DeclId {
        self.info().target
    }

    /// Context-independent validation; diagnostics go to `diagnostics`
    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()>;

    /// Conflict resolution against the current snapshot
    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult>;
}

/// Which values a contract validates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractDirection {
    /// Derived from the shape of the target
    #[default]
    Default,
    Input,
    Output,
    Both,
}

impl ContractDirection {
    /// Direction implied by the shape of `declaration`
    pub fn default_for(declaration: &Declaration) -> ContractDirection {
        match declaration {
            Declaration::Parameter(p) if p.is_return() || p.ref_kind == RefKind::Out => {
                ContractDirection::Output
            }
            Declaration::Parameter(_) => ContractDirection::Input,
            Declaration::Field(f) if f.writeability != Writeability::None => ContractDirection::Input,
            Declaration::Property(p) if p.writeability != Writeability::None => {
                ContractDirection::Input
            }
            Declaration::Indexer(i) if i.setter.is_some() => ContractDirection::Input,
            _ => ContractDirection::Output,
        }
    }

    pub fn resolve(self, declaration: &Declaration) -> ContractDirection {
        match self {
            ContractDirection::Default => ContractDirection::default_for(declaration),
            other => other,
        }
    }

    /// Whether a contract with this direction runs when `phase` is validated
    pub fn applies_to(self, phase: ContractDirection) -> bool {
        self == ContractDirection::Both || phase == ContractDirection::Both || self == phase
    }
}

/// One validation attached to a parameter, field, property or indexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contract {
    pub target: DeclId,
    pub direction: ContractDirection,
    pub template: PartiallyBoundTemplateMethod,
    pub tags: ObjectReader,
    /// Registration order within the owning member
    pub order: u32,
    pub aspect: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Compilation;

    #[test]
    fn test_scope_resolution() {
        assert!(!IntroductionScope::Default.resolve(false, true));
        assert!(IntroductionScope::Default.resolve(true, false));
        assert!(!IntroductionScope::Instance.resolve(true, true));
        assert!(IntroductionScope::Static.resolve(false, false));
        assert!(IntroductionScope::Target.resolve(false, true));
    }

    #[test]
    fn test_default_contract_direction() {
        let compilation = Compilation::from_yaml(
            r#"
types:
  - name: App.Account
    members:
      - kind: field
        name: balance
        type: decimal
      - kind: field
        name: id
        type: int
        is_readonly: false
      - kind: method
        name: TryGet
        returns: bool
        parameters:
          - name: key
            type: string
          - name: value
            type: int
            ref_kind: out
"#,
        )
        .unwrap();
        let account = compilation.find_type("App.Account").unwrap().id();
        let method = compilation
            .find_closest_visible_method(account, "TryGet", &[
                crate::model::TypeRef::named("string"),
                crate::model::TypeRef::named("int"),
            ])
            .unwrap();
        let m = compilation.method(method).unwrap();
        let key = compilation.declaration(m.parameters[0]).unwrap();
        let value = compilation.declaration(m.parameters[1]).unwrap();
        let ret = compilation.declaration(m.return_parameter).unwrap();

        assert_eq!(ContractDirection::default_for(key), ContractDirection::Input);
        assert_eq!(ContractDirection::default_for(value), ContractDirection::Output);
        assert_eq!(ContractDirection::default_for(ret), ContractDirection::Output);

        let (field, _) = compilation.members_of(account).next().unwrap();
        let field = compilation.declaration(field).unwrap();
        assert_eq!(ContractDirection::default_for(field), ContractDirection::Input);
    }

    #[test]
    fn test_direction_applies() {
        assert!(ContractDirection::Both.applies_to(ContractDirection::Input));
        assert!(ContractDirection::Input.applies_to(ContractDirection::Input));
        assert!(!ContractDirection::Input.applies_to(ContractDirection::Output));
    }
}
