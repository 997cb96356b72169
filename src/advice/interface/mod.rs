//! Interface implementation advice
//!
//! Planning happens in `initialize` and only looks at the aspect: the
//! requested interface and everything it extends are expanded, and every
//! interface member is matched with an `InterfaceMember` template of the
//! aspect type or with an explicit redirection. `implement` then looks at the
//! target type, resolves conflicts member by member, and registers the
//! interface with one transformation carrying the member map.

mod implement;
mod plan;

use super::{
    ensure_first_implementation, Advice, AdviceContext, AdviceImplementationResult, AdviceInfo,
    AdviceKind, InterfaceMemberOverrideStrategy, OverrideStrategy,
};
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{DeclId, Declaration, DeclarationKind, TypeRef};
use crate::object_reader::ObjectReader;
use serde::Serialize;
use tracing::debug;

/// Implement an interface member by forwarding to an existing member
///
/// Applies to the interface members named `interface_member` whose signature
/// matches the target's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRedirection {
    /// Name of the interface member
    pub interface_member: String,
    /// Member of the target type receiving the calls
    pub target: DeclId,
}

/// How one interface member gets implemented
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceMemberSpecification {
    pub interface_member: DeclId,
    pub kind: DeclarationKind,
    pub name: String,
    /// `InterfaceMember` template providing the body
    pub template: Option<DeclId>,
    pub is_explicit: bool,
    pub when_exists: InterfaceMemberOverrideStrategy,
    pub redirect_to: Option<DeclId>,
}

/// One interface of the closure with its planned members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceSpecification {
    pub interface: TypeRef,
    /// Declared interface type
    pub declaration: DeclId,
    pub members: Vec<InterfaceMemberSpecification>,
}

#[derive(Debug)]
pub struct ImplementInterfaceAdvice {
    info: AdviceInfo,
    interface: TypeRef,
    strategy: OverrideStrategy,
    redirections: Vec<MemberRedirection>,
    args: ObjectReader,
    plan: Option<Vec<InterfaceSpecification>>,
    implemented: bool,
}

impl ImplementInterfaceAdvice {
    /// `strategy` controls what happens when the target already implements
    /// the interface; only `Default`, `Fail` and `Ignore` are meaningful
    pub fn new(
        info: AdviceInfo,
        interface: TypeRef,
        strategy: OverrideStrategy,
        redirections: Vec<MemberRedirection>,
        args: ObjectReader,
    ) -> Result<Self> {
        if !matches!(
            strategy,
            OverrideStrategy::Default | OverrideStrategy::Fail | OverrideStrategy::Ignore
        ) {
            return Err(Error::ArgumentOutOfRange(format!(
                "interface implementation does not support the {:?} strategy; use a per-member strategy instead",
                strategy
            )));
        }
        Ok(Self {
            info,
            interface,
            strategy,
            redirections,
            args,
            plan: None,
            implemented: false,
        })
    }

    pub fn plan(&self) -> Option<&[InterfaceSpecification]> {
        self.plan.as_deref()
    }
}

impl Advice for ImplementInterfaceAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::ImplementInterface
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let implementable = matches!(
            compilation.declaration(self.info.target),
            Some(Declaration::Type(t)) if !t.is_interface()
        );
        if !implementable {
            diagnostics.report(self.info.wrong_target_kind(compilation, self.kind()));
            return Ok(());
        }

        let plan = plan::plan(compilation, &self.info, &self.interface, &self.redirections, diagnostics)?;
        debug!(
            aspect = %self.info.aspect,
            interface = %self.interface,
            interfaces = plan.len(),
            members = plan.iter().map(|s| s.members.len()).sum::<usize>(),
            "interface planned"
        );
        self.plan = Some(plan);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let plan = self.plan.take().ok_or_else(|| {
            Error::AssertionFailed(format!("interface '{}' was never planned", self.interface))
        })?;
        implement::implement(ctx, &self.info, &self.interface, self.strategy, &plan, &self.args)
    }
}
