//! Transformations: immutable, ordered instructions for the rewriter
//!
//! Advice produces [`TransformationKind`] values; the factory stamps each one
//! with its [`TransformationOrder`] when it is enqueued. Consumers replay
//! transformations sorted by `order.within_pipeline` to get deterministic
//! output when several aspects touch the same type.

use crate::advice::{AdviceKind, Contract};
use crate::builders::IntroducedMember;
use crate::model::{AttributeDecl, Compilation, DeclId, Declaration, Expression, ParameterDecl, TypeRef};
use crate::templates::BoundTemplateMethod;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Ordering counters assigned at enqueue time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransformationOrder {
    /// Total order across the whole pipeline
    pub within_pipeline: u32,
    /// Order among transformations of one step on one type
    pub within_pipeline_step_and_type: u32,
    /// Order among transformations of one step, one type and one aspect instance
    pub within_pipeline_step_and_type_and_aspect_instance: u32,
}

/// Templates overriding a member
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum OverrideTemplates {
    Method {
        template: BoundTemplateMethod,
    },
    Accessors {
        getter: Option<BoundTemplateMethod>,
        setter: Option<BoundTemplateMethod>,
    },
    EventAccessors {
        adder: Option<BoundTemplateMethod>,
        remover: Option<BoundTemplateMethod>,
        raiser: Option<BoundTemplateMethod>,
    },
}

/// Code inserted before a constructor body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitializerBody {
    Template { template: BoundTemplateMethod },
    Statement { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformationKind {
    IntroduceMember {
        member: IntroducedMember,
    },
    IntroduceParameter {
        constructor: DeclId,
        parameter_id: DeclId,
        parameter: ParameterDecl,
    },
    /// Pass a value for a newly appended parameter at a `this(...)` or
    /// `base(...)` call site
    IntroduceConstructorInitializerArgument {
        constructor: DeclId,
        parameter: DeclId,
        value: Expression,
    },
    OverrideMember {
        target: DeclId,
        templates: OverrideTemplates,
    },
    /// Implement `source` by forwarding to `target`
    RedirectMember {
        source: DeclId,
        target: DeclId,
    },
    IntroduceInterface {
        target_type: DeclId,
        interface: TypeRef,
        /// Interface member → implementing member
        member_map: Vec<(DeclId, DeclId)>,
    },
    /// Replace a field by a property with the same id
    PromoteField {
        field: DeclId,
        property: IntroducedMember,
    },
    Contract {
        target: DeclId,
        contracts: Vec<Contract>,
    },
    AddInitializer {
        constructor: DeclId,
        body: InitializerBody,
    },
    IntroduceAttribute {
        target: DeclId,
        attribute: AttributeDecl,
    },
    RemoveAttributes {
        target: DeclId,
        attribute_type: String,
    },
    AddAnnotation {
        target: DeclId,
        annotation: Value,
    },
}

impl TransformationKind {
    /// Declaration the transformation primarily applies to
    pub fn target_declaration(&self) -> DeclId {
        match self {
            TransformationKind::IntroduceMember { member } => member.member,
            TransformationKind::IntroduceParameter { constructor, .. }
            | TransformationKind::IntroduceConstructorInitializerArgument { constructor, .. }
            | TransformationKind::AddInitializer { constructor, .. } => *constructor,
            TransformationKind::OverrideMember { target, .. }
            | TransformationKind::Contract { target, .. }
            | TransformationKind::IntroduceAttribute { target, .. }
            | TransformationKind::RemoveAttributes { target, .. }
            | TransformationKind::AddAnnotation { target, .. } => *target,
            TransformationKind::RedirectMember { source, .. } => *source,
            TransformationKind::IntroduceInterface { target_type, .. } => *target_type,
            TransformationKind::PromoteField { field, .. } => *field,
        }
    }

    /// Type whose ordering counters the transformation uses
    ///
    /// Introduced members are not in `compilation` yet, so their declaring type
    /// is read from the frozen declaration.
    pub fn target_type(&self, compilation: &Compilation) -> Option<DeclId> {
        match self {
            TransformationKind::IntroduceMember { member } => Some(member.declaring_type),
            TransformationKind::PromoteField { property, .. } => Some(property.declaring_type),
            TransformationKind::IntroduceInterface { target_type, .. } => Some(*target_type),
            other => type_of(compilation, other.target_declaration()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformationKind::IntroduceMember { .. } => "introduce_member",
            TransformationKind::IntroduceParameter { .. } => "introduce_parameter",
            TransformationKind::IntroduceConstructorInitializerArgument { .. } => {
                "introduce_constructor_initializer_argument"
            }
            TransformationKind::OverrideMember { .. } => "override_member",
            TransformationKind::RedirectMember { .. } => "redirect_member",
            TransformationKind::IntroduceInterface { .. } => "introduce_interface",
            TransformationKind::PromoteField { .. } => "promote_field",
            TransformationKind::Contract { .. } => "contract",
            TransformationKind::AddInitializer { .. } => "add_initializer",
            TransformationKind::IntroduceAttribute { .. } => "introduce_attribute",
            TransformationKind::RemoveAttributes { .. } => "remove_attributes",
            TransformationKind::AddAnnotation { .. } => "add_annotation",
        }
    }
}

/// Walk up from any declaration to its type
fn type_of(compilation: &Compilation, id: DeclId) -> Option<DeclId> {
    let mut current = id;
    for _ in 0..4 {
        match compilation.declaration(current)? {
            Declaration::Type(_) => return Some(current),
            Declaration::Parameter(p) => current = p.owner,
            other => return other.declaring_type(),
        }
    }
    None
}

/// An enqueued transformation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformation {
    pub kind: TransformationKind,
    pub advice: AdviceKind,
    /// Short name of the aspect type
    pub aspect: String,
    /// Aspect instance within the pipeline step
    pub aspect_instance: u32,
    pub step: u32,
    pub target_type: Option<DeclId>,
    pub order: TransformationOrder,
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}, {}) on {}",
            self.order.within_pipeline,
            self.kind.name(),
            self.aspect,
            self.advice,
            self.kind.target_declaration()
        )
    }
}
