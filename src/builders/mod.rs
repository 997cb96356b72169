//! Mutable drafts of introduced declarations
//!
//! A builder is owned by the advice that creates it. `freeze` turns it into an
//! [`IntroducedMember`]: plain declarations with ids already assigned, ready to
//! be carried by a transformation. Nothing keeps a link back to the builder.

use crate::error::{Error, Result};
use crate::model::{
    Accessibility, AttributeDecl, Compilation, ConstructorDecl, ConstructorInitializer, DeclId,
    Declaration, DeclarationKind, EventDecl, Expression, FieldDecl, IdAllocator, IndexerDecl,
    MemberInfo, MethodDecl, MethodKind, OperatorKind, Origin, ParameterDecl, ParameterPosition,
    PropertyDecl, RefKind, TypeParameterDecl, TypeRef, Writeability,
};
use serde::Serialize;

/// Frozen result of a builder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntroducedMember {
    pub member: DeclId,
    pub kind: DeclarationKind,
    pub declaring_type: DeclId,
    /// The member and every accessor or parameter it owns
    pub declarations: Vec<(DeclId, Declaration)>,
    /// Replaces a declaration with the same id (implicit constructor, promoted field)
    pub replaces_existing: bool,
    /// Member this one overrides or hides
    pub overridden: Option<DeclId>,
}

impl IntroducedMember {
    pub fn declaration(&self) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|(id, _)| *id == self.member)
            .map(|(_, d)| d)
    }

    pub fn name(&self) -> &str {
        self.declaration().map(Declaration::name).unwrap_or_default()
    }
}

/// Shape shared by all member builders
#[derive(Debug, Clone, PartialEq)]
pub struct MemberBuilderBase {
    pub id: DeclId,
    pub name: String,
    pub declaring_type: DeclId,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_sealed: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    pub is_new: bool,
    pub attributes: Vec<AttributeDecl>,
    pub explicit_interface: Option<TypeRef>,
    pub overridden: Option<DeclId>,
    pub aspect: String,
}

impl MemberBuilderBase {
    pub fn new(id: DeclId, name: impl Into<String>, declaring_type: DeclId, aspect: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            declaring_type,
            accessibility: Accessibility::Private,
            is_static: false,
            is_virtual: false,
            is_sealed: false,
            is_abstract: false,
            is_override: false,
            is_new: false,
            attributes: Vec::new(),
            explicit_interface: None,
            overridden: None,
            aspect: aspect.into(),
        }
    }

    fn member_info(&self) -> MemberInfo {
        MemberInfo {
            name: self.name.clone(),
            declaring_type: self.declaring_type,
            accessibility: self.accessibility,
            is_static: self.is_static,
            is_virtual: self.is_virtual,
            is_sealed: self.is_sealed,
            is_abstract: self.is_abstract,
            is_override: self.is_override,
            is_new: self.is_new,
            attributes: self.attributes.clone(),
            explicit_interface: self.explicit_interface.clone(),
            origin: Origin::Introduced {
                aspect: self.aspect.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBuilder {
    pub id: DeclId,
    pub name: String,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub default_value: Option<Expression>,
    pub attributes: Vec<AttributeDecl>,
}

impl ParameterBuilder {
    pub fn new(ids: &mut IdAllocator, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: ids.allocate(),
            name: name.into(),
            ty,
            ref_kind: RefKind::None,
            default_value: None,
            attributes: Vec::new(),
        }
    }

    pub fn freeze(&self, owner: DeclId, index: usize) -> ParameterDecl {
        ParameterDecl {
            name: self.name.clone(),
            ty: self.ty.clone(),
            ref_kind: self.ref_kind,
            position: ParameterPosition::Index(index as u32),
            owner,
            default_value: self.default_value.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

fn freeze_parameters(owner: DeclId, parameters: &[ParameterBuilder], out: &mut Vec<(DeclId, Declaration)>) -> Vec<DeclId> {
    parameters
        .iter()
        .enumerate()
        .map(|(i, p)| {
            out.push((p.id, Declaration::Parameter(p.freeze(owner, i))));
            p.id
        })
        .collect()
}

fn return_parameter(id: DeclId, owner: DeclId, ty: &TypeRef, attributes: Vec<AttributeDecl>) -> (DeclId, Declaration) {
    (
        id,
        Declaration::Parameter(ParameterDecl {
            name: "<return>".to_string(),
            ty: ty.clone(),
            ref_kind: RefKind::None,
            position: ParameterPosition::Return,
            owner,
            default_value: None,
            attributes,
        }),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodBuilder {
    pub base: MemberBuilderBase,
    pub method_kind: MethodKind,
    pub operator_kind: OperatorKind,
    pub return_type: TypeRef,
    pub return_ref_kind: RefKind,
    pub return_parameter: DeclId,
    pub return_attributes: Vec<AttributeDecl>,
    pub parameters: Vec<ParameterBuilder>,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub is_async: bool,
    pub is_iterator: bool,
}

impl MethodBuilder {
    pub fn new(ids: &mut IdAllocator, declaring_type: DeclId, name: impl Into<String>, aspect: impl Into<String>) -> Self {
        let id = ids.allocate();
        Self {
            base: MemberBuilderBase::new(id, name, declaring_type, aspect),
            method_kind: MethodKind::Default,
            operator_kind: OperatorKind::None,
            return_type: TypeRef::Void,
            return_ref_kind: RefKind::None,
            return_parameter: ids.allocate(),
            return_attributes: Vec::new(),
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            is_async: false,
            is_iterator: false,
        }
    }

    pub fn finalizer(ids: &mut IdAllocator, declaring_type: DeclId, aspect: impl Into<String>) -> Self {
        let mut builder = MethodBuilder::new(ids, declaring_type, "Finalize", aspect);
        builder.method_kind = MethodKind::Finalizer;
        builder.base.accessibility = Accessibility::Protected;
        builder.base.is_override = true;
        builder
    }

    pub fn add_parameter(&mut self, ids: &mut IdAllocator, name: impl Into<String>, ty: TypeRef) -> &mut ParameterBuilder {
        self.parameters.push(ParameterBuilder::new(ids, name, ty));
        let last = self.parameters.len() - 1;
        &mut self.parameters[last]
    }

    pub fn parameter_types(&self) -> Vec<TypeRef> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    pub fn freeze(&self) -> IntroducedMember {
        let id = self.base.id;
        let mut declarations = vec![return_parameter(
            self.return_parameter,
            id,
            &self.return_type,
            self.return_attributes.clone(),
        )];
        let parameters = freeze_parameters(id, &self.parameters, &mut declarations);
        let method = Declaration::Method(MethodDecl {
            member: self.base.member_info(),
            method_kind: self.method_kind,
            operator_kind: self.operator_kind,
            return_type: self.return_type.clone(),
            return_ref_kind: self.return_ref_kind,
            return_parameter: self.return_parameter,
            parameters,
            type_parameters: self.type_parameters.clone(),
            is_async: self.is_async,
            is_iterator: self.is_iterator,
            associated_member: None,
            body: None,
        });
        let kind = method.kind();
        declarations.insert(0, (id, method));
        IntroducedMember {
            member: id,
            kind,
            declaring_type: self.base.declaring_type,
            declarations,
            replaces_existing: false,
            overridden: self.base.overridden,
        }
    }
}

/// Accessor of an introduced property, indexer or event
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorBuilder {
    pub id: DeclId,
    pub return_parameter: DeclId,
    pub value_parameter: Option<DeclId>,
    pub accessibility: Option<Accessibility>,
    pub attributes: Vec<AttributeDecl>,
}

impl AccessorBuilder {
    pub fn new(ids: &mut IdAllocator, takes_value: bool) -> Self {
        Self {
            id: ids.allocate(),
            return_parameter: ids.allocate(),
            value_parameter: takes_value.then(|| ids.allocate()),
            accessibility: None,
            attributes: Vec::new(),
        }
    }

    fn freeze(
        &self,
        owner: DeclId,
        owner_info: &MemberInfo,
        kind: MethodKind,
        prefix: &str,
        value_type: &TypeRef,
        out: &mut Vec<(DeclId, Declaration)>,
    ) -> DeclId {
        let return_type = if kind == MethodKind::PropertyGet {
            value_type.clone()
        } else {
            TypeRef::Void
        };
        out.push(return_parameter(self.return_parameter, self.id, &return_type, Vec::new()));

        let mut parameters = Vec::new();
        if let Some(value) = self.value_parameter {
            out.push((
                value,
                Declaration::Parameter(ParameterDecl {
                    name: "value".to_string(),
                    ty: value_type.clone(),
                    ref_kind: RefKind::None,
                    position: ParameterPosition::Index(0),
                    owner: self.id,
                    default_value: None,
                    attributes: Vec::new(),
                }),
            ));
            parameters.push(value);
        }

        let mut member = owner_info.clone();
        member.name = format!("{}_{}", prefix, owner_info.name);
        member.accessibility = self.accessibility.unwrap_or(owner_info.accessibility);
        member.attributes = self.attributes.clone();
        out.push((
            self.id,
            Declaration::Method(MethodDecl {
                member,
                method_kind: kind,
                operator_kind: OperatorKind::None,
                return_type,
                return_ref_kind: RefKind::None,
                return_parameter: self.return_parameter,
                parameters,
                type_parameters: Vec::new(),
                is_async: false,
                is_iterator: false,
                associated_member: Some(owner),
                body: None,
            }),
        ));
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldBuilder {
    pub base: MemberBuilderBase,
    pub ty: TypeRef,
    pub writeability: Writeability,
    pub initializer: Option<Expression>,
}

impl FieldBuilder {
    pub fn new(ids: &mut IdAllocator, declaring_type: DeclId, name: impl Into<String>, ty: TypeRef, aspect: impl Into<String>) -> Self {
        Self {
            base: MemberBuilderBase::new(ids.allocate(), name, declaring_type, aspect),
            ty,
            writeability: Writeability::All,
            initializer: None,
        }
    }

    pub fn freeze(&self) -> IntroducedMember {
        IntroducedMember {
            member: self.base.id,
            kind: DeclarationKind::Field,
            declaring_type: self.base.declaring_type,
            declarations: vec![(
                self.base.id,
                Declaration::Field(FieldDecl {
                    member: self.base.member_info(),
                    ty: self.ty.clone(),
                    writeability: self.writeability,
                    initializer: self.initializer.clone(),
                }),
            )],
            replaces_existing: false,
            overridden: self.base.overridden,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBuilder {
    pub base: MemberBuilderBase,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub getter: Option<AccessorBuilder>,
    pub setter: Option<AccessorBuilder>,
    pub is_auto: bool,
    pub writeability: Writeability,
    pub initializer: Option<Expression>,
    /// Promoting a field keeps the field's id
    pub replaces_existing: bool,
}

impl PropertyBuilder {
    pub fn new(
        ids: &mut IdAllocator,
        declaring_type: DeclId,
        name: impl Into<String>,
        ty: TypeRef,
        has_getter: bool,
        has_setter: bool,
        aspect: impl Into<String>,
    ) -> Self {
        let id = ids.allocate();
        Self::with_id(ids, id, declaring_type, name, ty, has_getter, has_setter, aspect)
    }

    #[allow(clippy::too_many_arguments)]
    fn with_id(
        ids: &mut IdAllocator,
        id: DeclId,
        declaring_type: DeclId,
        name: impl Into<String>,
        ty: TypeRef,
        has_getter: bool,
        has_setter: bool,
        aspect: impl Into<String>,
    ) -> Self {
        Self {
            base: MemberBuilderBase::new(id, name, declaring_type, aspect),
            ty,
            ref_kind: RefKind::None,
            getter: has_getter.then(|| AccessorBuilder::new(ids, false)),
            setter: has_setter.then(|| AccessorBuilder::new(ids, true)),
            is_auto: false,
            writeability: if has_setter {
                Writeability::All
            } else {
                Writeability::None
            },
            initializer: None,
            replaces_existing: false,
        }
    }

    /// Property replacing a field under the same id
    pub fn promote(compilation: &Compilation, field: DeclId, ids: &mut IdAllocator, aspect: impl Into<String>) -> Result<Self> {
        let Some(Declaration::Field(f)) = compilation.declaration(field) else {
            return Err(Error::AssertionFailed(format!(
                "{} is not a field",
                compilation.display_name(field)
            )));
        };
        let mut builder = Self::with_id(
            ids,
            field,
            f.member.declaring_type,
            f.member.name.clone(),
            f.ty.clone(),
            true,
            f.writeability != Writeability::None,
            aspect,
        );
        let aspect_name = builder.base.aspect.clone();
        builder.base = MemberBuilderBase {
            id: field,
            aspect: aspect_name,
            ..from_member_info(&f.member)
        };
        builder.is_auto = true;
        builder.writeability = f.writeability;
        builder.initializer = f.initializer.clone();
        builder.replaces_existing = true;
        Ok(builder)
    }

    pub fn freeze(&self) -> IntroducedMember {
        let id = self.base.id;
        let info = self.base.member_info();
        let mut declarations = Vec::new();
        let getter = self
            .getter
            .as_ref()
            .map(|g| g.freeze(id, &info, MethodKind::PropertyGet, "get", &self.ty, &mut declarations));
        let setter = self
            .setter
            .as_ref()
            .map(|s| s.freeze(id, &info, MethodKind::PropertySet, "set", &self.ty, &mut declarations));
        declarations.insert(
            0,
            (
                id,
                Declaration::Property(PropertyDecl {
                    member: info,
                    ty: self.ty.clone(),
                    ref_kind: self.ref_kind,
                    getter,
                    setter,
                    is_auto: self.is_auto,
                    writeability: self.writeability,
                    initializer: self.initializer.clone(),
                }),
            ),
        );
        IntroducedMember {
            member: id,
            kind: DeclarationKind::Property,
            declaring_type: self.base.declaring_type,
            declarations,
            replaces_existing: self.replaces_existing,
            overridden: self.base.overridden,
        }
    }
}

fn from_member_info(info: &MemberInfo) -> MemberBuilderBase {
    MemberBuilderBase {
        id: DeclId(0),
        name: info.name.clone(),
        declaring_type: info.declaring_type,
        accessibility: info.accessibility,
        is_static: info.is_static,
        is_virtual: info.is_virtual,
        is_sealed: info.is_sealed,
        is_abstract: info.is_abstract,
        is_override: info.is_override,
        is_new: info.is_new,
        attributes: info.attributes.clone(),
        explicit_interface: info.explicit_interface.clone(),
        overridden: None,
        aspect: String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventBuilder {
    pub base: MemberBuilderBase,
    pub ty: TypeRef,
    pub adder: AccessorBuilder,
    pub remover: AccessorBuilder,
    pub raiser: Option<AccessorBuilder>,
    pub is_event_field: bool,
    pub initializer: Option<Expression>,
}

impl EventBuilder {
    pub fn new(ids: &mut IdAllocator, declaring_type: DeclId, name: impl Into<String>, ty: TypeRef, aspect: impl Into<String>) -> Self {
        let id = ids.allocate();
        Self {
            base: MemberBuilderBase::new(id, name, declaring_type, aspect),
            ty,
            adder: AccessorBuilder::new(ids, true),
            remover: AccessorBuilder::new(ids, true),
            raiser: None,
            is_event_field: false,
            initializer: None,
        }
    }

    pub fn add_raiser(&mut self, ids: &mut IdAllocator) {
        if self.raiser.is_none() {
            self.raiser = Some(AccessorBuilder::new(ids, false));
        }
    }

    pub fn freeze(&self) -> IntroducedMember {
        let id = self.base.id;
        let info = self.base.member_info();
        let mut declarations = Vec::new();
        let adder = self
            .adder
            .freeze(id, &info, MethodKind::EventAdd, "add", &self.ty, &mut declarations);
        let remover = self
            .remover
            .freeze(id, &info, MethodKind::EventRemove, "remove", &self.ty, &mut declarations);
        let raiser = self
            .raiser
            .as_ref()
            .map(|r| r.freeze(id, &info, MethodKind::EventRaise, "raise", &self.ty, &mut declarations));
        declarations.insert(
            0,
            (
                id,
                Declaration::Event(EventDecl {
                    member: info,
                    ty: self.ty.clone(),
                    adder,
                    remover,
                    raiser,
                    is_event_field: self.is_event_field,
                    initializer: self.initializer.clone(),
                }),
            ),
        );
        IntroducedMember {
            member: id,
            kind: DeclarationKind::Event,
            declaring_type: self.base.declaring_type,
            declarations,
            replaces_existing: false,
            overridden: self.base.overridden,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexerBuilder {
    pub base: MemberBuilderBase,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub parameters: Vec<ParameterBuilder>,
    pub getter: Option<AccessorBuilder>,
    pub setter: Option<AccessorBuilder>,
}

impl IndexerBuilder {
    pub fn new(
        ids: &mut IdAllocator,
        declaring_type: DeclId,
        ty: TypeRef,
        has_getter: bool,
        has_setter: bool,
        aspect: impl Into<String>,
    ) -> Self {
        let id = ids.allocate();
        Self {
            base: MemberBuilderBase::new(id, "this[]", declaring_type, aspect),
            ty,
            ref_kind: RefKind::None,
            parameters: Vec::new(),
            getter: has_getter.then(|| AccessorBuilder::new(ids, false)),
            setter: has_setter.then(|| AccessorBuilder::new(ids, true)),
        }
    }

    pub fn add_parameter(&mut self, ids: &mut IdAllocator, name: impl Into<String>, ty: TypeRef) -> &mut ParameterBuilder {
        self.parameters.push(ParameterBuilder::new(ids, name, ty));
        let last = self.parameters.len() - 1;
        &mut self.parameters[last]
    }

    pub fn parameter_types(&self) -> Vec<TypeRef> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn freeze(&self) -> IntroducedMember {
        let id = self.base.id;
        let info = self.base.member_info();
        let mut accessor_info = info.clone();
        accessor_info.name = "Item".to_string();

        let mut declarations = Vec::new();
        let parameters = freeze_parameters(id, &self.parameters, &mut declarations);
        let getter = self
            .getter
            .as_ref()
            .map(|g| g.freeze(id, &accessor_info, MethodKind::PropertyGet, "get", &self.ty, &mut declarations));
        let setter = self
            .setter
            .as_ref()
            .map(|s| s.freeze(id, &accessor_info, MethodKind::PropertySet, "set", &self.ty, &mut declarations));
        declarations.insert(
            0,
            (
                id,
                Declaration::Indexer(IndexerDecl {
                    member: info,
                    ty: self.ty.clone(),
                    ref_kind: self.ref_kind,
                    parameters,
                    getter,
                    setter,
                }),
            ),
        );
        IntroducedMember {
            member: id,
            kind: DeclarationKind::Indexer,
            declaring_type: self.base.declaring_type,
            declarations,
            replaces_existing: false,
            overridden: self.base.overridden,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorBuilder {
    pub base: MemberBuilderBase,
    pub parameters: Vec<ParameterBuilder>,
    pub initializer: ConstructorInitializer,
    /// Materialized from an implicit constructor and keeps its id
    pub replaces_implicit: bool,
}

impl ConstructorBuilder {
    pub fn new(ids: &mut IdAllocator, declaring_type: DeclId, is_static: bool, aspect: impl Into<String>) -> Self {
        let name = if is_static { ".cctor" } else { ".ctor" };
        let mut base = MemberBuilderBase::new(ids.allocate(), name, declaring_type, aspect);
        base.is_static = is_static;
        base.accessibility = if is_static {
            Accessibility::Private
        } else {
            Accessibility::Public
        };
        Self {
            base,
            parameters: Vec::new(),
            initializer: ConstructorInitializer::default(),
            replaces_implicit: false,
        }
    }

    /// Explicit builder for an implicit constructor, reusing its id
    pub fn materialize(compilation: &Compilation, constructor: DeclId, aspect: impl Into<String>) -> Result<Self> {
        let ctor = compilation.constructor(constructor).ok_or_else(|| {
            Error::AssertionFailed(format!("{} is not a constructor", constructor))
        })?;
        if !ctor.is_implicit {
            return Err(Error::AssertionFailed(format!(
                "{} is not an implicit constructor",
                compilation.display_name(constructor)
            )));
        }
        let mut base = from_member_info(&ctor.member);
        base.id = constructor;
        base.aspect = aspect.into();
        Ok(Self {
            base,
            parameters: Vec::new(),
            initializer: ctor.initializer.clone(),
            replaces_implicit: true,
        })
    }

    pub fn add_parameter(&mut self, ids: &mut IdAllocator, name: impl Into<String>, ty: TypeRef) -> &mut ParameterBuilder {
        self.parameters.push(ParameterBuilder::new(ids, name, ty));
        let last = self.parameters.len() - 1;
        &mut self.parameters[last]
    }

    pub fn parameter_types(&self) -> Vec<TypeRef> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn freeze(&self) -> IntroducedMember {
        let id = self.base.id;
        let mut declarations = Vec::new();
        let parameters = freeze_parameters(id, &self.parameters, &mut declarations);
        let mut member = self.base.member_info();
        if self.replaces_implicit {
            member.origin = Origin::Source;
        }
        declarations.insert(
            0,
            (
                id,
                Declaration::Constructor(ConstructorDecl {
                    member,
                    parameters,
                    initializer: self.initializer.clone(),
                    is_implicit: false,
                    body: None,
                }),
            ),
        );
        IntroducedMember {
            member: id,
            kind: DeclarationKind::Constructor,
            declaring_type: self.base.declaring_type,
            declarations,
            replaces_existing: self.replaces_implicit,
            overridden: None,
        }
    }
}

/// Common view of the builders an introduction can freeze
pub trait MemberDraft {
    fn base(&self) -> &MemberBuilderBase;

    fn base_mut(&mut self) -> &mut MemberBuilderBase;

    fn kind(&self) -> DeclarationKind;

    /// Return type of methods, type of fields, properties, indexers and events
    fn value_type(&self) -> Option<&TypeRef>;

    fn freeze(&self) -> IntroducedMember;

    fn id(&self) -> DeclId {
        self.base().id
    }
}

impl MemberDraft for MethodBuilder {
    fn base(&self) -> &MemberBuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MemberBuilderBase {
        &mut self.base
    }

    fn kind(&self) -> DeclarationKind {
        if self.method_kind == MethodKind::Finalizer {
            DeclarationKind::Finalizer
        } else {
            DeclarationKind::Method
        }
    }

    fn value_type(&self) -> Option<&TypeRef> {
        match self.method_kind {
            MethodKind::Finalizer => None,
            _ => Some(&self.return_type),
        }
    }

    fn freeze(&self) -> IntroducedMember {
        MethodBuilder::freeze(self)
    }
}

impl MemberDraft for FieldBuilder {
    fn base(&self) -> &MemberBuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MemberBuilderBase {
        &mut self.base
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Field
    }

    fn value_type(&self) -> Option<&TypeRef> {
        Some(&self.ty)
    }

    fn freeze(&self) -> IntroducedMember {
        FieldBuilder::freeze(self)
    }
}

impl MemberDraft for PropertyBuilder {
    fn base(&self) -> &MemberBuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MemberBuilderBase {
        &mut self.base
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Property
    }

    fn value_type(&self) -> Option<&TypeRef> {
        Some(&self.ty)
    }

    fn freeze(&self) -> IntroducedMember {
        PropertyBuilder::freeze(self)
    }
}

impl MemberDraft for EventBuilder {
    fn base(&self) -> &MemberBuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MemberBuilderBase {
        &mut self.base
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Event
    }

    fn value_type(&self) -> Option<&TypeRef> {
        Some(&self.ty)
    }

    fn freeze(&self) -> IntroducedMember {
        EventBuilder::freeze(self)
    }
}

impl MemberDraft for IndexerBuilder {
    fn base(&self) -> &MemberBuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MemberBuilderBase {
        &mut self.base
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Indexer
    }

    fn value_type(&self) -> Option<&TypeRef> {
        Some(&self.ty)
    }

    fn freeze(&self) -> IntroducedMember {
        IndexerBuilder::freeze(self)
    }
}

impl MemberDraft for ConstructorBuilder {
    fn base(&self) -> &MemberBuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MemberBuilderBase {
        &mut self.base
    }

    fn kind(&self) -> DeclarationKind {
        DeclarationKind::Constructor
    }

    fn value_type(&self) -> Option<&TypeRef> {
        None
    }

    fn freeze(&self) -> IntroducedMember {
        ConstructorBuilder::freeze(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_freeze_assigns_owned_declarations() {
        let mut ids = IdAllocator::starting_at(100);
        let mut builder = MethodBuilder::new(&mut ids, DeclId(1), "Log", "Logging");
        builder.add_parameter(&mut ids, "message", TypeRef::named("string"));
        let frozen = builder.freeze();

        assert_eq!(frozen.member, DeclId(100));
        assert_eq!(frozen.kind, DeclarationKind::Method);
        // method, return parameter, one parameter
        assert_eq!(frozen.declarations.len(), 3);
        let Some(Declaration::Method(m)) = frozen.declaration() else {
            panic!("expected method");
        };
        assert_eq!(m.parameters, vec![DeclId(102)]);
        assert_eq!(
            m.member.origin,
            Origin::Introduced {
                aspect: "Logging".into()
            }
        );
    }

    #[test]
    fn test_property_accessor_names() {
        let mut ids = IdAllocator::starting_at(10);
        let builder = PropertyBuilder::new(&mut ids, DeclId(1), "Count", TypeRef::named("int"), true, true, "A");
        let frozen = builder.freeze();
        let names: Vec<&str> = frozen.declarations.iter().map(|(_, d)| d.name()).collect();
        assert!(names.contains(&"get_Count"));
        assert!(names.contains(&"set_Count"));
        assert!(names.contains(&"value"));
    }

    #[test]
    fn test_freeze_is_a_snapshot() {
        let mut ids = IdAllocator::starting_at(1);
        let mut builder = FieldBuilder::new(&mut ids, DeclId(0), "x", TypeRef::named("int"), "A");
        let frozen = builder.freeze();
        builder.base.name = "y".into();
        assert_eq!(frozen.name(), "x");
    }
}
