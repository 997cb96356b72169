//! YAML compilation documents
//!
//! A compilation is described as nested types → members → parameters. Loading
//! assigns declaration ids in document order, creates accessor and return
//! parameter declarations, materializes implicit default constructors, and
//! resolves constructor initializer targets.

use super::{
    Accessibility, AttributeDecl, Compilation, ConstructorDecl, ConstructorInitializer,
    ConstructorInitializerKind, DeclId, Declaration, EventDecl, Expression, FieldDecl,
    IdAllocator, IndexerDecl, MemberInfo, MethodDecl, MethodKind, Origin, OperatorKind,
    ParameterDecl, ParameterPosition, PropertyDecl, RefKind, TypeDecl, TypeKind,
    TypeParameterDecl, TypeRef, Writeability,
};
use crate::error::{Error, Result};
use im::OrdMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

fn void() -> TypeRef {
    TypeRef::Void
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompilationDocument {
    #[serde(default)]
    pub types: Vec<TypeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeDocument {
    /// Full name, namespace included
    pub name: String,

    #[serde(default)]
    pub kind: TypeKind,

    #[serde(default)]
    pub accessibility: Accessibility,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub is_sealed: bool,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub is_readonly: bool,

    #[serde(default)]
    pub base_type: Option<TypeRef>,

    #[serde(default)]
    pub interfaces: Vec<TypeRef>,

    #[serde(default)]
    pub type_parameters: Vec<TypeParameterDecl>,

    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,

    #[serde(default)]
    pub members: Vec<MemberDocument>,
}

/// Modifiers shared by every member document
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ModifiersDocument {
    #[serde(default)]
    pub accessibility: Option<Accessibility>,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub is_virtual: bool,

    #[serde(default)]
    pub is_sealed: bool,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub is_override: bool,

    #[serde(default)]
    pub is_new: bool,

    #[serde(default)]
    pub explicit_interface: Option<TypeRef>,

    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberDocument {
    Method(MethodDocument),
    Property(PropertyDocument),
    Field(FieldDocument),
    Event(EventDocument),
    Indexer(IndexerDocument),
    Constructor(ConstructorDocument),
    Finalizer(FinalizerDocument),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParameterDocument {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub ref_kind: RefKind,

    #[serde(default)]
    pub default_value: Option<Expression>,

    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MethodDocument {
    /// Defaults to the operator metadata name for operators
    #[serde(default)]
    pub name: String,

    #[serde(default = "void")]
    pub returns: TypeRef,

    #[serde(default)]
    pub return_ref_kind: RefKind,

    #[serde(default)]
    pub operator: OperatorKind,

    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,

    #[serde(default)]
    pub type_parameters: Vec<TypeParameterDecl>,

    #[serde(default)]
    pub is_async: bool,

    #[serde(default)]
    pub is_iterator: bool,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub return_attributes: Vec<AttributeDecl>,

    #[serde(flatten)]
    pub modifiers: ModifiersDocument,
}

/// Accessor of a property, indexer or event
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AccessorDocument {
    #[serde(default)]
    pub accessibility: Option<Accessibility>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PropertyDocument {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub ref_kind: RefKind,

    #[serde(default)]
    pub get: Option<AccessorDocument>,

    #[serde(default)]
    pub set: Option<AccessorDocument>,

    #[serde(default)]
    pub init: Option<AccessorDocument>,

    #[serde(default)]
    pub is_auto: bool,

    #[serde(default)]
    pub initializer: Option<Expression>,

    #[serde(flatten)]
    pub modifiers: ModifiersDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldDocument {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub is_readonly: bool,

    #[serde(default)]
    pub initializer: Option<Expression>,

    #[serde(flatten)]
    pub modifiers: ModifiersDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventDocument {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub is_event_field: bool,

    #[serde(default)]
    pub add: Option<AccessorDocument>,

    #[serde(default)]
    pub remove: Option<AccessorDocument>,

    #[serde(default)]
    pub raise: Option<AccessorDocument>,

    #[serde(default)]
    pub initializer: Option<Expression>,

    #[serde(flatten)]
    pub modifiers: ModifiersDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexerDocument {
    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub ref_kind: RefKind,

    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,

    #[serde(default)]
    pub get: Option<AccessorDocument>,

    #[serde(default)]
    pub set: Option<AccessorDocument>,

    #[serde(default)]
    pub init: Option<AccessorDocument>,

    #[serde(flatten)]
    pub modifiers: ModifiersDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InitializerDocument {
    pub kind: ConstructorInitializerKind,

    #[serde(default)]
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConstructorDocument {
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,

    #[serde(default)]
    pub initializer: Option<InitializerDocument>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(flatten)]
    pub modifiers: ModifiersDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FinalizerDocument {
    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
}

impl Compilation {
    pub fn from_yaml(yaml: &str) -> Result<Compilation> {
        let document: CompilationDocument = serde_norway::from_str(yaml)?;
        Compilation::from_document(&document)
    }

    pub fn load(path: &Path) -> Result<Compilation> {
        let content = std::fs::read_to_string(path)?;
        Compilation::from_yaml(&content)
    }

    pub fn from_document(document: &CompilationDocument) -> Result<Compilation> {
        let mut loader = Loader {
            ids: IdAllocator::starting_at(1),
            declarations: OrdMap::new(),
        };

        let mut seen = std::collections::BTreeSet::new();
        for ty in &document.types {
            if !seen.insert(ty.name.as_str()) {
                return Err(Error::Model(format!("type '{}' is declared twice", ty.name)));
            }
        }

        for ty in &document.types {
            loader.load_type(ty)?;
        }
        loader.add_implicit_constructors();
        loader.resolve_constructor_initializers();

        debug!(
            types = document.types.len(),
            declarations = loader.declarations.len(),
            "loaded compilation"
        );
        Ok(Compilation::from_declarations(
            loader.declarations,
            loader.ids.peek(),
        ))
    }
}

struct Loader {
    ids: IdAllocator,
    declarations: OrdMap<DeclId, Declaration>,
}

/// Member context: declaring type and generic parameters in scope
struct Scope<'a> {
    type_id: DeclId,
    type_kind: TypeKind,
    generics: &'a [String],
}

impl Loader {
    fn insert(&mut self, id: DeclId, declaration: Declaration) {
        self.declarations.insert(id, declaration);
    }

    fn load_type(&mut self, doc: &TypeDocument) -> Result<()> {
        if doc.name.trim().is_empty() {
            return Err(Error::Model("type name cannot be empty".into()));
        }
        let type_id = self.ids.allocate();
        let generics: Vec<String> = doc.type_parameters.iter().map(|p| p.name.clone()).collect();
        let scope = Scope {
            type_id,
            type_kind: doc.kind,
            generics: &generics,
        };

        let mut members = Vec::new();
        for member in &doc.members {
            members.push(self.load_member(&scope, member)?);
        }

        self.insert(
            type_id,
            Declaration::Type(TypeDecl {
                name: doc.name.clone(),
                kind: doc.kind,
                accessibility: doc.accessibility,
                is_static: doc.is_static,
                is_sealed: doc.is_sealed || doc.kind == TypeKind::Struct,
                is_abstract: doc.is_abstract,
                is_readonly: doc.is_readonly,
                base_type: doc.base_type.as_ref().map(|b| b.bind_generic_parameters(&generics)),
                interfaces: doc
                    .interfaces
                    .iter()
                    .map(|i| i.bind_generic_parameters(&generics))
                    .collect(),
                type_parameters: doc.type_parameters.clone(),
                members,
                attributes: doc.attributes.clone(),
                origin: Origin::Source,
            }),
        );
        Ok(())
    }

    fn member_info(&self, scope: &Scope<'_>, name: &str, modifiers: &ModifiersDocument) -> MemberInfo {
        let in_interface = scope.type_kind == TypeKind::Interface;
        let default_accessibility = if in_interface || modifiers.explicit_interface.is_some() {
            Accessibility::Public
        } else {
            Accessibility::Private
        };
        MemberInfo {
            name: name.to_string(),
            declaring_type: scope.type_id,
            accessibility: modifiers.accessibility.unwrap_or(default_accessibility),
            is_static: modifiers.is_static,
            is_virtual: modifiers.is_virtual,
            is_sealed: modifiers.is_sealed,
            is_abstract: modifiers.is_abstract || (in_interface && !modifiers.is_static),
            is_override: modifiers.is_override,
            is_new: modifiers.is_new,
            attributes: modifiers.attributes.clone(),
            explicit_interface: modifiers
                .explicit_interface
                .as_ref()
                .map(|t| t.bind_generic_parameters(scope.generics)),
            origin: Origin::Source,
        }
    }

    fn load_member(&mut self, scope: &Scope<'_>, doc: &MemberDocument) -> Result<DeclId> {
        match doc {
            MemberDocument::Method(m) => self.load_method(scope, m),
            MemberDocument::Property(p) => self.load_property(scope, p),
            MemberDocument::Field(f) => self.load_field(scope, f),
            MemberDocument::Event(e) => self.load_event(scope, e),
            MemberDocument::Indexer(i) => self.load_indexer(scope, i),
            MemberDocument::Constructor(c) => self.load_constructor(scope, c),
            MemberDocument::Finalizer(f) => self.load_finalizer(scope, f),
        }
    }

    fn load_parameters(
        &mut self,
        owner: DeclId,
        docs: &[ParameterDocument],
        generics: &[String],
    ) -> Vec<DeclId> {
        docs.iter()
            .enumerate()
            .map(|(index, p)| {
                let id = self.ids.allocate();
                self.insert(
                    id,
                    Declaration::Parameter(ParameterDecl {
                        name: p.name.clone(),
                        ty: p.ty.bind_generic_parameters(generics),
                        ref_kind: p.ref_kind,
                        position: ParameterPosition::Index(index as u32),
                        owner,
                        default_value: p.default_value.clone(),
                        attributes: p.attributes.clone(),
                    }),
                );
                id
            })
            .collect()
    }

    fn return_parameter(&mut self, owner: DeclId, ty: &TypeRef, attributes: Vec<AttributeDecl>) -> DeclId {
        let id = self.ids.allocate();
        self.insert(
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
        );
        id
    }

    fn load_method(&mut self, scope: &Scope<'_>, doc: &MethodDocument) -> Result<DeclId> {
        let name = if doc.operator != OperatorKind::None && doc.name.is_empty() {
            doc.operator.metadata_name()
        } else {
            doc.name.clone()
        };
        if name.is_empty() {
            return Err(Error::Model("method name cannot be empty".into()));
        }

        let id = self.ids.allocate();
        let mut generics = scope.generics.to_vec();
        generics.extend(doc.type_parameters.iter().map(|p| p.name.clone()));

        let return_type = doc.returns.bind_generic_parameters(&generics);
        let return_parameter = self.return_parameter(id, &return_type, doc.return_attributes.clone());
        let parameters = self.load_parameters(id, &doc.parameters, &generics);

        let mut member = self.member_info(scope, &name, &doc.modifiers);
        if doc.operator != OperatorKind::None {
            member.is_static = true;
            member.accessibility = doc.modifiers.accessibility.unwrap_or(Accessibility::Public);
        }

        self.insert(
            id,
            Declaration::Method(MethodDecl {
                member,
                method_kind: match doc.operator {
                    OperatorKind::None => MethodKind::Default,
                    op => op.method_kind(),
                },
                operator_kind: doc.operator,
                return_type,
                return_ref_kind: doc.return_ref_kind,
                return_parameter,
                parameters,
                type_parameters: doc.type_parameters.clone(),
                is_async: doc.is_async,
                is_iterator: doc.is_iterator,
                associated_member: None,
                body: doc.body.clone(),
            }),
        );
        Ok(id)
    }

    /// Accessor method; setters and event accessors take a `value` parameter
    fn accessor(
        &mut self,
        owner: DeclId,
        owner_info: &MemberInfo,
        kind: MethodKind,
        prefix: &str,
        value_type: &TypeRef,
        doc: &AccessorDocument,
    ) -> DeclId {
        let id = self.ids.allocate();
        let takes_value = !matches!(kind, MethodKind::PropertyGet | MethodKind::EventRaise);
        let return_type = if kind == MethodKind::PropertyGet {
            value_type.clone()
        } else {
            TypeRef::Void
        };
        let return_parameter = self.return_parameter(id, &return_type, Vec::new());
        let parameters = if takes_value {
            let p = self.ids.allocate();
            self.insert(
                p,
                Declaration::Parameter(ParameterDecl {
                    name: "value".to_string(),
                    ty: value_type.clone(),
                    ref_kind: RefKind::None,
                    position: ParameterPosition::Index(0),
                    owner: id,
                    default_value: None,
                    attributes: Vec::new(),
                }),
            );
            vec![p]
        } else {
            Vec::new()
        };

        let mut member = owner_info.clone();
        member.name = format!("{}_{}", prefix, owner_info.name);
        member.accessibility = doc.accessibility.unwrap_or(owner_info.accessibility);
        member.attributes = doc.attributes.clone();

        self.insert(
            id,
            Declaration::Method(MethodDecl {
                member,
                method_kind: kind,
                operator_kind: OperatorKind::None,
                return_type,
                return_ref_kind: RefKind::None,
                return_parameter,
                parameters,
                type_parameters: Vec::new(),
                is_async: false,
                is_iterator: false,
                associated_member: Some(owner),
                body: doc.body.clone(),
            }),
        );
        id
    }

    fn load_property(&mut self, scope: &Scope<'_>, doc: &PropertyDocument) -> Result<DeclId> {
        let id = self.ids.allocate();
        let member = self.member_info(scope, &doc.name, &doc.modifiers);
        let ty = doc.ty.bind_generic_parameters(scope.generics);

        let no_accessors = doc.get.is_none() && doc.set.is_none() && doc.init.is_none();
        let default_accessor = AccessorDocument::default();
        let get = doc.get.as_ref().or(no_accessors.then_some(&default_accessor));
        let set = doc.set.as_ref().or(doc.init.as_ref()).or(no_accessors.then_some(&default_accessor));

        let getter = get.map(|g| self.accessor(id, &member, MethodKind::PropertyGet, "get", &ty, g));
        let setter = set.map(|s| self.accessor(id, &member, MethodKind::PropertySet, "set", &ty, s));

        let writeability = if doc.init.is_some() {
            Writeability::InitOnly
        } else if setter.is_some() {
            Writeability::All
        } else if doc.is_auto || no_accessors {
            Writeability::ConstructorOnly
        } else {
            Writeability::None
        };

        self.insert(
            id,
            Declaration::Property(PropertyDecl {
                member,
                ty,
                ref_kind: doc.ref_kind,
                getter,
                setter,
                is_auto: doc.is_auto || no_accessors,
                writeability,
                initializer: doc.initializer.clone(),
            }),
        );
        Ok(id)
    }

    fn load_field(&mut self, scope: &Scope<'_>, doc: &FieldDocument) -> Result<DeclId> {
        let id = self.ids.allocate();
        let member = self.member_info(scope, &doc.name, &doc.modifiers);
        self.insert(
            id,
            Declaration::Field(FieldDecl {
                member,
                ty: doc.ty.bind_generic_parameters(scope.generics),
                writeability: if doc.is_readonly {
                    Writeability::ConstructorOnly
                } else {
                    Writeability::All
                },
                initializer: doc.initializer.clone(),
            }),
        );
        Ok(id)
    }

    fn load_event(&mut self, scope: &Scope<'_>, doc: &EventDocument) -> Result<DeclId> {
        let id = self.ids.allocate();
        let member = self.member_info(scope, &doc.name, &doc.modifiers);
        let ty = doc.ty.bind_generic_parameters(scope.generics);
        let default_accessor = AccessorDocument::default();

        let adder = self.accessor(
            id,
            &member,
            MethodKind::EventAdd,
            "add",
            &ty,
            doc.add.as_ref().unwrap_or(&default_accessor),
        );
        let remover = self.accessor(
            id,
            &member,
            MethodKind::EventRemove,
            "remove",
            &ty,
            doc.remove.as_ref().unwrap_or(&default_accessor),
        );
        let raiser = doc
            .raise
            .as_ref()
            .map(|r| self.accessor(id, &member, MethodKind::EventRaise, "raise", &ty, r));

        self.insert(
            id,
            Declaration::Event(EventDecl {
                member,
                ty,
                adder,
                remover,
                raiser,
                is_event_field: doc.is_event_field,
                initializer: doc.initializer.clone(),
            }),
        );
        Ok(id)
    }

    fn load_indexer(&mut self, scope: &Scope<'_>, doc: &IndexerDocument) -> Result<DeclId> {
        let id = self.ids.allocate();
        let member = self.member_info(scope, "this[]", &doc.modifiers);
        let ty = doc.ty.bind_generic_parameters(scope.generics);
        let parameters = self.load_parameters(id, &doc.parameters, scope.generics);

        let mut accessor_info = member.clone();
        accessor_info.name = "Item".to_string();
        let getter = doc
            .get
            .as_ref()
            .map(|g| self.accessor(id, &accessor_info, MethodKind::PropertyGet, "get", &ty, g));
        let setter = doc
            .set
            .as_ref()
            .or(doc.init.as_ref())
            .map(|s| self.accessor(id, &accessor_info, MethodKind::PropertySet, "set", &ty, s));
        if getter.is_none() && setter.is_none() {
            return Err(Error::Model(format!(
                "indexer of type {} must declare at least one accessor",
                ty
            )));
        }

        self.insert(
            id,
            Declaration::Indexer(IndexerDecl {
                member,
                ty,
                ref_kind: doc.ref_kind,
                parameters,
                getter,
                setter,
            }),
        );
        Ok(id)
    }

    fn load_constructor(&mut self, scope: &Scope<'_>, doc: &ConstructorDocument) -> Result<DeclId> {
        let id = self.ids.allocate();
        let mut member = self.member_info(scope, ".ctor", &doc.modifiers);
        if member.is_static {
            member.name = ".cctor".to_string();
            member.accessibility = Accessibility::Private;
        }
        let parameters = self.load_parameters(id, &doc.parameters, scope.generics);
        let initializer = doc
            .initializer
            .as_ref()
            .map(|i| ConstructorInitializer {
                kind: i.kind,
                target: None,
                arguments: i.arguments.clone(),
            })
            .unwrap_or_default();

        self.insert(
            id,
            Declaration::Constructor(ConstructorDecl {
                member,
                parameters,
                initializer,
                is_implicit: false,
                body: doc.body.clone(),
            }),
        );
        Ok(id)
    }

    fn load_finalizer(&mut self, scope: &Scope<'_>, doc: &FinalizerDocument) -> Result<DeclId> {
        if scope.type_kind != TypeKind::Class {
            return Err(Error::Model("only classes can declare a finalizer".into()));
        }
        let id = self.ids.allocate();
        let return_parameter = self.return_parameter(id, &TypeRef::Void, Vec::new());
        let mut member = MemberInfo::new("Finalize", scope.type_id);
        member.accessibility = Accessibility::Protected;
        member.is_override = true;
        member.attributes = doc.attributes.clone();

        self.insert(
            id,
            Declaration::Method(MethodDecl {
                member,
                method_kind: MethodKind::Finalizer,
                operator_kind: OperatorKind::None,
                return_type: TypeRef::Void,
                return_ref_kind: RefKind::None,
                return_parameter,
                parameters: Vec::new(),
                type_parameters: Vec::new(),
                is_async: false,
                is_iterator: false,
                associated_member: None,
                body: doc.body.clone(),
            }),
        );
        Ok(id)
    }

    /// Classes and structs declaring no instance constructor get the
    /// compiler-provided default one
    fn add_implicit_constructors(&mut self) {
        let candidates: Vec<(DeclId, TypeDecl)> = self
            .declarations
            .iter()
            .filter_map(|(id, d)| match d {
                Declaration::Type(t)
                    if matches!(t.kind, TypeKind::Class | TypeKind::Struct) && !t.is_static =>
                {
                    Some((*id, t.clone()))
                }
                _ => None,
            })
            .collect();

        for (type_id, ty) in candidates {
            let has_instance_constructor = ty.members.iter().any(|m| {
                matches!(self.declarations.get(m), Some(Declaration::Constructor(c)) if !c.member.is_static)
            });
            if has_instance_constructor {
                continue;
            }

            let id = self.ids.allocate();
            let mut member = MemberInfo::new(".ctor", type_id);
            member.accessibility = if ty.is_abstract {
                Accessibility::Protected
            } else {
                Accessibility::Public
            };
            self.insert(
                id,
                Declaration::Constructor(ConstructorDecl {
                    member,
                    parameters: Vec::new(),
                    initializer: ConstructorInitializer::default(),
                    is_implicit: true,
                    body: None,
                }),
            );
            if let Some(Declaration::Type(t)) = self.declarations.get_mut(&type_id) {
                t.members.push(id);
            }
        }
    }

    /// Resolve which constructor each initializer calls: `this(...)` and
    /// `base(...)` by argument count, and the implicit base call to the base
    /// parameterless constructor
    fn resolve_constructor_initializers(&mut self) {
        let snapshot = Compilation::from_declarations(self.declarations.clone(), self.ids.peek());

        let mut resolved = Vec::new();
        for (id, decl) in snapshot.declarations() {
            let Declaration::Constructor(ctor) = decl else {
                continue;
            };
            if ctor.member.is_static {
                continue;
            }
            let owner = ctor.member.declaring_type;
            let arity = ctor.initializer.arguments.len();
            let by_arity = |candidates: Vec<DeclId>| {
                candidates
                    .into_iter()
                    .filter(|c| *c != id)
                    .find(|c| snapshot.parameters_of(*c).len() == arity)
            };
            let target = match ctor.initializer.kind {
                ConstructorInitializerKind::This => by_arity(snapshot.constructors_of(owner)),
                ConstructorInitializerKind::Base | ConstructorInitializerKind::None => {
                    if snapshot.is_class(owner) {
                        snapshot
                            .base_type_of(owner)
                            .and_then(|base| by_arity(snapshot.constructors_of(base)))
                    } else {
                        None
                    }
                }
            };
            resolved.push((id, target));
        }

        for (id, target) in resolved {
            if let Some(Declaration::Constructor(c)) = self.declarations.get_mut(&id) {
                c.initializer.target = target;
            }
        }
    }
}
