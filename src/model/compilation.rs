//! Immutable compilation snapshots and the queries advice runs against

use super::{
    ConstructorDecl, DeclId, Declaration, DeclarationVariant, IdAllocator, MethodDecl, MethodKind,
    Ref, TypeDecl, TypeKind, TypeRef,
};
use crate::error::{Error, Result};
use crate::transformation::Transformation;
use im::{OrdMap, Vector};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Async shape of a method
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncInfo {
    /// Declared with `async`
    pub is_async: bool,
    /// Return type can be awaited
    pub is_awaitable: bool,
    /// Return type can be produced by an async method
    pub has_method_builder: bool,
    /// Type produced by awaiting the return value
    pub result_type: TypeRef,
}

impl AsyncInfo {
    pub fn is_awaitable_with_builder(&self) -> bool {
        self.is_awaitable && self.has_method_builder
    }
}

/// Iterator shape of a method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IteratorInfo {
    pub is_iterator: bool,
    pub enumerable_kind: super::EnumerableKind,
}

/// One immutable version of the program graph
///
/// Cloning is cheap: the arena is a persistent map shared between snapshots.
#[derive(Debug, Clone)]
pub struct Compilation {
    declarations: OrdMap<DeclId, Declaration>,
    types_by_name: OrdMap<String, DeclId>,
    transformations: Vector<Transformation>,
    revision: u32,
    next_id: u32,
}

impl Compilation {
    pub(crate) fn from_declarations(declarations: OrdMap<DeclId, Declaration>, next_id: u32) -> Self {
        let types_by_name = declarations
            .iter()
            .filter_map(|(id, d)| match d {
                Declaration::Type(t) => Some((t.name.clone(), *id)),
                _ => None,
            })
            .collect();
        Self {
            declarations,
            types_by_name,
            transformations: Vector::new(),
            revision: 0,
            next_id,
        }
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Allocator for declarations introduced on top of this snapshot
    pub fn id_allocator(&self) -> IdAllocator {
        IdAllocator::starting_at(self.next_id)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Transformations folded into this snapshot, in application order
    pub fn transformations(&self) -> impl Iterator<Item = &Transformation> {
        self.transformations.iter()
    }

    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(&id)
    }

    pub fn declarations(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.declarations.iter().map(|(id, d)| (*id, d))
    }

    /// Resolve a typed handle; `None` if absent from this snapshot or of another kind
    pub fn get<T: DeclarationVariant>(&self, r: Ref<T>) -> Option<&T> {
        self.declarations.get(&r.id()).and_then(T::extract)
    }

    pub fn require<T: DeclarationVariant>(&self, r: Ref<T>) -> Result<&T> {
        self.get(r).ok_or_else(|| {
            Error::AssertionFailed(format!(
                "{} {} does not exist in compilation revision {}",
                T::KIND_NAME,
                r.id(),
                self.revision
            ))
        })
    }

    pub fn require_declaration(&self, id: DeclId) -> Result<&Declaration> {
        self.declaration(id).ok_or_else(|| {
            Error::AssertionFailed(format!(
                "declaration {} does not exist in compilation revision {}",
                id, self.revision
            ))
        })
    }

    /// Typed handle to `id` if it is of variant `T`
    pub fn typed<T: DeclarationVariant>(&self, id: DeclId) -> Option<Ref<T>> {
        self.declaration(id)
            .and_then(|d| Ref::try_from_declaration(id, d))
    }

    pub fn type_decl(&self, id: DeclId) -> Option<&TypeDecl> {
        self.get(Ref::<TypeDecl>::new(id))
    }

    pub fn method(&self, id: DeclId) -> Option<&MethodDecl> {
        self.get(Ref::<MethodDecl>::new(id))
    }

    pub fn constructor(&self, id: DeclId) -> Option<&ConstructorDecl> {
        self.get(Ref::<ConstructorDecl>::new(id))
    }

    pub fn types(&self) -> impl Iterator<Item = (DeclId, &TypeDecl)> {
        self.types_by_name
            .values()
            .filter_map(move |id| self.type_decl(*id).map(|t| (*id, t)))
    }

    pub fn find_type(&self, name: &str) -> Option<Ref<TypeDecl>> {
        self.types_by_name.get(name).map(|id| Ref::new(*id))
    }

    /// Declared type a reference points to, when it is part of the compilation
    pub fn resolve_type_ref(&self, ty: &TypeRef) -> Option<DeclId> {
        match ty {
            TypeRef::Named { name, .. } => self.types_by_name.get(name).copied(),
            _ => None,
        }
    }

    /// Members declared directly by a type
    pub fn members_of(&self, type_id: DeclId) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.type_decl(type_id)
            .map(|t| t.members.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| self.declaration(*id).map(|d| (*id, d)))
    }

    pub fn base_type_of(&self, type_id: DeclId) -> Option<DeclId> {
        self.type_decl(type_id)
            .and_then(|t| t.base_type.as_ref())
            .and_then(|b| self.resolve_type_ref(b))
    }

    /// The type followed by its ancestors, closest first
    pub fn hierarchy(&self, type_id: DeclId) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = Some(type_id);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            chain.push(id);
            current = self.base_type_of(id);
        }
        chain
    }

    pub fn is_subtype_of(&self, type_id: DeclId, ancestor: DeclId) -> bool {
        self.hierarchy(type_id).contains(&ancestor)
    }

    pub fn parameter_types(&self, parameters: &[DeclId]) -> Vec<TypeRef> {
        parameters
            .iter()
            .filter_map(|id| match self.declaration(*id) {
                Some(Declaration::Parameter(p)) => Some(p.ty.clone()),
                _ => None,
            })
            .collect()
    }

    /// Run-time parameters of a method, indexer or constructor
    pub fn parameters_of(&self, member_id: DeclId) -> Vec<DeclId> {
        match self.declaration(member_id) {
            Some(Declaration::Method(m)) => m.parameters.clone(),
            Some(Declaration::Indexer(i)) => i.parameters.clone(),
            Some(Declaration::Constructor(c)) => c.parameters.clone(),
            _ => Vec::new(),
        }
    }

    /// Walk the hierarchy closest first and return the first member accepted by
    /// `matches`. Private members of ancestors are not visible.
    fn find_closest<F>(&self, type_id: DeclId, mut matches: F) -> Option<DeclId>
    where
        F: FnMut(DeclId, &Declaration) -> bool,
    {
        for (depth, ty) in self.hierarchy(type_id).into_iter().enumerate() {
            for (id, decl) in self.members_of(ty) {
                let Some(member) = decl.member() else {
                    continue;
                };
                if member.explicit_interface.is_some() {
                    continue;
                }
                if depth > 0 && member.accessibility == super::Accessibility::Private {
                    continue;
                }
                if matches(id, decl) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Closest visible method with the given name and parameter types
    pub fn find_closest_visible_method(
        &self,
        type_id: DeclId,
        name: &str,
        parameter_types: &[TypeRef],
    ) -> Option<DeclId> {
        self.find_closest(type_id, |_, decl| match decl {
            Declaration::Method(m) => {
                matches!(
                    m.method_kind,
                    MethodKind::Default | MethodKind::Operator | MethodKind::ConversionOperator
                ) && m.member.name == name
                    && self.parameter_types(&m.parameters) == parameter_types
            }
            _ => false,
        })
    }

    /// Closest visible non-overloadable member (field, property, event) or any
    /// method sharing the name
    pub fn find_closest_uniquely_named_member(&self, type_id: DeclId, name: &str) -> Option<DeclId> {
        self.find_closest(type_id, |_, decl| match decl {
            Declaration::Method(m) => m.method_kind == MethodKind::Default && m.member.name == name,
            Declaration::Property(_) | Declaration::Field(_) | Declaration::Event(_) => {
                decl.name() == name
            }
            Declaration::Indexer(_)
            | Declaration::Constructor(_)
            | Declaration::Type(_)
            | Declaration::Parameter(_) => false,
        })
    }

    pub fn find_closest_visible_indexer(
        &self,
        type_id: DeclId,
        parameter_types: &[TypeRef],
    ) -> Option<DeclId> {
        self.find_closest(type_id, |_, decl| match decl {
            Declaration::Indexer(i) => self.parameter_types(&i.parameters) == parameter_types,
            _ => false,
        })
    }

    /// Finalizer declared by the type itself
    pub fn finalizer_of(&self, type_id: DeclId) -> Option<DeclId> {
        self.members_of(type_id)
            .find(|(_, d)| matches!(d, Declaration::Method(m) if m.method_kind == MethodKind::Finalizer))
            .map(|(id, _)| id)
    }

    /// Finalizer of the type or its closest ancestor
    pub fn find_closest_finalizer(&self, type_id: DeclId) -> Option<DeclId> {
        self.hierarchy(type_id)
            .into_iter()
            .find_map(|t| self.finalizer_of(t))
    }

    /// Instance constructors declared by the type, implicit ones included
    pub fn constructors_of(&self, type_id: DeclId) -> Vec<DeclId> {
        self.members_of(type_id)
            .filter(|(_, d)| matches!(d, Declaration::Constructor(c) if !c.member.is_static))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn static_constructor_of(&self, type_id: DeclId) -> Option<DeclId> {
        self.members_of(type_id)
            .find(|(_, d)| matches!(d, Declaration::Constructor(c) if c.member.is_static))
            .map(|(id, _)| id)
    }

    pub fn constructors_of_exact_signature(
        &self,
        type_id: DeclId,
        parameter_types: &[TypeRef],
        is_static: bool,
    ) -> Option<DeclId> {
        self.members_of(type_id)
            .find(|(_, d)| match d {
                Declaration::Constructor(c) => {
                    c.member.is_static == is_static
                        && self.parameter_types(&c.parameters) == parameter_types
                }
                _ => false,
            })
            .map(|(id, _)| id)
    }

    /// Constructors whose initializer (explicit or implicit) calls `constructor`
    ///
    /// Covers `this(...)` chaining within the type and `base(...)` calls from
    /// directly derived types.
    pub fn chained_constructors(&self, constructor: DeclId) -> Vec<DeclId> {
        let Some(target) = self.constructor(constructor) else {
            return Vec::new();
        };
        let owner = target.member.declaring_type;
        let mut candidates = self.constructors_of(owner);
        for derived in self.derived_types_of(owner) {
            candidates.extend(self.constructors_of(derived));
        }
        candidates
            .into_iter()
            .filter(|id| *id != constructor)
            .filter(|id| {
                self.constructor(*id)
                    .map(|c| c.initializer.target == Some(constructor))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Types whose base type is `type_id`
    pub fn derived_types_of(&self, type_id: DeclId) -> Vec<DeclId> {
        self.types()
            .filter(|(id, _)| self.base_type_of(*id) == Some(type_id))
            .map(|(id, _)| id)
            .collect()
    }

    /// The interface followed by all interfaces it transitively extends, with
    /// generic arguments substituted. Interfaces outside the compilation are
    /// returned as leaves.
    pub fn interface_closure(&self, interface: &TypeRef) -> Vec<TypeRef> {
        let mut result: Vec<TypeRef> = Vec::new();
        let mut queue = VecDeque::from([interface.clone()]);
        while let Some(current) = queue.pop_front() {
            if result.contains(&current) {
                continue;
            }
            if let Some(decl) = self.resolve_type_ref(&current).and_then(|id| self.type_decl(id)) {
                let substitution = generic_substitution(decl, &current);
                for base in &decl.interfaces {
                    queue.push_back(base.substitute(&substitution));
                }
            }
            result.push(current);
        }
        result
    }

    /// Interfaces implemented by the type or any ancestor, transitively
    pub fn all_implemented_interfaces(&self, type_id: DeclId) -> Vec<TypeRef> {
        let mut result: Vec<TypeRef> = Vec::new();
        for ty in self.hierarchy(type_id) {
            let Some(decl) = self.type_decl(ty) else {
                continue;
            };
            for interface in &decl.interfaces {
                for i in self.interface_closure(interface) {
                    if !result.contains(&i) {
                        result.push(i);
                    }
                }
            }
        }
        result
    }

    pub fn implements_interface(&self, type_id: DeclId, interface: &TypeRef) -> bool {
        self.all_implemented_interfaces(type_id).contains(interface)
    }

    /// Generic argument mapping of a constructed reference to a declared type
    pub fn substitution_for(&self, ty: &TypeRef) -> BTreeMap<String, TypeRef> {
        self.resolve_type_ref(ty)
            .and_then(|id| self.type_decl(id))
            .map(|decl| generic_substitution(decl, ty))
            .unwrap_or_default()
    }

    /// Whether values of `ty` can be awaited
    pub fn is_awaitable(&self, ty: &TypeRef) -> bool {
        if ty.is_task_like() {
            return true;
        }
        self.resolve_type_ref(ty)
            .map(|id| {
                self.hierarchy(id).into_iter().any(|t| {
                    self.members_of(t)
                        .any(|(_, d)| matches!(d, Declaration::Method(m) if m.member.name == "GetAwaiter"))
                })
            })
            .unwrap_or(false)
    }

    /// Whether an async method can return `ty`
    pub fn has_method_builder(&self, ty: &TypeRef) -> bool {
        if ty.is_task_like() {
            return true;
        }
        self.resolve_type_ref(ty)
            .and_then(|id| self.type_decl(id))
            .map(|t| t.attributes.iter().any(|a| a.is("AsyncMethodBuilder")))
            .unwrap_or(false)
    }

    pub fn async_info(&self, method: &MethodDecl) -> AsyncInfo {
        let ty = &method.return_type;
        let result_type = match ty.args() {
            [single] if self.is_awaitable(ty) => single.clone(),
            _ if self.is_awaitable(ty) => TypeRef::Void,
            _ => ty.clone(),
        };
        AsyncInfo {
            is_async: method.is_async,
            is_awaitable: self.is_awaitable(ty),
            has_method_builder: self.has_method_builder(ty),
            result_type,
        }
    }

    pub fn iterator_info(&self, method: &MethodDecl) -> IteratorInfo {
        let enumerable_kind = method.return_type.enumerable_kind();
        IteratorInfo {
            is_iterator: method.is_iterator || (method.is_async && enumerable_kind.is_async()),
            enumerable_kind,
        }
    }

    /// Human-readable name used in diagnostics
    pub fn display_name(&self, id: DeclId) -> String {
        let Some(decl) = self.declaration(id) else {
            return id.to_string();
        };
        match decl {
            Declaration::Type(t) => t.name.clone(),
            Declaration::Parameter(p) => {
                let owner = self.display_name(p.owner);
                if p.is_return() {
                    format!("{}:return", owner)
                } else {
                    format!("{}:{}", owner, p.name)
                }
            }
            Declaration::Method(m) => {
                format!("{}({})", self.member_path(decl), self.render_parameters(&m.parameters))
            }
            Declaration::Constructor(c) => {
                format!("{}({})", self.member_path(decl), self.render_parameters(&c.parameters))
            }
            Declaration::Indexer(i) => format!(
                "{}.this[{}]",
                self.declaring_type_name(decl),
                self.render_parameters(&i.parameters)
            ),
            Declaration::Property(_) | Declaration::Event(_) | Declaration::Field(_) => {
                self.member_path(decl)
            }
        }
    }

    fn declaring_type_name(&self, decl: &Declaration) -> String {
        decl.declaring_type()
            .and_then(|t| self.type_decl(t))
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    fn member_path(&self, decl: &Declaration) -> String {
        let name = match decl {
            Declaration::Constructor(c) if c.member.is_static => ".cctor",
            Declaration::Constructor(_) => ".ctor",
            other => other.name(),
        };
        format!("{}.{}", self.declaring_type_name(decl), name)
    }

    fn render_parameters(&self, parameters: &[DeclId]) -> String {
        self.parameter_types(parameters)
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Content hash of the snapshot (sha256, hex)
    pub fn hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for (id, decl) in &self.declarations {
            hasher.update(id.0.to_le_bytes());
            hasher.update(serde_json::to_vec(decl)?);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    pub(crate) fn with_changes(
        &self,
        declarations: OrdMap<DeclId, Declaration>,
        transformations: &[Transformation],
        next_id: u32,
    ) -> Compilation {
        let mut next = Compilation::from_declarations(declarations, next_id.max(self.next_id));
        next.revision = self.revision + 1;
        next.transformations = self.transformations.clone();
        next.transformations.extend(transformations.iter().cloned());
        next
    }

    pub(crate) fn declarations_map(&self) -> &OrdMap<DeclId, Declaration> {
        &self.declarations
    }

    pub(crate) fn is_class(&self, type_id: DeclId) -> bool {
        self.type_decl(type_id)
            .map(|t| t.kind == TypeKind::Class)
            .unwrap_or(false)
    }
}

fn generic_substitution(decl: &TypeDecl, constructed: &TypeRef) -> BTreeMap<String, TypeRef> {
    decl.type_parameters
        .iter()
        .zip(constructed.args())
        .map(|(p, a)| (p.name.clone(), a.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIERARCHY: &str = r#"
types:
  - name: Ns.Base
    accessibility: public
    members:
      - kind: method
        name: Run
        accessibility: public
        is_virtual: true
        parameters:
          - name: x
            type: int
      - kind: field
        name: secret
        type: int
  - name: Ns.Derived
    accessibility: public
    base_type: Ns.Base
    interfaces: [Ns.IChild]
  - name: Ns.IParent
    kind: interface
    type_parameters: [T]
  - name: Ns.IChild
    kind: interface
    interfaces: ["Ns.IParent<int>"]
"#;

    #[test]
    fn test_closest_method_searches_ancestors() {
        let compilation = Compilation::from_yaml(HIERARCHY).unwrap();
        let derived = compilation.find_type("Ns.Derived").unwrap().id();
        let found = compilation
            .find_closest_visible_method(derived, "Run", &[TypeRef::named("int")])
            .unwrap();
        assert_eq!(compilation.display_name(found), "Ns.Base.Run(int)");
        assert!(compilation
            .find_closest_visible_method(derived, "Run", &[])
            .is_none());
    }

    #[test]
    fn test_private_ancestor_members_are_hidden() {
        let compilation = Compilation::from_yaml(HIERARCHY).unwrap();
        let derived = compilation.find_type("Ns.Derived").unwrap().id();
        let base = compilation.find_type("Ns.Base").unwrap().id();
        assert!(compilation
            .find_closest_uniquely_named_member(derived, "secret")
            .is_none());
        assert!(compilation
            .find_closest_uniquely_named_member(base, "secret")
            .is_some());
    }

    #[test]
    fn test_interface_closure_substitutes_arguments() {
        let compilation = Compilation::from_yaml(HIERARCHY).unwrap();
        let derived = compilation.find_type("Ns.Derived").unwrap().id();
        let interfaces: Vec<String> = compilation
            .all_implemented_interfaces(derived)
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(interfaces, vec!["Ns.IChild", "Ns.IParent<int>"]);
    }

    #[test]
    fn test_awaitable_shapes() {
        let compilation = Compilation::from_yaml(HIERARCHY).unwrap();
        assert!(compilation.is_awaitable(&TypeRef::parse("Task<int>").unwrap()));
        assert!(!compilation.is_awaitable(&TypeRef::named("int")));
        assert!(!compilation.has_method_builder(&TypeRef::named("Ns.Base")));
    }

    #[test]
    fn test_hash_is_stable() {
        let a = Compilation::from_yaml(HIERARCHY).unwrap();
        let b = Compilation::from_yaml(HIERARCHY).unwrap();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }
}
