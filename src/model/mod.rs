//! Declaration model: the read-only program graph advice runs against
//!
//! Declarations live in an arena owned by an immutable [`Compilation`]
//! snapshot and are addressed by [`DeclId`] / [`Ref<T>`]. The set of
//! declaration kinds is closed: every match over [`Declaration`] is exhaustive.
//!
//! Accessors (get/set/add/remove/raise) and finalizers are [`MethodDecl`]s
//! distinguished by [`MethodKind`]; parameters, including the return parameter
//! of a method, are [`ParameterDecl`]s.

mod compilation;
mod document;
mod fold;
mod refs;
mod types;

pub use compilation::{AsyncInfo, Compilation, IteratorInfo};
pub use document::{
    AccessorDocument, CompilationDocument, ConstructorDocument, EventDocument, FieldDocument, FinalizerDocument,
    IndexerDocument, InitializerDocument, MemberDocument, MethodDocument, ModifiersDocument,
    ParameterDocument, PropertyDocument, TypeDocument,
};
pub use refs::{DeclId, IdAllocator, Ref};
pub use types::{EnumerableKind, TypeParseError, TypeRef};

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    #[default]
    Private,
    Protected,
    Internal,
    ProtectedInternal,
    Public,
}

impl Accessibility {
    pub fn is_public(self) -> bool {
        self == Accessibility::Public
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    #[default]
    None,
    Ref,
    Out,
    In,
    RefReadOnly,
}

/// Who may assign a field or property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Writeability {
    None,
    ConstructorOnly,
    InitOnly,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Default,
    Operator,
    ConversionOperator,
    PropertyGet,
    PropertySet,
    EventAdd,
    EventRemove,
    EventRaise,
    Finalizer,
}

impl MethodKind {
    pub fn is_accessor(self) -> bool {
        matches!(
            self,
            MethodKind::PropertyGet
                | MethodKind::PropertySet
                | MethodKind::EventAdd
                | MethodKind::EventRemove
                | MethodKind::EventRaise
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCategory {
    None,
    Unary,
    Binary,
    Conversion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    #[default]
    None,
    UnaryPlus,
    UnaryNegation,
    LogicalNot,
    OnesComplement,
    Increment,
    Decrement,
    True,
    False,
    Addition,
    Subtraction,
    Multiply,
    Division,
    Modulus,
    BitwiseAnd,
    BitwiseOr,
    ExclusiveOr,
    LeftShift,
    RightShift,
    Equality,
    Inequality,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    ImplicitConversion,
    ExplicitConversion,
}

impl OperatorKind {
    pub fn category(self) -> OperatorCategory {
        use OperatorKind::*;
        match self {
            None => OperatorCategory::None,
            UnaryPlus | UnaryNegation | LogicalNot | OnesComplement | Increment | Decrement
            | True | False => OperatorCategory::Unary,
            ImplicitConversion | ExplicitConversion => OperatorCategory::Conversion,
            _ => OperatorCategory::Binary,
        }
    }

    /// Number of run-time parameters an operator of this kind takes
    pub fn arity(self) -> usize {
        match self.category() {
            OperatorCategory::Binary => 2,
            OperatorCategory::Unary | OperatorCategory::Conversion => 1,
            OperatorCategory::None => 0,
        }
    }

    /// Metadata name, e.g. `op_Addition`
    pub fn metadata_name(self) -> String {
        format!("op_{:?}", self)
    }

    pub fn method_kind(self) -> MethodKind {
        match self.category() {
            OperatorCategory::Conversion => MethodKind::ConversionOperator,
            _ => MethodKind::Operator,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorInitializerKind {
    #[default]
    None,
    Base,
    This,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPosition {
    Return,
    Index(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Source,
    Introduced { aspect: String },
}

/// Closed set of declaration kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Type,
    Method,
    Property,
    Indexer,
    Event,
    Field,
    Constructor,
    Finalizer,
    Parameter,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclarationKind::Type => "type",
            DeclarationKind::Method => "method",
            DeclarationKind::Property => "property",
            DeclarationKind::Indexer => "indexer",
            DeclarationKind::Event => "event",
            DeclarationKind::Field => "field",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Finalizer => "finalizer",
            DeclarationKind::Parameter => "parameter",
        };
        write!(f, "{}", s)
    }
}

/// C#-like expression text produced for the external code generator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Expression(pub String);

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Expression(text.into())
    }

    pub fn default_literal() -> Self {
        Expression("default".to_string())
    }

    /// Serialize a run-time value into a literal expression
    pub fn literal(value: &Value) -> Result<Self> {
        let text = match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => serde_json::to_string(s)?,
            Value::Array(items) => {
                let rendered = items
                    .iter()
                    .map(|v| Expression::literal(v).map(|e| e.0))
                    .collect::<Result<Vec<_>>>()?;
                format!("new[] {{ {} }}", rendered.join(", "))
            }
            Value::Object(_) => {
                return Err(Error::InvalidAdviceParameters(
                    "objects cannot be serialized into literal expressions".into(),
                ))
            }
        };
        Ok(Expression(text))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An attribute applied to a declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttributeDecl {
    #[serde(rename = "type")]
    pub type_name: String,

    /// Named arguments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, Value>,
}

impl AttributeDecl {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Short name without namespace and without the `Attribute` suffix
    pub fn short_name(&self) -> &str {
        let last = self.type_name.rsplit('.').next().unwrap_or(self.type_name.as_str());
        last.strip_suffix("Attribute").unwrap_or(last)
    }

    /// `Template`, `TemplateAttribute` and `Ns.TemplateAttribute` all match `Template`
    pub fn is(&self, name: &str) -> bool {
        let wanted = name.rsplit('.').next().unwrap_or(name);
        let wanted = wanted.strip_suffix("Attribute").unwrap_or(wanted);
        self.short_name() == wanted
    }
}

/// Generic type parameter; compile-time ones are bound by the template expander
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(from = "TypeParameterForm")]
pub struct TypeParameterDecl {
    pub name: String,
    #[serde(default)]
    pub is_compile_time: bool,
}

#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum TypeParameterForm {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        is_compile_time: bool,
    },
}

impl From<TypeParameterForm> for TypeParameterDecl {
    fn from(form: TypeParameterForm) -> Self {
        match form {
            TypeParameterForm::Name(name) => TypeParameterDecl {
                name,
                is_compile_time: false,
            },
            TypeParameterForm::Full {
                name,
                is_compile_time,
            } => TypeParameterDecl {
                name,
                is_compile_time,
            },
        }
    }
}

impl TypeParameterDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_compile_time: false,
        }
    }
}

/// Modifiers and identity shared by all members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
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
    /// Interface whose member this one implements explicitly
    pub explicit_interface: Option<TypeRef>,
    pub origin: Origin,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>, declaring_type: DeclId) -> Self {
        Self {
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
            origin: Origin::Source,
        }
    }

    /// Whether a derived type can override this member
    pub fn is_overridable(&self) -> bool {
        !self.is_static && !self.is_sealed && (self.is_virtual || self.is_abstract || self.is_override)
    }

    pub fn is_explicit_interface_implementation(&self) -> bool {
        self.explicit_interface.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Full name, e.g. `Shop.Orders.Order`
    pub name: String,
    pub kind: TypeKind,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_sealed: bool,
    pub is_abstract: bool,
    /// `readonly struct`
    pub is_readonly: bool,
    pub base_type: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub members: Vec<DeclId>,
    pub attributes: Vec<AttributeDecl>,
    pub origin: Origin,
}

impl TypeDecl {
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(self.name.as_str())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn is_struct(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Types that cannot declare virtual members
    pub fn forbids_virtual_members(&self) -> bool {
        self.is_sealed || self.is_static || self.is_struct()
    }

    pub fn type_parameter_names(&self) -> Vec<String> {
        self.type_parameters.iter().map(|p| p.name.clone()).collect()
    }

    /// Reference to this type with its own type parameters as arguments
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::Named {
            name: self.name.clone(),
            args: self
                .type_parameters
                .iter()
                .map(|p| TypeRef::GenericParameter(p.name.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub member: MemberInfo,
    pub method_kind: MethodKind,
    pub operator_kind: OperatorKind,
    pub return_type: TypeRef,
    pub return_ref_kind: RefKind,
    pub return_parameter: DeclId,
    pub parameters: Vec<DeclId>,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub is_async: bool,
    /// Body contains `yield`
    pub is_iterator: bool,
    /// Property, indexer or event owning this accessor
    pub associated_member: Option<DeclId>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub position: ParameterPosition,
    pub owner: DeclId,
    pub default_value: Option<Expression>,
    pub attributes: Vec<AttributeDecl>,
}

impl ParameterDecl {
    pub fn is_return(&self) -> bool {
        self.position == ParameterPosition::Return
    }

    pub fn is_compile_time(&self) -> bool {
        self.attributes.iter().any(|a| a.is("CompileTime"))
    }

    pub fn index(&self) -> Option<u32> {
        match self.position {
            ParameterPosition::Index(i) => Some(i),
            ParameterPosition::Return => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub member: MemberInfo,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub getter: Option<DeclId>,
    pub setter: Option<DeclId>,
    pub is_auto: bool,
    pub writeability: Writeability,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerDecl {
    pub member: MemberInfo,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub parameters: Vec<DeclId>,
    pub getter: Option<DeclId>,
    pub setter: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDecl {
    pub member: MemberInfo,
    pub ty: TypeRef,
    pub adder: DeclId,
    pub remover: DeclId,
    pub raiser: Option<DeclId>,
    pub is_event_field: bool,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub member: MemberInfo,
    pub ty: TypeRef,
    pub writeability: Writeability,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructorInitializer {
    pub kind: ConstructorInitializerKind,
    /// Constructor called by the initializer; `None` when it is not in the model
    pub target: Option<DeclId>,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub member: MemberInfo,
    pub parameters: Vec<DeclId>,
    pub initializer: ConstructorInitializer,
    /// Compiler-provided default constructor with no syntax
    pub is_implicit: bool,
    pub body: Option<String>,
}

/// A declaration in the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaration {
    Type(TypeDecl),
    Method(MethodDecl),
    Property(PropertyDecl),
    Indexer(IndexerDecl),
    Event(EventDecl),
    Field(FieldDecl),
    Constructor(ConstructorDecl),
    Parameter(ParameterDecl),
}

impl Declaration {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Type(_) => DeclarationKind::Type,
            Declaration::Method(m) if m.method_kind == MethodKind::Finalizer => {
                DeclarationKind::Finalizer
            }
            Declaration::Method(_) => DeclarationKind::Method,
            Declaration::Property(_) => DeclarationKind::Property,
            Declaration::Indexer(_) => DeclarationKind::Indexer,
            Declaration::Event(_) => DeclarationKind::Event,
            Declaration::Field(_) => DeclarationKind::Field,
            Declaration::Constructor(_) => DeclarationKind::Constructor,
            Declaration::Parameter(_) => DeclarationKind::Parameter,
        }
    }

    pub fn member(&self) -> Option<&MemberInfo> {
        match self {
            Declaration::Method(d) => Some(&d.member),
            Declaration::Property(d) => Some(&d.member),
            Declaration::Indexer(d) => Some(&d.member),
            Declaration::Event(d) => Some(&d.member),
            Declaration::Field(d) => Some(&d.member),
            Declaration::Constructor(d) => Some(&d.member),
            Declaration::Type(_) | Declaration::Parameter(_) => None,
        }
    }

    pub fn member_mut(&mut self) -> Option<&mut MemberInfo> {
        match self {
            Declaration::Method(d) => Some(&mut d.member),
            Declaration::Property(d) => Some(&mut d.member),
            Declaration::Indexer(d) => Some(&mut d.member),
            Declaration::Event(d) => Some(&mut d.member),
            Declaration::Field(d) => Some(&mut d.member),
            Declaration::Constructor(d) => Some(&mut d.member),
            Declaration::Type(_) | Declaration::Parameter(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Declaration::Type(t) => &t.name,
            Declaration::Parameter(p) => &p.name,
            other => other.member().map(|m| m.name.as_str()).unwrap_or_default(),
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Declaration::Type(t) => t.is_static,
            Declaration::Parameter(_) => false,
            other => other.member().map(|m| m.is_static).unwrap_or(false),
        }
    }

    /// Type declaring this member; a type is its own declaring type
    pub fn declaring_type(&self) -> Option<DeclId> {
        self.member().map(|m| m.declaring_type)
    }

    pub fn attributes(&self) -> &[AttributeDecl] {
        match self {
            Declaration::Type(t) => &t.attributes,
            Declaration::Parameter(p) => &p.attributes,
            other => other.member().map(|m| m.attributes.as_slice()).unwrap_or_default(),
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<AttributeDecl> {
        match self {
            Declaration::Type(t) => &mut t.attributes,
            Declaration::Parameter(p) => &mut p.attributes,
            Declaration::Method(d) => &mut d.member.attributes,
            Declaration::Property(d) => &mut d.member.attributes,
            Declaration::Indexer(d) => &mut d.member.attributes,
            Declaration::Event(d) => &mut d.member.attributes,
            Declaration::Field(d) => &mut d.member.attributes,
            Declaration::Constructor(d) => &mut d.member.attributes,
        }
    }

    /// Return type of methods, type of fields, properties, indexers, events, parameters
    pub fn value_type(&self) -> Option<&TypeRef> {
        match self {
            Declaration::Method(m) => Some(&m.return_type),
            Declaration::Property(p) => Some(&p.ty),
            Declaration::Indexer(i) => Some(&i.ty),
            Declaration::Event(e) => Some(&e.ty),
            Declaration::Field(f) => Some(&f.ty),
            Declaration::Parameter(p) => Some(&p.ty),
            Declaration::Type(_) | Declaration::Constructor(_) => None,
        }
    }
}

/// Typed projection of a [`Declaration`], used by [`Ref<T>`]
pub trait DeclarationVariant: Sized {
    const KIND_NAME: &'static str;

    fn extract(declaration: &Declaration) -> Option<&Self>;
}

macro_rules! declaration_variant {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl DeclarationVariant for $ty {
            const KIND_NAME: &'static str = $name;

            fn extract(declaration: &Declaration) -> Option<&Self> {
                match declaration {
                    Declaration::$variant(d) => Some(d),
                    _ => None,
                }
            }
        }
    };
}

declaration_variant!(TypeDecl, Type, "type");
declaration_variant!(MethodDecl, Method, "method");
declaration_variant!(PropertyDecl, Property, "property");
declaration_variant!(IndexerDecl, Indexer, "indexer");
declaration_variant!(EventDecl, Event, "event");
declaration_variant!(FieldDecl, Field, "field");
declaration_variant!(ConstructorDecl, Constructor, "constructor");
declaration_variant!(ParameterDecl, Parameter, "parameter");

impl DeclarationVariant for Declaration {
    const KIND_NAME: &'static str = "declaration";

    fn extract(declaration: &Declaration) -> Option<&Self> {
        Some(declaration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_name_matching() {
        let attr = AttributeDecl::new("Weaver.Aspects.TemplateAttribute");
        assert!(attr.is("Template"));
        assert!(attr.is("TemplateAttribute"));
        assert!(!attr.is("Introduce"));
        assert_eq!(attr.short_name(), "Template");
    }

    #[test]
    fn test_operator_arity() {
        assert_eq!(OperatorKind::Addition.arity(), 2);
        assert_eq!(OperatorKind::UnaryNegation.arity(), 1);
        assert_eq!(OperatorKind::ImplicitConversion.arity(), 1);
        assert_eq!(OperatorKind::Addition.metadata_name(), "op_Addition");
        assert_eq!(
            OperatorKind::ExplicitConversion.method_kind(),
            MethodKind::ConversionOperator
        );
    }

    #[test]
    fn test_literal_expressions() {
        assert_eq!(Expression::literal(&json!("a\"b")).unwrap().0, "\"a\\\"b\"");
        assert_eq!(Expression::literal(&json!([1, 2])).unwrap().0, "new[] { 1, 2 }");
        assert_eq!(Expression::literal(&Value::Null).unwrap().0, "null");
        assert!(Expression::literal(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_type_parameter_shorthand() {
        let params: Vec<TypeParameterDecl> =
            serde_norway::from_str("- T\n- name: U\n  is_compile_time: true\n").unwrap();
        assert_eq!(params[0], TypeParameterDecl::new("T"));
        assert!(params[1].is_compile_time);
    }
}
