//! Structural type references
//!
//! Types are compared structurally. Text form is C#-like: `void`, `dynamic`,
//! `int`, `System.Threading.Tasks.Task<dynamic>`, `IEnumerable<T>`, `int[]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing a type reference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeParseError {
    #[error("Type reference cannot be empty")]
    Empty,

    #[error("Unexpected character '{0}' in type reference '{1}'")]
    UnexpectedChar(char, String),

    #[error("Unterminated type argument list in '{0}'")]
    Unterminated(String),
}

/// A structural reference to a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Void,
    Dynamic,
    Named { name: String, args: Vec<TypeRef> },
    GenericParameter(String),
    Array(Box<TypeRef>),
}

/// Iterator shape of a return type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnumerableKind {
    None,
    IEnumerable,
    IEnumerator,
    UntypedIEnumerable,
    UntypedIEnumerator,
    IAsyncEnumerable,
    IAsyncEnumerator,
}

impl EnumerableKind {
    pub fn is_async(self) -> bool {
        matches!(
            self,
            EnumerableKind::IAsyncEnumerable | EnumerableKind::IAsyncEnumerator
        )
    }
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    pub fn parse(text: &str) -> Result<Self, TypeParseError> {
        let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.is_empty() {
            return Err(TypeParseError::Empty);
        }
        let mut pos = 0;
        let ty = parse_type(&chars, &mut pos, text)?;
        if pos != chars.len() {
            return Err(TypeParseError::UnexpectedChar(chars[pos], text.to_string()));
        }
        Ok(ty)
    }

    /// Last segment of a named type (`Task` for `System.Threading.Tasks.Task<int>`)
    pub fn short_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { name, .. } => Some(name.rsplit('.').next().unwrap_or(name.as_str())),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, TypeRef::Dynamic)
    }

    /// `Task`, `Task<T>`, `ValueTask`, `ValueTask<T>`
    pub fn is_task_like(&self) -> bool {
        matches!(self.short_name(), Some("Task") | Some("ValueTask")) && self.args().len() <= 1
    }

    /// `Task<dynamic>` or `ValueTask<dynamic>`
    pub fn is_task_of_dynamic(&self) -> bool {
        self.is_task_like() && self.args().len() == 1 && self.args()[0].is_dynamic()
    }

    pub fn enumerable_kind(&self) -> EnumerableKind {
        let typed = self.args().len() == 1;
        match (self.short_name(), typed) {
            (Some("IEnumerable"), true) => EnumerableKind::IEnumerable,
            (Some("IEnumerable"), false) => EnumerableKind::UntypedIEnumerable,
            (Some("IEnumerator"), true) => EnumerableKind::IEnumerator,
            (Some("IEnumerator"), false) => EnumerableKind::UntypedIEnumerator,
            (Some("IAsyncEnumerable"), true) => EnumerableKind::IAsyncEnumerable,
            (Some("IAsyncEnumerator"), true) => EnumerableKind::IAsyncEnumerator,
            _ => EnumerableKind::None,
        }
    }

    /// Replace generic parameters by the mapped types
    pub fn substitute(&self, map: &BTreeMap<String, TypeRef>) -> TypeRef {
        match self {
            TypeRef::GenericParameter(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Named { name, args } => TypeRef::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            TypeRef::Array(elem) => TypeRef::Array(Box::new(elem.substitute(map))),
            TypeRef::Void | TypeRef::Dynamic => self.clone(),
        }
    }

    /// Turn argument-less named references matching `names` into generic parameters
    pub fn bind_generic_parameters(&self, names: &[String]) -> TypeRef {
        match self {
            TypeRef::Named { name, args } if args.is_empty() && names.contains(name) => {
                TypeRef::GenericParameter(name.clone())
            }
            TypeRef::Named { name, args } => TypeRef::Named {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|a| a.bind_generic_parameters(names))
                    .collect(),
            },
            TypeRef::Array(elem) => TypeRef::Array(Box::new(elem.bind_generic_parameters(names))),
            _ => self.clone(),
        }
    }

    pub fn contains_generic_parameter(&self) -> bool {
        match self {
            TypeRef::GenericParameter(_) => true,
            TypeRef::Named { args, .. } => args.iter().any(TypeRef::contains_generic_parameter),
            TypeRef::Array(elem) => elem.contains_generic_parameter(),
            _ => false,
        }
    }
}

fn parse_type(chars: &[char], pos: &mut usize, text: &str) -> Result<TypeRef, TypeParseError> {
    let start = *pos;
    while *pos < chars.len() && (chars[*pos].is_alphanumeric() || chars[*pos] == '_' || chars[*pos] == '.') {
        *pos += 1;
    }
    if start == *pos {
        return match chars.get(*pos) {
            Some(c) => Err(TypeParseError::UnexpectedChar(*c, text.to_string())),
            None => Err(TypeParseError::Empty),
        };
    }
    let name: String = chars[start..*pos].iter().collect();

    let mut args = Vec::new();
    if chars.get(*pos) == Some(&'<') {
        *pos += 1;
        loop {
            args.push(parse_type(chars, pos, text)?);
            match chars.get(*pos) {
                Some(',') => *pos += 1,
                Some('>') => {
                    *pos += 1;
                    break;
                }
                Some(c) => return Err(TypeParseError::UnexpectedChar(*c, text.to_string())),
                None => return Err(TypeParseError::Unterminated(text.to_string())),
            }
        }
    }

    let mut ty = match (name.as_str(), args.is_empty()) {
        ("void", true) => TypeRef::Void,
        ("dynamic", true) => TypeRef::Dynamic,
        _ => TypeRef::Named { name, args },
    };

    while chars.get(*pos) == Some(&'[') {
        if chars.get(*pos + 1) != Some(&']') {
            return Err(TypeParseError::UnexpectedChar('[', text.to_string()));
        }
        *pos += 2;
        ty = TypeRef::Array(Box::new(ty));
    }

    Ok(ty)
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Dynamic => write!(f, "dynamic"),
            TypeRef::GenericParameter(name) => write!(f, "{}", name),
            TypeRef::Array(elem) => write!(f, "{}[]", elem),
            TypeRef::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", rendered.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&s)
    }
}

impl From<TypeRef> for String {
    fn from(t: TypeRef) -> Self {
        t.to_string()
    }
}

impl std::str::FromStr for TypeRef {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeRef::parse(s)
    }
}
