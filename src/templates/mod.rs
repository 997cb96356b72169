//! Template binding
//!
//! A template is a member of an aspect type carrying one of the template
//! attributes (`Template`, `Introduce`, `InterfaceMember`). This module finds
//! templates by name, selects the variant that applies to a target method
//! shape, checks signature compatibility, and binds template parameters to
//! target arguments.

pub mod binding;
pub mod selection;

pub use binding::{
    bind_template, verify_template_type, BindingTarget, BoundTemplateMethod,
    PartiallyBoundTemplateMethod, TemplateArgument,
};
pub use selection::{
    select_getter_template, select_method_template, GetterTemplateSelector,
    MethodTemplateSelector,
};

use crate::advice::{InterfaceMemberOverrideStrategy, IntroductionScope};
use crate::error::{Error, Result};
use crate::model::{
    Accessibility, AttributeDecl, Compilation, DeclId, Declaration, DeclarationVariant,
    MethodDecl, Ref,
};
use crate::object_reader::ObjectReader;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Runtime shape a template is written for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    Default,
    Async,
    #[serde(rename = "ienumerable")]
    IEnumerable,
    #[serde(rename = "ienumerator")]
    IEnumerator,
    #[serde(rename = "iasync_enumerable")]
    IAsyncEnumerable,
    #[serde(rename = "iasync_enumerator")]
    IAsyncEnumerator,
}

impl TemplateKind {
    pub fn is_async(self) -> bool {
        matches!(
            self,
            TemplateKind::Async | TemplateKind::IAsyncEnumerable | TemplateKind::IAsyncEnumerator
        )
    }
}

/// Which template attribute marks a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateAttributeKind {
    Template,
    Introduce,
    InterfaceMember,
}

impl TemplateAttributeKind {
    const ALL: [(TemplateAttributeKind, &'static str); 3] = [
        (TemplateAttributeKind::Template, "Template"),
        (TemplateAttributeKind::Introduce, "Introduce"),
        (TemplateAttributeKind::InterfaceMember, "InterfaceMember"),
    ];
}

/// Metadata read from the template attribute's named arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateInfo {
    pub attribute: Option<TemplateAttributeKind>,
    pub name: Option<String>,
    pub scope: Option<IntroductionScope>,
    pub accessibility: Option<Accessibility>,
    pub is_virtual: Option<bool>,
    pub is_sealed: Option<bool>,
    pub is_explicit: bool,
    pub when_exists: InterfaceMemberOverrideStrategy,
    pub declared_kind: Option<TemplateKind>,
}

impl TemplateInfo {
    pub fn from_attributes(attributes: &[AttributeDecl]) -> Result<TemplateInfo> {
        let Some((kind, attribute)) = TemplateAttributeKind::ALL.iter().find_map(|(kind, name)| {
            attributes.iter().find(|a| a.is(name)).map(|a| (*kind, a))
        }) else {
            return Ok(TemplateInfo::default());
        };

        let reader = ObjectReader::from_attribute(attribute);
        Ok(TemplateInfo {
            attribute: Some(kind),
            name: reader.get_as("Name")?,
            scope: reader.get_as("Scope")?,
            accessibility: reader.get_as("Accessibility")?,
            is_virtual: reader.get_as("IsVirtual")?,
            is_sealed: reader.get_as("IsSealed")?,
            is_explicit: reader.get_as("IsExplicit")?.unwrap_or(false),
            when_exists: reader.get_as("WhenExists")?.unwrap_or_default(),
            declared_kind: reader.get_as("Kind")?,
        })
    }

    pub fn is_template(&self) -> bool {
        self.attribute.is_some()
    }
}

/// Reference to a template declaration plus the metadata binding needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMember<T> {
    pub declaration: Ref<T>,
    /// Name of the template declaration itself
    pub name: String,
    /// Variant the template was written for
    pub selected_kind: TemplateKind,
    /// Shape the target is interpreted as
    pub interpreted_kind: TemplateKind,
    pub info: TemplateInfo,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_async: bool,
    pub is_iterator: bool,
}

impl<T: DeclarationVariant> TemplateMember<T> {
    /// Template metadata for the member `id`
    ///
    /// The declaration must be of variant `T`; the template attribute is not
    /// required so that accessors of a template property can be used directly.
    pub fn from_declaration(compilation: &Compilation, id: DeclId) -> Result<TemplateMember<T>> {
        let declaration = compilation.require_declaration(id)?;
        let typed: Ref<T> = Ref::try_from_declaration(id, declaration).ok_or_else(|| {
            Error::InvalidAdviceParameters(format!(
                "the template '{}' is a {}, expected a {}",
                compilation.display_name(id),
                declaration.kind(),
                T::KIND_NAME
            ))
        })?;

        let info = TemplateInfo::from_attributes(declaration.attributes())?;
        let (is_async, is_iterator) = match declaration {
            Declaration::Method(m) => (m.is_async, m.is_iterator),
            _ => (false, false),
        };
        let accessibility = declaration
            .member()
            .map(|m| m.accessibility)
            .unwrap_or_default();
        let selected_kind = info.declared_kind.unwrap_or(TemplateKind::Default);

        Ok(TemplateMember {
            declaration: typed,
            name: declaration.name().to_string(),
            selected_kind,
            interpreted_kind: selected_kind,
            accessibility: info.accessibility.unwrap_or(accessibility),
            is_static: declaration.is_static(),
            info,
            is_async,
            is_iterator,
        })
    }
}

impl<T> TemplateMember<T> {
    pub fn id(&self) -> DeclId {
        self.declaration.id()
    }

    pub fn with_kinds(mut self, selected: TemplateKind, interpreted: TemplateKind) -> Self {
        self.selected_kind = selected;
        self.interpreted_kind = interpreted;
        self
    }

    /// Name of the introduced member: explicit name, then attribute name, then
    /// the template's own name
    pub fn introduced_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.info.name.clone())
            .unwrap_or_else(|| self.name.clone())
    }
}

impl TemplateMember<MethodDecl> {
    /// Template for an accessor of a template property, indexer or event,
    /// inheriting the owner's template metadata
    pub fn accessor_of<O>(
        compilation: &Compilation,
        owner: &TemplateMember<O>,
        accessor: DeclId,
    ) -> Result<TemplateMember<MethodDecl>> {
        let mut template = TemplateMember::<MethodDecl>::from_declaration(compilation, accessor)?;
        let own_accessibility = compilation
            .method(accessor)
            .map(|m| m.member.accessibility)
            .unwrap_or(owner.accessibility);
        template.info = owner.info.clone();
        template.accessibility = own_accessibility.min(owner.accessibility);
        Ok(template)
    }
}

/// Find a template member by name in the aspect type or its ancestors
pub fn find_template(compilation: &Compilation, aspect_type: DeclId, name: &str) -> Result<DeclId> {
    for ty in compilation.hierarchy(aspect_type) {
        for (id, decl) in compilation.members_of(ty) {
            if decl.name() != name {
                continue;
            }
            if TemplateInfo::from_attributes(decl.attributes())?.is_template() {
                return Ok(id);
            }
        }
    }
    Err(Error::InvalidAdviceParameters(format!(
        "the aspect type '{}' has no template named '{}'",
        compilation.display_name(aspect_type),
        name
    )))
}

/// Template-author attributes to copy onto introduced members
pub fn copyable_attributes(attributes: &[AttributeDecl], excluded: &[String]) -> Vec<AttributeDecl> {
    attributes
        .iter()
        .filter(|a| !excluded.iter().any(|e| a.is(e)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyDecl;

    const ASPECT: &str = r#"
types:
  - name: Aspects.Logging
    members:
      - kind: method
        name: OverrideMethod
        returns: dynamic
        attributes:
          - type: Template
      - kind: method
        name: Helper
        returns: void
      - kind: property
        name: Counter
        type: int
        accessibility: public
        attributes:
          - type: Weaver.IntroduceAttribute
            arguments:
              Name: Count
              Scope: static
              IsVirtual: true
          - type: Obsolete
"#;

    #[test]
    fn test_find_template_requires_attribute() {
        let compilation = Compilation::from_yaml(ASPECT).unwrap();
        let aspect = compilation.find_type("Aspects.Logging").unwrap().id();
        assert!(find_template(&compilation, aspect, "OverrideMethod").is_ok());
        assert!(matches!(
            find_template(&compilation, aspect, "Helper"),
            Err(Error::InvalidAdviceParameters(_))
        ));
    }

    #[test]
    fn test_template_info_from_named_arguments() {
        let compilation = Compilation::from_yaml(ASPECT).unwrap();
        let aspect = compilation.find_type("Aspects.Logging").unwrap().id();
        let id = find_template(&compilation, aspect, "Counter").unwrap();
        let template = TemplateMember::<PropertyDecl>::from_declaration(&compilation, id).unwrap();
        assert_eq!(template.info.attribute, Some(TemplateAttributeKind::Introduce));
        assert_eq!(template.info.scope, Some(IntroductionScope::Static));
        assert_eq!(template.info.is_virtual, Some(true));
        assert_eq!(template.introduced_name(None), "Count");
        assert_eq!(template.introduced_name(Some("Explicit")), "Explicit");
    }

    #[test]
    fn test_wrong_variant_rejected() {
        let compilation = Compilation::from_yaml(ASPECT).unwrap();
        let aspect = compilation.find_type("Aspects.Logging").unwrap().id();
        let id = find_template(&compilation, aspect, "Counter").unwrap();
        assert!(TemplateMember::<MethodDecl>::from_declaration(&compilation, id).is_err());
    }

    #[test]
    fn test_copyable_attributes_filters_template_attributes() {
        let attrs = vec![
            AttributeDecl::new("Weaver.IntroduceAttribute"),
            AttributeDecl::new("Obsolete"),
        ];
        let copied = copyable_attributes(&attrs, &["Introduce".to_string()]);
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].type_name, "Obsolete");
    }
}
