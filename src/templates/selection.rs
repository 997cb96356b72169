//! Template variant selection

use super::{TemplateKind, TemplateMember};
use crate::error::{Error, Result};
use crate::model::{Compilation, EnumerableKind, MethodDecl};

/// Named template choices for a method advice
#[derive(Debug, Clone)]
pub struct MethodTemplateSelector {
    pub default_template: TemplateMember<MethodDecl>,
    pub async_template: Option<TemplateMember<MethodDecl>>,
    pub enumerable_template: Option<TemplateMember<MethodDecl>>,
    pub enumerator_template: Option<TemplateMember<MethodDecl>>,
    pub async_enumerable_template: Option<TemplateMember<MethodDecl>>,
    pub async_enumerator_template: Option<TemplateMember<MethodDecl>>,
    pub use_async_template_for_any_awaitable: bool,
    pub use_enumerable_template_for_any_enumerable: bool,
}

impl MethodTemplateSelector {
    pub fn new(default_template: TemplateMember<MethodDecl>) -> Self {
        Self {
            default_template,
            async_template: None,
            enumerable_template: None,
            enumerator_template: None,
            async_enumerable_template: None,
            async_enumerator_template: None,
            use_async_template_for_any_awaitable: false,
            use_enumerable_template_for_any_enumerable: false,
        }
    }
}

/// Pick the template variant for `target`
///
/// Iterator-specific templates win over the async template when both apply;
/// the async template covers plain async methods and is the fallback when no
/// iterator template was supplied.
pub fn select_method_template(
    compilation: &Compilation,
    target: &MethodDecl,
    selector: &MethodTemplateSelector,
) -> TemplateMember<MethodDecl> {
    let async_info = compilation.async_info(target);
    let iterator_info = compilation.iterator_info(target);
    let kind = iterator_info.enumerable_kind;

    let mut interpreted = TemplateKind::Default;
    let mut selected = &selector.default_template;
    let mut selected_kind = TemplateKind::Default;

    if async_info.is_async
        || (selector.use_async_template_for_any_awaitable
            && (async_info.is_awaitable_with_builder() || kind.is_async()))
    {
        interpreted = TemplateKind::Async;
        if let Some(t) = &selector.async_template {
            selected = t;
            selected_kind = TemplateKind::Async;
        }
    }

    let iterator_eligible = iterator_info.is_iterator
        || (selector.use_enumerable_template_for_any_enumerable && kind != EnumerableKind::None);

    let (specific, specific_kind) = match kind {
        EnumerableKind::None => (None, None),
        EnumerableKind::IEnumerable | EnumerableKind::UntypedIEnumerable => (
            selector.enumerable_template.as_ref(),
            Some(TemplateKind::IEnumerable),
        ),
        EnumerableKind::IEnumerator | EnumerableKind::UntypedIEnumerator => (
            selector.enumerator_template.as_ref(),
            Some(TemplateKind::IEnumerator),
        ),
        EnumerableKind::IAsyncEnumerable => (
            selector.async_enumerable_template.as_ref(),
            Some(TemplateKind::IAsyncEnumerable),
        ),
        EnumerableKind::IAsyncEnumerator => (
            selector.async_enumerator_template.as_ref(),
            Some(TemplateKind::IAsyncEnumerator),
        ),
    };

    if let (true, Some(specific_kind)) = (iterator_eligible, specific_kind) {
        if let Some(template) = specific {
            return template.clone().with_kinds(specific_kind, specific_kind);
        }
        interpreted = specific_kind;
    }

    selected.clone().with_kinds(selected_kind, interpreted)
}

/// Named getter template choices for a property advice
#[derive(Debug, Clone, Default)]
pub struct GetterTemplateSelector {
    pub default_template: Option<TemplateMember<MethodDecl>>,
    pub enumerable_template: Option<TemplateMember<MethodDecl>>,
    pub enumerator_template: Option<TemplateMember<MethodDecl>>,
    pub use_enumerable_template_for_any_enumerable: bool,
}

/// Pick the getter template for `target`
///
/// `required` is false when a setter template on the same property already
/// fulfils the accessor requirement.
pub fn select_getter_template(
    compilation: &Compilation,
    target: &MethodDecl,
    selector: &GetterTemplateSelector,
    required: bool,
) -> Result<Option<TemplateMember<MethodDecl>>> {
    let Some(default_template) = &selector.default_template else {
        if required {
            return Err(Error::InvalidAdviceParameters(
                "a default getter template is required".into(),
            ));
        }
        return Ok(None);
    };

    let iterator_info = compilation.iterator_info(target);
    let eligible = iterator_info.is_iterator
        || (selector.use_enumerable_template_for_any_enumerable
            && iterator_info.enumerable_kind != EnumerableKind::None);

    let specific = match iterator_info.enumerable_kind {
        EnumerableKind::IEnumerable | EnumerableKind::UntypedIEnumerable => selector
            .enumerable_template
            .as_ref()
            .map(|t| (t, TemplateKind::IEnumerable)),
        EnumerableKind::IEnumerator | EnumerableKind::UntypedIEnumerator => selector
            .enumerator_template
            .as_ref()
            .map(|t| (t, TemplateKind::IEnumerator)),
        _ => None,
    };

    match specific {
        Some((template, kind)) if eligible => Ok(Some(template.clone().with_kinds(kind, kind))),
        _ => Ok(Some(default_template.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::find_template;

    const MODEL: &str = r#"
types:
  - name: Aspects.Caching
    members:
      - kind: method
        name: Default
        returns: dynamic
        attributes: [{type: Template}]
      - kind: method
        name: Async
        returns: "Task<dynamic>"
        is_async: true
        attributes: [{type: Template}]
      - kind: method
        name: AsyncEnumerable
        returns: "IAsyncEnumerable<dynamic>"
        is_async: true
        is_iterator: true
        attributes: [{type: Template}]
  - name: App.Service
    members:
      - kind: method
        name: Stream
        returns: "IAsyncEnumerable<int>"
        is_async: true
      - kind: method
        name: Load
        returns: "Task<int>"
      - kind: method
        name: Items
        returns: "IEnumerable<int>"
"#;

    fn setup() -> (Compilation, MethodTemplateSelector) {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let aspect = compilation.find_type("Aspects.Caching").unwrap().id();
        let template = |name: &str| {
            TemplateMember::<MethodDecl>::from_declaration(&compilation, find_template(&compilation, aspect, name).unwrap())
                .unwrap()
        };
        let mut selector = MethodTemplateSelector::new(template("Default"));
        selector.async_template = Some(template("Async"));
        selector.async_enumerable_template = Some(template("AsyncEnumerable"));
        (compilation, selector)
    }

    fn method<'a>(compilation: &'a Compilation, name: &str) -> &'a MethodDecl {
        let ty = compilation.find_type("App.Service").unwrap().id();
        let id = compilation.find_closest_visible_method(ty, name, &[]).unwrap();
        compilation.method(id).unwrap()
    }

    #[test]
    fn test_async_iterator_prefers_iterator_template() {
        let (compilation, selector) = setup();
        let selected = select_method_template(&compilation, method(&compilation, "Stream"), &selector);
        assert_eq!(selected.name, "AsyncEnumerable");
        assert_eq!(selected.interpreted_kind, TemplateKind::IAsyncEnumerable);
    }

    #[test]
    fn test_non_async_awaitable_uses_default_unless_flag() {
        let (compilation, mut selector) = setup();
        let target = method(&compilation, "Load");
        assert_eq!(select_method_template(&compilation, target, &selector).name, "Default");

        selector.use_async_template_for_any_awaitable = true;
        let selected = select_method_template(&compilation, target, &selector);
        assert_eq!(selected.name, "Async");
        assert_eq!(selected.interpreted_kind, TemplateKind::Async);
    }

    #[test]
    fn test_enumerable_without_template_records_kind() {
        let (compilation, mut selector) = setup();
        selector.use_enumerable_template_for_any_enumerable = true;
        let selected = select_method_template(&compilation, method(&compilation, "Items"), &selector);
        assert_eq!(selected.name, "Default");
        assert_eq!(selected.selected_kind, TemplateKind::Default);
        assert_eq!(selected.interpreted_kind, TemplateKind::IEnumerable);
    }

    #[test]
    fn test_getter_required() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let target = method(&compilation, "Items");
        let selector = GetterTemplateSelector::default();
        assert!(select_getter_template(&compilation, target, &selector, true).is_err());
        assert!(select_getter_template(&compilation, target, &selector, false)
            .unwrap()
            .is_none());
    }
}
