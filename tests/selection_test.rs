//! Property tests for template selection
//!
//! Selection depends only on the target's shape and the selector; the same
//! inputs always pick the same template, and an async iterator always
//! prefers the async-enumerable template when one is supplied.

use proptest::prelude::*;
use weaver::model::MethodDecl;
use weaver::templates::{
    find_template, select_method_template, MethodTemplateSelector, TemplateKind, TemplateMember,
};
use weaver::Compilation;

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
        name: Enumerable
        returns: "IEnumerable<dynamic>"
        is_iterator: true
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
        name: Fetch
        returns: "Task<int>"
        is_async: true
      - kind: method
        name: Count
        returns: int
"#;

/// Which optional templates a selector carries, and its two flags
#[derive(Debug, Clone, Copy)]
struct SelectorShape {
    with_async: bool,
    with_enumerable: bool,
    any_awaitable: bool,
    any_enumerable: bool,
}

fn selector_shape() -> impl Strategy<Value = SelectorShape> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(with_async, with_enumerable, any_awaitable, any_enumerable)| SelectorShape {
            with_async,
            with_enumerable,
            any_awaitable,
            any_enumerable,
        },
    )
}

fn template(compilation: &Compilation, name: &str) -> TemplateMember<MethodDecl> {
    let aspect = compilation.find_type("Aspects.Caching").unwrap().id();
    TemplateMember::from_declaration(compilation, find_template(compilation, aspect, name).unwrap()).unwrap()
}

fn selector(compilation: &Compilation, shape: SelectorShape, with_async_enumerable: bool) -> MethodTemplateSelector {
    let mut selector = MethodTemplateSelector::new(template(compilation, "Default"));
    if shape.with_async {
        selector.async_template = Some(template(compilation, "Async"));
    }
    if shape.with_enumerable {
        selector.enumerable_template = Some(template(compilation, "Enumerable"));
    }
    if with_async_enumerable {
        selector.async_enumerable_template = Some(template(compilation, "AsyncEnumerable"));
    }
    selector.use_async_template_for_any_awaitable = shape.any_awaitable;
    selector.use_enumerable_template_for_any_enumerable = shape.any_enumerable;
    selector
}

fn target<'a>(compilation: &'a Compilation, name: &str) -> &'a MethodDecl {
    let ty = compilation.find_type("App.Service").unwrap().id();
    let id = compilation.find_closest_visible_method(ty, name, &[]).unwrap();
    compilation.method(id).unwrap()
}

proptest! {
    #[test]
    fn test_selection_is_deterministic(shape in selector_shape(), with_async_enumerable in any::<bool>()) {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let selector = selector(&compilation, shape, with_async_enumerable);
        for name in ["Stream", "Fetch", "Count"] {
            let method = target(&compilation, name);
            let first = select_method_template(&compilation, method, &selector);
            let second = select_method_template(&compilation, method, &selector);
            prop_assert_eq!(&first.name, &second.name);
            prop_assert_eq!(first.selected_kind, second.selected_kind);
            prop_assert_eq!(first.interpreted_kind, second.interpreted_kind);
        }
    }

    #[test]
    fn test_async_iterator_prefers_async_enumerable_template(shape in selector_shape()) {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let selector = selector(&compilation, shape, true);
        let selected = select_method_template(&compilation, target(&compilation, "Stream"), &selector);
        prop_assert_eq!(selected.name.as_str(), "AsyncEnumerable");
        prop_assert_eq!(selected.interpreted_kind, TemplateKind::IAsyncEnumerable);
    }

    #[test]
    fn test_async_method_uses_async_template_when_present(shape in selector_shape()) {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let selector = selector(&compilation, shape, false);
        let selected = select_method_template(&compilation, target(&compilation, "Fetch"), &selector);
        let expected = if shape.with_async { "Async" } else { "Default" };
        prop_assert_eq!(selected.name.as_str(), expected);
        prop_assert_eq!(selected.interpreted_kind, TemplateKind::Async);
    }

    #[test]
    fn test_plain_method_always_uses_default(shape in selector_shape(), with_async_enumerable in any::<bool>()) {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let selector = selector(&compilation, shape, with_async_enumerable);
        let selected = select_method_template(&compilation, target(&compilation, "Count"), &selector);
        prop_assert_eq!(selected.name.as_str(), "Default");
        prop_assert_eq!(selected.interpreted_kind, TemplateKind::Default);
    }
}
