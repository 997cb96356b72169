//! Parameter introduction through constructor chains
//!
//! A parameter appended to a constructor has to reach every constructor that
//! calls it, within the type through `this(...)` and from derived types
//! through `base(...)`, according to the pull strategy.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::rc::Rc;
use weaver::advice::{PullAction, PullStrategy};
use weaver::model::{Expression, ParameterDecl};
use weaver::{
    AdviceFactory, AdviceOutcome, AspectInstance, Compilation, DeclId, StepState, TransformationKind,
    TypeRef, WeaverConfig,
};

/// A(id) is the root; B() and C(name, flag) call it with `this(0)`; the
/// derived D() calls B() through `base()`
const CHAIN: &str = r#"
types:
  - name: App.Node
    members:
      - kind: constructor
        accessibility: public
        parameters:
          - name: id
            type: int
      - kind: constructor
        accessibility: public
        initializer:
          kind: this
          arguments: ["0"]
      - kind: constructor
        accessibility: public
        parameters:
          - name: name
            type: string
          - name: flag
            type: bool
        initializer:
          kind: this
          arguments: ["0"]
  - name: App.Leaf
    base_type: App.Node
    members:
      - kind: constructor
        accessibility: public
        initializer:
          kind: base
"#;

fn step(compilation: Compilation, target: DeclId) -> (StepState, AspectInstance) {
    let aspect = AspectInstance {
        name: "Tracing".into(),
        instance: 0,
        template_type: None,
        target,
    };
    (StepState::new(0, compilation, Rc::new(WeaverConfig::default()), 0), aspect)
}

fn append_everywhere() -> PullStrategy {
    Rc::new(|_: &Compilation, _: DeclId, parameter: &ParameterDecl| PullAction::AppendParameterAndPull {
        name: parameter.name.clone(),
        ty: parameter.ty.clone(),
        default_value: None,
    })
}

/// (constructor, is_parameter) pairs in emission order
fn shape(transformations: &[weaver::Transformation]) -> Vec<(DeclId, &'static str)> {
    transformations
        .iter()
        .filter_map(|t| match &t.kind {
            TransformationKind::IntroduceParameter { constructor, .. } => Some((*constructor, "parameter")),
            TransformationKind::IntroduceConstructorInitializerArgument { constructor, .. } => {
                Some((*constructor, "argument"))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_parameter_reaches_this_and_base_callers() {
    let compilation = Compilation::from_yaml(CHAIN).unwrap();
    let node = compilation.find_type("App.Node").unwrap().id();
    let leaf = compilation.find_type("App.Leaf").unwrap().id();
    let [a, b, c] = compilation.constructors_of(node)[..] else {
        panic!("expected three constructors");
    };
    let d = compilation.constructors_of(leaf)[0];

    let (mut state, aspect) = step(compilation, a);
    {
        let mut factory = AdviceFactory::new(&mut state, aspect);
        let result = factory
            .introduce_parameter(a, "trace", TypeRef::named("string"), None, Some(append_everywhere()))
            .unwrap();
        assert_eq!(result.outcome, AdviceOutcome::Default);
    }

    assert_eq!(
        shape(state.transformations()),
        vec![
            (a, "parameter"),
            (b, "parameter"),
            (d, "parameter"),
            (d, "argument"),
            (b, "argument"),
            (c, "parameter"),
            (c, "argument"),
        ]
    );

    let outcome = state.complete().unwrap();
    let names = |ctor: DeclId| -> Vec<String> {
        outcome
            .compilation
            .parameters_of(ctor)
            .into_iter()
            .map(|p| outcome.compilation.declaration(p).unwrap().name().to_string())
            .collect()
    };
    assert_eq!(names(a), vec!["id", "trace"]);
    assert_eq!(names(b), vec!["trace"]);
    assert_eq!(names(c), vec!["name", "flag", "trace"]);
    assert_eq!(names(d), vec!["trace"]);
}

#[test]
fn test_do_not_pull_passes_default_to_direct_callers_only() {
    let compilation = Compilation::from_yaml(CHAIN).unwrap();
    let node = compilation.find_type("App.Node").unwrap().id();
    let [a, b, c] = compilation.constructors_of(node)[..] else {
        panic!("expected three constructors");
    };

    let (mut state, aspect) = step(compilation, a);
    let mut factory = AdviceFactory::new(&mut state, aspect);
    factory
        .introduce_parameter(a, "trace", TypeRef::named("string"), None, None)
        .unwrap();

    let values: Vec<_> = state
        .transformations()
        .iter()
        .filter_map(|t| match &t.kind {
            TransformationKind::IntroduceConstructorInitializerArgument { constructor, value, .. } => {
                Some((*constructor, value.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec![(b, Expression::default_literal()), (c, Expression::default_literal())]
    );
}

#[test]
fn test_existing_parameter_name_is_rejected() {
    let compilation = Compilation::from_yaml(CHAIN).unwrap();
    let node = compilation.find_type("App.Node").unwrap().id();
    let a = compilation.constructors_of(node)[0];

    let (mut state, aspect) = step(compilation, a);
    let mut factory = AdviceFactory::new(&mut state, aspect);
    let result = factory
        .introduce_parameter(a, "id", TypeRef::named("int"), None, None)
        .unwrap();
    assert!(result.is_error());
    assert_eq!(result.diagnostics[0].id, "LAMA0521");
}

#[test]
fn test_pulled_name_taken_by_a_caller_is_rejected() {
    let compilation = Compilation::from_yaml(CHAIN).unwrap();
    let node = compilation.find_type("App.Node").unwrap().id();
    let [a, _, c] = compilation.constructors_of(node)[..] else {
        panic!("expected three constructors");
    };
    let c_name = compilation.display_name(c);

    let (mut state, aspect) = step(compilation, a);
    let result = {
        let mut factory = AdviceFactory::new(&mut state, aspect);
        factory
            .introduce_parameter(a, "name", TypeRef::named("string"), None, Some(append_everywhere()))
            .unwrap()
    };
    assert!(result.is_error());
    let reported: Vec<_> = result
        .diagnostics
        .iter()
        .map(|d| (d.id.as_str(), d.target.as_deref()))
        .collect();
    assert_eq!(reported, vec![("LAMA0521", Some(c_name.as_str()))]);
    assert!(state.transformations().is_empty());
}

/// Linear chain: the constructor with `k` parameters calls the one with `k + 1`
fn linear_chain(depth: usize) -> String {
    let mut yaml = String::from("types:\n  - name: App.Deep\n    members:\n");
    for k in 0..=depth {
        yaml.push_str("      - kind: constructor\n        accessibility: public\n");
        if k > 0 {
            yaml.push_str("        parameters:\n");
            for p in 0..k {
                yaml.push_str(&format!("          - name: p{p}\n            type: int\n"));
            }
        }
        if k < depth {
            let arguments = vec!["\"0\""; k + 1].join(", ");
            yaml.push_str(&format!("        initializer:\n          kind: this\n          arguments: [{arguments}]\n"));
        }
    }
    yaml
}

proptest! {
    #[test]
    fn test_append_visits_every_link_once(depth in 1usize..8) {
        let compilation = Compilation::from_yaml(&linear_chain(depth)).unwrap();
        let deep = compilation.find_type("App.Deep").unwrap().id();
        let root = *compilation.constructors_of(deep).last().unwrap();

        let (mut state, aspect) = step(compilation, root);
        let mut factory = AdviceFactory::new(&mut state, aspect);
        let result = factory
            .introduce_parameter(root, "extra", TypeRef::named("int"), None, Some(append_everywhere()))
            .unwrap();
        prop_assert!(!result.is_error());

        let shape = shape(state.transformations());
        let parameters = shape.iter().filter(|(_, k)| *k == "parameter").count();
        let arguments = shape.iter().filter(|(_, k)| *k == "argument").count();
        prop_assert_eq!(parameters, depth + 1);
        prop_assert_eq!(arguments, depth);
    }
}
