//! Conflict resolution between introduced and existing members
//!
//! Covers every override strategy against an absent member, a member of the
//! target type and members inherited from ancestors, the kind, staticity and
//! value type gates that run before the strategy is consulted, and the checks
//! rejecting drafts that can never be legal in their target type.

use pretty_assertions::assert_eq;
use rstest::rstest;
use std::rc::Rc;
use weaver::{
    AdviceFactory, AdviceOutcome, AdviceResult, AspectInstance, Compilation, DeclId, IntroduceOptions,
    IntroductionScope, OverrideStrategy, Result, StepState, TypeRef, WeaverConfig,
};

const MODEL: &str = r#"
types:
  - name: Aspects.Intro
    members:
      - kind: method
        name: Fresh
        attributes: [{type: Introduce}]
      - kind: method
        name: Local
        attributes: [{type: Introduce}]
      - kind: method
        name: Run
        attributes: [{type: Introduce}]
      - kind: method
        name: Stop
        attributes: [{type: Introduce}]
      - kind: method
        name: Tick
        attributes: [{type: Introduce}]
      - kind: method
        name: Locked
        attributes: [{type: Introduce}]
      - kind: method
        name: Plan
        attributes: [{type: Introduce}]
      - kind: method
        name: Total
        returns: int
        attributes: [{type: Introduce}]
      - kind: method
        name: count
        attributes: [{type: Introduce}]
      - kind: method
        name: Hook
        attributes:
          - type: Introduce
            arguments: {IsVirtual: true}
      - kind: method
        name: Final
        attributes:
          - type: Introduce
            arguments: {IsSealed: true}
  - name: Aspects.StaticIntro
    members:
      - kind: method
        name: Run
        is_static: true
        attributes: [{type: Introduce}]
  - name: App.Root
    is_abstract: true
    members:
      - kind: method
        name: Tick
        accessibility: public
        is_virtual: true
      - kind: method
        name: Locked
        accessibility: public
        is_virtual: true
  - name: App.Base
    base_type: App.Root
    is_abstract: true
    members:
      - kind: method
        name: Run
        accessibility: public
        is_virtual: true
      - kind: method
        name: Stop
        accessibility: public
      - kind: method
        name: Tick
        accessibility: public
        is_override: true
      - kind: method
        name: Locked
        accessibility: public
        is_override: true
        is_sealed: true
      - kind: method
        name: Plan
        accessibility: public
        is_abstract: true
      - kind: method
        name: Total
        returns: string
        accessibility: public
        is_virtual: true
      - kind: field
        name: count
        type: int
        accessibility: protected
  - name: App.Derived
    base_type: App.Base
    members:
      - kind: method
        name: Local
        accessibility: public
      - kind: field
        name: tally
        type: int
        accessibility: private
  - name: Ns.IShape
    kind: interface
  - name: App.Helpers
    is_static: true
  - name: App.Closed
    is_sealed: true
  - name: App.Point
    kind: struct
"#;

/// Outcome and diagnostic ids; diagnostics raised before implementation
/// count as an error outcome
fn summarize<T>(result: Result<AdviceResult<T>>) -> (AdviceOutcome, Vec<String>) {
    match result {
        Ok(result) => {
            let ids = result.diagnostics.iter().map(|d| d.id.clone()).collect();
            (result.outcome, ids)
        }
        Err(err) => {
            let ids: Vec<String> = err.diagnostics().iter().map(|d| d.id.clone()).collect();
            assert!(!ids.is_empty(), "unexpected error: {err}");
            (AdviceOutcome::Error, ids)
        }
    }
}

fn with_factory<R>(aspect_type: &str, target: &str, run: impl FnOnce(&mut AdviceFactory<'_>, DeclId) -> R) -> R {
    let compilation = Compilation::from_yaml(MODEL).unwrap();
    let aspect = AspectInstance {
        name: "Intro".into(),
        instance: 0,
        template_type: Some(compilation.find_type(aspect_type).unwrap().id()),
        target: compilation.find_type(target).unwrap().id(),
    };
    let target = aspect.target;
    let mut state = StepState::new(0, compilation, Rc::new(WeaverConfig::default()), 0);
    let mut factory = AdviceFactory::new(&mut state, aspect);
    run(&mut factory, target)
}

/// Outcome and diagnostic ids of introducing `template` into `App.Derived`
fn introduce(aspect_type: &str, template: &str, strategy: OverrideStrategy) -> (AdviceOutcome, Vec<String>) {
    with_factory(aspect_type, "App.Derived", |factory, target| {
        summarize(factory.introduce_method(target, template, IntroduceOptions::default().with_strategy(strategy)))
    })
}

fn ids(diagnostic: Option<&str>) -> Vec<String> {
    diagnostic.into_iter().map(String::from).collect()
}

#[rstest]
// No existing member
#[case("Fresh", OverrideStrategy::Default, AdviceOutcome::Default, None)]
#[case("Fresh", OverrideStrategy::Fail, AdviceOutcome::Default, None)]
#[case("Fresh", OverrideStrategy::Ignore, AdviceOutcome::Default, None)]
#[case("Fresh", OverrideStrategy::New, AdviceOutcome::Default, None)]
#[case("Fresh", OverrideStrategy::Override, AdviceOutcome::Default, None)]
// Declared by the target type
#[case("Local", OverrideStrategy::Default, AdviceOutcome::Error, Some("LAMA0501"))]
#[case("Local", OverrideStrategy::Fail, AdviceOutcome::Error, Some("LAMA0501"))]
#[case("Local", OverrideStrategy::Ignore, AdviceOutcome::Ignore, None)]
#[case("Local", OverrideStrategy::New, AdviceOutcome::Override, None)]
#[case("Local", OverrideStrategy::Override, AdviceOutcome::Override, None)]
// Virtual member of an ancestor
#[case("Run", OverrideStrategy::Fail, AdviceOutcome::Error, Some("LAMA0501"))]
#[case("Run", OverrideStrategy::Ignore, AdviceOutcome::Ignore, None)]
#[case("Run", OverrideStrategy::New, AdviceOutcome::New, None)]
#[case("Run", OverrideStrategy::Override, AdviceOutcome::Override, None)]
// Non-virtual member of an ancestor
#[case("Stop", OverrideStrategy::New, AdviceOutcome::New, None)]
#[case("Stop", OverrideStrategy::Override, AdviceOutcome::Error, Some("LAMA0502"))]
// Override of an ancestor that overrides in turn
#[case("Tick", OverrideStrategy::New, AdviceOutcome::New, None)]
#[case("Tick", OverrideStrategy::Override, AdviceOutcome::Override, None)]
// Sealed override of an ancestor
#[case("Locked", OverrideStrategy::New, AdviceOutcome::New, None)]
#[case("Locked", OverrideStrategy::Override, AdviceOutcome::Error, Some("LAMA0502"))]
// Abstract member of an ancestor
#[case("Plan", OverrideStrategy::Fail, AdviceOutcome::Error, Some("LAMA0501"))]
#[case("Plan", OverrideStrategy::Override, AdviceOutcome::Override, None)]
fn test_strategy_matrix(
    #[case] template: &str,
    #[case] strategy: OverrideStrategy,
    #[case] expected: AdviceOutcome,
    #[case] diagnostic: Option<&str>,
) {
    let (outcome, reported) = introduce("Aspects.Intro", template, strategy);
    assert_eq!(outcome, expected, "{template} with {strategy:?}");
    assert_eq!(reported, ids(diagnostic));
}

#[rstest]
// Declared by the target type
#[case("tally", OverrideStrategy::Fail, AdviceOutcome::Error, Some("LAMA0501"))]
#[case("tally", OverrideStrategy::Ignore, AdviceOutcome::Ignore, None)]
#[case("tally", OverrideStrategy::New, AdviceOutcome::Error, Some("LAMA0510"))]
#[case("tally", OverrideStrategy::Override, AdviceOutcome::Error, Some("LAMA0502"))]
// Field of an ancestor
#[case("count", OverrideStrategy::New, AdviceOutcome::New, None)]
#[case("count", OverrideStrategy::Override, AdviceOutcome::Error, Some("LAMA0502"))]
fn test_field_strategy_matrix(
    #[case] name: &str,
    #[case] strategy: OverrideStrategy,
    #[case] expected: AdviceOutcome,
    #[case] diagnostic: Option<&str>,
) {
    let (outcome, reported) = with_factory("Aspects.Intro", "App.Derived", |factory, target| {
        summarize(factory.introduce_field_of_type(
            target,
            name,
            TypeRef::named("int"),
            IntroduceOptions::default().with_strategy(strategy),
        ))
    });
    assert_eq!(outcome, expected, "{name} with {strategy:?}");
    assert_eq!(reported, ids(diagnostic));
}

#[rstest]
#[case(OverrideStrategy::New)]
#[case(OverrideStrategy::Override)]
#[case(OverrideStrategy::Ignore)]
fn test_kind_gate_runs_before_strategy(#[case] strategy: OverrideStrategy) {
    let (outcome, reported) = introduce("Aspects.Intro", "count", strategy);
    assert_eq!(outcome, AdviceOutcome::Error);
    assert_eq!(reported, vec!["LAMA0508"]);
}

#[rstest]
#[case(OverrideStrategy::New)]
#[case(OverrideStrategy::Override)]
fn test_staticity_gate_runs_before_strategy(#[case] strategy: OverrideStrategy) {
    let (outcome, reported) = introduce("Aspects.StaticIntro", "Run", strategy);
    assert_eq!(outcome, AdviceOutcome::Error);
    assert_eq!(reported, vec!["LAMA0503"]);
}

#[rstest]
#[case(OverrideStrategy::Fail)]
#[case(OverrideStrategy::Ignore)]
#[case(OverrideStrategy::New)]
#[case(OverrideStrategy::Override)]
fn test_return_type_gate_runs_before_strategy(#[case] strategy: OverrideStrategy) {
    let (outcome, reported) = introduce("Aspects.Intro", "Total", strategy);
    assert_eq!(outcome, AdviceOutcome::Error);
    assert_eq!(reported, vec!["LAMA0509"]);
}

#[rstest]
#[case::into_interface("Ns.IShape", "Fresh", IntroductionScope::Default, "LAMA0525")]
#[case::instance_into_static_type("App.Helpers", "Fresh", IntroductionScope::Instance, "LAMA0504")]
#[case::virtual_into_sealed_type("App.Closed", "Hook", IntroductionScope::Default, "LAMA0505")]
#[case::virtual_into_struct("App.Point", "Hook", IntroductionScope::Default, "LAMA0505")]
#[case::static_virtual("App.Derived", "Hook", IntroductionScope::Static, "LAMA0506")]
#[case::static_sealed("App.Derived", "Final", IntroductionScope::Static, "LAMA0507")]
fn test_illegal_drafts_are_rejected(
    #[case] target: &str,
    #[case] template: &str,
    #[case] scope: IntroductionScope,
    #[case] diagnostic: &str,
) {
    let (outcome, reported) = with_factory("Aspects.Intro", target, |factory, target| {
        summarize(factory.introduce_method(target, template, IntroduceOptions::default().with_scope(scope)))
    });
    assert_eq!(outcome, AdviceOutcome::Error);
    assert_eq!(reported, vec![diagnostic]);
}

#[test]
fn test_static_member_into_static_type() {
    let (outcome, reported) = with_factory("Aspects.Intro", "App.Helpers", |factory, target| {
        summarize(factory.introduce_method(
            target,
            "Fresh",
            IntroduceOptions::default().with_scope(IntroductionScope::Target),
        ))
    });
    assert_eq!(outcome, AdviceOutcome::Default);
    assert!(reported.is_empty());
}
