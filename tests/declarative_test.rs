//! End-to-end runs of declarative aspect documents
//!
//! Uses the YAML fixtures under `tests/fixtures/`.

use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;
use weaver::config::CONFIG_FILE;
use weaver::{AspectsDocument, Compilation, OverrideStrategy, SkippedAspect, TypeRef, WeaverConfig};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load() -> (Compilation, AspectsDocument) {
    let compilation = Compilation::load(&fixture("model.yaml")).unwrap();
    let aspects = AspectsDocument::load(&fixture("aspects.yaml")).unwrap();
    (compilation, aspects)
}

#[test]
fn test_fixture_pipeline() {
    let (compilation, aspects) = load();
    let result = aspects.into_pipeline(WeaverConfig::default()).execute(compilation).unwrap();

    let first_step: Vec<_> = result
        .transformations
        .iter()
        .filter(|t| t.step == 0)
        .map(|t| (t.aspect.as_str(), t.kind.name()))
        .collect();
    assert_eq!(
        first_step,
        vec![
            ("Explicit", "introduce_member"),
            ("Explicit", "redirect_member"),
            ("Explicit", "introduce_interface"),
            ("Audit", "override_member"),
            ("Audit", "add_annotation"),
        ]
    );
    assert!(result.transformations.iter().all(|t| t.step == 0));

    // ordering counters run across the whole pipeline
    let orders: Vec<_> = result.transformations.iter().map(|t| t.order.within_pipeline).collect();
    assert_eq!(orders, (0..result.transformations.len() as u32).collect::<Vec<_>>());
}

#[test]
fn test_explicit_interface_round_trip() {
    let (compilation, aspects) = load();
    let result = aspects.into_pipeline(WeaverConfig::default()).execute(compilation).unwrap();
    let folded = &result.compilation;
    let target = folded.find_type("App.Target").unwrap().id();
    let interface = TypeRef::named("Ns.IFoo");

    assert!(folded.implements_interface(target, &interface));
    let explicit: Vec<_> = folded
        .members_of(target)
        .filter(|(_, d)| d.member().is_some_and(|m| m.explicit_interface.as_ref() == Some(&interface)))
        .map(|(_, d)| d.name().to_string())
        .collect();
    assert_eq!(explicit, vec!["Ns.IFoo.M"]);
    // the public M stays in place
    assert!(folded.find_closest_visible_method(target, "M", &[]).is_some());

    // implementing it again in a later step fails the aspect
    let ids: Vec<_> = result.diagnostics.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["LAMA0511"]);
    assert_eq!(
        result.skipped,
        vec![SkippedAspect {
            step: 1,
            aspect: "Again".into(),
            instance: 0,
        }]
    );
    assert!(result.has_errors());
}

#[rstest]
#[case::mismatched_signature("Aspects.Mismatch", "Ns.ICounter", "LAMA0513")]
#[case::non_public_implicit_member("Aspects.Hidden", "Ns.ICounter", "LAMA0514")]
#[case::non_public_accessor("Aspects.PrivateSetter", "Ns.IValue", "LAMA0514")]
#[case::missing_accessor("Aspects.GetterOnly", "Ns.IValue", "LAMA0516")]
#[case::superficial_explicit_accessor("Aspects.ExplicitWritable", "Ns.IReadable", "LAMA0517")]
fn test_interface_member_problems_skip_the_aspect(
    #[case] template_type: &str,
    #[case] interface: &str,
    #[case] diagnostic: &str,
) {
    let aspects = AspectsDocument::from_yaml(&format!(
        r#"
steps:
  - aspects:
      - name: Implement
        template_type: {template_type}
        target: App.Plain
        advice:
          - kind: implement_interface
            interface: {interface}
      - name: Annotate
        target: App.Plain
        advice:
          - kind: add_annotation
            annotation: {{checked: true}}
"#
    ))
    .unwrap();
    let compilation = Compilation::load(&fixture("model.yaml")).unwrap();
    let result = aspects.into_pipeline(WeaverConfig::default()).execute(compilation).unwrap();

    let ids: Vec<_> = result.diagnostics.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![diagnostic]);
    assert_eq!(
        result.skipped,
        vec![SkippedAspect {
            step: 0,
            aspect: "Implement".into(),
            instance: 0,
        }]
    );
    // the failed aspect leaves nothing behind; the next aspect still runs
    let applied: Vec<_> = result.transformations.iter().map(|t| (t.aspect.as_str(), t.kind.name())).collect();
    assert_eq!(applied, vec![("Annotate", "add_annotation")]);
    let plain = result.compilation.find_type("App.Plain").unwrap().id();
    assert!(!result.compilation.implements_interface(plain, &TypeRef::named(interface)));
}

#[test]
fn test_configured_strategy_applies_to_declarative_advice() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        "version: 1\nintroduction:\n  default_override_strategy: ignore\n",
    )
    .unwrap();
    let config = WeaverConfig::load_from_dir(dir.path()).unwrap().unwrap();
    assert_eq!(config.introduction.default_override_strategy, OverrideStrategy::Ignore);

    let aspects = AspectsDocument::from_yaml(
        r#"
steps:
  - aspects:
      - name: Fields
        target: App.Target
        advice:
          - kind: introduce_field
            name: audit
            type: string
            options: {scope: instance}
          - kind: introduce_field
            name: audit
            type: string
            options: {scope: instance}
"#,
    )
    .unwrap();
    let compilation = Compilation::load(&fixture("model.yaml")).unwrap();
    let result = aspects.into_pipeline(config).execute(compilation).unwrap();

    assert!(result.diagnostics.is_empty());
    assert_eq!(result.transformations.len(), 1);
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert!(WeaverConfig::load_from_dir(dir.path()).unwrap().is_none());

    std::fs::write(dir.path().join(CONFIG_FILE), "version: 2\n").unwrap();
    assert!(WeaverConfig::load_from_dir(dir.path()).is_err());
}

#[test]
fn test_unknown_target_aborts_the_run() {
    let aspects = AspectsDocument::from_yaml(
        r#"
steps:
  - aspects:
      - name: Lost
        target: App.Missing
        advice:
          - kind: add_annotation
            annotation: {}
"#,
    )
    .unwrap();
    let compilation = Compilation::load(&fixture("model.yaml")).unwrap();
    assert!(aspects.into_pipeline(WeaverConfig::default()).execute(compilation).is_err());
}
