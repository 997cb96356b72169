//! Advice requested through the factory, checked against the folded model

use pretty_assertions::assert_eq;
use std::rc::Rc;
use weaver::model::{Declaration, Writeability};
use weaver::{
    AdviceFactory, AspectInstance, Compilation, ContractDirection, ContractOptions, DeclId, Error,
    IntroduceOptions, IntroductionScope, ObjectReader, OverrideStrategy, StepState, TransformationKind,
    TypeRef, WeaverConfig,
};

const MODEL: &str = r#"
types:
  - name: Aspects.Guard
    members:
      - kind: method
        name: NotNull
        attributes: [{type: Template}]
        parameters:
          - name: value
            type: dynamic
      - kind: method
        name: GetItem
        returns: dynamic
        attributes: [{type: Template}]
      - kind: method
        name: Finalize
        attributes: [{type: Template}]
  - name: App.Point
    kind: struct
    is_readonly: true
  - name: App.Orders
    members:
      - kind: method
        name: Place
        returns: string
        accessibility: public
        parameters:
          - name: customer
            type: string
          - name: total
            type: decimal
            ref_kind: out
"#;

fn step(compilation: &Compilation, target: &str, instance: u32) -> AspectInstance {
    AspectInstance {
        name: format!("Guard{instance}"),
        instance,
        template_type: Some(compilation.find_type("Aspects.Guard").unwrap().id()),
        target: compilation.find_type(target).unwrap().id(),
    }
}

fn state() -> StepState {
    let compilation = Compilation::from_yaml(MODEL).unwrap();
    StepState::new(0, compilation, Rc::new(WeaverConfig::default()), 0)
}

fn place(compilation: &Compilation) -> DeclId {
    let orders = compilation.find_type("App.Orders").unwrap().id();
    compilation
        .find_closest_visible_method(orders, "Place", &[TypeRef::named("string"), TypeRef::named("decimal")])
        .unwrap()
}

fn parameter(compilation: &Compilation, method: DeclId, name: &str) -> DeclId {
    compilation
        .parameters_of(method)
        .into_iter()
        .find(|p| compilation.declaration(*p).unwrap().name() == name)
        .unwrap()
}

#[test]
fn test_readonly_struct_field_is_constructor_only() {
    let mut state = state();
    let aspect = step(state.compilation(), "App.Point", 0);
    let point = aspect.target;
    let result = {
        let mut factory = AdviceFactory::new(&mut state, aspect);
        factory
            .introduce_field_of_type(
                point,
                "cache",
                TypeRef::named("int"),
                IntroduceOptions::default().with_scope(IntroductionScope::Instance),
            )
            .unwrap()
    };

    let outcome = state.complete().unwrap();
    let Some(Declaration::Field(field)) = outcome.compilation.declaration(result.id().unwrap()) else {
        panic!("expected an introduced field");
    };
    assert_eq!(field.writeability, Writeability::ConstructorOnly);
}

#[test]
fn test_indexer_without_parameters_is_rejected() {
    let mut state = state();
    let aspect = step(state.compilation(), "App.Orders", 0);
    let orders = aspect.target;
    let mut factory = AdviceFactory::new(&mut state, aspect);
    let err = factory
        .introduce_indexer(orders, TypeRef::named("int"), Vec::new(), Some("GetItem"), None, IntroduceOptions::default())
        .unwrap_err();
    let ids: Vec<_> = err.diagnostics().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["LAMA0518"]);
}

#[test]
fn test_static_indexer_is_rejected() {
    let mut state = state();
    let aspect = step(state.compilation(), "App.Orders", 0);
    let orders = aspect.target;
    let mut factory = AdviceFactory::new(&mut state, aspect);
    let err = factory
        .introduce_indexer(
            orders,
            TypeRef::named("int"),
            vec![("index".to_string(), TypeRef::named("int"))],
            Some("GetItem"),
            None,
            IntroduceOptions::default().with_scope(IntroductionScope::Static),
        )
        .unwrap_err();
    let ids: Vec<_> = err.diagnostics().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["LAMA0519"]);
}

#[test]
fn test_finalizer_requires_a_class() {
    let mut state = state();
    let aspect = step(state.compilation(), "App.Point", 0);
    let point = aspect.target;
    let mut factory = AdviceFactory::new(&mut state, aspect);
    let err = factory
        .introduce_finalizer(point, "Finalize", OverrideStrategy::Default, ObjectReader::empty())
        .unwrap_err();
    assert!(matches!(&err, Error::Diagnostics(d) if d[0].id == "LAMA0522"));
}

#[test]
fn test_contracts_accumulate_per_aspect_instance() {
    let mut state = state();
    let method = place(state.compilation());
    let customer = parameter(state.compilation(), method, "customer");
    let total = parameter(state.compilation(), method, "total");

    for instance in 0..2 {
        let aspect = step(state.compilation(), "App.Orders", instance);
        let mut factory = AdviceFactory::new(&mut state, aspect);
        for target in [customer, total] {
            factory
                .add_contract(target, "NotNull", ContractDirection::Default, ContractOptions::default())
                .unwrap();
        }
    }
    assert!(state.transformations().is_empty());

    let outcome = state.complete().unwrap();
    let contracts: Vec<_> = outcome
        .transformations
        .iter()
        .filter_map(|t| match &t.kind {
            TransformationKind::Contract { target, contracts } => Some((t.aspect_instance, *target, contracts)),
            _ => None,
        })
        .collect();
    assert_eq!(contracts.len(), 2);
    for (index, (instance, owner, entries)) in contracts.iter().enumerate() {
        assert_eq!(*instance, index as u32);
        assert_eq!(*owner, method);
        let shape: Vec<_> = entries.iter().map(|c| (c.target, c.direction, c.order)).collect();
        assert_eq!(
            shape,
            vec![
                (customer, ContractDirection::Input, 0),
                (total, ContractDirection::Output, 1),
            ]
        );
    }
}

#[test]
fn test_contract_direction_must_exist() {
    let mut state = state();
    let method = place(state.compilation());
    let total = parameter(state.compilation(), method, "total");
    let aspect = step(state.compilation(), "App.Orders", 0);
    let mut factory = AdviceFactory::new(&mut state, aspect);

    let err = factory
        .add_contract(total, "NotNull", ContractDirection::Input, ContractOptions::default())
        .unwrap_err();
    assert_eq!(err.diagnostics()[0].id, "LAMA0527");
}

#[test]
fn test_contracts_of_a_failed_aspect_are_not_implemented() {
    let mut state = state();
    let method = place(state.compilation());
    let customer = parameter(state.compilation(), method, "customer");
    let total = parameter(state.compilation(), method, "total");
    let failing = step(state.compilation(), "App.Orders", 0);
    let passing = step(state.compilation(), "App.Orders", 1);

    state.begin_aspect(&failing);
    AdviceFactory::new(&mut state, failing.clone())
        .add_contract(customer, "NotNull", ContractDirection::Default, ContractOptions::default())
        .unwrap();
    state.fail_aspect(&failing, Vec::new());
    state.end_aspect(&failing);

    state.begin_aspect(&passing);
    AdviceFactory::new(&mut state, passing.clone())
        .add_contract(total, "NotNull", ContractDirection::Default, ContractOptions::default())
        .unwrap();
    state.end_aspect(&passing);

    let outcome = state.complete().unwrap();
    let contracts: Vec<_> = outcome
        .transformations
        .iter()
        .filter_map(|t| match &t.kind {
            TransformationKind::Contract { target, contracts } => Some((
                t.aspect.as_str(),
                *target,
                contracts.iter().map(|c| c.target).collect::<Vec<_>>(),
            )),
            _ => None,
        })
        .collect();
    assert_eq!(contracts, vec![("Guard1", method, vec![total])]);
    assert_eq!(outcome.skipped, vec![("Guard0".to_string(), 0)]);
}
