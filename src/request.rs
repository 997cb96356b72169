//! Declarative aspects
//!
//! Aspects described as data, so a pipeline can be run from YAML without
//! writing Rust. Each aspect names its target and template type and lists the
//! advice to request, in order.
//!
//! ```yaml
//! steps:
//!   - aspects:
//!       - name: Logging
//!         template_type: Aspects.Logging
//!         target: App.Orders::Place
//!         advice:
//!           - kind: override_method
//!             template: Wrap
//!           - kind: add_contract
//!             target: App.Orders::Place@quantity
//!             template: Positive
//! ```
//!
//! Declarations are addressed by path: `Type`, `Type::Member`,
//! `Type::Member(int, string)` to pick an overload, and `...@name` for a
//! parameter (`@return` for the return parameter).

use crate::advice::introduce::OperatorSignature;
use crate::advice::{
    AdviceResult, ContractDirection, InitializerTarget, IntroductionScope, MemberRedirection,
    OverrideStrategy, PullAction, PullStrategy,
};
use crate::config::WeaverConfig;
use crate::error::{Error, Result};
use crate::factory::{
    AccessorTemplates, AdviceFactory, ContractOptions, ImplementInterfaceOptions,
    IntroduceOptions, MethodTemplates,
};
use crate::model::{AttributeDecl, Compilation, DeclId, Declaration, Expression, TypeRef};
use crate::object_reader::ObjectReader;
use crate::pipeline::{Aspect, Pipeline};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

const PATH_PATTERN: &str = r"^(?P<type>[^:@()]+?)(?:::(?P<member>[^:@()]+?)(?:\((?P<parameters>.*)\))?)?(?:@(?P<parameter>[A-Za-z_][A-Za-z0-9_]*))?$";

/// Address of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeclarationPath {
    pub type_name: String,
    pub member: Option<String>,
    /// Parameter types selecting an overload
    pub parameters: Option<Vec<TypeRef>>,
    pub parameter: Option<String>,
}

impl DeclarationPath {
    pub fn parse(text: &str) -> Result<Self> {
        let pattern = Regex::new(PATH_PATTERN).map_err(|e| Error::Other(e.to_string()))?;
        let captures = pattern
            .captures(text.trim())
            .ok_or_else(|| Error::InvalidAdviceParameters(format!("'{}' is not a declaration path", text)))?;
        let parameters = captures
            .name("parameters")
            .map(|m| split_parameter_list(m.as_str()))
            .map(|list| list.iter().map(|t| TypeRef::parse(t)).collect::<std::result::Result<Vec<_>, _>>())
            .transpose()
            .map_err(|e| Error::InvalidAdviceParameters(format!("'{}': {}", text, e)))?;
        if captures.name("parameter").is_some() && captures.name("member").is_none() {
            return Err(Error::InvalidAdviceParameters(format!(
                "'{}' names a parameter without a member",
                text
            )));
        }
        Ok(Self {
            type_name: captures["type"].trim().to_string(),
            member: captures.name("member").map(|m| m.as_str().trim().to_string()),
            parameters,
            parameter: captures.name("parameter").map(|m| m.as_str().to_string()),
        })
    }

    pub fn resolve(&self, compilation: &Compilation) -> Result<DeclId> {
        let ty = compilation
            .find_type(&self.type_name)
            .ok_or_else(|| Error::InvalidAdviceParameters(format!("no type named '{}'", self.type_name)))?
            .id();
        let Some(member_name) = &self.member else {
            return Ok(ty);
        };

        let candidates: Vec<DeclId> = compilation
            .members_of(ty)
            .filter(|(_, d)| d.name() == member_name)
            .filter(|(id, _)| match &self.parameters {
                Some(types) => compilation.parameter_types(&compilation.parameters_of(*id)) == *types,
                None => true,
            })
            .map(|(id, _)| id)
            .collect();
        let member = match candidates.as_slice() {
            [member] => *member,
            [] => {
                return Err(Error::InvalidAdviceParameters(format!(
                    "'{}' does not match any declaration",
                    self
                )))
            }
            _ => {
                return Err(Error::InvalidAdviceParameters(format!(
                    "'{}' is ambiguous; add a parameter list",
                    self
                )))
            }
        };

        let Some(parameter) = &self.parameter else {
            return Ok(member);
        };
        if parameter == "return" {
            if let Some(Declaration::Method(m)) = compilation.declaration(member) {
                return Ok(m.return_parameter);
            }
        }
        compilation
            .parameters_of(member)
            .into_iter()
            .find(|id| compilation.declaration(*id).is_some_and(|d| d.name() == parameter))
            .ok_or_else(|| Error::InvalidAdviceParameters(format!("'{}' does not match any parameter", self)))
    }
}

/// Split `a, Dictionary<b, c>, d` at top-level commas
fn split_parameter_list(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current).trim().to_string());
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

impl fmt::Display for DeclarationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)?;
        if let Some(member) = &self.member {
            write!(f, "::{}", member)?;
        }
        if let Some(parameters) = &self.parameters {
            let list: Vec<String> = parameters.iter().map(|t| t.to_string()).collect();
            write!(f, "({})", list.join(", "))?;
        }
        if let Some(parameter) = &self.parameter {
            write!(f, "@{}", parameter)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for DeclarationPath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        DeclarationPath::parse(&s)
    }
}

impl From<DeclarationPath> for String {
    fn from(path: DeclarationPath) -> Self {
        path.to_string()
    }
}

impl JsonSchema for DeclarationPath {
    fn schema_name() -> Cow<'static, str> {
        "DeclarationPath".into()
    }

    fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "description": "Type, Type::Member, Type::Member(param types) or Type::Member@parameter",
        })
    }
}

/// Settings of an introduction request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct IntroductionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scope: IntroductionScope,
    #[serde(default)]
    pub strategy: OverrideStrategy,
}

/// What chained constructors pass for an introduced parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PullRequest {
    #[default]
    DoNotPull,
    UseExistingParameter(String),
    AppendParameterAndPull {
        name: String,
        #[serde(rename = "type")]
        ty: TypeRef,
        #[serde(default)]
        default_value: Option<String>,
    },
}

impl PullRequest {
    fn strategy(&self) -> Option<PullStrategy> {
        let action = match self {
            PullRequest::DoNotPull => return None,
            PullRequest::UseExistingParameter(name) => PullAction::UseExistingParameter(name.clone()),
            PullRequest::AppendParameterAndPull {
                name,
                ty,
                default_value,
            } => PullAction::AppendParameterAndPull {
                name: name.clone(),
                ty: ty.clone(),
                default_value: default_value.clone().map(Expression::new),
            },
        };
        Some(Rc::new(move |_: &Compilation, _: DeclId, _: &crate::model::ParameterDecl| action.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexerParameterRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RedirectionRequest {
    /// Interface member name
    pub member: String,
    pub target: DeclarationPath,
}

/// One advice of a declarative aspect
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdviceRequest {
    /// Declaration the advice applies to; the aspect target when absent
    #[serde(default)]
    pub target: Option<DeclarationPath>,
    /// Compile-time template arguments
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub advice: AdviceKindRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdviceKindRequest {
    IntroduceMethod {
        template: String,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceOperator {
        template: String,
        operator: OperatorSignature,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceField {
        #[serde(default)]
        template: Option<String>,
        /// Name and type of a field declared without a template
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "type")]
        ty: Option<TypeRef>,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceProperty {
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "type")]
        ty: Option<TypeRef>,
        #[serde(default)]
        getter: Option<String>,
        #[serde(default)]
        setter: Option<String>,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceIndexer {
        #[serde(rename = "type")]
        ty: TypeRef,
        #[serde(default)]
        parameters: Vec<IndexerParameterRequest>,
        #[serde(default)]
        getter: Option<String>,
        #[serde(default)]
        setter: Option<String>,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceEvent {
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "type")]
        ty: Option<TypeRef>,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceConstructor {
        template: String,
        #[serde(default)]
        options: IntroductionRequest,
    },
    IntroduceFinalizer {
        template: String,
        #[serde(default)]
        strategy: OverrideStrategy,
    },
    IntroduceParameter {
        name: String,
        #[serde(rename = "type")]
        ty: TypeRef,
        #[serde(default)]
        default_value: Option<String>,
        #[serde(default)]
        pull: PullRequest,
    },
    OverrideMethod {
        template: String,
        #[serde(default)]
        async_template: Option<String>,
        #[serde(default)]
        enumerable_template: Option<String>,
        #[serde(default)]
        enumerator_template: Option<String>,
        #[serde(default)]
        async_enumerable_template: Option<String>,
        #[serde(default)]
        async_enumerator_template: Option<String>,
        #[serde(default)]
        use_async_template_for_any_awaitable: Option<bool>,
        #[serde(default)]
        use_enumerable_template_for_any_enumerable: Option<bool>,
    },
    OverrideAccessors {
        #[serde(default)]
        getter: Option<String>,
        #[serde(default)]
        setter: Option<String>,
        #[serde(default)]
        adder: Option<String>,
        #[serde(default)]
        remover: Option<String>,
        #[serde(default)]
        raiser: Option<String>,
    },
    OverrideConstructor {
        template: String,
    },
    OverrideFinalizer {
        template: String,
    },
    ImplementInterface {
        interface: TypeRef,
        #[serde(default)]
        strategy: OverrideStrategy,
        #[serde(default)]
        redirections: Vec<RedirectionRequest>,
    },
    AddContract {
        template: String,
        #[serde(default)]
        direction: ContractDirection,
        #[serde(default)]
        tags: BTreeMap<String, Value>,
    },
    AddInitializer {
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        statement: Option<String>,
        #[serde(default)]
        position: InitializerTarget,
    },
    IntroduceAttribute {
        attribute: AttributeDecl,
        #[serde(default)]
        strategy: OverrideStrategy,
    },
    RemoveAttributes {
        #[serde(rename = "type")]
        attribute_type: String,
    },
    AddAnnotation {
        annotation: Value,
    },
}

/// A declarative aspect applied to one target
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AspectRequest {
    pub name: String,
    /// Type declaring the templates
    #[serde(default)]
    pub template_type: Option<String>,
    pub target: DeclarationPath,
    #[serde(default)]
    pub advice: Vec<AdviceRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StepRequest {
    #[serde(default)]
    pub aspects: Vec<AspectRequest>,
}

/// Aspects of every pipeline step
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AspectsDocument {
    #[serde(default)]
    pub steps: Vec<StepRequest>,
}

impl AspectsDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_norway::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Pipeline running these aspects step by step
    pub fn into_pipeline(self, config: WeaverConfig) -> Pipeline {
        let mut pipeline = Pipeline::new(config);
        for step in self.steps {
            pipeline.add_step(
                step.aspects
                    .into_iter()
                    .map(|a| Box::new(a) as Box<dyn Aspect>)
                    .collect(),
            );
        }
        pipeline
    }
}

fn introduce_options<B>(options: &IntroductionRequest, args: ObjectReader) -> IntroduceOptions<B> {
    IntroduceOptions {
        name: options.name.clone(),
        scope: options.scope,
        strategy: options.strategy,
        args,
        build: None,
    }
}

fn missing(kind: &str, what: &str) -> Error {
    Error::InvalidAdviceParameters(format!("{} needs {}", kind, what))
}

fn log_result<T>(aspect: &str, kind: &str, result: &AdviceResult<T>) {
    debug!(aspect, advice = kind, outcome = ?result.outcome, "declarative advice done");
}

impl AspectRequest {
    fn run_advice(&self, factory: &mut AdviceFactory<'_>, request: &AdviceRequest) -> Result<()> {
        let target = match &request.target {
            Some(path) => path.resolve(factory.compilation())?,
            None => factory.aspect().target,
        };
        let args = ObjectReader::from_pairs(request.args.clone());
        let name = self.name.as_str();

        match &request.advice {
            AdviceKindRequest::IntroduceMethod { template, options } => {
                let result = factory.introduce_method(target, template, introduce_options(options, args))?;
                log_result(name, "introduce_method", &result);
            }
            AdviceKindRequest::IntroduceOperator {
                template,
                operator,
                options,
            } => {
                let result = factory.introduce_operator(
                    target,
                    template,
                    operator.clone(),
                    introduce_options(options, args),
                )?;
                log_result(name, "introduce_operator", &result);
            }
            AdviceKindRequest::IntroduceField {
                template,
                name: field_name,
                ty,
                options,
            } => {
                let options = introduce_options(options, args);
                let result = match (template, field_name, ty) {
                    (Some(template), _, _) => factory.introduce_field(target, template, options)?,
                    (None, Some(field_name), Some(ty)) => {
                        factory.introduce_field_of_type(target, field_name, ty.clone(), options)?
                    }
                    _ => return Err(missing("introduce_field", "a template, or a name and a type")),
                };
                log_result(name, "introduce_field", &result);
            }
            AdviceKindRequest::IntroduceProperty {
                template,
                name: property_name,
                ty,
                getter,
                setter,
                options,
            } => {
                let options = introduce_options(options, args);
                let result = match (template, property_name, ty) {
                    (Some(template), _, _) => factory.introduce_property(target, template, options)?,
                    (None, Some(property_name), Some(ty)) if getter.is_some() || setter.is_some() => factory
                        .introduce_property_with_accessors(
                            target,
                            property_name,
                            ty.clone(),
                            getter.as_deref(),
                            setter.as_deref(),
                            options,
                        )?,
                    (None, Some(property_name), Some(ty)) => {
                        factory.introduce_auto_property(target, property_name, ty.clone(), options)?
                    }
                    _ => return Err(missing("introduce_property", "a template, or a name and a type")),
                };
                log_result(name, "introduce_property", &result);
            }
            AdviceKindRequest::IntroduceIndexer {
                ty,
                parameters,
                getter,
                setter,
                options,
            } => {
                let parameters = parameters.iter().map(|p| (p.name.clone(), p.ty.clone())).collect();
                let result = factory.introduce_indexer(
                    target,
                    ty.clone(),
                    parameters,
                    getter.as_deref(),
                    setter.as_deref(),
                    introduce_options(options, args),
                )?;
                log_result(name, "introduce_indexer", &result);
            }
            AdviceKindRequest::IntroduceEvent {
                template,
                name: event_name,
                ty,
                options,
            } => {
                let options = introduce_options(options, args);
                let result = match (template, event_name, ty) {
                    (Some(template), _, _) => factory.introduce_event(target, template, options)?,
                    (None, Some(event_name), Some(ty)) => {
                        factory.introduce_event_field(target, event_name, ty.clone(), options)?
                    }
                    _ => return Err(missing("introduce_event", "a template, or a name and a type")),
                };
                log_result(name, "introduce_event", &result);
            }
            AdviceKindRequest::IntroduceConstructor { template, options } => {
                let result = factory.introduce_constructor(target, template, introduce_options(options, args))?;
                log_result(name, "introduce_constructor", &result);
            }
            AdviceKindRequest::IntroduceFinalizer { template, strategy } => {
                let result = factory.introduce_finalizer(target, template, *strategy, args)?;
                log_result(name, "introduce_finalizer", &result);
            }
            AdviceKindRequest::IntroduceParameter {
                name: parameter_name,
                ty,
                default_value,
                pull,
            } => {
                let result = factory.introduce_parameter(
                    target,
                    parameter_name,
                    ty.clone(),
                    default_value.clone().map(Expression::new),
                    pull.strategy(),
                )?;
                log_result(name, "introduce_parameter", &result);
            }
            AdviceKindRequest::OverrideMethod {
                template,
                async_template,
                enumerable_template,
                enumerator_template,
                async_enumerable_template,
                async_enumerator_template,
                use_async_template_for_any_awaitable,
                use_enumerable_template_for_any_enumerable,
            } => {
                let templates = MethodTemplates {
                    default: template.clone(),
                    async_template: async_template.clone(),
                    enumerable: enumerable_template.clone(),
                    enumerator: enumerator_template.clone(),
                    async_enumerable: async_enumerable_template.clone(),
                    async_enumerator: async_enumerator_template.clone(),
                    use_async_template_for_any_awaitable: *use_async_template_for_any_awaitable,
                    use_enumerable_template_for_any_enumerable: *use_enumerable_template_for_any_enumerable,
                };
                let result = factory.override_method(target, &templates, args)?;
                log_result(name, "override_method", &result);
            }
            AdviceKindRequest::OverrideAccessors {
                getter,
                setter,
                adder,
                remover,
                raiser,
            } => {
                let templates = AccessorTemplates {
                    getter: getter.clone(),
                    setter: setter.clone(),
                    adder: adder.clone(),
                    remover: remover.clone(),
                    raiser: raiser.clone(),
                };
                let result = factory.override_accessors(target, &templates, args)?;
                log_result(name, "override_accessors", &result);
            }
            AdviceKindRequest::OverrideConstructor { template } => {
                let result = factory.override_constructor(target, template, args)?;
                log_result(name, "override_constructor", &result);
            }
            AdviceKindRequest::OverrideFinalizer { template } => {
                let result = factory.override_finalizer(target, template, args)?;
                log_result(name, "override_finalizer", &result);
            }
            AdviceKindRequest::ImplementInterface {
                interface,
                strategy,
                redirections,
            } => {
                let redirections = redirections
                    .iter()
                    .map(|r| {
                        Ok(MemberRedirection {
                            interface_member: r.member.clone(),
                            target: r.target.resolve(factory.compilation())?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let options = ImplementInterfaceOptions {
                    strategy: *strategy,
                    redirections,
                    args,
                };
                let result = factory.implement_interface(target, interface.clone(), options)?;
                log_result(name, "implement_interface", &result);
            }
            AdviceKindRequest::AddContract {
                template,
                direction,
                tags,
            } => {
                let options = ContractOptions {
                    args,
                    tags: ObjectReader::from_pairs(tags.clone()),
                };
                let result = factory.add_contract(target, template, *direction, options)?;
                log_result(name, "add_contract", &result);
            }
            AdviceKindRequest::AddInitializer {
                template,
                statement,
                position,
            } => {
                let result = match (template, statement) {
                    (Some(template), None) => factory.add_initializer(target, template, *position, args)?,
                    (None, Some(statement)) => factory.add_initializer_statement(target, statement, *position)?,
                    _ => return Err(missing("add_initializer", "either a template or a statement")),
                };
                log_result(name, "add_initializer", &result);
            }
            AdviceKindRequest::IntroduceAttribute { attribute, strategy } => {
                let result = factory.introduce_attribute(target, attribute.clone(), *strategy)?;
                log_result(name, "introduce_attribute", &result);
            }
            AdviceKindRequest::RemoveAttributes { attribute_type } => {
                let result = factory.remove_attributes(target, attribute_type)?;
                log_result(name, "remove_attributes", &result);
            }
            AdviceKindRequest::AddAnnotation { annotation } => {
                let result = factory.add_annotation(target, annotation.clone())?;
                log_result(name, "add_annotation", &result);
            }
        }
        Ok(())
    }
}

impl Aspect for AspectRequest {
    fn name(&self) -> &str {
        &self.name
    }

    fn template_type(&self, compilation: &Compilation) -> Result<Option<DeclId>> {
        self.template_type
            .as_deref()
            .map(|name| {
                compilation
                    .find_type(name)
                    .map(|t| t.id())
                    .ok_or_else(|| Error::InvalidAdviceParameters(format!("no aspect type named '{}'", name)))
            })
            .transpose()
    }

    fn target(&self, compilation: &Compilation) -> Result<DeclId> {
        self.target.resolve(compilation)
    }

    fn build_aspect(&self, factory: &mut AdviceFactory<'_>) -> Result<()> {
        for request in &self.advice {
            if factory.state().is_skipped(factory.aspect().instance) {
                debug!(aspect = %self.name, "aspect failed, remaining advice skipped");
                break;
            }
            self.run_advice(factory, request)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MODEL: &str = r#"
types:
  - name: App.Orders
    members:
      - kind: method
        name: Place
        accessibility: public
        parameters:
          - name: quantity
            type: int
      - kind: method
        name: Place
        accessibility: public
        parameters:
          - name: quantity
            type: int
          - name: lookup
            type: Dictionary<string, int>
      - kind: method
        name: Count
        returns: int
        accessibility: public
"#;

    #[test]
    fn test_path_parsing() {
        let path = DeclarationPath::parse("App.Orders::Place(int, Dictionary<string, int>)@lookup").unwrap();
        assert_eq!(path.type_name, "App.Orders");
        assert_eq!(path.member.as_deref(), Some("Place"));
        assert_eq!(
            path.parameters,
            Some(vec![TypeRef::named("int"), TypeRef::parse("Dictionary<string, int>").unwrap()])
        );
        assert_eq!(path.parameter.as_deref(), Some("lookup"));

        let generic = DeclarationPath::parse("Ns.IBox<T>").unwrap();
        assert_eq!(generic.type_name, "Ns.IBox<T>");
        assert_eq!(generic.member, None);

        assert!(DeclarationPath::parse("App.Orders@x").is_err());
        assert!(DeclarationPath::parse("::Place").is_err());
    }

    #[test]
    fn test_path_resolution() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let orders = compilation.find_type("App.Orders").unwrap().id();

        let ty = DeclarationPath::parse("App.Orders").unwrap();
        assert_eq!(ty.resolve(&compilation).unwrap(), orders);

        let ambiguous = DeclarationPath::parse("App.Orders::Place").unwrap();
        assert!(ambiguous.resolve(&compilation).is_err());

        let single = DeclarationPath::parse("App.Orders::Place(int)@quantity").unwrap();
        let parameter = single.resolve(&compilation).unwrap();
        assert_eq!(compilation.declaration(parameter).unwrap().name(), "quantity");

        let returned = DeclarationPath::parse("App.Orders::Count@return").unwrap();
        let id = returned.resolve(&compilation).unwrap();
        assert!(matches!(compilation.declaration(id), Some(Declaration::Parameter(p)) if p.is_return()));
    }

    #[test]
    fn test_document_parses_advice_kinds() {
        let document = AspectsDocument::from_yaml(
            r#"
steps:
  - aspects:
      - name: Tagging
        target: App.Orders
        advice:
          - kind: add_annotation
            annotation: {tag: orders}
          - kind: introduce_field
            name: audit
            type: string
            options: {scope: instance, strategy: ignore}
          - kind: override_accessors
            target: App.Orders::Count
            getter: Get
"#,
        )
        .unwrap();
        let advice = &document.steps[0].aspects[0].advice;
        assert_eq!(advice.len(), 3);
        assert!(matches!(advice[0].advice, AdviceKindRequest::AddAnnotation { .. }));
        let AdviceKindRequest::IntroduceField { options, .. } = &advice[1].advice else {
            panic!("unexpected advice {:?}", advice[1].advice);
        };
        assert_eq!(options.strategy, OverrideStrategy::Ignore);
        assert_eq!(
            advice[2].target.as_ref().map(|t| t.to_string()),
            Some("App.Orders::Count".to_string())
        );
    }

    #[test]
    fn test_declarative_pipeline_runs() {
        let document = AspectsDocument::from_yaml(
            r#"
steps:
  - aspects:
      - name: Tagging
        target: App.Orders
        advice:
          - kind: add_annotation
            annotation: {tag: orders}
          - kind: introduce_field
            name: audit
            type: string
            options: {scope: instance}
"#,
        )
        .unwrap();
        let result = document
            .into_pipeline(WeaverConfig::default())
            .execute(Compilation::from_yaml(MODEL).unwrap())
            .unwrap();
        let kinds: Vec<_> = result.transformations.iter().map(|t| t.kind.name()).collect();
        assert_eq!(kinds, vec!["add_annotation", "introduce_member"]);
        assert!(result.diagnostics.is_empty());
    }
}
