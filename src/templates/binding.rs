//! Signature verification and template parameter binding

use super::TemplateMember;
use crate::error::{Error, Result};
use crate::model::{
    Compilation, ConstructorDecl, DeclId, Declaration, Expression, MethodDecl, OperatorKind,
    ParameterDecl, RefKind, TypeParameterDecl, TypeRef,
};
use crate::object_reader::ObjectReader;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Value passed to one template parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateArgument {
    /// Expression evaluated at run time (a target parameter)
    RunTime { expression: Expression },
    /// Value known while expanding the template
    CompileTime { value: Value },
}

/// A template bound to a concrete target signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundTemplateMethod {
    pub template: TemplateMember<MethodDecl>,
    /// One argument per template parameter, in template order
    pub arguments: Vec<TemplateArgument>,
    pub type_arguments: BTreeMap<String, TypeRef>,
}

/// Signature a template is bound against
#[derive(Debug, Clone, PartialEq)]
pub struct BindingTarget {
    pub return_type: TypeRef,
    pub parameters: Vec<(String, TypeRef)>,
    pub type_parameters: Vec<String>,
    pub operator_kind: OperatorKind,
}

impl BindingTarget {
    pub fn of_method(compilation: &Compilation, method: &MethodDecl) -> Self {
        Self {
            return_type: method.return_type.clone(),
            parameters: named_parameters(compilation, &method.parameters),
            type_parameters: method.type_parameters.iter().map(|p| p.name.clone()).collect(),
            operator_kind: method.operator_kind,
        }
    }

    /// Accessor of an indexer sees the index parameters before `value`
    pub fn of_accessor(compilation: &Compilation, accessor: &MethodDecl, index_parameters: &[DeclId]) -> Self {
        let mut parameters = named_parameters(compilation, index_parameters);
        parameters.extend(named_parameters(compilation, &accessor.parameters));
        Self {
            return_type: accessor.return_type.clone(),
            parameters,
            type_parameters: Vec::new(),
            operator_kind: OperatorKind::None,
        }
    }

    pub fn of_constructor(compilation: &Compilation, constructor: &ConstructorDecl) -> Self {
        Self {
            return_type: TypeRef::Void,
            parameters: named_parameters(compilation, &constructor.parameters),
            type_parameters: Vec::new(),
            operator_kind: OperatorKind::None,
        }
    }
}

fn named_parameters(compilation: &Compilation, ids: &[DeclId]) -> Vec<(String, TypeRef)> {
    ids.iter()
        .filter_map(|id| match compilation.declaration(*id) {
            Some(Declaration::Parameter(p)) => Some((p.name.clone(), p.ty.clone())),
            _ => None,
        })
        .collect()
}

/// Whether a template type is compatible with a target type
///
/// `dynamic` matches anything; `Task<dynamic>` matches `void`, any awaitable
/// and async enumerables.
pub fn verify_template_type(compilation: &Compilation, source: &TypeRef, target: &TypeRef) -> bool {
    if source.is_dynamic() {
        return true;
    }
    if source.is_task_of_dynamic() {
        return target.is_void()
            || compilation.is_awaitable(target)
            || target.enumerable_kind().is_async();
    }
    match (source, target) {
        (TypeRef::Void, TypeRef::Void) => true,
        (TypeRef::GenericParameter(a), TypeRef::GenericParameter(b)) => a == b,
        (TypeRef::Array(a), TypeRef::Array(b)) => verify_template_type(compilation, a, b),
        (
            TypeRef::Named { name: a, args: aa },
            TypeRef::Named { name: b, args: ba },
        ) => {
            names_match(a, b)
                && aa.len() == ba.len()
                && aa
                    .iter()
                    .zip(ba)
                    .all(|(s, t)| verify_template_type(compilation, s, t))
        }
        _ => false,
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a == b
        || a.strip_suffix(b).is_some_and(|p| p.ends_with('.'))
        || b.strip_suffix(a).is_some_and(|p| p.ends_with('.'))
}

/// Run-time parameter of an introduced method derived from its template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunTimeParameter {
    pub name: String,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
    pub default_value: Option<Expression>,
}

/// A template with its compile-time arguments bound, for members that do not
/// exist yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartiallyBoundTemplateMethod {
    pub template: TemplateMember<MethodDecl>,
    pub type_arguments: BTreeMap<String, TypeRef>,
    pub compile_time_values: BTreeMap<String, Value>,
    /// Return type with compile-time type arguments substituted
    pub return_type: TypeRef,
    pub run_time_parameters: Vec<RunTimeParameter>,
    pub run_time_type_parameters: Vec<TypeParameterDecl>,
}

struct CompileTimeBinding {
    type_arguments: BTreeMap<String, TypeRef>,
    values: BTreeMap<String, Value>,
}

fn template_parameters<'a>(compilation: &'a Compilation, method: &MethodDecl) -> Result<Vec<&'a ParameterDecl>> {
    method
        .parameters
        .iter()
        .map(|id| match compilation.require_declaration(*id)? {
            Declaration::Parameter(p) => Ok(p),
            other => Err(Error::AssertionFailed(format!(
                "parameter list contains a {}",
                other.kind()
            ))),
        })
        .collect()
}

fn bind_compile_time(
    compilation: &Compilation,
    template: &TemplateMember<MethodDecl>,
    method: &MethodDecl,
    args: &ObjectReader,
) -> Result<CompileTimeBinding> {
    let mut known = BTreeSet::new();
    let mut type_arguments = BTreeMap::new();
    for tp in method.type_parameters.iter().filter(|p| p.is_compile_time) {
        known.insert(tp.name.as_str());
        let ty: TypeRef = args.get_as(&tp.name)?.ok_or_else(|| {
            Error::InvalidAdviceParameters(format!(
                "no type was supplied for the compile-time type parameter '{}' of template '{}'",
                tp.name, template.name
            ))
        })?;
        type_arguments.insert(tp.name.clone(), ty);
    }

    let mut values = BTreeMap::new();
    for p in template_parameters(compilation, method)? {
        if !p.is_compile_time() {
            continue;
        }
        known.insert(p.name.as_str());
        let value = match (args.get(&p.name), &p.default_value) {
            (Some(v), _) => v.clone(),
            (None, Some(default)) => Value::String(default.0.clone()),
            (None, None) => {
                return Err(Error::InvalidAdviceParameters(format!(
                    "no value was supplied for the compile-time parameter '{}' of template '{}'",
                    p.name, template.name
                )))
            }
        };
        values.insert(p.name.clone(), value);
    }

    if let Some(unknown) = args.keys().find(|k| !known.contains(k)) {
        return Err(Error::InvalidAdviceParameters(format!(
            "the template '{}' has no compile-time parameter named '{}'",
            template.name, unknown
        )));
    }

    Ok(CompileTimeBinding {
        type_arguments,
        values,
    })
}

/// Bind a template to an existing target signature
pub fn bind_template(
    compilation: &Compilation,
    template: &TemplateMember<MethodDecl>,
    target: &BindingTarget,
    args: &ObjectReader,
) -> Result<BoundTemplateMethod> {
    let method = compilation.require(template.declaration)?;
    let binding = bind_compile_time(compilation, template, method, args)?;

    let run_time_type_parameters: Vec<&TypeParameterDecl> = method
        .type_parameters
        .iter()
        .filter(|p| !p.is_compile_time)
        .collect();
    if !run_time_type_parameters.is_empty() && run_time_type_parameters.len() != target.type_parameters.len() {
        return Err(Error::InvalidTemplateSignature(format!(
            "the template '{}' has {} run-time type parameters but the target has {}",
            template.name,
            run_time_type_parameters.len(),
            target.type_parameters.len()
        )));
    }
    let mut substitution = binding.type_arguments.clone();
    for (tp, target_name) in run_time_type_parameters.iter().zip(&target.type_parameters) {
        substitution.insert(tp.name.clone(), TypeRef::GenericParameter(target_name.clone()));
    }

    let return_type = method.return_type.substitute(&substitution);
    if !verify_template_type(compilation, &return_type, &target.return_type) {
        return Err(Error::InvalidTemplateSignature(format!(
            "the return type '{}' of template '{}' is not compatible with '{}'",
            return_type, template.name, target.return_type
        )));
    }

    let parameters = template_parameters(compilation, method)?;
    let run_time_count = parameters.iter().filter(|p| !p.is_compile_time()).count();
    let arity = target.operator_kind.arity();
    if target.operator_kind != OperatorKind::None && run_time_count != arity {
        return Err(Error::InvalidTemplateSignature(format!(
            "the template '{}' must have exactly {} run-time parameter(s) to override an operator, but has {}",
            template.name, arity, run_time_count
        )));
    }

    let mut arguments = Vec::with_capacity(parameters.len());
    let mut position = 0;
    for p in parameters {
        if p.is_compile_time() {
            let value = binding.values.get(&p.name).cloned().unwrap_or(Value::Null);
            arguments.push(TemplateArgument::CompileTime { value });
            continue;
        }

        let matched = if target.operator_kind != OperatorKind::None {
            target.parameters.get(position)
        } else {
            target.parameters.iter().find(|(name, _)| name == &p.name)
        };
        position += 1;

        let Some((target_name, target_type)) = matched else {
            return Err(Error::InvalidTemplateSignature(format!(
                "the template parameter '{}' of '{}' has no matching target parameter",
                p.name, template.name
            )));
        };
        let source_type = p.ty.substitute(&substitution);
        if !verify_template_type(compilation, &source_type, target_type) {
            return Err(Error::InvalidTemplateSignature(format!(
                "the template parameter '{}' of '{}' has type '{}' which is not compatible with '{}'",
                p.name, template.name, source_type, target_type
            )));
        }
        arguments.push(TemplateArgument::RunTime {
            expression: Expression::new(target_name.clone()),
        });
    }

    Ok(BoundTemplateMethod {
        template: template.clone(),
        arguments,
        type_arguments: binding.type_arguments,
    })
}

impl PartiallyBoundTemplateMethod {
    pub fn new(
        compilation: &Compilation,
        template: &TemplateMember<MethodDecl>,
        args: &ObjectReader,
    ) -> Result<Self> {
        let method = compilation.require(template.declaration)?;
        let binding = bind_compile_time(compilation, template, method, args)?;

        let run_time_parameters = template_parameters(compilation, method)?
            .into_iter()
            .filter(|p| !p.is_compile_time())
            .map(|p| RunTimeParameter {
                name: p.name.clone(),
                ty: p.ty.substitute(&binding.type_arguments),
                ref_kind: p.ref_kind,
                default_value: p.default_value.clone(),
            })
            .collect();

        Ok(Self {
            template: template.clone(),
            return_type: method.return_type.substitute(&binding.type_arguments),
            run_time_type_parameters: method
                .type_parameters
                .iter()
                .filter(|p| !p.is_compile_time)
                .cloned()
                .collect(),
            type_arguments: binding.type_arguments,
            compile_time_values: binding.values,
            run_time_parameters,
        })
    }

    /// Complete the binding once the introduced member's parameters are known;
    /// run-time parameters map positionally
    pub fn bind_to(&self, compilation: &Compilation, parameter_names: &[String]) -> Result<BoundTemplateMethod> {
        if parameter_names.len() < self.run_time_parameters.len() {
            return Err(Error::InvalidTemplateSignature(format!(
                "the template '{}' has {} run-time parameters but the target has only {}",
                self.template.name,
                self.run_time_parameters.len(),
                parameter_names.len()
            )));
        }

        let method = compilation.require(self.template.declaration)?;
        let mut names = parameter_names.iter();
        let mut arguments = Vec::new();
        for p in template_parameters(compilation, method)? {
            if p.is_compile_time() {
                let value = self.compile_time_values.get(&p.name).cloned().unwrap_or(Value::Null);
                arguments.push(TemplateArgument::CompileTime { value });
            } else if let Some(name) = names.next() {
                arguments.push(TemplateArgument::RunTime {
                    expression: Expression::new(name.clone()),
                });
            }
        }

        Ok(BoundTemplateMethod {
            template: self.template.clone(),
            arguments,
            type_arguments: self.type_arguments.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::find_template;
    use serde_json::json;

    const MODEL: &str = r#"
types:
  - name: Aspects.Retry
    members:
      - kind: method
        name: Wrap
        returns: dynamic
        attributes: [{type: Template}]
        parameters:
          - name: id
            type: int
          - name: attempts
            type: int
            attributes: [{type: CompileTime}]
      - kind: method
        name: AsyncWrap
        returns: "Task<dynamic>"
        attributes: [{type: Template}]
      - kind: method
        name: Add
        returns: dynamic
        attributes: [{type: Template}]
        parameters:
          - name: a
            type: dynamic
          - name: b
            type: dynamic
  - name: App.Repo
    members:
      - kind: method
        name: Find
        returns: string
        parameters:
          - name: id
            type: int
      - kind: method
        name: Save
        returns: void
      - kind: method
        operator: addition
        returns: App.Repo
        parameters:
          - name: left
            type: App.Repo
          - name: right
            type: App.Repo
      - kind: method
        operator: unary_negation
        returns: App.Repo
        parameters:
          - name: value
            type: App.Repo
"#;

    fn template(compilation: &Compilation, name: &str) -> TemplateMember<MethodDecl> {
        let aspect = compilation.find_type("Aspects.Retry").unwrap().id();
        TemplateMember::from_declaration(compilation, find_template(compilation, aspect, name).unwrap())
            .unwrap()
    }

    fn target(compilation: &Compilation, name: &str, params: &[&str]) -> BindingTarget {
        let repo = compilation.find_type("App.Repo").unwrap().id();
        let types: Vec<TypeRef> = params.iter().map(|p| TypeRef::parse(p).unwrap()).collect();
        let id = compilation.find_closest_visible_method(repo, name, &types).unwrap();
        BindingTarget::of_method(compilation, compilation.method(id).unwrap())
    }

    #[test]
    fn test_binds_by_name_with_compile_time_value() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let bound = bind_template(
            &compilation,
            &template(&compilation, "Wrap"),
            &target(&compilation, "Find", &["int"]),
            &ObjectReader::from_pairs([("attempts", json!(3))]),
        )
        .unwrap();
        assert_eq!(
            bound.arguments,
            vec![
                TemplateArgument::RunTime {
                    expression: Expression::new("id")
                },
                TemplateArgument::CompileTime { value: json!(3) },
            ]
        );
    }

    #[test]
    fn test_missing_compile_time_value_is_authoring_error() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let err = bind_template(
            &compilation,
            &template(&compilation, "Wrap"),
            &target(&compilation, "Find", &["int"]),
            &ObjectReader::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAdviceParameters(_)));
    }

    #[test]
    fn test_unmatched_parameter_name_rejected() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let err = bind_template(
            &compilation,
            &template(&compilation, "Wrap"),
            &target(&compilation, "Save", &[]),
            &ObjectReader::from_pairs([("attempts", json!(1))]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplateSignature(_)));
    }

    #[test]
    fn test_task_of_dynamic_matches_void() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        assert!(bind_template(
            &compilation,
            &template(&compilation, "AsyncWrap"),
            &target(&compilation, "Save", &[]),
            &ObjectReader::empty(),
        )
        .is_ok());
        assert!(!verify_template_type(
            &compilation,
            &TypeRef::parse("Task<dynamic>").unwrap(),
            &TypeRef::named("string")
        ));
    }

    #[test]
    fn test_operator_binding_is_positional_and_counted() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let add = template(&compilation, "Add");
        let bound = bind_template(
            &compilation,
            &add,
            &target(&compilation, "op_Addition", &["App.Repo", "App.Repo"]),
            &ObjectReader::empty(),
        )
        .unwrap();
        assert_eq!(
            bound.arguments[1],
            TemplateArgument::RunTime {
                expression: Expression::new("right")
            }
        );

        let err = bind_template(
            &compilation,
            &add,
            &target(&compilation, "op_UnaryNegation", &["App.Repo"]),
            &ObjectReader::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplateSignature(_)));
    }

    #[test]
    fn test_partial_binding_then_bind_to() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let partial = PartiallyBoundTemplateMethod::new(
            &compilation,
            &template(&compilation, "Wrap"),
            &ObjectReader::from_pairs([("attempts", json!(2))]),
        )
        .unwrap();
        assert_eq!(partial.run_time_parameters.len(), 1);
        let bound = partial.bind_to(&compilation, &["key".to_string()]).unwrap();
        assert_eq!(
            bound.arguments[0],
            TemplateArgument::RunTime {
                expression: Expression::new("key")
            }
        );
    }
}
