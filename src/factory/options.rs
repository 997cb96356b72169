//! Optional arguments of factory calls

use crate::advice::introduce::BuildHook;
use crate::advice::{
    IntroductionScope, IntroductionSettings, MemberRedirection, OverrideStrategy,
};
use crate::config::TemplatesConfig;
use crate::error::Result;
use crate::model::{Compilation, DeclId, MethodDecl};
use crate::object_reader::ObjectReader;
use crate::templates::{find_template, GetterTemplateSelector, MethodTemplateSelector, TemplateMember};

/// Settings of an introduction plus an optional builder customization
pub struct IntroduceOptions<B> {
    pub name: Option<String>,
    pub scope: IntroductionScope,
    pub strategy: OverrideStrategy,
    pub args: ObjectReader,
    pub build: Option<BuildHook<B>>,
}

impl<B> Default for IntroduceOptions<B> {
    fn default() -> Self {
        Self {
            name: None,
            scope: IntroductionScope::Default,
            strategy: OverrideStrategy::Default,
            args: ObjectReader::empty(),
            build: None,
        }
    }
}

impl<B> IntroduceOptions<B> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_scope(mut self, scope: IntroductionScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_strategy(mut self, strategy: OverrideStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_args(mut self, args: ObjectReader) -> Self {
        self.args = args;
        self
    }

    /// Customize the builder after the template has been copied onto it
    pub fn with_build(mut self, build: impl Fn(&mut B) + 'static) -> Self {
        self.build = Some(Box::new(build));
        self
    }

    pub(crate) fn into_parts(self) -> (IntroductionSettings, Option<BuildHook<B>>) {
        let settings = IntroductionSettings {
            name: self.name,
            scope: self.scope,
            strategy: self.strategy,
            args: self.args,
        };
        (settings, self.build)
    }
}

/// Template names for a method override, by target shape
#[derive(Debug, Clone, Default)]
pub struct MethodTemplates {
    pub default: String,
    pub async_template: Option<String>,
    pub enumerable: Option<String>,
    pub enumerator: Option<String>,
    pub async_enumerable: Option<String>,
    pub async_enumerator: Option<String>,
    /// Defaults to `templates.use_async_template_for_any_awaitable`
    pub use_async_template_for_any_awaitable: Option<bool>,
    /// Defaults to `templates.use_enumerable_template_for_any_enumerable`
    pub use_enumerable_template_for_any_enumerable: Option<bool>,
}

impl MethodTemplates {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            ..Self::default()
        }
    }

    pub(crate) fn selector(
        &self,
        compilation: &Compilation,
        aspect_type: DeclId,
        config: &TemplatesConfig,
    ) -> Result<MethodTemplateSelector> {
        let lookup = |name: &Option<String>| lookup_method(compilation, aspect_type, name.as_deref());
        let mut selector = MethodTemplateSelector::new(method_template(compilation, aspect_type, &self.default)?);
        selector.async_template = lookup(&self.async_template)?;
        selector.enumerable_template = lookup(&self.enumerable)?;
        selector.enumerator_template = lookup(&self.enumerator)?;
        selector.async_enumerable_template = lookup(&self.async_enumerable)?;
        selector.async_enumerator_template = lookup(&self.async_enumerator)?;
        selector.use_async_template_for_any_awaitable = self
            .use_async_template_for_any_awaitable
            .unwrap_or(config.use_async_template_for_any_awaitable);
        selector.use_enumerable_template_for_any_enumerable = self
            .use_enumerable_template_for_any_enumerable
            .unwrap_or(config.use_enumerable_template_for_any_enumerable);
        Ok(selector)
    }
}

/// Getter template names for a field or property override
#[derive(Debug, Clone, Default)]
pub struct GetterTemplates {
    pub default: Option<String>,
    pub enumerable: Option<String>,
    pub enumerator: Option<String>,
}

impl GetterTemplates {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::default()
        }
    }

    pub(crate) fn selector(
        &self,
        compilation: &Compilation,
        aspect_type: DeclId,
        config: &TemplatesConfig,
    ) -> Result<GetterTemplateSelector> {
        let lookup = |name: &Option<String>| lookup_method(compilation, aspect_type, name.as_deref());
        Ok(GetterTemplateSelector {
            default_template: lookup(&self.default)?,
            enumerable_template: lookup(&self.enumerable)?,
            enumerator_template: lookup(&self.enumerator)?,
            use_enumerable_template_for_any_enumerable: config.use_enumerable_template_for_any_enumerable,
        })
    }
}

/// Accessor template names of an override dispatched on the target kind
///
/// `getter`/`setter` apply to fields, properties and indexers; `adder`,
/// `remover` and `raiser` to events.
#[derive(Debug, Clone, Default)]
pub struct AccessorTemplates {
    pub getter: Option<String>,
    pub setter: Option<String>,
    pub adder: Option<String>,
    pub remover: Option<String>,
    pub raiser: Option<String>,
}

/// Options of an interface implementation
#[derive(Debug, Clone, Default)]
pub struct ImplementInterfaceOptions {
    /// `Fail` or `Ignore` when the interface is already implemented
    pub strategy: OverrideStrategy,
    pub redirections: Vec<MemberRedirection>,
    pub args: ObjectReader,
}

impl ImplementInterfaceOptions {
    pub fn with_strategy(mut self, strategy: OverrideStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Implement `interface_member` by forwarding to `target`
    pub fn redirect(mut self, interface_member: impl Into<String>, target: DeclId) -> Self {
        self.redirections.push(MemberRedirection {
            interface_member: interface_member.into(),
            target,
        });
        self
    }
}

/// Compile-time arguments and expander tags of a contract
#[derive(Debug, Clone, Default)]
pub struct ContractOptions {
    pub args: ObjectReader,
    pub tags: ObjectReader,
}

pub(crate) fn method_template(
    compilation: &Compilation,
    aspect_type: DeclId,
    name: &str,
) -> Result<TemplateMember<MethodDecl>> {
    let id = find_template(compilation, aspect_type, name)?;
    TemplateMember::from_declaration(compilation, id)
}

fn lookup_method(
    compilation: &Compilation,
    aspect_type: DeclId,
    name: Option<&str>,
) -> Result<Option<TemplateMember<MethodDecl>>> {
    name.map(|name| method_template(compilation, aspect_type, name))
        .transpose()
}
