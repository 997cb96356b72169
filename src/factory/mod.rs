//! Advice factory: the API aspects use to request transformations
//!
//! Every call builds one advice for the current aspect instance, runs it
//! against the step's working snapshot and hands back an `AdviceResult`.
//! Template names are looked up on the aspect's template type, closest type
//! in its hierarchy first.

pub mod options;
pub mod state;

pub use options::{
    AccessorTemplates, ContractOptions, GetterTemplates, ImplementInterfaceOptions,
    IntroduceOptions, MethodTemplates,
};
pub use state::{AspectInstance, NonUserCodeScope, StepOutcome, StepState};

use crate::advice::contract::contract_owner;
use crate::advice::introduce::{EventSource, FieldSource, OperatorSignature, PropertySource};
use crate::advice::{
    AddAnnotationAdvice, AddInitializerAdvice, Advice, AdviceInfo, AdviceOutcome, AdviceResult,
    ContractDirection, ImplementInterfaceAdvice, InitializerSource, InitializerTarget,
    IntroduceAttributeAdvice, IntroduceConstructorAdvice, IntroduceEventAdvice,
    IntroduceFieldAdvice, IntroduceFinalizerAdvice, IntroduceIndexerAdvice, IntroduceMethodAdvice,
    IntroduceOperatorAdvice, IntroduceParameterAdvice, IntroducePropertyAdvice,
    IntroductionSettings, OverrideConstructorAdvice, OverrideEventAdvice,
    OverrideFieldOrPropertyAdvice, OverrideFinalizerAdvice, OverrideIndexerAdvice,
    OverrideMethodAdvice, OverrideStrategy, PullStrategy, RemoveAttributesAdvice,
};
use crate::builders::{
    ConstructorBuilder, EventBuilder, FieldBuilder, IndexerBuilder, MethodBuilder, PropertyBuilder,
};
use crate::error::{Error, Result};
use crate::model::{
    AttributeDecl, Compilation, ConstructorDecl, DeclId, Declaration, DeclarationKind,
    DeclarationVariant, EventDecl, Expression, FieldDecl, IndexerDecl, MethodDecl, ParameterDecl,
    PropertyDecl, Ref, TypeDecl, TypeRef,
};
use crate::object_reader::ObjectReader;
use crate::templates::{find_template, PartiallyBoundTemplateMethod, TemplateMember};
use serde_json::Value;
use tracing::debug;

/// Advice factory of one aspect instance within one step
pub struct AdviceFactory<'s> {
    state: &'s mut StepState,
    aspect: AspectInstance,
}

impl<'s> AdviceFactory<'s> {
    pub fn new(state: &'s mut StepState, aspect: AspectInstance) -> Self {
        Self { state, aspect }
    }

    pub fn aspect(&self) -> &AspectInstance {
        &self.aspect
    }

    /// Working snapshot, including what earlier advice of the step produced
    pub fn compilation(&self) -> &Compilation {
        self.state.compilation()
    }

    pub fn state(&self) -> &StepState {
        self.state
    }

    fn info(&self, target: DeclId) -> AdviceInfo {
        self.aspect.advice_info(target)
    }

    fn aspect_type(&self) -> Result<DeclId> {
        self.aspect.template_type.ok_or_else(|| {
            Error::InvalidOperation(format!(
                "the aspect '{}' has no template type to look templates up in",
                self.aspect.name
            ))
        })
    }

    fn template<T: DeclarationVariant>(&self, name: &str) -> Result<TemplateMember<T>> {
        let compilation = self.state.compilation();
        let id = find_template(compilation, self.aspect_type()?, name)?;
        TemplateMember::from_declaration(compilation, id)
    }

    fn optional_template<T: DeclarationVariant>(&self, name: Option<&str>) -> Result<Option<TemplateMember<T>>> {
        name.map(|name| self.template(name)).transpose()
    }

    fn run<A: Advice, T>(&mut self, advice: A) -> Result<AdviceResult<T>> {
        let _scope = self.state.non_user_code();
        let kind = advice.kind();
        let target = advice.target();
        let result = self.state.execute(&self.aspect, advice)?;
        debug!(
            aspect = %self.aspect.name,
            advice = %kind,
            target = %target,
            outcome = ?result.outcome,
            "advice executed"
        );
        if result.is_failed() {
            return Ok(AdviceResult::error(result.diagnostics));
        }
        Ok(AdviceResult::new(result.outcome, result.declaration))
    }

    pub fn introduce_method(
        &mut self,
        target_type: DeclId,
        template: &str,
        options: IntroduceOptions<MethodBuilder>,
    ) -> Result<AdviceResult<MethodDecl>> {
        let template = self.template(template)?;
        let (settings, build) = options.into_parts();
        let advice = IntroduceMethodAdvice::new(self.info(target_type), template, settings, build);
        self.run(advice)
    }

    pub fn introduce_operator(
        &mut self,
        target_type: DeclId,
        template: &str,
        signature: OperatorSignature,
        options: IntroduceOptions<MethodBuilder>,
    ) -> Result<AdviceResult<MethodDecl>> {
        let template = self.template(template)?;
        let (settings, build) = options.into_parts();
        let advice = IntroduceOperatorAdvice::new(self.info(target_type), template, signature, settings, build)?;
        self.run(advice)
    }

    /// Introduce a field copied from a template field
    pub fn introduce_field(
        &mut self,
        target_type: DeclId,
        template: &str,
        options: IntroduceOptions<FieldBuilder>,
    ) -> Result<AdviceResult<FieldDecl>> {
        let source = FieldSource::Template(self.template(template)?);
        let (settings, build) = options.into_parts();
        self.run(IntroduceFieldAdvice::new(self.info(target_type), source, settings, build))
    }

    /// Introduce a field declared programmatically
    pub fn introduce_field_of_type(
        &mut self,
        target_type: DeclId,
        name: &str,
        ty: TypeRef,
        options: IntroduceOptions<FieldBuilder>,
    ) -> Result<AdviceResult<FieldDecl>> {
        let source = FieldSource::Declared {
            name: name.to_string(),
            ty,
        };
        let (settings, build) = options.into_parts();
        self.run(IntroduceFieldAdvice::new(self.info(target_type), source, settings, build))
    }

    pub fn introduce_property(
        &mut self,
        target_type: DeclId,
        template: &str,
        options: IntroduceOptions<PropertyBuilder>,
    ) -> Result<AdviceResult<PropertyDecl>> {
        let source = PropertySource::Template(self.template(template)?);
        let (settings, build) = options.into_parts();
        let advice = IntroducePropertyAdvice::new(self.info(target_type), source, settings, build)?;
        self.run(advice)
    }

    /// Introduce a property whose accessors come from individual method templates
    pub fn introduce_property_with_accessors(
        &mut self,
        target_type: DeclId,
        name: &str,
        ty: TypeRef,
        getter: Option<&str>,
        setter: Option<&str>,
        options: IntroduceOptions<PropertyBuilder>,
    ) -> Result<AdviceResult<PropertyDecl>> {
        let source = PropertySource::Accessors {
            name: name.to_string(),
            ty,
            getter: self.optional_template(getter)?,
            setter: self.optional_template(setter)?,
        };
        let (settings, build) = options.into_parts();
        let advice = IntroducePropertyAdvice::new(self.info(target_type), source, settings, build)?;
        self.run(advice)
    }

    pub fn introduce_auto_property(
        &mut self,
        target_type: DeclId,
        name: &str,
        ty: TypeRef,
        options: IntroduceOptions<PropertyBuilder>,
    ) -> Result<AdviceResult<PropertyDecl>> {
        let source = PropertySource::Auto {
            name: name.to_string(),
            ty,
        };
        let (settings, build) = options.into_parts();
        let advice = IntroducePropertyAdvice::new(self.info(target_type), source, settings, build)?;
        self.run(advice)
    }

    pub fn introduce_indexer(
        &mut self,
        target_type: DeclId,
        ty: TypeRef,
        parameters: Vec<(String, TypeRef)>,
        getter: Option<&str>,
        setter: Option<&str>,
        options: IntroduceOptions<IndexerBuilder>,
    ) -> Result<AdviceResult<IndexerDecl>> {
        let getter = self.optional_template(getter)?;
        let setter = self.optional_template(setter)?;
        let (settings, build) = options.into_parts();
        let advice = IntroduceIndexerAdvice::new(self.info(target_type), ty, parameters, getter, setter, settings, build)?;
        self.run(advice)
    }

    pub fn introduce_event(
        &mut self,
        target_type: DeclId,
        template: &str,
        options: IntroduceOptions<EventBuilder>,
    ) -> Result<AdviceResult<EventDecl>> {
        let source = EventSource::Template(self.template(template)?);
        let (settings, build) = options.into_parts();
        self.run(IntroduceEventAdvice::new(self.info(target_type), source, settings, build))
    }

    pub fn introduce_event_field(
        &mut self,
        target_type: DeclId,
        name: &str,
        ty: TypeRef,
        options: IntroduceOptions<EventBuilder>,
    ) -> Result<AdviceResult<EventDecl>> {
        let source = EventSource::Field {
            name: name.to_string(),
            ty,
        };
        let (settings, build) = options.into_parts();
        self.run(IntroduceEventAdvice::new(self.info(target_type), source, settings, build))
    }

    pub fn introduce_constructor(
        &mut self,
        target_type: DeclId,
        template: &str,
        options: IntroduceOptions<ConstructorBuilder>,
    ) -> Result<AdviceResult<ConstructorDecl>> {
        let template = self.template(template)?;
        let (settings, build) = options.into_parts();
        self.run(IntroduceConstructorAdvice::new(self.info(target_type), template, settings, build))
    }

    pub fn introduce_finalizer(
        &mut self,
        target_type: DeclId,
        template: &str,
        strategy: OverrideStrategy,
        args: ObjectReader,
    ) -> Result<AdviceResult<MethodDecl>> {
        let template = self.template(template)?;
        let settings = IntroductionSettings {
            strategy,
            args,
            ..IntroductionSettings::default()
        };
        self.run(IntroduceFinalizerAdvice::new(self.info(target_type), template, settings))
    }

    /// Append a parameter to `constructor` and propagate it through the
    /// constructors chaining to it; `pull` decides each call site
    pub fn introduce_parameter(
        &mut self,
        constructor: DeclId,
        name: &str,
        ty: TypeRef,
        default_value: Option<Expression>,
        pull: Option<PullStrategy>,
    ) -> Result<AdviceResult<ParameterDecl>> {
        let advice = IntroduceParameterAdvice::new(self.info(constructor), name, ty, default_value, pull);
        self.run(advice)
    }

    pub fn override_method(
        &mut self,
        target: DeclId,
        templates: &MethodTemplates,
        args: ObjectReader,
    ) -> Result<AdviceResult<MethodDecl>> {
        let selector = templates.selector(
            self.state.compilation(),
            self.aspect_type()?,
            &self.state.config().templates,
        )?;
        self.run(OverrideMethodAdvice::new(self.info(target), selector, args))
    }

    /// Override the accessors of a field, property, indexer or event
    pub fn override_accessors(
        &mut self,
        target: DeclId,
        templates: &AccessorTemplates,
        args: ObjectReader,
    ) -> Result<AdviceResult<Declaration>> {
        let kind = self.state.compilation().require_declaration(target)?.kind();
        match kind {
            DeclarationKind::Field | DeclarationKind::Property => {
                let getter = GetterTemplates {
                    default: templates.getter.clone(),
                    ..GetterTemplates::default()
                };
                self.override_field_or_property(target, &getter, templates.setter.as_deref(), args)
                    .map(retype)
            }
            DeclarationKind::Indexer => self
                .override_indexer(target, templates.getter.as_deref(), templates.setter.as_deref(), args)
                .map(retype),
            DeclarationKind::Event => self
                .override_event(
                    target,
                    templates.adder.as_deref(),
                    templates.remover.as_deref(),
                    templates.raiser.as_deref(),
                    args,
                )
                .map(retype),
            _ => Err(Error::InvalidAdviceParameters(format!(
                "accessors of a {} cannot be overridden",
                kind
            ))),
        }
    }

    pub fn override_field_or_property(
        &mut self,
        target: DeclId,
        getter: &GetterTemplates,
        setter: Option<&str>,
        args: ObjectReader,
    ) -> Result<AdviceResult<PropertyDecl>> {
        let getter = getter.selector(
            self.state.compilation(),
            self.aspect_type()?,
            &self.state.config().templates,
        )?;
        let setter = self.optional_template(setter)?;
        let advice = OverrideFieldOrPropertyAdvice::new(self.info(target), getter, setter, args)?;
        self.run(advice)
    }

    pub fn override_indexer(
        &mut self,
        target: DeclId,
        getter: Option<&str>,
        setter: Option<&str>,
        args: ObjectReader,
    ) -> Result<AdviceResult<IndexerDecl>> {
        let getter = self.optional_template(getter)?;
        let setter = self.optional_template(setter)?;
        let advice = OverrideIndexerAdvice::new(self.info(target), getter, setter, args)?;
        self.run(advice)
    }

    pub fn override_event(
        &mut self,
        target: DeclId,
        adder: Option<&str>,
        remover: Option<&str>,
        raiser: Option<&str>,
        args: ObjectReader,
    ) -> Result<AdviceResult<EventDecl>> {
        let adder = self.optional_template(adder)?;
        let remover = self.optional_template(remover)?;
        let raiser = self.optional_template(raiser)?;
        let advice = OverrideEventAdvice::new(self.info(target), adder, remover, raiser, args)?;
        self.run(advice)
    }

    pub fn override_constructor(
        &mut self,
        target: DeclId,
        template: &str,
        args: ObjectReader,
    ) -> Result<AdviceResult<ConstructorDecl>> {
        let template = self.template(template)?;
        self.run(OverrideConstructorAdvice::new(self.info(target), template, args))
    }

    pub fn override_finalizer(
        &mut self,
        target: DeclId,
        template: &str,
        args: ObjectReader,
    ) -> Result<AdviceResult<MethodDecl>> {
        let template = self.template(template)?;
        self.run(OverrideFinalizerAdvice::new(self.info(target), template, args))
    }

    pub fn implement_interface(
        &mut self,
        target_type: DeclId,
        interface: TypeRef,
        options: ImplementInterfaceOptions,
    ) -> Result<AdviceResult<TypeDecl>> {
        let advice = ImplementInterfaceAdvice::new(
            self.info(target_type),
            interface,
            options.strategy,
            options.redirections,
            options.args,
        )?;
        self.run(advice)
    }

    /// Register a contract on a parameter, field, property or indexer
    ///
    /// Contracts of this aspect instance on the same member accumulate into
    /// one advice, implemented when the step completes.
    pub fn add_contract(
        &mut self,
        target: DeclId,
        template: &str,
        direction: ContractDirection,
        options: ContractOptions,
    ) -> Result<AdviceResult<Declaration>> {
        let _scope = self.state.non_user_code();
        if self.state.is_skipped(self.aspect.instance) {
            return Ok(AdviceResult::error(Vec::new()));
        }
        let template: TemplateMember<MethodDecl> = self.template(template)?;
        let compilation = self.state.compilation().clone();
        let partial = PartiallyBoundTemplateMethod::new(&compilation, &template, &options.args)?;
        let owner = contract_owner(&compilation, target)?;
        self.state
            .contract_advice(&self.aspect, owner)?
            .add_contract(&compilation, target, direction, partial, options.tags)?;
        Ok(AdviceResult::new(AdviceOutcome::Default, Some(target)))
    }

    /// Run a template before constructors of a type, or before one constructor
    pub fn add_initializer(
        &mut self,
        target: DeclId,
        template: &str,
        kind: InitializerTarget,
        args: ObjectReader,
    ) -> Result<AdviceResult<ConstructorDecl>> {
        let source = InitializerSource::Template(self.template(template)?);
        self.run(AddInitializerAdvice::new(self.info(target), kind, source, args))
    }

    pub fn add_initializer_statement(
        &mut self,
        target: DeclId,
        statement: &str,
        kind: InitializerTarget,
    ) -> Result<AdviceResult<ConstructorDecl>> {
        let source = InitializerSource::Statement(statement.to_string());
        self.run(AddInitializerAdvice::new(self.info(target), kind, source, ObjectReader::empty()))
    }

    pub fn introduce_attribute(
        &mut self,
        target: DeclId,
        attribute: AttributeDecl,
        strategy: OverrideStrategy,
    ) -> Result<AdviceResult<Declaration>> {
        self.run(IntroduceAttributeAdvice::new(self.info(target), attribute, strategy))
    }

    pub fn remove_attributes(&mut self, target: DeclId, attribute_type: &str) -> Result<AdviceResult<Declaration>> {
        self.run(RemoveAttributesAdvice::new(self.info(target), attribute_type))
    }

    pub fn add_annotation(&mut self, target: DeclId, annotation: Value) -> Result<AdviceResult<Declaration>> {
        self.run(AddAnnotationAdvice::new(self.info(target), annotation))
    }
}

fn retype<T>(result: AdviceResult<T>) -> AdviceResult<Declaration> {
    AdviceResult {
        outcome: result.outcome,
        declaration: result.declaration.map(|r| Ref::new(r.id())),
        diagnostics: result.diagnostics,
    }
}
