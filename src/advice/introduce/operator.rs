use super::{
    apply_template, implement_introduction, require_target_type, take_draft, validate_draft,
    BindingScope, BuildHook, IntroductionSettings, OverrideBinder,
};
use crate::advice::{Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind, IntroductionScope};
use crate::builders::MethodBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{Accessibility, DeclId, DeclarationKind, MethodDecl, OperatorKind, TypeRef};
use crate::templates::{PartiallyBoundTemplateMethod, TemplateMember};
use crate::transformation::OverrideTemplates;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Operator to introduce: kind, operand types and result type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperatorSignature {
    pub kind: OperatorKind,
    pub left: TypeRef,
    #[serde(default)]
    pub right: Option<TypeRef>,
    pub result: TypeRef,
}

impl OperatorSignature {
    pub fn operands(&self) -> Vec<TypeRef> {
        std::iter::once(self.left.clone())
            .chain(self.right.clone())
            .collect()
    }

    /// Operand count must match the operator arity
    pub fn validate(&self) -> Result<()> {
        if self.kind == OperatorKind::None {
            return Err(Error::InvalidAdviceParameters(
                "an operator kind is required".into(),
            ));
        }
        let operands = self.operands().len();
        if operands != self.kind.arity() {
            return Err(Error::InvalidAdviceParameters(format!(
                "the operator {:?} takes {} operand(s) but {} were given",
                self.kind,
                self.kind.arity(),
                operands
            )));
        }
        Ok(())
    }
}

pub struct IntroduceOperatorAdvice {
    info: AdviceInfo,
    template: TemplateMember<MethodDecl>,
    signature: OperatorSignature,
    settings: IntroductionSettings,
    build: Option<BuildHook<MethodBuilder>>,
    partial: Option<PartiallyBoundTemplateMethod>,
    draft: Option<MethodBuilder>,
}

impl IntroduceOperatorAdvice {
    pub fn new(
        info: AdviceInfo,
        template: TemplateMember<MethodDecl>,
        signature: OperatorSignature,
        settings: IntroductionSettings,
        build: Option<BuildHook<MethodBuilder>>,
    ) -> Result<Self> {
        signature.validate()?;
        Ok(Self {
            info,
            template,
            signature,
            settings,
            build,
            partial: None,
            draft: None,
        })
    }
}

impl Advice for IntroduceOperatorAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::IntroduceOperator
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let Some(target) = require_target_type(compilation, &self.info, self.kind(), diagnostics) else {
            return Ok(());
        };
        let method = compilation.require(self.template.declaration)?;
        let partial = PartiallyBoundTemplateMethod::new(compilation, &self.template, &self.settings.args)?;
        let operands = self.signature.operands();
        if partial.run_time_parameters.len() != operands.len() {
            return Err(Error::InvalidTemplateSignature(format!(
                "the template '{}' must have exactly {} run-time parameter(s) to introduce {:?}",
                self.template.name,
                operands.len(),
                self.signature.kind
            )));
        }

        let mut builder = MethodBuilder::new(
            ctx.ids,
            self.info.target,
            self.signature.kind.metadata_name(),
            self.info.aspect.as_str(),
        );
        // Operators are always static and public
        let settings = IntroductionSettings {
            scope: IntroductionScope::Static,
            ..self.settings.clone()
        };
        apply_template(&mut builder.base, &self.template, Some(&method.member), &settings, target, ctx.config);
        builder.base.accessibility = Accessibility::Public;
        builder.method_kind = self.signature.kind.method_kind();
        builder.operator_kind = self.signature.kind;
        builder.return_type = self.signature.result.clone();
        for (p, ty) in partial.run_time_parameters.iter().zip(operands) {
            builder.add_parameter(ctx.ids, p.name.clone(), ty);
        }
        if let Some(build) = &self.build {
            build(&mut builder);
        }

        validate_draft(compilation, &self.info, DeclarationKind::Method, &builder.base, target, diagnostics);
        self.partial = Some(partial);
        self.draft = Some(builder);
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        let builder = take_draft(&mut self.draft, &self.info)?;
        let partial = take_draft(&mut self.partial, &self.info)?;
        let existing = ctx.compilation.find_closest_visible_method(
            builder.base.declaring_type,
            &builder.base.name,
            &builder.parameter_types(),
        );

        let template = &self.template;
        let args = &self.settings.args;
        let bind = move |scope: &BindingScope<'_>, id: DeclId| -> Result<OverrideTemplates> {
            let template = if scope.is_introduced(id) {
                partial.bind_to(scope.compilation(), &scope.parameter_names(id))?
            } else {
                scope.bind(template, id, &[], args)?
            };
            Ok(OverrideTemplates::Method { template })
        };

        implement_introduction(ctx, &self.info, builder, existing, self.settings.strategy, false, Some(&bind as OverrideBinder<'_>))
    }
}
