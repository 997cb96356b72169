//! Contract advice
//!
//! Contracts are validations attached to parameters, fields, properties and
//! indexers. All contracts an aspect instance adds to declarations of one
//! member accumulate into a single advice, implemented once when the step
//! completes, so the expander sees them together and in registration order.

use super::diagnostics as d;
use super::{
    ensure_first_implementation, Advice, AdviceContext, AdviceImplementationResult, AdviceInfo,
    AdviceKind, AdviceOutcome, Contract, ContractDirection,
};
use crate::builders::PropertyBuilder;
use crate::diagnostics::DiagnosticBag;
use crate::error::{Error, Result};
use crate::model::{Compilation, DeclId, Declaration, RefKind, Writeability};
use crate::object_reader::ObjectReader;
use crate::templates::PartiallyBoundTemplateMethod;
use crate::transformation::TransformationKind;
use tracing::debug;

/// Accumulated contracts of one member
#[derive(Debug)]
pub struct ContractAdvice {
    info: AdviceInfo,
    contracts: Vec<Contract>,
    implemented: bool,
}

/// Member owning the contracts of `target`
///
/// Parameters belong to their method, constructor or indexer; other
/// declarations own themselves.
pub fn contract_owner(compilation: &Compilation, target: DeclId) -> Result<DeclId> {
    match compilation.require_declaration(target)? {
        Declaration::Parameter(p) => Ok(p.owner),
        _ => Ok(target),
    }
}

/// Whether values flowing in `direction` exist for `declaration`
fn supports_direction(compilation: &Compilation, declaration: &Declaration, direction: ContractDirection) -> bool {
    let (input, output) = match declaration {
        Declaration::Parameter(p) if p.is_return() => {
            let returns_value = compilation
                .method(p.owner)
                .is_some_and(|m| !m.return_type.is_void());
            (false, returns_value)
        }
        Declaration::Parameter(p) => match p.ref_kind {
            RefKind::Out => (false, true),
            RefKind::Ref => (true, true),
            RefKind::None | RefKind::In | RefKind::RefReadOnly => (true, false),
        },
        Declaration::Field(f) => (f.writeability != Writeability::None, true),
        Declaration::Property(p) => (p.setter.is_some(), p.getter.is_some()),
        Declaration::Indexer(i) => (i.setter.is_some(), i.getter.is_some()),
        _ => (false, false),
    };
    match direction {
        ContractDirection::Input => input,
        ContractDirection::Output => output,
        ContractDirection::Both => input && output,
        ContractDirection::Default => input || output,
    }
}

impl ContractAdvice {
    /// Empty advice for the member `info.target`
    pub fn new(info: AdviceInfo) -> Self {
        Self {
            info,
            contracts: Vec::new(),
            implemented: false,
        }
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    /// Append a contract on `target`, a declaration owned by this advice's member
    ///
    /// A direction the declaration cannot carry is an authoring error reported
    /// as `CannotAddContractToDirection`.
    pub fn add_contract(
        &mut self,
        compilation: &Compilation,
        target: DeclId,
        direction: ContractDirection,
        template: PartiallyBoundTemplateMethod,
        tags: ObjectReader,
    ) -> Result<()> {
        if self.implemented {
            return Err(Error::InvalidOperation(format!(
                "contracts of {} were already implemented",
                compilation.display_name(self.info.target)
            )));
        }
        if contract_owner(compilation, target)? != self.info.target {
            return Err(Error::AssertionFailed(format!(
                "{} is not owned by {}",
                compilation.display_name(target),
                compilation.display_name(self.info.target)
            )));
        }

        let declaration = compilation.require_declaration(target)?;
        let resolved = direction.resolve(declaration);
        if !supports_direction(compilation, declaration, resolved) {
            let name = compilation.display_name(target);
            let direction_name = format!("{:?}", resolved);
            return Err(Error::Diagnostics(vec![d::CANNOT_ADD_CONTRACT_TO_DIRECTION
                .create(&[self.info.aspect.as_str(), direction_name.as_str(), name.as_str()])
                .on(name)]));
        }

        let order = self.contracts.len() as u32;
        debug!(
            target = %compilation.display_name(target),
            direction = ?resolved,
            order,
            "contract added"
        );
        self.contracts.push(Contract {
            target,
            direction: resolved,
            template,
            tags,
            order,
            aspect: self.info.aspect.clone(),
        });
        Ok(())
    }
}

impl Advice for ContractAdvice {
    fn kind(&self) -> AdviceKind {
        AdviceKind::AddContract
    }

    fn info(&self) -> &AdviceInfo {
        &self.info
    }

    fn initialize(&mut self, ctx: &mut AdviceContext<'_>, diagnostics: &mut DiagnosticBag) -> Result<()> {
        let compilation = ctx.compilation;
        let supported = matches!(
            compilation.declaration(self.info.target),
            Some(
                Declaration::Method(_)
                    | Declaration::Constructor(_)
                    | Declaration::Property(_)
                    | Declaration::Indexer(_)
                    | Declaration::Field(_)
            )
        );
        if !supported {
            diagnostics.report(self.info.wrong_target_kind(compilation, self.kind()));
        }
        Ok(())
    }

    fn implement(&mut self, ctx: &mut AdviceContext<'_>) -> Result<AdviceImplementationResult> {
        ensure_first_implementation(&mut self.implemented, &self.info)?;
        let compilation = ctx.compilation;
        let target = self.info.target;
        let contracts = std::mem::take(&mut self.contracts);

        let mut transformations = Vec::with_capacity(2);
        if let Some(Declaration::Field(_)) = compilation.declaration(target) {
            let property = PropertyBuilder::promote(compilation, target, ctx.ids, self.info.aspect.as_str())?.freeze();
            transformations.push(TransformationKind::PromoteField { field: target, property });
        }
        debug!(
            aspect = %self.info.aspect,
            member = %compilation.display_name(target),
            contracts = contracts.len(),
            "contracts implemented"
        );
        transformations.push(TransformationKind::Contract { target, contracts });
        Ok(AdviceImplementationResult::success(
            AdviceOutcome::Default,
            Some(target),
            transformations,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaverConfig;
    use crate::templates::TemplateMember;

    const MODEL: &str = r#"
types:
  - name: Aspects.NotNull
    members:
      - kind: method
        name: Validate
        attributes: [{type: Template}]
        parameters:
          - name: value
            type: dynamic
  - name: App.Account
    members:
      - kind: field
        name: owner
        type: string
      - kind: property
        name: Total
        type: int
        accessibility: public
        get: {}
      - kind: method
        name: TryGet
        returns: bool
        accessibility: public
        parameters:
          - name: key
            type: string
          - name: value
            type: string
            ref_kind: out
"#;

    fn member(compilation: &Compilation, name: &str) -> DeclId {
        let ty = compilation.find_type("App.Account").unwrap().id();
        compilation
            .members_of(ty)
            .find(|(_, d)| d.name() == name)
            .map(|(id, _)| id)
            .unwrap()
    }

    fn template(compilation: &Compilation) -> PartiallyBoundTemplateMethod {
        let ty = compilation.find_type("Aspects.NotNull").unwrap().id();
        let id = compilation
            .members_of(ty)
            .find(|(_, d)| d.name() == "Validate")
            .map(|(id, _)| id)
            .unwrap();
        let template = TemplateMember::from_declaration(compilation, id).unwrap();
        PartiallyBoundTemplateMethod::new(compilation, &template, &ObjectReader::empty()).unwrap()
    }

    #[test]
    fn test_contracts_accumulate_in_call_order() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let owner = member(&compilation, "owner");
        let mut advice = ContractAdvice::new(AdviceInfo::new("NotNull", None, owner));
        advice
            .add_contract(&compilation, owner, ContractDirection::Input, template(&compilation), ObjectReader::empty())
            .unwrap();
        advice
            .add_contract(&compilation, owner, ContractDirection::Output, template(&compilation), ObjectReader::empty())
            .unwrap();

        let config = WeaverConfig::default();
        let mut ids = compilation.id_allocator();
        let mut ctx = AdviceContext::new(&compilation, &mut ids, &config);
        let result = advice.implement(&mut ctx).unwrap();

        assert_eq!(result.transformations.len(), 2);
        assert!(matches!(&result.transformations[0], TransformationKind::PromoteField { .. }));
        let TransformationKind::Contract { contracts, .. } = &result.transformations[1] else {
            panic!("expected a contract transformation");
        };
        let directions: Vec<_> = contracts.iter().map(|c| (c.direction, c.order)).collect();
        assert_eq!(
            directions,
            vec![(ContractDirection::Input, 0), (ContractDirection::Output, 1)]
        );
        assert!(advice.implement(&mut ctx).is_err());
    }

    #[test]
    fn test_input_contract_on_get_only_property_is_rejected() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let total = member(&compilation, "Total");
        let mut advice = ContractAdvice::new(AdviceInfo::new("NotNull", None, total));
        let err = advice
            .add_contract(&compilation, total, ContractDirection::Input, template(&compilation), ObjectReader::empty())
            .unwrap_err();
        let Error::Diagnostics(diagnostics) = err else {
            panic!("expected diagnostics, got {err:?}");
        };
        assert_eq!(diagnostics[0].id, "LAMA0527");
    }

    #[test]
    fn test_out_parameter_defaults_to_output() {
        let compilation = Compilation::from_yaml(MODEL).unwrap();
        let method = member(&compilation, "TryGet");
        let value = compilation.parameters_of(method)[1];
        assert_eq!(contract_owner(&compilation, value).unwrap(), method);

        let mut advice = ContractAdvice::new(AdviceInfo::new("NotNull", None, method));
        advice
            .add_contract(&compilation, value, ContractDirection::Default, template(&compilation), ObjectReader::empty())
            .unwrap();
        assert_eq!(advice.contracts()[0].direction, ContractDirection::Output);
        assert!(advice
            .add_contract(&compilation, value, ContractDirection::Input, template(&compilation), ObjectReader::empty())
            .is_err());
    }
}
