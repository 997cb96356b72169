//! Per-step execution state
//!
//! One `StepState` exists per pipeline step and is discarded when the step
//! completes. It owns the working snapshot advice reads from, the id
//! allocator, the enqueued transformations with their ordering counters, the
//! pending contract advices and the set of aspect instances skipped after a
//! failure.

use crate::advice::{
    Advice, AdviceContext, AdviceImplementationResult, AdviceInfo, AdviceKind, ContractAdvice,
};
use crate::config::WeaverConfig;
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::error::{Error, Result};
use crate::model::{Compilation, DeclId, IdAllocator};
use crate::transformation::{Transformation, TransformationKind, TransformationOrder};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

/// Identity of the aspect instance advice is created for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectInstance {
    /// Short name of the aspect type
    pub name: String,
    /// Position of the instance within the step
    pub instance: u32,
    /// Type declaring the templates
    pub template_type: Option<DeclId>,
    /// Declaration the aspect is applied to
    pub target: DeclId,
}

impl AspectInstance {
    pub fn advice_info(&self, target: DeclId) -> AdviceInfo {
        AdviceInfo::new(self.name.clone(), self.template_type, target)
    }
}

/// Marks the extent of a public factory call
///
/// While at least one scope is alive the factory is running its own code,
/// not the aspect's. Dropping the guard releases it, also during unwinding.
#[derive(Debug)]
pub struct NonUserCodeScope {
    depth: Rc<Cell<u32>>,
}

impl NonUserCodeScope {
    fn enter(depth: &Rc<Cell<u32>>) -> Self {
        depth.set(depth.get() + 1);
        Self {
            depth: Rc::clone(depth),
        }
    }
}

impl Drop for NonUserCodeScope {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Contracts of one aspect instance on one member
struct PendingContracts {
    aspect: AspectInstance,
    advice: ContractAdvice,
}

/// State restored when an aspect instance fails
struct Checkpoint {
    instance: u32,
    compilation: Compilation,
    transformations: usize,
    contracts: usize,
    diagnostics: usize,
}

/// What a completed step hands back to the pipeline
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Snapshot with every transformation of the step folded in
    pub compilation: Compilation,
    pub transformations: Vec<Transformation>,
    pub diagnostics: Vec<Diagnostic>,
    /// Aspect instances that failed, by name and instance
    pub skipped: Vec<(String, u32)>,
    /// Next value of the pipeline-wide ordering counter
    pub next_order: u32,
}

pub struct StepState {
    step: u32,
    config: Rc<WeaverConfig>,
    base: Compilation,
    compilation: Compilation,
    ids: IdAllocator,
    transformations: Vec<Transformation>,
    diagnostics: Vec<Diagnostic>,
    next_order: u32,
    type_counters: BTreeMap<Option<DeclId>, u32>,
    aspect_counters: BTreeMap<(Option<DeclId>, u32), u32>,
    contracts: Vec<PendingContracts>,
    contract_index: BTreeMap<(u32, DeclId), usize>,
    skipped: BTreeSet<u32>,
    skipped_names: Vec<(String, u32)>,
    non_user_code: Rc<Cell<u32>>,
    checkpoint: Option<Checkpoint>,
}

impl StepState {
    /// State for `step` reading from `compilation`; `first_order` continues
    /// the pipeline-wide counter of the previous step
    pub fn new(step: u32, compilation: Compilation, config: Rc<WeaverConfig>, first_order: u32) -> Self {
        let ids = compilation.id_allocator();
        Self {
            step,
            config,
            base: compilation.clone(),
            compilation,
            ids,
            transformations: Vec::new(),
            diagnostics: Vec::new(),
            next_order: first_order,
            type_counters: BTreeMap::new(),
            aspect_counters: BTreeMap::new(),
            contracts: Vec::new(),
            contract_index: BTreeMap::new(),
            skipped: BTreeSet::new(),
            skipped_names: Vec::new(),
            non_user_code: Rc::new(Cell::new(0)),
            checkpoint: None,
        }
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Working snapshot: the step input plus everything enqueued so far
    pub fn compilation(&self) -> &Compilation {
        &self.compilation
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn non_user_code(&self) -> NonUserCodeScope {
        NonUserCodeScope::enter(&self.non_user_code)
    }

    pub fn is_in_non_user_code(&self) -> bool {
        self.non_user_code.get() > 0
    }

    pub fn is_skipped(&self, instance: u32) -> bool {
        self.skipped.contains(&instance)
    }

    /// Remember where an aspect instance starts so it can be rolled back
    pub fn begin_aspect(&mut self, aspect: &AspectInstance) {
        trace!(aspect = %aspect.name, instance = aspect.instance, "aspect started");
        self.checkpoint = Some(Checkpoint {
            instance: aspect.instance,
            compilation: self.compilation.clone(),
            transformations: self.transformations.len(),
            contracts: self.contracts.len(),
            diagnostics: self.diagnostics.len(),
        });
    }

    pub fn end_aspect(&mut self, aspect: &AspectInstance) {
        trace!(aspect = %aspect.name, instance = aspect.instance, "aspect finished");
        self.checkpoint = None;
    }

    /// Skip the aspect instance for the rest of the step and report `diagnostics`
    ///
    /// With `pipeline.discard_failed_aspect_transformations` the instance's
    /// transformations and pending contracts are dropped.
    pub fn fail_aspect(&mut self, aspect: &AspectInstance, diagnostics: Vec<Diagnostic>) {
        warn!(
            aspect = %aspect.name,
            instance = aspect.instance,
            diagnostics = diagnostics.len(),
            "aspect failed, skipping it for the rest of the step"
        );
        if self.skipped.insert(aspect.instance) {
            self.skipped_names.push((aspect.name.clone(), aspect.instance));
        }

        if self.config.pipeline.discard_failed_aspect_transformations {
            if let Some(checkpoint) = self.checkpoint.take() {
                if checkpoint.instance == aspect.instance {
                    debug!(
                        discarded = self.transformations.len() - checkpoint.transformations,
                        "rolling back aspect transformations"
                    );
                    self.compilation = checkpoint.compilation;
                    self.transformations.truncate(checkpoint.transformations);
                    self.diagnostics.truncate(checkpoint.diagnostics);
                    for pending in self.contracts.drain(checkpoint.contracts..) {
                        self.contract_index
                            .remove(&(pending.aspect.instance, pending.advice.info().target));
                    }
                } else {
                    self.checkpoint = Some(checkpoint);
                }
            }
        }
        self.diagnostics.extend(diagnostics);
    }

    /// Initialize and implement `advice`, enqueueing what it produces
    ///
    /// Initialization diagnostics are returned as `Error::Diagnostics`; an
    /// implementation failure marks the aspect instance as failed and is
    /// returned as a failed result.
    pub fn execute<A: Advice>(&mut self, aspect: &AspectInstance, mut advice: A) -> Result<AdviceImplementationResult> {
        if self.is_skipped(aspect.instance) {
            debug!(aspect = %aspect.name, advice = %advice.kind(), "aspect already failed, advice ignored");
            return Ok(AdviceImplementationResult::failed([]));
        }
        let kind = advice.kind();
        let mut result = {
            let mut ctx = AdviceContext::new(&self.compilation, &mut self.ids, &self.config);
            let mut diagnostics = DiagnosticBag::new();
            advice.initialize(&mut ctx, &mut diagnostics)?;
            if diagnostics.has_errors() {
                return Err(Error::Diagnostics(diagnostics.into_vec()));
            }
            advice.implement(&mut ctx)?
        };

        if result.is_failed() {
            self.fail_aspect(aspect, result.diagnostics.clone());
            return Ok(result);
        }
        let transformations = std::mem::take(&mut result.transformations);
        self.enqueue(aspect, kind, transformations)?;
        Ok(result)
    }

    /// Stamp ordering counters and fold into the working snapshot
    fn enqueue(&mut self, aspect: &AspectInstance, advice: AdviceKind, kinds: Vec<TransformationKind>) -> Result<()> {
        let mut batch = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let target_type = kind.target_type(&self.compilation);
            let within_type = self.type_counters.entry(target_type).or_insert(0);
            let within_aspect = self
                .aspect_counters
                .entry((target_type, aspect.instance))
                .or_insert(0);
            let order = TransformationOrder {
                within_pipeline: self.next_order,
                within_pipeline_step_and_type: *within_type,
                within_pipeline_step_and_type_and_aspect_instance: *within_aspect,
            };
            self.next_order += 1;
            *within_type += 1;
            *within_aspect += 1;

            let transformation = Transformation {
                kind,
                advice,
                aspect: aspect.name.clone(),
                aspect_instance: aspect.instance,
                step: self.step,
                target_type,
                order,
            };
            debug!(transformation = %transformation, "enqueued");
            batch.push(transformation);
        }
        self.compilation = self.compilation.apply(&batch)?;
        self.transformations.extend(batch);
        Ok(())
    }

    /// Pending contract advice of `aspect` for `owner`, created and initialized
    /// on first use
    pub fn contract_advice(&mut self, aspect: &AspectInstance, owner: DeclId) -> Result<&mut ContractAdvice> {
        let key = (aspect.instance, owner);
        let index = match self.contract_index.get(&key) {
            Some(index) => *index,
            None => {
                let mut advice = ContractAdvice::new(aspect.advice_info(owner));
                let mut ctx = AdviceContext::new(&self.compilation, &mut self.ids, &self.config);
                let mut diagnostics = DiagnosticBag::new();
                advice.initialize(&mut ctx, &mut diagnostics)?;
                if diagnostics.has_errors() {
                    return Err(Error::Diagnostics(diagnostics.into_vec()));
                }
                trace!(aspect = %aspect.name, owner = %owner, "contract advice created");
                self.contracts.push(PendingContracts {
                    aspect: aspect.clone(),
                    advice,
                });
                self.contract_index.insert(key, self.contracts.len() - 1);
                self.contracts.len() - 1
            }
        };
        Ok(&mut self.contracts[index].advice)
    }

    /// Implement pending contracts in first-registration order and fold the
    /// whole step into a new snapshot
    pub fn complete(mut self) -> Result<StepOutcome> {
        let pending = std::mem::take(&mut self.contracts);
        self.contract_index.clear();
        for PendingContracts { aspect, mut advice } in pending {
            if self.is_skipped(aspect.instance) {
                continue;
            }
            let kind = advice.kind();
            let mut result = {
                let mut ctx = AdviceContext::new(&self.compilation, &mut self.ids, &self.config);
                advice.implement(&mut ctx)?
            };
            // The aspect has ended, so a failure here could not be rolled back
            if result.is_failed() {
                return Err(Error::AssertionFailed(format!(
                    "contracts of '{}' on {} failed after the aspect completed",
                    aspect.name,
                    self.compilation.display_name(advice.info().target)
                )));
            }
            self.enqueue(&aspect, kind, std::mem::take(&mut result.transformations))?;
        }

        let compilation = self.base.apply(&self.transformations)?;
        info!(
            step = self.step,
            transformations = self.transformations.len(),
            skipped = self.skipped_names.len(),
            revision = compilation.revision(),
            "step completed"
        );
        Ok(StepOutcome {
            compilation,
            transformations: self.transformations,
            diagnostics: self.diagnostics,
            skipped: self.skipped_names,
            next_order: self.next_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{AddAnnotationAdvice, AdviceOutcome};
    use serde_json::json;

    fn state() -> (StepState, AspectInstance) {
        let compilation = Compilation::from_yaml(
            r#"
types:
  - name: App.Order
  - name: App.Invoice
"#,
        )
        .unwrap();
        let target = compilation.find_type("App.Order").unwrap().id();
        let aspect = AspectInstance {
            name: "Audit".into(),
            instance: 0,
            template_type: None,
            target,
        };
        (StepState::new(0, compilation, Rc::new(WeaverConfig::default()), 0), aspect)
    }

    #[test]
    fn test_ordering_counters_are_nested() {
        let (mut state, aspect) = state();
        let invoice = state.compilation().find_type("App.Invoice").unwrap().id();
        for target in [aspect.target, invoice, aspect.target] {
            let advice = AddAnnotationAdvice::new(aspect.advice_info(target), json!({"audited": true}));
            let result = state.execute(&aspect, advice).unwrap();
            assert_eq!(result.outcome, AdviceOutcome::Default);
        }
        let orders: Vec<_> = state
            .transformations()
            .iter()
            .map(|t| (t.order.within_pipeline, t.order.within_pipeline_step_and_type))
            .collect();
        assert_eq!(orders, vec![(0, 0), (1, 0), (2, 1)]);
    }

    #[test]
    fn test_failed_aspect_is_rolled_back() {
        let (mut state, aspect) = state();
        state.begin_aspect(&aspect);
        let advice = AddAnnotationAdvice::new(aspect.advice_info(aspect.target), json!(1));
        state.execute(&aspect, advice).unwrap();
        assert_eq!(state.transformations().len(), 1);

        state.fail_aspect(&aspect, Vec::new());
        assert!(state.transformations().is_empty());
        assert!(state.is_skipped(aspect.instance));

        let advice = AddAnnotationAdvice::new(aspect.advice_info(aspect.target), json!(2));
        assert!(state.execute(&aspect, advice).unwrap().is_failed());
        let outcome = state.complete().unwrap();
        assert_eq!(outcome.skipped, vec![("Audit".to_string(), 0)]);
        assert!(outcome.transformations.is_empty());
    }

    #[test]
    fn test_non_user_code_scope_is_released() {
        let (state, _) = state();
        assert!(!state.is_in_non_user_code());
        {
            let _outer = state.non_user_code();
            let _inner = state.non_user_code();
            assert!(state.is_in_non_user_code());
        }
        assert!(!state.is_in_non_user_code());
    }
}
