//! Multi-step pipeline
//!
//! Aspects run in steps. Every aspect of a step reads the snapshot produced
//! by the previous step plus what earlier aspects of the same step enqueued;
//! when the step completes its transformations are folded into the snapshot
//! the next step starts from. An aspect whose advice fails is skipped for the
//! rest of its step, and sibling aspects continue.

use crate::config::WeaverConfig;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::factory::{AdviceFactory, AspectInstance, StepState};
use crate::model::{Compilation, DeclId};
use crate::transformation::Transformation;
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info, info_span, warn};

/// A rule bundle applied to one target declaration
pub trait Aspect {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Type declaring the aspect's templates
    fn template_type(&self, compilation: &Compilation) -> Result<Option<DeclId>>;

    /// Declaration the aspect is applied to
    fn target(&self, compilation: &Compilation) -> Result<DeclId>;

    /// Request advice through `factory`
    ///
    /// `Error::Diagnostics` skips the aspect; any other error aborts the run.
    fn build_aspect(&self, factory: &mut AdviceFactory<'_>) -> Result<()>;
}

/// Aspect instances that failed in a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAspect {
    pub step: u32,
    pub aspect: String,
    pub instance: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub compilation: Compilation,
    pub transformations: Vec<Transformation>,
    pub diagnostics: Vec<Diagnostic>,
    pub skipped: Vec<SkippedAspect>,
}

impl PipelineResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Vec<Box<dyn Aspect>>>,
    config: Rc<WeaverConfig>,
}

impl Pipeline {
    pub fn new(config: WeaverConfig) -> Self {
        Self {
            steps: Vec::new(),
            config: Rc::new(config),
        }
    }

    /// Append a step; its aspects run in the given order
    pub fn add_step(&mut self, aspects: Vec<Box<dyn Aspect>>) -> &mut Self {
        self.steps.push(aspects);
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn execute(&self, compilation: Compilation) -> Result<PipelineResult> {
        let mut compilation = compilation;
        let mut transformations = Vec::new();
        let mut diagnostics = Vec::new();
        let mut skipped = Vec::new();
        let mut next_order = 0;

        for (index, aspects) in self.steps.iter().enumerate() {
            let step = index as u32;
            let span = info_span!("step", step);
            let _enter = span.enter();

            let mut state = StepState::new(step, compilation, Rc::clone(&self.config), next_order);
            for (instance, aspect) in aspects.iter().enumerate() {
                run_aspect(&mut state, aspect.as_ref(), instance as u32)?;
            }

            let outcome = state.complete()?;
            skipped.extend(outcome.skipped.into_iter().map(|(aspect, instance)| SkippedAspect {
                step,
                aspect,
                instance,
            }));
            transformations.extend(outcome.transformations);
            diagnostics.extend(outcome.diagnostics);
            next_order = outcome.next_order;
            compilation = outcome.compilation;
        }

        info!(
            steps = self.steps.len(),
            transformations = transformations.len(),
            diagnostics = diagnostics.len(),
            skipped = skipped.len(),
            "pipeline completed"
        );
        Ok(PipelineResult {
            compilation,
            transformations,
            diagnostics,
            skipped,
        })
    }
}

fn run_aspect(state: &mut StepState, aspect: &dyn Aspect, instance: u32) -> Result<()> {
    let compilation = state.compilation();
    let instance = AspectInstance {
        name: aspect.name().to_string(),
        instance,
        template_type: aspect.template_type(compilation)?,
        target: aspect.target(compilation)?,
    };
    debug!(
        aspect = %instance.name,
        target = %compilation.display_name(instance.target),
        "building aspect"
    );

    state.begin_aspect(&instance);
    let built = {
        let mut factory = AdviceFactory::new(state, instance.clone());
        aspect.build_aspect(&mut factory)
    };
    match built {
        Ok(()) => {}
        Err(Error::Diagnostics(diagnostics)) => {
            warn!(aspect = %instance.name, count = diagnostics.len(), "aspect reported errors");
            state.fail_aspect(&instance, diagnostics);
        }
        Err(other) => return Err(other),
    }
    state.end_aspect(&instance);
    Ok(())
}
