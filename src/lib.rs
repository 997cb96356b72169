// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # weaver: advice execution engine
//!
//! Compile-time aspect weaving over an immutable, versioned declaration model.
//!
//! ## Core Concept
//!
//! An **aspect** is applied to a target declaration and requests **advice**
//! through an [`AdviceFactory`]: introduce a member, override one, implement
//! an interface, add a contract, an initializer, a parameter or an attribute.
//! Each advice is checked against the current snapshot, resolves conflicts
//! with existing members according to its [`OverrideStrategy`], and produces
//! ordered [`Transformation`]s plus [`Diagnostic`]s.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weaver::{AspectsDocument, Compilation, WeaverConfig};
//!
//! let compilation = Compilation::from_yaml(r#"
//!   types:
//!     - name: Aspects.Logging
//!       members:
//!         - kind: method
//!           name: Wrap
//!           returns: dynamic
//!           attributes: [{type: Template}]
//!     - name: App.Orders
//!       members:
//!         - kind: method
//!           name: Place
//!           accessibility: public
//! "#)?;
//!
//! let aspects = AspectsDocument::from_yaml(r#"
//!   steps:
//!     - aspects:
//!         - name: Logging
//!           template_type: Aspects.Logging
//!           target: App.Orders::Place
//!           advice:
//!             - kind: override_method
//!               template: Wrap
//! "#)?;
//!
//! let result = aspects.into_pipeline(WeaverConfig::default()).execute(compilation)?;
//! for transformation in &result.transformations {
//!     println!("{}", transformation);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │  Pipeline ── step ──► StepState (working snapshot, counters) │
//! │                │                                             │
//! │                └──► Aspect::build_aspect(AdviceFactory)      │
//! │                          │                                   │
//! │                          ├──► Advice::initialize             │
//! │                          └──► Advice::implement              │
//! │                                   │                          │
//! │                                   └──► Transformations       │
//! │                                                              │
//! │  step completed ──► Compilation::apply ──► next snapshot     │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

// Foundations
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod object_reader;

// Declaration model
pub mod builders;
pub mod model;
pub mod transformation;

// Engine
pub mod advice;
pub mod factory;
pub mod templates;

// Driving
pub mod pipeline;
pub mod request;

// Re-exports
pub use advice::{
    Advice, AdviceKind, AdviceOutcome, AdviceResult, ContractDirection, IntroductionScope,
    InterfaceMemberOverrideStrategy, OverrideStrategy,
};
pub use config::WeaverConfig;
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticDescriptor, Severity};
pub use error::{Error, Result};
pub use factory::{
    AccessorTemplates, AdviceFactory, AspectInstance, ContractOptions, GetterTemplates,
    ImplementInterfaceOptions, IntroduceOptions, MethodTemplates, StepState,
};
pub use model::{Compilation, DeclId, Declaration, DeclarationKind, Ref, TypeRef};
pub use object_reader::ObjectReader;
pub use pipeline::{Aspect, Pipeline, PipelineResult, SkippedAspect};
pub use request::{AspectsDocument, DeclarationPath};
pub use transformation::{Transformation, TransformationKind, TransformationOrder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
