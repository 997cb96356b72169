//! Error types for weaver
//!
//! Three tiers: authoring errors (a template or advice request that can never
//! be legal), diagnostics raised while initializing advice (the Rust side of a
//! `DiagnosticException`), and invariant violations.

use crate::diagnostics::Diagnostic;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Weaver errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid template signature: {0}")]
    InvalidTemplateSignature(String),

    #[error("Invalid advice parameters: {0}")]
    InvalidAdviceParameters(String),

    #[error("Argument out of range: {0}")]
    ArgumentOutOfRange(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Diagnostics carried by this error, if it is a diagnostic error
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }

    /// Whether the error comes from a broken template or advice request
    /// rather than a data-dependent conflict
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTemplateSignature(_)
                | Error::InvalidAdviceParameters(_)
                | Error::ArgumentOutOfRange(_)
                | Error::InvalidOperation(_)
                | Error::NotImplemented(_)
        )
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
