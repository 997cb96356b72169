//! Diagnostics surface
//!
//! A diagnostic is created from a static [`DiagnosticDescriptor`] (id,
//! severity, format string) and a tuple of positional arguments. The catalog of
//! advice descriptors lives in [`crate::advice::diagnostics`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Static description of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    /// Message with positional placeholders `{0}`, `{1}`, ...
    pub format: &'static str,
}

impl DiagnosticDescriptor {
    /// Create a diagnostic, substituting positional arguments into the format
    pub fn create<S: AsRef<str>>(&self, args: &[S]) -> Diagnostic {
        let mut message = self.format.to_string();
        for (i, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), arg.as_ref());
        }

        Diagnostic {
            id: self.id.to_string(),
            name: self.name.to_string(),
            severity: self.severity,
            message,
            aspect: args.first().map(|a| a.as_ref().to_string()),
            target: None,
        }
    }
}

/// A reported diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub message: String,
    /// Short type name of the aspect that produced the diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,
    /// Display name of the declaration the diagnostic is reported on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Diagnostic {
    /// Attach the declaration the diagnostic is reported on
    pub fn on(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.id, self.message)?;
        if let Some(target) = &self.target {
            write!(f, " [{}]", target)?;
        }
        Ok(())
    }
}

/// Accumulates diagnostics during a phase
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Convert to an error if any diagnostic has error severity
    pub fn into_result(self) -> crate::Result<Vec<Diagnostic>> {
        if self.has_errors() {
            Err(crate::Error::Diagnostics(self.diagnostics))
        } else {
            Ok(self.diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: DiagnosticDescriptor = DiagnosticDescriptor {
        id: "LAMA9999",
        name: "Sample",
        severity: Severity::Error,
        format: "The aspect '{0}' cannot touch '{1}' twice ('{1}').",
    };

    #[test]
    fn test_positional_substitution() {
        let d = SAMPLE.create(&["Logging", "Foo.Bar"]);
        assert_eq!(
            d.message,
            "The aspect 'Logging' cannot touch 'Foo.Bar' twice ('Foo.Bar')."
        );
        assert_eq!(d.aspect.as_deref(), Some("Logging"));
        assert!(d.is_error());
    }

    #[test]
    fn test_bag_into_result() {
        let mut bag = DiagnosticBag::new();
        assert!(bag.clone().into_result().is_ok());

        bag.report(SAMPLE.create(&["A", "B"]));
        let err = bag.into_result().unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
        assert!(err.to_string().contains("LAMA9999"));
    }
}
