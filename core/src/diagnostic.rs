use crate::span::{Delta, Rebase, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a parse diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What went wrong on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A quote was opened and never closed before the line ended
    UnterminatedQuote,
    /// A `\` continuation at the very end of the file
    DanglingContinuation,
    /// One specifier token could not be read; the rest of the line was
    MalformedSpecifier,
    /// The line is not a requirement at all and was kept as a comment
    InvalidRequirement,
    /// An option flag pip does not know
    UnknownOption,
    /// An option that needs a value was given none
    MissingOptionValue,
    /// A `--hash` value that is not `algorithm:hexdigest`
    InvalidHash,
    /// A URL or path requirement with no way to tell the package name
    UnnamedReference,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnterminatedQuote
            | DiagnosticKind::DanglingContinuation
            | DiagnosticKind::MalformedSpecifier
            | DiagnosticKind::InvalidHash => Severity::Warning,
            DiagnosticKind::InvalidRequirement
            | DiagnosticKind::UnknownOption
            | DiagnosticKind::MissingOptionValue
            | DiagnosticKind::UnnamedReference => Severity::Error,
        }
    }
}

/// A non-fatal problem attached to a line record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Absolute byte span in the document text
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            span,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Rebase for Diagnostic {
    fn rebase(&mut self, delta: Delta) {
        self.span.rebase(delta);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (at {})", self.severity, self.message, self.span)
    }
}
