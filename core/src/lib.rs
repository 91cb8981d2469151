//! Span-annotated data model shared by the requirements.txt parser and editor.

pub mod diagnostic;
pub mod span;
pub mod types;
pub mod version;

// Re-export commonly used types at crate root
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use span::{Delta, Rebase, Span, Spanned};
pub use types::{
    Comment, Extras, IncludeKind, IncludePayload, LineKind, LineRecord, Marker, NameOrigin,
    OptionLine, RequirementOption, RequirementPayload, RequirementSource, SpecifierClause,
    SpecifierToken, VcsKind,
};
pub use version::{Operator, Specifier, VersionError, names_match, normalize_name, parse_specifiers};
