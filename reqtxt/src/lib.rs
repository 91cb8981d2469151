//! Position-aware parsing and editing of pip requirements files.
//!
//! [`parse`] turns text into a [`Document`] of line records whose spans cover
//! the input exactly. [`DocumentEditor`] changes single fields in place, and
//! [`render`] writes the document back with everything else untouched.

pub mod cli;
pub mod config;
pub mod document;
pub mod editor;
pub mod env;
pub mod output;
pub mod parsers;
pub mod resolver;
pub mod serializer;

pub use config::{Config, ConfigError, ResolveConfig};
pub use document::{CoverageError, Document};
pub use editor::{DocumentEditor, EditError, Target};
pub use env::{ExpandError, OnMissing, env_lookup, expand};
pub use parsers::parse;
pub use resolver::{
    FileLoader, FsLoader, Precedence, Resolution, ResolveError, ResolveOptions,
    ResolvedRequirement, Resolver, resolve,
};
pub use serializer::{render, write_to};

pub use reqtxt_core::{
    Diagnostic, DiagnosticKind, IncludeKind, LineKind, LineRecord, RequirementPayload,
    RequirementSource, Severity, Span, Specifier,
};
