use crate::diagnostic::Diagnostic;
use crate::span::{Delta, Rebase, Span, Spanned};
use crate::version::{Specifier, normalize_name};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One logical line of a requirements file
///
/// `raw` holds the exact source text including continuation sequences and the
/// line terminator, so concatenating every record's `raw` rebuilds the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub kind: LineKind,
    pub raw: String,
    /// Absolute span of `raw` in the document text
    pub span: Span,
    pub diagnostics: Vec<Diagnostic>,
}

impl LineRecord {
    pub fn new(kind: LineKind, raw: impl Into<String>, start: usize) -> Self {
        let raw = raw.into();
        let span = Span::new(start, start + raw.len());
        Self {
            kind,
            raw,
            span,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn requirement(&self) -> Option<&RequirementPayload> {
        match &self.kind {
            LineKind::Requirement(req) => Some(req),
            _ => None,
        }
    }

    pub fn include(&self) -> Option<&IncludePayload> {
        match &self.kind {
            LineKind::Include(include) => Some(include),
            _ => None,
        }
    }

    pub fn option(&self) -> Option<&OptionLine> {
        match &self.kind {
            LineKind::Option(option) => Some(option),
            _ => None,
        }
    }

    /// The line terminator this record ends with (`"\r\n"`, `"\n"` or `""`)
    pub fn terminator(&self) -> &str {
        if self.raw.ends_with("\r\n") {
            "\r\n"
        } else if self.raw.ends_with('\n') {
            "\n"
        } else {
            ""
        }
    }

    /// Raw text without the line terminator
    pub fn content(&self) -> &str {
        &self.raw[..self.raw.len() - self.terminator().len()]
    }

    /// Source text covered by an absolute span inside this record
    pub fn text(&self, span: Span) -> Option<&str> {
        if !self.span.encloses(span) {
            return None;
        }
        self.raw.get(span.relative_to(self.span.start))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

impl Rebase for LineRecord {
    fn rebase(&mut self, delta: Delta) {
        self.span.rebase(delta);
        self.kind.rebase(delta);
        self.diagnostics.rebase(delta);
    }
}

/// Classification of a line, with its parsed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LineKind {
    Blank,
    Comment,
    Option(OptionLine),
    Include(IncludePayload),
    Requirement(Box<RequirementPayload>),
}

impl LineKind {
    pub fn label(&self) -> &'static str {
        match self {
            LineKind::Blank => "blank",
            LineKind::Comment => "comment",
            LineKind::Option(_) => "option",
            LineKind::Include(_) => "include",
            LineKind::Requirement(_) => "requirement",
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Rebase for LineKind {
    fn rebase(&mut self, delta: Delta) {
        match self {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::Option(option) => option.rebase(delta),
            LineKind::Include(include) => include.rebase(delta),
            LineKind::Requirement(req) => req.rebase(delta),
        }
    }
}

/// Trailing `# ...` comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// From the `#` to the last non-blank character
    pub span: Span,
    /// Text after the `#` and any following blanks
    pub text: Spanned<String>,
}

impl Rebase for Comment {
    fn rebase(&mut self, delta: Delta) {
        self.span.rebase(delta);
        self.text.rebase(delta);
    }
}

/// `[extra1,extra2]` group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    /// Including the brackets
    pub span: Span,
    pub items: Vec<Spanned<String>>,
}

impl Extras {
    pub fn contains(&self, extra: &str) -> bool {
        self.position(extra).is_some()
    }

    pub fn position(&self, extra: &str) -> Option<usize> {
        let wanted = normalize_name(extra);
        self.items
            .iter()
            .position(|item| normalize_name(&item.value) == wanted)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Spanned::as_str)
    }
}

impl Rebase for Extras {
    fn rebase(&mut self, delta: Delta) {
        self.span.rebase(delta);
        self.items.rebase(delta);
    }
}

/// A single entry of a specifier clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecifierToken {
    Valid(Specifier),
    /// Kept verbatim so the line still renders as written
    Malformed(String),
}

impl fmt::Display for SpecifierToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecifierToken::Valid(spec) => write!(f, "{spec}"),
            SpecifierToken::Malformed(text) => f.write_str(text),
        }
    }
}

/// Comma separated specifiers such as `>=1.0,<2.0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecifierClause {
    /// From the first operator to the end of the last version
    pub span: Span,
    /// The parentheses around the list in the `name (>=1.0)` form
    pub enclosure: Option<Span>,
    pub items: Vec<Spanned<SpecifierToken>>,
}

impl SpecifierClause {
    /// Well-formed specifiers in written order
    pub fn specifiers(&self) -> impl Iterator<Item = &Specifier> {
        self.items.iter().filter_map(|item| match &item.value {
            SpecifierToken::Valid(spec) => Some(spec),
            SpecifierToken::Malformed(_) => None,
        })
    }

    pub fn is_well_formed(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item.value, SpecifierToken::Valid(_)))
    }

    /// Span of everything the clause occupies, parentheses included
    pub fn outer_span(&self) -> Span {
        self.enclosure.unwrap_or(self.span)
    }
}

impl fmt::Display for SpecifierClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, item) in self.items.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", item.value)?;
        }
        Ok(())
    }
}

impl Rebase for SpecifierClause {
    fn rebase(&mut self, delta: Delta) {
        self.span.rebase(delta);
        self.enclosure.rebase(delta);
        self.items.rebase(delta);
    }
}

/// Environment marker after `;`, stored verbatim and never evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub separator: Span,
    pub expression: Spanned<String>,
}

impl Marker {
    pub fn span(&self) -> Span {
        self.separator.cover(self.expression.span)
    }
}

impl Rebase for Marker {
    fn rebase(&mut self, delta: Delta) {
        self.separator.rebase(delta);
        self.expression.rebase(delta);
    }
}

/// Version control system of a `vcs+url` requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Hg,
    Svn,
    Bzr,
}

impl VcsKind {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "git" => Some(VcsKind::Git),
            "hg" => Some(VcsKind::Hg),
            "svn" => Some(VcsKind::Svn),
            "bzr" => Some(VcsKind::Bzr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Hg => "hg",
            VcsKind::Svn => "svn",
            VcsKind::Bzr => "bzr",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a requirement is installed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequirementSource {
    /// Looked up by name on a package index
    Registry,
    Url { url: Spanned<String> },
    Vcs { vcs: VcsKind, url: Spanned<String> },
    Path { path: Spanned<String> },
}

impl RequirementSource {
    /// The URL or path as written, for direct references
    pub fn location(&self) -> Option<&Spanned<String>> {
        match self {
            RequirementSource::Registry => None,
            RequirementSource::Url { url } | RequirementSource::Vcs { url, .. } => Some(url),
            RequirementSource::Path { path } => Some(path),
        }
    }
}

impl Rebase for RequirementSource {
    fn rebase(&mut self, delta: Delta) {
        match self {
            RequirementSource::Registry => {}
            RequirementSource::Url { url } | RequirementSource::Vcs { url, .. } => {
                url.rebase(delta);
            }
            RequirementSource::Path { path } => path.rebase(delta),
        }
    }
}

/// How the package name of a requirement was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameOrigin {
    /// Written out, as in `flask==2.0` or `flask @ https://...`
    Declared,
    /// From a `#egg=name` URL fragment
    EggFragment,
    /// Derived from a wheel/sdist filename, repository or directory name
    Inferred,
}

/// A per-requirement option other than `--hash`, e.g. `--global-option`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementOption {
    /// Option name without leading dashes
    pub name: Spanned<String>,
    pub value: Option<Spanned<String>>,
    /// Whole option token(s)
    pub span: Span,
}

impl Rebase for RequirementOption {
    fn rebase(&mut self, delta: Delta) {
        self.name.rebase(delta);
        self.value.rebase(delta);
        self.span.rebase(delta);
    }
}

/// Parsed requirement line with the span of every field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementPayload {
    /// Package name in original casing; never empty
    pub name: Spanned<String>,
    pub name_origin: NameOrigin,
    pub source: RequirementSource,
    /// The `-e`/`--editable` flag
    pub editable: Option<Span>,
    pub extras: Option<Extras>,
    pub specifiers: Option<SpecifierClause>,
    pub marker: Option<Marker>,
    /// Hash values (`sha256:...`); spans cover the whole `--hash=...` token
    pub hashes: Vec<Spanned<String>>,
    pub options: Vec<RequirementOption>,
    pub comment: Option<Comment>,
    /// The requirement proper, without comment or surrounding blanks
    pub body: Span,
}

impl RequirementPayload {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name.value)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.normalized_name() == normalize_name(name)
    }

    pub fn is_direct_reference(&self) -> bool {
        !matches!(self.source, RequirementSource::Registry)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.is_some()
    }

    pub fn extra_names(&self) -> Vec<&str> {
        self.extras
            .as_ref()
            .map(|extras| extras.names().collect())
            .unwrap_or_default()
    }

    pub fn hash_values(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(Spanned::as_str)
    }

    /// Spans of the distinct fields that make up the body, in source order
    ///
    /// Derived names are nested inside the location they came from and are
    /// left out so the list never overlaps.
    pub fn field_spans(&self) -> Vec<Span> {
        let mut spans = Vec::new();
        spans.extend(self.editable);
        if self.name_origin == NameOrigin::Declared {
            spans.push(self.name.span);
        }
        if let Some(extras) = &self.extras {
            spans.push(extras.span);
        }
        if let Some(location) = self.source.location() {
            spans.push(location.span);
        }
        if let Some(clause) = &self.specifiers {
            spans.push(clause.outer_span());
        }
        if let Some(marker) = &self.marker {
            spans.push(marker.span());
        }
        spans.extend(self.hashes.iter().map(|hash| hash.span));
        spans.extend(self.options.iter().map(|option| option.span));
        spans.sort_by_key(|span| span.start);
        spans
    }

    /// End of the last field that finishes at or before `offset`
    pub fn field_end_before(&self, offset: usize) -> Option<usize> {
        self.field_spans()
            .into_iter()
            .filter(|span| span.end <= offset)
            .map(|span| span.end)
            .max()
    }
}

impl Rebase for RequirementPayload {
    fn rebase(&mut self, delta: Delta) {
        self.name.rebase(delta);
        self.source.rebase(delta);
        self.editable.rebase(delta);
        self.extras.rebase(delta);
        self.specifiers.rebase(delta);
        self.marker.rebase(delta);
        self.hashes.rebase(delta);
        self.options.rebase(delta);
        self.comment.rebase(delta);
        self.body.rebase(delta);
    }
}

/// Kind of file an include directive pulls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    /// `-r` / `--requirement`
    Reference,
    /// `-c` / `--constraint`
    Constraint,
}

impl fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeKind::Reference => write!(f, "requirement"),
            IncludeKind::Constraint => write!(f, "constraint"),
        }
    }
}

/// `-r other.txt` or `-c constraints.txt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludePayload {
    pub directive: IncludeKind,
    /// The flag as written (`-r`, `--requirement`, ...)
    pub flag: Spanned<String>,
    /// Target path, possibly holding unexpanded `${VAR}` placeholders
    pub target: Spanned<String>,
    pub comment: Option<Comment>,
}

impl Rebase for IncludePayload {
    fn rebase(&mut self, delta: Delta) {
        self.flag.rebase(delta);
        self.target.rebase(delta);
        self.comment.rebase(delta);
    }
}

/// A global pip option line such as `--index-url https://...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionLine {
    /// The flag as written (`-i`, `--index-url`, ...)
    pub flag: Spanned<String>,
    /// Canonical long name without dashes, e.g. `index-url`
    pub name: String,
    pub value: Option<Spanned<String>>,
    pub comment: Option<Comment>,
}

impl Rebase for OptionLine {
    fn rebase(&mut self, delta: Delta) {
        self.flag.rebase(delta);
        self.value.rebase(delta);
        self.comment.rebase(delta);
    }
}
