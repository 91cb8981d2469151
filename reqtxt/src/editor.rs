use crate::document::Document;
use crate::parsers::{self, requirement};
use reqtxt_core::{
    Delta, DiagnosticKind, LineRecord, NameOrigin, Rebase, RequirementPayload, Span,
    SpecifierToken, parse_specifiers,
};
use thiserror::Error;

/// Why an edit was rejected; the document is left untouched in every case
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Cannot {operation} record {index}: {reason}")]
    InvalidOperation {
        index: usize,
        operation: &'static str,
        reason: String,
    },

    #[error("Record index {index} is out of range (document has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Package {0} is already listed")]
    DuplicateRequirement(String),

    #[error("Extra {extra} is not set on {package}")]
    ExtraNotFound { package: String, extra: String },

    #[error("Hash {hash} is not set on {package}")]
    HashNotFound { package: String, hash: String },
}

/// Which record an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Index(usize),
    /// First requirement whose normalized name matches
    Name(&'a str),
}

impl From<usize> for Target<'_> {
    fn from(index: usize) -> Self {
        Target::Index(index)
    }
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(name: &'a str) -> Self {
        Target::Name(name)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(name: &'a String) -> Self {
        Target::Name(name)
    }
}

/// Replace the text under `span` with `text`
struct Splice {
    span: Span,
    text: String,
}

impl Splice {
    fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::empty(at), text)
    }

    fn remove(span: Span) -> Self {
        Self::replace(span, String::new())
    }
}

/// The requirement field an edit is allowed to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Specifiers,
    Extras,
    Comment,
    Hashes,
    Marker,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Specifiers => "specifiers",
            Field::Extras => "extra",
            Field::Comment => "comment",
            Field::Hashes => "hash",
            Field::Marker => "marker",
        }
    }
}

/// Span-free values of a requirement's fields
#[derive(Debug, PartialEq)]
struct Fields {
    editable: bool,
    source: Option<String>,
    extras: Option<Vec<String>>,
    specifiers: Option<Vec<String>>,
    marker: Option<String>,
    hashes: Vec<String>,
    options: Vec<(String, Option<String>)>,
    comment: Option<String>,
}

impl Fields {
    /// Every field of `req` except `edited`
    fn besides(req: &RequirementPayload, edited: Field) -> Self {
        let mut fields = Self {
            editable: req.is_editable(),
            source: req.source.location().map(|location| location.value.clone()),
            extras: req
                .extras
                .as_ref()
                .map(|extras| extras.names().map(str::to_string).collect()),
            specifiers: req
                .specifiers
                .as_ref()
                .map(|clause| clause.items.iter().map(|item| item.value.to_string()).collect()),
            marker: req.marker.as_ref().map(|m| m.expression.value.clone()),
            hashes: req.hash_values().map(str::to_string).collect(),
            options: req
                .options
                .iter()
                .map(|opt| (opt.name.value.clone(), opt.value.as_ref().map(|v| v.value.clone())))
                .collect(),
            comment: req.comment.as_ref().map(|c| c.text.value.clone()),
        };

        match edited {
            Field::Specifiers => fields.specifiers = None,
            Field::Extras => fields.extras = None,
            Field::Comment => fields.comment = None,
            Field::Hashes => fields.hashes.clear(),
            Field::Marker => fields.marker = None,
        }
        fields
    }
}

/// Quote and continuation problems found while splitting lines
fn lexer_issues(record: &LineRecord) -> usize {
    record
        .diagnostics
        .iter()
        .filter(|d| {
            matches!(
                d.kind,
                DiagnosticKind::DanglingContinuation | DiagnosticKind::UnterminatedQuote
            )
        })
        .count()
}

/// Rebase every record from `index` on
fn shift_from(doc: &mut Document, index: usize, delta: Delta) {
    if delta.is_zero() {
        return;
    }
    for record in doc.records_from_mut(index) {
        record.rebase(delta);
    }
}

/// A requirement record found for an edit
struct Located<'d> {
    index: usize,
    record: &'d LineRecord,
    req: &'d RequirementPayload,
}

fn single_line<'v>(field: &'static str, value: &'v str) -> Result<&'v str, EditError> {
    if value.contains(['\n', '\r']) {
        return Err(EditError::InvalidValue {
            field,
            reason: "must fit on one line".to_string(),
        });
    }
    let value = value.trim();
    if value.is_empty() {
        return Err(EditError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

/// Where specifiers go when a requirement has none
fn version_anchor(req: &RequirementPayload) -> usize {
    req.extras
        .as_ref()
        .map_or(req.name.span.end, |extras| extras.span.end)
}

/// End of the name, extras, location and specifier fields
fn marker_anchor(req: &RequirementPayload) -> usize {
    let mut end = req.name.span.end;
    if let Some(extras) = &req.extras {
        end = end.max(extras.span.end);
    }
    if let Some(location) = req.source.location() {
        end = end.max(location.span.end);
    }
    if let Some(clause) = &req.specifiers {
        end = end.max(clause.outer_span().end);
    }
    end
}

/// Structural edits on a parsed document
///
/// Each edit rewrites only the bytes of the field it changes, re-reads the
/// affected record and shifts the spans of every later record. Everything
/// else keeps its exact text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentEditor;

impl DocumentEditor {
    pub fn new() -> Self {
        Self
    }

    /// Replace the version specifiers of a requirement, or add them
    pub fn set_version<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        specifiers: &str,
    ) -> Result<(), EditError> {
        let specifiers = single_line("specifiers", specifiers)?;
        let wanted: Vec<SpecifierToken> = parse_specifiers(specifiers)
            .map_err(|e| EditError::InvalidValue {
                field: "specifiers",
                reason: e.to_string(),
            })?
            .into_iter()
            .map(SpecifierToken::Valid)
            .collect();

        let found = self.requirement(doc, target.into(), "set version of")?;
        if found.req.is_direct_reference() {
            return Err(EditError::InvalidOperation {
                index: found.index,
                operation: "set version of",
                reason: "direct references carry no version specifiers".to_string(),
            });
        }

        let splice = match &found.req.specifiers {
            Some(clause) => Splice::replace(clause.span, specifiers),
            None => Splice::insert(version_anchor(found.req), specifiers),
        };

        tracing::debug!(
            index = found.index,
            package = %found.req.name.value,
            specifiers,
            "setting version"
        );
        let index = found.index;
        self.apply(doc, index, splice, Field::Specifiers, |req| {
            req.specifiers.as_ref().is_some_and(|clause| {
                clause.items.iter().map(|item| &item.value).eq(wanted.iter())
            })
        })
    }

    /// Drop the version specifiers of a requirement, parentheses included
    pub fn clear_version<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
    ) -> Result<(), EditError> {
        let found = self.requirement(doc, target.into(), "clear version of")?;
        let Some(clause) = &found.req.specifiers else {
            return Ok(());
        };

        let splice = Splice::remove(Span::new(
            version_anchor(found.req),
            clause.outer_span().end,
        ));
        let index = found.index;
        self.apply(doc, index, splice, Field::Specifiers, |req| req.specifiers.is_none())
    }

    /// Add an extra, following the separator style already in use
    pub fn add_extra<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        extra: &str,
    ) -> Result<(), EditError> {
        let extra = single_line("extra", extra)?;
        if !requirement::is_valid_name(extra) {
            return Err(EditError::InvalidValue {
                field: "extra",
                reason: format!("{extra} is not a valid extra name"),
            });
        }

        let found = self.requirement(doc, target.into(), "add extra to")?;
        if found.req.name_origin != NameOrigin::Declared {
            return Err(EditError::InvalidOperation {
                index: found.index,
                operation: "add extra to",
                reason: "extras need a written package name".to_string(),
            });
        }

        let splice = match &found.req.extras {
            Some(extras) if extras.contains(extra) => return Ok(()),
            Some(extras) => match (extras.items.first(), extras.items.get(1), extras.items.last()) {
                (Some(first), Some(second), Some(last)) => {
                    let separator = found
                        .record
                        .text(Span::new(first.span.end, second.span.start))
                        .unwrap_or(",");
                    Splice::insert(last.span.end, format!("{separator}{extra}"))
                }
                (Some(only), _, _) => Splice::insert(only.span.end, format!(",{extra}")),
                _ => Splice::insert(extras.span.start + 1, extra),
            },
            None => Splice::insert(found.req.name.span.end, format!("[{extra}]")),
        };

        let index = found.index;
        self.apply(doc, index, splice, Field::Extras, |req| {
            req.extras.as_ref().is_some_and(|extras| extras.contains(extra))
        })
    }

    /// Remove an extra, and the brackets with it when it was the last one
    pub fn remove_extra<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        extra: &str,
    ) -> Result<(), EditError> {
        let found = self.requirement(doc, target.into(), "remove extra from")?;
        let not_found = || EditError::ExtraNotFound {
            package: found.req.name.value.clone(),
            extra: extra.to_string(),
        };
        let extras = found.req.extras.as_ref().ok_or_else(not_found)?;
        let pos = extras.position(extra).ok_or_else(not_found)?;
        let items = &extras.items;

        let span = if items.len() == 1 {
            extras.span
        } else if pos + 1 < items.len() {
            Span::new(items[pos].span.start, items[pos + 1].span.start)
        } else {
            Span::new(items[pos - 1].span.end, items[pos].span.end)
        };

        let index = found.index;
        self.apply(doc, index, Splice::remove(span), Field::Extras, |req| {
            !req.extras.as_ref().is_some_and(|extras| extras.contains(extra))
        })
    }

    /// Set the trailing comment text, or remove the comment with `None`
    pub fn set_comment<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        comment: Option<&str>,
    ) -> Result<(), EditError> {
        let comment = comment
            .map(|text| single_line("comment", text))
            .transpose()?;
        let found = self.requirement(doc, target.into(), "set comment of")?;
        let req = found.req;

        let splice = match (comment, &req.comment) {
            (Some(text), Some(existing)) if !existing.text.span.is_empty() => {
                Splice::replace(existing.text.span, text)
            }
            (Some(text), Some(existing)) => Splice::replace(existing.span, format!("# {text}")),
            (Some(text), None) => Splice::insert(req.body.end, format!("  # {text}")),
            (None, Some(existing)) => Splice::remove(Span::new(req.body.end, existing.span.end)),
            (None, None) => return Ok(()),
        };

        let index = found.index;
        self.apply(doc, index, splice, Field::Comment, |req| {
            req.comment.as_ref().map(|c| c.text.value.as_str()) == comment
        })
    }

    /// Append a `--hash`, matching the spacing of the existing ones
    pub fn add_hash<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        hash: &str,
    ) -> Result<(), EditError> {
        let hash = single_line("hash", hash)?;
        if !requirement::is_valid_hash(hash) {
            return Err(EditError::InvalidValue {
                field: "hash",
                reason: format!("{hash} is not an algorithm:hexdigest hash"),
            });
        }

        let found = self.requirement(doc, target.into(), "add hash to")?;
        let req = found.req;
        if req.hash_values().any(|existing| existing == hash) {
            return Ok(());
        }

        let splice = match req.hashes.last() {
            Some(last) => {
                let previous_end = req
                    .field_end_before(last.span.start)
                    .unwrap_or(req.body.start);
                let separator = found
                    .record
                    .text(Span::new(previous_end, last.span.start))
                    .filter(|sep| {
                        !sep.is_empty() && sep.chars().all(|c| c.is_whitespace() || c == '\\')
                    })
                    .unwrap_or(" ");
                Splice::insert(last.span.end, format!("{separator}--hash={hash}"))
            }
            None => Splice::insert(req.body.end, format!(" --hash={hash}")),
        };

        let index = found.index;
        self.apply(doc, index, splice, Field::Hashes, |req| {
            req.hash_values().any(|existing| existing == hash)
        })
    }

    /// Remove a `--hash` together with the blanks or continuation before it
    pub fn remove_hash<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        hash: &str,
    ) -> Result<(), EditError> {
        let found = self.requirement(doc, target.into(), "remove hash from")?;
        let req = found.req;
        let Some(existing) = req.hashes.iter().find(|h| h.value == hash) else {
            return Err(EditError::HashNotFound {
                package: req.name.value.clone(),
                hash: hash.to_string(),
            });
        };

        let start = req
            .field_end_before(existing.span.start)
            .unwrap_or(existing.span.start);
        let splice = Splice::remove(Span::new(start, existing.span.end));

        let index = found.index;
        self.apply(doc, index, splice, Field::Hashes, |req| {
            req.hash_values().all(|value| value != hash)
        })
    }

    /// Set the environment marker, or remove it with `None`
    pub fn set_marker<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
        marker: Option<&str>,
    ) -> Result<(), EditError> {
        let marker = marker.map(|text| single_line("marker", text)).transpose()?;
        let found = self.requirement(doc, target.into(), "set marker of")?;
        let req = found.req;

        let splice = match (marker, &req.marker) {
            (Some(expr), Some(existing)) => Splice::replace(existing.expression.span, expr),
            // pip needs a blank between a URL and its `;`
            (Some(expr), None) if req.is_direct_reference() => {
                Splice::insert(marker_anchor(req), format!(" ; {expr}"))
            }
            (Some(expr), None) => Splice::insert(marker_anchor(req), format!("; {expr}")),
            (None, Some(existing)) => {
                let start = req
                    .field_end_before(existing.separator.start)
                    .unwrap_or(existing.separator.start);
                Splice::remove(Span::new(start, existing.span().end))
            }
            (None, None) => return Ok(()),
        };

        let index = found.index;
        self.apply(doc, index, splice, Field::Marker, |req| {
            req.marker.as_ref().map(|m| m.expression.value.as_str()) == marker
        })
    }

    /// Insert a requirement line after record `after`, or first with `None`
    ///
    /// The new line uses the document's line ending. When the document has no
    /// final newline and the line goes last, it stays without one.
    /// Returns the index of the new record.
    pub fn insert_requirement(
        &self,
        doc: &mut Document,
        after: Option<usize>,
        text: &str,
    ) -> Result<usize, EditError> {
        let text = self.check_requirement_text(text)?;
        if let Some(index) = after
            && index >= doc.len()
        {
            return Err(EditError::IndexOutOfRange {
                index,
                len: doc.len(),
            });
        }

        let position = after.map_or(0, |idx| idx + 1);
        let eol = doc.line_ending();
        let mut staged = doc.clone();
        let mut raw = text.to_string();

        match after.and_then(|idx| staged.get(idx)) {
            Some(previous)
                if previous
                    .diagnostics
                    .iter()
                    .any(|d| d.kind == DiagnosticKind::DanglingContinuation) =>
            {
                return Err(EditError::InvalidOperation {
                    index: position - 1,
                    operation: "insert after",
                    reason: "the line ends with a continuation".to_string(),
                });
            }
            Some(previous) if position == staged.len() && previous.terminator().is_empty() => {
                let terminated = format!("{}{eol}", previous.raw);
                self.rewrite(&mut staged, position - 1, &terminated)?;
            }
            _ => raw.push_str(eol),
        }

        let start = position
            .checked_sub(1)
            .and_then(|idx| staged.get(idx))
            .map_or(0, |previous| previous.span.end);
        let record = parsers::parse_single_record(&raw, start)
            .filter(|record| lexer_issues(record) == 0)
            .ok_or_else(|| EditError::InvalidValue {
                field: "requirement",
                reason: format!("{text} does not form a single line"),
            })?;

        let grown = Delta::Grow(record.raw.len());
        staged.insert_after(after, record);
        shift_from(&mut staged, position + 1, grown);
        debug_assert!(staged.check_coverage().is_ok());
        *doc = staged;

        tracing::debug!(position, requirement = text, "inserted requirement");
        Ok(position)
    }

    /// Append a requirement unless one with the same name is already listed
    pub fn add_requirement(&self, doc: &mut Document, text: &str) -> Result<usize, EditError> {
        let name = self.check_requirement_name(text)?;
        if doc.position(&name).is_some() {
            return Err(EditError::DuplicateRequirement(name));
        }
        let last = doc.len().checked_sub(1);
        self.insert_requirement(doc, last, text)
    }

    /// Remove a requirement line, returning the removed record
    pub fn remove_requirement<'t>(
        &self,
        doc: &mut Document,
        target: impl Into<Target<'t>>,
    ) -> Result<LineRecord, EditError> {
        let index = self.requirement(doc, target.into(), "remove")?.index;
        let mut staged = doc.clone();
        let removed = staged.remove(index);
        shift_from(&mut staged, index, Delta::Shrink(removed.raw.len()));

        // Keep a missing final newline missing
        if removed.terminator().is_empty()
            && index == staged.len()
            && let Some(previous) = index.checked_sub(1).and_then(|idx| staged.get(idx))
            && !previous.terminator().is_empty()
        {
            let unterminated = previous.content().to_string();
            self.rewrite(&mut staged, index - 1, &unterminated)?;
        }

        debug_assert!(staged.check_coverage().is_ok());
        *doc = staged;

        tracing::debug!(index, "removed requirement");
        Ok(removed)
    }

    /// Set the specifiers of several packages at once
    ///
    /// Either every update applies or none does. Returns the number applied.
    pub fn update_versions<N, S>(
        &self,
        doc: &mut Document,
        updates: impl IntoIterator<Item = (N, S)>,
    ) -> Result<usize, EditError>
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut staged = doc.clone();
        let mut applied = 0;

        for (name, specifiers) in updates {
            self.set_version(&mut staged, name.as_ref(), specifiers.as_ref())?;
            applied += 1;
        }

        *doc = staged;
        Ok(applied)
    }

    fn locate(&self, doc: &Document, target: Target<'_>) -> Result<usize, EditError> {
        match target {
            Target::Index(index) if index < doc.len() => Ok(index),
            Target::Index(index) => Err(EditError::IndexOutOfRange {
                index,
                len: doc.len(),
            }),
            Target::Name(name) => doc
                .position(name)
                .ok_or_else(|| EditError::PackageNotFound(name.to_string())),
        }
    }

    fn requirement<'d>(
        &self,
        doc: &'d Document,
        target: Target<'_>,
        operation: &'static str,
    ) -> Result<Located<'d>, EditError> {
        let index = self.locate(doc, target)?;
        let record = doc.get(index).ok_or(EditError::IndexOutOfRange {
            index,
            len: doc.len(),
        })?;

        match record.requirement() {
            Some(req) => Ok(Located { index, record, req }),
            None => Err(EditError::InvalidOperation {
                index,
                operation,
                reason: format!("it is a {} line", record.kind),
            }),
        }
    }

    fn check_requirement_text<'v>(&self, text: &'v str) -> Result<&'v str, EditError> {
        let text = single_line("requirement", text)?;
        // A new line must read cleanly, warnings included
        let valid = parsers::parse_single_record(text, 0)
            .is_some_and(|record| record.requirement().is_some() && record.diagnostics.is_empty());
        if !valid {
            return Err(EditError::InvalidValue {
                field: "requirement",
                reason: format!("{text} is not a valid requirement"),
            });
        }
        Ok(text)
    }

    fn check_requirement_name(&self, text: &str) -> Result<String, EditError> {
        let text = self.check_requirement_text(text)?;
        parsers::parse_single_record(text, 0)
            .and_then(|record| record.requirement().map(|req| req.name.value.clone()))
            .ok_or_else(|| EditError::InvalidValue {
                field: "requirement",
                reason: format!("{text} is not a valid requirement"),
            })
    }

    /// Splice one requirement record and re-read it
    ///
    /// The result must still be one requirement with the same name and the
    /// same values outside `field`, pass `verify`, and bring no new quote or
    /// continuation problems. Otherwise nothing changes.
    fn apply(
        &self,
        doc: &mut Document,
        index: usize,
        splice: Splice,
        field: Field,
        verify: impl Fn(&RequirementPayload) -> bool,
    ) -> Result<(), EditError> {
        let len = doc.len();
        let record = doc
            .get(index)
            .ok_or(EditError::IndexOutOfRange { index, len })?;
        let Some(old) = record.requirement() else {
            return Err(EditError::InvalidOperation {
                index,
                operation: "edit",
                reason: format!("it is a {} line", record.kind),
            });
        };
        let name = old.normalized_name();
        let kept = Fields::besides(old, field);
        let issues = lexer_issues(record);

        let range = splice.span.relative_to(record.span.start);
        let raw = format!(
            "{}{}{}",
            &record.raw[..range.start],
            splice.text,
            &record.raw[range.end..]
        );

        let replacement = parsers::parse_single_record(&raw, record.span.start)
            .filter(|new| lexer_issues(new) <= issues)
            .filter(|new| {
                new.requirement().is_some_and(|req| {
                    req.normalized_name() == name
                        && Fields::besides(req, field) == kept
                        && verify(req)
                })
            })
            .ok_or_else(|| EditError::InvalidValue {
                field: field.label(),
                reason: format!("{} would not read back as intended", raw.trim_end()),
            })?;

        self.replace(doc, index, replacement);
        Ok(())
    }

    /// Replace the raw text of any record, keeping its kind
    fn rewrite(&self, doc: &mut Document, index: usize, raw: &str) -> Result<(), EditError> {
        let len = doc.len();
        let record = doc
            .get(index)
            .ok_or(EditError::IndexOutOfRange { index, len })?;

        let replacement = parsers::parse_single_record(raw, record.span.start)
            .filter(|new| new.kind.label() == record.kind.label())
            .ok_or_else(|| EditError::InvalidOperation {
                index,
                operation: "rewrite",
                reason: "the line would change meaning".to_string(),
            })?;

        self.replace(doc, index, replacement);
        Ok(())
    }

    fn replace(&self, doc: &mut Document, index: usize, replacement: LineRecord) {
        let Some(slot) = doc.record_mut(index) else {
            return;
        };
        let delta = Delta::between(slot.raw.len(), replacement.raw.len());
        *slot = replacement;
        shift_from(doc, index + 1, delta);
        debug_assert!(doc.check_coverage().is_ok());
    }
}
