//! Grammar of a single requirement line.
//!
//! Works on a logical line's joined content and maps every field back to
//! absolute spans through the line's offset table.

use super::lexer::LogicalLine;
use super::options::read_flag;
use regex::Regex;
use reqtxt_core::{
    Diagnostic, DiagnosticKind, Extras, Marker, NameOrigin, RequirementOption,
    RequirementPayload, RequirementSource, Span, Specifier, SpecifierClause, SpecifierToken,
    Spanned, VcsKind,
};
use std::ops::Range;
use std::sync::LazyLock;
use url::Url;

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?").expect("valid name pattern")
});

static HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+:[A-Fa-f0-9]+$").expect("valid hash pattern"));

static VCS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(git|hg|svn|bzr)\+").expect("valid vcs pattern"));

const SDIST_SUFFIXES: [&str; 5] = [".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".zip"];

/// A requirement together with the non-fatal problems found on its line
#[derive(Debug)]
pub struct ParsedRequirement {
    pub payload: RequirementPayload,
    pub diagnostics: Vec<Diagnostic>,
}

/// Why a line could not be read as a requirement
#[derive(Debug)]
pub enum RequirementError {
    /// Not a requirement at all
    Invalid(Diagnostic),
    /// A URL or path whose package name cannot be told
    Unnamed(Diagnostic),
}

impl RequirementError {
    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            RequirementError::Invalid(diag) | RequirementError::Unnamed(diag) => diag,
        }
    }
}

/// Check a whole string against the package name grammar
pub fn is_valid_name(text: &str) -> bool {
    NAME.find(text).is_some_and(|m| m.end() == text.len())
}

/// Check a `algorithm:hexdigest` hash value
pub fn is_valid_hash(text: &str) -> bool {
    HASH.is_match(text)
}

pub fn parse_requirement(
    line: &LogicalLine<'_>,
    editable: bool,
) -> Result<ParsedRequirement, RequirementError> {
    Grammar {
        line,
        content: &line.content,
        diagnostics: Vec::new(),
    }
    .parse(editable)
}

/// Whether `text` opens with `name @` or `name[`
fn declares_name(text: &str) -> bool {
    NAME.find(text)
        .is_some_and(|m| text[m.end()..].trim_start().starts_with(['@', '[']))
}

/// Whether the first token of `text` is a URL or a local path
pub fn looks_like_direct_reference(text: &str) -> bool {
    if declares_name(text) {
        return false;
    }
    let first = text.split_whitespace().next().unwrap_or_default();
    VCS_PREFIX.is_match(first) || first.contains("://") || looks_like_path(first)
}

fn looks_like_path(text: &str) -> bool {
    let mut chars = text.chars();
    let drive_letter = matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    );

    drive_letter
        || text.starts_with(['.', '/', '~', '\\'])
        || text.starts_with("file:")
        || text.ends_with(".whl")
        || SDIST_SUFFIXES.iter().any(|suffix| text.ends_with(suffix))
}

/// Package name embedded in a URL or path, as a range of `location`
fn derive_name(location: &str) -> Option<(Range<usize>, NameOrigin)> {
    if let Some(idx) = location.find("#egg=") {
        let start = idx + "#egg=".len();
        let len = location[start..].find('&').unwrap_or(location.len() - start);
        if is_valid_name(&location[start..start + len]) {
            return Some((start..start + len, NameOrigin::EggFragment));
        }
    }

    let path_end = location.find(['#', '?']).unwrap_or(location.len());
    let trimmed_end = location[..path_end].trim_end_matches(['/', '\\']).len();
    let segment_start = location[..trimmed_end]
        .rfind(['/', '\\', ':'])
        .map_or(0, |idx| idx + 1);
    // The host of a URL is never a package name
    if let Some(scheme_end) = location.find("://") {
        let host_start = scheme_end + 3;
        let path_start = location[host_start..]
            .find('/')
            .map_or(location.len(), |idx| host_start + idx);
        if segment_start <= path_start {
            return None;
        }
    }
    let segment = &location[segment_start..trimmed_end];

    let name_len = if let Some(stem) = segment.strip_suffix(".whl") {
        stem.find('-').unwrap_or(stem.len())
    } else if let Some(stem) = SDIST_SUFFIXES
        .iter()
        .find_map(|suffix| segment.strip_suffix(suffix))
    {
        match stem.rsplit_once('-') {
            Some((name, version)) if version.starts_with(|c: char| c.is_ascii_digit()) => {
                name.len()
            }
            _ => stem.len(),
        }
    } else {
        // Repository or directory: drop a `@ref` and a `.git` suffix
        let base = segment.split('@').next().unwrap_or(segment);
        base.strip_suffix(".git").unwrap_or(base).len()
    };

    let range = segment_start..segment_start + name_len;
    is_valid_name(&location[range.clone()]).then_some((range, NameOrigin::Inferred))
}

fn skip_blanks(s: &str, from: usize, to: usize) -> usize {
    to - s[from..to].trim_start().len()
}

fn trim_end(s: &str, from: usize, to: usize) -> usize {
    from + s[from..to].trim_end().len()
}

/// First `ch` in `s[from..to]` outside quotes
fn find_unquoted(s: &str, from: usize, to: usize, ch: char) -> Option<usize> {
    let mut quote = None;
    for (idx, c) in s[from..to].char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            (None, _) if c == ch => return Some(from + idx),
            _ => {}
        }
    }
    None
}

/// Start of the first blank-preceded `--` token outside quotes
fn option_region_start(s: &str, from: usize, to: usize) -> Option<usize> {
    let mut quote = None;
    let mut prev_blank = false;
    for (idx, c) in s[from..to].char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            (None, '-') if prev_blank && s[from + idx..to].starts_with("--") => {
                return Some(from + idx);
            }
            _ => {}
        }
        prev_blank = c.is_whitespace();
    }
    None
}

/// Blank separated tokens of `s[from..to]`, quotes kept together
fn tokens(s: &str, from: usize, to: usize) -> Vec<Range<usize>> {
    let mut tokens = Vec::new();
    let mut quote = None;
    let mut start = None;

    for (idx, c) in s[from..to].char_indices() {
        let at = from + idx;
        if c.is_whitespace() && quote.is_none() {
            if let Some(begin) = start.take() {
                tokens.push(begin..at);
            }
            continue;
        }
        if start.is_none() {
            start = Some(at);
        }
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push(begin..to);
    }
    tokens
}

/// Inner range of a value wrapped in matching quotes
fn unquote(s: &str, range: Range<usize>) -> Range<usize> {
    let text = &s[range.clone()];
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')));
    if quoted {
        range.start + 1..range.end - 1
    } else {
        range
    }
}

fn empty_payload(name: Spanned<String>, origin: NameOrigin, source: RequirementSource) -> RequirementPayload {
    RequirementPayload {
        name,
        name_origin: origin,
        source,
        editable: None,
        extras: None,
        specifiers: None,
        marker: None,
        hashes: Vec::new(),
        options: Vec::new(),
        comment: None,
        body: Span::default(),
    }
}

struct Grammar<'l, 'a> {
    line: &'l LogicalLine<'a>,
    content: &'l str,
    diagnostics: Vec<Diagnostic>,
}

impl Grammar<'_, '_> {
    fn parse(mut self, editable: bool) -> Result<ParsedRequirement, RequirementError> {
        let content = self.content;
        let body_end = self.line.body_end();
        let lead = skip_blanks(content, 0, body_end);
        let mut pos = lead;

        let editable_span = editable.then(|| {
            let flag = read_flag(content, lead);
            pos = flag.value_start.min(body_end);
            self.span(flag.start..flag.end)
        });

        let options_start = option_region_start(content, pos, body_end);
        let req_end = trim_end(content, pos, options_start.unwrap_or(body_end));

        if pos >= req_end {
            let (kind, message) = if editable {
                (DiagnosticKind::MissingOptionValue, "editable needs a path or URL")
            } else {
                (DiagnosticKind::InvalidRequirement, "missing requirement")
            };
            return Err(RequirementError::Invalid(self.diagnostic(
                kind,
                lead..body_end,
                message,
            )));
        }

        let mut req = if looks_like_direct_reference(&content[pos..req_end]) {
            self.unnamed_reference(pos, req_end)?
        } else {
            self.named(pos, req_end)?
        };

        req.editable = editable_span;
        if let Some(start) = options_start {
            self.options(&mut req, start, body_end);
        }
        req.comment = self.line.comment();
        req.body = self.span(lead..trim_end(content, lead, body_end));

        Ok(ParsedRequirement {
            payload: req,
            diagnostics: self.diagnostics,
        })
    }

    fn span(&self, range: Range<usize>) -> Span {
        self.line.span_of(range)
    }

    fn spanned(&self, range: Range<usize>) -> Spanned<String> {
        Spanned::new(self.content[range.clone()].to_string(), self.span(range))
    }

    fn diagnostic(
        &self,
        kind: DiagnosticKind,
        range: Range<usize>,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::new(kind, self.span(range), message)
    }

    fn invalid(&self, range: Range<usize>, message: impl Into<String>) -> RequirementError {
        RequirementError::Invalid(self.diagnostic(
            DiagnosticKind::InvalidRequirement,
            range,
            message,
        ))
    }

    fn report(&mut self, kind: DiagnosticKind, range: Range<usize>, message: impl Into<String>) {
        let diag = self.diagnostic(kind, range, message);
        self.diagnostics.push(diag);
    }

    /// `name[extras] specifiers ; marker` or `name[extras] @ url ; marker`
    fn named(&mut self, start: usize, end: usize) -> Result<RequirementPayload, RequirementError> {
        let content = self.content;
        let Some(found) = NAME.find(&content[start..end]) else {
            return Err(self.invalid(start..end, "expected a package name"));
        };

        let name_end = start + found.end();
        let mut req = empty_payload(
            self.spanned(start..name_end),
            NameOrigin::Declared,
            RequirementSource::Registry,
        );
        let mut cursor = skip_blanks(content, name_end, end);

        if content[cursor..end].starts_with('[') {
            let close = content[cursor..end]
                .find(']')
                .map(|idx| cursor + idx)
                .ok_or_else(|| self.invalid(cursor..end, "unclosed extras bracket"))?;
            req.extras = Some(self.extras(cursor, close)?);
            cursor = skip_blanks(content, close + 1, end);
        }

        let rest = &content[cursor..end];
        if rest.is_empty() {
            return Ok(req);
        }

        if rest.starts_with('@') {
            let location_start = skip_blanks(content, cursor + 1, end);
            if location_start == end {
                return Err(self.invalid(cursor..end, "missing URL after @"));
            }
            let (source, location_end) = self.location(location_start, end)?;
            req.source = source;
            self.url_marker(&mut req, location_end, end)?;
            return Ok(req);
        }

        if rest.starts_with(';') {
            req.marker = Some(self.marker(cursor, end));
            return Ok(req);
        }

        let (clause, after) = self.clause(cursor, end)?;
        req.specifiers = Some(clause);

        let after = skip_blanks(content, after, end);
        if after < end {
            if !content[after..end].starts_with(';') {
                return Err(self.invalid(after..end, "unexpected text after version specifiers"));
            }
            req.marker = Some(self.marker(after, end));
        }

        Ok(req)
    }

    fn extras(&self, open: usize, close: usize) -> Result<Extras, RequirementError> {
        let content = self.content;
        let mut items = Vec::new();
        let mut piece_start = open + 1;

        for piece in content[open + 1..close].split(',') {
            let piece_end = piece_start + piece.len();
            let item_start = skip_blanks(content, piece_start, piece_end);
            let item_end = trim_end(content, item_start, piece_end);

            if item_end > item_start {
                if !is_valid_name(&content[item_start..item_end]) {
                    return Err(self.invalid(
                        item_start..item_end,
                        format!("invalid extra name {}", &content[item_start..item_end]),
                    ));
                }
                items.push(self.spanned(item_start..item_end));
            }
            piece_start = piece_end + 1;
        }

        Ok(Extras {
            span: self.span(open..close + 1),
            items,
        })
    }

    /// Specifier list starting at `start`; returns it with the index after it
    fn clause(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(SpecifierClause, usize), RequirementError> {
        let content = self.content;

        if content[start..end].starts_with('(') {
            let close = content[start..end]
                .find(')')
                .map(|idx| start + idx)
                .ok_or_else(|| self.invalid(start..end, "unclosed parenthesis"))?;
            let inner_start = skip_blanks(content, start + 1, close);
            let inner_end = trim_end(content, inner_start, close);
            let mut clause = self.clause_items(inner_start, inner_end);
            clause.enclosure = Some(self.span(start..close + 1));
            return Ok((clause, close + 1));
        }

        let region_end = find_unquoted(content, start, end, ';').unwrap_or(end);
        let clause = self.clause_items(start, trim_end(content, start, region_end));
        Ok((clause, region_end))
    }

    fn clause_items(&mut self, start: usize, end: usize) -> SpecifierClause {
        let content = self.content;
        let mut items = Vec::new();
        let mut piece_start = start;

        for piece in content[start..end].split(',') {
            let piece_end = piece_start + piece.len();
            let token_start = skip_blanks(content, piece_start, piece_end);
            let token_end = trim_end(content, token_start, piece_end);
            let text = &content[token_start..token_end];

            if text.is_empty() {
                self.report(
                    DiagnosticKind::MalformedSpecifier,
                    piece_start..piece_end,
                    "empty version specifier",
                );
            } else {
                let token = match text.parse::<Specifier>() {
                    Ok(spec) => SpecifierToken::Valid(spec),
                    Err(e) => {
                        self.report(
                            DiagnosticKind::MalformedSpecifier,
                            token_start..token_end,
                            e.to_string(),
                        );
                        SpecifierToken::Malformed(text.to_string())
                    }
                };
                items.push(Spanned::new(token, self.span(token_start..token_end)));
            }
            piece_start = piece_end + 1;
        }

        SpecifierClause {
            span: self.span(start..end),
            enclosure: None,
            items,
        }
    }

    fn marker(&self, separator: usize, end: usize) -> Marker {
        let expr_start = skip_blanks(self.content, separator + 1, end);
        let expr_end = trim_end(self.content, expr_start, end);
        Marker {
            separator: self.span(separator..separator + 1),
            expression: self.spanned(expr_start..expr_end),
        }
    }

    /// URL or path token starting at `start`
    fn location(
        &self,
        start: usize,
        end: usize,
    ) -> Result<(RequirementSource, usize), RequirementError> {
        let location_end = self.content[start..end]
            .find(char::is_whitespace)
            .map_or(end, |idx| start + idx);
        let text = &self.content[start..location_end];
        let spanned = self.spanned(start..location_end);

        if let Some(vcs) = VCS_PREFIX
            .captures(text)
            .and_then(|caps| VcsKind::from_prefix(&caps[1]))
        {
            return Ok((RequirementSource::Vcs { vcs, url: spanned }, location_end));
        }

        if let Ok(url) = Url::parse(text)
            && matches!(url.scheme(), "http" | "https" | "ftp" | "file")
        {
            return Ok((RequirementSource::Url { url: spanned }, location_end));
        }

        if looks_like_path(text) {
            return Ok((RequirementSource::Path { path: spanned }, location_end));
        }

        Err(self.invalid(start..location_end, format!("{text} is not a URL or path")))
    }

    /// Optional ` ; marker` after a URL; pip needs a blank before the `;`
    fn url_marker(
        &self,
        req: &mut RequirementPayload,
        location_end: usize,
        end: usize,
    ) -> Result<(), RequirementError> {
        let after = skip_blanks(self.content, location_end, end);
        if after == end {
            return Ok(());
        }
        if !self.content[after..end].starts_with(';') {
            return Err(self.invalid(after..end, "unexpected text after URL"));
        }
        req.marker = Some(self.marker(after, end));
        Ok(())
    }

    /// URL or path without a declared name
    fn unnamed_reference(
        &self,
        start: usize,
        end: usize,
    ) -> Result<RequirementPayload, RequirementError> {
        let (source, location_end) = self.location(start, end)?;
        let location = &self.content[start..location_end];

        let Some((range, origin)) = derive_name(location) else {
            return Err(RequirementError::Unnamed(self.diagnostic(
                DiagnosticKind::UnnamedReference,
                start..location_end,
                format!("cannot tell the package name of {location}; add #egg=<name>"),
            )));
        };

        let name = self.spanned(start + range.start..start + range.end);
        let mut req = empty_payload(name, origin, source);
        self.url_marker(&mut req, location_end, end)?;
        Ok(req)
    }

    /// `--hash` values and other per-requirement options
    fn options(&mut self, req: &mut RequirementPayload, start: usize, end: usize) {
        let content = self.content;
        let mut iter = tokens(content, start, end).into_iter().peekable();

        while let Some(token) = iter.next() {
            let Some(option) = content[token.clone()].strip_prefix("--") else {
                self.report(
                    DiagnosticKind::UnknownOption,
                    token.clone(),
                    format!("unexpected {} among requirement options", &content[token]),
                );
                continue;
            };

            let name_start = token.start + 2;
            let (name_end, inline_value) = match option.find('=') {
                Some(idx) => (name_start + idx, Some(name_start + idx + 1..token.end)),
                None => (token.end, None),
            };

            let (value, option_end) = match inline_value {
                Some(range) => (Some(range), token.end),
                None => match iter.peek() {
                    Some(next) if !content[next.clone()].starts_with('-') => {
                        let next = next.clone();
                        iter.next();
                        let end = next.end;
                        (Some(next), end)
                    }
                    _ => (None, token.end),
                },
            };
            let value = value.filter(|range| !range.is_empty());

            if &content[name_start..name_end] == "hash" {
                let Some(value) = value else {
                    self.report(
                        DiagnosticKind::MissingOptionValue,
                        token.start..option_end,
                        "--hash needs a value",
                    );
                    continue;
                };
                let hash = &content[value];
                if !is_valid_hash(hash) {
                    self.report(
                        DiagnosticKind::InvalidHash,
                        token.start..option_end,
                        format!("{hash} is not an algorithm:hexdigest hash"),
                    );
                }
                req.hashes.push(Spanned::new(
                    hash.to_string(),
                    self.span(token.start..option_end),
                ));
                continue;
            }

            req.options.push(RequirementOption {
                name: self.spanned(name_start..name_end),
                value: value.map(|range| self.spanned(unquote(content, range))),
                span: self.span(token.start..option_end),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::lexer::split_lines;

    fn parse(text: &str) -> ParsedRequirement {
        parse_requirement(&split_lines(text)[0], false).expect("requirement")
    }

    fn parse_err(text: &str) -> RequirementError {
        parse_requirement(&split_lines(text)[0], false).expect_err("not a requirement")
    }

    fn slice(text: &str, span: Span) -> &str {
        &text[span.range()]
    }

    #[test]
    fn test_name_only() {
        let text = "flask\n";
        let req = parse(text).payload;
        assert_eq!(req.name.value, "flask");
        assert_eq!(req.name_origin, NameOrigin::Declared);
        assert!(req.specifiers.is_none());
        assert_eq!(req.body, Span::new(0, 5));
    }

    #[test]
    fn test_full_line_spans() {
        let text = "requests[security, socks]>=2.0,<3  ; python_version >= \"3.8\"  # pinned\n";
        let parsed = parse(text);
        assert!(parsed.diagnostics.is_empty());
        let req = parsed.payload;

        assert_eq!(slice(text, req.name.span), "requests");
        let extras = req.extras.as_ref().unwrap();
        assert_eq!(slice(text, extras.span), "[security, socks]");
        assert_eq!(req.extra_names(), vec!["security", "socks"]);

        let clause = req.specifiers.as_ref().unwrap();
        assert_eq!(slice(text, clause.span), ">=2.0,<3");
        assert_eq!(clause.to_string(), ">=2.0,<3");

        let marker = req.marker.as_ref().unwrap();
        assert_eq!(marker.expression.value, "python_version >= \"3.8\"");
        assert_eq!(slice(text, marker.expression.span), marker.expression.value);

        let comment = req.comment.as_ref().unwrap();
        assert_eq!(comment.text.value, "pinned");
        assert_eq!(slice(text, req.body), "requests[security, socks]>=2.0,<3  ; python_version >= \"3.8\"");
    }

    #[test]
    fn test_specifier_order_preserved() {
        let req = parse("pkg<2.0,>=1.0,!=1.5\n").payload;
        let specs: Vec<String> = req
            .specifiers
            .unwrap()
            .specifiers()
            .map(ToString::to_string)
            .collect();
        assert_eq!(specs, vec!["<2.0", ">=1.0", "!=1.5"]);
    }

    #[test]
    fn test_spaced_and_parenthesized_clause() {
        let text = "django >= 3.2, < 4.0\n";
        let req = parse(text).payload;
        assert_eq!(slice(text, req.specifiers.unwrap().span), ">= 3.2, < 4.0");

        let text = "foo (>=1.0, <2.0)\n";
        let clause = parse(text).payload.specifiers.unwrap();
        assert_eq!(slice(text, clause.span), ">=1.0, <2.0");
        assert_eq!(slice(text, clause.outer_span()), "(>=1.0, <2.0)");
    }

    #[test]
    fn test_malformed_specifier_keeps_line() {
        let text = "pkg>=1.0,latest\n";
        let parsed = parse(text);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::MalformedSpecifier);

        let clause = parsed.payload.specifiers.unwrap();
        assert_eq!(clause.items.len(), 2);
        assert!(matches!(&clause.items[1].value, SpecifierToken::Malformed(t) if t == "latest"));
        assert!(!clause.is_well_formed());
    }

    #[test]
    fn test_unknown_operator_is_malformed() {
        let parsed = parse("pkg=1.0\n");
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::MalformedSpecifier);
    }

    #[test]
    fn test_operatorless_token_is_kept_opaque() {
        let text = "flask^2.0.0 ; python_version >= \"3.8\"\n";
        let parsed = parse(text);
        assert_eq!(parsed.payload.name.value, "flask");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::MalformedSpecifier);

        let clause = parsed.payload.specifiers.unwrap();
        assert!(matches!(&clause.items[0].value, SpecifierToken::Malformed(t) if t == "^2.0.0"));
        assert_eq!(slice(text, clause.items[0].span), "^2.0.0");
        assert!(parsed.payload.marker.is_some());
    }

    #[test]
    fn test_invalid_lines() {
        for text in ["!!!invalid\n", "[broken\n", "pkg[bad name]\n", "pkg[extra\n"] {
            assert!(matches!(parse_err(text), RequirementError::Invalid(_)), "{text}");
        }
    }

    #[test]
    fn test_named_url() {
        let text = "pkg[extra] @ https://example.com/pkg-1.0.tar.gz ; os_name == \"posix\"\n";
        let req = parse(text).payload;
        assert_eq!(req.name.value, "pkg");
        assert_eq!(req.name_origin, NameOrigin::Declared);
        assert!(matches!(&req.source, RequirementSource::Url { url } if url.value == "https://example.com/pkg-1.0.tar.gz"));
        assert_eq!(req.marker.unwrap().expression.value, "os_name == \"posix\"");
    }

    #[test]
    fn test_vcs_with_egg() {
        let text = "git+https://github.com/user/project.git#egg=project\n";
        let req = parse(text).payload;
        assert_eq!(req.name.value, "project");
        assert_eq!(req.name_origin, NameOrigin::EggFragment);
        assert_eq!(slice(text, req.name.span), "project");
        assert!(matches!(req.source, RequirementSource::Vcs { vcs: VcsKind::Git, .. }));
    }

    #[test]
    fn test_inferred_names() {
        let cases = [
            ("git+https://github.com/user/project.git@v1.0\n", "project"),
            ("https://example.com/pkg/my_pkg-1.0-py3-none-any.whl\n", "my_pkg"),
            ("./dist/my-package-2.1.0.tar.gz\n", "my-package"),
            ("./local/mylib/\n", "mylib"),
        ];
        for (text, name) in cases {
            let req = parse(text).payload;
            assert_eq!(req.name.value, name, "{text}");
            assert_eq!(req.name_origin, NameOrigin::Inferred);
            assert_eq!(slice(text, req.name.span), name);
        }
    }

    #[test]
    fn test_name_at_url_without_blanks() {
        let req = parse("pkg@https://example.com/pkg-1.0-py3-none-any.whl\n").payload;
        assert_eq!(req.name_origin, NameOrigin::Declared);
        assert!(req.is_direct_reference());
    }

    #[test]
    fn test_unnamed_reference() {
        assert!(matches!(parse_err(".\n"), RequirementError::Unnamed(_)));
        assert!(matches!(
            parse_err("https://example.com/\n"),
            RequirementError::Unnamed(_)
        ));
    }

    #[test]
    fn test_editable() {
        let text = "-e git+https://github.com/user/repo.git#egg=repo\n";
        let req = parse_requirement(&split_lines(text)[0], true).unwrap().payload;
        assert_eq!(slice(text, req.editable.unwrap()), "-e");
        assert_eq!(req.name.value, "repo");
        assert!(req.is_editable());
    }

    #[test]
    fn test_hashes_and_options() {
        let text = "pkg==1.0 \\\n    --hash=sha256:abc123 \\\n    --hash sha256:def456 --global-option=\"--no-user-cfg\"\n";
        let parsed = parse(text);
        assert!(parsed.diagnostics.is_empty());
        let req = parsed.payload;

        assert_eq!(req.hash_values().collect::<Vec<_>>(), vec!["sha256:abc123", "sha256:def456"]);
        assert_eq!(slice(text, req.hashes[0].span), "--hash=sha256:abc123");
        assert_eq!(slice(text, req.hashes[1].span), "--hash sha256:def456");

        let option = &req.options[0];
        assert_eq!(option.name.value, "global-option");
        assert_eq!(option.value.as_ref().unwrap().value, "--no-user-cfg");
    }

    #[test]
    fn test_invalid_hash_warns() {
        let parsed = parse("pkg==1.0 --hash=nothex\n");
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::InvalidHash);
        assert_eq!(parsed.payload.hashes.len(), 1);
    }

    #[test]
    fn test_marker_without_specifier() {
        let req = parse("pywin32; sys_platform == 'win32'\n").payload;
        assert!(req.specifiers.is_none());
        assert_eq!(req.marker.unwrap().expression.value, "sys_platform == 'win32'");
    }

    #[test]
    fn test_derive_name_rules() {
        assert_eq!(
            derive_name("https://x/y#egg=foo&subdirectory=bar").map(|(r, _)| r),
            Some(16..19)
        );
        let (range, origin) = derive_name("git+ssh://git@github.com/org/tool.git").unwrap();
        assert_eq!(&"git+ssh://git@github.com/org/tool.git"[range], "tool");
        assert_eq!(origin, NameOrigin::Inferred);
        assert!(derive_name("..").is_none());
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("zope.interface"));
        assert!(is_valid_name("a"));
        assert!(!is_valid_name("-pkg"));
        assert!(!is_valid_name("pkg-"));
    }
}
