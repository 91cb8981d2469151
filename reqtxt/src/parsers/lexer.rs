//! Splitting raw text into logical lines and classifying them.
//!
//! A logical line is one physical line, or several joined by a trailing `\`.
//! The joined text (`content`) drops the continuation sequences and the line
//! terminator, and keeps a byte map back to absolute offsets so every span the
//! grammar produces points into the original document.

use super::options::{self, OptionSpec};
use reqtxt_core::{Comment, Diagnostic, DiagnosticKind, IncludeKind, Span, Spanned};
use std::ops::Range;

/// Byte order mark some editors write at the start of a file
const BOM: char = '\u{feff}';

/// URL fragments that use `#` without starting a comment
const URL_FRAGMENT_KEYS: [&str; 6] = [
    "egg=",
    "subdirectory=",
    "sha1=",
    "sha256=",
    "sha512=",
    "md5=",
];

/// One logical line of input
#[derive(Debug, Clone)]
pub struct LogicalLine<'a> {
    /// Exact source text, terminator included
    pub raw: &'a str,
    pub span: Span,
    /// Text with continuation sequences and the terminator removed
    pub content: String,
    /// Absolute offset of every content byte, plus one entry for the end
    offsets: Vec<usize>,
    /// Content index of the `#` opening a trailing comment
    pub comment_start: Option<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LogicalLine<'_> {
    /// Absolute offset of a content index (`content.len()` is allowed)
    pub fn offset(&self, idx: usize) -> usize {
        self.offsets
            .get(idx)
            .copied()
            .unwrap_or(self.span.end - terminator_len(self.raw))
    }

    /// Absolute span of a content range
    pub fn span_of(&self, range: Range<usize>) -> Span {
        if range.is_empty() {
            return Span::empty(self.offset(range.start));
        }
        Span::new(self.offset(range.start), self.offset(range.end - 1) + 1)
    }

    /// Content before the comment, trailing blanks included
    pub fn body(&self) -> &str {
        &self.content[..self.body_end()]
    }

    pub fn body_end(&self) -> usize {
        self.comment_start.unwrap_or(self.content.len())
    }

    /// The trailing comment, if any
    pub fn comment(&self) -> Option<Comment> {
        let start = self.comment_start?;
        let end = start + self.content[start..].trim_end().len();
        let after_hash = start + 1;
        let text_start = end.min(
            after_hash + (self.content[after_hash..end].len()
                - self.content[after_hash..end].trim_start().len()),
        );

        Some(Comment {
            span: self.span_of(start..end),
            text: Spanned::new(
                self.content[text_start..end].to_string(),
                self.span_of(text_start..end),
            ),
        })
    }
}

/// What a logical line looks like before its grammar is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    Comment,
    Include(IncludeKind),
    Option(&'static OptionSpec),
    /// `-e` / `--editable`
    Editable,
    UnknownOption,
    Requirement,
}

/// Split `text` into logical lines covering every byte exactly once
pub fn split_lines(text: &str) -> Vec<LogicalLine<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let line = scan_line(text, start);
        start = line.span.end;
        lines.push(line);
    }

    lines
}

/// Classify a logical line from its trimmed content
pub fn classify(line: &LogicalLine<'_>) -> LineClass {
    let trimmed = line.content.trim_start();

    if trimmed.trim_end().is_empty() {
        return LineClass::Blank;
    }
    if trimmed.starts_with('#') {
        return LineClass::Comment;
    }
    if !trimmed.starts_with('-') {
        return LineClass::Requirement;
    }

    let lead = line.content.len() - trimmed.len();
    let flag = options::read_flag(&line.content, lead);
    match flag.name(&line.content) {
        "-r" | "--requirement" => LineClass::Include(IncludeKind::Reference),
        "-c" | "--constraint" => LineClass::Include(IncludeKind::Constraint),
        "-e" | "--editable" => LineClass::Editable,
        name => match options::lookup(name) {
            Some(spec) => LineClass::Option(spec),
            None => LineClass::UnknownOption,
        },
    }
}

fn terminator_len(raw: &str) -> usize {
    if raw.ends_with("\r\n") {
        2
    } else if raw.ends_with('\n') {
        1
    } else {
        0
    }
}

/// Length of the line break starting at `at`, if there is one
fn line_break_at(bytes: &[u8], at: usize) -> Option<usize> {
    match bytes.get(at) {
        Some(b'\n') => Some(1),
        Some(b'\r') if bytes.get(at + 1) == Some(&b'\n') => Some(2),
        _ => None,
    }
}

/// Decide whether an unquoted `#` opens a comment
///
/// It does at the start of a token. Inside a token it does unless the token is
/// a URL or the text after it is a known URL fragment key.
fn opens_comment(token: &str, after: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    if token.contains("://") {
        return false;
    }
    !URL_FRAGMENT_KEYS.iter().any(|key| after.starts_with(key))
}

fn scan_line(text: &str, start: usize) -> LogicalLine<'_> {
    let bytes = text.as_bytes();
    let mut content = String::new();
    let mut offsets = Vec::new();
    let mut quote: Option<(char, usize)> = None;
    let mut comment_start = None;
    let mut token_start = 0;
    let mut diagnostics = Vec::new();
    let mut end = text.len();
    let mut content_end = text.len();

    let mut chars = text[start..].char_indices().peekable();
    while let Some((rel, c)) = chars.next() {
        let at = start + rel;

        // Kept in `raw` but not in `content`, as pip drops it when reading
        if rel == 0 && c == BOM {
            continue;
        }

        if let Some(len) = line_break_at(bytes, at) {
            content_end = at;
            end = at + len;
            break;
        }

        match c {
            '\\' if quote.is_none() && comment_start.is_none() => {
                if let Some(len) = line_break_at(bytes, at + 1) {
                    // Continuation: drop the backslash and the break
                    for _ in 0..len {
                        chars.next();
                    }
                    if at + 1 + len == text.len() {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::DanglingContinuation,
                            Span::new(at, at + 1 + len),
                            "line continuation at end of file",
                        ));
                    }
                    continue;
                }
                if at + 1 == text.len() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::DanglingContinuation,
                        Span::new(at, at + 1),
                        "line continuation at end of file",
                    ));
                    content_end = at;
                    break;
                }
            }
            '"' | '\'' if comment_start.is_none() => match quote {
                None => quote = Some((c, content.len())),
                Some((open, _)) if open == c => quote = None,
                Some(_) => {}
            },
            '#' if quote.is_none() && comment_start.is_none() => {
                let after = &text[at + 1..];
                if opens_comment(&content[token_start..], after) {
                    comment_start = Some(content.len());
                }
            }
            _ => {}
        }

        content.push(c);
        offsets.extend(at..at + c.len_utf8());
        if c.is_whitespace() && quote.is_none() {
            token_start = content.len();
        }
    }

    offsets.push(content_end);

    let mut line = LogicalLine {
        raw: &text[start..end],
        span: Span::new(start, end),
        content,
        offsets,
        comment_start,
        diagnostics,
    };

    if let Some((open, idx)) = quote {
        let span = line.span_of(idx..line.body_end().max(idx + 1));
        line.diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnterminatedQuote,
            span,
            format!("unterminated {open} quote"),
        ));
    }

    line
}
