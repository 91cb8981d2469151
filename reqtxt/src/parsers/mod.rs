//! Turning requirements text into line records.

pub mod lexer;
pub mod options;
pub mod requirement;

use crate::document::Document;
use lexer::{LineClass, LogicalLine};
use requirement::RequirementError;
use reqtxt_core::{Delta, Diagnostic, DiagnosticKind, LineKind, LineRecord, Rebase};

/// Parse a whole requirements file
///
/// Never fails: lines that cannot be read are kept as comments and reported
/// through the returned diagnostics, which are in document order.
pub fn parse(text: &str) -> (Document, Vec<Diagnostic>) {
    let records: Vec<LineRecord> = lexer::split_lines(text).iter().map(build_record).collect();
    let document = Document::from_records(records);
    let diagnostics = document.diagnostics().cloned().collect();

    tracing::debug!(
        records = document.len(),
        diagnostics = document.diagnostics().count(),
        "parsed requirements text"
    );

    (document, diagnostics)
}

/// Re-read text that must form exactly one logical line starting at `base`
pub(crate) fn parse_single_record(raw: &str, base: usize) -> Option<LineRecord> {
    let mut lines = lexer::split_lines(raw);
    if lines.len() != 1 {
        return None;
    }
    let mut record = build_record(&lines.remove(0));
    record.rebase(Delta::Grow(base));
    Some(record)
}

fn build_record(line: &LogicalLine<'_>) -> LineRecord {
    let mut diagnostics = line.diagnostics.clone();

    let kind = match lexer::classify(line) {
        LineClass::Blank => LineKind::Blank,
        LineClass::Comment => LineKind::Comment,
        LineClass::Include(directive) => match options::parse_include(line, directive) {
            Ok(include) => LineKind::Include(include),
            Err(diag) => {
                diagnostics.push(diag);
                LineKind::Comment
            }
        },
        LineClass::Option(spec) => match options::parse_option(line, spec) {
            Ok(option) => LineKind::Option(option),
            Err(diag) => {
                diagnostics.push(diag);
                LineKind::Comment
            }
        },
        LineClass::UnknownOption => {
            let (flag, _) = options::flag_and_value(line);
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnknownOption,
                flag.span,
                format!("unknown option {}", flag.value),
            ));
            LineKind::Comment
        }
        LineClass::Editable => match requirement::parse_requirement(line, true) {
            Ok(parsed) => {
                diagnostics.extend(parsed.diagnostics);
                LineKind::Requirement(Box::new(parsed.payload))
            }
            // An editable path with no derivable name is still a valid install target
            Err(RequirementError::Unnamed(_)) => {
                match options::parse_option(line, &options::EDITABLE) {
                    Ok(option) => LineKind::Option(option),
                    Err(diag) => {
                        diagnostics.push(diag);
                        LineKind::Comment
                    }
                }
            }
            Err(err) => {
                diagnostics.push(err.into_diagnostic());
                LineKind::Comment
            }
        },
        LineClass::Requirement => match requirement::parse_requirement(line, false) {
            Ok(parsed) => {
                diagnostics.extend(parsed.diagnostics);
                LineKind::Requirement(Box::new(parsed.payload))
            }
            Err(err) => {
                diagnostics.push(err.into_diagnostic());
                LineKind::Comment
            }
        },
    };

    diagnostics.sort_by_key(|diag| diag.span.start);
    LineRecord::new(kind, line.raw, line.span.start).with_diagnostics(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqtxt_core::{IncludeKind, Severity, Span};

    fn kinds(text: &str) -> Vec<&'static str> {
        parse(text).0.records().iter().map(|r| r.kind.label()).collect()
    }

    #[test]
    fn test_parse_classifies_every_line() {
        let text = "# header\n\n-r base.txt\n-c constraints.txt\n--index-url https://pypi.org/simple\nflask==2.0\n";
        assert_eq!(
            kinds(text),
            vec!["comment", "blank", "include", "include", "option", "requirement"]
        );

        let (doc, diagnostics) = parse(text);
        assert!(diagnostics.is_empty());
        assert_eq!(doc.records()[3].include().unwrap().directive, IncludeKind::Constraint);
    }

    #[test]
    fn test_invalid_lines_degrade_to_comments() {
        let (doc, diagnostics) = parse("!!!invalid\n--bogus-flag x\n-r\nflask\n");
        assert_eq!(
            doc.records().iter().map(|r| r.kind.label()).collect::<Vec<_>>(),
            vec!["comment", "comment", "comment", "requirement"]
        );
        let found: Vec<DiagnosticKind> = diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            found,
            vec![
                DiagnosticKind::InvalidRequirement,
                DiagnosticKind::UnknownOption,
                DiagnosticKind::MissingOptionValue,
            ]
        );
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_editable_without_name_is_option() {
        let (doc, diagnostics) = parse("-e .\n-e ./libs/core#egg=core\n");
        assert!(diagnostics.is_empty());

        let option = doc.records()[0].option().unwrap();
        assert_eq!(option.name, "editable");
        assert_eq!(option.value.as_ref().unwrap().value, ".");

        let req = doc.records()[1].requirement().unwrap();
        assert_eq!(req.name.value, "core");
        assert!(req.is_editable());
    }

    #[test]
    fn test_unnamed_url_is_reported() {
        let (doc, diagnostics) = parse("https://example.com/\n");
        assert_eq!(doc.records()[0].kind, LineKind::Comment);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnnamedReference);
    }

    #[test]
    fn test_parse_single_record_rebases() {
        let record = parse_single_record("flask==2.0\n", 40).unwrap();
        assert_eq!(record.span, Span::new(40, 51));
        assert_eq!(record.requirement().unwrap().name.span, Span::new(40, 45));

        assert!(parse_single_record("a\nb\n", 0).is_none());
        assert!(parse_single_record("", 0).is_none());
    }
}
