use reqtxt_core::{
    Diagnostic, IncludePayload, LineRecord, RequirementPayload, Span, normalize_name,
};
use serde::Serialize;
use thiserror::Error;

/// An ordered sequence of line records covering a requirements file
///
/// Records are contiguous: the first starts at offset 0 and each one starts
/// where the previous ended, so rendering is plain concatenation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    records: Vec<LineRecord>,
}

/// A broken record layout, found by [`Document::check_coverage`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoverageError {
    #[error("Record {index} starts at {found}, expected {expected}")]
    Gap {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Record {index} spans {span} but holds {len} bytes")]
    LengthMismatch { index: usize, span: Span, len: usize },

    #[error("Record {index} has a field at {span} outside the record")]
    FieldOutside { index: usize, span: Span },

    #[error("Record {index} has overlapping fields at {first} and {second}")]
    FieldsOverlap {
        index: usize,
        first: Span,
        second: Span,
    },
}

impl Document {
    pub fn from_records(records: Vec<LineRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&LineRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Length of the text this document renders to
    pub fn text_len(&self) -> usize {
        self.records.last().map_or(0, |record| record.span.end)
    }

    /// Records matching `predicate`, with their index
    pub fn find<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = (usize, &'a LineRecord)>
    where
        P: Fn(&LineRecord) -> bool + 'a,
    {
        self.records
            .iter()
            .enumerate()
            .filter(move |(_, record)| predicate(record))
    }

    /// Index of the first requirement named `name` (PEP 503 comparison)
    pub fn position(&self, name: &str) -> Option<usize> {
        let wanted = normalize_name(name);
        self.records.iter().position(|record| {
            record
                .requirement()
                .is_some_and(|req| req.normalized_name() == wanted)
        })
    }

    pub fn find_requirement(&self, name: &str) -> Option<&RequirementPayload> {
        self.position(name)
            .and_then(|index| self.records[index].requirement())
    }

    /// Requirements with their record index, in document order
    pub fn requirements(&self) -> impl Iterator<Item = (usize, &RequirementPayload)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| record.requirement().map(|req| (index, req)))
    }

    pub fn includes(&self) -> impl Iterator<Item = (usize, &IncludePayload)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| record.include().map(|include| (index, include)))
    }

    /// Every record's diagnostics, in document order
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().flat_map(|record| record.diagnostics.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(LineRecord::has_errors)
    }

    /// Line terminator used by the first terminated record, `\n` by default
    pub fn line_ending(&self) -> &'static str {
        self.records
            .iter()
            .map(LineRecord::terminator)
            .find(|terminator| !terminator.is_empty())
            .map_or("\n", |terminator| {
                if terminator == "\r\n" { "\r\n" } else { "\n" }
            })
    }

    /// 1-based physical line number of a byte offset
    pub fn line_number(&self, offset: usize) -> usize {
        self.line_col(offset).0
    }

    /// 1-based line and column of a byte offset
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut line_start = 0;

        for record in &self.records {
            if record.span.start > offset {
                break;
            }
            let upto = offset.min(record.span.end) - record.span.start;
            for (idx, byte) in record.raw.as_bytes()[..upto].iter().enumerate() {
                if *byte == b'\n' {
                    line += 1;
                    line_start = record.span.start + idx + 1;
                }
            }
        }

        (line, offset - line_start + 1)
    }

    /// Verify records tile the text and every field sits inside its record
    pub fn check_coverage(&self) -> Result<(), CoverageError> {
        let mut expected = 0;

        for (index, record) in self.records.iter().enumerate() {
            if record.span.start != expected {
                return Err(CoverageError::Gap {
                    index,
                    expected,
                    found: record.span.start,
                });
            }
            if record.span.len() != record.raw.len() {
                return Err(CoverageError::LengthMismatch {
                    index,
                    span: record.span,
                    len: record.raw.len(),
                });
            }

            if let Some(req) = record.requirement() {
                let spans = req.field_spans();
                for span in spans.iter().chain(&[req.body, req.name.span]) {
                    if !record.span.encloses(*span) {
                        return Err(CoverageError::FieldOutside { index, span: *span });
                    }
                }
                for pair in spans.windows(2) {
                    if pair[0].end > pair[1].start {
                        return Err(CoverageError::FieldsOverlap {
                            index,
                            first: pair[0],
                            second: pair[1],
                        });
                    }
                }
            }

            expected = record.span.end;
        }

        Ok(())
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> Option<&mut LineRecord> {
        self.records.get_mut(index)
    }

    /// Records from `index` on, for the editor to rebase after a change
    pub(crate) fn records_from_mut(&mut self, index: usize) -> &mut [LineRecord] {
        let start = index.min(self.records.len());
        &mut self.records[start..]
    }

    /// Insert `record` after `index` (or first)
    ///
    /// Later records keep their spans; the caller rebases them.
    pub(crate) fn insert_after(&mut self, index: Option<usize>, record: LineRecord) {
        let position = index.map_or(0, |idx| idx + 1);
        self.records.insert(position, record);
    }

    /// Remove a record, leaving later spans to the caller
    pub(crate) fn remove(&mut self, index: usize) -> LineRecord {
        self.records.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse;
    use reqtxt_core::{Delta, Rebase};

    const SAMPLE: &str = "# deps\nDjango>=3.2\n-r base.txt\nzope.interface==5.0  # z\n";

    #[test]
    fn test_find_is_normalized() {
        let (doc, _) = parse(SAMPLE);
        assert_eq!(doc.position("django"), Some(1));
        assert_eq!(doc.position("Zope_Interface"), Some(3));
        assert_eq!(doc.position("flask"), None);
        assert_eq!(doc.find_requirement("DJANGO").unwrap().name.value, "Django");
    }

    #[test]
    fn test_iterators() {
        let (doc, _) = parse(SAMPLE);
        let names: Vec<&str> = doc.requirements().map(|(_, req)| req.name.as_str()).collect();
        assert_eq!(names, vec!["Django", "zope.interface"]);
        assert_eq!(doc.includes().map(|(idx, _)| idx).collect::<Vec<_>>(), vec![2]);
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.text_len(), SAMPLE.len());
    }

    #[test]
    fn test_find_with_predicate() {
        let (doc, _) = parse(SAMPLE);
        let commented: Vec<usize> = doc
            .find(|record| {
                record
                    .requirement()
                    .is_some_and(|req| req.comment.is_some())
            })
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(commented, vec![3]);
        assert_eq!(doc.find(|record| record.raw.is_empty()).count(), 0);
    }

    #[test]
    fn test_line_col() {
        let (doc, _) = parse(SAMPLE);
        assert_eq!(doc.line_col(0), (1, 1));
        assert_eq!(doc.line_col(7), (2, 1));
        assert_eq!(doc.line_col(13), (2, 7));
        assert_eq!(doc.line_number(20), 3);
    }

    #[test]
    fn test_line_ending_detection() {
        let (doc, _) = parse("a\r\nb\r\n");
        assert_eq!(doc.line_ending(), "\r\n");
        let (doc, _) = parse("a");
        assert_eq!(doc.line_ending(), "\n");
    }

    #[test]
    fn test_coverage_of_parsed_document() {
        let (doc, _) = parse(SAMPLE);
        assert!(doc.check_coverage().is_ok());
        assert!(Document::default().check_coverage().is_ok());
    }

    #[test]
    fn test_coverage_detects_gap() {
        let (doc, _) = parse("a\nb\n");
        let mut records = doc.records().to_vec();
        records[1].rebase(Delta::Grow(1));
        let broken = Document::from_records(records);
        assert_eq!(
            broken.check_coverage(),
            Err(CoverageError::Gap {
                index: 1,
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_insert_and_remove_leave_spans_alone() {
        let (mut doc, _) = parse("a\nc\n");
        let (inserted, _) = parse("b\n");
        let mut record = inserted.records()[0].clone();
        record.rebase(Delta::Grow(2));

        doc.insert_after(Some(0), record);
        assert_eq!(doc.records()[2].span, Span::new(2, 4));
        assert_eq!(
            doc.check_coverage(),
            Err(CoverageError::Gap {
                index: 2,
                expected: 4,
                found: 2
            })
        );

        for record in doc.records_from_mut(2) {
            record.rebase(Delta::Grow(2));
        }
        assert!(doc.check_coverage().is_ok());

        let removed = doc.remove(0);
        assert_eq!(removed.raw, "a\n");
        assert_eq!(doc.records()[0].span, Span::new(2, 4));
        assert!(doc.records_from_mut(5).is_empty());
    }
}
