//! Rendering a document back to text.
//!
//! Every record keeps its exact source text, so rendering an unedited
//! document reproduces the input byte for byte.

use crate::document::Document;
use std::fmt;
use std::io::{self, Write};

/// Concatenate the raw text of every record
pub fn render(document: &Document) -> String {
    let mut out = String::with_capacity(document.text_len());
    for record in document.records() {
        out.push_str(&record.raw);
    }
    out
}

/// Stream the rendered text into a writer
pub fn write_to<W: Write>(document: &Document, mut writer: W) -> io::Result<()> {
    for record in document.records() {
        writer.write_all(record.raw.as_bytes())?;
    }
    writer.flush()
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in self.records() {
            f.write_str(&record.raw)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse;

    #[test]
    fn test_render_is_lossless() {
        let inputs = [
            "",
            "flask",
            "flask\n",
            "  # indented comment\r\n\r\nDjango >= 3.2 , < 4  ; python_version<'3.12'   # web\r\n",
            "pkg==1.0 \\\n    --hash=sha256:aa \\\n    --hash=sha256:bb\n",
            "!!!invalid\n--bogus\n-r\ntrailing \\",
            "\u{feff}flask\n",
        ];
        for input in inputs {
            let (doc, _) = parse(input);
            assert_eq!(render(&doc), input);
            assert_eq!(doc.to_string(), input);
        }
    }

    #[test]
    fn test_write_to_buffer() {
        let (doc, _) = parse("a==1\nb==2\n");
        let mut buf = Vec::new();
        write_to(&doc, &mut buf).unwrap();
        assert_eq!(buf, b"a==1\nb==2\n");
    }
}
