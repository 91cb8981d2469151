use crate::document::Document;
use crate::resolver::{Resolution, ResolvedRequirement};
use colored::Colorize;
use reqtxt_core::{Diagnostic, RequirementPayload, RequirementSource, Severity};
use std::fmt::Write as _;
use std::path::Path;

/// Renders diagnostics as `path:line:col: severity: message`
pub struct DiagnosticRenderer {
    show_colors: bool,
}

impl DiagnosticRenderer {
    pub fn new(show_colors: bool) -> Self {
        Self { show_colors }
    }

    pub fn render(&self, path: &Path, document: &Document, diagnostics: &[Diagnostic]) {
        print!("{}", self.format(path, document, diagnostics));
    }

    pub fn format(&self, path: &Path, document: &Document, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for diagnostic in diagnostics {
            let (line, col) = document.line_col(diagnostic.span.start);
            let _ = writeln!(
                out,
                "{}:{line}:{col}: {}: {}",
                path.display(),
                self.format_severity(diagnostic.severity),
                diagnostic.message
            );
        }
        out
    }

    pub fn format_severity(&self, severity: Severity) -> String {
        let label = severity.to_string();
        if !self.show_colors {
            return label;
        }
        match severity {
            Severity::Error => label.red().bold().to_string(),
            Severity::Warning => label.yellow().to_string(),
        }
    }
}

/// Renders requirements in aligned columns
pub struct TableRenderer {
    show_colors: bool,
}

struct Row {
    name: String,
    spec: String,
    origin: String,
}

impl TableRenderer {
    pub fn new(show_colors: bool) -> Self {
        Self { show_colors }
    }

    pub fn render_document(&self, document: &Document) {
        print!("{}", self.format_document(document));
    }

    pub fn render_resolution(&self, resolution: &Resolution) {
        print!("{}", self.format_resolution(resolution));
    }

    /// One row per requirement, with its 1-based line number
    pub fn format_document(&self, document: &Document) -> String {
        let rows: Vec<Row> = document
            .requirements()
            .filter_map(|(index, req)| {
                let record = document.get(index)?;
                Some(Row {
                    name: display_name(req),
                    spec: describe(req),
                    origin: format!("line {}", document.line_number(record.span.start)),
                })
            })
            .collect();

        if rows.is_empty() {
            return "No requirements found.\n".to_string();
        }
        self.format_rows(&rows)
    }

    pub fn format_resolution(&self, resolution: &Resolution) -> String {
        let mut out = String::new();

        let sections = [
            ("Requirements", &resolution.requirements),
            ("Constraints", &resolution.constraints),
        ];
        for (title, entries) in sections {
            if entries.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            let heading = if self.show_colors {
                title.bold().to_string()
            } else {
                title.to_string()
            };
            let _ = writeln!(out, "{heading}:\n");
            let rows: Vec<Row> = entries.values().map(resolved_row).collect();
            out.push_str(&self.format_rows(&rows));
        }

        if out.is_empty() {
            out.push_str("No requirements found.\n");
        }

        for error in &resolution.errors {
            let label = if self.show_colors {
                "warning".yellow().to_string()
            } else {
                "warning".to_string()
            };
            let _ = writeln!(out, "{label}: {error}");
        }
        out
    }

    fn format_rows(&self, rows: &[Row]) -> String {
        let name_w = rows.iter().map(|row| row.name.len()).max().unwrap_or(0);
        let spec_w = rows.iter().map(|row| row.spec.len()).max().unwrap_or(0);

        let mut out = String::new();
        for row in rows {
            let spec = format!("{:<spec_w$}", row.spec);
            let spec = if self.show_colors && !row.spec.is_empty() {
                spec.cyan().to_string()
            } else {
                spec
            };
            let origin = if self.show_colors {
                row.origin.dimmed().to_string()
            } else {
                row.origin.clone()
            };
            let line = format!("  {:<name_w$}  {spec}  {origin}", row.name);
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out
    }
}

fn display_name(req: &RequirementPayload) -> String {
    match &req.extras {
        Some(extras) if !extras.items.is_empty() => {
            format!("{}[{}]", req.name.value, req.extra_names().join(","))
        }
        _ => req.name.value.clone(),
    }
}

/// Specifiers and marker, or the direct reference location
fn describe(req: &RequirementPayload) -> String {
    let mut text = match (&req.specifiers, &req.source) {
        (Some(clause), _) => clause.to_string(),
        (None, RequirementSource::Registry) => String::new(),
        (None, RequirementSource::Vcs { vcs, url }) => format!("{vcs}: {}", url.value),
        (None, RequirementSource::Url { url }) => url.value.clone(),
        (None, RequirementSource::Path { path }) => path.value.clone(),
    };
    if let Some(marker) = &req.marker {
        if !text.is_empty() {
            text.push(' ');
        }
        let _ = write!(text, "; {}", marker.expression.value);
    }
    if req.is_editable() {
        text.insert_str(0, "(editable) ");
    }
    text
}

fn resolved_row(resolved: &ResolvedRequirement) -> Row {
    let origin = if resolved.source.as_os_str().is_empty() {
        "<root>".to_string()
    } else {
        resolved.source.display().to_string()
    };
    Row {
        name: display_name(&resolved.requirement),
        spec: describe(&resolved.requirement),
        origin,
    }
}
