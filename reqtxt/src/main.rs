use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use reqtxt::cli::{Args, Command};
use reqtxt::output::{DiagnosticRenderer, TableRenderer};
use reqtxt::resolver::{FsLoader, ResolvedRequirement, Resolver};
use reqtxt::{Config, Diagnostic, Document, DocumentEditor, OnMissing, parse};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    args.setup_logging();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(Path::new("."))?,
    };

    match &args.command {
        Command::Check { files } => run_check(files, !args.no_color),
        Command::List { file, json } => run_list(file, *json, !args.no_color),
        Command::SetVersion {
            file,
            package,
            specifiers,
            write,
        } => run_set_version(file, package, specifiers, *write),
        Command::Resolve {
            file,
            json,
            expand,
            on_missing,
            precedence,
        } => {
            let mut options = config.resolve_options();
            if let Some(precedence) = precedence {
                options.precedence = *precedence;
            }
            if *expand {
                let on_missing = on_missing
                    .map(OnMissing::from)
                    .unwrap_or(config.resolve.on_missing);
                options.expand = Some(on_missing);
            }

            let resolution = Resolver::new(&FsLoader, options)
                .resolve_path(file)
                .with_context(|| format!("Failed to resolve {}", file.display()))?;

            if *json {
                let errors: Vec<String> = resolution.errors.iter().map(ToString::to_string).collect();
                let files: Vec<String> = resolution
                    .files
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                let report = json!({
                    "requirements": resolution.requirements.values().map(resolved_json).collect::<Vec<_>>(),
                    "constraints": resolution.constraints.values().map(resolved_json).collect::<Vec<_>>(),
                    "files": files,
                    "errors": errors,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                TableRenderer::new(!args.no_color).render_resolution(&resolution);
            }

            Ok(if resolution.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn read_document(path: &Path) -> Result<(Document, Vec<Diagnostic>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse(&text))
}

fn run_check(files: &[PathBuf], show_colors: bool) -> Result<ExitCode> {
    // Parse in parallel, report in argument order
    let parsed: Vec<(&PathBuf, Result<(Document, Vec<Diagnostic>)>)> = files
        .par_iter()
        .map(|path| (path, read_document(path)))
        .collect();

    let renderer = DiagnosticRenderer::new(show_colors);
    let mut failed = false;

    for (path, result) in parsed {
        let (document, diagnostics) = result?;
        renderer.render(path, &document, &diagnostics);
        failed |= diagnostics.iter().any(Diagnostic::is_error);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_list(file: &Path, as_json: bool, show_colors: bool) -> Result<ExitCode> {
    let (document, _) = read_document(file)?;

    if as_json {
        let entries: Vec<Value> = document
            .requirements()
            .map(|(index, req)| -> Result<Value, serde_json::Error> {
                let line = document
                    .get(index)
                    .map(|record| document.line_number(record.span.start));
                let mut entry = serde_json::to_value(req)?;
                if let Value::Object(map) = &mut entry {
                    map.insert("normalized_name".to_string(), json!(req.normalized_name()));
                    map.insert("line".to_string(), json!(line));
                }
                Ok(entry)
            })
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        TableRenderer::new(show_colors).render_document(&document);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_set_version(file: &Path, package: &str, specifiers: &str, write: bool) -> Result<ExitCode> {
    let (mut document, _) = read_document(file)?;

    DocumentEditor::new()
        .set_version(&mut document, package, specifiers)
        .with_context(|| format!("Failed to set version of {package}"))?;

    if write {
        std::fs::write(file, document.to_string())
            .with_context(|| format!("Failed to write {}", file.display()))?;
        tracing::info!(path = %file.display(), package, "updated");
    } else {
        print!("{document}");
    }

    Ok(ExitCode::SUCCESS)
}

fn resolved_json(resolved: &ResolvedRequirement) -> Value {
    let req = &resolved.requirement;
    json!({
        "name": req.name.value,
        "normalized_name": req.normalized_name(),
        "specifiers": req.specifiers.as_ref().map(ToString::to_string),
        "extras": req.extra_names(),
        "marker": req.marker.as_ref().map(|marker| marker.expression.value.clone()),
        "editable": req.is_editable(),
        "location": req.source.location().map(|location| location.value.clone()),
        "source": resolved.source.display().to_string(),
        "record": resolved.record,
    })
}
