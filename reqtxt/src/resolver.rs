//! Following `-r` and `-c` includes into one merged requirement set.
//!
//! Documents are never rewritten; the resolver only reads them. All file
//! access goes through a [`FileLoader`] so callers decide where text comes
//! from.

use crate::document::Document;
use crate::env::{self, ExpandError, OnMissing};
use crate::parsers::parse;
use crate::serializer::render;
use reqtxt_core::{IncludeKind, RequirementPayload};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Source of file text for included files
pub trait FileLoader {
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl FileLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

impl<F> FileLoader for F
where
    F: Fn(&Path) -> io::Result<String>,
{
    fn load(&self, path: &Path) -> io::Result<String> {
        self(path)
    }
}

/// Which occurrence wins when a package is listed more than once
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Precedence {
    /// Included files first, then the including file's own lines; the last
    /// occurrence wins
    #[default]
    LastWins,
    /// The including file's own lines first, then its includes; the first
    /// occurrence wins
    FirstWins,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub precedence: Precedence,
    pub max_depth: usize,
    /// Expand `${VAR}` in loaded text and include paths
    pub expand: Option<OnMissing>,
    pub deadline: Option<Instant>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            precedence: Precedence::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            expand: None,
            deadline: None,
        }
    }
}

impl ResolveOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Cyclic include: {}", format_cycle(.cycle))]
    CyclicInclude { cycle: Vec<PathBuf> },

    #[error("Failed to load include {}: {source}", .path.display())]
    MissingIncludeFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Include depth limit of {limit} exceeded at {}", .path.display())]
    DepthExceeded { path: PathBuf, limit: usize },

    #[error("Resolution deadline exceeded before loading {}", .path.display())]
    DeadlineExceeded { path: PathBuf },

    #[error("Failed to expand variables in {}: {source}", .path.display())]
    Expand {
        path: PathBuf,
        #[source]
        source: ExpandError,
    },
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    let mut out = String::new();
    for (idx, path) in cycle.iter().enumerate() {
        if idx > 0 {
            out.push_str(" -> ");
        }
        let _ = write!(out, "{}", path.display());
    }
    out
}

/// A requirement and where it was found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRequirement {
    pub requirement: RequirementPayload,
    /// File the requirement came from; empty for an in-memory root
    pub source: PathBuf,
    /// Record index inside that file
    pub record: usize,
}

/// Merged view over a root file and everything it includes
#[derive(Debug, Default)]
pub struct Resolution {
    /// Keyed by normalized package name
    pub requirements: BTreeMap<String, ResolvedRequirement>,
    /// Entries from `-c` constraint files
    pub constraints: BTreeMap<String, ResolvedRequirement>,
    /// Problems confined to one include branch
    pub errors: Vec<ResolveError>,
    /// Files loaded, in visiting order
    pub files: Vec<PathBuf>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parsed documents by normalized path, for one resolution
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<PathBuf, Rc<Document>>,
}

impl DocumentCache {
    pub fn get(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Remove `.` and resolve `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Include resolver for one invocation
pub struct Resolver<'l, L: FileLoader + ?Sized> {
    loader: &'l L,
    options: ResolveOptions,
    lookup: Box<dyn Fn(&str) -> Option<String> + 'l>,
    cache: DocumentCache,
}

impl<'l, L: FileLoader + ?Sized> Resolver<'l, L> {
    pub fn new(loader: &'l L, options: ResolveOptions) -> Self {
        Self {
            loader,
            options,
            lookup: Box::new(env::env_lookup),
            cache: DocumentCache::default(),
        }
    }

    /// Use `lookup` instead of the process environment for `${VAR}`
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + 'l) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Resolve an already parsed root whose includes are relative to `base_dir`
    pub fn resolve(
        &mut self,
        root: &Document,
        base_dir: &Path,
    ) -> Result<Resolution, ResolveError> {
        let root = match self.options.expand {
            Some(on_missing) => {
                let text = env::expand(&render(root), &*self.lookup, on_missing).map_err(
                    |source| ResolveError::Expand {
                        path: PathBuf::new(),
                        source,
                    },
                )?;
                Rc::new(parse(&text).0)
            }
            None => Rc::new(root.clone()),
        };

        let mut resolution = Resolution::default();
        let mut chain = Vec::new();
        self.visit(
            &root,
            Path::new(""),
            &normalize_path(base_dir),
            IncludeKind::Reference,
            &mut chain,
            &mut resolution,
        )?;
        Ok(resolution)
    }

    /// Load, parse and resolve the file at `path`
    ///
    /// A root that cannot be loaded is an error, unlike a missing include.
    pub fn resolve_path(&mut self, path: &Path) -> Result<Resolution, ResolveError> {
        let path = normalize_path(path);
        let root = self.load(&path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut resolution = Resolution::default();
        resolution.files.push(path.clone());
        let mut chain = vec![path.clone()];
        self.visit(
            &root,
            &path,
            &base_dir,
            IncludeKind::Reference,
            &mut chain,
            &mut resolution,
        )?;
        Ok(resolution)
    }

    fn load(&mut self, path: &Path) -> Result<Rc<Document>, ResolveError> {
        if let Some(doc) = self.cache.documents.get(path) {
            tracing::trace!(path = %path.display(), "include cache hit");
            return Ok(Rc::clone(doc));
        }

        if let Some(deadline) = self.options.deadline
            && Instant::now() >= deadline
        {
            return Err(ResolveError::DeadlineExceeded {
                path: path.to_path_buf(),
            });
        }

        tracing::debug!(path = %path.display(), "loading requirements file");
        let mut text =
            self.loader
                .load(path)
                .map_err(|source| ResolveError::MissingIncludeFile {
                    path: path.to_path_buf(),
                    source,
                })?;

        if let Some(on_missing) = self.options.expand {
            text = env::expand(&text, &*self.lookup, on_missing).map_err(|source| {
                ResolveError::Expand {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        }

        let (doc, diagnostics) = parse(&text);
        if !diagnostics.is_empty() {
            tracing::debug!(
                path = %path.display(),
                count = diagnostics.len(),
                "included file has diagnostics"
            );
        }

        let doc = Rc::new(doc);
        self.cache
            .documents
            .insert(path.to_path_buf(), Rc::clone(&doc));
        Ok(doc)
    }

    fn visit(
        &mut self,
        doc: &Document,
        path: &Path,
        base_dir: &Path,
        mode: IncludeKind,
        chain: &mut Vec<PathBuf>,
        out: &mut Resolution,
    ) -> Result<(), ResolveError> {
        match self.options.precedence {
            Precedence::LastWins => {
                self.visit_includes(doc, base_dir, mode, chain, out)?;
                merge_own(doc, path, mode, Precedence::LastWins, out);
            }
            Precedence::FirstWins => {
                merge_own(doc, path, mode, Precedence::FirstWins, out);
                self.visit_includes(doc, base_dir, mode, chain, out)?;
            }
        }
        Ok(())
    }

    fn visit_includes(
        &mut self,
        doc: &Document,
        base_dir: &Path,
        mode: IncludeKind,
        chain: &mut Vec<PathBuf>,
        out: &mut Resolution,
    ) -> Result<(), ResolveError> {
        for (_, include) in doc.includes() {
            let target = match self.options.expand {
                Some(on_missing) => {
                    match env::expand(&include.target.value, &*self.lookup, on_missing) {
                        Ok(target) => target,
                        Err(source) => {
                            out.errors.push(ResolveError::Expand {
                                path: PathBuf::from(&include.target.value),
                                source,
                            });
                            continue;
                        }
                    }
                }
                None => include.target.value.clone(),
            };

            let child = normalize_path(&base_dir.join(target));

            if let Some(start) = chain.iter().position(|visited| *visited == child) {
                let mut cycle = chain[start..].to_vec();
                cycle.push(child);
                tracing::warn!(cycle = %format_cycle(&cycle), "cyclic include skipped");
                out.errors.push(ResolveError::CyclicInclude { cycle });
                continue;
            }

            if chain.len() >= self.options.max_depth {
                out.errors.push(ResolveError::DepthExceeded {
                    path: child,
                    limit: self.options.max_depth,
                });
                continue;
            }

            let child_doc = match self.load(&child) {
                Ok(doc) => doc,
                Err(err @ ResolveError::DeadlineExceeded { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping include");
                    out.errors.push(err);
                    continue;
                }
            };

            // Everything below a constraints file is a constraint too
            let child_mode = match mode {
                IncludeKind::Constraint => IncludeKind::Constraint,
                IncludeKind::Reference => include.directive,
            };
            let child_base = child.parent().map(Path::to_path_buf).unwrap_or_default();

            out.files.push(child.clone());
            chain.push(child.clone());
            let result = self.visit(&child_doc, &child, &child_base, child_mode, chain, out);
            chain.pop();
            result?;
        }
        Ok(())
    }
}

fn merge_own(
    doc: &Document,
    path: &Path,
    mode: IncludeKind,
    precedence: Precedence,
    out: &mut Resolution,
) {
    let map = match mode {
        IncludeKind::Reference => &mut out.requirements,
        IncludeKind::Constraint => &mut out.constraints,
    };

    for (record, req) in doc.requirements() {
        let resolved = ResolvedRequirement {
            requirement: req.clone(),
            source: path.to_path_buf(),
            record,
        };
        match precedence {
            Precedence::LastWins => {
                map.insert(req.normalized_name(), resolved);
            }
            Precedence::FirstWins => {
                map.entry(req.normalized_name()).or_insert(resolved);
            }
        }
    }
}

/// Resolve `root` with default options
pub fn resolve<L: FileLoader + ?Sized>(
    root: &Document,
    loader: &L,
    base_dir: &Path,
) -> Result<Resolution, ResolveError> {
    Resolver::new(loader, ResolveOptions::default()).resolve(root, base_dir)
}
