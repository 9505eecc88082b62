#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use miette::{NamedSource, Report};
use rayon::prelude::*;
use scopecheck_ast::SourceUnit;
use scopecheck_core::SourceInput;
use scopecheck_parse::{parse_source_with_recovery, ParseError};
use tracing::{debug, warn};

pub fn is_kotlin_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("kt") | Some("kts")
    )
}

/// Kotlin sources under `paths`, sorted. Files named explicitly are kept
/// whatever their extension.
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let files = Mutex::new(Vec::new());

    rayon::scope(|s| {
        for path in paths {
            if path.is_file() {
                if let Ok(mut guard) = files.lock() {
                    guard.push(path.clone());
                }
            } else if path.is_dir() {
                let files = &files;
                s.spawn(move |s| collect_dir(s, path.clone(), files));
            } else {
                warn!("No such file or directory: {}", path.display());
            }
        }
    });

    let mut files = files.into_inner().unwrap_or_else(|e| e.into_inner());
    files.sort();
    files.dedup();
    files
}

fn collect_dir<'s>(scope: &rayon::Scope<'s>, dir: PathBuf, files: &'s Mutex<Vec<PathBuf>>) {
    let entries = match fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(kind) = entry.file_type() else {
            continue;
        };
        if kind.is_dir() {
            scope.spawn(move |s| collect_dir(s, path, files));
        } else if kind.is_file() && is_kotlin_file(&path) {
            if let Ok(mut guard) = files.lock() {
                guard.push(path);
            }
        }
    }
}

/// Parsed files of one run with their text kept for rendering.
#[derive(Debug, Default)]
pub struct Loaded {
    inputs: Vec<SourceInput>,
    sources: HashMap<String, String>,
    /// Recovered syntax errors, with source attached; the units are still analyzed.
    pub parse_errors: Vec<Report>,
    /// Files that could not be read or tokenized.
    pub failures: Vec<Report>,
}

impl Loaded {
    pub fn inputs(&self) -> &[SourceInput] {
        &self.inputs
    }

    pub fn source(&self, path: &str) -> Option<&str> {
        self.sources.get(path).map(String::as_str)
    }

    /// Number of files that parsed.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    fn push(&mut self, file: LoadedFile) {
        for err in file.parse_errors {
            self.parse_errors.push(
                Report::new(err)
                    .with_source_code(NamedSource::new(file.path.clone(), file.source.clone())),
            );
        }
        self.inputs.push(SourceInput::new(file.path.clone(), file.unit));
        self.sources.insert(file.path, file.source);
    }
}

struct LoadedFile {
    path: String,
    source: String,
    unit: SourceUnit,
    parse_errors: Vec<ParseError>,
}

pub fn load_files(paths: &[PathBuf]) -> Loaded {
    let results: Vec<Result<LoadedFile, Report>> = paths.par_iter().map(|p| load_file(p)).collect();
    let mut loaded = Loaded::default();
    for result in results {
        match result {
            Ok(file) => loaded.push(file),
            Err(report) => loaded.failures.push(report),
        }
    }
    loaded
}

fn load_file(path: &Path) -> Result<LoadedFile, Report> {
    let name = path.display().to_string();
    let source = fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read {}: {}", name, e);
        miette::miette!("failed to read {name}: {e}")
    })?;
    let (unit, parse_errors) = parse_source_with_recovery(&source)
        .map_err(|e| e.with_source_code(NamedSource::new(name.clone(), source.clone())))?;
    if !parse_errors.is_empty() {
        warn!("{}: {} syntax error(s), analyzing what parsed", name, parse_errors.len());
    }
    debug!("Parsed {} ({} declaration(s))", name, unit.decls.len());
    Ok(LoadedFile {
        path: name,
        source,
        unit,
        parse_errors,
    })
}
