//! Fixture acquisition: resolve a snapshot directory into a [`LibrarySnapshot`]
//!
//! A snapshot is a checked-out library tree. The import root is the directory that goes on `PYTHONPATH`
//! (`<root>/src` for src-layout projects, `<root>` otherwise). Coverage targets are the top-level packages and
//! modules under it, minus tests, docs and build scripts.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use suitecmp_core::{LibrarySnapshot, module_id_from_path};
use thiserror::Error;

/// Errors that abort the whole comparison
#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    #[error("snapshot `{}` is unavailable: {reason}", path.display())]
    #[diagnostic(
        code(suitecmp::fixture_unavailable),
        help("pass the root directory of a checked-out Python library")
    )]
    Unavailable { path: PathBuf, reason: String },

    #[error("snapshot `{}` has no coverage target `{target}`", path.display())]
    #[diagnostic(
        code(suitecmp::unknown_target),
        help("--cov takes an importable package or module name relative to the import root")
    )]
    UnknownTarget { path: PathBuf, target: String },
}

/// Overrides for snapshot discovery
#[derive(Debug, Clone, Default)]
pub struct FixtureOptions {
    /// Snapshot identifier (default: the directory name)
    pub name: Option<String>,
    /// Import root, relative to the snapshot root (default: `src` if present, else the root)
    pub import_root: Option<PathBuf>,
    /// Coverage targets (default: discovered top-level packages and modules)
    pub targets: Vec<String>,
}

const NON_TARGET_DIRS: &[&str] = &[
    "tests", "test", "testing", "docs", "doc", "examples", "benchmarks", "scripts", "build", "dist", "venv",
    "node_modules",
];

const NON_TARGET_FILES: &[&str] = &["setup.py", "conftest.py", "noxfile.py", "tasks.py", "fabfile.py", "manage.py"];

/// Resolve `root` into an immutable snapshot.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn acquire(root: &Path, options: &FixtureOptions) -> Result<LibrarySnapshot, FixtureError> {
    let unavailable = |reason: String| FixtureError::Unavailable {
        path: root.to_path_buf(),
        reason,
    };

    let snapshot_root = fs::canonicalize(root).map_err(|e| unavailable(e.to_string()))?;
    if !snapshot_root.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }
    fs::read_dir(&snapshot_root).map_err(|e| unavailable(format!("cannot read directory: {e}")))?;

    let identifier = match &options.name {
        Some(name) => name.clone(),
        None => snapshot_root
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| unavailable("cannot derive a snapshot name; pass --name".to_string()))?,
    };

    let import_root = match &options.import_root {
        Some(dir) => snapshot_root.join(dir),
        None => {
            let src = snapshot_root.join("src");
            if src.is_dir() { src } else { snapshot_root.clone() }
        }
    };
    let import_root = fs::canonicalize(&import_root)
        .map_err(|e| unavailable(format!("import root `{}`: {e}", import_root.display())))?;

    let targets = if options.targets.is_empty() {
        discover_targets(&import_root)
    } else {
        options.targets.clone()
    };
    if targets.is_empty() {
        return Err(unavailable(format!(
            "no importable Python packages or modules under `{}`",
            import_root.display()
        )));
    }

    let mut files = Vec::new();
    for target in &targets {
        let path = target_path(&import_root, target).ok_or_else(|| FixtureError::UnknownTarget {
            path: snapshot_root.clone(),
            target: target.clone(),
        })?;
        collect_python_files(&path, &mut files);
    }

    let modules: Vec<String> = files
        .iter()
        .filter_map(|file| file.strip_prefix(&import_root).ok())
        .filter_map(module_id_from_path)
        .collect();
    if modules.is_empty() {
        return Err(unavailable(format!("no Python modules found for targets {}", targets.join(", "))));
    }

    tracing::debug!(
        snapshot = %identifier,
        targets = targets.len(),
        modules = modules.len(),
        "snapshot acquired"
    );

    Ok(LibrarySnapshot::new(identifier, snapshot_root, import_root, targets, modules))
}

/// Top-level packages (directories with `__init__.py`) and modules under the import root.
pub fn discover_targets(import_root: &Path) -> Vec<String> {
    let mut targets = Vec::new();

    let Ok(entries) = fs::read_dir(import_root) else {
        return targets;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || name.starts_with("__") {
            continue;
        }

        if path.is_dir() {
            if !NON_TARGET_DIRS.contains(&name) && !name.starts_with("test") && path.join("__init__.py").is_file() {
                targets.push(name.to_string());
            }
        } else if let Some(stem) = name.strip_suffix(".py") {
            if !NON_TARGET_FILES.contains(&name) && !stem.starts_with("test_") && !stem.ends_with("_test") {
                targets.push(stem.to_string());
            }
        }
    }

    targets.sort();
    targets
}

/// `pkg.sub` -> `<import_root>/pkg/sub` (package) or `<import_root>/pkg/sub.py` (module).
fn target_path(import_root: &Path, target: &str) -> Option<PathBuf> {
    if target.is_empty() || target.split('.').any(|part| part.is_empty() || part == "..") {
        return None;
    }

    let relative: PathBuf = target.split('.').collect();
    let package = import_root.join(&relative);
    if package.is_dir() {
        return Some(package);
    }

    let module = package.with_extension("py");
    if module.is_file() { Some(module) } else { None }
}

/// Collect `.py` files under `path` (or `path` itself), skipping hidden and cache directories.
pub(crate) fn collect_python_files(path: &Path, files: &mut Vec<PathBuf>) {
    if path.is_file() {
        if path.extension().is_some_and(|e| e == "py") {
            files.push(path.to_path_buf());
        }
        return;
    }

    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            let name = entry_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "__pycache__" {
                continue;
            }
            collect_python_files(&entry_path, files);
        }
    }
}
