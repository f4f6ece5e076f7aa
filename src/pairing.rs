//! Suite pairing: attach exactly one manual and one generated suite to a snapshot
//!
//! A suite that cannot be loaded does not stop pairing. Its side carries a [`SuiteError`] and is later reported
//! as unavailable. Only problems with the pairing itself (bad or duplicate labels, both suites in one
//! directory) are fatal.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use suitecmp_core::{LibrarySnapshot, Provenance};
use thiserror::Error;

use crate::fixture::collect_python_files;
use crate::runner::SuiteError;

/// Errors that make a pairing invalid
#[derive(Debug, Error, Diagnostic)]
pub enum PairingError {
    #[error("invalid suite label `{0}`")]
    #[diagnostic(
        code(suitecmp::invalid_label),
        help("labels name output directories: use letters, digits, `.`, `_` or `-`")
    )]
    InvalidLabel(String),

    #[error("both suites use the label `{0}`")]
    #[diagnostic(code(suitecmp::duplicate_label), help("give each suite its own label"))]
    DuplicateLabel(String),

    #[error("manual and generated suites are the same directory `{}`", .0.display())]
    #[diagnostic(code(suitecmp::same_directory))]
    SameDirectory(PathBuf),
}

/// Where a suite lives and what to call it
#[derive(Debug, Clone)]
pub struct SuiteSpec {
    pub label: String,
    pub root: PathBuf,
}

impl SuiteSpec {
    pub fn new(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: root.into(),
        }
    }
}

/// A loaded test suite, tied to one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    label: String,
    provenance: Provenance,
    snapshot: String,
    root: PathBuf,
    files: Vec<PathBuf>,
    test_loc: usize,
}

impl TestSuite {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Identifier of the snapshot this suite was paired with
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// Canonical suite directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Test files, sorted
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Non-blank, non-comment lines across every `.py` file in the suite
    pub fn test_loc(&self) -> usize {
        self.test_loc
    }
}

/// One side of a pairing: its label and the suite, or why it could not be loaded
#[derive(Debug, Clone)]
pub struct PairedSide {
    pub label: String,
    pub provenance: Provenance,
    pub suite: Result<TestSuite, SuiteError>,
}

impl PairedSide {
    /// Lines of test code, or zero when the suite did not load
    pub fn test_loc(&self) -> usize {
        self.suite.as_ref().map_or(0, TestSuite::test_loc)
    }
}

/// The manual/generated pair for one snapshot
#[derive(Debug, Clone)]
pub struct SuitePair {
    pub manual: PairedSide,
    pub generated: PairedSide,
}

impl SuitePair {
    pub fn side(&self, provenance: Provenance) -> &PairedSide {
        match provenance {
            Provenance::Manual => &self.manual,
            Provenance::Generated => &self.generated,
        }
    }
}

/// Pair a manual and a generated suite with `snapshot`.
#[tracing::instrument(skip_all, fields(snapshot = %snapshot.identifier()))]
pub fn pair(snapshot: &LibrarySnapshot, manual: SuiteSpec, generated: SuiteSpec) -> Result<SuitePair, PairingError> {
    for label in [&manual.label, &generated.label] {
        validate_label(label)?;
    }
    if manual.label == generated.label {
        return Err(PairingError::DuplicateLabel(manual.label));
    }
    if let (Ok(a), Ok(b)) = (fs::canonicalize(&manual.root), fs::canonicalize(&generated.root)) {
        if a == b {
            return Err(PairingError::SameDirectory(a));
        }
    }

    Ok(SuitePair {
        manual: load_side(snapshot, manual, Provenance::Manual),
        generated: load_side(snapshot, generated, Provenance::Generated),
    })
}

fn validate_label(label: &str) -> Result<(), PairingError> {
    let valid = !label.is_empty()
        && label != "."
        && label != ".."
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(PairingError::InvalidLabel(label.to_string()))
    }
}

fn load_side(snapshot: &LibrarySnapshot, spec: SuiteSpec, provenance: Provenance) -> PairedSide {
    let suite = load_suite(snapshot, &spec, provenance);
    match &suite {
        Ok(s) => tracing::debug!(
            suite = %spec.label,
            files = s.files().len(),
            test_loc = s.test_loc(),
            "suite loaded"
        ),
        Err(e) => tracing::warn!(suite = %spec.label, error = %e, "suite unavailable"),
    }
    PairedSide {
        label: spec.label,
        provenance,
        suite,
    }
}

fn load_suite(snapshot: &LibrarySnapshot, spec: &SuiteSpec, provenance: Provenance) -> Result<TestSuite, SuiteError> {
    let missing = || SuiteError::Missing {
        label: spec.label.clone(),
        path: spec.root.clone(),
    };
    let root = fs::canonicalize(&spec.root).map_err(|_| missing())?;
    if !root.is_dir() {
        return Err(missing());
    }

    let mut sources = Vec::new();
    collect_python_files(&root, &mut sources);
    sources.sort();

    let files: Vec<PathBuf> = sources.iter().filter(|p| is_test_file(p)).cloned().collect();
    if files.is_empty() {
        return Err(SuiteError::NoTests {
            label: spec.label.clone(),
            path: root,
        });
    }

    Ok(TestSuite {
        label: spec.label.clone(),
        provenance,
        snapshot: snapshot.identifier().to_string(),
        root,
        files,
        test_loc: count_test_loc(&sources),
    })
}

/// pytest's default discovery pattern: `test_*.py` or `*_test.py`.
pub fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".py") && (name.starts_with("test_") || name.ends_with("_test.py"))
}

/// Count non-blank lines that are not `#` comments.
pub fn count_test_loc(files: &[PathBuf]) -> usize {
    files
        .iter()
        .filter_map(|file| match fs::read_to_string(file) {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable file in LOC count");
                None
            }
        })
        .map(|source| {
            source
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .count()
        })
        .sum()
}
