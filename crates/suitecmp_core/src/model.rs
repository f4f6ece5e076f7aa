//! Snapshot, suite-result and coverage data types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Who wrote a test suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Authored by humans; the baseline.
    Manual,
    /// Produced by an automated agent; the candidate.
    Generated,
}

impl Provenance {
    pub const ALL: [Provenance; 2] = [Provenance::Manual, Provenance::Generated];

    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Manual => "manual",
            Provenance::Generated => "generated",
        }
    }

    /// The opposite side of a comparison.
    pub fn other(self) -> Self {
        match self {
            Provenance::Manual => Provenance::Generated,
            Provenance::Generated => Provenance::Manual,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable reference to one pinned version of a library's source tree.
///
/// Module identifiers are dotted import paths (`itsdangerous.signer`), kept sorted so lookups are binary
/// searches and serialized output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    identifier: String,
    root: PathBuf,
    import_root: PathBuf,
    targets: Vec<String>,
    modules: Vec<String>,
}

impl LibrarySnapshot {
    pub fn new(
        identifier: impl Into<String>,
        root: impl Into<PathBuf>,
        import_root: impl Into<PathBuf>,
        targets: Vec<String>,
        mut modules: Vec<String>,
    ) -> Self {
        modules.sort();
        modules.dedup();
        Self {
            identifier: identifier.into(),
            root: root.into(),
            import_root: import_root.into(),
            targets,
            modules,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory placed on `PYTHONPATH` when running suites.
    pub fn import_root(&self) -> &Path {
        &self.import_root
    }

    /// Top-level packages or modules that coverage is measured for.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.binary_search_by(|m| m.as_str().cmp(module)).is_ok()
    }
}

/// Convert a Python source path, relative to the import root, into a dotted module identifier.
///
/// `pkg/__init__.py` maps to `pkg`, `pkg/sub/mod.py` to `pkg.sub.mod`. Returns `None` for non-`.py` paths and
/// for paths that escape the import root.
pub fn module_id_from_path(relative: &Path) -> Option<String> {
    if relative.extension().and_then(|e| e.to_str()) != Some("py") {
        return None;
    }

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }

    let last = parts.pop()?;
    let stem = last.strip_suffix(".py")?;
    if stem != "__init__" {
        parts.push(stem.to_string());
    }

    if parts.is_empty() { None } else { Some(parts.join(".")) }
}

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
    Skipped,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Error => "error",
            TestStatus::Skipped => "skipped",
        }
    }

    /// `Fail` and `Error` are the statuses that count against a suite.
    pub fn is_failure(self) -> bool {
        matches!(self, TestStatus::Fail | TestStatus::Error)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Runner-assigned identifier (a pytest node id such as `tests/test_a.py::TestX::test_y[1]`).
    pub id: String,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TestCaseResult {
    pub fn new(id: impl Into<String>, status: TestStatus) -> Self {
        Self {
            id: id.into(),
            status,
            reason: None,
        }
    }

    pub fn passed(id: impl Into<String>) -> Self {
        Self::new(id, TestStatus::Pass)
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(id, TestStatus::Fail).with_reason(reason)
    }

    pub fn errored(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(id, TestStatus::Error).with_reason(reason)
    }

    pub fn skipped(id: impl Into<String>) -> Self {
        Self::new(id, TestStatus::Skipped)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Covered/total counters for one module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCoverage {
    pub lines_covered: u64,
    pub lines_total: u64,
    pub branches_covered: u64,
    pub branches_total: u64,
}

impl ModuleCoverage {
    pub fn new(lines_covered: u64, lines_total: u64, branches_covered: u64, branches_total: u64) -> Self {
        Self {
            lines_covered,
            lines_total,
            branches_covered,
            branches_total,
        }
    }

    /// Line coverage in percent; `0.0` for a module with no executable lines.
    pub fn line_pct(&self) -> f64 {
        crate::metrics::percent(self.lines_covered, self.lines_total)
    }

    pub fn branch_pct(&self) -> f64 {
        crate::metrics::percent(self.branches_covered, self.branches_total)
    }

    fn absorb(&mut self, other: &ModuleCoverage) {
        self.lines_covered += other.lines_covered;
        self.lines_total += other.lines_total;
        self.branches_covered += other.branches_covered;
        self.branches_total += other.branches_total;
    }
}

/// Per-module coverage produced by one suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    modules: BTreeMap<String, ModuleCoverage>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record coverage for a module. Repeated inserts for the same module are summed.
    pub fn insert(&mut self, module: impl Into<String>, coverage: ModuleCoverage) {
        self.modules.entry(module.into()).or_default().absorb(&coverage);
    }

    pub fn get(&self, module: &str) -> Option<&ModuleCoverage> {
        self.modules.get(module)
    }

    /// Modules in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleCoverage)> {
        self.modules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Sum of every module's counters.
    pub fn totals(&self) -> ModuleCoverage {
        let mut totals = ModuleCoverage::default();
        for coverage in self.modules.values() {
            totals.absorb(coverage);
        }
        totals
    }
}

impl FromIterator<(String, ModuleCoverage)> for CoverageReport {
    fn from_iter<I: IntoIterator<Item = (String, ModuleCoverage)>>(iter: I) -> Self {
        let mut report = CoverageReport::new();
        for (module, coverage) in iter {
            report.insert(module, coverage);
        }
        report
    }
}
