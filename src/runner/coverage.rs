//! Read coverage.py's JSON report (`--cov-report=json:<path>`) into a [`CoverageReport`]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use suitecmp_core::{CoverageReport, ModuleCoverage, module_id_from_path};

#[derive(Debug, Deserialize)]
struct CoverageJson {
    files: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    summary: FileSummary,
}

/// Branch fields are absent unless the run used `--cov-branch`.
#[derive(Debug, Deserialize)]
struct FileSummary {
    covered_lines: u64,
    num_statements: u64,
    #[serde(default)]
    covered_branches: u64,
    #[serde(default)]
    num_branches: u64,
}

/// A parsed coverage.py report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCoverage {
    pub report: CoverageReport,
    /// Measured files outside the import root, spelled as coverage.py reported them.
    pub outside: Vec<String>,
}

/// Parse coverage.py JSON into per-module coverage.
///
/// File keys are absolute, or relative to `work_dir` (pytest's working directory). Files outside
/// `import_root` are returned in [`ParsedCoverage::outside`]; non-Python files under it are dropped.
pub fn parse_coverage_json(json: &str, import_root: &Path, work_dir: &Path) -> Result<ParsedCoverage, String> {
    let parsed: CoverageJson = serde_json::from_str(json).map_err(|e| format!("invalid coverage JSON: {e}"))?;

    let mut coverage = ParsedCoverage::default();
    for (file, entry) in parsed.files {
        let Some(relative) = relative_to_root(Path::new(&file), import_root, work_dir) else {
            tracing::debug!(file = %file, "coverage entry outside the import root");
            coverage.outside.push(file);
            continue;
        };
        let Some(module) = module_id_from_path(&relative) else {
            tracing::debug!(file = %file, "coverage entry is not a Python module");
            continue;
        };
        let s = entry.summary;
        coverage.report.insert(
            module,
            ModuleCoverage::new(s.covered_lines, s.num_statements, s.covered_branches, s.num_branches),
        );
    }
    Ok(coverage)
}

/// Load and parse the coverage JSON written by a run.
pub fn load_coverage_json(path: &Path, import_root: &Path, work_dir: &Path) -> Result<ParsedCoverage, String> {
    let json = fs::read_to_string(path).map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;
    parse_coverage_json(&json, import_root, work_dir)
}

fn relative_to_root(file: &Path, import_root: &Path, work_dir: &Path) -> Option<PathBuf> {
    let absolute: PathBuf = if file.is_absolute() {
        file.to_path_buf()
    } else {
        work_dir.join(file)
    };

    if let Ok(relative) = absolute.strip_prefix(import_root) {
        return Some(relative.to_path_buf());
    }
    // Symlinked temp dirs: coverage.py may report the non-canonical spelling.
    let canonical = fs::canonicalize(&absolute).ok()?;
    canonical.strip_prefix(import_root).ok().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "meta": {"version": "7.5.1", "branch_coverage": true, "show_contexts": false},
        "files": {
            "/work/lib/src/itsdangerous/__init__.py": {
                "executed_lines": [1, 2],
                "summary": {"covered_lines": 2, "num_statements": 2, "percent_covered": 100.0,
                            "missing_lines": 0, "excluded_lines": 0, "num_branches": 0,
                            "num_partial_branches": 0, "covered_branches": 0, "missing_branches": 0}
            },
            "/work/lib/src/itsdangerous/signer.py": {
                "executed_lines": [1, 2, 3],
                "summary": {"covered_lines": 90, "num_statements": 100, "percent_covered": 88.0,
                            "missing_lines": 10, "excluded_lines": 0, "num_branches": 20,
                            "num_partial_branches": 2, "covered_branches": 16, "missing_branches": 4}
            },
            "/somewhere/else/plugin.py": {
                "executed_lines": [],
                "summary": {"covered_lines": 0, "num_statements": 5}
            }
        },
        "totals": {"covered_lines": 92, "num_statements": 107}
    }"#;

    #[test]
    fn test_parses_modules_under_import_root() {
        let parsed = parse_coverage_json(SAMPLE, Path::new("/work/lib/src"), Path::new("/work/out/tests")).unwrap();
        assert_eq!(parsed.report.len(), 2);
        assert_eq!(parsed.report.get("itsdangerous"), Some(&ModuleCoverage::new(2, 2, 0, 0)));
        assert_eq!(parsed.report.get("itsdangerous.signer"), Some(&ModuleCoverage::new(90, 100, 16, 20)));
        assert_eq!(parsed.outside, ["/somewhere/else/plugin.py"]);
    }

    #[test]
    fn test_installed_copy_is_reported_outside() {
        let json = r#"{"files": {
            "/usr/lib/python3/site-packages/decouple.py": {"summary": {"covered_lines": 90, "num_statements": 100}}
        }}"#;
        let parsed =
            parse_coverage_json(json, Path::new("/work/python-decouple"), Path::new("/work/out/tests")).unwrap();
        assert!(parsed.report.is_empty());
        assert_eq!(parsed.outside, ["/usr/lib/python3/site-packages/decouple.py"]);
    }

    #[test]
    fn test_non_python_file_under_root_is_dropped_silently() {
        let json = r#"{"files": {"/lib/templates/page.html": {"summary": {"covered_lines": 1, "num_statements": 1}}}}"#;
        let parsed = parse_coverage_json(json, Path::new("/lib"), Path::new("/lib")).unwrap();
        assert!(parsed.report.is_empty());
        assert!(parsed.outside.is_empty());
    }

    #[test]
    fn test_missing_branch_fields_default_to_zero() {
        let json = r#"{"files": {"decouple.py": {"summary": {"covered_lines": 3, "num_statements": 4}}}}"#;
        let parsed = parse_coverage_json(json, Path::new("/lib"), Path::new("/lib")).unwrap();
        assert_eq!(parsed.report.get("decouple"), Some(&ModuleCoverage::new(3, 4, 0, 0)));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = parse_coverage_json("{\"totals\": {}}", Path::new("/lib"), Path::new("/lib")).unwrap_err();
        assert!(err.starts_with("invalid coverage JSON"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_coverage_json(&dir.path().join("coverage.json"), dir.path(), dir.path()).unwrap_err();
        assert!(err.contains("cannot read"));
    }
}
