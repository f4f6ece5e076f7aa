//! Production executor: `python -m pytest` with `pytest-cov`

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use suitecmp_core::LibrarySnapshot;
use tokio::process::Command;

use super::coverage::load_coverage_json;
use super::interfaces::{SuiteError, SuiteExecutor, SuiteRun};
use super::outcome::parse_pytest_output;
use crate::config::RunnerConfig;
use crate::pairing::TestSuite;

/// File names written inside a suite's work directory.
pub const COVERAGE_JSON: &str = "coverage.json";
pub const COVERAGE_HTML_DIR: &str = "htmlcov";
pub const COVERAGE_DATA: &str = ".coverage";
pub const PYTEST_LOG: &str = "pytest.log";

/// Lines of tool output kept in a toolchain error.
const DETAIL_TAIL_LINES: usize = 20;

/// Runs suites with pytest and pytest-cov.
#[derive(Debug, Clone, Default)]
pub struct PytestExecutor {
    config: RunnerConfig,
}

impl PytestExecutor {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }
}

impl SuiteExecutor for PytestExecutor {
    #[tracing::instrument(skip_all, fields(suite = %suite.label(), snapshot = %snapshot.identifier()))]
    async fn execute(
        &self,
        snapshot: &LibrarySnapshot,
        suite: &TestSuite,
        work_dir: &Path,
    ) -> Result<SuiteRun, SuiteError> {
        let label = suite.label().to_string();
        if suite.snapshot() != snapshot.identifier() {
            return Err(SuiteError::SnapshotMismatch {
                label,
                expected: suite.snapshot().to_string(),
                actual: snapshot.identifier().to_string(),
            });
        }

        let io_error = |path: &Path, e: std::io::Error| SuiteError::Io {
            label: label.clone(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        fs::create_dir_all(work_dir).map_err(|e| io_error(work_dir, e))?;
        let work_dir = fs::canonicalize(work_dir).map_err(|e| io_error(work_dir, e))?;
        let coverage_json = work_dir.join(COVERAGE_JSON);
        if coverage_json.exists() {
            fs::remove_file(&coverage_json).map_err(|e| io_error(&coverage_json, e))?;
        }

        let args = pytest_args(snapshot, suite, &work_dir, &self.config);
        tracing::debug!(python = %self.config.python, args = ?args, "starting pytest");

        let mut command = Command::new(&self.config.python);
        command
            .args(&args)
            .current_dir(&work_dir)
            .env("PYTHONPATH", python_path(snapshot.import_root(), env::var_os("PYTHONPATH")))
            .env("COVERAGE_FILE", work_dir.join(COVERAGE_DATA))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let child = command.spawn().map_err(|e| SuiteError::Spawn {
            label: label.clone(),
            program: self.config.python.clone(),
            reason: e.to_string(),
        })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| io_error(&work_dir, e))?,
            Err(_) => {
                return Err(SuiteError::Timeout {
                    label,
                    timeout: self.config.timeout,
                });
            }
        };
        let duration = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let log_path = work_dir.join(PYTEST_LOG);
        if let Err(e) = fs::write(&log_path, format!("{stdout}{stderr}")) {
            tracing::warn!(path = %log_path.display(), error = %e, "could not write pytest log");
        }

        classify_exit(&label, output.status.code(), &stdout, &stderr)?;

        let results = parse_pytest_output(&stdout);
        if results.is_empty() {
            return Err(SuiteError::NoResults { label: label.clone() });
        }

        let parsed = load_coverage_json(&coverage_json, snapshot.import_root(), &work_dir)
            .map_err(|reason| SuiteError::Coverage {
                label: label.clone(),
                reason,
            })?;

        tracing::info!(
            cases = results.len(),
            modules = parsed.report.len(),
            outside = parsed.outside.len(),
            elapsed_ms = duration.as_millis() as u64,
            "suite finished"
        );

        Ok(SuiteRun {
            results,
            coverage: parsed.report,
            outside_snapshot: parsed.outside,
            duration,
        })
    }
}

/// Arguments after the interpreter: `-m pytest <suite> ... --cov=<target>...`.
pub fn pytest_args(snapshot: &LibrarySnapshot, suite: &TestSuite, work_dir: &Path, config: &RunnerConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-m".into(), "pytest".into(), suite.root().into()];
    args.extend(["-v", "-rA", "--tb=short", "-p", "no:cacheprovider"].map(OsString::from));

    let mut rootdir = OsString::from("--rootdir=");
    rootdir.push(suite.root());
    args.push(rootdir);

    for target in snapshot.targets() {
        args.push(format!("--cov={target}").into());
    }
    if config.branch_coverage {
        args.push("--cov-branch".into());
    }

    let mut json = OsString::from("--cov-report=json:");
    json.push(work_dir.join(COVERAGE_JSON));
    args.push(json);
    let mut html = OsString::from("--cov-report=html:");
    html.push(work_dir.join(COVERAGE_HTML_DIR));
    args.push(html);

    args.extend(config.extra_args.iter().map(OsString::from));
    args
}

/// `import_root` first, then whatever `PYTHONPATH` already held.
fn python_path(import_root: &Path, existing: Option<OsString>) -> OsString {
    let mut paths: Vec<PathBuf> = vec![import_root.to_path_buf()];
    if let Some(existing) = existing {
        paths.extend(env::split_paths(&existing).filter(|p| !p.as_os_str().is_empty()));
    }
    // Only fails if a path contains the separator; fall back to the import root alone.
    env::join_paths(&paths).unwrap_or_else(|_| import_root.as_os_str().to_os_string())
}

/// Map pytest's exit status onto success or a [`SuiteError`].
///
/// Exit code 1 means some tests failed; those failures are results, not errors.
pub fn classify_exit(label: &str, code: Option<i32>, stdout: &str, stderr: &str) -> Result<(), SuiteError> {
    let meaning = match code {
        Some(0 | 1) => return Ok(()),
        None => {
            return Err(SuiteError::Killed {
                label: label.to_string(),
            });
        }
        Some(2) => "interrupted: errors during collection",
        Some(3) => "internal error",
        Some(4) => "usage error (is pytest-cov installed?)",
        Some(5) => "no tests collected",
        Some(_) => "unexpected exit status",
    };

    Err(SuiteError::Toolchain {
        label: label.to_string(),
        code: code.unwrap_or(-1),
        meaning,
        detail: output_tail(stdout, stderr),
    })
}

fn output_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(DETAIL_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::{SuiteSpec, pair};

    fn fixture() -> (tempfile::TempDir, LibrarySnapshot, TestSuite) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("tests/test_env.py"), "def test_a():\n    pass\n").unwrap();
        let snapshot = LibrarySnapshot::new("decouple", &root, &root, vec!["decouple".into()], vec!["decouple".into()]);
        let pair = pair(
            &snapshot,
            SuiteSpec::new("tests", root.join("tests")),
            SuiteSpec::new("tests-ai", root.join("tests-ai")),
        )
        .unwrap();
        let suite = pair.manual.suite.unwrap();
        (dir, snapshot, suite)
    }

    #[test]
    fn test_pytest_args_include_coverage_targets_and_reports() {
        let (_dir, snapshot, suite) = fixture();
        let work = Path::new("/out/tests");
        let config = RunnerConfig::new().with_extra_args(["-x".to_string()]);
        let args: Vec<String> = pytest_args(&snapshot, &suite, work, &config)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "-m");
        assert_eq!(args[1], "pytest");
        assert_eq!(args[2], suite.root().to_string_lossy());
        assert!(args.contains(&"--cov=decouple".to_string()));
        assert!(args.contains(&"--cov-branch".to_string()));
        assert!(args.contains(&"--cov-report=json:/out/tests/coverage.json".to_string()));
        assert!(args.contains(&"--cov-report=html:/out/tests/htmlcov".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-x"));
    }

    #[test]
    fn test_pytest_args_without_branch_coverage() {
        let (_dir, snapshot, suite) = fixture();
        let config = RunnerConfig::new().with_branch_coverage(false);
        let args = pytest_args(&snapshot, &suite, Path::new("/out"), &config);
        assert!(!args.iter().any(|a| a == "--cov-branch"));
    }

    #[test]
    fn test_classify_exit_codes() {
        assert!(classify_exit("tests", Some(0), "", "").is_ok());
        assert!(classify_exit("tests", Some(1), "", "").is_ok());
        assert!(matches!(classify_exit("tests", None, "", ""), Err(SuiteError::Killed { .. })));

        let err = classify_exit("tests-ai", Some(2), "ERROR collecting tests-ai/test_x.py\nImportError: nope\n", "")
            .unwrap_err();
        match err {
            SuiteError::Toolchain {
                code, meaning, detail, ..
            } => {
                assert_eq!(code, 2);
                assert_eq!(meaning, "interrupted: errors during collection");
                assert!(detail.ends_with("ImportError: nope"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_output_tail_keeps_last_lines() {
        let stdout: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let tail = output_tail(&stdout, "stderr line\n");
        assert_eq!(tail.lines().count(), DETAIL_TAIL_LINES);
        assert!(tail.ends_with("stderr line"));
        assert!(tail.starts_with("line 31"));
    }

    #[test]
    fn test_python_path_prepends_import_root() {
        let existing = env::join_paths(["/opt/site"]).unwrap();
        let joined = python_path(Path::new("/lib/src"), Some(existing));
        let paths: Vec<PathBuf> = env::split_paths(&joined).collect();
        assert_eq!(paths, [PathBuf::from("/lib/src"), PathBuf::from("/opt/site")]);
    }

    #[tokio::test]
    async fn test_snapshot_mismatch_is_rejected_before_spawning() {
        let (dir, _snapshot, suite) = fixture();
        let other = LibrarySnapshot::new("black", dir.path(), dir.path(), vec!["black".into()], vec!["black".into()]);
        let executor = PytestExecutor::new(RunnerConfig::new().with_python("definitely-not-a-python"));
        let err = executor.execute(&other, &suite, &dir.path().join("out")).await.unwrap_err();
        assert!(matches!(err, SuiteError::SnapshotMismatch { .. }));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let (dir, snapshot, suite) = fixture();
        let executor = PytestExecutor::new(RunnerConfig::new().with_python("definitely-not-a-python-3"));
        let err = executor.execute(&snapshot, &suite, &dir.path().join("out/tests")).await.unwrap_err();
        assert!(matches!(err, SuiteError::Spawn { ref program, .. } if program == "definitely-not-a-python-3"));
    }

    #[cfg(unix)]
    mod scripted {
        use std::time::Duration;

        use suitecmp_core::ModuleCoverage;

        use super::*;
        use crate::runner::testing::{PASSING_RUN, fake_python};

        async fn run_with(body: &str, timeout: Duration) -> (tempfile::TempDir, Result<SuiteRun, SuiteError>) {
            let (dir, snapshot, suite) = fixture();
            let python = fake_python(dir.path(), body);
            let executor = PytestExecutor::new(RunnerConfig::new().with_python(python).with_timeout(timeout));
            let result = executor.execute(&snapshot, &suite, &dir.path().join("out/tests")).await;
            (dir, result)
        }

        #[tokio::test]
        async fn test_completed_run_collects_results_and_coverage() {
            let (dir, result) = run_with(PASSING_RUN, Duration::from_secs(30)).await;
            let run = result.unwrap();
            assert_eq!(run.results.len(), 1);
            assert_eq!(run.coverage.get("decouple"), Some(&ModuleCoverage::new(9, 10, 0, 0)));
            assert_eq!(run.outside_snapshot, ["/usr/lib/python3/site-packages/six.py"]);
            assert!(dir.path().join("out/tests").join(PYTEST_LOG).is_file());
        }

        #[tokio::test]
        async fn test_slow_run_times_out() {
            let (_dir, result) = run_with("exec sleep 5\n", Duration::from_millis(200)).await;
            match result.unwrap_err() {
                SuiteError::Timeout { label, timeout } => {
                    assert_eq!(label, "tests");
                    assert_eq!(timeout, Duration::from_millis(200));
                }
                other => panic!("expected a timeout, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_exit_one_without_results_is_no_results() {
            let (_dir, result) = run_with("exit 1\n", Duration::from_secs(30)).await;
            assert!(matches!(result.unwrap_err(), SuiteError::NoResults { ref label } if label == "tests"));
        }

        #[tokio::test]
        async fn test_collection_error_is_toolchain_error() {
            let (_dir, result) =
                run_with("echo 'ERROR collecting tests/test_env.py'\nexit 2\n", Duration::from_secs(30)).await;
            match result.unwrap_err() {
                SuiteError::Toolchain { code, detail, .. } => {
                    assert_eq!(code, 2);
                    assert!(detail.contains("ERROR collecting"));
                }
                other => panic!("expected a toolchain error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_missing_coverage_report_is_coverage_error() {
            let (_dir, result) =
                run_with("echo 'tests/test_env.py::test_a PASSED [100%]'\n", Duration::from_secs(30)).await;
            assert!(matches!(result.unwrap_err(), SuiteError::Coverage { .. }));
        }
    }
}
