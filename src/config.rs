//! Runner configuration for suite executions

use std::env;
use std::time::Duration;

/// Environment variable naming the Python interpreter used to run pytest.
pub const PYTHON_ENV: &str = "SUITECMP_PYTHON";

/// Interpreter used when neither `--python` nor `SUITECMP_PYTHON` is given.
pub const DEFAULT_PYTHON: &str = "python3";

/// Default upper bound on a single suite run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// How suites are executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Python interpreter (must have `pytest` and `pytest-cov` installed)
    pub python: String,
    /// Per-suite wall-clock limit; the pytest process is killed when it expires
    pub timeout: Duration,
    /// Measure branch coverage (`--cov-branch`)
    pub branch_coverage: bool,
    /// Extra arguments appended to every pytest invocation
    pub extra_args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python: resolve_python(None),
            timeout: DEFAULT_TIMEOUT,
            branch_coverage: true,
            extra_args: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Python interpreter
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Set the per-suite timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable branch coverage
    pub fn with_branch_coverage(mut self, enabled: bool) -> Self {
        self.branch_coverage = enabled;
        self
    }

    /// Append extra pytest arguments
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }
}

/// Pick the interpreter: explicit flag, then `SUITECMP_PYTHON`, then `python3`.
pub fn resolve_python(explicit: Option<&str>) -> String {
    if let Some(python) = explicit.filter(|p| !p.trim().is_empty()) {
        return python.to_string();
    }

    if let Ok(python) = env::var(PYTHON_ENV) {
        if !python.trim().is_empty() {
            return python;
        }
    }

    DEFAULT_PYTHON.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_timeout_and_branch() {
        let config = RunnerConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.branch_coverage);
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn test_builder_methods() {
        let config = RunnerConfig::new()
            .with_python("/opt/venv/bin/python")
            .with_timeout(Duration::from_secs(5))
            .with_branch_coverage(false)
            .with_extra_args(["-x".to_string()]);
        assert_eq!(config.python, "/opt/venv/bin/python");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.branch_coverage);
        assert_eq!(config.extra_args, ["-x"]);
    }

    #[test]
    fn test_explicit_python_wins() {
        assert_eq!(resolve_python(Some("pypy3")), "pypy3");
    }

    #[test]
    fn test_blank_explicit_python_is_ignored() {
        assert_ne!(resolve_python(Some("  ")), "  ");
    }
}
