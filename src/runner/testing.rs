//! Shell scripts standing in for the Python interpreter in executor tests

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Prints one passing case and writes a coverage report for `decouple.py` under the import root (the first
/// `PYTHONPATH` entry) plus one installed file outside it.
pub const PASSING_RUN: &str = r#"root="${PYTHONPATH%%:*}"
for arg in "$@"; do
    case "$arg" in
        --cov-report=json:*) report="${arg#--cov-report=json:}" ;;
    esac
done
echo "============================= test session starts =============================="
echo "tests/test_env.py::test_a PASSED [100%]"
printf '{"files": {"%s/decouple.py": {"summary": {"covered_lines": 9, "num_statements": 10}}, "/usr/lib/python3/site-packages/six.py": {"summary": {"covered_lines": 1, "num_statements": 2}}}}' "$root" > "$report"
"#;

/// Write an executable `python` script with `body` into `dir` and return its path.
pub fn fake_python(dir: &Path, body: &str) -> String {
    let path = dir.join("python");
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}
