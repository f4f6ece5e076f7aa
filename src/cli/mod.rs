//! CLI module for suitecmp
//!
//! ## Commands
//!
//! - `compare <snapshot>` - Run the manual and generated suites and write the comparison
//! - `show <comparison.md>` - Read the summary table back from a written report
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `progress` - Progress reporting during a comparison
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod progress;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::fixture::FixtureError;
use crate::pairing::PairingError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    /// Both suites ran (test failures included)
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// A suite could not be run; the report was still written
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The snapshot is unavailable or the arguments are invalid
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a usage error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Render a diagnostic with its code and help text.
fn diagnostic_message(error: impl miette::Diagnostic + Send + Sync + 'static) -> String {
    format!("{:?}", miette::Report::new(error))
}

impl From<FixtureError> for CliError {
    fn from(error: FixtureError) -> Self {
        Self::usage(diagnostic_message(error))
    }
}

impl From<PairingError> for CliError {
    fn from(error: PairingError) -> Self {
        Self::usage(diagnostic_message(error))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Compare a manual and a generated pytest suite against the same library snapshot
#[derive(Parser, Debug)]
#[command(name = "suitecmp")]
#[command(version = VERSION)]
#[command(about = "Compare a manual and a generated pytest suite against the same library snapshot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run both suites under pytest + pytest-cov and write the comparison
    Compare(CompareArgs),

    /// Print the summary table of a written comparison.md
    Show {
        /// Path to comparison.md
        #[arg(value_name = "REPORT")]
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Root of the library snapshot
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Manual suite directory (default: <SNAPSHOT>/tests)
    #[arg(long, value_name = "DIR")]
    pub manual: Option<PathBuf>,

    /// Generated suite directory (default: <SNAPSHOT>/tests-ai)
    #[arg(long, value_name = "DIR")]
    pub generated: Option<PathBuf>,

    /// Label of the manual suite, also its output subdirectory
    #[arg(long, value_name = "LABEL", default_value = "manual")]
    pub manual_label: String,

    /// Label of the generated suite, also its output subdirectory
    #[arg(long, value_name = "LABEL", default_value = "generated")]
    pub generated_label: String,

    /// Output directory (default: suitecmp-out/<snapshot id>)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Snapshot identifier (default: the snapshot directory name)
    #[arg(long, value_name = "ID")]
    pub name: Option<String>,

    /// Import root relative to the snapshot (default: `src` if present, else the snapshot root)
    #[arg(long, value_name = "DIR")]
    pub import_root: Option<PathBuf>,

    /// Coverage target package or module; repeatable (default: discovered top-level packages)
    #[arg(long = "cov", value_name = "TARGET")]
    pub cov: Vec<String>,

    /// Python interpreter with pytest and pytest-cov (default: $SUITECMP_PYTHON, then python3)
    #[arg(long, value_name = "EXE")]
    pub python: Option<String>,

    /// Per-suite timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 900)]
    pub timeout_secs: u64,

    /// Measure line coverage only
    #[arg(long)]
    pub no_branch: bool,

    /// Extra argument passed to pytest; repeatable
    #[arg(long = "pytest-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub pytest_args: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Compare(args) => commands::compare(&args),
        Command::Show { path } => commands::show(&path),
    }
}

// ============================================================================
// Tests
// ============================================================================
