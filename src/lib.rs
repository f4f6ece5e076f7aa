#![forbid(unsafe_code)]
//! suitecmp: compare a manual and a generated pytest suite against one library snapshot
//!
//! The pipeline is strictly linear:
//!
//! 1. [`fixture`] resolves the snapshot directory into a [`LibrarySnapshot`].
//! 2. [`pairing`] attaches the manual and generated suites to it.
//! 3. [`runner`] runs both suites concurrently under `pytest` + `pytest-cov`, each in its own work directory.
//! 4. `suitecmp_core` aggregates the runs and decides the per-category verdicts.
//! 5. [`report`] writes `comparison.md`, `comparison.json` and per-suite coverage summaries.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod fixture;
pub mod pairing;
pub mod pipeline;
pub mod report;
pub mod runner;

pub use config::RunnerConfig;
pub use fixture::{FixtureError, FixtureOptions};
pub use pairing::{PairingError, SuitePair, SuiteSpec, TestSuite};
pub use pipeline::{ComparisonOutcome, run_comparison};
pub use runner::{PytestExecutor, SuiteError, SuiteExecutor, SuiteRun};

pub use suitecmp_core::{ComparisonRecord, LibrarySnapshot, Provenance};
