#![forbid(unsafe_code)]
//! regtest: build, run and diff harness for regression test directories
//!
//! Each regression test lives in its own directory holding a project to build, an expected output baseline
//! (`test.out`) and optional helper programs. The harness builds the project, runs the resulting binary with its
//! output captured to `test.res`, and compares the two with a whitespace-tolerant diff. A failing comparison leaves a
//! size-bounded `<test>.diff` artifact in a shared diffs directory for later aggregation.
//!
//! ## Exit Code Policy
//!
//! The process exit code is the only signal the harness gives to whatever drives the suite:
//!
//! - `0`: build, run and diff all succeeded.
//! - `1`: diff failure (output differs from the baseline, or no baseline exists).
//! - `2`: build failure.
//! - `3`: unknown failure (the binary crashed, returned non-zero or timed out).
//!
//! The pipeline steps return a typed [`Failure`]; only [`cli::run`] terminates the process.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod exec;
pub mod lines;
pub mod pipeline;
pub mod version;

pub use config::{BuildTool, ConfigError, HarnessConfig};
pub use exec::{CommandRunner, CommandSpec, ExecutionResult, SystemCommandRunner};
pub use pipeline::{DiffReporter, Failure, Harness, Outcome, Project, RuntimeReason, TestIdentity};
