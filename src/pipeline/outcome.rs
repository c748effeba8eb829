//! Failure taxonomy
//!
//! Every step of the pipeline either succeeds or returns a [`Failure`] of exactly one category. The categories are
//! mutually exclusive and the first one wins: a failed build never reaches the runner, a failed run never reaches
//! the comparator.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a test binary (or helper program) did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeReason {
    /// Exited with a non-zero status
    Exited(i32),
    /// Killed after the run timeout elapsed
    TimedOut(Duration),
    /// Could not be started
    Launch(String),
}

impl fmt::Display for RuntimeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeReason::Exited(status) => write!(f, "exited with status {}", status),
            RuntimeReason::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            RuntimeReason::Launch(err) => write!(f, "could not be started: {}", err),
        }
    }
}

/// A failed pipeline step
#[derive(Debug, Error)]
pub enum Failure {
    /// The build tool returned non-zero or could not be started
    #[error("build of '{project}' failed")]
    Build { project: String, output: String },

    /// The test binary (or its debugger wrapper) did not succeed
    #[error("'{program}' {reason}")]
    Runtime { program: String, reason: RuntimeReason },

    /// Output differs from the baseline, or there is no baseline
    #[error("output differs from '{}'", .expected.display())]
    Diff {
        expected: PathBuf,
        /// Artifact written for the mismatch; `None` if it could not be written
        artifact: Option<PathBuf>,
    },
}

impl Failure {
    pub fn outcome(&self) -> Outcome {
        match self {
            Failure::Build { .. } => Outcome::BuildFailure,
            Failure::Runtime { .. } => Outcome::RuntimeFailure,
            Failure::Diff { .. } => Outcome::DiffFailure,
        }
    }
}

/// Final state of one test run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    BuildFailure,
    /// Crash, assertion, non-zero exit or timeout of the test binary
    RuntimeFailure,
    DiffFailure,
}

impl Outcome {
    /// Process exit code signalling this outcome
    pub const fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::DiffFailure => 1,
            Outcome::BuildFailure => 2,
            Outcome::RuntimeFailure => 3,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<&Result<(), Failure>> for Outcome {
    fn from(result: &Result<(), Failure>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(failure) => failure.outcome(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Success => "success",
            Outcome::BuildFailure => "build failure",
            Outcome::RuntimeFailure => "unknown failure",
            Outcome::DiffFailure => "diff failure",
        };
        f.write_str(name)
    }
}
