//! Output comparison

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::exec::{CommandRunner, CommandSpec};

use super::runner::DEFAULT_OUTPUT_FILE;
use super::{Failure, Harness};

/// Expected output baseline read unless told otherwise
pub const DEFAULT_EXPECTED_FILE: &str = "test.out";

/// `diff` arguments: line-oriented, ignoring all whitespace differences.
pub fn diff_arguments(expected: &Path, actual: &Path) -> Vec<String> {
    vec![
        "-w".to_string(),
        expected.to_string_lossy().into_owned(),
        actual.to_string_lossy().into_owned(),
    ]
}

impl<R: CommandRunner> Harness<R> {
    /// Compare `expected` (default `test.out`) with `actual` (default `test.res`).
    ///
    /// A missing baseline counts as a mismatch: a test with no recorded expectation has not passed. Every mismatch
    /// leaves a diff artifact behind.
    #[tracing::instrument(skip_all, fields(test = %self.identity))]
    pub fn diff(&self, expected: Option<&Path>, actual: Option<&Path>) -> Result<(), Failure> {
        let expected = expected.map_or_else(|| PathBuf::from(DEFAULT_EXPECTED_FILE), Path::to_path_buf);
        let actual = actual.map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE), Path::to_path_buf);

        if !self.resolve(&expected).exists() {
            error!("no expected output '{}'", expected.display());
            return Err(self.mismatch(&expected, &actual));
        }

        let spec = CommandSpec::new("diff")
            .args(diff_arguments(&expected, &actual))
            .current_dir(&self.test_dir);

        match self.runner.execute(&spec) {
            Ok(result) if result.success() => {
                debug!("{}", result.output);
                Ok(())
            }
            Ok(result) => {
                error!("{}", result.output);
                Err(self.mismatch(&expected, &actual))
            }
            Err(e) => {
                error!("could not start diff: {}", e);
                Err(self.mismatch(&expected, &actual))
            }
        }
    }

    /// Write the artifact for a mismatch and build the matching failure.
    fn mismatch(&self, expected: &Path, actual: &Path) -> Failure {
        let artifact = match self.reporter().save_diff(&self.resolve(expected), &self.resolve(actual)) {
            Ok(path) => Some(path),
            Err(e) => {
                error!("cannot write diff artifact: {}", e);
                None
            }
        };
        Failure::Diff {
            expected: expected.to_path_buf(),
            artifact,
        }
    }
}
