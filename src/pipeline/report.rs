//! Diff artifacts
//!
//! A failing comparison leaves one `<test>.diff` file in the diffs directory, meant to be concatenated with the
//! artifacts of every other failing test and read by a human. The expected baseline is curated and short, so it is
//! always written whole; actual output can be unbounded, so it is capped:
//!
//! ```text
//! ================ Bug <test>
//! ---------------- unexpected output      (no baseline: first 100 lines, then [TRUNCATED])
//! ```
//!
//! ```text
//! ================ Bug <test>
//! ---------------- actual output          (first 2000 lines, no marker)
//! ---------------- expected output        (entire baseline)
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::lines::copy_lines;

use super::identity::TestIdentity;

/// Lines of actual output kept when there is no baseline
pub const UNEXPECTED_OUTPUT_LIMIT: usize = 100;
/// Lines of actual output kept next to a baseline
pub const ACTUAL_OUTPUT_LIMIT: usize = 2000;

pub const TRUNCATION_MARKER: &str = "[TRUNCATED]";
const UNEXPECTED_HEADER: &str = "---------------- unexpected output";
const ACTUAL_HEADER: &str = "---------------- actual output";
const EXPECTED_HEADER: &str = "---------------- expected output";

/// Writes diff artifacts for one test.
#[derive(Debug, Clone)]
pub struct DiffReporter {
    identity: TestIdentity,
    diffs_dir: PathBuf,
}

impl DiffReporter {
    pub fn new(identity: TestIdentity, diffs_dir: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            diffs_dir: diffs_dir.into(),
        }
    }

    /// Where this test's artifact lives. Deterministic: reruns overwrite it.
    pub fn artifact_path(&self) -> PathBuf {
        self.diffs_dir.join(self.identity.diff_file_name())
    }

    /// Write the artifact comparing `expected` and `actual`, returning its path.
    #[tracing::instrument(skip_all, fields(test = %self.identity))]
    pub fn save_diff(&self, expected: &Path, actual: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.diffs_dir)?;
        let path = self.artifact_path();
        let mut out = BufWriter::new(File::create(&path)?);

        writeln!(out, "================ Bug {}", self.identity)?;

        if !expected.exists() {
            writeln!(out, "{}", UNEXPECTED_HEADER)?;
            match File::open(actual) {
                Ok(file) => {
                    let copied = copy_lines(BufReader::new(file), &mut out, UNEXPECTED_OUTPUT_LIMIT)?;
                    if copied.truncated {
                        writeln!(out, "{}", TRUNCATION_MARKER)?;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!("no actual output '{}' to report", actual.display());
                }
                Err(e) => return Err(e),
            }
        } else {
            if actual.exists() {
                writeln!(out, "{}", ACTUAL_HEADER)?;
                let file = File::open(actual)?;
                copy_lines(BufReader::new(file), &mut out, ACTUAL_OUTPUT_LIMIT)?;
            }
            writeln!(out, "{}", EXPECTED_HEADER)?;
            io::copy(&mut File::open(expected)?, &mut out)?;
        }

        out.flush()?;
        tracing::info!("diff saved to {}", path.display());
        Ok(path)
    }
}
