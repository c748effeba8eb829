//! Test binary execution

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::exec::{CommandRunner, CommandSpec};

use super::{Failure, Harness, RuntimeReason};

/// Where the test binary's output is captured unless told otherwise
pub const DEFAULT_OUTPUT_FILE: &str = "test.res";

impl<R: CommandRunner> Harness<R> {
    /// Run the test binary `binary` from the test directory with `options`, capturing its output to
    /// `output_file` (default `test.res`) under the configured timeout.
    ///
    /// With gdb enabled the binary runs under `gdb --batch-silent`; with gprof enabled a profile report is written
    /// afterwards. A profiling failure is only logged.
    #[tracing::instrument(skip_all, fields(binary = binary, gdb = self.config.with_gdb))]
    pub fn run(&self, binary: &str, options: &[String], output_file: Option<&Path>) -> Result<(), Failure> {
        let output = output_file.map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE), Path::to_path_buf);
        let timeout = self.config.timeout();

        let spec = if self.config.with_gdb {
            CommandSpec::new("gdb").args(["--eval-command=run", "--batch-silent", "--args", binary])
        } else {
            CommandSpec::new(self.test_dir.join(binary).to_string_lossy())
        };
        let spec = spec
            .args(options.iter().cloned())
            .current_dir(&self.test_dir)
            .output_to(&output)
            .timeout(timeout);

        let result = self.runner.execute(&spec).map_err(|e| {
            error!("could not start '{}': {}", binary, e);
            Failure::Runtime {
                program: binary.to_string(),
                reason: RuntimeReason::Launch(e.to_string()),
            }
        })?;

        let captured = self.read_captured(&output);
        if !result.success() {
            error!("{}", captured);
            let reason = if result.timed_out {
                RuntimeReason::TimedOut(timeout)
            } else {
                RuntimeReason::Exited(result.status)
            };
            return Err(Failure::Runtime {
                program: binary.to_string(),
                reason,
            });
        }
        debug!("{}", captured);

        if self.config.with_gprof {
            self.profile(binary, options);
        }
        Ok(())
    }

    /// Run a helper program (looked up on `PATH` or relative to the test directory) with `options`, capturing its
    /// output to `output_file` (default `<program>.res`).
    ///
    /// No debugger, no profiler and no timeout. With `ignore_error` a non-zero status is logged and accepted.
    #[tracing::instrument(skip_all, fields(program = program, ignore_error = ignore_error))]
    pub fn exec(
        &self,
        program: &str,
        options: &[String],
        output_file: Option<&Path>,
        ignore_error: bool,
    ) -> Result<(), Failure> {
        let output = output_file.map_or_else(|| PathBuf::from(format!("{}.res", program)), Path::to_path_buf);
        let spec = CommandSpec::new(program)
            .args(options.iter().cloned())
            .current_dir(&self.test_dir)
            .output_to(&output);

        let result = self.runner.execute(&spec).map_err(|e| {
            error!("could not start '{}': {}", program, e);
            Failure::Runtime {
                program: program.to_string(),
                reason: RuntimeReason::Launch(e.to_string()),
            }
        })?;

        let captured = self.read_captured(&output);
        if !result.success() && !ignore_error {
            error!("{}", captured);
            return Err(Failure::Runtime {
                program: program.to_string(),
                reason: RuntimeReason::Exited(result.status),
            });
        }
        debug!("{}", captured);
        Ok(())
    }

    /// Write a gprof report for the run that just finished. Best effort.
    fn profile(&self, binary: &str, options: &[String]) {
        let profiles_dir = self.resolve(&self.config.profiles_dir);
        if let Err(e) = fs::create_dir_all(&profiles_dir) {
            warn!("cannot create profiles directory '{}': {}", profiles_dir.display(), e);
            return;
        }
        let report = profiles_dir.join(self.identity.profile_file_name(binary));
        let spec = CommandSpec::new("gprof")
            .arg(binary)
            .args(options.iter().cloned())
            .current_dir(&self.test_dir)
            .output_to(&report);

        match self.runner.execute(&spec) {
            Ok(result) if result.success() => info!("profile saved to {}", report.display()),
            Ok(result) => warn!("gprof exited with status {}; profile may be incomplete", result.status),
            Err(e) => warn!("could not start gprof: {}", e),
        }
    }

    fn read_captured(&self, output: &Path) -> String {
        let path = self.resolve(output);
        match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("cannot read captured output '{}': {}", path.display(), e);
                String::new()
            }
        }
    }
}
