//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env::{self, VarError};
use std::path::Path;

use crate::config::{BuildTool, ConfigError, HarnessConfig, TIMEOUT_ENV};
use crate::lines;
use crate::pipeline::{Harness, Project};

use super::{CliError, CliResult, ExitCode, GlobalOptions};

// ============================================================================
// Configuration
// ============================================================================

/// Assemble the harness configuration: defaults, then `--config`, then `TIMEOUT`, then flags.
pub fn load_config(opts: &GlobalOptions) -> CliResult<HarnessConfig> {
    let timeout = match env::var(TIMEOUT_ENV) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => {
            return Err(ConfigError::InvalidTimeout {
                value: raw.to_string_lossy().into_owned(),
            }
            .into());
        }
    };
    configure(opts, timeout.as_deref()).map_err(CliError::from)
}

/// Everything [`load_config`] does except reading the environment.
fn configure(opts: &GlobalOptions, timeout: Option<&str>) -> Result<HarnessConfig, ConfigError> {
    let mut config = match &opts.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::new(),
    };
    config = config.with_timeout_override(timeout)?;

    if let Some(dir) = &opts.test_dir {
        config = config.with_test_dir(dir);
    }
    if opts.gnatmake {
        config = config.with_build_tool(BuildTool::Gnatmake);
    }
    if opts.gdb {
        config = config.with_gdb(true);
    }
    if opts.gprof {
        config = config.with_gprof(true);
    }
    if let Some(dir) = &opts.diffs_dir {
        config = config.with_diffs_dir(dir);
    }
    if let Some(dir) = &opts.profiles_dir {
        config = config.with_profiles_dir(dir);
    }
    Ok(config)
}

// ============================================================================
// Pipeline commands
// ============================================================================

/// Build, run and diff.
pub fn check(config: HarnessConfig, project: &str) -> CliResult<ExitCode> {
    let harness = Harness::new(config)?;
    harness.build_and_run_and_diff(&Project::new(project))?;
    Ok(ExitCode::SUCCESS)
}

pub fn build(config: HarnessConfig, project: &str) -> CliResult<ExitCode> {
    let harness = Harness::new(config)?;
    harness.build(&Project::new(project))?;
    Ok(ExitCode::SUCCESS)
}

pub fn run_binary(
    config: HarnessConfig,
    binary: &str,
    options: &[String],
    output: Option<&Path>,
) -> CliResult<ExitCode> {
    let harness = Harness::new(config)?;
    harness.run(binary, options, output)?;
    Ok(ExitCode::SUCCESS)
}

pub fn exec_program(
    config: HarnessConfig,
    program: &str,
    options: &[String],
    output: Option<&Path>,
    ignore_error: bool,
) -> CliResult<ExitCode> {
    let harness = Harness::new(config)?;
    harness.exec(program, options, output, ignore_error)?;
    Ok(ExitCode::SUCCESS)
}

pub fn diff(config: HarnessConfig, expected: Option<&Path>, actual: Option<&Path>) -> CliResult<ExitCode> {
    let harness = Harness::new(config)?;
    harness.diff(expected, actual)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Utilities
// ============================================================================

/// Copy `input` to `output` from line `first_kept_line` onward. Relative paths resolve against the test directory.
pub fn tail(config: &HarnessConfig, input: &Path, output: &Path, first_kept_line: usize) -> CliResult<ExitCode> {
    let input = config.test_dir.join(input);
    let output = config.test_dir.join(output);
    let kept = lines::tail(&input, &output, first_kept_line)
        .map_err(|e| CliError::unknown(format!("Error: cannot tail '{}': {}", input.display(), e)))?;
    tracing::debug!("kept {} lines of '{}'", kept, input.display());
    Ok(ExitCode::SUCCESS)
}
