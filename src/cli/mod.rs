//! CLI module for the regression test harness
//!
//! This module provides the command-line interface of the `regtest` binary. It is meant to be invoked from inside
//! a test directory (or with `--test-dir`), typically by a per-test script.
//!
//! ## Commands
//!
//! - `check <project>` - Build, run and diff (the full workflow)
//! - `build <project>` - Compile the project only
//! - `run <binary>` - Run the test binary, capturing its output
//! - `exec <program>` - Run a helper program, capturing its output
//! - `diff` - Compare the expected and actual output
//! - `tail <input> <output> <line>` - Copy a file from a given line onward
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

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::ConfigError;
use crate::pipeline::{Failure, Outcome};
use crate::version::REGTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(Outcome::Success.exit_code());
    pub const DIFF_FAILURE: ExitCode = ExitCode(Outcome::DiffFailure.exit_code());
    pub const BUILD_FAILURE: ExitCode = ExitCode(Outcome::BuildFailure.exit_code());
    /// Runtime failures, and anything that prevents the harness from running at all
    pub const UNKNOWN_FAILURE: ExitCode = ExitCode(Outcome::RuntimeFailure.exit_code());
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode(outcome.exit_code())
    }
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
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create an unknown-failure error (exit code 3).
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::UNKNOWN_FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<Failure> for CliError {
    fn from(failure: Failure) -> Self {
        let exit_code = ExitCode::from(failure.outcome());
        let message = match &failure {
            Failure::Diff {
                artifact: Some(artifact),
                ..
            } => format!("Error: {} (see {})", failure, artifact.display()),
            _ => format!("Error: {}", failure),
        };
        Self::new(message, exit_code)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::unknown(format!("Error: {}", err))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Build, run and diff a regression test
#[derive(Parser, Debug)]
#[command(name = "regtest")]
#[command(version = REGTEST_VERSION)]
#[command(about = "Build, run and diff a regression test", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// JSON configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Test directory (default: current directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub test_dir: Option<PathBuf>,

    /// Build with gnatmake instead of gprbuild
    #[arg(long, global = true)]
    pub gnatmake: bool,

    /// Run the test binary under gdb
    #[arg(long, global = true)]
    pub gdb: bool,

    /// Build with profiling and run gprof after the test binary
    #[arg(long, global = true)]
    pub gprof: bool,

    /// Where diff artifacts are written (default: diffs)
    #[arg(long, value_name = "DIR", global = true)]
    pub diffs_dir: Option<PathBuf>,

    /// Where gprof reports are written (default: profiles)
    #[arg(long, value_name = "DIR", global = true)]
    pub profiles_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the project, run its binary and diff the output
    Check {
        /// Project file to build
        #[arg(value_name = "PROJECT")]
        project: String,
    },

    /// Build the project
    Build {
        /// Project file to build
        #[arg(value_name = "PROJECT")]
        project: String,
    },

    /// Run the test binary
    Run {
        /// Binary name, relative to the test directory
        #[arg(value_name = "BINARY")]
        binary: String,
        /// Output file (default: test.res)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Arguments passed to the binary
        #[arg(last = true, value_name = "OPTIONS")]
        options: Vec<String>,
    },

    /// Run a helper program
    Exec {
        /// Program to run
        #[arg(value_name = "PROGRAM")]
        program: String,
        /// Output file (default: <PROGRAM>.res)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Accept a non-zero exit status
        #[arg(long)]
        ignore_error: bool,
        /// Arguments passed to the program
        #[arg(last = true, value_name = "OPTIONS")]
        options: Vec<String>,
    },

    /// Compare expected and actual output
    Diff {
        /// Expected output (default: test.out)
        #[arg(long, value_name = "FILE")]
        expected: Option<PathBuf>,
        /// Actual output (default: test.res)
        #[arg(long, value_name = "FILE")]
        actual: Option<PathBuf>,
    },

    /// Copy INPUT to OUTPUT starting at line FROM (1-based)
    Tail {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[arg(value_name = "FROM")]
        first_kept_line: usize,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not errors
            let code = if e.use_stderr() { ExitCode::UNKNOWN_FAILURE } else { ExitCode::SUCCESS };
            let _ = e.print();
            process::exit(code.0);
        }
    };

    init_tracing(cli.global.verbose);

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

/// Initialize structured logging on stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .try_init();
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = commands::load_config(&cli.global)?;

    match cli.command {
        Command::Check { project } => commands::check(config, &project),
        Command::Build { project } => commands::build(config, &project),
        Command::Run {
            binary,
            output,
            options,
        } => commands::run_binary(config, &binary, &options, output.as_deref()),
        Command::Exec {
            program,
            output,
            ignore_error,
            options,
        } => commands::exec_program(config, &program, &options, output.as_deref(), ignore_error),
        Command::Diff { expected, actual } => commands::diff(config, expected.as_deref(), actual.as_deref()),
        Command::Tail {
            input,
            output,
            first_kept_line,
        } => commands::tail(&config, &input, &output, first_kept_line),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_outcomes() {
        assert_eq!(ExitCode::SUCCESS, ExitCode(0));
        assert_eq!(ExitCode::DIFF_FAILURE, ExitCode(1));
        assert_eq!(ExitCode::BUILD_FAILURE, ExitCode(2));
        assert_eq!(ExitCode::UNKNOWN_FAILURE, ExitCode(3));
    }

    #[test]
    fn test_failure_to_cli_error() {
        let err = CliError::from(Failure::Build {
            project: "hello".to_string(),
            output: String::new(),
        });
        assert_eq!(err.exit_code, ExitCode::BUILD_FAILURE);
        assert_eq!(err.message, "Error: build of 'hello' failed");

        let err = CliError::from(Failure::Diff {
            expected: PathBuf::from("test.out"),
            artifact: Some(PathBuf::from("diffs/t1.diff")),
        });
        assert_eq!(err.exit_code, ExitCode::DIFF_FAILURE);
        assert!(err.message.contains("diffs/t1.diff"));
    }

    #[test]
    fn test_config_error_is_unknown_failure() {
        let err = CliError::from(ConfigError::InvalidTimeout { value: "x".to_string() });
        assert_eq!(err.exit_code, ExitCode::UNKNOWN_FAILURE);
    }

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::try_parse_from(["regtest", "check", "hello.gpr"]).unwrap();
        assert!(matches!(cli.command, Command::Check { ref project } if project == "hello.gpr"));
        assert!(!cli.global.gnatmake);
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["regtest", "build", "hello", "--gnatmake", "--gprof", "-v"]).unwrap();
        assert!(cli.global.gnatmake);
        assert!(cli.global.gprof);
        assert!(cli.global.verbose);
    }

    #[test]
    fn test_cli_parse_run_with_options() {
        let cli = Cli::try_parse_from(["regtest", "--gdb", "run", "hello", "-o", "out.res", "--", "-x", "1"]).unwrap();
        assert!(cli.global.gdb);
        if let Command::Run {
            binary,
            output,
            options,
        } = cli.command
        {
            assert_eq!(binary, "hello");
            assert_eq!(output, Some(PathBuf::from("out.res")));
            assert_eq!(options, vec!["-x", "1"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_exec() {
        let cli = Cli::try_parse_from(["regtest", "exec", "gnatls", "--ignore-error"]).unwrap();
        if let Command::Exec {
            program,
            ignore_error,
            options,
            ..
        } = cli.command
        {
            assert_eq!(program, "gnatls");
            assert!(ignore_error);
            assert!(options.is_empty());
        } else {
            panic!("Expected Exec command");
        }
    }

    #[test]
    fn test_cli_parse_diff_defaults() {
        let cli = Cli::try_parse_from(["regtest", "diff"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Diff {
                expected: None,
                actual: None
            }
        ));
    }

    #[test]
    fn test_cli_parse_tail() {
        let cli = Cli::try_parse_from(["regtest", "tail", "in.txt", "out.txt", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Tail { first_kept_line: 3, .. }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["regtest"]).is_err());
    }
}
