//! Build, run, diff pipeline
//!
//! [`Harness`] owns the configuration, the test identity and a [`CommandRunner`]. Each step lives in its own file
//! as an `impl Harness` block:
//!
//! - `builder` - compile the project with gprbuild or gnatmake
//! - `runner` - execute the binary (optionally under gdb, optionally followed by gprof), plus helper programs
//! - `comparator` - `diff -w` the baseline against the captured output
//! - `report` - the bounded diff artifact written on mismatch
//!
//! Steps return `Result<(), Failure>`; the caller decides what to do with the failure. Nothing here exits the
//! process.

mod builder;
mod comparator;
mod identity;
mod outcome;
mod report;
mod runner;

use std::path::{Path, PathBuf};

use crate::config::{ConfigError, HarnessConfig};
use crate::exec::{CommandRunner, SystemCommandRunner};

pub use builder::build_arguments;
pub use comparator::{DEFAULT_EXPECTED_FILE, diff_arguments};
pub use identity::{Project, TestIdentity};
pub use outcome::{Failure, Outcome, RuntimeReason};
pub use report::{ACTUAL_OUTPUT_LIMIT, DiffReporter, TRUNCATION_MARKER, UNEXPECTED_OUTPUT_LIMIT};
pub use runner::DEFAULT_OUTPUT_FILE;

/// One test's harness.
pub struct Harness<R = SystemCommandRunner> {
    config: HarnessConfig,
    identity: TestIdentity,
    /// Absolute test directory; every command runs here
    test_dir: PathBuf,
    runner: R,
}

impl Harness<SystemCommandRunner> {
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        Self::with_runner(config, SystemCommandRunner)
    }
}

impl<R: CommandRunner> Harness<R> {
    /// Create a harness that executes commands through `runner`.
    pub fn with_runner(config: HarnessConfig, runner: R) -> Result<Self, ConfigError> {
        let identity = TestIdentity::from_dir(&config.test_dir)?;
        let test_dir = config.test_dir.canonicalize().map_err(|source| ConfigError::TestDir {
            path: config.test_dir.clone(),
            source,
        })?;
        Ok(Self {
            config,
            identity,
            test_dir,
            runner,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolve a path given relative to the test directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.test_dir.join(path)
        }
    }

    pub fn reporter(&self) -> DiffReporter {
        DiffReporter::new(self.identity.clone(), self.resolve(&self.config.diffs_dir))
    }

    /// Build the project, run its binary with default arguments, and diff `test.out` against `test.res`.
    ///
    /// The first failing step ends the workflow; later steps never run.
    #[tracing::instrument(skip_all, fields(test = %self.identity, project = %project))]
    pub fn build_and_run_and_diff(&self, project: &Project) -> Result<(), Failure> {
        self.build(project)?;
        self.run(&project.binary_name(), &[], None)?;
        self.diff(None, None)
    }

    /// [`build_and_run_and_diff`](Self::build_and_run_and_diff), reduced to its outcome.
    pub fn check(&self, project: &Project) -> Outcome {
        let result = self.build_and_run_and_diff(project);
        if let Err(failure) = &result {
            tracing::error!("{}: {}", self.identity, failure);
        }
        Outcome::from(&result)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted command runner for pipeline tests

    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use std::io;

    use crate::exec::{CommandRunner, CommandSpec, ExecutionResult, TIMEOUT_STATUS};

    /// What a scripted command does
    pub enum Script {
        /// Exit with `status`, writing `output` to the redirect file or returning it as captured text
        Exit { status: i32, output: String },
        TimeOut,
        LaunchError,
    }

    impl Script {
        pub fn ok(output: &str) -> Self {
            Script::Exit {
                status: 0,
                output: output.to_string(),
            }
        }

        pub fn fail(status: i32, output: &str) -> Self {
            Script::Exit {
                status,
                output: output.to_string(),
            }
        }
    }

    /// Replays scripted results in order and records every command it was asked to run.
    /// Commands past the end of the script succeed silently.
    #[derive(Default)]
    pub struct ScriptedRunner {
        script: RefCell<VecDeque<Script>>,
        calls: RefCell<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
            Self {
                script: RefCell::new(script.into_iter().collect()),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.borrow().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.program.clone()).collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn execute(&self, spec: &CommandSpec) -> io::Result<ExecutionResult> {
            self.calls.borrow_mut().push(spec.clone());
            let step = self.script.borrow_mut().pop_front().unwrap_or_else(|| Script::ok(""));
            let output_path = spec.resolved_output();
            match step {
                Script::Exit { status, output } => {
                    let captured = match &output_path {
                        Some(path) => {
                            if let Some(parent) = path.parent() {
                                fs::create_dir_all(parent)?;
                            }
                            fs::write(path, &output)?;
                            String::new()
                        }
                        None => output,
                    };
                    Ok(ExecutionResult {
                        status,
                        timed_out: false,
                        output: captured,
                        output_path,
                    })
                }
                Script::TimeOut => Ok(ExecutionResult {
                    status: TIMEOUT_STATUS,
                    timed_out: true,
                    output: String::new(),
                    output_path,
                }),
                Script::LaunchError => Err(io::Error::new(io::ErrorKind::NotFound, "no such program")),
            }
        }
    }
}
