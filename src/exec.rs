//! External command execution
//!
//! Every tool the harness drives (build tool, test binary, debugger, profiler, diff) goes through the
//! [`CommandRunner`] trait. The pipeline only depends on its contract: an argument vector, a working directory, an
//! optional output file and an optional timeout go in; an exit status and captured text come out.
//!
//! [`SystemCommandRunner`] is the real implementation. It drives the child on a single-threaded tokio runtime so
//! that the timeout is a timer on the wait, and the child is killed as soon as the deadline elapses.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Status reported for a child killed because its deadline elapsed.
pub const TIMEOUT_STATUS: i32 = 124;

/// A command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory of the child. Relative output paths resolve against it too.
    pub cwd: Option<PathBuf>,
    /// Redirect stdout and stderr to this file instead of capturing them.
    pub output: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            output: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn output_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The output file as seen from the harness process.
    pub fn resolved_output(&self) -> Option<PathBuf> {
        self.output.as_ref().map(|path| match &self.cwd {
            Some(cwd) if path.is_relative() => cwd.join(path),
            _ => path.clone(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(output) = &self.output {
            write!(f, " > {}", output.display())?;
        }
        Ok(())
    }
}

/// Result of one command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `128 + signal` for a child killed by a signal, [`TIMEOUT_STATUS`] on timeout
    pub status: i32,
    pub timed_out: bool,
    /// Captured stdout followed by stderr. Empty when output went to a file.
    pub output: String,
    /// File holding the output, when the command was redirected
    pub output_path: Option<PathBuf>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.status == 0 && !self.timed_out
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// Run `spec` and wait for it to exit or time out.
    ///
    /// Returns `Err` only when the command could not be started at all.
    fn execute(&self, spec: &CommandSpec) -> io::Result<ExecutionResult>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn execute(&self, spec: &CommandSpec) -> io::Result<ExecutionResult> {
        (**self).execute(spec)
    }
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn execute(&self, spec: &CommandSpec) -> io::Result<ExecutionResult> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(execute_async(spec))
    }
}

#[tracing::instrument(skip_all, fields(program = %spec.program))]
async fn execute_async(spec: &CommandSpec) -> io::Result<ExecutionResult> {
    tracing::debug!("executing: {}", spec);

    let mut command = Command::new(&spec.program);
    command.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let output_path = spec.resolved_output();
    match &output_path {
        Some(path) => {
            let file = create_output_file(path)?;
            command.stdout(Stdio::from(file.try_clone()?));
            command.stderr(Stdio::from(file));
        }
        None => {
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
        }
    }

    let child = command.spawn()?;
    let waited = child.wait_with_output();

    let output = match spec.timeout {
        Some(limit) => match tokio::time::timeout(limit, waited).await {
            Ok(output) => output?,
            Err(_) => {
                // Dropping the wait future drops the child, which kills it.
                tracing::warn!("'{}' timed out after {}s", spec.program, limit.as_secs());
                return Ok(ExecutionResult {
                    status: TIMEOUT_STATUS,
                    timed_out: true,
                    output: String::new(),
                    output_path,
                });
            }
        },
        None => waited.await?,
    };

    let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(ExecutionResult {
        status: exit_code(output.status),
        timed_out: false,
        output: captured,
        output_path,
    })
}

fn create_output_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal: Option<i32> = None;

    match status.code() {
        Some(code) => code,
        None => signal.map(|s| 128 + s).unwrap_or(1),
    }
}
