//! Harness configuration
//!
//! A `HarnessConfig` is built once per invocation and handed to the [`Harness`](crate::Harness); no step reads
//! process-wide state on its own. Sources, lowest to highest precedence: built-in defaults, an optional JSON file,
//! the `TIMEOUT` environment variable, command-line flags.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the run timeout, in whole seconds.
pub const TIMEOUT_ENV: &str = "TIMEOUT";

/// Run timeout used when `TIMEOUT` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Errors raised while assembling a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TIMEOUT value '{value}': expected a whole number of seconds")]
    InvalidTimeout { value: String },

    #[error("cannot read config file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config file '{}': {source}", .path.display())]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("cannot resolve test directory '{}': {source}", .path.display())]
    TestDir { path: PathBuf, source: io::Error },

    #[error("test directory '{}' has no name to derive a test identity from", .path.display())]
    AnonymousTestDir { path: PathBuf },
}

/// Build tool used to compile test projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
    /// Project-aware multi-language builder; supports profiling instrumentation
    #[default]
    Gprbuild,
    /// Legacy builder, no profiling support
    Gnatmake,
}

impl BuildTool {
    /// Executable name of the tool
    pub fn command(&self) -> &'static str {
        match self {
            BuildTool::Gprbuild => "gprbuild",
            BuildTool::Gnatmake => "gnatmake",
        }
    }
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Which build strategy compiles the project
    pub build_tool: BuildTool,
    /// Wrap the test binary in gdb
    pub with_gdb: bool,
    /// Build with profiling instrumentation and run gprof after the binary
    pub with_gprof: bool,
    /// Where `<test>.diff` artifacts are written
    pub diffs_dir: PathBuf,
    /// Where `<test>_<binary>_gprof.out` reports are written
    pub profiles_dir: PathBuf,
    /// Run timeout in seconds
    pub timeout_secs: u64,
    /// The test's own directory; never read from a config file
    #[serde(skip)]
    pub test_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            build_tool: BuildTool::Gprbuild,
            with_gdb: false,
            with_gprof: false,
            diffs_dir: PathBuf::from("diffs"),
            profiles_dir: PathBuf::from("profiles"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            test_dir: PathBuf::from("."),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file. Keys that are absent keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_build_tool(mut self, tool: BuildTool) -> Self {
        self.build_tool = tool;
        self
    }

    pub fn with_gdb(mut self, enabled: bool) -> Self {
        self.with_gdb = enabled;
        self
    }

    pub fn with_gprof(mut self, enabled: bool) -> Self {
        self.with_gprof = enabled;
        self
    }

    pub fn with_diffs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diffs_dir = dir.into();
        self
    }

    pub fn with_profiles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profiles_dir = dir.into();
        self
    }

    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Apply the value of the `TIMEOUT` environment variable, if any.
    pub fn with_timeout_override(mut self, value: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(value) = value {
            self.timeout_secs = parse_timeout(value)?.as_secs();
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parse a `TIMEOUT` value (whole seconds).
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidTimeout {
            value: value.to_string(),
        })
}
