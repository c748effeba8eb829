//! Test identity and project descriptors

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Name of a test, taken from its directory. Namespaces every artifact the run leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestIdentity(String);

impl TestIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive the identity from the final component of `dir` (after resolving `.` and symlinks).
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let canonical = dir.canonicalize().map_err(|source| ConfigError::TestDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = canonical
            .file_name()
            .ok_or_else(|| ConfigError::AnonymousTestDir { path: canonical.clone() })?;
        Ok(Self(name.to_string_lossy().into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<test>.diff`
    pub fn diff_file_name(&self) -> String {
        format!("{}.diff", self.0)
    }

    /// `<test>_<binary>_gprof.out`
    pub fn profile_file_name(&self, binary: &str) -> String {
        let binary = Path::new(binary)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary.to_string());
        format!("{}_{}_gprof.out", self.0, binary)
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A buildable unit: a project name (`hello`) or project file (`hello.gpr`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project(String);

impl Project {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn descriptor(&self) -> &str {
        &self.0
    }

    /// Name of the executable the build produces: the project name without directory or `.gpr` extension.
    pub fn binary_name(&self) -> String {
        let path = PathBuf::from(&self.0);
        let is_gpr = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gpr"));
        let name = if is_gpr { path.file_stem() } else { path.file_name() };
        name.map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
