//! End-to-end pipeline tests through the public API
//!
//! The build tool and the test binary are simulated by [`FakeToolchain`]; `diff` is the real one, so these tests
//! also pin down the whitespace tolerance of the comparison.

#![cfg(unix)]

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;

use regtest::{
    CommandRunner, CommandSpec, ExecutionResult, Failure, Harness, HarnessConfig, Outcome, Project, SystemCommandRunner,
};

/// Pretends to be gprbuild/gnatmake and the test binary; forwards everything else to the system.
struct FakeToolchain {
    build_status: i32,
    binary_status: i32,
    binary_output: String,
    programs: RefCell<Vec<String>>,
}

impl FakeToolchain {
    fn new(binary_output: &str) -> Self {
        Self {
            build_status: 0,
            binary_status: 0,
            binary_output: binary_output.to_string(),
            programs: RefCell::new(Vec::new()),
        }
    }

    fn programs(&self) -> Vec<String> {
        self.programs.borrow().clone()
    }
}

impl CommandRunner for FakeToolchain {
    fn execute(&self, spec: &CommandSpec) -> io::Result<ExecutionResult> {
        let name = Path::new(&spec.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.programs.borrow_mut().push(name.clone());

        let status = match name.as_str() {
            "gprbuild" | "gnatmake" => self.build_status,
            "diff" => return SystemCommandRunner.execute(spec),
            _ => {
                if let Some(path) = spec.resolved_output() {
                    fs::write(path, &self.binary_output)?;
                }
                self.binary_status
            }
        };
        Ok(ExecutionResult {
            status,
            timed_out: false,
            output: String::new(),
            output_path: spec.resolved_output(),
        })
    }
}

fn test_dir(root: &Path, name: &str, expected: Option<&str>) -> std::path::PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    if let Some(expected) = expected {
        fs::write(dir.join("test.out"), expected).unwrap();
    }
    dir
}

fn config(root: &Path, dir: &Path) -> HarnessConfig {
    HarnessConfig::new().with_test_dir(dir).with_diffs_dir(root.join("diffs"))
}

#[test]
fn test_matching_output_passes() {
    let root = tempfile::tempdir().unwrap();
    let dir = test_dir(root.path(), "hello_world", Some("Hello\nWorld\n"));
    let runner = FakeToolchain::new("Hello\nWorld\n");
    let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();

    assert_eq!(harness.check(&Project::new("hello")), Outcome::Success);
    assert_eq!(runner.programs(), vec!["gprbuild", "hello", "diff"]);
    assert!(!root.path().join("diffs").join("hello_world.diff").exists());
}

#[test]
fn test_whitespace_differences_are_ignored() {
    let root = tempfile::tempdir().unwrap();
    let dir = test_dir(root.path(), "spacing", Some("a  b\n  c\n"));
    let runner = FakeToolchain::new("a b\nc \n");
    let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();

    assert!(harness.build_and_run_and_diff(&Project::new("spacing")).is_ok());
}

#[test]
fn test_build_failure_short_circuits() {
    let root = tempfile::tempdir().unwrap();
    let dir = test_dir(root.path(), "broken", Some("x\n"));
    let mut runner = FakeToolchain::new("x\n");
    runner.build_status = 4;
    let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();

    let result = harness.build_and_run_and_diff(&Project::new("broken"));
    assert!(matches!(result, Err(Failure::Build { .. })));
    assert_eq!(runner.programs(), vec!["gprbuild"]);
    assert!(!dir.join("test.res").exists());
}

#[test]
fn test_crash_is_runtime_failure_without_diff() {
    let root = tempfile::tempdir().unwrap();
    let dir = test_dir(root.path(), "crash", Some("x\n"));
    let mut runner = FakeToolchain::new("partial\n");
    runner.binary_status = 134;
    let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();

    assert_eq!(harness.check(&Project::new("crash")), Outcome::RuntimeFailure);
    assert_eq!(Outcome::RuntimeFailure.exit_code(), 3);
    assert!(!runner.programs().contains(&"diff".to_string()));
    assert!(!root.path().join("diffs").join("crash.diff").exists());
}

#[test]
fn test_mismatch_writes_artifact_in_shared_diffs_dir() {
    let root = tempfile::tempdir().unwrap();
    let dir = test_dir(root.path(), "t_mismatch", Some("A\nB\n"));
    let runner = FakeToolchain::new("A\nC\n");
    let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();

    assert_eq!(harness.check(&Project::new("t_mismatch.gpr")), Outcome::DiffFailure);

    let artifact = fs::read_to_string(root.path().join("diffs").join("t_mismatch.diff")).unwrap();
    assert_eq!(
        artifact,
        "================ Bug t_mismatch\n\
         ---------------- actual output\n\
         A\n\
         C\n\
         ---------------- expected output\n\
         A\n\
         B\n"
    );
}

#[test]
fn test_missing_baseline_is_diff_failure() {
    let root = tempfile::tempdir().unwrap();
    let dir = test_dir(root.path(), "new_test", None);
    let runner = FakeToolchain::new("first run\n");
    let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();

    assert_eq!(harness.check(&Project::new("new_test")), Outcome::DiffFailure);
    assert!(!runner.programs().contains(&"diff".to_string()));

    let artifact = fs::read_to_string(root.path().join("diffs").join("new_test.diff")).unwrap();
    assert_eq!(
        artifact,
        "================ Bug new_test\n---------------- unexpected output\nfirst run\n"
    );
}

#[test]
fn test_artifacts_of_different_tests_do_not_collide() {
    let root = tempfile::tempdir().unwrap();
    for name in ["t1", "t2"] {
        let dir = test_dir(root.path(), name, Some("expected\n"));
        let runner = FakeToolchain::new(&format!("{name} output\n"));
        let harness = Harness::with_runner(config(root.path(), &dir), &runner).unwrap();
        assert_eq!(harness.check(&Project::new("p")), Outcome::DiffFailure);
    }

    let t1 = fs::read_to_string(root.path().join("diffs").join("t1.diff")).unwrap();
    let t2 = fs::read_to_string(root.path().join("diffs").join("t2.diff")).unwrap();
    assert!(t1.contains("t1 output") && !t1.contains("t2 output"));
    assert!(t2.contains("t2 output") && !t2.contains("t1 output"));
}
