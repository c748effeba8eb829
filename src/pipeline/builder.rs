//! Project compilation

use tracing::{debug, error, warn};

use crate::config::BuildTool;
use crate::exec::{CommandRunner, CommandSpec};

use super::{Failure, Harness, Project};

/// Ada language level every test is compiled with
const LANGUAGE_FLAG: &str = "-gnat05";

/// Arguments passed to `tool` to build `project`.
///
/// Both tools create missing object directories (`-p`), force a full rebuild (`-f`) and bind with `-E` so that an
/// exception escaping the main subprogram prints a traceback. Profiling flags are only understood by gprbuild.
pub fn build_arguments(tool: BuildTool, project: &Project, with_gprof: bool) -> Vec<String> {
    let project_flag = format!("-P{}", project.descriptor());
    let mut args: Vec<String> = match tool {
        BuildTool::Gprbuild => vec!["-p", "-f", "-cargs", LANGUAGE_FLAG]
            .into_iter()
            .map(String::from)
            .collect(),
        BuildTool::Gnatmake => vec!["-p", "-f", LANGUAGE_FLAG]
            .into_iter()
            .map(String::from)
            .collect(),
    };
    args.push(project_flag);
    args.extend(["-bargs", "-E"].map(String::from));

    if with_gprof && tool == BuildTool::Gprbuild {
        args.extend(["-cargs", "-pg", "-O2", "-largs", "-pg"].map(String::from));
    }
    args
}

impl<R: CommandRunner> Harness<R> {
    /// Compile `project` with the configured build tool.
    #[tracing::instrument(skip_all, fields(project = %project, tool = %self.config.build_tool))]
    pub fn build(&self, project: &Project) -> Result<(), Failure> {
        let tool = self.config.build_tool;
        if self.config.with_gprof && tool == BuildTool::Gnatmake {
            warn!("profiling is not supported with gnatmake; building without instrumentation");
        }

        let spec = CommandSpec::new(tool.command())
            .args(build_arguments(tool, project, self.config.with_gprof))
            .current_dir(&self.test_dir);

        let result = self.runner.execute(&spec).map_err(|e| {
            let output = format!("could not start {}: {}", tool, e);
            error!("{}", output);
            Failure::Build {
                project: project.to_string(),
                output,
            }
        })?;

        if !result.success() {
            error!("{}", result.output);
            return Err(Failure::Build {
                project: project.to_string(),
                output: result.output,
            });
        }

        debug!("{}", result.output);
        Ok(())
    }
}
