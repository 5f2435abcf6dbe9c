//! External command-line tool invocation.
//!
//! GDAL and WhiteboxTools do all raster work. Commands are built as plain
//! data (`ToolCommand`) so that a whole pipeline can be planned and
//! inspected before anything is executed, and are executed through the
//! `ToolRunner` trait so tests can record invocations instead of spawning.

use std::fmt;
use std::process::{Command, Stdio};

use crate::logging::{self, DataSource};
use crate::model::FloodDataError;

/// A program plus its fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
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

    /// Logging tag for this command's program.
    pub fn source(&self) -> DataSource {
        if self.program.contains("whitebox") {
            DataSource::Whitebox
        } else if self.program.starts_with("gdal") {
            DataSource::Gdal
        } else {
            DataSource::System
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Executes tool commands.
pub trait ToolRunner {
    fn run(&mut self, cmd: &ToolCommand) -> Result<(), FloodDataError>;
}

/// Spawns real processes, inheriting stdout and stderr so tool progress
/// output reaches the terminal.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, cmd: &ToolCommand) -> Result<(), FloodDataError> {
        logging::debug(cmd.source(), Some(&cmd.program), &format!("Running {}", cmd));

        let status = Command::new(&cmd.program)
            .args(&cmd.args)
            .status()
            .map_err(|_| FloodDataError::ToolNotFound(cmd.program.clone()))?;

        if status.success() {
            Ok(())
        } else {
            Err(FloodDataError::ToolFailed {
                program: cmd.program.clone(),
                status: status.code(),
            })
        }
    }
}

/// Runs each command in order, stopping at the first failure.
pub fn run_all(runner: &mut dyn ToolRunner, commands: &[ToolCommand]) -> Result<(), FloodDataError> {
    for cmd in commands {
        runner.run(cmd).inspect_err(|e| {
            logging::error(cmd.source(), Some(&cmd.program), &e.to_string());
        })?;
    }
    Ok(())
}

/// Returns `true` if `program` can be spawned at all. Output is discarded;
/// a nonzero exit from `--version` still counts as installed.
pub fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
