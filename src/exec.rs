//! External process execution for raw `cmd:` tasks and isolated sub-runs.
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Result of a command execution.
///
/// Output is not captured: commands inherit the terminal so long-running
/// task pipelines stream their output as they go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl From<ExitStatus> for ExecResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Abstraction over process spawning so tasks can be tested without running
/// real programs.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    /// Run `program` with `args` in `dir` and wait for it to finish.
    ///
    /// A non-zero exit is **not** an error; it is reported through
    /// [`ExecResult`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be started.
    fn run_in(&self, dir: &Path, program: &str, args: &[String]) -> Result<ExecResult>;
}

/// Production [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_in(&self, dir: &Path, program: &str, args: &[String]) -> Result<ExecResult> {
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .status()
            .with_context(|| format!("failed to execute: {program} in {}", dir.display()))?;
        Ok(ExecResult::from(status))
    }
}
