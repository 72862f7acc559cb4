//! External process invocation.
//!
//! Commands run to completion with stdout and stderr captured in full. A non-zero exit code is
//! reported, never raised: callers decide what it means through
//! [`assert_pass`](super::assertions::assert_pass).
//!
//! The [`CommandRunner`] trait is the seam between scenarios and the operating system, so scenario
//! logic can be exercised against a scripted runner in tests.

use std::path::Path;
use std::process::{Command, ExitStatus};

use harness_core::targets::{self, MakeTargetId};

use super::{HarnessError, HarnessResult};

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether `marker` occurs anywhere in the captured stdout.
    pub fn contains(&self, marker: &str) -> bool {
        self.stdout.contains(marker)
    }

    /// The `(stdout, stderr, exit code)` triple.
    pub fn into_parts(self) -> (String, String, i32) {
        (self.stdout, self.stderr, self.exit_code)
    }
}

/// Runs external commands on behalf of the harness and the launcher.
pub trait CommandRunner {
    /// Run `program` with `args` in `cwd` and wait for it to exit.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> HarnessResult<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> HarnessResult<CommandOutput> {
        tracing::debug!(program, ?args, cwd = %cwd.display(), "exec");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: exit_code(output.status),
        })
    }
}

/// Exit code of a finished process; a process killed by a signal reports `-signal`.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// The build tool driving each scenario directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Make {
    program: String,
}

impl Default for Make {
    fn default() -> Self {
        Self::new("make")
    }
}

impl Make {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument vector for `target` followed by `extra` (e.g. `START_MON_ARGS=...`).
    pub fn args(target: MakeTargetId, extra: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(targets::as_str(target).to_string());
        args.extend(extra.iter().cloned());
        args
    }

    /// Run `make <target> <extra...>` in `cwd`.
    pub fn invoke(
        &self,
        runner: &dyn CommandRunner,
        cwd: &Path,
        target: MakeTargetId,
        extra: &[String],
    ) -> HarnessResult<CommandOutput> {
        runner.run(&self.program, &Self::args(target, extra), cwd)
    }
}
