//! Failure signaling for scenarios.

use thiserror::Error;

/// A scenario assertion that did not hold, with the output that explains it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stdout: {stdout}\nstderr: {stderr}")]
pub struct TestFailure {
    pub stdout: String,
    pub stderr: String,
}

impl TestFailure {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Failure with a short context line in place of stdout and a detail in place of stderr,
    /// e.g. `("Could not read file:", "done_1")`.
    pub fn message(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(context, detail)
    }

    /// Render the failure block printed for `test_name`.
    pub fn report(&self, test_name: &str) -> String {
        format!(
            "{} fail:\n\tstdout: {}\n\tstderr: {}\n",
            test_name, self.stdout, self.stderr
        )
    }
}

/// Fail with the captured streams unless `condition` holds.
pub fn assert_pass(condition: bool, stdout: &str, stderr: &str) -> Result<(), TestFailure> {
    if condition {
        Ok(())
    } else {
        Err(TestFailure::new(stdout, stderr))
    }
}
