//! Job launcher: submit monitoring composites to an execution context.
//!
//! ## Model
//!
//! - [`Topology`]: a job whose main composite is an external composite, plus its toolkit search
//!   path and submission parameters.
//! - [`JobConfig`] / [`ConfigMap`]: the opaque configuration mapping sent with a submission.
//! - [`Submitter`]: one execution context. Submitting compiles the topology (see
//!   [`BundleBuilder`]) and hands the result to the context; the returned [`SubmissionHandle`]
//!   can cancel the job.
//!
//! ## Contexts
//!
//! - [`StreamtoolSubmitter`] for a Streams instance (`streamtool submitjob`)
//! - [`ServiceSubmitter`] for the Streaming Analytics service REST API
//! - [`StandaloneSubmitter`] runs the compiled standalone executable to completion
//! - [`DryRunSubmitter`] renders the submission as JSON and touches nothing
//!
//! Only the standalone context captures job output ([`Submitter::captures_output`]). Callers that
//! verify output, like the composite checks in [`checks`], refuse other contexts before submitting.
//!
//! Nothing is retried and no state is kept after a submission returns.

pub mod checks;
pub mod job_config;
pub mod samples;
pub mod service;
pub mod submit;
pub mod topology;

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use checks::{CheckSetup, CompositeCheck, run_check};
pub use job_config::{ConfigMap, Credentials, JobConfig, TraceLevel};
pub use samples::{LaunchPlan, Sample, launch_sample};
pub use service::{ServiceCredentials, ServiceSubmitter};
pub use submit::{DryRunSubmitter, StandaloneSubmitter, StreamtoolSubmitter, SubmissionHandle, Submitter};
pub use topology::{Bundle, BundleBuilder, Topology};

use crate::harness::{HarnessError, assert_pass};

/// Where a job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ContextType {
    /// A Streams instance reached with `streamtool`.
    #[default]
    Distributed,
    /// The Streaming Analytics cloud service.
    StreamingAnalyticsService,
    /// A local standalone executable.
    Standalone,
}

impl ContextType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextType::Distributed => "distributed",
            ContextType::StreamingAnalyticsService => "streaming-analytics-service",
            ContextType::Standalone => "standalone",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("composite name must be qualified as namespace::Name: {0}")]
    Composite(String),

    #[error("failed to compile {composite}:\n{stderr}")]
    Build { composite: String, stderr: String },

    #[error("submission to {context} failed: {message}")]
    Submit { context: ContextType, message: String },

    #[error("credentials: {0}")]
    Credentials(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type LaunchResult<T> = Result<T, LaunchError>;

/// Check that a finished job exited cleanly and printed `marker`.
///
/// ## Errors
/// - [`LaunchError::Submit`] if the context captured no output (remote jobs).
/// - [`LaunchError::Harness`] wrapping the captured streams if the check fails.
pub fn verify_output(handle: &SubmissionHandle, marker: &str) -> LaunchResult<()> {
    let Some(out) = &handle.output else {
        return Err(LaunchError::Submit {
            context: handle.context,
            message: format!("{} captured no output to check for {}", handle.name, marker),
        });
    };
    assert_pass(out.success() && out.contains(marker), &out.stdout, &out.stderr).map_err(HarnessError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::CommandOutput;
    use harness_core::markers::TEST_RESULT_PASS;

    fn handle(output: Option<CommandOutput>) -> SubmissionHandle {
        SubmissionHandle {
            context: ContextType::Standalone,
            name: "test_logs_monitor".to_string(),
            job_id: None,
            output,
        }
    }

    #[test]
    fn test_verify_output() {
        let pass = handle(Some(CommandOutput::new("result: TEST_RESULT_PASS\n", "", 0)));
        assert!(verify_output(&pass, TEST_RESULT_PASS).is_ok());

        let crashed = handle(Some(CommandOutput::new("TEST_RESULT_PASS", "boom", 1)));
        assert!(matches!(
            verify_output(&crashed, TEST_RESULT_PASS),
            Err(LaunchError::Harness(HarnessError::Failure(_)))
        ));

        let remote = handle(None);
        assert!(matches!(verify_output(&remote, TEST_RESULT_PASS), Err(LaunchError::Submit { .. })));
    }

    #[test]
    fn test_context_spelling_matches_cli_and_serde() {
        use clap::ValueEnum;
        for ctx in ContextType::value_variants() {
            let cli = ctx.to_possible_value().map(|v| v.get_name().to_string());
            assert_eq!(cli.as_deref(), Some(ctx.as_str()));
            assert_eq!(serde_json::to_value(ctx).unwrap(), serde_json::Value::from(ctx.as_str()));
        }
    }
}
