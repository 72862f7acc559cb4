//! Composite checks: submit a test composite and confirm it reported a pass.
//!
//! Each check runs one test composite from the test toolkit. The job status check first starts a
//! job that crashes on purpose so the monitor has a failure to report. Every job a check started
//! is cancelled afterwards, whether the check passed or not.

use std::collections::BTreeMap;
use std::path::PathBuf;

use harness_core::composites::{
    SAMPLE_CRASH_SOURCE, TEST_JOB_STATUS_SOURCE, TEST_LOGS_SOURCE, TEST_METRICS_SOURCE, TEST_TOOLKIT,
};
use harness_core::markers::TEST_RESULT_PASS;

use super::job_config::{ConfigMap, JobConfig};
use super::submit::{SubmissionHandle, Submitter};
use super::topology::Topology;
use super::{LaunchError, LaunchResult, verify_output};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CompositeCheck {
    /// MetricsSource reports the test job's metrics.
    Metrics,
    /// LogSource reports the application log notifications.
    Logs,
    /// JobStatusSource reports the crashing job.
    JobStatus,
}

impl CompositeCheck {
    pub const ALL: [CompositeCheck; 3] = [CompositeCheck::Metrics, CompositeCheck::Logs, CompositeCheck::JobStatus];

    pub fn job_name(self) -> &'static str {
        match self {
            CompositeCheck::Metrics => "test_metrics_monitor",
            CompositeCheck::Logs => "test_logs_monitor",
            CompositeCheck::JobStatus => "test_jobs_status_monitor",
        }
    }

    pub fn composite(self) -> &'static str {
        match self {
            CompositeCheck::Metrics => TEST_METRICS_SOURCE,
            CompositeCheck::Logs => TEST_LOGS_SOURCE,
            CompositeCheck::JobStatus => TEST_JOB_STATUS_SOURCE,
        }
    }

    /// Job name and composite that must be running before the check starts.
    pub fn prelaunch(self) -> Option<(&'static str, &'static str)> {
        match self {
            CompositeCheck::JobStatus => Some(("SampleCrashApp", SAMPLE_CRASH_SOURCE)),
            CompositeCheck::Metrics | CompositeCheck::Logs => None,
        }
    }
}

/// Toolkits, parameters and job configuration shared by the checks of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSetup {
    pub toolkits: Vec<PathBuf>,
    /// Parameters of the test composites. Prelaunched jobs take none.
    pub params: BTreeMap<String, String>,
    pub config: JobConfig,
}

impl CheckSetup {
    /// Test toolkit first, then the monitoring toolkit at `toolkit`.
    pub fn new(toolkit: impl Into<PathBuf>) -> Self {
        Self {
            toolkits: vec![PathBuf::from(TEST_TOOLKIT), toolkit.into()],
            params: BTreeMap::new(),
            config: JobConfig::new().with_ssl_verify(false),
        }
    }

    pub fn with_test_toolkit(mut self, path: impl Into<PathBuf>) -> Self {
        self.toolkits[0] = path.into();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Jobs of `check` in submission order: the prelaunched job, then the test composite.
    pub fn topologies(&self, check: CompositeCheck) -> LaunchResult<Vec<Topology>> {
        let mut jobs = Vec::with_capacity(2);
        if let Some((name, kind)) = check.prelaunch() {
            jobs.push(self.with_toolkits(Topology::main_composite(name, kind)?));
        }
        let mut test = self.with_toolkits(Topology::main_composite(check.job_name(), check.composite())?);
        test.params.extend(self.params.clone());
        jobs.push(test);
        Ok(jobs)
    }

    fn with_toolkits(&self, mut topology: Topology) -> Topology {
        for toolkit in &self.toolkits {
            topology.add_toolkit(toolkit.clone());
        }
        topology
    }
}

/// Run `check` and cancel everything it started.
///
/// The prelaunched job goes to `jobs`; the test composite runs on `tests`, which must capture the
/// job's output so it can be checked for `TEST_RESULT_PASS`.
///
/// ## Errors
/// - [`LaunchError::Submit`] before anything is submitted if `tests` does not capture output.
/// - The first submission, verification or cancellation error otherwise.
pub fn run_check(
    check: CompositeCheck,
    setup: &CheckSetup,
    tests: &dyn Submitter,
    jobs: &dyn Submitter,
) -> LaunchResult<()> {
    if !tests.captures_output() {
        return Err(LaunchError::Submit {
            context: tests.context(),
            message: format!(
                "{} captures no job output to check for {}; use the standalone context",
                check.job_name(),
                TEST_RESULT_PASS
            ),
        });
    }

    let config = setup.config.to_config_map();
    let mut started = Vec::new();
    let outcome = submit_and_verify(check, setup, &config, tests, jobs, &mut started);
    let cancelled = cancel_all(&started);
    outcome.and(cancelled)
}

fn submit_and_verify<'s>(
    check: CompositeCheck,
    setup: &CheckSetup,
    config: &ConfigMap,
    tests: &'s dyn Submitter,
    jobs: &'s dyn Submitter,
    started: &mut Vec<(SubmissionHandle, &'s dyn Submitter)>,
) -> LaunchResult<()> {
    let mut topologies = setup.topologies(check)?;
    let Some(test) = topologies.pop() else {
        return Ok(());
    };
    for topology in &topologies {
        tracing::info!(job = %topology.name, context = %jobs.context(), "launching");
        started.push((jobs.submit(topology, config)?, jobs));
    }

    tracing::info!(job = %test.name, context = %tests.context(), "checking");
    let handle = tests.submit(&test, config)?;
    let verified = verify_output(&handle, TEST_RESULT_PASS);
    started.push((handle, tests));
    verified
}

/// Cancel in reverse start order; every cancel is attempted.
fn cancel_all(started: &[(SubmissionHandle, &dyn Submitter)]) -> LaunchResult<()> {
    let mut first = None;
    for (handle, submitter) in started.iter().rev() {
        if let Err(e) = handle.cancel(*submitter) {
            tracing::warn!(job = %handle.name, error = %e, "cancel failed");
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}
