//! Launch plans for the toolkit samples and microservices.

use std::path::Path;

use harness_core::composites::{
    FAILED_PE_SERVICE, JOB_STATUS_SAMPLE_JOB, JOB_STATUS_SAMPLE_MONITOR, JOB_STATUS_SAMPLE_TOOLKIT, JOB_STATUS_SERVICE,
    METRICS_INGEST_SERVICE, SYSTEM_MONITOR_SAMPLE, SYSTEM_MONITOR_SAMPLE_TOOLKIT,
};

use super::job_config::{JobConfig, TraceLevel};
use super::submit::{SubmissionHandle, Submitter};
use super::topology::Topology;
use super::LaunchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Sample {
    /// System monitor sample.
    SystemMonitor,
    /// Job status monitor plus the crashing job it watches.
    JobStatusMonitor,
    /// Metrics ingest, job status and failed PE services.
    Microservices,
}

/// Jobs to submit, in order, and the configuration they share.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub sample: Sample,
    pub jobs: Vec<Topology>,
    pub config: JobConfig,
}

impl LaunchPlan {
    /// Plan for `sample` with the monitoring toolkit at `toolkit`.
    pub fn for_sample(sample: Sample, toolkit: &Path) -> LaunchResult<Self> {
        // Samples connect to self-signed test domains.
        let config = JobConfig::new().with_ssl_verify(false);

        let plan = match sample {
            Sample::SystemMonitor => Self {
                sample,
                jobs: vec![
                    Topology::main_composite("SystemMonitorSample", SYSTEM_MONITOR_SAMPLE)?
                        .with_toolkit(toolkit)
                        .with_toolkit(SYSTEM_MONITOR_SAMPLE_TOOLKIT),
                ],
                config,
            },
            Sample::JobStatusMonitor => Self {
                sample,
                jobs: vec![
                    Topology::main_composite("JobStatusMonitorSample", JOB_STATUS_SAMPLE_MONITOR)?
                        .with_toolkit(toolkit)
                        .with_toolkit(JOB_STATUS_SAMPLE_TOOLKIT),
                    Topology::main_composite("CrashSample", JOB_STATUS_SAMPLE_JOB)?
                        .with_toolkit(toolkit)
                        .with_toolkit(JOB_STATUS_SAMPLE_TOOLKIT),
                ],
                config,
            },
            Sample::Microservices => Self {
                sample,
                jobs: vec![
                    Topology::main_composite("MetricsIngestService", METRICS_INGEST_SERVICE)?.with_toolkit(toolkit),
                    Topology::main_composite("JobStatusService", JOB_STATUS_SERVICE)?.with_toolkit(toolkit),
                    Topology::main_composite("FailedPEService", FAILED_PE_SERVICE)?.with_toolkit(toolkit),
                ],
                config: config.with_tracing(TraceLevel::Info),
            },
        };
        Ok(plan)
    }
}

/// Submit every job of `plan`, stopping at the first failed submission.
pub fn launch_sample(plan: &LaunchPlan, submitter: &dyn Submitter) -> LaunchResult<Vec<SubmissionHandle>> {
    let config = plan.config.to_config_map();
    let mut handles = Vec::with_capacity(plan.jobs.len());
    for topology in &plan.jobs {
        tracing::info!(job = %topology.name, context = %submitter.context(), "launching");
        handles.push(submitter.submit(topology, &config)?);
    }
    Ok(handles)
}
