//! Qualified names of the monitoring composites and test composites.
//!
//! A composite is referenced as `namespace::Name`. The SPL compiler names the bundle it produces
//! after the same name with `::` replaced by `.`; [`bundle_stem`] derives that stem.
//!
//! ## Examples
//! ```rust
//! use harness_core::composites;
//!
//! assert_eq!(
//!     composites::split_kind(composites::JOB_STATUS_SERVICE),
//!     Some(("com.ibm.streamsx.monitoring.jobs.services", "JobStatusService"))
//! );
//! assert_eq!(composites::bundle_stem("test.jobs::SampleCrashSource"), "test.jobs.SampleCrashSource");
//! ```

/// Default location of the monitoring toolkit, relative to a launcher working directory.
pub const MONITORING_TOOLKIT: &str = "../com.ibm.streamsx.monitoring";
/// Toolkit holding the test composites, relative to a launcher working directory.
pub const TEST_TOOLKIT: &str = "test_monitoring";

// Microservices
pub const METRICS_INGEST_SERVICE: &str = "com.ibm.streamsx.monitoring.metrics.services::MetricsIngestService";
pub const JOB_STATUS_SERVICE: &str = "com.ibm.streamsx.monitoring.jobs.services::JobStatusService";
pub const FAILED_PE_SERVICE: &str = "com.ibm.streamsx.monitoring.jobs.services::FailedPEService";

// Samples
pub const SYSTEM_MONITOR_SAMPLE_TOOLKIT: &str = "com.ibm.streamsx.monitoring.system.sample.SystemMonitorSource";
pub const SYSTEM_MONITOR_SAMPLE: &str = "com.ibm.streamsx.monitoring.system.sample.SystemMonitorSource::Monitor";
pub const JOB_STATUS_SAMPLE_TOOLKIT: &str = "com.ibm.streamsx.monitoring.jobs.sample.JobStatusMonitor";
pub const JOB_STATUS_SAMPLE_MONITOR: &str = "com.ibm.streamsx.monitoring.jobs.sample.JobStatusMonitor::Monitor";
pub const JOB_STATUS_SAMPLE_JOB: &str = "com.ibm.streamsx.monitoring.jobs.sample.JobStatusMonitor::SampleJob";

// Test composites emitting `TEST_RESULT_PASS`
pub const TEST_METRICS_SOURCE: &str = "test.metrics::TestMetricsSource";
pub const TEST_LOGS_SOURCE: &str = "test.system::TestLogsSource";
pub const TEST_JOB_STATUS_SOURCE: &str = "test.jobs::TestJobStatusSource";
/// Forces a PE crash so the job status monitor has something to report.
pub const SAMPLE_CRASH_SOURCE: &str = "test.jobs::SampleCrashSource";

/// Split a qualified composite name into namespace and simple name.
///
/// ## Returns
/// - `Some((namespace, name))` when `kind` contains `::` with non-empty parts on both sides.
/// - `None` otherwise (a composite in the default namespace is not addressable by the launcher).
pub fn split_kind(kind: &str) -> Option<(&str, &str)> {
    let (ns, name) = kind.rsplit_once("::")?;
    if ns.is_empty() || name.is_empty() {
        return None;
    }
    Some((ns, name))
}

/// File stem of the application bundle built for `kind`.
pub fn bundle_stem(kind: &str) -> String {
    kind.replace("::", ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_kind_rejects_unqualified() {
        assert_eq!(split_kind("Main"), None);
        assert_eq!(split_kind("::Main"), None);
        assert_eq!(split_kind("ns::"), None);
    }

    #[test]
    fn test_split_kind_nested_namespace() {
        assert_eq!(split_kind("a.b.c::Main"), Some(("a.b.c", "Main")));
    }
}
