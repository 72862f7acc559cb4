//! Define the build-tool target vocabulary every scenario directory's Makefile exposes.
//!
//! Scenarios never spell a target by hand; they go through [`MakeTargetId`] so the harness, the
//! guardrail tests and the generated `list` output agree on one table.
//!
//! ## Notes
//! - [`MAKE_TARGETS`] is ordered exactly like the [`MakeTargetId`] discriminants; [`info_for`] relies
//!   on that and the guardrail tests enforce it.
//! - `must_succeed` records whether the harness treats a non-zero exit of the target as a scenario
//!   failure. Stop/cleanup targets are run for their side effect only.
//!
//! ## Examples
//! ```rust
//! use harness_core::targets::{self, MakeTargetId};
//!
//! assert!(targets::info_for(MakeTargetId::StartSample).must_succeed);
//! assert!(!targets::info_for(MakeTargetId::StopSample).must_succeed);
//! ```

/// Stable identifier for every build-tool target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MakeTargetId {
    // Build
    All,
    Build,
    Clean,

    // Application configuration
    Configure,
    ConfigureJson,
    ConfigureClean,

    // Sample application
    StartSample,
    StopSample,

    // Monitor application
    StartMonitor,
    StopMonitor,

    // Second domain/instance used by the JMX reconnect scenarios
    StartTestDomain,
    StopTestDomain,
}

/// Metadata for a build-tool target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakeTargetInfo {
    pub id: MakeTargetId,
    pub canonical: &'static str,
    pub summary: &'static str,
    pub must_succeed: bool,
}

/// Registry of all build-tool targets.
pub const MAKE_TARGETS: &[MakeTargetInfo] = &[
    info(MakeTargetId::All, "all", "Build every application of the scenario", true),
    info(MakeTargetId::Build, "build", "Build the scenario applications without configuring", true),
    info(MakeTargetId::Clean, "clean", "Remove generated build output", true),
    info(
        MakeTargetId::Configure,
        "configure",
        "Create the application configuration holding the JMX credentials",
        true,
    ),
    info(
        MakeTargetId::ConfigureJson,
        "configure-json",
        "Create the application configuration including the filter document",
        true,
    ),
    info(
        MakeTargetId::ConfigureClean,
        "configure-clean",
        "Remove the application configuration",
        false,
    ),
    info(MakeTargetId::StartSample, "start-sample", "Submit the monitored sample job", true),
    info(MakeTargetId::StopSample, "stop-sample", "Cancel the monitored sample job", false),
    info(MakeTargetId::StartMonitor, "start-monitor", "Submit the monitor job", true),
    info(MakeTargetId::StopMonitor, "stop-monitor", "Cancel the monitor job", false),
    info(
        MakeTargetId::StartTestDomain,
        "start-test-domain",
        "Start the second domain and instance",
        true,
    ),
    info(
        MakeTargetId::StopTestDomain,
        "stop-test-domain",
        "Stop the second domain and instance",
        false,
    ),
];

/// Canonical spelling.
///
/// ## Parameters
/// - `id`: Target identifier.
///
/// ## Returns
/// - The spelling passed to the build tool for `id`.
pub fn as_str(id: MakeTargetId) -> &'static str {
    info_for(id).canonical
}

/// Full metadata entry for a target.
pub fn info_for(id: MakeTargetId) -> &'static MakeTargetInfo {
    &MAKE_TARGETS[id as usize]
}

/// Lookup by spelling.
///
/// ## Returns
/// - `Some(MakeTargetId)` if `s` is a known target spelling, `None` otherwise.
///
/// ## Notes
/// - Matching is case-sensitive, like the build tool itself.
pub fn from_str(s: &str) -> Option<MakeTargetId> {
    MAKE_TARGETS.iter().find(|t| t.canonical == s).map(|t| t.id)
}

const fn info(id: MakeTargetId, canonical: &'static str, summary: &'static str, must_succeed: bool) -> MakeTargetInfo {
    MakeTargetInfo {
        id,
        canonical,
        summary,
        must_succeed,
    }
}
