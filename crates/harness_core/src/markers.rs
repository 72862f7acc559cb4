//! Completion signals shared with the external test applications.
//!
//! Test applications report success either by writing a sentinel file into their scenario
//! directory or by printing [`TEST_RESULT_PASS`] on standard output.

/// Marker printed (or emitted as a tuple value) by a passing test composite.
pub const TEST_RESULT_PASS: &str = "TEST_RESULT_PASS";

/// Sentinel written after the first round of notifications.
pub const RESULT_FILE_1: &str = "done_1";

/// Sentinel written after the reconnect round of notifications.
pub const RESULT_FILE_2: &str = "done_2";

/// Log archives left behind by cancelled jobs.
pub const LOG_ARCHIVE_PATTERN: &str = "StreamsLogsJob*.tgz";

/// Default upper bound for a sentinel wait, in seconds.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 180;

/// Default interval between sentinel existence checks, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Standalone executable of the sample application, relative to the scenario directory.
pub const STANDALONE_BIN: &str = "output/bin/standalone";

/// Standalone executable of the monitor application, relative to the scenario directory.
pub const MONITOR_STANDALONE_BIN: &str = "output/monitor/bin/standalone";
