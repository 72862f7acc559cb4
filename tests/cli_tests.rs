//! Command-line behaviour of the `streams-harness` binary.
//!
//! Every test runs in a fresh temporary directory so no `harness.toml` is picked up and no
//! build tool is reached.

use assert_cmd::Command;
use predicates::prelude::*;

fn harness(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("streams-harness").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn run_without_tests_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: Must specify either a test or a file of test names.",
        ));
}

#[test]
fn run_unknown_scenario_reports_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["run", "-t", "Nope/missing"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Nope/missing"))
        .stdout(predicate::str::contains("unable to find scenario Nope/missing"));
}

#[test]
fn run_with_missing_test_list_fails() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["run", "-f", "absent.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.txt"));
}

#[test]
fn list_shows_builtin_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("MetricsSource/appConfig"))
        .stdout(predicate::str::contains("LogSource/jmxReconnect"))
        .stdout(predicate::str::contains("JobStatusMonitor/test_app_config/distributed"));
}

#[test]
fn list_targets_marks_cleanup_targets() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["list", "--targets"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^stop-monitor\s+.*\(may fail\)$").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^configure\s+[^(]*$").unwrap());
}

#[test]
fn check_env_reports_missing_variables() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["check-env", "MetricsSource/appConfig"])
        .env_remove("STREAMS_DOMAIN_ID")
        .env("JMX_USER", "admin")
        .env_remove("JMX_PASSWORD")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "MetricsSource/appConfig missing STREAMS_DOMAIN_ID, JMX_PASSWORD",
        ));
}

#[test]
fn check_env_passes_when_everything_is_set() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["check-env", "MetricsSource/appConfig"])
        .env("STREAMS_DOMAIN_ID", "d1")
        .env("JMX_USER", "admin")
        .env("JMX_PASSWORD", "secret")
        .assert()
        .success()
        .stdout("MetricsSource/appConfig ok\n");
}

#[test]
fn launch_sample_dry_run_prints_each_job() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["launch", "microservices", "--dry-run", "--toolkit", "tk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"MetricsIngestService\""))
        .stdout(predicate::str::contains("\"name\": \"JobStatusService\""))
        .stdout(predicate::str::contains("\"name\": \"FailedPEService\""))
        .stdout(predicate::str::contains("\"tracing\": \"info\""));
}

#[test]
fn launch_composite_dry_run_carries_params() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args([
            "launch-composite",
            "test.metrics::TestMetricsSource",
            "--context",
            "standalone",
            "-P",
            "period=5",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"context\": \"standalone\""))
        .stdout(predicate::str::contains("\"name\": \"TestMetricsSource\""))
        .stdout(predicate::str::contains("\"period\": \"5\""));
}

#[test]
fn launch_composite_rejects_unqualified_kind() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["launch-composite", "TestMetricsSource", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("namespace::Name"));
}

#[test]
fn config_file_sets_default_context() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("harness.toml"), "[launcher]\ncontext = \"standalone\"\n").unwrap();
    harness(&dir)
        .args(["launch", "system-monitor", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"context\": \"standalone\""));
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("harness.toml"), "[harness]\nbogus = 1\n").unwrap();
    harness(&dir)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn launch_composite_expect_conflicts_with_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args([
            "launch-composite",
            "test.system::TestLogsSource",
            "--context",
            "standalone",
            "--expect",
            "TEST_RESULT_PASS",
            "--dry-run",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn launch_composite_expect_on_remote_context_submits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args([
            "launch-composite",
            "test.system::TestLogsSource",
            "--context",
            "distributed",
            "--expect",
            "TEST_RESULT_PASS",
        ])
        .env("STREAMS_DOMAIN_ID", "d1")
        .env("STREAMS_INSTANCE_ID", "i1")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("TestLogsSource cannot be verified"));
}

#[test]
fn verify_dry_run_prints_crash_job_before_the_check() {
    let dir = tempfile::tempdir().unwrap();
    let assert = harness(&dir).args(["verify", "job-status", "--dry-run"]).assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let crash = stdout.find("\"name\": \"SampleCrashApp\"").unwrap();
    let check = stdout.find("\"name\": \"test_jobs_status_monitor\"").unwrap();
    assert!(crash < check, "{}", stdout);
    assert!(stdout.contains("\"main_composite\": \"test.jobs::SampleCrashSource\""));
    assert!(stdout.contains("test_jobs_status_monitor verification skipped (dry run)"));
}

#[test]
fn verify_on_remote_context_fails_before_submitting() {
    let dir = tempfile::tempdir().unwrap();
    harness(&dir)
        .args(["verify", "--context", "distributed"])
        .env("STREAMS_DOMAIN_ID", "d1")
        .env("STREAMS_INSTANCE_ID", "i1")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("test_metrics_monitor cannot be verified"));
}
