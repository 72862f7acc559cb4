//! Scenario dispatch.
//!
//! ## Dispatch
//!
//! For each requested name the runner looks the scenario up in the registry, checks its directory
//! and required environment, evaluates its skip condition, then drives setup, run and teardown
//! against a [`ScenarioContext`] rooted at the scenario directory. A scenario that passes is
//! followed by `make clean`.
//!
//! Every outcome is a [`ScenarioResult`]; failures never abort the run unless
//! [`RunOptions::stop_on_fail`] is set. The process working directory is never changed.
//!
//! ## Reporting
//!
//! Results go through the [`TestReporter`] trait (see [`reporter`]).

pub mod reporter;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub use reporter::{ConsoleReporter, TestReporter, TestSummary};

use crate::harness::{
    CancelToken, CommandRunner, EnvSnapshot, FileWaiter, HarnessError, HarnessResult, Make, ScenarioContext,
    TestFailure, require_all,
};
use crate::scenario::{Scenario, ScenarioRegistry};

/// Why a scenario failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDetail {
    /// An assertion failed with the captured streams of the command that explains it.
    Streams(TestFailure),
    /// The scenario could not be dispatched or hit an environment/IO error.
    Message(String),
}

impl From<HarnessError> for FailureDetail {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Failure(failure) => FailureDetail::Streams(failure),
            other => FailureDetail::Message(other.to_string()),
        }
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureDetail::Streams(failure) => write!(f, "{}", failure),
            FailureDetail::Message(message) => f.write_str(message),
        }
    }
}

/// Outcome of a single scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioResult {
    Passed(Duration),
    Failed(Duration, FailureDetail),
    Skipped(String),
}

impl ScenarioResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, ScenarioResult::Failed(..))
    }
}

/// Options for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Directory the scenario directories are resolved against.
    pub root: PathBuf,
    /// Stop after the first failing scenario.
    pub stop_on_fail: bool,
    /// Only run scenarios whose name contains this keyword.
    pub filter: Option<String>,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            stop_on_fail: false,
            filter: None,
            verbose: false,
        }
    }
}

/// Results of a run in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<(String, ScenarioResult)>,
    pub summary: TestSummary,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.summary.all_passed()
    }
}

/// Dispatches scenarios from a registry.
pub struct ScenarioRunner<'a> {
    registry: &'a ScenarioRegistry,
    env: &'a EnvSnapshot,
    commands: &'a dyn CommandRunner,
    make: Make,
    waiter: FileWaiter,
    cancel: CancelToken,
    log_archives: Option<String>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(registry: &'a ScenarioRegistry, env: &'a EnvSnapshot, commands: &'a dyn CommandRunner) -> Self {
        Self {
            registry,
            env,
            commands,
            make: Make::default(),
            waiter: FileWaiter::default(),
            cancel: CancelToken::new(),
            log_archives: None,
        }
    }

    pub fn with_make(mut self, make: Make) -> Self {
        self.make = make;
        self
    }

    pub fn with_waiter(mut self, waiter: FileWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn with_log_archive_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.log_archives = Some(pattern.into());
        self
    }

    /// Token that cancels the sentinel waits of every scenario this runner dispatches.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run one scenario by name.
    #[tracing::instrument(skip_all, fields(scenario = name))]
    pub fn run_scenario(&self, name: &str, options: &RunOptions) -> ScenarioResult {
        let start = Instant::now();

        let Some(scenario) = self.registry.get(name) else {
            return ScenarioResult::Failed(
                start.elapsed(),
                HarnessError::UnknownScenario(name.to_string()).into(),
            );
        };

        let dir = options.root.join(scenario.directory());
        if !dir.is_dir() {
            return ScenarioResult::Failed(start.elapsed(), HarnessError::ScenarioDirectory(dir).into());
        }

        if let Err(e) = require_all(self.env, scenario.required_env()) {
            return ScenarioResult::Failed(start.elapsed(), e.into());
        }

        if let Some(reason) = scenario.skip_reason(self.env) {
            tracing::info!(%reason, "skipping");
            return ScenarioResult::Skipped(reason);
        }

        match self.drive(scenario, &dir) {
            Ok(()) => ScenarioResult::Passed(start.elapsed()),
            Err(e) => ScenarioResult::Failed(start.elapsed(), e.into()),
        }
    }

    fn drive(&self, scenario: &dyn Scenario, dir: &Path) -> HarnessResult<()> {
        let workdir = std::path::absolute(dir)?;
        let mut ctx = ScenarioContext::new(workdir, self.env, self.commands, &self.make, self.waiter)
            .with_cancel_token(self.cancel.clone());
        if let Some(pattern) = &self.log_archives {
            ctx = ctx.with_log_archive_pattern(pattern.as_str());
        }

        tracing::info!(dir = %ctx.workdir().display(), "setup");
        scenario.setup(&mut ctx)?;

        tracing::info!("run");
        let outcome = scenario.run(&mut ctx);

        tracing::info!("teardown");
        let teardown = scenario.teardown(&mut ctx);

        match (outcome, teardown) {
            (Err(e), Err(teardown_err)) => {
                tracing::warn!(error = %teardown_err, "teardown failed after a failing run");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => ctx.make_clean(),
        }
    }

    /// Run `names` in order and report each result.
    pub fn run_scenarios(
        &self,
        names: &[String],
        options: &RunOptions,
        reporter: &mut dyn TestReporter,
    ) -> RunReport {
        let start = Instant::now();

        let selected: Vec<&String> = names
            .iter()
            .filter(|name| options.filter.as_deref().is_none_or(|keyword| name.contains(keyword)))
            .collect();
        reporter.on_collection_complete(selected.len());

        let mut summary = TestSummary::default();
        let mut results = Vec::with_capacity(selected.len());

        for name in selected {
            reporter.on_scenario_start(name);
            let result = self.run_scenario(name, options);
            reporter.on_scenario_complete(name, &result);
            summary.record(&result);

            let stop = options.stop_on_fail && result.is_failure();
            results.push((name.clone(), result));
            if stop {
                tracing::info!(scenario = %name, "stopping after first failure");
                break;
            }
        }

        summary.duration = start.elapsed();
        reporter.on_run_complete(&summary);
        RunReport { results, summary }
    }
}

/// Read scenario names from a test list file.
///
/// One name per line with trailing whitespace stripped. Blank lines and lines starting with `#`
/// are skipped.
pub fn read_test_list(path: &Path) -> HarnessResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| HarnessError::TestList {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_test_list_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.txt");
        fs::write(&path, "LogSource/jmxReconnect  \n\n# disabled\nMetricsSource/appConfig\r\n").unwrap();

        let names = read_test_list(&path).unwrap();
        assert_eq!(names, vec!["LogSource/jmxReconnect", "MetricsSource/appConfig"]);
    }

    #[test]
    fn test_read_test_list_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_test_list(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, HarnessError::TestList { .. }));
    }

    #[test]
    fn test_failure_detail_from_error() {
        let detail: FailureDetail = HarnessError::UnknownScenario("X/y".into()).into();
        assert_eq!(detail, FailureDetail::Message("unable to find scenario X/y".into()));

        let detail: FailureDetail = HarnessError::Failure(TestFailure::new("o", "e")).into();
        assert!(matches!(detail, FailureDetail::Streams(_)));
    }
}
