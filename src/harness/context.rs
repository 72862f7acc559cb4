//! The view of the world one scenario invocation runs against.
//!
//! A [`ScenarioContext`] carries the scenario directory explicitly. Build-tool targets run with it
//! as their working directory, standalone executables and sentinel files are resolved inside it.
//! The helpers mirror the operations the scenario catalogue needs: build-tool targets, standalone
//! runs, sentinel waits and reads, scratch-file cleanup and environment lookups.

use std::path::{Path, PathBuf};

use harness_core::env::{JMX_PASSWORD, JMX_USER, STREAMS_DOMAIN_ID};
use harness_core::markers::{LOG_ARCHIVE_PATTERN, MONITOR_STANDALONE_BIN, STANDALONE_BIN};
use harness_core::targets::{self, MakeTargetId};

use super::assertions::{TestFailure, assert_pass};
use super::env::EnvSnapshot;
use super::files;
use super::process::{CommandOutput, CommandRunner, Make};
use super::wait::{CancelToken, FileWaiter, WaitOutcome};
use super::HarnessResult;

pub struct ScenarioContext<'a> {
    workdir: PathBuf,
    env: &'a EnvSnapshot,
    runner: &'a dyn CommandRunner,
    make: &'a Make,
    waiter: FileWaiter,
    cancel: CancelToken,
    log_archives: String,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(
        workdir: impl Into<PathBuf>,
        env: &'a EnvSnapshot,
        runner: &'a dyn CommandRunner,
        make: &'a Make,
        waiter: FileWaiter,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            env,
            runner,
            make,
            waiter,
            cancel: CancelToken::new(),
            log_archives: LOG_ARCHIVE_PATTERN.to_string(),
        }
    }

    /// Use `cancel` for this context's sentinel waits.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_log_archive_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.log_archives = pattern.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// `name` resolved inside the scenario directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.workdir.join(name)
    }

    pub fn env(&self) -> &EnvSnapshot {
        self.env
    }

    pub fn env_var(&self, name: &str) -> HarnessResult<&str> {
        self.env.require(name)
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    // ------------------------------------------------------------------------
    // Build tool
    // ------------------------------------------------------------------------

    /// Run a target and return its output, whatever the exit code.
    pub fn make(&self, target: MakeTargetId, args: &[String]) -> HarnessResult<CommandOutput> {
        self.make.invoke(self.runner, &self.workdir, target, args)
    }

    /// Run a target and apply its registry policy: targets that must succeed fail the scenario on
    /// a non-zero exit, the others only log it.
    fn target(&self, target: MakeTargetId, args: &[String]) -> HarnessResult<()> {
        let out = self.make(target, args)?;
        if targets::info_for(target).must_succeed {
            assert_pass(out.success(), &out.stdout, &out.stderr)?;
        } else if !out.success() {
            tracing::debug!(target = targets::as_str(target), exit_code = out.exit_code, "cleanup target failed");
        }
        Ok(())
    }

    pub fn make_all(&self) -> HarnessResult<CommandOutput> {
        self.make(MakeTargetId::All, &[])
    }

    pub fn make_build(&self) -> HarnessResult<CommandOutput> {
        self.make(MakeTargetId::Build, &[])
    }

    pub fn make_clean(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::Clean, &[])
    }

    /// Build every application of the scenario, failing on a non-zero exit.
    pub fn make_applications(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::All, &[])
    }

    pub fn start_sample(&self, args: &[String]) -> HarnessResult<()> {
        self.target(MakeTargetId::StartSample, args)
    }

    pub fn stop_sample(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::StopSample, &[])
    }

    pub fn start_monitor(&self, args: &[String]) -> HarnessResult<()> {
        self.target(MakeTargetId::StartMonitor, args)
    }

    pub fn stop_monitor(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::StopMonitor, &[])
    }

    pub fn start_test_domain(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::StartTestDomain, &[])
    }

    pub fn stop_test_domain(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::StopTestDomain, &[])
    }

    pub fn create_app_config(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::Configure, &[])
    }

    pub fn create_app_config_json(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::ConfigureJson, &[])
    }

    pub fn rm_app_config(&self) -> HarnessResult<()> {
        self.target(MakeTargetId::ConfigureClean, &[])
    }

    // ------------------------------------------------------------------------
    // Standalone executables
    // ------------------------------------------------------------------------

    pub fn run_standalone(&self, args: &[String]) -> HarnessResult<CommandOutput> {
        self.run_binary(STANDALONE_BIN, args)
    }

    pub fn run_monitor_standalone(&self, args: &[String]) -> HarnessResult<CommandOutput> {
        self.run_binary(MONITOR_STANDALONE_BIN, args)
    }

    fn run_binary(&self, relative: &str, args: &[String]) -> HarnessResult<CommandOutput> {
        let program = self.path(relative);
        self.runner.run(&program.to_string_lossy(), args, &self.workdir)
    }

    /// `user=`, `password=` and `domainId=` submission arguments from the environment.
    pub fn jmx_credentials_args(&self) -> HarnessResult<Vec<String>> {
        Ok(vec![
            format!("user={}", self.env_var(JMX_USER)?),
            format!("password={}", self.env_var(JMX_PASSWORD)?),
            format!("domainId={}", self.env_var(STREAMS_DOMAIN_ID)?),
        ])
    }

    // ------------------------------------------------------------------------
    // Sentinels and scratch files
    // ------------------------------------------------------------------------

    pub fn wait_for_file(&self, name: &str) -> WaitOutcome {
        let path = self.path(name);
        tracing::info!(path = %path.display(), "waiting for sentinel");
        self.waiter.wait(&path, &self.cancel)
    }

    pub fn test_result_file(&self, name: &str) -> i32 {
        files::test_result_file(&self.path(name))
    }

    /// Fail unless the sentinel `name` can be read.
    pub fn require_result_file(&self, name: &str) -> HarnessResult<()> {
        if self.test_result_file(name) == 0 {
            Ok(())
        } else {
            Err(TestFailure::message("Could not read file:", name).into())
        }
    }

    pub fn remove_f(&self, name: &str) -> HarnessResult<()> {
        Ok(files::remove_f(&self.path(name))?)
    }

    pub fn remove_files(&self, pattern: &str) -> HarnessResult<usize> {
        files::remove_files(&self.workdir, pattern)
    }

    /// Remove log archives left by cancelled jobs.
    pub fn remove_log_archives(&self) -> HarnessResult<usize> {
        files::remove_files(&self.workdir, &self.log_archives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::HarnessError;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Records invocations and answers with a fixed exit code per program argument.
    struct ScriptedRunner {
        calls: RefCell<Vec<Vec<String>>>,
        failing_target: Option<MakeTargetId>,
    }

    impl ScriptedRunner {
        fn new(failing_target: Option<MakeTargetId>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                failing_target,
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[String], _cwd: &Path) -> HarnessResult<CommandOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.borrow_mut().push(call);

            let fails = self
                .failing_target
                .is_some_and(|t| args.first().map(String::as_str) == Some(targets::as_str(t)));
            Ok(CommandOutput::new("out", "err", if fails { 2 } else { 0 }))
        }
    }

    fn waiter() -> FileWaiter {
        FileWaiter::new(Duration::from_millis(50), Duration::from_millis(10))
    }

    #[test]
    fn test_must_succeed_target_fails_with_streams() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::empty();
        let runner = ScriptedRunner::new(Some(MakeTargetId::StartSample));
        let make = Make::default();
        let ctx = ScenarioContext::new(dir.path(), &env, &runner, &make, waiter());

        match ctx.start_sample(&[]) {
            Err(HarnessError::Failure(f)) => {
                assert_eq!(f.stdout, "out");
                assert_eq!(f.stderr, "err");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_cleanup_target_ignores_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::empty();
        let runner = ScriptedRunner::new(Some(MakeTargetId::StopSample));
        let make = Make::default();
        let ctx = ScenarioContext::new(dir.path(), &env, &runner, &make, waiter());

        assert!(ctx.stop_sample().is_ok());
    }

    #[test]
    fn test_make_all_returns_output_without_asserting() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::empty();
        let runner = ScriptedRunner::new(Some(MakeTargetId::All));
        let make = Make::new("gmake");
        let ctx = ScenarioContext::new(dir.path(), &env, &runner, &make, waiter());

        let out = ctx.make_all().unwrap();
        assert_eq!(out.exit_code, 2);
        assert_eq!(runner.calls.borrow()[0], vec!["gmake".to_string(), "all".to_string()]);
    }

    #[test]
    fn test_monitor_standalone_resolved_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::empty()
            .with(JMX_USER, "u")
            .with(JMX_PASSWORD, "p")
            .with(STREAMS_DOMAIN_ID, "d");
        let runner = ScriptedRunner::new(None);
        let make = Make::default();
        let ctx = ScenarioContext::new(dir.path(), &env, &runner, &make, waiter());

        let args = ctx.jmx_credentials_args().unwrap();
        ctx.run_monitor_standalone(&args).unwrap();

        let calls = runner.calls.borrow();
        let program = PathBuf::from(&calls[0][0]);
        assert_eq!(program, dir.path().join(MONITOR_STANDALONE_BIN));
        assert_eq!(&calls[0][1..], &["user=u", "password=p", "domainId=d"]);
    }

    #[test]
    fn test_require_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::empty();
        let runner = ScriptedRunner::new(None);
        let make = Make::default();
        let ctx = ScenarioContext::new(dir.path(), &env, &runner, &make, waiter());

        let err = ctx.require_result_file("done_1").unwrap_err();
        assert!(matches!(err, HarnessError::Failure(ref f) if f.stdout == "Could not read file:" && f.stderr == "done_1"));

        std::fs::write(ctx.path("done_1"), b"ok").unwrap();
        assert!(ctx.require_result_file("done_1").is_ok());
        ctx.remove_f("done_1").unwrap();
        assert!(!ctx.path("done_1").exists());
    }
}
