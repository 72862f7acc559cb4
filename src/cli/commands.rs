//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::PathBuf;
use std::time::Duration;

use harness_core::targets::MAKE_TARGETS;

use crate::config::{HarnessConfig, LauncherSection};
use crate::harness::{CommandRunner, EnvSnapshot, SystemRunner};
use crate::launcher::{
    BundleBuilder, CheckSetup, CompositeCheck, ContextType, DryRunSubmitter, JobConfig, LaunchError, LaunchPlan,
    LaunchResult, Sample, ServiceCredentials, ServiceSubmitter, StandaloneSubmitter, StreamtoolSubmitter,
    SubmissionHandle, Submitter, Topology, TraceLevel, launch_sample as submit_plan, run_check, verify_output,
};
use crate::runner::{ConsoleReporter, RunOptions, ScenarioRunner, read_test_list};
use crate::scenario::ScenarioRegistry;

use super::{CliError, CliResult, ExitCode, LaunchTarget};

// ============================================================================
// Scenarios
// ============================================================================

/// Arguments of `run`, after the CLI checked that some scenario was named.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub tests: Vec<String>,
    pub file: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub stop_on_fail: bool,
    pub filter: Option<String>,
    pub timeout: Option<u64>,
    pub verbose: bool,
}

/// Run the named scenarios (command line first, then the test list) against the real system.
pub fn run_scenarios(config: &HarnessConfig, args: RunArgs) -> CliResult<ExitCode> {
    let mut names = args.tests;
    if let Some(file) = &args.file {
        names.extend(read_test_list(file)?);
    }
    if names.is_empty() {
        return Err(CliError::failure(super::NO_TESTS_MESSAGE));
    }

    let mut waiter = config.harness.waiter();
    if let Some(secs) = args.timeout {
        waiter = waiter.with_timeout(Duration::from_secs(secs));
    }

    let registry = ScenarioRegistry::with_builtin();
    let env = EnvSnapshot::capture();
    let runner = ScenarioRunner::new(&registry, &env, &SystemRunner)
        .with_make(config.harness.make())
        .with_waiter(waiter)
        .with_log_archive_pattern(config.harness.log_archive_pattern.as_str());

    let options = RunOptions {
        root: args.root.unwrap_or_else(|| config.harness.root.clone()),
        stop_on_fail: args.stop_on_fail,
        filter: args.filter,
        verbose: args.verbose,
    };

    let mut reporter = ConsoleReporter::new(args.verbose);
    let report = runner.run_scenarios(&names, &options, &mut reporter);

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print the scenario catalogue, or the build-tool targets with `targets`.
pub fn list(targets: bool) -> CliResult<ExitCode> {
    if targets {
        for target in MAKE_TARGETS {
            let mark = if target.must_succeed { "" } else { " (may fail)" };
            println!("{:<20} {}{}", target.canonical, target.summary, mark);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let registry = ScenarioRegistry::with_builtin();
    let width = registry.names().map(str::len).max().unwrap_or(0);
    for scenario in registry.iter() {
        println!("{:<width$}  {}", scenario.name(), scenario.description(), width = width);
    }
    Ok(ExitCode::SUCCESS)
}

/// Report the unset environment variables of `scenarios` (every registered scenario if empty).
pub fn check_env(scenarios: &[String]) -> CliResult<ExitCode> {
    let registry = ScenarioRegistry::with_builtin();
    let env = EnvSnapshot::capture();

    let selected: Vec<&str> = if scenarios.is_empty() {
        registry.names().collect()
    } else {
        scenarios.iter().map(String::as_str).collect()
    };

    let mut incomplete = 0;
    for name in selected {
        let Some(scenario) = registry.get(name) else {
            return Err(CliError::failure(format!("Error: unable to find scenario {}", name)));
        };
        let missing = env.missing(scenario.required_env());
        if missing.is_empty() {
            println!("{} ok", name);
        } else {
            incomplete += 1;
            println!("{} missing {}", name, missing.join(", "));
        }
    }

    Ok(if incomplete == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ============================================================================
// Launcher
// ============================================================================

/// Arguments of `launch-composite`.
#[derive(Debug, Clone, Default)]
pub struct CompositeArgs {
    pub kind: String,
    pub name: Option<String>,
    pub extra_toolkits: Vec<PathBuf>,
    pub params: Vec<(String, String)>,
    pub expect: Option<String>,
    pub trace: Option<TraceLevel>,
}

/// Submit every job of a sample.
pub fn launch_sample(config: &HarnessConfig, sample: Sample, target: &LaunchTarget) -> CliResult<ExitCode> {
    let launcher = &config.launcher;
    let context = target.context.unwrap_or(launcher.context);
    let toolkit = target.toolkit.clone().unwrap_or_else(|| launcher.toolkit.clone());

    let plan = LaunchPlan::for_sample(sample, &toolkit)?;
    let env = EnvSnapshot::capture();
    let submitter = build_submitter(launcher, context, target.dry_run, &env, &SystemRunner)?;

    let handles = submit_plan(&plan, submitter.as_ref())?;
    for handle in &handles {
        report_handle(handle, target.dry_run);
    }
    Ok(ExitCode::SUCCESS)
}

/// Submit one composite, optionally checking its captured output for a marker.
///
/// `--expect` is refused before submitting on contexts that capture no output, so no job is left
/// running unchecked.
pub fn launch_composite(config: &HarnessConfig, args: CompositeArgs, target: &LaunchTarget) -> CliResult<ExitCode> {
    let launcher = &config.launcher;
    let context = target.context.unwrap_or(launcher.context);
    let toolkit = target.toolkit.clone().unwrap_or_else(|| launcher.toolkit.clone());
    let env = EnvSnapshot::capture();

    let name = match &args.name {
        Some(name) => name.clone(),
        None => harness_core::composites::split_kind(&args.kind)
            .map(|(_, simple)| simple.to_string())
            .unwrap_or_else(|| args.kind.clone()),
    };

    let mut topology = Topology::main_composite(name, args.kind.as_str())?.with_toolkit(toolkit);
    for extra in &args.extra_toolkits {
        topology.add_toolkit(extra.clone());
    }
    if context == ContextType::StreamingAnalyticsService && !target.dry_run {
        // Test composites connect back with the service's own user when none is given.
        let service = ServiceCredentials::from_env(&env)?;
        for (param, value) in service.user_params() {
            topology.params.entry(param).or_insert(value);
        }
    }
    for (param, value) in args.params {
        topology.params.insert(param, value);
    }

    let mut job_config = JobConfig::new().with_ssl_verify(false);
    if let Some(level) = args.trace {
        job_config = job_config.with_tracing(level);
    }

    let submitter = build_submitter(launcher, context, target.dry_run, &env, &SystemRunner)?;
    if args.expect.is_some() {
        require_captured_output(submitter.as_ref(), &topology.name)?;
    }
    let handle = submitter.submit(&topology, &job_config.to_config_map())?;
    report_handle(&handle, target.dry_run);

    if let Some(marker) = &args.expect {
        verify_output(&handle, marker)?;
        println!("{} pass", handle.name);
    }
    Ok(ExitCode::SUCCESS)
}

/// Arguments of `verify`.
#[derive(Debug, Clone, Default)]
pub struct VerifyArgs {
    pub checks: Vec<CompositeCheck>,
    pub test_toolkit: Option<PathBuf>,
    pub params: Vec<(String, String)>,
}

/// Run the composite checks (all of them when none are named).
///
/// Test composites run standalone unless `--context` says otherwise; jobs a check needs running
/// first go to the distributed instance. A dry run prints every job and verifies nothing.
pub fn verify(config: &HarnessConfig, args: VerifyArgs, target: &LaunchTarget) -> CliResult<ExitCode> {
    let launcher = &config.launcher;
    let context = target.context.unwrap_or(ContextType::Standalone);
    let toolkit = target.toolkit.clone().unwrap_or_else(|| launcher.toolkit.clone());
    let checks = if args.checks.is_empty() {
        CompositeCheck::ALL.to_vec()
    } else {
        args.checks
    };

    let mut setup = CheckSetup::new(toolkit);
    if let Some(test_toolkit) = args.test_toolkit {
        setup = setup.with_test_toolkit(test_toolkit);
    }
    for (param, value) in args.params {
        setup = setup.with_param(param, value);
    }

    if target.dry_run {
        let tests = DryRunSubmitter::new(context);
        let jobs = DryRunSubmitter::new(ContextType::Distributed);
        let config_map = setup.config.to_config_map();
        for check in &checks {
            let mut topologies = setup.topologies(*check)?;
            let test = topologies.pop();
            for topology in topologies.iter() {
                println!("{}", jobs.render(topology, &config_map)?);
            }
            if let Some(test) = test {
                println!("{}", tests.render(&test, &config_map)?);
            }
            println!("{} verification skipped (dry run)", check.job_name());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let env = EnvSnapshot::capture();
    let tests = build_submitter(launcher, context, false, &env, &SystemRunner)?;
    for check in &checks {
        require_captured_output(tests.as_ref(), check.job_name())?;
    }
    let jobs = if checks.iter().any(|c| c.prelaunch().is_some()) {
        Some(build_submitter(launcher, ContextType::Distributed, false, &env, &SystemRunner)?)
    } else {
        None
    };
    let jobs: &dyn Submitter = jobs.as_deref().unwrap_or(tests.as_ref());

    let mut failed = 0;
    for check in &checks {
        match run_check(*check, &setup, tests.as_ref(), jobs) {
            Ok(()) => println!("{} pass", check.job_name()),
            Err(e) => {
                failed += 1;
                println!("{} FAILED\n{}", check.job_name(), e);
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Refuse to submit `job` for output verification on a context that captures none.
fn require_captured_output(submitter: &dyn Submitter, job: &str) -> LaunchResult<()> {
    if submitter.captures_output() {
        return Ok(());
    }
    Err(LaunchError::Submit {
        context: submitter.context(),
        message: format!("{} cannot be verified: the context captures no job output", job),
    })
}

/// Submitter for `context`, or a dry-run renderer.
fn build_submitter<'a>(
    launcher: &LauncherSection,
    context: ContextType,
    dry_run: bool,
    env: &EnvSnapshot,
    runner: &'a dyn CommandRunner,
) -> LaunchResult<Box<dyn Submitter + 'a>> {
    if dry_run {
        return Ok(Box::new(DryRunSubmitter::new(context)));
    }

    let builder = BundleBuilder::new(launcher.sc.as_str(), launcher.output_dir.as_path());
    let submitter: Box<dyn Submitter + 'a> = match context {
        ContextType::Distributed => Box::new(StreamtoolSubmitter::from_env(
            runner,
            builder,
            launcher.streamtool.as_str(),
            env,
        )?),
        ContextType::StreamingAnalyticsService => Box::new(
            ServiceSubmitter::new(runner, builder, ServiceCredentials::from_env(env)?).with_ssl_verify(false),
        ),
        ContextType::Standalone => Box::new(StandaloneSubmitter::new(runner, builder)),
    };
    Ok(submitter)
}

fn report_handle(handle: &SubmissionHandle, dry_run: bool) {
    if dry_run {
        if let Some(out) = &handle.output {
            println!("{}", out.stdout);
        }
        return;
    }
    match &handle.job_id {
        Some(job_id) => println!("Submitted {} to {} (job {})", handle.name, handle.context, job_id),
        None => println!("Ran {} in {}", handle.name, handle.context),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::harness::{CommandOutput, HarnessResult};
    use std::path::Path;

    struct NeverRun;

    impl CommandRunner for NeverRun {
        fn run(&self, program: &str, _args: &[String], _cwd: &Path) -> HarnessResult<CommandOutput> {
            panic!("unexpected command {}", program);
        }
    }

    #[test]
    fn test_dry_run_needs_no_environment() {
        let submitter = build_submitter(
            &LauncherSection::default(),
            ContextType::StreamingAnalyticsService,
            true,
            &EnvSnapshot::empty(),
            &NeverRun,
        )
        .unwrap();
        assert_eq!(submitter.context(), ContextType::StreamingAnalyticsService);
    }

    #[test]
    fn test_distributed_requires_domain_and_instance() {
        let result = build_submitter(
            &LauncherSection::default(),
            ContextType::Distributed,
            false,
            &EnvSnapshot::empty(),
            &NeverRun,
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("STREAMS_DOMAIN_ID"));
    }

    #[test]
    fn test_output_verification_needs_standalone() {
        let section = LauncherSection::default();
        let env = EnvSnapshot::empty()
            .with("STREAMS_DOMAIN_ID", "d1")
            .with("STREAMS_INSTANCE_ID", "i1");
        for (context, dry_run) in [(ContextType::Distributed, false), (ContextType::Standalone, true)] {
            let submitter = build_submitter(&section, context, dry_run, &env, &NeverRun).unwrap();
            let err = require_captured_output(submitter.as_ref(), "test_logs_monitor").unwrap_err();
            assert!(err.to_string().contains("captures no job output"), "{}", err);
        }

        let standalone = build_submitter(&section, ContextType::Standalone, false, &env, &NeverRun).unwrap();
        assert!(require_captured_output(standalone.as_ref(), "test_logs_monitor").is_ok());
    }

    #[test]
    fn test_standalone_needs_no_environment() {
        let submitter = build_submitter(
            &LauncherSection::default(),
            ContextType::Standalone,
            false,
            &EnvSnapshot::empty(),
            &NeverRun,
        )
        .unwrap();
        assert_eq!(submitter.context(), ContextType::Standalone);
    }
}
