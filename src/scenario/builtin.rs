//! The scenario catalogue of the monitoring toolkit.
//!
//! Two families live here. The plain scenarios (`MetricsSource/appConfig`, `LogSource/...`) are a
//! single body each and clean up inline on failure. The case scenarios share a directory per
//! feature and split their work into setup, run and teardown so the teardown stops whatever the
//! run started, whether it passed or not.

use harness_core::env::{
    JMX_DOMAIN_VARS, JMX_PASSWORD, JMX_USER, JMX_VARS, SERVICE_USER_VARS, STREAMS_DOMAIN_ID, TEST_DOMAIN,
    TEST_INSTANCE,
};
use harness_core::markers::{RESULT_FILE_1, RESULT_FILE_2, TEST_RESULT_PASS};

use super::{FnScenario, Scenario, ScenarioRegistry};
use crate::harness::{EnvSnapshot, HarnessResult, ScenarioContext, assert_pass, check_domain};

/// Filter document argument passed to the monitor instead of an app-config entry.
const FILTER_DOC_PARAM: &str = "START_MON_ARGS=-P filterDocument=etc/MetricsSource_MonitorOperatorMetrics.json";

/// Second domain plus the monitored domain, checked in the order they are reported.
const RECONNECT_VARS: &[&str] = &[TEST_DOMAIN, TEST_INSTANCE, STREAMS_DOMAIN_ID, JMX_USER, JMX_PASSWORD];

const SECOND_DOMAIN_MISSING: &str = "Missing configuration for second Streams domain and instance. \
     Environment variables TEST_DOMAIN and TEST_INSTANCE are not set.";

pub fn register_builtin(registry: &mut ScenarioRegistry) {
    registry.register(
        FnScenario::new("MetricsSource/appConfig", metrics_app_config)
            .with_description("MetricsSource reads JMX credentials from an application configuration")
            .with_required_env(JMX_DOMAIN_VARS),
    );
    registry.register(
        FnScenario::new("LogSource/jmxReconnect", log_jmx_reconnect)
            .with_description("LogSource reconnects after the monitored domain restarts")
            .with_required_env(RECONNECT_VARS),
    );
    registry.register(
        FnScenario::new("LogSource/appLogNotifications", log_app_notifications)
            .with_description("Standalone monitor receives application log notifications")
            .with_required_env(JMX_DOMAIN_VARS),
    );

    registry.register(AppConfigCase {
        name: "MetricsSource/test_app_config/distributed",
        directory: "MetricsSource/test_app_config",
        description: "MetricsSource with credentials from an application configuration",
        config: AppConfig::Plain,
        with_sample: false,
        required_env: JMX_VARS,
    });
    registry.register(AppConfigCase {
        name: "MetricsSource/test_app_config/filter_doc_in_app_config",
        directory: "MetricsSource/test_app_config",
        description: "MetricsSource with the filter document stored in the application configuration",
        config: AppConfig::Json,
        with_sample: false,
        required_env: JMX_VARS,
    });
    registry.register(AppConfigCase {
        name: "MetricsSource/test_app_config/filter_doc_param_file",
        directory: "MetricsSource/test_app_config",
        description: "MetricsSource with the filter document passed as a submission parameter",
        config: AppConfig::FilterDocParam,
        with_sample: false,
        required_env: JMX_VARS,
    });
    registry.register(AppConfigCase {
        name: "JobStatusMonitor/test_app_config/distributed",
        directory: "JobStatusMonitor/test_app_config",
        description: "JobStatusSource reports the sample job with credentials from an application configuration",
        config: AppConfig::Plain,
        with_sample: true,
        required_env: JMX_VARS,
    });
    registry.register(AppConfigCase {
        name: "MetricsMonitor/test_microservices/distributed",
        directory: "MetricsMonitor/test_microservices",
        description: "Metrics monitoring microservice with a Streams user",
        config: AppConfig::Plain,
        with_sample: false,
        required_env: SERVICE_USER_VARS,
    });

    registry.register(JmxReconnectCase);
    registry.register(LogNotificationCase);
}

// ============================================================================
// Plain scenarios
// ============================================================================

fn metrics_app_config(ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
    ctx.remove_f(RESULT_FILE_1)?;
    ctx.remove_log_archives()?;

    ctx.create_app_config()?;
    ctx.make_applications()?;
    ctx.start_monitor(&[])?;

    ctx.wait_for_file(RESULT_FILE_1);
    if let Err(e) = ctx.require_result_file(RESULT_FILE_1) {
        log_cleanup_error(ctx.stop_monitor());
        return Err(e);
    }

    first_error([ctx.remove_f(RESULT_FILE_1), ctx.stop_monitor()])
}

fn log_jmx_reconnect(ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
    ctx.remove_f(RESULT_FILE_1)?;
    ctx.remove_f(RESULT_FILE_2)?;
    ctx.remove_log_archives()?;

    ctx.start_test_domain()?;
    ctx.make_applications()?;
    ctx.start_monitor(&[])?;
    ctx.start_sample(&[])?;

    await_sentinel_or_stop(ctx, RESULT_FILE_1)?;

    // Restarting the second domain drops the monitor's JMX connection.
    ctx.stop_test_domain()?;
    ctx.start_test_domain()?;
    ctx.start_sample(&[])?;

    await_sentinel_or_stop(ctx, RESULT_FILE_2)?;

    remove_sentinels_and_stop(ctx)
}

fn await_sentinel_or_stop(ctx: &ScenarioContext<'_>, name: &str) -> HarnessResult<()> {
    ctx.wait_for_file(name);
    if let Err(e) = ctx.require_result_file(name) {
        log_cleanup_error(stop_jobs_and_domain(ctx));
        return Err(e);
    }
    Ok(())
}

fn stop_jobs_and_domain(ctx: &ScenarioContext<'_>) -> HarnessResult<()> {
    first_error([ctx.stop_monitor(), ctx.stop_sample(), ctx.stop_test_domain()])
}

fn remove_sentinels_and_stop(ctx: &ScenarioContext<'_>) -> HarnessResult<()> {
    first_error([
        ctx.remove_f(RESULT_FILE_1),
        ctx.remove_f(RESULT_FILE_2),
        stop_jobs_and_domain(ctx),
    ])
}

/// Cleanup steps all run; the first error is returned and later ones are logged.
fn first_error(steps: impl IntoIterator<Item = HarnessResult<()>>) -> HarnessResult<()> {
    let mut first = None;
    for step in steps {
        if let Err(e) = step {
            if first.is_none() {
                first = Some(e);
            } else {
                tracing::warn!(error = %e, "cleanup step failed");
            }
        }
    }
    first.map_or(Ok(()), Err)
}

/// A failed run is reported over the cleanup that followed it.
fn log_cleanup_error(result: HarnessResult<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "cleanup after failure failed");
    }
}

fn log_app_notifications(ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
    ctx.make_applications()?;
    ctx.start_sample(&[])?;

    let monitor = ctx
        .jmx_credentials_args()
        .and_then(|args| ctx.run_monitor_standalone(&args));
    let stopped = ctx.stop_sample();

    let out = monitor?;
    stopped?;
    assert_pass(out.success() && out.contains(TEST_RESULT_PASS), &out.stdout, &out.stderr)?;
    Ok(())
}

// ============================================================================
// Case scenarios
// ============================================================================

/// How the monitor receives its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppConfig {
    /// Credentials in the application configuration.
    Plain,
    /// Credentials and filter document in the application configuration.
    Json,
    /// Credentials in the application configuration, filter document as a parameter.
    FilterDocParam,
}

struct AppConfigCase {
    name: &'static str,
    directory: &'static str,
    description: &'static str,
    config: AppConfig,
    with_sample: bool,
    required_env: &'static [&'static str],
}

impl Scenario for AppConfigCase {
    fn name(&self) -> &str {
        self.name
    }

    fn directory(&self) -> &str {
        self.directory
    }

    fn description(&self) -> &str {
        self.description
    }

    fn required_env(&self) -> &'static [&'static str] {
        self.required_env
    }

    fn setup(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        ctx.remove_f(RESULT_FILE_1)?;
        ctx.remove_log_archives()?;
        Ok(())
    }

    fn run(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        match self.config {
            AppConfig::Json => ctx.create_app_config_json()?,
            AppConfig::Plain | AppConfig::FilterDocParam => ctx.create_app_config()?,
        }
        ctx.make_applications()?;

        let monitor_args = match self.config {
            AppConfig::FilterDocParam => vec![FILTER_DOC_PARAM.to_string()],
            _ => Vec::new(),
        };
        ctx.start_monitor(&monitor_args)?;
        if self.with_sample {
            ctx.start_sample(&[])?;
        }

        ctx.wait_for_file(RESULT_FILE_1);
        ctx.require_result_file(RESULT_FILE_1)
    }

    fn teardown(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        let mut steps = vec![ctx.remove_f(RESULT_FILE_1), ctx.stop_monitor()];
        if self.with_sample {
            steps.push(ctx.stop_sample());
        }
        steps.push(ctx.rm_app_config());
        first_error(steps)
    }
}

/// MetricsSource reconnect across a restart of the second domain.
struct JmxReconnectCase;

impl Scenario for JmxReconnectCase {
    fn name(&self) -> &str {
        "MetricsSource/test_jmx_reconnect/with_two_domains"
    }

    fn directory(&self) -> &str {
        "MetricsSource/test_jmx_reconnect"
    }

    fn description(&self) -> &str {
        "MetricsSource reconnects after the second domain restarts"
    }

    fn required_env(&self) -> &'static [&'static str] {
        JMX_DOMAIN_VARS
    }

    fn skip_reason(&self, env: &EnvSnapshot) -> Option<String> {
        (check_domain(env) > 0).then(|| SECOND_DOMAIN_MISSING.to_string())
    }

    fn setup(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        ctx.remove_f(RESULT_FILE_1)?;
        ctx.remove_f(RESULT_FILE_2)?;
        ctx.remove_log_archives()?;
        ctx.start_test_domain()
    }

    fn run(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        ctx.make_applications()?;
        ctx.start_monitor(&[])?;
        ctx.start_sample(&[])?;

        ctx.wait_for_file(RESULT_FILE_1);
        ctx.require_result_file(RESULT_FILE_1)?;

        ctx.stop_test_domain()?;
        ctx.start_test_domain()?;
        ctx.start_sample(&[])?;

        ctx.wait_for_file(RESULT_FILE_2);
        ctx.require_result_file(RESULT_FILE_2)
    }

    fn teardown(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        remove_sentinels_and_stop(ctx)
    }
}

struct LogNotificationCase;

impl Scenario for LogNotificationCase {
    fn name(&self) -> &str {
        "LogSource/test_log_notification/standalone"
    }

    fn directory(&self) -> &str {
        "LogSource/test_log_notification"
    }

    fn description(&self) -> &str {
        "Standalone LogSource monitor sees the sample's log notifications"
    }

    fn required_env(&self) -> &'static [&'static str] {
        JMX_DOMAIN_VARS
    }

    fn run(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        ctx.make_applications()?;
        ctx.start_sample(&[])?;

        let args = ctx.jmx_credentials_args()?;
        let out = ctx.run_monitor_standalone(&args)?;
        assert_pass(out.success() && out.contains(TEST_RESULT_PASS), &out.stdout, &out.stderr)?;
        Ok(())
    }

    fn teardown(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        ctx.stop_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{CommandOutput, CommandRunner, FileWaiter, HarnessError, Make};
    use harness_core::targets::{self, MakeTargetId};
    use std::cell::RefCell;
    use std::path::Path;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        targets: RefCell<Vec<String>>,
    }

    impl CommandRunner for Recorder {
        fn run(&self, _program: &str, args: &[String], _cwd: &Path) -> HarnessResult<CommandOutput> {
            self.targets
                .borrow_mut()
                .push(args.first().cloned().unwrap_or_default());
            Ok(CommandOutput::new("", "", 0))
        }
    }

    fn context<'a>(dir: &Path, env: &'a EnvSnapshot, runner: &'a Recorder, make: &'a Make) -> ScenarioContext<'a> {
        ScenarioContext::new(dir, env, runner, make, FileWaiter::new(Duration::ZERO, Duration::from_millis(1)))
    }

    #[test]
    fn test_first_error_keeps_the_earliest() {
        let steps: Vec<HarnessResult<()>> = vec![
            Ok(()),
            Err(HarnessError::UnknownScenario("first".into())),
            Err(HarnessError::UnknownScenario("second".into())),
        ];
        assert!(matches!(first_error(steps), Err(HarnessError::UnknownScenario(ref n)) if n == "first"));
        assert!(first_error([Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn test_app_config_teardown_runs_every_step_after_a_failed_removal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the sentinel should be cannot be removed as a file.
        std::fs::create_dir(dir.path().join(RESULT_FILE_1)).unwrap();
        let env = EnvSnapshot::empty();
        let runner = Recorder::default();
        let make = Make::default();
        let mut ctx = context(dir.path(), &env, &runner, &make);

        let case = AppConfigCase {
            name: "JobStatusMonitor/test_app_config/distributed",
            directory: "JobStatusMonitor/test_app_config",
            description: "",
            config: AppConfig::Plain,
            with_sample: true,
            required_env: JMX_VARS,
        };
        assert!(matches!(case.teardown(&mut ctx), Err(HarnessError::Io(_))));
        assert_eq!(
            *runner.targets.borrow(),
            vec![
                targets::as_str(MakeTargetId::StopMonitor),
                targets::as_str(MakeTargetId::StopSample),
                targets::as_str(MakeTargetId::ConfigureClean),
            ]
        );
    }

    #[test]
    fn test_reconnect_teardown_stops_domain_after_a_failed_removal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(RESULT_FILE_2)).unwrap();
        let env = EnvSnapshot::empty();
        let runner = Recorder::default();
        let make = Make::default();
        let mut ctx = context(dir.path(), &env, &runner, &make);

        assert!(JmxReconnectCase.teardown(&mut ctx).is_err());
        assert_eq!(
            *runner.targets.borrow(),
            vec![
                targets::as_str(MakeTargetId::StopMonitor),
                targets::as_str(MakeTargetId::StopSample),
                targets::as_str(MakeTargetId::StopTestDomain),
            ]
        );
    }
}
