//! CLI module for the scenario harness and job launcher
//!
//! ## Commands
//!
//! - `run -t <name>... | -f <file>` - Run scenarios by name or from a test list
//! - `list` - List registered scenarios (or build-tool targets with `--targets`)
//! - `check-env [scenario]...` - Report missing environment variables
//! - `launch <sample>` - Submit a toolkit sample or the monitoring microservices
//! - `launch-composite <kind>` - Submit a single composite, optionally checking its output
//! - `verify [check]...` - Run the test composites and check that each reports a pass
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::config::{ConfigError, HarnessConfig};
use crate::harness::HarnessError;
use crate::launcher::{CompositeCheck, ContextType, LaunchError, Sample, TraceLevel};
use crate::version::HARNESS_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        CliError::failure(format!("Error: {}", err))
    }
}

impl From<LaunchError> for CliError {
    fn from(err: LaunchError) -> Self {
        CliError::failure(format!("Error: {}", err))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::failure(format!("Error: {}", err))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

pub const NO_TESTS_MESSAGE: &str = "Error: Must specify either a test or a file of test names.";

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Scenario harness and job launcher for the Streams monitoring toolkit
#[derive(Parser, Debug)]
#[command(name = "streams-harness")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Scenario harness and job launcher for the Streams monitoring toolkit", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./harness.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run scenarios
    Run {
        /// Scenario to run (repeatable)
        #[arg(short = 't', long = "test", value_name = "NAME")]
        tests: Vec<String>,
        /// File of scenario names, one per line
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: Option<PathBuf>,
        /// Directory containing the scenario directories
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
        /// Only run scenarios whose name contains EXPR
        #[arg(short = 'k', value_name = "EXPR")]
        filter: Option<String>,
        /// Sentinel wait timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List registered scenarios
    List {
        /// List the build-tool targets scenarios drive instead
        #[arg(long)]
        targets: bool,
    },

    /// Report environment variables required by scenarios that are not set
    CheckEnv {
        /// Scenarios to check (default: all)
        #[arg(value_name = "SCENARIO")]
        scenarios: Vec<String>,
    },

    /// Submit a toolkit sample
    Launch {
        #[arg(value_enum)]
        sample: Sample,
        #[command(flatten)]
        target: LaunchTarget,
    },

    /// Submit a single composite as a job
    LaunchComposite {
        /// Qualified composite name (namespace::Name)
        #[arg(value_name = "KIND")]
        kind: String,
        /// Job name (default: the composite's simple name)
        #[arg(long)]
        name: Option<String>,
        /// Additional toolkit (repeatable)
        #[arg(long = "with-toolkit", value_name = "DIR")]
        extra_toolkits: Vec<PathBuf>,
        /// Submission parameter (repeatable)
        #[arg(short = 'P', value_name = "NAME=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Fail unless the job exits cleanly and prints MARKER (standalone context only)
        #[arg(long, value_name = "MARKER", conflicts_with = "dry_run")]
        expect: Option<String>,
        /// Runtime trace level
        #[arg(long, value_enum)]
        trace: Option<TraceLevel>,
        #[command(flatten)]
        target: LaunchTarget,
    },

    /// Run test composites and check that each reports a pass
    Verify {
        /// Checks to run (default: all)
        #[arg(value_enum, value_name = "CHECK")]
        checks: Vec<CompositeCheck>,
        /// Toolkit holding the test composites
        #[arg(long, value_name = "DIR")]
        test_toolkit: Option<PathBuf>,
        /// Test composite parameter (repeatable)
        #[arg(short = 'P', value_name = "NAME=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
        #[command(flatten)]
        target: LaunchTarget,
    },
}

/// Where and how to submit.
#[derive(clap::Args, Debug, Clone)]
pub struct LaunchTarget {
    /// Execution context (default: from config, else distributed)
    #[arg(long, value_enum)]
    pub context: Option<ContextType>,
    /// Monitoring toolkit directory
    #[arg(long, value_name = "DIR")]
    pub toolkit: Option<PathBuf>,
    /// Print the submission instead of performing it
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = HarnessConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            tests,
            file,
            root,
            stop_on_fail,
            filter,
            timeout,
            verbose,
        } => {
            if tests.is_empty() && file.is_none() {
                return Err(CliError::failure(NO_TESTS_MESSAGE));
            }
            commands::run_scenarios(
                &config,
                commands::RunArgs {
                    tests,
                    file,
                    root,
                    stop_on_fail,
                    filter,
                    timeout,
                    verbose,
                },
            )
        }
        Command::List { targets } => commands::list(targets),
        Command::CheckEnv { scenarios } => commands::check_env(&scenarios),
        Command::Launch { sample, target } => commands::launch_sample(&config, sample, &target),
        Command::LaunchComposite {
            kind,
            name,
            extra_toolkits,
            params,
            expect,
            trace,
            target,
        } => commands::launch_composite(
            &config,
            commands::CompositeArgs {
                kind,
                name,
                extra_toolkits,
                params,
                expect,
                trace,
            },
            &target,
        ),
        Command::Verify {
            checks,
            test_toolkit,
            params,
            target,
        } => commands::verify(
            &config,
            commands::VerifyArgs {
                checks,
                test_toolkit,
                params,
            },
            &target,
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_repeated_tests() {
        let cli = Cli::try_parse_from([
            "streams-harness",
            "run",
            "-t",
            "MetricsSource/appConfig",
            "-t",
            "LogSource/jmxReconnect",
            "-x",
            "-k",
            "Log",
        ])
        .unwrap();
        if let Command::Run {
            tests,
            stop_on_fail,
            filter,
            ..
        } = cli.command
        {
            assert_eq!(tests, vec!["MetricsSource/appConfig", "LogSource/jmxReconnect"]);
            assert!(stop_on_fail);
            assert_eq!(filter.as_deref(), Some("Log"));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_global_config() {
        let cli = Cli::try_parse_from(["streams-harness", "list", "--config", "h.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("h.toml")));
        assert!(matches!(cli.command, Command::List { targets: false }));
    }

    #[test]
    fn test_cli_parse_launch() {
        let cli = Cli::try_parse_from([
            "streams-harness",
            "launch",
            "microservices",
            "--context",
            "streaming-analytics-service",
            "--dry-run",
        ])
        .unwrap();
        if let Command::Launch { sample, target } = cli.command {
            assert_eq!(sample, Sample::Microservices);
            assert_eq!(target.context, Some(ContextType::StreamingAnalyticsService));
            assert!(target.dry_run);
        } else {
            panic!("Expected Launch command");
        }
    }

    #[test]
    fn test_cli_parse_launch_composite_params() {
        let cli = Cli::try_parse_from([
            "streams-harness",
            "launch-composite",
            "test.metrics::TestMetricsSource",
            "-P",
            "user=admin",
            "-P",
            "filter=a=b",
            "--trace",
            "debug",
        ])
        .unwrap();
        if let Command::LaunchComposite { params, trace, .. } = cli.command {
            assert_eq!(
                params,
                vec![
                    ("user".to_string(), "admin".to_string()),
                    ("filter".to_string(), "a=b".to_string())
                ]
            );
            assert_eq!(trace, Some(TraceLevel::Debug));
        } else {
            panic!("Expected LaunchComposite command");
        }
    }

    #[test]
    fn test_cli_expect_conflicts_with_dry_run() {
        let err = Cli::try_parse_from([
            "streams-harness",
            "launch-composite",
            "test.system::TestLogsSource",
            "--expect",
            "TEST_RESULT_PASS",
            "--dry-run",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::try_parse_from(["streams-harness", "verify", "job-status", "logs", "-P", "user=admin"]).unwrap();
        if let Command::Verify {
            checks, params, target, ..
        } = cli.command
        {
            assert_eq!(checks, vec![CompositeCheck::JobStatus, CompositeCheck::Logs]);
            assert_eq!(params, vec![("user".to_string(), "admin".to_string())]);
            assert_eq!(target.context, None);
        } else {
            panic!("Expected Verify command");
        }
    }

    #[test]
    fn test_parse_param_rejects_missing_name() {
        assert!(parse_param("=x").is_err());
        assert!(parse_param("novalue").is_err());
        assert_eq!(parse_param("k=").unwrap(), ("k".to_string(), String::new()));
    }
}
