//! Submission contexts backed by local tools.

use std::path::Path;

use harness_core::env::{STREAMS_DOMAIN_ID, STREAMS_INSTANCE_ID};
use serde::Serialize;

use super::job_config::{ConfigMap, config_str, keys};
use super::topology::{BundleBuilder, Topology};
use super::{ContextType, LaunchError, LaunchResult};
use crate::harness::{CommandOutput, CommandRunner, EnvSnapshot};

/// Submits topologies to one execution context.
pub trait Submitter {
    fn context(&self) -> ContextType;

    /// Compile and submit `topology` with `config`.
    fn submit(&self, topology: &Topology, config: &ConfigMap) -> LaunchResult<SubmissionHandle>;

    /// Cancel a job this submitter started.
    fn cancel(&self, handle: &SubmissionHandle) -> LaunchResult<()>;

    /// Whether submitting runs the job to completion and captures what it printed.
    fn captures_output(&self) -> bool {
        false
    }
}

/// What a submission left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionHandle {
    pub context: ContextType,
    pub name: String,
    /// Remote job id, when the context reports one.
    pub job_id: Option<String>,
    /// Captured output, when the context runs the job synchronously.
    pub output: Option<CommandOutput>,
}

impl SubmissionHandle {
    pub fn cancel(&self, submitter: &dyn Submitter) -> LaunchResult<()> {
        submitter.cancel(self)
    }
}

// ============================================================================
// Distributed (streamtool)
// ============================================================================

/// Submits bundles to a Streams instance with `streamtool`.
pub struct StreamtoolSubmitter<'a> {
    runner: &'a dyn CommandRunner,
    builder: BundleBuilder,
    streamtool: String,
    domain: String,
    instance: String,
}

impl<'a> StreamtoolSubmitter<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        builder: BundleBuilder,
        streamtool: impl Into<String>,
        domain: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            builder,
            streamtool: streamtool.into(),
            domain: domain.into(),
            instance: instance.into(),
        }
    }

    /// Domain and instance from `STREAMS_DOMAIN_ID` and `STREAMS_INSTANCE_ID`.
    pub fn from_env(
        runner: &'a dyn CommandRunner,
        builder: BundleBuilder,
        streamtool: impl Into<String>,
        env: &EnvSnapshot,
    ) -> LaunchResult<Self> {
        let domain = env.require(STREAMS_DOMAIN_ID)?;
        let instance = env.require(STREAMS_INSTANCE_ID)?;
        Ok(Self::new(runner, builder, streamtool, domain, instance))
    }

    pub fn submit_args(&self, bundle: &str, topology: &Topology, config: &ConfigMap) -> Vec<String> {
        let mut args: Vec<String> = ["submitjob", bundle, "-d", self.domain.as_str(), "-i", self.instance.as_str()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push("--jobname".to_string());
        args.push(topology.name.clone());
        if let Some(level) = config_str(config, keys::TRACING) {
            args.push("-C".to_string());
            args.push(format!("tracing={}", level));
        }
        for param in topology.param_args() {
            args.push("-P".to_string());
            args.push(param);
        }
        args
    }

    fn streamtool(&self, args: &[String]) -> LaunchResult<CommandOutput> {
        let out = self.runner.run(&self.streamtool, args, Path::new("."))?;
        if out.success() {
            Ok(out)
        } else {
            Err(LaunchError::Submit {
                context: ContextType::Distributed,
                message: out.stderr,
            })
        }
    }
}

impl Submitter for StreamtoolSubmitter<'_> {
    fn context(&self) -> ContextType {
        ContextType::Distributed
    }

    #[tracing::instrument(skip_all, fields(job = %topology.name))]
    fn submit(&self, topology: &Topology, config: &ConfigMap) -> LaunchResult<SubmissionHandle> {
        let bundle = self.builder.build(self.runner, topology, false)?;
        let out = self.streamtool(&self.submit_args(&bundle.bundle.to_string_lossy(), topology, config))?;

        let job_id = parse_job_id(&out.stdout).or_else(|| parse_job_id(&out.stderr));
        tracing::info!(job_id = job_id.as_deref().unwrap_or("?"), "submitted");
        Ok(SubmissionHandle {
            context: ContextType::Distributed,
            name: topology.name.clone(),
            job_id,
            output: None,
        })
    }

    fn cancel(&self, handle: &SubmissionHandle) -> LaunchResult<()> {
        let Some(job_id) = &handle.job_id else {
            return Err(LaunchError::Submit {
                context: ContextType::Distributed,
                message: format!("no job id recorded for {}", handle.name),
            });
        };
        let args: Vec<String> = ["canceljob", "-d", self.domain.as_str(), "-i", self.instance.as_str(), job_id.as_str()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.streamtool(&args)?;
        tracing::info!(job_id = %job_id, "cancelled");
        Ok(())
    }
}

/// Job id reported by `streamtool submitjob`: the last number on the first line mentioning an ID.
pub fn parse_job_id(output: &str) -> Option<String> {
    let line = output.lines().find(|l| l.contains("ID"))?;
    let mut last = None;
    let mut current = String::new();
    for c in line.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            last = Some(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        last = Some(current);
    }
    last
}

// ============================================================================
// Standalone
// ============================================================================

/// Builds a standalone executable and runs it to completion.
pub struct StandaloneSubmitter<'a> {
    runner: &'a dyn CommandRunner,
    builder: BundleBuilder,
}

impl<'a> StandaloneSubmitter<'a> {
    pub fn new(runner: &'a dyn CommandRunner, builder: BundleBuilder) -> Self {
        Self { runner, builder }
    }
}

impl Submitter for StandaloneSubmitter<'_> {
    fn context(&self) -> ContextType {
        ContextType::Standalone
    }

    #[tracing::instrument(skip_all, fields(job = %topology.name))]
    fn submit(&self, topology: &Topology, _config: &ConfigMap) -> LaunchResult<SubmissionHandle> {
        let bundle = self.builder.build(self.runner, topology, true)?;
        let executable = std::path::absolute(&bundle.executable)?;
        let out = self.runner.run(
            &executable.to_string_lossy(),
            &topology.param_args(),
            &bundle.output_dir,
        )?;
        tracing::info!(exit_code = out.exit_code, "standalone job finished");

        Ok(SubmissionHandle {
            context: ContextType::Standalone,
            name: topology.name.clone(),
            job_id: None,
            output: Some(out),
        })
    }

    /// The job already ran to completion.
    fn cancel(&self, _handle: &SubmissionHandle) -> LaunchResult<()> {
        Ok(())
    }

    fn captures_output(&self) -> bool {
        true
    }
}

// ============================================================================
// Dry run
// ============================================================================

/// Everything a submission would send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionDocument<'a> {
    pub context: ContextType,
    #[serde(flatten)]
    pub topology: &'a Topology,
    pub config: &'a ConfigMap,
}

/// Renders the submission instead of performing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunSubmitter {
    context: ContextType,
}

impl DryRunSubmitter {
    pub fn new(context: ContextType) -> Self {
        Self { context }
    }

    pub fn render(&self, topology: &Topology, config: &ConfigMap) -> LaunchResult<String> {
        let document = SubmissionDocument {
            context: self.context,
            topology,
            config,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

impl Submitter for DryRunSubmitter {
    fn context(&self) -> ContextType {
        self.context
    }

    fn submit(&self, topology: &Topology, config: &ConfigMap) -> LaunchResult<SubmissionHandle> {
        let rendered = self.render(topology, config)?;
        Ok(SubmissionHandle {
            context: self.context,
            name: topology.name.clone(),
            job_id: None,
            output: Some(CommandOutput::new(rendered, "", 0)),
        })
    }

    fn cancel(&self, _handle: &SubmissionHandle) -> LaunchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::HarnessResult;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<(String, Vec<String>)>>,
        stdout: &'static str,
    }

    impl CommandRunner for Recorder {
        fn run(&self, program: &str, args: &[String], _cwd: &Path) -> HarnessResult<CommandOutput> {
            self.calls.borrow_mut().push((program.to_string(), args.to_vec()));
            Ok(CommandOutput::new(self.stdout, "", 0))
        }
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(parse_job_id("Submitted job with ID 17."), Some("17".to_string()));
        assert_eq!(
            parse_job_id("CDISC0079I The system submitted 1 job with the following IDs: 5."),
            Some("5".to_string())
        );
        assert_eq!(parse_job_id("nothing here"), None);
    }

    #[test]
    fn test_streamtool_submit_and_cancel() {
        let runner = Recorder {
            calls: RefCell::new(Vec::new()),
            stdout: "Submitted job with ID 4",
        };
        let submitter = StreamtoolSubmitter::new(&runner, BundleBuilder::new("sc", "out"), "streamtool", "d1", "i1");
        let topo = Topology::main_composite("JobStatusService", "a.b::JobStatusService")
            .unwrap()
            .with_param("period", "5");
        let config = super::super::JobConfig::new()
            .with_tracing(super::super::TraceLevel::Info)
            .to_config_map();

        let handle = submitter.submit(&topo, &config).unwrap();
        assert_eq!(handle.job_id.as_deref(), Some("4"));
        handle.cancel(&submitter).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].0, "sc");
        assert_eq!(calls[1].0, "streamtool");
        assert_eq!(
            calls[1].1,
            vec![
                "submitjob",
                "./out/JobStatusService/a.b.JobStatusService.sab",
                "-d",
                "d1",
                "-i",
                "i1",
                "--jobname",
                "JobStatusService",
                "-C",
                "tracing=info",
                "-P",
                "period=5"
            ]
        );
        assert_eq!(calls[2].1, vec!["canceljob", "-d", "d1", "-i", "i1", "4"]);
    }

    #[test]
    fn test_dry_run_document() {
        let topo = Topology::main_composite("MetricsIngestService", "x.y::MetricsIngestService")
            .unwrap()
            .with_toolkit("../tk");
        let config = super::super::JobConfig::new().with_ssl_verify(false).to_config_map();
        let rendered = DryRunSubmitter::new(ContextType::Distributed).render(&topo, &config).unwrap();

        insta::assert_snapshot!(rendered, @r#"
        {
          "context": "distributed",
          "name": "MetricsIngestService",
          "main_composite": "x.y::MetricsIngestService",
          "toolkits": [
            "../tk"
          ],
          "params": {},
          "config": {
            "ssl_verify": false
          }
        }
        "#);
    }
}
