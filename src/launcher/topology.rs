//! Job descriptions and bundle compilation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use harness_core::composites::{bundle_stem, split_kind};
use serde::Serialize;

use super::{LaunchError, LaunchResult};
use crate::harness::CommandRunner;

/// A job that runs one external composite as its main composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    /// Job name.
    pub name: String,
    /// Qualified composite name, `namespace::Name`.
    pub main_composite: String,
    /// Toolkit search path, in order.
    pub toolkits: Vec<PathBuf>,
    /// Submission-time parameters.
    pub params: BTreeMap<String, String>,
}

impl Topology {
    /// Job `name` whose main composite is `kind`.
    ///
    /// ## Errors
    /// - [`LaunchError::Composite`] if `kind` is not a qualified `namespace::Name`.
    pub fn main_composite(name: impl Into<String>, kind: impl Into<String>) -> LaunchResult<Self> {
        let kind = kind.into();
        if split_kind(&kind).is_none() {
            return Err(LaunchError::Composite(kind));
        }
        Ok(Self {
            name: name.into(),
            main_composite: kind,
            toolkits: Vec::new(),
            params: BTreeMap::new(),
        })
    }

    /// Append `path` to the toolkit search path unless it is already there.
    pub fn add_toolkit(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.toolkits.contains(&path) {
            self.toolkits.push(path);
        }
    }

    pub fn with_toolkit(mut self, path: impl Into<PathBuf>) -> Self {
        self.add_toolkit(path);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// `name=value` arguments for the submission parameters.
    pub fn param_args(&self) -> Vec<String> {
        self.params.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub output_dir: PathBuf,
    /// The `.sab` application bundle (distributed builds).
    pub bundle: PathBuf,
    /// The standalone executable (standalone builds).
    pub executable: PathBuf,
}

/// Compiles topologies with the SPL compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleBuilder {
    sc: String,
    output_root: PathBuf,
    workdir: PathBuf,
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self::new("sc", "output")
    }
}

impl BundleBuilder {
    pub fn new(sc: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            sc: sc.into(),
            output_root: output_root.into(),
            workdir: PathBuf::from("."),
        }
    }

    /// Directory the compiler runs in; relative toolkit paths resolve against it.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn output_dir(&self, topology: &Topology) -> PathBuf {
        self.output_root.join(&topology.name)
    }

    /// Compiler arguments for `topology`.
    pub fn args(&self, topology: &Topology, standalone: bool) -> Vec<String> {
        let mut args = vec!["-M".to_string(), topology.main_composite.clone()];
        if !topology.toolkits.is_empty() {
            let toolkits: Vec<String> = topology
                .toolkits
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            args.push("-t".to_string());
            args.push(toolkits.join(":"));
        }
        args.push("--output-directory".to_string());
        args.push(self.output_dir(topology).to_string_lossy().into_owned());
        if standalone {
            args.push("-T".to_string());
        }
        args
    }

    #[tracing::instrument(skip_all, fields(composite = %topology.main_composite, standalone = standalone))]
    pub fn build(&self, runner: &dyn CommandRunner, topology: &Topology, standalone: bool) -> LaunchResult<Bundle> {
        let out = runner.run(&self.sc, &self.args(topology, standalone), &self.workdir)?;
        if !out.success() {
            return Err(LaunchError::Build {
                composite: topology.main_composite.clone(),
                stderr: out.stderr,
            });
        }

        let output_dir = self.workdir.join(self.output_dir(topology));
        tracing::info!(output = %output_dir.display(), "bundle built");
        Ok(Bundle {
            bundle: output_dir.join(format!("{}.sab", bundle_stem(&topology.main_composite))),
            executable: output_dir.join("bin").join("standalone"),
            output_dir,
        })
    }
}
