//! Scenario harness primitives.
//!
//! ## Modules
//!
//! - `process` - external command invocation with full output capture
//! - `assertions` - [`TestFailure`] and [`assert_pass`]
//! - `wait` - event-driven sentinel waits with a polling bound and cancellation
//! - `files` - sentinel reads and scratch-file cleanup
//! - `env` - environment snapshots and required-variable checks
//! - `context` - [`ScenarioContext`], the explicit-path view one scenario runs against
//!
//! ## Design
//!
//! Nothing here changes the process working directory. Every path is resolved against the
//! scenario directory carried by [`ScenarioContext`], and every subprocess is started with that
//! directory as its working directory.

pub mod assertions;
pub mod context;
pub mod env;
pub mod files;
pub mod process;
pub mod wait;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use assertions::{TestFailure, assert_pass};
pub use context::ScenarioContext;
pub use env::{EnvSnapshot, check_domain, require_all};
pub use process::{CommandOutput, CommandRunner, Make, SystemRunner};
pub use wait::{CancelToken, FileWaiter, WaitOutcome};

/// Errors raised while dispatching or running a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Failure(#[from] TestFailure),

    #[error("Please set the environment variables {}", .vars.join(", "))]
    MissingEnv { vars: Vec<String> },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to find scenario {0}")]
    UnknownScenario(String),

    #[error("scenario directory {} does not exist", .0.display())]
    ScenarioDirectory(PathBuf),

    #[error("cannot read test list {}: {source}", .path.display())]
    TestList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
