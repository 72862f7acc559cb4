#![forbid(unsafe_code)]
//! Scenario harness and job launcher for the Streams monitoring toolkit
//!
//! Two halves share one process model:
//!
//! - The harness ([`harness`], [`scenario`], [`runner`]) drives end-to-end scenarios: each one
//!   invokes build-tool targets in its own directory, waits for sentinel files written by the jobs
//!   under test, and asserts on captured command output.
//! - The launcher ([`launcher`]) compiles monitoring composites and submits them to a Streams
//!   instance, the Streaming Analytics service or a local standalone executable.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Scenario failures** are values ([`harness::TestFailure`]), never panics: a failing assertion
//!   returns an error that the runner records and reports.

pub mod cli;
pub mod config;
pub mod harness;
pub mod launcher;
pub mod runner;
pub mod scenario;
pub mod version;

pub use config::HarnessConfig;
pub use harness::{HarnessError, HarnessResult, ScenarioContext, TestFailure};
pub use runner::{RunOptions, RunReport, ScenarioResult, ScenarioRunner};
pub use scenario::{Scenario, ScenarioRegistry};
