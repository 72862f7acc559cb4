//! Provide the canonical vocabulary shared by the scenario harness and the job launcher.
//!
//! This crate is intentionally small and dependency-free. It holds the spellings that both sides of
//! the tooling must agree on with the external monitoring toolkit:
//! - the build-tool targets each scenario directory's Makefile exposes,
//! - the environment variables scenarios and launch contexts read,
//! - the sentinel files and output markers scenarios signal completion with, and
//! - the qualified names of the monitoring composites the launcher submits.
//!
//! ## Notes
//!
//! - This is a "vocabulary" crate: **no IO**, no global state, no harness types.
//! - Callers work with stable IDs (e.g. [`targets::MakeTargetId`]) and look up spellings through the
//!   registry tables instead of repeating string literals.
//!
//! ## Examples
//! ```rust
//! use harness_core::targets::{self, MakeTargetId};
//!
//! assert_eq!(targets::from_str("start-monitor"), Some(MakeTargetId::StartMonitor));
//! assert_eq!(targets::as_str(MakeTargetId::Clean), "clean");
//! ```

pub mod composites;
pub mod env;
pub mod markers;
pub mod targets;
