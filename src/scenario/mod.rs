//! Scenario definitions and the name-keyed registry the runner dispatches through.
//!
//! A scenario is a self-contained end-to-end check that lives in its own directory next to a
//! Makefile. Scenarios are registered explicitly; nothing is loaded from the filesystem at
//! dispatch time.
//!
//! ## Lifecycle
//!
//! The runner drives each scenario as:
//! 1. check [`Scenario::required_env`] (before anything touches the scenario directory)
//! 2. [`Scenario::skip_reason`]
//! 3. [`Scenario::setup`]
//! 4. [`Scenario::run`]
//! 5. [`Scenario::teardown`], whenever setup succeeded

mod builtin;

use std::collections::BTreeMap;

use crate::harness::{EnvSnapshot, HarnessResult, ScenarioContext};

pub use builtin::register_builtin;

/// One end-to-end check.
pub trait Scenario: Send + Sync {
    /// Name used on the command line and in test lists, e.g. `LogSource/jmxReconnect`.
    fn name(&self) -> &str;

    /// Directory relative to the scenarios root; defaults to the name.
    fn directory(&self) -> &str {
        self.name()
    }

    fn description(&self) -> &str {
        ""
    }

    /// Environment variables that must be set before the scenario may run.
    fn required_env(&self) -> &'static [&'static str] {
        &[]
    }

    /// `Some(reason)` if the scenario should be skipped in `env`.
    fn skip_reason(&self, _env: &EnvSnapshot) -> Option<String> {
        None
    }

    fn setup(&self, _ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        Ok(())
    }

    fn run(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()>;

    fn teardown(&self, _ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        Ok(())
    }
}

type ScenarioFn = dyn Fn(&mut ScenarioContext<'_>) -> HarnessResult<()> + Send + Sync;

/// A scenario made of a single function with no setup or teardown.
pub struct FnScenario {
    name: String,
    description: String,
    required_env: &'static [&'static str],
    body: Box<ScenarioFn>,
}

impl FnScenario {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut ScenarioContext<'_>) -> HarnessResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            required_env: &[],
            body: Box::new(body),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_required_env(mut self, vars: &'static [&'static str]) -> Self {
        self.required_env = vars;
        self
    }
}

impl Scenario for FnScenario {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn required_env(&self) -> &'static [&'static str] {
        self.required_env
    }

    fn run(&self, ctx: &mut ScenarioContext<'_>) -> HarnessResult<()> {
        (self.body)(ctx)
    }
}

/// Scenarios keyed by name.
#[derive(Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Box<dyn Scenario>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in scenario catalogue.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_builtin(&mut registry);
        registry
    }

    /// Add `scenario`, replacing any scenario registered under the same name.
    pub fn register<S: Scenario + 'static>(&mut self, scenario: S) {
        let name = scenario.name().to_string();
        if self.scenarios.insert(name.clone(), Box::new(scenario)).is_some() {
            tracing::warn!(scenario = %name, "scenario registered twice, keeping the last one");
        }
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, body: F)
    where
        F: Fn(&mut ScenarioContext<'_>) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.register(FnScenario::new(name, body));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Scenario> {
        self.scenarios.get(name).map(|s| s.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Scenario> {
        self.scenarios.values().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
