//! Environment checks.
//!
//! Scenarios read credentials and domain ids from the environment. The harness works on an
//! [`EnvSnapshot`] captured once per run instead of the live process environment, so checks are
//! repeatable and tests never mutate process-global state.

use std::collections::BTreeMap;
use std::ffi::OsString;

use harness_core::env::TEST_DOMAIN_VARS;

use super::{HarnessError, HarnessResult};

/// Immutable view of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// Entries whose name or value is not valid Unicode are skipped with a warning naming them.
    pub fn capture() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Snapshot of raw `(name, value)` pairs, skipping non-Unicode entries.
    pub fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let mut snapshot = Self::default();
        for (name, value) in vars {
            match (name.to_str(), value.to_str()) {
                (Some(name), Some(value)) => {
                    snapshot.vars.insert(name.to_string(), value.to_string());
                }
                _ => tracing::warn!(var = %name.to_string_lossy(), "skipping non-Unicode environment variable"),
            }
        }
        snapshot
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value of `name`, or a missing-variable error.
    pub fn require(&self, name: &str) -> HarnessResult<&str> {
        self.get(name).ok_or_else(|| HarnessError::MissingEnv {
            vars: vec![name.to_string()],
        })
    }

    /// Names from `names` that are not set.
    pub fn missing<'a>(&self, names: &[&'a str]) -> Vec<&'a str> {
        names.iter().copied().filter(|n| self.get(n).is_none()).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Fail unless every variable in `names` is set, listing all that are missing.
pub fn require_all(env: &EnvSnapshot, names: &[&str]) -> HarnessResult<()> {
    let missing = env.missing(names);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::MissingEnv {
            vars: missing.into_iter().map(str::to_string).collect(),
        })
    }
}

/// Number of second-domain variables (`TEST_DOMAIN`, `TEST_INSTANCE`) that are not set.
pub fn check_domain(env: &EnvSnapshot) -> usize {
    env.missing(TEST_DOMAIN_VARS).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_core::env::{JMX_DOMAIN_VARS, JMX_PASSWORD, JMX_USER, STREAMS_DOMAIN_ID, TEST_DOMAIN};

    #[test]
    fn test_require_all_lists_every_missing_var() {
        let env = EnvSnapshot::empty().with(JMX_USER, "admin");
        match require_all(&env, JMX_DOMAIN_VARS) {
            Err(HarnessError::MissingEnv { vars }) => {
                assert_eq!(vars, vec![STREAMS_DOMAIN_ID.to_string(), JMX_PASSWORD.to_string()]);
            }
            other => panic!("expected MissingEnv, got {:?}", other),
        }
    }

    #[test]
    fn test_require_all_ok() {
        let env: EnvSnapshot = JMX_DOMAIN_VARS.iter().map(|v| (*v, "x")).collect();
        assert!(require_all(&env, JMX_DOMAIN_VARS).is_ok());
    }

    #[test]
    fn test_check_domain_counts_missing() {
        assert_eq!(check_domain(&EnvSnapshot::empty()), 2);
        assert_eq!(check_domain(&EnvSnapshot::empty().with(TEST_DOMAIN, "d2")), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_vars_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from(JMX_USER), OsString::from("admin")),
            (OsString::from(JMX_PASSWORD), OsString::from_vec(vec![0x70, 0xff, 0x77])),
            (OsString::from_vec(vec![0x4a, 0xfe]), OsString::from("x")),
        ];
        let env = EnvSnapshot::from_os_vars(vars);
        assert_eq!(env, EnvSnapshot::empty().with(JMX_USER, "admin"));
    }

    #[test]
    fn test_require_single() {
        let env = EnvSnapshot::empty().with(JMX_USER, "admin");
        assert_eq!(env.require(JMX_USER).unwrap(), "admin");
        assert!(env.require(JMX_PASSWORD).is_err());
    }
}
