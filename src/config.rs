//! Optional `harness.toml` configuration.
//!
//! ```toml
//! [harness]
//! root = "tests/spl-test"
//! wait_timeout_secs = 180
//! poll_interval_ms = 1000
//! make = "make"
//! log_archive_pattern = "StreamsLogsJob*.tgz"
//!
//! [launcher]
//! toolkit = "../com.ibm.streamsx.monitoring"
//! output_dir = "output"
//! sc = "sc"
//! streamtool = "streamtool"
//! context = "distributed"
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harness_core::composites::MONITORING_TOOLKIT;
use harness_core::markers::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS, LOG_ARCHIVE_PATTERN};
use serde::Deserialize;
use thiserror::Error;

use crate::harness::{FileWaiter, Make};
use crate::launcher::ContextType;

/// File picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "harness.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub harness: HarnessSection,
    pub launcher: LauncherSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessSection {
    /// Directory the scenario directories live under.
    pub root: PathBuf,
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Build tool program.
    pub make: String,
    pub log_archive_pattern: String,
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            wait_timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_SECS * 1000,
            make: "make".to_string(),
            log_archive_pattern: LOG_ARCHIVE_PATTERN.to_string(),
        }
    }
}

impl HarnessSection {
    pub fn waiter(&self) -> FileWaiter {
        FileWaiter::new(
            Duration::from_secs(self.wait_timeout_secs),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn make(&self) -> Make {
        Make::new(self.make.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherSection {
    /// Monitoring toolkit passed to the SPL compiler.
    pub toolkit: PathBuf,
    /// Where compiled bundles are written.
    pub output_dir: PathBuf,
    /// SPL compiler program.
    pub sc: String,
    pub streamtool: String,
    pub context: ContextType,
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            toolkit: PathBuf::from(MONITORING_TOOLKIT),
            output_dir: PathBuf::from("output"),
            sc: "sc".to_string(),
            streamtool: "streamtool".to_string(),
            context: ContextType::default(),
        }
    }
}

impl HarnessConfig {
    /// Load `explicit` if given, else `harness.toml` from the working directory if it exists,
    /// else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: HarnessConfig = toml::from_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.harness.waiter(), FileWaiter::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: HarnessConfig = toml::from_str(
            r#"
            [harness]
            root = "tests/spl-test"
            poll_interval_ms = 250

            [launcher]
            context = "standalone"
            "#,
        )
        .unwrap();

        assert_eq!(config.harness.root, PathBuf::from("tests/spl-test"));
        assert_eq!(config.harness.waiter().poll_interval(), Duration::from_millis(250));
        assert_eq!(config.harness.wait_timeout_secs, 180);
        assert_eq!(config.launcher.context, ContextType::Standalone);
        assert_eq!(config.launcher.sc, "sc");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        fs::write(&path, "[harness]\ntimeout = 3\n").unwrap();

        let err = HarnessConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = HarnessConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
