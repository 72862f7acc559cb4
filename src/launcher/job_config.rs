//! Job configuration handed to a submission context.
//!
//! The configuration is an opaque key/value mapping by the time it reaches a [`Submitter`]. Nothing
//! is validated here beyond choosing which credential pair to send; the remote side decides what
//! it accepts.
//!
//! [`Submitter`]: super::Submitter

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Option name to value, serialized as a JSON object.
pub type ConfigMap = BTreeMap<String, Value>;

/// Recognized configuration keys.
pub mod keys {
    pub const SSL_VERIFY: &str = "ssl_verify";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const API_KEY: &str = "api_key";
    pub const TOKEN_ENDPOINT: &str = "token_endpoint";
    pub const TRACING: &str = "tracing";
}

/// IAM endpoint API keys are exchanged at when no token endpoint is configured.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";

/// Trace level of the submitted job's runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl TraceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceLevel::Error => "error",
            TraceLevel::Warn => "warn",
            TraceLevel::Info => "info",
            TraceLevel::Debug => "debug",
            TraceLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials sent with a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    UserPassword { username: String, password: String },
    ApiKey { api_key: String, token_endpoint: String },
}

impl Credentials {
    /// Pick whichever credential pair is populated.
    ///
    /// ## Notes
    /// - An API key wins over a username/password pair.
    /// - A missing token endpoint falls back to [`DEFAULT_TOKEN_ENDPOINT`].
    /// - A username without a password (or the reverse) is not a credential.
    pub fn from_fields(
        username: Option<&str>,
        password: Option<&str>,
        api_key: Option<&str>,
        token_endpoint: Option<&str>,
    ) -> Option<Self> {
        if let Some(api_key) = api_key.filter(|k| !k.is_empty()) {
            return Some(Credentials::ApiKey {
                api_key: api_key.to_string(),
                token_endpoint: token_endpoint.unwrap_or(DEFAULT_TOKEN_ENDPOINT).to_string(),
            });
        }
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() => Some(Credentials::UserPassword {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => None,
        }
    }

    /// Credentials recorded in a configuration map, if any.
    pub fn from_config(config: &ConfigMap) -> Option<Self> {
        Self::from_fields(
            config_str(config, keys::USERNAME),
            config_str(config, keys::PASSWORD),
            config_str(config, keys::API_KEY),
            config_str(config, keys::TOKEN_ENDPOINT),
        )
    }
}

/// Builder for a [`ConfigMap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobConfig {
    pub tracing: Option<TraceLevel>,
    pub ssl_verify: Option<bool>,
    pub credentials: Option<Credentials>,
    /// Passed through unchanged.
    pub extra: ConfigMap,
}

impl JobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracing(mut self, level: TraceLevel) -> Self {
        self.tracing = Some(level);
        self
    }

    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = Some(verify);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Flatten into the mapping a submitter receives. Only populated keys are present.
    pub fn to_config_map(&self) -> ConfigMap {
        let mut map = self.extra.clone();
        if let Some(verify) = self.ssl_verify {
            map.insert(keys::SSL_VERIFY.to_string(), Value::Bool(verify));
        }
        match &self.credentials {
            Some(Credentials::UserPassword { username, password }) => {
                map.insert(keys::USERNAME.to_string(), Value::from(username.as_str()));
                map.insert(keys::PASSWORD.to_string(), Value::from(password.as_str()));
            }
            Some(Credentials::ApiKey { api_key, token_endpoint }) => {
                map.insert(keys::API_KEY.to_string(), Value::from(api_key.as_str()));
                map.insert(keys::TOKEN_ENDPOINT.to_string(), Value::from(token_endpoint.as_str()));
            }
            None => {}
        }
        if let Some(level) = self.tracing {
            map.insert(keys::TRACING.to_string(), Value::from(level.as_str()));
        }
        map
    }
}

pub fn config_str<'a>(config: &'a ConfigMap, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str)
}

pub fn config_bool(config: &ConfigMap, key: &str) -> Option<bool> {
    config.get(key).and_then(Value::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_wins() {
        let creds = Credentials::from_fields(Some("u"), Some("p"), Some("k"), None).unwrap();
        assert_eq!(
            creds,
            Credentials::ApiKey {
                api_key: "k".into(),
                token_endpoint: DEFAULT_TOKEN_ENDPOINT.into()
            }
        );
    }

    #[test]
    fn test_half_pair_is_not_a_credential() {
        assert_eq!(Credentials::from_fields(Some("u"), None, None, None), None);
        assert_eq!(Credentials::from_fields(None, Some("p"), None, None), None);
        assert!(matches!(
            Credentials::from_fields(Some("u"), Some("p"), None, None),
            Some(Credentials::UserPassword { .. })
        ));
    }

    #[test]
    fn test_config_map_only_populated_keys() {
        let map = JobConfig::new().with_ssl_verify(false).to_config_map();
        assert_eq!(map.len(), 1);
        assert_eq!(config_bool(&map, keys::SSL_VERIFY), Some(false));

        let map = JobConfig::new()
            .with_tracing(TraceLevel::Info)
            .with_credentials(Credentials::UserPassword {
                username: "admin".into(),
                password: "secret".into(),
            })
            .with_option("custom", 3)
            .to_config_map();
        assert_eq!(config_str(&map, keys::TRACING), Some("info"));
        assert_eq!(config_str(&map, keys::USERNAME), Some("admin"));
        assert_eq!(map.get("custom"), Some(&Value::from(3)));
        assert!(!map.contains_key(keys::API_KEY));
        assert_eq!(Credentials::from_config(&map).map(|c| matches!(c, Credentials::UserPassword { .. })), Some(true));
    }
}
