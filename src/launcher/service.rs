//! Streaming Analytics service context.
//!
//! Service credentials come from `VCAP_SERVICES`, looked up by the service name in
//! `STREAMING_ANALYTICS_SERVICE_NAME`. The bundle is compiled locally and uploaded to the
//! service's REST endpoint. API keys are exchanged for a bearer token first; a userid/password
//! pair is sent as basic auth.

use std::fs;

use harness_core::env::{STREAMING_ANALYTICS_SERVICE_NAME, VCAP_SERVICES};
use reqwest::blocking::{Client, RequestBuilder, multipart::Form};
use serde::Deserialize;
use serde_json::{Value, json};

use super::job_config::{ConfigMap, Credentials, config_bool, config_str, keys};
use super::submit::{SubmissionHandle, Submitter};
use super::topology::{BundleBuilder, Topology};
use super::{ContextType, LaunchError, LaunchResult};
use crate::harness::{CommandRunner, EnvSnapshot};

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// The `credentials` object of a Streaming Analytics service binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceCredentials {
    pub apikey: Option<String>,
    pub v2_rest_url: Option<String>,
    pub rest_url: Option<String>,
    pub userid: Option<String>,
    pub password: Option<String>,
}

impl ServiceCredentials {
    /// Credentials of the service named `service_name` in a `VCAP_SERVICES` document.
    pub fn from_vcap(vcap: &str, service_name: &str) -> LaunchResult<Self> {
        let services: Value = serde_json::from_str(vcap)?;
        let entry = services
            .as_object()
            .into_iter()
            .flat_map(|bindings| bindings.values())
            .filter_map(Value::as_array)
            .flatten()
            .find(|entry| entry.get("name").and_then(Value::as_str) == Some(service_name))
            .ok_or_else(|| LaunchError::Credentials(format!("service {} not found in {}", service_name, VCAP_SERVICES)))?;

        let credentials = entry
            .get("credentials")
            .cloned()
            .ok_or_else(|| LaunchError::Credentials(format!("service {} has no credentials", service_name)))?;
        Ok(serde_json::from_value(credentials)?)
    }

    /// Read `VCAP_SERVICES` (inline JSON or a path to a JSON file) and the service name from `env`.
    pub fn from_env(env: &EnvSnapshot) -> LaunchResult<Self> {
        let service_name = env.require(STREAMING_ANALYTICS_SERVICE_NAME)?;
        let vcap = env.require(VCAP_SERVICES)?;
        if vcap.trim_start().starts_with('{') {
            Self::from_vcap(vcap, service_name)
        } else {
            Self::from_vcap(&fs::read_to_string(vcap)?, service_name)
        }
    }

    /// Jobs endpoint base, preferring the v2 REST URL.
    pub fn rest_url(&self) -> LaunchResult<&str> {
        self.v2_rest_url
            .as_deref()
            .or(self.rest_url.as_deref())
            .map(|url| url.trim_end_matches('/'))
            .ok_or_else(|| LaunchError::Credentials("service credentials have no REST URL".to_string()))
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_fields(
            self.userid.as_deref(),
            self.password.as_deref(),
            self.apikey.as_deref(),
            None,
        )
    }

    /// `user`/`password` composite parameters, for test composites that connect back to the service.
    pub fn user_params(&self) -> Vec<(String, String)> {
        match (&self.userid, &self.password) {
            (Some(user), Some(password)) => vec![
                ("user".to_string(), user.clone()),
                ("password".to_string(), password.clone()),
            ],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(alias = "jobId")]
    id: Value,
}

/// `job_options` part of the upload.
pub fn job_options(topology: &Topology, config: &ConfigMap) -> Value {
    let mut job_config = json!({ "jobName": topology.name });
    if let Some(level) = config_str(config, keys::TRACING) {
        job_config["tracing"] = Value::from(level);
    }
    if !topology.params.is_empty() {
        job_config["submissionParameters"] = topology
            .params
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();
    }
    json!({ "jobConfigOverlays": [{ "jobConfig": job_config }] })
}

/// Submits bundles to a Streaming Analytics service instance.
pub struct ServiceSubmitter<'a> {
    runner: &'a dyn CommandRunner,
    builder: BundleBuilder,
    service: ServiceCredentials,
    ssl_verify: bool,
}

impl<'a> ServiceSubmitter<'a> {
    pub fn new(runner: &'a dyn CommandRunner, builder: BundleBuilder, service: ServiceCredentials) -> Self {
        Self {
            runner,
            builder,
            service,
            ssl_verify: true,
        }
    }

    /// Certificate verification when the job configuration does not say.
    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn service(&self) -> &ServiceCredentials {
        &self.service
    }

    fn client(&self, ssl_verify: bool) -> LaunchResult<Client> {
        if !ssl_verify {
            tracing::warn!("TLS certificate verification disabled");
        }
        Ok(Client::builder().danger_accept_invalid_certs(!ssl_verify).build()?)
    }

    fn authorize(&self, client: &Client, request: RequestBuilder, config: &ConfigMap) -> LaunchResult<RequestBuilder> {
        let credentials = Credentials::from_config(config).or_else(|| self.service.credentials());
        match credentials {
            Some(Credentials::ApiKey { api_key, token_endpoint }) => {
                let token: TokenResponse = client
                    .post(&token_endpoint)
                    .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", api_key.as_str())])
                    .send()?
                    .error_for_status()?
                    .json()?;
                Ok(request.bearer_auth(token.access_token))
            }
            Some(Credentials::UserPassword { username, password }) => Ok(request.basic_auth(username, Some(password))),
            None => Err(LaunchError::Credentials(
                "no API key or userid/password for the streaming analytics service".to_string(),
            )),
        }
    }
}

impl Submitter for ServiceSubmitter<'_> {
    fn context(&self) -> ContextType {
        ContextType::StreamingAnalyticsService
    }

    #[tracing::instrument(skip_all, fields(job = %topology.name))]
    fn submit(&self, topology: &Topology, config: &ConfigMap) -> LaunchResult<SubmissionHandle> {
        let url = format!("{}/jobs", self.service.rest_url()?);
        let bundle = self.builder.build(self.runner, topology, false)?;

        let client = self.client(config_bool(config, keys::SSL_VERIFY).unwrap_or(self.ssl_verify))?;
        let form = Form::new()
            .file("bundle_file", &bundle.bundle)?
            .text("job_options", job_options(topology, config).to_string());

        let request = self.authorize(&client, client.post(&url), config)?;
        let response: JobResponse = request.multipart(form).send()?.error_for_status()?.json()?;
        let job_id = match response.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        tracing::info!(job_id = %job_id, "submitted");

        Ok(SubmissionHandle {
            context: ContextType::StreamingAnalyticsService,
            name: topology.name.clone(),
            job_id: Some(job_id),
            output: None,
        })
    }

    fn cancel(&self, handle: &SubmissionHandle) -> LaunchResult<()> {
        let Some(job_id) = &handle.job_id else {
            return Err(LaunchError::Submit {
                context: ContextType::StreamingAnalyticsService,
                message: format!("no job id recorded for {}", handle.name),
            });
        };
        let url = format!("{}/jobs/{}", self.service.rest_url()?, job_id);
        let client = self.client(self.ssl_verify)?;
        self.authorize(&client, client.delete(&url), &ConfigMap::new())?
            .send()?
            .error_for_status()?;
        tracing::info!(job_id = %job_id, "cancelled");
        Ok(())
    }
}
