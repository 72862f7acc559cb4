//! Environment variables read by scenarios and launch contexts.
//!
//! The groups mirror what the scenario directories check before they touch anything: plain JMX
//! credentials, JMX credentials plus the domain id, the optional second test domain, and the
//! user/password pair of the microservices scenarios.

/// Id of the Streams domain the monitor connects to.
pub const STREAMS_DOMAIN_ID: &str = "STREAMS_DOMAIN_ID";
/// Instance used by distributed submissions.
pub const STREAMS_INSTANCE_ID: &str = "STREAMS_INSTANCE_ID";
/// JMX user.
pub const JMX_USER: &str = "JMX_USER";
/// JMX password.
pub const JMX_PASSWORD: &str = "JMX_PASSWORD";
/// Second domain restarted by the reconnect scenarios.
pub const TEST_DOMAIN: &str = "TEST_DOMAIN";
/// Instance in the second domain.
pub const TEST_INSTANCE: &str = "TEST_INSTANCE";
/// Streams user for the microservices scenarios.
pub const STREAMS_USERNAME: &str = "STREAMS_USERNAME";
/// Streams password for the microservices scenarios.
pub const STREAMS_PASSWORD: &str = "STREAMS_PASSWORD";
/// Name of the Streaming Analytics service entry in `VCAP_SERVICES`.
pub const STREAMING_ANALYTICS_SERVICE_NAME: &str = "STREAMING_ANALYTICS_SERVICE_NAME";
/// Cloud Foundry style service bindings (JSON).
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

/// JMX credentials only.
pub const JMX_VARS: &[&str] = &[JMX_USER, JMX_PASSWORD];

/// JMX credentials plus the domain the monitor connects to.
pub const JMX_DOMAIN_VARS: &[&str] = &[STREAMS_DOMAIN_ID, JMX_USER, JMX_PASSWORD];

/// Second domain/instance pair.
pub const TEST_DOMAIN_VARS: &[&str] = &[TEST_DOMAIN, TEST_INSTANCE];

/// Streams user/password pair.
pub const SERVICE_USER_VARS: &[&str] = &[STREAMS_USERNAME, STREAMS_PASSWORD];
