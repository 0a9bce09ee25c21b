//! Ignis Backend Client
//!
//! HTTP client for the microVM backend hosts the orchestrator schedules
//! runners onto.
//!
//! The orchestrator only ever depends on the [`BackendClient`] and
//! [`Connector`] traits, so any backend exposing the create/list/delete
//! contract is substitutable, and tests can swap in a fake without a
//! network in sight.
//!
//! # Example
//!
//! ```no_run
//! use ignis_client::{BackendClient, HttpBackendClient};
//! use ignis_core::spec::InstanceSpec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpBackendClient::new("10.20.30.1:9090")?;
//!
//!     let spec = InstanceSpec::default_shape("runner-1");
//!     let created = client.create(&spec).await?;
//!     println!("created instance: {}", created.uid);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
mod instances;

// Re-export commonly used types
pub use error::{ClientError, Result};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use ignis_core::spec::{CreatedInstance, Instance, InstanceSpec};

/// Default timeout applied to every backend request, so a hung host cannot
/// hold a webhook handler open indefinitely.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The capability set the orchestrator needs from a backend host.
///
/// One client instance is bound to one host for the duration of one webhook
/// call; [`close`](BackendClient::close) must be called on every exit path.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Create an instance from the given spec, returning its backend uid
    async fn create(&self, spec: &InstanceSpec) -> Result<CreatedInstance>;

    /// List instances matching a name within a namespace
    async fn list(&self, name: &str, namespace: &str) -> Result<Vec<Instance>>;

    /// Delete an instance by its backend-assigned uid
    async fn delete(&self, uid: &str) -> Result<()>;

    /// Release the connection to the host
    async fn close(&self) -> Result<()>;
}

/// Produces a [`BackendClient`] bound to a given host address.
///
/// The orchestrator constructs a fresh client per webhook call; this trait
/// is the seam that lets tests observe which host was dialled.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str) -> Result<Box<dyn BackendClient>>;
}

/// HTTP implementation of [`BackendClient`]
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    /// Base URL of the backend host (e.g. "http://10.20.30.1:9090")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl HttpBackendClient {
    /// Create a client bound to one backend host.
    ///
    /// `host` may be a bare `address:port` (the common case in host pool
    /// config) or a full URL; a missing scheme defaults to plain HTTP.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(host, client))
    }

    /// Create a client with a custom reqwest client, for callers that need
    /// different timeout, proxy or TLS settings.
    pub fn with_client(host: impl AsRef<str>, client: Client) -> Self {
        Self {
            base_url: base_url_for(host.as_ref()),
            client,
        }
    }

    /// The normalized base URL this client dials
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the status code and deserialize the JSON body, or surface the
    /// error body as an [`ClientError::ApiError`].
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("failed to parse JSON response: {e}")))
    }

    /// As [`handle_response`](Self::handle_response) for endpoints that
    /// return no body (delete).
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

/// Production [`Connector`] that dials hosts over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, host: &str) -> Result<Box<dyn BackendClient>> {
        Ok(Box::new(HttpBackendClient::new(host)?))
    }
}

fn base_url_for(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address_gets_http_scheme() {
        let client = HttpBackendClient::new("10.20.30.1:9090").unwrap();
        assert_eq!(client.base_url(), "http://10.20.30.1:9090");
    }

    #[test]
    fn test_explicit_scheme_preserved() {
        let client = HttpBackendClient::new("https://vm-host:9090").unwrap();
        assert_eq!(client.base_url(), "https://vm-host:9090");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = HttpBackendClient::new("http://vm-host:9090/").unwrap();
        assert_eq!(client.base_url(), "http://vm-host:9090");
    }

    #[test]
    fn test_connector_builds_client() {
        let connector = HttpConnector;
        assert!(connector.connect("10.20.30.1:9090").is_ok());
    }
}
