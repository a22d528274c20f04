//! Connection management for the Elasticsearch store
//!
//! This module provides connection management functionality including:
//! - HTTP client construction (timeouts, basic auth, TLS trust roots)
//! - Reachability verification via a ping before extraction starts
//! - A session handle the export pipeline uses for all requests
//!
//! Establishing the connection is deliberately separate from the export
//! core: the pipeline only ever sees an [`EsSession`].

use std::path::Path;
use std::time::Duration;

use reqwest::{Certificate, Client, Method, RequestBuilder};
use tracing::{debug, info};
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};

/// An established session with the store.
///
/// Cheap to clone; wraps the shared HTTP client plus everything needed to
/// authorize a request.
#[derive(Debug, Clone)]
pub struct EsSession {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl EsSession {
    /// Base URL of the store this session talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a request against a path relative to the base URL, with
    /// authentication already applied.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ConnectionError::InvalidUrl(format!("{path}: {e}")))?;
        let mut builder = self.client.request(method, url);
        if let Some(ref username) = self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        Ok(builder)
    }
}

/// Store connection manager
///
/// Builds the HTTP client from configuration and verifies the store is
/// reachable before handing out a session.
pub struct ConnectionManager {
    /// Connection configuration
    config: ConnectionConfig,

    /// Current connection state
    state: ConnectionState,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Connected and verified via ping
    Connected,

    /// Connection attempt failed
    Failed(String),
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
        }
    }

    /// Establish a session with the store.
    ///
    /// Builds the HTTP client, then verifies reachability with a ping
    /// against the cluster root. Any failure here is fatal for the run;
    /// no extraction is attempted without a verified session.
    pub async fn connect(&mut self) -> Result<EsSession> {
        let base_url = Url::parse(&self.config.url)
            .map_err(|e| ConnectionError::InvalidUrl(format!("{}: {e}", self.config.url)))?;

        let client = self.build_client()?;
        let session = EsSession {
            client,
            base_url,
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        };

        match Self::ping(&session).await {
            Ok(()) => {
                info!("Connected to store at {}", session.base_url);
                self.state = ConnectionState::Connected;
                Ok(session)
            }
            Err(e) => {
                self.state = ConnectionState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Get current connection state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Build the HTTP client from configuration.
    fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout))
            .connect_timeout(Duration::from_secs(self.config.timeout.min(30)));

        if let Some(ref ca_path) = self.config.ca_cert {
            builder = builder.add_root_certificate(load_ca_cert(ca_path)?);
            debug!("Loaded CA certificate from {}", ca_path.display());
        }

        builder
            .build()
            .map_err(|e| ConnectionError::Unreachable(format!("client setup: {e}")).into())
    }

    /// Verify the store answers on its root endpoint.
    async fn ping(session: &EsSession) -> Result<()> {
        let response = session
            .request(Method::GET, "")?
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!("Ping succeeded with status {status}");
            Ok(())
        } else {
            Err(ConnectionError::PingFailed(format!("store answered with status {status}")).into())
        }
    }
}

/// Load a PEM CA bundle from disk.
fn load_ca_cert(path: &Path) -> Result<Certificate> {
    let pem = std::fs::read(path)
        .map_err(|e| ConnectionError::TlsSetup(format!("{}: {e}", path.display())))?;
    Certificate::from_pem(&pem)
        .map_err(|e| ConnectionError::TlsSetup(format!("{}: {e}", path.display())).into())
}

/// Map a reqwest transport failure to a connection error.
pub(crate) fn map_transport_error(err: reqwest::Error) -> crate::error::EsdumpError {
    if err.is_timeout() {
        ConnectionError::Timeout.into()
    } else if err.is_connect() {
        ConnectionError::Unreachable(err.to_string()).into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EsdumpError;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let mut config = ConnectionConfig::default();
        config.url = "not a url".to_string();
        let mut manager = ConnectionManager::new(config);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(
            err,
            EsdumpError::Connection(ConnectionError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_missing_ca_bundle_is_tls_error() {
        let err = load_ca_cert(Path::new("/nonexistent/ca.pem")).unwrap_err();
        assert!(matches!(
            err,
            EsdumpError::Connection(ConnectionError::TlsSetup(_))
        ));
    }

    #[test]
    fn test_session_request_joins_path() {
        let session = EsSession {
            client: Client::new(),
            base_url: Url::parse("https://es.internal:9200").unwrap(),
            username: None,
            password: None,
        };
        assert!(session.request(Method::GET, "_search/scroll").is_ok());
    }

    #[test]
    fn test_initial_state_is_disconnected() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        assert_eq!(*manager.state(), ConnectionState::Disconnected);
    }
}
