//! HTTP clients for upstream registries and token realms.
//!
//! Two reqwest clients share one configuration:
//!
//! - the registry client never follows redirects, so a `307` pointing a blob
//!   download at object storage reaches the caller untouched;
//! - the token client follows redirects like any ordinary HTTP fetch.

use crate::config::Network;
use crate::error::{ProxyError, Result};
use reqwest::Client as ReqwestClient;
use reqwest::redirect::Policy;
use std::time::Duration;


/// Configuration for the HTTP clients.
///
/// # Examples
///
/// ```
/// use libregproxy::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_max_idle_per_host(20);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Token request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
    /// User-Agent for token requests
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let network = Network::default();
        Self {
            timeout_seconds: network.timeout,
            connect_timeout_seconds: network.connect_timeout,
            max_idle_per_host: network.max_idle_per_host,
            user_agent: network.user_agent,
        }
    }
}

impl From<&Network> for ClientConfig {
    fn from(network: &Network) -> Self {
        Self::new()
            .with_timeout(network.timeout)
            .with_connect_timeout(network.connect_timeout)
            .with_max_idle_per_host(network.max_idle_per_host)
            .with_user_agent(network.user_agent.clone())
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::client::ClientConfig;
    ///
    /// let config = ClientConfig::new();
    /// assert_eq!(config.timeout_seconds, 30);
    /// assert_eq!(config.max_idle_per_host, 10);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the connect timeout in seconds.
    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// The pair of pooled HTTP clients used by the proxy.
#[derive(Debug, Clone)]
pub struct Clients {
    registry: ReqwestClient,
    token: ReqwestClient,
}

impl Clients {
    /// Builds both clients from the given configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let registry = Self::builder(config)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ProxyError::network_with_source("Failed to create registry HTTP client", e))?;

        let token = Self::builder(config)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProxyError::network_with_source("Failed to create token HTTP client", e))?;

        Ok(Self { registry, token })
    }

    fn builder(config: &ClientConfig) -> reqwest::ClientBuilder {
        ReqwestClient::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
    }

    /// Client for upstream registry requests. Redirects are not followed.
    ///
    /// Only connecting is bounded: response bodies are streamed to the caller
    /// and may legitimately take longer than any fixed timeout.
    pub fn registry(&self) -> &ReqwestClient {
        &self.registry
    }

    /// Client for token realm requests.
    pub fn token(&self) -> &ReqwestClient {
        &self.token
    }
}

/// Translates a reqwest error into a ProxyError.
pub(crate) fn translate_reqwest_error(error: reqwest::Error, target: &str) -> ProxyError {
    if error.is_timeout() {
        ProxyError::network_with_source(format!("Request to {} timed out", target), error)
    } else if error.is_connect() {
        ProxyError::network_with_source(format!("Failed to connect to {}", target), error)
    } else if error.is_request() {
        ProxyError::network_with_source(format!("Failed to send request to {}", target), error)
    } else {
        ProxyError::network_with_source(
            format!("Network error communicating with {}", target),
            error,
        )
    }
}
