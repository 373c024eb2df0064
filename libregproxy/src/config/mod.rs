//! Proxy configuration.
//!
//! This module manages proxy configuration with sensible defaults, loading
//! from a YAML file and merging it over the built-in values.

use crate::error::{ProxyError, Result};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;


/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub upstream: Upstream,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Parses a `Config` from a YAML string.
    ///
    /// This function is primarily used for testing.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = ConfigRs::builder()
            // Add default values
            .add_source(Self::defaults_source()?)
            // Merge with YAML string
            .add_source(File::from_str(s, FileFormat::Yaml));

        Self::from_builder(builder, None)
    }

    /// Loads a `Config` from an optional file path.
    ///
    /// With no path, the built-in defaults are returned. A path that does not
    /// exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigRs::builder()
            // Add default values
            .add_source(Self::defaults_source()?);

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder, path)
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.network.timeout == 0 {
            return Err(ProxyError::config("network.timeout must be greater than 0", None));
        }
        if self.network.connect_timeout == 0 {
            return Err(ProxyError::config(
                "network.connect_timeout must be greater than 0",
                None,
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ProxyError::config(
                "server.max_body_bytes must be greater than 0",
                None,
            ));
        }
        Ok(())
    }

    fn defaults_source() -> Result<ConfigRs> {
        ConfigRs::try_from(&Config::default()).map_err(|e| {
            ProxyError::config_with_source("Failed to build default configuration", None, e)
        })
    }

    /// Creates a `Config` from a `config::ConfigBuilder`.
    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self> {
        let config: Self = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                ProxyError::config_with_source(
                    "Failed to deserialize configuration".to_string(),
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })?;

        config.validate()?;
        Ok(config)
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    #[serde(default = "default_server_bind")]
    pub bind: SocketAddr,

    /// Largest inbound request body buffered for forwarding.
    #[serde(default = "default_server_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
            max_body_bytes: default_server_max_body_bytes(),
        }
    }
}

fn default_server_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_server_max_body_bytes() -> usize {
    1024 * 1024
}

/// Upstream registry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Upstream {
    #[serde(default)]
    pub scheme: UpstreamScheme,
}

/// Scheme used to reach upstream registries.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamScheme {
    #[default]
    Https,

    Http,
}

impl UpstreamScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

impl std::str::FromStr for UpstreamScheme {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            other => Err(ProxyError::config(
                format!("Unknown upstream scheme '{}', expected http or https", other),
                None,
            )),
        }
    }
}

impl std::fmt::Display for UpstreamScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network settings shared by the registry and token clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Whole-request timeout for token realm requests, in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    #[serde(default = "default_network_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default = "default_network_max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// User-Agent sent to token realms. Registry requests keep the client's own.
    #[serde(default = "default_network_user_agent")]
    pub user_agent: String,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            connect_timeout: default_network_connect_timeout(),
            max_idle_per_host: default_network_max_idle_per_host(),
            user_agent: default_network_user_agent(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_network_connect_timeout() -> u64 {
    10
}

fn default_network_max_idle_per_host() -> usize {
    10
}

fn default_network_user_agent() -> String {
    format!("regproxy/{}", crate::version())
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Log {
    /// Default `tracing` filter directive, e.g. `info` or `libregproxy=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
