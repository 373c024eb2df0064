//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use anyhow::{Context, Result};
use libregproxy::Config;
use libregproxy::config::UpstreamScheme;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

pub const ENV_BIND: &str = "REGPROXY_BIND";
pub const ENV_UPSTREAM_SCHEME: &str = "REGPROXY_UPSTREAM_SCHEME";
pub const ENV_LOG: &str = "REGPROXY_LOG";

/// Values given on the command line. `None` leaves lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub upstream_scheme: Option<UpstreamScheme>,
}

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    /// File the configuration was read from, if any
    pub config_path: Option<PathBuf>,
    /// Verbosity from repeated `-v` flags
    pub verbose: u8,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > env vars > CLI flags
    ///
    /// An explicit `config_path` must exist. Without one, the default location
    /// is used only when a file is there.
    pub fn build(config_path: Option<&Path>, overrides: &CliOverrides, verbose: u8) -> Result<Self> {
        // 1 + 2. Defaults merged with the config file
        let config_path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => get_config_path().filter(|path| path.exists()),
        };
        let mut config = Config::load(config_path.as_deref()).with_context(|| match &config_path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load default configuration".to_string(),
        })?;

        // 3. Environment variable overrides
        apply_env(&mut config, |key| env::var(key).ok())?;

        // 4. CLI flag overrides (highest priority)
        apply_overrides(&mut config, overrides);

        config.validate()?;

        Ok(Self {
            config,
            config_path,
            verbose,
        })
    }
}

/// Applies `REGPROXY_*` variables read through `lookup`.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup(ENV_BIND) {
        config.server.bind = bind
            .parse()
            .with_context(|| format!("{} is not a socket address: '{}'", ENV_BIND, bind))?;
    }
    if let Some(scheme) = lookup(ENV_UPSTREAM_SCHEME) {
        config.upstream.scheme = scheme
            .parse()
            .with_context(|| format!("Invalid {}", ENV_UPSTREAM_SCHEME))?;
    }
    if let Some(level) = lookup(ENV_LOG) {
        config.log.level = level;
    }
    Ok(())
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(bind) = overrides.bind {
        config.server.bind = bind;
    }
    if let Some(scheme) = overrides.upstream_scheme {
        config.upstream.scheme = scheme;
    }
}

/// Default config file location: `<config dir>/regproxy/config.yaml`.
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("regproxy").join("config.yaml"))
}
