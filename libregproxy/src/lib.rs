//! Regproxy - Authenticating Registry Proxy Library
//!
//! Regproxy sits in front of OCI/Docker registries and answers their Bearer
//! token challenges on the client's behalf, so that anonymous pulls work
//! against registries that require a token even for public content.
//!
//! The target registry is chosen per request with an `upstream` query
//! parameter:
//!
//! ```text
//! GET /v2/library/alpine/manifests/latest?upstream=registry-1.docker.io
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use libregproxy::{Config, ProxyServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let server = ProxyServer::new(&config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`ProxyServer`] - Listener wiring the router to the proxy
//! - [`Proxy`] - Forwarding and the challenge/token/retry handshake
//! - [`Config`] - Layered configuration with defaults
//! - [`ProxyError`] - Every failure, with its client-facing status and message
//!
//! Only read requests (GET, HEAD, OPTIONS) are proxied. Tokens are fetched
//! anonymously and never cached.

#![warn(clippy::all)]

/// Returns the libregproxy crate version.
///
/// # Examples
///
/// ```
/// let version = libregproxy::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use auth::ChallengeParams;
pub use config::Config;
pub use error::{ProxyError, Result};
pub use proxy::Proxy;
pub use scope::determine_scope;
pub use server::{ProxyServer, build_router};
pub use token::AccessToken;

// Low-level modules, public for embedding and tests
#[doc(hidden)]
pub mod auth;
#[doc(hidden)]
pub mod client;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod proxy;
#[doc(hidden)]
pub mod scope;
#[doc(hidden)]
pub mod server;
#[doc(hidden)]
pub mod token;
