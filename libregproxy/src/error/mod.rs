//! Error types for regproxy
//!
//! Every failure the proxy can surface to a client is a [`ProxyError`]. Each
//! variant maps to exactly one HTTP status and one client-visible message.
//! Variants that describe an unexpected failure (network, malformed data,
//! configuration) are "unclassified": they keep their source chain for the
//! logs but collapse to a generic `500 Internal server error` on the wire.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;


/// Message returned to the client for every unclassified failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Main error type for regproxy operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The inbound method is not one of GET, HEAD, OPTIONS
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The `upstream` query parameter is absent or empty
    #[error("Missing upstream parameter")]
    MissingUpstream,

    /// The `upstream` query parameter is not a bare host
    #[error("Invalid upstream parameter, expect a domain")]
    InvalidUpstream,

    /// The upstream answered 401 without a Bearer challenge
    #[error("Missing Www-Authenticate header")]
    MissingChallenge,

    /// The challenge lacked realm or service, or no scope could be derived
    #[error("Missing authentication parameters")]
    MissingAuthParams,

    /// The token realm answered with a non-success status
    #[error("Failed to fetch token: {body}")]
    TokenFetch { body: String, status_code: u16 },

    /// The token realm answered without a `token` or `access_token` field
    #[error("Missing token in response")]
    MissingToken,

    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The realm named by a challenge is not a usable URL
    #[error("Invalid token realm '{realm}'")]
    InvalidRealm {
        realm: String,
        #[source]
        source: url::ParseError,
    },

    /// A response body could not be decoded
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The inbound request body could not be read
    #[error("Failed to read request body")]
    Body {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid config file, bad values)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Anything else that should never reach a client in detail
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for regproxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    /// Creates a new network error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::error::ProxyError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    /// let err = ProxyError::network_with_source("Failed to connect to ghcr.io", io);
    /// assert!(matches!(err, ProxyError::Network { .. }));
    /// ```
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a token fetch error carrying the realm's status and body.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::error::ProxyError;
    ///
    /// let err = ProxyError::token_fetch("denied", 403);
    /// assert_eq!(err.status_code().as_u16(), 403);
    /// assert_eq!(err.public_message(), "Failed to fetch token: denied");
    /// ```
    pub fn token_fetch<S: Into<String>>(body: S, status_code: u16) -> Self {
        Self::TokenFetch {
            body: body.into(),
            status_code,
        }
    }

    /// Creates a new decode error with a source error.
    pub fn decode_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new request body error.
    pub fn body<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Body {
            source: source.into(),
        }
    }

    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::error::ProxyError;
    ///
    /// let err = ProxyError::config("invalid bind address", Some("/etc/regproxy.yaml"));
    /// assert!(matches!(err, ProxyError::Config { .. }));
    /// ```
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true when the error has a dedicated client-facing status and message.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            Self::MethodNotAllowed
                | Self::MissingUpstream
                | Self::InvalidUpstream
                | Self::MissingChallenge
                | Self::MissingAuthParams
                | Self::TokenFetch { .. }
                | Self::MissingToken
        )
    }

    /// Returns true when an upstream registry asked for authentication the
    /// proxy could not provide.
    pub fn is_upstream_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingChallenge | Self::MissingAuthParams | Self::MissingToken
        )
    }

    /// Returns the HTTP status this error is rendered with.
    ///
    /// The token realm's own status is propagated for [`ProxyError::TokenFetch`].
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingUpstream | Self::InvalidUpstream => StatusCode::BAD_REQUEST,
            Self::MissingChallenge | Self::MissingAuthParams | Self::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::TokenFetch { status_code, .. } => {
                StatusCode::from_u16(*status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message sent to the client.
    ///
    /// Unclassified errors never leak their details.
    pub fn public_message(&self) -> String {
        if self.is_classified() {
            self.to_string()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}
