//! Admission checks applied before anything is sent upstream.

use crate::error::{ProxyError, Result};
use axum::http::{Method, Uri};
use std::fmt;
use url::{Url, form_urlencoded};

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;

/// Query parameter naming the registry to forward to.
pub const UPSTREAM_PARAM: &str = "upstream";

/// Only read methods are proxied.
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::OPTIONS];

/// A validated upstream registry authority: a host with an optional port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    authority: String,
}

impl Upstream {
    /// Validates a raw `upstream` parameter value.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::proxy::Upstream;
    ///
    /// let upstream = Upstream::parse("registry-1.docker.io").unwrap();
    /// assert_eq!(upstream.authority(), "registry-1.docker.io");
    ///
    /// assert!(Upstream::parse("").is_err());
    /// assert!(Upstream::parse("https://ghcr.io").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(ProxyError::MissingUpstream);
        }
        // The URL parser trims surrounding whitespace; a bare host has none.
        if value.contains('/') || value.trim() != value {
            return Err(ProxyError::InvalidUpstream);
        }

        // Anything that is not a bare authority (userinfo, query, fragment,
        // backslash paths) changes the parsed URL's shape.
        let url = Url::parse(&format!("https://{}", value)).map_err(|_| ProxyError::InvalidUpstream)?;
        if !url.username().is_empty()
            || url.password().is_some()
            || url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
        {
            return Err(ProxyError::InvalidUpstream);
        }
        let host = url.host_str().ok_or(ProxyError::InvalidUpstream)?;

        // The URL parser elides the scheme's default port; keep an explicit one
        // since the real scheme is only chosen later.
        let explicit_port = url.port().or_else(|| {
            value
                .rsplit_once(':')
                .and_then(|(_, port)| port.parse::<u16>().ok())
        });

        let authority = match explicit_port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self { authority })
    }

    /// The normalized `host[:port]`, suitable for a URL and a `Host` header.
    pub fn authority(&self) -> &str {
        &self.authority
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority)
    }
}

/// Rejects methods other than GET, HEAD and OPTIONS.
pub fn check_method(method: &Method) -> Result<()> {
    if ALLOWED_METHODS.contains(method) {
        Ok(())
    } else {
        Err(ProxyError::MethodNotAllowed)
    }
}

/// Reads and validates the first `upstream` query parameter.
pub fn extract_upstream(uri: &Uri) -> Result<Upstream> {
    let query = uri.query().unwrap_or_default();
    let value = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == UPSTREAM_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(ProxyError::MissingUpstream)?;

    Upstream::parse(&value)
}

/// Runs every admission check, method first.
pub fn admit(method: &Method, uri: &Uri) -> Result<Upstream> {
    check_method(method)?;
    extract_upstream(uri)
}
