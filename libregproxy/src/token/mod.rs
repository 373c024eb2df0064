//! Token exchange against a Bearer challenge's realm.
//!
//! Implements the anonymous flow of the distribution token specification:
//! `GET <realm>?service=<service>&scope=<scope>` answered by a JSON document
//! carrying `token` (or `access_token`) and an optional `expires_in`.

use crate::client::translate_reqwest_error;
use crate::error::{ProxyError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use url::Url;


/// Lifetime assumed when the token service does not send `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 300;

/// Parameters of one token exchange. All three are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRequest<'a> {
    pub realm: &'a str,
    pub service: &'a str,
    pub scope: &'a str,
}

/// A bearer token and its expiry hint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_in: u64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            token: token.into(),
            expires_in,
        }
    }

    /// The opaque token value.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Seconds the token service says the token stays valid.
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// Returns the Authorization header value for this token.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::token::AccessToken;
    ///
    /// let token = AccessToken::new("abc", 300);
    /// assert_eq!(token.to_header_value(), "Bearer abc");
    /// ```
    pub fn to_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Body of a successful token response.
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    /// Kept loose: a malformed expiry must not cost a valid token.
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    /// Converts the response into a token, `token` taking precedence over `access_token`.
    fn into_access_token(self) -> Result<AccessToken> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
            .ok_or(ProxyError::MissingToken)?;

        let expires_in = self
            .expires_in
            .and_then(|v| v.as_u64())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN);

        Ok(AccessToken::new(token, expires_in))
    }
}

/// Builds the token URL: the realm with `service` and `scope` set.
///
/// Existing `service` / `scope` pairs on the realm are replaced; any other
/// query pairs are kept.
///
/// # Examples
///
/// ```
/// use libregproxy::token::{TokenRequest, token_url};
///
/// let url = token_url(&TokenRequest {
///     realm: "https://auth.docker.io/token",
///     service: "registry.docker.io",
///     scope: "repository:library/alpine:pull",
/// })
/// .unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://auth.docker.io/token?service=registry.docker.io&scope=repository%3Alibrary%2Falpine%3Apull"
/// );
/// ```
pub fn token_url(request: &TokenRequest<'_>) -> Result<Url> {
    let mut url = Url::parse(request.realm).map_err(|source| ProxyError::InvalidRealm {
        realm: request.realm.to_string(),
        source,
    })?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "service" && key != "scope")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("service", request.service)
        .append_pair("scope", request.scope);

    Ok(url)
}

/// Exchanges challenge parameters for an access token.
///
/// A non-success status from the realm is a hard error carrying the realm's
/// status and body text.
pub async fn fetch_token(client: &Client, request: &TokenRequest<'_>) -> Result<AccessToken> {
    let url = token_url(request)?;

    tracing::debug!(
        realm = %request.realm,
        service = %request.service,
        scope = %request.scope,
        "Requesting registry token"
    );

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| translate_reqwest_error(e, request.realm))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(unable to read response body)"));
        tracing::warn!(
            realm = %request.realm,
            status = status.as_u16(),
            "Token realm rejected the request"
        );
        return Err(ProxyError::token_fetch(body, status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProxyError::network_with_source("Failed to read token response", e))?;

    let parsed: TokenResponse = serde_json::from_slice(&bytes)
        .map_err(|e| ProxyError::decode_with_source("Failed to parse token response", e))?;

    let token = parsed.into_access_token()?;
    tracing::debug!(
        realm = %request.realm,
        expires_in = token.expires_in(),
        "Obtained registry token"
    );
    Ok(token)
}
