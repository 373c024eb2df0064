//! The authenticating forwarder.
//!
//! [`Proxy`] ties the other modules together. For one inbound request it:
//!
//! 1. admits the request (read method, valid `upstream` parameter),
//! 2. retargets it at the upstream registry and sends it,
//! 3. on `401 Unauthorized`, parses the Bearer challenge, resolves the scope,
//!    fetches a token from the realm and resends the request once with it.
//!
//! Whatever the upstream answers last is returned untouched. Nothing is kept
//! between requests.

use crate::auth::{ChallengeParams, is_bearer_challenge};
use crate::client::{ClientConfig, Clients};
use crate::config::{Config, UpstreamScheme};
use crate::error::{ProxyError, Result};
use crate::scope::determine_scope;
use crate::token::{AccessToken, TokenRequest, fetch_token};
use axum::extract::Request;
use reqwest::header::WWW_AUTHENTICATE;
use reqwest::{Response, StatusCode};

pub mod gate;
pub mod headers;
pub mod request;

pub use gate::{Upstream, admit};
pub use request::UpstreamRequest;


/// Forwards registry reads and answers Bearer challenges on the caller's behalf.
#[derive(Debug, Clone)]
pub struct Proxy {
    clients: Clients,
    scheme: UpstreamScheme,
    max_body_bytes: usize,
}

impl Proxy {
    /// Creates a proxy from the resolved configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let clients = Clients::new(&ClientConfig::from(&config.network))?;
        Ok(Self::with_clients(
            clients,
            config.upstream.scheme,
            config.server.max_body_bytes,
        ))
    }

    pub fn with_clients(clients: Clients, scheme: UpstreamScheme, max_body_bytes: usize) -> Self {
        Self {
            clients,
            scheme,
            max_body_bytes,
        }
    }

    pub fn scheme(&self) -> UpstreamScheme {
        self.scheme
    }

    /// Handles one inbound request end to end.
    ///
    /// Admission runs before the body is read, so rejected requests never
    /// buffer anything.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let upstream = admit(&parts.method, &parts.uri)?;

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(ProxyError::body)?;

        let outbound = UpstreamRequest::retarget(
            self.scheme,
            &upstream,
            &parts.method,
            &parts.uri,
            &parts.headers,
            body,
        )?;

        tracing::debug!(
            method = %outbound.method(),
            upstream = %upstream,
            url = %outbound.url(),
            "Forwarding request"
        );

        self.forward(&outbound).await
    }

    /// Sends a retargeted request, authenticating and retrying once on `401`.
    pub async fn forward(&self, outbound: &UpstreamRequest) -> Result<Response> {
        let response = outbound.send(self.clients.registry(), None).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(url = %outbound.url(), "Upstream requires authentication");
        let token = self.acquire_token(&response, outbound.url().path()).await?;
        drop(response);

        let retried = outbound.send(self.clients.registry(), Some(&token)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                url = %outbound.url(),
                "Upstream still unauthorized after token retry"
            );
        }

        Ok(retried)
    }

    /// Obtains a token for the challenge carried by a `401` response.
    ///
    /// Tokens are always fetched fresh. A cache keyed by realm, service and
    /// scope would slot in here.
    async fn acquire_token(&self, unauthorized: &Response, path: &str) -> Result<AccessToken> {
        let header = unauthorized
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| is_bearer_challenge(value))
            .ok_or(ProxyError::MissingChallenge)?;

        let challenge = ChallengeParams::parse(header);
        let scope = resolve_scope(&challenge, path);
        let request = token_request(&challenge, scope.as_deref())?;

        fetch_token(self.clients.token(), &request).await
    }
}

/// The challenge's own scope wins; otherwise it is derived from the request path.
fn resolve_scope(challenge: &ChallengeParams, path: &str) -> Option<String> {
    challenge
        .scope()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| determine_scope(path))
}

/// Assembles the token exchange; realm, service and scope are all required.
fn token_request<'a>(
    challenge: &'a ChallengeParams,
    scope: Option<&'a str>,
) -> Result<TokenRequest<'a>> {
    let realm = challenge.realm().filter(|v| !v.is_empty());
    let service = challenge.service().filter(|v| !v.is_empty());

    match (realm, service, scope) {
        (Some(realm), Some(service), Some(scope)) => Ok(TokenRequest {
            realm,
            service,
            scope,
        }),
        _ => Err(ProxyError::MissingAuthParams),
    }
}
