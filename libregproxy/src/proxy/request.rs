//! Construction of the request sent to the upstream registry.

use super::gate::{UPSTREAM_PARAM, Upstream};
use super::headers::strip_hop_by_hop;
use crate::client::translate_reqwest_error;
use crate::config::UpstreamScheme;
use crate::error::{ProxyError, Result};
use crate::token::AccessToken;
use axum::http::header::{self, HeaderValue};
use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use reqwest::{Client, Response};
use url::{Url, form_urlencoded};

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

/// A request retargeted at an upstream registry.
///
/// Built once from the inbound request and sent at most twice: as is, then
/// with a bearer token if the registry challenged the first attempt.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl UpstreamRequest {
    /// Builds the outbound request for `upstream` from the inbound parts.
    ///
    /// The `upstream` query parameter is removed, `Host` is rewritten and
    /// hop-by-hop headers are dropped. Everything else passes through.
    pub fn retarget(
        scheme: UpstreamScheme,
        upstream: &Upstream,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Self> {
        let mut target = format!("{}://{}{}", scheme, upstream.authority(), uri.path());
        if let Some(query) = uri.query().and_then(strip_upstream_param) {
            target.push('?');
            target.push_str(&query);
        }
        let url = Url::parse(&target).map_err(|e| {
            ProxyError::internal(format!("Failed to build upstream URL '{}': {}", target, e))
        })?;

        let mut headers = headers.clone();
        strip_hop_by_hop(&mut headers);
        // reqwest computes the length from the buffered body
        headers.remove(header::CONTENT_LENGTH);
        let host = HeaderValue::from_str(upstream.authority())
            .map_err(|_| ProxyError::InvalidUpstream)?;
        headers.insert(header::HOST, host);

        Ok(Self {
            method: method.clone(),
            url,
            headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sends the request, with `Authorization: Bearer …` when a token is given.
    pub async fn send(&self, client: &Client, token: Option<&AccessToken>) -> Result<Response> {
        let mut headers = self.headers.clone();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&token.to_header_value()).map_err(|_| {
                ProxyError::internal("Token contains characters not allowed in a header")
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let mut request = client
            .request(self.method.clone(), self.url.clone())
            .headers(headers);
        if !self.body.is_empty() {
            request = request.body(self.body.clone());
        }

        request
            .send()
            .await
            .map_err(|e| translate_reqwest_error(e, self.url.host_str().unwrap_or_default()))
    }
}

/// Removes every `upstream` pair from a raw query string.
///
/// Other pairs keep their original encoding and order. Returns `None` when
/// nothing is left.
pub fn strip_upstream_param(query: &str) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            form_urlencoded::parse(pair.as_bytes())
                .next()
                .is_none_or(|(key, _)| key != UPSTREAM_PARAM)
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("&"))
    }
}
