//! HTTP front end for the proxy.
//!
//! Every path and method is routed to one fallback handler, which hands the
//! request to [`Proxy`] and streams the upstream answer back. Failures become
//! plain-text responses through [`ProxyError`]'s `IntoResponse`.

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::proxy::Proxy;
use crate::proxy::headers::strip_hop_by_hop;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[cfg(test)]
mod tests;

/// Builds the router serving every request through `proxy`.
pub fn build_router(proxy: Arc<Proxy>) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(proxy)
        .layer(TraceLayer::new_for_http())
}

async fn proxy_handler(State(proxy): State<Arc<Proxy>>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match proxy.handle(request).await {
        Ok(upstream) => into_response(upstream),
        Err(err) => {
            if err.is_upstream_auth_failure() {
                tracing::warn!(%method, %path, error = %err, "Upstream authentication failed");
            } else if err.is_classified() {
                tracing::debug!(%method, %path, error = %err, "Rejected request");
            } else {
                tracing::error!(%method, %path, error = %err, "Request failed");
            }
            err.into_response()
        }
    }
}

/// Relays an upstream response: status, end-to-end headers and a streamed body.
pub fn into_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// The proxy's listening server.
pub struct ProxyServer {
    bind: SocketAddr,
    proxy: Arc<Proxy>,
}

impl ProxyServer {
    /// Creates a server from the resolved configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            bind: config.server.bind,
            proxy: Arc::new(Proxy::new(config)?),
        })
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.proxy))
    }

    /// Run the server until the process is killed.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let listener = TcpListener::bind(self.bind).await.map_err(|e| {
            ProxyError::network_with_source(format!("Failed to bind {}", self.bind), e)
        })?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = listener.local_addr().unwrap_or(self.bind);
        info!(
            bind = %addr,
            scheme = %self.proxy.scheme(),
            "Starting registry proxy"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ProxyError::network_with_source("Server error", e))?;

        info!("Registry proxy shut down");
        Ok(())
    }
}
