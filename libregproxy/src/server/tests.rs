use super::*;
use crate::client::{ClientConfig, Clients};
use crate::config::UpstreamScheme;
use axum::http::{StatusCode, header};
use mockito::Server;
use tower::ServiceExt;

fn test_router() -> Router {
    let clients = Clients::new(&ClientConfig::new()).unwrap();
    build_router(Arc::new(Proxy::with_clients(
        clients,
        UpstreamScheme::Http,
        1024 * 1024,
    )))
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request {
    axum::http::Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[test]
fn test_server_creation() {
    let server = ProxyServer::new(&Config::default()).unwrap();
    assert_eq!(server.bind_addr(), "0.0.0.0:8080".parse().unwrap());
}

#[test]
fn test_server_custom_bind() {
    let mut config = Config::default();
    config.server.bind = "127.0.0.1:9090".parse().unwrap();
    let server = ProxyServer::new(&config).unwrap();
    assert_eq!(server.bind_addr(), "127.0.0.1:9090".parse().unwrap());
}

#[tokio::test]
async fn test_missing_upstream_is_bad_request() {
    let response = test_router().oneshot(get("/v2/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_text(response).await, "Missing upstream parameter");
}

#[tokio::test]
async fn test_invalid_upstream_is_bad_request() {
    let response = test_router()
        .oneshot(get("/v2/?upstream=ghcr.io/v2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "Invalid upstream parameter, expect a domain"
    );
}

#[tokio::test]
async fn test_write_method_is_not_allowed() {
    let request = axum::http::Request::builder()
        .method("PUT")
        .uri("/v2/library/alpine/manifests/latest?upstream=ghcr.io")
        .body(Body::from("{}"))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(response).await, "Method not allowed");
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    let response = test_router()
        .oneshot(get("/v2/?upstream=127.0.0.1:9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Internal server error");
}

#[tokio::test]
async fn test_relays_upstream_response() {
    let mut registry = Server::new_async().await;
    registry
        .mock("GET", "/v2/library/alpine/manifests/latest")
        .with_status(200)
        .with_header("content-type", "application/vnd.oci.image.index.v1+json")
        .with_header("docker-content-digest", "sha256:abc")
        .with_body(r#"{"schemaVersion":2}"#)
        .create_async()
        .await;

    let response = test_router()
        .oneshot(get(&format!(
            "/v2/library/alpine/manifests/latest?upstream={}",
            registry.host_with_port()
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.oci.image.index.v1+json"
    );
    assert_eq!(
        response.headers().get("docker-content-digest").unwrap(),
        "sha256:abc"
    );
    assert_eq!(body_text(response).await, r#"{"schemaVersion":2}"#);
}

#[tokio::test]
async fn test_relays_upstream_error_status() {
    let mut registry = Server::new_async().await;
    registry
        .mock("GET", "/v2/library/missing/manifests/latest")
        .with_status(404)
        .with_body(r#"{"errors":[{"code":"MANIFEST_UNKNOWN"}]}"#)
        .create_async()
        .await;

    let response = test_router()
        .oneshot(get(&format!(
            "/v2/library/missing/manifests/latest?upstream={}",
            registry.host_with_port()
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_text(response).await,
        r#"{"errors":[{"code":"MANIFEST_UNKNOWN"}]}"#
    );
}

#[tokio::test]
async fn test_serve_with_shutdown() {
    let mut registry = Server::new_async().await;
    registry
        .mock("GET", "/v2/")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let mut config = Config::default();
    config.server.bind = "127.0.0.1:0".parse().unwrap();
    config.upstream.scheme = UpstreamScheme::Http;
    let server = ProxyServer::new(&config).unwrap();

    let listener = TcpListener::bind(server.bind_addr()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async {
        let _ = stopped.await;
    }));

    let response = reqwest::get(format!(
        "http://{}/v2/?upstream={}",
        addr,
        registry.host_with_port()
    ))
    .await
    .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "{}");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
