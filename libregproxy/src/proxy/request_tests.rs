use super::*;
use crate::client::{ClientConfig, Clients};
use mockito::Matcher;

fn retarget(uri: &str, headers: HeaderMap) -> UpstreamRequest {
    let upstream = Upstream::parse("registry-1.docker.io").unwrap();
    UpstreamRequest::retarget(
        UpstreamScheme::Https,
        &upstream,
        &Method::GET,
        &uri.parse().unwrap(),
        &headers,
        Bytes::new(),
    )
    .unwrap()
}

#[test]
fn test_strip_upstream_param_only_param() {
    assert_eq!(strip_upstream_param("upstream=ghcr.io"), None);
}

#[test]
fn test_strip_upstream_param_keeps_others_verbatim() {
    assert_eq!(
        strip_upstream_param("n=10&upstream=ghcr.io&last=library%2Falpine"),
        Some("n=10&last=library%2Falpine".to_string())
    );
}

#[test]
fn test_strip_upstream_param_removes_every_occurrence() {
    assert_eq!(
        strip_upstream_param("upstream=a&x=1&upstream=b"),
        Some("x=1".to_string())
    );
}

#[test]
fn test_strip_upstream_param_encoded_key() {
    assert_eq!(strip_upstream_param("%75pstream=ghcr.io&x=1"), Some("x=1".to_string()));
}

#[test]
fn test_strip_upstream_param_empty_segments() {
    assert_eq!(strip_upstream_param("&&x=1&"), Some("x=1".to_string()));
    assert_eq!(strip_upstream_param(""), None);
}

#[test]
fn test_retarget_url() {
    let request = retarget(
        "/v2/library/alpine/manifests/latest?upstream=registry-1.docker.io",
        HeaderMap::new(),
    );
    assert_eq!(
        request.url().as_str(),
        "https://registry-1.docker.io/v2/library/alpine/manifests/latest"
    );
    assert_eq!(request.method(), Method::GET);
}

#[test]
fn test_retarget_url_keeps_other_query_params() {
    let request = retarget(
        "/v2/library/alpine/tags/list?n=50&upstream=registry-1.docker.io",
        HeaderMap::new(),
    );
    assert_eq!(request.url().query(), Some("n=50"));
}

#[test]
fn test_retarget_http_scheme_and_port() {
    let upstream = Upstream::parse("127.0.0.1:5000").unwrap();
    let request = UpstreamRequest::retarget(
        UpstreamScheme::Http,
        &upstream,
        &Method::HEAD,
        &"/v2/?upstream=127.0.0.1:5000".parse().unwrap(),
        &HeaderMap::new(),
        Bytes::new(),
    )
    .unwrap();

    assert_eq!(request.url().as_str(), "http://127.0.0.1:5000/v2/");
    assert_eq!(request.headers().get(header::HOST).unwrap(), "127.0.0.1:5000");
}

#[test]
fn test_retarget_rewrites_host_and_keeps_client_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, HeaderValue::from_static("proxy.internal:8080"));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/vnd.oci.image.index.v1+json"),
    );
    headers.insert(header::USER_AGENT, HeaderValue::from_static("containerd/2.0"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));

    let request = retarget("/v2/?upstream=registry-1.docker.io", headers);

    let headers = request.headers();
    assert_eq!(headers.get(header::HOST).unwrap(), "registry-1.docker.io");
    assert_eq!(
        headers.get(header::ACCEPT).unwrap(),
        "application/vnd.oci.image.index.v1+json"
    );
    assert_eq!(headers.get(header::USER_AGENT).unwrap(), "containerd/2.0");
    assert!(headers.get(header::CONNECTION).is_none());
    assert!(headers.get(header::CONTENT_LENGTH).is_none());
    assert!(headers.get(header::AUTHORIZATION).is_none());
}

#[tokio::test]
async fn test_send_without_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/")
        .match_header("authorization", Matcher::Missing)
        .match_header("host", server.host_with_port().as_str())
        .with_status(200)
        .create_async()
        .await;

    let upstream = Upstream::parse(&server.host_with_port()).unwrap();
    let request = UpstreamRequest::retarget(
        UpstreamScheme::Http,
        &upstream,
        &Method::GET,
        &format!("/v2/?upstream={}", server.host_with_port()).parse().unwrap(),
        &HeaderMap::new(),
        Bytes::new(),
    )
    .unwrap();

    let clients = Clients::new(&ClientConfig::new()).unwrap();
    let response = request.send(clients.registry(), None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_send_with_token_replaces_authorization() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .create_async()
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic c3RhbGU="));

    let upstream = Upstream::parse(&server.host_with_port()).unwrap();
    let request = UpstreamRequest::retarget(
        UpstreamScheme::Http,
        &upstream,
        &Method::GET,
        &"/v2/".parse().unwrap(),
        &headers,
        Bytes::new(),
    )
    .unwrap();

    let clients = Clients::new(&ClientConfig::new()).unwrap();
    let token = AccessToken::new("fresh", 300);
    let response = request.send(clients.registry(), Some(&token)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status().as_u16(), 200);
    // The stored request is untouched; only the sent copy carries the token.
    assert_eq!(
        request.headers().get(header::AUTHORIZATION).unwrap(),
        "Basic c3RhbGU="
    );
}

#[tokio::test]
async fn test_send_forwards_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("OPTIONS", "/v2/")
        .match_body("probe")
        .with_status(204)
        .create_async()
        .await;

    let upstream = Upstream::parse(&server.host_with_port()).unwrap();
    let request = UpstreamRequest::retarget(
        UpstreamScheme::Http,
        &upstream,
        &Method::OPTIONS,
        &"/v2/".parse().unwrap(),
        &HeaderMap::new(),
        Bytes::from_static(b"probe"),
    )
    .unwrap();

    let clients = Clients::new(&ClientConfig::new()).unwrap();
    let response = request.send(clients.registry(), None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status().as_u16(), 204);
}
