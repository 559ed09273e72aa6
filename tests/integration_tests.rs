//! End-to-end tests driving the router in-process.
//!
//! Requests go through the full middleware stack via `tower::ServiceExt::oneshot`;
//! no sockets are opened.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{CONTENT_TYPE, HOST, LINK, LOCATION};
use axum::http::{Method, Request, Response, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use repository_http::{AppState, Config, build_router};

const HOST_HEADER: &str = "10.0.0.7:8080";

struct TestFixture {
    app: Router,
}

impl TestFixture {
    fn new() -> Self {
        Self::with_config(Config {
            metrics_port: 0,
            ..Config::default()
        })
    }

    fn with_config(config: Config) -> Self {
        Self {
            app: build_router(AppState::new(config)),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, HOST_HEADER);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn get(&self, path: &str, headers: &[(&str, &str)]) -> Response<Body> {
        self.request(Method::GET, path, headers, "").await
    }

    async fn put(&self, path: &str, headers: &[(&str, &str)], body: &str) -> Response<Body> {
        self.request(Method::PUT, path, headers, body).await
    }
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("Body should be JSON")
}

fn header<'a>(response: &'a Response<Body>, name: impl axum::http::header::AsHeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .expect("Header should be present")
        .to_str()
        .unwrap()
}

// ============================================================================
// Health & Status Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new();

    let response = fixture.get("/health", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body.get("version").is_some());
    assert!(body.get("uptime_seconds").is_some());
    assert!(body.get("timestamp").is_some());
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let fixture = TestFixture::new();
    let response = fixture.get("/ready", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_generated_and_propagated() {
    let fixture = TestFixture::new();

    let response = fixture.get("/health", &[]).await;
    let generated = header(&response, "x-request-id");
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let response = fixture
        .get("/health", &[("x-request-id", "my-correlation-id")])
        .await;
    assert_eq!(header(&response, "x-request-id"), "my-correlation-id");
}

// ============================================================================
// Origin Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_uris_without_forwarding_headers() {
    let fixture = TestFixture::new();

    let response = fixture.get("/rest", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, LINK),
        "<http://10.0.0.7:8080/rest>; rel=\"self\""
    );

    let body = body_json(response).await;
    assert_eq!(body["id"], "http://10.0.0.7:8080/rest");
    assert!(body.get("parent").is_none());
}

#[tokio::test]
async fn test_forwarded_host_with_port() {
    let fixture = TestFixture::new();

    let response = fixture
        .get("/rest", &[("x-forwarded-host", "example.org:9000")])
        .await;
    let body = body_json(response).await;

    assert_eq!(body["id"], "http://example.org:9000/rest");
}

#[tokio::test]
async fn test_forwarded_header_takes_precedence() {
    let fixture = TestFixture::new();

    let response = fixture
        .put(
            "/rest/books",
            &[
                ("x-forwarded-host", "a.com"),
                ("x-forwarded-proto", "http"),
                ("forwarded", "host=b.com;proto=https"),
            ],
            "",
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, LOCATION), "https://b.com/rest/books");

    let body = body_json(response).await;
    assert_eq!(body["id"], "https://b.com/rest/books");
    assert_eq!(body["parent"], "https://b.com/rest");
}

#[tokio::test]
async fn test_forwarded_host_only_keeps_forwarded_proto() {
    let fixture = TestFixture::new();

    let response = fixture
        .get(
            "/rest",
            &[("x-forwarded-proto", "https"), ("forwarded", "for=1.2.3.4;host=b.com")],
        )
        .await;
    let body = body_json(response).await;

    assert_eq!(body["id"], "https://b.com/rest");
}

#[tokio::test]
async fn test_malformed_forwarded_host_is_ignored() {
    let fixture = TestFixture::new();

    let plain = body_json(fixture.get("/rest", &[]).await).await;
    let response = fixture
        .get("/rest", &[("x-forwarded-host", ":::garbage")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], plain["id"]);
}

#[tokio::test]
async fn test_explicit_port_80_kept_with_https_override() {
    let fixture = TestFixture::new();

    let response = fixture
        .put(
            "/rest/a",
            &[("x-forwarded-proto", "https"), ("x-forwarded-host", "example.org:80")],
            "",
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, LOCATION), "https://example.org:80/rest/a");
}

#[tokio::test]
async fn test_unappliable_scheme_is_ignored_everywhere() {
    let fixture = TestFixture::new();

    let response = fixture
        .put("/rest/a", &[("x-forwarded-proto", "custom")], "")
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, LOCATION), "http://10.0.0.7:8080/rest/a");
    let body = body_json(response).await;
    assert_eq!(body["id"], "http://10.0.0.7:8080/rest/a");
}

#[tokio::test]
async fn test_forwarding_headers_can_be_disabled() {
    let fixture = TestFixture::with_config(Config {
        forwarded_headers_enabled: false,
        metrics_port: 0,
        ..Config::default()
    });

    let response = fixture
        .get("/rest", &[("x-forwarded-host", "example.org")])
        .await;
    let body = body_json(response).await;

    assert_eq!(body["id"], "http://10.0.0.7:8080/rest");
}

#[tokio::test]
async fn test_base_path_is_part_of_generated_uris() {
    let fixture = TestFixture::with_config(Config {
        base_path: "/repo".to_string(),
        metrics_port: 0,
        ..Config::default()
    });

    let response = fixture
        .put("/repo/rest/a", &[("x-forwarded-proto", "https")], "")
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        header(&response, LOCATION),
        "https://10.0.0.7:8080/repo/rest/a"
    );

    let response = fixture.get("/rest/a", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Resource Tests
// ============================================================================

#[tokio::test]
async fn test_create_child_with_slug() {
    let fixture = TestFixture::new();

    let response = fixture
        .request(Method::POST, "/rest", &[("slug", "books")], "")
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header(&response, LOCATION), "http://10.0.0.7:8080/rest/books");

    let root = body_json(fixture.get("/rest", &[]).await).await;
    assert_eq!(
        root["children"],
        serde_json::json!(["http://10.0.0.7:8080/rest/books"])
    );
}

#[tokio::test]
async fn test_create_child_without_slug_uses_uuid() {
    let fixture = TestFixture::new();
    fixture.put("/rest/books", &[], "").await;

    let response = fixture.request(Method::POST, "/rest/books", &[], "").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let location = header(&response, LOCATION).to_string();
    let name = location
        .strip_prefix("http://10.0.0.7:8080/rest/books/")
        .expect("Child should live under its parent");
    assert!(uuid::Uuid::parse_str(name).is_ok());
}

#[tokio::test]
async fn test_put_existing_resource_conflicts() {
    let fixture = TestFixture::new();

    assert_eq!(
        fixture.put("/rest/a", &[], "").await.status(),
        StatusCode::CREATED
    );

    let response = fixture.put("/rest/a", &[], "").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(header(&response, CONTENT_TYPE), "text/plain; charset=utf-8");
    assert!(body_text(response).await.contains("/a"));
}

#[tokio::test]
async fn test_put_without_parent_is_not_found() {
    let fixture = TestFixture::new();
    let response = fixture.put("/rest/a/b", &[], "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_segment_is_bad_request() {
    let fixture = TestFixture::new();
    let response = fixture.put("/rest/a%20b", &[], "").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header(&response, CONTENT_TYPE), "text/plain; charset=utf-8");
}

#[tokio::test]
async fn test_delete_resource_tree() {
    let fixture = TestFixture::new();
    fixture.put("/rest/a", &[], "").await;
    fixture.put("/rest/a/b", &[], "").await;

    let response = fixture.request(Method::DELETE, "/rest/a", &[], "").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        fixture.get("/rest/a/b", &[]).await.status(),
        StatusCode::NOT_FOUND
    );
    let root = body_json(fixture.get("/rest", &[]).await).await;
    assert_eq!(root["children"], serde_json::json!([]));
}

#[tokio::test]
async fn test_get_missing_resource() {
    let fixture = TestFixture::new();
    let response = fixture.get("/rest/missing", &[]).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "/missing");
}

// ============================================================================
// Namespace Tests
// ============================================================================

#[tokio::test]
async fn test_list_default_namespaces() {
    let fixture = TestFixture::new();
    let body = body_json(fixture.get("/namespaces", &[]).await).await;

    assert_eq!(
        body["namespaces"]["rdf"],
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    );
}

#[tokio::test]
async fn test_register_and_replace_namespace() {
    let fixture = TestFixture::new();

    let response = fixture
        .put(
            "/namespaces/ex",
            &[("x-forwarded-host", "repo.example.org")],
            "http://example.org/ns#",
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        header(&response, LOCATION),
        "http://repo.example.org/namespaces/ex"
    );

    let response = fixture
        .put("/namespaces/ex", &[], "http://example.org/ns2#")
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = body_json(fixture.get("/namespaces", &[]).await).await;
    assert_eq!(body["namespaces"]["ex"], "http://example.org/ns2#");
}

#[tokio::test]
async fn test_invalid_prefix_is_bad_request() {
    let fixture = TestFixture::new();
    let response = fixture
        .put("/namespaces/xmlfoo", &[], "http://example.org/ns#")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header(&response, CONTENT_TYPE), "text/plain; charset=utf-8");
    assert!(body_text(response).await.contains("reserved"));
}

#[tokio::test]
async fn test_relative_namespace_uri_is_bad_request() {
    let fixture = TestFixture::new();
    let response = fixture.put("/namespaces/ex", &[], "not/absolute").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_namespace() {
    let fixture = TestFixture::new();

    let response = fixture.request(Method::DELETE, "/namespaces/dc", &[], "").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = fixture.request(Method::DELETE, "/namespaces/dc", &[], "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_body_limit() {
    let fixture = TestFixture::with_config(Config {
        max_request_body_size: 16,
        metrics_port: 0,
        ..Config::default()
    });

    let response = fixture
        .put("/namespaces/ex", &[], "http://example.org/a/very/long/namespace#")
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
