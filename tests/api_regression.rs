//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! all /api/v1/* endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use plc_kb::api::{create_app, ApiState};
use plc_kb::config::KbConfig;
use plc_kb::KnowledgeBaseHandle;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use std::path::PathBuf;
use tower::ServiceExt;

fn bundled_config() -> KbConfig {
    let mut config = KbConfig::default();
    config.source.dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("kb");
    config
}

fn create_test_app() -> Router {
    let handle = KnowledgeBaseHandle::load(bundled_config()).unwrap();
    create_app(ApiState::new(handle))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

/// All v1 GET endpoints should return 200.
#[tokio::test]
async fn test_v1_get_endpoints_return_200() {
    let endpoints = [
        "/api/v1/health",
        "/api/v1/categories",
        "/api/v1/categories/safety",
        "/api/v1/tags/TON",
        "/api/v1/search?q=EmergencyStop",
        "/api/v1/context?q=debounce%20limit%20switch",
    ];

    for endpoint in &endpoints {
        let (status, _) = get_json(create_test_app(), endpoint).await;
        assert!(
            status.is_success(),
            "GET {endpoint} returned status {status}"
        );
    }
}

/// Every success response is wrapped in `{ data, meta }`.
#[tokio::test]
async fn test_v1_health_returns_envelope() {
    let (status, json) = get_json(create_test_app(), "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["version"], "1");
    assert_eq!(json["data"]["entries"], 12);
    assert_eq!(json["data"]["categories"], 2);
}

#[tokio::test]
async fn test_categories_in_source_order() {
    let (_, json) = get_json(create_test_app(), "/api/v1/categories").await;
    assert_eq!(json["data"], serde_json::json!(["syntax", "safety"]));
}

/// Unknown categories are not an error.
#[tokio::test]
async fn test_unknown_category_returns_empty_list() {
    let (status, json) = get_json(create_test_app(), "/api/v1/categories/motion").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_search_returns_ranked_hits() {
    let (status, json) = get_json(create_test_app(), "/api/v1/search?q=emergencystop").await;
    assert_eq!(status, StatusCode::OK);

    let hits = json["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["entry"]["category"], "safety");
    assert_eq!(hits[0]["entry"]["source"], "safety_interlocks.md");
    assert!(hits[0]["score"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_search_limit_is_applied() {
    let (_, json) = get_json(create_test_app(), "/api/v1/search?q=e&limit=3").await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

/// Missing or blank `q` is rejected with the error envelope.
#[tokio::test]
async fn test_empty_search_returns_400() {
    for uri in ["/api/v1/search", "/api/v1/search?q=%20%20", "/api/v1/context?q="] {
        let (status, json) = get_json(create_test_app(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "GET {uri}");
        assert_eq!(json["error"]["code"], "EMPTY_QUERY");
        assert!(json.get("data").is_none());
    }
}

#[tokio::test]
async fn test_context_cites_sources() {
    let (status, json) = get_json(create_test_app(), "/api/v1/context?q=EmergencyStop&top_k=1").await;
    assert_eq!(status, StatusCode::OK);
    let context = json["data"]["context"].as_str().unwrap();
    assert!(context.starts_with("Source: safety_interlocks.md#2\n[safety] "));
}

#[tokio::test]
async fn test_reload_returns_stats() {
    let resp = create_test_app()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

/// A broken edit fails the rebuild with the document location, and the
/// previous snapshot keeps answering.
#[tokio::test]
async fn test_failed_reload_returns_422_and_keeps_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("notes.md");
    std::fs::write(&path, "Title: Safety\n- Outputs default to FALSE\n").unwrap();

    let mut config = KbConfig::default();
    config.source.dir = tmp.path().to_path_buf();
    let app = create_app(ApiState::new(KnowledgeBaseHandle::load(config).unwrap()));

    std::fs::write(&path, "Title: Safety\n- Outputs default to FALSE\nstray prose\n- \n").unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "RELOAD_FAILED");
    assert_eq!(json["error"]["document"], "notes.md");
    assert_eq!(json["error"]["line"], 4);

    let (status, json) = get_json(app, "/api/v1/categories/safety").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["body"], "Outputs default to FALSE");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let resp = create_test_app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
