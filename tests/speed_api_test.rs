use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt;

use netdiag_server::config::{ServerConfig, DEFAULT_SERVER_PORT};
use netdiag_server::server::build_router;
use netdiag_server::state::AppState;
use netdiag_server::store::RecordDb;

fn test_router() -> Router {
    let config = ServerConfig {
        data_dir: PathBuf::from("/tmp/netdiag-test"),
        port: DEFAULT_SERVER_PORT,
        bind: "127.0.0.1".to_string(),
    };
    let state = Arc::new(AppState::with_db(config, RecordDb::in_memory().unwrap()));
    build_router(state)
}

fn header_str<'a>(response: &'a axum::response::Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .expect("header present")
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_download_streams_requested_size() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/speedtest/download?size=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "application/octet-stream"
    );
    assert_eq!(
        header_str(&response, header::CONTENT_LENGTH),
        (1024 * 1024).to_string()
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.len(), 1024 * 1024);
}

#[tokio::test]
async fn test_download_sets_cache_defeating_headers() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/speedtest/download?size=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let cache_control = header_str(&response, header::CACHE_CONTROL);
    assert!(cache_control.contains("no-store"));
    assert!(cache_control.contains("no-cache"));
    assert_eq!(header_str(&response, header::PRAGMA), "no-cache");
}

#[tokio::test]
async fn test_download_clamps_oversize_request_via_content_length() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/speedtest/download?size=5000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Header check only; draining 100 MiB here would be pointless
    assert_eq!(
        header_str(&response, header::CONTENT_LENGTH),
        (100u64 * 1024 * 1024).to_string()
    );
}

#[tokio::test]
async fn test_upload_reports_byte_count() {
    let router = test_router();
    let payload = vec![0xA5u8; 64 * 1024];
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/speedtest/upload")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["bytesReceived"], 64 * 1024);
    assert!(json["receivedAt"].as_str().is_some());
}

#[tokio::test]
async fn test_ping_returns_server_timestamp() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/speedtest/ping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    assert!(json["epochMs"].as_i64().unwrap() > 0);
}
