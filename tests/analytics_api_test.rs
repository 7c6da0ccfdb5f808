use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
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

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_record(router: &Router, body: serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/test-results")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn get_json(router: &Router, uri: &str) -> serde_json::Value {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    body_json(response).await
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn test_performance_summary_end_to_end() {
    let router = test_router();
    post_record(
        &router,
        serde_json::json!({
            "testType": "quickTest",
            "networkData": {
                "speedTest": {"download": "87.5", "upload": "12.3", "latency": 14}
            }
        }),
    )
    .await;

    let day = today();
    let json = get_json(
        &router,
        &format!("/api/analytics/performance?startDate={day}&endDate={day}"),
    )
    .await;

    assert_eq!(json["totalTests"], 1);
    assert_eq!(json["averageDownloadSpeed"], "87.50");
    assert_eq!(json["averageUploadSpeed"], "12.30");
    assert_eq!(json["bestDownloadSpeed"], 87.5);
    assert_eq!(json["lowestLatency"], 14.0);
    assert_eq!(json["daily"][&day]["count"], 1);
}

#[tokio::test]
async fn test_performance_summary_excludes_malformed_samples_from_average() {
    let router = test_router();
    for download in ["100.0", "100.0", "not-a-number"] {
        post_record(
            &router,
            serde_json::json!({
                "testType": "quickTest",
                "networkData": {"speedTest": {"download": download}}
            }),
        )
        .await;
    }

    let json = get_json(&router, "/api/analytics/performance").await;
    assert_eq!(json["totalTests"], 3);
    // Mean over the two valid samples only
    assert_eq!(json["averageDownloadSpeed"], "100.00");
    // No latency samples at all
    assert_eq!(json["averageLatency"], "0");
    assert!(json["lowestLatency"].is_null());
}

#[tokio::test]
async fn test_performance_distributions_count_all_records() {
    let router = test_router();
    for test_type in ["quickTest", "quickTest", "manualTest"] {
        post_record(&router, serde_json::json!({"testType": test_type})).await;
    }

    let json = get_json(&router, "/api/analytics/performance").await;
    assert_eq!(json["testTypeDistribution"]["Quick Test"], 2);
    assert_eq!(json["testTypeDistribution"]["Manual Test"], 1);
}

#[tokio::test]
async fn test_trend_report_buckets_today_in_all_series() {
    let router = test_router();
    post_record(
        &router,
        serde_json::json!({
            "testType": "detailedAnalysis",
            "networkData": {"speedTest": {"download": "40.0"}}
        }),
    )
    .await;

    let json = get_json(&router, "/api/analytics/trends").await;
    let day = today();
    assert_eq!(json["daily"][&day]["count"], 1);
    assert_eq!(json["daily"][&day]["avgDownload"], "40.00");
    assert_eq!(json["monthly"][Utc::now().format("%Y-%m").to_string()]["count"], 1);
    assert_eq!(json["weekly"].as_object().unwrap().len(), 1);
    assert_eq!(json["testTypeDailyCounts"]["Detailed Analysis"][&day], 1);
}

#[tokio::test]
async fn test_comparison_report_slices_all_dimensions() {
    let router = test_router();
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/test-results")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::USER_AGENT, "Mozilla/5.0 (iPhone)")
                .body(Body::from(
                    serde_json::json!({
                        "testType": "quickTest",
                        "location": "Berlin",
                        "networkData": {"speedTest": {"download": "30.0"}}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_json(&router, "/api/analytics/comparison").await;
    assert_eq!(json["byTestType"]["Quick Test"]["count"], 1);
    assert_eq!(json["byDevice"]["Mobile"]["count"], 1);
    assert_eq!(json["byLocation"]["Berlin"]["count"], 1);
    assert_eq!(json["byTimeOfDay"].as_object().unwrap().len(), 1);
    assert_eq!(json["byDayOfWeek"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_grouped_summary_requires_valid_group_by() {
    let router = test_router();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/analytics/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/analytics/summary?groupBy=device")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Validation failed");
}

#[tokio::test]
async fn test_grouped_summary_by_test_type() {
    let router = test_router();
    post_record(&router, serde_json::json!({"testType": "quickTest"})).await;
    post_record(&router, serde_json::json!({"testType": "manualTest"})).await;

    let json = get_json(&router, "/api/analytics/summary?groupBy=testType").await;
    assert_eq!(json["Quick Test"]["count"], 1);
    assert_eq!(json["Manual Test"]["count"], 1);
}

#[tokio::test]
async fn test_analytics_rejects_unknown_test_type_filter() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/analytics/performance?testType=bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics_date_range_excludes_outside_records() {
    let router = test_router();
    post_record(
        &router,
        serde_json::json!({
            "testType": "quickTest",
            "networkData": {"speedTest": {"download": "50.0"}}
        }),
    )
    .await;

    // A range entirely in the past cannot contain the record just created
    let json = get_json(
        &router,
        "/api/analytics/performance?startDate=2020-01-01&endDate=2020-01-31",
    )
    .await;
    assert_eq!(json["totalTests"], 0);
    assert_eq!(json["averageDownloadSpeed"], "0");
}
