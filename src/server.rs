use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::MAX_UPLOAD_BYTES;
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(crate::routes::health::health))
        // Test records
        .route(
            "/api/test-results",
            post(crate::routes::records::create_record).get(crate::routes::records::list_records),
        )
        .route(
            "/api/test-results/recent",
            get(crate::routes::records::recent_records),
        )
        .route(
            "/api/test-results/user/{user_id}",
            get(crate::routes::records::records_by_user),
        )
        .route(
            "/api/test-results/type/{test_type}",
            get(crate::routes::records::records_by_type),
        )
        .route(
            "/api/test-results/{id}",
            get(crate::routes::records::get_record).delete(crate::routes::records::delete_record),
        )
        // Analytics
        .route(
            "/api/analytics/performance",
            get(crate::routes::analytics::performance),
        )
        .route("/api/analytics/trends", get(crate::routes::analytics::trends))
        .route(
            "/api/analytics/comparison",
            get(crate::routes::analytics::comparison),
        )
        .route(
            "/api/analytics/summary",
            get(crate::routes::analytics::grouped),
        )
        // Speed-test transport
        .route(
            "/speedtest/download",
            get(crate::routes::speed::download_stream),
        )
        .route(
            "/speedtest/upload",
            post(crate::routes::speed::upload_sink)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/speedtest/ping", get(crate::routes::speed::ping))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
