use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::SharedState;
use crate::store::records;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub records_stored: Option<i64>,
}

/// Overall status from store reachability. Pure function extracted for
/// testability.
pub fn determine_overall_status(store_reachable: bool) -> &'static str {
    if store_reachable {
        "ok"
    } else {
        "degraded"
    }
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let records_stored = match records::count(&state.db) {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::error!("Health record count failed: {:#}", e);
            None
        }
    };

    Json(HealthResponse {
        status: determine_overall_status(records_stored.is_some()).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        records_stored,
    })
}
