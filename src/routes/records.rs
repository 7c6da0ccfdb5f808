use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::error::ApiError;
use crate::model::{NetworkData, TestRecord, TestType};
use crate::state::SharedState;
use crate::store::{records, RecordFilter};

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    /// Arrives as a raw string so an unknown value becomes a 400 with a
    /// readable detail instead of a body-rejection.
    pub test_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub network_data: Option<NetworkData>,
    #[serde(default)]
    pub media_data: Option<serde_json::Value>,
    #[serde(default)]
    pub system_data: Option<serde_json::Value>,
    #[serde(default)]
    pub advanced_tests_data: Option<serde_json::Value>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub device_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub test_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub deleted: bool,
    pub test_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub test_type: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
}

// ============================================================================
// Header-derived client metadata
// ============================================================================

/// Client address as seen by the server: first X-Forwarded-For hop, then
/// X-Real-IP. Absent when neither header is present.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn client_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn parse_list_limit(limit: Option<usize>) -> Result<usize, ApiError> {
    match limit {
        None => Ok(DEFAULT_LIST_LIMIT),
        Some(l) if (1..=MAX_LIST_LIMIT).contains(&l) => Ok(l),
        Some(_) => Err(ApiError::validation(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        ))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_record(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let test_type = match body.test_type.as_deref() {
        None => return Err(ApiError::validation("testType is required")),
        Some(raw) => TestType::parse(raw).ok_or_else(|| {
            ApiError::validation(format!(
                "testType must be one of: {}",
                TestType::ALL.map(TestType::as_str).join(", ")
            ))
        })?,
    };

    let record = TestRecord {
        test_id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        user_id: body.user_id.unwrap_or_else(|| "anonymous".to_string()),
        test_type,
        network_data: body.network_data,
        media_data: body.media_data,
        system_data: body.system_data,
        advanced_tests_data: body.advanced_tests_data,
        ip_address: client_ip(&headers),
        user_agent: client_user_agent(&headers),
        location: body.location,
        device_info: body.device_info,
    };

    records::create(&state.db, &record).map_err(ApiError::Store)?;
    tracing::info!(
        "Stored {} result {}",
        record.test_type.as_str(),
        record.test_id
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            test_id: record.test_id,
            timestamp: records::format_timestamp(record.timestamp),
        }),
    ))
}

pub async fn get_record(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TestRecord>, ApiError> {
    match records::get_by_id(&state.db, &id).map_err(ApiError::Store)? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound("Test result".to_string())),
    }
}

pub async fn records_by_user(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TestRecord>>, ApiError> {
    let limit = parse_list_limit(params.limit)?;
    let results = records::query_by_user(&state.db, &user_id, limit).map_err(ApiError::Store)?;
    Ok(Json(results))
}

pub async fn records_by_type(
    State(state): State<SharedState>,
    Path(test_type): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TestRecord>>, ApiError> {
    let Some(test_type) = TestType::parse(&test_type) else {
        return Err(ApiError::validation(format!(
            "testType must be one of: {}",
            TestType::ALL.map(TestType::as_str).join(", ")
        )));
    };
    let limit = parse_list_limit(params.limit)?;
    let results = records::query_by_type(&state.db, test_type, limit).map_err(ApiError::Store)?;
    Ok(Json(results))
}

pub async fn recent_records(
    State(state): State<SharedState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TestRecord>>, ApiError> {
    let limit = parse_list_limit(params.limit)?;
    let results = records::scan_recent(&state.db, limit).map_err(ApiError::Store)?;
    Ok(Json(results))
}

pub async fn list_records(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TestRecord>>, ApiError> {
    let mut details = Vec::new();

    let test_type = match params.test_type.as_deref() {
        None => None,
        Some(raw) => match TestType::parse(raw) {
            Some(t) => Some(t),
            None => {
                details.push(format!(
                    "testType must be one of: {}",
                    TestType::ALL.map(TestType::as_str).join(", ")
                ));
                None
            }
        },
    };

    let limit = match params.limit {
        None => DEFAULT_LIST_LIMIT,
        Some(l) if (1..=MAX_LIST_LIMIT).contains(&l) => l,
        Some(_) => {
            details.push(format!("limit must be between 1 and {MAX_LIST_LIMIT}"));
            DEFAULT_LIST_LIMIT
        }
    };

    if !details.is_empty() {
        return Err(ApiError::Validation(details));
    }

    let filter = RecordFilter {
        test_type,
        user_id: params.user_id,
        start_date: params.start_date,
        end_date: params.end_date,
    };
    let results = records::scan_filtered(&state.db, &filter, limit).map_err(ApiError::Store)?;
    Ok(Json(results))
}

/// Idempotent at the interface level: deleting an id that never existed is
/// indistinguishable from deleting one that did.
pub async fn delete_record(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    records::delete(&state.db, &id).map_err(ApiError::Store)?;
    Ok(Json(DeletedResponse {
        deleted: true,
        test_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.9, 198.51.100.2".parse().unwrap(),
        );
        headers.insert("x-real-ip", "192.0.2.1".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "192.0.2.1".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn test_client_ip_absent_without_headers() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_list_limit_validation() {
        assert_eq!(parse_list_limit(None).unwrap(), DEFAULT_LIST_LIMIT);
        assert_eq!(parse_list_limit(Some(1)).unwrap(), 1);
        assert_eq!(parse_list_limit(Some(100)).unwrap(), 100);
        assert!(parse_list_limit(Some(0)).is_err());
        assert!(parse_list_limit(Some(101)).is_err());
    }
}
