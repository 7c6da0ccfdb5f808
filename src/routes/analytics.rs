use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::analytics::aggregate::{
    self, BucketStats, ComparisonReport, GroupBy, PerformanceSummary, TrendReport,
};
use crate::config::{DEFAULT_ANALYTICS_LIMIT, MAX_ANALYTICS_LIMIT};
use crate::error::ApiError;
use crate::model::{TestRecord, TestType};
use crate::state::SharedState;
use crate::store::{records, RecordFilter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub test_type: Option<String>,
    pub group_by: Option<String>,
    pub limit: Option<usize>,
}

/// Resolve the shared analytics filter and fetch the candidate set. The
/// limit is clamped into [1, MAX]; a store failure surfaces as a generic
/// fetch error without retry.
fn fetch_records(
    state: &SharedState,
    params: &AnalyticsParams,
) -> Result<Vec<TestRecord>, ApiError> {
    let test_type = match params.test_type.as_deref() {
        None => None,
        Some(raw) => match TestType::parse(raw) {
            Some(t) => Some(t),
            None => {
                return Err(ApiError::validation(format!(
                    "testType must be one of: {}",
                    TestType::ALL.map(TestType::as_str).join(", ")
                )));
            }
        },
    };

    let limit = params
        .limit
        .unwrap_or(DEFAULT_ANALYTICS_LIMIT)
        .clamp(1, MAX_ANALYTICS_LIMIT);

    let filter = RecordFilter {
        test_type,
        user_id: None,
        start_date: params.start_date.clone(),
        end_date: params.end_date.clone(),
    };
    records::scan_filtered(&state.db, &filter, limit).map_err(ApiError::Store)
}

pub async fn performance(
    State(state): State<SharedState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<PerformanceSummary>, ApiError> {
    let records = fetch_records(&state, &params)?;
    Ok(Json(aggregate::performance_summary(&records)))
}

pub async fn trends(
    State(state): State<SharedState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<TrendReport>, ApiError> {
    let records = fetch_records(&state, &params)?;
    Ok(Json(aggregate::trend_report(&records)))
}

pub async fn comparison(
    State(state): State<SharedState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<ComparisonReport>, ApiError> {
    let records = fetch_records(&state, &params)?;
    Ok(Json(aggregate::comparison_report(&records)))
}

/// Single dimensioned mapping selected by a required `groupBy` parameter.
pub async fn grouped(
    State(state): State<SharedState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<BTreeMap<String, BucketStats>>, ApiError> {
    let group_by = match params.group_by.as_deref() {
        None => {
            return Err(ApiError::validation(
                "groupBy is required: day, week, month, testType, or location",
            ));
        }
        Some(raw) => match GroupBy::parse(raw) {
            Some(g) => g,
            None => {
                return Err(ApiError::validation(
                    "groupBy must be one of: day, week, month, testType, location",
                ));
            }
        },
    };

    let records = fetch_records(&state, &params)?;
    Ok(Json(aggregate::grouped_summary(&records, group_by)))
}
