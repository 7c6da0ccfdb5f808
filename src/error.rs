use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(detail: impl Into<String>) -> Self {
        ApiError::Validation(vec![detail.into()])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Validation failed",
                    "details": details,
                }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({
                    "error": "Not found",
                    "message": format!("{} not found", what),
                }),
            ),
            ApiError::Store(e) => {
                tracing::error!("Store error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    internal_body(&e.to_string()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, internal_body(msg))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

// Detailed messages only leave the process in debug builds; release builds
// report a generic failure and keep the detail in the server log.
fn internal_body(detail: &str) -> serde_json::Value {
    if cfg!(debug_assertions) {
        serde_json::json!({
            "error": "Internal server error",
            "message": detail,
        })
    } else {
        serde_json::json!({
            "error": "Internal server error",
            "message": "An unexpected error occurred",
        })
    }
}
