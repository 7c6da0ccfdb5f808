use axum::body::Body;
use axum::extract::Query;
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use chrono::Utc;
use futures::stream;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::config::{DEFAULT_DOWNLOAD_MB, DOWNLOAD_CHUNK_BYTES, MAX_DOWNLOAD_MB};
use crate::store::records::format_timestamp;

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    /// Requested size in MiB.
    pub size: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub bytes_received: usize,
    pub received_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    pub timestamp: String,
    pub epoch_ms: i64,
}

/// Requested megabytes resolved against the default and the hard cap.
/// Zero is treated as "unspecified", matching the browser client.
pub fn resolve_download_bytes(size_mb: Option<u64>) -> u64 {
    let mb = size_mb
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_DOWNLOAD_MB)
        .min(MAX_DOWNLOAD_MB);
    mb * 1024 * 1024
}

/// Finite lazy sequence of fixed-size incompressible chunks. Each chunk is
/// generated when the transport pulls it, so memory stays bounded at one
/// chunk and a dropped connection stops the generator.
fn chunk_stream(total_bytes: u64) -> impl futures::Stream<Item = Result<Bytes, Infallible>> {
    let rng = SmallRng::from_os_rng();
    stream::unfold((total_bytes, rng), |(remaining, mut rng)| async move {
        if remaining == 0 {
            return None;
        }
        let len = remaining.min(DOWNLOAD_CHUNK_BYTES as u64) as usize;
        let mut chunk = vec![0u8; len];
        rng.fill_bytes(&mut chunk);
        Some((Ok(Bytes::from(chunk)), (remaining - len as u64, rng)))
    })
}

/// GET /speedtest/download?size=<MiB> — streams incompressible bytes. The
/// no-cache headers keep intermediaries from short-circuiting the
/// measurement.
pub async fn download_stream(Query(params): Query<DownloadParams>) -> Response {
    let total = resolve_download_bytes(params.size);
    tracing::debug!("Serving {} byte download test payload", total);

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, total.to_string()),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate".to_string(),
            ),
            (header::PRAGMA, "no-cache".to_string()),
            (header::EXPIRES, "0".to_string()),
        ],
        Body::from_stream(chunk_stream(total)),
    )
        .into_response()
}

/// POST /speedtest/upload — counts received bytes. The body limit on this
/// route caps the payload at 100 MB.
pub async fn upload_sink(body: Bytes) -> Json<UploadResponse> {
    Json(UploadResponse {
        bytes_received: body.len(),
        received_at: format_timestamp(Utc::now()),
    })
}

/// GET /speedtest/ping — server timestamp for round-trip timing.
pub async fn ping() -> Json<PingResponse> {
    let now = Utc::now();
    Json(PingResponse {
        timestamp: format_timestamp(now),
        epoch_ms: now.timestamp_millis(),
    })
}
