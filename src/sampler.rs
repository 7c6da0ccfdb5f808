//! Client-side throughput sampler: times a one-shot byte transfer and
//! derives a bitrate. Timing starts at the first received byte, not at
//! request start, so connection setup never deflates small transfers.

use bytes::Bytes;
use futures::StreamExt;
use std::time::{Duration, Instant};

use crate::config::{
    QUALITY_EXCELLENT_MBPS, QUALITY_FAIR_MBPS, QUALITY_GOOD_MBPS, SAMPLER_TIMEOUT_SECS,
};

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Transfer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server responded with status {0}")]
    HttpStatus(u16),
}

/// Measured speed for a successful transfer. Division by a zero elapsed
/// time is a distinct variant, never an infinite or NaN number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    Mbps(f64),
    /// Transfer completed faster than the clock could resolve.
    TooFastToMeasure,
}

impl Throughput {
    pub fn mbps(self) -> Option<f64> {
        match self {
            Throughput::Mbps(v) => Some(v),
            Throughput::TooFastToMeasure => None,
        }
    }
}

#[derive(Debug)]
pub struct TransferMeasurement {
    pub bytes: u64,
    pub elapsed: Duration,
    pub throughput: Throughput,
}

/// Ordinal link-quality category. Band boundaries are inclusive on the
/// lower bound: 5.0 Mbps is already "fair", 100.0 already "excellent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl ConnectionQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionQuality::Poor => "poor",
            ConnectionQuality::Fair => "fair",
            ConnectionQuality::Good => "good",
            ConnectionQuality::Excellent => "excellent",
        }
    }
}

pub fn classify_quality(speed_mbps: f64) -> ConnectionQuality {
    if speed_mbps < QUALITY_FAIR_MBPS {
        ConnectionQuality::Poor
    } else if speed_mbps < QUALITY_GOOD_MBPS {
        ConnectionQuality::Fair
    } else if speed_mbps < QUALITY_EXCELLENT_MBPS {
        ConnectionQuality::Good
    } else {
        ConnectionQuality::Excellent
    }
}

/// `speedMbps = (bytes * 8 / 1e6) / elapsedSeconds`, with the zero-elapsed
/// case mapped to a sentinel instead of infinity.
pub fn compute_throughput(bytes: u64, elapsed: Duration) -> Throughput {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return Throughput::TooFastToMeasure;
    }
    Throughput::Mbps((bytes as f64 * 8.0 / 1_000_000.0) / secs)
}

/// Download a byte stream and time it. The progress callback is invoked
/// with `(bytes_so_far, total_expected)` after every chunk; it is purely
/// observational and never feeds back into the timing.
pub async fn measure_download<F>(
    client: &reqwest::Client,
    url: &str,
    mut progress: F,
) -> Result<TransferMeasurement, SamplerError>
where
    F: FnMut(u64, Option<u64>),
{
    let deadline = Duration::from_secs(SAMPLER_TIMEOUT_SECS);

    let transfer = async {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SamplerError::HttpStatus(status.as_u16()));
        }

        let total_expected = response.content_length();
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        let mut first_byte_at: Option<Instant> = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if first_byte_at.is_none() {
                first_byte_at = Some(Instant::now());
            }
            received += chunk.len() as u64;
            progress(received, total_expected);
        }

        let elapsed = first_byte_at.map(|t| t.elapsed()).unwrap_or_default();
        Ok(TransferMeasurement {
            bytes: received,
            elapsed,
            throughput: compute_throughput(received, elapsed),
        })
    };

    tokio::time::timeout(deadline, transfer)
        .await
        .map_err(|_| SamplerError::Timeout(deadline))?
}

/// Upload a payload and time it. The server counts received bytes; the
/// timing side of the computation lives here, symmetric with download.
pub async fn measure_upload(
    client: &reqwest::Client,
    url: &str,
    payload: Bytes,
) -> Result<TransferMeasurement, SamplerError> {
    let deadline = Duration::from_secs(SAMPLER_TIMEOUT_SECS);
    let bytes = payload.len() as u64;

    let transfer = async {
        let started = Instant::now();
        let response = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SamplerError::HttpStatus(status.as_u16()));
        }
        // Drain the acknowledgement body before stopping the clock.
        response.bytes().await?;
        let elapsed = started.elapsed();
        Ok(TransferMeasurement {
            bytes,
            elapsed,
            throughput: compute_throughput(bytes, elapsed),
        })
    };

    tokio::time::timeout(deadline, transfer)
        .await
        .map_err(|_| SamplerError::Timeout(deadline))?
}
