//! Pure, stateless reduction of result records into dimensioned summaries.
//! Every report is computed fresh from an already-fetched in-memory list;
//! nothing here touches the store or caches between calls.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{SpeedTestData, TestRecord};

// ============================================================================
// Result types
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketStats {
    pub count: usize,
    pub avg_download: String,
    pub avg_upload: String,
    pub avg_latency: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_tests: usize,
    pub average_download_speed: String,
    pub average_upload_speed: String,
    pub average_latency: String,
    pub best_download_speed: f64,
    pub best_upload_speed: f64,
    pub lowest_latency: Option<f64>,
    pub daily: BTreeMap<String, BucketStats>,
    pub test_type_distribution: BTreeMap<String, usize>,
    pub connection_quality_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub daily: BTreeMap<String, BucketStats>,
    pub weekly: BTreeMap<String, BucketStats>,
    pub monthly: BTreeMap<String, BucketStats>,
    /// Per-test-type daily counts: display label → day → count.
    pub test_type_daily_counts: BTreeMap<String, BTreeMap<String, usize>>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub by_test_type: BTreeMap<String, BucketStats>,
    pub by_time_of_day: BTreeMap<String, BucketStats>,
    pub by_day_of_week: BTreeMap<String, BucketStats>,
    pub by_location: BTreeMap<String, BucketStats>,
    pub by_device: BTreeMap<String, BucketStats>,
}

/// Dimension selector for the generic grouped summary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Day,
    Week,
    Month,
    TestType,
    Location,
}

impl GroupBy {
    pub fn parse(value: &str) -> Option<GroupBy> {
        match value {
            "day" => Some(GroupBy::Day),
            "week" => Some(GroupBy::Week),
            "month" => Some(GroupBy::Month),
            "testType" => Some(GroupBy::TestType),
            "location" => Some(GroupBy::Location),
            _ => None,
        }
    }
}

// ============================================================================
// Sample extraction
// ============================================================================

/// Parse a client-supplied decimal speed string. Malformed or non-finite
/// values are "absent", never zero, so one bad record cannot corrupt a
/// running sum.
pub fn parse_speed(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Latency sample, if one was measured. Zero is "no measurement" on the
/// wire, not a zero-millisecond round trip.
pub fn latency_sample(speed_test: &SpeedTestData) -> Option<f64> {
    speed_test
        .latency
        .filter(|v| v.is_finite() && *v != 0.0)
}

// ============================================================================
// Bucket keys
// ============================================================================

pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn month_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

/// Week label in the original tool's numbering:
/// `ceil((dayOfMonth + dayOfWeek) / 7)` with dayOfWeek counted from Sunday.
/// Not ISO 8601 — preserved verbatim so week buckets line up with
/// previously stored analytics.
pub fn week_key(ts: DateTime<Utc>) -> String {
    let day = ts.day();
    let dow = ts.weekday().num_days_from_sunday();
    let week = (day + dow).div_ceil(7);
    format!("{}-W{}", ts.year(), week)
}

/// Time-of-day slot; boundaries are half-open `[start, end)`.
pub fn time_of_day_slot(hour: u32) -> &'static str {
    match hour {
        0..=5 => "Night (0-6)",
        6..=11 => "Morning (6-12)",
        12..=17 => "Afternoon (12-18)",
        _ => "Evening (18-24)",
    }
}

pub fn day_of_week(ts: DateTime<Utc>) -> String {
    ts.format("%A").to_string()
}

/// Coarse device class from a user-agent string.
pub fn device_class(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent else {
        return "Desktop";
    };
    let ua = ua.to_lowercase();
    if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        "Mobile"
    } else if ua.contains("tablet") || ua.contains("ipad") {
        "Tablet"
    } else {
        "Desktop"
    }
}

fn location_key(record: &TestRecord) -> String {
    record
        .location
        .clone()
        .or_else(|| record.ip_address.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

// ============================================================================
// Bucket accumulation
// ============================================================================

/// One aggregation bucket: the record count plus whichever samples parsed.
/// A record missing the speed-test block still counts; it just contributes
/// no samples.
#[derive(Debug, Default)]
struct SampleSet {
    count: usize,
    download: Vec<f64>,
    upload: Vec<f64>,
    latency: Vec<f64>,
}

impl SampleSet {
    fn add(&mut self, record: &TestRecord) {
        self.count += 1;
        let Some(speed_test) = record.speed_test() else {
            return;
        };
        if let Some(v) = parse_speed(speed_test.download.as_deref()) {
            self.download.push(v);
        }
        if let Some(v) = parse_speed(speed_test.upload.as_deref()) {
            self.upload.push(v);
        }
        if let Some(v) = latency_sample(speed_test) {
            self.latency.push(v);
        }
    }

    fn stats(&self) -> BucketStats {
        BucketStats {
            count: self.count,
            avg_download: format_avg(&self.download),
            avg_upload: format_avg(&self.upload),
            avg_latency: format_avg(&self.latency),
        }
    }
}

/// Arithmetic mean formatted to two decimals; `"0"` when no samples parsed.
fn format_avg(samples: &[f64]) -> String {
    if samples.is_empty() {
        return "0".to_string();
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    format!("{mean:.2}")
}

/// Result-set-level extrema. Maxima seed at 0, the minimum at +infinity;
/// a never-updated minimum serializes as null.
#[derive(Debug)]
struct Extrema {
    best_download: f64,
    best_upload: f64,
    lowest_latency: f64,
}

impl Extrema {
    fn new() -> Self {
        Self {
            best_download: 0.0,
            best_upload: 0.0,
            lowest_latency: f64::INFINITY,
        }
    }

    fn update(&mut self, record: &TestRecord) {
        let Some(speed_test) = record.speed_test() else {
            return;
        };
        if let Some(v) = parse_speed(speed_test.download.as_deref()) {
            self.best_download = self.best_download.max(v);
        }
        if let Some(v) = parse_speed(speed_test.upload.as_deref()) {
            self.best_upload = self.best_upload.max(v);
        }
        if let Some(v) = latency_sample(speed_test) {
            self.lowest_latency = self.lowest_latency.min(v);
        }
    }

    fn lowest_latency_or_none(&self) -> Option<f64> {
        self.lowest_latency.is_finite().then_some(self.lowest_latency)
    }
}

fn bucket_into<K: Ord>(buckets: &mut BTreeMap<K, SampleSet>, key: K, record: &TestRecord) {
    buckets.entry(key).or_default().add(record);
}

fn finish(buckets: BTreeMap<String, SampleSet>) -> BTreeMap<String, BucketStats> {
    buckets.into_iter().map(|(k, v)| (k, v.stats())).collect()
}

// ============================================================================
// Reports
// ============================================================================

/// Overall averages and extrema, a per-day series (ascending day keys), and
/// distribution counts.
pub fn performance_summary(records: &[TestRecord]) -> PerformanceSummary {
    let mut overall = SampleSet::default();
    let mut extrema = Extrema::new();
    let mut daily: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_quality: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        overall.add(record);
        extrema.update(record);
        bucket_into(&mut daily, day_key(record.timestamp), record);

        *by_type.entry(record.test_type.label().to_string()).or_default() += 1;
        if let Some(quality) = record
            .speed_test()
            .and_then(|st| st.connection_quality.clone())
        {
            *by_quality.entry(quality).or_default() += 1;
        }
    }

    let overall_stats = overall.stats();
    PerformanceSummary {
        total_tests: records.len(),
        average_download_speed: overall_stats.avg_download,
        average_upload_speed: overall_stats.avg_upload,
        average_latency: overall_stats.avg_latency,
        best_download_speed: extrema.best_download,
        best_upload_speed: extrema.best_upload,
        lowest_latency: extrema.lowest_latency_or_none(),
        daily: finish(daily),
        test_type_distribution: by_type,
        connection_quality_distribution: by_quality,
    }
}

/// Daily, weekly, and monthly series plus per-test-type daily counts.
pub fn trend_report(records: &[TestRecord]) -> TrendReport {
    let mut daily: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut weekly: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut monthly: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut type_daily: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for record in records {
        let day = day_key(record.timestamp);
        bucket_into(&mut daily, day.clone(), record);
        bucket_into(&mut weekly, week_key(record.timestamp), record);
        bucket_into(&mut monthly, month_key(record.timestamp), record);
        *type_daily
            .entry(record.test_type.label().to_string())
            .or_default()
            .entry(day)
            .or_default() += 1;
    }

    TrendReport {
        daily: finish(daily),
        weekly: finish(weekly),
        monthly: finish(monthly),
        test_type_daily_counts: type_daily,
    }
}

/// Cross-dimension comparison: the same records sliced five ways.
pub fn comparison_report(records: &[TestRecord]) -> ComparisonReport {
    let mut by_test_type: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut by_time_of_day: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut by_day_of_week: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut by_location: BTreeMap<String, SampleSet> = BTreeMap::new();
    let mut by_device: BTreeMap<String, SampleSet> = BTreeMap::new();

    for record in records {
        bucket_into(
            &mut by_test_type,
            record.test_type.label().to_string(),
            record,
        );
        bucket_into(
            &mut by_time_of_day,
            time_of_day_slot(record.timestamp.hour()).to_string(),
            record,
        );
        bucket_into(&mut by_day_of_week, day_of_week(record.timestamp), record);
        bucket_into(&mut by_location, location_key(record), record);
        bucket_into(
            &mut by_device,
            device_class(record.user_agent.as_deref()).to_string(),
            record,
        );
    }

    ComparisonReport {
        by_test_type: finish(by_test_type),
        by_time_of_day: finish(by_time_of_day),
        by_day_of_week: finish(by_day_of_week),
        by_location: finish(by_location),
        by_device: finish(by_device),
    }
}

/// Single dimensioned mapping for an explicit `groupBy` selector.
pub fn grouped_summary(records: &[TestRecord], group_by: GroupBy) -> BTreeMap<String, BucketStats> {
    let mut buckets: BTreeMap<String, SampleSet> = BTreeMap::new();
    for record in records {
        let key = match group_by {
            GroupBy::Day => day_key(record.timestamp),
            GroupBy::Week => week_key(record.timestamp),
            GroupBy::Month => month_key(record.timestamp),
            GroupBy::TestType => record.test_type.label().to_string(),
            GroupBy::Location => location_key(record),
        };
        bucket_into(&mut buckets, key, record);
    }
    finish(buckets)
}
