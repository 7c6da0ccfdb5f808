use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of test kinds. Stored as the camelCase wire string; every
/// lookup goes through this enum so a typo'd string can never create a new
/// analytics bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "quickTest")]
    QuickTest,
    #[serde(rename = "detailedAnalysis")]
    DetailedAnalysis,
    #[serde(rename = "manualTest")]
    ManualTest,
}

impl TestType {
    pub const ALL: [TestType; 3] = [
        TestType::QuickTest,
        TestType::DetailedAnalysis,
        TestType::ManualTest,
    ];

    /// Wire identifier, also the storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            TestType::QuickTest => "quickTest",
            TestType::DetailedAnalysis => "detailedAnalysis",
            TestType::ManualTest => "manualTest",
        }
    }

    /// Human-readable label for analytics output.
    pub fn label(self) -> &'static str {
        match self {
            TestType::QuickTest => "Quick Test",
            TestType::DetailedAnalysis => "Detailed Analysis",
            TestType::ManualTest => "Manual Test",
        }
    }

    pub fn parse(value: &str) -> Option<TestType> {
        TestType::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Speed-test measurements inside a record. `download`/`upload` arrive from
/// the browser client as decimal strings and may be malformed; parsing is
/// deferred to the aggregator so one bad value cannot reject the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTestData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_quality: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_test: Option<SpeedTestData>,
    /// Anything else the client attached (jitter probes, DNS timings, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One immutable stored test outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub test_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub test_type: TestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_data: Option<NetworkData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_tests_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<serde_json::Value>,
}

impl TestRecord {
    /// The speed-test block, if the record carries one.
    pub fn speed_test(&self) -> Option<&SpeedTestData> {
        self.network_data.as_ref()?.speed_test.as_ref()
    }
}
