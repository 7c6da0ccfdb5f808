//! Locally persisted client identity record. All mutation is funneled
//! through named operations with last-writer-wins, single-process
//! semantics; nothing else writes these fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub client_id: String,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub visit_count: u64,
    pub test_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
}

impl ClientProfile {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            first_visit: now,
            last_visit: now,
            visit_count: 0,
            test_count: 0,
            last_test_at: None,
            public_ip: None,
        }
    }
}

/// Narrow load/save interface over the profile file.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored profile, or mint a fresh identity when the file is
    /// missing or unreadable.
    pub fn load(&self) -> ClientProfile {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|_| ClientProfile::new()),
            Err(_) => ClientProfile::new(),
        }
    }

    pub fn save(&self, profile: &ClientProfile) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(profile) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!("Failed to save client profile to {:?}: {}", self.path, e);
                }
            }
            Err(e) => {
                warn!("Failed to serialize client profile: {}", e);
            }
        }
    }

    /// Count a visit and stamp the visit time.
    pub fn record_visit(&self) -> ClientProfile {
        let mut profile = self.load();
        profile.visit_count += 1;
        profile.last_visit = Utc::now();
        self.save(&profile);
        profile
    }

    /// Count a completed test and stamp the test time.
    pub fn record_test_result(&self) -> ClientProfile {
        let mut profile = self.load();
        profile.test_count += 1;
        profile.last_test_at = Some(Utc::now());
        self.save(&profile);
        profile
    }

    /// Remember the most recently observed public IP.
    pub fn update_public_ip(&self, ip: impl Into<String>) -> ClientProfile {
        let mut profile = self.load();
        profile.public_ip = Some(ip.into());
        self.save(&profile);
        profile
    }
}
