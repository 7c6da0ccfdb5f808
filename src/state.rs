use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::store::RecordDb;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: ServerConfig,
    pub db: RecordDb,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let db = RecordDb::new(&config.data_dir)?;
        Ok(Self::with_db(config, db))
    }

    /// Construct around an existing store; integration tests inject an
    /// in-memory database here.
    pub fn with_db(config: ServerConfig, db: RecordDb) -> Self {
        Self {
            config,
            db,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
