use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Record store handle. All access goes through one connection behind a
/// mutex; creation and deletion are single atomic statements, so no
/// transaction ever spans multiple records.
pub struct RecordDb {
    conn: Mutex<Connection>,
}

impl RecordDb {
    pub fn new(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("test-results.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory store for tests.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS test_records (
                test_id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                user_id TEXT NOT NULL DEFAULT 'anonymous',
                test_type TEXT NOT NULL,
                network_data TEXT,
                media_data TEXT,
                system_data TEXT,
                advanced_tests_data TEXT,
                ip_address TEXT,
                user_agent TEXT,
                location TEXT,
                device_info TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tr_user_ts ON test_records(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_tr_type_ts ON test_records(test_type, timestamp);
            CREATE INDEX IF NOT EXISTS idx_tr_ts ON test_records(timestamp);
        ",
        )?;
        Ok(())
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
