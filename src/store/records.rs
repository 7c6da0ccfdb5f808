use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::db::RecordDb;
use super::filter::{bind_params, RecordFilter};
use crate::model::{NetworkData, TestRecord, TestType};

const RECORD_COLUMNS: &str = "test_id, timestamp, user_id, test_type, network_data, media_data, \
     system_data, advanced_tests_data, ip_address, user_agent, location, device_info";

/// Serialize a timestamp the way every stored row does: RFC 3339,
/// millisecond precision, `Z` suffix. The format is load-bearing — range
/// filters compare these strings lexicographically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn json_column<T: serde::Serialize>(value: &Option<T>) -> Option<String> {
    value
        .as_ref()
        .and_then(|v| serde_json::to_string(v).ok())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Option<TestRecord>> {
    let timestamp: String = row.get(1)?;
    let test_type: String = row.get(3)?;

    // A row with an unparseable timestamp or test type is skipped rather
    // than failing the whole fetch.
    let (Ok(timestamp), Some(test_type)) = (
        DateTime::parse_from_rfc3339(&timestamp),
        TestType::parse(&test_type),
    ) else {
        return Ok(None);
    };

    let network_data: Option<String> = row.get(4)?;
    let media_data: Option<String> = row.get(5)?;
    let system_data: Option<String> = row.get(6)?;
    let advanced_tests_data: Option<String> = row.get(7)?;
    let device_info: Option<String> = row.get(11)?;

    Ok(Some(TestRecord {
        test_id: row.get(0)?,
        timestamp: timestamp.with_timezone(&Utc),
        user_id: row.get(2)?,
        test_type,
        network_data: network_data
            .as_deref()
            .and_then(|s| serde_json::from_str::<NetworkData>(s).ok()),
        media_data: media_data.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        system_data: system_data.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        advanced_tests_data: advanced_tests_data
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok()),
        ip_address: row.get(8)?,
        user_agent: row.get(9)?,
        location: row.get(10)?,
        device_info: device_info.as_deref().and_then(|s| serde_json::from_str(s).ok()),
    }))
}

/// Insert one record. `test_id` is the primary key, so a duplicate id fails
/// here instead of silently overwriting.
pub fn create(db: &RecordDb, record: &TestRecord) -> anyhow::Result<()> {
    let conn = db.conn();
    let now = format_timestamp(Utc::now());
    conn.execute(
        "INSERT INTO test_records (test_id, timestamp, user_id, test_type, network_data, \
         media_data, system_data, advanced_tests_data, ip_address, user_agent, location, \
         device_info, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
        params![
            record.test_id,
            format_timestamp(record.timestamp),
            record.user_id,
            record.test_type.as_str(),
            json_column(&record.network_data),
            json_column(&record.media_data),
            json_column(&record.system_data),
            json_column(&record.advanced_tests_data),
            record.ip_address,
            record.user_agent,
            record.location,
            json_column(&record.device_info),
            now,
        ],
    )?;
    Ok(())
}

pub fn get_by_id(db: &RecordDb, test_id: &str) -> anyhow::Result<Option<TestRecord>> {
    let conn = db.conn();
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM test_records WHERE test_id = ?1"),
            params![test_id],
            row_to_record,
        )
        .optional()?;
    Ok(record.flatten())
}

/// Newest-first records for one user, served by the (user_id, timestamp)
/// index.
pub fn query_by_user(db: &RecordDb, user_id: &str, limit: usize) -> anyhow::Result<Vec<TestRecord>> {
    let conn = db.conn();
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM test_records WHERE user_id = ?1 \
         ORDER BY timestamp DESC LIMIT ?2"
    ))?;
    let records = stmt
        .query_map(params![user_id, limit as i64], row_to_record)?
        .filter_map(|r| r.ok())
        .flatten()
        .collect();
    Ok(records)
}

/// Newest-first records of one test type, served by the (test_type,
/// timestamp) index.
pub fn query_by_type(
    db: &RecordDb,
    test_type: TestType,
    limit: usize,
) -> anyhow::Result<Vec<TestRecord>> {
    let conn = db.conn();
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM test_records WHERE test_type = ?1 \
         ORDER BY timestamp DESC LIMIT ?2"
    ))?;
    let records = stmt
        .query_map(params![test_type.as_str(), limit as i64], row_to_record)?
        .filter_map(|r| r.ok())
        .flatten()
        .collect();
    Ok(records)
}

/// Bounded scan with no ordering contract.
pub fn scan_recent(db: &RecordDb, limit: usize) -> anyhow::Result<Vec<TestRecord>> {
    let conn = db.conn();
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM test_records LIMIT ?1"
    ))?;
    let records = stmt
        .query_map(params![limit as i64], row_to_record)?
        .filter_map(|r| r.ok())
        .flatten()
        .collect();
    Ok(records)
}

/// Resolve a sparse filter into a bounded fetch. Ordering is newest-first
/// where the store can provide it; callers must not rely on strict ordering
/// from this path.
pub fn scan_filtered(
    db: &RecordDb,
    filter: &RecordFilter,
    limit: usize,
) -> anyhow::Result<Vec<TestRecord>> {
    let conn = db.conn();
    let (where_clause, filter_params) = filter.build_where_clause();
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM test_records{} ORDER BY timestamp DESC LIMIT ?{}",
        where_clause,
        filter_params.len() + 1
    );
    let mut stmt = conn.prepare(&sql)?;
    bind_params(&mut stmt, &filter_params)?;
    stmt.raw_bind_parameter(filter_params.len() + 1, limit as i64)?;

    let records = stmt
        .raw_query()
        .mapped(row_to_record)
        .filter_map(|r| r.ok())
        .flatten()
        .collect();
    Ok(records)
}

/// Remove one record. Returns whether a row existed; the HTTP layer treats
/// both outcomes the same.
pub fn delete(db: &RecordDb, test_id: &str) -> anyhow::Result<bool> {
    let conn = db.conn();
    let affected = conn.execute(
        "DELETE FROM test_records WHERE test_id = ?1",
        params![test_id],
    )?;
    Ok(affected > 0)
}

pub fn count(db: &RecordDb) -> anyhow::Result<i64> {
    let conn = db.conn();
    let count = conn.query_row("SELECT COUNT(*) FROM test_records", [], |row| row.get(0))?;
    Ok(count)
}
