use crate::model::TestType;

/// Sparse filter description resolved into a concrete store fetch.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub test_type: Option<TestType>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RecordFilter {
    /// The timestamp range, if the filter specifies one. Both bounds must be
    /// present for the range to apply; a lone startDate or endDate is
    /// ignored. Date-only bounds are widened to cover the whole day so the
    /// documented inclusive range actually includes the end day.
    pub fn date_range(&self) -> Option<(String, String)> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Some((widen_start(start), widen_end(end))),
            _ => None,
        }
    }

    /// Build a WHERE clause fragment and corresponding parameter values.
    /// Returns (clause_string, params_vec) where clause_string starts with
    /// " WHERE " or is empty.
    pub fn build_where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(test_type) = self.test_type {
            params.push(test_type.as_str().to_string());
            conditions.push(format!("test_type = ?{}", params.len()));
        }
        if let Some(ref user_id) = self.user_id {
            params.push(user_id.clone());
            conditions.push(format!("user_id = ?{}", params.len()));
        }
        if let Some((start, end)) = self.date_range() {
            params.push(start);
            conditions.push(format!("timestamp >= ?{}", params.len()));
            params.push(end);
            conditions.push(format!("timestamp <= ?{}", params.len()));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

// Stored timestamps are RFC 3339 with millisecond precision and a `Z`
// suffix, so widened bounds compare lexicographically.
fn widen_start(start: &str) -> String {
    if start.len() == 10 {
        format!("{start}T00:00:00.000Z")
    } else {
        start.to_string()
    }
}

fn widen_end(end: &str) -> String {
    if end.len() == 10 {
        format!("{end}T23:59:59.999Z")
    } else {
        end.to_string()
    }
}

/// Bind string params to a statement; dynamic WHERE clauses carry a variable
/// param count, so positional `params![]` does not fit here.
pub fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[String]) -> rusqlite::Result<()> {
    for (i, param) in params.iter().enumerate() {
        stmt.raw_bind_parameter(i + 1, param)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_builds_empty_clause() {
        let filter = RecordFilter::default();
        let (clause, params) = filter.build_where_clause();
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_test_type_filter() {
        let filter = RecordFilter {
            test_type: Some(TestType::QuickTest),
            ..Default::default()
        };
        let (clause, params) = filter.build_where_clause();
        assert_eq!(clause, " WHERE test_type = ?1");
        assert_eq!(params, vec!["quickTest".to_string()]);
    }

    #[test]
    fn test_lone_start_date_is_ignored() {
        let filter = RecordFilter {
            start_date: Some("2025-01-01".to_string()),
            ..Default::default()
        };
        assert!(filter.date_range().is_none());
        let (clause, _) = filter.build_where_clause();
        assert!(clause.is_empty());
    }

    #[test]
    fn test_lone_end_date_is_ignored() {
        let filter = RecordFilter {
            end_date: Some("2025-01-31".to_string()),
            ..Default::default()
        };
        assert!(filter.date_range().is_none());
    }

    #[test]
    fn test_date_range_widens_date_only_bounds() {
        let filter = RecordFilter {
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-01-31".to_string()),
            ..Default::default()
        };
        let (start, end) = filter.date_range().unwrap();
        assert_eq!(start, "2025-01-01T00:00:00.000Z");
        assert_eq!(end, "2025-01-31T23:59:59.999Z");
    }

    #[test]
    fn test_date_range_passes_full_timestamps_through() {
        let filter = RecordFilter {
            start_date: Some("2025-01-01T06:00:00.000Z".to_string()),
            end_date: Some("2025-01-01T18:00:00.000Z".to_string()),
            ..Default::default()
        };
        let (start, end) = filter.date_range().unwrap();
        assert_eq!(start, "2025-01-01T06:00:00.000Z");
        assert_eq!(end, "2025-01-01T18:00:00.000Z");
    }

    #[test]
    fn test_range_excludes_next_month_lexicographically() {
        let filter = RecordFilter {
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-01-31".to_string()),
            ..Default::default()
        };
        let (start, end) = filter.date_range().unwrap();
        let inside = "2025-01-15T12:00:00.000Z";
        let outside = "2025-02-01T00:00:00.000Z";
        assert!(inside >= start.as_str() && inside <= end.as_str());
        assert!(outside > end.as_str());
    }

    #[test]
    fn test_combined_filter_numbers_params_in_order() {
        let filter = RecordFilter {
            test_type: Some(TestType::ManualTest),
            user_id: Some("user-1".to_string()),
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-01-31".to_string()),
        };
        let (clause, params) = filter.build_where_clause();
        assert_eq!(
            clause,
            " WHERE test_type = ?1 AND user_id = ?2 AND timestamp >= ?3 AND timestamp <= ?4"
        );
        assert_eq!(params.len(), 4);
    }
}
