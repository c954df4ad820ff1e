//! Adapter for turning collected page view records into per-session input
//!
//! This handles the grouping and ordering the batch framework normally does
//! before invoking the ranker: records are bucketed by session key and each
//! bucket is put in timestamp order.

use crate::error::RankError;
use crate::schema::record::{RawTimestamp, ViewRecord};
use crate::types::{SessionViews, TimestampUnit};
use std::collections::HashMap;

/// Adapter for parsing and grouping view records
pub struct ViewAdapter;

impl ViewAdapter {
    /// Parse a JSON string containing an array of ViewRecords
    pub fn parse_array(json: &str) -> Result<Vec<ViewRecord>, RankError> {
        let records: Vec<ViewRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing ViewRecords
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ViewRecord>, RankError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ViewRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(RankError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse tab-separated log lines.
    ///
    /// Each line is either `timestamp<TAB>page` or
    /// `session<TAB>timestamp<TAB>page`. Blank lines and lines starting with
    /// `#` are skipped.
    pub fn parse_tsv(tsv: &str) -> Result<Vec<ViewRecord>, RankError> {
        let mut records = Vec::new();
        for (line_num, line) in tsv.lines().enumerate() {
            let trimmed = line.trim_end_matches('\r');
            if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split('\t').collect();
            let (session_id, timestamp, page) = match fields.as_slice() {
                [timestamp, page] => (None, *timestamp, *page),
                [session, timestamp, page] => (Some(session.trim().to_string()), *timestamp, *page),
                _ => {
                    return Err(RankError::ParseError(format!(
                        "Failed to parse line {}: expected 2 or 3 tab-separated fields, found {}",
                        line_num + 1,
                        fields.len()
                    )));
                }
            };

            let timestamp = match timestamp.trim().parse::<i64>() {
                Ok(v) => RawTimestamp::Integer(v),
                Err(_) => RawTimestamp::Text(timestamp.trim().to_string()),
            };

            records.push(ViewRecord {
                session_id,
                timestamp,
                page: page.trim().to_string(),
            });
        }
        Ok(records)
    }

    /// Group records into sessions.
    ///
    /// Sessions come out in the order their first record was seen. Unless
    /// `presorted` is set, each session's views are stable-sorted by
    /// timestamp, so views sharing a timestamp keep their input order.
    pub fn group_sessions(
        records: &[ViewRecord],
        unit: TimestampUnit,
        presorted: bool,
    ) -> Result<Vec<SessionViews>, RankError> {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut sessions: Vec<SessionViews> = Vec::new();

        for record in records {
            let view = record.to_page_view(unit)?;
            let key = record.session_key();

            let slot = *slots.entry(key).or_insert_with(|| {
                sessions.push(SessionViews {
                    session_id: key.to_string(),
                    views: Vec::new(),
                });
                sessions.len() - 1
            });
            sessions[slot].views.push(view);
        }

        if !presorted {
            for session in &mut sessions {
                session.views.sort_by_key(|v| v.timestamp);
            }
        }

        Ok(sessions)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[ViewRecord], unit: TimestampUnit) -> Vec<RecordIssue> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                record.validate(unit).err().map(|error| RecordIssue {
                    index: idx,
                    session_id: record.session_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug)]
pub struct RecordIssue {
    pub index: usize,
    pub session_id: Option<String>,
    pub error: RankError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageView;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"
{"session_id": "s1", "timestamp": 10, "page": "A"}

{"session_id": "s1", "timestamp": "12", "page": "B"}
"#;
        let records = ViewAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].timestamp, RawTimestamp::Text("12".to_string()));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"timestamp\": 1, \"page\": \"A\"}\n{\"timestamp\": 2}\n";
        let err = ViewAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[{"timestamp": 1, "page": "A"}, {"ts": 4, "url": "B"}]"#;
        let records = ViewAdapter::parse_array(json).unwrap();
        assert_eq!(records, vec![ViewRecord::new(1, "A"), ViewRecord::new(4, "B")]);
        assert!(ViewAdapter::parse_array("{}").is_err());
    }

    #[test]
    fn test_parse_tsv() {
        let tsv = "# session\ttimestamp\tpage\nu1\t1379546662\t/home\n\n1379546670\t/cart\r\nu2\t2013-09-18T23:24:22Z\t/search\n";
        let records = ViewAdapter::parse_tsv(tsv).unwrap();
        assert_eq!(
            records,
            vec![
                ViewRecord::new(1379546662, "/home").with_session("u1"),
                ViewRecord::new(1379546670, "/cart"),
                ViewRecord::with_raw_timestamp("2013-09-18T23:24:22Z", "/search").with_session("u2"),
            ]
        );
    }

    #[test]
    fn test_parse_tsv_bad_field_count() {
        let err = ViewAdapter::parse_tsv("1\t2\t3\t4\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_group_sessions_sorts_and_keeps_first_seen_order() {
        let records = vec![
            ViewRecord::new(30, "C").with_session("s2"),
            ViewRecord::new(20, "B").with_session("s1"),
            ViewRecord::new(10, "A").with_session("s1"),
            ViewRecord::new(5, "X").with_session("s2"),
            ViewRecord::new(20, "B2").with_session("s1"),
        ];
        let sessions = ViewAdapter::group_sessions(&records, TimestampUnit::Seconds, false).unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(sessions[0].views, vec![PageView::new(5, "X"), PageView::new(30, "C")]);
        assert_eq!(sessions[1].session_id, "s1");
        assert_eq!(
            sessions[1].views,
            vec![
                PageView::new(10, "A"),
                PageView::new(20, "B"),
                PageView::new(20, "B2")
            ]
        );
    }

    #[test]
    fn test_group_sessions_presorted_keeps_input_order() {
        let records = vec![ViewRecord::new(9, "A"), ViewRecord::new(3, "B")];
        let sessions = ViewAdapter::group_sessions(&records, TimestampUnit::Seconds, true).unwrap();
        assert_eq!(sessions[0].session_id, "default");
        assert_eq!(sessions[0].views, vec![PageView::new(9, "A"), PageView::new(3, "B")]);
    }

    #[test]
    fn test_group_sessions_propagates_bad_record() {
        let records = vec![ViewRecord::new(1, "A"), ViewRecord::with_raw_timestamp("soon", "B")];
        let err = ViewAdapter::group_sessions(&records, TimestampUnit::Seconds, false).unwrap_err();
        assert!(matches!(err, RankError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_validate_records() {
        let records = vec![
            ViewRecord::new(1, "A"),
            ViewRecord::with_raw_timestamp("bogus", "B").with_session("s1"),
            ViewRecord::new(3, ""),
        ];
        let issues = ViewAdapter::validate_records(&records, TimestampUnit::Seconds);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[0].session_id.as_deref(), Some("s1"));
        assert!(matches!(issues[1].error, RankError::MissingField(_)));
    }
}
