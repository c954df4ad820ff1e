//! Page view input records
//!
//! Upstream log pipelines hand timestamps over in whatever shape they were
//! scraped in: JSON integers, integer strings, or RFC 3339 strings. A
//! `ViewRecord` keeps the raw form until it is resolved into a [`PageView`].

use crate::error::RankError;
use crate::types::{PageView, TimestampUnit};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Session key used for records that carry no `session_id`
pub const DEFAULT_SESSION_ID: &str = "default";

/// Input record format version
pub const RECORD_VERSION: &str = "dwell.page_view.v1";

/// Timestamp as it appeared in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    Text(String),
}

impl RawTimestamp {
    /// Resolve into an integer clock value.
    ///
    /// Integer strings are taken verbatim; RFC 3339 strings become epoch
    /// seconds or milliseconds depending on `unit`.
    pub fn resolve(&self, unit: TimestampUnit) -> Result<i64, RankError> {
        let text = match self {
            RawTimestamp::Integer(v) => return Ok(*v),
            RawTimestamp::Text(s) => s.trim(),
        };

        if text.is_empty() {
            return Err(RankError::InvalidTimestamp {
                value: text.to_string(),
                reason: "timestamp is empty".to_string(),
            });
        }

        if let Ok(v) = text.parse::<i64>() {
            return Ok(v);
        }

        match DateTime::parse_from_rfc3339(text) {
            Ok(dt) => Ok(match unit {
                TimestampUnit::Seconds => dt.timestamp(),
                TimestampUnit::Millis => dt.timestamp_millis(),
            }),
            Err(_) => Err(RankError::InvalidTimestamp {
                value: text.to_string(),
                reason: "expected an integer or an RFC 3339 timestamp".to_string(),
            }),
        }
    }
}

impl From<i64> for RawTimestamp {
    fn from(v: i64) -> Self {
        RawTimestamp::Integer(v)
    }
}

impl From<&str> for RawTimestamp {
    fn from(v: &str) -> Self {
        RawTimestamp::Text(v.to_string())
    }
}

/// A single page view as delivered by the upstream collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    /// Session key; records without one share [`DEFAULT_SESSION_ID`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(alias = "ts")]
    pub timestamp: RawTimestamp,
    #[serde(alias = "url")]
    pub page: String,
}

impl ViewRecord {
    pub fn new(timestamp: i64, page: impl Into<String>) -> Self {
        Self {
            session_id: None,
            timestamp: RawTimestamp::Integer(timestamp),
            page: page.into(),
        }
    }

    /// Record whose timestamp still needs coercion
    pub fn with_raw_timestamp(timestamp: &str, page: impl Into<String>) -> Self {
        Self {
            session_id: None,
            timestamp: RawTimestamp::from(timestamp),
            page: page.into(),
        }
    }

    /// Attach a session key
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn session_key(&self) -> &str {
        self.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID)
    }

    /// Resolve into a typed page view
    pub fn to_page_view(&self, unit: TimestampUnit) -> Result<PageView, RankError> {
        if self.page.trim().is_empty() {
            return Err(RankError::MissingField("page".to_string()));
        }
        let timestamp = self.timestamp.resolve(unit)?;
        Ok(PageView::new(timestamp, self.page.clone()))
    }

    /// Check that the record resolves without keeping the result
    pub fn validate(&self, unit: TimestampUnit) -> Result<(), RankError> {
        self.to_page_view(unit).map(|_| ())
    }
}
