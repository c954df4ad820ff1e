//! Core data types for dwell-time ranking
//!
//! These types flow through every stage: typed page views go into the ranker,
//! ranked pages come out, and the encoder wraps them in a payload.

use serde::{Deserialize, Serialize};

/// A single page view within a session.
///
/// `timestamp` is a monotonic clock value in whatever unit the caller uses
/// consistently across the session (seconds or milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub timestamp: i64,
    pub page: String,
}

impl PageView {
    pub fn new(timestamp: i64, page: impl Into<String>) -> Self {
        Self {
            timestamp,
            page: page.into(),
        }
    }
}

/// One output tuple: `(rank, duration, page)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPage {
    /// 1-based position after sorting by duration, descending
    pub rank: u32,
    /// Total dwell time accumulated for the page
    pub duration: i64,
    /// Page identifier
    pub page: String,
}

impl RankedPage {
    /// The tuple form handed back to the host framework
    pub fn as_tuple(&self) -> (u32, i64, &str) {
        (self.rank, self.duration, self.page.as_str())
    }
}

/// All page views belonging to one session, in delivery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionViews {
    pub session_id: String,
    #[serde(default)]
    pub views: Vec<PageView>,
}

/// What to do when a timestamp goes backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Keep going and credit the (negative) delta to the departed page
    #[default]
    Accept,
    /// Fail with `RankError::InvalidOrdering` at the first decrease
    Reject,
}

/// How pages with equal total duration are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Page that was departed from first comes first
    #[default]
    FirstSeen,
    /// Ascending page identifier
    PageName,
}

/// Unit used when converting RFC 3339 timestamps into integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    #[default]
    Seconds,
    Millis,
}

/// Ranker configuration.
///
/// Every field has a default, so a partial JSON document such as
/// `{"ordering": "reject"}` is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    pub ordering: OrderingPolicy,
    pub tie_break: TieBreak,
    pub timestamp_unit: TimestampUnit,
}

impl RankerConfig {
    /// Parse a config from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }
}

/// Producer metadata stamped on every payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded ranking for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingPayload {
    pub schema_version: String,
    pub producer: RankingProducer,
    pub session_id: String,
    pub computed_at_utc: String,
    /// Number of page views the ranking was computed from
    pub view_count: usize,
    pub pages: Vec<RankedPage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_defaults() {
        let config = RankerConfig::default();
        assert_eq!(config.ordering, OrderingPolicy::Accept);
        assert_eq!(config.tie_break, TieBreak::FirstSeen);
        assert_eq!(config.timestamp_unit, TimestampUnit::Seconds);
    }

    #[test]
    fn test_partial_config_json() {
        let config = RankerConfig::from_json(r#"{"ordering": "reject"}"#).unwrap();
        assert_eq!(
            config,
            RankerConfig::default().with_ordering(OrderingPolicy::Reject)
        );

        let config = RankerConfig::from_json(
            r#"{"tie_break": "page_name", "timestamp_unit": "millis"}"#,
        )
        .unwrap();
        assert_eq!(config.ordering, OrderingPolicy::Accept);
        assert_eq!(config.tie_break, TieBreak::PageName);
        assert_eq!(config.timestamp_unit, TimestampUnit::Millis);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(RankerConfig::from_json(r#"{"ordering": "sometimes"}"#).is_err());
    }

    #[test]
    fn test_ranked_page_serialization() {
        let page = RankedPage {
            rank: 1,
            duration: 80,
            page: "C".to_string(),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["rank"], 1);
        assert_eq!(json["duration"], 80);
        assert_eq!(json["page"], "C");
        assert_eq!(page.as_tuple(), (1, 80, "C"));
    }

    #[test]
    fn test_session_views_default_views() {
        let session: SessionViews = serde_json::from_str(r#"{"session_id": "s1"}"#).unwrap();
        assert!(session.views.is_empty());
    }
}
