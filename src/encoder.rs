//! Ranking encoding
//!
//! Wraps a session's ranked pages in a payload carrying producer metadata,
//! and renders the bag notation the batch job printed for ad-hoc inspection.

use crate::error::RankError;
use crate::types::{RankedPage, RankingPayload, RankingProducer};
use crate::{DWELL_VERSION, PRODUCER_NAME};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Current ranking payload schema version
pub const RANKING_VERSION: &str = "dwell.session_ranking.v1";

/// Encoder for producing ranking payloads
pub struct RankingEncoder {
    instance_id: String,
}

impl Default for RankingEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode one session's ranking
    pub fn encode(&self, session_id: &str, view_count: usize, pages: Vec<RankedPage>) -> RankingPayload {
        RankingPayload {
            schema_version: RANKING_VERSION.to_string(),
            producer: RankingProducer {
                name: PRODUCER_NAME.to_string(),
                version: DWELL_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            session_id: session_id.to_string(),
            computed_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            view_count,
            pages,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        session_id: &str,
        view_count: usize,
        pages: Vec<RankedPage>,
    ) -> Result<String, RankError> {
        let payload = self.encode(session_id, view_count, pages);
        serde_json::to_string(&payload).map_err(|e| RankError::EncodingError(e.to_string()))
    }
}

/// Render ranked pages as a bag of tuples: `{(1,80,C),(2,48,A)}`
pub fn to_bag_notation(pages: &[RankedPage]) -> String {
    let tuples: Vec<String> = pages
        .iter()
        .map(|p| format!("({},{},{})", p.rank, p.duration, p.page))
        .collect();
    format!("{{{}}}", tuples.join(","))
}
