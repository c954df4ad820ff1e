//! Session ranking pipeline
//!
//! This module provides the public API for turning page views into ranked
//! payloads. The ranker itself only ever sees one session at a time; this
//! layer is the driver that parses, groups and invokes it per session.

use crate::encoder::RankingEncoder;
use crate::error::RankError;
use crate::ranker::SessionRanker;
use crate::schema::{ViewAdapter, ViewRecord};
use crate::types::{RankedPage, RankerConfig, RankingPayload, SessionViews};
use tracing::{debug, warn};

/// Rank a single session JSON document (stateless, one-shot).
///
/// # Arguments
/// * `session_json` - `{"session_id": ..., "views": [{"timestamp": .., "page": ..}, ..]}`
///
/// # Returns
/// Ranking payload JSON string
///
/// # Example
/// ```
/// let json = r#"{"session_id": "s1", "views": [
///     {"timestamp": 0, "page": "A"},
///     {"timestamp": 3, "page": "B"}
/// ]}"#;
/// let payload = dwell_rank::rank_session_json(json.to_string()).unwrap();
/// assert!(payload.contains("\"session_id\":\"s1\""));
/// ```
pub fn rank_session_json(session_json: String) -> Result<String, RankError> {
    let session: SessionViews = serde_json::from_str(&session_json)
        .map_err(|e| RankError::ParseError(format!("Failed to parse session: {}", e)))?;

    let mut processor = DwellProcessor::new();
    let payload = processor.rank_views(&session)?;
    serde_json::to_string(&payload).map_err(|e| RankError::EncodingError(e.to_string()))
}

/// Driver that ranks sessions one by one with a fixed configuration.
///
/// Holds no per-session state between calls; the only thing it keeps is a
/// running count of sessions it has ranked.
pub struct DwellProcessor {
    ranker: SessionRanker,
    encoder: RankingEncoder,
    sessions_processed: usize,
}

impl Default for DwellProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DwellProcessor {
    /// Create a processor with the default config (accept any ordering, first-seen ties)
    pub fn new() -> Self {
        Self::with_config(RankerConfig::default())
    }

    pub fn with_config(config: RankerConfig) -> Self {
        Self {
            ranker: SessionRanker::new(config),
            encoder: RankingEncoder::new(),
            sessions_processed: 0,
        }
    }

    /// Use a specific encoder (fixed instance id)
    pub fn with_encoder(mut self, encoder: RankingEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &RankerConfig {
        self.ranker.config()
    }

    /// Rank one session that is already grouped and ordered
    pub fn rank_views(&mut self, session: &SessionViews) -> Result<RankingPayload, RankError> {
        let pages = self.ranker.rank(&session.views)?;
        self.note_ranked(&session.session_id, session.views.len(), &pages);
        Ok(self
            .encoder
            .encode(&session.session_id, session.views.len(), pages))
    }

    /// Group raw records into sessions and rank each one.
    ///
    /// Sessions are returned in the order they first appear in `records`.
    pub fn process_records(
        &mut self,
        records: &[ViewRecord],
        presorted: bool,
    ) -> Result<Vec<RankingPayload>, RankError> {
        let sessions =
            ViewAdapter::group_sessions(records, self.config().timestamp_unit, presorted)?;
        debug!(
            records = records.len(),
            sessions = sessions.len(),
            "grouped page views into sessions"
        );

        sessions
            .iter()
            .map(|session| self.rank_views(session))
            .collect()
    }

    /// Number of sessions ranked since creation or the last reset
    pub fn sessions_processed(&self) -> usize {
        self.sessions_processed
    }

    pub fn reset(&mut self) {
        self.sessions_processed = 0;
    }

    fn note_ranked(&mut self, session_id: &str, view_count: usize, pages: &[RankedPage]) {
        self.sessions_processed += 1;

        if let Some(page) = pages.iter().find(|p| p.duration < 0) {
            warn!(
                session_id,
                page = %page.page,
                duration = page.duration,
                "negative dwell time, page views are out of timestamp order"
            );
        }
        debug!(session_id, view_count, pages = pages.len(), "ranked session");
    }
}
