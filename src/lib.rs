//! dwell-rank - per-session page dwell-time ranking
//!
//! Given the page views of one session in timestamp order, dwell-rank credits
//! each gap between consecutive views to the page being left and ranks pages
//! by total time spent, descending:
//! page views → accumulate per page → sort → `(rank, duration, page)` tuples.
//!
//! ## Modules
//!
//! - **Ranker**: the per-session core (`rank_session`, `SessionRanker`)
//! - **Schema**: input records, session grouping and declared tuple shapes
//! - **Pipeline**: drivers that invoke the ranker once per session

pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod ranker;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::RankError;
pub use pipeline::{rank_session_json, DwellProcessor};
pub use ranker::{rank_session, DwellAccumulator, SessionRanker};
pub use types::{
    OrderingPolicy, PageView, RankedPage, RankerConfig, RankingPayload, SessionViews, TieBreak,
    TimestampUnit,
};

// Schema exports
pub use schema::{ViewAdapter, ViewRecord, RECORD_VERSION};

/// Library version embedded in all ranking payloads
pub const DWELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for ranking payloads
pub const PRODUCER_NAME: &str = "dwell-rank";
