//! Page view input schema and declared tuple shapes
//!
//! Input records are parsed and grouped into sessions here; the tuple shapes
//! exchanged with the host framework are declared in `shape`.

mod adapter;
mod record;
pub mod shape;

pub use adapter::*;
pub use record::*;
