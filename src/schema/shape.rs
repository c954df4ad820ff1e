//! Declared tuple shapes at the host-framework boundary
//!
//! The host declares the shape of the tuples it feeds in and expects back.
//! The output shape is fixed here; the input shape is checked against what
//! the ranker can coerce.

use crate::error::RankError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Scalar field types understood by the host framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Long,
    CharArray,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::CharArray => "chararray",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(FieldType::Int),
            "long" => Some(FieldType::Long),
            "chararray" | "string" => Some(FieldType::CharArray),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed tuple field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: Cow<'static, str>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSchema {
    pub const fn fixed(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            field_type,
        }
    }

    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            field_type,
        }
    }
}

impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.field_type)
    }
}

/// Output tuple: `(rank:int, duration:long, page:chararray)`
pub const RANKED_PAGE_SHAPE: &[FieldSchema] = &[
    FieldSchema::fixed("rank", FieldType::Int),
    FieldSchema::fixed("duration", FieldType::Long),
    FieldSchema::fixed("page", FieldType::CharArray),
];

/// Input tuple: `(timestamp:long, page:chararray)`
pub const VIEW_SHAPE: &[FieldSchema] = &[
    FieldSchema::fixed("timestamp", FieldType::Long),
    FieldSchema::fixed("page", FieldType::CharArray),
];

/// Render a shape as a tuple declaration, e.g. `(rank:int,duration:long,page:chararray)`
pub fn render_tuple(fields: &[FieldSchema]) -> String {
    let inner: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    format!("({})", inner.join(","))
}

/// Declared output of the ranker as a bag of tuples
pub fn ranked_bag_declaration() -> String {
    format!("y:bag{{t:tuple{}}}", render_tuple(RANKED_PAGE_SHAPE))
}

/// Parse `name:type,name:type`, optionally wrapped in parentheses
pub fn parse_shape(decl: &str) -> Result<Vec<FieldSchema>, RankError> {
    let trimmed = decl.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);

    if inner.trim().is_empty() {
        return Err(RankError::SchemaMismatch("empty tuple declaration".to_string()));
    }

    inner
        .split(',')
        .map(|field| {
            let (name, ty) = field.split_once(':').ok_or_else(|| {
                RankError::SchemaMismatch(format!("expected name:type, found {:?}", field.trim()))
            })?;
            let field_type = FieldType::parse(ty).ok_or_else(|| {
                RankError::SchemaMismatch(format!("unsupported field type {:?}", ty.trim()))
            })?;
            Ok(FieldSchema::new(name.trim(), field_type))
        })
        .collect()
}

/// Check that a declared input tuple can be read as `(timestamp, page)`.
///
/// The timestamp must be a long, or a chararray to be coerced; the page must
/// be a chararray. Extra trailing fields are ignored.
pub fn check_view_shape(fields: &[FieldSchema]) -> Result<(), RankError> {
    if fields.len() < 2 {
        return Err(RankError::SchemaMismatch(format!(
            "expecting a (timestamp, page) tuple, found {}",
            render_tuple(fields)
        )));
    }

    let timestamp = &fields[0];
    if !matches!(timestamp.field_type, FieldType::Long | FieldType::CharArray) {
        return Err(RankError::SchemaMismatch(format!(
            "timestamp field {} should be long or chararray",
            timestamp
        )));
    }

    let page = &fields[1];
    if page.field_type != FieldType::CharArray {
        return Err(RankError::SchemaMismatch(format!(
            "page field {} should be chararray",
            page
        )));
    }
    Ok(())
}

/// JSON Schema for a single input record
pub fn view_record_json_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": crate::schema::RECORD_VERSION,
        "description": "A single page view belonging to a session",
        "type": "object",
        "required": ["timestamp", "page"],
        "properties": {
            "session_id": { "type": "string" },
            "timestamp": {
                "oneOf": [
                    { "type": "integer" },
                    { "type": "string", "pattern": "^\\s*-?[0-9]+\\s*$" },
                    { "type": "string", "format": "date-time" }
                ]
            },
            "page": { "type": "string", "minLength": 1 }
        }
    })
}

/// JSON Schema for an encoded session ranking
pub fn ranking_payload_json_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": crate::encoder::RANKING_VERSION,
        "description": "Pages of one session ranked by dwell time, descending",
        "type": "object",
        "required": ["schema_version", "producer", "session_id", "computed_at_utc", "view_count", "pages"],
        "properties": {
            "schema_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "session_id": { "type": "string" },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "view_count": { "type": "integer", "minimum": 0 },
            "pages": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["rank", "duration", "page"],
                    "properties": {
                        "rank": { "type": "integer", "minimum": 1 },
                        "duration": { "type": "integer" },
                        "page": { "type": "string" }
                    }
                }
            }
        }
    })
}
