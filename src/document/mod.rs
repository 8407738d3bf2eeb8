//! Canonical request content.
//!
//! # Data Flow
//! ```text
//! raw body (JSON text | multipart form)
//!     → handlers::body_injector (parse, validate)
//!     → Content::{Absent, Single, Many}
//!     → RequestContext.content
//!     → write handlers pattern-match on the variant
//! ```
//!
//! # Design Decisions
//! - A document is a JSON object; anything else never reaches `Content`
//! - Arrays are validated element by element before they become `Many`

pub mod ids;

use serde_json::{Map, Value};

pub use ids::{check_id_type, check_reserved_id, UnsupportedIdError, RESERVED_IDS};

/// A JSON object as stored by the database.
pub type Document = Map<String, Value>;

/// Name of the identifier field.
pub const ID_FIELD: &str = "_id";

/// Name of the version token field stored alongside db properties.
pub const ETAG_FIELD: &str = "_etag";

/// Parsed request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Content {
    /// No body was sent.
    #[default]
    Absent,
    /// A single JSON object.
    Single(Document),
    /// An array of JSON objects.
    Many(Vec<Document>),
}

impl Content {
    pub fn is_absent(&self) -> bool {
        matches!(self, Content::Absent)
    }

    /// Borrow the single document, if this is one.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Content::Single(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Human-readable JSON type name, used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
