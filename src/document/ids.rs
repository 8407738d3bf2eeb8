//! Document identifier rules.
//!
//! Identifiers end up as URL path segments (`/db/coll/<id>`), so only types
//! that survive that round trip are accepted. Strings that spell one of the
//! collection-level addressing tokens are detectable via `check_reserved_id`.

use serde_json::Value;
use thiserror::Error;

use super::{json_type_name, Content, Document, ID_FIELD};

/// Tokens that address special keys at the collection level.
pub const RESERVED_IDS: [&str; 5] = ["_MinKey", "_MaxKey", "_null", "_true", "_false"];

/// The `_id` of a document has a type that cannot be addressed by URL.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("the type of _id in content body is not supported: {type_name}")]
pub struct UnsupportedIdError {
    pub type_name: String,
}

/// Check that the `_id` of `doc`, if any, has an addressable type.
///
/// Strings, numbers, booleans and null are accepted, as are the extended JSON
/// forms `{"$oid": "<24 hex>"}` and `{"$date": <millis>}`.
pub fn check_id_type(doc: &Document) -> Result<(), UnsupportedIdError> {
    let Some(id) = doc.get(ID_FIELD) else {
        return Ok(());
    };

    let supported = match id {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
        Value::Object(obj) if obj.len() == 1 => match (obj.get("$oid"), obj.get("$date")) {
            (Some(Value::String(oid)), _) => is_object_id(oid),
            (_, Some(Value::Number(_))) => true,
            _ => false,
        },
        _ => false,
    };

    if supported {
        Ok(())
    } else {
        Err(UnsupportedIdError {
            type_name: json_type_name(id).to_string(),
        })
    }
}

fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Return the first string `_id` in `content` that equals a reserved token
/// (case-insensitively), or `None` when there is no collision.
pub fn check_reserved_id(content: &Content) -> Option<&str> {
    match content {
        Content::Absent => None,
        Content::Single(doc) => reserved_id_of(doc),
        Content::Many(docs) => docs.iter().find_map(reserved_id_of),
    }
}

fn reserved_id_of(doc: &Document) -> Option<&str> {
    let id = doc.get(ID_FIELD)?.as_str()?;
    RESERVED_IDS
        .iter()
        .any(|token| token.eq_ignore_ascii_case(id))
        .then_some(id)
}
