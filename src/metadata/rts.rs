//! Representation transform logic (`rts`) definitions.
//!
//! ```json
//! { "rts": [ { "name": "filterOwner", "phase": "RESPONSE", "scope": "CHILDREN", "args": {} } ] }
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

/// Field holding the transformer definitions.
pub const RTS_ELEMENT_NAME: &str = "rts";

/// A structurally invalid metadata definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidMetadataError {
    #[error("element 'rts' is not an array")]
    NotAnArray,

    #[error("element {index} of 'rts' is not an object")]
    NotAnObject { index: usize },

    #[error("element {index} of 'rts': '{field}' is missing or not a string")]
    MissingField { index: usize, field: &'static str },

    #[error("element {index} of 'rts': invalid {field} '{value}', must be one of {allowed}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        value: String,
        allowed: &'static str,
    },
}

/// When the transformer is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Request,
    Response,
}

/// Which resources the transformer applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    This,
    Children,
}

/// One validated transformer definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationTransformer {
    pub name: String,
    pub phase: Phase,
    pub scope: Scope,
    pub args: Option<Value>,
}

impl RepresentationTransformer {
    /// Parse every definition found in `props`.
    ///
    /// Returns an empty list when `props` carries no `rts` element.
    pub fn from_json(props: &Document) -> Result<Vec<Self>, InvalidMetadataError> {
        let Some(element) = props.get(RTS_ELEMENT_NAME) else {
            return Ok(Vec::new());
        };

        let Value::Array(items) = element else {
            return Err(InvalidMetadataError::NotAnArray);
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| Self::parse_one(index, item))
            .collect()
    }

    fn parse_one(index: usize, item: &Value) -> Result<Self, InvalidMetadataError> {
        let obj = item
            .as_object()
            .ok_or(InvalidMetadataError::NotAnObject { index })?;

        let name = string_field(obj, index, "name")?;

        let phase = match string_field(obj, index, "phase")? {
            "REQUEST" => Phase::Request,
            "RESPONSE" => Phase::Response,
            other => {
                return Err(InvalidMetadataError::InvalidValue {
                    index,
                    field: "phase",
                    value: other.to_string(),
                    allowed: "REQUEST, RESPONSE",
                })
            }
        };

        let scope = match string_field(obj, index, "scope")? {
            "THIS" => Scope::This,
            "CHILDREN" => Scope::Children,
            other => {
                return Err(InvalidMetadataError::InvalidValue {
                    index,
                    field: "scope",
                    value: other.to_string(),
                    allowed: "THIS, CHILDREN",
                })
            }
        };

        Ok(Self {
            name: name.to_string(),
            phase,
            scope,
            args: obj.get("args").cloned(),
        })
    }
}

fn string_field<'a>(
    obj: &'a Document,
    index: usize,
    field: &'static str,
) -> Result<&'a str, InvalidMetadataError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or(InvalidMetadataError::MissingField { index, field })
}
