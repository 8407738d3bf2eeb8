//! Resource metadata embedded in db properties.
//!
//! Metadata is stored as reserved-looking fields inside a properties document
//! and validated eagerly on write so that an unusable definition is never
//! persisted.

pub mod rts;

pub use rts::{InvalidMetadataError, Phase, RepresentationTransformer, Scope, RTS_ELEMENT_NAME};
