//! Database backend boundary.
//!
//! # Data Flow
//! ```text
//! PutDb / PatchDb / GetDb handlers
//!     → Database trait (conditional upsert, property reads)
//!     → OperationResult { status, etag }
//! ```
//!
//! # Design Decisions
//! - Optimistic concurrency lives entirely in the backend: the ETag is
//!   compared and the write applied atomically, handlers hold no locks
//! - Conflicts are results, not errors; `DbError` means the backend could
//!   not answer at all

pub mod memory;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::document::Document;

pub use memory::InMemoryDatabase;

/// Backend failures.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of one backend write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub status: StatusCode,
    pub etag: Option<String>,
}

impl OperationResult {
    pub fn new(status: StatusCode) -> Self {
        Self { status, etag: None }
    }

    pub fn with_etag(status: StatusCode, etag: impl Into<String>) -> Self {
        Self {
            status,
            etag: Some(etag.into()),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == StatusCode::CONFLICT
    }
}

/// Storage operations used by the pipeline.
pub trait Database: Send + Sync {
    /// Current properties of `db_name`, or `None` if it does not exist.
    fn get_db_props<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, Result<Option<Document>, DbError>>;

    /// Create or update the properties of `db_name`.
    ///
    /// - `etag`: version token sent by the client
    /// - `updating`: the caller saw existing properties
    /// - `patching`: merge `content` into the stored properties instead of replacing them
    /// - `check_etag`: a missing `etag` is a conflict when properties already exist
    ///
    /// A sent `etag` that does not match the stored one is always a conflict.
    fn upsert_db<'a>(
        &'a self,
        db_name: &'a str,
        content: Document,
        etag: Option<&'a str>,
        updating: bool,
        patching: bool,
        check_etag: bool,
    ) -> BoxFuture<'a, Result<OperationResult, DbError>>;
}
