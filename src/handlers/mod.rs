//! Pipeline nodes between security and the backend.
//!
//! # Data Flow
//! ```text
//! BodyInjector (body → RequestContext.content)
//!     → DbPropsInjector (cache, then backend → RequestContext.db_props)
//!     → RequestDispatcher
//!         Db + PUT   → PutDbHandler
//!         Db + PATCH → PatchDbHandler
//!         Db + GET   → GetDbHandler
//!         otherwise  → 405
//! ```
//!
//! # Design Decisions
//! - Write handlers invalidate the cache after a successful write and
//!   before forwarding, never on conflict
//! - A conflict ends the exchange with 409 and is not forwarded

pub mod body_injector;
pub mod db_props_injector;
pub mod get_db;
pub mod patch_db;
pub mod put_db;
pub mod request_dispatcher;

use axum::http::{header, HeaderValue, StatusCode};

use crate::cache::DbPropsCache;
use crate::db::OperationResult;
use crate::document::Document;
use crate::http::exchange::Exchange;
use crate::http::response::{end_exchange_with_message, send_warnings};
use crate::metadata::RepresentationTransformer;
use crate::observability::metrics;
use crate::pipeline::RequestContext;

pub use body_injector::{BodyError, BodyInjector};
pub use db_props_injector::DbPropsInjector;
pub use get_db::GetDbHandler;
pub use patch_db::PatchDbHandler;
pub use put_db::PutDbHandler;
pub use request_dispatcher::RequestDispatcher;

/// Sent with 409 when the backend reports an ETag conflict.
pub const ETAG_CONFLICT_MESSAGE: &str = "The database's ETag must be provided using the 'If-Match' header.";

/// End the exchange with 406 unless `db_name` is usable. Returns whether it is.
pub(crate) fn check_db_name(exchange: &mut Exchange, db_name: &str) -> bool {
    if db_name.is_empty() || db_name.starts_with('_') {
        end_exchange_with_message(
            exchange,
            StatusCode::NOT_ACCEPTABLE,
            "db name cannot be empty or start with _",
        );
        return false;
    }
    true
}

/// End the exchange with 406 if `content` embeds an invalid `rts` definition.
pub(crate) fn check_metadata(exchange: &mut Exchange, content: &Document) -> bool {
    match RepresentationTransformer::from_json(content) {
        Ok(_) => true,
        Err(e) => {
            end_exchange_with_message(
                exchange,
                StatusCode::NOT_ACCEPTABLE,
                format!("wrong representation transform logic definition. {}", e),
            );
            false
        }
    }
}

/// Apply a backend write result to the exchange.
///
/// Returns `false` when the exchange was ended (conflict or other failure)
/// and must not be forwarded.
pub(crate) fn apply_write_result(
    exchange: &mut Exchange,
    context: &mut RequestContext,
    cache: &DbPropsCache,
    result: OperationResult,
) -> bool {
    metrics::record_upsert(result.status.as_u16());

    if let Some(etag) = &result.etag {
        match HeaderValue::from_str(etag) {
            Ok(value) => exchange.insert_response_header(header::ETAG, value),
            Err(_) => tracing::warn!(etag = %etag, "Backend returned an ETag that is not a valid header value"),
        }
    }

    let status = result.status;
    let conflict = result.is_conflict();
    context.db_operation_result = Some(result);

    if conflict {
        tracing::debug!(db = %context.db_name, "Write rejected on ETag conflict");
        end_exchange_with_message(exchange, StatusCode::CONFLICT, ETAG_CONFLICT_MESSAGE);
        return false;
    }

    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("request failed");
        end_exchange_with_message(exchange, status, reason);
        return false;
    }

    cache.invalidate(&context.db_name);

    if context.warnings.is_empty() {
        exchange.set_status(status);
    } else {
        send_warnings(status, exchange, context);
    }
    true
}
