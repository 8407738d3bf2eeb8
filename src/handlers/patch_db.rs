//! Merge into the properties of an existing db.

use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::cache::DbPropsCache;
use crate::db::Database;
use crate::document::Content;
use crate::handlers::{apply_write_result, check_db_name, check_metadata};
use crate::http::exchange::Exchange;
use crate::http::response::end_exchange_with_message;
use crate::pipeline::{forward, Next, PipedHandler, PipelineResult, RequestContext};

pub struct PatchDbHandler {
    next: Next,
    database: Arc<dyn Database>,
    cache: DbPropsCache,
}

impl PatchDbHandler {
    pub fn new(next: Next, database: Arc<dyn Database>, cache: DbPropsCache) -> Self {
        Self { next, database, cache }
    }
}

impl PipedHandler for PatchDbHandler {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            if !check_db_name(exchange, &context.db_name) {
                return Ok(());
            }

            let content = match &context.content {
                Content::Absent => {
                    end_exchange_with_message(exchange, StatusCode::NOT_ACCEPTABLE, "no data provided");
                    return Ok(());
                }
                Content::Single(doc) => doc.clone(),
                Content::Many(_) => {
                    end_exchange_with_message(exchange, StatusCode::NOT_ACCEPTABLE, "data cannot be an array");
                    return Ok(());
                }
            };

            if !check_metadata(exchange, &content) {
                return Ok(());
            }

            let result = self
                .database
                .upsert_db(
                    &context.db_name,
                    content,
                    context.etag.as_deref(),
                    context.db_props.is_some(),
                    true,
                    context.etag_check_required,
                )
                .await?;

            if !apply_write_result(exchange, context, &self.cache, result) {
                return Ok(());
            }

            forward(&self.next, exchange, context).await?;
            exchange.end();
            Ok(())
        })
    }
}
