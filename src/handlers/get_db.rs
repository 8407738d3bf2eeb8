//! Read the properties of a db.

use axum::http::{header, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::document::ETAG_FIELD;
use crate::http::exchange::Exchange;
use crate::http::response::{end_exchange_with_message, HAL_JSON_MEDIA_TYPE};
use crate::pipeline::{forward, Next, PipedHandler, PipelineResult, RequestContext};

/// Sends the properties loaded by `DbPropsInjector`.
pub struct GetDbHandler {
    next: Next,
}

impl GetDbHandler {
    pub fn new(next: Next) -> Self {
        Self { next }
    }
}

impl PipedHandler for GetDbHandler {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let Some(props) = &context.db_props else {
                end_exchange_with_message(exchange, StatusCode::NOT_FOUND, "db does not exist");
                return Ok(());
            };

            if let Some(value) = props
                .get(ETAG_FIELD)
                .and_then(Value::as_str)
                .and_then(|etag| HeaderValue::from_str(etag).ok())
            {
                exchange.insert_response_header(header::ETAG, value);
            }

            let mut body = props.clone();
            body.insert(
                "_links".to_string(),
                json!({ "self": { "href": context.request_path } }),
            );

            exchange.set_status(StatusCode::OK);
            exchange.send(HAL_JSON_MEDIA_TYPE, Value::Object(body).to_string());

            forward(&self.next, exchange, context).await?;
            exchange.end();
            Ok(())
        })
    }
}
