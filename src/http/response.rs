//! Response helpers shared by pipeline handlers.
//!
//! # Responsibilities
//! - Terminate an exchange with a status and plain-text message
//! - Emit accumulated warnings on otherwise successful writes

use axum::http::StatusCode;
use serde_json::json;

use crate::http::exchange::Exchange;
use crate::pipeline::RequestContext;

pub const HAL_JSON_MEDIA_TYPE: &str = "application/hal+json";
pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const TEXT_MEDIA_TYPE: &str = "text/plain; charset=utf-8";

/// Set `status`, write `message` as the body and end the exchange.
pub fn end_exchange_with_message(exchange: &mut Exchange, status: StatusCode, message: impl Into<String>) {
    let message = message.into();
    tracing::debug!(status = status.as_u16(), message = %message, "Ending exchange");
    exchange.set_status(status);
    exchange.send(TEXT_MEDIA_TYPE, message);
    exchange.end();
}

/// Respond with the warnings collected in `context`.
///
/// A `204 No Content` result becomes `200 OK` since the warnings are sent as
/// a body; any other status is kept.
pub fn send_warnings(status: StatusCode, exchange: &mut Exchange, context: &RequestContext) {
    let status = if status == StatusCode::NO_CONTENT {
        StatusCode::OK
    } else {
        status
    };
    exchange.set_status(status);

    let path = context.request_path.trim_end_matches('/');
    let body = json!({
        "_links": { "self": { "href": if path.is_empty() { "/" } else { path } } },
        "_warnings": context.warnings,
    });
    exchange.send(HAL_JSON_MEDIA_TYPE, body.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EtagPolicy;
    use crate::pipeline::RequestContext;
    use axum::{body::Body, http::Request};

    fn fixtures(path: &str) -> (Exchange, RequestContext) {
        let request = Request::builder().method("PUT").uri(path).body(Body::empty()).unwrap();
        let exchange = Exchange::new(request);
        let context = RequestContext::from_exchange(&exchange, EtagPolicy::Optional);
        (exchange, context)
    }

    #[test]
    fn message_ends_exchange() {
        let (mut exchange, _) = fixtures("/db");
        end_exchange_with_message(&mut exchange, StatusCode::CONFLICT, "nope");
        assert!(exchange.is_ended());
        assert_eq!(exchange.status(), StatusCode::CONFLICT);
        assert_eq!(exchange.response_body().unwrap().as_ref(), b"nope");
    }

    #[test]
    fn warnings_turn_no_content_into_ok() {
        let (mut exchange, mut context) = fixtures("/db/");
        context.add_warning("Reserved field _x was filtered out from the request");
        send_warnings(StatusCode::NO_CONTENT, &mut exchange, &context);

        assert_eq!(exchange.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(exchange.response_body().unwrap()).unwrap();
        assert_eq!(body["_links"]["self"]["href"], "/db");
        assert_eq!(body["_warnings"][0], "Reserved field _x was filtered out from the request");
    }

    #[test]
    fn warnings_keep_created() {
        let (mut exchange, mut context) = fixtures("/db");
        context.add_warning("w");
        send_warnings(StatusCode::CREATED, &mut exchange, &context);
        assert_eq!(exchange.status(), StatusCode::CREATED);
    }
}
