//! Entry node choosing between silent and challenging authentication.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::exchange::Exchange;
use crate::pipeline::{Next, PipedHandler, PipelineResult, RequestContext};
use crate::security::access::AccessManager;
use crate::security::handler::SecurityHandler;
use crate::security::identity::IdentityManager;

/// Request header asking for silent authentication failures.
pub const SILENT_HEADER_KEY: &str = "No-Auth-Challenge";

/// Query parameter asking for silent authentication failures.
pub const SILENT_QUERY_PARAM_KEY: &str = "noauthchallenge";

/// Routes each request to one of two `SecurityHandler`s that share the same
/// collaborators and successor and differ only in whether they challenge.
pub struct SecurityHandlerDispatcher {
    silent: SecurityHandler,
    challenging: SecurityHandler,
}

impl SecurityHandlerDispatcher {
    pub fn new(
        next: Next,
        identity_manager: Arc<dyn IdentityManager>,
        access_manager: Arc<dyn AccessManager>,
        realm: &str,
    ) -> Self {
        Self {
            silent: SecurityHandler::new(
                next.clone(),
                Arc::clone(&identity_manager),
                Arc::clone(&access_manager),
                false,
                realm,
            ),
            challenging: SecurityHandler::new(next, identity_manager, access_manager, true, realm),
        }
    }

    /// The variant that will handle `exchange`.
    pub fn select(&self, exchange: &Exchange) -> &SecurityHandler {
        if exchange.request_headers().contains_key(SILENT_HEADER_KEY)
            || exchange.has_query_param(SILENT_QUERY_PARAM_KEY)
        {
            &self.silent
        } else {
            &self.challenging
        }
    }
}

impl PipedHandler for SecurityHandlerDispatcher {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        let handler = self.select(exchange);
        handler.handle(exchange, context)
    }
}
