//! Routes a request to the handler for its resource type and method.

use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::http::exchange::Exchange;
use crate::http::response::end_exchange_with_message;
use crate::pipeline::{PipedHandler, PipelineResult, RequestContext, RequestMethod, ResourceType};

pub struct RequestDispatcher {
    put_db: Arc<dyn PipedHandler>,
    patch_db: Arc<dyn PipedHandler>,
    get_db: Arc<dyn PipedHandler>,
}

impl RequestDispatcher {
    pub fn new(
        put_db: Arc<dyn PipedHandler>,
        patch_db: Arc<dyn PipedHandler>,
        get_db: Arc<dyn PipedHandler>,
    ) -> Self {
        Self {
            put_db,
            patch_db,
            get_db,
        }
    }

    fn route(&self, context: &RequestContext) -> Option<&Arc<dyn PipedHandler>> {
        match (context.resource_type, context.method) {
            // PUT on the root names an empty db, which PutDb rejects
            (ResourceType::Db | ResourceType::Root, RequestMethod::Put) => Some(&self.put_db),
            (ResourceType::Db, RequestMethod::Patch) => Some(&self.patch_db),
            (ResourceType::Db, RequestMethod::Get) => Some(&self.get_db),
            _ => None,
        }
    }
}

impl PipedHandler for RequestDispatcher {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            match self.route(context) {
                Some(handler) => handler.handle(exchange, context).await,
                None => {
                    tracing::debug!(
                        method = %exchange.method(),
                        resource = ?context.resource_type,
                        "No handler for request"
                    );
                    end_exchange_with_message(exchange, StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
                    Ok(())
                }
            }
        })
    }
}
