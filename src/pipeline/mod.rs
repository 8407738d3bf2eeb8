//! Request-processing pipeline.
//!
//! # Data Flow
//! ```text
//! axum entry handler
//!     → Exchange + RequestContext created per request
//!     → SecurityHandlerDispatcher (silent | challenging auth)
//!     → BodyInjector (normalize body into Content)
//!     → DbPropsInjector (current properties via read cache)
//!     → RequestDispatcher → PutDb / PatchDb / GetDb
//!     → Exchange converted into the HTTP response
//! ```
//!
//! # Design Decisions
//! - The chain is an object graph of `Arc<dyn PipedHandler>` built once at
//!   startup; only the exchange and context are allocated per request
//! - A node that ends the exchange does not call its successor
//! - Client input errors end the exchange in place; `PipelineError` is for
//!   collaborator failures the node cannot answer itself

pub mod chain;
pub mod context;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::db::DbError;
use crate::http::exchange::Exchange;

pub use chain::{build_pipeline, PipelineDeps};
pub use context::{RequestContext, RequestMethod, ResourceType, UploadedFile};

/// Failure that prevents a node from producing any response of its own.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult = Result<(), PipelineError>;

/// A unit of request processing.
pub trait PipedHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult>;
}

/// Optional successor reference held by each node.
pub type Next = Option<Arc<dyn PipedHandler>>;

/// Hand the request to `next`, if there is one.
pub async fn forward(next: &Next, exchange: &mut Exchange, context: &mut RequestContext) -> PipelineResult {
    match next {
        Some(handler) => handler.handle(exchange, context).await,
        None => Ok(()),
    }
}
