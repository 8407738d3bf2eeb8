//! Builds the handler chain once at startup.

use std::sync::Arc;

use crate::cache::DbPropsCache;
use crate::config::GatewayConfig;
use crate::db::Database;
use crate::handlers::{BodyInjector, DbPropsInjector, GetDbHandler, PatchDbHandler, PutDbHandler, RequestDispatcher};
use crate::pipeline::PipedHandler;
use crate::security::{AccessManager, IdentityManager, SecurityHandlerDispatcher};

/// Collaborators shared by the pipeline nodes.
#[derive(Clone)]
pub struct PipelineDeps {
    pub database: Arc<dyn Database>,
    pub cache: DbPropsCache,
    pub identity_manager: Arc<dyn IdentityManager>,
    pub access_manager: Arc<dyn AccessManager>,
}

/// Wire the chain back to front and return its entry node.
pub fn build_pipeline(config: &GatewayConfig, deps: PipelineDeps) -> Arc<dyn PipedHandler> {
    let put_db: Arc<dyn PipedHandler> = Arc::new(PutDbHandler::new(
        None,
        Arc::clone(&deps.database),
        deps.cache.clone(),
    ));
    let patch_db: Arc<dyn PipedHandler> = Arc::new(PatchDbHandler::new(
        None,
        Arc::clone(&deps.database),
        deps.cache.clone(),
    ));
    let get_db: Arc<dyn PipedHandler> = Arc::new(GetDbHandler::new(None));

    let dispatcher: Arc<dyn PipedHandler> = Arc::new(RequestDispatcher::new(put_db, patch_db, get_db));
    let props: Arc<dyn PipedHandler> = Arc::new(DbPropsInjector::new(
        Some(dispatcher),
        Arc::clone(&deps.database),
        deps.cache.clone(),
    ));
    let body: Arc<dyn PipedHandler> = Arc::new(BodyInjector::new(Some(props), config.security.max_body_size));

    Arc::new(SecurityHandlerDispatcher::new(
        Some(body),
        deps.identity_manager,
        deps.access_manager,
        &config.security.realm,
    ))
}
