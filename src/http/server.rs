//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with one catch-all entry handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Build the handler chain once and share it across requests
//! - Turn each request into an `Exchange` and run the chain
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::DbPropsCache;
use crate::config::{EtagPolicy, GatewayConfig};
use crate::db::Database;
use crate::http::exchange::Exchange;
use crate::http::request::{request_id, request_id_header};
use crate::http::response::end_exchange_with_message;
use crate::observability::metrics;
use crate::pipeline::{build_pipeline, PipedHandler, PipelineDeps, RequestContext};
use crate::security::{SimpleAccessManager, SimpleIdentityManager};

/// Application state injected into the entry handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<dyn PipedHandler>,
    pub etag_policy: EtagPolicy,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    cache: DbPropsCache,
}

impl HttpServer {
    /// Create a server backed by `database`.
    pub fn new(config: GatewayConfig, database: Arc<dyn Database>) -> Self {
        let cache = DbPropsCache::new(&config.cache);
        let deps = PipelineDeps {
            database,
            cache: cache.clone(),
            identity_manager: Arc::new(SimpleIdentityManager::new(&config.security.users)),
            access_manager: Arc::new(SimpleAccessManager::new(&config.security.permissions)),
        };

        let state = AppState {
            pipeline: build_pipeline(&config, deps),
            etag_policy: config.etag_check.db,
        };

        let router = Self::build_router(&config, state);
        Self { router, config, cache }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(pipeline_handler))
            .route("/", any(pipeline_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuid))
    }

    /// A handle on the router, for serving or in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn cache(&self) -> &DbPropsCache {
        &self.cache
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            etag_policy = ?self.config.etag_check.db,
            cache_enabled = self.config.cache.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Entry handler: runs the pipeline over one request.
async fn pipeline_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();

    let mut exchange = Exchange::new(request);
    let mut context = RequestContext::from_exchange(&exchange, state.etag_policy);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %context.request_path,
        resource = ?context.resource_type,
        "Dispatching request"
    );

    if let Err(e) = state.pipeline.handle(&mut exchange, &mut context).await {
        tracing::error!(request_id = %request_id, error = %e, "Pipeline failed");
        end_exchange_with_message(
            &mut exchange,
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error",
        );
    }
    exchange.end();

    metrics::record_request(&method, exchange.status().as_u16(), start);
    exchange.into_response()
}
