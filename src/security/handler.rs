//! Authentication and authorization node.

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;

use crate::http::exchange::Exchange;
use crate::http::response::end_exchange_with_message;
use crate::pipeline::{forward, Next, PipedHandler, PipelineResult, RequestContext};
use crate::security::access::AccessManager;
use crate::security::identity::{basic_credentials, IdentityManager};

/// Authenticates the caller, checks the access policy and forwards.
///
/// With `challenging` set, every 401 carries a `WWW-Authenticate` header so
/// interactive clients prompt for credentials; otherwise 401s are silent.
pub struct SecurityHandler {
    next: Next,
    identity_manager: Arc<dyn IdentityManager>,
    access_manager: Arc<dyn AccessManager>,
    challenging: bool,
    challenge: HeaderValue,
}

impl SecurityHandler {
    pub fn new(
        next: Next,
        identity_manager: Arc<dyn IdentityManager>,
        access_manager: Arc<dyn AccessManager>,
        challenging: bool,
        realm: &str,
    ) -> Self {
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        Self {
            next,
            identity_manager,
            access_manager,
            challenging,
            challenge,
        }
    }

    pub fn is_challenging(&self) -> bool {
        self.challenging
    }

    fn unauthorized(&self, exchange: &mut Exchange) {
        if self.challenging {
            exchange.insert_response_header(header::WWW_AUTHENTICATE, self.challenge.clone());
        }
        end_exchange_with_message(exchange, StatusCode::UNAUTHORIZED, "Unauthorized");
    }
}

impl PipedHandler for SecurityHandler {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let account = match basic_credentials(exchange.request_headers()) {
                Err(_) => {
                    tracing::debug!("Malformed Basic credentials");
                    self.unauthorized(exchange);
                    return Ok(());
                }
                Ok(None) => None,
                Ok(Some(credentials)) => match self.identity_manager.verify(&credentials) {
                    Some(account) => Some(account),
                    None => {
                        tracing::warn!(userid = %credentials.userid, "Authentication failed");
                        self.unauthorized(exchange);
                        return Ok(());
                    }
                },
            };

            if !self
                .access_manager
                .is_allowed(account.as_ref(), exchange.method(), &context.request_path)
            {
                match &account {
                    None => self.unauthorized(exchange),
                    Some(account) => {
                        tracing::debug!(account = %account.id, path = %context.request_path, "Access denied");
                        end_exchange_with_message(exchange, StatusCode::FORBIDDEN, "Forbidden");
                    }
                }
                return Ok(());
            }

            context.account = account;
            forward(&self.next, exchange, context).await
        })
    }
}
