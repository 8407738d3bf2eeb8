//! docgate: HTTP gateway exposing database resources over REST

pub mod cache;
pub mod config;
pub mod db;
pub mod document;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod metadata;
pub mod observability;
pub mod pipeline;
pub mod security;

#[cfg(test)]
mod testing;

pub use config::schema::GatewayConfig;
pub use db::{Database, InMemoryDatabase};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
