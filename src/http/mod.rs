//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, entry handler)
//!     → request.rs (request ID for log correlation)
//!     → exchange.rs (request head + body, response under construction)
//!     → [pipeline runs over the exchange]
//!     → response.rs (terminal messages, warnings)
//!     → Send to client
//! ```

pub mod exchange;
pub mod request;
pub mod response;
pub mod server;

pub use exchange::Exchange;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
