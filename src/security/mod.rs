//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → dispatcher.rs (No-Auth-Challenge header / noauthchallenge param?)
//!         yes → silent SecurityHandler
//!         no  → challenging SecurityHandler
//!     → handler.rs
//!         → identity.rs (Basic credentials → Account)
//!         → access.rs (role permissions on path + method)
//!     → Pass to body normalization
//! ```
//!
//! # Design Decisions
//! - The silent/challenging choice is made before any identity check; it
//!   only shapes the failure response
//! - Both variants are one type with a flag, built once
//! - Fail closed: no matching permission means deny

pub mod access;
pub mod dispatcher;
pub mod handler;
pub mod identity;

pub use access::{AccessManager, SimpleAccessManager};
pub use dispatcher::SecurityHandlerDispatcher;
pub use handler::SecurityHandler;
pub use identity::{IdentityManager, SimpleIdentityManager};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub roles: Vec<String>,
}
