//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → read once while the pipeline is built
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the handler chain is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::GatewayConfig;
pub use schema::{CacheConfig, EtagPolicy, ListenerConfig, PermissionConfig, SecurityConfig, UserConfig};
