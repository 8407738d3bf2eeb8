//! Read cache subsystem.
//!
//! # Data Flow
//! ```text
//! DbPropsInjector / GetDb
//!     → db_props.rs get (hit → use cached properties)
//!     → miss → Database::get_db_props → put
//!
//! PutDb / PatchDb (successful write only)
//!     → invalidate(db name) before forwarding downstream
//! ```
//!
//! # Design Decisions
//! - One process-wide instance, passed to handlers as a cloned handle
//! - Only existing dbs are cached; absence always goes to the backend
//! - Entries expire after a TTL as a bound on staleness from other writers

pub mod db_props;

pub use db_props::DbPropsCache;
