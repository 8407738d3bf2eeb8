//! Access policy.
//!
//! # Responsibilities
//! - Match a permission's path prefix against the request path
//! - Match a permission's methods against the request method
//! - Grant access if any role of the account holds a matching permission
//!
//! # Design Decisions
//! - Prefixes match whole path segments (`/db` covers `/db/x`, not `/dbx`)
//! - Anonymous requests carry the single role `$unauthenticated`
//! - No permission matched = deny

use axum::http::Method;

use crate::config::PermissionConfig;
use crate::security::Account;

/// Role assumed by requests without credentials.
pub const UNAUTHENTICATED_ROLE: &str = "$unauthenticated";

/// Decides whether an account may perform an action on a resource.
pub trait AccessManager: Send + Sync {
    fn is_allowed(&self, account: Option<&Account>, method: &Method, path: &str) -> bool;
}

/// A compiled permission rule.
#[derive(Debug, Clone)]
struct Permission {
    role: String,
    path_prefix: String,
    methods: Vec<Method>,
}

impl Permission {
    fn matches(&self, method: &Method, path: &str) -> bool {
        path_has_prefix(path, &self.path_prefix)
            && (self.methods.is_empty() || self.methods.contains(method))
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Access manager backed by the `[[security.permissions]]` table.
#[derive(Debug, Default)]
pub struct SimpleAccessManager {
    permissions: Vec<Permission>,
}

impl SimpleAccessManager {
    pub fn new(permissions: &[PermissionConfig]) -> Self {
        let permissions = permissions
            .iter()
            .map(|p| Permission {
                role: p.role.clone(),
                path_prefix: p.path_prefix.clone(),
                methods: p
                    .methods
                    .iter()
                    .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok())
                    .collect(),
            })
            .collect();
        Self { permissions }
    }
}

impl AccessManager for SimpleAccessManager {
    fn is_allowed(&self, account: Option<&Account>, method: &Method, path: &str) -> bool {
        let anonymous = [UNAUTHENTICATED_ROLE.to_string()];
        let roles: &[String] = match account {
            Some(account) => &account.roles,
            None => &anonymous,
        };

        self.permissions
            .iter()
            .filter(|p| roles.contains(&p.role))
            .any(|p| p.matches(method, path))
    }
}
