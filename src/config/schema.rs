//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Users, permissions and body limits.
    pub security: SecurityConfig,

    /// Read cache for db properties.
    pub cache: CacheConfig,

    /// Conditional write policy.
    pub etag_check: EtagCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// A user known to the identity manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub userid: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Grants a role the given methods below a path prefix.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermissionConfig {
    /// Role name; `$unauthenticated` applies to anonymous requests.
    pub role: String,

    /// Path prefix the permission covers.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Allowed methods; empty means all.
    #[serde(default)]
    pub methods: Vec<String>,
}

fn default_path_prefix() -> String {
    "/".to_string()
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Realm advertised in authentication challenges.
    pub realm: String,
    /// Known users.
    pub users: Vec<UserConfig>,
    /// Role permissions.
    pub permissions: Vec<PermissionConfig>,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            realm: "docgate".to_string(),
            users: Vec::new(),
            permissions: Vec::new(),
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Read cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching of db properties.
    pub enabled: bool,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 60,
        }
    }
}

/// When a client must present the current ETag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EtagPolicy {
    /// Every conditional write requires `If-Match`.
    Required,
    /// Only deletions require `If-Match`.
    RequiredForDelete,
    /// `If-Match` is checked only when sent or when `checkEtag` is given.
    Optional,
}

/// Conditional write policy per resource kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EtagCheckConfig {
    pub db: EtagPolicy,
}

impl Default for EtagCheckConfig {
    fn default() -> Self {
        Self {
            db: EtagPolicy::RequiredForDelete,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.etag_check.db, EtagPolicy::RequiredForDelete);
        assert!(config.cache.enabled);
    }

    #[test]
    fn parses_users_and_permissions() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [etag_check]
            db = "required"

            [[security.users]]
            userid = "admin"
            password = "secret"
            roles = ["admins"]

            [[security.permissions]]
            role = "admins"

            [[security.permissions]]
            role = "$unauthenticated"
            path_prefix = "/public"
            methods = ["GET"]
            "#,
        )
        .unwrap();

        assert_eq!(config.etag_check.db, EtagPolicy::Required);
        assert_eq!(config.security.users[0].roles, vec!["admins"]);
        assert_eq!(config.security.permissions[0].path_prefix, "/");
        assert!(config.security.permissions[0].methods.is_empty());
        assert_eq!(config.security.permissions[1].methods, vec!["GET"]);
    }
}
