//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (permissions reference known roles)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::security::access::UNAUTHENTICATED_ROLE;

const KNOWN_METHODS: [&str; 6] = ["GET", "PUT", "POST", "PATCH", "DELETE", "OPTIONS"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0 when the cache is enabled"));
    }

    let mut userids = HashSet::new();
    let mut roles: HashSet<&str> = HashSet::from([UNAUTHENTICATED_ROLE]);
    for (i, user) in config.security.users.iter().enumerate() {
        if user.userid.is_empty() {
            errors.push(ValidationError::new(format!("security.users[{}].userid", i), "must not be empty"));
        }
        if !userids.insert(user.userid.as_str()) {
            errors.push(ValidationError::new(
                format!("security.users[{}].userid", i),
                format!("duplicate user '{}'", user.userid),
            ));
        }
        roles.extend(user.roles.iter().map(String::as_str));
    }

    for (i, permission) in config.security.permissions.iter().enumerate() {
        if !roles.contains(permission.role.as_str()) {
            errors.push(ValidationError::new(
                format!("security.permissions[{}].role", i),
                format!("role '{}' is not granted to any user", permission.role),
            ));
        }
        if !permission.path_prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("security.permissions[{}].path_prefix", i),
                "must start with '/'",
            ));
        }
        for method in &permission.methods {
            if !KNOWN_METHODS.contains(&method.to_uppercase().as_str()) {
                errors.push(ValidationError::new(
                    format!("security.permissions[{}].methods", i),
                    format!("unknown method '{}'", method),
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
