//! Identity verification.
//!
//! # Responsibilities
//! - Extract HTTP Basic credentials from `Authorization`
//! - Verify them against the configured users
//!
//! # Design Decisions
//! - Other authorization schemes are not attempted (request is anonymous)
//! - A Basic header that cannot be decoded is a failed attempt

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;

use crate::config::UserConfig;
use crate::security::Account;

/// Username and password presented by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub userid: String,
    pub password: String,
}

/// The `Authorization` header claims Basic but cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedCredentials;

/// Read Basic credentials from the request headers.
///
/// `Ok(None)` means no Basic authentication was attempted.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<Credentials>, MalformedCredentials> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| MalformedCredentials)?;
    let Some((scheme, encoded)) = value.split_once(' ') else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return Ok(None);
    }

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| MalformedCredentials)?;
    let (userid, password) = decoded.split_once(':').ok_or(MalformedCredentials)?;

    Ok(Some(Credentials {
        userid: userid.to_string(),
        password: password.to_string(),
    }))
}

/// Verifies credentials and resolves the account they belong to.
pub trait IdentityManager: Send + Sync {
    fn verify(&self, credentials: &Credentials) -> Option<Account>;
}

/// Identity manager backed by the `[[security.users]]` table.
#[derive(Debug, Default)]
pub struct SimpleIdentityManager {
    users: HashMap<String, UserConfig>,
}

impl SimpleIdentityManager {
    pub fn new(users: &[UserConfig]) -> Self {
        Self {
            users: users.iter().map(|u| (u.userid.clone(), u.clone())).collect(),
        }
    }
}

impl IdentityManager for SimpleIdentityManager {
    fn verify(&self, credentials: &Credentials) -> Option<Account> {
        let user = self.users.get(&credentials.userid)?;
        let matches: bool = user.password.as_bytes().ct_eq(credentials.password.as_bytes()).into();
        if !matches {
            return None;
        }
        Some(Account {
            id: user.userid.clone(),
            roles: user.roles.clone(),
        })
    }
}
