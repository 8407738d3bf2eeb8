//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Report every validation error before exiting
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No config file means built-in defaults, which still get validated

use std::path::Path;

use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::GatewayConfig;

/// Load the config at `path` (or the defaults) and validate it.
///
/// Runs before logging is initialized, since the log level is configured.
pub fn load_startup_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = GatewayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(load_startup_config(None).is_ok());
    }

    #[test]
    fn invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts]\nrequest_secs = 0").unwrap();
        let err = load_startup_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
