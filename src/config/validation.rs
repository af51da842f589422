//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use super::authz::RoleMap;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("security.signing_secret must be at least 32 characters, got {0}")]
    SigningSecretTooShort(usize),
    #[error("tokens.default_continuation_expiry_hours must be positive, got {0}")]
    InvalidContinuationExpiry(i64),
    #[error("tokens.max_capability_expiry_minutes must be positive, got {0}")]
    InvalidCapabilityExpiryCeiling(i64),
    #[error("authz: {0}")]
    InvalidRoleGrant(String),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let secret_chars = config.security.signing_secret.chars().count();
    if secret_chars < 32 {
        errors.push(ValidationError::SigningSecretTooShort(secret_chars));
    }

    if config.tokens.default_continuation_expiry_hours <= 0 {
        errors.push(ValidationError::InvalidContinuationExpiry(
            config.tokens.default_continuation_expiry_hours,
        ));
    }
    if config.tokens.max_capability_expiry_minutes <= 0 {
        errors.push(ValidationError::InvalidCapabilityExpiryCeiling(
            config.tokens.max_capability_expiry_minutes,
        ));
    }

    // Role grants must name known actions
    if let Err(e) = RoleMap::from_blocks(&config.authz.role) {
        errors.push(ValidationError::InvalidRoleGrant(e));
    }

    // Database path validation
    if let Some(ref db) = config.database {
        let db_path = Path::new(&db.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(db.path.clone()));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
