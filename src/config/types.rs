//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::authz::RoleBlock;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// HTTP listen configuration.
    pub listen: ListenConfig,
    /// Database configuration.
    pub database: Option<DatabaseConfig>,
    /// Token signing and secret handling.
    pub security: SecurityConfig,
    /// Token lifetime policy defaults.
    #[serde(default)]
    pub tokens: TokensConfig,
    /// Role-based authorization grants.
    #[serde(default)]
    pub authz: AuthzConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name (e.g., "forms.acme.example").
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// HTTP listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address for the API listener (e.g., "127.0.0.1:8080").
    pub address: SocketAddr,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    pub path: String,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret for capability-token signing. At least 32 characters;
    /// the server refuses to boot with a default or undersized value.
    pub signing_secret: String,
}

/// Check if a signing secret is an insecure placeholder.
///
/// Returns `true` if the secret appears to be a default that should be
/// changed before the server signs anything with it.
pub fn is_default_secret(secret: &str) -> bool {
    secret.is_empty()
        || secret == "changeme"
        || secret.contains("default")
        || secret.contains("changeme")
        || secret.len() < 32
}

/// Token lifetime policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
    /// Continuation-token lifetime (hours) for tenants without an override.
    #[serde(default = "default_continuation_expiry_hours")]
    pub default_continuation_expiry_hours: i64,

    /// Upper bound on requestable capability-token expiry, in minutes.
    /// Enforced by the endpoint validator before the token service is
    /// called.
    #[serde(default = "default_max_capability_expiry_minutes")]
    pub max_capability_expiry_minutes: i64,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            default_continuation_expiry_hours: default_continuation_expiry_hours(),
            max_capability_expiry_minutes: default_max_capability_expiry_minutes(),
        }
    }
}

fn default_continuation_expiry_hours() -> i64 {
    24
}

fn default_max_capability_expiry_minutes() -> i64 {
    // One week
    10_080
}

/// Role-based authorization configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfig {
    /// Role blocks mapping a role name to granted actions.
    #[serde(default)]
    pub role: Vec<RoleBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "forms.test"

            [listen]
            address = "127.0.0.1:8080"

            [security]
            signing_secret = "0123456789abcdef0123456789abcdef"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.name, "forms.test");
        assert_eq!(config.tokens.default_continuation_expiry_hours, 24);
        assert_eq!(config.tokens.max_capability_expiry_minutes, 10_080);
        assert!(config.authz.role.is_empty());
        assert!(config.database.is_none());
    }

    #[test]
    fn parses_role_blocks() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "forms.test"

            [listen]
            address = "127.0.0.1:8080"

            [security]
            signing_secret = "0123456789abcdef0123456789abcdef"

            [[authz.role]]
            name = "reviewer"
            grants = ["submission.view", "submission.edit"]
            "#,
        )
        .unwrap();

        assert_eq!(config.authz.role.len(), 1);
        assert_eq!(config.authz.role[0].name, "reviewer");
    }

    #[test]
    fn default_secret_detection() {
        assert!(is_default_secret(""));
        assert!(is_default_secret("changeme"));
        assert!(is_default_secret("my-default-secret-0123456789abcdef"));
        assert!(is_default_secret("short"));
        assert!(!is_default_secret("fA9!kL2#pQ8$wE5%rT1&yU7*iO3(zX6)"));
    }
}
