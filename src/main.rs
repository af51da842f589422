//! formsd - Multi-tenant forms platform backend.
//!
//! Serves the submission access-control API: signed capability tokens,
//! database-resident continuation tokens, and per-request permission
//! resolution over forms and submissions.

mod access;
mod api;
mod config;
mod db;
mod error;
mod metrics;

use std::sync::Arc;

use crate::access::{AccessResolver, CapabilityTokenService, ContinuationTokenStore, SigningKey};
use crate::api::AppState;
use crate::config::{Config, RoleMap};
use crate::db::Database;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        "Starting formsd"
    );

    // SECURITY: Refuse to start with a default/weak signing secret.
    // Capability tokens signed under a predictable key are forgeable.
    if config::is_default_secret(&config.security.signing_secret) {
        // Check for explicit override via environment variable (for testing/dev only)
        if std::env::var("FORMSD_ALLOW_INSECURE_SIGNING").is_ok() {
            tracing::warn!(
                "INSECURE: Running with weak signing_secret (allowed via FORMSD_ALLOW_INSECURE_SIGNING)"
            );
        } else {
            error!("FATAL: Insecure signing_secret detected!");
            error!("  The signing_secret authenticates every capability token this server issues.");
            error!("  A weak or default secret makes those tokens forgeable.");
            error!("");
            error!("  To fix, set a strong secret in config.toml:");
            error!("    [security]");
            error!("    signing_secret = \"<random-32+-char-string>\"");
            error!("");
            error!("  Generate a secure secret with:");
            error!("    openssl rand -hex 32");
            error!("");
            error!("  For testing only, set FORMSD_ALLOW_INSECURE_SIGNING=1 to bypass this check.");
            return Err(anyhow::anyhow!(
                "Refusing to start with insecure signing_secret. See error messages above."
            ));
        }
    }

    // Initialize database
    let db_path = config
        .database
        .as_ref()
        .map(|d| d.path.as_str())
        .unwrap_or("formsd.db");
    let db = Database::new(db_path).await?;

    // Register metrics before the first request can arrive
    metrics::init_metrics();

    // Wire the access-control core
    let role_map = RoleMap::from_blocks(&config.authz.role)
        .map_err(|e| anyhow::anyhow!("authz configuration rejected: {e}"))?;
    let capability_tokens = Arc::new(CapabilityTokenService::new(SigningKey::new(
        config.security.signing_secret.clone(),
    )));
    let continuations = ContinuationTokenStore::new(
        db.clone(),
        config.tokens.default_continuation_expiry_hours,
    );
    let resolver = AccessResolver::new(db.clone(), continuations.clone());

    let state = AppState {
        db,
        capability_tokens,
        continuations,
        resolver,
        role_map: Arc::new(role_map),
        max_capability_expiry_minutes: config.tokens.max_capability_expiry_minutes,
    };

    api::serve(state, config.listen.address).await
}
