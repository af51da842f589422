//! HTTP endpoint layer.
//!
//! Thin plumbing over the access-control core: request-shape validation,
//! caller-context assembly, and the mapping from business results to
//! transport responses. Policy lives in [`crate::access`]; nothing here
//! decides who may do what.

mod context;
mod handlers;

pub use context::context_from_headers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::access::{AccessResolver, CapabilityTokenService, ContinuationTokenStore};
use crate::config::RoleMap;
use crate::db::Database;

/// Shared application state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub capability_tokens: Arc<CapabilityTokenService>,
    pub continuations: ContinuationTokenStore,
    pub resolver: AccessResolver,
    pub role_map: Arc<RoleMap>,
    /// Ceiling on requestable capability-token expiry, enforced here.
    pub max_capability_expiry_minutes: i64,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/submissions/:submission_id/capability-tokens",
            post(handlers::issue_capability_token),
        )
        .route(
            "/api/capability-tokens/validate",
            post(handlers::validate_capability_token),
        )
        .route(
            "/api/submissions/:submission_id/continuation-tokens",
            post(handlers::issue_continuation_token),
        )
        .route(
            "/api/continuation-tokens/resolve",
            post(handlers::resolve_continuation_token),
        )
        .route("/api/forms/:form_id/access", get(handlers::get_access))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
}

/// Run the HTTP server until the process exits.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
