//! Request handlers for the access-control API.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::context::context_from_headers;
use crate::access::{AccessRequest, ContinuationError};
use crate::error::ApiError;
use crate::metrics;

// ============================================================================
// Capability tokens
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IssueCapabilityTokenRequest {
    pub expiry_minutes: i64,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CapabilityTokenResponse {
    pub token: String,
    pub expires_at: String,
    pub permissions: Vec<&'static str>,
}

/// POST /api/submissions/{id}/capability-tokens
///
/// Request-shape bounds are enforced here so the token service's
/// structural preconditions hold for every call that reaches it.
pub async fn issue_capability_token(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    Json(body): Json<IssueCapabilityTokenRequest>,
) -> Result<Json<CapabilityTokenResponse>, ApiError> {
    if submission_id <= 0 {
        return Err(ApiError::bad_request("submission id must be positive"));
    }
    if body.expiry_minutes <= 0 {
        return Err(ApiError::bad_request("expiry_minutes must be positive"));
    }
    if body.expiry_minutes > state.max_capability_expiry_minutes {
        return Err(ApiError::bad_request(format!(
            "expiry_minutes must not exceed {}",
            state.max_capability_expiry_minutes
        )));
    }
    if body.permissions.is_empty() {
        return Err(ApiError::bad_request("permissions must not be empty"));
    }

    let issued =
        state
            .capability_tokens
            .generate(submission_id, body.expiry_minutes, &body.permissions)?;
    metrics::record_capability_issued();

    Ok(Json(CapabilityTokenResponse {
        token: issued.token,
        expires_at: issued.expires_at.to_rfc3339(),
        permissions: issued.permissions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateCapabilityTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CapabilityClaimsResponse {
    pub submission_id: i64,
    pub permissions: Vec<&'static str>,
    pub expires_at: String,
}

/// POST /api/capability-tokens/validate
pub async fn validate_capability_token(
    State(state): State<AppState>,
    Json(body): Json<ValidateCapabilityTokenRequest>,
) -> Result<Json<CapabilityClaimsResponse>, ApiError> {
    if body.token.is_empty() {
        return Err(ApiError::bad_request("token must not be empty"));
    }

    match state.capability_tokens.validate(&body.token) {
        Ok(claims) => {
            metrics::record_capability_validation("ok");
            Ok(Json(CapabilityClaimsResponse {
                submission_id: claims.submission_id,
                permissions: claims.permissions,
                expires_at: claims.expires_at.to_rfc3339(),
            }))
        }
        Err(e) => {
            metrics::record_capability_validation(e.error_code());
            Err(e.into())
        }
    }
}

// ============================================================================
// Continuation tokens
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ContinuationTokenResponse {
    pub token: String,
}

/// POST /api/submissions/{id}/continuation-tokens
pub async fn issue_continuation_token(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
) -> Result<Json<ContinuationTokenResponse>, ApiError> {
    if submission_id <= 0 {
        return Err(ApiError::bad_request("submission id must be positive"));
    }

    let token = state.continuations.issue(submission_id).await?;
    metrics::record_continuation_issued();
    Ok(Json(ContinuationTokenResponse { token }))
}

#[derive(Debug, Deserialize)]
pub struct ResolveContinuationTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ResolvedSubmissionResponse {
    pub submission_id: i64,
}

/// POST /api/continuation-tokens/resolve
pub async fn resolve_continuation_token(
    State(state): State<AppState>,
    Json(body): Json<ResolveContinuationTokenRequest>,
) -> Result<Json<ResolvedSubmissionResponse>, ApiError> {
    if body.token.is_empty() {
        return Err(ApiError::bad_request("token must not be empty"));
    }

    match state.continuations.resolve(&body.token).await {
        Ok(submission_id) => {
            metrics::record_continuation_resolution("ok");
            Ok(Json(ResolvedSubmissionResponse { submission_id }))
        }
        Err(e) => {
            if !matches!(e, ContinuationError::Db(_)) {
                metrics::record_continuation_resolution(e.error_code());
            }
            Err(e.into())
        }
    }
}

// ============================================================================
// Access resolution
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub submission_id: Option<i64>,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessDecisionResponse {
    pub form_id: i64,
    pub submission_id: Option<i64>,
    pub form_permissions: Vec<&'static str>,
    pub submission_permissions: Vec<&'static str>,
}

/// GET /api/forms/{form_id}/access
pub async fn get_access(
    State(state): State<AppState>,
    Path(form_id): Path<i64>,
    Query(query): Query<AccessQuery>,
    headers: HeaderMap,
) -> Result<Json<AccessDecisionResponse>, ApiError> {
    if form_id <= 0 {
        return Err(ApiError::bad_request("form id must be positive"));
    }
    if matches!(query.submission_id, Some(id) if id <= 0) {
        return Err(ApiError::bad_request("submission id must be positive"));
    }

    let ctx = context_from_headers(&headers, &state.role_map)?;
    let request = AccessRequest {
        form_id,
        submission_id: query.submission_id,
        continuation_token: query.continuation_token,
    };

    match state.resolver.resolve(&ctx, &request).await {
        Ok(decision) => {
            metrics::record_access_decision("resolved");
            Ok(Json(AccessDecisionResponse {
                form_id: decision.form_id,
                submission_id: decision.submission_id,
                form_permissions: decision.form_permissions.names(),
                submission_permissions: decision.submission_permissions.names(),
            }))
        }
        Err(e) => {
            metrics::record_access_decision(e.error_code());
            Err(e.into())
        }
    }
}

// ============================================================================
// Operational endpoints
// ============================================================================

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

/// GET /metrics - Prometheus text format.
pub async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
