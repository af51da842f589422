//! Unified error handling for formsd.
//!
//! The core keeps two deliberately distinct error tiers:
//!
//! - Structural caller mistakes (non-positive ids, empty token strings,
//!   undersized signing secrets) panic at the call site; the endpoint
//!   validator rejects malformed requests before they can reach one.
//! - Business outcomes travel as `Result` values. This module maps them to
//!   transport-level responses and metric labels; nothing here is fatal to
//!   the process, and the core never retries.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::access::{AccessError, ContinuationError, TokenError};
use crate::db::DbError;

/// Transport-facing error: a status, a stable code, and a message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: "Internal server error.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            // Generic on purpose: which check failed is not disclosed
            TokenError::Invalid => Self {
                status: StatusCode::BAD_REQUEST,
                code: "invalid_token",
                message: err.to_string(),
            },
            TokenError::Expired => Self {
                status: StatusCode::BAD_REQUEST,
                code: "token_expired",
                message: err.to_string(),
            },
            TokenError::UnknownPermissions(_) => Self {
                status: StatusCode::BAD_REQUEST,
                code: "unknown_permissions",
                message: err.to_string(),
            },
        }
    }
}

impl From<ContinuationError> for ApiError {
    fn from(err: ContinuationError) -> Self {
        match err {
            ContinuationError::SubmissionNotFound => Self {
                status: StatusCode::NOT_FOUND,
                code: "submission_not_found",
                message: err.to_string(),
            },
            ContinuationError::InvalidOrExpired => Self {
                status: StatusCode::BAD_REQUEST,
                code: "invalid_or_expired_token",
                message: err.to_string(),
            },
            // The token itself is fine; tenant policy closed the door
            ContinuationError::SubmissionCompleted => Self {
                status: StatusCode::FORBIDDEN,
                code: "submission_completed",
                message: err.to_string(),
            },
            ContinuationError::Db(e) => e.into(),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::FormNotFound => Self {
                status: StatusCode::NOT_FOUND,
                code: "form_not_found",
                message: err.to_string(),
            },
            AccessError::Db(e) => e.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Database failure surfaced to API");
        Self::internal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_map_to_bad_request() {
        let api: ApiError = TokenError::Invalid.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "invalid_token");

        let api: ApiError = TokenError::Expired.into();
        assert_eq!(api.code, "token_expired");
    }

    #[test]
    fn continuation_errors_map_by_kind() {
        let api: ApiError = ContinuationError::SubmissionNotFound.into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);

        let api: ApiError = ContinuationError::InvalidOrExpired.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);

        let api: ApiError = ContinuationError::SubmissionCompleted.into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn form_not_found_maps_to_404() {
        let api: ApiError = AccessError::FormNotFound.into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.code, "form_not_found");
    }
}
