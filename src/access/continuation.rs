//! Database-resident continuation tokens: resume your own submission.
//!
//! A continuation token is an opaque high-entropy value bound 1:1 to a
//! submission row. It lets an anonymous respondent come back to a
//! multi-page form; how long it lives and whether it survives completion
//! is tenant policy, enforced here rather than at each call site.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Database, DbError};

/// Entropy of a token value, in bytes, before encoding.
const TOKEN_BYTES: usize = 32;

/// Issue attempts before giving up on unique-index collisions. With 256
/// bits of entropy a single collision already means the RNG is broken.
const MAX_ISSUE_ATTEMPTS: u32 = 3;

/// Business-level outcomes of issuance and resolution.
#[derive(Debug, Error)]
pub enum ContinuationError {
    /// Issuance against a submission id that does not exist.
    #[error("Submission not found.")]
    SubmissionNotFound,

    /// Unknown token value or stored expiry in the past. The two cases are
    /// deliberately indistinguishable so guessing reveals nothing.
    #[error("Invalid or expired token.")]
    InvalidOrExpired,

    /// The submission is complete and the owning tenant's policy forbids
    /// further token access.
    #[error("Submission completed.")]
    SubmissionCompleted,

    /// Infrastructure failure in the backing store.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl ContinuationError {
    /// Static code for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SubmissionNotFound => "submission_not_found",
            Self::InvalidOrExpired => "invalid_or_expired",
            Self::SubmissionCompleted => "submission_completed",
            Self::Db(_) => "db_error",
        }
    }
}

/// Issues and resolves per-submission continuation tokens.
#[derive(Clone)]
pub struct ContinuationTokenStore {
    db: Database,
    /// Fallback lifetime (hours) for tenants without an override.
    default_expiry_hours: i64,
}

impl ContinuationTokenStore {
    pub fn new(db: Database, default_expiry_hours: i64) -> Self {
        Self {
            db,
            default_expiry_hours,
        }
    }

    /// Issue a fresh token for a submission, replacing any previous one.
    ///
    /// The token lifetime comes from the owning tenant's
    /// `submission_token_expiry_hours`, falling back to the server default.
    /// Collisions with existing values regenerate and retry.
    ///
    /// # Panics
    ///
    /// Panics when `submission_id` is not positive.
    pub async fn issue(&self, submission_id: i64) -> Result<String, ContinuationError> {
        assert!(submission_id > 0, "submission_id must be positive");

        let submission = self
            .db
            .submissions()
            .find_by_id(submission_id)
            .await?
            .ok_or(ContinuationError::SubmissionNotFound)?;

        let settings = self.db.tenants().settings_for(submission.tenant_id).await?;
        let expiry_hours = settings
            .and_then(|s| s.submission_token_expiry_hours)
            .unwrap_or(self.default_expiry_hours);
        let expires_at = Utc::now().timestamp() + expiry_hours * 3600;

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let value = generate_token_value();
            match self
                .db
                .submissions()
                .set_continuation_token(submission_id, &value, expires_at)
                .await
            {
                Ok(()) => {
                    info!(
                        submission = submission_id,
                        tenant = submission.tenant_id,
                        expiry_hours,
                        "Continuation token issued"
                    );
                    return Ok(value);
                }
                Err(DbError::ContinuationTokenCollision) => {
                    warn!(
                        submission = submission_id,
                        attempt, "Continuation token value collided, regenerating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ContinuationError::Db(DbError::ContinuationTokenCollision))
    }

    /// Resolve a presented token value to its submission id.
    ///
    /// # Panics
    ///
    /// Panics when `token_value` is empty. An empty lookup key is a caller
    /// bug; it must never reach the store.
    pub async fn resolve(&self, token_value: &str) -> Result<i64, ContinuationError> {
        assert!(!token_value.is_empty(), "token_value must not be empty");

        let submission = match self
            .db
            .submissions()
            .find_by_continuation_token(token_value)
            .await?
        {
            Some(s) => s,
            None => {
                debug!("Continuation token rejected: no match");
                return Err(ContinuationError::InvalidOrExpired);
            }
        };

        let now = Utc::now().timestamp();
        match submission.continuation_expires_at {
            Some(expires_at) if expires_at > now => {}
            _ => {
                debug!(submission = submission.id, "Continuation token rejected: expired");
                return Err(ContinuationError::InvalidOrExpired);
            }
        }

        if submission.is_completed {
            let settings = self.db.tenants().settings_for(submission.tenant_id).await?;
            let valid_after_completion =
                settings.is_some_and(|s| s.token_valid_after_completion);
            if !valid_after_completion {
                debug!(
                    submission = submission.id,
                    "Continuation token rejected: submission completed"
                );
                return Err(ContinuationError::SubmissionCompleted);
            }
        }

        Ok(submission.id)
    }
}

/// Generate an opaque token value: 256 bits from the OS RNG, URL-safe
/// base64 without padding.
fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
