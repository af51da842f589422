//! Signed capability tokens: share a precise grant on one submission.
//!
//! A capability token is stateless: everything needed to honor it (the
//! submission id, the expiry, the permission set) is inside the token and
//! covered by the signature, so validation needs no database access. The
//! holder of the string *is* the grant.
//!
//! Contrast with [`continuation`](super::continuation) tokens, which are
//! database-resident and exist to let a respondent resume their own
//! submission. The two must never share a type or a wire format.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::codec;
use super::perms::CapabilityPermissionSet;

/// HMAC secret for capability-token signing. Zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    secret: String,
}

impl SigningKey {
    /// Minimum secret length, in characters.
    pub const MIN_CHARS: usize = 32;

    /// Wrap a configured signing secret.
    ///
    /// # Panics
    ///
    /// Panics when the secret is shorter than 32 characters. An undersized
    /// secret is a deployment mistake, not a runtime condition; refusing to
    /// construct is the only safe response.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        assert!(
            secret.chars().count() >= Self::MIN_CHARS,
            "Signing key must be at least 32 characters."
        );
        Self { secret }
    }

    fn as_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

/// Business-level outcomes of token generation and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Malformed, tampered, or otherwise unverifiable. Deliberately
    /// carries no detail about which check failed.
    #[error("Invalid token.")]
    Invalid,

    /// Structurally valid and correctly signed, but past its expiry.
    #[error("Token has expired.")]
    Expired,

    /// One or more requested permission names are not in the capability
    /// vocabulary.
    #[error("unknown permission name(s): {}", .0.join(", "))]
    UnknownPermissions(Vec<String>),
}

impl TokenError {
    /// Static code for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::UnknownPermissions(_) => "unknown_permissions",
        }
    }
}

/// A freshly generated token, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The 4-field token string.
    pub token: String,
    /// Expiry instant (minute granularity).
    pub expires_at: DateTime<Utc>,
    /// Normalized permission names, canonical order.
    pub permissions: Vec<&'static str>,
}

/// Verified claims of a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub submission_id: i64,
    /// Permission names decoded from the wire codes, canonical order.
    pub permissions: Vec<&'static str>,
    pub expires_at: DateTime<Utc>,
}

/// Generates and validates signed capability tokens.
///
/// Stateless per call; the only field is the immutable signing key, so a
/// single instance is safe to share across requests.
pub struct CapabilityTokenService {
    key: SigningKey,
}

impl CapabilityTokenService {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Generate a signed token granting `permission_names` on a submission
    /// for the next `expiry_minutes` minutes.
    ///
    /// # Panics
    ///
    /// Panics when `submission_id` or `expiry_minutes` is not positive, or
    /// when `permission_names` is empty. These are request-shape bugs the
    /// endpoint validator must reject before calling in.
    pub fn generate<S: AsRef<str>>(
        &self,
        submission_id: i64,
        expiry_minutes: i64,
        permission_names: &[S],
    ) -> Result<IssuedToken, TokenError> {
        assert!(submission_id > 0, "submission_id must be positive");
        assert!(expiry_minutes > 0, "expiry_minutes must be positive");
        assert!(
            !permission_names.is_empty(),
            "permission_names must not be empty"
        );

        let permissions = CapabilityPermissionSet::from_names(permission_names)
            .map_err(TokenError::UnknownPermissions)?;

        let now_minutes = Utc::now().timestamp().div_euclid(60);
        let expires_at_minutes = now_minutes + expiry_minutes;
        let token = codec::encode(
            submission_id,
            expires_at_minutes,
            &permissions.codes(),
            self.key.as_bytes(),
        );

        debug!(
            submission = submission_id,
            permissions = %permissions.codes(),
            expiry_minutes,
            "Capability token generated"
        );

        Ok(IssuedToken {
            token,
            expires_at: minutes_to_datetime(expires_at_minutes),
            permissions: permissions.names(),
        })
    }

    /// Validate a presented token and return its claims.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now().timestamp().div_euclid(60))
    }

    /// Validation against an explicit clock, for deterministic expiry tests.
    fn validate_at(&self, token: &str, now_minutes: i64) -> Result<TokenClaims, TokenError> {
        let fields = codec::decode(token).map_err(|_| TokenError::Invalid)?;

        if !codec::verify(token, self.key.as_bytes()) {
            trace!("Capability token rejected: bad signature or format");
            return Err(TokenError::Invalid);
        }

        // Strict boundary: the token dies the instant its expiry minute is
        // reached, not one minute later.
        if fields.expires_at_minutes <= now_minutes {
            trace!(
                submission = fields.submission_id,
                "Capability token rejected: expired"
            );
            return Err(TokenError::Expired);
        }

        // Codes were charset-checked by decode; this cannot fail here.
        let permissions =
            CapabilityPermissionSet::from_codes(&fields.codes).ok_or(TokenError::Invalid)?;

        Ok(TokenClaims {
            submission_id: fields.submission_id,
            permissions: permissions.names(),
            expires_at: minutes_to_datetime(fields.expires_at_minutes),
        })
    }
}

fn minutes_to_datetime(minutes: i64) -> DateTime<Utc> {
    // Token expiries are bounded by the endpoint validator; an out-of-range
    // minute value could only come from a forged token that already failed
    // the signature check.
    Utc.timestamp_opt(minutes * 60, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
