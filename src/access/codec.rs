//! Wire format and signing primitive for capability tokens.
//!
//! A capability token is exactly four `.`-separated fields:
//!
//! ```text
//! <submission id> . <expiry> . <permission codes> . <signature>
//! ```
//!
//! - submission id: decimal, no sign, no leading zeros
//! - expiry: decimal minutes since the Unix epoch
//! - permission codes: one or more of `r` `w` `x`, canonical order
//! - signature: URL-safe unpadded base64 of HMAC-SHA256 over the first
//!   three fields joined by `.`, keyed by the signing secret
//!
//! Everything here is a pure function; signing policy (expiry computation,
//! permission-name validation) lives in
//! [`capability`](super::capability).

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::perms::CapabilityPermission;

type HmacSha256 = Hmac<Sha256>;

/// Number of `.`-separated fields in a well-formed token.
const FIELD_COUNT: usize = 4;

/// Returned when a token string does not match the wire format.
///
/// Carries no detail about which check failed. Callers surface it as a
/// generic invalid-token outcome so tampering attempts learn nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatError;

/// Semantic content of a decoded token, prior to signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields {
    /// Parsed submission id (non-negative).
    pub submission_id: i64,
    /// Parsed expiry, in minutes since the Unix epoch.
    pub expires_at_minutes: i64,
    /// Permission code letters, exactly as they appeared on the wire.
    pub codes: String,
    /// Supplied signature field, exactly as it appeared on the wire.
    pub signature: String,
}

/// Compute the signature over the three payload fields.
pub fn sign(submission_field: &str, expiry_field: &str, codes_field: &str, secret: &[u8]) -> String {
    sign_message(
        &format!("{submission_field}.{expiry_field}.{codes_field}"),
        secret,
    )
}

/// Assemble a complete token from its payload values.
pub fn encode(submission_id: i64, expires_at_minutes: i64, codes: &str, secret: &[u8]) -> String {
    let submission_field = submission_id.to_string();
    let expiry_field = expires_at_minutes.to_string();
    let signature = sign(&submission_field, &expiry_field, codes, secret);
    format!("{submission_field}.{expiry_field}.{codes}.{signature}")
}

/// Split and parse a token string.
///
/// Fails unless exactly four non-empty fields are produced, the first two
/// parse as non-negative integers, and the third consists solely of
/// permission-alphabet letters. The signature is not checked here.
pub fn decode(token: &str) -> Result<TokenFields, FormatError> {
    let fields: Vec<&str> = token.split('.').collect();
    if fields.len() != FIELD_COUNT || fields.iter().any(|f| f.is_empty()) {
        return Err(FormatError);
    }

    let submission_id = parse_unsigned_decimal(fields[0])?;
    let expires_at_minutes = parse_unsigned_decimal(fields[1])?;

    if !fields[2]
        .chars()
        .all(|c| CapabilityPermission::from_code(c).is_some())
    {
        return Err(FormatError);
    }

    Ok(TokenFields {
        submission_id,
        expires_at_minutes,
        codes: fields[2].to_string(),
        signature: fields[3].to_string(),
    })
}

/// Verify a token's signature in constant time.
///
/// The signed message is everything before the final `.`, byte for byte as
/// supplied, so any alteration of the payload fields invalidates the check.
pub fn verify(token: &str, secret: &[u8]) -> bool {
    let Some((message, signature)) = token.rsplit_once('.') else {
        return false;
    };
    let expected = sign_message(message, secret);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

fn sign_message(message: &str, secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Decimal parse that rejects signs and non-digit characters, unlike
/// `str::parse`, which accepts a leading `+`.
fn parse_unsigned_decimal(field: &str) -> Result<i64, FormatError> {
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError);
    }
    field.parse::<i64>().map_err(|_| FormatError)
}
