//! Expiring signed tokens.
//!
//! A token binds a payload to a shared secret for a limited time. It is made
//! of three dot-separated base64 segments:
//!
//! ```text
//! base64(header) "." base64(HMAC(header)) "." base64(HMAC(payload))
//! ```
//!
//! The header is the JSON object `{"e": <expiry, ms since epoch>}`. All MACs
//! are HMAC-SHA256 keyed with the 32-byte secret, computed and checked with
//! `ring::hmac` so signature comparison is constant-time.
//!
//! The payload itself is not carried in the token: the verifier must be
//! handed the same payload again.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use ring::hmac;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SconfigError;
use crate::keys::Secret;

/// Lifetime of a token when the caller does not pick one, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 60;

const SEGMENT_SEPARATOR: char = '.';

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    /// Absolute expiry, milliseconds since the Unix epoch.
    #[serde(deserialize_with = "expiry_ms")]
    e: i64,
}

/// Accept the expiry as an integer or a float. Fractional milliseconds are
/// rounded up, so `now >= e` still holds from the same instant on.
fn expiry_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(ms) = number.as_i64() {
        return Ok(ms);
    }
    match number.as_f64() {
        Some(ms) if ms.is_finite() && ms >= i64::MIN as f64 && ms < i64::MAX as f64 => {
            Ok(ms.ceil() as i64)
        }
        _ => Err(serde::de::Error::custom("expiry out of range")),
    }
}

/// Sign `payload` with `secret`, valid for `ttl_secs` seconds from now.
pub fn sign(payload: &Value, secret: &Secret, ttl_secs: i64) -> Result<String, SconfigError> {
    sign_at(payload, secret, ttl_secs, now_ms())
}

/// Sign `payload` as if the current time were `now_ms`.
pub fn sign_at(
    payload: &Value,
    secret: &Secret,
    ttl_secs: i64,
    now_ms: i64,
) -> Result<String, SconfigError> {
    if !secret.is_signing_length() {
        return Err(SconfigError::InvalidSecretLength);
    }
    let canonical = canonical_payload(payload).ok_or(SconfigError::MissingPayload)?;

    let key = signing_key(secret);
    let payload_sign = STANDARD.encode(hmac::sign(&key, canonical.as_bytes()));

    let header = Header {
        e: now_ms.saturating_add(ttl_secs.saturating_mul(1000)),
    };
    let header_json =
        serde_json::to_string(&header).map_err(|err| SconfigError::Parse(err.to_string()))?;
    let header_sign = STANDARD.encode(hmac::sign(&key, header_json.as_bytes()));
    let header_data = STANDARD.encode(header_json.as_bytes());

    Ok(format!(
        "{header_data}{SEGMENT_SEPARATOR}{header_sign}{SEGMENT_SEPARATOR}{payload_sign}"
    ))
}

/// Check that `token` was minted for `payload` with `secret` and has not
/// expired.
///
/// Returns `false` for malformed, tampered, expired or mismatched tokens
/// alike; the reason is never exposed.
pub fn verify(token: &str, payload: &Value, secret: &Secret) -> bool {
    verify_at(token, payload, secret, now_ms())
}

/// Verify `token` as if the current time were `now_ms`.
///
/// A token stops being valid at its expiry instant: `now_ms == e` fails.
pub fn verify_at(token: &str, payload: &Value, secret: &Secret, now_ms: i64) -> bool {
    if token.is_empty() || !secret.is_signing_length() {
        return false;
    }
    let mut segments = token.split(SEGMENT_SEPARATOR);
    let (Some(header_data), Some(header_sign), Some(payload_sign), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return false;
    };

    let Ok(header_json) = STANDARD.decode(header_data) else {
        return false;
    };
    let Ok(header) = serde_json::from_slice::<Header>(&header_json) else {
        return false;
    };

    let key = signing_key(secret);
    if !tag_matches(&key, &header_json, header_sign) {
        return false;
    }
    if now_ms >= header.e {
        return false;
    }

    let Some(canonical) = canonical_payload(payload) else {
        return false;
    };
    tag_matches(&key, canonical.as_bytes(), payload_sign)
}

/// Read the expiry (ms since epoch) from a token's header.
///
/// This does NOT authenticate the token. Use [`verify`] before trusting the
/// value for anything.
pub fn expiration(token: &str) -> Option<i64> {
    let header_data = token.split(SEGMENT_SEPARATOR).next()?;
    let header_json = STANDARD.decode(header_data).ok()?;
    let header: Header = serde_json::from_slice(&header_json).ok()?;
    (header.e != 0).then_some(header.e)
}

/// [`expiration`] as a timestamp. Same caveat: unauthenticated.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    expiration(token).and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// The text a payload signature is computed over. Strings are signed as-is
/// (no quotes), scalars in their display form, and arrays/objects as compact
/// JSON. `Null` has no canonical form.
fn canonical_payload(payload: &Value) -> Option<String> {
    match payload {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(payload).ok(),
    }
}

fn signing_key(secret: &Secret) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

/// Constant-time check of a base64 tag against `data`.
fn tag_matches(key: &hmac::Key, data: &[u8], encoded_tag: &str) -> bool {
    match STANDARD.decode(encoded_tag) {
        Ok(tag) => hmac::verify(key, data, &tag).is_ok(),
        Err(_) => false,
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
