//! # sconfig
//!
//! Client for versioned remote configuration.
//!
//! Configuration payloads are fetched from a remote service, optionally
//! decrypted with a shared secret, persisted to a local cache, and parsed as
//! JSON or `KEY=VALUE` text. When the service is unreachable, the last cached
//! payload stands in for it. Alongside retrieval, the crate mints and checks
//! short-lived HMAC-signed tokens.
//!
//! ## Public API
//!
//! - [`Client`]: the retrieval pipeline (fetch, decrypt, persist, fall back,
//!   parse), generic over its [`Transport`].
//! - [`crypto`]: payload decryption (explicit-IV and legacy layouts).
//! - [`token`]: [`sign_token`], [`verify_token`], [`token_expiration`].
//! - [`cache`]: the single-file payload cache.

pub mod cache;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod parse;
pub mod token;
pub mod transport;

pub use client::{Client, Fetched, Source};
pub use config::{Defaults, FetchOptions, SyncMode};
pub use error::{CacheError, SconfigError, TransportError};
pub use keys::Secret;
pub use parse::Config;
pub use transport::{HttpTransport, Transport};

// ---------------------------------------------------------------------------
// Token API
// ---------------------------------------------------------------------------

use serde_json::Value;

/// Mint a token for `payload`, valid for `ttl_secs` seconds
/// ([`token::DEFAULT_TTL_SECS`] is the customary choice).
///
/// The secret must be exactly 32 bytes and the payload must not be null.
pub fn sign_token(payload: &Value, secret: &Secret, ttl_secs: i64) -> Result<String, SconfigError> {
    token::sign(payload, secret, ttl_secs)
}

/// Check a token against the payload it was minted for.
pub fn verify_token(token: &str, payload: &Value, secret: &Secret) -> bool {
    token::verify(token, payload, secret)
}

/// Expiry of a token in milliseconds since the epoch, unauthenticated.
pub fn token_expiration(token: &str) -> Option<i64> {
    token::expiration(token)
}
