//! Retrieval pipeline.
//!
//! Each [`Client::fetch`] runs the same sequence:
//!
//! ```text
//! resolve ─▶ fetch ─┬─ ok ──▶ decrypt? ─▶ persist? ─▶ parse
//!                   └─ err ─▶ cache ─────────────────▶ parse
//! ```
//!
//! 1. Resolve key, secret and version from the options and the client
//!    defaults. No key means no request at all.
//! 2. Fetch through the [`Transport`].
//! 3. On success, decrypt when a secret is configured, then (with sync on)
//!    overwrite the cache before anything is returned. A failed write fails
//!    the call.
//! 4. On transport failure with sync on, read the cache. A missing cache
//!    re-raises the transport error as-is; any other read failure replaces
//!    it. Cached bytes were stored decrypted, so they go straight to parsing.
//! 5. Parse (JSON or `KEY=VALUE`).
//!
//! There are no retries: one transport failure means fallback.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};

use crate::cache;
use crate::config::{Defaults, FetchOptions, Resolved};
use crate::crypto;
use crate::error::{SconfigError, TransportError};
use crate::parse::{self, Config};
use crate::transport::{HttpTransport, Transport};

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Freshly fetched (and decrypted) from the service.
    Remote,
    /// Read from the local cache after the service failed.
    Cache,
}

/// A retrieved payload before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub payload: String,
    pub source: Source,
}

/// Configuration client.
///
/// Holds the transport and the credentials remembered between calls. One
/// client is meant to be built at startup and shared.
pub struct Client<T> {
    transport: T,
    defaults: Mutex<Defaults>,
}

impl<T: Transport> Client<T> {
    /// Client whose defaults are seeded from the `SCONFIG_*` environment.
    pub fn new(transport: T) -> Self {
        Self::with_defaults(transport, Defaults::from_env())
    }

    /// Client with explicit starting defaults.
    pub fn with_defaults(transport: T, defaults: Defaults) -> Self {
        Self {
            transport,
            defaults: Mutex::new(defaults),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Replace the remembered API key.
    pub fn set_api_key(&self, key: impl Into<String>) {
        self.lock_defaults().key = Some(key.into());
    }

    /// The API key calls fall back to when their options carry none.
    pub fn api_key(&self) -> Option<String> {
        self.lock_defaults().key.clone()
    }

    /// Retrieve and parse the configuration.
    pub async fn fetch(&self, opts: &FetchOptions) -> Result<Config, SconfigError> {
        let resolved = self.resolve(opts)?;
        let fetched = self.retrieve(&resolved).await?;
        tracing::debug!(source = ?fetched.source, "parsing configuration");
        parse::parse(&fetched.payload, resolved.json, resolved.mirror_env)
    }

    /// Retrieve the configuration payload without parsing it.
    pub async fn fetch_raw(&self, opts: &FetchOptions) -> Result<Fetched, SconfigError> {
        let resolved = self.resolve(opts)?;
        self.retrieve(&resolved).await
    }

    fn resolve(&self, opts: &FetchOptions) -> Result<Resolved, SconfigError> {
        self.lock_defaults().resolve(opts)
    }

    fn lock_defaults(&self) -> MutexGuard<'_, Defaults> {
        self.defaults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn retrieve(&self, resolved: &Resolved) -> Result<Fetched, SconfigError> {
        tracing::debug!(version = ?resolved.version, "fetching configuration");
        let body = match self
            .transport
            .fetch(&resolved.key, resolved.version.as_deref())
            .await
        {
            Ok(body) => body,
            Err(err) => return fall_back(resolved.cache_path.as_deref(), err).await,
        };

        let payload = match &resolved.secret {
            Some(secret) => {
                tracing::debug!("decrypting configuration");
                let blob = std::str::from_utf8(&body).map_err(|_| SconfigError::DecryptionFailure)?;
                crypto::decrypt(blob.trim(), secret)?
            }
            None => String::from_utf8_lossy(&body).into_owned(),
        };

        if let Some(path) = &resolved.cache_path {
            tracing::debug!(path = %path.display(), "persisting configuration");
            cache::persist(path, payload.as_bytes())
                .await
                .map_err(SconfigError::CacheWrite)?;
        }

        Ok(Fetched {
            payload,
            source: Source::Remote,
        })
    }
}

impl Client<HttpTransport> {
    /// Client for the hosted service, with environment defaults.
    pub fn http() -> Result<Self, SconfigError> {
        Ok(Self::new(HttpTransport::new()?))
    }

    /// Create a signature key on the service.
    ///
    /// Uses the remembered API key; the response carries the token and a
    /// secret that the service shows only once.
    pub async fn create_signature(&self, data: &Value) -> Result<Value, SconfigError> {
        let key = self.api_key().ok_or_else(|| {
            SconfigError::Configuration(
                "please initialize the client with the SConfig API key".to_string(),
            )
        })?;
        let body = if data.is_null() { json!({}) } else { data.clone() };
        Ok(self.transport.post_json(&key, "/signature", &body).await?)
    }
}

/// Substitute the cached payload for a failed fetch.
async fn fall_back(cache_path: Option<&Path>, err: TransportError) -> Result<Fetched, SconfigError> {
    let Some(path) = cache_path else {
        return Err(err.into());
    };

    match cache::load(path).await {
        Ok(bytes) => {
            tracing::warn!(
                error = %err,
                path = %path.display(),
                "server request failed, reading from persisted file"
            );
            Ok(Fetched {
                payload: String::from_utf8_lossy(&bytes).into_owned(),
                source: Source::Cache,
            })
        }
        Err(cache_err) if cache_err.is_not_found() => Err(err.into()),
        Err(cache_err) => {
            tracing::warn!(
                error = %cache_err,
                transport_error = %err,
                "failed to read from persisted config"
            );
            Err(SconfigError::CacheRead(cache_err))
        }
    }
}
