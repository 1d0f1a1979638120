//! Call options and client defaults.
//!
//! Every fetch takes a [`FetchOptions`]. Anything it leaves out (API key,
//! secret, version) is taken from the client's [`Defaults`], which are
//! seeded from the environment and updated by earlier calls:
//!
//! - the first non-empty key and secret seen are remembered and kept;
//! - an explicitly supplied version replaces the remembered one.

use std::path::PathBuf;

use crate::cache;
use crate::error::SconfigError;
use crate::keys::Secret;

/// Environment variable holding the API key.
pub const ENV_KEY: &str = "SCONFIG_KEY";
/// Environment variable holding the payload secret.
pub const ENV_SECRET: &str = "SCONFIG_SECRET";
/// Environment variable holding the configuration version.
pub const ENV_VERSION: &str = "SCONFIG_VERSION";

/// Whether fetched payloads are persisted locally, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// No persistence and no fallback.
    #[default]
    Disabled,
    /// Persist to `<cwd>/.sconfig`.
    DefaultPath,
    /// Persist to the given file.
    Path(PathBuf),
}

impl SyncMode {
    /// The cache file to use, or `None` when sync is disabled.
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            Self::Disabled => None,
            Self::DefaultPath => Some(cache::default_path()),
            Self::Path(path) => Some(path.clone()),
        }
    }
}

impl From<bool> for SyncMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::DefaultPath
        } else {
            Self::Disabled
        }
    }
}

impl From<PathBuf> for SyncMode {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// Options for a single fetch.
#[derive(Debug)]
pub struct FetchOptions {
    pub key: Option<String>,
    /// Shared secret for encrypted payloads. Without one, payloads are
    /// taken as plain text.
    pub secret: Option<Secret>,
    pub version: Option<String>,
    pub sync: SyncMode,
    /// Parse the payload as JSON instead of `KEY=VALUE` lines.
    pub json: bool,
    /// Export parsed `KEY=VALUE` pairs into the process environment.
    pub mirror_env: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            key: None,
            secret: None,
            version: None,
            sync: SyncMode::Disabled,
            json: false,
            mirror_env: true,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_sync(mut self, sync: impl Into<SyncMode>) -> Self {
        self.sync = sync.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_env_mirroring(mut self, mirror_env: bool) -> Self {
        self.mirror_env = mirror_env;
        self
    }
}

/// Credentials remembered across calls by one client.
#[derive(Debug, Default)]
pub struct Defaults {
    pub key: Option<String>,
    pub secret: Option<Secret>,
    pub version: Option<String>,
}

impl Defaults {
    /// Read `SCONFIG_KEY`, `SCONFIG_SECRET` and `SCONFIG_VERSION`. Empty
    /// variables count as unset.
    pub fn from_env() -> Self {
        Self {
            key: non_empty_env(ENV_KEY),
            secret: non_empty_env(ENV_SECRET).map(Secret::from),
            version: non_empty_env(ENV_VERSION),
        }
    }

    /// Combine `opts` with these defaults, remembering what `opts` adds.
    ///
    /// Fails with [`SconfigError::Configuration`] when no key is available.
    pub(crate) fn resolve(&mut self, opts: &FetchOptions) -> Result<Resolved, SconfigError> {
        let explicit_key = opts.key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        if self.key.is_none() {
            self.key = explicit_key.map(str::to_string);
        }
        if self.secret.is_none() {
            self.secret = opts
                .secret
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(Secret::duplicate);
        }
        if let Some(version) = opts.version.as_deref().filter(|v| !v.is_empty()) {
            self.version = Some(version.to_string());
        }

        let key = explicit_key
            .map(str::to_string)
            .or_else(|| self.key.clone())
            .ok_or_else(|| {
                SconfigError::Configuration("please specify the SConfig API key".to_string())
            })?;

        let secret = opts
            .secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .or(self.secret.as_ref())
            .map(Secret::duplicate);

        Ok(Resolved {
            key,
            secret,
            version: self.version.clone(),
            cache_path: opts.sync.path(),
            json: opts.json,
            mirror_env: opts.mirror_env,
        })
    }
}

/// Everything one fetch needs, after defaults are applied.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub key: String,
    pub secret: Option<Secret>,
    pub version: Option<String>,
    pub cache_path: Option<PathBuf>,
    pub json: bool,
    pub mirror_env: bool,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
