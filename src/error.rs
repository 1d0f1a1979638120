//! Error types for sconfig.
//!
//! Every variant of [`SconfigError`] is a distinct failure mode of a
//! retrieval or signing call. Cryptographic failures are deliberately
//! opaque: they signal *what* failed without saying *why*, so a malformed
//! input cannot be told apart from a tampered one.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The single error type for all sconfig operations.
#[derive(Debug)]
pub enum SconfigError {
    /// No API key could be resolved from the call options or the client
    /// defaults. No network request was made.
    Configuration(String),

    /// The transport failed and no cached payload replaced it.
    Transport(TransportError),

    /// The fetched payload could not be decrypted: bad hex, bad IV, wrong
    /// secret, or a padding mismatch.
    DecryptionFailure,

    /// Persisting a freshly fetched payload to the cache failed.
    CacheWrite(CacheError),

    /// Reading the fallback cache failed for a reason other than the file
    /// being absent. The transport error that triggered the fallback is
    /// discarded.
    CacheRead(CacheError),

    /// JSON mode was requested and the payload is not valid JSON.
    Parse(String),

    /// A signing secret was not exactly 32 bytes long.
    InvalidSecretLength,

    /// A null payload was given to the token signer.
    MissingPayload,

    /// The system's random number generator failed to produce bytes.
    RandomnessFailure,
}

impl fmt::Display for SconfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Self::Transport(err) => write!(f, "{}", err),
            Self::DecryptionFailure => write!(f, "configuration data could not be decrypted"),
            Self::CacheWrite(err) => write!(f, "failed to persist configuration: {}", err),
            Self::CacheRead(err) => write!(f, "failed to read persisted configuration: {}", err),
            Self::Parse(msg) => write!(f, "invalid JSON configuration: {}", msg),
            Self::InvalidSecretLength => write!(f, "signing secret must be exactly 32 bytes"),
            Self::MissingPayload => write!(f, "missing payload"),
            Self::RandomnessFailure => write!(f, "randomness source failed"),
        }
    }
}

impl std::error::Error for SconfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::CacheWrite(err) | Self::CacheRead(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for SconfigError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// A failed exchange with the configuration service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    Network(String),

    /// The service answered with a non-success status or reported a
    /// structured `{ "error": { "code", "message" } }` body.
    Server {
        /// HTTP status, when the failure came from an HTTP response.
        status: Option<u16>,
        /// Service error code, `SERVER_ERROR` unless the body supplied one.
        code: String,
        message: String,
    },
}

impl TransportError {
    /// The service error code, if this error carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Network(_) => None,
            Self::Server { code, .. } => Some(code),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Server {
                status: Some(status),
                code,
                message,
            } => write!(f, "server error {} ({}): {}", status, code, message),
            Self::Server {
                status: None,
                code,
                message,
            } => write!(f, "server error ({}): {}", code, message),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

/// A failed read or write of the local cache file.
///
/// `NotFound` is kept separate from every other I/O failure: a missing cache
/// is the normal state before the first successful sync, while anything
/// else (permissions, a directory in the way, ...) is a real fault.
#[derive(Debug)]
pub enum CacheError {
    NotFound { path: PathBuf },
    Io { path: PathBuf, source: io::Error },
}

impl CacheError {
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// The cache path the failure relates to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotFound { path } | Self::Io { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "{}: file not found", path.display()),
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}
