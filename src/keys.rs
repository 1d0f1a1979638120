//! Caller-supplied secret material.
//!
//! A [`Secret`] is the shared key used both to decrypt configuration
//! payloads and to sign tokens. The crate never generates, stores or caches
//! secrets on its own; callers hand one in on every operation (or once, via
//! the client defaults).
//!
//! - Not `Clone`. Cannot be duplicated without explicit conversion.
//! - Zeroised on drop. Memory is overwritten before deallocation.
//! - `Debug` output never includes the bytes.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length in bytes a secret must have for token signing and for
/// explicit-IV payload decryption (AES-256 key size).
pub const SECRET_LEN: usize = 32;

/// An opaque shared secret.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    /// Construct a `Secret` from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Number of bytes in the secret.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether this secret can be used for signing.
    pub fn is_signing_length(&self) -> bool {
        self.bytes.len() == SECRET_LEN
    }

    /// Make an independent copy. `Secret` is not `Clone`.
    pub(crate) fn duplicate(&self) -> Self {
        Self::from_bytes(self.bytes.clone())
    }

    /// Borrow the raw bytes for cipher and HMAC setup.
    ///
    /// `pub(crate)`: raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::from_bytes(value.into_bytes())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
