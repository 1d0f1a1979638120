//! Local cache of the last good configuration payload.
//!
//! The cache is a single flat file holding the payload exactly as it was
//! accepted (after decryption), with no header or metadata. Each write
//! replaces the previous contents. Concurrent writers are not coordinated:
//! the last one wins.

use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// File name of the cache when the caller does not choose a path.
pub const DEFAULT_CACHE_FILE: &str = ".sconfig";

/// `<cwd>/.sconfig`, falling back to a relative path if the working
/// directory cannot be determined.
pub fn default_path() -> PathBuf {
    std::env::current_dir()
        .map(|dir| dir.join(DEFAULT_CACHE_FILE))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_FILE))
}

/// Write `bytes` to `path`, overwriting whatever was there.
pub async fn persist(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|err| CacheError::from_io(path.to_path_buf(), err))
}

/// Read the whole cache file at `path`.
///
/// A missing file is reported as [`CacheError::NotFound`]; every other
/// failure as [`CacheError::Io`].
pub async fn load(path: &Path) -> Result<Vec<u8>, CacheError> {
    tokio::fs::read(path)
        .await
        .map_err(|err| CacheError::from_io(path.to_path_buf(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);

        persist(&path, b"A=1\nB=2").await.unwrap();
        persist(&path, b"C=3").await.unwrap();

        assert_eq!(load(&path).await.unwrap(), b"C=3");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");

        let err = load(&path).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.path(), &path);
    }

    #[tokio::test]
    async fn test_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = load(dir.path()).await.unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));

        let err = persist(dir.path(), b"x").await.unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn test_default_path_file_name() {
        assert!(default_path().ends_with(DEFAULT_CACHE_FILE));
    }
}
