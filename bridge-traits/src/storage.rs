//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for the download staging area and for
//! secure credential storage.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::Result;

/// File metadata information
///
/// Timestamps are Unix seconds.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Covers what the download path needs from the local disk: directory
/// creation, existence and metadata checks, streaming writes, and assigning a
/// modification time after a write completes.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn stage(fs: &dyn FileSystemAccess, dir: &Path, data: &[u8]) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     let mut writer = fs.open_write_stream(&dir.join("data.bin")).await?;
///     writer.write_all(data).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Open a file for streaming writes, truncating any previous content
    ///
    /// The handle is closed when the returned writer is dropped.
    async fn open_write_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn tokio::io::AsyncWrite + Send + Unpin>>;

    /// Set the modification time of an existing file
    async fn set_modified_time(&self, path: &Path, modified: DateTime<Utc>) -> Result<()>;
}

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS/iOS: Keychain
/// - Windows: DPAPI
/// - Linux: Secret Service / libsecret
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Encrypt data at rest
/// - Use platform-provided secure storage when available
/// - Never log or expose sensitive data
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        Store {}

        #[async_trait]
        impl SecureStore for Store {
            async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;
            async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;
            async fn delete_secret(&self, key: &str) -> Result<()>;
        }
    }

    #[test]
    fn test_file_metadata() {
        let metadata = FileMetadata {
            size: 1024,
            modified_at: Some(1234567900),
            is_directory: false,
        };

        assert_eq!(metadata.size, 1024);
        assert!(!metadata.is_directory);
    }

    #[tokio::test]
    async fn test_has_secret_defaults_to_get_secret() {
        let mut store = MockStore::new();
        store
            .expect_get_secret()
            .withf(|key| key == "present")
            .returning(|_| Ok(Some(b"value".to_vec())));
        store
            .expect_get_secret()
            .withf(|key| key == "absent")
            .returning(|_| Ok(None));

        assert!(store.has_secret("present").await.unwrap());
        assert!(!store.has_secret("absent").await.unwrap());
    }
}
