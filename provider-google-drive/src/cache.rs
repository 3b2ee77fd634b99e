//! Download cache validation
//!
//! A local copy is current when its modification time equals the remote
//! entry's modification time, compared at whole-second resolution. After a
//! fresh download the local mtime is set to the remote value, never to "now",
//! so that the next resolution compares equal.

use crate::error::Result;
use bridge_traits::storage::FileSystemAccess;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Result of [`DownloadCache::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// The file at the path is current; `size` is its byte length.
    Hit { size: u64 },
    /// A fresh download is needed.
    Miss,
}

impl CacheDecision {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheDecision::Hit { .. })
    }
}

pub struct DownloadCache {
    fs: Arc<dyn FileSystemAccess>,
    staging_dir: PathBuf,
}

impl DownloadCache {
    pub fn new(fs: Arc<dyn FileSystemAccess>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Decide whether the file at `path` can stand in for the remote content.
    pub async fn resolve(
        &self,
        path: &Path,
        remote_modified: DateTime<Utc>,
        allow_cache: bool,
    ) -> Result<CacheDecision> {
        if !allow_cache {
            debug!(path = %path.display(), "Cache bypassed");
            return Ok(CacheDecision::Miss);
        }

        if !self.fs.exists(path).await? {
            debug!(path = %path.display(), "No cached copy");
            return Ok(CacheDecision::Miss);
        }

        let metadata = self.fs.metadata(path).await?;
        let remote = remote_modified.timestamp();

        match metadata.modified_at {
            Some(local) if local == remote && !metadata.is_directory => {
                debug!(path = %path.display(), size = metadata.size, "Cache hit");
                Ok(CacheDecision::Hit {
                    size: metadata.size,
                })
            }
            local => {
                debug!(
                    path = %path.display(),
                    local_mtime = ?local,
                    remote_mtime = remote,
                    "Cached copy is stale"
                );
                Ok(CacheDecision::Miss)
            }
        }
    }

    /// Stamp a freshly written file with the remote modification time.
    pub async fn mark_fresh(&self, path: &Path, remote_modified: DateTime<Utc>) -> Result<()> {
        self.fs.set_modified_time(path, remote_modified).await?;
        Ok(())
    }

    /// Deterministic location under the staging directory for one entry in
    /// one MIME type.
    pub fn staging_path(&self, entry_id: &str, mime_type: &str) -> PathBuf {
        let mime = mime_type.replace('/', "+");
        self.staging_dir.join(format!("{}+{}", entry_id, mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn cache(dir: &TempDir) -> DownloadCache {
        DownloadCache::new(Arc::new(TokioFileSystem::new()), dir.path())
    }

    fn remote_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
    }

    async fn write_with_mtime(cache: &DownloadCache, path: &Path, mtime: DateTime<Utc>) {
        tokio::fs::write(path, b"hello").await.unwrap();
        cache.mark_fresh(path, mtime).await.unwrap();
    }

    #[tokio::test]
    async fn test_equal_mtime_is_hit() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let path = dir.path().join("a.txt");
        write_with_mtime(&cache, &path, remote_time()).await;

        let decision = cache.resolve(&path, remote_time(), true).await.unwrap();
        assert_eq!(decision, CacheDecision::Hit { size: 5 });
    }

    #[tokio::test]
    async fn test_sub_second_difference_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let path = dir.path().join("a.txt");
        write_with_mtime(&cache, &path, remote_time()).await;

        let remote = remote_time() + Duration::milliseconds(250);
        assert!(cache.resolve(&path, remote, true).await.unwrap().is_hit());
    }

    #[tokio::test]
    async fn test_newer_remote_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let path = dir.path().join("a.txt");
        write_with_mtime(&cache, &path, remote_time()).await;

        let remote = remote_time() + Duration::seconds(1);
        assert_eq!(
            cache.resolve(&path, remote, true).await.unwrap(),
            CacheDecision::Miss
        );
    }

    #[tokio::test]
    async fn test_missing_file_and_bypass_are_misses() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let path = dir.path().join("a.txt");

        assert!(!cache.resolve(&path, remote_time(), true).await.unwrap().is_hit());

        write_with_mtime(&cache, &path, remote_time()).await;
        assert!(!cache.resolve(&path, remote_time(), false).await.unwrap().is_hit());
    }

    #[test]
    fn test_staging_path() {
        let cache = DownloadCache::new(Arc::new(TokioFileSystem::new()), "/var/cache/gd");
        assert_eq!(
            cache.staging_path("0B1x", "application/pdf"),
            PathBuf::from("/var/cache/gd/0B1x+application+pdf")
        );
    }
}
