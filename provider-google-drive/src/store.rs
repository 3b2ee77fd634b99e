//! The remote operation set
//!
//! [`RemoteStore`] is the closed interface the filesystem layer calls. The
//! direct implementation is [`DriveClient`](crate::DriveClient); the
//! [`RetryingProxy`](crate::RetryingProxy) implements it again by wrapping one.

use crate::entry::{
    CachedDownloadDescriptor, ChangeFeedPage, EntryOptions, EntryUpdate, NewEntry, NormalizedEntry,
};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Service metadata (quota, root folder id, ...), passed through as is.
    async fn get_about(&self) -> Result<serde_json::Value>;

    /// One page of the change feed.
    ///
    /// Fails with a consistency violation if the page's change ids are not
    /// strictly increasing.
    async fn list_changes(
        &self,
        start_change_id: Option<i64>,
        page_token: Option<&str>,
    ) -> Result<ChangeFeedPage>;

    /// Identifiers of the parents of `child_id`.
    async fn get_parents(&self, child_id: &str) -> Result<Vec<String>>;

    /// Identifiers of the children of `parent_id`.
    ///
    /// `query_contains` and `query_is` are mutually exclusive.
    async fn list_children(
        &self,
        parent_id: &str,
        query_contains: Option<&str>,
        query_is: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<Vec<String>>;

    /// Every matching entry across all pages, minus entries carrying a
    /// configured hidden flag.
    async fn list_files(
        &self,
        query_contains: Option<&str>,
        query_is: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Vec<NormalizedEntry>>;

    async fn get_entry(&self, entry_id: &str) -> Result<NormalizedEntry>;

    /// Entries in the order of `entry_ids`, fetched one at a time.
    ///
    /// The first failure aborts the batch.
    async fn get_entries(&self, entry_ids: &[String]) -> Result<Vec<NormalizedEntry>> {
        let mut entries = Vec::with_capacity(entry_ids.len());
        for entry_id in entry_ids {
            entries.push(self.get_entry(entry_id).await?);
        }
        Ok(entries)
    }

    /// Fetch the content of `entry` as `mime_type` into `local_path`, reusing
    /// an up-to-date local copy when `allow_cache` is set.
    async fn download_entry(
        &self,
        local_path: &Path,
        entry: &NormalizedEntry,
        mime_type: &str,
        allow_cache: bool,
    ) -> Result<CachedDownloadDescriptor>;

    async fn create_entry(&self, new_entry: &NewEntry) -> Result<NormalizedEntry>;

    async fn create_directory(
        &self,
        title: &str,
        parents: &[String],
        options: &EntryOptions,
    ) -> Result<NormalizedEntry>;

    /// Create a file, uploading `data_path` when given. Without `mime_type`
    /// the configured default file type is used.
    async fn create_file(
        &self,
        title: &str,
        parents: &[String],
        data_path: Option<&Path>,
        mime_type: Option<&str>,
        options: &EntryOptions,
    ) -> Result<NormalizedEntry>;

    async fn update_entry(
        &self,
        entry: &NormalizedEntry,
        update: &EntryUpdate,
    ) -> Result<NormalizedEntry>;

    async fn rename_entry(&self, entry: &NormalizedEntry, title: &str) -> Result<NormalizedEntry>;

    /// Replace the content of `entry` with nothing.
    async fn truncate_entry(&self, entry: &NormalizedEntry) -> Result<NormalizedEntry>;

    /// Fails with a not-found error when the entry is already gone.
    async fn delete_entry(&self, entry_id: &str) -> Result<()>;
}
