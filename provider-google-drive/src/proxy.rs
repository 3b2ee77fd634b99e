//! Retry decorator for [`RemoteStore`]
//!
//! Every operation runs through [`RetryingProxy::call`]:
//!
//! - success returns immediately;
//! - a transient transport failure or a rate-limit answer sleeps
//!   `2^(attempt-1)` seconds plus up to one second of jitter and tries again;
//! - the first authorization fault of a call forces a credential refresh and
//!   tries again without sleeping, when auto-refresh is enabled; a refresh
//!   that fails transiently backs off like any other transient failure;
//! - anything else propagates unchanged.
//!
//! A call makes at most [`MAX_ATTEMPTS`] attempts. When the budget runs out
//! the error of the last attempt is returned as is.

use crate::entry::{
    CachedDownloadDescriptor, ChangeFeedPage, EntryOptions, EntryUpdate, NewEntry, NormalizedEntry,
};
use crate::error::{DriveError, ErrorKind, Result};
use crate::store::RemoteStore;
use async_trait::async_trait;
use core_auth::CredentialProvider;
use rand::Rng;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts per logical call, the first one included
pub const MAX_ATTEMPTS: u32 = 5;

/// Upper bound of the random delay added to every backoff
const MAX_JITTER_MS: u64 = 1000;

pub struct RetryingProxy<S> {
    inner: S,
    credentials: Arc<dyn CredentialProvider>,
    auto_refresh: bool,
}

impl<S: RemoteStore> RetryingProxy<S> {
    pub fn new(inner: S, credentials: Arc<dyn CredentialProvider>, auto_refresh: bool) -> Self {
        Self {
            inner,
            credentials,
            auto_refresh,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Refresh the credential out of band.
    pub async fn refresh_credential(&self) -> Result<()> {
        info!("Refreshing credential on request");
        self.credentials.force_refresh().await?;
        Ok(())
    }

    /// Run `operation` under the retry policy.
    pub async fn call<T, F, Fut>(&self, name: &'static str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        let mut refreshed = false;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = name, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let kind = error.kind();
            if attempt >= MAX_ATTEMPTS {
                warn!(
                    operation = name,
                    attempts = attempt,
                    kind = ?kind,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(error);
            }

            match kind {
                kind if kind.is_retryable() => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        operation = name,
                        attempt,
                        kind = ?kind,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                ErrorKind::AuthorizationFault if self.auto_refresh && !refreshed => {
                    warn!(operation = name, attempt, error = %error, "Authorization fault, refreshing credential");
                    refreshed = true;
                    if let Err(refresh_error) = self.credentials.force_refresh().await {
                        let refresh_error = DriveError::from(refresh_error);
                        let refresh_kind = refresh_error.kind();
                        if !refresh_kind.is_retryable() {
                            return Err(refresh_error);
                        }

                        let delay = backoff_delay(attempt);
                        warn!(
                            operation = name,
                            attempt,
                            kind = ?refresh_kind,
                            delay_ms = delay.as_millis() as u64,
                            error = %refresh_error,
                            "Credential refresh failed transiently, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                _ => {
                    debug!(operation = name, kind = ?kind, "Not retrying");
                    return Err(error);
                }
            }

            attempt += 1;
        }
    }
}

/// `2^(attempt-1)` seconds plus uniform jitter in `[0, 1s]`.
fn backoff_delay(attempt: u32) -> Duration {
    let base = Duration::from_secs(1u64 << (attempt.saturating_sub(1)).min(16));
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    base + Duration::from_millis(jitter)
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for RetryingProxy<S> {
    async fn get_about(&self) -> Result<serde_json::Value> {
        self.call("get_about", || self.inner.get_about()).await
    }

    async fn list_changes(
        &self,
        start_change_id: Option<i64>,
        page_token: Option<&str>,
    ) -> Result<ChangeFeedPage> {
        self.call("list_changes", || {
            self.inner.list_changes(start_change_id, page_token)
        })
        .await
    }

    async fn get_parents(&self, child_id: &str) -> Result<Vec<String>> {
        self.call("get_parents", || self.inner.get_parents(child_id))
            .await
    }

    async fn list_children(
        &self,
        parent_id: &str,
        query_contains: Option<&str>,
        query_is: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<Vec<String>> {
        self.call("list_children", || {
            self.inner
                .list_children(parent_id, query_contains, query_is, max_results)
        })
        .await
    }

    async fn list_files(
        &self,
        query_contains: Option<&str>,
        query_is: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Vec<NormalizedEntry>> {
        self.call("list_files", || {
            self.inner.list_files(query_contains, query_is, parent_id)
        })
        .await
    }

    async fn get_entry(&self, entry_id: &str) -> Result<NormalizedEntry> {
        self.call("get_entry", || self.inner.get_entry(entry_id))
            .await
    }

    async fn download_entry(
        &self,
        local_path: &Path,
        entry: &NormalizedEntry,
        mime_type: &str,
        allow_cache: bool,
    ) -> Result<CachedDownloadDescriptor> {
        self.call("download_entry", || {
            self.inner
                .download_entry(local_path, entry, mime_type, allow_cache)
        })
        .await
    }

    async fn create_entry(&self, new_entry: &NewEntry) -> Result<NormalizedEntry> {
        self.call("create_entry", || self.inner.create_entry(new_entry))
            .await
    }

    async fn create_directory(
        &self,
        title: &str,
        parents: &[String],
        options: &EntryOptions,
    ) -> Result<NormalizedEntry> {
        self.call("create_directory", || {
            self.inner.create_directory(title, parents, options)
        })
        .await
    }

    async fn create_file(
        &self,
        title: &str,
        parents: &[String],
        data_path: Option<&Path>,
        mime_type: Option<&str>,
        options: &EntryOptions,
    ) -> Result<NormalizedEntry> {
        self.call("create_file", || {
            self.inner
                .create_file(title, parents, data_path, mime_type, options)
        })
        .await
    }

    async fn update_entry(
        &self,
        entry: &NormalizedEntry,
        update: &EntryUpdate,
    ) -> Result<NormalizedEntry> {
        self.call("update_entry", || self.inner.update_entry(entry, update))
            .await
    }

    async fn rename_entry(&self, entry: &NormalizedEntry, title: &str) -> Result<NormalizedEntry> {
        self.call("rename_entry", || self.inner.rename_entry(entry, title))
            .await
    }

    async fn truncate_entry(&self, entry: &NormalizedEntry) -> Result<NormalizedEntry> {
        self.call("truncate_entry", || self.inner.truncate_entry(entry))
            .await
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<()> {
        self.call("delete_entry", || self.inner.delete_entry(entry_id))
            .await
    }
}
