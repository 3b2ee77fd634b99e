//! Google Drive v2 client
//!
//! [`DriveClient`] issues one round trip per operation, or a sequential loop
//! of them for pagination and chunked downloads. It never retries; wrap it in
//! a [`RetryingProxy`](crate::RetryingProxy) for that.

use crate::cache::{CacheDecision, DownloadCache};
use crate::changes::ensure_increasing;
use crate::discovery::{decode, ServiceClient, ServiceClientFactory};
use crate::download::download_to_path;
use crate::entry::{
    format_timestamp, CachedDownloadDescriptor, ChangeFeedPage, ChangeRecord, EntryOptions,
    EntryUpdate, MediaSource, NewEntry, NormalizedEntry,
};
use crate::error::{DriveError, Result};
use crate::store::RemoteStore;
use crate::types::{
    ChangeList, DriveFile, FileList, FileMetadataBody, LabelsBody, ParentReference, ReferenceList,
};
use async_trait::async_trait;
use bridge_traits::http::{HttpMethod, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use bytes::{BufMut, Bytes, BytesMut};
use core_runtime::config::DriveConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Direct implementation of [`RemoteStore`] against the Drive v2 API.
pub struct DriveClient {
    factory: Arc<ServiceClientFactory>,
    fs: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    config: Arc<DriveConfig>,
    cache: DownloadCache,
}

impl DriveClient {
    pub fn new(
        factory: Arc<ServiceClientFactory>,
        fs: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
        config: Arc<DriveConfig>,
    ) -> Self {
        let cache = DownloadCache::new(fs.clone(), config.staging_dir.clone());
        Self {
            factory,
            fs,
            clock,
            config,
            cache,
        }
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    async fn client(&self) -> Result<Arc<ServiceClient>> {
        self.factory.get_client().await
    }

    async fn load_media(&self, source: &MediaSource) -> Result<Bytes> {
        match source {
            MediaSource::File(path) => Ok(self.fs.read_file(path).await?),
            MediaSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Send `metadata` as JSON, or as a multipart upload when `media` is set.
    async fn send_metadata(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(&str, String)],
        metadata: &FileMetadataBody,
        media: Option<(&MediaSource, &str)>,
        subject: &str,
    ) -> Result<NormalizedEntry> {
        let client = self.client().await?;

        let request = match media {
            Some((source, mime_type)) => {
                let data = self.load_media(source).await?;
                let mut upload_params = vec![("uploadType", "multipart".to_string())];
                upload_params.extend(params.iter().cloned());
                let url = with_query(&client.upload_url(path), &upload_params);

                let boundary = format!("gdrive-core-{}", uuid::Uuid::new_v4().simple());
                let body = multipart_related(&boundary, metadata, mime_type, &data)?;
                debug!(bytes = data.len(), "Uploading media");

                HttpRequest::new(method, url)
                    .header(
                        "Content-Type",
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(body)
            }
            None => HttpRequest::new(method, with_query(&client.api_url(path), params))
                .json(metadata)
                .map_err(|e| DriveError::InvalidArguments(e.to_string()))?,
        };

        let response = client.execute(request, subject).await?;
        let file: DriveFile = decode(&response, subject)?;
        NormalizedEntry::from_wire(file)
    }

    fn hidden_predicates(&self) -> impl Iterator<Item = String> + '_ {
        self.config
            .hidden_flags
            .iter()
            .map(|flag| format!("{} = false", flag))
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    #[instrument(skip(self))]
    async fn get_about(&self) -> Result<serde_json::Value> {
        let client = self.client().await?;
        client.get_json(client.api_url("about"), "about").await
    }

    #[instrument(skip(self))]
    async fn list_changes(
        &self,
        start_change_id: Option<i64>,
        page_token: Option<&str>,
    ) -> Result<ChangeFeedPage> {
        let client = self.client().await?;

        let mut params = Vec::new();
        if let Some(start) = start_change_id {
            params.push(("startChangeId", start.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let changes: ChangeList = client
            .get_json(with_query(&client.api_url("changes"), &params), "changes")
            .await?;

        let mut records = Vec::with_capacity(changes.items.len());
        for change in changes.items {
            let entry = match (change.deleted, change.file) {
                (true, _) => None,
                (false, Some(file)) => Some(NormalizedEntry::from_wire(file)?),
                (false, None) => {
                    return Err(DriveError::InvalidResponse(format!(
                        "change {} for {} carries no entry",
                        change.id, change.file_id
                    )))
                }
            };

            records.push(ChangeRecord {
                change_id: change.id,
                entry_id: change.file_id,
                deleted: change.deleted,
                entry,
            });
        }

        ensure_increasing(None, &records)?;

        debug!(
            records = records.len(),
            largest_change_id = changes.largest_change_id,
            "Fetched change page"
        );

        Ok(ChangeFeedPage {
            records,
            largest_change_id: changes.largest_change_id,
            next_page_token: changes.next_page_token,
        })
    }

    #[instrument(skip(self))]
    async fn get_parents(&self, child_id: &str) -> Result<Vec<String>> {
        let client = self.client().await?;
        let path = format!("files/{}/parents", encode_id(child_id));
        let parents: ReferenceList = client.get_json(client.api_url(&path), &path).await?;
        Ok(parents.items.into_iter().map(|p| p.id).collect())
    }

    #[instrument(skip(self))]
    async fn list_children(
        &self,
        parent_id: &str,
        query_contains: Option<&str>,
        query_is: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<Vec<String>> {
        let title = title_predicate(query_contains, query_is)?;
        let client = self.client().await?;

        let mut params = Vec::new();
        if let Some(q) = title {
            params.push(("q", q));
        }
        if let Some(max) = max_results {
            params.push(("maxResults", max.to_string()));
        }

        let path = format!("files/{}/children", encode_id(parent_id));
        let children: ReferenceList = client
            .get_json(with_query(&client.api_url(&path), &params), &path)
            .await?;

        debug!(count = children.items.len(), "Listed children");
        Ok(children.items.into_iter().map(|c| c.id).collect())
    }

    #[instrument(skip(self))]
    async fn list_files(
        &self,
        query_contains: Option<&str>,
        query_is: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Vec<NormalizedEntry>> {
        let title = title_predicate(query_contains, query_is)?;

        let mut predicates = Vec::new();
        if let Some(parent) = parent_id {
            predicates.push(format!("'{}' in parents", escape_query_literal(parent)));
        }
        predicates.extend(title);
        predicates.extend(self.hidden_predicates());
        let query = predicates.join(" and ");

        let client = self.client().await?;
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut params = Vec::new();
            if !query.is_empty() {
                params.push(("q", query.clone()));
            }
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let page: FileList = client
                .get_json(with_query(&client.api_url("files"), &params), "files")
                .await?;
            pages += 1;

            for file in page.items {
                let entry = NormalizedEntry::from_wire(file)?;
                if entry.is_flagged(&self.config.hidden_flags) {
                    warn!(entry_id = %entry.id, "Dropping flagged entry the query did not exclude");
                    continue;
                }
                entries.push(entry);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = entries.len(), pages, "Listed files");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn get_entry(&self, entry_id: &str) -> Result<NormalizedEntry> {
        let client = self.client().await?;
        let path = format!("files/{}", encode_id(entry_id));
        let file: DriveFile = client.get_json(client.api_url(&path), &path).await?;
        NormalizedEntry::from_wire(file)
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id, path = %local_path.display()))]
    async fn download_entry(
        &self,
        local_path: &Path,
        entry: &NormalizedEntry,
        mime_type: &str,
        allow_cache: bool,
    ) -> Result<CachedDownloadDescriptor> {
        let url = entry.download_url_for(mime_type).ok_or_else(|| {
            let mut available: Vec<String> = entry.download_links.keys().cloned().collect();
            available.sort();
            DriveError::ExportFormat {
                entry_id: entry.id.clone(),
                requested: mime_type.to_string(),
                available,
            }
        })?;

        if let CacheDecision::Hit { size } = self
            .cache
            .resolve(local_path, entry.modified_date, allow_cache)
            .await?
        {
            return Ok(CachedDownloadDescriptor {
                path: local_path.to_path_buf(),
                size,
                changed: false,
            });
        }

        if let Some(parent) = local_path.parent() {
            self.fs.create_dir_all(parent).await?;
        }

        let client = self.client().await?;
        let size = download_to_path(
            &client,
            self.fs.as_ref(),
            url,
            local_path,
            self.config.download_chunk_size,
        )
        .await?;

        self.cache.mark_fresh(local_path, entry.modified_date).await?;

        info!(bytes = size, "Downloaded entry");
        Ok(CachedDownloadDescriptor {
            path: local_path.to_path_buf(),
            size,
            changed: true,
        })
    }

    #[instrument(skip(self, new_entry), fields(title = %new_entry.title))]
    async fn create_entry(&self, new_entry: &NewEntry) -> Result<NormalizedEntry> {
        let options = &new_entry.options;
        let metadata = FileMetadataBody {
            title: Some(new_entry.title.clone()),
            mime_type: Some(new_entry.mime_type.clone()),
            parents: Some(
                new_entry
                    .parents
                    .iter()
                    .map(|id| ParentReference { id: id.clone() })
                    .collect(),
            ),
            labels: options.hidden.map(|hidden| LabelsBody { hidden }),
            description: options.description.clone(),
            modified_date: Some(format_timestamp(
                options.modified.unwrap_or_else(|| self.clock.now()),
            )),
            last_viewed_by_me_date: options.accessed.map(format_timestamp),
        };

        let media = new_entry
            .data
            .as_ref()
            .map(|source| (source, new_entry.mime_type.as_str()));

        let created = self
            .send_metadata(HttpMethod::Post, "files", &[], &metadata, media, "files")
            .await?;

        info!(entry_id = %created.id, "Created entry");
        Ok(created)
    }

    async fn create_directory(
        &self,
        title: &str,
        parents: &[String],
        options: &EntryOptions,
    ) -> Result<NormalizedEntry> {
        self.create_entry(&NewEntry {
            title: title.to_string(),
            parents: parents.to_vec(),
            mime_type: self.config.directory_mime_type.clone(),
            data: None,
            options: options.clone(),
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
        self.create_entry(&NewEntry {
            title: title.to_string(),
            parents: parents.to_vec(),
            mime_type: mime_type
                .unwrap_or(&self.config.default_file_mime_type)
                .to_string(),
            data: data_path.map(|p| MediaSource::File(p.to_path_buf())),
            options: options.clone(),
        })
        .await
    }

    #[instrument(skip(self, entry, update), fields(entry_id = %entry.id))]
    async fn update_entry(
        &self,
        entry: &NormalizedEntry,
        update: &EntryUpdate,
    ) -> Result<NormalizedEntry> {
        let mime_type = update
            .mime_type
            .clone()
            .unwrap_or_else(|| entry.mime_type.clone());

        let metadata = FileMetadataBody {
            title: update.title.clone(),
            mime_type: Some(mime_type.clone()),
            parents: update.parents.as_ref().map(|ids| {
                ids.iter()
                    .map(|id| ParentReference { id: id.clone() })
                    .collect()
            }),
            labels: update.hidden.map(|hidden| LabelsBody { hidden }),
            description: update.description.clone(),
            modified_date: Some(format_timestamp(
                update.modified.unwrap_or_else(|| self.clock.now()),
            )),
            last_viewed_by_me_date: update.accessed.map(format_timestamp),
        };

        let params = [
            ("setModifiedDate", "true".to_string()),
            ("updateViewedDate", update.accessed.is_some().to_string()),
        ];

        let path = format!("files/{}", encode_id(&entry.id));
        let media = update
            .data
            .as_ref()
            .map(|source| (source, mime_type.as_str()));

        let updated = self
            .send_metadata(HttpMethod::Put, &path, &params, &metadata, media, &path)
            .await?;

        debug!(with_media = update.data.is_some(), "Updated entry");
        Ok(updated)
    }

    async fn rename_entry(&self, entry: &NormalizedEntry, title: &str) -> Result<NormalizedEntry> {
        self.update_entry(entry, &EntryUpdate::new().title(title))
            .await
    }

    async fn truncate_entry(&self, entry: &NormalizedEntry) -> Result<NormalizedEntry> {
        self.update_entry(entry, &EntryUpdate::new().data(MediaSource::Bytes(Bytes::new())))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, entry_id: &str) -> Result<()> {
        let client = self.client().await?;
        let path = format!("files/{}", encode_id(entry_id));
        client
            .execute(HttpRequest::new(HttpMethod::Delete, client.api_url(&path)), &path)
            .await?;

        info!("Deleted entry");
        Ok(())
    }
}

/// `title contains '..'` or `title = '..'`; at most one may be given.
fn title_predicate(query_contains: Option<&str>, query_is: Option<&str>) -> Result<Option<String>> {
    match (query_contains, query_is) {
        (Some(_), Some(_)) => Err(DriveError::InvalidArguments(
            "query_contains and query_is are mutually exclusive".to_string(),
        )),
        (Some(text), None) => Ok(Some(format!(
            "title contains '{}'",
            escape_query_literal(text)
        ))),
        (None, Some(text)) => Ok(Some(format!("title = '{}'", escape_query_literal(text)))),
        (None, None) => Ok(None),
    }
}

/// Escape a string for use inside a single-quoted query literal.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn encode_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn with_query(base: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, query)
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related(
    boundary: &str,
    metadata: &FileMetadataBody,
    mime_type: &str,
    data: &[u8],
) -> Result<Bytes> {
    let json = serde_json::to_vec(metadata)
        .map_err(|e| DriveError::InvalidArguments(format!("unserializable metadata: {}", e)))?;

    let mut body = BytesMut::with_capacity(json.len() + data.len() + 256);
    body.put_slice(format!("--{}\r\n", boundary).as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(&json);
    body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.put_slice(data);
    body.put_slice(format!("\r\n--{}--", boundary).as_bytes());

    Ok(body.freeze())
}
