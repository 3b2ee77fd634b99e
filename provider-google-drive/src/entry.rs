//! Normalized records handed to callers
//!
//! Raw [`DriveFile`] payloads never leave the crate. Single-entry fetches,
//! listings and the change feed all go through [`NormalizedEntry::from_wire`].

use crate::error::{DriveError, Result};
use crate::types::DriveFile;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::path::PathBuf;

/// A remote file or directory record.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    pub modified_date: DateTime<Utc>,
    pub last_viewed_date: Option<DateTime<Utc>>,
    pub is_hidden: bool,
    pub description: Option<String>,
    /// MIME type to download URL. Holds the export links plus the native
    /// type when the entry has direct media.
    pub download_links: HashMap<String, String>,
    pub parents: Vec<String>,
    /// Raw label flags (`hidden`, `trashed`, `starred`, ...)
    pub labels: HashMap<String, bool>,
    pub size: Option<u64>,
}

impl NormalizedEntry {
    /// Build the caller-facing record from a wire payload.
    pub fn from_wire(file: DriveFile) -> Result<Self> {
        let modified_date = match file.modified_date.as_deref() {
            Some(raw) => parse_timestamp(raw).ok_or_else(|| {
                DriveError::InvalidResponse(format!(
                    "entry {} has unparseable modifiedDate {:?}",
                    file.id, raw
                ))
            })?,
            None => {
                return Err(DriveError::InvalidResponse(format!(
                    "entry {} has no modifiedDate",
                    file.id
                )))
            }
        };

        let last_viewed_date = file.last_viewed_by_me_date.as_deref().and_then(parse_timestamp);

        let mut download_links = file.export_links;
        if let Some(url) = file.download_url {
            download_links.insert(file.mime_type.clone(), url);
        }

        Ok(Self {
            is_hidden: file.labels.get("hidden").copied().unwrap_or(false),
            size: file.file_size.as_deref().and_then(|s| s.parse().ok()),
            parents: file.parents.into_iter().map(|p| p.id).collect(),
            id: file.id,
            title: file.title,
            mime_type: file.mime_type,
            modified_date,
            last_viewed_date,
            description: file.description,
            download_links,
            labels: file.labels,
        })
    }

    /// Download URL for `mime_type`, if the entry can be fetched in that form.
    pub fn download_url_for(&self, mime_type: &str) -> Option<&str> {
        self.download_links.get(mime_type).map(String::as_str)
    }

    /// Whether any label named in `flags` is set.
    pub fn is_flagged(&self, flags: &[String]) -> bool {
        flags
            .iter()
            .any(|flag| self.labels.get(flag).copied().unwrap_or(false))
    }

    pub fn is_directory(&self, directory_mime_type: &str) -> bool {
        self.mime_type == directory_mime_type
    }
}

/// One entry of the change feed.
///
/// `entry` is `None` exactly when `deleted` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub change_id: i64,
    pub entry_id: String,
    pub deleted: bool,
    pub entry: Option<NormalizedEntry>,
}

/// A page of the change feed, oldest change first.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFeedPage {
    pub records: Vec<ChangeRecord>,
    pub largest_change_id: i64,
    /// Present iff more pages remain
    pub next_page_token: Option<String>,
}

impl ChangeFeedPage {
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// Outcome of [`RemoteStore::download_entry`](crate::RemoteStore::download_entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDownloadDescriptor {
    pub path: PathBuf,
    pub size: u64,
    /// `false` on a cache hit
    pub changed: bool,
}

/// Optional attributes of a newly created entry.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub hidden: Option<bool>,
    pub description: Option<String>,
}

/// Everything `create_entry` needs.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub parents: Vec<String>,
    pub mime_type: String,
    pub data: Option<MediaSource>,
    pub options: EntryOptions,
}

/// Content uploaded alongside entry metadata.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// Read from a local file at upload time
    File(PathBuf),
    Bytes(Bytes),
}

/// Partial update of an existing entry. Only fields that are `Some` reach
/// the request body.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub parents: Option<Vec<String>>,
    pub hidden: Option<bool>,
    pub description: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub data: Option<MediaSource>,
}

impl EntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = Some(parents.into_iter().map(Into::into).collect());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn modified(mut self, at: DateTime<Utc>) -> Self {
        self.modified = Some(at);
        self
    }

    pub fn accessed(mut self, at: DateTime<Utc>) -> Self {
        self.accessed = Some(at);
        self
    }

    pub fn data(mut self, data: MediaSource) -> Self {
        self.data = Some(data);
        self
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC 3339 with milliseconds, the form the service emits.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wire(json: &str) -> DriveFile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalizes_binary_file() {
        let entry = NormalizedEntry::from_wire(wire(
            r#"{
                "id": "f1",
                "title": "notes.txt",
                "mimeType": "text/plain",
                "modifiedDate": "2024-03-01T10:20:30.000Z",
                "lastViewedByMeDate": "2024-03-02T00:00:00.000Z",
                "labels": {"hidden": true, "trashed": false},
                "downloadUrl": "https://media/f1",
                "parents": [{"id": "root"}, {"id": "p2"}],
                "fileSize": "12"
            }"#,
        ))
        .unwrap();

        assert_eq!(
            entry.modified_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap()
        );
        assert!(entry.last_viewed_date.is_some());
        assert!(entry.is_hidden);
        assert_eq!(entry.download_url_for("text/plain"), Some("https://media/f1"));
        assert_eq!(entry.parents, vec!["root", "p2"]);
        assert_eq!(entry.size, Some(12));
    }

    #[test]
    fn test_native_document_only_has_export_links() {
        let entry = NormalizedEntry::from_wire(wire(
            r#"{
                "id": "d1",
                "title": "Plan",
                "mimeType": "application/vnd.google-apps.document",
                "modifiedDate": "2024-03-01T10:20:30.000Z",
                "exportLinks": {"application/pdf": "https://export/pdf"}
            }"#,
        ))
        .unwrap();

        assert_eq!(entry.download_url_for("application/pdf"), Some("https://export/pdf"));
        assert!(entry
            .download_url_for("application/vnd.google-apps.document")
            .is_none());
        assert!(!entry.is_hidden);
    }

    #[test]
    fn test_missing_modified_date_is_rejected() {
        let result = NormalizedEntry::from_wire(wire(r#"{"id": "x", "title": "x"}"#));
        assert!(matches!(result, Err(DriveError::InvalidResponse(_))));

        let result = NormalizedEntry::from_wire(wire(
            r#"{"id": "x", "modifiedDate": "yesterday"}"#,
        ));
        assert!(matches!(result, Err(DriveError::InvalidResponse(_))));
    }

    #[test]
    fn test_is_flagged() {
        let entry = NormalizedEntry::from_wire(wire(
            r#"{"id": "x", "modifiedDate": "2024-01-01T00:00:00Z",
                "labels": {"trashed": true, "starred": false}}"#,
        ))
        .unwrap();

        assert!(entry.is_flagged(&["trashed".to_string()]));
        assert!(!entry.is_flagged(&["starred".to_string(), "hidden".to_string()]));
        assert!(!entry.is_flagged(&[]));
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-06T07:08:09.000Z");
    }
}
