//! Google Drive API wire types
//!
//! Data structures for the Drive v2 REST payloads. Nothing here leaves the
//! crate unnormalized; see [`crate::entry`] for the caller-facing records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Drive v2 file resource
///
/// See: https://developers.google.com/drive/api/v2/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub mime_type: String,

    /// RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,

    /// RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_by_me_date: Option<String>,

    /// `hidden`, `trashed`, `starred`, `restricted`, `viewed`
    #[serde(default)]
    pub labels: HashMap<String, bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Export MIME type to URL, for native Google documents
    #[serde(default)]
    pub export_links: HashMap<String, String>,

    /// Direct media URL, for uploaded binary content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(default)]
    pub parents: Vec<ParentReference>,

    /// Decimal string, absent for folders and native documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentReference {
    pub id: String,
}

/// `files.list` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub items: Vec<DriveFile>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// `changes.list` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeList {
    #[serde(default)]
    pub items: Vec<DriveChange>,

    #[serde(deserialize_with = "int64_from_wire")]
    pub largest_change_id: i64,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Change resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveChange {
    #[serde(deserialize_with = "int64_from_wire")]
    pub id: i64,

    pub file_id: String,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default)]
    pub file: Option<DriveFile>,
}

/// `children.list` and `parents.list` responses
#[derive(Debug, Deserialize)]
pub struct ReferenceList {
    #[serde(default)]
    pub items: Vec<ParentReference>,
}

/// Metadata body for `files.insert` and `files.update`.
///
/// Absent fields are omitted from the JSON rather than sent as defaults.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<ParentReference>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelsBody>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_viewed_by_me_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LabelsBody {
    pub hidden: bool,
}

/// Drive v2 encodes 64-bit integers as JSON strings; accept both forms.
fn int64_from_wire<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(i64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Number(n) => Ok(n),
        Wire::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_file() {
        let json = r#"{
            "kind": "drive#file",
            "id": "0B1",
            "title": "report.pdf",
            "mimeType": "application/pdf",
            "modifiedDate": "2024-02-03T04:05:06.789Z",
            "labels": {"starred": false, "hidden": false, "trashed": true},
            "downloadUrl": "https://doc-0.googleusercontent.com/x",
            "parents": [{"kind": "drive#parentReference", "id": "root", "isRoot": true}],
            "fileSize": "2048"
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.title, "report.pdf");
        assert_eq!(file.labels.get("trashed"), Some(&true));
        assert_eq!(file.parents[0].id, "root");
        assert_eq!(file.file_size.as_deref(), Some("2048"));
        assert!(file.export_links.is_empty());
    }

    #[test]
    fn test_deserialize_change_list_with_string_ids() {
        let json = r#"{
            "kind": "drive#changeList",
            "largestChangeId": "9001",
            "nextPageToken": "page-2",
            "items": [
                {"id": "41", "fileId": "a", "deleted": true},
                {"id": 42, "fileId": "b", "deleted": false,
                 "file": {"id": "b", "title": "b.txt", "mimeType": "text/plain",
                          "modifiedDate": "2024-01-01T00:00:00.000Z"}}
            ]
        }"#;

        let changes: ChangeList = serde_json::from_str(json).unwrap();
        assert_eq!(changes.largest_change_id, 9001);
        assert_eq!(changes.items[0].id, 41);
        assert!(changes.items[0].file.is_none());
        assert_eq!(changes.items[1].id, 42);
        assert_eq!(changes.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_invalid_change_id_is_rejected() {
        let json = r#"{"largestChangeId": "not-a-number", "items": []}"#;
        assert!(serde_json::from_str::<ChangeList>(json).is_err());
    }

    #[test]
    fn test_metadata_body_omits_absent_fields() {
        let body = FileMetadataBody {
            title: Some("renamed".to_string()),
            modified_date: Some("2024-01-01T00:00:00.000Z".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&body).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["title"], "renamed");
        assert!(object.contains_key("modifiedDate"));
    }
}
