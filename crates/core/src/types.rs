//! Response shapes returned by the Dropbox files endpoints

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File or folder descriptor as returned by Dropbox.
///
/// Only the fields every entry shares are typed; everything else the server
/// sends (sizes, revisions, timestamps...) is kept in `extra` so the value
/// serializes back to the object it was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// "file", "folder" or "deleted"
    #[serde(rename = ".tag", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn is_folder(&self) -> bool {
        self.tag.as_deref() == Some("folder")
    }

    /// File size in bytes, for file entries
    pub fn size(&self) -> Option<u64> {
        self.extra.get("size").and_then(Value::as_u64)
    }

    /// `server_modified` timestamp as sent (RFC 3339)
    pub fn server_modified(&self) -> Option<&str> {
        self.extra.get("server_modified").and_then(Value::as_str)
    }

    /// Best display path available, falling back to the bare name
    pub fn display_path(&self) -> &str {
        self.path_display
            .as_deref()
            .or(self.path_lower.as_deref())
            .unwrap_or(&self.name)
    }
}

/// One page of a folder listing, or several pages merged together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

/// `{ "metadata": {...} }` wrapper used by delete and create folder
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MetadataEnvelope {
    pub metadata: Metadata,
}

/// Body of `list_folder/get_latest_cursor`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LatestCursor {
    pub cursor: String,
}

/// Body of a successful upload, kept exactly as received.
///
/// Depending on the API version the server answers with either
/// `{"metadata": {...}}` or the bare file metadata object;
/// [`UploadResult::metadata`] reads both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadResult(pub Value);

impl UploadResult {
    /// The decoded body, untouched
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    /// Metadata of the uploaded file, from either body shape
    pub fn metadata(&self) -> Option<Metadata> {
        let inner = self.0.get("metadata").unwrap_or(&self.0);
        serde_json::from_value(inner.clone()).ok()
    }
}

/// Result of a create folder call.
///
/// A 409 is not an error for this operation: the server body is handed back
/// untouched. It usually carries `error`/`error_summary` rather than
/// `metadata`, so it is not forced into a [`Metadata`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateFolderOutcome {
    Created(Metadata),
    Conflict(Value),
}

impl CreateFolderOutcome {
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            CreateFolderOutcome::Created(metadata) => Some(metadata),
            CreateFolderOutcome::Conflict(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CreateFolderOutcome::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_keeps_unknown_fields() {
        let raw = json!({
            ".tag": "file",
            "name": "report.csv",
            "id": "id:a4ayc_80_OEAAAAAAAAAXw",
            "path_lower": "/docs/report.csv",
            "path_display": "/Docs/report.csv",
            "size": 7212,
            "server_modified": "2024-05-12T15:50:38Z",
            "rev": "a1c10ce0dd78"
        });

        let metadata: Metadata = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(metadata.name, "report.csv");
        assert!(!metadata.is_folder());
        assert_eq!(metadata.size(), Some(7212));
        assert_eq!(metadata.server_modified(), Some("2024-05-12T15:50:38Z"));
        assert_eq!(metadata.display_path(), "/Docs/report.csv");
        assert_eq!(serde_json::to_value(&metadata).unwrap(), raw);
    }

    #[test]
    fn test_metadata_name_only() {
        let metadata: Metadata = serde_json::from_value(json!({"name": "a"})).unwrap();

        assert_eq!(metadata.tag, None);
        assert_eq!(metadata.display_path(), "a");
        assert!(metadata.extra.is_empty());
        assert_eq!(serde_json::to_value(&metadata).unwrap(), json!({"name": "a"}));
    }

    #[test]
    fn test_metadata_without_name() {
        let metadata: Metadata = serde_json::from_value(json!({".tag": "deleted", "path_lower": "/gone"})).unwrap();

        assert_eq!(metadata.name, "");
        assert_eq!(metadata.display_path(), "/gone");
        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({".tag": "deleted", "path_lower": "/gone"})
        );
    }

    #[test]
    fn test_upload_result_reads_both_shapes() {
        let wrapped = UploadResult(json!({"metadata": {"name": "f.bin", "size": 5}}));
        let bare = UploadResult(json!({".tag": "file", "name": "f.bin", "size": 5}));

        assert_eq!(wrapped.metadata().map(|m| m.name), Some("f.bin".to_string()));
        assert_eq!(bare.metadata().and_then(|m| m.size()), Some(5));
        assert_eq!(wrapped.as_json(), &json!({"metadata": {"name": "f.bin", "size": 5}}));
        assert!(UploadResult(json!("ok")).metadata().is_none());
    }

    #[test]
    fn test_create_folder_outcome_accessors() {
        let created = CreateFolderOutcome::Created(
            serde_json::from_value(json!({".tag": "folder", "name": "x"})).unwrap(),
        );
        let conflict = CreateFolderOutcome::Conflict(json!({"error_summary": "path/conflict"}));

        assert_eq!(created.metadata().map(|m| m.name.as_str()), Some("x"));
        assert!(!created.is_conflict());
        assert!(conflict.metadata().is_none());
        assert!(conflict.is_conflict());
    }
}
