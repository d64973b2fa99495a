//! Remote catalog payload types.
//!
//! These mirror the catalog's JSON responses. Fields the core does not
//! interpret are kept in flattened `extra` maps so a serialized model is
//! the full catalog payload, not a lossy projection — the metadata
//! sidecar written next to a weight file must round-trip everything the
//! catalog sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model as returned by the catalog's model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteModel {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(rename = "modelVersions", default)]
    pub versions: Vec<RemoteVersion>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RemoteModel {
    /// Locate a version by id within this model's version list.
    pub fn find_version(&self, version_id: i64) -> Option<&RemoteVersion> {
        self.versions.iter().find(|v| v.id == version_id)
    }
}

/// One release of a model, with its file set and preview images.
///
/// Both the nested entries of a model payload and the standalone
/// by-hash lookup response deserialize into this type; only the latter
/// reliably carries `model_id` and the `model` summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteVersion {
    pub id: i64,
    #[serde(rename = "modelId", default)]
    pub model_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub images: Vec<RemoteImage>,
    /// Parent-model summary present on by-hash responses.
    #[serde(default)]
    pub model: Option<VersionModelInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RemoteVersion {
    /// The file to download: the first one flagged primary, falling
    /// back to the first file in catalog order.
    pub fn primary_file(&self) -> Option<&RemoteFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }

    /// First preview image URL, if the version has any.
    pub fn preview_image_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

/// Parent-model summary embedded in a by-hash version response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionModelInfo {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A downloadable file belonging to a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A preview image belonging to a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteImage {
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model_json() -> &'static str {
        r#"{
            "id": 101,
            "name": "Example Model",
            "type": "Checkpoint",
            "nsfw": false,
            "creator": {"username": "someone"},
            "modelVersions": [
                {
                    "id": 2001,
                    "modelId": 101,
                    "name": "v1.0",
                    "baseModel": "SD 1.5",
                    "files": [
                        {"name": "example-v1.safetensors", "primary": true,
                         "downloadUrl": "https://catalog.test/files/1"},
                        {"name": "example-v1.ckpt",
                         "downloadUrl": "https://catalog.test/files/2"}
                    ],
                    "images": [{"url": "https://catalog.test/img/1.jpeg", "width": 512}]
                }
            ]
        }"#
    }

    #[test]
    fn test_parse_model() {
        let model: RemoteModel = serde_json::from_str(sample_model_json()).unwrap();
        assert_eq!(model.id, 101);
        assert_eq!(model.model_type, "Checkpoint");
        assert_eq!(model.versions.len(), 1);
        assert!(model.find_version(2001).is_some());
        assert!(model.find_version(9999).is_none());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let model: RemoteModel = serde_json::from_str(sample_model_json()).unwrap();
        let out = serde_json::to_value(&model).unwrap();
        // Fields the core does not interpret survive serialization.
        assert_eq!(out["nsfw"], serde_json::json!(false));
        assert_eq!(out["creator"]["username"], serde_json::json!("someone"));
        assert_eq!(
            out["modelVersions"][0]["baseModel"],
            serde_json::json!("SD 1.5")
        );
    }

    #[test]
    fn test_primary_file_selection() {
        let model: RemoteModel = serde_json::from_str(sample_model_json()).unwrap();
        let version = model.find_version(2001).unwrap();
        assert_eq!(
            version.primary_file().unwrap().name,
            "example-v1.safetensors"
        );
    }

    #[test]
    fn test_primary_file_falls_back_to_first() {
        let version: RemoteVersion = serde_json::from_str(
            r#"{"id": 1, "files": [
                {"name": "a.pt", "downloadUrl": "u1"},
                {"name": "b.pt", "downloadUrl": "u2"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(version.primary_file().unwrap().name, "a.pt");
    }

    #[test]
    fn test_by_hash_response_shape() {
        let version: RemoteVersion = serde_json::from_str(
            r#"{
                "id": 2001, "modelId": 101,
                "model": {"name": "Example Model", "type": "LORA"},
                "files": [], "images": []
            }"#,
        )
        .unwrap();
        assert_eq!(version.model_id, 101);
        assert!(version.primary_file().is_none());
        let info = version.model.unwrap();
        assert_eq!(info.model_type, "LORA");
    }
}
