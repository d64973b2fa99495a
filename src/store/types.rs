//! Persistent record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical role of a file tracked by a download record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// The weight file itself. Mandatory once a record exists.
    Model,
    /// Preview image sidecar.
    Image,
    /// Metadata JSON sidecar.
    Metadata,
}

impl FileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Model => "model",
            FileRole::Image => "image",
            FileRole::Metadata => "metadata",
        }
    }
}

/// One locally materialized (model, version) pair.
///
/// Identity is the `(model_id, version_id)` pair, unique together; a
/// model may have several versions, each with its own record.
/// `created_at` is set once on creation and preserved across upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub model_id: i64,
    pub version_id: i64,
    /// Display name from the catalog.
    pub name: String,
    /// Catalog model-type string.
    pub model_type: String,
    /// Role → absolute local path.
    pub files: BTreeMap<FileRole, String>,
    pub created_at: DateTime<Utc>,
}

impl DownloadRecord {
    /// Create a fresh record with an empty files map.
    pub fn new(
        model_id: i64,
        version_id: i64,
        name: impl Into<String>,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            model_id,
            version_id,
            name: name.into(),
            model_type: model_type.into(),
            files: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Path of the weight file, if recorded.
    pub fn model_path(&self) -> Option<&str> {
        self.files.get(&FileRole::Model).map(String::as_str)
    }

    /// Path of the preview image, if recorded.
    pub fn image_path(&self) -> Option<&str> {
        self.files.get(&FileRole::Image).map(String::as_str)
    }

    /// The identity pair.
    pub fn pair(&self) -> (i64, i64) {
        (self.model_id, self.version_id)
    }
}
