//! Configuration for the mirror core.
//!
//! Constant tables for network behavior and catalog vocabulary, plus the
//! per-instance `MirrorConfig` handed to the task queue.

use std::path::PathBuf;
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    /// Total deadline for JSON endpoint requests. Never applied to
    /// file downloads, which can legitimately stream for hours.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// Connection-establishment bound for the download client.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
    /// Per-read stall bound for the download client.
    pub const READ_TIMEOUT: Duration = Duration::from_secs(60);
    pub const USER_AGENT: &'static str = "model-mirror/0.1";
    pub const CATALOG_BASE_URL: &'static str = "https://civitai.com/api/v1";
}

/// Catalog model types that can have a configured mirror directory.
///
/// Each type maps to a `dir_<type>` settings key; only types with a
/// non-empty configured directory participate in scans.
pub const MODEL_TYPES: &[&str] = &[
    "Checkpoint",
    "Embedding",
    "Hypernetwork",
    "AestheticGradient",
    "LORA",
    "LyCORIS",
    "DoRA",
    "Controlnet",
    "Upscaler",
    "Motion",
    "VAE",
    "Poses",
    "Wildcards",
    "Workflows",
    "Detection",
    "Other",
];

/// Recognized weight-file extensions (lowercase, with leading dot).
pub const WEIGHT_EXTENSIONS: &[&str] = &[".safetensors", ".ckpt", ".pt", ".bin"];

/// Settings key for the configured directory of a catalog model type.
pub fn dir_setting_key(model_type: &str) -> String {
    format!("dir_{}", model_type)
}

/// Per-instance configuration for the synchronization core.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Fallback root for downloads; a model type without a configured
    /// directory lands in `<download_root>/<type>`.
    pub download_root: PathBuf,
}

impl MirrorConfig {
    /// Create a config with an explicit download root.
    pub fn with_download_root(download_root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
        }
    }

    /// Default directory for a model type when no `dir_<type>` setting
    /// exists.
    pub fn default_type_dir(&self, model_type: &str) -> PathBuf {
        self.download_root.join(model_type)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("model-mirror")
            .join("downloads");
        Self {
            download_root: root,
        }
    }
}
