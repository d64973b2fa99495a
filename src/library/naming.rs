//! Filesystem-safe naming and sidecar path derivation.
//!
//! A mirrored version is three sibling files sharing a sanitized base
//! name: the weight file, a preview image, and `<base>.metadata.json`.

use crate::config::WEIGHT_EXTENSIONS;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Characters illegal in filenames on at least one supported platform.
static ILLEGAL_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());

/// Preview-image sidecar extensions, probed in this order.
const PREVIEW_EXTENSIONS: &[&str] = &[".webp", ".png", ".jpg", ".jpeg", ".preview.png"];

/// Strip characters that are illegal in paths from a filename.
pub fn sanitize_filename(name: &str) -> String {
    ILLEGAL_CHARS.replace_all(name, "").to_string()
}

/// Split a filename into (base, extension-with-dot).
///
/// A name with no dot yields an empty extension.
pub fn split_base_ext(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos..]),
        None => (filename, ""),
    }
}

/// True if the filename carries a recognized weight extension.
pub fn is_weight_file(filename: &str) -> bool {
    let (_, ext) = split_base_ext(filename);
    let ext = ext.to_lowercase();
    WEIGHT_EXTENSIONS.contains(&ext.as_str())
}

/// Sniff a preview image's extension from its URL.
///
/// `.png` and `.jpg`/`.jpeg` are kept; everything else is saved as the
/// default image format.
pub fn image_extension_for_url(url: &str) -> &'static str {
    if url.contains(".png") {
        ".png"
    } else if url.contains(".jpeg") || url.contains(".jpg") {
        ".jpg"
    } else {
        ".webp"
    }
}

/// Path of the metadata sidecar for a base name inside `dir`.
pub fn metadata_sidecar(dir: &Path, base: &str) -> PathBuf {
    dir.join(format!("{}.metadata.json", base))
}

/// First existing preview-image sidecar for a base name inside `dir`.
pub fn find_preview_sidecar(dir: &Path, base: &str) -> Option<PathBuf> {
    PREVIEW_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}{}", base, ext)))
        .find(|candidate| candidate.exists())
}
