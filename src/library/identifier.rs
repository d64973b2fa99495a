//! Content-based file identification.

use crate::catalog::{CatalogApi, RemoteVersion};
use crate::error::Result;
use crate::library::hashing::compute_sha256_async;
use std::path::Path;
use tracing::debug;

/// Identify a local file by hashing its content and asking the catalog
/// which version it belongs to.
///
/// `Ok(None)` means the catalog had no match for the hash. Errors cover
/// local read failures and transport/server failures; callers walking a
/// directory treat both outcomes as "skip this file".
pub async fn identify_file(
    catalog: &dyn CatalogApi,
    path: &Path,
    api_key: Option<&str>,
) -> Result<Option<RemoteVersion>> {
    let hash = compute_sha256_async(path).await?;
    debug!("Hashed {} -> {}", path.display(), hash);
    catalog.get_version_by_hash(&hash, api_key).await
}
