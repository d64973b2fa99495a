//! Directory reconciliation against the remote catalog.
//!
//! Walks a configured directory, identifies weight files by content
//! hash, backfills missing sidecars, and upserts download records. One
//! unidentifiable or failing file never aborts the scan; it is logged
//! and skipped.

use crate::cancel::CancellationToken;
use crate::error::{MirrorError, Result};
use crate::library::identifier::identify_file;
use crate::library::naming::{
    find_preview_sidecar, image_extension_for_url, is_weight_file, metadata_sidecar,
    split_base_ext,
};
use crate::library::SyncContext;
use crate::network::ProgressFn;
use crate::store::{DownloadRecord, FileRole};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of reconciling one directory.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Number of created records and backfilled sidecars.
    pub updated: usize,
    /// Human-readable summary.
    pub message: String,
    /// Every (model_id, version_id) pair confirmed present.
    pub found: HashSet<(i64, i64)>,
}

impl ScanOutcome {
    fn empty(message: impl Into<String>) -> Self {
        Self {
            updated: 0,
            message: message.into(),
            found: HashSet::new(),
        }
    }
}

/// Reconcile `directory` (of catalog type `model_type`) against the
/// catalog.
///
/// A missing directory yields a zero outcome rather than an error so a
/// multi-directory scan can keep going. Candidates are regular files
/// directly inside the directory with a recognized weight extension.
pub async fn scan_directory(
    ctx: &SyncContext,
    directory: &Path,
    model_type: &str,
    api_key: Option<&str>,
    on_progress: Option<&ProgressFn>,
    cancel: &CancellationToken,
) -> Result<ScanOutcome> {
    if !directory.is_dir() {
        warn!("Scan directory does not exist: {}", directory.display());
        return Ok(ScanOutcome::empty("Directory does not exist"));
    }

    let mut candidates: Vec<(PathBuf, String)> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            is_weight_file(&name).then(|| (entry.into_path(), name))
        })
        .collect();
    candidates.sort();

    let total = candidates.len();
    info!(
        "Scanning {} ({} candidate files)",
        directory.display(),
        total
    );

    let mut processed = 0usize;
    let mut updated = 0usize;
    let mut found: HashSet<(i64, i64)> = HashSet::new();

    for (filepath, filename) in &candidates {
        cancel.check()?;

        processed += 1;
        if let Some(progress) = on_progress {
            let pct = ((processed * 100) / total) as u8;
            progress(pct, Some(&format!("Scanning {}...", filename)));
        }

        let (base, _ext) = split_base_ext(filename);
        let metadata_path = metadata_sidecar(directory, base);
        let existing_image = find_preview_sidecar(directory, base);

        // Identity always comes from the content hash, never from a
        // possibly stale metadata sidecar.
        let version = match identify_file(ctx.catalog.as_ref(), filepath, api_key).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                debug!("No catalog match for {}", filename);
                continue;
            }
            Err(e) => {
                warn!("Failed to identify {}: {}", filename, e);
                continue;
            }
        };

        let version_id = version.id;
        let model_id = version.model_id;

        // Presence is established the moment the hash matches: later
        // sidecar or store failures must not make the file look
        // missing, or the prune pass would delete its record.
        found.insert((model_id, version_id));

        let (model_name, model_type_api) = match &version.model {
            Some(info) => (info.name.clone(), info.model_type.clone()),
            None => ("Unknown Model".to_string(), model_type.to_string()),
        };

        let mut files: BTreeMap<FileRole, String> = BTreeMap::new();
        files.insert(FileRole::Model, filepath.display().to_string());

        // Backfill the metadata sidecar from a fresh full-model fetch
        if metadata_path.exists() {
            files.insert(FileRole::Metadata, metadata_path.display().to_string());
        } else {
            match backfill_metadata(ctx, model_id, api_key, &metadata_path).await {
                Ok(()) => {
                    files.insert(FileRole::Metadata, metadata_path.display().to_string());
                    updated += 1;
                }
                Err(e) => warn!("Failed to download metadata for {}: {}", filename, e),
            }
        }

        // Backfill the preview image
        match existing_image {
            Some(image_path) => {
                files.insert(FileRole::Image, image_path.display().to_string());
            }
            None => {
                if let Some(image_url) = version.preview_image_url() {
                    let image_path = directory.join(format!(
                        "{}{}",
                        base,
                        image_extension_for_url(image_url)
                    ));
                    match ctx
                        .catalog
                        .fetch_file(image_url, &image_path, api_key, None)
                        .await
                    {
                        Ok(_) => {
                            files.insert(FileRole::Image, image_path.display().to_string());
                            updated += 1;
                        }
                        Err(e) => warn!("Failed to download image for {}: {}", filename, e),
                    }
                }
            }
        }

        // Create the record, or refresh the files map of an existing one
        // (paths may have changed); only creation counts as an update.
        match ctx.store.find_by_pair(model_id, version_id) {
            Ok(Some(mut existing)) => {
                existing.files = files;
                if let Err(e) = ctx.store.upsert(&existing) {
                    warn!("Failed to refresh record for {}: {}", filename, e);
                    continue;
                }
            }
            Ok(None) => {
                let mut record =
                    DownloadRecord::new(model_id, version_id, model_name, model_type_api);
                record.files = files;
                if let Err(e) = ctx.store.upsert(&record) {
                    warn!("Failed to create record for {}: {}", filename, e);
                    continue;
                }
                updated += 1;
            }
            Err(e) => {
                warn!("Record lookup failed for {}: {}", filename, e);
                continue;
            }
        }
    }

    Ok(ScanOutcome {
        updated,
        message: format!("Scanned {} files, updated {} models.", total, updated),
        found,
    })
}

async fn backfill_metadata(
    ctx: &SyncContext,
    model_id: i64,
    api_key: Option<&str>,
    metadata_path: &Path,
) -> Result<()> {
    let model = ctx.catalog.get_model(model_id, api_key).await?;
    let payload = serde_json::to_string_pretty(&model)?;
    tokio::fs::write(metadata_path, payload)
        .await
        .map_err(|e| MirrorError::io_with_path(e, metadata_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::store::SqliteStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Catalog whose every lookup fails at the transport level.
    struct UnreachableCatalog;

    #[async_trait::async_trait]
    impl crate::catalog::CatalogApi for UnreachableCatalog {
        async fn get_model(
            &self,
            model_id: i64,
            _api_key: Option<&str>,
        ) -> Result<crate::catalog::RemoteModel> {
            Err(MirrorError::HttpStatus {
                url: format!("test://models/{}", model_id),
                status: 503,
            })
        }

        async fn get_version_by_hash(
            &self,
            _sha256: &str,
            _api_key: Option<&str>,
        ) -> Result<Option<crate::catalog::RemoteVersion>> {
            Err(MirrorError::HttpStatus {
                url: "test://by-hash".to_string(),
                status: 503,
            })
        }

        async fn fetch_file(
            &self,
            url: &str,
            _dest: &Path,
            _api_key: Option<&str>,
            _on_progress: Option<&ProgressFn>,
        ) -> Result<u64> {
            Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    fn make_ctx() -> SyncContext {
        SyncContext::new(
            Arc::new(UnreachableCatalog),
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            MirrorConfig::with_download_root("/tmp/unused"),
        )
    }

    #[tokio::test]
    async fn test_missing_directory_is_zero_outcome() {
        let ctx = make_ctx();
        let cancel = CancellationToken::new();
        let outcome = scan_directory(
            &ctx,
            Path::new("/nonexistent/models"),
            "Checkpoint",
            None,
            None,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome.updated, 0);
        assert!(outcome.found.is_empty());
        assert_eq!(outcome.message, "Directory does not exist");
    }

    #[tokio::test]
    async fn test_lookup_failures_skip_files_not_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.safetensors"), b"aaa").unwrap();
        std::fs::write(dir.path().join("b.ckpt"), b"bbb").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let ctx = make_ctx();
        let cancel = CancellationToken::new();
        let outcome = scan_directory(&ctx, dir.path(), "Checkpoint", None, None, &cancel)
            .await
            .unwrap();

        // Both weight files hit the unreachable catalog and are skipped;
        // the scan itself still completes.
        assert_eq!(outcome.updated, 0);
        assert!(outcome.found.is_empty());
        assert_eq!(outcome.message, "Scanned 2 files, updated 0 models.");
    }

    /// Catalog that hash-matches every file to version (11, 110) but
    /// fails all other lookups.
    struct MatchedCatalog;

    #[async_trait::async_trait]
    impl crate::catalog::CatalogApi for MatchedCatalog {
        async fn get_model(
            &self,
            model_id: i64,
            _api_key: Option<&str>,
        ) -> Result<crate::catalog::RemoteModel> {
            Err(MirrorError::HttpStatus {
                url: format!("test://models/{}", model_id),
                status: 503,
            })
        }

        async fn get_version_by_hash(
            &self,
            _sha256: &str,
            _api_key: Option<&str>,
        ) -> Result<Option<crate::catalog::RemoteVersion>> {
            Ok(Some(crate::catalog::RemoteVersion {
                id: 110,
                model_id: 11,
                name: "v1".to_string(),
                files: Vec::new(),
                images: Vec::new(),
                model: Some(crate::catalog::VersionModelInfo {
                    name: "Matched Model".to_string(),
                    model_type: "Checkpoint".to_string(),
                    extra: serde_json::Map::new(),
                }),
                extra: serde_json::Map::new(),
            }))
        }

        async fn fetch_file(
            &self,
            url: &str,
            _dest: &Path,
            _api_key: Option<&str>,
            _on_progress: Option<&ProgressFn>,
        ) -> Result<u64> {
            Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    /// Store whose writes fail, as a disk-full or locked database would.
    struct RejectingStore {
        inner: SqliteStore,
    }

    impl crate::store::RecordStore for RejectingStore {
        fn get_setting(&self, key: &str) -> Result<Option<String>> {
            self.inner.get_setting(key)
        }

        fn set_setting(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set_setting(key, value)
        }

        fn find_by_pair(&self, model_id: i64, version_id: i64) -> Result<Option<DownloadRecord>> {
            self.inner.find_by_pair(model_id, version_id)
        }

        fn upsert(&self, _record: &DownloadRecord) -> Result<()> {
            Err(MirrorError::Database {
                message: "database is locked".to_string(),
                source: None,
            })
        }

        fn delete(&self, model_id: i64, version_id: i64) -> Result<bool> {
            self.inner.delete(model_id, version_id)
        }

        fn list_all(&self) -> Result<Vec<DownloadRecord>> {
            self.inner.list_all()
        }

        fn distinct_types(&self) -> Result<Vec<String>> {
            self.inner.distinct_types()
        }
    }

    #[tokio::test]
    async fn test_identified_file_counts_as_found_when_store_write_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.safetensors"), b"aaa").unwrap();

        let ctx = SyncContext::new(
            Arc::new(MatchedCatalog),
            Arc::new(RejectingStore {
                inner: SqliteStore::open_in_memory().unwrap(),
            }),
            MirrorConfig::with_download_root("/tmp/unused"),
        );
        let cancel = CancellationToken::new();
        let outcome = scan_directory(&ctx, dir.path(), "Checkpoint", None, None, &cancel)
            .await
            .unwrap();

        // The hash matched, so the file is present no matter what the
        // store said about writing its record.
        assert!(outcome.found.contains(&(11, 110)));
        assert_eq!(outcome.updated, 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.safetensors"), b"aaa").unwrap();

        let ctx = make_ctx();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = scan_directory(&ctx, dir.path(), "Checkpoint", None, None, &cancel).await;
        assert!(matches!(result, Err(MirrorError::Cancelled)));
    }
}
