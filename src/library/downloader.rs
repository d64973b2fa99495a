//! Download orchestration for a single (model, version) pair.

use crate::cancel::CancellationToken;
use crate::config::dir_setting_key;
use crate::error::{MirrorError, Result};
use crate::library::naming::{image_extension_for_url, sanitize_filename, split_base_ext};
use crate::library::SyncContext;
use crate::network::ProgressFn;
use crate::store::{DownloadRecord, FileRole};
use std::path::PathBuf;
use tracing::{info, warn};

/// Download a model version's weight file, preview image, and metadata
/// sidecar, then upsert the download record.
///
/// The target directory comes from the `dir_<type>` setting, falling
/// back to the configured download root. Only the weight-file stream
/// reports granular progress; the image and metadata writes are small.
///
/// Returns the model's display name. Any step error aborts the whole
/// operation; files written by earlier steps are left in place (a kept
/// simplicity tradeoff — a re-run overwrites them).
pub async fn download_version(
    ctx: &SyncContext,
    model_id: i64,
    version_id: i64,
    api_key: Option<&str>,
    on_progress: Option<&ProgressFn>,
    cancel: &CancellationToken,
) -> Result<String> {
    let report = |pct: u8, msg: &str| {
        if let Some(progress) = on_progress {
            progress(pct, Some(msg));
        }
    };

    // Resolve the version inside the fresh model payload
    report(0, "Fetching model details...");
    let model = ctx.catalog.get_model(model_id, api_key).await?;
    let version = model
        .find_version(version_id)
        .ok_or(MirrorError::VersionNotFound {
            model_id,
            version_id,
        })?;

    let base_dir = resolve_type_dir(ctx, &model.model_type)?;
    if !base_dir.exists() {
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| MirrorError::io_with_path(e, &base_dir))?;
    }

    let primary = version
        .primary_file()
        .ok_or(MirrorError::NoFilesAvailable { version_id })?;

    let (base, model_ext) = split_base_ext(&primary.name);
    let safe_base = sanitize_filename(base);
    let model_path = base_dir.join(format!("{}{}", safe_base, model_ext));

    let mut files = std::collections::BTreeMap::new();

    cancel.check()?;
    report(0, "Downloading model file...");
    info!(
        "Downloading version {} of model {} to {}",
        version_id,
        model_id,
        model_path.display()
    );
    ctx.catalog
        .fetch_file(&primary.download_url, &model_path, api_key, on_progress)
        .await?;
    files.insert(FileRole::Model, model_path.display().to_string());

    // Preview assets are public; no credential is sent
    if let Some(image_url) = version.preview_image_url() {
        cancel.check()?;
        report(100, "Downloading preview image...");
        let image_path = base_dir.join(format!(
            "{}{}",
            safe_base,
            image_extension_for_url(image_url)
        ));
        ctx.catalog
            .fetch_file(image_url, &image_path, None, None)
            .await?;
        files.insert(FileRole::Image, image_path.display().to_string());
    } else {
        warn!("Version {} has no preview images", version_id);
    }

    cancel.check()?;
    report(100, "Saving metadata...");
    let metadata_path = base_dir.join(format!("{}.metadata.json", safe_base));
    let payload = serde_json::to_string_pretty(&model)?;
    tokio::fs::write(&metadata_path, payload)
        .await
        .map_err(|e| MirrorError::io_with_path(e, &metadata_path))?;
    files.insert(FileRole::Metadata, metadata_path.display().to_string());

    let mut record = match ctx.store.find_by_pair(model_id, version_id)? {
        Some(existing) => existing,
        None => DownloadRecord::new(model_id, version_id, &model.name, &model.model_type),
    };
    record.name = model.name.clone();
    record.model_type = model.model_type.clone();
    record.files = files;
    ctx.store.upsert(&record)?;

    Ok(model.name)
}

/// Directory for a model type: the `dir_<type>` setting when configured
/// and non-empty, else the default under the download root.
pub fn resolve_type_dir(ctx: &SyncContext, model_type: &str) -> Result<PathBuf> {
    match ctx.store.get_setting(&dir_setting_key(model_type))? {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Ok(ctx.config.default_type_dir(model_type)),
    }
}
