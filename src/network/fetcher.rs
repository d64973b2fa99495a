//! Streaming artifact fetcher with progress reporting.
//!
//! Streams a remote body chunk-by-chunk to disk so gigabyte-scale weight
//! files never sit in memory. Writes go through a `.part` temp file that
//! is renamed into place on completion, so a destination path is never
//! half-visible. There is no retry and no byte-range resume; retrying is
//! the caller's concern at task granularity.

use crate::error::{MirrorError, Result};
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Progress callback: integer percentage 0-100 plus an optional
/// human-readable step description.
pub type ProgressFn = Arc<dyn Fn(u8, Option<&str>) + Send + Sync>;

/// Suffix for in-flight temp files.
const TEMP_SUFFIX: &str = ".part";

/// Integer download percentage, `floor(bytes * 100 / total)`.
fn percent(bytes: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((bytes.saturating_mul(100) / total).min(100)) as u8
}

/// Stream `url` to `dest`, reporting integer percentage progress.
///
/// Progress fires after each chunk when the response declares a content
/// length; without a declared length no progress fires and the caller
/// learns of completion only from the returned result. A non-2xx status
/// is an error carrying the status code. The credential, when present,
/// is sent as a bearer token.
///
/// Returns the number of bytes written.
pub async fn fetch_to_path(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    api_key: Option<&str>,
    on_progress: Option<&ProgressFn>,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;
        }
    }

    let temp_path = PathBuf::from(format!("{}{}", dest.display(), TEMP_SUFFIX));

    match stream_to_temp(client, url, &temp_path, api_key, on_progress).await {
        Ok(bytes) => {
            std::fs::rename(&temp_path, dest).map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                MirrorError::io_with_path(e, dest)
            })?;
            info!("Downloaded {} bytes to {}", bytes, dest.display());
            Ok(bytes)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

async fn stream_to_temp(
    client: &reqwest::Client,
    url: &str,
    temp_path: &Path,
    api_key: Option<&str>,
    on_progress: Option<&ProgressFn>,
) -> Result<u64> {
    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| MirrorError::Network {
        message: format!("GET {} failed: {}", url, e),
        cause: Some(e.to_string()),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(MirrorError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total_bytes = response.content_length();
    debug!(
        "Streaming {} to {} (declared length: {:?})",
        url,
        temp_path.display(),
        total_bytes
    );

    let mut file =
        std::fs::File::create(temp_path).map_err(|e| MirrorError::io_with_path(e, temp_path))?;

    let mut bytes_written: u64 = 0;
    let mut last_percent: u8 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| MirrorError::DownloadFailed {
            url: url.to_string(),
            message: format!("Error reading download stream: {}", e),
        })?;

        file.write_all(&chunk)
            .map_err(|e| MirrorError::io_with_path(e, temp_path))?;
        bytes_written += chunk.len() as u64;

        if let (Some(total), Some(progress)) = (total_bytes, on_progress) {
            let pct = percent(bytes_written, total);
            if pct > last_percent {
                last_percent = pct;
                progress(pct, None);
            }
        }
    }

    file.flush()
        .map_err(|e| MirrorError::io_with_path(e, temp_path))?;

    Ok(bytes_written)
}
