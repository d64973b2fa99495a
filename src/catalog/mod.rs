//! Remote catalog access.
//!
//! The synchronization core talks to the catalog through the
//! [`CatalogApi`] trait; [`CivitaiClient`] is the production
//! implementation. Tests substitute an in-memory catalog.

pub mod client;
pub mod types;

pub use client::CivitaiClient;
pub use types::{RemoteFile, RemoteImage, RemoteModel, RemoteVersion, VersionModelInfo};

use crate::error::Result;
use crate::network::ProgressFn;
use async_trait::async_trait;
use std::path::Path;

/// The four catalog operations the core needs.
///
/// `get_version_by_hash` returns `Ok(None)` when the catalog has no
/// match for the hash; transport and server failures are errors. Both
/// outcomes are non-fatal to reconciliation callers.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch a full model payload by id.
    async fn get_model(&self, model_id: i64, api_key: Option<&str>) -> Result<RemoteModel>;

    /// Look up a model version by the SHA-256 of one of its files.
    async fn get_version_by_hash(
        &self,
        sha256: &str,
        api_key: Option<&str>,
    ) -> Result<Option<RemoteVersion>>;

    /// Stream a remote resource to a local path with progress reporting.
    async fn fetch_file(
        &self,
        url: &str,
        dest: &Path,
        api_key: Option<&str>,
        on_progress: Option<&ProgressFn>,
    ) -> Result<u64>;
}
