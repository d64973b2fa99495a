//! Library maintenance: hashing, naming, identification, download
//! orchestration, and directory reconciliation.

pub mod downloader;
pub mod hashing;
pub mod identifier;
pub mod naming;
pub mod scanner;

pub use downloader::download_version;
pub use scanner::{scan_directory, ScanOutcome};

use crate::catalog::CatalogApi;
use crate::config::MirrorConfig;
use crate::store::RecordStore;
use std::sync::Arc;

/// Shared collaborators threaded through task handlers.
#[derive(Clone)]
pub struct SyncContext {
    pub catalog: Arc<dyn CatalogApi>,
    pub store: Arc<dyn RecordStore>,
    pub config: MirrorConfig,
}

impl SyncContext {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        store: Arc<dyn RecordStore>,
        config: MirrorConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }
}
