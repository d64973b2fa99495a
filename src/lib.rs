//! model-mirror — background synchronization core for a local mirror of
//! a remote model catalog.
//!
//! The crate keeps a directory tree of model weight files, preview
//! images, and metadata sidecars in agreement with a remote catalog and
//! with a local record store. All work runs through a serialized
//! [`TaskQueue`]: callers enqueue download or scan tasks and poll a
//! status surface; a single background worker executes them strictly in
//! order.
//!
//! # Example
//!
//! ```rust,ignore
//! use model_mirror::{
//!     CivitaiClient, MirrorConfig, SqliteStore, SyncContext, TaskQueue,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> model_mirror::Result<()> {
//!     let catalog = Arc::new(CivitaiClient::new()?);
//!     let store = Arc::new(SqliteStore::open("mirror.db")?);
//!     let config = MirrorConfig::default();
//!
//!     let queue = TaskQueue::start(SyncContext::new(catalog, store, config));
//!     let task = queue.enqueue_download(101, 2001, None);
//!     println!("queued {}", task.id());
//!
//!     queue.wait_until_idle().await;
//!     println!("{:?}", queue.status().recent_history);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod library;
pub mod network;
pub mod queue;
pub mod store;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use catalog::{CatalogApi, CivitaiClient, RemoteFile, RemoteImage, RemoteModel, RemoteVersion};
pub use config::{MirrorConfig, MODEL_TYPES, WEIGHT_EXTENSIONS};
pub use error::{MirrorError, Result};
pub use library::{download_version, scan_directory, ScanOutcome, SyncContext};
pub use network::ProgressFn;
pub use queue::{QueueStatus, TaskHandle, TaskKind, TaskQueue, TaskSnapshot, TaskStatus};
pub use store::{DownloadRecord, FileRole, RecordStore, SqliteStore};
