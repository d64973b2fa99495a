//! Local record store: settings and download records.

pub mod sqlite;
pub mod traits;
pub mod types;

pub use sqlite::SqliteStore;
pub use traits::RecordStore;
pub use types::{DownloadRecord, FileRole};
