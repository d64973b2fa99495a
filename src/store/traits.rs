//! Record store contract.

use crate::error::Result;
use crate::store::types::DownloadRecord;

/// Persistence operations the synchronization core requires.
///
/// All operations are synchronous to match rusqlite's API; they are
/// only invoked from within the worker's task handling (plus settings
/// reads from embedding code), so contention stays low.
pub trait RecordStore: Send + Sync {
    /// Read a setting value. `Ok(None)` means unconfigured.
    fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) a setting value.
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    /// Find the record for a (model, version) pair.
    fn find_by_pair(&self, model_id: i64, version_id: i64) -> Result<Option<DownloadRecord>>;

    /// Insert or update a record keyed by its (model, version) pair.
    ///
    /// On update, `created_at` keeps its original value.
    fn upsert(&self, record: &DownloadRecord) -> Result<()>;

    /// Delete the record for a pair. Returns whether a row was removed.
    fn delete(&self, model_id: i64, version_id: i64) -> Result<bool>;

    /// All records, in insertion order.
    fn list_all(&self) -> Result<Vec<DownloadRecord>>;

    /// Distinct model-type strings across all records.
    fn distinct_types(&self) -> Result<Vec<String>>;
}
