//! HTTP streaming for artifact downloads.

pub mod fetcher;

pub use fetcher::{fetch_to_path, ProgressFn};
