//! Registry Store
//!
//! Where accepted records go. [`RecordStore`] upserts each record into
//! SQLite and then hands it to a [`BatchSink`], which buffers records and
//! writes them to per-kind JSON and CSV files in batches.
//!
//! Callers must [`RecordSink::close`] the sink on every exit path; close
//! drains whatever is still buffered.

pub mod batch;
pub mod error;
pub mod store;

pub use batch::BatchSink;
pub use error::{Result, StoreError};
pub use store::RecordStore;

use async_trait::async_trait;
use registry_core::CrawlRecord;

/// Destination for normalized records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Accept one record.
    async fn store(&self, record: CrawlRecord) -> Result<()>;

    /// Write anything still buffered. Further `store` calls may fail.
    async fn close(&self) -> Result<()>;
}
