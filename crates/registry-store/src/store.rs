use crate::batch::BatchSink;
use crate::error::Result;
use crate::RecordSink;
use async_trait::async_trait;
use registry_core::{CrawlRecord, StorageConfig};
use registry_db::Database;

/// Relational upsert followed by the batched file sink.
///
/// The row is written first; a record only reaches the files once the
/// database has accepted it.
#[derive(Debug)]
pub struct RecordStore {
    db: Database,
    files: BatchSink,
}

impl RecordStore {
    pub fn new(db: Database, files: BatchSink) -> Self {
        Self { db, files }
    }

    /// Open the database (running migrations) and the file sink described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let db = Database::open(&config.database_path).await?;
        let files = BatchSink::new(&config.output_dir, config.batch_size);
        tracing::info!(
            database = %config.database_path.display(),
            output_dir = %config.output_dir.display(),
            batch_size = config.batch_size,
            "Record store opened"
        );
        Ok(Self::new(db, files))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn files(&self) -> &BatchSink {
        &self.files
    }
}

#[async_trait]
impl RecordSink for RecordStore {
    async fn store(&self, record: CrawlRecord) -> Result<()> {
        self.db.upsert(&record).await?;
        self.files.store(record).await
    }

    async fn close(&self) -> Result<()> {
        let flushed = self.files.close().await;
        self.db.pool().close().await;
        flushed
    }
}
