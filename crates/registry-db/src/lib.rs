//! Registry Database Layer
//!
//! `SQLite` persistence for crawled records using `SQLx` with embedded
//! migrations. One table per entity kind; every write is an upsert on the
//! kind's natural key, so re-crawling a company updates its rows in place.
//!
//! # Example
//!
//! ```ignore
//! use registry_db::Database;
//!
//! let db = Database::new("data/aiqicha/registry.db").await?;
//! db.run_migrations().await?;
//! db.upsert(&record).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod records;

pub use error::{DatabaseError, Result};

use registry_core::{CompanyId, CompanyRecord, CrawlRecord, EntityKind};
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Connection pool plus the record operations.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database at `path` (or `:memory:`).
    ///
    /// Parent directories of a file path are created. Migrations are not run;
    /// call [`Database::run_migrations`].
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Open the database and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Number of applied migrations.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Underlying `SQLx` pool for custom queries.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Insert or update `record` by its natural key.
    pub async fn upsert(&self, record: &CrawlRecord) -> Result<()> {
        records::upsert(&self.pool, record).await
    }

    /// Stored record of `kind` with natural `key`.
    pub async fn get_record(&self, kind: EntityKind, key: &[&str]) -> Result<Option<CrawlRecord>> {
        records::get_record(&self.pool, kind, key).await
    }

    /// Stored company profile.
    pub async fn get_company(&self, id: &CompanyId) -> Result<Option<CompanyRecord>> {
        records::get_company(&self.pool, id).await
    }

    /// Row count of `kind`.
    pub async fn count(&self, kind: EntityKind) -> Result<i64> {
        records::count(&self.pool, kind).await
    }

    /// Close every pooled connection.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
