use registry_db::DatabaseError;
use thiserror::Error;

/// Failures while persisting records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("record serialization failed: {0}")]
    Serialization(String),

    #[error("store is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, StoreError>;
