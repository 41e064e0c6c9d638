//! Batched file output.
//!
//! Accepted records are buffered behind one lock and written per entity
//! kind to `<kind>.json` (the full array, rewritten through a temp file) and
//! `<kind>.csv` (appended, header only when the file is created). The CSV
//! column set is the kind's declared column list, so files never drift
//! between flushes.
//!
//! `store` succeeds once a record is buffered. A failed flush keeps the
//! affected kinds buffered for the next attempt; `close` reports a flush
//! that still fails.

use crate::error::{Result, StoreError};
use crate::RecordSink;
use async_trait::async_trait;
use registry_core::{CrawlRecord, EntityKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct BatchState {
    pending: Vec<CrawlRecord>,
    closed: bool,
}

/// Buffers records and flushes them to JSON and CSV files every `batch_size` records.
#[derive(Debug)]
pub struct BatchSink {
    output_dir: PathBuf,
    batch_size: usize,
    state: Mutex<BatchState>,
    flushes: AtomicUsize,
}

impl BatchSink {
    pub fn new(output_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            batch_size: batch_size.max(1),
            state: Mutex::new(BatchState::default()),
            flushes: AtomicUsize::new(0),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Completed flushes so far.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Records accepted but not yet written.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub fn json_path(&self, kind: EntityKind) -> PathBuf {
        self.output_dir.join(format!("{}.json", kind.file_stem()))
    }

    pub fn csv_path(&self, kind: EntityKind) -> PathBuf {
        self.output_dir.join(format!("{}.csv", kind.file_stem()))
    }

    /// Write every pending record, one entity kind at a time.
    ///
    /// A kind leaves the buffer only once both of its files hold its rows.
    /// Kinds that failed stay pending and are retried whole by the next
    /// flush; kinds that were written are never written again.
    async fn flush_locked(&self, state: &mut BatchState) -> Result<()> {
        if state.pending.is_empty() {
            return Ok(());
        }

        let mut grouped: BTreeMap<EntityKind, Vec<&CrawlRecord>> = BTreeMap::new();
        for record in &state.pending {
            grouped.entry(record.kind()).or_default().push(record);
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| io_error(&self.output_dir, source))?;

        let mut written = Vec::new();
        let mut first_error = None;
        for (kind, records) in &grouped {
            match self.flush_kind(*kind, records).await {
                Ok(()) => written.push(*kind),
                Err(e) => {
                    tracing::error!(kind = %kind, records = records.len(), "Failed to flush: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        drop(grouped);
        let before = state.pending.len();
        state.pending.retain(|record| !written.contains(&record.kind()));
        let flushed = before - state.pending.len();

        if let Some(e) = first_error {
            return Err(e);
        }
        let flushes = self.flushes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            records = flushed,
            kinds = written.len(),
            flushes,
            "Flushed batch to {}",
            self.output_dir.display()
        );
        Ok(())
    }

    /// Write one kind's rows to both files, or to neither.
    async fn flush_kind(&self, kind: EntityKind, records: &[&CrawlRecord]) -> Result<()> {
        let rows = records
            .iter()
            .map(|record| record.to_row())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let json_path = self.json_path(kind);
        let staged = self.stage_json(&json_path, &rows).await?;

        let csv_path = self.csv_path(kind);
        let appended = match self.append_csv(&csv_path, kind, &rows).await {
            Ok(appended) => appended,
            Err(e) => {
                discard(&staged).await;
                return Err(e);
            }
        };

        if let Err(source) = tokio::fs::rename(&staged, &json_path).await {
            rollback_csv(&csv_path, appended).await;
            discard(&staged).await;
            return Err(io_error(&json_path, source));
        }
        Ok(())
    }

    /// Write the merged JSON array next to `path` and return the temp file.
    async fn stage_json(&self, path: &Path, rows: &[Map<String, Value>]) -> Result<PathBuf> {
        let mut existing: Vec<Value> = match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(io_error(path, source)),
        };
        existing.extend(rows.iter().cloned().map(Value::Object));

        let body = serde_json::to_vec_pretty(&existing).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        Ok(tmp)
    }

    /// Append `rows` and return the file length before the append
    /// (`None` when the file was created). A failed write is truncated away.
    async fn append_csv(
        &self,
        path: &Path,
        kind: EntityKind,
        rows: &[Map<String, Value>],
    ) -> Result<Option<u64>> {
        let previous = tokio::fs::metadata(path).await.ok().map(|m| m.len());
        let columns = kind.columns();

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        if previous.is_none() {
            writer.write_record(columns)?;
        }
        for row in rows {
            writer.write_record(columns.iter().map(|column| csv_cell(row.get(*column))))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| io_error(path, e.into_error()))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| io_error(path, source))?;
        let written = match file.write_all(&bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            drop(file);
            rollback_csv(path, previous).await;
            return Err(io_error(path, source));
        }
        Ok(previous)
    }
}

/// Undo an append: cut the file back to `previous` bytes, or remove it if
/// the append created it.
async fn rollback_csv(path: &Path, previous: Option<u64>) {
    let undone = match previous {
        Some(len) => match tokio::fs::OpenOptions::new().write(true).open(path).await {
            Ok(file) => file.set_len(len).await,
            Err(e) => Err(e),
        },
        None => tokio::fs::remove_file(path).await,
    };
    if let Err(e) = undone {
        tracing::warn!(path = %path.display(), "Could not roll back CSV append: {}", e);
    }
}

async fn discard(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        tracing::debug!(path = %tmp.display(), "Could not remove temp file: {}", e);
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl RecordSink for BatchSink {
    async fn store(&self, record: CrawlRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(StoreError::Closed);
        }
        state.pending.push(record);
        if state.pending.len() >= self.batch_size {
            // Accepted records stay buffered; the next store or close retries.
            if let Err(e) = self.flush_locked(&mut state).await {
                tracing::warn!(
                    pending = state.pending.len(),
                    "Batch flush failed, keeping records buffered: {}",
                    e
                );
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        self.flush_locked(&mut state).await?;
        state.closed = true;
        tracing::debug!("Batch sink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_cell() {
        assert_eq!(csv_cell(None), "");
        assert_eq!(csv_cell(Some(&Value::Null)), "");
        assert_eq!(csv_cell(Some(&Value::from("甲"))), "甲");
        assert_eq!(csv_cell(Some(&Value::from(5_000_000.0))), "5000000.0");
        assert_eq!(
            csv_cell(Some(&serde_json::json!(["a", "b"]))),
            r#"["a","b"]"#
        );
    }

    #[test]
    fn test_paths() {
        let sink = BatchSink::new("/tmp/out", 0);
        assert_eq!(sink.batch_size, 1);
        assert_eq!(
            sink.json_path(EntityKind::LegalCase),
            PathBuf::from("/tmp/out/legal_case.json")
        );
        assert_eq!(
            sink.csv_path(EntityKind::Company),
            PathBuf::from("/tmp/out/company.csv")
        );
    }
}
