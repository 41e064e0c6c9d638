//! Upsert and lookup of crawled records.
//!
//! Statements are built from [`EntityKind::columns`] and
//! [`EntityKind::key_columns`], so every kind shares one code path. Table and
//! column names only ever come from those static lists.

use crate::error::{DatabaseError, Result};
use registry_core::{CompanyId, CompanyRecord, CrawlRecord, EntityKind};
use serde_json::Value;
use sqlx::{Pool, Sqlite};

/// Columns holding a JSON-encoded list.
fn is_list_column(column: &str) -> bool {
    column.ends_with("_list")
}

/// A row value in the form `SQLite` stores it.
#[derive(Debug, Clone, PartialEq)]
enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<Option<&Value>> for SqlValue {
    fn from(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Null,
            Some(Value::Bool(b)) => Self::Integer(i64::from(*b)),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Real))
                .unwrap_or(Self::Null),
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(other) => Self::Text(other.to_string()),
        }
    }
}

fn upsert_sql(kind: EntityKind) -> String {
    let columns = kind.columns();
    let keys = kind.key_columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = columns
        .iter()
        .filter(|c| !keys.contains(*c))
        .map(|c| format!("{c} = excluded.{c}"))
        .chain(std::iter::once("updated_at = datetime('now')".to_string()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {table} ({columns}) VALUES ({placeholders}) \
         ON CONFLICT({keys}) DO UPDATE SET {updates}",
        table = kind.table_name(),
        columns = columns.join(", "),
        keys = keys.join(", "),
    )
}

fn select_sql(kind: EntityKind) -> String {
    let fields = kind
        .columns()
        .iter()
        .map(|c| {
            if is_list_column(c) {
                format!("'{c}', json({c})")
            } else {
                format!("'{c}', {c}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let filter = kind
        .key_columns()
        .iter()
        .map(|k| format!("{k} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "SELECT json_object({fields}) FROM {table} WHERE {filter}",
        table = kind.table_name()
    )
}

fn decode_record(kind: EntityKind, value: Value) -> serde_json::Result<CrawlRecord> {
    Ok(match kind {
        EntityKind::Company => CrawlRecord::Company(serde_json::from_value(value)?),
        EntityKind::Shareholder => CrawlRecord::Shareholder(serde_json::from_value(value)?),
        EntityKind::LegalCase => CrawlRecord::LegalCase(serde_json::from_value(value)?),
        EntityKind::IntellectualProperty => {
            CrawlRecord::IntellectualProperty(serde_json::from_value(value)?)
        }
        EntityKind::Bidding => CrawlRecord::Bidding(serde_json::from_value(value)?),
        EntityKind::AnnualReport => CrawlRecord::AnnualReport(serde_json::from_value(value)?),
        EntityKind::ChangeRecord => CrawlRecord::ChangeRecord(serde_json::from_value(value)?),
        EntityKind::Branch => CrawlRecord::Branch(serde_json::from_value(value)?),
        EntityKind::RelatedCompany => CrawlRecord::RelatedCompany(serde_json::from_value(value)?),
    })
}

/// Insert `record`, or overwrite the mutable columns of the row with the same natural key.
pub async fn upsert(pool: &Pool<Sqlite>, record: &CrawlRecord) -> Result<()> {
    let kind = record.kind();
    let row = record
        .to_row()
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

    let values: Vec<SqlValue> = kind
        .columns()
        .iter()
        .map(|column| {
            let value = row.get(*column);
            if is_list_column(column) {
                // Lists are stored as JSON text even when empty.
                let list = value.cloned().unwrap_or(Value::Array(Vec::new()));
                SqlValue::Text(list.to_string())
            } else {
                SqlValue::from(value)
            }
        })
        .collect();

    let sql = upsert_sql(kind);
    let mut query = sqlx::query(&sql);
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(i) => query.bind(i),
            SqlValue::Real(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
        };
    }
    query.execute(pool).await?;

    tracing::trace!(
        kind = %kind,
        company_id = %record.company_id(),
        "Upserted {}",
        kind.table_name()
    );
    Ok(())
}

/// Look a record up by its natural key, in [`EntityKind::key_columns`] order.
pub async fn get_record(
    pool: &Pool<Sqlite>,
    kind: EntityKind,
    key: &[&str],
) -> Result<Option<CrawlRecord>> {
    if key.len() != kind.key_columns().len() {
        return Err(DatabaseError::Decode(format!(
            "{kind} key needs {} parts, got {}",
            kind.key_columns().len(),
            key.len()
        )));
    }

    let sql = select_sql(kind);
    let mut query = sqlx::query_scalar::<_, String>(&sql);
    for part in key {
        query = query.bind(*part);
    }

    let Some(json) = query.fetch_optional(pool).await? else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(&json)
        .map_err(|e| DatabaseError::Decode(format!("{kind} row is not JSON: {e}")))?;
    decode_record(kind, value)
        .map(Some)
        .map_err(|e| DatabaseError::Decode(format!("{kind} row: {e}")))
}

/// Stored company profile.
pub async fn get_company(pool: &Pool<Sqlite>, id: &CompanyId) -> Result<Option<CompanyRecord>> {
    match get_record(pool, EntityKind::Company, &[id.as_str()]).await? {
        Some(CrawlRecord::Company(company)) => Ok(Some(company)),
        Some(other) => Err(DatabaseError::Decode(format!(
            "companies row decoded as {}",
            other.kind()
        ))),
        None => Ok(None),
    }
}

/// Number of stored rows of `kind`.
pub async fn count(pool: &Pool<Sqlite>, kind: EntityKind) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table_name());
    Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?)
}
