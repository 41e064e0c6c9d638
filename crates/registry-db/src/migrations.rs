//! Embedded schema migrations.

use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Sqlite};

/// Apply every migration under `migrations/` that has not run yet.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Highest applied migration version, or 0 before the first run.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let table_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?
        > 0;

    if !table_exists {
        return Ok(0);
    }

    let version =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::open_pool;
    use registry_core::EntityKind;

    #[tokio::test]
    async fn test_run_migrations_creates_one_table_per_kind() {
        let pool = open_pool(":memory:").await.expect("open pool");
        run_migrations(&pool).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query tables");

        let mut expected: Vec<&str> = EntityKind::ALL.iter().map(EntityKind::table_name).collect();
        expected.sort_unstable();
        assert_eq!(tables, expected);
    }

    #[tokio::test]
    async fn test_table_columns_match_record_fields() {
        let pool = open_pool(":memory:").await.expect("open pool");
        run_migrations(&pool).await.expect("run migrations");

        for kind in EntityKind::ALL {
            let columns: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT name FROM pragma_table_info('{}') WHERE name NOT IN ('id', 'updated_at') ORDER BY cid",
                kind.table_name()
            ))
            .fetch_all(&pool)
            .await
            .expect("query columns");
            assert_eq!(columns, kind.columns(), "schema drift in {}", kind.table_name());
        }
    }

    #[tokio::test]
    async fn test_schema_version() {
        let pool = open_pool(":memory:").await.expect("open pool");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 0);

        run_migrations(&pool).await.expect("run migrations");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 1);

        // idempotent
        run_migrations(&pool).await.expect("rerun migrations");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 1);
    }
}
