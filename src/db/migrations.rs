//! Database migrations and initialization for the position ledger.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Open (creating if needed) the ledger database and bring its schema up to date.
///
/// Safe to call on an existing file: every statement in `schema.sql` is
/// idempotent and the global lock row is only seeded once.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas_conn(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!(path = %db_path, "Ledger database ready");
    Ok(pool)
}

const SCHEMA: &str = include_str!("schema.sql");

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements: Vec<&str> = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!(statements = statements.len(), "Ledger schema applied");
    Ok(())
}

/// Per-connection pragmas. Positions and the per-user profile tables carry
/// foreign keys to `users`.
async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode reports the mode actually in effect
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);

    for pragma in ["PRAGMA busy_timeout = 5000", "PRAGMA synchronous = NORMAL"] {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }

    debug!(journal_mode = %journal_mode, "SQLite connection configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fresh_db() -> (SqlitePool, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("nested/ledger.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (pool, db_path, temp_dir)
    }

    #[tokio::test]
    async fn test_init_db_creates_missing_directories() {
        let (_pool, db_path, _temp) = fresh_db().await;
        assert!(Path::new(&db_path).exists());
    }

    #[tokio::test]
    async fn test_ledger_tables_exist() {
        let (pool, _path, _temp) = fresh_db().await;

        for table in [
            "users",
            "user_recommends",
            "positions",
            "balances",
            "rewards",
            "deposit_records",
            "user_areas",
            "global_lock",
        ] {
            let result: (String,) = sqlx::query_as(
                "SELECT name FROM sqlite_master WHERE type='table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("query failed");
            assert_eq!(result.0, table);
        }
    }

    #[tokio::test]
    async fn test_rerun_keeps_single_unlocked_lock_row() {
        let (pool, _path, _temp) = fresh_db().await;
        run_migrations(&pool).await.expect("second run failed");

        let result: (i64, i64) = sqlx::query_as("SELECT COUNT(*), MAX(status) FROM global_lock")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result, (1, 0));
    }

    #[tokio::test]
    async fn test_pragmas_applied() {
        let (pool, _path, _temp) = fresh_db().await;

        let result: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        // WAL can fall back depending on the filesystem
        assert!(matches!(result.0.as_str(), "wal" | "delete"));
    }
}
