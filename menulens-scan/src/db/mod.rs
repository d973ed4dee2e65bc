//! Database access for menulens-scan
//!
//! One SQLite file (`menulens.db`) in the root folder holds the offline
//! cuisine snapshots.

pub mod cuisine_cache;

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Open (creating if needed) the database and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Create database folder {}", parent.display()))?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    debug!("Connecting to database: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .with_context(|| format!("Open database {}", db_path.display()))?;

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;
    info!("Opened database: {}", db_path.display());
    Ok(pool)
}

/// In-memory database for tests and throwaway runs
///
/// Single connection, since every `:memory:` connection is its own database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("Open in-memory database")?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create menulens-scan tables if missing
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cuisine_cache (
            cuisine TEXT PRIMARY KEY,
            version INTEGER NOT NULL DEFAULT 0,
            dishes TEXT NOT NULL DEFAULT '[]',
            fetched_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Create cuisine_cache table")?;

    debug!("Database tables initialized (cuisine_cache)");
    Ok(())
}
