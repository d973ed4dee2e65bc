//! `cuisine_cache` table operations

use chrono::{DateTime, Utc};
use menulens_common::{CachedDish, Error, Result};
use sqlx::{Pool, Sqlite};

/// One stored cuisine snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CuisineCacheRow {
    pub cuisine: String,
    pub version: i64,
    pub dishes: Vec<CachedDish>,
    pub fetched_at: DateTime<Utc>,
}

/// Load a cuisine snapshot
///
/// **Returns:** `None` when the cuisine has never been stored
pub async fn get_cuisine(db: &Pool<Sqlite>, cuisine: &str) -> Result<Option<CuisineCacheRow>> {
    let row: Option<(String, i64, String, String)> = sqlx::query_as(
        "SELECT cuisine, version, dishes, fetched_at FROM cuisine_cache WHERE cuisine = ?",
    )
    .bind(cuisine)
    .fetch_optional(db)
    .await?;

    let Some((cuisine, version, dishes, fetched_at)) = row else {
        return Ok(None);
    };

    let dishes: Vec<CachedDish> = serde_json::from_str(&dishes)?;
    let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
        .map_err(|e| Error::Internal(format!("Bad fetched_at for {}: {}", cuisine, e)))?
        .with_timezone(&Utc);

    Ok(Some(CuisineCacheRow {
        cuisine,
        version,
        dishes,
        fetched_at,
    }))
}

/// Insert or replace a cuisine snapshot
pub async fn put_cuisine(db: &Pool<Sqlite>, row: &CuisineCacheRow) -> Result<()> {
    let dishes = serde_json::to_string(&row.dishes)?;

    sqlx::query(
        r#"
        INSERT INTO cuisine_cache (cuisine, version, dishes, fetched_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(cuisine) DO UPDATE SET
            version = excluded.version,
            dishes = excluded.dishes,
            fetched_at = excluded.fetched_at
        "#,
    )
    .bind(&row.cuisine)
    .bind(row.version)
    .bind(dishes)
    .bind(row.fetched_at.to_rfc3339())
    .execute(db)
    .await?;

    Ok(())
}

/// Names of every stored cuisine
pub async fn list_cuisines(db: &Pool<Sqlite>) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT cuisine FROM cuisine_cache ORDER BY cuisine")
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(c,)| c).collect())
}
