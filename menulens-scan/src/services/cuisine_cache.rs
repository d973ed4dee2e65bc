//! Cuisine snapshot sources for cache matching
//!
//! [`CuisineCacheStore`] keeps one snapshot per cuisine in SQLite and
//! refreshes it from `<snapshot_base_url>/<cuisine>.json` once it is older
//! than the TTL. Any failure degrades to the stale snapshot, or to an empty
//! list when there is none; cache problems never fail a scan.

use crate::db::cuisine_cache::{get_cuisine, put_cuisine, CuisineCacheRow};
use async_trait::async_trait;
use chrono::Utc;
use menulens_common::CachedDish;
use reqwest::Client;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Supplies cached dishes for a cuisine
#[async_trait]
pub trait CuisineSource: Send + Sync {
    /// Snapshot for `cuisine`; empty when unavailable
    async fn load_cuisine(&self, cuisine: &str) -> Vec<CachedDish>;
}

/// Why a snapshot could not be read or refreshed
#[derive(Debug, Error)]
pub enum CacheUnavailable {
    #[error("Storage error: {0}")]
    Storage(#[from] menulens_common::Error),

    #[error("Snapshot fetch failed: {0}")]
    Fetch(String),

    #[error("No snapshot URL configured")]
    NoSnapshotUrl,
}

/// Downloadable snapshot body
#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    version: i64,
    #[serde(default)]
    dishes: Vec<CachedDish>,
}

/// SQLite-backed snapshot store with HTTP refresh
pub struct CuisineCacheStore {
    db: SqlitePool,
    http_client: Client,
    snapshot_base_url: Option<String>,
    ttl: chrono::Duration,
}

impl CuisineCacheStore {
    pub fn new(db: SqlitePool, snapshot_base_url: Option<String>, ttl: Duration) -> Self {
        Self {
            db,
            http_client: Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
            snapshot_base_url,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(7)),
        }
    }

    /// Store a snapshot directly, stamped now
    pub async fn seed(&self, cuisine: &str, version: i64, dishes: Vec<CachedDish>) -> Result<(), CacheUnavailable> {
        put_cuisine(
            &self.db,
            &CuisineCacheRow {
                cuisine: cuisine.to_string(),
                version,
                dishes,
                fetched_at: Utc::now(),
            },
        )
        .await?;
        Ok(())
    }

    fn is_fresh(&self, row: &CuisineCacheRow) -> bool {
        Utc::now().signed_duration_since(row.fetched_at) < self.ttl
    }

    async fn refresh(&self, cuisine: &str) -> Result<CuisineCacheRow, CacheUnavailable> {
        let base = self
            .snapshot_base_url
            .as_deref()
            .ok_or(CacheUnavailable::NoSnapshotUrl)?;
        let url = format!("{}/{}.json", base, cuisine);
        debug!(url = %url, "Fetching cuisine snapshot");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CacheUnavailable::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CacheUnavailable::Fetch(format!("{} returned {}", url, response.status())));
        }
        let snapshot: Snapshot = response
            .json()
            .await
            .map_err(|e| CacheUnavailable::Fetch(format!("Unreadable snapshot: {}", e)))?;

        let row = CuisineCacheRow {
            cuisine: cuisine.to_string(),
            version: snapshot.version,
            dishes: snapshot.dishes,
            fetched_at: Utc::now(),
        };
        put_cuisine(&self.db, &row).await?;

        info!(cuisine, version = row.version, dishes = row.dishes.len(), "Cuisine snapshot refreshed");
        Ok(row)
    }
}

#[async_trait]
impl CuisineSource for CuisineCacheStore {
    async fn load_cuisine(&self, cuisine: &str) -> Vec<CachedDish> {
        let stored = match get_cuisine(&self.db, cuisine).await {
            Ok(row) => row,
            Err(e) => {
                warn!(cuisine, error = %e, "Reading cuisine cache failed");
                None
            }
        };

        if let Some(row) = &stored {
            if self.is_fresh(row) {
                return row.dishes.clone();
            }
        }

        match self.refresh(cuisine).await {
            Ok(row) => row.dishes,
            Err(CacheUnavailable::NoSnapshotUrl) => stored.map(|r| r.dishes).unwrap_or_default(),
            Err(e) => {
                warn!(
                    cuisine,
                    error = %e,
                    stale = stored.is_some(),
                    "Cuisine snapshot refresh failed"
                );
                stored.map(|r| r.dishes).unwrap_or_default()
            }
        }
    }
}

/// Fixed in-memory snapshots
#[derive(Debug, Clone, Default)]
pub struct StaticCuisineSource {
    cuisines: HashMap<String, Vec<CachedDish>>,
}

impl StaticCuisineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cuisine(mut self, cuisine: &str, dishes: Vec<CachedDish>) -> Self {
        self.cuisines.insert(cuisine.to_string(), dishes);
        self
    }
}

#[async_trait]
impl CuisineSource for StaticCuisineSource {
    async fn load_cuisine(&self, cuisine: &str) -> Vec<CachedDish> {
        self.cuisines.get(cuisine).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;
    use menulens_common::Dish;

    fn entry(id: &str) -> CachedDish {
        CachedDish {
            dish: Dish {
                id: id.into(),
                name_english: "Pho Bo".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fresh_snapshot_served_from_db() {
        let db = init_memory_pool().await.unwrap();
        let store = CuisineCacheStore::new(db, None, Duration::from_secs(3600));
        store.seed("vietnamese", 3, vec![entry("vn-1")]).await.unwrap();

        let dishes = store.load_cuisine("vietnamese").await;
        assert_eq!(dishes.len(), 1);
        assert_eq!(dishes[0].dish.id, "vn-1");
    }

    #[tokio::test]
    async fn test_stale_snapshot_served_when_refresh_unavailable() {
        let db = init_memory_pool().await.unwrap();
        let store = CuisineCacheStore::new(db, None, Duration::ZERO);
        store.seed("vietnamese", 1, vec![entry("vn-1")]).await.unwrap();

        let dishes = store.load_cuisine("vietnamese").await;
        assert_eq!(dishes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_cuisine_is_empty() {
        let db = init_memory_pool().await.unwrap();
        let store = CuisineCacheStore::new(db, None, Duration::from_secs(3600));

        assert!(store.load_cuisine("thai").await.is_empty());
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticCuisineSource::new().with_cuisine("thai", vec![entry("th-1")]);
        assert_eq!(source.load_cuisine("thai").await.len(), 1);
        assert!(source.load_cuisine("korean").await.is_empty());
    }
}
