//! Cache matching against stored cuisine snapshots

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use menulens_scan::services::{CacheMatcher, CuisineCacheStore, StaticCuisineSource};
use menulens_scan::types::ScanContext;

async fn seeded_matcher() -> CacheMatcher {
    let db = menulens_scan::db::init_memory_pool().await.unwrap();
    let store = CuisineCacheStore::new(db, None, Duration::from_secs(7 * 24 * 3600));
    store.seed("korean", 4, korean_cache()).await.unwrap();
    CacheMatcher::new(Arc::new(store))
}

#[tokio::test]
async fn test_kimchi_jjigae_hits_by_key_and_substring() {
    let matcher = seeded_matcher().await;
    let mut ctx = ScanContext::new();

    let exact = [raw_dish("dish-1", "Kimchi Jjigae", "김치찌개", "South Korea")];
    let result = matcher.match_dishes(&exact, &mut ctx).await;
    assert_eq!(result.cuisine.as_deref(), Some("korean"));
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].id, "dish-1");
    assert_eq!(result.hits[0].price, "9,000");
    assert_eq!(result.hits[0].description, "Spicy fermented cabbage stew");
    assert!(result.miss_ids.is_empty());

    let mut ctx = ScanContext::new();
    let stew = [raw_dish("dish-1", "Kimchi-jjigae Stew", "", "South Korea")];
    let result = matcher.match_dishes(&stew, &mut ctx).await;
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].name_english, "Kimchi Jjigae");
    assert_eq!(result.hits[0].name_local, "김치찌개");
}

#[tokio::test]
async fn test_matching_is_injective_per_scan() {
    let matcher = seeded_matcher().await;
    let mut ctx = ScanContext::new();
    let menu = [
        raw_dish("dish-1", "Kimchi Jjigae", "", "South Korea"),
        raw_dish("dish-2", "Kimchi Jjigae", "김치찌개", "South Korea"),
        raw_dish("dish-3", "Bulgogi", "", "South Korea"),
    ];

    let result = matcher.match_dishes(&menu, &mut ctx).await;

    let hit_ids: Vec<&str> = result.hits.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(hit_ids, vec!["dish-1", "dish-3"]);
    assert_eq!(
        result.miss_ids.iter().cloned().collect::<Vec<_>>(),
        vec!["dish-2".to_string()]
    );
    assert!(ctx.used_cache_ids.contains("kr-001"));
    assert!(ctx.used_cache_ids.contains("kr-002"));
}

#[tokio::test]
async fn test_hit_images_follow_raw_ids() {
    let matcher = seeded_matcher().await;
    let mut ctx = ScanContext::new();
    let menu = [
        raw_dish("dish-1", "Bulgogi", "", "Korea"),
        raw_dish("dish-2", "Kimchi Jjigae", "", "Korea"),
    ];

    let result = matcher.match_dishes(&menu, &mut ctx).await;

    assert_eq!(
        result.hit_images.get("dish-1"),
        Some(&vec!["https://img.example/bulgogi.jpg".to_string()])
    );
    assert_eq!(
        result.hit_images.get("dish-2"),
        Some(&vec!["https://img.example/kimchi-1.jpg".to_string()])
    );
}

#[tokio::test]
async fn test_shared_image_urls_kept_for_every_hit() {
    let shared = "https://img.example/stew.jpg".to_string();
    let mut cache = korean_cache();
    cache[0].image_urls.push(shared.clone());
    cache[1].image_url = None;
    cache[1].image_urls = vec![shared.clone()];
    let matcher = CacheMatcher::new(Arc::new(
        StaticCuisineSource::new().with_cuisine("korean", cache),
    ));
    let mut ctx = ScanContext::new();
    let menu = [
        raw_dish("dish-1", "Kimchi Jjigae", "", "South Korea"),
        raw_dish("dish-2", "Bulgogi", "", "South Korea"),
    ];

    let result = matcher.match_dishes(&menu, &mut ctx).await;

    assert_eq!(
        result.hit_images["dish-1"],
        vec!["https://img.example/kimchi-1.jpg".to_string(), shared.clone()]
    );
    assert_eq!(result.hit_images["dish-2"], vec![shared.clone()]);
    assert!(ctx.used_image_urls.contains(&shared));
}

#[tokio::test]
async fn test_unknown_cuisine_is_all_misses() {
    let matcher = seeded_matcher().await;
    let mut ctx = ScanContext::new();
    let menu = [
        raw_dish("dish-1", "Tacos al Pastor", "", "Mexico"),
        raw_dish("dish-2", "Bulgogi", "", "Mexico"),
    ];

    let result = matcher.match_dishes(&menu, &mut ctx).await;

    assert_eq!(result.cuisine, None);
    assert!(result.hits.is_empty());
    assert_eq!(result.miss_ids.len(), 2);
}

#[tokio::test]
async fn test_missing_snapshot_is_all_misses() {
    let db = menulens_scan::db::init_memory_pool().await.unwrap();
    let matcher = CacheMatcher::new(Arc::new(CuisineCacheStore::new(
        db,
        None,
        Duration::from_secs(3600),
    )));
    let mut ctx = ScanContext::new();

    let result = matcher
        .match_dishes(&[raw_dish("dish-1", "Pad Thai", "ผัดไทย", "Thailand")], &mut ctx)
        .await;

    assert_eq!(result.cuisine.as_deref(), Some("thai"));
    assert!(result.hits.is_empty());
    assert!(result.miss_ids.contains("dish-1"));
}
