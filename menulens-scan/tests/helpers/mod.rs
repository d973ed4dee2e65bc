//! Test Helper Utilities
//!
//! Shared fixtures for menulens-scan integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use menulens_common::{CachedDish, Dish, RawDish, ScanEvent};
use menulens_scan::providers::scripted::{sample_menu, ScriptedEnrichment, ScriptedExtraction};
use menulens_scan::services::{
    CacheMatcher, CuisineSource, EnrichmentChain, EnrichmentOrchestrator, EnrichmentSettings,
    ExtractionStage, ScanPipeline, StaticCuisineSource,
};
use menulens_scan::types::{EnrichmentProvider, EnrichmentTier, ExtractionProvider, MenuImage};
use menulens_scan::{build_router, AppState};

/// PNG signature plus a few bytes; enough for MIME sniffing
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub fn menu_image() -> MenuImage {
    MenuImage::from_bytes(PNG_BYTES).unwrap()
}

/// Data URI accepted by `POST /scan`
pub fn image_data_uri() -> String {
    menu_image().data_uri()
}

/// Batching with no stagger
pub fn settings(batch_size: usize, tier: EnrichmentTier) -> EnrichmentSettings {
    EnrichmentSettings {
        batch_size,
        stagger: Duration::ZERO,
        tier,
    }
}

pub fn pipeline(
    extraction: Vec<Arc<dyn ExtractionProvider>>,
    enrichment: Vec<Arc<dyn EnrichmentProvider>>,
    settings: EnrichmentSettings,
) -> Arc<ScanPipeline> {
    Arc::new(ScanPipeline::new(
        ExtractionStage::new(extraction),
        EnrichmentOrchestrator::new(EnrichmentChain::new(enrichment), settings),
    ))
}

/// Pipeline extracting `count` sample dishes and echoing them back enriched
pub fn echo_pipeline(count: usize, batch_size: usize) -> Arc<ScanPipeline> {
    pipeline(
        vec![Arc::new(ScriptedExtraction::returning(
            "scripted",
            sample_menu(count, "South Korea"),
        ))],
        vec![Arc::new(ScriptedEnrichment::echo("groq"))],
        settings(batch_size, EnrichmentTier::Full),
    )
}

/// Router over an in-memory database
pub async fn test_app(
    pipeline: Arc<ScanPipeline>,
    source: impl CuisineSource + 'static,
) -> (Router, AppState) {
    let db = menulens_scan::db::init_memory_pool().await.unwrap();
    let state = AppState::new(db, pipeline, Arc::new(CacheMatcher::new(Arc::new(source))));
    (build_router(state.clone()), state)
}

pub fn raw_dish(id: &str, english: &str, local: &str, country: &str) -> RawDish {
    RawDish {
        id: id.into(),
        name_english: english.into(),
        name_local: local.into(),
        price: "9,000".into(),
        brief: String::new(),
        country: country.into(),
    }
}

/// Korean snapshot with kimchi stew and bulgogi
pub fn korean_cache() -> Vec<CachedDish> {
    vec![
        CachedDish {
            dish: Dish {
                id: "kr-001".into(),
                name_english: "Kimchi Jjigae".into(),
                name_local: "김치찌개".into(),
                name_romanized: Some("gimchi jjigae".into()),
                description: "Spicy fermented cabbage stew".into(),
                country: "South Korea".into(),
                price: "8,000".into(),
                explanation: "A staple Korean stew.".into(),
                ..Default::default()
            },
            match_keys: vec!["kimchi jjigae".into(), "김치찌개".into()],
            image_url: None,
            image_urls: vec!["https://img.example/kimchi-1.jpg".into()],
        },
        CachedDish {
            dish: Dish {
                id: "kr-002".into(),
                name_english: "Bulgogi".into(),
                name_local: "불고기".into(),
                description: "Marinated grilled beef".into(),
                country: "South Korea".into(),
                ..Default::default()
            },
            match_keys: vec!["bulgogi".into()],
            image_url: Some("https://img.example/bulgogi.jpg".into()),
            image_urls: vec![],
        },
    ]
}

pub fn korean_source() -> StaticCuisineSource {
    StaticCuisineSource::new().with_cuisine("korean", korean_cache())
}

/// Wire names of events, in order
pub fn event_types(events: &[ScanEvent]) -> Vec<&'static str> {
    events.iter().map(ScanEvent::event_type).collect()
}

/// Every dish id across all `batch` events, sorted
pub fn batch_ids(events: &[ScanEvent]) -> Vec<String> {
    let mut ids: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Batch { dishes } => Some(dishes.iter().map(|d| d.id.clone())),
            _ => None,
        })
        .flatten()
        .collect();
    ids.sort_by_key(|id| dish_number(id));
    ids
}

/// `dish-12` → 12
pub fn dish_number(id: &str) -> usize {
    id.trim_start_matches("dish-").parse().unwrap_or(usize::MAX)
}
