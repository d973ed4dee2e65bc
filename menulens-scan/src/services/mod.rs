//! Scan pipeline services
//!
//! Extraction, batched enrichment, the streaming driver, cache matching and
//! ranking. Provider backends live in [`crate::providers`].

pub mod accumulator;
pub mod cache_matcher;
pub mod cuisine_cache;
pub mod enrichment_chain;
pub mod enrichment_orchestrator;
pub mod extraction;
pub mod normalize;
pub mod ranking;
pub mod scan_stream;

pub use accumulator::{ScanAccumulator, ScanProgress};
pub use cache_matcher::{CacheMatchResult, CacheMatcher};
pub use cuisine_cache::{CacheUnavailable, CuisineCacheStore, CuisineSource, StaticCuisineSource};
pub use enrichment_chain::EnrichmentChain;
pub use enrichment_orchestrator::{
    BatchOutcome, EnrichmentOrchestrator, EnrichmentSettings, PartialEnrichmentLoss,
};
pub use extraction::ExtractionStage;
pub use normalize::normalize_dish_name;
pub use ranking::{rank, score_dish, RankView};
pub use scan_stream::{ScanPipeline, ScanStream};
