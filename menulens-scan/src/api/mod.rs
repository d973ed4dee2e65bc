//! HTTP API handlers for menulens-scan
//!
//! JSON request/response everywhere except `POST /scan`, which streams
//! newline-delimited `ScanEvent`s.

pub mod cache;
pub mod enrich_detail;
pub mod health;
pub mod rank;
pub mod scan;

pub use cache::cache_routes;
pub use enrich_detail::enrich_detail_routes;
pub use health::health_routes;
pub use rank::rank_routes;
pub use scan::scan_routes;
