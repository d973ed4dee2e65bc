//! # MenuLens Common Library
//!
//! Shared code for the MenuLens scan service and its callers:
//! - Dish data model (raw, enriched, cached)
//! - Scan event protocol (newline-delimited JSON)
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use events::ScanEvent;
pub use models::{
    CachedDish, CulturalTerm, DetailRequest, DietaryType, Dish, DishDetail, Ingredient,
    IngredientCategory, Nutrition, Preferences, RawDish,
};
