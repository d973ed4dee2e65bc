//! Menu scan data model
//!
//! Shared between the scan service and its callers. Field names follow the
//! camelCase wire format used by the scan event protocol.
//!
//! Provider output is model-generated JSON, so deserialization is lenient:
//! missing fields take zero-value defaults, `null` lists become empty, prices
//! may arrive as numbers and nutrition values may arrive as strings such as
//! `"12g"`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Raw (Phase 1) dishes
// ============================================================================

/// Unenriched dish stub produced by extraction
///
/// `id` is a per-scan token (`dish-N`) assigned sequentially in menu order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDish {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name_english: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name_local: String,
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(deserialize_with = "lenient_string")]
    pub brief: String,
    #[serde(deserialize_with = "lenient_string")]
    pub country: String,
}

impl RawDish {
    /// True when the extractor produced no usable name at all
    pub fn is_blank(&self) -> bool {
        self.name_english.trim().is_empty() && self.name_local.trim().is_empty()
    }
}

// ============================================================================
// Enriched dishes
// ============================================================================

/// Dietary classification of a dish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DietaryType {
    #[serde(rename = "veg")]
    Veg,
    #[default]
    #[serde(rename = "non-veg")]
    NonVeg,
    #[serde(rename = "jain-safe")]
    JainSafe,
}

impl DietaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DietaryType::Veg => "veg",
            DietaryType::NonVeg => "non-veg",
            DietaryType::JainSafe => "jain-safe",
        }
    }

    /// Parse a provider-supplied label; anything unrecognised is non-veg
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "veg" | "vegetarian" | "vegan" => DietaryType::Veg,
            "jain-safe" | "jain" | "jain safe" => DietaryType::JainSafe,
            _ => DietaryType::NonVeg,
        }
    }
}

impl<'de> Deserialize<'de> for DietaryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .map(|l| DietaryType::parse_lenient(&l))
            .unwrap_or_default())
    }
}

/// Ingredient category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Protein,
    Vegetable,
    Sauce,
    Carb,
    Dairy,
    Spice,
    #[default]
    Other,
}

impl IngredientCategory {
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "protein" => IngredientCategory::Protein,
            "vegetable" => IngredientCategory::Vegetable,
            "sauce" => IngredientCategory::Sauce,
            "carb" => IngredientCategory::Carb,
            "dairy" => IngredientCategory::Dairy,
            "spice" => IngredientCategory::Spice,
            _ => IngredientCategory::Other,
        }
    }
}

impl<'de> Deserialize<'de> for IngredientCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .map(|l| IngredientCategory::parse_lenient(&l))
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ingredient {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    pub category: IngredientCategory,
    pub is_unfamiliar: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Approximate per-serving nutrition
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrition {
    #[serde(deserialize_with = "lenient_f64")]
    pub protein: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub carbs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub fat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub fiber: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub kcal: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CulturalTerm {
    #[serde(deserialize_with = "lenient_string")]
    pub term: String,
    #[serde(deserialize_with = "lenient_string")]
    pub explanation: String,
}

/// Enriched dish record
///
/// Card-tier fields (identity, dietary type, allergens, price) are always
/// filled by enrichment. Detail-tier fields (ingredients, nutrition,
/// explanation, cultural terms) may stay at their zero-value defaults until
/// a lazy detail pass completes them via [`Dish::apply_detail`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dish {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name_english: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name_local: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_local_corrected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_romanized: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    pub dietary_type: DietaryType,
    #[serde(deserialize_with = "null_as_default")]
    pub allergens: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ingredients: Vec<Ingredient>,
    #[serde(deserialize_with = "null_as_default")]
    pub nutrition: Nutrition,
    #[serde(deserialize_with = "lenient_string")]
    pub explanation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cultural_terms: Vec<CulturalTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_search_query: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_f64"
    )]
    pub rank_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_label: Option<String>,
}

impl Dish {
    /// Fill identity fields the provider left blank from the raw stub
    pub fn fill_missing_from(&mut self, raw: &RawDish) {
        if self.name_english.trim().is_empty() {
            self.name_english = raw.name_english.clone();
        }
        if self.name_local.trim().is_empty() {
            self.name_local = raw.name_local.clone();
        }
        if self.price.trim().is_empty() {
            self.price = raw.price.clone();
        }
        if self.country.trim().is_empty() {
            self.country = raw.country.clone();
        }
    }

    /// Merge detail-tier fields into a card-tier dish
    pub fn apply_detail(&mut self, detail: &DishDetail) {
        self.ingredients = detail.ingredients.clone();
        self.nutrition = detail.nutrition;
        self.explanation = detail.explanation.clone();
        self.cultural_terms = detail.cultural_terms.clone();
    }

    /// Whether detail-tier fields have been populated
    pub fn has_detail(&self) -> bool {
        !self.ingredients.is_empty() || !self.explanation.trim().is_empty()
    }
}

/// Detail-tier fields fetched on demand for a card-tier dish
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DishDetail {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ingredients: Vec<Ingredient>,
    #[serde(deserialize_with = "null_as_default")]
    pub nutrition: Nutrition,
    #[serde(deserialize_with = "lenient_string")]
    pub explanation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cultural_terms: Vec<CulturalTerm>,
}

/// Dish reference sent to a detail-tier enrichment call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailRequest {
    pub id: String,
    pub name_english: String,
    pub name_local: String,
    pub brief: String,
    pub country: String,
}

impl From<&RawDish> for DetailRequest {
    fn from(raw: &RawDish) -> Self {
        Self {
            id: raw.id.clone(),
            name_english: raw.name_english.clone(),
            name_local: raw.name_local.clone(),
            brief: raw.brief.clone(),
            country: raw.country.clone(),
        }
    }
}

impl From<&Dish> for DetailRequest {
    fn from(dish: &Dish) -> Self {
        Self {
            id: dish.id.clone(),
            name_english: dish.name_english.clone(),
            name_local: dish.name_local.clone(),
            brief: dish.description.clone(),
            country: dish.country.clone(),
        }
    }
}

// ============================================================================
// Offline cache entries
// ============================================================================

/// Pre-enriched dish from a per-cuisine offline snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDish {
    #[serde(flatten)]
    pub dish: Dish,
    /// Alternate names and transliterations used for matching
    #[serde(default)]
    pub match_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

impl CachedDish {
    /// Image URLs for this entry, preferring the multi-image list
    pub fn images(&self) -> Vec<String> {
        if !self.image_urls.is_empty() {
            self.image_urls.clone()
        } else {
            self.image_url.iter().cloned().collect()
        }
    }
}

// ============================================================================
// User preferences
// ============================================================================

/// User dietary profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub proteins: Vec<String>,
    pub spice: String,
    pub diet: String,
    pub restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub has_completed_onboarding: bool,
}

// ============================================================================
// Lenient field deserializers
// ============================================================================

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Numeric value of a JSON number or of the leading number in a string
fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let numeric: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            numeric.parse().ok()
        }
        _ => None,
    }
}
