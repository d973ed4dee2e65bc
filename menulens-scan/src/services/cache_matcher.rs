//! Offline cache matching
//!
//! Resolves raw dishes against a pre-enriched per-cuisine snapshot so that
//! well-known dishes skip model enrichment entirely. Matching runs four
//! passes per dish and takes the first entry that fits:
//!
//! 1. any `matchKeys` entry equals the normalized English or local name
//! 2. the cached English or romanized name equals the normalized English
//!    name, or the cached local name equals the normalized local name
//! 3. one English (or romanized) name contains the other, both at least 3
//!    characters after normalization
//! 4. one local name contains the other as printed, without normalization;
//!    the menu's local name must be at least 2 characters
//!
//! Within one scan no cache entry is matched twice.

use crate::services::cuisine_cache::CuisineSource;
use crate::services::normalize::normalize_dish_name;
use crate::types::ScanContext;
use menulens_common::{CachedDish, Dish, RawDish};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Country (lowercased) to cuisine snapshot name
const COUNTRY_CUISINES: &[(&str, &str)] = &[
    ("south korea", "korean"),
    ("korea", "korean"),
    ("japan", "japanese"),
    ("thailand", "thai"),
    ("vietnam", "vietnamese"),
    ("malaysia", "malaysian"),
];

/// Minimum length for the substring pass, on both sides
const MIN_SUBSTRING_LEN: usize = 3;

/// Minimum raw local-name length for the local-script pass
const MIN_LOCAL_LEN: usize = 2;

/// Which pass produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPass {
    MatchKey,
    ExactName,
    Substring,
    LocalScript,
}

/// Outcome of matching a menu against the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMatchResult {
    /// Cuisine snapshot used, if any
    pub cuisine: Option<String>,
    /// Cache-derived dishes, keyed by the raw dish ids they replace
    pub hits: Vec<Dish>,
    /// Image URLs per hit id
    pub hit_images: BTreeMap<String, Vec<String>>,
    /// Raw ids that still need model enrichment
    pub miss_ids: BTreeSet<String>,
}

impl CacheMatchResult {
    fn all_missed(raw: &[RawDish]) -> Self {
        Self {
            miss_ids: raw.iter().map(|d| d.id.clone()).collect(),
            ..Default::default()
        }
    }
}

/// Majority cuisine among the dishes' countries
///
/// Countries outside the known table are ignored. Ties go to the cuisine
/// seen first.
pub fn detect_cuisine<'a>(countries: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    let mut tallies: Vec<(&'static str, usize)> = Vec::new();

    for country in countries {
        let key = country.trim().to_lowercase();
        let Some((_, cuisine)) = COUNTRY_CUISINES.iter().find(|(c, _)| *c == key) else {
            continue;
        };
        match tallies.iter_mut().find(|(name, _)| *name == *cuisine) {
            Some((_, count)) => *count += 1,
            None => tallies.push((*cuisine, 1)),
        }
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (cuisine, count) in tallies {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((cuisine, count));
        }
    }
    best.map(|(cuisine, _)| cuisine)
}

/// Cache entry with its names pre-normalized
struct IndexedEntry<'c> {
    entry: &'c CachedDish,
    keys: Vec<String>,
    english: String,
    local: String,
    romanized: String,
}

impl<'c> IndexedEntry<'c> {
    fn new(entry: &'c CachedDish) -> Self {
        Self {
            entry,
            keys: entry
                .match_keys
                .iter()
                .map(|k| normalize_dish_name(k))
                .filter(|k| !k.is_empty())
                .collect(),
            english: normalize_dish_name(&entry.dish.name_english),
            local: normalize_dish_name(&entry.dish.name_local),
            romanized: entry
                .dish
                .name_romanized
                .as_deref()
                .map(normalize_dish_name)
                .unwrap_or_default(),
        }
    }
}

fn index_entries(cached: &[CachedDish]) -> Vec<IndexedEntry<'_>> {
    cached.iter().map(IndexedEntry::new).collect()
}

/// First cache entry fitting `raw`, skipping ids in `used`
pub fn find_match<'c>(
    raw: &RawDish,
    cached: &'c [CachedDish],
    used: &HashSet<String>,
) -> Option<(&'c CachedDish, MatchPass)> {
    let index = index_entries(cached);
    find_in_index(raw, &index, used)
}

fn find_in_index<'c>(
    raw: &RawDish,
    index: &[IndexedEntry<'c>],
    used: &HashSet<String>,
) -> Option<(&'c CachedDish, MatchPass)> {
    let english = normalize_dish_name(&raw.name_english);
    let local = normalize_dish_name(&raw.name_local);
    let candidates: Vec<&IndexedEntry<'c>> = index
        .iter()
        .filter(|e| !used.contains(&e.entry.dish.id))
        .collect();

    let hit = |pass: MatchPass, fits: &dyn Fn(&IndexedEntry<'c>) -> bool| {
        candidates
            .iter()
            .find(|e| fits(e))
            .map(|e| (e.entry, pass))
    };

    hit(MatchPass::MatchKey, &|e: &IndexedEntry<'c>| {
        e.keys
            .iter()
            .any(|k| (!english.is_empty() && *k == english) || (!local.is_empty() && *k == local))
    })
    .or_else(|| {
        hit(MatchPass::ExactName, &|e: &IndexedEntry<'c>| {
            (!english.is_empty() && (e.english == english || e.romanized == english))
                || (!local.is_empty() && e.local == local)
        })
    })
    .or_else(|| {
        if english.chars().count() < MIN_SUBSTRING_LEN {
            return None;
        }
        hit(MatchPass::Substring, &|e: &IndexedEntry<'c>| {
            contains_either(&e.english, &english) || contains_either(&e.romanized, &english)
        })
    })
    .or_else(|| {
        // Unnormalized, for scripts where normalization loses information
        let raw_local = raw.name_local.trim();
        if raw_local.chars().count() < MIN_LOCAL_LEN {
            return None;
        }
        hit(MatchPass::LocalScript, &|e: &IndexedEntry<'c>| {
            let cached_local = e.entry.dish.name_local.trim();
            !cached_local.is_empty()
                && (cached_local.contains(raw_local) || raw_local.contains(cached_local))
        })
    })
}

/// Either string contains the other; `cached` must meet the minimum length
fn contains_either(cached: &str, name: &str) -> bool {
    cached.chars().count() >= MIN_SUBSTRING_LEN && (cached.contains(name) || name.contains(cached))
}

/// Build the dish shown for a cache hit
///
/// Keeps the raw id, the menu's own price and the local name as printed;
/// falls back to the cached values when the menu has none.
pub fn dish_from_cache(raw: &RawDish, cached: &CachedDish) -> Dish {
    let mut dish = cached.dish.clone();
    dish.id = raw.id.clone();
    if !raw.price.trim().is_empty() {
        dish.price = raw.price.clone();
    }
    if !raw.name_local.trim().is_empty() {
        dish.name_local = raw.name_local.clone();
    }
    dish
}

/// Matches menus against the cuisine snapshots of a [`CuisineSource`]
pub struct CacheMatcher {
    source: Arc<dyn CuisineSource>,
}

impl CacheMatcher {
    pub fn new(source: Arc<dyn CuisineSource>) -> Self {
        Self { source }
    }

    /// Partition `raw` into cache hits and misses
    ///
    /// Cache entries matched here are recorded in `ctx` and will not be
    /// matched again for the same scan. Each hit gets every image URL of its
    /// entry, even when an earlier hit shared one; the URLs are also recorded
    /// in `ctx.used_image_urls`. A missing or unreadable cuisine snapshot
    /// yields all misses.
    pub async fn match_dishes(&self, raw: &[RawDish], ctx: &mut ScanContext) -> CacheMatchResult {
        let Some(cuisine) = detect_cuisine(raw.iter().map(|d| d.country.as_str())) else {
            debug!(scan_id = %ctx.scan_id, "No known cuisine for menu, skipping cache");
            return CacheMatchResult::all_missed(raw);
        };

        let cached = self.source.load_cuisine(cuisine).await;
        if cached.is_empty() {
            return CacheMatchResult {
                cuisine: Some(cuisine.to_string()),
                ..CacheMatchResult::all_missed(raw)
            };
        }

        let index = index_entries(&cached);
        let mut result = CacheMatchResult {
            cuisine: Some(cuisine.to_string()),
            ..Default::default()
        };

        for dish in raw {
            match find_in_index(dish, &index, &ctx.used_cache_ids) {
                Some((entry, pass)) => {
                    debug!(
                        id = %dish.id,
                        cache_id = %entry.dish.id,
                        pass = ?pass,
                        "Cache hit"
                    );
                    ctx.used_cache_ids.insert(entry.dish.id.clone());

                    let images = entry.images();
                    ctx.used_image_urls.extend(images.iter().cloned());
                    if !images.is_empty() {
                        result.hit_images.insert(dish.id.clone(), images);
                    }
                    result.hits.push(dish_from_cache(dish, entry));
                }
                None => {
                    result.miss_ids.insert(dish.id.clone());
                }
            }
        }

        info!(
            scan_id = %ctx.scan_id,
            cuisine,
            hits = result.hits.len(),
            misses = result.miss_ids.len(),
            "Cache matching complete"
        );
        result
    }
}
