//! Preference-aware dish ranking
//!
//! Scoring starts from a base of 50:
//!
//! | Rule | Delta |
//! |------|-------|
//! | diet `Veg` and dish is non-veg | −100 |
//! | diet `Jain` and dish is not jain-safe | −100 |
//! | each `No <X>` restriction where an ingredient name contains `<x>` | −100 |
//! | each allergy appearing in the dish's allergens | −50 |
//! | each preferred protein found in a protein ingredient | +15 |
//! | the provider's popularity `rankScore` | +score |
//!
//! Sorting is stable, so equal scores keep menu order.

use menulens_common::{DietaryType, Dish, IngredientCategory, Preferences};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const BASE_SCORE: f64 = 50.0;
pub const HARD_PENALTY: f64 = -100.0;
pub const ALLERGY_PENALTY: f64 = -50.0;
pub const PROTEIN_BONUS: f64 = 15.0;

/// Dishes labelled in the menu-order view
pub const TOP_N: usize = 5;

/// How ranked results are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankView {
    /// Menu order kept; only the top picks get labels
    #[default]
    Menu,
    /// Sorted by score, every dish labelled by position
    Recommended,
}

/// Score a dish for a user
pub fn score_dish(dish: &Dish, prefs: &Preferences) -> f64 {
    let mut score = BASE_SCORE;
    let diet = prefs.diet.trim();

    if diet.eq_ignore_ascii_case("veg") && dish.dietary_type == DietaryType::NonVeg {
        score += HARD_PENALTY;
    }
    if diet.eq_ignore_ascii_case("jain") && dish.dietary_type != DietaryType::JainSafe {
        score += HARD_PENALTY;
    }

    let ingredient_names: Vec<String> = dish
        .ingredients
        .iter()
        .map(|i| i.name.to_lowercase())
        .collect();
    let mut banned: Vec<String> = prefs
        .restrictions
        .iter()
        .filter_map(|r| restricted_ingredient(r))
        .collect();
    banned.sort();
    banned.dedup();
    // One penalty per broken restriction, not per offending ingredient
    let broken = banned
        .iter()
        .filter(|b| ingredient_names.iter().any(|name| name.contains(b.as_str())))
        .count();
    score += HARD_PENALTY * broken as f64;

    for allergy in &prefs.allergies {
        if dish
            .allergens
            .iter()
            .any(|a| a.trim().eq_ignore_ascii_case(allergy.trim()))
        {
            score += ALLERGY_PENALTY;
        }
    }

    let protein_names: Vec<String> = dish
        .ingredients
        .iter()
        .filter(|i| i.category == IngredientCategory::Protein)
        .map(|i| i.name.to_lowercase())
        .collect();
    for protein in &prefs.proteins {
        let protein = protein.trim().to_lowercase();
        if !protein.is_empty() && protein_names.iter().any(|name| name.contains(&protein)) {
            score += PROTEIN_BONUS;
        }
    }

    score + dish.rank_score.unwrap_or(0.0)
}

/// `No Beef` → `beef`; other restrictions carry no ingredient rule
fn restricted_ingredient(restriction: &str) -> Option<String> {
    let lowered = restriction.trim().to_lowercase();
    let ingredient = lowered.strip_prefix("no ")?.trim().to_string();
    (!ingredient.is_empty()).then_some(ingredient)
}

/// Label for the dish at zero-based `position`
pub fn rank_label(position: usize) -> String {
    if position == 0 {
        "Top Pick".to_string()
    } else {
        format!("#{} Pick", position + 1)
    }
}

/// Score and label dishes
///
/// Every returned dish carries `rank_score` set to its computed score.
/// Labels from a previous ranking are cleared first.
pub fn rank(dishes: &[Dish], prefs: &Preferences, view: RankView) -> Vec<Dish> {
    let mut scored: Vec<(usize, f64)> = dishes
        .iter()
        .enumerate()
        .map(|(i, d)| (i, score_dish(d, prefs)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    match view {
        RankView::Menu => dishes
            .iter()
            .zip(positions(&scored, dishes.len()))
            .map(|(dish, (position, score))| {
                let mut dish = dish.clone();
                dish.rank_score = Some(score);
                dish.rank_label = (position < TOP_N).then(|| rank_label(position));
                dish
            })
            .collect(),
        RankView::Recommended => scored
            .iter()
            .enumerate()
            .map(|(position, (index, score))| {
                let mut dish = dishes[*index].clone();
                dish.rank_score = Some(*score);
                dish.rank_label = Some(rank_label(position));
                dish
            })
            .collect(),
    }
}

/// Rank position and score for each dish, indexed by menu position
fn positions(scored: &[(usize, f64)], len: usize) -> Vec<(usize, f64)> {
    let mut by_menu = vec![(usize::MAX, 0.0); len];
    for (position, (index, score)) in scored.iter().enumerate() {
        by_menu[*index] = (position, *score);
    }
    by_menu
}
