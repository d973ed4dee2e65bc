//! Prompt text and prompt inputs for the model-backed providers

use menulens_common::{DetailRequest, Preferences, RawDish};

/// Extraction instructions for OCR-text parsing
pub const TEXT_EXTRACTION_PROMPT: &str = "You are given OCR text from a restaurant menu. \
Extract every dish or item, across all sections and variations, without skipping any. \
Return JSON: {\"dishes\":[{\"id\":\"dish-1\",\"nameEnglish\":\"...\",\"nameLocal\":\"name in its native script \
(e.g. 김치전, ผัดไทย); infer it from the dish and country if the menu is English-only\",\
\"price\":\"...\",\"brief\":\"3 word description\",\"country\":\"Korea|Thailand|Vietnam|Japan|Indonesia\"}]}. \
Number ids sequentially. Keep output minimal but complete.";

/// Extraction instructions for vision models reading the photo directly
pub const VISION_EXTRACTION_PROMPT: &str = "Extract every dish or item from this menu image, \
across all sections and variations, without skipping any. \
Return JSON: {\"dishes\":[{\"id\":\"dish-1\",\"nameEnglish\":\"...\",\"nameLocal\":\"native script\",\
\"price\":\"...\",\"brief\":\"3 word description\",\"country\":\"Korea|Thailand|Vietnam|Japan|Indonesia\"}]}. \
Number ids sequentially. Keep output minimal but complete.";

const ALLERGEN_VOCABULARY: &str = "egg, soy, sesame, peanut, shellfish, gluten, dairy";

const INGREDIENT_FIELD: &str = "- \"ingredients\": top 4-5 as [{\"name\", \"category\": \
protein|vegetable|sauce|carb|dairy|spice|other, \"isUnfamiliar\": bool, \"explanation\": short note if unfamiliar}]\n\
- \"nutrition\": {\"protein\", \"carbs\", \"fat\", \"fiber\" in grams, \"kcal\"}, approximate per serving\n\
- \"explanation\": 2-3 sentences: how it is cooked and eaten, a comparison to a familiar Indian or global dish if one fits, optionally a serving tip\n\
- \"culturalTerms\": 0-2 entries of {\"term\", \"explanation\"}\n";

fn card_fields(country: &str, full_description: bool) -> String {
    let description = if full_description {
        "1-2 sentences on appearance, key ingredients, cooking method and taste"
    } else {
        "1 sentence: what it is and its key ingredients"
    };
    format!(
        "- \"id\": keep the original id\n\
         - \"nameEnglish\": English name\n\
         - \"nameLocal\": native script exactly as given\n\
         - \"nameLocalCorrected\": the correct native-script name, fixing OCR mistakes; equal to nameLocal if it was right\n\
         - \"description\": {description}\n\
         - \"country\": \"{country}\"\n\
         - \"price\": as given\n\
         - \"dietaryType\": \"veg\" (no meat, fish or eggs), \"non-veg\" or \"jain-safe\"\n\
         - \"allergens\": only those present, from [{ALLERGEN_VOCABULARY}]\n\
         - \"imageSearchQuery\": the canonical local name a Wikipedia search would find\n\
         - \"rankScore\": popularity from 0 to 30\n"
    )
}

fn preferences_line(prefs_text: &str) -> String {
    if prefs_text.is_empty() {
        String::new()
    } else {
        format!("\nUser preferences: {}\n", prefs_text)
    }
}

/// Full-tier enrichment instructions
pub fn full_enrichment_prompt(country: &str, prefs_text: &str) -> String {
    format!(
        "You enrich {country} restaurant dishes for Indian travelers.\n\nFor each dish return:\n{}{}{}\nReturn JSON: {{\"dishes\": [...]}}. Be concise.",
        card_fields(country, true),
        INGREDIENT_FIELD,
        preferences_line(prefs_text),
    )
}

/// Card-tier enrichment instructions (no ingredients, nutrition or explanation)
pub fn card_enrichment_prompt(country: &str, prefs_text: &str) -> String {
    format!(
        "You enrich {country} restaurant dishes for Indian travelers. Return only card-level fields.\n\nFor each dish return:\n{}{}\nReturn JSON: {{\"dishes\": [...]}}. Be concise.",
        card_fields(country, false),
        preferences_line(prefs_text),
    )
}

/// Detail-tier enrichment instructions
pub fn detail_enrichment_prompt(country: &str, prefs_text: &str) -> String {
    format!(
        "You provide detailed enrichment for {country} restaurant dishes for Indian travelers.\n\nFor each dish return:\n- \"id\": keep the original id\n{}{}\nReturn JSON: {{\"dishes\": [...]}}. Be concise.",
        INGREDIENT_FIELD,
        preferences_line(prefs_text),
    )
}

/// Country used to frame a batch: the first dish's, else `unknown`
pub fn batch_country<'a>(countries: impl IntoIterator<Item = &'a str>) -> &'a str {
    countries
        .into_iter()
        .next()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("unknown")
}

/// One line per dish: `id: English (local) - price - brief`
pub fn raw_dish_list(dishes: &[RawDish]) -> String {
    dishes
        .iter()
        .map(|d| {
            format!(
                "{}: {} ({}) - {} - {}",
                d.id, d.name_english, d.name_local, d.price, d.brief
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn detail_request_list(dishes: &[DetailRequest]) -> String {
    dishes
        .iter()
        .map(|d| format!("{}: {} ({}) - {}", d.id, d.name_english, d.name_local, d.brief))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render preferences as the sentence fed to enrichment prompts
///
/// Parts with no value are left out entirely, so an empty profile renders
/// as the empty string.
pub fn build_prefs_description(prefs: &Preferences) -> String {
    let mut parts = Vec::new();
    if !prefs.diet.trim().is_empty() {
        parts.push(format!("Diet: {}", prefs.diet));
    }
    if !prefs.proteins.is_empty() {
        parts.push(format!("Enjoys: {}", prefs.proteins.join(", ")));
    }
    if !prefs.spice.trim().is_empty() {
        parts.push(format!("Spice tolerance: {}", prefs.spice));
    }
    if !prefs.restrictions.is_empty() {
        parts.push(format!("Restrictions: {}", prefs.restrictions.join(", ")));
    }
    if !prefs.allergies.is_empty() {
        parts.push(format!("Allergies: {}", prefs.allergies.join(", ")));
    }
    parts.join(". ")
}
