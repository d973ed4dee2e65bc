//! Dish name normalization for cache matching
//!
//! Folds case and diacritics so `Café` and `cafe` compare equal, and keeps
//! the scripts menus are actually written in (CJK, Hangul, Thai) intact.

use unicode_normalization::UnicodeNormalization;

/// Normalize a dish name for comparison
///
/// 1. Lowercase
/// 2. Decompose (NFD) and drop combining diacritics (U+0300..=U+036F)
/// 3. Recompose (NFC) so Hangul syllables are whole again
/// 4. Replace anything outside `[a-z0-9]`, CJK (U+3000..=U+9FFF), Hangul
///    syllables (U+AC00..=U+D7AF) and Thai (U+0E00..=U+0E7F) with a space
/// 5. Collapse whitespace and trim
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize_dish_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped: String = lowered.nfd().filter(|c| !is_combining_diacritic(*c)).collect();
    let recomposed: String = stripped.nfc().collect();

    let mut out = String::with_capacity(recomposed.len());
    let mut pending_space = false;
    for c in recomposed.chars() {
        if is_kept(c) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

fn is_kept(c: char) -> bool {
    c.is_ascii_lowercase()
        || c.is_ascii_digit()
        || ('\u{3000}'..='\u{9FFF}').contains(&c)
        || ('\u{AC00}'..='\u{D7AF}').contains(&c)
        || ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diacritics_fold() {
        assert_eq!(normalize_dish_name("Café"), normalize_dish_name("cafe"));
        assert_eq!(normalize_dish_name("Phở Bò"), "pho bo");
        assert_eq!(normalize_dish_name("Crème Brûlée"), "creme brulee");
    }

    #[test]
    fn test_punctuation_and_whitespace_collapse() {
        assert_eq!(normalize_dish_name("  Kimchi-Jjigae (Stew)!  "), "kimchi jjigae stew");
        assert_eq!(normalize_dish_name("Tom\tYum\n\nGoong"), "tom yum goong");
        assert_eq!(normalize_dish_name("---"), "");
    }

    #[test]
    fn test_native_scripts_survive() {
        assert_eq!(normalize_dish_name("김치찌개"), "김치찌개");
        assert_eq!(normalize_dish_name("ผัดไทย"), "ผัดไทย");
        assert_eq!(normalize_dish_name("ラーメン"), "ラーメン");
        assert_eq!(normalize_dish_name("牛肉麺 (Beef)"), "牛肉麺 beef");
    }

    #[test]
    fn test_idempotent() {
        for input in ["Café Sữa Đá", "김치 찌개!!", "  PAD  thai ", "ต้มยำกุ้ง", ""] {
            let once = normalize_dish_name(input);
            assert_eq!(normalize_dish_name(&once), once, "input: {:?}", input);
        }
    }
}
