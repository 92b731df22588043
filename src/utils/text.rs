// src/utils/text.rs

//! Conversion of scraped text into integers and display strings.
//!
//! Resort pages encode the same number in many shapes ("48\"", "12/24",
//! "12 of 24", "3.5", "--"). Everything here degrades to zero instead of
//! failing so a cosmetic quirk cannot abort a whole scrape.

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};

static NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^0-9]+").expect("static pattern is valid"));

/// Placeholders that sites render when a value is unavailable.
const PLACEHOLDERS: &[&str] = &["--", "-", "—", "–", "——", "−"];

/// Whether the text is a "no data" placeholder.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed)
}

/// Removes the denominator from a string (e.g. "12/24" -> "12").
///
/// Also removes the "of" keyword (e.g. "12 of 24" -> "12 ").
pub fn remove_denominator(text: &str) -> &str {
    let text = text.split('/').next().unwrap_or_default();
    text.split("of").next().unwrap_or_default()
}

/// Drops the decimal remainder and every non-digit character.
pub fn digits_only(text: &str) -> String {
    let integral = text.split('.').next().unwrap_or_default();
    NON_DIGITS.replace_all(integral, "").into_owned()
}

/// Converts scraped text to a non-negative integer.
///
/// Never fails: placeholders and text without digits yield 0, and values too
/// large for `u32` saturate.
pub fn to_integer(text: &str) -> u32 {
    if is_placeholder(text) {
        return 0;
    }

    let digits = digits_only(remove_denominator(text));
    if digits.is_empty() {
        return 0;
    }

    digits.parse().unwrap_or(u32::MAX)
}

/// Converts text for a field that must be present on the page.
///
/// Empty text means the element rendered nothing at all, which is a hard
/// failure. Placeholders such as "--" still count as an explicit zero.
pub fn required_integer(text: &str, field: &str) -> Result<u32> {
    if text.trim().is_empty() {
        return Err(AppError::normalization(field, text));
    }
    Ok(to_integer(text))
}

/// Converts text for a field that may be missing; empty text is absent.
pub fn optional_integer(text: &str) -> Option<u32> {
    if text.trim().is_empty() {
        None
    } else {
        Some(to_integer(text))
    }
}

/// Lowercases the text and capitalizes each word ("PACKED POWDER" -> "Packed Powder").
pub fn title_case(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .to_lowercase()
        .split_word_bounds()
        .map(capitalize)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denominator_forms() {
        assert_eq!(to_integer("12/24"), 12);
        assert_eq!(to_integer("12 of 24"), 12);
        assert_eq!(to_integer("0 of 24 lifts open"), 0);
        assert_eq!(to_integer("30 of 40 runs"), 30);
    }

    #[test]
    fn test_placeholders_are_zero() {
        assert_eq!(to_integer("--"), 0);
        assert_eq!(to_integer(""), 0);
        assert_eq!(to_integer("   "), 0);
        assert_eq!(to_integer(" — "), 0);
        assert_eq!(to_integer("N/A"), 0);
    }

    #[test]
    fn test_units_and_decimals() {
        assert_eq!(to_integer("3.5"), 3);
        assert_eq!(to_integer("48\""), 48);
        assert_eq!(to_integer("Base: 1,024 in"), 1024);
        assert_eq!(to_integer("62%"), 62);
    }

    #[test]
    fn test_idempotent_on_clean_digits() {
        for raw in ["48\"", "12/24", "--", "3.5", "7 of 9", "99999999999"] {
            let once = to_integer(raw);
            assert_eq!(to_integer(&once.to_string()), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_overflow_saturates() {
        assert_eq!(to_integer("99999999999"), u32::MAX);
    }

    #[test]
    fn test_required_integer_rejects_empty() {
        assert!(matches!(
            required_integer("  ", "base depth"),
            Err(AppError::Normalization { .. })
        ));
        assert_eq!(required_integer("--", "base depth").unwrap(), 0);
        assert_eq!(required_integer("6\"", "snow 24h").unwrap(), 6);
    }

    #[test]
    fn test_optional_integer() {
        assert_eq!(optional_integer(""), None);
        assert_eq!(optional_integer("142\""), Some(142));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("PACKED POWDER"), "Packed Powder");
        assert_eq!(title_case("  machine   groomed "), "Machine Groomed");
        assert_eq!(title_case("wind-blown"), "Wind-Blown");
        assert_eq!(title_case(""), "");
    }
}
