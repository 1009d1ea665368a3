//! Comparison-key helpers shared by duplicate detection, search and validation.
//!
//! Duplicate scoring compares plain lower-cased strings; the ASCII folding
//! here is only used by search, so it never shifts detection scores.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Everything that is not an ASCII digit: "+1 (555) 010-2030" → "15550102030"
pub static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").unwrap());

/// Loose email shape check used by contact validation: `local@domain.tld`
pub static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Regex to collapse multiple whitespace into single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

// ============================================================================
// DETECTION KEYS
// ============================================================================

/// Case-folded comparison key. Scoring lower-cases both sides before comparing.
pub fn comparison_key(s: &str) -> String {
    s.to_lowercase()
}

/// Strip every non-digit character from a phone number.
pub fn phone_digits(phone: &str) -> String {
    NON_DIGIT.replace_all(phone, "").into_owned()
}

/// Last `len` digits of a normalized phone number, or `None` if it is shorter.
///
/// "+1 (555) 010-2030" and "555.010.2030" share the tail "5550102030".
pub fn phone_tail(phone: &str, len: usize) -> Option<String> {
    let digits = phone_digits(phone);
    if digits.len() < len {
        return None;
    }
    // digits are ASCII, so byte slicing is safe
    Some(digits[digits.len() - len..].to_string())
}

// ============================================================================
// SEARCH FOLDING
// ============================================================================

/// Check if character is a Unicode combining mark (diacritical mark)
pub fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' |
             '\u{1DC0}'..='\u{1DFF}' | '\u{20D0}'..='\u{20FF}' |
             '\u{FE20}'..='\u{FE2F}')
}

/// Fold to lowercase ASCII: strip diacritics (NFKD) then transliterate the rest.
/// "José Müller" → "jose muller"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Search key: folded, trimmed, inner whitespace collapsed.
pub fn search_key(s: &str) -> String {
    let folded = fold_to_ascii(s);
    MULTI_SPACE.replace_all(folded.trim(), " ").into_owned()
}

/// Case- and accent-insensitive substring test used by every store's `search`.
pub fn search_matches(haystack: &str, needle_key: &str) -> bool {
    haystack.to_lowercase().contains(needle_key) || search_key(haystack).contains(needle_key)
}

// ============================================================================
// VALIDATION
// ============================================================================

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email.trim())
}

/// Truthiness of an optional text value: present and non-empty.
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_digits() {
        assert_eq!(phone_digits("+1 (555) 010-2030"), "15550102030");
        assert_eq!(phone_digits("ext."), "");
    }

    #[test]
    fn test_phone_tail() {
        assert_eq!(phone_tail("+1 (555) 010-2030", 10).as_deref(), Some("5550102030"));
        assert_eq!(phone_tail("555.010.2030", 10).as_deref(), Some("5550102030"));
        assert_eq!(phone_tail("010-2030", 10), None);
    }

    #[test]
    fn test_comparison_key_only_lowercases() {
        assert_eq!(comparison_key("José SMITH"), "josé smith");
    }

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("José"), "jose");
        assert_eq!(fold_to_ascii("Müller GmbH"), "muller gmbh");
        assert_eq!(fold_to_ascii("Beyoncé"), "beyonce");
    }

    #[test]
    fn test_search_key_collapses_whitespace() {
        assert_eq!(search_key("  Acme   Corp "), "acme corp");
    }

    #[test]
    fn test_search_matches() {
        let key = search_key("jose");
        assert!(search_matches("José Alvarez", &key));
        assert!(search_matches("JOSE", &key));
        assert!(!search_matches("Joe", &key));
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email(" first.last@sub.example.org "));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_has_text() {
        assert!(has_text(Some("x")));
        assert!(!has_text(Some("")));
        assert!(!has_text(None));
    }
}
