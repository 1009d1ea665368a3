//! Scoring functions for duplicate-contact detection.
//!
//! This module contains:
//! - The normalized edit-distance similarity metric
//! - Per-signal weights and gates (email, name, company, phone)
//! - Pairwise composite scoring

use serde::{Deserialize, Serialize};

use crate::models::{Contact, MatchReason};
use crate::normalize::{comparison_key, phone_tail};

// ============================================================================
// Weights and Thresholds
// ============================================================================

/// Contribution of a case-insensitive exact email match
pub const EMAIL_WEIGHT: f64 = 0.9;

/// Name similarity is multiplied by this when it clears the gate
pub const NAME_WEIGHT: f64 = 0.6;

/// Company similarity is multiplied by this when it clears the gate
pub const COMPANY_WEIGHT: f64 = 0.4;

/// Contribution of matching phone tails
pub const PHONE_WEIGHT: f64 = 0.5;

/// Name/company similarity must be strictly above this to contribute
pub const SIMILARITY_GATE: f64 = 0.8;

/// Composite score must be strictly above this for a candidate to be kept
pub const RETAIN_THRESHOLD: f64 = 0.7;

/// Phones are compared on their last N digits (drops country prefixes)
pub const PHONE_TAIL_LEN: usize = 10;

/// Tunable scoring parameters. `Default` reproduces the constants above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub email_weight: f64,
    pub name_weight: f64,
    pub company_weight: f64,
    pub phone_weight: f64,
    pub similarity_gate: f64,
    pub retain_threshold: f64,
    pub phone_tail_len: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            email_weight: EMAIL_WEIGHT,
            name_weight: NAME_WEIGHT,
            company_weight: COMPANY_WEIGHT,
            phone_weight: PHONE_WEIGHT,
            similarity_gate: SIMILARITY_GATE,
            retain_threshold: RETAIN_THRESHOLD,
            phone_tail_len: PHONE_TAIL_LEN,
        }
    }
}

// ============================================================================
// Similarity
// ============================================================================

/// Normalized edit-distance similarity in `[0, 1]`.
///
/// Identical strings (including two empty strings) score 1.0; one empty and
/// one non-empty score 0.0. Otherwise `1 - lev(a, b) / max(len(a), len(b))`
/// with lengths counted in chars. Case folding is the caller's job.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = strsim::levenshtein(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - (distance as f64 / max_len as f64)
}

/// Similarity as a rounded percentage, as shown in match reasons.
pub fn as_percent(value: f64) -> u32 {
    (value * 100.0).round().max(0.0) as u32
}

// ============================================================================
// Pairwise Scoring
// ============================================================================

/// Which signals fired for one pair, alongside the composite score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairScore {
    /// Uncapped sum of contributions. Several agreeing signals push it past 1.0.
    pub raw: f64,
    pub reasons: Vec<MatchReason>,
}

impl PairScore {
    /// Score scaled ×100 and rounded.
    pub fn display(&self) -> u32 {
        as_percent(self.raw)
    }

    pub fn has(&self, reason: fn(&MatchReason) -> bool) -> bool {
        self.reasons.iter().any(reason)
    }
}

/// Composite score of `candidate` as a duplicate of `subject`.
///
/// Contributions, summed without a cap:
/// - email equal ignoring case: `email_weight`
/// - name similarity above the gate: `similarity * name_weight`
/// - company similarity above the gate (both non-empty): `similarity * company_weight`
/// - last `phone_tail_len` digits equal (both present and long enough): `phone_weight`
pub fn score_pair(subject: &Contact, candidate: &Contact, config: &ScoringConfig) -> PairScore {
    let mut score = PairScore::default();

    if comparison_key(&subject.email) == comparison_key(&candidate.email) {
        score.raw += config.email_weight;
        score.reasons.push(MatchReason::SameEmail);
    }

    let name_similarity = similarity(
        &comparison_key(&subject.name),
        &comparison_key(&candidate.name),
    );
    if name_similarity > config.similarity_gate {
        score.raw += name_similarity * config.name_weight;
        score
            .reasons
            .push(MatchReason::SimilarName(as_percent(name_similarity)));
    }

    if !subject.company.is_empty() && !candidate.company.is_empty() {
        let company_similarity = similarity(
            &comparison_key(&subject.company),
            &comparison_key(&candidate.company),
        );
        if company_similarity > config.similarity_gate {
            score.raw += company_similarity * config.company_weight;
            score
                .reasons
                .push(MatchReason::SimilarCompany(as_percent(company_similarity)));
        }
    }

    if let (Some(a), Some(b)) = (subject.phone.as_deref(), candidate.phone.as_deref()) {
        let tails = (
            phone_tail(a, config.phone_tail_len),
            phone_tail(b, config.phone_tail_len),
        );
        if let (Some(tail_a), Some(tail_b)) = tails {
            if tail_a == tail_b {
                score.raw += config.phone_weight;
                score.reasons.push(MatchReason::SamePhone);
            }
        }
    }

    score
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactId, ContactStatus};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn contact(id: u32, name: &str, email: &str, company: &str, phone: Option<&str>) -> Contact {
        Contact {
            id: ContactId(id),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            company: company.to_string(),
            status: ContactStatus::Active,
            tags: vec![],
            custom_fields: BTreeMap::new(),
            created_at: 0,
        }
    }

    #[test]
    fn test_similarity_identical_and_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", ""), 0.0);
        assert_eq!(similarity("acme", "acme"), 1.0);
    }

    #[test]
    fn test_similarity_edit_distance() {
        // one deletion over max length 10
        assert!((similarity("john smith", "jon smith") - 0.9).abs() < 1e-12);
        // kitten/sitting: distance 3, max len 7
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-12);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_counts_chars_not_bytes() {
        // one substitution over 4 chars, even though é is two bytes
        assert!((similarity("josé", "jose") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_as_percent_rounds() {
        assert_eq!(as_percent(0.904), 90);
        assert_eq!(as_percent(0.906), 91);
        assert_eq!(as_percent(1.44), 144);
    }

    #[test]
    fn test_score_email_and_name() {
        let a = contact(1, "John Smith", "a@x.com", "", None);
        let b = contact(2, "Jon Smith", "A@X.com", "", None);
        let score = score_pair(&a, &b, &ScoringConfig::default());
        assert!((score.raw - (0.9 + 0.9 * 0.6)).abs() < 1e-9);
        assert_eq!(
            score.reasons,
            vec![MatchReason::SameEmail, MatchReason::SimilarName(90)]
        );
        assert_eq!(score.display(), 144);
    }

    #[test]
    fn test_score_exceeds_one_when_signals_agree() {
        let a = contact(1, "Maria Garcia", "maria@acme.com", "Acme", Some("+1 555 123 4567"));
        let b = contact(2, "Maria Garcia", "MARIA@acme.com", "Acme", Some("(555) 123-4567"));
        let score = score_pair(&a, &b, &ScoringConfig::default());
        assert!((score.raw - (0.9 + 0.6 + 0.4 + 0.5)).abs() < 1e-9);
        assert!(score.raw > 1.0);
        assert!(score.has(|r| matches!(r, MatchReason::SamePhone)));
    }

    #[test]
    fn test_name_gate_is_strict() {
        // "abcde" vs "abcdx": similarity exactly 0.8, must not contribute
        let a = contact(1, "abcde", "a@x.com", "", None);
        let b = contact(2, "abcdx", "b@x.com", "", None);
        let score = score_pair(&a, &b, &ScoringConfig::default());
        assert_eq!(score.raw, 0.0);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_company_requires_both_present() {
        let a = contact(1, "Ann", "a@x.com", "", None);
        let b = contact(2, "Bob", "b@x.com", "", None);
        let score = score_pair(&a, &b, &ScoringConfig::default());
        assert!(score.reasons.is_empty());

        let c = contact(3, "Cy", "c@x.com", "Globex", None);
        let d = contact(4, "Di", "d@x.com", "globex", None);
        let score = score_pair(&c, &d, &ScoringConfig::default());
        assert_eq!(score.reasons, vec![MatchReason::SimilarCompany(100)]);
        assert!((score.raw - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_short_phones_ignored() {
        let a = contact(1, "Ann", "a@x.com", "", Some("123-4567"));
        let b = contact(2, "Bob", "b@x.com", "", Some("123-4567"));
        let score = score_pair(&a, &b, &ScoringConfig::default());
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_empty_emails_count_as_same_address() {
        let a = contact(1, "Ann Lee", "", "", None);
        let b = contact(2, "Bob Ray", "", "", None);
        let score = score_pair(&a, &b, &ScoringConfig::default());
        assert_eq!(score.reasons, vec![MatchReason::SameEmail]);
        assert!((score.raw - EMAIL_WEIGHT).abs() < 1e-12);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: ScoringConfig = serde_json::from_str(r#"{"retain_threshold": 0.5}"#).unwrap();
        assert_eq!(config.retain_threshold, 0.5);
        assert_eq!(config.email_weight, EMAIL_WEIGHT);
        assert_eq!(config.phone_tail_len, PHONE_TAIL_LEN);
    }

    proptest! {
        #[test]
        fn prop_similarity_reflexive(s in ".{0,24}") {
            prop_assert_eq!(similarity(&s, &s), 1.0);
        }

        #[test]
        fn prop_similarity_symmetric(a in ".{0,16}", b in ".{0,16}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn prop_similarity_in_unit_range(a in ".{0,16}", b in ".{0,16}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
