//! Duplicate-contact detection.
//!
//! Every subject contact is compared against every other contact in the
//! store. Pairs whose composite score clears the retention threshold become
//! candidates; subjects without candidates are dropped from the output.
//! Detection is read-only, so repeated scans over the same records return
//! identical, identically ordered results.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::models::{Contact, ContactId, DetectionStats, DuplicateCandidate, DuplicateGroup, MatchReason};
use crate::progress::log_progress;
use crate::scoring::{score_pair, ScoringConfig};
use crate::store::ContactStore;

/// Groups plus the counters collected while producing them.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub groups: Vec<DuplicateGroup>,
    pub stats: DetectionStats,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: ScoringConfig,
}

impl DuplicateDetector {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Ranked duplicate groups for `contacts`.
    ///
    /// With `scope`, only that contact is a subject (and an unknown id yields
    /// nothing); the comparison set is always the full slice.
    pub fn find_duplicates(&self, contacts: &[Contact], scope: Option<ContactId>) -> Vec<DuplicateGroup> {
        self.scan(contacts, scope, None).groups
    }

    /// Detection over a store snapshot.
    pub fn find_in_store<S: ContactStore + ?Sized>(
        &self,
        store: &S,
        scope: Option<ContactId>,
    ) -> Vec<DuplicateGroup> {
        self.find_duplicates(&store.get_all(), scope)
    }

    /// Full scan with statistics, ticking `progress` once per subject.
    pub fn scan(
        &self,
        contacts: &[Contact],
        scope: Option<ContactId>,
        progress: Option<&ProgressBar>,
    ) -> DetectionReport {
        let start = Instant::now();

        let subjects: Vec<&Contact> = match scope {
            Some(id) => contacts.iter().filter(|c| c.id == id).collect(),
            None => contacts.iter().collect(),
        };
        let total = subjects.len() as u64;
        let done = AtomicU64::new(0);

        // Indexed parallel map keeps subject order in the collected output
        let per_subject: Vec<(Option<DuplicateGroup>, DetectionStats)> = subjects
            .par_iter()
            .map(|subject| {
                let result = self.group_for(subject, contacts);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                log_progress("DETECT", current, total, 500);
                result
            })
            .collect();

        let mut report = DetectionReport::default();
        for (group, stats) in per_subject {
            report.stats.absorb(&stats);
            if let Some(group) = group {
                report.groups.push(group);
            }
        }
        report.stats.groups = report.groups.len();
        report.stats.elapsed_seconds = start.elapsed().as_secs_f64();

        info!(
            subjects = report.stats.subjects_scanned,
            pairs = report.stats.pairs_compared,
            groups = report.stats.groups,
            candidates = report.stats.candidates_retained,
            "duplicate scan complete"
        );
        report
    }

    /// Score one subject against every other contact.
    fn group_for(&self, subject: &Contact, contacts: &[Contact]) -> (Option<DuplicateGroup>, DetectionStats) {
        let mut stats = DetectionStats {
            subjects_scanned: 1,
            ..Default::default()
        };
        let mut duplicates = Vec::new();

        for other in contacts {
            if other.id == subject.id {
                continue;
            }
            stats.pairs_compared += 1;

            let score = score_pair(subject, other, &self.config);
            for reason in &score.reasons {
                match reason {
                    MatchReason::SameEmail => stats.email_matches += 1,
                    MatchReason::SimilarName(_) => stats.name_matches += 1,
                    MatchReason::SimilarCompany(_) => stats.company_matches += 1,
                    MatchReason::SamePhone => stats.phone_matches += 1,
                }
            }

            if score.raw > self.config.retain_threshold {
                stats.candidates_retained += 1;
                duplicates.push(DuplicateCandidate {
                    contact: other.clone(),
                    raw_score: score.raw,
                    score: score.display(),
                    reasons: score.reasons,
                });
            } else if score.raw > 0.0 {
                stats.candidates_below_threshold += 1;
            }
        }

        if duplicates.is_empty() {
            return (None, stats);
        }

        // Stable: equal display scores keep comparison order
        duplicates.sort_by(|a, b| b.score.cmp(&a.score));
        debug!(
            subject = %subject.id,
            candidates = duplicates.len(),
            top_score = duplicates[0].score,
            "duplicates found"
        );

        let group = DuplicateGroup {
            original: subject.clone(),
            duplicates,
        };
        (Some(group), stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactStatus;
    use crate::store::InMemoryContactStore;
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

    fn sample() -> Vec<Contact> {
        vec![
            contact(1, "John Smith", "john@acme.com", "Acme Corp", Some("+1 555 010 2030")),
            contact(2, "Jon Smith", "JOHN@acme.com", "Acme Corp.", None),
            contact(3, "Sarah Connor", "sarah@cyberdyne.com", "Cyberdyne", None),
            contact(4, "Johnny Smyth", "jsmyth@other.org", "Other", Some("(555) 010-2030")),
            contact(5, "Kyle Reese", "kyle@resistance.net", "Resistance", None),
        ]
    }

    #[test]
    fn test_no_self_matches() {
        let groups = DuplicateDetector::default().find_duplicates(&sample(), None);
        for group in &groups {
            assert!(group
                .duplicates
                .iter()
                .all(|d| d.contact.id != group.original.id));
        }
    }

    #[test]
    fn test_groups_ranked_and_filtered() {
        let groups = DuplicateDetector::default().find_duplicates(&sample(), None);
        let subjects: Vec<u32> = groups.iter().map(|g| g.original.id.get()).collect();
        // 4 only shares a phone with 1 (0.5); 3 and 5 share nothing
        assert_eq!(subjects, vec![1, 2]);

        let first = &groups[0];
        let ids: Vec<u32> = first.duplicates.iter().map(|d| d.contact.id.get()).collect();
        // 2: email + name + company; 4: phone only (0.5) is below threshold
        assert_eq!(ids, vec![2]);
        assert!(first.duplicates[0].score > 100);
        assert!(first.duplicates[0].reasons.contains(&MatchReason::SameEmail));
    }

    #[test]
    fn test_phone_alone_is_not_enough() {
        let contacts = vec![
            contact(1, "Ann Lee", "ann@x.com", "", Some("555-010-2030")),
            contact(2, "Bob Ray", "bob@y.com", "", Some("1 555 010 2030")),
        ];
        assert!(DuplicateDetector::default()
            .find_duplicates(&contacts, None)
            .is_empty());
    }

    #[test]
    fn test_blank_emails_match_each_other() {
        let contacts = vec![
            contact(1, "Ann Lee", "", "", None),
            contact(2, "Bob Ray", "", "", None),
        ];
        let groups = DuplicateDetector::default().find_duplicates(&contacts, None);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].duplicates[0].score, 90);
        assert_eq!(groups[0].duplicates[0].reasons, vec![MatchReason::SameEmail]);
    }

    #[test]
    fn test_scope_restricts_subjects_only() {
        let detector = DuplicateDetector::default();
        let groups = detector.find_duplicates(&sample(), Some(ContactId(2)));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].original.id, ContactId(2));
        assert_eq!(groups[0].duplicates[0].contact.id, ContactId(1));

        assert!(detector.find_duplicates(&sample(), Some(ContactId(3))).is_empty());
        assert!(detector.find_duplicates(&sample(), Some(ContactId(99))).is_empty());
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let contacts = vec![
            contact(1, "Pat Doe", "pat@x.com", "", None),
            contact(2, "Someone", "pat@x.com", "", None),
            contact(3, "Pat Doe", "pat@x.com", "", None),
            contact(4, "Other", "PAT@x.com", "", None),
        ];
        let groups = DuplicateDetector::default().find_duplicates(&contacts, Some(ContactId(1)));
        let ranked: Vec<(u32, u32)> = groups[0]
            .duplicates
            .iter()
            .map(|d| (d.contact.id.get(), d.score))
            .collect();
        assert_eq!(ranked, vec![(3, 150), (2, 90), (4, 90)]);
    }

    #[test]
    fn test_idempotent() {
        let detector = DuplicateDetector::default();
        let contacts = sample();
        let first = detector.find_duplicates(&contacts, None);
        let second = detector.find_duplicates(&contacts, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_and_single_inputs() {
        let detector = DuplicateDetector::default();
        assert!(detector.find_duplicates(&[], None).is_empty());
        assert!(detector
            .find_duplicates(&[contact(1, "A", "a@x.com", "", None)], None)
            .is_empty());
    }

    #[test]
    fn test_scan_stats() {
        let report = DuplicateDetector::default().scan(&sample(), None, None);
        assert_eq!(report.stats.subjects_scanned, 5);
        assert_eq!(report.stats.pairs_compared, 20);
        assert_eq!(report.stats.groups, report.groups.len());
        // 1<->2 both directions
        assert_eq!(report.stats.email_matches, 2);
        // 1<->4 phone both directions
        assert_eq!(report.stats.phone_matches, 2);
        assert_eq!(report.stats.candidates_below_threshold, 2);
    }

    #[test]
    fn test_custom_threshold() {
        let detector = DuplicateDetector::new(ScoringConfig {
            retain_threshold: 0.4,
            ..Default::default()
        });
        let groups = detector.find_duplicates(&sample(), Some(ContactId(4)));
        // phone match (0.5) now clears the threshold
        assert_eq!(groups[0].duplicates[0].contact.id, ContactId(1));
        assert_eq!(groups[0].duplicates[0].reasons, vec![MatchReason::SamePhone]);
    }

    #[test]
    fn test_find_in_store() {
        let store = InMemoryContactStore::from_records(sample()).unwrap();
        let from_store = DuplicateDetector::default().find_in_store(&store, None);
        let from_slice = DuplicateDetector::default().find_duplicates(&sample(), None);
        assert_eq!(from_store, from_slice);
    }
}
