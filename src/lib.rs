//! CRM data layer with duplicate-contact detection and merging.
//!
//! Contacts, deals and activities live in in-memory stores. The duplicate
//! detector scores every contact pair on email, name, company and phone;
//! the merge resolver folds chosen duplicates into a primary record.

pub mod activities;
pub mod crm;
pub mod deals;
pub mod duplicates;
pub mod error;
pub mod fixtures;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod scoring;
pub mod search;
pub mod store;

pub use crm::Crm;
pub use duplicates::{DetectionReport, DuplicateDetector};
pub use error::{CrmError, CrmResult, RecordKind};
pub use merge::{merge_contacts, resolve_merge, ContactField, FieldChoices, FieldKey};
pub use models::{Contact, ContactId, DuplicateCandidate, DuplicateGroup, MatchReason};
pub use scoring::{similarity, ScoringConfig};
pub use store::{ContactStore, InMemoryContactStore};
