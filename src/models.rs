//! Core data models for the CRM data layer.
//!
//! This module contains the record types held by the stores (contacts,
//! deals, activities), the create/patch inputs for each, and the
//! ephemeral results produced by duplicate detection.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                $name(id)
            }
        }
    };
}

record_id!(
    /// Contact identifier. Assigned once on creation, never reused while the record exists.
    ContactId
);
record_id!(
    /// Deal identifier.
    DealId
);
record_id!(
    /// Activity identifier.
    ActivityId
);

/// Milliseconds since the Unix epoch, used for `createdAt` / `timestamp` stamps.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ============================================================================
// Contacts
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactStatus {
    #[default]
    Active,
    Prospect,
    Inactive,
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContactStatus::Active => "Active",
            ContactStatus::Prospect => "Prospect",
            ContactStatus::Inactive => "Inactive",
        };
        f.write_str(s)
    }
}

/// A CRM contact record.
///
/// Serialized with the field names of the seed data set (`Id`, `customFields`,
/// `createdAt`), so fixture files can be loaded unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: ContactId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Open mapping such as `industry`, `employeeCount`, `website`.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub created_at: u64,
}

/// Input for `ContactStore::create`. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

/// Shallow partial update. `None` leaves the field untouched; the id is not patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the phone number.
    pub phone: Option<Option<String>>,
    pub company: Option<String>,
    pub status: Option<ContactStatus>,
    pub tags: Option<Vec<String>>,
    pub custom_fields: Option<BTreeMap<String, String>>,
    pub created_at: Option<u64>,
}

impl ContactPatch {
    /// Patch that overwrites every mutable field with the values of `contact`.
    pub fn replace_with(contact: &Contact) -> Self {
        Self {
            name: Some(contact.name.clone()),
            email: Some(contact.email.clone()),
            phone: Some(contact.phone.clone()),
            company: Some(contact.company.clone()),
            status: Some(contact.status),
            tags: Some(contact.tags.clone()),
            custom_fields: Some(contact.custom_fields.clone()),
            created_at: Some(contact.created_at),
        }
    }

    pub fn apply(self, contact: &mut Contact) {
        if let Some(name) = self.name {
            contact.name = name;
        }
        if let Some(email) = self.email {
            contact.email = email;
        }
        if let Some(phone) = self.phone {
            contact.phone = phone;
        }
        if let Some(company) = self.company {
            contact.company = company;
        }
        if let Some(status) = self.status {
            contact.status = status;
        }
        if let Some(tags) = self.tags {
            contact.tags = tags;
        }
        if let Some(custom_fields) = self.custom_fields {
            contact.custom_fields = custom_fields;
        }
        if let Some(created_at) = self.created_at {
            contact.created_at = created_at;
        }
    }
}

// ============================================================================
// Deals
// ============================================================================

/// Pipeline stage, in board order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStage {
    #[default]
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Closed,
}

impl DealStage {
    pub const ALL: [DealStage; 5] = [
        DealStage::Lead,
        DealStage::Qualified,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::Closed,
    ];
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DealStage::Lead => "Lead",
            DealStage::Qualified => "Qualified",
            DealStage::Proposal => "Proposal",
            DealStage::Negotiation => "Negotiation",
            DealStage::Closed => "Closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(rename = "Id")]
    pub id: DealId,
    pub title: String,
    pub value: f64,
    #[serde(default)]
    pub stage: DealStage,
    pub contact_id: ContactId,
    #[serde(default)]
    pub probability: u8,
    #[serde(default)]
    pub expected_close_date: String,
    #[serde(default)]
    pub created_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub title: String,
    pub value: f64,
    #[serde(default)]
    pub stage: DealStage,
    pub contact_id: Option<ContactId>,
    #[serde(default)]
    pub probability: u8,
    #[serde(default)]
    pub expected_close_date: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealPatch {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub stage: Option<DealStage>,
    pub contact_id: Option<ContactId>,
    pub probability: Option<u8>,
    pub expected_close_date: Option<String>,
}

/// Per-stage totals for the pipeline board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub stage: DealStage,
    pub count: usize,
    pub total_value: f64,
}

// ============================================================================
// Activities
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    #[default]
    Note,
    Task,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityType::Call => "Call",
            ActivityType::Email => "Email",
            ActivityType::Meeting => "Meeting",
            ActivityType::Note => "Note",
            ActivityType::Task => "Task",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "Id")]
    pub id: ActivityId,
    #[serde(rename = "type", default)]
    pub activity_type: ActivityType,
    pub content: String,
    pub contact_id: ContactId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    #[serde(rename = "type", default)]
    pub activity_type: ActivityType,
    pub content: String,
    pub contact_id: ContactId,
    #[serde(default)]
    pub deal_id: Option<DealId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPatch {
    pub activity_type: Option<ActivityType>,
    pub content: Option<String>,
    pub contact_id: Option<ContactId>,
    pub deal_id: Option<Option<DealId>>,
}

// ============================================================================
// Duplicate Detection Results
// ============================================================================

/// Why a candidate was flagged. Rendered as the human-readable reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    SameEmail,
    /// Name similarity, rounded percentage
    SimilarName(u32),
    /// Company similarity, rounded percentage
    SimilarCompany(u32),
    SamePhone,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::SameEmail => f.write_str("Same email address"),
            MatchReason::SimilarName(pct) => write!(f, "Similar name ({}% match)", pct),
            MatchReason::SimilarCompany(pct) => write!(f, "Similar company ({}% match)", pct),
            MatchReason::SamePhone => f.write_str("Same phone number"),
        }
    }
}

impl Serialize for MatchReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A contact judged likely to be the same entity as the group's original.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub contact: Contact,
    /// Uncapped sum of the triggered contributions. May exceed 1.0.
    pub raw_score: f64,
    /// `raw_score * 100`, rounded. Used for display and ranking.
    pub score: u32,
    pub reasons: Vec<MatchReason>,
}

/// One subject contact and its ranked candidates. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub original: Contact,
    pub duplicates: Vec<DuplicateCandidate>,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters for one detection run.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStats {
    pub subjects_scanned: usize,
    pub pairs_compared: usize,

    // Signals fired (per pair, before threshold filtering)
    pub email_matches: usize,
    pub name_matches: usize,
    pub company_matches: usize,
    pub phone_matches: usize,

    pub candidates_retained: usize,
    pub candidates_below_threshold: usize,
    pub groups: usize,

    pub elapsed_seconds: f64,
}

impl DetectionStats {
    /// Fold the counters of another partial run into this one.
    pub fn absorb(&mut self, other: &DetectionStats) {
        self.subjects_scanned += other.subjects_scanned;
        self.pairs_compared += other.pairs_compared;
        self.email_matches += other.email_matches;
        self.name_matches += other.name_matches;
        self.company_matches += other.company_matches;
        self.phone_matches += other.phone_matches;
        self.candidates_retained += other.candidates_retained;
        self.candidates_below_threshold += other.candidates_below_threshold;
        self.groups += other.groups;
    }

    /// Fraction of compared pairs that produced a retained candidate, as a percentage.
    pub fn retention_rate(&self) -> f64 {
        if self.pairs_compared == 0 {
            0.0
        } else {
            100.0 * self.candidates_retained as f64 / self.pairs_compared as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
