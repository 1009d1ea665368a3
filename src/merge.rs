//! Merging duplicate contacts into a primary record.
//!
//! A merge is irreversible: the primary is overwritten with the consolidated
//! record and every duplicate is deleted. All identifiers are resolved before
//! the store is touched, so a missing id leaves the store unchanged.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{CrmError, CrmResult};
use crate::models::{Contact, ContactId, ContactPatch};
use crate::normalize::has_text;
use crate::store::ContactStore;

// ============================================================================
// Field Keys
// ============================================================================

/// Top-level contact fields whose value can be taken from a duplicate.
///
/// Identifiers cannot be chosen. Tags and the custom
/// field map as a whole are always combined, never chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Company,
    Status,
    CreatedAt,
}

impl ContactField {
    pub const ALL: [ContactField; 6] = [
        ContactField::Name,
        ContactField::Email,
        ContactField::Phone,
        ContactField::Company,
        ContactField::Status,
        ContactField::CreatedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Phone => "phone",
            ContactField::Company => "company",
            ContactField::Status => "status",
            ContactField::CreatedAt => "createdAt",
        }
    }

    /// Copy this field from `source` into `target` if `source` has a non-empty value.
    fn copy_if_present(self, source: &Contact, target: &mut Contact) {
        match self {
            ContactField::Name if !source.name.is_empty() => target.name = source.name.clone(),
            ContactField::Email if !source.email.is_empty() => target.email = source.email.clone(),
            ContactField::Phone if has_text(source.phone.as_deref()) => {
                target.phone = source.phone.clone()
            }
            ContactField::Company if !source.company.is_empty() => {
                target.company = source.company.clone()
            }
            ContactField::Status => target.status = source.status,
            ContactField::CreatedAt if source.created_at != 0 => {
                target.created_at = source.created_at
            }
            _ => {}
        }
    }
}

const CUSTOM_PREFIX: &str = "customFields.";

/// Key of a field choice: a top-level field, or `customFields.<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Field(ContactField),
    Custom(String),
}

impl FieldKey {
    pub fn custom(key: impl Into<String>) -> Self {
        FieldKey::Custom(key.into())
    }
}

impl From<ContactField> for FieldKey {
    fn from(field: ContactField) -> Self {
        FieldKey::Field(field)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Field(field) => f.write_str(field.as_str()),
            FieldKey::Custom(key) => write!(f, "{}{}", CUSTOM_PREFIX, key),
        }
    }
}

impl FromStr for FieldKey {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(key) = s.strip_prefix(CUSTOM_PREFIX) {
            if key.is_empty() {
                return Err(CrmError::InvalidFieldKey(s.to_string()));
            }
            return Ok(FieldKey::Custom(key.to_string()));
        }
        ContactField::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .map(|f| FieldKey::Field(*f))
            .ok_or_else(|| CrmError::InvalidFieldKey(s.to_string()))
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Field Choices
// ============================================================================

/// Which contact's value wins, per field. Missing keys keep the primary's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldChoices(FxHashMap<FieldKey, ContactId>);

impl FieldChoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn choose(mut self, key: impl Into<FieldKey>, source: ContactId) -> Self {
        self.0.insert(key.into(), source);
        self
    }

    pub fn insert(&mut self, key: FieldKey, source: ContactId) {
        self.0.insert(key, source);
    }

    pub fn get(&self, key: &FieldKey) -> Option<ContactId> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &ContactId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `field=id` assignment, e.g. `email=2` or `customFields.industry=3`.
    pub fn parse_assignment(s: &str) -> CrmResult<(FieldKey, ContactId)> {
        let (key, id) = s
            .split_once('=')
            .ok_or_else(|| CrmError::InvalidFieldKey(s.to_string()))?;
        let key: FieldKey = key.parse()?;
        let id: ContactId = id
            .parse()
            .map_err(|_| CrmError::validation("fieldChoices", format!("invalid contact id in {:?}", s)))?;
        Ok((key, id))
    }
}

impl FromIterator<(FieldKey, ContactId)> for FieldChoices {
    fn from_iter<I: IntoIterator<Item = (FieldKey, ContactId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Build the consolidated record without touching any store.
///
/// 1. Start from the primary.
/// 2. Each top-level choice naming a duplicate copies that duplicate's value,
///    if it is non-empty. Choices naming the primary or an unknown id do nothing.
/// 3. Tags: union of primary then duplicates, first occurrence order.
/// 4. Custom fields: a duplicate's value is adopted when the merged map lacks the
///    key (or holds an empty value), or when `customFields.<key>` names that duplicate.
pub fn resolve_merge(primary: &Contact, duplicates: &[Contact], choices: &FieldChoices) -> Contact {
    let mut merged = primary.clone();

    for (key, source_id) in choices.iter() {
        if *source_id == primary.id {
            continue;
        }
        let FieldKey::Field(field) = key else {
            continue;
        };
        if let Some(source) = duplicates.iter().find(|c| c.id == *source_id) {
            field.copy_if_present(source, &mut merged);
        }
    }

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    merged.tags = primary
        .tags
        .iter()
        .chain(duplicates.iter().flat_map(|d| d.tags.iter()))
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect();

    let mut custom_fields = primary.custom_fields.clone();
    for duplicate in duplicates {
        for (key, value) in &duplicate.custom_fields {
            let lacks_key = custom_fields.get(key).map_or(true, |v| v.is_empty());
            let chosen = choices.get(&FieldKey::Custom(key.clone())) == Some(duplicate.id);
            if lacks_key || chosen {
                custom_fields.insert(key.clone(), value.clone());
            }
        }
    }
    merged.custom_fields = custom_fields;

    merged
}

/// Merge `duplicate_ids` into `primary_id` and persist the result.
///
/// Fails with `NotFound` before any mutation if the primary or any duplicate
/// is missing. Repeated ids, and the primary's own id, are ignored in
/// `duplicate_ids`. Concurrent merges over overlapping sets are not
/// coordinated; `&mut S` serializes calls on one store.
pub fn merge_contacts<S: ContactStore + ?Sized>(
    store: &mut S,
    primary_id: ContactId,
    duplicate_ids: &[ContactId],
    choices: &FieldChoices,
) -> CrmResult<Contact> {
    let primary = store.get_by_id(primary_id)?;

    let mut seen: FxHashSet<ContactId> = FxHashSet::default();
    let ids: Vec<ContactId> = duplicate_ids
        .iter()
        .copied()
        .filter(|id| *id != primary_id && seen.insert(*id))
        .collect();

    // Resolve everything up front
    let duplicates = ids
        .iter()
        .map(|id| store.get_by_id(*id))
        .collect::<CrmResult<Vec<_>>>()?;

    let merged = resolve_merge(&primary, &duplicates, choices);

    store.update(primary_id, ContactPatch::replace_with(&merged))?;
    for id in &ids {
        store.delete(*id)?;
    }

    info!(
        primary = %primary_id,
        removed = ids.len(),
        tags = merged.tags.len(),
        "contacts merged"
    );
    Ok(merged)
}
