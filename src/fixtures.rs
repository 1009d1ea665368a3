//! Seed data loading.
//!
//! The default data set is compiled into the binary; `--fixtures <path>`
//! swaps in any JSON file with the same shape.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::CrmResult;
use crate::models::{Activity, Contact, Deal};

static EMBEDDED_SEED: &str = include_str!("../data/seed.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl SeedData {
    /// The data set shipped with the crate.
    pub fn embedded() -> CrmResult<Self> {
        Self::from_json(EMBEDDED_SEED)
    }

    pub fn from_json(json: &str) -> CrmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> CrmResult<Self> {
        let json = fs::read_to_string(path)?;
        let seed = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            contacts = seed.contacts.len(),
            deals = seed.deals.len(),
            activities = seed.activities.len(),
            "loaded fixtures"
        );
        Ok(seed)
    }

    /// `path` if given, otherwise the embedded set.
    pub fn load(path: Option<&Path>) -> CrmResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrmError;
    use crate::models::{ActivityType, ContactId, DealStage};

    #[test]
    fn test_embedded_seed_parses() {
        let seed = SeedData::embedded().unwrap();
        assert_eq!(seed.contacts.len(), 8);
        assert_eq!(seed.deals.len(), 5);
        assert_eq!(seed.activities.len(), 6);

        let john = &seed.contacts[0];
        assert_eq!(john.id, ContactId(1));
        assert_eq!(john.custom_fields["industry"], "Technology");
        assert_eq!(seed.deals[2].stage, DealStage::Negotiation);
        assert_eq!(seed.activities[3].activity_type, ActivityType::Note);
        assert_eq!(seed.activities[3].deal_id, None);
    }

    #[test]
    fn test_partial_document() {
        let seed = SeedData::from_json(r#"{"contacts": []}"#).unwrap();
        assert!(seed.deals.is_empty());
    }

    #[test]
    fn test_bad_json_and_missing_file() {
        assert!(matches!(
            SeedData::from_json("{").unwrap_err(),
            CrmError::Fixture(_)
        ));
        assert!(matches!(
            SeedData::from_path(Path::new("/nonexistent/seed.json")).unwrap_err(),
            CrmError::Io(_)
        ));
    }
}
