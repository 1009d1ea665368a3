//! `Crm` ties the stores and the duplicate detector together.
//!
//! Cross-store rules live here: a deal or activity can only be created for a
//! contact that exists, and an activity's deal must exist too.

use indicatif::ProgressBar;

use crate::activities::ActivityStore;
use crate::deals::DealStore;
use crate::duplicates::{DetectionReport, DuplicateDetector};
use crate::error::{CrmError, CrmResult};
use crate::fixtures::SeedData;
use crate::merge::{merge_contacts, FieldChoices};
use crate::models::{Activity, Contact, ContactId, Deal, DuplicateGroup, NewActivity, NewDeal, StageSummary};
use crate::scoring::ScoringConfig;
use crate::search::{global_search, SearchHit};
use crate::store::{ContactStore, InMemoryContactStore};

#[derive(Debug, Clone, Default)]
pub struct Crm<S: ContactStore = InMemoryContactStore> {
    contacts: S,
    deals: DealStore,
    activities: ActivityStore,
    detector: DuplicateDetector,
}

impl Crm<InMemoryContactStore> {
    /// Build in-memory stores from seed data.
    pub fn from_seed(seed: SeedData, config: ScoringConfig) -> CrmResult<Self> {
        Ok(Self::new(
            InMemoryContactStore::from_records(seed.contacts)?,
            DealStore::from_records(seed.deals)?,
            ActivityStore::from_records(seed.activities)?,
            DuplicateDetector::new(config),
        ))
    }
}

impl<S: ContactStore> Crm<S> {
    pub fn new(contacts: S, deals: DealStore, activities: ActivityStore, detector: DuplicateDetector) -> Self {
        Self {
            contacts,
            deals,
            activities,
            detector,
        }
    }

    pub fn contacts(&self) -> &S {
        &self.contacts
    }

    pub fn contacts_mut(&mut self) -> &mut S {
        &mut self.contacts
    }

    pub fn deals(&self) -> &DealStore {
        &self.deals
    }

    pub fn deals_mut(&mut self) -> &mut DealStore {
        &mut self.deals
    }

    pub fn activities(&self) -> &ActivityStore {
        &self.activities
    }

    pub fn activities_mut(&mut self) -> &mut ActivityStore {
        &mut self.activities
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    // ========================================================================
    // Duplicates
    // ========================================================================

    pub fn find_duplicates(&self, scope: Option<ContactId>) -> Vec<DuplicateGroup> {
        self.detector.find_in_store(&self.contacts, scope)
    }

    pub fn scan_duplicates(&self, scope: Option<ContactId>, progress: Option<&ProgressBar>) -> DetectionReport {
        self.detector.scan(&self.contacts.get_all(), scope, progress)
    }

    /// See [`merge_contacts`]. Deals and activities of removed contacts are left as they are.
    pub fn merge_contacts(
        &mut self,
        primary: ContactId,
        duplicates: &[ContactId],
        choices: &FieldChoices,
    ) -> CrmResult<Contact> {
        merge_contacts(&mut self.contacts, primary, duplicates, choices)
    }

    // ========================================================================
    // Deals and activities
    // ========================================================================

    pub fn create_deal(&mut self, input: NewDeal) -> CrmResult<Deal> {
        if let Some(contact_id) = input.contact_id {
            if contact_id.get() != 0 && !self.contacts.contains(contact_id) {
                return Err(CrmError::contact_not_found(contact_id.get()));
            }
        }
        self.deals.create(input)
    }

    pub fn log_activity(&mut self, input: NewActivity) -> CrmResult<Activity> {
        if input.contact_id.get() != 0 && !self.contacts.contains(input.contact_id) {
            return Err(CrmError::contact_not_found(input.contact_id.get()));
        }
        if let Some(deal_id) = input.deal_id {
            self.deals.get_by_id(deal_id)?;
        }
        self.activities.create(input)
    }

    pub fn pipeline_summary(&self) -> Vec<StageSummary> {
        self.deals.pipeline_summary()
    }

    pub fn global_search(&self, query: &str) -> Vec<SearchHit> {
        global_search(&self.contacts, &self.deals, &self.activities, query)
    }
}
