//! Deal store and pipeline summary.

use tracing::debug;

use crate::error::{CrmError, CrmResult, RecordKind};
use crate::models::{now_millis, ContactId, Deal, DealId, DealPatch, DealStage, NewDeal, StageSummary};
use crate::normalize::{search_key, search_matches};

fn not_found(id: DealId) -> CrmError {
    CrmError::NotFound {
        kind: RecordKind::Deal,
        id: id.get(),
    }
}

fn validate_new_deal(input: &NewDeal) -> CrmResult<()> {
    if input.title.trim().is_empty() {
        return Err(CrmError::validation("title", "Deal title is required"));
    }
    if input.value.is_nan() || input.value <= 0.0 {
        return Err(CrmError::validation("value", "Deal value must be greater than 0"));
    }
    if input.contact_id.map_or(true, |id| id.get() == 0) {
        return Err(CrmError::validation("contactId", "Please select a contact"));
    }
    if input.expected_close_date.trim().is_empty() {
        return Err(CrmError::validation(
            "expectedCloseDate",
            "Expected close date is required",
        ));
    }
    if input.probability > 100 {
        return Err(CrmError::validation(
            "probability",
            "Probability must be between 0 and 100",
        ));
    }
    Ok(())
}

/// In-memory deal store, insertion ordered.
#[derive(Debug, Clone)]
pub struct DealStore {
    deals: Vec<Deal>,
    next_id: u32,
}

impl Default for DealStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DealStore {
    pub fn new() -> Self {
        Self {
            deals: Vec::new(),
            next_id: 1,
        }
    }

    pub fn from_records(deals: Vec<Deal>) -> CrmResult<Self> {
        let next_id = deals
            .iter()
            .map(|d| d.id.get())
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| CrmError::ids_exhausted(RecordKind::Deal))?;
        Ok(Self { deals, next_id })
    }

    pub fn get_all(&self) -> Vec<Deal> {
        self.deals.clone()
    }

    pub fn get_by_id(&self, id: DealId) -> CrmResult<Deal> {
        self.deals
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub fn get_by_contact(&self, contact_id: ContactId) -> Vec<Deal> {
        self.deals
            .iter()
            .filter(|d| d.contact_id == contact_id)
            .cloned()
            .collect()
    }

    pub fn create(&mut self, input: NewDeal) -> CrmResult<Deal> {
        validate_new_deal(&input)?;
        let contact_id = input
            .contact_id
            .ok_or_else(|| CrmError::validation("contactId", "Please select a contact"))?;

        let id = DealId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| CrmError::ids_exhausted(RecordKind::Deal))?;

        let deal = Deal {
            id,
            title: input.title,
            value: input.value,
            stage: input.stage,
            contact_id,
            probability: input.probability,
            expected_close_date: input.expected_close_date,
            created_at: now_millis(),
        };
        debug!(id = %id, title = %deal.title, "deal created");
        self.deals.push(deal.clone());
        Ok(deal)
    }

    pub fn update(&mut self, id: DealId, patch: DealPatch) -> CrmResult<Deal> {
        let deal = self
            .deals
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| not_found(id))?;

        if let Some(title) = patch.title {
            deal.title = title;
        }
        if let Some(value) = patch.value {
            deal.value = value;
        }
        if let Some(stage) = patch.stage {
            deal.stage = stage;
        }
        if let Some(contact_id) = patch.contact_id {
            deal.contact_id = contact_id;
        }
        if let Some(probability) = patch.probability {
            deal.probability = probability;
        }
        if let Some(date) = patch.expected_close_date {
            deal.expected_close_date = date;
        }
        debug!(id = %id, "deal updated");
        Ok(deal.clone())
    }

    /// Move a deal to another pipeline column.
    pub fn update_stage(&mut self, id: DealId, stage: DealStage) -> CrmResult<Deal> {
        self.update(
            id,
            DealPatch {
                stage: Some(stage),
                ..Default::default()
            },
        )
    }

    pub fn delete(&mut self, id: DealId) -> CrmResult<Deal> {
        let index = self
            .deals
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| not_found(id))?;
        debug!(id = %id, "deal deleted");
        Ok(self.deals.remove(index))
    }

    /// Title substring match, case- and accent-insensitive.
    pub fn search(&self, query: &str) -> Vec<Deal> {
        let needle = search_key(query);
        self.deals
            .iter()
            .filter(|d| search_matches(&d.title, &needle))
            .cloned()
            .collect()
    }

    /// Count and total value per stage, in pipeline order. Empty stages are included.
    pub fn pipeline_summary(&self) -> Vec<StageSummary> {
        DealStage::ALL
            .iter()
            .map(|&stage| {
                let in_stage = self.deals.iter().filter(|d| d.stage == stage);
                let (count, total_value) =
                    in_stage.fold((0, 0.0), |(n, sum), d| (n + 1, sum + d.value));
                StageSummary {
                    stage,
                    count,
                    total_value,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }
}
