//! Activity log store.
//!
//! Listings are returned newest first; records with equal timestamps keep
//! insertion order.

use tracing::debug;

use crate::error::{CrmError, CrmResult, RecordKind};
use crate::models::{now_millis, Activity, ActivityId, ActivityPatch, ContactId, DealId, NewActivity};
use crate::normalize::{search_key, search_matches};

fn not_found(id: ActivityId) -> CrmError {
    CrmError::NotFound {
        kind: RecordKind::Activity,
        id: id.get(),
    }
}

fn newest_first<'a>(activities: impl Iterator<Item = &'a Activity>) -> Vec<Activity> {
    let mut out: Vec<Activity> = activities.cloned().collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

#[derive(Debug, Clone)]
pub struct ActivityStore {
    activities: Vec<Activity>,
    next_id: u32,
}

impl Default for ActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityStore {
    pub fn new() -> Self {
        Self {
            activities: Vec::new(),
            next_id: 1,
        }
    }

    pub fn from_records(activities: Vec<Activity>) -> CrmResult<Self> {
        let next_id = activities
            .iter()
            .map(|a| a.id.get())
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| CrmError::ids_exhausted(RecordKind::Activity))?;
        Ok(Self { activities, next_id })
    }

    pub fn get_all(&self) -> Vec<Activity> {
        newest_first(self.activities.iter())
    }

    pub fn get_by_id(&self, id: ActivityId) -> CrmResult<Activity> {
        self.activities
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub fn get_by_contact(&self, contact_id: ContactId) -> Vec<Activity> {
        newest_first(self.activities.iter().filter(|a| a.contact_id == contact_id))
    }

    pub fn get_by_deal(&self, deal_id: DealId) -> Vec<Activity> {
        newest_first(self.activities.iter().filter(|a| a.deal_id == Some(deal_id)))
    }

    pub fn create(&mut self, input: NewActivity) -> CrmResult<Activity> {
        if input.contact_id.get() == 0 {
            return Err(CrmError::validation("contactId", "Please select a contact"));
        }
        if input.content.trim().is_empty() {
            return Err(CrmError::validation("content", "Content is required"));
        }

        let id = ActivityId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| CrmError::ids_exhausted(RecordKind::Activity))?;

        let activity = Activity {
            id,
            activity_type: input.activity_type,
            content: input.content,
            contact_id: input.contact_id,
            deal_id: input.deal_id,
            timestamp: now_millis(),
        };
        debug!(id = %id, kind = %activity.activity_type, "activity logged");
        self.activities.push(activity.clone());
        Ok(activity)
    }

    pub fn update(&mut self, id: ActivityId, patch: ActivityPatch) -> CrmResult<Activity> {
        let activity = self
            .activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found(id))?;

        if let Some(kind) = patch.activity_type {
            activity.activity_type = kind;
        }
        if let Some(content) = patch.content {
            activity.content = content;
        }
        if let Some(contact_id) = patch.contact_id {
            activity.contact_id = contact_id;
        }
        if let Some(deal_id) = patch.deal_id {
            activity.deal_id = deal_id;
        }
        debug!(id = %id, "activity updated");
        Ok(activity.clone())
    }

    pub fn delete(&mut self, id: ActivityId) -> CrmResult<Activity> {
        let index = self
            .activities
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found(id))?;
        debug!(id = %id, "activity deleted");
        Ok(self.activities.remove(index))
    }

    /// Matches on content or on the type name ("call", "meeting", ...).
    pub fn search(&self, query: &str) -> Vec<Activity> {
        let needle = search_key(query);
        self.activities
            .iter()
            .filter(|a| {
                search_matches(&a.content, &needle)
                    || search_matches(&a.activity_type.to_string(), &needle)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;

    fn activity(id: u32, kind: ActivityType, content: &str, contact: u32, deal: Option<u32>, ts: u64) -> Activity {
        Activity {
            id: ActivityId(id),
            activity_type: kind,
            content: content.to_string(),
            contact_id: ContactId(contact),
            deal_id: deal.map(DealId),
            timestamp: ts,
        }
    }

    fn seeded() -> ActivityStore {
        ActivityStore::from_records(vec![
            activity(1, ActivityType::Call, "Intro call", 1, None, 100),
            activity(2, ActivityType::Email, "Sent proposal", 1, Some(1), 300),
            activity(3, ActivityType::Meeting, "On-site demo", 2, Some(1), 200),
            activity(4, ActivityType::Note, "Prefers email", 2, None, 300),
        ])
        .unwrap()
    }

    fn ids(activities: &[Activity]) -> Vec<u32> {
        activities.iter().map(|a| a.id.get()).collect()
    }

    #[test]
    fn test_lists_are_newest_first() {
        let store = seeded();
        assert_eq!(ids(&store.get_all()), vec![2, 4, 3, 1]);
        assert_eq!(ids(&store.get_by_contact(ContactId(1))), vec![2, 1]);
        assert_eq!(ids(&store.get_by_deal(DealId(1))), vec![2, 3]);
        assert!(store.get_by_deal(DealId(9)).is_empty());
    }

    #[test]
    fn test_create_stamps_and_validates() {
        let mut store = seeded();
        let created = store
            .create(NewActivity {
                activity_type: ActivityType::Task,
                content: "Follow up".to_string(),
                contact_id: ContactId(2),
                deal_id: None,
            })
            .unwrap();
        assert_eq!(created.id, ActivityId(5));
        assert!(created.timestamp > 0);
        // newest entry sorts first
        assert_eq!(store.get_all()[0].id, ActivityId(5));

        let err = store
            .create(NewActivity {
                content: "  ".to_string(),
                contact_id: ContactId(2),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation { field: "content", .. }));

        let err = store
            .create(NewActivity {
                content: "x".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation { field: "contactId", .. }));
    }

    #[test]
    fn test_id_overflow_is_an_error() {
        let last = activity(u32::MAX, ActivityType::Note, "x", 1, None, 0);
        let err = ActivityStore::from_records(vec![last]).unwrap_err();
        assert!(matches!(err, CrmError::Validation { field: "Id", .. }));

        let near = activity(u32::MAX - 1, ActivityType::Note, "x", 1, None, 0);
        let mut store = ActivityStore::from_records(vec![near]).unwrap();
        let err = store
            .create(NewActivity {
                content: "one more".to_string(),
                contact_id: ContactId(1),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation { field: "Id", .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let mut store = seeded();
        let updated = store
            .update(
                ActivityId(1),
                ActivityPatch {
                    deal_id: Some(Some(DealId(2))),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.deal_id, Some(DealId(2)));
        assert_eq!(updated.content, "Intro call");

        store.delete(ActivityId(1)).unwrap();
        assert!(store.get_by_id(ActivityId(1)).unwrap_err().is_not_found());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_search_content_or_type() {
        let store = seeded();
        // "email" hits the Email type and the note content
        assert_eq!(ids(&store.search("email")), vec![2, 4]);
        assert_eq!(ids(&store.search("MEETING")), vec![3]);
        assert_eq!(ids(&store.search("demo")), vec![3]);
    }
}
