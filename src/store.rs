//! Contact repository.
//!
//! `ContactStore` is the seam the detector and the merge resolver depend on;
//! `InMemoryContactStore` is the only implementation (no persistence).

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{CrmError, CrmResult, RecordKind};
use crate::models::{now_millis, Contact, ContactId, ContactPatch, NewContact};
use crate::normalize::{is_valid_email, search_key, search_matches};

pub trait ContactStore {
    /// Snapshot of every contact, in insertion order.
    fn get_all(&self) -> Vec<Contact>;

    fn get_by_id(&self, id: ContactId) -> CrmResult<Contact>;

    fn contains(&self, id: ContactId) -> bool {
        self.get_by_id(id).is_ok()
    }

    /// Validate and insert a new contact, assigning the next identifier.
    fn create(&mut self, input: NewContact) -> CrmResult<Contact>;

    /// Shallow-merge `patch` into the stored record. The identifier never changes.
    fn update(&mut self, id: ContactId, patch: ContactPatch) -> CrmResult<Contact>;

    /// Remove a record, returning it.
    fn delete(&mut self, id: ContactId) -> CrmResult<Contact>;

    /// Case- and accent-insensitive match on name, email, company or any tag.
    fn search(&self, query: &str) -> Vec<Contact>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Vec-backed contact store. Keeps insertion order so detection output is stable.
#[derive(Debug, Clone)]
pub struct InMemoryContactStore {
    contacts: Vec<Contact>,
    /// High-water mark: ids are never handed out twice, even after deletes.
    next_id: u32,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
            next_id: 1,
        }
    }

    /// Seed the store with existing records. Rejects repeated identifiers.
    pub fn from_records(contacts: Vec<Contact>) -> CrmResult<Self> {
        let mut seen: FxHashSet<ContactId> = FxHashSet::default();
        for contact in &contacts {
            if !seen.insert(contact.id) {
                return Err(CrmError::validation(
                    "Id",
                    format!("duplicate contact id {}", contact.id),
                ));
            }
        }
        let next_id = contacts
            .iter()
            .map(|c| c.id.get())
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| CrmError::ids_exhausted(RecordKind::Contact))?;
        Ok(Self { contacts, next_id })
    }

    pub fn as_slice(&self) -> &[Contact] {
        &self.contacts
    }

    fn position(&self, id: ContactId) -> CrmResult<usize> {
        self.contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CrmError::contact_not_found(id.get()))
    }
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_new_contact(input: &NewContact) -> CrmResult<()> {
    if input.name.trim().is_empty() {
        return Err(CrmError::validation("name", "Name is required"));
    }
    if input.email.trim().is_empty() {
        return Err(CrmError::validation("email", "Email is required"));
    }
    if !is_valid_email(&input.email) {
        return Err(CrmError::validation(
            "email",
            "Please enter a valid email address",
        ));
    }
    if input.company.trim().is_empty() {
        return Err(CrmError::validation("company", "Company is required"));
    }
    Ok(())
}

impl ContactStore for InMemoryContactStore {
    fn get_all(&self) -> Vec<Contact> {
        self.contacts.clone()
    }

    fn get_by_id(&self, id: ContactId) -> CrmResult<Contact> {
        self.contacts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CrmError::contact_not_found(id.get()))
    }

    fn create(&mut self, input: NewContact) -> CrmResult<Contact> {
        validate_new_contact(&input)?;

        let id = ContactId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| CrmError::ids_exhausted(RecordKind::Contact))?;

        let contact = Contact {
            id,
            name: input.name,
            email: input.email,
            phone: input.phone.filter(|p| !p.is_empty()),
            company: input.company,
            status: input.status,
            tags: input.tags,
            custom_fields: input.custom_fields,
            created_at: now_millis(),
        };
        debug!(id = %id, name = %contact.name, "contact created");
        self.contacts.push(contact.clone());
        Ok(contact)
    }

    fn update(&mut self, id: ContactId, patch: ContactPatch) -> CrmResult<Contact> {
        let index = self.position(id)?;
        let contact = &mut self.contacts[index];
        patch.apply(contact);
        debug!(id = %id, "contact updated");
        Ok(contact.clone())
    }

    fn delete(&mut self, id: ContactId) -> CrmResult<Contact> {
        let index = self.position(id)?;
        let removed = self.contacts.remove(index);
        debug!(id = %id, "contact deleted");
        Ok(removed)
    }

    fn search(&self, query: &str) -> Vec<Contact> {
        let needle = search_key(query);
        self.contacts
            .iter()
            .filter(|c| {
                search_matches(&c.name, &needle)
                    || search_matches(&c.email, &needle)
                    || search_matches(&c.company, &needle)
                    || c.tags.iter().any(|t| search_matches(t, &needle))
            })
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.contacts.len()
    }
}
