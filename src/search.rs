//! Global search across contacts, deals and activities.

use serde::Serialize;
use std::fmt;

use crate::activities::ActivityStore;
use crate::deals::DealStore;
use crate::models::{Activity, Contact, Deal};
use crate::store::ContactStore;

/// Queries shorter than this (after trimming, in chars) return nothing
pub const MIN_QUERY_LEN: usize = 2;

/// Maximum hits taken from each record kind
pub const HITS_PER_KIND: usize = 3;

/// One search result, tagged with the kind of record it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum SearchHit {
    Contact(Contact),
    Deal(Deal),
    Activity(Activity),
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchHit::Contact(c) => write!(f, "contact  #{} {} <{}> ({})", c.id, c.name, c.email, c.company),
            SearchHit::Deal(d) => write!(f, "deal     #{} {} [{}] {:.2}", d.id, d.title, d.stage, d.value),
            SearchHit::Activity(a) => write!(f, "activity #{} {}: {}", a.id, a.activity_type, a.content),
        }
    }
}

/// Up to three contacts, then three deals, then three activities matching `query`.
pub fn global_search<S: ContactStore + ?Sized>(
    contacts: &S,
    deals: &DealStore,
    activities: &ActivityStore,
    query: &str,
) -> Vec<SearchHit> {
    if query.trim().chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }

    let contact_hits = contacts
        .search(query)
        .into_iter()
        .take(HITS_PER_KIND)
        .map(SearchHit::Contact);
    let deal_hits = deals
        .search(query)
        .into_iter()
        .take(HITS_PER_KIND)
        .map(SearchHit::Deal);
    let activity_hits = activities
        .search(query)
        .into_iter()
        .take(HITS_PER_KIND)
        .map(SearchHit::Activity);

    contact_hits.chain(deal_hits).chain(activity_hits).collect()
}
