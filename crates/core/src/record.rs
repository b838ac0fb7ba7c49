//! The contract every domain record type fulfils.
//!
//! A record is one row of a practice list: a consultation, a patient, a prescription. The
//! generic controller only ever sees records through this trait, so filtering, searching,
//! sorting and grouping are written once and each domain supplies its fields.

use chrono::{NaiveDate, NaiveTime};
use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A uniquely identified domain item with a closed status set.
pub trait Record: Clone + Debug {
    /// Stable identifier. Never changes once the record exists.
    type Id: Clone + Eq + Hash + Display + Debug;
    /// Closed status enumeration.
    type Status: Copy + Eq + Debug;
    /// Keys the user can explicitly sort by.
    type SortKey: Copy + Eq + Debug;

    fn id(&self) -> &Self::Id;

    fn status(&self) -> Self::Status;

    /// Fields concatenated (space-separated) for free-text search.
    fn searchable_fields(&self) -> Vec<&str>;

    /// Fields the command palette matches its query against to offer record actions.
    fn contact_fields(&self) -> Vec<&str> {
        self.searchable_fields()
    }

    /// Calendar date used by range filters, default ordering and grouping.
    fn date(&self) -> Option<NaiveDate> {
        None
    }

    /// Time of day used as the secondary default ordering key.
    fn time(&self) -> Option<NaiveTime> {
        None
    }

    /// Ascending comparison under an explicit sort key.
    fn compare_by(&self, other: &Self, key: Self::SortKey) -> Ordering;

    /// Lowercase search haystack.
    fn haystack(&self) -> String {
        self.searchable_fields().join(" ").to_lowercase()
    }

    /// Case-insensitive substring search. The needle is matched as typed, surrounding
    /// spaces included; only the empty needle matches everything.
    fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        needle.is_empty() || self.haystack().contains(&needle)
    }

    /// Case-insensitive substring search over [`Record::contact_fields`].
    fn matches_contact(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        !needle.is_empty()
            && self
                .contact_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A partial update applied to a record in place.
pub trait Patch<R> {
    fn apply(self, record: &mut R);
}

/// Returns an id strictly greater than every existing numeric id.
pub fn next_numeric_id<'a>(existing: impl IntoIterator<Item = &'a u32>) -> u32 {
    existing
        .into_iter()
        .copied()
        .max()
        .map_or(1, |max| max.saturating_add(1))
}
