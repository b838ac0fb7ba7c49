//! Derived view: filter, then sort, then (optionally) group.
//!
//! Everything here is a pure function of the records, the query state and the reference
//! date. No matches is an empty view, never an error.

use crate::constants::WEEK_RANGE_DAYS;
use crate::dates::format_date;
use crate::query::{QueryState, RangeFilter, SortDirection};
use crate::record::Record;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Label of the group holding records without a date.
pub const UNDATED_GROUP: &str = "Sans date";

/// Computes the positions (into `records`) of the derived view, in display order.
pub fn derive_indices<R: Record>(
    records: &[R],
    query: &QueryState<R::SortKey, R::Status>,
    today: NaiveDate,
) -> Vec<usize> {
    let mut indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| in_range(r.date(), query.range, today))
        .filter(|(_, r)| query.status.accepts(&r.status()))
        .filter(|(_, r)| r.matches_search(&query.search))
        .map(|(i, _)| i)
        .collect();

    match query.sort {
        Some(spec) => indices.sort_by(|&a, &b| {
            let (ra, rb) = (&records[a], &records[b]);
            let ord = ra
                .compare_by(rb, spec.key)
                .then_with(|| match spec.previous {
                    Some(previous) => ra.compare_by(rb, previous),
                    None => Ordering::Equal,
                })
                .then(a.cmp(&b));
            match spec.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }),
        None => indices.sort_by(|&a, &b| {
            let (ra, rb) = (&records[a], &records[b]);
            rb.date()
                .cmp(&ra.date())
                .then_with(|| ra.time().cmp(&rb.time()))
                .then(a.cmp(&b))
        }),
    }

    indices
}

/// Pure derived view over borrowed records.
pub fn derive_view<'a, R: Record>(
    records: &'a [R],
    query: &QueryState<R::SortKey, R::Status>,
    today: NaiveDate,
) -> Vec<&'a R> {
    derive_indices(records, query, today)
        .into_iter()
        .map(|i| &records[i])
        .collect()
}

fn in_range(date: Option<NaiveDate>, range: RangeFilter, today: NaiveDate) -> bool {
    match range {
        RangeFilter::All => true,
        RangeFilter::Today => date == Some(today),
        RangeFilter::Week => {
            let start = today - chrono::Duration::days(WEEK_RANGE_DAYS - 1);
            date.is_some_and(|d| d >= start && d <= today)
        }
    }
}

/// Records sharing one display date.
#[derive(Debug)]
pub struct Group<'a, R> {
    pub key: String,
    pub date: Option<NaiveDate>,
    pub records: Vec<&'a R>,
}

/// Partitions an already-ordered view into date groups.
///
/// Groups appear in the order their first member appears; members keep their relative
/// order. The total number of records is unchanged.
pub fn group_by_date<'a, R: Record>(view: &[&'a R]) -> Vec<Group<'a, R>> {
    let mut groups: Vec<Group<'a, R>> = Vec::new();
    let mut positions: HashMap<Option<NaiveDate>, usize> = HashMap::new();

    for &record in view {
        let date = record.date();
        let slot = *positions.entry(date).or_insert_with(|| {
            groups.push(Group {
                key: date.map_or_else(|| UNDATED_GROUP.to_string(), format_date),
                date,
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record);
    }

    groups
}
