//! In-memory record store.
//!
//! The store is the single source of truth for one domain's records while a view is alive.
//! It is created by the owner of the view and handed to the controller; nothing about it is
//! process-wide. Records are never physically removed: cancelling is a status write.

use crate::error::{CabinetError, CabinetResult};
use crate::record::{Patch, Record};

/// Where newly appended records land.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertPosition {
    /// New records surface first.
    #[default]
    Front,
    Back,
}

#[derive(Clone, Debug)]
pub struct RecordStore<R: Record> {
    records: Vec<R>,
    position: InsertPosition,
    revision: u64,
}

impl<R: Record> RecordStore<R> {
    /// Creates an empty store.
    pub fn new(position: InsertPosition) -> Self {
        Self {
            records: Vec::new(),
            position,
            revision: 0,
        }
    }

    /// Creates a store from seed records, rejecting duplicate ids.
    ///
    /// Seed order is kept as insertion order regardless of `position`.
    pub fn with_records(records: Vec<R>, position: InsertPosition) -> CabinetResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id().clone()) {
                return Err(CabinetError::DuplicateId(record.id().to_string()));
            }
        }

        Ok(Self {
            records,
            position,
            revision: 0,
        })
    }

    /// All records in insertion order.
    pub fn list(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, id: &R::Id) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &R::Id) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &R::Id> {
        self.records.iter().map(Record::id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Monotonic counter bumped on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Applies a partial update to the record with `id`, keeping its position.
    ///
    /// # Errors
    ///
    /// - [`CabinetError::NotFound`] if no record has `id`.
    /// - [`CabinetError::IdChanged`] if the patch rewrote the id; the record is restored.
    pub fn update_by_id(&mut self, id: &R::Id, patch: impl Patch<R>) -> CabinetResult<&R> {
        self.update_with(id, |record| patch.apply(record))
    }

    /// Closure form of [`RecordStore::update_by_id`].
    pub fn update_with(&mut self, id: &R::Id, f: impl FnOnce(&mut R)) -> CabinetResult<&R> {
        let index = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| CabinetError::NotFound(id.to_string()))?;

        let before = self.records[index].clone();
        f(&mut self.records[index]);

        if self.records[index].id() != id {
            self.records[index] = before;
            return Err(CabinetError::IdChanged(id.to_string()));
        }

        self.revision += 1;
        tracing::info!("record {} updated", id);
        Ok(&self.records[index])
    }

    /// Inserts a new record at the store's configured position.
    ///
    /// # Errors
    ///
    /// Returns [`CabinetError::DuplicateId`] if the id already exists.
    pub fn append(&mut self, record: R) -> CabinetResult<()> {
        if self.contains(record.id()) {
            return Err(CabinetError::DuplicateId(record.id().to_string()));
        }

        tracing::info!("record {} added", record.id());
        match self.position {
            InsertPosition::Front => self.records.insert(0, record),
            InsertPosition::Back => self.records.push(record),
        }
        self.revision += 1;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) struct Item {
        pub id: u32,
        pub name: String,
    }

    impl Record for Item {
        type Id = u32;
        type Status = ();
        type SortKey = ();

        fn id(&self) -> &u32 {
            &self.id
        }

        fn status(&self) {}

        fn searchable_fields(&self) -> Vec<&str> {
            vec![&self.name]
        }

        fn compare_by(&self, other: &Self, _key: ()) -> Ordering {
            self.name.cmp(&other.name)
        }
    }

    pub(crate) fn item(id: u32, name: &str) -> Item {
        Item {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn update_preserves_position_and_bumps_revision() {
        let mut store = RecordStore::with_records(
            vec![item(1, "a"), item(2, "b"), item(3, "c")],
            InsertPosition::Back,
        )
        .expect("seed");

        store
            .update_with(&2, |r| r.name = "B".into())
            .expect("update");

        let names: Vec<&str> = store.list().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "B", "c"]);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut store = RecordStore::<Item>::new(InsertPosition::Back);
        let err = store.update_with(&7, |_| {}).expect_err("missing");
        assert!(matches!(err, CabinetError::NotFound(id) if id == "7"));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn patch_changing_id_is_rejected_and_reverted() {
        let mut store =
            RecordStore::with_records(vec![item(1, "a")], InsertPosition::Back).expect("seed");
        let err = store
            .update_with(&1, |r| {
                r.id = 99;
                r.name = "changed".into();
            })
            .expect_err("id change");
        assert!(matches!(err, CabinetError::IdChanged(_)));
        assert_eq!(store.list(), &[item(1, "a")]);
    }

    #[test]
    fn append_respects_position_and_rejects_duplicates() {
        let mut front = RecordStore::new(InsertPosition::Front);
        front.append(item(1, "old")).expect("append");
        front.append(item(2, "new")).expect("append");
        assert_eq!(front.list()[0].id, 2);

        let mut back = RecordStore::new(InsertPosition::Back);
        back.append(item(1, "old")).expect("append");
        back.append(item(2, "new")).expect("append");
        assert_eq!(back.list()[0].id, 1);

        let err = back.append(item(1, "dup")).expect_err("duplicate");
        assert!(matches!(err, CabinetError::DuplicateId(id) if id == "1"));
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn seed_with_duplicate_ids_is_rejected() {
        let err = RecordStore::with_records(vec![item(1, "a"), item(1, "b")], InsertPosition::Back)
            .expect_err("duplicate");
        assert!(matches!(err, CabinetError::DuplicateId(_)));
    }
}
