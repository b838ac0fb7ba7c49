//! Filterable list controller.
//!
//! Ties a [`RecordStore`], the current [`QueryState`] and a [`Selection`] together and
//! serves the memoised derived view. One controller exists per open list; the owner creates
//! it with an injected store and drops it when the list goes away.

use crate::config::CoreConfig;
use crate::error::{CabinetError, CabinetResult};
use crate::query::{QueryState, RangeFilter, StatusFilter};
use crate::record::{Patch, Record};
use crate::selection::Selection;
use crate::store::RecordStore;
use crate::view::{derive_indices, group_by_date, Group};
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::sync::Arc;

type Query<R> = QueryState<<R as Record>::SortKey, <R as Record>::Status>;

struct Memo<R: Record> {
    revision: u64,
    today: NaiveDate,
    query: Query<R>,
    indices: Vec<usize>,
}

pub struct ListController<R: Record> {
    cfg: Arc<CoreConfig>,
    store: RecordStore<R>,
    query: Query<R>,
    selection: Selection<R::Id>,
    memo: RefCell<Option<Memo<R>>>,
    recomputations: Cell<usize>,
}

impl<R: Record> ListController<R> {
    pub fn new(cfg: Arc<CoreConfig>, store: RecordStore<R>) -> Self {
        Self {
            cfg,
            store,
            query: QueryState::default(),
            selection: Selection::default(),
            memo: RefCell::new(None),
            recomputations: Cell::new(0),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    pub fn query(&self) -> &Query<R> {
        &self.query
    }

    pub fn selection(&self) -> &Selection<R::Id> {
        &self.selection
    }

    // ------------------------------------------------------------------
    // Query state
    // ------------------------------------------------------------------

    pub fn set_range(&mut self, range: RangeFilter) {
        self.query.range = range;
    }

    pub fn set_status(&mut self, status: StatusFilter<R::Status>) {
        self.query.status = status;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
    }

    pub fn sort_by(&mut self, key: R::SortKey) {
        self.query.sort_by(key);
    }

    pub fn clear_sort(&mut self) {
        self.query.clear_sort();
    }

    pub fn reset_filters(&mut self) {
        self.query.reset_filters();
    }

    // ------------------------------------------------------------------
    // Derived view
    // ------------------------------------------------------------------

    /// The current derived view. Recomputed only when the store or query changed.
    pub fn view(&self) -> Vec<&R> {
        self.refresh();
        let memo = self.memo.borrow();
        let records = self.store.list();
        memo.as_ref()
            .map(|m| m.indices.iter().map(|&i| &records[i]).collect())
            .unwrap_or_default()
    }

    /// The current derived view partitioned by date.
    pub fn groups(&self) -> Vec<Group<'_, R>> {
        group_by_date(&self.view())
    }

    /// Number of times the derived view was actually recomputed.
    pub fn recomputations(&self) -> usize {
        self.recomputations.get()
    }

    fn refresh(&self) {
        let revision = self.store.revision();
        let today = self.cfg.today();
        let mut memo = self.memo.borrow_mut();

        let fresh = memo.as_ref().is_some_and(|m| {
            m.revision == revision && m.today == today && m.query == self.query
        });
        if fresh {
            return;
        }

        let indices = derive_indices(self.store.list(), &self.query, today);
        tracing::debug!(
            "derived view recomputed: {} of {} records",
            indices.len(),
            self.store.len()
        );
        self.recomputations.set(self.recomputations.get() + 1);
        *memo = Some(Memo {
            revision,
            today,
            query: self.query.clone(),
            indices,
        });
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Looks up a record, logging a lookup miss.
    pub fn record(&self, id: &R::Id) -> CabinetResult<&R> {
        self.store.get(id).ok_or_else(|| {
            tracing::warn!("record {} not found", id);
            CabinetError::NotFound(id.to_string())
        })
    }

    pub fn update_by_id(&mut self, id: &R::Id, patch: impl Patch<R>) -> CabinetResult<&R> {
        self.store.update_by_id(id, patch)
    }

    pub fn update_with(&mut self, id: &R::Id, f: impl FnOnce(&mut R)) -> CabinetResult<&R> {
        self.store.update_with(id, f)
    }

    pub fn append(&mut self, record: R) -> CabinetResult<()> {
        self.store.append(record)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Selects an existing record.
    pub fn select(&mut self, id: &R::Id) -> CabinetResult<()> {
        self.record(id)?;
        self.selection.select(id.clone());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selection.deselect();
    }

    pub fn toggle_expanded(&mut self, id: &R::Id) -> CabinetResult<()> {
        self.record(id)?;
        self.selection.toggle_expanded(id.clone());
        Ok(())
    }

    /// The selected record, resolved against the current store.
    pub fn selected(&self) -> Option<&R> {
        self.selection.selected(&self.store)
    }

    pub fn expanded(&self) -> Option<&R> {
        self.selection.expanded(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InsertPosition;
    use crate::view::tests::{day, row, rows, Key, Status};

    fn controller() -> ListController<crate::view::tests::Row> {
        let cfg = Arc::new(CoreConfig::with_today(day(20)));
        let store = RecordStore::with_records(rows(), InsertPosition::Front).expect("seed");
        ListController::new(cfg, store)
    }

    #[test]
    fn view_is_memoised_until_inputs_change() {
        let mut ctl = controller();
        assert_eq!(ctl.view().len(), 5);
        assert_eq!(ctl.view().len(), 5);
        assert_eq!(ctl.recomputations(), 1);

        ctl.set_status(StatusFilter::Only(Status::Done));
        assert_eq!(ctl.view().len(), 2);
        assert_eq!(ctl.recomputations(), 2);

        // Setting the same value again does not invalidate.
        ctl.set_status(StatusFilter::Only(Status::Done));
        let _ = ctl.view();
        assert_eq!(ctl.recomputations(), 2);

        ctl.update_with(&2, |r| r.status = Status::Open)
            .expect("update");
        assert_eq!(ctl.view().len(), 1);
        assert_eq!(ctl.recomputations(), 3);
    }

    #[test]
    fn appended_records_show_up_in_view() {
        let mut ctl = controller();
        ctl.set_range(RangeFilter::Today);
        assert_eq!(ctl.view().len(), 2);

        ctl.append(row(6, "Nour Hamdi", 5, Status::Open, 20, "07:45"))
            .expect("append");
        let ids: Vec<u32> = ctl.view().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![6, 3, 1]);
    }

    #[test]
    fn groups_follow_view() {
        let mut ctl = controller();
        ctl.sort_by(Key::Name);
        let total: usize = ctl.groups().iter().map(|g| g.records.len()).sum();
        assert_eq!(total, ctl.view().len());
    }

    #[test]
    fn select_unknown_record_is_a_lookup_error() {
        let mut ctl = controller();
        let err = ctl.select(&99).expect_err("missing");
        assert!(matches!(err, CabinetError::NotFound(_)));
        assert!(ctl.selected().is_none());

        ctl.select(&3).expect("select");
        assert_eq!(ctl.selected().map(|r| r.id), Some(3));
    }
}
