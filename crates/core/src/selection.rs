//! Single-record selection and expansion.
//!
//! Both are non-owning id references resolved against the store on every read, so they
//! always reflect the latest mutation and degrade to "nothing selected" if the id is gone.

use crate::record::Record;
use crate::store::RecordStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection<Id> {
    selected: Option<Id>,
    expanded: Option<Id>,
}

impl<Id> Default for Selection<Id> {
    fn default() -> Self {
        Self {
            selected: None,
            expanded: None,
        }
    }
}

impl<Id: Clone + PartialEq> Selection<Id> {
    pub fn select(&mut self, id: Id) {
        self.selected = Some(id);
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Expands `id`, or collapses it if it is already the expanded record.
    pub fn toggle_expanded(&mut self, id: Id) {
        if self.expanded.as_ref() == Some(&id) {
            self.expanded = None;
        } else {
            self.expanded = Some(id);
        }
    }

    pub fn selected_id(&self) -> Option<&Id> {
        self.selected.as_ref()
    }

    pub fn expanded_id(&self) -> Option<&Id> {
        self.expanded.as_ref()
    }

    pub fn is_expanded(&self, id: &Id) -> bool {
        self.expanded.as_ref() == Some(id)
    }

    /// Looks the selected id up in `store`.
    pub fn selected<'s, R>(&self, store: &'s RecordStore<R>) -> Option<&'s R>
    where
        R: Record<Id = Id>,
    {
        self.selected.as_ref().and_then(|id| store.get(id))
    }

    pub fn expanded<'s, R>(&self, store: &'s RecordStore<R>) -> Option<&'s R>
    where
        R: Record<Id = Id>,
    {
        self.expanded.as_ref().and_then(|id| store.get(id))
    }
}
