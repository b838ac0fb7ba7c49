//! Command palette: a searchable, keyboard-driven list of actions.
//!
//! Two pure pieces:
//! - [`build_items`] turns records, the palette query and an optional focused record into
//!   the ranked item list.
//! - [`PaletteState::reduce`] applies one [`PaletteEvent`] to the palette state given the
//!   items currently shown, and reports the action to run, if any.
//!
//! The index invariant is enforced by the reducer: whenever the palette is open the index
//! is clamped to `[0, items.len() - 1]` (or `0` when there are no items).

use crate::keyboard::{Key, KeyEvent};
use crate::record::Record;
use std::collections::HashSet;

/// Shortcut letter that toggles the palette together with Ctrl or Cmd.
pub const PALETTE_SHORTCUT: char = 'k';

/// Most records offered as contextual matches for one query.
pub const MAX_CONTEXT_RECORDS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteGroup {
    /// Always-available actions (new record, export).
    Global,
    /// Filter and sort shortcuts.
    Filter,
    /// Actions on the record the user has pinned.
    Focused,
    /// Actions on records whose contact fields match the query.
    Contextual,
}

impl PaletteGroup {
    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "Actions",
            Self::Filter => "Filtres",
            Self::Focused => "Sélection",
            Self::Contextual => "Résultats",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaletteItem<A> {
    /// Unique within one palette listing.
    pub key: String,
    pub label: String,
    pub hint: String,
    /// Extra text matched by the query but not displayed as the label.
    pub meta: String,
    pub group: PaletteGroup,
    pub disabled: bool,
    pub action: A,
}

impl<A> PaletteItem<A> {
    pub fn new(key: impl Into<String>, label: impl Into<String>, action: A) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            hint: String::new(),
            meta: String::new(),
            group: PaletteGroup::Global,
            disabled: false,
            action,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = meta.into();
        self
    }

    pub fn group(mut self, group: PaletteGroup) -> Self {
        self.group = group;
        self
    }

    pub fn disabled_if(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn matches(&self, needle: &str) -> bool {
        format!("{} {} {}", self.label, self.hint, self.meta)
            .to_lowercase()
            .contains(needle)
    }
}

/// Supplies the actions of one domain.
pub trait PaletteProvider {
    type Record: Record;
    type Action: Clone;

    /// Actions that exist regardless of records.
    fn global_items(&self) -> Vec<PaletteItem<Self::Action>>;

    /// Actions on one record. `group` is either `Focused` or `Contextual`; keys must embed
    /// the record id so the same action for two records stays distinct.
    fn record_items(
        &self,
        record: &Self::Record,
        group: PaletteGroup,
    ) -> Vec<PaletteItem<Self::Action>>;
}

/// Builds the palette listing.
///
/// Candidates are the global actions, the focused record's actions, and actions for up to
/// [`MAX_CONTEXT_RECORDS`] records whose contact fields contain the query. When the query
/// is non-empty only items whose label, hint or meta contain it are kept. Record items
/// carry the record's contact fields in their meta, so a record matched by phone number
/// stays listed. Duplicate keys keep their first occurrence; `limit` caps the result.
pub fn build_items<P: PaletteProvider>(
    provider: &P,
    records: &[P::Record],
    query: &str,
    focused: Option<&P::Record>,
    limit: Option<usize>,
) -> Vec<PaletteItem<P::Action>> {
    let needle = query.to_lowercase();
    let mut items = provider.global_items();

    let record_items = |record: &P::Record, group: PaletteGroup| {
        let contact = record.contact_fields().join(" ");
        provider
            .record_items(record, group)
            .into_iter()
            .map(|mut item| {
                item.group = group;
                if !contact.is_empty() {
                    item.meta = format!("{} {}", item.meta, contact).trim().to_string();
                }
                item
            })
            .collect::<Vec<_>>()
    };

    if let Some(record) = focused {
        items.extend(record_items(record, PaletteGroup::Focused));
    }

    if !needle.is_empty() {
        let focused_id = focused.map(Record::id);
        let matches = records
            .iter()
            .filter(|r| Some(r.id()) != focused_id)
            .filter(|r| r.matches_contact(&needle))
            .take(MAX_CONTEXT_RECORDS)
            .collect::<Vec<_>>();
        for record in matches {
            items.extend(record_items(record, PaletteGroup::Contextual));
        }
        items.retain(|item| item.matches(&needle));
    }

    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.key.clone()));

    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaletteEvent {
    Open,
    Close,
    QueryChanged(String),
    MoveUp,
    MoveDown,
    Submit,
}

impl PaletteEvent {
    /// Maps a key press to a palette event for the current state.
    pub fn from_key(state: &PaletteState, key: &KeyEvent) -> Option<Self> {
        if key.is_shortcut(PALETTE_SHORTCUT) {
            return Some(if state.open { Self::Close } else { Self::Open });
        }
        if !state.open {
            return None;
        }
        match key.key {
            Key::Escape => Some(Self::Close),
            Key::ArrowUp => Some(Self::MoveUp),
            Key::ArrowDown => Some(Self::MoveDown),
            Key::Enter => Some(Self::Submit),
            Key::Char(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaletteState {
    open: bool,
    query: String,
    index: usize,
}

/// Outcome of one reducer step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<A> {
    pub state: PaletteState,
    /// Action to execute, already checked to be enabled.
    pub run: Option<A>,
}

impl PaletteState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Applies `event` given the items currently displayed.
    pub fn reduce<A: Clone>(&self, event: PaletteEvent, items: &[PaletteItem<A>]) -> Transition<A> {
        let last = items.len().saturating_sub(1);
        let mut next = self.clone();
        let mut run = None;

        match event {
            PaletteEvent::Open => {
                next = PaletteState {
                    open: true,
                    query: String::new(),
                    index: 0,
                };
            }
            _ if !self.open => {}
            PaletteEvent::Close => next.open = false,
            PaletteEvent::QueryChanged(query) => {
                next.query = query;
                next.index = 0;
            }
            PaletteEvent::MoveUp => next.index = self.index.min(last).saturating_sub(1),
            PaletteEvent::MoveDown => next.index = (self.index + 1).min(last),
            PaletteEvent::Submit => {
                next.index = self.index.min(last);
                match items.get(next.index) {
                    Some(item) if !item.disabled => {
                        run = Some(item.action.clone());
                        next.open = false;
                    }
                    Some(item) => tracing::debug!("palette item {} is disabled", item.key),
                    None => {}
                }
            }
        }

        if next.open {
            next.index = next.index.min(last);
        }
        Transition { state: next, run }
    }
}

/// A palette bound to one domain's provider.
pub struct CommandPalette<P: PaletteProvider> {
    provider: P,
    state: PaletteState,
}

impl<P: PaletteProvider> CommandPalette<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: PaletteState::default(),
        }
    }

    pub fn state(&self) -> &PaletteState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Items for the current palette query.
    pub fn items(
        &self,
        records: &[P::Record],
        focused: Option<&P::Record>,
        limit: Option<usize>,
    ) -> Vec<PaletteItem<P::Action>> {
        build_items(&self.provider, records, self.state.query(), focused, limit)
    }

    /// Applies `event` and returns the action to run, if any.
    pub fn dispatch(
        &mut self,
        event: PaletteEvent,
        records: &[P::Record],
        focused: Option<&P::Record>,
        limit: Option<usize>,
    ) -> Option<P::Action> {
        let items = self.items(records, focused, limit);
        let transition = self.state.reduce(event, &items);
        self.state = transition.state;
        transition.run
    }
}
