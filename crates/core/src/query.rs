//! Query state: the filters, search text and sort order a user has picked.
//!
//! Query state is ephemeral and owned by the view session. It is plain data so the derived
//! view can be memoised on it.

use serde::{Deserialize, Serialize};

/// Date range relative to the configured reference date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeFilter {
    /// Only the reference date itself.
    Today,
    /// The trailing seven days ending at the reference date.
    Week,
    #[default]
    All,
}

impl std::str::FromStr for RangeFilter {
    type Err = crate::CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "all" => Ok(Self::All),
            other => Err(crate::CabinetError::InvalidInput(format!(
                "unknown range filter: {other}"
            ))),
        }
    }
}

/// Status filter: everything, or one status value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter<S> {
    #[default]
    All,
    Only(S),
}

impl<S: PartialEq> StatusFilter<S> {
    pub fn accepts(&self, status: &S) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// An explicit sort choice, remembering the key it replaced as a tie-break.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SortSpec<K> {
    pub key: K,
    pub direction: SortDirection,
    pub previous: Option<K>,
}

impl<K> SortSpec<K> {
    pub fn ascending(key: K) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
            previous: None,
        }
    }
}

/// Current filter/search/sort parameters for one list.
///
/// `sort` of `None` means the default chronological order: date descending, then time of
/// day ascending.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryState<K, S> {
    pub range: RangeFilter,
    pub status: StatusFilter<S>,
    pub search: String,
    pub sort: Option<SortSpec<K>>,
}

impl<K, S> Default for QueryState<K, S> {
    fn default() -> Self {
        Self {
            range: RangeFilter::All,
            status: StatusFilter::All,
            search: String::new(),
            sort: None,
        }
    }
}

impl<K: Copy + PartialEq, S> QueryState<K, S> {
    /// Selects a sort key the way a sortable column header does.
    ///
    /// Choosing the active key again flips the direction. Choosing a new key sorts ascending
    /// and keeps the old key as the tie-break.
    pub fn sort_by(&mut self, key: K) {
        self.sort = Some(match self.sort {
            Some(spec) if spec.key == key => SortSpec {
                direction: spec.direction.toggled(),
                ..spec
            },
            Some(spec) => SortSpec {
                key,
                direction: SortDirection::Ascending,
                previous: Some(spec.key),
            },
            None => SortSpec::ascending(key),
        });
    }

    /// Back to the default chronological order.
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Resets filters and search while keeping the sort choice.
    pub fn reset_filters(&mut self) {
        self.range = RangeFilter::All;
        self.status = StatusFilter::All;
        self.search.clear();
    }
}
