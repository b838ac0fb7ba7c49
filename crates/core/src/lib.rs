//! # Cabinet Core
//!
//! Client-side list state for a medical practice: consultations, patients and
//! prescriptions.
//!
//! Every domain page is the same pattern instantiated with its own record type:
//! - a [`RecordStore`] holding the records in memory
//! - a [`QueryState`] (range, status, search, sort) and the pure derived view over both
//! - single-record selection and expansion
//! - a keyboard-driven command palette built from global and record actions
//! - short workflow forms (close, reschedule, create) committed as store mutations
//!
//! **No I/O concerns** beyond reading seed files: clipboard, notifications, navigation and
//! external launchers are injected through the traits in [`services`].

pub mod config;
pub mod constants;
pub mod controller;
pub mod dates;
pub mod domains;
pub mod error;
pub mod export;
pub mod keyboard;
pub mod palette;
pub mod query;
pub mod record;
pub mod seed;
pub mod selection;
pub mod services;
pub mod store;
pub mod view;
pub mod workflow;

pub use config::{resolve_today, CoreConfig};
pub use controller::ListController;
pub use error::{CabinetError, CabinetResult};
pub use query::{QueryState, RangeFilter, SortDirection, StatusFilter};
pub use record::{Patch, Record};
pub use store::{InsertPosition, RecordStore};
