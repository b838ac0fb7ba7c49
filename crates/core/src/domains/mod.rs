//! Domain instantiations of the list controller.
//!
//! Each domain supplies a record type, its palette actions, its CSV schema and the
//! workflows it supports, and wraps a [`crate::ListController`] with them.

pub mod consultations;
pub mod patients;
pub mod prescriptions;

use crate::error::CabinetResult;
use crate::services::{Services, Toast};

/// Turns a commit or action outcome into a toast and passes the result through.
pub(crate) fn report<T>(
    services: &Services,
    result: CabinetResult<T>,
    success: impl FnOnce(&T) -> Toast,
) -> CabinetResult<T> {
    match &result {
        Ok(value) => services.notify(success(value)),
        Err(e) if e.is_validation() => {
            services.notify(Toast::destructive("Formulaire incomplet", e.to_string()))
        }
        Err(e) => {
            tracing::warn!("action failed: {}", e);
            services.notify(Toast::destructive("Action impossible", e.to_string()));
        }
    }
    result
}
