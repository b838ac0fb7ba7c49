//! Helpers shared by create workflows.

use crate::error::{CabinetError, CabinetResult};
use cabinet_types::NonEmptyText;

/// Display initials: first letter of the first name and of the last name, uppercased.
pub fn initials(first_name: &NonEmptyText, last_name: &NonEmptyText) -> String {
    first_name
        .first_char()
        .to_uppercase()
        .chain(last_name.first_char().to_uppercase())
        .collect()
}

/// A required text field, or a field-level validation error.
pub fn required_text(
    field: &'static str,
    value: &str,
    message: &str,
) -> CabinetResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| CabinetError::validation(field, message))
}
