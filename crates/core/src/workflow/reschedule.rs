//! Reschedule workflow: move a record to a new date and time.
//!
//! Both fields are required. Rescheduling re-books the record (status back to scheduled)
//! except for completed records, where it is a data correction and the status stays.

use super::EditWorkflow;
use crate::dates::{format_date, format_time, parse_date, parse_time};
use crate::error::{CabinetError, CabinetResult};
use crate::record::Record;
use chrono::{NaiveDate, NaiveTime};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RescheduleDraft {
    pub date: String,
    pub time: String,
}

/// A validated new slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

pub trait Reschedulable: Record {
    fn slot(&self) -> Slot;

    /// Writes the new slot and applies the status rule.
    fn apply_reschedule(&mut self, slot: Slot);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RescheduleWorkflow;

impl<R: Reschedulable> EditWorkflow<R> for RescheduleWorkflow {
    type Draft = RescheduleDraft;
    type Change = Slot;

    fn seed(&self, record: &R) -> RescheduleDraft {
        let slot = record.slot();
        RescheduleDraft {
            date: format_date(slot.date),
            time: format_time(slot.time),
        }
    }

    fn validate(&self, draft: &RescheduleDraft, _record: &R) -> CabinetResult<Slot> {
        if draft.date.trim().is_empty() {
            return Err(CabinetError::validation("date", "La date est requise"));
        }
        if draft.time.trim().is_empty() {
            return Err(CabinetError::validation("time", "L'heure est requise"));
        }

        let date = parse_date(&draft.date)
            .map_err(|_| CabinetError::validation("date", format!("Date invalide: {}", draft.date)))?;
        let time = parse_time(&draft.time)
            .map_err(|_| CabinetError::validation("time", format!("Heure invalide: {}", draft.time)))?;

        Ok(Slot { date, time })
    }

    fn apply(&self, slot: Slot, record: &mut R) {
        record.apply_reschedule(slot);
    }
}
