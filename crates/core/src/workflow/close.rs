//! Close workflow: finish a visit, record its outcome and bill it.
//!
//! Three steps (clinical notes, prescriptions and analyses, follow-up and amount). Which
//! fields are mandatory is a policy decision; by default none are. Committing marks the
//! record completed, merges the notes and normalises the amount to `"<n> <suffix>"`.

use super::EditWorkflow;
use crate::config::CoreConfig;
use crate::dates::parse_date;
use crate::error::{CabinetError, CabinetResult};
use crate::record::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One prescribed medication line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub medication: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: String,
}

impl PrescriptionLine {
    pub(crate) fn is_blank(&self) -> bool {
        [&self.medication, &self.dosage, &self.frequency, &self.duration]
            .iter()
            .all(|f| f.trim().is_empty())
    }

    pub(crate) fn trimmed(&self) -> Self {
        Self {
            medication: self.medication.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            frequency: self.frequency.trim().to_string(),
            duration: self.duration.trim().to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloseDraft {
    pub diagnosis: String,
    pub notes: String,
    pub prescriptions: Vec<PrescriptionLine>,
    pub analyses: Vec<String>,
    pub next_follow_up: String,
    pub amount: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloseField {
    Diagnosis,
    Notes,
    NextFollowUp,
    Amount,
}

/// Which close-form fields must be filled in.
#[derive(Clone, Debug, Default)]
pub struct ClosePolicy {
    required: HashSet<CloseField>,
}

impl ClosePolicy {
    pub fn require(mut self, field: CloseField) -> Self {
        self.required.insert(field);
        self
    }

    pub fn is_required(&self, field: CloseField) -> bool {
        self.required.contains(&field)
    }
}

/// A validated close draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosedVisit {
    pub diagnosis: Option<String>,
    pub notes: String,
    pub prescriptions: Vec<PrescriptionLine>,
    pub analyses: Vec<String>,
    pub next_follow_up: Option<NaiveDate>,
    pub amount: Option<String>,
}

/// A record that can be closed through the close workflow.
pub trait Closable: Record {
    /// Error describing why the record cannot be closed right now.
    fn close_blocked(&self) -> Option<CabinetError>;

    fn close_draft(&self) -> CloseDraft;

    /// Writes the visit outcome and marks the record completed.
    fn apply_close(&mut self, visit: ClosedVisit);

    /// Current notes, used when merging.
    fn existing_notes(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct CloseWorkflow {
    policy: ClosePolicy,
    currency_suffix: String,
}

impl CloseWorkflow {
    pub fn new(policy: ClosePolicy, currency_suffix: impl Into<String>) -> Self {
        Self {
            policy,
            currency_suffix: currency_suffix.into(),
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(ClosePolicy::default(), cfg.currency_suffix())
    }

    fn required(&self, field: CloseField, name: &'static str, value: &str) -> CabinetResult<()> {
        if self.policy.is_required(field) && value.trim().is_empty() {
            return Err(CabinetError::validation(name, "Ce champ est requis"));
        }
        Ok(())
    }
}

impl<R: Closable> EditWorkflow<R> for CloseWorkflow {
    type Draft = CloseDraft;
    type Change = ClosedVisit;

    fn steps(&self) -> usize {
        3
    }

    fn seed(&self, record: &R) -> CloseDraft {
        record.close_draft()
    }

    fn validate(&self, draft: &CloseDraft, record: &R) -> CabinetResult<ClosedVisit> {
        if let Some(err) = record.close_blocked() {
            return Err(err);
        }

        self.required(CloseField::Diagnosis, "diagnosis", &draft.diagnosis)?;
        self.required(CloseField::Notes, "notes", &draft.notes)?;
        self.required(CloseField::NextFollowUp, "next_follow_up", &draft.next_follow_up)?;
        self.required(CloseField::Amount, "amount", &draft.amount)?;

        let mut prescriptions = Vec::new();
        for line in draft.prescriptions.iter().filter(|l| !l.is_blank()) {
            if line.medication.trim().is_empty() {
                return Err(CabinetError::validation(
                    "prescriptions",
                    "Chaque ligne d'ordonnance doit nommer un médicament",
                ));
            }
            prescriptions.push(line.trimmed());
        }

        let analyses = draft
            .analyses
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();

        let next_follow_up = match draft.next_follow_up.trim() {
            "" => None,
            text => Some(parse_date(text).map_err(|_| {
                CabinetError::validation("next_follow_up", format!("Date invalide: {text}"))
            })?),
        };

        let amount = normalize_amount(&draft.amount, &self.currency_suffix)?;
        let diagnosis = Some(draft.diagnosis.trim().to_string()).filter(|d| !d.is_empty());

        Ok(ClosedVisit {
            diagnosis,
            notes: merge_notes(record.existing_notes(), &draft.notes),
            prescriptions,
            analyses,
            next_follow_up,
            amount,
        })
    }

    fn apply(&self, change: ClosedVisit, record: &mut R) {
        record.apply_close(change);
    }
}

/// Normalises an amount to `"<number> <suffix>"`.
///
/// `"50"`, `"50DT"` and `" 50 dt "` all become `"50 DT"`. Blank input is `None`.
pub fn normalize_amount(input: &str, suffix: &str) -> CabinetResult<Option<String>> {
    let mut text = input.trim();
    let cut = text.len().saturating_sub(suffix.len());
    if !suffix.is_empty() && text.is_char_boundary(cut) && text[cut..].eq_ignore_ascii_case(suffix)
    {
        text = text[..cut].trim_end();
    }

    if text.is_empty() {
        return Ok(None);
    }

    let numeric = text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | ' '));
    if !numeric {
        return Err(CabinetError::validation(
            "amount",
            format!("Montant invalide: {}", input.trim()),
        ));
    }

    Ok(Some(format!("{text} {suffix}")))
}

/// Merges new notes into existing ones without duplicating a seeded copy.
pub fn merge_notes(existing: &str, addition: &str) -> String {
    let existing = existing.trim();
    let addition = addition.trim();
    if addition.is_empty() || existing.contains(addition) {
        existing.to_string()
    } else if existing.is_empty() || addition.contains(existing) {
        addition.to_string()
    } else {
        format!("{existing}\n{addition}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_amount_suffix() {
        for input in ["50", "50DT", " 50 dt ", "50 DT"] {
            assert_eq!(
                normalize_amount(input, "DT").expect("valid").as_deref(),
                Some("50 DT")
            );
        }
        assert_eq!(
            normalize_amount("1 200,500", "DT").expect("valid").as_deref(),
            Some("1 200,500 DT")
        );
        assert_eq!(normalize_amount("  ", "DT").expect("blank"), None);
    }

    #[test]
    fn rejects_non_numeric_amount() {
        let err = normalize_amount("cinquante", "DT").expect_err("not a number");
        assert!(matches!(err, CabinetError::Validation { field: "amount", .. }));
    }

    #[test]
    fn merges_notes_without_duplication() {
        assert_eq!(merge_notes("", "Toux sèche"), "Toux sèche");
        assert_eq!(merge_notes("Toux sèche", ""), "Toux sèche");
        assert_eq!(merge_notes("Toux sèche", "Toux sèche"), "Toux sèche");
        assert_eq!(
            merge_notes("Toux sèche", "Toux sèche\nFièvre"),
            "Toux sèche\nFièvre"
        );
        assert_eq!(merge_notes("Toux sèche", "Fièvre"), "Toux sèche\nFièvre");
    }

    #[test]
    fn policy_marks_required_fields() {
        let policy = ClosePolicy::default().require(CloseField::Diagnosis);
        assert!(policy.is_required(CloseField::Diagnosis));
        assert!(!policy.is_required(CloseField::Amount));
    }
}
