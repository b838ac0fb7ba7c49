//! Prescriptions (ordonnances).
//!
//! Identifiers follow the practice numbering `ORD-<year>-<nnn>`, counted per year.
//! Only active prescriptions can be cancelled; renewable ones can be renewed into a fresh
//! active copy dated at the reference date.

use super::report;
use crate::config::CoreConfig;
use crate::constants::PRESCRIPTION_ID_PREFIX;
use crate::controller::ListController;
use crate::dates::format_date;
use crate::error::{CabinetError, CabinetResult};
use crate::export::{to_csv, Column};
use crate::keyboard::{KeyEvent, KeyHandler, ListenerGuard};
use crate::palette::{CommandPalette, PaletteEvent, PaletteGroup, PaletteItem, PaletteProvider};
use crate::query::{RangeFilter, StatusFilter};
use crate::record::Record;
use crate::services::{Services, Toast};
use crate::store::RecordStore;
use crate::workflow::close::PrescriptionLine;
use crate::workflow::create::required_text;
use crate::workflow::{CreateForm, CreateWorkflow};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl PrescriptionStatus {
    pub const ALL: [Self; 4] = [Self::Active, Self::Completed, Self::Cancelled, Self::Expired];

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Terminée",
            Self::Cancelled => "Annulée",
            Self::Expired => "Expirée",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl std::str::FromStr for PrescriptionStatus {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| CabinetError::InvalidInput(format!("unknown prescription status: {s}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrescriptionSort {
    Patient,
    Date,
    Status,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    #[serde(default)]
    pub patient_id: Option<u32>,
    pub patient_name: String,
    #[serde(default)]
    pub phone: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub medications: Vec<PrescriptionLine>,
    pub status: PrescriptionStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub renewable: bool,
}

impl Prescription {
    pub fn can_renew(&self) -> bool {
        self.renewable && self.status != PrescriptionStatus::Cancelled
    }

    pub fn can_cancel(&self) -> bool {
        self.status == PrescriptionStatus::Active
    }

    /// Plain-text rendering used for copying and messaging.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Ordonnance {} du {}\nPatient : {}",
            self.id,
            format_date(self.date),
            self.patient_name
        );
        for line in &self.medications {
            out.push_str("\n- ");
            out.push_str(&describe(line));
        }
        if !self.notes.trim().is_empty() {
            out.push_str("\nNotes : ");
            out.push_str(self.notes.trim());
        }
        out
    }
}

fn describe(line: &PrescriptionLine) -> String {
    [&line.medication, &line.dosage, &line.frequency, &line.duration]
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Record for Prescription {
    type Id = String;
    type Status = PrescriptionStatus;
    type SortKey = PrescriptionSort;

    fn id(&self) -> &String {
        &self.id
    }

    fn status(&self) -> PrescriptionStatus {
        self.status
    }

    fn searchable_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.id.as_str(), self.patient_name.as_str(), self.notes.as_str()];
        fields.extend(self.medications.iter().map(|m| m.medication.as_str()));
        fields
    }

    fn contact_fields(&self) -> Vec<&str> {
        vec![&self.patient_name, &self.phone, &self.id]
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn compare_by(&self, other: &Self, key: PrescriptionSort) -> Ordering {
        match key {
            PrescriptionSort::Patient => self
                .patient_name
                .to_lowercase()
                .cmp(&other.patient_name.to_lowercase()),
            PrescriptionSort::Date => self.date.cmp(&other.date),
            PrescriptionSort::Status => self.status.as_str().cmp(other.status.as_str()),
        }
    }
}

/// Next `ORD-<year>-<nnn>` identifier for `year`.
///
/// The counter saturates at `u32::MAX`; the store then rejects the repeated id.
pub fn next_prescription_id<'a>(existing: impl IntoIterator<Item = &'a String>, year: i32) -> String {
    let prefix = format!("{PRESCRIPTION_ID_PREFIX}-{year}-");
    let last = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(&prefix))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{:03}", last.saturating_add(1))
}

// ============================================================================
// Create workflow
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewPrescriptionDraft {
    pub patient_id: Option<u32>,
    pub patient_name: String,
    pub phone: String,
    pub medications: Vec<PrescriptionLine>,
    pub notes: String,
    pub renewable: bool,
}

/// Creates prescriptions dated at the reference date.
#[derive(Clone, Copy, Debug)]
pub struct NewPrescriptionWorkflow {
    today: NaiveDate,
}

impl NewPrescriptionWorkflow {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl CreateWorkflow<Prescription> for NewPrescriptionWorkflow {
    type Draft = NewPrescriptionDraft;

    fn steps(&self) -> usize {
        2
    }

    fn next_id(&self, store: &RecordStore<Prescription>) -> String {
        next_prescription_id(store.ids(), self.today.year())
    }

    fn build(&self, draft: &NewPrescriptionDraft, id: String) -> CabinetResult<Prescription> {
        let patient = required_text("patient_name", &draft.patient_name, "Le patient est requis")?;

        let mut medications = Vec::new();
        for line in draft.medications.iter().filter(|l| !l.is_blank()) {
            if line.medication.trim().is_empty() {
                return Err(CabinetError::validation(
                    "medications",
                    "Chaque ligne doit nommer un médicament",
                ));
            }
            medications.push(line.trimmed());
        }
        if medications.is_empty() {
            return Err(CabinetError::validation(
                "medications",
                "Au moins un médicament est requis",
            ));
        }

        Ok(Prescription {
            id,
            patient_id: draft.patient_id,
            patient_name: patient.into_inner(),
            phone: draft.phone.trim().to_string(),
            date: self.today,
            medications,
            status: PrescriptionStatus::Active,
            notes: draft.notes.trim().to_string(),
            renewable: draft.renewable,
        })
    }
}

// ============================================================================
// Palette
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum PrescriptionAction {
    NewPrescription,
    ShowRange(RangeFilter),
    ShowStatus(StatusFilter<PrescriptionStatus>),
    ResetFilters,
    Export,
    Renew(String),
    Cancel(String),
    CopySummary(String),
    Send(String),
    OpenPatient(String),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PrescriptionPalette;

impl PaletteProvider for PrescriptionPalette {
    type Record = Prescription;
    type Action = PrescriptionAction;

    fn global_items(&self) -> Vec<PaletteItem<PrescriptionAction>> {
        use PrescriptionAction::*;

        let mut items = vec![
            PaletteItem::new("new", "Nouvelle ordonnance", NewPrescription),
            PaletteItem::new("range-week", "Cette semaine", ShowRange(RangeFilter::Week))
                .group(PaletteGroup::Filter),
            PaletteItem::new("range-all", "Toutes les dates", ShowRange(RangeFilter::All))
                .group(PaletteGroup::Filter),
            PaletteItem::new("status-all", "Toutes les ordonnances", ShowStatus(StatusFilter::All))
                .group(PaletteGroup::Filter),
        ];
        items.extend(PrescriptionStatus::ALL.into_iter().map(|status| {
            PaletteItem::new(
                format!("status-{}", status.as_str()),
                format!("Statut : {}", status.label()),
                ShowStatus(StatusFilter::Only(status)),
            )
            .group(PaletteGroup::Filter)
        }));
        items.push(
            PaletteItem::new("reset-filters", "Réinitialiser les filtres", ResetFilters)
                .hint("Filtres et recherche")
                .group(PaletteGroup::Filter),
        );
        items.push(PaletteItem::new("export", "Exporter en CSV", Export));
        items
    }

    fn record_items(
        &self,
        p: &Prescription,
        _group: PaletteGroup,
    ) -> Vec<PaletteItem<PrescriptionAction>> {
        use PrescriptionAction::*;

        let id = &p.id;
        let name = &p.patient_name;
        vec![
            PaletteItem::new(format!("renew-{id}"), format!("Renouveler {id}"), Renew(id.clone()))
                .hint(name.clone())
                .disabled_if(!p.can_renew()),
            PaletteItem::new(format!("cancel-{id}"), format!("Annuler {id}"), Cancel(id.clone()))
                .hint(name.clone())
                .disabled_if(!p.can_cancel()),
            PaletteItem::new(
                format!("copy-{id}"),
                format!("Copier l'ordonnance {id}"),
                CopySummary(id.clone()),
            )
            .hint(name.clone()),
            PaletteItem::new(format!("send-{id}"), format!("Envoyer à {name}"), Send(id.clone()))
                .hint(p.phone.clone())
                .disabled_if(p.phone.trim().is_empty()),
            PaletteItem::new(
                format!("patient-{id}"),
                format!("Dossier patient : {name}"),
                OpenPatient(id.clone()),
            )
            .disabled_if(p.patient_id.is_none()),
        ]
    }
}

pub fn csv_columns() -> Vec<Column<Prescription>> {
    vec![
        Column::new("Référence", |p: &Prescription| p.id.clone()),
        Column::new("Date", |p: &Prescription| format_date(p.date)),
        Column::new("Patient", |p: &Prescription| p.patient_name.clone()),
        Column::new("Médicaments", |p: &Prescription| {
            p.medications.iter().map(describe).collect::<Vec<_>>().join(" | ")
        }),
        Column::new("Statut", |p: &Prescription| p.status.label().to_string()),
        Column::new("Renouvelable", |p: &Prescription| {
            let renewable = if p.renewable { "Oui" } else { "Non" };
            renewable.to_string()
        }),
    ]
}

// ============================================================================
// Controller
// ============================================================================

pub struct PrescriptionsController {
    list: ListController<Prescription>,
    palette: CommandPalette<PrescriptionPalette>,
    create_form: CreateForm<Prescription, NewPrescriptionWorkflow>,
    services: Services,
    last_export: Option<String>,
    listener: Option<ListenerGuard>,
}

impl KeyHandler for PrescriptionsController {
    /// Routes a key press to the palette.
    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match PaletteEvent::from_key(self.palette.state(), key) {
            Some(event) => {
                self.palette_event(event);
                true
            }
            None => false,
        }
    }

    fn set_listener(&mut self, guard: Option<ListenerGuard>) {
        self.listener = guard;
    }
}

impl PrescriptionsController {
    pub fn new(cfg: Arc<CoreConfig>, store: RecordStore<Prescription>, services: Services) -> Self {
        let workflow = NewPrescriptionWorkflow::new(cfg.today());
        Self {
            list: ListController::new(cfg, store),
            palette: CommandPalette::new(PrescriptionPalette),
            create_form: CreateForm::new(workflow),
            services,
            last_export: None,
            listener: None,
        }
    }

    pub fn list(&self) -> &ListController<Prescription> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<Prescription> {
        &mut self.list
    }

    pub fn view(&self) -> Vec<&Prescription> {
        self.list.view()
    }

    pub fn palette(&self) -> &CommandPalette<PrescriptionPalette> {
        &self.palette
    }

    pub fn palette_items(&self) -> Vec<PaletteItem<PrescriptionAction>> {
        self.palette.items(
            self.list.store().list(),
            self.list.selected(),
            self.list.config().palette_limit(),
        )
    }

    pub fn palette_event(&mut self, event: PaletteEvent) {
        let action = self.palette.dispatch(
            event,
            self.list.store().list(),
            self.list.selected(),
            self.list.config().palette_limit(),
        );
        if let Some(action) = action {
            self.run(action);
        }
    }


    pub fn run(&mut self, action: PrescriptionAction) {
        use PrescriptionAction::*;

        match action {
            NewPrescription => self.create_form.open(),
            ShowRange(range) => self.list.set_range(range),
            ShowStatus(status) => self.list.set_status(status),
            ResetFilters => self.list.reset_filters(),
            Export => self.last_export = Some(self.export_csv()),
            Renew(id) => {
                self.renew(&id).ok();
            }
            Cancel(id) => {
                self.cancel(&id).ok();
            }
            CopySummary(id) => {
                if let Some(summary) = self.read(&id, Prescription::summary) {
                    self.services.copy_text(&summary, "L'ordonnance");
                }
            }
            Send(id) => {
                if let Some((phone, summary)) = self.read(&id, |p| (p.phone.clone(), p.summary())) {
                    let code = self.list.config().phone_country_code().to_string();
                    self.services.message(&phone, &code, Some(&summary));
                }
            }
            OpenPatient(id) => match self.read(&id, |p| p.patient_id) {
                Some(Some(patient_id)) => self.services.go_to(&format!("/patients/{patient_id}")),
                Some(None) => self.services.notify(Toast::destructive(
                    "Dossier introuvable",
                    "Cette ordonnance n'est liée à aucun dossier patient",
                )),
                None => {}
            },
        }
    }

    fn read<T>(&self, id: &str, f: impl FnOnce(&Prescription) -> T) -> Option<T> {
        match self.list.record(&id.to_string()) {
            Ok(p) => Some(f(p)),
            Err(_) => {
                self.services.notify(Toast::destructive(
                    "Ordonnance introuvable",
                    format!("L'ordonnance {id} n'existe plus"),
                ));
                None
            }
        }
    }

    /// Appends an active copy of `id` dated at the reference date. Returns the new id.
    pub fn renew(&mut self, id: &str) -> CabinetResult<String> {
        let result = self.renewed_copy(id).and_then(|copy| {
            let new_id = copy.id.clone();
            self.list.append(copy)?;
            Ok(new_id)
        });
        report(&self.services, result, |new_id| {
            Toast::success("Ordonnance renouvelée", format!("Nouvelle ordonnance {new_id}"))
        })
    }

    fn renewed_copy(&self, id: &str) -> CabinetResult<Prescription> {
        let original = self.list.record(&id.to_string())?;
        if !original.can_renew() {
            return Err(CabinetError::InvalidTransition {
                from: original.status.as_str().into(),
                to: "renewed".into(),
            });
        }
        let today = self.list.config().today();
        Ok(Prescription {
            id: next_prescription_id(self.list.store().ids(), today.year()),
            date: today,
            status: PrescriptionStatus::Active,
            ..original.clone()
        })
    }

    /// Cancels an active prescription.
    pub fn cancel(&mut self, id: &str) -> CabinetResult<()> {
        let id = id.to_string();
        let result = self.list.record(&id).and_then(|p| {
            if p.can_cancel() {
                Ok(())
            } else {
                Err(CabinetError::InvalidTransition {
                    from: p.status.as_str().into(),
                    to: PrescriptionStatus::Cancelled.as_str().into(),
                })
            }
        });
        let result = result.and_then(|()| {
            self.list
                .update_with(&id, |p| p.status = PrescriptionStatus::Cancelled)
                .map(|_| ())
        });
        report(&self.services, result, |_| {
            Toast::success("Ordonnance annulée", format!("{id} n'est plus active"))
        })
    }

    pub fn export_csv(&self) -> String {
        to_csv(&self.list.view(), &csv_columns())
    }

    pub fn last_export(&self) -> Option<&str> {
        self.last_export.as_deref()
    }

    pub fn create_form(&self) -> &CreateForm<Prescription, NewPrescriptionWorkflow> {
        &self.create_form
    }

    pub fn create_form_mut(&mut self) -> &mut CreateForm<Prescription, NewPrescriptionWorkflow> {
        &mut self.create_form
    }

    pub fn commit_create(&mut self) -> CabinetResult<String> {
        let result = self.create_form.commit(&mut self.list);
        report(&self.services, result, |id| {
            Toast::success("Ordonnance créée", format!("{id} enregistrée"))
        })
    }
}
