//! Consultations: the practice agenda.
//!
//! Consultations are date-based: they honour the range filter, sort chronologically by
//! default and are displayed grouped by day. The lifecycle is
//!
//! ```text
//! scheduled ──start──▶ in_progress ──close──▶ completed
//!     │  └──────────────close──────────────────▲
//!     ├──cancel──▶ cancelled ◀──cancel── in_progress
//!     └──no-show─▶ no_show
//! ```
//!
//! Rescheduling moves any record back to `scheduled`, except `completed` records which
//! keep their status.

use super::report;
use crate::config::CoreConfig;
use crate::controller::ListController;
use crate::dates::{format_date, format_time, parse_date, parse_time};
use crate::error::{CabinetError, CabinetResult};
use crate::export::{to_csv, Column};
use crate::keyboard::{KeyEvent, KeyHandler, ListenerGuard};
use crate::palette::{
    CommandPalette, PaletteEvent, PaletteGroup, PaletteItem, PaletteProvider,
};
use crate::query::{RangeFilter, StatusFilter};
use crate::record::{next_numeric_id, Patch, Record};
use crate::services::{Services, Toast};
use crate::store::RecordStore;
use crate::view::Group;
use crate::workflow::close::{
    Closable, CloseDraft, CloseWorkflow, ClosedVisit, PrescriptionLine,
};
use crate::workflow::create::required_text;
use crate::workflow::reschedule::{Reschedulable, RescheduleDraft, RescheduleWorkflow, Slot};
use crate::workflow::{CreateForm, CreateWorkflow, EditForm};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

// ============================================================================
// Record
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl ConsultationStatus {
    pub const ALL: [Self; 5] = [
        Self::Scheduled,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "Programmée",
            Self::InProgress => "En cours",
            Self::Completed => "Terminée",
            Self::Cancelled => "Annulée",
            Self::NoShow => "Absent",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    pub fn can_start(self) -> bool {
        self == Self::Scheduled
    }

    pub fn can_close(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    pub fn can_mark_no_show(self) -> bool {
        self == Self::Scheduled
    }

    /// Re-booking from the palette. Completed records are corrected through the form only.
    pub fn can_reschedule(self) -> bool {
        self != Self::Completed
    }

    /// Checks a direct status change.
    pub fn transition(self, to: Self) -> CabinetResult<Self> {
        let allowed = match to {
            Self::InProgress => self.can_start(),
            Self::Completed => self.can_close(),
            Self::Cancelled => self.can_cancel(),
            Self::NoShow => self.can_mark_no_show(),
            Self::Scheduled => false,
        };
        if !allowed {
            return Err(CabinetError::InvalidTransition {
                from: self.as_str().into(),
                to: to.as_str().into(),
            });
        }
        Ok(to)
    }

    fn rank(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or_default()
    }
}

impl std::str::FromStr for ConsultationStatus {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase().replace('-', "_"))
            .ok_or_else(|| CabinetError::InvalidInput(format!("unknown consultation status: {s}")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationKind {
    #[default]
    FirstVisit,
    FollowUp,
    Control,
    Emergency,
    Teleconsultation,
}

impl ConsultationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstVisit => "Première visite",
            Self::FollowUp => "Suivi",
            Self::Control => "Contrôle",
            Self::Emergency => "Urgence",
            Self::Teleconsultation => "Téléconsultation",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsultationSort {
    Patient,
    Schedule,
    Status,
}

fn default_duration() -> u32 {
    30
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: u32,
    #[serde(default)]
    pub patient_id: Option<u32>,
    pub patient_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub date: NaiveDate,
    #[serde(with = "crate::dates::hhmm")]
    pub time: NaiveTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub motif: String,
    #[serde(default)]
    pub kind: ConsultationKind,
    pub status: ConsultationStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionLine>,
    #[serde(default)]
    pub analyses: Vec<String>,
    #[serde(default)]
    pub next_follow_up: Option<NaiveDate>,
}

impl Consultation {
    /// A scheduled consultation with every optional field at its default.
    pub fn new(
        id: u32,
        patient_name: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
        motif: impl Into<String>,
    ) -> Self {
        Self {
            id,
            patient_id: None,
            patient_name: patient_name.into(),
            phone: String::new(),
            email: String::new(),
            date,
            time,
            duration_minutes: default_duration(),
            motif: motif.into(),
            kind: ConsultationKind::default(),
            status: ConsultationStatus::Scheduled,
            notes: String::new(),
            diagnosis: None,
            amount: None,
            prescriptions: Vec::new(),
            analyses: Vec::new(),
            next_follow_up: None,
        }
    }

    /// `09:00 · 20 Fév 2026`
    pub fn when(&self) -> String {
        format!("{} · {}", format_time(self.time), format_date(self.date))
    }
}

impl Record for Consultation {
    type Id = u32;
    type Status = ConsultationStatus;
    type SortKey = ConsultationSort;

    fn id(&self) -> &u32 {
        &self.id
    }

    fn status(&self) -> ConsultationStatus {
        self.status
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![&self.patient_name, &self.motif, &self.phone, &self.email, &self.notes]
    }

    fn contact_fields(&self) -> Vec<&str> {
        vec![&self.patient_name, &self.phone, &self.email, &self.motif]
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn time(&self) -> Option<NaiveTime> {
        Some(self.time)
    }

    fn compare_by(&self, other: &Self, key: ConsultationSort) -> Ordering {
        match key {
            ConsultationSort::Patient => self
                .patient_name
                .to_lowercase()
                .cmp(&other.patient_name.to_lowercase()),
            ConsultationSort::Schedule => (self.date, self.time).cmp(&(other.date, other.time)),
            ConsultationSort::Status => self.status.rank().cmp(&other.status.rank()),
        }
    }
}

/// Partial update of the editable consultation fields.
#[derive(Clone, Debug, Default)]
pub struct ConsultationPatch {
    pub status: Option<ConsultationStatus>,
    pub motif: Option<String>,
    pub notes: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Patch<Consultation> for ConsultationPatch {
    fn apply(self, record: &mut Consultation) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(motif) = self.motif {
            record.motif = motif;
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
        if let Some(phone) = self.phone {
            record.phone = phone;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
    }
}

impl Closable for Consultation {
    fn close_blocked(&self) -> Option<CabinetError> {
        self.status.transition(ConsultationStatus::Completed).err()
    }

    fn close_draft(&self) -> CloseDraft {
        CloseDraft {
            diagnosis: self.diagnosis.clone().unwrap_or_default(),
            notes: self.notes.clone(),
            prescriptions: self.prescriptions.clone(),
            analyses: self.analyses.clone(),
            next_follow_up: self.next_follow_up.map(format_date).unwrap_or_default(),
            amount: self.amount.clone().unwrap_or_default(),
        }
    }

    fn apply_close(&mut self, visit: ClosedVisit) {
        self.status = ConsultationStatus::Completed;
        self.diagnosis = visit.diagnosis.or(self.diagnosis.take());
        self.notes = visit.notes;
        self.prescriptions = visit.prescriptions;
        self.analyses = visit.analyses;
        self.next_follow_up = visit.next_follow_up;
        self.amount = visit.amount;
    }

    fn existing_notes(&self) -> &str {
        &self.notes
    }
}

impl Reschedulable for Consultation {
    fn slot(&self) -> Slot {
        Slot {
            date: self.date,
            time: self.time,
        }
    }

    fn apply_reschedule(&mut self, slot: Slot) {
        self.date = slot.date;
        self.time = slot.time;
        if self.status != ConsultationStatus::Completed {
            self.status = ConsultationStatus::Scheduled;
        }
    }
}

// ============================================================================
// Create workflow
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewConsultationDraft {
    pub patient_id: Option<u32>,
    pub patient_name: String,
    pub phone: String,
    pub email: String,
    pub date: String,
    pub time: String,
    pub motif: String,
    pub kind: ConsultationKind,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NewConsultationWorkflow;

impl CreateWorkflow<Consultation> for NewConsultationWorkflow {
    type Draft = NewConsultationDraft;

    fn steps(&self) -> usize {
        2
    }

    fn next_id(&self, store: &RecordStore<Consultation>) -> u32 {
        next_numeric_id(store.ids())
    }

    fn build(&self, draft: &NewConsultationDraft, id: u32) -> CabinetResult<Consultation> {
        let patient = required_text("patient_name", &draft.patient_name, "Le patient est requis")?;
        let date = required_text("date", &draft.date, "La date est requise")?;
        let time = required_text("time", &draft.time, "L'heure est requise")?;
        let date = parse_date(date.as_str())
            .map_err(|_| CabinetError::validation("date", format!("Date invalide: {date}")))?;
        let time = parse_time(time.as_str())
            .map_err(|_| CabinetError::validation("time", format!("Heure invalide: {time}")))?;

        let mut consultation = Consultation::new(id, patient.into_inner(), date, time, draft.motif.trim());
        consultation.patient_id = draft.patient_id;
        consultation.phone = draft.phone.trim().to_string();
        consultation.email = draft.email.trim().to_string();
        consultation.kind = draft.kind;
        Ok(consultation)
    }
}

// ============================================================================
// Palette
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ConsultationAction {
    NewConsultation,
    ShowRange(RangeFilter),
    ShowStatus(StatusFilter<ConsultationStatus>),
    ResetFilters,
    Export,
    Start(u32),
    Close(u32),
    Reschedule(u32),
    Cancel(u32),
    MarkNoShow(u32),
    Call(u32),
    Message(u32),
    Email(u32),
    CopyPhone(u32),
    OpenPatient(u32),
    ToggleDetails(u32),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsultationPalette;

impl PaletteProvider for ConsultationPalette {
    type Record = Consultation;
    type Action = ConsultationAction;

    fn global_items(&self) -> Vec<PaletteItem<ConsultationAction>> {
        use ConsultationAction::*;

        let mut items = vec![
            PaletteItem::new("new", "Nouvelle consultation", NewConsultation).hint("Créer un rendez-vous"),
            PaletteItem::new("range-today", "Aujourd'hui", ShowRange(RangeFilter::Today))
                .group(PaletteGroup::Filter),
            PaletteItem::new("range-week", "Cette semaine", ShowRange(RangeFilter::Week))
                .group(PaletteGroup::Filter),
            PaletteItem::new("range-all", "Toutes les dates", ShowRange(RangeFilter::All))
                .group(PaletteGroup::Filter),
            PaletteItem::new("status-all", "Tous les statuts", ShowStatus(StatusFilter::All))
                .group(PaletteGroup::Filter),
        ];
        items.extend(ConsultationStatus::ALL.into_iter().map(|status| {
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
        items.push(PaletteItem::new("export", "Exporter en CSV", Export).hint("Liste affichée"));
        items
    }

    fn record_items(
        &self,
        c: &Consultation,
        _group: PaletteGroup,
    ) -> Vec<PaletteItem<ConsultationAction>> {
        use ConsultationAction::*;

        let id = c.id;
        let name = &c.patient_name;
        let when = c.when();
        vec![
            PaletteItem::new(format!("start-{id}"), format!("Démarrer : {name}"), Start(id))
                .hint(when.clone())
                .disabled_if(!c.status.can_start()),
            PaletteItem::new(format!("close-{id}"), format!("Clôturer : {name}"), Close(id))
                .hint(when.clone())
                .disabled_if(!c.status.can_close()),
            PaletteItem::new(
                format!("reschedule-{id}"),
                format!("Reprogrammer : {name}"),
                Reschedule(id),
            )
            .hint(when.clone())
            .disabled_if(!c.status.can_reschedule()),
            PaletteItem::new(format!("cancel-{id}"), format!("Annuler : {name}"), Cancel(id))
                .hint(when.clone())
                .disabled_if(!c.status.can_cancel()),
            PaletteItem::new(
                format!("no-show-{id}"),
                format!("Marquer absent : {name}"),
                MarkNoShow(id),
            )
            .hint(when)
            .disabled_if(!c.status.can_mark_no_show()),
            PaletteItem::new(format!("call-{id}"), format!("Appeler {name}"), Call(id))
                .hint(c.phone.clone())
                .disabled_if(c.phone.trim().is_empty()),
            PaletteItem::new(format!("message-{id}"), format!("WhatsApp {name}"), Message(id))
                .hint(c.phone.clone())
                .disabled_if(c.phone.trim().is_empty()),
            PaletteItem::new(format!("email-{id}"), format!("Écrire à {name}"), Email(id))
                .hint(c.email.clone())
                .disabled_if(c.email.trim().is_empty()),
            PaletteItem::new(
                format!("copy-phone-{id}"),
                format!("Copier le numéro de {name}"),
                CopyPhone(id),
            )
            .disabled_if(c.phone.trim().is_empty()),
            PaletteItem::new(
                format!("patient-{id}"),
                format!("Dossier patient : {name}"),
                OpenPatient(id),
            )
            .disabled_if(c.patient_id.is_none()),
            PaletteItem::new(format!("details-{id}"), format!("Détails : {name}"), ToggleDetails(id))
                .meta(c.motif.clone()),
        ]
    }
}

// ============================================================================
// Export
// ============================================================================

pub fn csv_columns() -> Vec<Column<Consultation>> {
    vec![
        Column::new("ID", |c: &Consultation| c.id.to_string()),
        Column::new("Date", |c: &Consultation| format_date(c.date)),
        Column::new("Heure", |c: &Consultation| format_time(c.time)),
        Column::new("Patient", |c: &Consultation| c.patient_name.clone()),
        Column::new("Téléphone", |c: &Consultation| c.phone.clone()),
        Column::new("Motif", |c: &Consultation| c.motif.clone()),
        Column::new("Type", |c: &Consultation| c.kind.label().to_string()),
        Column::new("Statut", |c: &Consultation| c.status.label().to_string()),
        Column::new("Montant", |c: &Consultation| c.amount.clone().unwrap_or_default()),
    ]
}

// ============================================================================
// Controller
// ============================================================================

/// Everything the consultations list needs while it is open.
pub struct ConsultationsController {
    list: ListController<Consultation>,
    palette: CommandPalette<ConsultationPalette>,
    close_form: EditForm<Consultation, CloseWorkflow>,
    reschedule_form: EditForm<Consultation, RescheduleWorkflow>,
    create_form: CreateForm<Consultation, NewConsultationWorkflow>,
    services: Services,
    last_export: Option<String>,
    listener: Option<ListenerGuard>,
}

impl KeyHandler for ConsultationsController {
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

impl ConsultationsController {
    pub fn new(cfg: Arc<CoreConfig>, store: RecordStore<Consultation>, services: Services) -> Self {
        let close_workflow = CloseWorkflow::from_config(&cfg);
        Self {
            list: ListController::new(cfg, store),
            palette: CommandPalette::new(ConsultationPalette),
            close_form: EditForm::new(close_workflow),
            reschedule_form: EditForm::new(RescheduleWorkflow),
            create_form: CreateForm::new(NewConsultationWorkflow),
            services,
            last_export: None,
            listener: None,
        }
    }

    /// Replaces the default close workflow (for example with stricter required fields).
    pub fn with_close_workflow(mut self, workflow: CloseWorkflow) -> Self {
        self.close_form = EditForm::new(workflow);
        self
    }

    pub fn list(&self) -> &ListController<Consultation> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<Consultation> {
        &mut self.list
    }

    pub fn view(&self) -> Vec<&Consultation> {
        self.list.view()
    }

    pub fn groups(&self) -> Vec<Group<'_, Consultation>> {
        self.list.groups()
    }

    // ------------------------------------------------------------------
    // Palette
    // ------------------------------------------------------------------

    pub fn palette(&self) -> &CommandPalette<ConsultationPalette> {
        &self.palette
    }

    pub fn palette_items(&self) -> Vec<PaletteItem<ConsultationAction>> {
        self.palette.items(
            self.list.store().list(),
            self.list.selected(),
            self.list.config().palette_limit(),
        )
    }

    /// Feeds one event to the palette and runs the chosen action.
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


    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Runs a palette action. Failures are reported as toasts.
    pub fn run(&mut self, action: ConsultationAction) {
        use ConsultationAction::*;

        match action {
            NewConsultation => self.create_form.open(),
            ShowRange(range) => self.list.set_range(range),
            ShowStatus(status) => self.list.set_status(status),
            ResetFilters => self.list.reset_filters(),
            Export => {
                self.last_export = Some(self.export_csv());
            }
            Start(id) => {
                self.transition(id, ConsultationStatus::InProgress).ok();
            }
            Cancel(id) => {
                self.transition(id, ConsultationStatus::Cancelled).ok();
            }
            MarkNoShow(id) => {
                self.transition(id, ConsultationStatus::NoShow).ok();
            }
            Close(id) => {
                self.open_close(id).ok();
            }
            Reschedule(id) => {
                self.open_reschedule(id).ok();
            }
            Call(id) => {
                if let Some(phone) = self.contact(id, |c| c.phone.clone()) {
                    let code = self.list.config().phone_country_code().to_string();
                    self.services.call(&phone, &code);
                }
            }
            Message(id) => {
                if let Some((phone, text)) = self.contact(id, |c| {
                    let text = format!(
                        "Bonjour {}, nous vous rappelons votre rendez-vous du {} à {}.",
                        c.patient_name,
                        format_date(c.date),
                        format_time(c.time)
                    );
                    (c.phone.clone(), text)
                }) {
                    let code = self.list.config().phone_country_code().to_string();
                    self.services.message(&phone, &code, Some(&text));
                }
            }
            Email(id) => {
                if let Some(email) = self.contact(id, |c| c.email.clone()) {
                    self.services.mail(&email, Some("Votre rendez-vous"));
                }
            }
            CopyPhone(id) => {
                if let Some(phone) = self.contact(id, |c| c.phone.clone()) {
                    self.services.copy_text(&phone, "Le numéro");
                }
            }
            OpenPatient(id) => match self.contact(id, |c| c.patient_id) {
                Some(Some(patient_id)) => self.services.go_to(&format!("/patients/{patient_id}")),
                Some(None) => self.services.notify(Toast::destructive(
                    "Dossier introuvable",
                    "Cette consultation n'est liée à aucun dossier patient",
                )),
                None => {}
            },
            ToggleDetails(id) => {
                if self.list.toggle_expanded(&id).is_err() {
                    self.notify_missing(id);
                }
            }
        }
    }

    /// Reads from a record, or notifies and returns `None` if it is gone.
    fn contact<T>(&self, id: u32, read: impl FnOnce(&Consultation) -> T) -> Option<T> {
        match self.list.record(&id) {
            Ok(c) => Some(read(c)),
            Err(_) => {
                self.notify_missing(id);
                None
            }
        }
    }

    fn notify_missing(&self, id: u32) {
        self.services.notify(Toast::destructive(
            "Consultation introuvable",
            format!("La consultation {id} n'existe plus"),
        ));
    }

    /// Applies a direct status change if the lifecycle allows it.
    pub fn transition(&mut self, id: u32, to: ConsultationStatus) -> CabinetResult<()> {
        let result = self.apply_transition(id, to);
        report(&self.services, result, |_| {
            Toast::success("Consultation mise à jour", format!("Statut : {}", to.label()))
        })
    }

    fn apply_transition(&mut self, id: u32, to: ConsultationStatus) -> CabinetResult<()> {
        let status = self.list.record(&id)?.status.transition(to)?;
        let patch = ConsultationPatch {
            status: Some(status),
            ..ConsultationPatch::default()
        };
        self.list.update_by_id(&id, patch)?;
        Ok(())
    }

    pub fn export_csv(&self) -> String {
        to_csv(&self.list.view(), &csv_columns())
    }

    /// CSV produced by the last palette export.
    pub fn last_export(&self) -> Option<&str> {
        self.last_export.as_deref()
    }

    // ------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------

    pub fn close_form(&self) -> &EditForm<Consultation, CloseWorkflow> {
        &self.close_form
    }

    pub fn close_form_mut(&mut self) -> &mut EditForm<Consultation, CloseWorkflow> {
        &mut self.close_form
    }

    pub fn open_close(&mut self, id: u32) -> CabinetResult<()> {
        let result = self.close_form.open(&self.list, &id);
        if result.is_err() {
            self.notify_missing(id);
        }
        result
    }

    /// Moves the close form to its next step, committing from the last one.
    /// `Ok(None)` means the form moved on without writing.
    pub fn advance_close(&mut self) -> CabinetResult<Option<u32>> {
        if self.close_form.state_mut().next_step() {
            return Ok(None);
        }
        self.commit_close().map(Some)
    }

    pub fn close_back(&mut self) -> bool {
        self.close_form.state_mut().previous_step()
    }

    pub fn commit_close(&mut self) -> CabinetResult<u32> {
        let result = self.close_form.commit(&mut self.list);
        report(&self.services, result, |_| {
            Toast::success("Consultation clôturée", "Le compte rendu a été enregistré")
        })
    }

    pub fn reschedule_form(&self) -> &EditForm<Consultation, RescheduleWorkflow> {
        &self.reschedule_form
    }

    pub fn reschedule_form_mut(&mut self) -> &mut EditForm<Consultation, RescheduleWorkflow> {
        &mut self.reschedule_form
    }

    pub fn open_reschedule(&mut self, id: u32) -> CabinetResult<()> {
        let result = self.reschedule_form.open(&self.list, &id);
        if result.is_err() {
            self.notify_missing(id);
        }
        result
    }

    /// Sets both reschedule fields at once.
    pub fn set_reschedule(&mut self, date: impl Into<String>, time: impl Into<String>) {
        *self.reschedule_form.draft_mut() = RescheduleDraft {
            date: date.into(),
            time: time.into(),
        };
    }

    pub fn commit_reschedule(&mut self) -> CabinetResult<u32> {
        let result = self.reschedule_form.commit(&mut self.list);
        report(&self.services, result, |_| {
            Toast::success("Rendez-vous déplacé", "Le nouveau créneau a été enregistré")
        })
    }

    pub fn create_form(&self) -> &CreateForm<Consultation, NewConsultationWorkflow> {
        &self.create_form
    }

    pub fn create_form_mut(&mut self) -> &mut CreateForm<Consultation, NewConsultationWorkflow> {
        &mut self.create_form
    }

    pub fn commit_create(&mut self) -> CabinetResult<u32> {
        let result = self.create_form.commit(&mut self.list);
        report(&self.services, result, |id| {
            Toast::success("Consultation créée", format!("Rendez-vous n°{id} ajouté"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{mount, Key, KeyboardBus};
    use crate::services::{Recorders, ToastVariant};
    use crate::workflow::close::{CloseField, ClosePolicy};
    use std::cell::RefCell;
    use std::rc::Rc;
    use crate::store::InsertPosition;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).expect("valid date")
    }

    fn at(t: &str) -> NaiveTime {
        parse_time(t).expect("valid time")
    }

    fn controller_with(records: Vec<Consultation>) -> (ConsultationsController, Recorders) {
        let cfg = Arc::new(CoreConfig::with_today(day(20)));
        let store = RecordStore::with_records(records, InsertPosition::Front).expect("seed");
        let (services, recorders) = Services::in_memory();
        (ConsultationsController::new(cfg, store, services), recorders)
    }

    fn single() -> Vec<Consultation> {
        vec![Consultation::new(1, "Amine Ben Ali", day(20), at("09:00"), "Contrôle tension")]
    }

    fn agenda() -> Vec<Consultation> {
        let mut second = Consultation::new(2, "Sarra Trabelsi", day(20), at("08:30"), "Fièvre");
        second.phone = "98 123 456".into();
        second.patient_id = Some(12);
        let mut third = Consultation::new(3, "Karim Jaziri", day(18), at("10:00"), "Suivi diabète");
        third.status = ConsultationStatus::Completed;
        let mut fourth = Consultation::new(4, "Leila Gharbi", day(2), at("11:00"), "Vaccin");
        fourth.status = ConsultationStatus::Cancelled;
        let mut all = single();
        all.extend([second, third, fourth]);
        all
    }

    #[test]
    fn status_filter_scenario() {
        let (mut ctl, _) = controller_with(single());

        ctl.list_mut()
            .set_status(StatusFilter::Only(ConsultationStatus::InProgress));
        assert!(ctl.view().is_empty());

        ctl.list_mut()
            .set_status(StatusFilter::Only(ConsultationStatus::Scheduled));
        let view = ctl.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 1);
        assert_eq!(format_date(view[0].date), "20 Fév 2026");
        assert_eq!(format_time(view[0].time), "09:00");
    }

    #[test]
    fn agenda_is_grouped_by_day() {
        let (ctl, _) = controller_with(agenda());
        let groups = ctl.groups();
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["20 Fév 2026", "18 Fév 2026", "2 Fév 2026"]);
        let first: Vec<u32> = groups[0].records.iter().map(|c| c.id).collect();
        assert_eq!(first, vec![2, 1]);
    }

    #[test]
    fn week_range_excludes_older_visits() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.list_mut().set_range(RangeFilter::Week);
        let ids: Vec<u32> = ctl.view().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn incomplete_reschedule_leaves_record_unchanged() {
        let (mut ctl, rec) = controller_with(single());
        let before = ctl.list().record(&1).expect("record").clone();

        ctl.open_reschedule(1).expect("open");
        ctl.set_reschedule("", "14:00");
        let err = ctl.commit_reschedule().expect_err("missing date");

        assert!(matches!(err, CabinetError::Validation { field: "date", .. }));
        assert_eq!(ctl.list().record(&1).expect("record"), &before);
        assert!(ctl.reschedule_form().is_open());
        assert_eq!(ctl.reschedule_form().state().errors()[0].field, "date");
        let toast = rec.toasts.last().expect("validation notice");
        assert_eq!(toast.variant, ToastVariant::Destructive);
    }

    #[test]
    fn reschedule_rebooks_but_keeps_completed_status() {
        let (mut ctl, _) = controller_with(agenda());

        ctl.open_reschedule(4).expect("open cancelled");
        assert_eq!(ctl.reschedule_form().state().draft().date, "2 Fév 2026");
        ctl.set_reschedule("24 Fév 2026", "16:15");
        ctl.commit_reschedule().expect("commit");
        let moved = ctl.list().record(&4).expect("record");
        assert_eq!(moved.status, ConsultationStatus::Scheduled);
        assert_eq!(moved.date, day(24));
        assert_eq!(moved.time, at("16:15"));
        assert!(!ctl.reschedule_form().is_open());

        ctl.open_reschedule(3).expect("open completed");
        ctl.set_reschedule("2026-02-19", "10:00");
        ctl.commit_reschedule().expect("commit");
        let corrected = ctl.list().record(&3).expect("record");
        assert_eq!(corrected.status, ConsultationStatus::Completed);
        assert_eq!(corrected.date, day(19));
    }

    #[test]
    fn close_completes_and_normalizes_amount() {
        let (mut ctl, _) = controller_with(single());

        ctl.open_close(1).expect("open");
        {
            let draft = ctl.close_form_mut().draft_mut();
            draft.diagnosis = "HTA stade 1".into();
            draft.notes = "Tension 15/9".into();
            draft.amount = "50".into();
            draft.prescriptions.push(PrescriptionLine {
                medication: "Amlodipine 5mg".into(),
                dosage: "1 cp".into(),
                frequency: "le matin".into(),
                duration: "30 jours".into(),
            });
            draft.prescriptions.push(PrescriptionLine::default());
            draft.analyses = vec!["Bilan lipidique".into(), "  ".into()];
            draft.next_follow_up = "20 Mar 2026".into();
        }
        ctl.commit_close().expect("commit");

        let closed = ctl.list().record(&1).expect("record");
        assert_eq!(closed.status, ConsultationStatus::Completed);
        assert_eq!(closed.amount.as_deref(), Some("50 DT"));
        assert_eq!(closed.diagnosis.as_deref(), Some("HTA stade 1"));
        assert_eq!(closed.prescriptions.len(), 1);
        assert_eq!(closed.analyses, vec!["Bilan lipidique".to_string()]);
        assert_eq!(closed.next_follow_up, NaiveDate::from_ymd_opt(2026, 3, 20));
        assert!(!ctl.close_form().is_open());
    }

    #[test]
    fn required_diagnosis_blocks_close() {
        let (ctl, rec) = controller_with(single());
        let mut ctl = ctl.with_close_workflow(CloseWorkflow::new(
            ClosePolicy::default().require(CloseField::Diagnosis),
            "DT",
        ));

        ctl.open_close(1).expect("open");
        ctl.close_form_mut().draft_mut().amount = "50".into();
        let err = ctl.commit_close().expect_err("diagnosis missing");
        assert!(matches!(err, CabinetError::Validation { field: "diagnosis", .. }));

        assert!(ctl.close_form().is_open());
        assert_eq!(ctl.close_form().state().errors()[0].field, "diagnosis");
        let record = ctl.list().record(&1).expect("record");
        assert_eq!(record.status, ConsultationStatus::Scheduled);
        assert_eq!(record.amount, None);
        assert_eq!(rec.toasts.last().expect("toast").variant, ToastVariant::Destructive);

        ctl.close_form_mut().draft_mut().diagnosis = "Angine".into();
        ctl.commit_close().expect("commit");
        assert_eq!(
            ctl.list().record(&1).expect("record").amount.as_deref(),
            Some("50 DT")
        );
    }

    #[test]
    fn close_form_walks_its_steps_before_committing() {
        let (mut ctl, _) = controller_with(single());
        assert!(ctl.advance_close().is_err());

        ctl.open_close(1).expect("open");
        assert_eq!(ctl.close_form().state().steps(), 3);
        assert_eq!(ctl.advance_close().expect("step 2"), None);
        assert!(ctl.close_back());
        assert_eq!(ctl.close_form().state().step(), 0);

        assert_eq!(ctl.advance_close().expect("step 2"), None);
        assert_eq!(ctl.advance_close().expect("step 3"), None);
        assert!(ctl.close_form().state().is_last_step());
        assert_eq!(
            ctl.list().record(&1).expect("record").status,
            ConsultationStatus::Scheduled
        );

        assert_eq!(ctl.advance_close().expect("commit"), Some(1));
        assert!(!ctl.close_form().is_open());
        assert_eq!(
            ctl.list().record(&1).expect("record").status,
            ConsultationStatus::Completed
        );
    }

    #[test]
    fn close_merges_notes_with_existing_ones() {
        let mut records = single();
        records[0].notes = "Antécédents: asthme".into();
        let (mut ctl, _) = controller_with(records);

        ctl.open_close(1).expect("open");
        ctl.close_form_mut().draft_mut().notes = "Examen normal".into();
        ctl.commit_close().expect("commit");

        let closed = ctl.list().record(&1).expect("record");
        assert_eq!(closed.notes, "Antécédents: asthme\nExamen normal");
    }

    #[test]
    fn cannot_close_a_cancelled_consultation() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.open_close(4).expect("open");
        let err = ctl.commit_close().expect_err("cancelled");
        assert!(matches!(err, CabinetError::InvalidTransition { .. }));
        assert_eq!(
            ctl.list().record(&4).expect("record").status,
            ConsultationStatus::Cancelled
        );
    }

    #[test]
    fn lifecycle_rejects_illegal_transitions() {
        let (mut ctl, rec) = controller_with(agenda());
        ctl.transition(1, ConsultationStatus::InProgress).expect("start");
        let err = ctl
            .transition(1, ConsultationStatus::NoShow)
            .expect_err("in progress cannot be no-show");
        assert!(matches!(err, CabinetError::InvalidTransition { .. }));
        assert_eq!(rec.toasts.last().expect("toast").variant, ToastVariant::Destructive);

        let err = ctl
            .transition(99, ConsultationStatus::Cancelled)
            .expect_err("missing");
        assert!(matches!(err, CabinetError::NotFound(_)));
    }

    #[test]
    fn create_assigns_fresh_id_and_surfaces_first() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.run(ConsultationAction::NewConsultation);
        assert!(ctl.create_form().is_open());

        {
            let draft = ctl.create_form_mut().draft_mut();
            draft.patient_name = "Nour Hamdi".into();
            draft.date = "20 Fév 2026".into();
            draft.time = "17:00".into();
            draft.motif = "Certificat".into();
        }
        let id = ctl.commit_create().expect("create");
        assert_eq!(id, 5);
        assert_eq!(ctl.list().store().list()[0].id, 5);
        assert_eq!(ctl.list().record(&5).expect("new").status, ConsultationStatus::Scheduled);
    }

    #[test]
    fn create_requires_patient_and_slot() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.create_form_mut().open();
        ctl.create_form_mut().draft_mut().patient_name = "Nour Hamdi".into();
        let err = ctl.commit_create().expect_err("missing date");
        assert!(matches!(err, CabinetError::Validation { field: "date", .. }));
        assert!(ctl.create_form().is_open());
        assert_eq!(ctl.list().store().len(), 4);
    }

    #[test]
    fn palette_offers_contextual_actions_by_phone() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.palette_event(PaletteEvent::Open);
        ctl.palette_event(PaletteEvent::QueryChanged("98 123".into()));

        let items = ctl.palette_items();
        assert!(!items.is_empty());
        assert!(items
            .iter()
            .all(|i| i.key.ends_with("-2") && i.group == PaletteGroup::Contextual));
        let start = items.iter().find(|i| i.key == "start-2").expect("start");
        assert!(!start.disabled);
    }

    #[test]
    fn palette_disables_actions_by_status() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.list_mut().select(&3).expect("select completed");
        ctl.palette_event(PaletteEvent::Open);
        ctl.palette_event(PaletteEvent::QueryChanged("karim".into()));
        let items = ctl.palette_items();
        assert!(items.iter().all(|i| i.group == PaletteGroup::Focused));

        let disabled = |key: &str| {
            items
                .iter()
                .find(|i| i.key == key)
                .map(|i| i.disabled)
                .unwrap_or_else(|| panic!("missing item {key}"))
        };
        assert!(disabled("start-3"));
        assert!(disabled("reschedule-3"));
        assert!(disabled("cancel-3"));
        assert!(!disabled("details-3"));
    }

    #[test]
    fn palette_is_capped_by_config() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.list_mut().select(&1).expect("select");
        assert_eq!(ctl.palette_items().len(), 12);
    }

    #[test]
    fn running_a_palette_item_closes_and_applies_it() {
        let (mut ctl, rec) = controller_with(agenda());
        assert!(ctl.handle_key(&KeyEvent::ctrl('k')));
        assert!(ctl.palette().is_open());

        ctl.palette_event(PaletteEvent::QueryChanged("sarra".into()));
        let items = ctl.palette_items();
        assert_eq!(items[0].key, "start-2");
        assert!(ctl.handle_key(&KeyEvent::plain(Key::Enter)));

        assert!(!ctl.palette().is_open());
        assert_eq!(
            ctl.list().record(&2).expect("record").status,
            ConsultationStatus::InProgress
        );
        assert_eq!(rec.toasts.last().expect("toast").variant, ToastVariant::Success);
    }

    #[test]
    fn mounted_view_receives_shortcuts_until_dropped() {
        let bus = KeyboardBus::new();
        let (ctl, _) = controller_with(agenda());
        let view = Rc::new(RefCell::new(ctl));
        mount(&bus, &view);
        assert_eq!(bus.listener_count(), 1);

        bus.dispatch(&KeyEvent::ctrl('k'));
        assert!(view.borrow().palette().is_open());
        bus.dispatch(&KeyEvent::plain(Key::Escape));
        assert!(!view.borrow().palette().is_open());

        drop(view);
        assert_eq!(bus.listener_count(), 0);
        bus.dispatch(&KeyEvent::ctrl('k'));
    }

    #[test]
    fn palette_filters_change_the_view() {
        let (mut ctl, _) = controller_with(agenda());
        ctl.run(ConsultationAction::ShowRange(RangeFilter::Today));
        ctl.run(ConsultationAction::ShowStatus(StatusFilter::Only(
            ConsultationStatus::Scheduled,
        )));
        let ids: Vec<u32> = ctl.view().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);

        ctl.run(ConsultationAction::Export);
        let csv = ctl.last_export().expect("exported");
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("Sarra Trabelsi"));
        assert!(!csv.contains("Karim Jaziri"));

        ctl.list_mut().set_search("sarra");
        ctl.run(ConsultationAction::ResetFilters);
        let ids: Vec<u32> = ctl.view().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3, 4]);
    }

    #[test]
    fn contact_actions_use_services() {
        let (mut ctl, rec) = controller_with(agenda());
        ctl.run(ConsultationAction::Call(2));
        ctl.run(ConsultationAction::CopyPhone(2));
        ctl.run(ConsultationAction::OpenPatient(2));
        ctl.run(ConsultationAction::Call(1));

        assert_eq!(rec.launches.uris(), vec!["tel:+21698123456".to_string()]);
        assert_eq!(rec.clipboard.contents().as_deref(), Some("98 123 456"));
        assert_eq!(rec.navigation.paths(), vec!["/patients/12".to_string()]);
        // Record 1 has no phone: notified instead of launched.
        assert_eq!(rec.toasts.last().expect("toast").title, "Numéro indisponible");
    }

    #[test]
    fn actions_on_missing_records_are_noops() {
        let (mut ctl, rec) = controller_with(agenda());
        ctl.run(ConsultationAction::Call(99));
        ctl.run(ConsultationAction::ToggleDetails(99));
        assert!(rec.launches.uris().is_empty());
        assert_eq!(rec.toasts.toasts().len(), 2);
        assert!(ctl.list().expanded().is_none());
    }

    #[test]
    fn status_parses_from_snake_or_kebab_case() {
        assert_eq!(
            "in-progress".parse::<ConsultationStatus>().expect("status"),
            ConsultationStatus::InProgress
        );
        assert!("done".parse::<ConsultationStatus>().is_err());
    }
}
