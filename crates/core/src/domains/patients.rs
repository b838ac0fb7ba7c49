//! Patients: the practice's patient directory.
//!
//! Patients are not date-bound; the default order is most recent visit first and the user
//! can sort explicitly by name, age or last visit.

use super::report;
use crate::config::CoreConfig;
use crate::controller::ListController;
use crate::dates::format_date;
use crate::error::{CabinetError, CabinetResult};
use crate::export::{to_csv, Column};
use crate::keyboard::{KeyEvent, KeyHandler, ListenerGuard};
use crate::palette::{CommandPalette, PaletteEvent, PaletteGroup, PaletteItem, PaletteProvider};
use crate::query::StatusFilter;
use crate::record::{next_numeric_id, Record};
use crate::services::{Services, Toast};
use crate::store::RecordStore;
use crate::workflow::create::{initials, required_text};
use crate::workflow::{CreateForm, CreateWorkflow};
use cabinet_types::split_comma_list;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Active,
    Inactive,
    New,
}

impl PatientStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Inactive, Self::New];

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Actif",
            Self::Inactive => "Inactif",
            Self::New => "Nouveau",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::New => "new",
        }
    }
}

impl std::str::FromStr for PatientStatus {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| CabinetError::InvalidInput(format!("unknown patient status: {s}")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Self::Female => "F",
            Self::Male => "M",
            Self::Unspecified => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatientSort {
    Name,
    Age,
    LastVisit,
}

impl PatientSort {
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "nom",
            Self::Age => "âge",
            Self::LastVisit => "dernière visite",
        }
    }
}

impl std::str::FromStr for PatientSort {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "name" => Ok(Self::Name),
            "age" => Ok(Self::Age),
            "last_visit" => Ok(Self::LastVisit),
            other => Err(CabinetError::InvalidInput(format!("unknown patient sort: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub initials: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub last_visit: Option<NaiveDate>,
    pub status: PatientStatus,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Patient {
    type Id = u32;
    type Status = PatientStatus;
    type SortKey = PatientSort;

    fn id(&self) -> &u32 {
        &self.id
    }

    fn status(&self) -> PatientStatus {
        self.status
    }

    fn searchable_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.phone.as_str(),
            self.email.as_str(),
        ];
        fields.extend(self.conditions.iter().map(String::as_str));
        fields
    }

    fn contact_fields(&self) -> Vec<&str> {
        vec![&self.first_name, &self.last_name, &self.phone, &self.email]
    }

    fn date(&self) -> Option<NaiveDate> {
        self.last_visit
    }

    fn compare_by(&self, other: &Self, key: PatientSort) -> Ordering {
        match key {
            PatientSort::Name => (self.last_name.to_lowercase(), self.first_name.to_lowercase())
                .cmp(&(other.last_name.to_lowercase(), other.first_name.to_lowercase())),
            PatientSort::Age => self.age.cmp(&other.age),
            PatientSort::LastVisit => self.last_visit.cmp(&other.last_visit),
        }
    }
}

// ============================================================================
// Create workflow
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewPatientDraft {
    pub first_name: String,
    pub last_name: String,
    pub age: String,
    pub gender: Gender,
    pub phone: String,
    pub email: String,
    pub blood_type: String,
    /// Comma-separated.
    pub allergies: String,
    /// Comma-separated.
    pub conditions: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NewPatientWorkflow;

impl CreateWorkflow<Patient> for NewPatientWorkflow {
    type Draft = NewPatientDraft;

    fn steps(&self) -> usize {
        2
    }

    fn next_id(&self, store: &RecordStore<Patient>) -> u32 {
        next_numeric_id(store.ids())
    }

    fn build(&self, draft: &NewPatientDraft, id: u32) -> CabinetResult<Patient> {
        let first_name = required_text("first_name", &draft.first_name, "Le prénom est requis")?;
        let last_name = required_text("last_name", &draft.last_name, "Le nom est requis")?;

        let age = match draft.age.trim() {
            "" => None,
            text => Some(text.parse::<u32>().ok().filter(|age| *age <= 130).ok_or_else(|| {
                CabinetError::validation("age", format!("Âge invalide: {text}"))
            })?),
        };

        let list = |input: &str| {
            split_comma_list(input)
                .into_iter()
                .map(|item| item.into_inner())
                .collect::<Vec<_>>()
        };

        Ok(Patient {
            id,
            initials: initials(&first_name, &last_name),
            first_name: first_name.into_inner(),
            last_name: last_name.into_inner(),
            age,
            gender: draft.gender,
            phone: draft.phone.trim().to_string(),
            email: draft.email.trim().to_string(),
            blood_type: Some(draft.blood_type.trim().to_uppercase()).filter(|b| !b.is_empty()),
            allergies: list(&draft.allergies),
            conditions: list(&draft.conditions),
            last_visit: None,
            status: PatientStatus::New,
        })
    }
}

// ============================================================================
// Palette
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum PatientAction {
    NewPatient,
    SortBy(PatientSort),
    ClearSort,
    ShowStatus(StatusFilter<PatientStatus>),
    ResetFilters,
    Export,
    OpenRecord(u32),
    Call(u32),
    Message(u32),
    Email(u32),
    CopyPhone(u32),
    ScheduleConsultation(u32),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PatientPalette;

impl PaletteProvider for PatientPalette {
    type Record = Patient;
    type Action = PatientAction;

    fn global_items(&self) -> Vec<PaletteItem<PatientAction>> {
        use PatientAction::*;

        let mut items = vec![PaletteItem::new("new", "Nouveau patient", NewPatient).hint("Créer un dossier")];
        items.extend(
            [PatientSort::Name, PatientSort::Age, PatientSort::LastVisit]
                .into_iter()
                .map(|key| {
                    PaletteItem::new(
                        format!("sort-{}", key.label()),
                        format!("Trier par {}", key.label()),
                        SortBy(key),
                    )
                    .group(PaletteGroup::Filter)
                }),
        );
        items.push(
            PaletteItem::new("sort-default", "Ordre par défaut", ClearSort)
                .hint("Dernière visite d'abord")
                .group(PaletteGroup::Filter),
        );
        items.push(
            PaletteItem::new("status-all", "Tous les patients", ShowStatus(StatusFilter::All))
                .group(PaletteGroup::Filter),
        );
        items.extend(PatientStatus::ALL.into_iter().map(|status| {
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

    fn record_items(&self, p: &Patient, _group: PaletteGroup) -> Vec<PaletteItem<PatientAction>> {
        use PatientAction::*;

        let id = p.id;
        let name = p.full_name();
        let no_phone = p.phone.trim().is_empty();
        vec![
            PaletteItem::new(format!("open-{id}"), format!("Ouvrir le dossier : {name}"), OpenRecord(id))
                .hint(p.status.label()),
            PaletteItem::new(
                format!("schedule-{id}"),
                format!("Programmer une consultation : {name}"),
                ScheduleConsultation(id),
            )
            .disabled_if(p.status == PatientStatus::Inactive),
            PaletteItem::new(format!("call-{id}"), format!("Appeler {name}"), Call(id))
                .hint(p.phone.clone())
                .disabled_if(no_phone),
            PaletteItem::new(format!("message-{id}"), format!("WhatsApp {name}"), Message(id))
                .hint(p.phone.clone())
                .disabled_if(no_phone),
            PaletteItem::new(format!("email-{id}"), format!("Écrire à {name}"), Email(id))
                .hint(p.email.clone())
                .disabled_if(p.email.trim().is_empty()),
            PaletteItem::new(
                format!("copy-phone-{id}"),
                format!("Copier le numéro de {name}"),
                CopyPhone(id),
            )
            .disabled_if(no_phone),
        ]
    }
}

pub fn csv_columns() -> Vec<Column<Patient>> {
    vec![
        Column::new("ID", |p: &Patient| p.id.to_string()),
        Column::new("Nom", |p: &Patient| p.last_name.clone()),
        Column::new("Prénom", |p: &Patient| p.first_name.clone()),
        Column::new("Âge", |p: &Patient| p.age.map(|a| a.to_string()).unwrap_or_default()),
        Column::new("Sexe", |p: &Patient| p.gender.label().to_string()),
        Column::new("Téléphone", |p: &Patient| p.phone.clone()),
        Column::new("Email", |p: &Patient| p.email.clone()),
        Column::new("Groupe sanguin", |p: &Patient| p.blood_type.clone().unwrap_or_default()),
        Column::new("Allergies", |p: &Patient| p.allergies.join(", ")),
        Column::new("Antécédents", |p: &Patient| p.conditions.join(", ")),
        Column::new("Dernière visite", |p: &Patient| {
            p.last_visit.map(format_date).unwrap_or_default()
        }),
        Column::new("Statut", |p: &Patient| p.status.label().to_string()),
    ]
}

// ============================================================================
// Controller
// ============================================================================

pub struct PatientsController {
    list: ListController<Patient>,
    palette: CommandPalette<PatientPalette>,
    create_form: CreateForm<Patient, NewPatientWorkflow>,
    services: Services,
    last_export: Option<String>,
    listener: Option<ListenerGuard>,
}

impl KeyHandler for PatientsController {
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

impl PatientsController {
    pub fn new(cfg: Arc<CoreConfig>, store: RecordStore<Patient>, services: Services) -> Self {
        Self {
            list: ListController::new(cfg, store),
            palette: CommandPalette::new(PatientPalette),
            create_form: CreateForm::new(NewPatientWorkflow),
            services,
            last_export: None,
            listener: None,
        }
    }

    pub fn list(&self) -> &ListController<Patient> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<Patient> {
        &mut self.list
    }

    pub fn view(&self) -> Vec<&Patient> {
        self.list.view()
    }

    pub fn palette(&self) -> &CommandPalette<PatientPalette> {
        &self.palette
    }

    pub fn palette_items(&self) -> Vec<PaletteItem<PatientAction>> {
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


    pub fn run(&mut self, action: PatientAction) {
        use PatientAction::*;

        match action {
            NewPatient => self.create_form.open(),
            SortBy(key) => self.list.sort_by(key),
            ClearSort => self.list.clear_sort(),
            ShowStatus(status) => self.list.set_status(status),
            ResetFilters => self.list.reset_filters(),
            Export => self.last_export = Some(self.export_csv()),
            OpenRecord(id) => {
                if self.exists(id) {
                    self.services.go_to(&format!("/patients/{id}"));
                }
            }
            ScheduleConsultation(id) => {
                if self.exists(id) {
                    self.services.go_to(&format!("/consultations/new?patient={id}"));
                }
            }
            Call(id) => {
                if let Some(phone) = self.read(id, |p| p.phone.clone()) {
                    let code = self.list.config().phone_country_code().to_string();
                    self.services.call(&phone, &code);
                }
            }
            Message(id) => {
                if let Some((phone, text)) =
                    self.read(id, |p| (p.phone.clone(), format!("Bonjour {},", p.first_name)))
                {
                    let code = self.list.config().phone_country_code().to_string();
                    self.services.message(&phone, &code, Some(&text));
                }
            }
            Email(id) => {
                if let Some(email) = self.read(id, |p| p.email.clone()) {
                    self.services.mail(&email, None);
                }
            }
            CopyPhone(id) => {
                if let Some(phone) = self.read(id, |p| p.phone.clone()) {
                    self.services.copy_text(&phone, "Le numéro");
                }
            }
        }
    }

    fn exists(&self, id: u32) -> bool {
        self.read(id, |_| ()).is_some()
    }

    fn read<T>(&self, id: u32, f: impl FnOnce(&Patient) -> T) -> Option<T> {
        match self.list.record(&id) {
            Ok(p) => Some(f(p)),
            Err(_) => {
                self.services.notify(Toast::destructive(
                    "Patient introuvable",
                    format!("Le dossier {id} n'existe plus"),
                ));
                None
            }
        }
    }

    pub fn export_csv(&self) -> String {
        to_csv(&self.list.view(), &csv_columns())
    }

    pub fn last_export(&self) -> Option<&str> {
        self.last_export.as_deref()
    }

    pub fn create_form(&self) -> &CreateForm<Patient, NewPatientWorkflow> {
        &self.create_form
    }

    pub fn create_form_mut(&mut self) -> &mut CreateForm<Patient, NewPatientWorkflow> {
        &mut self.create_form
    }

    /// Next step of the new-patient form; commits from the last step.
    pub fn advance_create(&mut self) -> CabinetResult<Option<u32>> {
        if self.create_form.state_mut().next_step() {
            return Ok(None);
        }
        self.commit_create().map(Some)
    }

    pub fn create_back(&mut self) -> bool {
        self.create_form.state_mut().previous_step()
    }

    pub fn commit_create(&mut self) -> CabinetResult<u32> {
        let result = self.create_form.commit(&mut self.list);
        report(&self.services, result, |id| {
            Toast::success("Patient créé", format!("Dossier n°{id} ajouté"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Recorders, ToastVariant};
    use crate::store::InsertPosition;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).expect("valid date")
    }

    fn patient(id: u32, first: &str, last: &str, age: u32, last_visit: Option<NaiveDate>) -> Patient {
        Patient {
            id,
            first_name: first.into(),
            last_name: last.into(),
            initials: String::new(),
            age: Some(age),
            gender: Gender::Unspecified,
            phone: String::new(),
            email: String::new(),
            blood_type: None,
            allergies: Vec::new(),
            conditions: Vec::new(),
            last_visit,
            status: PatientStatus::Active,
        }
    }

    fn directory() -> Vec<Patient> {
        let mut amine = patient(1, "Amine", "Ben Ali", 45, Some(day(2, 20)));
        amine.phone = "98 123 456".into();
        amine.conditions = vec!["Hypertension".into()];
        let mut sarra = patient(2, "Sarra", "Trabelsi", 32, Some(day(1, 5)));
        sarra.email = "sarra@example.tn".into();
        let karim = patient(3, "Karim", "Amri", 45, Some(day(2, 18)));
        let mut leila = patient(7, "Leila", "Jaziri", 61, None);
        leila.status = PatientStatus::Inactive;
        vec![amine, sarra, karim, leila]
    }

    fn controller() -> (PatientsController, Recorders) {
        let cfg = Arc::new(CoreConfig::with_today(day(2, 20)));
        let store = RecordStore::with_records(directory(), InsertPosition::Front).expect("seed");
        let (services, recorders) = Services::in_memory();
        (PatientsController::new(cfg, store, services), recorders)
    }

    fn ids(ctl: &PatientsController) -> Vec<u32> {
        ctl.view().iter().map(|p| p.id).collect()
    }

    #[test]
    fn default_order_is_most_recent_visit_first() {
        let (ctl, _) = controller();
        assert_eq!(ids(&ctl), vec![1, 3, 2, 7]);
    }

    #[test]
    fn explicit_sort_toggles_and_breaks_ties_by_previous_key() {
        let (mut ctl, _) = controller();

        ctl.list_mut().sort_by(PatientSort::Name);
        assert_eq!(ids(&ctl), vec![3, 1, 7, 2]);

        // Amine and Karim are both 45: the previous key (name) decides.
        ctl.list_mut().sort_by(PatientSort::Age);
        assert_eq!(ids(&ctl), vec![2, 3, 1, 7]);

        ctl.list_mut().sort_by(PatientSort::Age);
        assert_eq!(ids(&ctl), vec![7, 1, 3, 2]);
    }

    #[test]
    fn search_matches_conditions_case_insensitively() {
        let (mut ctl, _) = controller();
        ctl.list_mut().set_search("HYPERTENSION");
        assert_eq!(ids(&ctl), vec![1]);
        ctl.list_mut().set_search("hypertension");
        assert_eq!(ids(&ctl), vec![1]);
    }

    #[test]
    fn search_text_is_matched_as_typed() {
        let (mut ctl, _) = controller();
        ctl.list_mut().set_search(" karim");
        assert!(ids(&ctl).is_empty());

        ctl.list_mut().set_search("amri ");
        assert_eq!(ids(&ctl), vec![3]);
        assert!(ctl.view().iter().all(|p| p.haystack().contains("amri ")));
    }

    #[test]
    fn create_derives_initials_and_fresh_id() {
        let (mut ctl, rec) = controller();
        ctl.run(PatientAction::NewPatient);
        {
            let draft = ctl.create_form_mut().draft_mut();
            draft.first_name = "Jean".into();
            draft.last_name = "Dupont".into();
            draft.age = "52".into();
            draft.blood_type = "a+".into();
            draft.allergies = "Pénicilline, , aspirine ,".into();
            draft.conditions = "  ".into();
        }
        let id = ctl.commit_create().expect("create");

        let existing: Vec<u32> = directory().iter().map(|p| p.id).collect();
        assert!(!existing.contains(&id));
        let jean = ctl.list().record(&id).expect("created");
        assert_eq!(jean.initials, "JD");
        assert_eq!(jean.status, PatientStatus::New);
        assert_eq!(jean.blood_type.as_deref(), Some("A+"));
        assert_eq!(jean.allergies, vec!["Pénicilline".to_string(), "aspirine".to_string()]);
        assert!(jean.conditions.is_empty());
        assert_eq!(ctl.list().store().list()[0].id, id);
        assert!(!ctl.create_form().is_open());
        assert_eq!(rec.toasts.last().expect("toast").variant, ToastVariant::Success);
    }

    #[test]
    fn create_form_commits_from_its_last_step() {
        let (mut ctl, _) = controller();
        ctl.run(PatientAction::NewPatient);
        ctl.create_form_mut().draft_mut().first_name = "Nour".into();
        assert_eq!(ctl.advance_create().expect("identity step"), None);
        assert!(ctl.create_back());
        assert_eq!(ctl.advance_create().expect("identity step"), None);

        let err = ctl.advance_create().expect_err("last name missing");
        assert!(matches!(err, CabinetError::Validation { field: "last_name", .. }));
        assert!(ctl.create_form().state().is_last_step());

        ctl.create_form_mut().draft_mut().last_name = "Hamdi".into();
        let id = ctl.advance_create().expect("commit").expect("created");
        assert_eq!(ctl.list().record(&id).expect("created").initials, "NH");
    }

    #[test]
    fn palette_resets_filters_and_sort() {
        let (mut ctl, _) = controller();
        ctl.run(PatientAction::SortBy(PatientSort::Name));
        ctl.run(PatientAction::ShowStatus(StatusFilter::Only(PatientStatus::Inactive)));
        ctl.list_mut().set_search("leila");
        assert_eq!(ids(&ctl), vec![7]);

        ctl.run(PatientAction::ResetFilters);
        assert_eq!(ids(&ctl), vec![3, 1, 7, 2]);

        ctl.run(PatientAction::ClearSort);
        assert_eq!(ids(&ctl), vec![1, 3, 2, 7]);
    }

    #[test]
    fn create_requires_both_names() {
        let (mut ctl, rec) = controller();
        ctl.create_form_mut().open();
        ctl.create_form_mut().draft_mut().first_name = "Jean".into();

        let err = ctl.commit_create().expect_err("missing last name");
        assert!(matches!(err, CabinetError::Validation { field: "last_name", .. }));
        assert!(ctl.create_form().is_open());
        assert_eq!(ctl.list().store().len(), 4);
        assert_eq!(rec.toasts.last().expect("toast").title, "Formulaire incomplet");
    }

    #[test]
    fn create_rejects_unparseable_age() {
        let (mut ctl, _) = controller();
        ctl.create_form_mut().open();
        {
            let draft = ctl.create_form_mut().draft_mut();
            draft.first_name = "Jean".into();
            draft.last_name = "Dupont".into();
            draft.age = "cinquante".into();
        }
        let err = ctl.commit_create().expect_err("bad age");
        assert!(matches!(err, CabinetError::Validation { field: "age", .. }));
    }

    #[test]
    fn palette_sort_and_navigation_actions() {
        let (mut ctl, rec) = controller();
        ctl.run(PatientAction::SortBy(PatientSort::Name));
        assert_eq!(ids(&ctl)[0], 3);

        ctl.run(PatientAction::OpenRecord(2));
        ctl.run(PatientAction::ScheduleConsultation(1));
        ctl.run(PatientAction::OpenRecord(40));
        assert_eq!(
            rec.navigation.paths(),
            vec!["/patients/2".to_string(), "/consultations/new?patient=1".to_string()]
        );
        assert_eq!(rec.toasts.last().expect("toast").title, "Patient introuvable");
    }

    #[test]
    fn palette_matches_records_by_email() {
        let (mut ctl, _) = controller();
        ctl.palette_event(PaletteEvent::Open);
        ctl.palette_event(PaletteEvent::QueryChanged("sarra@".into()));
        let items = ctl.palette_items();
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.key.ends_with("-2")));
        let call = items.iter().find(|i| i.key == "call-2").expect("call");
        assert!(call.disabled);
        let email = items.iter().find(|i| i.key == "email-2").expect("email");
        assert!(!email.disabled);
    }

    #[test]
    fn message_prefills_greeting() {
        let (mut ctl, rec) = controller();
        ctl.run(PatientAction::Message(1));
        assert_eq!(
            rec.launches.uris(),
            vec!["https://wa.me/21698123456?text=Bonjour%20Amine%2C".to_string()]
        );
    }

    #[test]
    fn export_follows_the_view() {
        let (mut ctl, _) = controller();
        ctl.run(PatientAction::ShowStatus(StatusFilter::Only(PatientStatus::Inactive)));
        ctl.run(PatientAction::Export);
        let csv = ctl.last_export().expect("exported");
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("Jaziri"));
    }
}
