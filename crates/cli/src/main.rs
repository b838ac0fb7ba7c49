use anyhow::Context;
use cabinet_core::constants::{
    DEFAULT_CURRENCY_SUFFIX, DEFAULT_PALETTE_LIMIT, DEFAULT_PHONE_COUNTRY_CODE, SEED_ENV_VAR,
    TODAY_ENV_VAR,
};
use cabinet_core::dates::{format_date, format_time};
use cabinet_core::domains::consultations::{ConsultationStatus, ConsultationsController};
use cabinet_core::domains::patients::{NewPatientDraft, PatientSort, PatientStatus, PatientsController};
use cabinet_core::domains::prescriptions::{PrescriptionStatus, PrescriptionsController};
use cabinet_core::export::to_json;
use cabinet_core::palette::{PaletteEvent, PaletteItem};
use cabinet_core::seed::{demo_seed, load_seed_yaml, Seed};
use cabinet_core::services::{Launcher, Navigator, Services, TracingNotifier};
use cabinet_core::{resolve_today, CabinetResult, CoreConfig, RangeFilter, StatusFilter};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cabinet")]
#[command(about = "Practice list views: consultations, patients and prescriptions")]
struct Cli {
    /// YAML seed file (defaults to $CABINET_SEED, then the bundled demo data)
    #[arg(long, global = true)]
    seed: Option<PathBuf>,
    /// Reference date for range filters (defaults to $CABINET_TODAY, then today)
    #[arg(long, global = true)]
    today: Option<String>,
    /// Maximum number of palette items (0 for no limit)
    #[arg(long, global = true, default_value_t = DEFAULT_PALETTE_LIMIT)]
    palette_limit: usize,
    /// Suffix appended to amounts
    #[arg(long, global = true, default_value = DEFAULT_CURRENCY_SUFFIX)]
    currency: String,
    /// Country code prepended to local phone numbers
    #[arg(long, global = true, default_value = DEFAULT_PHONE_COUNTRY_CODE)]
    country_code: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Domain {
    Consultations,
    Patients,
    Prescriptions,
}

#[derive(Args, Clone, Default)]
struct Filters {
    /// today, week or all
    #[arg(long)]
    range: Option<String>,
    /// Status value (e.g. scheduled, active)
    #[arg(long)]
    status: Option<String>,
    /// Free-text search
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the consultation agenda grouped by day
    Consultations {
        #[command(flatten)]
        filters: Filters,
        /// Print JSON instead of the agenda
        #[arg(long)]
        json: bool,
    },
    /// List patients
    Patients {
        #[command(flatten)]
        filters: Filters,
        /// name, age or last-visit
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        json: bool,
    },
    /// List prescriptions
    Prescriptions {
        #[command(flatten)]
        filters: Filters,
        #[arg(long)]
        json: bool,
    },
    /// Show the command palette for a domain
    Palette {
        #[arg(value_enum)]
        domain: Domain,
        /// Palette query text
        #[arg(long, default_value = "")]
        query: String,
        /// Id of the focused record
        #[arg(long)]
        focus: Option<String>,
    },
    /// Export the filtered list as CSV
    Export {
        #[arg(value_enum)]
        domain: Domain,
        #[command(flatten)]
        filters: Filters,
    },
    /// Move a consultation to a new slot
    Reschedule {
        id: u32,
        /// New date (2026-02-24 or "24 Fév 2026")
        date: String,
        /// New time (14:00)
        time: String,
    },
    /// Close a consultation
    Close {
        id: u32,
        #[arg(long, default_value = "")]
        diagnosis: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, default_value = "")]
        amount: String,
    },
    /// Create a patient
    AddPatient {
        first_name: String,
        last_name: String,
        #[arg(long, default_value = "")]
        age: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Comma-separated
        #[arg(long, default_value = "")]
        allergies: String,
        /// Comma-separated
        #[arg(long, default_value = "")]
        conditions: String,
    },
}

/// Prints external launches instead of opening them.
struct PrintLauncher;

impl Launcher for PrintLauncher {
    fn launch(&mut self, uri: &str) -> CabinetResult<()> {
        println!("open {}", uri);
        Ok(())
    }
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn go_to(&mut self, path: &str) {
        println!("go to {}", path);
    }
}

fn services() -> Services {
    let (mut services, _) = Services::in_memory();
    services.notifier = Box::new(TracingNotifier);
    services.launcher = Box::new(PrintLauncher);
    services.navigator = Box::new(PrintNavigator);
    services
}

struct App {
    cfg: Arc<CoreConfig>,
    seed: Seed,
}

impl App {
    fn consultations(&self) -> anyhow::Result<ConsultationsController> {
        Ok(ConsultationsController::new(
            self.cfg.clone(),
            self.seed.consultation_store()?,
            services(),
        ))
    }

    fn patients(&self) -> anyhow::Result<PatientsController> {
        Ok(PatientsController::new(
            self.cfg.clone(),
            self.seed.patient_store()?,
            services(),
        ))
    }

    fn prescriptions(&self) -> anyhow::Result<PrescriptionsController> {
        Ok(PrescriptionsController::new(
            self.cfg.clone(),
            self.seed.prescription_store()?,
            services(),
        ))
    }
}

fn apply_filters<R, S>(list: &mut cabinet_core::ListController<R>, filters: &Filters) -> anyhow::Result<()>
where
    R: cabinet_core::Record<Status = S>,
    S: FromStr<Err = cabinet_core::CabinetError>,
{
    if let Some(range) = &filters.range {
        list.set_range(range.parse::<RangeFilter>()?);
    }
    if let Some(status) = &filters.status {
        let filter = match status.as_str() {
            "all" => StatusFilter::All,
            other => StatusFilter::Only(other.parse::<S>()?),
        };
        list.set_status(filter);
    }
    if let Some(search) = &filters.search {
        list.set_search(search.clone());
    }
    Ok(())
}

fn print_palette<A>(items: &[PaletteItem<A>]) {
    if items.is_empty() {
        println!("No matching actions.");
    }
    for item in items {
        let mut line = format!("[{}] {}", item.group.label(), item.label);
        if !item.hint.is_empty() {
            line.push_str(&format!(" · {}", item.hint));
        }
        if item.disabled {
            line.push_str(" (indisponible)");
        }
        println!("{}", line);
    }
}

/// `0` lifts the cap.
fn palette_limit(flag: usize) -> Option<usize> {
    (flag > 0).then_some(flag)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("cabinet=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let today = resolve_today(cli.today.clone().or_else(|| std::env::var(TODAY_ENV_VAR).ok()))?;
    let cfg = CoreConfig::new(
        today,
        palette_limit(cli.palette_limit),
        cli.currency.clone(),
        cli.country_code.clone(),
    )?;
    tracing::info!("reference date {}", format_date(cfg.today()));

    let seed_path = cli
        .seed
        .clone()
        .or_else(|| std::env::var(SEED_ENV_VAR).ok().map(PathBuf::from));
    let seed = match seed_path {
        Some(path) => load_seed_yaml(&path)
            .with_context(|| format!("loading seed {}", path.display()))?,
        None => demo_seed()?,
    };
    let app = App {
        cfg: Arc::new(cfg),
        seed,
    };

    match cli.command {
        Some(Commands::Consultations { filters, json }) => {
            let mut ctl = app.consultations()?;
            apply_filters::<_, ConsultationStatus>(ctl.list_mut(), &filters)?;
            if json {
                println!("{}", to_json(&ctl.view())?);
                return Ok(());
            }
            let groups = ctl.groups();
            if groups.is_empty() {
                println!("No consultations found.");
            }
            for group in groups {
                println!("== {} ==", group.key);
                for c in group.records {
                    println!(
                        "  #{:<3} {}  {:<20} {:<28} [{}]",
                        c.id,
                        format_time(c.time),
                        c.patient_name,
                        c.motif,
                        c.status.label()
                    );
                }
            }
        }
        Some(Commands::Patients {
            filters,
            sort,
            desc,
            json,
        }) => {
            let mut ctl = app.patients()?;
            apply_filters::<_, PatientStatus>(ctl.list_mut(), &filters)?;
            if let Some(sort) = sort {
                let key = sort.parse::<PatientSort>()?;
                ctl.list_mut().sort_by(key);
                if desc {
                    ctl.list_mut().sort_by(key);
                }
            }
            if json {
                println!("{}", to_json(&ctl.view())?);
                return Ok(());
            }
            let patients = ctl.view();
            if patients.is_empty() {
                println!("No patients found.");
            }
            for p in patients {
                println!(
                    "#{:<3} {:<3} {:<24} {:>3} ans  {:<14} dernière visite: {}  [{}]",
                    p.id,
                    p.initials,
                    p.full_name(),
                    p.age.map(|a| a.to_string()).unwrap_or_else(|| "?".into()),
                    p.phone,
                    p.last_visit.map(format_date).unwrap_or_else(|| "-".into()),
                    p.status.label()
                );
            }
        }
        Some(Commands::Prescriptions { filters, json }) => {
            let mut ctl = app.prescriptions()?;
            apply_filters::<_, PrescriptionStatus>(ctl.list_mut(), &filters)?;
            if json {
                println!("{}", to_json(&ctl.view())?);
                return Ok(());
            }
            let prescriptions = ctl.view();
            if prescriptions.is_empty() {
                println!("No prescriptions found.");
            }
            for p in prescriptions {
                println!(
                    "{}  {}  {:<20} {} médicament(s)  [{}]",
                    p.id,
                    format_date(p.date),
                    p.patient_name,
                    p.medications.len(),
                    p.status.label()
                );
            }
        }
        Some(Commands::Palette {
            domain,
            query,
            focus,
        }) => match domain {
            Domain::Consultations => {
                let mut ctl = app.consultations()?;
                if let Some(id) = focus {
                    ctl.list_mut().select(&id.parse()?)?;
                }
                ctl.palette_event(PaletteEvent::Open);
                ctl.palette_event(PaletteEvent::QueryChanged(query));
                print_palette(&ctl.palette_items());
            }
            Domain::Patients => {
                let mut ctl = app.patients()?;
                if let Some(id) = focus {
                    ctl.list_mut().select(&id.parse()?)?;
                }
                ctl.palette_event(PaletteEvent::Open);
                ctl.palette_event(PaletteEvent::QueryChanged(query));
                print_palette(&ctl.palette_items());
            }
            Domain::Prescriptions => {
                let mut ctl = app.prescriptions()?;
                if let Some(id) = focus {
                    ctl.list_mut().select(&id)?;
                }
                ctl.palette_event(PaletteEvent::Open);
                ctl.palette_event(PaletteEvent::QueryChanged(query));
                print_palette(&ctl.palette_items());
            }
        },
        Some(Commands::Export { domain, filters }) => {
            let csv = match domain {
                Domain::Consultations => {
                    let mut ctl = app.consultations()?;
                    apply_filters::<_, ConsultationStatus>(ctl.list_mut(), &filters)?;
                    ctl.export_csv()
                }
                Domain::Patients => {
                    let mut ctl = app.patients()?;
                    apply_filters::<_, PatientStatus>(ctl.list_mut(), &filters)?;
                    ctl.export_csv()
                }
                Domain::Prescriptions => {
                    let mut ctl = app.prescriptions()?;
                    apply_filters::<_, PrescriptionStatus>(ctl.list_mut(), &filters)?;
                    ctl.export_csv()
                }
            };
            print!("{}", csv);
        }
        Some(Commands::Reschedule { id, date, time }) => {
            let mut ctl = app.consultations()?;
            ctl.open_reschedule(id)?;
            ctl.set_reschedule(date, time);
            ctl.commit_reschedule()?;
            let c = ctl.list().record(&id)?;
            println!("#{} {} [{}]", c.id, c.when(), c.status.label());
        }
        Some(Commands::Close {
            id,
            diagnosis,
            notes,
            amount,
        }) => {
            let mut ctl = app.consultations()?;
            ctl.open_close(id)?;
            {
                let draft = ctl.close_form_mut().draft_mut();
                draft.diagnosis = diagnosis;
                draft.notes = notes;
                draft.amount = amount;
            }
            ctl.commit_close()?;
            let c = ctl.list().record(&id)?;
            println!(
                "#{} [{}] montant: {}",
                c.id,
                c.status.label(),
                c.amount.as_deref().unwrap_or("-")
            );
        }
        Some(Commands::AddPatient {
            first_name,
            last_name,
            age,
            phone,
            email,
            allergies,
            conditions,
        }) => {
            let mut ctl = app.patients()?;
            ctl.create_form_mut().open_with(NewPatientDraft {
                first_name,
                last_name,
                age,
                phone,
                email,
                allergies,
                conditions,
                ..NewPatientDraft::default()
            });
            let id = ctl.commit_create()?;
            let p = ctl.list().record(&id)?;
            println!("Created patient #{} {} ({})", p.id, p.full_name(), p.initials);
        }
        None => {
            println!("Use 'cabinet --help' for commands");
        }
    }

    Ok(())
}
