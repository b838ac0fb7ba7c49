//! Initial records for the three domain stores.
//!
//! Seed data is YAML with one top-level list per domain. Missing lists are empty. The
//! bundled demo set is pinned around 20 Feb 2026 (see [`crate::CoreConfig::demo`]).

use crate::domains::consultations::Consultation;
use crate::domains::patients::Patient;
use crate::domains::prescriptions::Prescription;
use crate::error::{CabinetError, CabinetResult};
use crate::store::{InsertPosition, RecordStore};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEMO_SEED: &str = include_str!("../seed/demo.yaml");

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub consultations: Vec<Consultation>,
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
}

impl Seed {
    pub fn consultation_store(&self) -> CabinetResult<RecordStore<Consultation>> {
        RecordStore::with_records(self.consultations.clone(), InsertPosition::Front)
    }

    pub fn patient_store(&self) -> CabinetResult<RecordStore<Patient>> {
        RecordStore::with_records(self.patients.clone(), InsertPosition::Front)
    }

    pub fn prescription_store(&self) -> CabinetResult<RecordStore<Prescription>> {
        RecordStore::with_records(self.prescriptions.clone(), InsertPosition::Front)
    }
}

/// Parses seed YAML.
pub fn parse_seed(yaml: &str) -> CabinetResult<Seed> {
    serde_yaml::from_str(yaml).map_err(CabinetError::SeedParse)
}

/// The bundled demo data.
pub fn demo_seed() -> CabinetResult<Seed> {
    parse_seed(DEMO_SEED)
}

/// Loads seed data from a YAML file.
pub fn load_seed_yaml(path: &Path) -> CabinetResult<Seed> {
    let contents = fs::read_to_string(path).map_err(CabinetError::SeedRead)?;
    let seed = parse_seed(&contents)?;
    tracing::info!(
        "loaded seed {}: {} consultations, {} patients, {} prescriptions",
        path.display(),
        seed.consultations.len(),
        seed.patients.len(),
        seed.prescriptions.len()
    );
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::consultations::ConsultationStatus;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn demo_seed_builds_every_store() {
        let seed = demo_seed().expect("demo seed parses");
        assert_eq!(seed.consultation_store().expect("consultations").len(), 7);
        assert_eq!(seed.patient_store().expect("patients").len(), 6);
        assert_eq!(seed.prescription_store().expect("prescriptions").len(), 4);

        let first = &seed.consultations[0];
        assert_eq!(first.status, ConsultationStatus::Scheduled);
        assert_eq!(crate::dates::format_time(first.time), "09:00");
        assert_eq!(first.duration_minutes, 30);
    }

    #[test]
    fn loads_partial_seed_from_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "patients:\n  - id: 9\n    first_name: Jean\n    last_name: Dupont\n    status: new"
        )
        .expect("write seed");

        let seed = load_seed_yaml(file.path()).expect("load");
        assert!(seed.consultations.is_empty());
        assert_eq!(seed.patients.len(), 1);
        assert_eq!(seed.patients[0].first_name, "Jean");
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_seed_yaml(&dir.path().join("absent.yaml")).expect_err("missing");
        assert!(matches!(err, CabinetError::SeedRead(_)));

        let err = parse_seed("consultations: [{ id: one }]").expect_err("malformed");
        assert!(matches!(err, CabinetError::SeedParse(_)));
    }

    #[test]
    fn duplicate_ids_are_rejected_when_building_stores() {
        let seed = parse_seed(
            "patients:\n  - {id: 1, first_name: A, last_name: B, status: active}\n  - {id: 1, first_name: C, last_name: D, status: active}\n",
        )
        .expect("parses");
        assert!(matches!(seed.patient_store(), Err(CabinetError::DuplicateId(_))));
    }
}
