pub mod cohort;
pub mod config;
pub mod cooccurrence;
pub mod error;
pub mod mapping;
mod range;
pub mod row;
mod util;

pub use anyhow::{Context, Error};
use chrono::NaiveDate;
use itertools::Either;
use qu::ick_use::*;
use serde::Serialize;
use std::{collections::BTreeMap, iter, ops::Deref, path::Path, slice, sync::Arc};
use term_data_table as tdt;

pub use crate::{
    cohort::{age_at, filter_adolescents, filter_by_age, FilteredEncounters, ADOLESCENT_AGES},
    config::Config,
    cooccurrence::{aggregate, CooccurrenceRecord, CooccurrenceTable, YearMonth},
    error::{DataError, ErrorKind},
    mapping::{MapTable, MappedEncounter},
    range::{AgeBand, AgeBandCounts, AgeBands},
    row::{Row, RowSet},
    util::{format_date, header, parse_date, path_exists, ResultExt},
};
use crate::{
    error::{Dataset, RecordRef},
    util::is_blank,
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
pub type PatientId = ArcStr;

/// A row in the patients dataset.
///
/// The same `patient_id` always identifies the same patient, and is what encounters use to
/// refer back to their patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Patient {
    #[serde(rename = "patientid")]
    patient_id: PatientId,
    dob: NaiveDate,
}

impl Patient {
    /// No validation happens here: use `from_row` for data from outside the program.
    pub fn new(patient_id: impl Into<PatientId>, dob: NaiveDate) -> Self {
        Self {
            patient_id: patient_id.into(),
            dob,
        }
    }

    /// Parse and validate a row with `patientid` and `dob` columns.
    pub fn from_row(row: &Row) -> Result<Self, DataError> {
        let patient_id = row.require("patientid")?;
        if is_blank(patient_id) {
            return Err(DataError::empty_field("patientid", RecordRef::unknown()));
        }
        let patient_id = PatientId::from(patient_id);

        let raw_dob = row
            .get("dob")
            .ok_or_else(|| DataError::missing_column("dob", Some(&patient_id)))?;
        let dob = parse_date(raw_dob).ok_or_else(|| DataError::InvalidDate {
            record: RecordRef::patient(&patient_id),
            raw: raw_dob.into(),
        })?;

        Ok(Self { patient_id, dob })
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn dob(&self) -> NaiveDate {
        self.dob
    }

    /// Age in whole years on `date`.
    pub fn age_at(&self, date: NaiveDate) -> i32 {
        age_at(self.dob, date)
    }
}

/// A row in the encounters dataset.
///
/// Whether the patient exists, and whether they were born by the time of the encounter, is only
/// checked when encounters are filtered against a patient list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Encounter {
    #[serde(rename = "patientid")]
    patient_id: PatientId,
    #[serde(rename = "encounterid")]
    encounter_id: ArcStr,
    #[serde(rename = "encounterdate")]
    date: NaiveDate,
    #[serde(rename = "localcode")]
    local_code: ArcStr,
}

impl Encounter {
    /// No validation happens here: use `from_row` for data from outside the program.
    pub fn new(
        patient_id: impl Into<PatientId>,
        encounter_id: impl Into<ArcStr>,
        date: NaiveDate,
        local_code: impl Into<ArcStr>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            encounter_id: encounter_id.into(),
            date,
            local_code: local_code.into(),
        }
    }

    /// Parse and validate a row with `patientid`, `encounterid`, `encounterdate` and `localcode`
    /// columns.
    ///
    /// All columns are checked for presence before any value is looked at, so a row missing a
    /// column and a row with an empty value report different errors.
    pub fn from_row(row: &Row) -> Result<Self, DataError> {
        let patient_id = row.require("patientid")?;
        let encounter_id = row.require("encounterid")?;
        let raw_date = row.require("encounterdate")?;
        let local_code = row.require("localcode")?;

        if is_blank(patient_id) {
            return Err(DataError::empty_field("patientid", RecordRef::unknown()));
        }
        let patient_id = PatientId::from(patient_id);
        if is_blank(encounter_id) {
            return Err(DataError::empty_field(
                "encounterid",
                RecordRef::patient(&patient_id),
            ));
        }
        let encounter_id = ArcStr::from(encounter_id);
        let record = RecordRef::encounter(&patient_id, &encounter_id);
        if is_blank(raw_date) {
            return Err(DataError::empty_field("encounterdate", record));
        }
        if is_blank(local_code) {
            return Err(DataError::empty_field("localcode", record));
        }

        let date = match parse_date(raw_date) {
            Some(date) => date,
            None => {
                return Err(DataError::InvalidDate {
                    record,
                    raw: raw_date.into(),
                })
            }
        };

        Ok(Self {
            patient_id,
            encounter_id,
            date,
            local_code: local_code.into(),
        })
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn encounter_id(&self) -> &ArcStr {
        &self.encounter_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn local_code(&self) -> &ArcStr {
        &self.local_code
    }

    /// The calendar month the encounter happened in.
    pub fn month(&self) -> YearMonth {
        YearMonth::from(self.date)
    }
}

/// Parse every row, stopping at the first bad one.
fn parse_rows<T>(
    rows: &RowSet,
    dataset: Dataset,
    parse: impl Fn(&Row) -> Result<T, DataError>,
) -> Result<Vec<T>, DataError> {
    if rows.is_empty() {
        return Err(DataError::EmptyDataset { dataset });
    }
    rows.iter().map(parse).collect()
}

/// The parsed list of patients, with a pre-built index for the `patient_id` field.
#[derive(Debug, Clone)]
pub struct Patients {
    els: Arc<Vec<Patient>>,
    id_idx: BTreeMap<PatientId, usize>,
}

impl Patients {
    /// Validate rows into patients.
    ///
    /// Fails if there are no rows, or at the first row that isn't a valid patient.
    pub fn from_rows(rows: &RowSet) -> Result<Self, DataError> {
        Ok(Self::new(parse_rows(rows, Dataset::Patients, Patient::from_row)?))
    }

    /// Load patients from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows = RowSet::from_path(path)?;
        let patients = Self::from_rows(&rows)
            .with_context(|| format!("while loading patients from \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "loaded {} patients from \"{}\"",
            patients.len(),
            path.display()
        );
        Ok(patients)
    }

    /// If an ID appears more than once, the last patient with that ID is returned.
    pub fn find_by_id(&self, id: &str) -> Option<&Patient> {
        let idx = self.id_idx.get(id)?;
        self.els.get(*idx)
    }

    /// To display in the console/terminal.
    pub fn term_table(&self) -> tdt::Table<'static> {
        let header = tdt::Row::new()
            .with_cell(tdt::Cell::from("patient ID"))
            .with_cell(tdt::Cell::from("date of birth"));
        self.iter()
            .fold(tdt::Table::new().with_row(header), |tbl, pat| {
                tbl.with_row(
                    tdt::Row::new()
                        .with_cell(tdt::Cell::from(pat.patient_id.to_string()))
                        .with_cell(tdt::Cell::from(format_date(pat.dob))),
                )
            })
    }

    fn new(els: Vec<Patient>) -> Self {
        let mut this = Patients {
            els: Arc::new(els),
            id_idx: BTreeMap::new(),
        };
        this.rebuild_index();
        this
    }

    fn rebuild_index(&mut self) {
        self.id_idx.clear();
        for (idx, el) in self.els.iter().enumerate() {
            self.id_idx.insert(el.patient_id.clone(), idx);
        }
    }
}

impl Deref for Patients {
    type Target = [Patient];
    fn deref(&self) -> &Self::Target {
        &self.els
    }
}

impl<'a> IntoIterator for &'a Patients {
    type IntoIter = slice::Iter<'a, Patient>;
    type Item = &'a Patient;
    fn into_iter(self) -> Self::IntoIter {
        self.els.iter()
    }
}

impl FromIterator<Patient> for Patients {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Patient>,
    {
        Self::new(iter.into_iter().collect())
    }
}

/// The parsed list of encounters, with a pre-built index for the `patient_id` field.
#[derive(Debug, Clone)]
pub struct Encounters {
    els: Arc<Vec<Encounter>>,
    id_idx: BTreeMap<PatientId, Vec<usize>>,
}

impl Encounters {
    /// Validate rows into encounters.
    ///
    /// Fails if there are no rows, or at the first row that isn't a valid encounter.
    pub fn from_rows(rows: &RowSet) -> Result<Self, DataError> {
        Ok(Self::new(parse_rows(
            rows,
            Dataset::Encounters,
            Encounter::from_row,
        )?))
    }

    /// Load encounters from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows = RowSet::from_path(path)?;
        let encounters = Self::from_rows(&rows)
            .with_context(|| format!("while loading encounters from \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "loaded {} encounters from \"{}\"",
            encounters.len(),
            path.display()
        );
        Ok(encounters)
    }

    /// All encounters for one patient, in input order.
    pub fn for_patient<'a>(
        &'a self,
        patient_id: &str,
    ) -> impl Iterator<Item = &'a Encounter> + Clone + 'a {
        let idxs = match self.id_idx.get(patient_id) {
            Some(idxs) => idxs,
            None => return Either::Left(iter::empty()),
        };
        Either::Right(idxs.iter().filter_map(move |idx| self.els.get(*idx)))
    }

    /// Earliest and latest encounter date, if there are any encounters.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        use itertools::{Itertools, MinMaxResult};
        match self.iter().map(|enc| enc.date).minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(date) => Some((date, date)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    /// To display in the console/terminal.
    pub fn term_table(&self) -> tdt::Table<'static> {
        encounter_table(self.iter())
    }

    fn new(els: Vec<Encounter>) -> Self {
        let mut this = Encounters {
            els: Arc::new(els),
            id_idx: BTreeMap::new(),
        };
        this.rebuild_id_map();
        this
    }

    fn rebuild_id_map(&mut self) {
        self.id_idx.clear();
        for (idx, enc) in self.els.iter().enumerate() {
            self.id_idx
                .entry(enc.patient_id.clone())
                .or_insert_with(Vec::new)
                .push(idx);
        }
    }
}

impl Deref for Encounters {
    type Target = [Encounter];
    fn deref(&self) -> &Self::Target {
        &self.els
    }
}

impl<'a> IntoIterator for &'a Encounters {
    type IntoIter = slice::Iter<'a, Encounter>;
    type Item = &'a Encounter;
    fn into_iter(self) -> Self::IntoIter {
        self.els.iter()
    }
}

impl FromIterator<Encounter> for Encounters {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Encounter>,
    {
        Self::new(iter.into_iter().collect())
    }
}

pub(crate) fn encounter_table<'a>(
    encounters: impl Iterator<Item = &'a Encounter>,
) -> tdt::Table<'static> {
    let header = tdt::Row::new()
        .with_cell(tdt::Cell::from("patient ID"))
        .with_cell(tdt::Cell::from("encounter ID"))
        .with_cell(tdt::Cell::from("date"))
        .with_cell(tdt::Cell::from("local code"));
    encounters.fold(tdt::Table::new().with_row(header), |tbl, enc| {
        tbl.with_row(
            tdt::Row::new()
                .with_cell(tdt::Cell::from(enc.patient_id.to_string()))
                .with_cell(tdt::Cell::from(enc.encounter_id.to_string()))
                .with_cell(tdt::Cell::from(format_date(enc.date)))
                .with_cell(tdt::Cell::from(enc.local_code.to_string())),
        )
    })
}
