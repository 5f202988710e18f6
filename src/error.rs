//! The ways that input data can be rejected.
//!
//! Every check in the pipeline fails fast: the first bad row or record aborts the whole operation
//! with one of these errors, and nothing is returned for the rows that were fine.
use crate::{ArcStr, PatientId};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// A patient or encounter file had a header but no data rows (or nothing at all).
    #[error("input file is empty or contains no {dataset} records")]
    EmptyDataset { dataset: Dataset },

    /// A required column is not in the row.
    #[error("missing required column: '{column}'{}", for_patient(.patient_id))]
    MissingColumn {
        column: &'static str,
        patient_id: Option<PatientId>,
    },

    /// A required field is present but empty (or only whitespace).
    #[error("empty {field} found {record}")]
    EmptyField {
        field: &'static str,
        record: RecordRef,
    },

    /// A date field isn't a `YYYY-MM-DD` calendar date.
    #[error("invalid date format {record}: '{raw}' (expected YYYY-MM-DD)")]
    InvalidDate { record: RecordRef, raw: ArcStr },

    /// An encounter points at a patient we don't know about.
    #[error("encounter patientid '{patient_id}' not found in patient list")]
    UnknownPatient { patient_id: PatientId },

    /// An encounter happened before the patient was born.
    #[error("encounter date {encounter_date} is before birthdate {dob} for patient {patient_id}")]
    TemporalInconsistency {
        patient_id: PatientId,
        encounter_date: NaiveDate,
        dob: NaiveDate,
    },

    /// The code mapping file doesn't have both the `localcode` and `groupcode` columns.
    #[error("mapping file must contain 'localcode' and 'groupcode' (found columns: {found})")]
    InvalidMappingSchema { found: String },
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::EmptyDataset { .. } => ErrorKind::EmptyDataset,
            DataError::MissingColumn { .. } => ErrorKind::MissingColumn,
            DataError::EmptyField { .. } => ErrorKind::EmptyField,
            DataError::InvalidDate { .. } => ErrorKind::InvalidDate,
            DataError::UnknownPatient { .. } => ErrorKind::UnknownPatient,
            DataError::TemporalInconsistency { .. } => ErrorKind::TemporalInconsistency,
            DataError::InvalidMappingSchema { .. } => ErrorKind::InvalidMappingSchema,
        }
    }

    pub(crate) fn missing_column(column: &'static str, patient_id: Option<&PatientId>) -> Self {
        DataError::MissingColumn {
            column,
            patient_id: patient_id.cloned(),
        }
    }

    pub(crate) fn empty_field(field: &'static str, record: RecordRef) -> Self {
        DataError::EmptyField { field, record }
    }
}

/// The category of a `DataError`, without the details.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyDataset,
    MissingColumn,
    EmptyField,
    InvalidDate,
    UnknownPatient,
    TemporalInconsistency,
    InvalidMappingSchema,
}

/// Which dataset an `EmptyDataset` error came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dataset {
    Patients,
    Encounters,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dataset::Patients => f.write_str("patient"),
            Dataset::Encounters => f.write_str("encounter"),
        }
    }
}

/// Whatever we already know about the row that failed, so the message can point at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordRef {
    pub patient_id: Option<PatientId>,
    pub encounter_id: Option<ArcStr>,
}

impl RecordRef {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn patient(patient_id: &PatientId) -> Self {
        Self {
            patient_id: Some(patient_id.clone()),
            encounter_id: None,
        }
    }

    pub fn encounter(patient_id: &PatientId, encounter_id: &ArcStr) -> Self {
        Self {
            patient_id: Some(patient_id.clone()),
            encounter_id: Some(encounter_id.clone()),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.patient_id, &self.encounter_id) {
            (Some(pid), Some(eid)) => write!(f, "for patient {}, encounter {}", pid, eid),
            (Some(pid), None) => write!(f, "for patient {}", pid),
            (None, Some(eid)) => write!(f, "for encounter {}", eid),
            (None, None) => f.write_str("in data row"),
        }
    }
}

fn for_patient(patient_id: &Option<PatientId>) -> String {
    match patient_id {
        Some(id) => format!(" for patient {}", id),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_column_names_patient_when_known() {
        let id: PatientId = "P001".into();
        let err = DataError::missing_column("dob", Some(&id));
        assert_eq!(
            err.to_string(),
            "missing required column: 'dob' for patient P001"
        );
        let err = DataError::missing_column("patientid", None);
        assert_eq!(err.to_string(), "missing required column: 'patientid'");
    }

    #[test]
    fn empty_field_messages() {
        let err = DataError::empty_field("patientid", RecordRef::unknown());
        assert_eq!(err.to_string(), "empty patientid found in data row");

        let pid: PatientId = "P001".into();
        let eid: ArcStr = "E001".into();
        let err = DataError::empty_field("localcode", RecordRef::encounter(&pid, &eid));
        assert_eq!(
            err.to_string(),
            "empty localcode found for patient P001, encounter E001"
        );
        assert_eq!(err.kind(), ErrorKind::EmptyField);
    }

    #[test]
    fn temporal_inconsistency_names_both_dates() {
        let err = DataError::TemporalInconsistency {
            patient_id: "P001".into(),
            encounter_date: NaiveDate::from_ymd_opt(2008, 1, 1).unwrap(),
            dob: NaiveDate::from_ymd_opt(2010, 5, 1).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2008-01-01 is before birthdate 2010-05-01"));
        assert!(msg.contains("P001"));
    }

    #[test]
    fn empty_dataset_names_the_dataset() {
        let err = DataError::EmptyDataset {
            dataset: Dataset::Encounters,
        };
        assert_eq!(
            err.to_string(),
            "input file is empty or contains no encounter records"
        );
    }
}
