//! Restrict encounters to those where the patient was of a given age at the time.
//!
//! The adolescent cohort is everyone aged 10 to 17 (inclusive) on the day of the encounter. Ages
//! are whole years, counted the way people count birthdays: you are a year older on the same
//! month and day as you were born, not after some number of days.
use crate::{
    encounter_table, error::DataError, range::AgeBand, Encounter, Patient, PatientId,
};
use chrono::{Datelike, NaiveDate};
use qu::ick_use::*;
use std::{
    collections::{BTreeSet, HashMap},
    ops::Deref,
    slice, vec,
};
use term_data_table as tdt;

/// Ages 10 to 17.
pub const ADOLESCENT_AGES: AgeBand = AgeBand::new(10, 17);

/// Age in whole years on `date` for someone born on `dob`.
///
/// Negative if `date` is more than a year before `dob`; callers should check the ordering first.
pub fn age_at(dob: NaiveDate, date: NaiveDate) -> i32 {
    let before_birthday = (date.month(), date.day()) < (dob.month(), dob.day());
    date.year() - dob.year() - i32::from(before_birthday)
}

/// Keep encounters where the patient was aged 10 to 17.
///
/// See `filter_by_age`.
pub fn filter_adolescents(
    encounters: &[Encounter],
    patients: &[Patient],
) -> Result<FilteredEncounters, DataError> {
    filter_by_age(encounters, patients, ADOLESCENT_AGES)
}

/// Keep encounters where the patient's age on the day falls within `ages`.
///
/// Every encounter must belong to a patient in `patients`, and must not be dated before that
/// patient's birth. The first encounter that breaks either rule fails the whole call. If a
/// patient ID is listed more than once, the last listing's date of birth is used.
pub fn filter_by_age(
    encounters: &[Encounter],
    patients: &[Patient],
    ages: AgeBand,
) -> Result<FilteredEncounters, DataError> {
    let dobs: HashMap<&str, NaiveDate> = patients
        .iter()
        .map(|pat| (&**pat.patient_id(), pat.dob()))
        .collect();

    let mut kept = Vec::new();
    for enc in encounters {
        let dob = match dobs.get(&**enc.patient_id()) {
            Some(dob) => *dob,
            None => {
                return Err(DataError::UnknownPatient {
                    patient_id: enc.patient_id().clone(),
                })
            }
        };
        if enc.date() < dob {
            return Err(DataError::TemporalInconsistency {
                patient_id: enc.patient_id().clone(),
                encounter_date: enc.date(),
                dob,
            });
        }
        if ages.contains(age_at(dob, enc.date())) {
            kept.push(enc.clone());
        }
    }

    event!(
        Level::DEBUG,
        "kept {} of {} encounters with patients aged {}",
        kept.len(),
        encounters.len(),
        ages
    );
    Ok(FilteredEncounters { encounters: kept })
}

/// The encounters that passed an age filter, in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredEncounters {
    encounters: Vec<Encounter>,
}

impl FilteredEncounters {
    /// Distinct IDs of patients with at least one retained encounter.
    pub fn unique_patients(&self) -> BTreeSet<PatientId> {
        self.encounters
            .iter()
            .map(|enc| enc.patient_id().clone())
            .collect()
    }

    /// Encounter dates, in encounter order (duplicates included).
    pub fn encounter_dates(&self) -> Vec<NaiveDate> {
        self.encounters.iter().map(Encounter::date).collect()
    }

    pub fn into_inner(self) -> Vec<Encounter> {
        self.encounters
    }

    /// To display in the console/terminal.
    pub fn term_table(&self) -> tdt::Table<'static> {
        encounter_table(self.encounters.iter())
    }
}

impl Deref for FilteredEncounters {
    type Target = [Encounter];
    fn deref(&self) -> &Self::Target {
        &self.encounters
    }
}

impl<'a> IntoIterator for &'a FilteredEncounters {
    type IntoIter = slice::Iter<'a, Encounter>;
    type Item = &'a Encounter;
    fn into_iter(self) -> Self::IntoIter {
        self.encounters.iter()
    }
}

impl IntoIterator for FilteredEncounters {
    type IntoIter = vec::IntoIter<Encounter>;
    type Item = Encounter;
    fn into_iter(self) -> Self::IntoIter {
        self.encounters.into_iter()
    }
}
