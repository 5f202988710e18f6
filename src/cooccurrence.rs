//! Monthly counts of group codes per patient.
//!
//! Each mapped encounter lands in the bucket for its calendar month, its patient and its group
//! code. The output has one record per bucket that has anything in it.
use crate::{util, ArcStr, MappedEncounter, PatientId, Result};
use chrono::{Datelike, NaiveDate};
use qu::ick_use::*;
use serde::{Serialize, Serializer};
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt, fs, io,
    ops::Deref,
    path::Path,
    str::FromStr,
};
use term_data_table as tdt;

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // reuse the date parser so the rules for digits and dashes are the same
        let date = util::parse_date(&format!("{}-01", input))
            .ok_or_else(|| format_err!("expected a month as YYYY-MM, found \"{}\"", input))?;
        Ok(Self::from(date))
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(self)
    }
}

/// How many mapped encounters one patient had under one group code in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CooccurrenceRecord {
    pub month: YearMonth,
    #[serde(rename = "patientid")]
    pub patient_id: PatientId,
    #[serde(rename = "groupcode")]
    pub group_code: ArcStr,
    pub count: usize,
}

/// The output of `aggregate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrenceTable {
    records: Vec<CooccurrenceRecord>,
}

impl CooccurrenceTable {
    /// Column names, in output order. These are the same whether or not there are any records.
    pub const COLUMNS: [&'static str; 4] = ["month", "patientid", "groupcode", "count"];

    pub fn columns(&self) -> [&'static str; 4] {
        Self::COLUMNS
    }

    /// Look up the record for one (month, patient, group code) bucket.
    pub fn find(
        &self,
        month: YearMonth,
        patient_id: &str,
        group_code: &str,
    ) -> Option<&CooccurrenceRecord> {
        self.records.iter().find(|rec| {
            rec.month == month && &*rec.patient_id == patient_id && &*rec.group_code == group_code
        })
    }

    /// Sum of all counts, which is the number of mapped encounters that went in.
    pub fn total_count(&self) -> usize {
        self.records.iter().map(|rec| rec.count).sum()
    }

    /// Sort by month, then patient, then group code.
    pub fn sorted(mut self) -> Self {
        self.records.sort_by(|a, b| {
            (a.month, &a.patient_id, &a.group_code).cmp(&(b.month, &b.patient_id, &b.group_code))
        });
        self
    }

    /// Write as CSV. The header line is always written, even with no records.
    pub fn write_csv(&self, out: impl io::Write) -> Result {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(Self::COLUMNS)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// JSON with the column names and an array of records.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct JsonTable<'a> {
            columns: [&'static str; 4],
            records: &'a [CooccurrenceRecord],
        }
        Ok(serde_json::to_string_pretty(&JsonTable {
            columns: Self::COLUMNS,
            records: &self.records,
        })?)
    }

    /// Save to a `.csv` or `.json` file (chosen by extension), creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result {
        fn inner(this: &CooccurrenceTable, path: &Path) -> Result {
            let format = OutputFormat::from_path(path)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("could not create parent")?;
            }
            if util::path_exists(path)? {
                event!(
                    Level::WARN,
                    "overwriting existing file at \"{}\"",
                    path.display()
                );
            }
            let mut out = io::BufWriter::new(fs::File::create(path)?);
            match format {
                OutputFormat::Csv => this.write_csv(out)?,
                OutputFormat::Json => {
                    io::Write::write_all(&mut out, this.to_json()?.as_bytes())?;
                    io::Write::flush(&mut out)?;
                }
            }
            Ok(())
        }
        let path = path.as_ref();
        inner(self, path)
            .with_context(|| format!("unable to save co-occurrence table to \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "wrote {} co-occurrence records to \"{}\"",
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// To display in the console/terminal.
    pub fn term_table(&self) -> tdt::Table<'static> {
        let header = Self::COLUMNS
            .iter()
            .fold(tdt::Row::new(), |row, name| row.with_cell(tdt::Cell::from(*name)));
        self.records
            .iter()
            .fold(tdt::Table::new().with_row(header), |tbl, rec| {
                tbl.with_row(
                    tdt::Row::new()
                        .with_cell(tdt::Cell::from(rec.month.to_string()))
                        .with_cell(tdt::Cell::from(rec.patient_id.to_string()))
                        .with_cell(tdt::Cell::from(rec.group_code.to_string()))
                        .with_cell(tdt::Cell::from(rec.count.to_string())),
                )
            })
    }
}

impl Deref for CooccurrenceTable {
    type Target = [CooccurrenceRecord];
    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl<'a> IntoIterator for &'a CooccurrenceTable {
    type IntoIter = std::slice::Iter<'a, CooccurrenceRecord>;
    type Item = &'a CooccurrenceRecord;
    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("csv") => Ok(OutputFormat::Csv),
            Some("json") => Ok(OutputFormat::Json),
            _ => bail!("filename should end with `.csv` or `.json`"),
        }
    }
}

/// Count mapped encounters by (month, patient, group code).
///
/// Records come out in the order their bucket was first seen. Use `CooccurrenceTable::sorted`
/// for a stable report order.
pub fn aggregate<'a>(mapped: impl IntoIterator<Item = &'a MappedEncounter>) -> CooccurrenceTable {
    let mut index: HashMap<(YearMonth, PatientId, ArcStr), usize> = HashMap::new();
    let mut records: Vec<CooccurrenceRecord> = Vec::new();
    for item in mapped {
        let key = (
            item.encounter.month(),
            item.encounter.patient_id().clone(),
            item.group_code.clone(),
        );
        match index.entry(key) {
            Entry::Occupied(entry) => records[*entry.get()].count += 1,
            Entry::Vacant(entry) => {
                let (month, patient_id, group_code) = entry.key().clone();
                records.push(CooccurrenceRecord {
                    month,
                    patient_id,
                    group_code,
                    count: 1,
                });
                entry.insert(records.len() - 1);
            }
        }
    }
    event!(
        Level::DEBUG,
        "aggregated mapped encounters into {} co-occurrence records",
        records.len()
    );
    CooccurrenceTable { records }
}
