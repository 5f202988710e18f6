//! Raw tabular rows, before any validation.
//!
//! The loaders only know how to turn a CSV file into a list of column name to raw string
//! mappings. Working out whether those strings make a valid `Patient`, `Encounter` or mapping
//! entry happens elsewhere.
use crate::{error::DataError, ArcStr, Result};
use qu::ick_use::*;
use std::{fs, io, path::Path, slice, sync::Arc};

/// One data row, keyed by the header of the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    headers: Arc<[ArcStr]>,
    values: Vec<ArcStr>,
}

impl Row {
    /// The raw value in `column`, or `None` if the file doesn't have that column.
    ///
    /// A record shorter than the header reads as empty strings for the missing trailing fields:
    /// the column exists, it just has nothing in it.
    pub fn get(&self, column: &str) -> Option<&str> {
        // later columns shadow earlier ones with the same name
        let idx = self.headers.iter().rposition(|h| &**h == column)?;
        Some(self.values.get(idx).map(|v| &**v).unwrap_or(""))
    }

    /// Like `get`, but a missing column is an error.
    pub fn require(&self, column: &'static str) -> Result<&str, DataError> {
        self.get(column)
            .ok_or_else(|| DataError::missing_column(column, None))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.headers.iter().map(|h| &**h)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<ArcStr>,
    V: Into<ArcStr>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let (headers, values): (Vec<ArcStr>, Vec<ArcStr>) = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Row {
            headers: headers.into(),
            values,
        }
    }
}

/// All the rows of a file, plus its header.
///
/// The header is kept separately so that a file with no data rows still tells us which columns
/// it has.
#[derive(Debug, Clone)]
pub struct RowSet {
    headers: Arc<[ArcStr]>,
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(headers: impl IntoIterator<Item = impl Into<ArcStr>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::<ArcStr>::into).collect(),
            rows: vec![],
        }
    }

    /// Add a row. Values are matched to the header by position.
    pub fn push(&mut self, values: impl IntoIterator<Item = impl Into<ArcStr>>) {
        self.rows.push(Row {
            headers: self.headers.clone(),
            values: values.into_iter().map(Into::into).collect(),
        });
    }

    /// Builder version of `push`.
    pub fn with_row(mut self, values: impl IntoIterator<Item = impl Into<ArcStr>>) -> Self {
        self.push(values);
        self
    }

    /// Read CSV with a header line.
    ///
    /// Header names are trimmed, field values are kept exactly as written. Blank lines are
    /// skipped.
    pub fn from_reader(reader: impl io::Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers: Arc<[ArcStr]> = reader.headers()?.iter().map(ArcStr::from).collect();
        let rows = reader
            .records()
            .map(|record| {
                let record = record?;
                Ok(Row {
                    headers: headers.clone(),
                    values: record.iter().map(ArcStr::from).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { headers, rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<RowSet> {
            let file = io::BufReader::new(fs::File::open(path)?);
            RowSet::from_reader(file)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("reading rows from \"{}\"", path.display()))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> + '_ {
        self.headers.iter().map(|h| &**h)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| &**h == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type IntoIter = slice::Iter<'a, Row>;
    type Item = &'a Row;
    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn reads_header_and_rows() {
        let rows = RowSet::from_reader("patientid, dob\nP001,2010-05-01\nP002,2008-12-15\n".as_bytes())
            .unwrap();
        assert_eq!(rows.headers().collect::<Vec<_>>(), ["patientid", "dob"]);
        assert_eq!(rows.len(), 2);
        let first = rows.iter().next().unwrap();
        assert_eq!(first.get("patientid"), Some("P001"));
        assert_eq!(first.get("dob"), Some("2010-05-01"));
    }

    #[test]
    fn header_only_has_no_rows() {
        let rows = RowSet::from_reader("localcode,groupcode\n".as_bytes()).unwrap();
        assert!(rows.is_empty());
        assert!(rows.has_column("groupcode"));

        let rows = RowSet::from_reader("".as_bytes()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(rows.headers().count(), 0);
    }

    #[test]
    fn missing_column_versus_empty_value() {
        let rows = RowSet::from_reader("patientid,dob\nP001\n".as_bytes()).unwrap();
        let row = rows.iter().next().unwrap();
        // short record: the column is there, the value is empty
        assert_eq!(row.get("dob"), Some(""));
        assert_eq!(row.get("encounterid"), None);
        let err = row.require("encounterid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingColumn);
    }

    #[test]
    fn values_are_not_trimmed() {
        let rows = RowSet::from_reader("patientid,dob\n  ,2010-05-01\n".as_bytes()).unwrap();
        assert_eq!(rows.iter().next().unwrap().get("patientid"), Some("  "));
    }

    #[test]
    fn built_rows_match_header_by_position() {
        use crate::{Encounters, Patients};

        let rows = RowSet::new(["dob", "patientid"])
            .with_row(["2010-05-01", "P001"])
            .with_row(["2008-12-15", "P002"]);
        let patients = Patients::from_rows(&rows).unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(&**patients[1].patient_id(), "P002");
        assert_eq!(
            patients[0].dob(),
            chrono::NaiveDate::from_ymd_opt(2010, 5, 1).unwrap()
        );

        let mut rows = RowSet::new(["patientid", "encounterid", "encounterdate", "localcode"])
            .with_row(["P001", "E001", "2023-06-01", "L100"]);
        assert_eq!(Encounters::from_rows(&rows).unwrap().len(), 1);

        // no localcode value, but the column is there
        rows.push(["P001", "E002", "2023-06-02"]);
        let err = Encounters::from_rows(&rows).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyField);
        assert_eq!(
            err.to_string(),
            "empty localcode found for patient P001, encounter E002"
        );
    }

    #[test]
    fn row_from_pairs() {
        let row: Row = [("localcode", "L001"), ("groupcode", "G1")]
            .into_iter()
            .collect();
        assert_eq!(row.get("groupcode"), Some("G1"));
        assert_eq!(row.columns().collect::<Vec<_>>(), ["localcode", "groupcode"]);
    }
}
