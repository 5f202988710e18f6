use adolescent_cooccurrence::{
    aggregate, filter_adolescents, DataError, Encounters, ErrorKind, MapTable, Patients, RowSet,
    YearMonth,
};
use std::{fs, path::Path};

const PATIENTS: &str = "\
patientid,dob
P001,2010-05-01
P002,2008-12-15
P003,1980-01-01
";

const ENCOUNTERS: &str = "\
patientid,encounterid,encounterdate,localcode
P001,E001,2023-06-01,L100
P001,E002,2023-06-15,L100
P002,E003,2023-06-20,L200
P003,E004,2023-06-21,L100
P001,E005,2023-07-02,L300
P002,E006,2023-07-03,L999
";

const MAPPING: &str = "\
localcode,groupcode
L100,G1
L200,G2
L300,G1
";

fn rows(csv: &str) -> RowSet {
    RowSet::from_reader(csv.as_bytes()).unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn in_memory_pipeline() {
    let patients = Patients::from_rows(&rows(PATIENTS)).unwrap();
    let encounters = Encounters::from_rows(&rows(ENCOUNTERS)).unwrap();
    let mapping = MapTable::from_rows(&rows(MAPPING)).unwrap();

    let adolescent = filter_adolescents(&encounters, &patients).unwrap();
    // P003 is an adult
    assert_eq!(adolescent.len(), 5);

    let mapped = mapping.map_encounters(&adolescent);
    // L999 has no group
    assert_eq!(mapped.len(), 4);

    let table = aggregate(&mapped).sorted();
    let june: YearMonth = "2023-06".parse().unwrap();
    let july: YearMonth = "2023-07".parse().unwrap();
    let rows = table
        .iter()
        .map(|rec| {
            (
                rec.month,
                rec.patient_id.to_string(),
                rec.group_code.to_string(),
                rec.count,
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        [
            (june, "P001".into(), "G1".into(), 2),
            (june, "P002".into(), "G2".into(), 1),
            (july, "P001".into(), "G1".into(), 1),
        ]
    );
    assert_eq!(table.total_count(), mapped.len());
}

#[test]
fn nothing_in_range_gives_header_only_output() {
    let patients = Patients::from_rows(&rows("patientid,dob\nP001,1970-01-01\n")).unwrap();
    let encounters = Encounters::from_rows(&rows(
        "patientid,encounterid,encounterdate,localcode\nP001,E001,2023-06-01,L100\n",
    ))
    .unwrap();
    let mapping = MapTable::from_rows(&rows(MAPPING)).unwrap();

    let adolescent = filter_adolescents(&encounters, &patients).unwrap();
    let table = aggregate(&mapping.map_encounters(&adolescent));
    assert!(table.is_empty());

    let mut out = Vec::new();
    table.write_csv(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "month,patientid,groupcode,count\n");
}

#[test]
fn files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let patients = Patients::load(write(dir.path(), "patients.csv", PATIENTS)).unwrap();
    let encounters = Encounters::load(write(dir.path(), "encounters.csv", ENCOUNTERS)).unwrap();
    let mapping = MapTable::load(write(dir.path(), "mapping.csv", MAPPING)).unwrap();

    let adolescent = filter_adolescents(&encounters, &patients).unwrap();
    let table = aggregate(&mapping.map_encounters(&adolescent)).sorted();

    let output = dir.path().join("output").join("cooccurrence.csv");
    table.save(&output).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "month,patientid,groupcode,count\n\
         2023-06,P001,G1,2\n\
         2023-06,P002,G2,1\n\
         2023-07,P001,G1,1\n"
    );

    let json = dir.path().join("cooccurrence.json");
    table.save(&json).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["records"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["records"][0]["month"], "2023-06");

    assert!(table.save(dir.path().join("cooccurrence.txt")).is_err());
}

#[test]
fn data_errors_survive_file_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "patients.csv", "patientid,dob\nP001,01/05/2010\n");
    let err = Patients::load(&path).unwrap_err();
    // the file name is in the message chain, the typed error is still there underneath
    assert!(format!("{:#}", err).contains("patients.csv"));
    let data_err = err.downcast_ref::<DataError>().unwrap();
    assert_eq!(data_err.kind(), ErrorKind::InvalidDate);

    let path = write(dir.path(), "mapping.csv", "wrongcol,anothercol\nA,B\n");
    let err = MapTable::load(&path).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DataError>().map(DataError::kind),
        Some(ErrorKind::InvalidMappingSchema)
    );

    let path = write(dir.path(), "encounters.csv", "");
    let err = Encounters::load(&path).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DataError>().map(DataError::kind),
        Some(ErrorKind::EmptyDataset)
    );
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Patients::load(dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{:#}", err).contains("nope.csv"));
    assert!(err.downcast_ref::<DataError>().is_none());
}

#[test]
fn cohort_errors() {
    let patients = Patients::from_rows(&rows(PATIENTS)).unwrap();

    let encounters = Encounters::from_rows(&rows(
        "patientid,encounterid,encounterdate,localcode\nP999,E001,2023-06-01,L100\n",
    ))
    .unwrap();
    let err = filter_adolescents(&encounters, &patients).unwrap_err();
    assert_eq!(
        err,
        DataError::UnknownPatient {
            patient_id: "P999".into()
        }
    );

    let encounters = Encounters::from_rows(&rows(
        "patientid,encounterid,encounterdate,localcode\nP001,E001,2009-01-01,L100\n",
    ))
    .unwrap();
    let err = filter_adolescents(&encounters, &patients).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TemporalInconsistency);
}
