use adolescent_cooccurrence::{
    filter_adolescents, format_date, header, AgeBand, AgeBands, Config, Encounters, Patients,
};
use clap::Parser;
use qu::ick_use::*;
use std::{collections::HashMap, path::PathBuf};
use term_data_table::{Cell, Row, Table};

/// Describe the patient and encounter files, and the adolescent cohort they give.
#[derive(Parser)]
struct Opt {
    /// Config file to read paths from (defaults to `cooccurrence.toml` if it exists)
    #[clap(short, long)]
    config: Option<PathBuf>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    let patients = Patients::load(&config.patients)?;
    let encounters = Encounters::load(&config.encounters)?;

    header("Data stats");
    println!("total patients: {}", patients.len());
    println!("total encounters: {}", encounters.len());
    if let Some((first, last)) = encounters.date_range() {
        println!("earliest encounter date: {}", format_date(first));
        println!("latest encounter date: {}", format_date(last));
    }

    header("Age at encounter");
    let dobs = patients
        .iter()
        .map(|pat| (&**pat.patient_id(), pat))
        .collect::<HashMap<_, _>>();
    let ages = encounters
        .iter()
        .filter_map(|enc| Some(dobs.get(&**enc.patient_id())?.age_at(enc.date())));
    let age_bands = AgeBands::new(vec![
        AgeBand::new(0, 9),
        AgeBand::new(10, 17),
        AgeBand::new(18, 34),
        AgeBand::new(35, 64),
        AgeBand::at_least(65),
    ]);
    let counts = age_bands.bucket(ages);
    let total = counts.total();
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Age range"))
            .with_cell(Cell::from("Count"))
            .with_cell(Cell::from("Percentage")),
    );
    for (band, count) in counts
        .iter()
        .map(|(band, count)| (band.to_string(), count))
        .chain([("other".to_string(), counts.outside())])
    {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(band))
                .with_cell(Cell::from(count.to_string()))
                .with_cell(Cell::from(percent(count, total))),
        );
    }
    println!("{}", table);
    let unknown = encounters.len() - total;
    if unknown > 0 {
        println!("{} encounters belong to patients not in the patient list", unknown);
    }

    header("Adolescent cohort");
    let adolescent = filter_adolescents(&encounters, &patients)?;
    println!(
        "encounters with patients aged {}: {}",
        adolescent_cooccurrence::ADOLESCENT_AGES,
        adolescent.len()
    );
    println!("patients: {}", adolescent.unique_patients().len());
    let dates = adolescent.encounter_dates();
    if let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) {
        println!(
            "encounter dates: {} to {}",
            format_date(*first),
            format_date(*last)
        );
    }
    Ok(())
}

fn percent(count: usize, total: usize) -> String {
    if total == 0 {
        return "-".into();
    }
    format!("{:.1}%", count as f64 / total as f64 * 100.)
}
