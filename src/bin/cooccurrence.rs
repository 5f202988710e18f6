use adolescent_cooccurrence::{
    aggregate, filter_adolescents, header, Config, Encounters, MapTable, Patients,
};
use clap::Parser;
use qu::ick_use::*;
use std::path::PathBuf;

/// Count, per month, how often each adolescent patient had encounters in each code group.
#[derive(Parser)]
struct Opt {
    /// Config file to read paths from (defaults to `cooccurrence.toml` if it exists)
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Patients CSV (`patientid`, `dob`)
    #[clap(long)]
    patients: Option<PathBuf>,
    /// Encounters CSV (`patientid`, `encounterid`, `encounterdate`, `localcode`)
    #[clap(long)]
    encounters: Option<PathBuf>,
    /// Code mapping CSV (`localcode`, `groupcode`)
    #[clap(long)]
    mapping: Option<PathBuf>,
    /// Where to write the result. The extension picks the format (`.csv` or `.json`).
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Print the result table to the terminal as well
    #[clap(long)]
    show: bool,
}

impl Opt {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(path) = &self.patients {
            config.patients = path.clone();
        }
        if let Some(path) = &self.encounters {
            config.encounters = path.clone();
        }
        if let Some(path) = &self.mapping {
            config.mapping = path.clone();
        }
        if let Some(path) = &self.output {
            config.output = path.clone();
        }
        Ok(config)
    }
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = opt.config()?;
    event!(Level::DEBUG, "{:?}", config);

    let patients = Patients::load(&config.patients)?;
    let encounters = Encounters::load(&config.encounters)?;
    let mapping = MapTable::load(&config.mapping)?;

    let adolescent = filter_adolescents(&encounters, &patients)
        .context("while filtering encounters to the adolescent cohort")?;
    let mapped = mapping.map_encounters(&adolescent);
    let table = aggregate(&mapped).sorted();

    header("Summary");
    println!("patients: {}", patients.len());
    println!("encounters: {}", encounters.len());
    println!(
        "adolescent encounters: {} ({} patients)",
        adolescent.len(),
        adolescent.unique_patients().len()
    );
    println!("mapped encounters: {}", mapped.len());
    println!("co-occurrence records: {}", table.len());

    if opt.show {
        header("Co-occurrence");
        println!("{}", table.term_table());
    }

    table.save(&config.output)?;
    Ok(())
}
