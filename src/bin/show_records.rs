use adolescent_cooccurrence::{
    header, Config, Encounters, MapTable, Patients, ResultExt,
};
use clap::Parser;
use qu::ick_use::*;
use std::path::PathBuf;

/// Check that each input file loads, and print the first few records of each.
///
/// Unlike the main tool this carries on after a file fails to load, so every problem is reported
/// in one go.
#[derive(Parser)]
struct Opt {
    /// Config file to read paths from (defaults to `cooccurrence.toml` if it exists)
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// How many records of each file to print
    #[clap(short, long, default_value_t = 10)]
    limit: usize,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    let mut failed = 0;

    header("Patients");
    match Patients::load(&config.patients).print_error() {
        Ok(patients) => {
            println!("{} patients, showing up to {}", patients.len(), opt.limit);
            let first = patients.iter().take(opt.limit).cloned().collect::<Patients>();
            println!("{}", first.term_table());
        }
        Err(_) => failed += 1,
    }

    header("Encounters");
    match Encounters::load(&config.encounters).print_error() {
        Ok(encounters) => {
            println!("{} encounters, showing up to {}", encounters.len(), opt.limit);
            let first = encounters
                .iter()
                .take(opt.limit)
                .cloned()
                .collect::<Encounters>();
            println!("{}", first.term_table());
        }
        Err(_) => failed += 1,
    }

    header("Code mapping");
    match MapTable::load(&config.mapping).print_error() {
        Ok(mapping) => {
            println!("{} local codes, showing up to {}", mapping.len(), opt.limit);
            let first = mapping
                .iter()
                .take(opt.limit)
                .map(|(local, group)| (local.clone(), group.clone()))
                .collect::<MapTable>();
            println!("{}", first.term_table());
        }
        Err(_) => failed += 1,
    }

    ensure!(failed == 0, "{} of 3 input files could not be loaded", failed);
    Ok(())
}
