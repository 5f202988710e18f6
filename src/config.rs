//! Where the input files are and where the output goes.
//!
//! Only locations are configurable. What counts as a valid record, and the age range of the
//! cohort, are fixed.
use crate::{path_exists, Result};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Run configuration, usually read from `cooccurrence.toml`.
///
/// ```toml
/// patients = "data/patients.csv"
/// encounters = "data/encounters.csv"
/// mapping = "data/mapping.csv"
/// output = "data/output/cooccurrence.csv"
/// ```
///
/// Any key left out takes the value shown above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// CSV with `patientid` and `dob` columns.
    pub patients: PathBuf,
    /// CSV with `patientid`, `encounterid`, `encounterdate` and `localcode` columns.
    pub encounters: PathBuf,
    /// CSV with `localcode` and `groupcode` columns.
    pub mapping: PathBuf,
    /// Where to write the co-occurrence table (`.csv` or `.json`).
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patients: "data/patients.csv".into(),
            encounters: "data/encounters.csv".into(),
            mapping: "data/mapping.csv".into(),
            output: "data/output/cooccurrence.csv".into(),
        }
    }
}

impl Config {
    /// Looked for in the working directory when no config file is given.
    pub const DEFAULT_PATH: &'static str = "cooccurrence.toml";

    /// Load configuration from a toml file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Config> {
            let text = fs::read_to_string(path)?;
            Config::from_toml(&text)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading config from \"{}\"", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(Error::from)
    }

    /// Load `path` if given (it must exist), otherwise `cooccurrence.toml` if it exists,
    /// otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Path::new(Self::DEFAULT_PATH);
        if path_exists(default_path)? {
            Self::load(default_path)
        } else {
            event!(
                Level::DEBUG,
                "no config file at \"{}\", using defaults",
                default_path.display()
            );
            Ok(Self::default())
        }
    }
}
