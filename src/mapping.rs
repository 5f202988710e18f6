//! Map site-specific local codes to group codes.
//!
//! The mapping comes from a two column file (`localcode`, `groupcode`). Several local codes can
//! share a group code. If a local code is listed more than once the last listing wins, and
//! encounters whose local code isn't listed are dropped without complaint.
use crate::{error::DataError, ArcStr, Encounter, Result, RowSet};
use itertools::Itertools;
use qu::ick_use::*;
use std::{
    collections::{btree_map, BTreeMap},
    path::Path,
};
use term_data_table as tdt;

/// A lookup from local code to group code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapTable {
    mapping: BTreeMap<ArcStr, ArcStr>,
}

impl MapTable {
    /// Build the table from rows with `localcode` and `groupcode` columns.
    ///
    /// The columns are checked before any row is read. No rows at all is fine, and gives an
    /// empty table.
    pub fn from_rows(rows: &RowSet) -> Result<Self, DataError> {
        if !(rows.has_column("localcode") && rows.has_column("groupcode")) {
            return Err(DataError::InvalidMappingSchema {
                found: rows.headers().join(", "),
            });
        }
        let mut mapping = BTreeMap::new();
        for row in rows {
            let local_code = row.require("localcode")?;
            let group_code = row.require("groupcode")?;
            if let Some(old) = mapping.insert(ArcStr::from(local_code), ArcStr::from(group_code)) {
                event!(
                    Level::DEBUG,
                    "local code \"{}\" remapped from \"{}\" to \"{}\"",
                    local_code,
                    old,
                    group_code
                );
            }
        }
        Ok(Self { mapping })
    }

    /// Load the table from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows = RowSet::from_path(path)?;
        let table = Self::from_rows(&rows)
            .with_context(|| format!("while loading code mapping from \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "loaded {} local code mappings from \"{}\"",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// The group code for a local code, if there is one.
    pub fn get(&self, local_code: &str) -> Option<&ArcStr> {
        self.mapping.get(local_code)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// `(local code, group code)` pairs, ordered by local code.
    pub fn iter(&self) -> btree_map::Iter<'_, ArcStr, ArcStr> {
        self.mapping.iter()
    }

    /// Pair each encounter with its group code.
    ///
    /// Encounters whose local code has no (or an empty) group code are left out. Order is
    /// preserved.
    pub fn map_encounters(&self, encounters: &[Encounter]) -> Vec<MappedEncounter> {
        let mapped = encounters
            .iter()
            .filter_map(|enc| {
                let group_code = self.get(enc.local_code())?;
                if group_code.is_empty() {
                    return None;
                }
                Some(MappedEncounter::new(enc.clone(), group_code.clone()))
            })
            .collect::<Vec<_>>();
        event!(
            Level::DEBUG,
            "mapped {} of {} encounters to group codes",
            mapped.len(),
            encounters.len()
        );
        mapped
    }

    /// To display in the console/terminal.
    pub fn term_table(&self) -> tdt::Table<'static> {
        let header = tdt::Row::new()
            .with_cell(tdt::Cell::from("local code"))
            .with_cell(tdt::Cell::from("group code"));
        self.iter()
            .fold(tdt::Table::new().with_row(header), |tbl, (local, group)| {
                tbl.with_row(
                    tdt::Row::new()
                        .with_cell(tdt::Cell::from(local.to_string()))
                        .with_cell(tdt::Cell::from(group.to_string())),
                )
            })
    }
}

/// Later pairs overwrite earlier ones with the same local code.
impl<K, V> FromIterator<(K, V)> for MapTable
where
    K: Into<ArcStr>,
    V: Into<ArcStr>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        Self {
            mapping: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// An encounter together with the group code its local code maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedEncounter {
    pub encounter: Encounter,
    pub group_code: ArcStr,
}

impl MappedEncounter {
    pub fn new(encounter: Encounter, group_code: impl Into<ArcStr>) -> Self {
        Self {
            encounter,
            group_code: group_code.into(),
        }
    }
}

impl<G: Into<ArcStr>> From<(Encounter, G)> for MappedEncounter {
    fn from((encounter, group_code): (Encounter, G)) -> Self {
        Self::new(encounter, group_code)
    }
}
