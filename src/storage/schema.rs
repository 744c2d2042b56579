//! Database schema definitions
//!
//! The designation and spatial tables are fixed. The coefficient table has
//! one blob column per configured sector, so its DDL is generated from an
//! [`OrbitConfig`] through [`CoefficientTable`].

use crate::config::OrbitConfig;
use crate::{Error, Result};
use std::collections::HashSet;

/// SQL to create the designation table
pub const CREATE_DESIGNATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS object_desig (
    object_id INTEGER PRIMARY KEY,
    designation TEXT UNIQUE
)
"#;

/// Lookup accelerator on designation. Redundant with the UNIQUE constraint's
/// implicit index.
pub const CREATE_DESIGNATION_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS index_desig ON object_desig(designation)",
];

/// SQL to create the (time, sky_cell) table
pub const CREATE_SPATIAL_INDEX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS objects_by_time_cell (
    id INTEGER PRIMARY KEY,
    time INTEGER NOT NULL,
    sky_cell INTEGER NOT NULL,
    object_id INTEGER NOT NULL
)
"#;

pub const CREATE_SPATIAL_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS index_time_cell ON objects_by_time_cell(time, sky_cell)",
    "CREATE INDEX IF NOT EXISTS index_object_id ON objects_by_time_cell(object_id)",
];

/// Ordered sector-number -> sector-start-time mapping.
///
/// Order is whatever the producer supplied; generated column names line up
/// positionally with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorMap(Vec<(u32, i64)>);

impl SectorMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, sector_number: u32, start_time: i64) {
        self.0.push((sector_number, start_time));
    }

    pub fn get(&self, sector_number: u32) -> Option<i64> {
        self.0
            .iter()
            .find(|(n, _)| *n == sector_number)
            .map(|(_, start)| *start)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, i64)> for SectorMap {
    fn from_iter<I: IntoIterator<Item = (u32, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Column name for one sector
pub fn sector_field_name(sector_number: u32, start_time: i64) -> String {
    format!("sector_{}_{}", sector_number, start_time)
}

/// Column names for every entry of `sectors`, in order
pub fn sector_field_names(sectors: &SectorMap) -> Vec<String> {
    sectors
        .iter()
        .map(|(n, start)| sector_field_name(n, start))
        .collect()
}

/// Which sectors a coefficient query should return
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SectorSelection {
    #[default]
    All,
    Sectors(Vec<u32>),
}

impl SectorSelection {
    /// Resolve to start times, rejecting out-of-range, duplicate or empty selections
    pub fn resolve(&self, config: &OrbitConfig) -> Result<SectorMap> {
        let numbers = match self {
            SectorSelection::All => return Ok(config.required_sectors()),
            SectorSelection::Sectors(numbers) => numbers,
        };

        if numbers.is_empty() {
            return Err(Error::Validation("empty sector selection".to_string()));
        }

        let mut seen = HashSet::new();
        for &n in numbers {
            if !config.contains_sector(n) {
                return Err(Error::Validation(format!(
                    "sector {} is outside the configured range 0..{}",
                    n,
                    config.sector_count()
                )));
            }
            if !seen.insert(n) {
                return Err(Error::Validation(format!("sector {} selected twice", n)));
            }
        }

        config.sector_starts(numbers.iter().copied())
    }
}

impl From<u32> for SectorSelection {
    fn from(sector_number: u32) -> Self {
        SectorSelection::Sectors(vec![sector_number])
    }
}

impl From<Vec<u32>> for SectorSelection {
    fn from(sector_numbers: Vec<u32>) -> Self {
        SectorSelection::Sectors(sector_numbers)
    }
}

impl From<&[u32]> for SectorSelection {
    fn from(sector_numbers: &[u32]) -> Self {
        SectorSelection::Sectors(sector_numbers.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for SectorSelection {
    fn from(sector_numbers: [u32; N]) -> Self {
        SectorSelection::Sectors(sector_numbers.to_vec())
    }
}

/// Descriptor for `object_coefficients`: the column layout the configuration
/// asks for, and the layout the database file actually has.
///
/// Built once per store. A table created under a different sector range is
/// not migrated; columns missing from it surface as [`Error::StaleSchema`].
#[derive(Debug, Clone)]
pub struct CoefficientTable {
    columns: Vec<String>,
    physical: HashSet<String>,
}

impl CoefficientTable {
    pub const NAME: &'static str = "object_coefficients";

    pub fn from_config(config: &OrbitConfig) -> Self {
        let columns = sector_field_names(&config.required_sectors());
        let physical = columns.iter().cloned().collect();
        Self { columns, physical }
    }

    /// Replace the assumed physical layout with the one read from the database
    pub fn with_physical_columns(mut self, columns: impl IntoIterator<Item = String>) -> Self {
        self.physical = columns
            .into_iter()
            .filter(|c| c.starts_with("sector_"))
            .collect();
        self
    }

    pub fn create_sql(&self) -> String {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY,\n    designation TEXT UNIQUE",
            Self::NAME
        );
        for column in &self.columns {
            sql.push_str(",\n    ");
            sql.push_str(column);
            sql.push_str(" BLOB");
        }
        sql.push_str("\n)");
        sql
    }

    /// Configured sector columns, sector 0 first
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.physical.contains(name)
    }

    /// Sector columns present in the database file, in configured order
    pub fn physical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| self.physical.contains(c.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Configured columns the database file lacks
    pub fn missing_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !self.physical.contains(c.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Returns `Err(StaleSchema)` for the first name the physical table lacks
    pub fn require_columns<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Result<()> {
        for name in names {
            if !self.has_column(name) {
                return Err(Error::StaleSchema(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> OrbitConfig {
        OrbitConfig {
            standard_mjd_min: 59000,
            standard_mjd_max: 59128,
            sector_length_days: 32,
            ..OrbitConfig::default()
        }
    }

    #[test]
    fn test_field_names_preserve_order() {
        let map: SectorMap = [(3, 300), (0, 0), (7, 700)].into_iter().collect();
        assert_eq!(
            sector_field_names(&map),
            vec!["sector_3_300", "sector_0_0", "sector_7_700"]
        );
    }

    #[test]
    fn test_default_field_names_cover_config() {
        let config = small_config();
        let names = sector_field_names(&config.required_sectors());
        assert_eq!(
            names,
            vec!["sector_0_59000", "sector_1_59032", "sector_2_59064", "sector_3_59096"]
        );
    }

    #[test]
    fn test_selection_resolve() {
        let config = small_config();
        assert_eq!(SectorSelection::All.resolve(&config).unwrap().len(), 4);

        let single = SectorSelection::from(2u32).resolve(&config).unwrap();
        assert_eq!(single.get(2), Some(59064));

        let many = SectorSelection::from(vec![3u32, 1]).resolve(&config).unwrap();
        assert_eq!(sector_field_names(&many), vec!["sector_3_59096", "sector_1_59032"]);
    }

    #[test]
    fn test_selection_rejects_malformed() {
        let config = small_config();
        assert!(matches!(
            SectorSelection::from(4u32).resolve(&config),
            Err(Error::Validation(_))
        ));
        assert!(SectorSelection::from(Vec::<u32>::new()).resolve(&config).is_err());
        assert!(SectorSelection::from([1u32, 1]).resolve(&config).is_err());
    }

    #[test]
    fn test_create_sql() {
        let table = CoefficientTable::from_config(&small_config());
        let sql = table.create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS object_coefficients"));
        assert!(sql.contains("designation TEXT UNIQUE"));
        assert!(sql.contains("sector_0_59000 BLOB"));
        assert!(sql.contains("sector_3_59096 BLOB"));
        assert_eq!(sql.matches(" BLOB").count(), 4);
    }

    #[test]
    fn test_physical_layout_tracking() {
        let table = CoefficientTable::from_config(&small_config()).with_physical_columns(vec![
            "id".to_string(),
            "designation".to_string(),
            "sector_0_59000".to_string(),
            "sector_1_59032".to_string(),
        ]);
        assert!(table.has_column("sector_1_59032"));
        assert!(!table.has_column("designation"));
        assert_eq!(table.missing_columns(), vec!["sector_2_59064", "sector_3_59096"]);
        assert_eq!(table.physical_columns(), vec!["sector_0_59000", "sector_1_59032"]);

        let stale = vec!["sector_3_59096".to_string()];
        assert!(matches!(table.require_columns(&stale), Err(Error::StaleSchema(_))));
    }
}
