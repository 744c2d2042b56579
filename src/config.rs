use crate::storage::SectorMap;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// SQLite's default `SQLITE_MAX_COLUMN`, minus the id and designation columns.
pub const MAX_SECTOR_COLUMNS: usize = 2000 - 2;

/// Orbit-model configuration: where the database lives and which sectors
/// the coefficient table allocates columns for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub data_dir: PathBuf,
    pub db_filename: String,
    /// Start time (MJD) of sector 0
    pub standard_mjd_min: i64,
    /// Exclusive end of the sector range
    pub standard_mjd_max: i64,
    pub sector_length_days: i64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".chebystore"),
            db_filename: "cheby.db".to_string(),
            standard_mjd_min: 40000,
            standard_mjd_max: 64000,
            sector_length_days: 32,
        }
    }
}

impl OrbitConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_filename)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sector_length_days <= 0 {
            return Err(Error::Config(format!(
                "sector_length_days must be positive, got {}",
                self.sector_length_days
            )));
        }
        if self.standard_mjd_max <= self.standard_mjd_min {
            return Err(Error::Config(format!(
                "standard_mjd_max ({}) must exceed standard_mjd_min ({})",
                self.standard_mjd_max, self.standard_mjd_min
            )));
        }
        if self.sector_count() > MAX_SECTOR_COLUMNS {
            return Err(Error::Config(format!(
                "{} sectors exceed the {} column limit of object_coefficients",
                self.sector_count(),
                MAX_SECTOR_COLUMNS
            )));
        }
        Ok(())
    }

    /// Number of sectors in the configured range
    pub fn sector_count(&self) -> usize {
        if self.sector_length_days <= 0 || self.standard_mjd_max <= self.standard_mjd_min {
            return 0;
        }
        // i128 holds any i64 span without overflow
        let span = i128::from(self.standard_mjd_max) - i128::from(self.standard_mjd_min);
        let length = i128::from(self.sector_length_days);
        usize::try_from((span + length - 1) / length).unwrap_or(usize::MAX)
    }

    pub fn contains_sector(&self, sector_number: u32) -> bool {
        (sector_number as usize) < self.sector_count()
    }

    /// Start time of `sector_number`, counted from `reference_epoch`.
    /// `None` if the start time does not fit in an i64.
    pub fn sector_start(&self, sector_number: u32, reference_epoch: i64) -> Option<i64> {
        let start = i128::from(reference_epoch)
            + i128::from(sector_number) * i128::from(self.sector_length_days);
        i64::try_from(start).ok()
    }

    /// Map several sector numbers to their start times against the standard epoch.
    /// Input order is preserved.
    pub fn sector_starts(&self, sector_numbers: impl IntoIterator<Item = u32>) -> Result<SectorMap> {
        sector_numbers
            .into_iter()
            .map(|n| {
                self.sector_start(n, self.standard_mjd_min)
                    .map(|start| (n, start))
                    .ok_or_else(|| Error::Validation(format!("start time of sector {} overflows", n)))
            })
            .collect()
    }

    /// The full configured sector range, sector 0 first.
    pub fn required_sectors(&self) -> SectorMap {
        // Every in-range start lies below standard_mjd_max, so none is dropped
        (0..self.sector_count().min(u32::MAX as usize) as u32)
            .filter_map(|n| self.sector_start(n, self.standard_mjd_min).map(|start| (n, start)))
            .collect()
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("chebystore.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<OrbitConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: OrbitConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &OrbitConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        let config = OrbitConfig::default();
        assert_eq!(config.sector_count(), 750);
        let sectors = config.required_sectors();
        assert_eq!(sectors.len(), 750);
        assert_eq!(sectors.get(0), Some(40000));
        assert_eq!(sectors.get(1), Some(40032));
        assert_eq!(sectors.get(749), Some(40000 + 749 * 32));
        assert!(config.contains_sector(749));
        assert!(!config.contains_sector(750));
    }

    #[test]
    fn test_partial_last_sector() {
        let config = OrbitConfig {
            standard_mjd_min: 100,
            standard_mjd_max: 165,
            sector_length_days: 32,
            ..OrbitConfig::default()
        };
        // starts at 100, 132, 164
        assert_eq!(config.sector_count(), 3);
    }

    #[test]
    fn test_sector_starts_preserve_order() {
        let config = OrbitConfig::default();
        let map = config.sector_starts([5, 1, 3]).unwrap();
        let numbers: Vec<u32> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![5, 1, 3]);
        assert_eq!(config.sector_start(2, 0), Some(64));
    }

    #[test]
    fn test_validate() {
        assert!(OrbitConfig::default().validate().is_ok());

        let zero = OrbitConfig { sector_length_days: 0, ..OrbitConfig::default() };
        assert!(matches!(zero.validate(), Err(Error::Config(_))));

        let inverted = OrbitConfig {
            standard_mjd_min: 10,
            standard_mjd_max: 5,
            ..OrbitConfig::default()
        };
        assert!(inverted.validate().is_err());

        let too_wide = OrbitConfig { sector_length_days: 1, ..OrbitConfig::default() };
        assert!(too_wide.validate().is_err());
    }

    #[test]
    fn test_extreme_bounds_do_not_overflow() {
        let config = OrbitConfig {
            standard_mjd_min: i64::MIN,
            standard_mjd_max: i64::MAX,
            sector_length_days: 32,
            ..OrbitConfig::default()
        };
        assert!(config.sector_count() > MAX_SECTOR_COLUMNS);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_sector_start_overflow() {
        let config = OrbitConfig {
            standard_mjd_min: 0,
            standard_mjd_max: 1,
            sector_length_days: i64::MAX,
            ..OrbitConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.sector_start(1, 0), Some(i64::MAX));
        assert_eq!(config.sector_start(2, 0), None);
        assert!(matches!(
            config.sector_starts([0, u32::MAX]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_load_config_with_extreme_bounds() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chebystore.toml");
        std::fs::write(
            &path,
            "standard_mjd_min = -9000000000000000000\nstandard_mjd_max = 9000000000000000000\n",
        )
        .unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_db_path() {
        let config = OrbitConfig {
            data_dir: PathBuf::from("/tmp/orbits"),
            db_filename: "mpc.db".into(),
            ..OrbitConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/orbits/mpc.db"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: OrbitConfig = toml::from_str("sector_length_days = 16\n").unwrap();
        assert_eq!(config.sector_length_days, 16);
        assert_eq!(config.standard_mjd_min, 40000);
        assert_eq!(config.db_filename, "cheby.db");
    }
}
