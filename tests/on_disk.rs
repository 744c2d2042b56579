use std::collections::BTreeSet;

use chebystore::config::{load_config, write_config};
use chebystore::{Error, MultiSectorCoefficients, OrbitConfig, SectorSelection, SqliteStore};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> OrbitConfig {
    OrbitConfig {
        data_dir: dir.path().join("data"),
        db_filename: "orbits.db".to_string(),
        standard_mjd_min: 59000,
        standard_mjd_max: 59320,
        sector_length_days: 32,
    }
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    {
        let store = SqliteStore::open(config.clone()).unwrap();
        store
            .upsert_msc(&MultiSectorCoefficients::new("2020 AB").with_sector(2, vec![4.0, 5.0]))
            .unwrap();
        store.replace_cells("2020 AB", &[59000], &[42]).unwrap();
    }
    assert!(config.db_path().exists());

    let store = SqliteStore::open(config).unwrap();
    assert_eq!(store.get_designation_id("2020 AB").unwrap(), 1);
    assert_eq!(store.query_sector_coefficients("2020 AB", 2u32).unwrap()[&2], vec![4.0, 5.0]);
    assert_eq!(store.query_by_cell(59000, &[42]).unwrap(), BTreeSet::from([1]));

    let stats = store.stats().unwrap();
    assert_eq!(stats.designations, 1);
    assert_eq!(stats.coefficient_rows, 1);
    assert_eq!(stats.spatial_rows, 1);
    assert_eq!(stats.sector_columns, 10);
}

#[test]
fn test_widened_range_reports_stale_schema() {
    let dir = TempDir::new().unwrap();
    let narrow = config_in(&dir);
    SqliteStore::open(narrow.clone()).unwrap();

    let wide = OrbitConfig {
        standard_mjd_max: narrow.standard_mjd_max + 64,
        ..narrow
    };
    let store = SqliteStore::open(wide).unwrap();
    assert_eq!(store.coefficient_table().missing_columns().len(), 2);

    let new_sector = MultiSectorCoefficients::new("2020 AB").with_sector(11, vec![1.0]);
    assert!(matches!(store.upsert_msc(&new_sector), Err(Error::StaleSchema(_))));
    assert!(matches!(
        store.query_coefficients("2020 AB", 11u32),
        Err(Error::StaleSchema(_))
    ));

    let old_sector = MultiSectorCoefficients::new("2020 AB").with_sector(9, vec![2.0]);
    store.upsert_msc(&old_sector).unwrap();
    let all = store.query_sector_coefficients("2020 AB", SectorSelection::All).unwrap();
    assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![9]);
}

#[test]
fn test_config_roundtrip_through_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chebystore.toml");
    assert!(load_config(Some(&path)).unwrap().is_none());

    let config = config_in(&dir);
    write_config(&path, &config, false).unwrap();
    assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

    assert!(matches!(write_config(&path, &config, false), Err(Error::Config(_))));
    write_config(&path, &config, true).unwrap();
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chebystore.toml");
    std::fs::write(&path, "sector_length_days = 0\n").unwrap();
    assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));

    std::fs::write(&path, "sector_length_days = \"weekly\"\n").unwrap();
    assert!(matches!(load_config(Some(&path)), Err(Error::Toml(_))));

    let bad = OrbitConfig { sector_length_days: -1, ..config_in(&dir) };
    assert!(SqliteStore::open(bad).is_err());
}
