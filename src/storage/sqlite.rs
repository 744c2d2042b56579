//! SQLite storage implementation

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use crate::config::{self, OrbitConfig};
use crate::msc::SectorCoefficientSource;
use crate::{Error, Result};
use super::codec::{decode_coefficients, encode_coefficients};
use super::schema::{self, sector_field_name, sector_field_names, CoefficientTable, SectorSelection};

/// SQLite-backed storage for sector coefficients and the (time, sky-cell) index
pub struct SqliteStore {
    conn: Connection,
    config: OrbitConfig,
    coefficients: CoefficientTable,
}

/// Coefficients of one object found through the spatial index
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCoefficients {
    pub object_id: i64,
    pub designation: String,
    pub coefficients: BTreeMap<u32, Vec<f64>>,
}

impl SqliteStore {
    /// Open the database at `config.db_path()` (creates it and its directory if needed)
    pub fn open(config: OrbitConfig) -> Result<Self> {
        let path = config.db_path();
        Self::open_path(&path, config)
    }

    /// Open a database file at an explicit path
    pub fn open_path(path: &Path, config: OrbitConfig) -> Result<Self> {
        config.validate()?;
        config::ensure_db_dir(path)?;
        let conn = Connection::open(path)?;
        tracing::info!("Opened orbit database {}", path.display());
        Self::with_connection(conn, config)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(config: OrbitConfig) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: OrbitConfig) -> Result<Self> {
        let coefficients = CoefficientTable::from_config(&config);
        let mut store = Self { conn, config, coefficients };
        store.create_schema();
        store.refresh_coefficient_layout()?;
        Ok(store)
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    pub fn coefficient_table(&self) -> &CoefficientTable {
        &self.coefficients
    }

    // ========== Schema ==========

    /// Create all three tables and their indexes. Safe to call repeatedly.
    pub fn create_schema(&self) {
        self.create_designation_table();
        self.create_coefficient_table();
        self.create_spatial_index_table();
    }

    pub fn create_designation_table(&self) {
        self.execute_ddl(schema::CREATE_DESIGNATION_TABLE);
        for stmt in schema::CREATE_DESIGNATION_INDEXES {
            self.execute_ddl(stmt);
        }
    }

    /// Allocates one blob column per sector of the configured range. A table
    /// that already exists keeps its columns, whatever the configuration says.
    pub fn create_coefficient_table(&self) {
        self.execute_ddl(&self.coefficients.create_sql());
    }

    pub fn create_spatial_index_table(&self) {
        self.execute_ddl(schema::CREATE_SPATIAL_INDEX_TABLE);
        for stmt in schema::CREATE_SPATIAL_INDEXES {
            self.execute_ddl(stmt);
        }
    }

    // Creation is best-effort: failures are logged, not returned
    fn execute_ddl(&self, sql: &str) {
        if let Err(e) = self.conn.execute(sql, []) {
            tracing::warn!("Schema statement failed: {}", e);
        }
    }

    /// Re-read the physical column set of `object_coefficients`
    pub fn refresh_coefficient_layout(&mut self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info('object_coefficients')")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        self.coefficients = CoefficientTable::from_config(&self.config).with_physical_columns(columns);
        let missing = self.coefficients.missing_columns();
        if !missing.is_empty() {
            tracing::warn!(
                "object_coefficients lacks {} configured sector columns (first: {}); recreate the table to use them",
                missing.len(),
                missing[0]
            );
        }
        Ok(())
    }

    // ========== Designation Operations ==========

    /// Return the object id for `designation`, assigning a new one if absent
    pub fn get_or_create_designation(&self, designation: &str) -> Result<i64> {
        validate_designation(designation)?;
        get_or_create_id(&self.conn, designation)
    }

    /// Look up the object id for `designation`
    pub fn get_designation_id(&self, designation: &str) -> Result<i64> {
        lookup_id(&self.conn, designation)?
            .ok_or_else(|| Error::NotFound(format!("designation {}", designation)))
    }

    /// Reverse lookup: designation for an object id
    pub fn designation_for_id(&self, object_id: i64) -> Result<String> {
        self.conn
            .query_row(
                "SELECT designation FROM object_desig WHERE object_id = ?1",
                [object_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("object_id {}", object_id)))
    }

    pub fn count_designations(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM object_desig", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Coefficient Operations ==========

    /// Insert or update the coefficients of a multi-sector object
    pub fn upsert_msc(&self, msc: &impl SectorCoefficientSource) -> Result<()> {
        self.upsert_coefficients(msc.designation(), msc.sector_coefficients())
    }

    /// Insert or update the supplied sectors of `designation`.
    ///
    /// Sectors not in `sector_coefficients` keep their stored value. The
    /// designation record is created in the same transaction if absent.
    pub fn upsert_coefficients(
        &self,
        designation: &str,
        sector_coefficients: &BTreeMap<u32, Vec<f64>>,
    ) -> Result<()> {
        validate_designation(designation)?;

        let sectors = self.config.sector_starts(sector_coefficients.keys().copied())?;
        let names = sector_field_names(&sectors);
        self.coefficients.require_columns(&names)?;

        let mut values = Vec::with_capacity(names.len() + 1);
        values.push(Value::Text(designation.to_string()));
        values.extend(
            sector_coefficients
                .values()
                .map(|coeffs| Value::Blob(encode_coefficients(coeffs))),
        );

        let sql = if names.is_empty() {
            "INSERT INTO object_coefficients (designation) VALUES (?1) ON CONFLICT(designation) DO NOTHING"
                .to_string()
        } else {
            let placeholders: Vec<String> = (2..=names.len() + 1).map(|i| format!("?{}", i)).collect();
            let updates: Vec<String> = names.iter().map(|n| format!("{n} = excluded.{n}")).collect();
            format!(
                "INSERT INTO object_coefficients (designation, {}) VALUES (?1, {}) ON CONFLICT(designation) DO UPDATE SET {}",
                names.join(", "),
                placeholders.join(", "),
                updates.join(", ")
            )
        };

        let tx = self.conn.unchecked_transaction()?;
        let object_id = get_or_create_id(&tx, designation)?;
        tx.execute(&sql, params_from_iter(values))?;
        tx.commit()?;

        tracing::debug!(
            "Upserted {} sectors for {} (object_id {})",
            names.len(),
            designation,
            object_id
        );
        Ok(())
    }

    /// Coefficients of `designation` keyed by column name; null sectors are omitted
    pub fn query_coefficients(
        &self,
        designation: &str,
        selection: impl Into<SectorSelection>,
    ) -> Result<BTreeMap<String, Vec<f64>>> {
        let columns = self.selected_columns(&selection.into())?;
        let blobs = self.fetch_coefficient_blobs(designation, &columns)?;

        columns
            .into_iter()
            .zip(blobs)
            .filter_map(|((_, name), blob)| blob.map(|b| (name, b)))
            .map(|(name, blob)| -> Result<(String, Vec<f64>)> { Ok((name, decode_coefficients(&blob)?)) })
            .collect()
    }

    /// Same as [`query_coefficients`](Self::query_coefficients), keyed by sector number
    pub fn query_sector_coefficients(
        &self,
        designation: &str,
        selection: impl Into<SectorSelection>,
    ) -> Result<BTreeMap<u32, Vec<f64>>> {
        let columns = self.selected_columns(&selection.into())?;
        let blobs = self.fetch_coefficient_blobs(designation, &columns)?;

        columns
            .into_iter()
            .zip(blobs)
            .filter_map(|((sector, _), blob)| blob.map(|b| (sector, b)))
            .map(|(sector, blob)| -> Result<(u32, Vec<f64>)> { Ok((sector, decode_coefficients(&blob)?)) })
            .collect()
    }

    /// Coefficients of every object stored at `time` in any of `sky_cells`.
    ///
    /// Objects indexed spatially but without a coefficient row are skipped.
    pub fn query_coefficients_by_cell(
        &self,
        time: i64,
        sky_cells: &[i64],
        selection: impl Into<SectorSelection>,
    ) -> Result<Vec<ObjectCoefficients>> {
        let columns = self.selected_columns(&selection.into())?;
        if sky_cells.is_empty() {
            return Ok(Vec::new());
        }

        let mut select = vec!["d.object_id".to_string(), "d.designation".to_string()];
        select.extend(columns.iter().map(|(_, name)| format!("c.{}", name)));
        let sql = format!(
            "SELECT {} FROM object_desig d \
             INNER JOIN object_coefficients c ON c.designation = d.designation \
             WHERE d.object_id IN ({}) ORDER BY d.object_id",
            select.join(", "),
            cell_lookup_sql(sky_cells.len())
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(cell_lookup_params(time, sky_cells)), |row| {
                let object_id: i64 = row.get(0)?;
                let designation: String = row.get(1)?;
                let mut blobs = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    blobs.push(row.get::<_, Option<Vec<u8>>>(i + 2)?);
                }
                Ok((object_id, designation, blobs))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(object_id, designation, blobs)| -> Result<ObjectCoefficients> {
                let mut coefficients = BTreeMap::new();
                for ((sector, _), blob) in columns.iter().zip(blobs) {
                    if let Some(blob) = blob {
                        coefficients.insert(*sector, decode_coefficients(&blob)?);
                    }
                }
                Ok(ObjectCoefficients { object_id, designation, coefficients })
            })
            .collect()
    }

    pub fn count_coefficient_rows(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM object_coefficients", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Resolve a selection to (sector, column) pairs present in the table.
    /// `All` skips columns the physical table lacks; explicit sectors fail on them.
    fn selected_columns(&self, selection: &SectorSelection) -> Result<Vec<(u32, String)>> {
        let sectors = selection.resolve(&self.config)?;
        let mut columns = Vec::with_capacity(sectors.len());
        for (sector, start) in sectors.iter() {
            let name = sector_field_name(sector, start);
            if self.coefficients.has_column(&name) {
                columns.push((sector, name));
            } else if *selection != SectorSelection::All {
                return Err(Error::StaleSchema(name));
            }
        }
        Ok(columns)
    }

    fn fetch_coefficient_blobs(
        &self,
        designation: &str,
        columns: &[(u32, String)],
    ) -> Result<Vec<Option<Vec<u8>>>> {
        let mut select = vec!["id".to_string()];
        select.extend(columns.iter().map(|(_, name)| name.clone()));
        let sql = format!(
            "SELECT {} FROM object_coefficients WHERE designation = ?1",
            select.join(", ")
        );

        self.conn
            .query_row(&sql, [designation], |row| {
                let mut blobs = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    blobs.push(row.get::<_, Option<Vec<u8>>>(i + 1)?);
                }
                Ok(blobs)
            })
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("coefficients for {}", designation)))
    }

    // ========== Spatial Index Operations ==========

    /// Replace every (time, sky_cell) row of `designation` with the given pairs.
    ///
    /// The id assignment, delete and insert run in one transaction; on any
    /// error the previous rows are left in place. Returns the object id.
    pub fn replace_cells(&self, designation: &str, times: &[i64], sky_cells: &[i64]) -> Result<i64> {
        if times.len() != sky_cells.len() {
            return Err(Error::Validation(format!(
                "len(times) != len(sky_cells) [{} != {}]",
                times.len(),
                sky_cells.len()
            )));
        }
        validate_designation(designation)?;

        let tx = self.conn.unchecked_transaction()?;
        let object_id = get_or_create_id(&tx, designation)?;
        let deleted = tx.execute("DELETE FROM objects_by_time_cell WHERE object_id = ?1", [object_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO objects_by_time_cell (time, sky_cell, object_id) VALUES (?1, ?2, ?3)",
            )?;
            for (time, sky_cell) in times.iter().zip(sky_cells) {
                stmt.execute(params![time, sky_cell, object_id])?;
            }
        }
        tx.commit()?;

        tracing::debug!(
            "Replaced {} cells with {} for {} (object_id {})",
            deleted,
            times.len(),
            designation,
            object_id
        );
        Ok(object_id)
    }

    /// Remove all spatial rows of `designation`, keeping its designation record
    pub fn delete_cells(&self, designation: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM objects_by_time_cell WHERE object_id IN \
             (SELECT object_id FROM object_desig WHERE designation = ?1)",
            [designation],
        )?;
        Ok(deleted)
    }

    /// (time, sky_cell) pairs of `designation`, in insertion order
    pub fn query_cells_by_designation(&self, designation: &str) -> Result<Vec<(i64, i64)>> {
        let object_id = self.get_designation_id(designation)?;
        let mut stmt = self
            .conn
            .prepare("SELECT time, sky_cell FROM objects_by_time_cell WHERE object_id = ?1 ORDER BY id")?;

        let cells = stmt
            .query_map([object_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cells)
    }

    /// Distinct object ids stored at `time` in any of `sky_cells`
    pub fn query_by_cell(&self, time: i64, sky_cells: &[i64]) -> Result<BTreeSet<i64>> {
        if sky_cells.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut stmt = self.conn.prepare(&cell_lookup_sql(sky_cells.len()))?;
        let ids = stmt
            .query_map(params_from_iter(cell_lookup_params(time, sky_cells)), |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<i64>>>()?;
        Ok(ids)
    }

    pub fn count_spatial_rows(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM objects_by_time_cell", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Statistics ==========

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            designations: self.count_designations()?,
            coefficient_rows: self.count_coefficient_rows()?,
            spatial_rows: self.count_spatial_rows()?,
            sector_columns: self.coefficients.physical_columns().len(),
        })
    }
}

fn validate_designation(designation: &str) -> Result<()> {
    if designation.trim().is_empty() {
        return Err(Error::Validation("designation must not be empty".to_string()));
    }
    Ok(())
}

fn lookup_id(conn: &Connection, designation: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT object_id FROM object_desig WHERE designation = ?1",
        [designation],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

// Conflict-do-nothing then read: a concurrent insert of the same designation
// resolves to the same row.
fn get_or_create_id(conn: &Connection, designation: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO object_desig (designation) VALUES (?1) ON CONFLICT(designation) DO NOTHING",
        [designation],
    )?;
    lookup_id(conn, designation)?.ok_or_else(|| {
        Error::Invariant(format!("no object_id for {} after insert", designation))
    })
}

/// Hot-path lookup; the `time = ? AND sky_cell IN (...)` shape lets SQLite
/// search `index_time_cell`.
fn cell_lookup_sql(cell_count: usize) -> String {
    let placeholders: Vec<String> = (2..=cell_count + 1).map(|i| format!("?{}", i)).collect();
    format!(
        "SELECT DISTINCT object_id FROM objects_by_time_cell WHERE time = ?1 AND sky_cell IN ({})",
        placeholders.join(", ")
    )
}

fn cell_lookup_params(time: i64, sky_cells: &[i64]) -> impl Iterator<Item = i64> + '_ {
    std::iter::once(time).chain(sky_cells.iter().copied())
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DbStats {
    pub designations: usize,
    pub coefficient_rows: usize,
    pub spatial_rows: usize,
    pub sector_columns: usize,
}
