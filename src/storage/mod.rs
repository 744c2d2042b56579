//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - object_desig(object_id, designation)
//! - object_coefficients(id, designation, sector_<n>_<t>...)
//! - objects_by_time_cell(id, time, sky_cell, object_id)

pub mod codec;
pub mod schema;
pub mod sqlite;

pub use schema::{sector_field_names, CoefficientTable, SectorMap, SectorSelection};
pub use sqlite::{DbStats, ObjectCoefficients, SqliteStore};
