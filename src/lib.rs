//! # Chebystore - sector-indexed orbit coefficient storage
//!
//! Persists piecewise Chebyshev coefficients for orbiting bodies and a
//! secondary (time, sky-cell) index used to find which objects are near a
//! given sky position at a given time.
//!
//! Chebystore provides:
//! - One SQLite row per designation with a blob column per time sector
//! - A designation -> integer identifier index
//! - A (time, sky-cell) -> object identifier index with full-replace updates
//! - Explicit configuration of the sector range and database location

pub mod config;
pub mod msc;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use config::OrbitConfig;
pub use msc::{MultiSectorCoefficients, SectorCoefficientSource};
pub use storage::{DbStats, SectorMap, SectorSelection, SqliteStore};

/// Result type alias for Chebystore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Chebystore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Stale schema: column {0} does not exist in object_coefficients")]
    StaleSchema(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Corrupt coefficient blob: {0}")]
    Codec(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], for callers that only care about
/// whether to retry, report a missing object, or fix their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    NotFound,
    Validation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) | Error::Config(_) | Error::Toml(_) => ErrorKind::Validation,
            Error::Storage(_)
            | Error::StaleSchema(_)
            | Error::Invariant(_)
            | Error::Codec(_)
            | Error::Io(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::NotFound("2020 AB".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::Validation("len".into()).kind(), ErrorKind::Validation);
        assert_eq!(Error::StaleSchema("sector_9_1".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Invariant("empty".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Codec("short".into()).kind(), ErrorKind::Storage);
    }
}
