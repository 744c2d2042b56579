//! Multi-sector coefficient objects
//!
//! The ephemeris side of the system produces one of these per body: a
//! designation plus one coefficient array per time sector it covers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything that can be written to the coefficient store.
pub trait SectorCoefficientSource {
    fn designation(&self) -> &str;

    /// Coefficient arrays keyed by sector number
    fn sector_coefficients(&self) -> &BTreeMap<u32, Vec<f64>>;
}

/// Plain in-memory multi-sector coefficient object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiSectorCoefficients {
    pub designation: String,
    pub sector_coefficients: BTreeMap<u32, Vec<f64>>,
}

impl MultiSectorCoefficients {
    pub fn new(designation: impl Into<String>) -> Self {
        Self {
            designation: designation.into(),
            sector_coefficients: BTreeMap::new(),
        }
    }

    /// Builder-style insert of one sector's coefficients
    pub fn with_sector(mut self, sector_number: u32, coefficients: Vec<f64>) -> Self {
        self.sector_coefficients.insert(sector_number, coefficients);
        self
    }
}

impl SectorCoefficientSource for MultiSectorCoefficients {
    fn designation(&self) -> &str {
        &self.designation
    }

    fn sector_coefficients(&self) -> &BTreeMap<u32, Vec<f64>> {
        &self.sector_coefficients
    }
}
