//! Terminal output helpers for the `chebystore` binary

pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, section, success, summary_row, warn};
pub use table::{cells_table, coefficients_table, sector_column_label, stats_table};
pub use theme::{theme, Theme};
