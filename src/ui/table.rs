use crate::config::OrbitConfig;
use crate::storage::schema::sector_field_name;
use crate::storage::DbStats;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: usize,
}

#[derive(Tabled)]
struct CellRow {
    #[tabled(rename = "Time")]
    time: i64,
    #[tabled(rename = "Sky cell")]
    sky_cell: i64,
}

#[derive(Tabled)]
struct CoefficientRow {
    #[tabled(rename = "Sector")]
    column: String,
    #[tabled(rename = "N")]
    count: usize,
    #[tabled(rename = "Coefficients")]
    values: String,
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &DbStats) -> String {
    render(&[
        StatRow { metric: "Designations", value: stats.designations },
        StatRow { metric: "Coefficient rows", value: stats.coefficient_rows },
        StatRow { metric: "Spatial rows", value: stats.spatial_rows },
        StatRow { metric: "Sector columns", value: stats.sector_columns },
    ])
}

pub fn cells_table(cells: &[(i64, i64)]) -> String {
    let rows: Vec<CellRow> = cells
        .iter()
        .map(|&(time, sky_cell)| CellRow { time, sky_cell })
        .collect();
    render(&rows)
}

/// One row per sector, in sector order
pub fn coefficients_table(config: &OrbitConfig, coefficients: &BTreeMap<u32, Vec<f64>>) -> String {
    let rows: Vec<CoefficientRow> = coefficients
        .iter()
        .map(|(&sector, coeffs)| CoefficientRow {
            column: sector_column_label(config, sector),
            count: coeffs.len(),
            values: coeffs
                .iter()
                .map(|c| format!("{:.6e}", c))
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();
    render(&rows)
}

/// Column name of a sector, or `sector_<n>` if its start time is unrepresentable
pub fn sector_column_label(config: &OrbitConfig, sector: u32) -> String {
    match config.sector_start(sector, config.standard_mjd_min) {
        Some(start) => sector_field_name(sector, start),
        None => format!("sector_{}", sector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(cells_table(&[]).is_empty());
        assert!(coefficients_table(&OrbitConfig::default(), &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_cells_table_lists_rows() {
        let table = cells_table(&[(59000, 42), (59001, 43)]);
        assert!(table.contains("Sky cell"));
        assert!(table.contains("59001"));
        assert!(table.contains("43"));
    }

    #[test]
    fn test_coefficients_table_in_sector_order() {
        let config = OrbitConfig::default();
        let coefficients = BTreeMap::from([(10, vec![1.0]), (2, vec![2.0]), (100, vec![3.0])]);
        let table = coefficients_table(&config, &coefficients);

        let second = table.find("sector_2_40064").unwrap();
        let tenth = table.find("sector_10_40320").unwrap();
        let hundredth = table.find("sector_100_43200").unwrap();
        assert!(second < tenth && tenth < hundredth);
    }
}
