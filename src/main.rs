//! Chebystore CLI - inspect and initialise orbit coefficient databases

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use chebystore::config;
use chebystore::storage::{SectorSelection, SqliteStore};
use chebystore::ui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chebystore")]
#[command(version)]
#[command(about = "Sector-indexed storage for Chebyshev orbit coefficients")]
#[command(long_about = r#"
Chebystore keeps per-object Chebyshev coefficients, one column per time
sector, and a (time, sky-cell) index of where each object is.

Example usage:
  chebystore init
  chebystore coeffs --designation "2020 AB" --sector 0 --sector 1
  chebystore near --time 59000 --cell 42 --cell 43
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides data_dir/db_filename from the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init {
        /// Also write the effective config to the config path
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show statistics about the database
    Stats,

    /// Show stored coefficients of one object
    Coeffs {
        #[arg(short = 'n', long)]
        designation: String,

        /// Sector numbers to fetch (default: all)
        #[arg(short, long)]
        sector: Vec<u32>,
    },

    /// Show the (time, sky cell) footprint of one object
    Cells {
        #[arg(short = 'n', long)]
        designation: String,
    },

    /// List objects stored at a time in any of the given sky cells
    Near {
        #[arg(short, long)]
        time: i64,

        #[arg(long = "cell", required = true)]
        cells: Vec<i64>,
    },
}

#[derive(Debug, Clone, Copy)]
enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    fn is_human(self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

fn emit_success(command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli, output_mode) {
        if output_mode.is_human() {
            ui::error(&format!("{:#}", e));
        } else {
            let envelope = serde_json::json!({ "ok": false, "error": format!("{:#}", e) });
            println!("{}", envelope);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let orbit_config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let db_path = cli.database.clone().unwrap_or_else(|| orbit_config.db_path());

    match cli.command {
        Commands::Init { write_config, force } => {
            if write_config {
                config::write_config(&config_path, &orbit_config, force)?;
            }
            let store = SqliteStore::open_path(&db_path, orbit_config)?;
            let stats = store.stats()?;

            if output_mode.is_human() {
                ui::header("Initialised orbit database");
                ui::info("Database", &db_path.display().to_string());
                ui::info("Sector columns", &stats.sector_columns.to_string());
                if write_config {
                    ui::info("Config", &config_path.display().to_string());
                }
                ui::success("Schema ready");
            } else {
                emit_success("init", serde_json::json!({
                    "database": db_path,
                    "stats": stats,
                }))?;
            }
        }

        Commands::Stats => {
            let store = SqliteStore::open_path(&db_path, orbit_config)?;
            let stats = store.stats()?;
            let missing = store.coefficient_table().missing_columns().len();

            if output_mode.is_human() {
                ui::header("Database statistics");
                ui::info("Database", &db_path.display().to_string());
                println!("{}", ui::stats_table(&stats));
                if missing > 0 {
                    ui::warn(&format!(
                        "{} configured sectors have no column; recreate object_coefficients to store them",
                        missing
                    ));
                }
            } else {
                emit_success("stats", serde_json::json!({
                    "stats": stats,
                    "missing_sector_columns": missing,
                }))?;
            }
        }

        Commands::Coeffs { designation, sector } => {
            let store = SqliteStore::open_path(&db_path, orbit_config)?;
            let selection = if sector.is_empty() {
                SectorSelection::All
            } else {
                SectorSelection::from(sector)
            };
            let coefficients = store.query_sector_coefficients(&designation, selection)?;

            if output_mode.is_human() {
                ui::header(&format!("Coefficients for {}", designation));
                if coefficients.is_empty() {
                    ui::warn("No sectors stored");
                } else {
                    println!("{}", ui::coefficients_table(store.config(), &coefficients));
                }
            } else {
                // Array keeps sector order; a JSON object would sort keys as strings
                let sectors: Vec<_> = coefficients
                    .iter()
                    .map(|(&sector, coeffs)| serde_json::json!({
                        "sector": sector,
                        "column": ui::sector_column_label(store.config(), sector),
                        "coefficients": coeffs,
                    }))
                    .collect();
                emit_success("coeffs", serde_json::json!({
                    "designation": designation,
                    "sectors": sectors,
                }))?;
            }
        }

        Commands::Cells { designation } => {
            let store = SqliteStore::open_path(&db_path, orbit_config)?;
            let cells = store.query_cells_by_designation(&designation)?;

            if output_mode.is_human() {
                ui::header(&format!("Footprint of {}", designation));
                ui::summary_row("Cells:", &cells.len().to_string());
                println!("{}", ui::cells_table(&cells));
            } else {
                emit_success("cells", serde_json::json!({
                    "designation": designation,
                    "cells": cells,
                }))?;
            }
        }

        Commands::Near { time, cells } => {
            let store = SqliteStore::open_path(&db_path, orbit_config)?;
            let ids = store.query_by_cell(time, &cells)?;
            let mut objects = Vec::with_capacity(ids.len());
            for id in ids {
                objects.push((id, store.designation_for_id(id)?));
            }

            if output_mode.is_human() {
                ui::header(&format!("Objects at {} in {} cells", time, cells.len()));
                if objects.is_empty() {
                    ui::warn("No objects found");
                }
                ui::section(" Matches ");
                for (id, designation) in &objects {
                    ui::summary_row(&format!("{:>8}", id), designation);
                }
            } else {
                let data: Vec<_> = objects
                    .iter()
                    .map(|(id, designation)| serde_json::json!({ "object_id": id, "designation": designation }))
                    .collect();
                emit_success("near", serde_json::json!({ "time": time, "objects": data }))?;
            }
        }
    }

    Ok(())
}
