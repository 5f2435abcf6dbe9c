//! `phoenix_flood` — batch jobs that prepare the flood-hazard map data.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use phoenix_flood::config::Config;
use phoenix_flood::dem::{self, DemJob, DemOutcome};
use phoenix_flood::ingest;
use phoenix_flood::logging::{self, DataSource};
use phoenix_flood::model::FloodDataError;
use phoenix_flood::poi;
use phoenix_flood::raster::hydrology::{self, HydrologyJob};
use phoenix_flood::storm_events;
use phoenix_flood::tools::SystemRunner;
use phoenix_flood::verify;

/// Prepare DEM, hydrology, storm-event and POI data for the Phoenix flood map.
#[derive(Parser)]
#[command(name = "phoenix_flood", version, long_about = None)]
struct Cli {
    /// Config file (defaults to $PHOENIX_FLOOD_CONFIG, then ./phoenix_flood.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum log level: debug, info, warn or error.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Append log lines to this file.
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download DEM tiles from The National Map, merge them and clip to the region.
    Dem {
        /// Output GeoTIFF.
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum number of tiles to download.
        #[arg(long)]
        max_tiles: Option<usize>,
    },

    /// Run the water accumulation analysis on a DEM.
    Hydrology {
        /// Input DEM.
        #[arg(long)]
        dem: Option<String>,

        /// Directory for intermediate and final rasters.
        #[arg(long)]
        output_dir: Option<String>,

        /// Flow accumulation threshold for stream extraction, in cells.
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// Convert the NOAA storm events CSV into filtered JSON.
    Preprocess {
        /// NOAA storm events CSV export.
        #[arg(short, long)]
        input: Option<String>,

        /// Output JSON.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Build the POI GeoJSON from preprocessed events and USGS gauges.
    Pois {
        /// Preprocessed events JSON.
        #[arg(long)]
        events: Option<String>,

        /// Output GeoJSON.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check that the remote APIs and external tools are reachable.
    Verify {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = match config.logging.min_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init_logger(level, config.logging.file.as_deref(), config.logging.timestamps);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Load the config file and fold command-line overrides into it.
fn load_config(cli: &Cli) -> Result<Config, FloodDataError> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }

    match &cli.command {
        Command::Dem { output, max_tiles } => {
            if let Some(output) = output {
                config.dem.output = output.clone();
            }
            if let Some(max_tiles) = max_tiles {
                config.dem.max_tiles = *max_tiles;
            }
        }
        Command::Hydrology { dem, output_dir, threshold } => {
            if let Some(dem) = dem {
                config.hydrology.dem = dem.clone();
            }
            if let Some(dir) = output_dir {
                config.hydrology.output_dir = dir.clone();
            }
            if let Some(threshold) = threshold {
                config.hydrology.flow_accum_threshold = *threshold;
            }
        }
        Command::Preprocess { input, output } => {
            if let Some(input) = input {
                config.storm_events.csv = input.clone();
            }
            if let Some(output) = output {
                config.storm_events.output = output.clone();
            }
        }
        Command::Pois { events, output } => {
            if let Some(events) = events {
                config.pois.events = events.clone();
            }
            if let Some(output) = output {
                config.pois.output = output.clone();
            }
        }
        Command::Verify { .. } => {}
    }

    config.validate()?;
    Ok(config)
}

/// Run one job. Verification failures exit nonzero without being an error.
fn run(command: Command, config: &Config) -> Result<ExitCode, FloodDataError> {
    match command {
        Command::Dem { .. } => {
            let client = ingest::build_client()?;
            let job = DemJob::from_config(&config.dem)?;
            match dem::run(&client, &mut SystemRunner, &job)? {
                DemOutcome::NoProducts => {
                    logging::warn(DataSource::Tnm, None, "Nothing downloaded; DEM not written")
                }
                DemOutcome::Written(path) => {
                    logging::info(DataSource::System, None, &format!("DEM ready: {}", path.display()))
                }
            }
        }
        Command::Hydrology { .. } => {
            let job = HydrologyJob::from_config(&config.hydrology);
            hydrology::run(&mut SystemRunner, &job)?;
        }
        Command::Preprocess { .. } => {
            storm_events::preprocess(
                Path::new(&config.storm_events.csv),
                Path::new(&config.storm_events.output),
            )?;
        }
        Command::Pois { .. } => {
            let client = ingest::build_client()?;
            poi::run(&client, &config.pois)?;
        }
        Command::Verify { json } => {
            let client = ingest::build_client()?;
            let report = verify::run_full_verification(&client, config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
            if !report.all_ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
