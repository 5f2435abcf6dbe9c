//! Configuration loading.
//!
//! Settings come from an optional TOML file. Every section and key has a
//! default, so running with no file at all reproduces the stock Phoenix
//! setup. The file is located by, in order: an explicit path, the
//! `PHOENIX_FLOOD_CONFIG` environment variable (a `.env` file is honoured),
//! and `phoenix_flood.toml` in the working directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ingest::tnm::NED_13_ARC_SECOND;
use crate::logging::LogLevel;
use crate::model::{BoundingBox, FloodDataError};
use crate::regions;

pub const CONFIG_ENV_VAR: &str = "PHOENIX_FLOOD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "phoenix_flood.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub dem: DemConfig,
    pub hydrology: HydrologyConfig,
    pub storm_events: StormEventsConfig,
    pub pois: PoiConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None, timestamps: false }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, FloodDataError> {
        self.level.parse().map_err(FloodDataError::InvalidConfig)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DemConfig {
    /// Region key from the registry; ignored when `bounds` is set.
    pub region: String,
    pub bounds: Option<BoundingBox>,
    pub dataset: String,
    pub prod_format: String,
    pub max_products: u32,
    pub max_tiles: usize,
    pub work_dir: String,
    pub vrt_name: String,
    pub output: String,
}

impl Default for DemConfig {
    fn default() -> Self {
        Self {
            region: "maricopa".to_string(),
            bounds: None,
            dataset: NED_13_ARC_SECOND.to_string(),
            prod_format: "GeoTIFF".to_string(),
            max_products: 100,
            max_tiles: 10,
            work_dir: ".".to_string(),
            vrt_name: "temp_maricopa.vrt".to_string(),
            output: "dem.tif".to_string(),
        }
    }
}

impl DemConfig {
    pub fn resolved_bounds(&self) -> Result<BoundingBox, FloodDataError> {
        resolve_bounds(&self.region, self.bounds)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HydrologyConfig {
    pub dem: String,
    pub output_dir: String,
    pub whitebox: String,
    pub gdal_calc: String,
    /// Lower than the usual 1000 cells: desert washes drain small areas.
    pub flow_accum_threshold: u32,
    pub max_influence_distance: f64,
    pub stdev: f64,
    pub num_tones: u32,
    pub num_classes: u32,
}

impl Default for HydrologyConfig {
    fn default() -> Self {
        Self {
            dem: "dem.tif".to_string(),
            output_dir: "tiles".to_string(),
            whitebox: "whitebox_tools".to_string(),
            gdal_calc: "gdal_calc.py".to_string(),
            flow_accum_threshold: 500,
            max_influence_distance: 1.0,
            stdev: 2.0,
            num_tones: 3,
            num_classes: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StormEventsConfig {
    pub csv: String,
    pub output: String,
}

impl Default for StormEventsConfig {
    fn default() -> Self {
        Self {
            csv: "floods_maricopa_2000yr.csv".to_string(),
            output: "noaa_maricopa_floods.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PoiConfig {
    pub region: String,
    pub bounds: Option<BoundingBox>,
    pub events: String,
    pub output: String,
    pub max_gauges: usize,
}

impl Default for PoiConfig {
    fn default() -> Self {
        Self {
            region: "phoenix".to_string(),
            bounds: None,
            events: "noaa_maricopa_floods.json".to_string(),
            // Read directly by the map front-end.
            output: "../src/lib/data/pois.json".to_string(),
            max_gauges: 5,
        }
    }
}

impl PoiConfig {
    pub fn resolved_bounds(&self) -> Result<BoundingBox, FloodDataError> {
        resolve_bounds(&self.region, self.bounds)
    }
}

fn resolve_bounds(region: &str, bounds: Option<BoundingBox>) -> Result<BoundingBox, FloodDataError> {
    let bounds = match bounds {
        Some(b) => b,
        None => regions::find_region(region)
            .map(|r| r.bounds)
            .ok_or_else(|| {
                FloodDataError::InvalidConfig(format!(
                    "unknown region '{}', expected one of {:?}",
                    region,
                    regions::region_keys()
                ))
            })?,
    };
    bounds.validate()?;
    Ok(bounds)
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, FloodDataError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, FloodDataError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FloodDataError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Locate and load the configuration, falling back to defaults when no
    /// file is found. An explicitly named file that is missing is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, FloodDataError> {
        dotenv::dotenv().ok();

        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load_from(&PathBuf::from(path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load_from(default_path);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), FloodDataError> {
        self.logging.min_level()?;
        self.dem.resolved_bounds()?;
        self.pois.resolved_bounds()?;

        let h = &self.hydrology;
        if !(1..=255).contains(&h.num_classes) {
            return Err(FloodDataError::InvalidConfig(format!(
                "hydrology.num_classes must be between 1 and 255, got {}",
                h.num_classes
            )));
        }
        if !(h.max_influence_distance > 0.0) {
            return Err(FloodDataError::InvalidConfig(format!(
                "hydrology.max_influence_distance must be positive, got {}",
                h.max_influence_distance
            )));
        }
        if self.dem.max_tiles == 0 {
            return Err(FloodDataError::InvalidConfig("dem.max_tiles must be at least 1".to_string()));
        }
        Ok(())
    }
}
