//! Core data types for the Phoenix flood-hazard data tooling.
//!
//! This module defines the shared domain model imported by all other modules:
//! bounding boxes, storm-event records, gauge sites, and the crate error type.
//! It contains no I/O.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Geographic extent in WGS84 decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lon <= lon && lon <= self.max_lon
    }

    /// `"min_lon,min_lat,max_lon,max_lat"`, the order used by both the TNM
    /// `bbox` and the USGS `bBox` query parameters.
    pub fn as_query_param(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    /// Corners in `gdal_translate -projwin` order: upper-left x, upper-left y,
    /// lower-right x, lower-right y.
    pub fn projwin(&self) -> [f64; 4] {
        [self.min_lon, self.max_lat, self.max_lon, self.min_lat]
    }

    pub fn validate(&self) -> Result<(), FloodDataError> {
        let values = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FloodDataError::InvalidConfig(format!(
                "bounding box has non-finite values: {}",
                self.as_query_param()
            )));
        }
        if !valid_longitude(self.min_lon) || !valid_longitude(self.max_lon) {
            return Err(FloodDataError::InvalidConfig(format!(
                "bounding box longitude out of range: {}",
                self.as_query_param()
            )));
        }
        if !valid_latitude(self.min_lat) || !valid_latitude(self.max_lat) {
            return Err(FloodDataError::InvalidConfig(format!(
                "bounding box latitude out of range: {}",
                self.as_query_param()
            )));
        }
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(FloodDataError::InvalidConfig(format!(
                "bounding box min must be below max: {}",
                self.as_query_param()
            )));
        }
        Ok(())
    }
}

pub fn valid_latitude(lat: f64) -> bool {
    lat.abs() <= 90.0
}

pub fn valid_longitude(lon: f64) -> bool {
    lon.abs() <= 180.0
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One NOAA Storm Events row that survived coordinate filtering.
///
/// Field order here is the key order of the emitted JSON. Apart from the
/// four coordinates, values are carried verbatim as CSV text so that the
/// front-end sees exactly what NOAA published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormEvent {
    pub event_id: String,
    pub event_type: String,
    pub begin_date: String,
    pub begin_time: String,
    pub end_date: String,
    pub end_time: String,
    pub begin_location: String,
    pub end_location: String,
    pub begin_lat: f64,
    pub begin_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub cz_name: String,
    pub event_narrative: String,
    pub episode_narrative: String,
    pub injuries_direct: String,
    pub injuries_indirect: String,
    pub deaths_direct: String,
    pub deaths_indirect: String,
    pub damage_property_num: String,
    pub damage_crops_num: String,
    pub magnitude: String,
    pub magnitude_type: String,
}

/// A USGS stream gauge site returned by the NWIS site service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeSite {
    pub site_no: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching, transforming, or writing flood data.
#[derive(Debug, PartialEq)]
pub enum FloodDataError {
    /// Non-2xx HTTP response from a remote API.
    HttpError(u16),
    /// The request could not be completed (DNS, TLS, timeout, ...).
    RequestFailed(String),
    /// A JSON, CSV, or RDB body could not be parsed.
    ParseError(String),
    /// Reading or writing a local file failed.
    Io(String),
    /// An external command ran but exited unsuccessfully.
    ToolFailed { program: String, status: Option<i32> },
    /// An external command could not be spawned at all.
    ToolNotFound(String),
    /// Every candidate DEM tile failed to download.
    NoTilesDownloaded,
    /// Configuration values are missing or out of range.
    InvalidConfig(String),
}

impl std::fmt::Display for FloodDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FloodDataError::HttpError(code) => write!(f, "HTTP error: {}", code),
            FloodDataError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            FloodDataError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            FloodDataError::Io(msg) => write!(f, "I/O error: {}", msg),
            FloodDataError::ToolFailed { program, status: Some(code) } => {
                write!(f, "{} exited with status {}", program, code)
            }
            FloodDataError::ToolFailed { program, status: None } => {
                write!(f, "{} was terminated by a signal", program)
            }
            FloodDataError::ToolNotFound(program) => {
                write!(f, "Could not run {}: is it installed and on PATH?", program)
            }
            FloodDataError::NoTilesDownloaded => write!(f, "No DEM tiles were downloaded"),
            FloodDataError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for FloodDataError {}

impl From<std::io::Error> for FloodDataError {
    fn from(err: std::io::Error) -> Self {
        FloodDataError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for FloodDataError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FloodDataError::HttpError(status.as_u16()),
            None if err.is_decode() => FloodDataError::ParseError(err.to_string()),
            None => FloodDataError::RequestFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FloodDataError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            FloodDataError::Io(err.to_string())
        } else {
            FloodDataError::ParseError(err.to_string())
        }
    }
}

impl From<csv::Error> for FloodDataError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            FloodDataError::Io(err.to_string())
        } else {
            FloodDataError::ParseError(err.to_string())
        }
    }
}

impl From<toml::de::Error> for FloodDataError {
    fn from(err: toml::de::Error) -> Self {
        FloodDataError::InvalidConfig(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
