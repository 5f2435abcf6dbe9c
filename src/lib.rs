//! Data preparation for the Phoenix flood-hazard map.
//!
//! Four batch jobs feed the web front-end: a DEM downloader (`dem`), a
//! WhiteboxTools hydrology pipeline (`raster::hydrology`), a NOAA storm
//! events preprocessor (`storm_events`), and a POI GeoJSON builder (`poi`).

pub mod config;
pub mod dem;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod poi;
pub mod raster;
pub mod regions;
pub mod storm_events;
pub mod tools;
pub mod verify;
