//! Raster processing driven through external tools.
//!
//! - `whitebox`  — WhiteboxTools command builders.
//! - `gdal`      — value-range reclassification via `gdal_calc.py`.
//! - `hydrology` — the water accumulation pipeline plan and runner.

pub mod gdal;
pub mod hydrology;
pub mod whitebox;
