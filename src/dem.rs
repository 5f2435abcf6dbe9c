//! DEM acquisition for Maricopa County.
//!
//! Searches TNM for elevation tiles, downloads them, then merges them into a
//! virtual raster with `gdalbuildvrt` and clips that to the bounding box with
//! `gdal_translate -projwin`. The tiles and VRT are removed once the clipped
//! DEM has been written.

use std::path::{Path, PathBuf};

use crate::config::DemConfig;
use crate::ingest::tnm::{self, ProductQuery};
use crate::logging::{self, DataSource};
use crate::model::{BoundingBox, FloodDataError};
use crate::tools::{self, ToolCommand, ToolRunner};

/// Everything one DEM run needs, resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DemJob {
    /// TNM products search endpoint.
    pub products_url: String,
    pub bounds: BoundingBox,
    pub query: ProductQuery,
    pub max_tiles: usize,
    pub work_dir: PathBuf,
    pub vrt_path: PathBuf,
    pub output: PathBuf,
}

impl DemJob {
    pub fn from_config(config: &DemConfig) -> Result<Self, FloodDataError> {
        let bounds = config.resolved_bounds()?;
        let work_dir = PathBuf::from(&config.work_dir);
        Ok(Self {
            products_url: tnm::TNM_PRODUCTS_URL.to_string(),
            bounds,
            query: ProductQuery {
                dataset: config.dataset.clone(),
                prod_format: config.prod_format.clone(),
                max_products: config.max_products,
            },
            max_tiles: config.max_tiles,
            vrt_path: work_dir.join(&config.vrt_name),
            output: work_dir.join(&config.output),
            work_dir,
        })
    }
}

#[derive(Debug, PartialEq)]
pub enum DemOutcome {
    /// The search returned nothing; there is nothing to merge.
    NoProducts,
    Written(PathBuf),
}

/// `gdalbuildvrt` over all tiles, then `gdal_translate` clipped to `bounds`.
pub fn merge_commands(bounds: &BoundingBox, tiles: &[PathBuf], vrt: &Path, output: &Path) -> Vec<ToolCommand> {
    let build_vrt = ToolCommand::new("gdalbuildvrt")
        .arg(path_arg(vrt))
        .args(tiles.iter().map(|t| path_arg(t)));

    let [ulx, uly, lrx, lry] = bounds.projwin();
    let translate = ToolCommand::new("gdal_translate")
        .arg("-projwin")
        .args([ulx, uly, lrx, lry].iter().map(|v| v.to_string()))
        .arg(path_arg(vrt))
        .arg(path_arg(output));

    vec![build_vrt, translate]
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Merge and clip the tiles, then remove the intermediates.
///
/// Intermediates are left in place when a tool fails so the failure can be
/// inspected.
pub fn merge_and_clip(
    runner: &mut dyn ToolRunner,
    bounds: &BoundingBox,
    tiles: &[PathBuf],
    vrt: &Path,
    output: &Path,
) -> Result<(), FloodDataError> {
    logging::info(DataSource::Gdal, None, &format!("Merging {} tiles...", tiles.len()));
    tools::run_all(runner, &merge_commands(bounds, tiles, vrt, output))?;

    logging::info(DataSource::System, None, "Cleaning up...");
    for path in std::iter::once(vrt).chain(tiles.iter().map(PathBuf::as_path)) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                logging::warn(DataSource::System, Some(&path_arg(path)), &format!("Could not remove: {}", e));
            }
        }
    }

    logging::info(DataSource::Gdal, None, &format!("✓ DEM saved as {}", output.display()));
    Ok(())
}

/// Run the whole download: search, fetch tiles, merge, clip.
pub fn run(
    client: &reqwest::blocking::Client,
    runner: &mut dyn ToolRunner,
    job: &DemJob,
) -> Result<DemOutcome, FloodDataError> {
    job.bounds.validate()?;
    std::fs::create_dir_all(&job.work_dir)?;

    logging::info(DataSource::Tnm, None, "Searching USGS National Map for DEM products...");
    let products = tnm::search_products_at(client, &job.products_url, &job.bounds, &job.query)?;
    if products.is_empty() {
        logging::warn(DataSource::Tnm, None, "No DEM products found");
        return Ok(DemOutcome::NoProducts);
    }
    logging::info(DataSource::Tnm, None, &format!("✓ Found {} DEM products", products.len()));

    let tiles = tnm::download_tiles(client, &products, job.max_tiles, &job.work_dir);
    if tiles.is_empty() {
        return Err(FloodDataError::NoTilesDownloaded);
    }

    merge_and_clip(runner, &job.bounds, &tiles, &job.vrt_path, &job.output)?;
    Ok(DemOutcome::Written(job.output.clone()))
}
