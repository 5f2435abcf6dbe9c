//! Water accumulation analysis over the Maricopa DEM.
//!
//! Drives the WhiteboxTools pipeline that turns a DEM into a stream
//! influence raster, reclassifies the result into a few flood-intensity
//! classes, and vectorizes the classes into polygons for the web map.
//!
//! The pipeline is planned up front as a list of `ToolCommand`s and then run
//! in order; the first failing step aborts the run.

use std::path::{Path, PathBuf};

use crate::config::HydrologyConfig;
use crate::logging::{self, DataSource};
use crate::model::FloodDataError;
use crate::raster::gdal::{self, ReclassBins};
use crate::raster::whitebox::Whitebox;
use crate::tools::{ToolCommand, ToolRunner};

pub const FILLED_DEM: &str = "filled_dem.tif";
pub const FLOW_DIR: &str = "flow_dir.tif";
pub const FLOW_ACCUM: &str = "flow_accum.tif";
pub const STREAMS: &str = "streams.tif";
pub const INFLUENCE: &str = "stream_influence.tif";
pub const INFLUENCE_RECLASS: &str = "stream_influence_reclass.tif";
pub const INFLUENCE_VECTOR: &str = "stream_influence_reclass.shp";

/// Value range the influence raster is rescaled to before classification.
pub const RESCALE_MIN: f64 = 1.0;
pub const RESCALE_MAX: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HydrologyParams {
    pub flow_accum_threshold: u32,
    pub max_influence_distance: f64,
    pub stdev: f64,
    pub num_tones: u32,
    pub num_classes: u32,
}

impl HydrologyParams {
    /// Gaussian smoothing width for the influence raster.
    pub fn sigma(&self) -> f64 {
        self.max_influence_distance / 4.0
    }
}

impl From<&HydrologyConfig> for HydrologyParams {
    fn from(config: &HydrologyConfig) -> Self {
        Self {
            flow_accum_threshold: config.flow_accum_threshold,
            max_influence_distance: config.max_influence_distance,
            stdev: config.stdev,
            num_tones: config.num_tones,
            num_classes: config.num_classes,
        }
    }
}

/// One step of the plan, labelled for progress output.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub label: String,
    pub command: ToolCommand,
}

impl Step {
    fn new(label: impl Into<String>, command: ToolCommand) -> Self {
        Self { label: label.into(), command }
    }
}

/// Paths of every artifact the pipeline writes.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrologyOutputs {
    pub filled_dem: PathBuf,
    pub flow_dir: PathBuf,
    pub flow_accum: PathBuf,
    pub streams: PathBuf,
    pub influence: PathBuf,
    pub reclassified: PathBuf,
    pub vector: PathBuf,
}

impl HydrologyOutputs {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            filled_dem: dir.join(FILLED_DEM),
            flow_dir: dir.join(FLOW_DIR),
            flow_accum: dir.join(FLOW_ACCUM),
            streams: dir.join(STREAMS),
            influence: dir.join(INFLUENCE),
            reclassified: dir.join(INFLUENCE_RECLASS),
            vector: dir.join(INFLUENCE_VECTOR),
        }
    }
}

/// Everything one hydrology run needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct HydrologyJob {
    pub dem: PathBuf,
    pub output_dir: PathBuf,
    pub whitebox: String,
    pub gdal_calc: String,
    pub params: HydrologyParams,
}

impl HydrologyJob {
    pub fn from_config(config: &HydrologyConfig) -> Self {
        Self {
            dem: PathBuf::from(&config.dem),
            output_dir: PathBuf::from(&config.output_dir),
            whitebox: config.whitebox.clone(),
            gdal_calc: config.gdal_calc.clone(),
            params: HydrologyParams::from(config),
        }
    }

    pub fn outputs(&self) -> HydrologyOutputs {
        HydrologyOutputs::in_dir(&self.output_dir)
    }

    /// The full ordered list of tool invocations.
    ///
    /// WhiteboxTools resolves file names against `--wd`, so intermediates
    /// are named relative to the output directory and the DEM is passed as
    /// an absolute path when possible.
    pub fn plan(&self) -> Result<Vec<Step>, FloodDataError> {
        let p = &self.params;
        let bins = ReclassBins::new(RESCALE_MIN, RESCALE_MAX, p.num_classes)?;
        let wbt = Whitebox::new(&self.whitebox, &self.output_dir);
        let dem = std::path::absolute(&self.dem).unwrap_or_else(|_| self.dem.clone());
        let dem = dem.to_string_lossy();
        let out = self.outputs();

        Ok(vec![
            Step::new("Filling depressions", wbt.fill_depressions(&dem, FILLED_DEM)),
            Step::new("Calculating flow direction", wbt.d8_pointer(FILLED_DEM, FLOW_DIR)),
            Step::new("Calculating flow accumulation", wbt.d8_flow_accumulation(FILLED_DEM, FLOW_ACCUM)),
            Step::new(
                format!("Extracting streams with threshold {}", p.flow_accum_threshold),
                wbt.extract_streams(FLOW_ACCUM, STREAMS, p.flow_accum_threshold),
            ),
            Step::new("Calculating stream influence", wbt.gaussian_filter(FLOW_ACCUM, INFLUENCE, p.sigma())),
            Step::new("Calculating natural log of stream influence", wbt.ln(INFLUENCE, INFLUENCE)),
            Step::new(
                "Calculating standard deviation contrast stretch",
                wbt.standard_deviation_contrast_stretch(INFLUENCE, INFLUENCE, p.stdev, p.num_tones),
            ),
            Step::new(
                "Rescaling influence",
                wbt.rescale_value_range(INFLUENCE, INFLUENCE, RESCALE_MIN, RESCALE_MAX),
            ),
            Step::new(
                format!("Reclassifying influence into {} classes", bins.num_classes()),
                gdal::reclassify_command(&self.gdal_calc, &bins, &out.influence, &out.reclassified),
            ),
            // Class 1 (lowest influence) becomes background so it is not
            // vectorized.
            Step::new(
                "Setting background value",
                wbt.set_nodata_value(INFLUENCE_RECLASS, INFLUENCE_RECLASS, RESCALE_MIN),
            ),
            Step::new(
                "Converting to vector format",
                wbt.raster_to_vector_polygons(INFLUENCE_RECLASS, INFLUENCE_VECTOR),
            ),
        ])
    }
}

/// Run the whole pipeline and return the artifact paths.
pub fn run(runner: &mut dyn ToolRunner, job: &HydrologyJob) -> Result<HydrologyOutputs, FloodDataError> {
    if !job.dem.is_file() {
        return Err(FloodDataError::Io(format!("DEM not found: {}", job.dem.display())));
    }
    std::fs::create_dir_all(&job.output_dir)?;

    let steps = job.plan()?;
    let total = steps.len();
    logging::info(
        DataSource::Whitebox,
        None,
        &format!(
            "Starting water accumulation analysis (threshold {}, influence distance {})",
            job.params.flow_accum_threshold, job.params.max_influence_distance
        ),
    );

    for (i, step) in steps.iter().enumerate() {
        logging::info(step.command.source(), None, &format!("[{}/{}] {}...", i + 1, total, step.label));
        runner.run(&step.command).inspect_err(|e| {
            logging::error(step.command.source(), Some(&step.label), &e.to_string());
        })?;
    }

    let outputs = job.outputs();
    logging::info(
        DataSource::System,
        None,
        &format!("✓ Analysis complete! Vector output: {}", outputs.vector.display()),
    );
    Ok(outputs)
}
