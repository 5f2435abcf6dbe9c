//! Subprocess sequencing for the DEM merge and the hydrology pipeline.
//!
//! A recording `ToolRunner` stands in for GDAL and WhiteboxTools, so these
//! run without either installed.

use std::fs;
use std::path::{Path, PathBuf};

use phoenix_flood::config::HydrologyConfig;
use phoenix_flood::dem;
use phoenix_flood::model::FloodDataError;
use phoenix_flood::raster::hydrology::{self, HydrologyJob};
use phoenix_flood::regions::MARICOPA_BOUNDS;
use phoenix_flood::tools::{ToolCommand, ToolRunner};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Records every command; fails the command at `fail_at` (0-based), if set.
#[derive(Default)]
struct RecordingRunner {
    commands: Vec<ToolCommand>,
    fail_at: Option<usize>,
}

impl RecordingRunner {
    fn failing_at(index: usize) -> Self {
        Self { commands: Vec::new(), fail_at: Some(index) }
    }

    fn tool_names(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| {
                c.args
                    .iter()
                    .find_map(|a| a.strip_prefix("--run=").map(String::from))
                    .unwrap_or_else(|| c.program.clone())
            })
            .collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&mut self, cmd: &ToolCommand) -> Result<(), FloodDataError> {
        let index = self.commands.len();
        self.commands.push(cmd.clone());
        if self.fail_at == Some(index) {
            return Err(FloodDataError::ToolFailed { program: cmd.program.clone(), status: Some(1) });
        }
        Ok(())
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("phoenix_flood_tools_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn hydrology_job(dir: &Path) -> HydrologyJob {
    let dem = dir.join("dem.tif");
    fs::write(&dem, b"not really a tiff").unwrap();
    let config = HydrologyConfig {
        dem: dem.to_string_lossy().into_owned(),
        output_dir: dir.join("tiles").to_string_lossy().into_owned(),
        ..HydrologyConfig::default()
    };
    HydrologyJob::from_config(&config)
}

// ---------------------------------------------------------------------------
// Hydrology
// ---------------------------------------------------------------------------

#[test]
fn test_hydrology_runs_every_step_in_order() {
    let dir = scratch_dir("hydro_ok");
    let job = hydrology_job(&dir);
    let mut runner = RecordingRunner::default();

    let outputs = hydrology::run(&mut runner, &job).unwrap();

    assert_eq!(
        runner.tool_names(),
        vec![
            "FillDepressions",
            "D8Pointer",
            "D8FlowAccumulation",
            "ExtractStreams",
            "GaussianFilter",
            "Ln",
            "StandardDeviationContrastStretch",
            "RescaleValueRange",
            "gdal_calc.py",
            "SetNodataValue",
            "RasterToVectorPolygons",
        ]
    );
    assert!(dir.join("tiles").is_dir());
    assert_eq!(outputs.vector, dir.join("tiles").join(hydrology::INFLUENCE_VECTOR));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_hydrology_stops_at_first_failing_step() {
    let dir = scratch_dir("hydro_fail");
    let job = hydrology_job(&dir);
    let mut runner = RecordingRunner::failing_at(3);

    let err = hydrology::run(&mut runner, &job).unwrap_err();

    assert!(matches!(err, FloodDataError::ToolFailed { .. }));
    assert_eq!(runner.commands.len(), 4);
    assert_eq!(runner.tool_names().last().unwrap(), "ExtractStreams");

    let _ = fs::remove_dir_all(&dir);
}

// ---------------------------------------------------------------------------
// DEM merge
// ---------------------------------------------------------------------------

#[test]
fn test_merge_removes_intermediates_on_success() {
    let dir = scratch_dir("merge_ok");
    let tiles = vec![dir.join("tile_a.tif"), dir.join("tile_b.tif")];
    for t in &tiles {
        fs::write(t, b"tile").unwrap();
    }
    let vrt = dir.join("temp_maricopa.vrt");
    fs::write(&vrt, b"vrt").unwrap();
    let mut runner = RecordingRunner::default();

    dem::merge_and_clip(&mut runner, &MARICOPA_BOUNDS, &tiles, &vrt, &dir.join("dem.tif")).unwrap();

    assert_eq!(runner.tool_names(), vec!["gdalbuildvrt", "gdal_translate"]);
    assert!(!vrt.exists());
    assert!(tiles.iter().all(|t| !t.exists()));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_merge_keeps_tiles_when_vrt_build_fails() {
    let dir = scratch_dir("merge_fail");
    let tiles = vec![dir.join("tile_a.tif")];
    fs::write(&tiles[0], b"tile").unwrap();
    let mut runner = RecordingRunner::failing_at(0);

    let result = dem::merge_and_clip(
        &mut runner,
        &MARICOPA_BOUNDS,
        &tiles,
        &dir.join("temp.vrt"),
        &dir.join("dem.tif"),
    );

    assert!(result.is_err());
    assert_eq!(runner.commands.len(), 1);
    assert!(tiles[0].exists());

    let _ = fs::remove_dir_all(&dir);
}
