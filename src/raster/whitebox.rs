//! WhiteboxTools command builders.
//!
//! Each function returns the `ToolCommand` for one WhiteboxTools tool. The
//! command line form is
//! `whitebox_tools --run=<Tool> --wd=<dir> --<param>=<value> ... -v`,
//! with file parameters relative to the working directory.

use std::path::Path;

use crate::tools::ToolCommand;

/// One WhiteboxTools call: the executable, working directory, and tool name.
#[derive(Debug, Clone)]
pub struct Whitebox {
    pub exe: String,
    pub work_dir: String,
}

impl Whitebox {
    pub fn new(exe: impl Into<String>, work_dir: &Path) -> Self {
        Self { exe: exe.into(), work_dir: work_dir.to_string_lossy().into_owned() }
    }

    fn tool(&self, name: &str, params: &[(&str, String)], flags: &[&str]) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.exe)
            .arg(format!("--run={}", name))
            .arg(format!("--wd={}", self.work_dir));
        for (key, value) in params {
            cmd = cmd.arg(format!("--{}={}", key, value));
        }
        for flag in flags {
            cmd = cmd.arg(format!("--{}", flag));
        }
        cmd.arg("-v")
    }

    pub fn fill_depressions(&self, dem: &str, output: &str) -> ToolCommand {
        self.tool(
            "FillDepressions",
            &[("dem", dem.to_string()), ("output", output.to_string())],
            &["fix_flats"],
        )
    }

    pub fn d8_pointer(&self, dem: &str, output: &str) -> ToolCommand {
        self.tool("D8Pointer", &[("dem", dem.to_string()), ("output", output.to_string())], &[])
    }

    pub fn d8_flow_accumulation(&self, input: &str, output: &str) -> ToolCommand {
        self.tool(
            "D8FlowAccumulation",
            &[
                ("input", input.to_string()),
                ("output", output.to_string()),
                ("out_type", "cells".to_string()),
            ],
            &[],
        )
    }

    pub fn extract_streams(&self, flow_accum: &str, output: &str, threshold: u32) -> ToolCommand {
        self.tool(
            "ExtractStreams",
            &[
                ("flow_accum", flow_accum.to_string()),
                ("output", output.to_string()),
                ("threshold", threshold.to_string()),
            ],
            &[],
        )
    }

    pub fn gaussian_filter(&self, input: &str, output: &str, sigma: f64) -> ToolCommand {
        self.tool(
            "GaussianFilter",
            &[("input", input.to_string()), ("output", output.to_string()), ("sigma", sigma.to_string())],
            &[],
        )
    }

    pub fn ln(&self, input: &str, output: &str) -> ToolCommand {
        self.tool("Ln", &[("input", input.to_string()), ("output", output.to_string())], &[])
    }

    pub fn standard_deviation_contrast_stretch(
        &self,
        input: &str,
        output: &str,
        stdev: f64,
        num_tones: u32,
    ) -> ToolCommand {
        self.tool(
            "StandardDeviationContrastStretch",
            &[
                ("input", input.to_string()),
                ("output", output.to_string()),
                ("stdev", stdev.to_string()),
                ("num_tones", num_tones.to_string()),
            ],
            &[],
        )
    }

    pub fn rescale_value_range(&self, input: &str, output: &str, out_min: f64, out_max: f64) -> ToolCommand {
        self.tool(
            "RescaleValueRange",
            &[
                ("input", input.to_string()),
                ("output", output.to_string()),
                ("out_min_val", out_min.to_string()),
                ("out_max_val", out_max.to_string()),
            ],
            &[],
        )
    }

    pub fn set_nodata_value(&self, input: &str, output: &str, back_value: f64) -> ToolCommand {
        self.tool(
            "SetNodataValue",
            &[
                ("input", input.to_string()),
                ("output", output.to_string()),
                ("back_value", back_value.to_string()),
            ],
            &[],
        )
    }

    pub fn raster_to_vector_polygons(&self, input: &str, output: &str) -> ToolCommand {
        self.tool(
            "RasterToVectorPolygons",
            &[("input", input.to_string()), ("output", output.to_string())],
            &[],
        )
    }
}
