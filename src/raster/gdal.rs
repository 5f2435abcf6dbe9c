//! Value-range reclassification of a rescaled raster.
//!
//! The influence raster is rescaled to a fixed range (1 to 4) and then cut
//! into equal-width classes by direct pixel-value thresholding. `ReclassBins`
//! defines the class edges; the same edges are rendered as a `gdal_calc.py`
//! expression so GDAL does the pixel work and keeps the source projection and
//! geotransform.

use std::path::Path;

use crate::model::FloodDataError;
use crate::tools::ToolCommand;

/// Output value for pixels outside every class; also the nodata value.
pub const NODATA_CLASS: u8 = 0;

/// Equal-width classes over `[min, max]`.
///
/// Class `i` (1-based) covers `(min + (i-1)*w, min + i*w]`, except the first
/// class which is closed on both ends so that `min` itself is classified.
#[derive(Debug, Clone, PartialEq)]
pub struct ReclassBins {
    min: f64,
    max: f64,
    num_classes: u8,
}

impl ReclassBins {
    pub fn new(min: f64, max: f64, num_classes: u32) -> Result<Self, FloodDataError> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(FloodDataError::InvalidConfig(format!(
                "reclass range must satisfy min < max, got {}..{}",
                min, max
            )));
        }
        let num_classes = u8::try_from(num_classes)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                FloodDataError::InvalidConfig(format!(
                    "number of classes must be between 1 and 255, got {}",
                    num_classes
                ))
            })?;
        Ok(Self { min, max, num_classes })
    }

    pub fn num_classes(&self) -> u8 {
        self.num_classes
    }

    /// `(lower, upper)` edges of every class in order.
    pub fn edges(&self) -> Vec<(f64, f64)> {
        let interval = (self.max - self.min) / f64::from(self.num_classes);
        (0..self.num_classes)
            .map(|i| {
                let lower = self.min + f64::from(i) * interval;
                let upper = self.min + f64::from(i + 1) * interval;
                (lower, upper)
            })
            .collect()
    }

    /// Class for a single pixel value; `NODATA_CLASS` when out of range.
    pub fn classify(&self, value: f64) -> u8 {
        for (i, (lower, upper)) in self.edges().into_iter().enumerate() {
            let above_lower = if i == 0 { value >= lower } else { value > lower };
            if above_lower && value <= upper {
                return i as u8 + 1;
            }
        }
        NODATA_CLASS
    }

    /// `gdal_calc.py` expression over band `A` equivalent to `classify`.
    ///
    /// Classes are disjoint, so a sum of masked class numbers yields exactly
    /// one class per pixel, or 0.
    pub fn calc_expression(&self) -> String {
        self.edges()
            .into_iter()
            .enumerate()
            .map(|(i, (lower, upper))| {
                let op = if i == 0 { ">=" } else { ">" };
                format!("(A{}{})*(A<={})*{}", op, lower, upper, i + 1)
            })
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// `gdal_calc.py` invocation writing a Byte raster with nodata 0.
pub fn reclassify_command(gdal_calc: &str, bins: &ReclassBins, input: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new(gdal_calc)
        .arg("-A")
        .arg(input.to_string_lossy())
        .arg(format!("--outfile={}", output.to_string_lossy()))
        .arg(format!("--calc={}", bins.calc_expression()))
        .arg("--type=Byte")
        .arg(format!("--NoDataValue={}", NODATA_CLASS))
        .arg("--overwrite")
        .arg("--quiet")
}
