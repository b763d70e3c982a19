//! Zoom-scan data model, classification options and errors.

use std::fmt;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use sarkit_io_xlsx::XlsxWriteError;
use serde::Deserialize;
use thiserror::Error;

use crate::conf::{
    N_DISTANCE_TOLERANCE_FACTOR, N_MIN_DISTANCE_RATIO, N_PEAK_RATIO_THRESHOLD,
    TUP_KNOWN_RESOLUTIONS_M,
};

////////////////////////////////////////////////////////////////////////////////
// #region GridModel

/// One sampled grid location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecMeasurementPoint {
    /// Field quantity, e.g. SAR in W/kg.
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Points of one zoom scan in scan order plus the export's nominal grid constants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecGrid {
    pub points: Vec<SpecMeasurementPoint>,
    pub nominal_x_spacing: f64,
    pub nominal_y_spacing: f64,
}

/// Maximum-value point of a grid; ties resolve to the first in scan order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecPeakInfo {
    pub peak_value: f64,
    pub peak_point: SpecMeasurementPoint,
    pub peak_index: usize,
}

/// Inferred step size of one grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecStepSize {
    /// Difference of the first differing pair of rounded y-coordinates.
    pub raw_step: f64,
    /// `raw_step` after snapping/rounding.
    pub rounded_step: f64,
    /// Whether `rounded_step` is an accepted device resolution.
    pub is_known_resolution: bool,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Verdict

/// Outcome of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumVerdict {
    /// Step size or data prevents a meaningful evaluation.
    Error,
    /// A point more than 3 dB down sits within one step of the peak.
    Fail,
    Pass,
}

impl EnumVerdict {
    /// Title-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Error => "Error",
        }
    }

    /// Upper-case tag used in the log file.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for EnumVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a scan was classified as [`EnumVerdict::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumVerdictReason {
    /// Fewer than two distinct rounded y-coordinates.
    DegenerateGrid,
    /// Peak value is zero (or not positive), ratios are undefined.
    ZeroPeak,
    /// Step size is not in the accepted set.
    UnknownResolution,
}

impl fmt::Display for EnumVerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DegenerateGrid => "degenerate grid",
            Self::ZeroPeak => "zero peak value",
            Self::UnknownResolution => "unknown step resolution",
        })
    }
}

/// Everything the classifier derives from one grid.
///
/// Values that cannot be computed for the grid are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecClassificationReport {
    pub peak: Option<SpecPeakInfo>,
    pub step: Option<SpecStepSize>,
    /// `M2 / M1 * 100`, M2 being the scan-order successor of the peak.
    pub adjacent_ratio_pct: Option<f64>,
    /// Distance from the peak to the nearest point below the minimum-distance ratio.
    pub min_distance_mm: Option<f64>,
    pub needs_remeasurement: bool,
    pub verdict: EnumVerdict,
    pub reason: Option<EnumVerdictReason>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Classification thresholds; every field falls back to the calibrated default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecClassifyOptions {
    /// Accepted step sizes in meters.
    pub known_resolutions: Vec<f64>,
    /// Ratio to peak at or below which a nearby point forces re-measurement.
    pub peak_ratio_threshold: f64,
    /// The proximity check accepts distances below `step * (1 + factor)`.
    pub distance_tolerance_factor: f64,
    /// Ratio to peak below which a point enters the minimum-distance search.
    pub min_distance_ratio: f64,
    /// Adjacent ratio (percent) below which re-measurement is also required.
    pub adjacent_ratio_min_pct: Option<f64>,
    /// Restrict distance checks to points in the peak's z-layer; off checks every point.
    pub if_peak_layer_only: bool,
}

impl Default for SpecClassifyOptions {
    fn default() -> Self {
        Self {
            known_resolutions: TUP_KNOWN_RESOLUTIONS_M.to_vec(),
            peak_ratio_threshold: N_PEAK_RATIO_THRESHOLD,
            distance_tolerance_factor: N_DISTANCE_TOLERANCE_FACTOR,
            min_distance_ratio: N_MIN_DISTANCE_RATIO,
            adjacent_ratio_min_pct: None,
            if_peak_layer_only: false,
        }
    }
}

impl SpecClassifyOptions {
    /// Reject thresholds that make the classification meaningless.
    pub fn validate(&self) -> Result<(), ZoomError> {
        if self.known_resolutions.is_empty() {
            return Err(ZoomError::InvalidOptions(
                "known_resolutions must not be empty.".to_string(),
            ));
        }
        if let Some(n_bad) = self
            .known_resolutions
            .iter()
            .find(|n| !n.is_finite() || **n <= 0.0)
        {
            return Err(ZoomError::InvalidOptions(format!(
                "known_resolutions must be positive, got {n_bad}."
            )));
        }
        if !(self.peak_ratio_threshold > 0.0 && self.peak_ratio_threshold < 1.0) {
            return Err(ZoomError::InvalidOptions(
                "peak_ratio_threshold must be in (0, 1).".to_string(),
            ));
        }
        if !(self.min_distance_ratio > 0.0 && self.min_distance_ratio < 1.0) {
            return Err(ZoomError::InvalidOptions(
                "min_distance_ratio must be in (0, 1).".to_string(),
            ));
        }
        if !(self.distance_tolerance_factor >= 0.0) {
            return Err(ZoomError::InvalidOptions(
                "distance_tolerance_factor must be >= 0.".to_string(),
            ));
        }
        if let Some(n_pct) = self.adjacent_ratio_min_pct
            && !(0.0..=100.0).contains(&n_pct)
        {
            return Err(ZoomError::InvalidOptions(
                "adjacent_ratio_min_pct must be in [0, 100].".to_string(),
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Zoom-scan import/setup failures.
///
/// Classification outcomes are never errors; see [`EnumVerdictReason`].
#[derive(Debug, Error)]
pub enum ZoomError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: no `Grid:` header line, export SAR fields with headers enabled", path.display())]
    MissingGridHeader { path: PathBuf },
    #[error("{}: malformed grid header {line:?}", path.display())]
    InvalidGridHeader { path: PathBuf, line: String },
    #[error("{}: no numeric data rows", path.display())]
    NoDataRows { path: PathBuf },
    #[error("invalid export pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid classification options: {0}")]
    InvalidOptions(String),
    #[error("dataframe error: {0}")]
    Dataframe(#[from] PolarsError),
    #[error(transparent)]
    Workbook(#[from] XlsxWriteError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
