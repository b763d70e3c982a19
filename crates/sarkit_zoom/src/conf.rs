//! Calibrated constants of the zoom-scan evaluation.

/// Accepted zoom-scan step sizes in meters.
pub const TUP_KNOWN_RESOLUTIONS_M: [f64; 3] = [0.0075, 0.004, 0.005];
/// Ratio to peak at or below which a point is more than 3 dB down (10^(-3/10)).
pub const N_PEAK_RATIO_THRESHOLD: f64 = 0.501187;
/// Relative slack added to the step size in the proximity check.
pub const N_DISTANCE_TOLERANCE_FACTOR: f64 = 0.1;
/// Ratio to peak below which a point enters the minimum-distance search.
pub const N_MIN_DISTANCE_RATIO: f64 = 0.5;

/// Exclusive lower bound of the raw-step window snapped to 7.5 mm.
pub const N_SNAP_WINDOW_LOW_M: f64 = 0.0065;
/// Exclusive upper bound of the raw-step window snapped to 7.5 mm.
pub const N_SNAP_WINDOW_HIGH_M: f64 = 0.009;
/// Step size reported for raw steps inside the snap window.
pub const N_SNAP_STEP_M: f64 = 0.0075;

/// Decimals kept when rounding coordinates relative to the first point.
pub const N_COORD_ROUND_DIGITS: i32 = 3;
/// Decimals kept when rounding a step outside the snap window.
pub const N_STEP_ROUND_DIGITS: i32 = 4;
/// Absolute tolerance for step-size membership in the known set.
pub const N_RESOLUTION_EPS: f64 = 1e-9;

/// Header lines preceding the column-name row of a SEMCAD export.
pub const N_EXPORT_HEADER_LINES: usize = 4;
/// Column separator of SEMCAD export data rows.
pub const C_FIELD_SEPARATOR: &str = "\t\t";
/// Field marker SEMCAD writes for a missing value.
pub const C_MISSING_FIELD: &str = "--";
/// Default glob for export discovery.
pub const C_EXPORT_PATTERN_DEFAULT: &str = "*.txt";

/// Default output workbook file name.
pub const C_WORKBOOK_FILE_DEFAULT: &str = "results.xlsx";
/// Default log file name; never picked up as an export.
pub const C_LOG_FILE_DEFAULT: &str = "log.txt";
/// Name of the summary sheet.
pub const C_SUMMARY_SHEET_NAME: &str = "Summary";

/// Tab color of sheets whose scan failed.
pub const C_TAB_COLOR_FAIL: &str = "#FF0000";
/// Tab color of sheets whose scan has a step-size or data error.
pub const C_TAB_COLOR_ERROR: &str = "#FFFB00";

/// Measurement sheet column names.
pub const COL_VALUE: &str = "SAR [W/kg]";
pub const COL_X: &str = "X(m)";
pub const COL_Y: &str = "Y(m)";
pub const COL_Z: &str = "Z(m)";
pub const COL_X_ROUNDED: &str = "X rounded (m)";
pub const COL_Y_ROUNDED: &str = "Y rounded (m)";
pub const COL_RATIO_TO_PEAK: &str = "Ratio to peak";
pub const COL_DISTANCE_TO_PEAK_MM: &str = "Distance to peak (mm)";
