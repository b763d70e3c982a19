//! `sarkit_zoom` v1:
//! SAR zoom-scan step-size inference and Pass/Fail/Error classification.
//!
//! Modules:
//! - `conf`     : calibrated constants and column names
//! - `spec`     : data model, options, errors
//! - `classify` : pure classifier over one grid
//! - `import`   : SEMCAD export parsing and discovery
//! - `batch`    : per-directory orchestration
//! - `report`   : verdict records, log and terminal rendering
//! - `workbook` : results workbook emission
pub mod batch;
pub mod classify;
pub mod conf;
pub mod import;
pub mod report;
pub mod spec;
pub mod workbook;

pub use batch::{SpecZoomRunOptions, run_zoom_batch};
pub use classify::{classify, derive_rounded_coordinates, infer_step_size, locate_peak};
pub use import::{SpecExportParser, SpecScanExport, discover_exports};
pub use report::{SpecBatchReport, SpecImportFailure, SpecScanRecord, render_log_text,
    render_terminal_summary};
pub use spec::{
    EnumVerdict, EnumVerdictReason, SpecClassificationReport, SpecClassifyOptions, SpecGrid,
    SpecMeasurementPoint, SpecPeakInfo, SpecStepSize, ZoomError,
};
pub use workbook::write_results_workbook;
