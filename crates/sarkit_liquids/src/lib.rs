//! `sarkit_liquids` v1:
//! Tissue-simulating liquid targets and measurements at the device frequencies.
//!
//! Modules:
//! - `conf`        : file defaults, sheet columns and table headers
//! - `spec`        : frequency table, liquid sheet, interpolated points, errors
//! - `read`        : workbook reading and liquid workbook discovery
//! - `interpolate` : linear interpolation between bracketing measurement rows
//! - `batch`       : per-directory orchestration
//! - `render`      : terminal lines and results workbook
pub mod batch;
pub mod conf;
pub mod interpolate;
pub mod read;
pub mod render;
pub mod spec;

pub use batch::{
    SpecLiquidFailure, SpecLiquidRecord, SpecLiquidsBatch, SpecLiquidsRunOptions, run_liquids_batch,
};
pub use interpolate::{derive_liquid_point, derive_liquid_points};
pub use read::{discover_liquid_workbooks, read_frequency_table, read_liquid_sheet};
pub use render::{SpecTissueInfo, render_liquids_summary, write_liquids_workbook};
pub use spec::{
    EnumLiquidQuantity, LiquidsError, SpecFrequencyTable, SpecLiquidPoint, SpecLiquidRow,
    SpecLiquidSheet,
};
