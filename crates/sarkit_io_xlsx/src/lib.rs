//! `sarkit_io_xlsx` v1:
//! Workbook writer kernel shared by the SAR batch jobs.
//!
//! Modules:
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : format/value/options models and errors
//! - `util`   : pure helper functions
//! - `writer` : stateful workbook writer
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_formats,
};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetAnnotation, SpecXlsxFormats, SpecXlsxSheetReport, SpecXlsxSheetWriteOptions,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions, XlsxWriteError,
};
pub use writer::XlsxWriter;
