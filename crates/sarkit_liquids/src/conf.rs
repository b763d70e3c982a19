//! Liquid job defaults and sheet layout.

/// Frequency table workbook expected in the input directory.
pub const C_FREQUENCY_TABLE_FILE_DEFAULT: &str = "frequency table.xlsx";
/// Sheet of the frequency table holding one column per band.
pub const C_FREQUENCY_TABLE_SHEET: &str = "Sheet1";
/// Default results workbook name.
pub const C_LIQUIDS_WORKBOOK_DEFAULT: &str = "liquids.xlsx";
/// Prefix of the lock files Excel keeps beside open workbooks.
pub const C_EXCEL_LOCK_PREFIX: &str = "~$";
/// Glob of liquid workbook candidates.
pub const C_LIQUID_PATTERN: &str = "*.xlsx";

/// Tissue type written into every report row.
pub const C_TISSUE_TYPE_DEFAULT: &str = "WB Head";
/// Tissue temperature in °C written into every report row.
pub const N_TISSUE_TEMP_DEFAULT_C: f64 = 22.0;
/// Decimals kept in the report table.
pub const N_REPORT_ROUND_DIGITS: i32 = 2;

/// Zero-based column of the measured frequency (`A`) on a liquid sheet.
pub const N_COL_FREQUENCY: usize = 0;

/// Name of the report sheet.
pub const C_REPORT_SHEET_NAME: &str = "Liquids";

/// Report table header.
pub const L_REPORT_HEADER: [&str; 10] = [
    "Date",
    "Tissue Type",
    "Tissue Temp [\u{00B0}C]",
    "Frequency [MHz]",
    "Dielectric Constant [\u{03B5}] Target",
    "Conductivity \u{03C3} [S/m] Target",
    "Dielectric Constant [\u{03B5}]",
    "Conductivity \u{03C3} [S/m]",
    "\u{03B5} (%)",
    "\u{03C3} (%)",
];

/// Frequency column header of the per-file interpolation sheets.
pub const C_SEARCH_FREQUENCY_HEADER: &str = "Freq";
