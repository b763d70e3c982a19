//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecXlsxFormats};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Build the default format presets used by [`crate::writer::XlsxWriter`].
pub fn derive_default_xlsx_formats() -> SpecXlsxFormats {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    SpecXlsxFormats {
        text: cfg_base_fmt_spec.clone(),
        header: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            border: Some(1),
            text_wrap: Some(true),
            ..Default::default()
        }),
        integer: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            ..Default::default()
        }),
        decimal: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0.000000".to_string()),
            ..Default::default()
        }),
        label: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            bg_color: Some("#DDEBF7".to_string()),
            ..Default::default()
        }),
    }
}
