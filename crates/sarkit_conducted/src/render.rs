//! Terminal rendering and workbook output of conducted maxima.

use std::fmt::Write as _;
use std::path::Path;

use sarkit_io_xlsx::{
    EnumCellValue, SpecXlsxSheetReport, SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions,
    XlsxWriter, derive_default_xlsx_formats,
};
use tracing::info;

use crate::spec::{ConductedError, SpecBandMaxima};

/// Output table header.
pub const L_MAXIMA_HEADER: [&str; 8] = [
    "LTE Band",
    "Channel Type",
    "Channel #",
    "Modulation",
    "BW",
    "RB Size",
    "RB Start",
    "Power(dBm)",
];
/// Default sheet name of the maxima table.
pub const C_MAXIMA_SHEET_NAME: &str = "Conducted maximums";

fn round_power(n_power: f64) -> f64 {
    (n_power * 100.0).round() / 100.0
}

fn format_power(n_power: f64) -> String {
    let n_rounded = round_power(n_power);
    if n_rounded.fract() == 0.0 {
        format!("{n_rounded:.1}")
    } else {
        format!("{n_rounded}")
    }
}

fn derive_cell_from_field(value: &str) -> EnumCellValue {
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => EnumCellValue::Number(n),
        _ => EnumCellValue::from(value),
    }
}

/// Per-band blocks of `"<channel type>: <power> dBm"` lines.
pub fn render_band_maxima(maxima: &[SpecBandMaxima]) -> String {
    let mut text = String::new();
    for band in maxima {
        let _ = writeln!(text, "Band {}\n----------------------", band.band);
        for row in &band.rows {
            let _ = writeln!(
                text,
                "{}: {} dBm",
                row.channel_type_text,
                format_power(row.power_dbm)
            );
        }
        text.push('\n');
    }
    text
}

fn derive_maxima_rows(maxima: &[SpecBandMaxima]) -> Vec<Vec<EnumCellValue>> {
    maxima
        .iter()
        .flat_map(|band| {
            band.rows.iter().map(|row| {
                vec![
                    derive_cell_from_field(&band.band),
                    row.channel_type_text.as_str().into(),
                    derive_cell_from_field(&row.channel),
                    row.modulation.as_str().into(),
                    derive_cell_from_field(&row.bandwidth),
                    derive_cell_from_field(&row.rb_size),
                    derive_cell_from_field(&row.rb_start),
                    round_power(row.power_dbm).into(),
                ]
            })
        })
        .collect()
}

/// Write the maxima table to a one-sheet workbook.
pub fn write_band_maxima_workbook(
    path_file_out: &Path,
    maxima: &[SpecBandMaxima],
) -> Result<SpecXlsxSheetReport, ConductedError> {
    let mut writer = XlsxWriter::new(
        path_file_out.to_path_buf(),
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );
    let l_header: Vec<String> = L_MAXIMA_HEADER.iter().map(ToString::to_string).collect();
    let report = writer.write_sheet_from_rows(
        &l_header,
        &derive_maxima_rows(maxima),
        C_MAXIMA_SHEET_NAME,
        &SpecXlsxSheetWriteOptions::default(),
    )?;
    writer.close()?;
    info!(file = %path_file_out.display(), n_rows = report.n_rows, "conducted maxima written");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::spec::{EnumChannelType, SpecConductedRow};

    fn create_row(channel_type_text: &str, power_dbm: f64) -> SpecConductedRow {
        SpecConductedRow {
            band: "2".to_string(),
            bandwidth: "20".to_string(),
            rb_size: "1".to_string(),
            rb_start: "0".to_string(),
            modulation: "QPSK".to_string(),
            channel_type: EnumChannelType::parse(channel_type_text).expect("channel type"),
            channel_type_text: channel_type_text.to_string(),
            channel: "18700".to_string(),
            frequency: "1860".to_string(),
            power_dbm,
        }
    }

    fn create_maxima() -> Vec<SpecBandMaxima> {
        vec![SpecBandMaxima {
            band: "2".to_string(),
            rows: vec![
                create_row("LOW CH", 23.456),
                create_row("Mid CH", 22.8),
                create_row("high ch", 23.0),
            ],
        }]
    }

    #[test]
    fn renders_band_blocks_with_source_channel_text() {
        let text = render_band_maxima(&create_maxima());
        assert_eq!(
            text,
            "Band 2\n----------------------\nLOW CH: 23.46 dBm\nMid CH: 22.8 dBm\nhigh ch: 23.0 dBm\n\n"
        );
    }

    #[test]
    fn rows_keep_numeric_fields_numeric() {
        let l_rows = derive_maxima_rows(&create_maxima());
        assert_eq!(l_rows.len(), 3);
        assert_eq!(l_rows[0][0], EnumCellValue::Number(2.0));
        assert_eq!(l_rows[0][1], EnumCellValue::from("LOW CH"));
        assert_eq!(l_rows[2][1], EnumCellValue::from("high ch"));
        assert_eq!(l_rows[0][3], EnumCellValue::from("QPSK"));
        assert_eq!(l_rows[0][7], EnumCellValue::Number(23.46));
    }

    #[test]
    fn writes_single_sheet_workbook() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("conducted.xlsx");
        let report = write_band_maxima_workbook(&path, &create_maxima()).expect("workbook");
        assert!(path.exists());
        assert_eq!(report.sheet_name, C_MAXIMA_SHEET_NAME);
        assert_eq!(report.n_rows, 3);
        assert_eq!(report.n_cols, 8);
    }
}
