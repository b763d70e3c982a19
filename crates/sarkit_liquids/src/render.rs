//! Terminal lines and results workbook of a liquid batch.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use sarkit_io_xlsx::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecXlsxSheetReport, SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions, XlsxWriter,
    derive_default_xlsx_formats,
};
use tracing::info;

use crate::batch::SpecLiquidsBatch;
use crate::conf::{
    C_REPORT_SHEET_NAME, C_SEARCH_FREQUENCY_HEADER, C_TISSUE_TYPE_DEFAULT, L_REPORT_HEADER,
    N_REPORT_ROUND_DIGITS, N_TISSUE_TEMP_DEFAULT_C,
};
use crate::spec::{EnumLiquidQuantity, LiquidsError};

/// Tissue description repeated on every report row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTissueInfo {
    pub tissue_type: String,
    pub temp_c: f64,
}

impl Default for SpecTissueInfo {
    fn default() -> Self {
        Self {
            tissue_type: C_TISSUE_TYPE_DEFAULT.to_string(),
            temp_c: N_TISSUE_TEMP_DEFAULT_C,
        }
    }
}

fn round_report_value(n_value: f64) -> f64 {
    let n_scale = 10f64.powi(N_REPORT_ROUND_DIGITS);
    (n_value * n_scale).round() / n_scale
}

/// `"<file> done"` per record, then `"ERROR: <reason>"` per failure.
pub fn render_liquids_summary(batch: &SpecLiquidsBatch) -> String {
    let mut text = String::new();
    for record in &batch.records {
        let _ = writeln!(text, "{} done", record.filename);
    }
    for failure in &batch.failures {
        let _ = writeln!(text, "ERROR: {}", failure.message);
    }
    text
}

fn derive_report_rows(
    batch: &SpecLiquidsBatch,
    tissue: &SpecTissueInfo,
    c_date: &str,
) -> Vec<Vec<EnumCellValue>> {
    batch
        .records
        .iter()
        .flat_map(|record| record.points.iter())
        .map(|point| {
            let mut row: Vec<EnumCellValue> = vec![
                c_date.into(),
                tissue.tissue_type.as_str().into(),
                tissue.temp_c.into(),
                point.frequency.into(),
            ];
            row.extend(EnumLiquidQuantity::ALL.iter().map(|quantity| {
                EnumCellValue::from(round_report_value(point.get(*quantity)))
            }));
            row
        })
        .collect()
}

/// Write the report sheet, then one interpolation sheet per liquid workbook.
pub fn write_liquids_workbook(
    path_file_out: &Path,
    batch: &SpecLiquidsBatch,
    tissue: &SpecTissueInfo,
    c_date: &str,
) -> Result<Vec<SpecXlsxSheetReport>, LiquidsError> {
    let mut writer = XlsxWriter::new(
        path_file_out.to_path_buf(),
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );

    let l_header: Vec<String> = L_REPORT_HEADER.iter().map(ToString::to_string).collect();
    let fmt_two_decimals = SpecCellFormat {
        num_format: Some("0.00".to_string()),
        ..Default::default()
    };
    let cfg_report = SpecXlsxSheetWriteOptions {
        policy_autofit: SpecAutofitCellsPolicy {
            rule_columns: EnumAutofitColumnsRule::All,
            ..Default::default()
        },
        cols_fmt_overrides: (4..L_REPORT_HEADER.len())
            .map(|n_idx_col| (n_idx_col, fmt_two_decimals.clone()))
            .collect::<BTreeMap<_, _>>(),
        ..Default::default()
    };
    writer.write_sheet_from_rows(
        &l_header,
        &derive_report_rows(batch, tissue, c_date),
        C_REPORT_SHEET_NAME,
        &cfg_report,
    )?;

    let mut l_search_header = vec![C_SEARCH_FREQUENCY_HEADER.to_string()];
    l_search_header.extend(EnumLiquidQuantity::ALL.iter().map(|q| q.label().to_string()));
    for record in &batch.records {
        let l_rows: Vec<Vec<EnumCellValue>> = record
            .points
            .iter()
            .map(|point| {
                std::iter::once(EnumCellValue::from(point.frequency))
                    .chain(
                        EnumLiquidQuantity::ALL
                            .iter()
                            .map(|q| EnumCellValue::from(point.get(*q))),
                    )
                    .collect()
            })
            .collect();
        let c_sheet = record
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| record.filename.clone());
        writer.write_sheet_from_rows(
            &l_search_header,
            &l_rows,
            &c_sheet,
            &SpecXlsxSheetWriteOptions::default(),
        )?;
    }

    writer.close()?;
    let l_reports = writer.report();
    info!(
        file = %path_file_out.display(),
        sheets = l_reports.len(),
        "liquids workbook written"
    );
    Ok(l_reports)
}
