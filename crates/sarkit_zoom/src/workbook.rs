//! Results workbook: `Summary` sheet first, then one measurement sheet per scan.

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::{Column, DataFrame, PolarsError};
use sarkit_io_xlsx::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetAnnotation, SpecXlsxSheetReport, SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions,
    XlsxWriter, derive_default_xlsx_formats,
};
use tracing::{info, warn};

use crate::classify::derive_rounded_coordinates;
use crate::conf::{
    C_SUMMARY_SHEET_NAME, COL_DISTANCE_TO_PEAK_MM, COL_RATIO_TO_PEAK, COL_VALUE, COL_X,
    COL_X_ROUNDED, COL_Y, COL_Y_ROUNDED, COL_Z,
};
use crate::report::{SpecBatchReport, SpecScanRecord};
use crate::spec::ZoomError;

/// Zero-based column of the key/value block on measurement sheets (`J`).
const N_COL_ANNOTATION: usize = 9;

const L_SUMMARY_HEADER: [&str; 5] = [
    "Filename",
    "Horizontal Grid Step [mm]",
    "Minimum Distance [mm]",
    "M2/M1 Ratio [%]",
    "Result",
];

fn create_num_format(c_format: &str) -> SpecCellFormat {
    SpecCellFormat {
        num_format: Some(c_format.to_string()),
        align: Some("right".to_string()),
        ..Default::default()
    }
}

fn derive_measurement_frame(record: &SpecScanRecord) -> Result<DataFrame, PolarsError> {
    let l_points = &record.export.grid.points;
    let peak = record
        .report
        .peak
        .filter(|p| p.peak_value > 0.0 && p.peak_value.is_finite());

    let l_ratio: Vec<Option<f64>> = l_points
        .iter()
        .map(|point| peak.map(|p| point.value / p.peak_value))
        .collect();
    let l_distance_mm: Vec<Option<f64>> = l_points
        .iter()
        .map(|point| {
            record.report.peak.map(|p| {
                (point.x - p.peak_point.x).hypot(point.y - p.peak_point.y) * 1000.0
            })
        })
        .collect();

    DataFrame::new(vec![
        Column::new(COL_VALUE.into(), l_points.iter().map(|p| p.value).collect::<Vec<f64>>()),
        Column::new(COL_X.into(), l_points.iter().map(|p| p.x).collect::<Vec<f64>>()),
        Column::new(COL_Y.into(), l_points.iter().map(|p| p.y).collect::<Vec<f64>>()),
        Column::new(COL_Z.into(), l_points.iter().map(|p| p.z).collect::<Vec<f64>>()),
        Column::new(
            COL_X_ROUNDED.into(),
            derive_rounded_coordinates(l_points.iter().map(|p| p.x)),
        ),
        Column::new(
            COL_Y_ROUNDED.into(),
            derive_rounded_coordinates(l_points.iter().map(|p| p.y)),
        ),
        Column::new(COL_RATIO_TO_PEAK.into(), l_ratio),
        Column::new(COL_DISTANCE_TO_PEAK_MM.into(), l_distance_mm),
    ])
}

fn derive_measurement_annotation(record: &SpecScanRecord) -> SpecSheetAnnotation {
    let report = &record.report;
    let c_flag = if report.needs_remeasurement { "Yes" } else { "No" };
    SpecSheetAnnotation {
        row_start: 1,
        col_start: N_COL_ANNOTATION,
        items: vec![
            (
                "MAX Value of SAR [W/kg]".to_string(),
                report.peak.map(|p| p.peak_value).into(),
            ),
            (
                "Row of MAX value".to_string(),
                report.peak.map(|p| p.peak_index + 2).into(),
            ),
            (
                "Row of M2".to_string(),
                report
                    .peak
                    .filter(|p| p.peak_index + 1 < record.export.grid.points.len())
                    .map(|p| p.peak_index + 3)
                    .into(),
            ),
            ("Raw step (m)".to_string(), report.step.map(|s| s.raw_step).into()),
            ("Step size (m)".to_string(), report.step.map(|s| s.rounded_step).into()),
            (
                "Known resolution".to_string(),
                report.step.map(|s| s.is_known_resolution).into(),
            ),
            ("M2/M1 Ratio [%]".to_string(), report.adjacent_ratio_pct.into()),
            ("Minimum distance [mm]".to_string(), report.min_distance_mm.into()),
            ("Re-measurement needed".to_string(), c_flag.into()),
            ("Grid X".to_string(), record.export.grid.nominal_x_spacing.into()),
            ("Grid Y".to_string(), record.export.grid.nominal_y_spacing.into()),
            ("filename".to_string(), record.display_name().into()),
            ("Result".to_string(), record.result_label().into()),
        ],
    }
}

fn derive_summary_rows(batch: &SpecBatchReport) -> Vec<Vec<EnumCellValue>> {
    let mut l_records: Vec<&SpecScanRecord> = batch.records.iter().collect();
    l_records.sort_by(|a, b| a.display_name().cmp(b.display_name()));
    l_records
        .into_iter()
        .map(|record| {
            vec![
                record.display_name().into(),
                record.step_mm().into(),
                record.min_distance_mm_display().into(),
                record.ratio_pct_display().into(),
                record.result_label().into(),
            ]
        })
        .collect()
}

/// Write the results workbook; `c_date` is shown beside the summary table.
pub fn write_results_workbook(
    path_file_out: &Path,
    batch: &SpecBatchReport,
    c_date: &str,
) -> Result<Vec<SpecXlsxSheetReport>, ZoomError> {
    let mut writer = XlsxWriter::new(
        path_file_out.to_path_buf(),
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );

    let l_header: Vec<String> = L_SUMMARY_HEADER.iter().map(ToString::to_string).collect();
    let cfg_summary = SpecXlsxSheetWriteOptions {
        policy_autofit: SpecAutofitCellsPolicy {
            rule_columns: EnumAutofitColumnsRule::All,
            ..Default::default()
        },
        cols_fmt_overrides: BTreeMap::from([
            (1, create_num_format("0.0")),
            (2, create_num_format("0.00")),
            (3, create_num_format("0.0")),
        ]),
        annotation: Some(SpecSheetAnnotation {
            row_start: 0,
            col_start: L_SUMMARY_HEADER.len() + 1,
            items: vec![("Date".to_string(), c_date.into())],
        }),
        ..Default::default()
    };
    writer.write_sheet_from_rows(
        &l_header,
        &derive_summary_rows(batch),
        C_SUMMARY_SHEET_NAME,
        &cfg_summary,
    )?;

    let mut l_records: Vec<&SpecScanRecord> = batch.records.iter().collect();
    l_records.sort_by(|a, b| a.filename().cmp(b.filename()));
    for record in l_records {
        let df_sheet = derive_measurement_frame(record)?;
        let cfg_sheet = SpecXlsxSheetWriteOptions {
            tab_color: record.tab_color().map(ToString::to_string),
            annotation: Some(derive_measurement_annotation(record)),
            ..Default::default()
        };
        let report = writer.write_sheet_from_dataframe(&df_sheet, record.filename(), &cfg_sheet)?;
        for c_warning in &report.warnings {
            warn!(file = %record.export.path.display(), "{c_warning}");
        }
    }

    writer.close()?;
    let l_reports = writer.report();
    info!(
        file = %path_file_out.display(),
        sheets = l_reports.len(),
        "results workbook written"
    );
    Ok(l_reports)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::classify::classify;
    use crate::import::SpecScanExport;
    use crate::spec::{SpecClassifyOptions, SpecGrid, SpecMeasurementPoint};

    fn create_record(c_filename: &str, l_values: &[f64], n_step: f64) -> SpecScanRecord {
        let l_points: Vec<SpecMeasurementPoint> = l_values
            .iter()
            .enumerate()
            .map(|(n_idx, v)| SpecMeasurementPoint {
                value: *v,
                x: (n_idx % 2) as f64 * n_step,
                y: (n_idx / 2) as f64 * n_step,
                z: 0.0,
            })
            .collect();
        let grid = SpecGrid {
            points: l_points,
            nominal_x_spacing: 7.5,
            nominal_y_spacing: 5.0,
        };
        let report = classify(&grid, &SpecClassifyOptions::default());
        SpecScanRecord {
            export: SpecScanExport {
                path: c_filename.into(),
                filename: c_filename.to_string(),
                display_name: c_filename.trim_end_matches(".txt").to_string(),
                grid,
                n_rows_missing: 0,
                n_rows_dropped: 0,
            },
            report,
        }
    }

    #[test]
    fn writes_summary_then_sorted_scan_sheets() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("results.xlsx");
        let batch = SpecBatchReport {
            records: vec![
                create_record("zeta.txt", &[1.0, 0.9, 0.3, 0.2], 0.0075),
                create_record("alpha.txt", &[1.0, 0.9, 0.8, 0.7], 0.005),
                create_record("mid.txt", &[1.0, 0.9, 0.8, 0.7], 0.006),
            ],
            failures: vec![],
        };

        let l_reports = write_results_workbook(&path, &batch, "14.10.2026").expect("workbook");

        assert!(path.exists());
        let l_names: Vec<&str> = l_reports.iter().map(|r| r.sheet_name.as_str()).collect();
        assert_eq!(l_names, vec!["Summary", "alpha.txt", "mid.txt", "zeta.txt"]);
        assert_eq!(l_reports[0].n_rows, 3);
        assert_eq!(l_reports[1].n_rows, 4);
        assert_eq!(l_reports[1].n_cols, 8);
        assert!(l_reports.iter().all(|r| r.warnings.is_empty()));
    }

    #[test]
    fn summary_rows_carry_rounded_values() {
        let batch = SpecBatchReport {
            records: vec![create_record("b.txt", &[1.0, 0.9, 0.3, 0.2], 0.0075)],
            failures: vec![],
        };
        let l_rows = derive_summary_rows(&batch);
        assert_eq!(l_rows[0][0], EnumCellValue::from("b"));
        assert_eq!(l_rows[0][1], EnumCellValue::Number(7.5));
        assert_eq!(l_rows[0][2], EnumCellValue::Number(7.5));
        assert_eq!(l_rows[0][3], EnumCellValue::Number(90.0));
        assert_eq!(l_rows[0][4], EnumCellValue::from("Fail"));
    }

    #[test]
    fn zero_peak_sheet_leaves_ratio_column_empty() {
        let record = create_record("zero.txt", &[0.0, 0.0, 0.0, 0.0], 0.005);
        let df_sheet = derive_measurement_frame(&record).expect("frame");
        assert_eq!(df_sheet.height(), 4);
        let c_ratio = df_sheet.column(COL_RATIO_TO_PEAK).expect("ratio column");
        assert_eq!(c_ratio.null_count(), 4);
    }
}
