//! XLSX writer kernel that turns dataframes and row tables into workbook sheets.

use std::collections::BTreeSet;
use std::path::PathBuf;

use polars::prelude::{AnyValue, DataFrame};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetAnnotation, SpecXlsxFormats, SpecXlsxSheetReport, SpecXlsxSheetWriteOptions,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions, XlsxWriteError,
};
use crate::util::{
    cast_col_num, cast_row_num, convert_cell_value, derive_unique_sheet_name, estimate_width_len,
    sanitize_sheet_name, validate_unique_columns,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumColumnKind {
    Text,
    Integer,
    Decimal,
}

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::close`] is called; sheets
/// appear in the order they are written.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecXlsxFormats,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxSheetReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    pub fn new(
        path_file_out: PathBuf,
        formats: SpecXlsxFormats,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxSheetReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), XlsxWriteError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        debug!(
            file = %self.path_file_out.display(),
            sheets = self.l_reports.len(),
            "workbook saved"
        );
        Ok(())
    }

    /// Write one sheet from an in-memory dataframe.
    ///
    /// Column formats follow dtypes: integer columns use the integer preset,
    /// float columns the decimal preset, everything else text.
    pub fn write_sheet_from_dataframe(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<SpecXlsxSheetReport, XlsxWriteError> {
        let l_colnames: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();

        let l_kinds: Vec<EnumColumnKind> = df_data
            .get_columns()
            .iter()
            .map(|c_col| {
                let dtype = c_col.dtype();
                if dtype.is_integer() {
                    EnumColumnKind::Integer
                } else if dtype.is_numeric() {
                    EnumColumnKind::Decimal
                } else {
                    EnumColumnKind::Text
                }
            })
            .collect();

        let n_height = df_data.height();
        let mut l_rows = vec![Vec::with_capacity(l_colnames.len()); n_height];
        for c_col in df_data.get_columns() {
            for (n_idx_row, row) in l_rows.iter_mut().enumerate() {
                row.push(derive_cell_value_from_any_value(c_col.get(n_idx_row)?));
            }
        }

        self.write_table(&l_colnames, &l_rows, &l_kinds, sheet_name, options)
    }

    /// Write one sheet from a header and row-major cell values.
    ///
    /// Any text makes a column text; otherwise finite numbers decide between
    /// the integer and decimal presets.
    pub fn write_sheet_from_rows(
        &mut self,
        header: &[String],
        rows: &[Vec<EnumCellValue>],
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<SpecXlsxSheetReport, XlsxWriteError> {
        if let Some(n_idx_row) = rows.iter().position(|row| row.len() != header.len()) {
            return Err(XlsxWriteError::InvalidInput(format!(
                "row {n_idx_row} has {} cells, header has {}",
                rows[n_idx_row].len(),
                header.len()
            )));
        }
        let l_kinds = derive_column_kinds_from_rows(header.len(), rows);
        self.write_table(header, rows, &l_kinds, sheet_name, options)
    }

    fn write_table(
        &mut self,
        header: &[String],
        rows: &[Vec<EnumCellValue>],
        kinds: &[EnumColumnKind],
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<SpecXlsxSheetReport, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        validate_unique_columns(header)?;
        if rows.len() + 1 > N_NROWS_EXCEL_MAX {
            return Err(XlsxWriteError::InvalidInput(format!(
                "{} rows exceed the Excel sheet limit",
                rows.len()
            )));
        }
        if header.len() > N_NCOLS_EXCEL_MAX {
            return Err(XlsxWriteError::InvalidInput(format!(
                "{} columns exceed the Excel sheet limit",
                header.len()
            )));
        }

        let sheet_name_unique = derive_unique_sheet_name(
            &sanitize_sheet_name(sheet_name, "_"),
            &mut self.set_sheet_names_existing,
        );
        let mut report = SpecXlsxSheetReport {
            sheet_name: sheet_name_unique.clone(),
            n_rows: rows.len(),
            n_cols: header.len(),
            warnings: vec![],
        };
        if sheet_name_unique != sheet_name {
            report.warn(format!(
                "sheet name {sheet_name:?} written as {sheet_name_unique:?}"
            ));
        }

        let l_fmt_data_by_col: Vec<Format> = kinds
            .iter()
            .enumerate()
            .map(|(n_idx_col, kind)| {
                let fmt_base = match kind {
                    EnumColumnKind::Text => &self.formats.text,
                    EnumColumnKind::Integer => &self.formats.integer,
                    EnumColumnKind::Decimal => &self.formats.decimal,
                };
                match options.cols_fmt_overrides.get(&n_idx_col) {
                    Some(fmt_override) => derive_rust_xlsx_format(&fmt_base.merge(fmt_override)),
                    None => derive_rust_xlsx_format(fmt_base),
                }
            })
            .collect();
        let fmt_header = derive_rust_xlsx_format(&self.formats.header);
        let fmt_label = derive_rust_xlsx_format(&self.formats.label);
        let fmt_text = derive_rust_xlsx_format(&self.formats.text);
        let if_keep_missing_values = self.write_options.keep_missing_values;
        let value_policy = self.write_options.value_policy.clone();

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;
        if let Some(c_color) = &options.tab_color {
            worksheet.set_tab_color(c_color.as_str());
        }

        for (n_idx_col, c_name) in header.iter().enumerate() {
            worksheet.write_string_with_format(
                0,
                cast_col_num(n_idx_col)?,
                c_name,
                &fmt_header,
            )?;
        }

        let l_rows_converted: Vec<Vec<EnumCellValue>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|value| convert_cell_value(value, if_keep_missing_values, &value_policy))
                    .collect()
            })
            .collect();
        for (n_idx_row, row) in l_rows_converted.iter().enumerate() {
            for (n_idx_col, value) in row.iter().enumerate() {
                write_cell_with_format(
                    worksheet,
                    n_idx_row + 1,
                    n_idx_col,
                    value,
                    &l_fmt_data_by_col[n_idx_col],
                )?;
            }
        }

        worksheet.set_freeze_panes(1, 0)?;

        let l_width_by_col =
            derive_column_widths(header, &l_rows_converted, &options.policy_autofit);
        for (n_idx_col, n_width) in l_width_by_col.iter().enumerate() {
            worksheet.set_column_width(cast_col_num(n_idx_col)?, *n_width as f64)?;
        }

        if let Some(annotation) = &options.annotation {
            if annotation.col_start < header.len() {
                report.warn(format!(
                    "annotation column {} overlaps the table ({} columns)",
                    annotation.col_start,
                    header.len()
                ));
            }
            write_annotation(
                worksheet,
                annotation,
                &fmt_label,
                &fmt_text,
                if_keep_missing_values,
                &value_policy,
            )?;
        }

        debug!(sheet = %report.sheet_name, rows = report.n_rows, "sheet written");
        self.l_reports.push(report.clone());
        Ok(report)
    }
}

/// Final column widths: header text, plus body cells under
/// [`EnumAutofitColumnsRule::All`] up to `height_body_inferred_max` rows,
/// padded and clamped to the policy bounds.
fn derive_column_widths(
    header: &[String],
    rows: &[Vec<EnumCellValue>],
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Vec<usize> {
    let n_rows_autofit = match policy_autofit.rule_columns {
        EnumAutofitColumnsRule::All => policy_autofit
            .height_body_inferred_max
            .map_or(rows.len(), |n| usize::min(n, rows.len())),
        EnumAutofitColumnsRule::Header => 0,
    };
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));

    header
        .iter()
        .enumerate()
        .map(|(n_idx_col, c_name)| {
            let n_width_recorded = rows[..n_rows_autofit]
                .iter()
                .filter_map(|row| row.get(n_idx_col))
                .map(estimate_width_len)
                .fold(estimate_width_len(&EnumCellValue::String(c_name.clone())), usize::max);
            usize::min(
                n_max,
                usize::max(n_min, n_width_recorded + policy_autofit.width_cell_padding),
            )
        })
        .collect()
}

fn derive_column_kinds_from_rows(n_cols: usize, rows: &[Vec<EnumCellValue>]) -> Vec<EnumColumnKind> {
    (0..n_cols)
        .map(|n_idx_col| {
            let l_numbers: Vec<f64> = rows
                .iter()
                .filter_map(|row| match &row[n_idx_col] {
                    EnumCellValue::Number(n) if n.is_finite() => Some(*n),
                    _ => None,
                })
                .collect();
            let if_any_text = rows
                .iter()
                .any(|row| matches!(&row[n_idx_col], EnumCellValue::String(_)));
            if if_any_text || l_numbers.is_empty() {
                EnumColumnKind::Text
            } else if l_numbers.iter().all(|n| n.fract() == 0.0) {
                EnumColumnKind::Integer
            } else {
                EnumColumnKind::Decimal
            }
        })
        .collect()
}

fn write_annotation(
    worksheet: &mut Worksheet,
    annotation: &SpecSheetAnnotation,
    fmt_label: &Format,
    fmt_value: &Format,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> Result<(), XlsxWriteError> {
    let n_col_key = cast_col_num(annotation.col_start)?;
    let n_col_value = cast_col_num(annotation.col_start + 1)?;
    let mut n_width_key = 0usize;
    let mut n_width_value = 0usize;

    for (n_offset, (c_key, value_raw)) in annotation.items.iter().enumerate() {
        let n_row = cast_row_num(annotation.row_start + n_offset)?;
        worksheet.write_string_with_format(n_row, n_col_key, c_key, fmt_label)?;
        let value = convert_cell_value(value_raw, if_keep_missing_values, value_policy);
        write_cell_with_format(
            worksheet,
            annotation.row_start + n_offset,
            annotation.col_start + 1,
            &value,
            fmt_value,
        )?;
        n_width_key = usize::max(n_width_key, c_key.chars().count());
        n_width_value = usize::max(n_width_value, estimate_width_len(&value));
    }

    worksheet.set_column_width(n_col_key, (n_width_key + 2) as f64)?;
    worksheet.set_column_width(n_col_value, usize::max(10, n_width_value + 2) as f64)?;
    Ok(())
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxWriteError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    for c_align in [&spec.align, &spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(c_align) {
            format = format.set_align(align);
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, DataFrame};

    use super::*;
    use crate::conf::derive_default_xlsx_formats;

    fn create_writer(path: PathBuf) -> XlsxWriter {
        XlsxWriter::new(
            path,
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        )
    }

    #[test]
    fn writer_writes_dataframe_and_rows_sheets() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");
        let mut writer = create_writer(path_out.clone());

        let df = DataFrame::new(vec![
            Column::new("value".into(), vec![1.0_f64, 0.5]),
            Column::new("idx".into(), vec![1_i64, 2]),
        ])
        .expect("dataframe");
        let report = writer
            .write_sheet_from_dataframe(&df, "scan:01", &SpecXlsxSheetWriteOptions::default())
            .expect("write dataframe");
        assert_eq!(report.sheet_name, "scan_01");
        assert_eq!(report.n_rows, 2);
        assert_eq!(report.warnings.len(), 1);

        let header = vec!["name".to_string(), "ratio".to_string()];
        let rows = vec![
            vec![EnumCellValue::from("a"), EnumCellValue::from(90.0)],
            vec![EnumCellValue::from("b"), EnumCellValue::Number(f64::NAN)],
        ];
        let options = SpecXlsxSheetWriteOptions {
            tab_color: Some("#FF0000".to_string()),
            annotation: Some(SpecSheetAnnotation {
                row_start: 0,
                col_start: 4,
                items: vec![("date".to_string(), EnumCellValue::from("14.10.2026"))],
            }),
            ..Default::default()
        };
        writer
            .write_sheet_from_rows(&header, &rows, "Summary", &options)
            .expect("write rows");

        writer.close().expect("close");
        writer.close().expect("close is idempotent");
        assert!(path_out.exists());
        assert_eq!(writer.report().len(), 2);
    }

    #[test]
    fn writer_rejects_ragged_rows_and_writes_after_close() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut writer = create_writer(tmp.path().join("out.xlsx"));
        let header = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec![EnumCellValue::from(1.0)]];
        let err = writer
            .write_sheet_from_rows(&header, &rows, "s", &SpecXlsxSheetWriteOptions::default())
            .expect_err("ragged rows");
        assert!(matches!(err, XlsxWriteError::InvalidInput(_)));

        writer.close().expect("close");
        let err = writer
            .write_sheet_from_rows(&header, &[], "s", &SpecXlsxSheetWriteOptions::default())
            .expect_err("closed");
        assert!(matches!(err, XlsxWriteError::Closed));
    }

    #[test]
    fn body_cells_widen_columns_only_under_all_rule() {
        let header = vec!["Result".to_string(), "n".to_string()];
        let rows = vec![
            vec![EnumCellValue::from("Error (unknown step resolution)"), EnumCellValue::from(1.0)],
            vec![EnumCellValue::from("PASS"), EnumCellValue::from(2.0)],
        ];
        let policy_header = SpecAutofitCellsPolicy::default();
        assert_eq!(derive_column_widths(&header, &rows, &policy_header), vec![8, 8]);

        let policy_all = SpecAutofitCellsPolicy {
            rule_columns: EnumAutofitColumnsRule::All,
            ..Default::default()
        };
        assert_eq!(derive_column_widths(&header, &rows, &policy_all), vec![33, 8]);

        let policy_capped = SpecAutofitCellsPolicy {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(0),
            ..Default::default()
        };
        assert_eq!(derive_column_widths(&header, &rows, &policy_capped), vec![8, 8]);
    }

    #[test]
    fn column_kinds_inferred_from_rows() {
        let rows = vec![
            vec![EnumCellValue::from(1.0), EnumCellValue::from(1.5), EnumCellValue::from("x")],
            vec![EnumCellValue::None, EnumCellValue::from(2.0), EnumCellValue::from(3.0)],
        ];
        assert_eq!(
            derive_column_kinds_from_rows(3, &rows),
            vec![
                EnumColumnKind::Integer,
                EnumColumnKind::Decimal,
                EnumColumnKind::Text
            ]
        );
    }
}
