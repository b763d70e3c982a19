//! Frequency table and liquid workbook reading.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use globset::Glob;
use tracing::{debug, info};

use crate::conf::{C_EXCEL_LOCK_PREFIX, C_FREQUENCY_TABLE_SHEET, C_LIQUID_PATTERN, N_COL_FREQUENCY};
use crate::spec::{
    EnumLiquidQuantity, LiquidsError, SpecFrequencyTable, SpecLiquidRow, SpecLiquidSheet,
};

////////////////////////////////////////////////////////////////////////////////
// #region Cells

fn convert_data_to_f64(value: &Data) -> Option<f64> {
    let n_value = match value {
        Data::Float(n) => *n,
        Data::Int(n) => *n as f64,
        Data::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n_value.is_finite().then_some(n_value)
}

fn convert_data_to_label(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(n) if n.fract() == 0.0 => format!("{n:.0}"),
        other => other.to_string(),
    }
}

/// Cell of `row` at absolute column `n_col`; ranges start at the first used cell.
fn get_cell<'a>(row: &'a [Data], n_col: usize, n_col_start: usize) -> Option<&'a Data> {
    n_col.checked_sub(n_col_start).and_then(|n| row.get(n))
}

fn open_xlsx(path: &Path) -> Result<Xlsx<BufReader<File>>, LiquidsError> {
    open_workbook(path).map_err(|e| LiquidsError::Workbook {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_sheet_range(
    workbook: &mut Xlsx<BufReader<File>>,
    path: &Path,
    c_sheet: &str,
) -> Result<Range<Data>, LiquidsError> {
    workbook
        .worksheet_range(c_sheet)
        .map_err(|e| LiquidsError::Workbook {
            path: path.to_path_buf(),
            source: e,
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reading

/// Read the band columns of the frequency table.
///
/// Row 1 holds band names, the cells below the device frequencies. Blank and
/// non-numeric cells are skipped. `Sheet1` is used when present, otherwise the
/// first sheet.
pub fn read_frequency_table(path: &Path) -> Result<SpecFrequencyTable, LiquidsError> {
    let mut workbook = open_xlsx(path)?;
    let l_sheet_names = workbook.sheet_names();
    let c_sheet = if l_sheet_names.iter().any(|s| s == C_FREQUENCY_TABLE_SHEET) {
        C_FREQUENCY_TABLE_SHEET.to_string()
    } else {
        let c_first = l_sheet_names.first().cloned().ok_or_else(|| LiquidsError::MissingSheet {
            path: path.to_path_buf(),
            sheet: C_FREQUENCY_TABLE_SHEET.to_string(),
        })?;
        debug!(file = %path.display(), sheet = %c_first, "no Sheet1, using first sheet");
        c_first
    };
    let range = read_sheet_range(&mut workbook, path, &c_sheet)?;

    let mut iter_rows = range.rows();
    let Some(l_header) = iter_rows.next() else {
        return Ok(SpecFrequencyTable::default());
    };
    let l_body: Vec<&[Data]> = iter_rows.collect();

    let mut bands = Vec::new();
    for (n_idx_col, cell) in l_header.iter().enumerate() {
        let c_band = convert_data_to_label(cell);
        if c_band.is_empty() {
            continue;
        }
        let l_freqs: Vec<f64> = l_body
            .iter()
            .filter_map(|row| row.get(n_idx_col).and_then(convert_data_to_f64))
            .collect();
        bands.push((c_band, l_freqs));
    }
    info!(file = %path.display(), n_bands = bands.len(), "frequency table read");
    Ok(SpecFrequencyTable { bands })
}

/// Read the measurement rows of a liquid workbook's first sheet.
///
/// Rows whose column `A` is not a number are skipped; quantities are taken
/// from their fixed columns and left `None` when blank. Rows are sorted by
/// frequency.
pub fn read_liquid_sheet(path: &Path) -> Result<SpecLiquidSheet, LiquidsError> {
    let mut workbook = open_xlsx(path)?;
    let c_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LiquidsError::MissingSheet {
            path: path.to_path_buf(),
            sheet: "first".to_string(),
        })?;
    let range = read_sheet_range(&mut workbook, path, &c_sheet)?;
    let n_col_start = range.start().map_or(0, |(_, n_col)| n_col as usize);

    let mut rows: Vec<SpecLiquidRow> = range
        .rows()
        .filter_map(|row| {
            let frequency =
                get_cell(row, N_COL_FREQUENCY, n_col_start).and_then(convert_data_to_f64)?;
            let values = EnumLiquidQuantity::ALL.map(|quantity| {
                get_cell(row, quantity.n_col(), n_col_start).and_then(convert_data_to_f64)
            });
            Some(SpecLiquidRow { frequency, values })
        })
        .collect();
    if rows.is_empty() {
        return Err(LiquidsError::NoLiquidRows {
            path: path.to_path_buf(),
        });
    }
    rows.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(file = %path.display(), sheet = %c_sheet, n_rows = rows.len(), "liquid sheet read");
    Ok(SpecLiquidSheet {
        path: path.to_path_buf(),
        filename,
        rows,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Discovery

/// List liquid workbooks directly under `dir_input`, sorted by file name.
///
/// Excel lock files and the names in `names_excluded` are skipped.
pub fn discover_liquid_workbooks(
    dir_input: &Path,
    names_excluded: &[String],
) -> Result<Vec<PathBuf>, LiquidsError> {
    let glob_liquid = Glob::new(C_LIQUID_PATTERN)
        .map_err(|e| LiquidsError::InvalidPattern(e.to_string()))?
        .compile_matcher();

    let map_io = |e: std::io::Error| LiquidsError::Io {
        path: dir_input.to_path_buf(),
        source: e,
    };
    let mut l_paths = Vec::new();
    for entry in fs::read_dir(dir_input).map_err(map_io)? {
        let entry = entry.map_err(map_io)?;
        if !entry.file_type().map_err(map_io)?.is_file() {
            continue;
        }
        let c_name = entry.file_name().to_string_lossy().into_owned();
        if c_name.starts_with(C_EXCEL_LOCK_PREFIX)
            || names_excluded.contains(&c_name)
            || !glob_liquid.is_match(&c_name)
        {
            continue;
        }
        l_paths.push(entry.path());
    }
    l_paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(l_paths)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_abs_diff_eq;
    use sarkit_io_xlsx::{
        EnumCellValue, SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions, XlsxWriter,
        derive_default_xlsx_formats,
    };
    use tempfile::tempdir;

    use super::*;

    fn create_workbook(path: &Path, sheet: &str, header: &[String], rows: &[Vec<EnumCellValue>]) {
        let mut writer = XlsxWriter::new(
            path.to_path_buf(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions {
                keep_missing_values: false,
                ..Default::default()
            },
        );
        writer
            .write_sheet_from_rows(header, rows, sheet, &SpecXlsxSheetWriteOptions::default())
            .expect("write sheet");
        writer.close().expect("close");
    }

    /// Bands `LTE 2` (1850, 1880, 1910) and `LTE 5` (824, 836.5, gap).
    pub(crate) fn create_frequency_table(path: &Path) {
        let header = vec!["LTE 2".to_string(), "LTE 5".to_string()];
        let rows = vec![
            vec![EnumCellValue::from(1850.0), EnumCellValue::from(824.0)],
            vec![EnumCellValue::from(1880.0), EnumCellValue::from(836.5)],
            vec![EnumCellValue::from(1910.0), EnumCellValue::None],
        ];
        create_workbook(path, C_FREQUENCY_TABLE_SHEET, &header, &rows);
    }

    /// Liquid sheet with quantities in their fixed columns, `A`..`U`.
    pub(crate) fn create_liquid_workbook(path: &Path, l_rows: &[(f64, [f64; 6])]) {
        let header: Vec<String> = (b'A'..=b'U').map(|c| (c as char).to_string()).collect();
        let rows: Vec<Vec<EnumCellValue>> = l_rows
            .iter()
            .map(|(n_freq, l_values)| {
                let mut row = vec![EnumCellValue::None; header.len()];
                row[N_COL_FREQUENCY] = EnumCellValue::from(*n_freq);
                for (quantity, n_value) in EnumLiquidQuantity::ALL.into_iter().zip(l_values) {
                    row[quantity.n_col()] = EnumCellValue::from(*n_value);
                }
                row
            })
            .collect();
        create_workbook(path, "Measurement", &header, &rows);
    }

    /// Head liquid around 1800-2000 MHz.
    pub(crate) fn create_head_liquid(path: &Path) {
        create_liquid_workbook(
            path,
            &[
                (1900.0, [40.0, 1.40, 39.2, 1.44, -2.0, 2.86]),
                (1800.0, [40.0, 1.40, 39.6, 1.38, -1.0, -1.43]),
                (2000.0, [40.0, 1.40, 38.8, 1.50, -3.0, 7.14]),
            ],
        );
    }

    #[test]
    fn frequency_table_skips_gaps() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("frequency table.xlsx");
        create_frequency_table(&path);

        let table = read_frequency_table(&path).expect("table");
        assert_eq!(table.band_names(), vec!["LTE 2", "LTE 5"]);
        assert_eq!(table.frequencies("LTE 2"), Some(&[1850.0, 1880.0, 1910.0][..]));
        assert_eq!(table.frequencies("LTE 5"), Some(&[824.0, 836.5][..]));
        assert_eq!(table.frequencies("LTE 7"), None);
    }

    #[test]
    fn liquid_rows_are_positional_and_sorted() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("head_1900.xlsx");
        create_head_liquid(&path);

        let sheet = read_liquid_sheet(&path).expect("sheet");
        assert_eq!(sheet.filename, "head_1900.xlsx");
        let l_freqs: Vec<f64> = sheet.rows.iter().map(|r| r.frequency).collect();
        assert_eq!(l_freqs, vec![1800.0, 1900.0, 2000.0]);
        assert_abs_diff_eq!(
            sheet.rows[1].get(EnumLiquidQuantity::Permittivity).expect("e'"),
            39.2
        );
        assert_abs_diff_eq!(
            sheet.rows[1].get(EnumLiquidQuantity::ConductivityDelta).expect("delta"),
            2.86
        );
    }

    #[test]
    fn workbook_without_numeric_rows_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.xlsx");
        create_liquid_workbook(&path, &[]);
        let err = read_liquid_sheet(&path).expect_err("no rows");
        assert!(matches!(err, LiquidsError::NoLiquidRows { .. }));
    }

    #[test]
    fn unreadable_workbook_names_the_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, "not a workbook").expect("write");
        let err = read_liquid_sheet(&path).expect_err("broken");
        assert!(matches!(err, LiquidsError::Workbook { .. }));
        assert!(err.to_string().contains("broken.xlsx"));
    }

    #[test]
    fn discovery_skips_lock_files_and_excluded_names() {
        let dir = tempdir().expect("tempdir");
        for c_name in [
            "b_liquid.xlsx",
            "a_liquid.xlsx",
            "~$a_liquid.xlsx",
            "frequency table.xlsx",
            "notes.txt",
        ] {
            fs::write(dir.path().join(c_name), "").expect("write");
        }
        let l_paths =
            discover_liquid_workbooks(dir.path(), &["frequency table.xlsx".to_string()])
                .expect("discover");
        let l_names: Vec<String> = l_paths
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(l_names, vec!["a_liquid.xlsx", "b_liquid.xlsx"]);
    }
}
