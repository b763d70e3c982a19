//! Stateless helper utilities used by the XLSX writer kernel.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{EnumCellValue, SpecXlsxValuePolicy, XlsxWriteError};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; return `None` for finite values.
pub(crate) fn convert_nan_inf_to_str(
    x: f64,
    value_policy: &SpecXlsxValuePolicy,
) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    None
}

/// Normalize a cell value before it reaches the worksheet.
///
/// Non-finite numbers and missing values become policy text when
/// `if_keep_missing_values`, otherwise blanks.
pub fn convert_cell_value(
    value: &EnumCellValue,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None => {
            if if_keep_missing_values {
                EnumCellValue::String(value_policy.missing_value_str.clone())
            } else {
                EnumCellValue::None
            }
        }
        EnumCellValue::Number(n) => match convert_nan_inf_to_str(*n, value_policy) {
            None => EnumCellValue::Number(*n),
            Some(txt) if if_keep_missing_values => EnumCellValue::String(txt),
            Some(_) => EnumCellValue::None,
        },
        EnumCellValue::String(s) => EnumCellValue::String(s.clone()),
        EnumCellValue::Boolean(b) => EnumCellValue::Boolean(*b),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), XlsxWriteError> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {:?}", l_pos.len(), l_pos))
        .collect::<Vec<_>>()
        .join("; ");

    Err(XlsxWriteError::InvalidInput(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{n:.0}").len()
            } else {
                format!("{n:.6}").len()
            }
        }
        EnumCellValue::Boolean(b) => {
            if *b {
                4
            } else {
                5
            }
        }
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Reserve `name` in `set_existing`, suffixing `__2`, `__3`, ... on collision.
///
/// Excel compares sheet names case-insensitively, so the set stores lowercase keys.
pub fn derive_unique_sheet_name(name: &str, set_existing: &mut BTreeSet<String>) -> String {
    if set_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 4))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if set_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IndexCasting

pub(crate) fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value).map_err(|_| XlsxWriteError::IndexOverflow { axis: "row", value })
}

pub(crate) fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value).map_err(|_| XlsxWriteError::IndexOverflow {
        axis: "column",
        value,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
