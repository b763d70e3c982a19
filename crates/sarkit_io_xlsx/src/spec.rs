//! Shared XLSX format, option and report models.

use std::collections::BTreeMap;

use polars::prelude::PolarsError;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormat

/// Cell format; `None` fields inherit from the base preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
        }
    }
}

/// Named preset bundle consumed by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxFormats {
    /// Text cells.
    pub text: SpecCellFormat,
    /// Header row cells.
    pub header: SpecCellFormat,
    /// Integer-typed columns.
    pub integer: SpecCellFormat,
    /// Float-typed columns.
    pub decimal: SpecCellFormat,
    /// Key cells of an annotation block.
    pub label: SpecCellFormat,
}

/// Normalized cell value during conversion/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        EnumCellValue::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        EnumCellValue::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        EnumCellValue::Number(value)
    }
}

impl From<usize> for EnumCellValue {
    fn from(value: usize) -> Self {
        EnumCellValue::Number(value as f64)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        EnumCellValue::Boolean(value)
    }
}

impl<T> From<Option<T>> for EnumCellValue
where
    T: Into<EnumCellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(EnumCellValue::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Value conversion policy for missing/NaN/Inf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Replacement text for missing value when keep-missing is enabled.
    pub missing_value_str: String,
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: "--".to_string(),
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
        }
    }
}

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from both header and body cells.
    All,
}

/// Autofit policy for per-sheet write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            height_body_inferred_max: Some(2_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options controlling value conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Value conversion policy.
    pub value_policy: SpecXlsxValuePolicy,
    /// Keep missing/NaN/Inf as text instead of blank.
    pub keep_missing_values: bool,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            value_policy: SpecXlsxValuePolicy::default(),
            keep_missing_values: true,
        }
    }
}

/// Key/value block written beside a table.
///
/// Keys land in `col_start`, values in `col_start + 1`, starting at `row_start`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetAnnotation {
    /// Zero-based first row.
    pub row_start: usize,
    /// Zero-based key column.
    pub col_start: usize,
    /// Ordered `(key, value)` items.
    pub items: Vec<(String, EnumCellValue)>,
}

/// Per-sheet call options; the header row is always frozen.
#[derive(Default, Debug, Clone)]
pub struct SpecXlsxSheetWriteOptions {
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Worksheet tab color (`"#RRGGBB"`).
    pub tab_color: Option<String>,
    /// Per-column format patches merged over the inferred preset.
    pub cols_fmt_overrides: BTreeMap<usize, SpecCellFormat>,
    /// Optional key/value block beside the table.
    pub annotation: Option<SpecSheetAnnotation>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportAndErrors

/// What one `write_sheet_*` call produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxSheetReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Body rows written (header excluded).
    pub n_rows: usize,
    /// Table columns written.
    pub n_cols: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Workbook write failures.
#[derive(Debug, Error)]
pub enum XlsxWriteError {
    /// Writer already flushed to disk.
    #[error("cannot write after close()")]
    Closed,
    /// Propagated `rust_xlsxwriter` failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
    /// Failed to access a dataframe cell.
    #[error("failed to access dataframe value: {0}")]
    Dataframe(#[from] PolarsError),
    /// Caller-supplied table violates a precondition.
    #[error("{0}")]
    InvalidInput(String),
    /// Row/column index does not fit Excel's index types.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow {
        /// `"row"` or `"column"`.
        axis: &'static str,
        /// Offending zero-based index.
        value: usize,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
