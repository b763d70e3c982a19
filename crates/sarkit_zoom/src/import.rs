//! SEMCAD zoom-scan export parsing and directory discovery.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, warn};

use crate::conf::{
    C_EXPORT_PATTERN_DEFAULT, C_FIELD_SEPARATOR, C_LOG_FILE_DEFAULT, C_MISSING_FIELD,
    N_EXPORT_HEADER_LINES,
};
use crate::spec::{SpecGrid, SpecMeasurementPoint, ZoomError};

const N_LINE_PROGRAM: usize = 2;
const N_LINE_GRID: usize = 3;
const N_FIELDS_POINT: usize = 4;

////////////////////////////////////////////////////////////////////////////////
// #region ExportModel

/// One parsed export file.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecScanExport {
    pub path: PathBuf,
    /// File name including extension.
    pub filename: String,
    /// Program segment of the project path, file stem when absent.
    pub display_name: String,
    pub grid: SpecGrid,
    /// Data rows skipped for a `--` or empty field.
    pub n_rows_missing: usize,
    /// Data rows skipped for a non-numeric or short field list.
    pub n_rows_dropped: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Parser

/// Compiled header patterns; build once per batch.
#[derive(Debug, Clone)]
pub struct SpecExportParser {
    re_grid: Regex,
    re_program: Regex,
}

enum EnumRowParse {
    Point(SpecMeasurementPoint),
    Missing,
    Invalid,
}

impl SpecExportParser {
    pub fn new() -> Result<Self, ZoomError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ZoomError::InvalidPattern(format!("{pattern}: {e}")))
        };
        Ok(Self {
            re_grid: compile(r"Grid:\s*([0-9.eE+-]+)\s*x\s*([0-9.eE+-]+)\s*x\s*([0-9.eE+-]+)")?,
            re_program: compile(r"/Program/([^/]+)/")?,
        })
    }

    /// Read and parse one export file. Invalid UTF-8 is replaced, not rejected.
    pub fn read_export(&self, path: &Path) -> Result<SpecScanExport, ZoomError> {
        let bytes = fs::read(path).map_err(|e| ZoomError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_export_text(path, &String::from_utf8_lossy(&bytes))
    }

    /// Parse export text; `path` names the source in errors and the result.
    pub fn parse_export_text(&self, path: &Path, text: &str) -> Result<SpecScanExport, ZoomError> {
        let l_lines: Vec<&str> = text.lines().collect();

        let (nominal_x_spacing, nominal_y_spacing) = self.parse_grid_line(path, &l_lines)?;

        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display_name = match l_lines
            .get(N_LINE_PROGRAM)
            .and_then(|line| self.re_program.captures(line))
            .and_then(|caps| caps.get(1))
        {
            Some(m) => m.as_str().trim().to_string(),
            None => {
                let c_stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| filename.clone());
                warn!(file = %path.display(), "no /Program/ segment, using file stem as name");
                c_stem
            }
        };

        let mut l_points = Vec::with_capacity(l_lines.len().saturating_sub(N_EXPORT_HEADER_LINES));
        let mut n_rows_missing = 0usize;
        let mut n_rows_dropped = 0usize;
        for line in l_lines.iter().skip(N_EXPORT_HEADER_LINES + 1) {
            if line.trim().is_empty() {
                continue;
            }
            match parse_data_row(line) {
                EnumRowParse::Point(p) => l_points.push(p),
                EnumRowParse::Missing => n_rows_missing += 1,
                EnumRowParse::Invalid => n_rows_dropped += 1,
            }
        }

        if n_rows_dropped > 0 {
            warn!(file = %path.display(), n_rows_dropped, "dropped non-numeric data rows");
        }
        if l_points.is_empty() {
            return Err(ZoomError::NoDataRows {
                path: path.to_path_buf(),
            });
        }
        debug!(
            file = %path.display(),
            n_points = l_points.len(),
            n_rows_missing,
            "parsed export"
        );

        Ok(SpecScanExport {
            path: path.to_path_buf(),
            filename,
            display_name,
            grid: SpecGrid {
                points: l_points,
                nominal_x_spacing,
                nominal_y_spacing,
            },
            n_rows_missing,
            n_rows_dropped,
        })
    }

    fn parse_grid_line(&self, path: &Path, l_lines: &[&str]) -> Result<(f64, f64), ZoomError> {
        let Some(line) = l_lines.get(N_LINE_GRID).filter(|l| l.contains("Grid:")) else {
            return Err(ZoomError::MissingGridHeader {
                path: path.to_path_buf(),
            });
        };
        let invalid = || ZoomError::InvalidGridHeader {
            path: path.to_path_buf(),
            line: line.trim().to_string(),
        };
        let caps = self.re_grid.captures(line).ok_or_else(invalid)?;
        let parse = |n_group: usize| {
            caps.get(n_group)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .ok_or_else(invalid)
        };
        Ok((parse(1)?, parse(3)?))
    }
}

/// Split a data row into positional fields.
///
/// SEMCAD separates columns with a double tab; rows written with single tabs
/// are accepted too. Empty fields keep their position.
fn split_data_fields(line: &str) -> Vec<&str> {
    let c_separator = if line.contains(C_FIELD_SEPARATOR) {
        C_FIELD_SEPARATOR
    } else {
        "\t"
    };
    line.split(c_separator).map(str::trim).collect()
}

fn parse_data_row(line: &str) -> EnumRowParse {
    let l_fields = split_data_fields(line);
    if l_fields
        .iter()
        .take(N_FIELDS_POINT)
        .any(|f| f.is_empty() || *f == C_MISSING_FIELD)
    {
        return EnumRowParse::Missing;
    }
    if l_fields.len() < N_FIELDS_POINT {
        return EnumRowParse::Invalid;
    }
    let mut l_values = [0f64; N_FIELDS_POINT];
    for (slot, field) in l_values.iter_mut().zip(&l_fields) {
        match field.parse::<f64>() {
            Ok(v) => *slot = v,
            Err(_) => return EnumRowParse::Invalid,
        }
    }
    let [value, x, y, z] = l_values;
    EnumRowParse::Point(SpecMeasurementPoint { value, x, y, z })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Discovery

fn compile_globset(patterns: &[String]) -> Result<GlobSet, ZoomError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ZoomError::InvalidPattern(format!("Invalid pattern in include/exclude: {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ZoomError::InvalidPattern(e.to_string()))
}

/// List export files directly under `dir_input`, sorted by file name.
///
/// Empty `patterns_include` means `*.txt`. The default log file is always excluded.
pub fn discover_exports(
    dir_input: &Path,
    patterns_include: &[String],
    patterns_exclude: &[String],
) -> Result<Vec<PathBuf>, ZoomError> {
    let l_include_default = [C_EXPORT_PATTERN_DEFAULT.to_string()];
    let globs_include = compile_globset(if patterns_include.is_empty() {
        &l_include_default
    } else {
        patterns_include
    })?;
    let globs_exclude = compile_globset(patterns_exclude)?;

    let map_io = |e: std::io::Error| ZoomError::Io {
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
        if c_name == C_LOG_FILE_DEFAULT
            || !globs_include.is_match(&c_name)
            || globs_exclude.is_match(&c_name)
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
