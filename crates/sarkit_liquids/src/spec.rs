//! Frequency table, liquid sheet and interpolation models.

use std::fmt;
use std::path::PathBuf;

use calamine::XlsxError;
use sarkit_io_xlsx::XlsxWriteError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region Quantities

/// Dielectric quantity read from a liquid sheet, in report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumLiquidQuantity {
    PermittivityTarget,
    ConductivityTarget,
    Permittivity,
    Conductivity,
    PermittivityDelta,
    ConductivityDelta,
}

impl EnumLiquidQuantity {
    pub const ALL: [EnumLiquidQuantity; 6] = [
        Self::PermittivityTarget,
        Self::ConductivityTarget,
        Self::Permittivity,
        Self::Conductivity,
        Self::PermittivityDelta,
        Self::ConductivityDelta,
    ];

    /// Zero-based source column on the liquid sheet (`J`, `L`, `B`, `D`, `S`, `U`).
    pub fn n_col(self) -> usize {
        match self {
            Self::PermittivityTarget => 9,
            Self::ConductivityTarget => 11,
            Self::Permittivity => 1,
            Self::Conductivity => 3,
            Self::PermittivityDelta => 18,
            Self::ConductivityDelta => 20,
        }
    }

    /// Column header of the interpolation sheet.
    pub fn label(self) -> &'static str {
        match self {
            Self::PermittivityTarget => "e' target",
            Self::ConductivityTarget => "(S/m) target",
            Self::Permittivity => "e'",
            Self::Conductivity => "(S/m)",
            Self::PermittivityDelta => "e' delta %",
            Self::ConductivityDelta => "(S/m) delta %",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::PermittivityTarget => 0,
            Self::ConductivityTarget => 1,
            Self::Permittivity => 2,
            Self::Conductivity => 3,
            Self::PermittivityDelta => 4,
            Self::ConductivityDelta => 5,
        }
    }
}

impl fmt::Display for EnumLiquidQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Tables

/// Device frequencies per band, columns in workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecFrequencyTable {
    pub bands: Vec<(String, Vec<f64>)>,
}

impl SpecFrequencyTable {
    pub fn frequencies(&self, band: &str) -> Option<&[f64]> {
        self.bands
            .iter()
            .find(|(c_name, _)| c_name == band)
            .map(|(_, l_freqs)| l_freqs.as_slice())
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(c_name, _)| c_name.as_str()).collect()
    }
}

/// One measured frequency row of a liquid sheet; blank cells are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecLiquidRow {
    pub frequency: f64,
    pub values: [Option<f64>; 6],
}

impl SpecLiquidRow {
    pub fn get(&self, quantity: EnumLiquidQuantity) -> Option<f64> {
        self.values[quantity.index()]
    }
}

/// Measurement rows of one liquid workbook, ascending by frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecLiquidSheet {
    pub path: PathBuf,
    /// File name including extension.
    pub filename: String,
    pub rows: Vec<SpecLiquidRow>,
}

/// Interpolated quantities at one device frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecLiquidPoint {
    pub frequency: f64,
    pub values: [f64; 6],
}

impl SpecLiquidPoint {
    pub fn get(&self, quantity: EnumLiquidQuantity) -> f64 {
        self.values[quantity.index()]
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Liquid job failures.
#[derive(Debug, Error)]
pub enum LiquidsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("{} has no sheet {sheet:?}", path.display())]
    MissingSheet { path: PathBuf, sheet: String },
    #[error("{} holds no frequency rows", path.display())]
    NoLiquidRows { path: PathBuf },
    #[error("unknown band {band:?}; available: {available}")]
    UnknownBand { band: String, available: String },
    #[error("no bands selected for {file}")]
    NoBandsSelected { file: String },
    #[error("Frequencies in {file} out of scope ({frequency} MHz)")]
    FrequencyOutOfScope { file: String, frequency: f64 },
    #[error("{file} has no {quantity} value around {frequency} MHz")]
    MissingValue {
        file: String,
        frequency: f64,
        quantity: EnumLiquidQuantity,
    },
    #[error("{0}")]
    InvalidPattern(String),
    #[error(transparent)]
    Write(#[from] XlsxWriteError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
