//! Conducted-power table model and errors.

use std::fmt;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use sarkit_io_xlsx::XlsxWriteError;
use thiserror::Error;

/// Positional column names of the conducted result table.
pub const L_CONDUCTED_COLUMNS: [&str; 9] = [
    "Band",
    "BW",
    "RBs",
    "RB Start",
    "Modulation",
    "ChanType",
    "Channel",
    "Frequency",
    "Power",
];

/// Test channel of a conducted measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumChannelType {
    Low,
    Mid,
    High,
}

impl EnumChannelType {
    pub const ALL: [EnumChannelType; 3] = [Self::Low, Self::Mid, Self::High];

    /// Case-insensitive match of `"LOW CH"`, `"Mid CH"`, `"high ch"`, ...
    pub fn parse(value: &str) -> Option<Self> {
        let c_norm = value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match c_norm.as_str() {
            "LOW CH" => Some(Self::Low),
            "MID CH" => Some(Self::Mid),
            "HIGH CH" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low CH",
            Self::Mid => "Mid CH",
            Self::High => "High CH",
        }
    }
}

impl fmt::Display for EnumChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One measured configuration; descriptive fields are kept as written.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecConductedRow {
    pub band: String,
    pub bandwidth: String,
    pub rb_size: String,
    pub rb_start: String,
    pub modulation: String,
    pub channel_type: EnumChannelType,
    /// `ChanType` as written in the table; shown in every output.
    pub channel_type_text: String,
    pub channel: String,
    pub frequency: String,
    pub power_dbm: f64,
}

/// Rows at the maximum power of one band, Low/Mid/High in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecBandMaxima {
    pub band: String,
    pub rows: Vec<SpecConductedRow>,
}

/// Conducted-table failures.
#[derive(Debug, Error)]
pub enum ConductedError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse conducted table: {0}")]
    Dataframe(#[from] PolarsError),
    #[error("conducted table has {n_found} columns, expected at least {n_expected}")]
    MissingColumns { n_found: usize, n_expected: usize },
    #[error("unexpected channel type {value:?} in row {n_row}")]
    UnexpectedChannelType { value: String, n_row: usize },
    #[error("invalid power {value:?} in row {n_row}")]
    InvalidPower { value: String, n_row: usize },
    #[error(transparent)]
    Workbook(#[from] XlsxWriteError),
}
