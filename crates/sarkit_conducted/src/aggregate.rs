//! Conducted result table reading and per-band maximum search.

use std::fs;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::spec::{
    ConductedError, EnumChannelType, L_CONDUCTED_COLUMNS, SpecBandMaxima, SpecConductedRow,
};

////////////////////////////////////////////////////////////////////////////////
// #region Reading

/// Read a tab-separated conducted result table with a header row.
///
/// Columns are taken by position; header names are ignored.
pub fn read_conducted_table(path: &Path) -> Result<Vec<SpecConductedRow>, ConductedError> {
    fs::metadata(path).map_err(|e| ConductedError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let df_table = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(b'\t'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let rows = convert_frame_to_rows(&df_table)?;
    info!(file = %path.display(), n_rows = rows.len(), "conducted table read");
    Ok(rows)
}

fn convert_frame_to_rows(df_table: &DataFrame) -> Result<Vec<SpecConductedRow>, ConductedError> {
    let n_expected = L_CONDUCTED_COLUMNS.len();
    if df_table.width() < n_expected {
        return Err(ConductedError::MissingColumns {
            n_found: df_table.width(),
            n_expected,
        });
    }
    let l_cols = df_table.get_columns()[..n_expected]
        .iter()
        .map(|c_col| c_col.str())
        .collect::<PolarsResult<Vec<&StringChunked>>>()?;

    let mut l_rows = Vec::with_capacity(df_table.height());
    for n_idx in 0..df_table.height() {
        let field = |n_col: usize| l_cols[n_col].get(n_idx).unwrap_or("").trim().to_string();
        let c_band = field(0);
        if c_band.is_empty() {
            continue;
        }
        let n_row = n_idx + 1;

        let c_chan_type = field(5);
        let channel_type = EnumChannelType::parse(&c_chan_type).ok_or_else(|| {
            ConductedError::UnexpectedChannelType {
                value: c_chan_type.clone(),
                n_row,
            }
        })?;
        let c_power = field(8);
        let power_dbm = c_power
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| ConductedError::InvalidPower {
                value: c_power.clone(),
                n_row,
            })?;

        l_rows.push(SpecConductedRow {
            band: c_band,
            bandwidth: field(1),
            rb_size: field(2),
            rb_start: field(3),
            modulation: field(4),
            channel_type,
            channel_type_text: c_chan_type,
            channel: field(6),
            frequency: field(7),
            power_dbm,
        });
    }
    Ok(l_rows)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Maxima

/// Maximum-power rows per band (first-appearance order) and channel type.
///
/// Every row equal to the maximum is kept. Channel types absent from a band
/// are skipped.
pub fn derive_band_maxima(rows: &[SpecConductedRow]) -> Vec<SpecBandMaxima> {
    let mut l_bands: Vec<&str> = Vec::new();
    for row in rows {
        if !l_bands.contains(&row.band.as_str()) {
            l_bands.push(&row.band);
        }
    }

    l_bands
        .into_iter()
        .map(|c_band| {
            let mut l_max_rows = Vec::new();
            for channel_type in EnumChannelType::ALL {
                let l_candidates: Vec<&SpecConductedRow> = rows
                    .iter()
                    .filter(|r| r.band == c_band && r.channel_type == channel_type)
                    .collect();
                let Some(n_max) = l_candidates
                    .iter()
                    .map(|r| r.power_dbm)
                    .reduce(f64::max)
                else {
                    debug!(band = c_band, channel = %channel_type, "no rows for channel type");
                    continue;
                };
                l_max_rows.extend(
                    l_candidates
                        .into_iter()
                        .filter(|r| r.power_dbm == n_max)
                        .cloned(),
                );
            }
            SpecBandMaxima {
                band: c_band.to_string(),
                rows: l_max_rows,
            }
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
