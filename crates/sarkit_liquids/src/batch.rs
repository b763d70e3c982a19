//! Directory batch: read the frequency table, then interpolate every liquid workbook.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::interpolate::derive_liquid_points;
use crate::read::{discover_liquid_workbooks, read_frequency_table, read_liquid_sheet};
use crate::spec::{LiquidsError, SpecFrequencyTable, SpecLiquidPoint};

/// Options of one liquid batch run.
#[derive(Debug, Clone, Default)]
pub struct SpecLiquidsRunOptions {
    pub dir_input: PathBuf,
    pub path_frequency_table: PathBuf,
    /// Bands used for workbooks without an entry in `bands_by_file`.
    pub bands_default: Vec<String>,
    /// Bands per liquid workbook file name.
    pub bands_by_file: BTreeMap<String, Vec<String>>,
    /// File names never treated as liquid workbooks (results workbook, ...).
    pub names_excluded: Vec<String>,
}

/// Interpolated points of one liquid workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecLiquidRecord {
    pub path: PathBuf,
    pub filename: String,
    pub points: Vec<SpecLiquidPoint>,
}

/// A liquid workbook that could not be read or interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecLiquidFailure {
    pub path: PathBuf,
    pub filename: String,
    pub message: String,
}

/// All outcomes of one batch in file-name order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecLiquidsBatch {
    pub records: Vec<SpecLiquidRecord>,
    pub failures: Vec<SpecLiquidFailure>,
}

impl SpecLiquidsBatch {
    pub fn n_points(&self) -> usize {
        self.records.iter().map(|r| r.points.len()).sum()
    }
}

fn derive_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Device frequencies of the selected bands, band by band in selection order.
fn derive_selected_frequencies(
    table: &SpecFrequencyTable,
    l_bands: &[String],
    c_file: &str,
) -> Result<Vec<f64>, LiquidsError> {
    if l_bands.is_empty() {
        return Err(LiquidsError::NoBandsSelected {
            file: c_file.to_string(),
        });
    }
    let mut l_frequencies = Vec::new();
    for c_band in l_bands {
        let l_band_freqs = table
            .frequencies(c_band.trim())
            .ok_or_else(|| LiquidsError::UnknownBand {
                band: c_band.clone(),
                available: table.band_names().join(", "),
            })?;
        l_frequencies.extend_from_slice(l_band_freqs);
    }
    Ok(l_frequencies)
}

/// Interpolate all liquid workbooks of `dir_input`.
///
/// Band selections are checked for every workbook before any is read; an
/// unknown band or a workbook without bands aborts the run. Read and
/// out-of-scope failures are recorded per file.
pub fn run_liquids_batch(
    options: &SpecLiquidsRunOptions,
) -> Result<SpecLiquidsBatch, LiquidsError> {
    let table = read_frequency_table(&options.path_frequency_table)?;

    let mut names_excluded = options.names_excluded.clone();
    names_excluded.push(derive_file_name(&options.path_frequency_table));
    let l_paths = discover_liquid_workbooks(&options.dir_input, &names_excluded)?;

    for c_file in options.bands_by_file.keys() {
        if !l_paths.iter().any(|p| derive_file_name(p) == *c_file) {
            warn!(file = %c_file, "band selection for a file that is not in the batch");
        }
    }

    let l_jobs = l_paths
        .into_iter()
        .map(|path| {
            let c_file = derive_file_name(&path);
            let l_bands = options
                .bands_by_file
                .get(&c_file)
                .unwrap_or(&options.bands_default);
            let l_frequencies = derive_selected_frequencies(&table, l_bands, &c_file)?;
            Ok((path, c_file, l_frequencies))
        })
        .collect::<Result<Vec<_>, LiquidsError>>()?;

    let mut batch = SpecLiquidsBatch::default();
    for (path, filename, l_frequencies) in l_jobs {
        let outcome = read_liquid_sheet(&path)
            .and_then(|sheet| derive_liquid_points(&sheet, &l_frequencies));
        match outcome {
            Ok(points) => batch.records.push(SpecLiquidRecord {
                path,
                filename,
                points,
            }),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "liquid workbook skipped");
                batch.failures.push(SpecLiquidFailure {
                    path,
                    filename,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        dir = %options.dir_input.display(),
        n_files = batch.records.len() + batch.failures.len(),
        n_points = batch.n_points(),
        "liquid batch done"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::read::tests::{create_frequency_table, create_head_liquid, create_liquid_workbook};

    fn create_options(dir: &Path, bands_default: &[&str]) -> SpecLiquidsRunOptions {
        SpecLiquidsRunOptions {
            dir_input: dir.to_path_buf(),
            path_frequency_table: dir.join("frequency table.xlsx"),
            bands_default: bands_default.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn records_points_and_out_of_scope_failures() {
        let dir = tempdir().expect("tempdir");
        create_frequency_table(&dir.path().join("frequency table.xlsx"));
        create_head_liquid(&dir.path().join("head_1900.xlsx"));
        create_liquid_workbook(
            &dir.path().join("head_835.xlsx"),
            &[
                (800.0, [41.5, 0.90, 41.0, 0.92, -1.2, 2.2]),
                (900.0, [41.5, 0.97, 40.6, 0.99, -2.2, 2.1]),
            ],
        );

        let mut options = create_options(dir.path(), &["LTE 2"]);
        options
            .bands_by_file
            .insert("head_835.xlsx".to_string(), vec!["LTE 5".to_string()]);
        let batch = run_liquids_batch(&options).expect("batch");
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].filename, "head_1900.xlsx");
        assert_eq!(batch.records[0].points.len(), 3);
        assert_eq!(batch.records[1].points.len(), 2);
        assert_eq!(batch.n_points(), 5);
        assert!(batch.failures.is_empty());

        options.bands_by_file.clear();
        let batch = run_liquids_batch(&options).expect("batch");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].filename, "head_835.xlsx");
        assert!(batch.failures[0].message.contains("out of scope"));
    }

    #[test]
    fn unknown_band_aborts_before_reading() {
        let dir = tempdir().expect("tempdir");
        create_frequency_table(&dir.path().join("frequency table.xlsx"));
        create_head_liquid(&dir.path().join("head_1900.xlsx"));

        let err = run_liquids_batch(&create_options(dir.path(), &["LTE 66"])).expect_err("band");
        assert!(matches!(err, LiquidsError::UnknownBand { .. }));
        assert!(err.to_string().contains("available: LTE 2, LTE 5"));

        let err = run_liquids_batch(&create_options(dir.path(), &[])).expect_err("no bands");
        assert!(matches!(err, LiquidsError::NoBandsSelected { .. }));
    }

    #[test]
    fn missing_frequency_table_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let err = run_liquids_batch(&create_options(dir.path(), &["LTE 2"])).expect_err("table");
        assert!(matches!(err, LiquidsError::Workbook { .. }));
    }
}
