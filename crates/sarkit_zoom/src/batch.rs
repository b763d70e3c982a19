//! Directory batch: discover, import and classify every export.

use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::classify::classify;
use crate::import::{SpecExportParser, discover_exports};
use crate::report::{SpecBatchReport, SpecImportFailure, SpecScanRecord};
use crate::spec::{SpecClassifyOptions, ZoomError};

/// Options of one zoom batch run.
#[derive(Debug, Clone, Default)]
pub struct SpecZoomRunOptions {
    pub dir_input: PathBuf,
    /// File-name globs; empty means `*.txt`.
    pub patterns_include: Vec<String>,
    pub patterns_exclude: Vec<String>,
    /// Upper bound on parallel workers; `None` uses up to 8 CPUs.
    pub num_workers_max: Option<usize>,
    pub classify: SpecClassifyOptions,
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

type TypeScanOutcome = Result<SpecScanRecord, SpecImportFailure>;

fn process_export(
    path: &Path,
    parser: &SpecExportParser,
    options: &SpecClassifyOptions,
) -> TypeScanOutcome {
    match parser.read_export(path) {
        Ok(export) => {
            let report = classify(&export.grid, options);
            Ok(SpecScanRecord { export, report })
        }
        Err(e) => Err(SpecImportFailure {
            path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            message: e.to_string(),
        }),
    }
}

fn process_exports_serial(
    l_paths: &[PathBuf],
    parser: &SpecExportParser,
    options: &SpecClassifyOptions,
) -> Vec<TypeScanOutcome> {
    l_paths
        .iter()
        .map(|path| process_export(path, parser, options))
        .collect()
}

/// Classify all exports of `dir_input`.
///
/// Per-file import failures are recorded in the report and never abort the
/// batch; setup failures (bad options, unreadable directory, bad globs) do.
pub fn run_zoom_batch(options: &SpecZoomRunOptions) -> Result<SpecBatchReport, ZoomError> {
    options.classify.validate()?;
    let parser = SpecExportParser::new()?;
    let l_paths = discover_exports(
        &options.dir_input,
        &options.patterns_include,
        &options.patterns_exclude,
    )?;
    info!(
        dir = %options.dir_input.display(),
        n_files = l_paths.len(),
        "zoom exports discovered"
    );

    let n_workers_max = calculate_worker_limit(options.num_workers_max);
    let l_outcomes = if n_workers_max <= 1 || l_paths.len() <= 1 {
        process_exports_serial(&l_paths, &parser, &options.classify)
    } else {
        match ThreadPoolBuilder::new().num_threads(n_workers_max).build() {
            Ok(thread_pool) => thread_pool.install(|| {
                l_paths
                    .par_iter()
                    .map(|path| process_export(path, &parser, &options.classify))
                    .collect::<Vec<_>>()
            }),
            Err(e) => {
                warn!(
                    workers = n_workers_max,
                    "failed to initialize thread pool ({e}); fallback to serial"
                );
                process_exports_serial(&l_paths, &parser, &options.classify)
            }
        }
    };

    let mut batch = SpecBatchReport::default();
    for outcome in l_outcomes {
        match outcome {
            Ok(record) => batch.records.push(record),
            Err(failure) => {
                warn!(file = %failure.path.display(), "skipped: {}", failure.message);
                batch.failures.push(failure);
            }
        }
    }
    info!(
        n_files = batch.n_files(),
        n_skipped = batch.failures.len(),
        pass_rate = batch.pass_rate_pct().unwrap_or(0.0),
        "zoom batch classified"
    );
    Ok(batch)
}
