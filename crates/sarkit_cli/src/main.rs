//! `sarkit`: SAR laboratory batch jobs.
//!
//! Results go to stdout; diagnostics go to stderr through `tracing`
//! (`RUST_LOG` overrides the default `sarkit=info` filter).

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use sarkit_conducted::{
    derive_band_maxima, read_conducted_table, render_band_maxima, write_band_maxima_workbook,
};
use sarkit_liquids::conf::{
    C_FREQUENCY_TABLE_FILE_DEFAULT, C_LIQUIDS_WORKBOOK_DEFAULT, C_TISSUE_TYPE_DEFAULT,
    N_TISSUE_TEMP_DEFAULT_C,
};
use sarkit_liquids::{
    SpecLiquidsRunOptions, SpecTissueInfo, render_liquids_summary, run_liquids_batch,
    write_liquids_workbook,
};
use sarkit_zoom::{
    SpecZoomRunOptions, render_log_text, render_terminal_summary, run_zoom_batch,
    write_results_workbook,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{SpecZoomConfig, SpecZoomOverrides, load_config};

const C_CONDUCTED_FILE_DEFAULT: &str = "lteresults_cal.txt";
const C_CONDUCTED_OUT_DEFAULT: &str = "conducted_maximums.xlsx";

#[derive(Parser, Debug)]
#[command(name = "sarkit", version)]
#[command(about = "SAR laboratory batch jobs: zoom-scan step check, conducted maxima, liquids")]
struct Cli {
    #[command(subcommand)]
    command: EnumCommand,
}

#[derive(Subcommand, Debug)]
enum EnumCommand {
    /// Classify every zoom-scan export of a directory as Pass, Fail or Error
    Zoom(ArgsZoom),
    /// Report the maximum conducted power per LTE band and channel type
    Conducted(ArgsConducted),
    /// Interpolate liquid targets and measurements at the device frequencies
    Liquids(ArgsLiquids),
}

#[derive(Args, Debug)]
struct ArgsZoom {
    /// Directory holding the SEMCAD `.txt` exports
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Accepted step sizes in meters, comma separated
    #[arg(long, value_delimiter = ',')]
    known_resolutions: Vec<f64>,

    /// Ratio to peak at or below which a nearby point fails the scan
    #[arg(long)]
    peak_ratio_threshold: Option<f64>,

    /// Relative slack added to the step size in the proximity check
    #[arg(long)]
    distance_tolerance_factor: Option<f64>,

    /// Ratio to peak below which points enter the minimum-distance search
    #[arg(long)]
    min_distance_ratio: Option<f64>,

    /// Also fail scans whose M2/M1 ratio (percent) is below this value
    #[arg(long)]
    adjacent_ratio_min: Option<f64>,

    /// Check distances only against points in the peak's z-layer
    #[arg(long)]
    peak_layer_only: bool,

    /// Include glob on file names (repeatable, default `*.txt`)
    #[arg(long = "include")]
    patterns_include: Vec<String>,

    /// Exclude glob on file names (repeatable)
    #[arg(long = "exclude")]
    patterns_exclude: Vec<String>,

    /// Maximum number of parallel workers
    #[arg(long)]
    workers: Option<usize>,

    /// Results workbook, relative to DIR unless absolute
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Log file, relative to DIR unless absolute
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ArgsConducted {
    /// Tab-separated conducted result table
    #[arg(default_value = C_CONDUCTED_FILE_DEFAULT)]
    file: PathBuf,

    /// Output workbook
    #[arg(long, default_value = C_CONDUCTED_OUT_DEFAULT)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ArgsLiquids {
    /// Directory holding the frequency table and the liquid workbooks
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Frequency-table bands used for every liquid workbook, comma separated
    #[arg(long, value_delimiter = ',')]
    bands: Vec<String>,

    /// Bands for one liquid workbook, `FILE=BAND[,BAND...]` (repeatable)
    #[arg(long = "file-bands", value_parser = parse_file_bands)]
    file_bands: Vec<(String, Vec<String>)>,

    /// Frequency table workbook, relative to DIR unless absolute
    #[arg(long, default_value = C_FREQUENCY_TABLE_FILE_DEFAULT)]
    frequency_table: PathBuf,

    /// Tissue type written into the report rows
    #[arg(long, default_value = C_TISSUE_TYPE_DEFAULT)]
    tissue_type: String,

    /// Tissue temperature in °C written into the report rows
    #[arg(long, default_value_t = N_TISSUE_TEMP_DEFAULT_C)]
    tissue_temp: f64,

    /// Output workbook, relative to DIR unless absolute
    #[arg(long, default_value = C_LIQUIDS_WORKBOOK_DEFAULT)]
    out: PathBuf,
}

fn parse_file_bands(value: &str) -> Result<(String, Vec<String>), String> {
    let (c_file, c_bands) = value
        .split_once('=')
        .ok_or_else(|| format!("expected FILE=BAND[,BAND...], got {value:?}"))?;
    let l_bands: Vec<String> = c_bands
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
        .collect();
    if c_file.trim().is_empty() || l_bands.is_empty() {
        return Err(format!("expected FILE=BAND[,BAND...], got {value:?}"));
    }
    Ok((c_file.trim().to_string(), l_bands))
}

fn resolve_in_dir(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

impl ArgsZoom {
    fn derive_overrides(&self) -> SpecZoomOverrides {
        SpecZoomOverrides {
            known_resolutions: self.known_resolutions.clone(),
            peak_ratio_threshold: self.peak_ratio_threshold,
            distance_tolerance_factor: self.distance_tolerance_factor,
            min_distance_ratio: self.min_distance_ratio,
            adjacent_ratio_min_pct: self.adjacent_ratio_min,
            if_peak_layer_only: self.peak_layer_only,
            patterns_include: self.patterns_include.clone(),
            patterns_exclude: self.patterns_exclude.clone(),
            num_workers_max: self.workers,
            file_workbook: self.workbook.clone(),
            file_log: self.log.clone(),
        }
    }
}

fn run_zoom(args: &ArgsZoom) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SpecZoomConfig::default(),
    }
    .apply_overrides(args.derive_overrides());

    let path_workbook = config.derive_workbook_path(&args.dir);
    let path_log = config.derive_log_path(&args.dir);
    let mut patterns_exclude = config.patterns_exclude.clone();
    if let Some(c_log_name) = path_log.file_name().and_then(|s| s.to_str()) {
        patterns_exclude.push(c_log_name.to_string());
    }

    let options = SpecZoomRunOptions {
        dir_input: args.dir.clone(),
        patterns_include: config.patterns_include.clone(),
        patterns_exclude,
        num_workers_max: config.num_workers_max,
        classify: config.classify.clone(),
    };
    let batch = run_zoom_batch(&options)
        .with_context(|| format!("zoom batch failed in {}", args.dir.display()))?;

    let now = Local::now();
    if batch.n_files() > 0 {
        write_results_workbook(&path_workbook, &batch, &now.format("%d.%m.%Y").to_string())
            .with_context(|| format!("failed to write {}", path_workbook.display()))?;
    }
    let c_log = render_log_text(&batch, &now.format("%a %b %e %H:%M:%S %Y").to_string());
    fs::write(&path_log, c_log)
        .with_context(|| format!("failed to write {}", path_log.display()))?;
    info!(log = %path_log.display(), "log written");

    print!("{}", render_terminal_summary(&batch));
    Ok(())
}

fn run_conducted(args: &ArgsConducted) -> Result<()> {
    let rows = read_conducted_table(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    let maxima = derive_band_maxima(&rows);
    write_band_maxima_workbook(&args.out, &maxima)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    print!("{}", render_band_maxima(&maxima));
    Ok(())
}

fn run_liquids(args: &ArgsLiquids) -> Result<()> {
    let path_out = resolve_in_dir(&args.dir, &args.out);
    let options = SpecLiquidsRunOptions {
        dir_input: args.dir.clone(),
        path_frequency_table: resolve_in_dir(&args.dir, &args.frequency_table),
        bands_default: args.bands.clone(),
        bands_by_file: args.file_bands.iter().cloned().collect(),
        names_excluded: path_out
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .into_iter()
            .collect(),
    };
    let batch = run_liquids_batch(&options)
        .with_context(|| format!("liquid batch failed in {}", args.dir.display()))?;

    if !batch.records.is_empty() {
        let tissue = SpecTissueInfo {
            tissue_type: args.tissue_type.clone(),
            temp_c: args.tissue_temp,
        };
        let c_date = Local::now().format("%d.%m.%Y").to_string();
        write_liquids_workbook(&path_out, &batch, &tissue, &c_date)
            .with_context(|| format!("failed to write {}", path_out.display()))?;
    }
    print!("{}", render_liquids_summary(&batch));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sarkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        EnumCommand::Zoom(args) => run_zoom(args),
        EnumCommand::Conducted(args) => run_conducted(args),
        EnumCommand::Liquids(args) => run_liquids(args),
    }
}
