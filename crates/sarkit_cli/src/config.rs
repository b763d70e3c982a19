//! Zoom batch configuration file and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sarkit_zoom::SpecClassifyOptions;
use sarkit_zoom::conf::{C_LOG_FILE_DEFAULT, C_WORKBOOK_FILE_DEFAULT};
use serde::Deserialize;

/// JSON configuration of the `zoom` command; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecZoomConfig {
    pub classify: SpecClassifyOptions,
    pub patterns_include: Vec<String>,
    pub patterns_exclude: Vec<String>,
    pub num_workers_max: Option<usize>,
    pub file_workbook: Option<PathBuf>,
    pub file_log: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<SpecZoomConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: SpecZoomConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecZoomOverrides {
    pub known_resolutions: Vec<f64>,
    pub peak_ratio_threshold: Option<f64>,
    pub distance_tolerance_factor: Option<f64>,
    pub min_distance_ratio: Option<f64>,
    pub adjacent_ratio_min_pct: Option<f64>,
    pub if_peak_layer_only: bool,
    pub patterns_include: Vec<String>,
    pub patterns_exclude: Vec<String>,
    pub num_workers_max: Option<usize>,
    pub file_workbook: Option<PathBuf>,
    pub file_log: Option<PathBuf>,
}

impl SpecZoomConfig {
    /// Overlay command-line values; list flags replace, never append.
    pub fn apply_overrides(mut self, overrides: SpecZoomOverrides) -> Self {
        let cfg_classify = &mut self.classify;
        if !overrides.known_resolutions.is_empty() {
            cfg_classify.known_resolutions = overrides.known_resolutions;
        }
        if let Some(n) = overrides.peak_ratio_threshold {
            cfg_classify.peak_ratio_threshold = n;
        }
        if let Some(n) = overrides.distance_tolerance_factor {
            cfg_classify.distance_tolerance_factor = n;
        }
        if let Some(n) = overrides.min_distance_ratio {
            cfg_classify.min_distance_ratio = n;
        }
        if overrides.adjacent_ratio_min_pct.is_some() {
            cfg_classify.adjacent_ratio_min_pct = overrides.adjacent_ratio_min_pct;
        }
        if overrides.if_peak_layer_only {
            cfg_classify.if_peak_layer_only = true;
        }
        if !overrides.patterns_include.is_empty() {
            self.patterns_include = overrides.patterns_include;
        }
        if !overrides.patterns_exclude.is_empty() {
            self.patterns_exclude = overrides.patterns_exclude;
        }
        self.num_workers_max = overrides.num_workers_max.or(self.num_workers_max);
        self.file_workbook = overrides.file_workbook.or(self.file_workbook);
        self.file_log = overrides.file_log.or(self.file_log);
        self
    }

    /// Workbook path; relative names resolve against `dir_input`.
    pub fn derive_workbook_path(&self, dir_input: &Path) -> PathBuf {
        resolve_output(dir_input, self.file_workbook.as_deref(), C_WORKBOOK_FILE_DEFAULT)
    }

    /// Log path; relative names resolve against `dir_input`.
    pub fn derive_log_path(&self, dir_input: &Path) -> PathBuf {
        resolve_output(dir_input, self.file_log.as_deref(), C_LOG_FILE_DEFAULT)
    }
}

fn resolve_output(dir_input: &Path, path: Option<&Path>, c_default: &str) -> PathBuf {
    let path = path.unwrap_or_else(|| Path::new(c_default));
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir_input.join(path)
    }
}
