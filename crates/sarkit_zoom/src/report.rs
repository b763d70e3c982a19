//! Verdict records of a batch and their plain-text renderings.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::classify::round_to;
use crate::conf::{C_MISSING_FIELD, C_TAB_COLOR_ERROR, C_TAB_COLOR_FAIL, N_STEP_ROUND_DIGITS};
use crate::import::SpecScanExport;
use crate::spec::{EnumVerdict, SpecClassificationReport};

////////////////////////////////////////////////////////////////////////////////
// #region Records

/// One classified export.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecScanRecord {
    pub export: SpecScanExport,
    pub report: SpecClassificationReport,
}

impl SpecScanRecord {
    pub fn filename(&self) -> &str {
        &self.export.filename
    }

    pub fn display_name(&self) -> &str {
        &self.export.display_name
    }

    pub fn verdict(&self) -> EnumVerdict {
        self.report.verdict
    }

    /// `round(rounded_step, 4) * 1000`.
    pub fn step_mm(&self) -> Option<f64> {
        self.report
            .step
            .map(|s| round_to(s.rounded_step, N_STEP_ROUND_DIGITS) * 1000.0)
    }

    /// Adjacent ratio rounded for display.
    pub fn ratio_pct_display(&self) -> Option<f64> {
        self.report.adjacent_ratio_pct.map(|n| round_to(n, 1))
    }

    /// Minimum distance rounded for display.
    pub fn min_distance_mm_display(&self) -> Option<f64> {
        self.report.min_distance_mm.map(|n| round_to(n, 2))
    }

    /// Worksheet tab color, `None` for passing scans.
    pub fn tab_color(&self) -> Option<&'static str> {
        match self.report.verdict {
            EnumVerdict::Fail => Some(C_TAB_COLOR_FAIL),
            EnumVerdict::Error => Some(C_TAB_COLOR_ERROR),
            EnumVerdict::Pass => None,
        }
    }

    /// `"Error (unknown step resolution)"`, `"Fail"`, ...
    pub fn result_label(&self) -> String {
        match self.report.reason {
            Some(reason) => format!("{} ({reason})", self.report.verdict),
            None => self.report.verdict.to_string(),
        }
    }
}

/// An export that could not be imported; the batch continues without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecImportFailure {
    pub path: PathBuf,
    pub filename: String,
    pub message: String,
}

/// All records of one batch in file-name order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecBatchReport {
    pub records: Vec<SpecScanRecord>,
    pub failures: Vec<SpecImportFailure>,
}

impl SpecBatchReport {
    /// Number of classified exports.
    pub fn n_files(&self) -> usize {
        self.records.len()
    }

    pub fn count(&self, verdict: EnumVerdict) -> usize {
        self.iter_verdict(verdict).count()
    }

    /// `(n - errors - fails) / n * 100`; `None` for an empty batch.
    pub fn pass_rate_pct(&self) -> Option<f64> {
        let n_files = self.n_files();
        if n_files == 0 {
            return None;
        }
        let n_bad = self.count(EnumVerdict::Error) + self.count(EnumVerdict::Fail);
        Some((n_files - n_bad) as f64 / n_files as f64 * 100.0)
    }

    pub fn iter_verdict(&self, verdict: EnumVerdict) -> impl Iterator<Item = &SpecScanRecord> {
        self.records.iter().filter(move |r| r.verdict() == verdict)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Rendering

/// Shortest round-trip decimal, keeping a trailing `.0` on integral values.
pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

fn format_optional(x: Option<f64>) -> String {
    x.map_or_else(|| C_MISSING_FIELD.to_string(), format_float)
}

fn format_pass_rate(n_pass_rate: Option<f64>) -> String {
    format!("{:.1}", n_pass_rate.unwrap_or(0.0))
}

/// Render `log.txt`: header, then Error, Fail and Pass records, then skipped files.
pub fn render_log_text(batch: &SpecBatchReport, c_date: &str) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{} files processed with a PASS rate of {} %",
        batch.n_files(),
        format_pass_rate(batch.pass_rate_pct())
    );
    let _ = writeln!(text, "Date: {c_date}");

    for (n_group, verdict) in [EnumVerdict::Error, EnumVerdict::Fail, EnumVerdict::Pass]
        .into_iter()
        .enumerate()
    {
        if n_group > 0 {
            text.push('\n');
        }
        for (n_idx, record) in batch.iter_verdict(verdict).enumerate() {
            let _ = writeln!(
                text,
                "{} {}: {} || Step: {} mm || M2/M1 Ratio: {}% || Minimum distance: {} mm",
                verdict.tag(),
                n_idx + 1,
                record.display_name(),
                format_optional(record.step_mm()),
                format_optional(record.ratio_pct_display()),
                format_optional(record.min_distance_mm_display()),
            );
        }
    }

    if !batch.failures.is_empty() {
        text.push('\n');
        for (n_idx, failure) in batch.failures.iter().enumerate() {
            let _ = writeln!(
                text,
                "SKIPPED {}: {} || {}",
                n_idx + 1,
                failure.filename,
                failure.message
            );
        }
    }
    text
}

/// Terminal summary: Error files, Fail files, then the pass rate.
pub fn render_terminal_summary(batch: &SpecBatchReport) -> String {
    const C_RULE: &str = "---------------------------------";
    let mut text = String::from("Test complete.\n\n");

    let mut push_group = |c_title: &str, verdict: EnumVerdict| {
        if batch.count(verdict) == 0 {
            return;
        }
        let _ = writeln!(text, "{c_title}\n{C_RULE}");
        for record in batch.iter_verdict(verdict) {
            match record.report.reason {
                Some(reason) => {
                    let _ = writeln!(text, "{} ({reason})", record.display_name());
                }
                None => {
                    let _ = writeln!(text, "{}", record.display_name());
                }
            }
        }
        let _ = writeln!(text, "{C_RULE}\n");
    };
    push_group("The following files have a step size error:", EnumVerdict::Error);
    push_group("The following files are tagged as 'FAIL':", EnumVerdict::Fail);

    let n_files = batch.n_files();
    if n_files > 0 && batch.count(EnumVerdict::Pass) == n_files {
        let _ = writeln!(text, "All {n_files} files are tagged as 'PASS'");
    } else {
        let _ = writeln!(
            text,
            "{n_files} files processed with a PASS rate of {} %",
            format_pass_rate(batch.pass_rate_pct())
        );
    }

    if !batch.failures.is_empty() {
        let _ = writeln!(text, "\n{} files skipped:", batch.failures.len());
        for failure in &batch.failures {
            let _ = writeln!(text, "{}: {}", failure.filename, failure.message);
        }
    }
    text
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
