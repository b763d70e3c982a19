//! Step-size inference and Pass/Fail/Error classification of one zoom scan.
//!
//! [`classify`] is pure: the report is a function of the grid and options
//! only, so grids can be classified independently and in any order.

use crate::conf::{
    N_COORD_ROUND_DIGITS, N_RESOLUTION_EPS, N_SNAP_STEP_M, N_SNAP_WINDOW_HIGH_M,
    N_SNAP_WINDOW_LOW_M, N_STEP_ROUND_DIGITS,
};
use crate::spec::{
    EnumVerdict, EnumVerdictReason, SpecClassificationReport, SpecClassifyOptions, SpecGrid,
    SpecMeasurementPoint, SpecPeakInfo, SpecStepSize,
};

////////////////////////////////////////////////////////////////////////////////
// #region Rounding

/// Round half away from zero to `n_digits` decimals.
pub fn round_to(x: f64, n_digits: i32) -> f64 {
    let n_scale = 10f64.powi(n_digits);
    (x * n_scale).round() / n_scale
}

/// Round each coordinate to millimeter precision relative to the first one.
///
/// `rounded = round(c - c0, 3) + c0`, which removes export noise without
/// shifting the grid origin.
pub fn derive_rounded_coordinates<I>(coords: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut iter_coords = coords.into_iter();
    let Some(n_first) = iter_coords.next() else {
        return vec![];
    };
    std::iter::once(n_first)
        .chain(iter_coords.map(|c| round_to(c - n_first, N_COORD_ROUND_DIGITS) + n_first))
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Steps

/// Find the maximum-value point; the first occurrence wins ties and NaN never wins.
pub fn locate_peak(points: &[SpecMeasurementPoint]) -> Option<SpecPeakInfo> {
    let mut peak: Option<SpecPeakInfo> = None;
    for (n_idx, point) in points.iter().enumerate() {
        if point.value.is_nan() {
            continue;
        }
        if peak.is_none_or(|p| point.value > p.peak_value) {
            peak = Some(SpecPeakInfo {
                peak_value: point.value,
                peak_point: *point,
                peak_index: n_idx,
            });
        }
    }
    peak
}

/// Infer the grid step from the first differing pair of rounded y-coordinates.
///
/// Returns `None` when all rounded y-coordinates are equal.
pub fn infer_step_size(
    points: &[SpecMeasurementPoint],
    known_resolutions: &[f64],
) -> Option<SpecStepSize> {
    let l_y_rounded = derive_rounded_coordinates(points.iter().map(|p| p.y));
    let n_raw_step = l_y_rounded
        .windows(2)
        .find(|pair| pair[0] != pair[1])
        .map(|pair| (pair[0] - pair[1]).abs())?;

    let n_rounded_step = normalize_step(n_raw_step);
    Some(SpecStepSize {
        raw_step: n_raw_step,
        rounded_step: n_rounded_step,
        is_known_resolution: known_resolutions
            .iter()
            .any(|n_known| (n_known - n_rounded_step).abs() < N_RESOLUTION_EPS),
    })
}

/// Snap raw steps inside the 7.5 mm export-artifact window, round the rest to 0.1 mm.
pub fn normalize_step(n_raw_step: f64) -> f64 {
    if n_raw_step > N_SNAP_WINDOW_LOW_M && n_raw_step < N_SNAP_WINDOW_HIGH_M {
        N_SNAP_STEP_M
    } else {
        round_to(n_raw_step, N_STEP_ROUND_DIGITS)
    }
}

fn is_same_layer(a: &SpecMeasurementPoint, b: &SpecMeasurementPoint) -> bool {
    round_to(a.z - b.z, N_COORD_ROUND_DIGITS) == 0.0
}

fn derive_planar_distance(a: &SpecMeasurementPoint, b: &SpecMeasurementPoint) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

struct SpecProximityOutcome {
    min_distance_mm: Option<f64>,
    if_point_within_step: bool,
}

fn evaluate_proximity(
    grid: &SpecGrid,
    peak: &SpecPeakInfo,
    step: Option<&SpecStepSize>,
    options: &SpecClassifyOptions,
) -> SpecProximityOutcome {
    let n_distance_limit = step.map(|s| s.rounded_step * (1.0 + options.distance_tolerance_factor));
    let mut n_min_distance: Option<f64> = None;
    let mut if_point_within_step = false;

    for (n_idx, point) in grid.points.iter().enumerate() {
        if n_idx == peak.peak_index {
            continue;
        }
        if options.if_peak_layer_only && !is_same_layer(point, &peak.peak_point) {
            continue;
        }
        let n_ratio = point.value / peak.peak_value;
        if !n_ratio.is_finite() {
            continue;
        }
        let n_distance = derive_planar_distance(point, &peak.peak_point);

        if n_ratio < options.min_distance_ratio {
            n_min_distance = Some(n_min_distance.map_or(n_distance, |n| n.min(n_distance)));
        }
        if let Some(n_limit) = n_distance_limit
            && n_ratio <= options.peak_ratio_threshold
            && n_distance < n_limit
        {
            if_point_within_step = true;
        }
    }

    SpecProximityOutcome {
        min_distance_mm: n_min_distance.map(|n| n * 1000.0),
        if_point_within_step,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Classify

/// Classify one zoom-scan grid.
///
/// Error precedence: degenerate grid, then zero peak, then unknown
/// resolution. An unknown resolution still gets ratio and distance populated.
pub fn classify(grid: &SpecGrid, options: &SpecClassifyOptions) -> SpecClassificationReport {
    let peak = locate_peak(&grid.points);
    let step = infer_step_size(&grid.points, &options.known_resolutions);

    let peak_usable = peak.filter(|p| p.peak_value > 0.0 && p.peak_value.is_finite());

    let adjacent_ratio_pct = peak_usable.and_then(|p| {
        grid.points
            .get(p.peak_index + 1)
            .map(|m2| m2.value / p.peak_value * 100.0)
            .filter(|n| n.is_finite())
    });

    let (min_distance_mm, mut needs_remeasurement) = match &peak_usable {
        Some(p) => {
            let outcome = evaluate_proximity(grid, p, step.as_ref(), options);
            (outcome.min_distance_mm, outcome.if_point_within_step)
        }
        None => (None, false),
    };
    if let (Some(n_min_pct), Some(n_ratio)) = (options.adjacent_ratio_min_pct, adjacent_ratio_pct)
        && n_ratio < n_min_pct
    {
        needs_remeasurement = true;
    }

    let reason = if step.is_none() {
        Some(EnumVerdictReason::DegenerateGrid)
    } else if peak_usable.is_none() {
        Some(EnumVerdictReason::ZeroPeak)
    } else if step.is_some_and(|s| !s.is_known_resolution) {
        Some(EnumVerdictReason::UnknownResolution)
    } else {
        None
    };
    let verdict = match (reason, needs_remeasurement) {
        (Some(_), _) => EnumVerdict::Error,
        (None, true) => EnumVerdict::Fail,
        (None, false) => EnumVerdict::Pass,
    };

    SpecClassificationReport {
        peak,
        step,
        adjacent_ratio_pct,
        min_distance_mm,
        needs_remeasurement,
        verdict,
        reason,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::conf::{N_DISTANCE_TOLERANCE_FACTOR, N_PEAK_RATIO_THRESHOLD};

    fn create_point(value: f64, x: f64, y: f64) -> SpecMeasurementPoint {
        SpecMeasurementPoint { value, x, y, z: 0.0 }
    }

    fn create_grid(l_points: Vec<SpecMeasurementPoint>) -> SpecGrid {
        SpecGrid {
            points: l_points,
            nominal_x_spacing: 7.0,
            nominal_y_spacing: 7.0,
        }
    }

    /// 2x2 grid: the peak at the origin, its x-neighbour at 0.9 and the
    /// y-row at `step` holding 0.3 and 0.2.
    fn create_square_grid(step: f64) -> SpecGrid {
        create_grid(vec![
            create_point(1.0, 0.0, 0.0),
            create_point(0.9, step, 0.0),
            create_point(0.3, 0.0, step),
            create_point(0.2, step, step),
        ])
    }

    /// 3x3 grid at 5 mm whose only sub-threshold point is the far corner.
    fn create_passing_grid() -> SpecGrid {
        let step = 0.005;
        let l_values = [1.0, 0.9, 0.8, 0.9, 0.85, 0.7, 0.8, 0.7, 0.4];
        let l_points = l_values
            .iter()
            .enumerate()
            .map(|(n_idx, v)| create_point(*v, (n_idx % 3) as f64 * step, (n_idx / 3) as f64 * step))
            .collect();
        create_grid(l_points)
    }

    #[test]
    fn scenario_square_grid_ratio_and_step() {
        let report = classify(&create_square_grid(0.0075), &SpecClassifyOptions::default());

        let peak = report.peak.expect("peak");
        assert_eq!(peak.peak_index, 0);
        assert_abs_diff_eq!(peak.peak_value, 1.0);
        assert_abs_diff_eq!(report.adjacent_ratio_pct.expect("ratio"), 90.0, epsilon = 1e-9);

        let step = report.step.expect("step");
        assert_abs_diff_eq!(step.rounded_step, 0.0075);
        assert!(step.is_known_resolution);
    }

    #[test]
    fn scenario_step_inside_snap_window_normalizes_to_7_5mm() {
        let report = classify(&create_square_grid(0.0082), &SpecClassifyOptions::default());
        let step = report.step.expect("step");
        assert!(step.raw_step > N_SNAP_WINDOW_LOW_M && step.raw_step < N_SNAP_WINDOW_HIGH_M);
        assert_eq!(step.rounded_step, 0.0075);
        assert!(step.is_known_resolution);
    }

    #[test]
    fn scenario_zero_peak_reports_error_without_ratios() {
        let grid = create_grid(vec![
            create_point(0.0, 0.0, 0.0),
            create_point(0.0, 0.005, 0.0),
            create_point(0.0, 0.0, 0.005),
        ]);
        let report = classify(&grid, &SpecClassifyOptions::default());
        assert_eq!(report.verdict, EnumVerdict::Error);
        assert_eq!(report.reason, Some(EnumVerdictReason::ZeroPeak));
        assert_eq!(report.adjacent_ratio_pct, None);
        assert_eq!(report.min_distance_mm, None);
        assert!(report.step.is_some());
    }

    #[test]
    fn scenario_sub_threshold_neighbour_fails() {
        let report = classify(&create_square_grid(0.0075), &SpecClassifyOptions::default());
        assert!(report.needs_remeasurement);
        assert_eq!(report.verdict, EnumVerdict::Fail);
        assert_eq!(report.reason, None);
        assert_abs_diff_eq!(report.min_distance_mm.expect("distance"), 7.5, epsilon = 1e-9);
    }

    #[test]
    fn scenario_unknown_resolution_takes_precedence_over_fail() {
        let report = classify(&create_square_grid(0.006), &SpecClassifyOptions::default());
        let step = report.step.expect("step");
        assert_eq!(step.rounded_step, 0.006);
        assert!(!step.is_known_resolution);
        assert!(report.needs_remeasurement);
        assert_eq!(report.verdict, EnumVerdict::Error);
        assert_eq!(report.reason, Some(EnumVerdictReason::UnknownResolution));
        assert!(report.adjacent_ratio_pct.is_some());
        assert!(report.min_distance_mm.is_some());
    }

    #[test]
    fn passing_grid_reports_far_minimum_distance() {
        let report = classify(&create_passing_grid(), &SpecClassifyOptions::default());
        assert_eq!(report.verdict, EnumVerdict::Pass);
        assert!(!report.needs_remeasurement);
        assert_abs_diff_eq!(
            report.min_distance_mm.expect("distance"),
            (2.0f64).sqrt() * 10.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn constant_step_rounds_to_four_decimals_or_snaps() {
        for (n_step, n_expected) in [
            (0.004, 0.004),
            (0.005, 0.005),
            (0.01, 0.01),
            (0.002, 0.002),
            (0.007, 0.0075),
            (0.008, 0.0075),
        ] {
            let l_points: Vec<_> = (0..6)
                .map(|n_idx| create_point(1.0 - n_idx as f64 * 0.01, 0.0, n_idx as f64 * n_step))
                .collect();
            let step = infer_step_size(&l_points, &[]).expect("step");
            assert_abs_diff_eq!(step.rounded_step, n_expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn single_rounded_y_is_degenerate() {
        let grid = create_grid(vec![
            create_point(1.0, 0.0, 0.0100),
            create_point(0.4, 0.005, 0.0101),
            create_point(0.3, 0.010, 0.0099),
        ]);
        let report = classify(&grid, &SpecClassifyOptions::default());
        assert_eq!(report.step, None);
        assert_eq!(report.verdict, EnumVerdict::Error);
        assert_eq!(report.reason, Some(EnumVerdictReason::DegenerateGrid));
        assert_eq!(report.reason.map(|r| r.to_string()).as_deref(), Some("degenerate grid"));
    }

    #[test]
    fn empty_grid_is_degenerate_not_a_fault() {
        let report = classify(&create_grid(vec![]), &SpecClassifyOptions::default());
        assert_eq!(report.peak, None);
        assert_eq!(report.reason, Some(EnumVerdictReason::DegenerateGrid));
    }

    #[test]
    fn classify_is_deterministic() {
        let grid = create_passing_grid();
        let options = SpecClassifyOptions::default();
        let report_a = classify(&grid, &options);
        let report_b = classify(&grid, &options);
        assert_eq!(report_a, report_b);
        assert_eq!(
            report_a.min_distance_mm.map(f64::to_bits),
            report_b.min_distance_mm.map(f64::to_bits)
        );
    }

    #[test]
    fn peak_ties_resolve_to_first_occurrence() {
        let l_points = vec![
            create_point(0.5, 0.0, 0.0),
            create_point(2.0, 0.005, 0.0),
            create_point(2.0, 0.0, 0.005),
        ];
        assert_eq!(locate_peak(&l_points).expect("peak").peak_index, 1);
    }

    #[test]
    fn peak_as_last_point_has_no_adjacent_ratio() {
        let grid = create_grid(vec![
            create_point(0.2, 0.0, 0.0),
            create_point(1.0, 0.0, 0.005),
        ]);
        let report = classify(&grid, &SpecClassifyOptions::default());
        assert_eq!(report.adjacent_ratio_pct, None);
        assert_eq!(report.verdict, EnumVerdict::Fail);
    }

    #[test]
    fn adjacent_ratio_floor_forces_remeasurement_when_configured() {
        let mut grid = create_passing_grid();
        grid.points[1].value = 0.6;
        let options = SpecClassifyOptions {
            adjacent_ratio_min_pct: Some(70.0),
            ..SpecClassifyOptions::default()
        };
        assert_eq!(classify(&grid, &SpecClassifyOptions::default()).verdict, EnumVerdict::Pass);
        assert_eq!(classify(&grid, &options).verdict, EnumVerdict::Fail);
    }

    #[test]
    fn point_below_peak_fails_unless_restricted_to_peak_layer() {
        let mut grid = create_passing_grid();
        grid.points.push(SpecMeasurementPoint {
            value: 0.4,
            x: 0.0,
            y: 0.0,
            z: 0.005,
        });
        let report = classify(&grid, &SpecClassifyOptions::default());
        assert_eq!(report.verdict, EnumVerdict::Fail);
        assert_abs_diff_eq!(report.min_distance_mm.expect("distance"), 0.0);

        let options = SpecClassifyOptions {
            if_peak_layer_only: true,
            ..SpecClassifyOptions::default()
        };
        let report = classify(&grid, &options);
        assert_eq!(report.verdict, EnumVerdict::Pass);
        assert_abs_diff_eq!(
            report.min_distance_mm.expect("distance"),
            0.005 * 2f64.sqrt() * 1000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn point_exactly_at_distance_limit_passes() {
        let n_limit = 0.005 * (1.0 + N_DISTANCE_TOLERANCE_FACTOR);
        let grid = create_grid(vec![
            create_point(1.0, 0.0, 0.0),
            create_point(0.3, n_limit, 0.0),
            create_point(0.9, 0.0, 0.005),
        ]);
        let report = classify(&grid, &SpecClassifyOptions::default());
        assert_eq!(report.step.expect("step").rounded_step, 0.005);
        assert!(!report.needs_remeasurement);
        assert_eq!(report.verdict, EnumVerdict::Pass);
        assert_abs_diff_eq!(report.min_distance_mm.expect("distance"), n_limit * 1000.0);
    }

    #[test]
    fn ratio_exactly_at_threshold_fails() {
        let grid = create_grid(vec![
            create_point(1.0, 0.0, 0.0),
            create_point(N_PEAK_RATIO_THRESHOLD, 0.005, 0.0),
            create_point(0.9, 0.0, 0.005),
        ]);
        let report = classify(&grid, &SpecClassifyOptions::default());
        assert!(report.needs_remeasurement);
        assert_eq!(report.verdict, EnumVerdict::Fail);
        assert_eq!(report.min_distance_mm, None);
    }

    #[test]
    fn rounded_coordinates_are_relative_to_first() {
        let l_rounded = derive_rounded_coordinates([0.01234, 0.0198, 0.01234]);
        assert_abs_diff_eq!(l_rounded[0], 0.01234);
        assert_abs_diff_eq!(l_rounded[1], 0.01234 + 0.007, epsilon = 1e-12);
        assert_eq!(l_rounded[2], 0.01234);
    }

    #[test]
    fn options_validation_rejects_empty_resolutions() {
        let options = SpecClassifyOptions {
            known_resolutions: vec![],
            ..SpecClassifyOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(SpecClassifyOptions::default().validate().is_ok());
    }
}
