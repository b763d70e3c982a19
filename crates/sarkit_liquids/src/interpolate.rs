//! Linear interpolation of liquid quantities at device frequencies.

use crate::spec::{EnumLiquidQuantity, LiquidsError, SpecLiquidPoint, SpecLiquidSheet};

/// Value at `x` on the line through `(x0, y0)` and `(x1, y1)`.
fn interpolate_linear(x: f64, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> f64 {
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Interpolate every quantity at `n_frequency`.
///
/// The bracketing pair is the last row at or below the frequency and the row
/// after it; an exact match uses that row alone. Frequencies below the first
/// or above the last measured row are out of scope.
pub fn derive_liquid_point(
    sheet: &SpecLiquidSheet,
    n_frequency: f64,
) -> Result<SpecLiquidPoint, LiquidsError> {
    let out_of_scope = || LiquidsError::FrequencyOutOfScope {
        file: sheet.filename.clone(),
        frequency: n_frequency,
    };
    let n_idx_upper = sheet.rows.partition_point(|r| r.frequency <= n_frequency);
    let lower = n_idx_upper
        .checked_sub(1)
        .and_then(|n| sheet.rows.get(n))
        .ok_or_else(out_of_scope)?;
    let upper = if lower.frequency == n_frequency {
        None
    } else {
        Some(sheet.rows.get(n_idx_upper).ok_or_else(out_of_scope)?)
    };

    let mut values = [0f64; 6];
    for quantity in EnumLiquidQuantity::ALL {
        let missing = || LiquidsError::MissingValue {
            file: sheet.filename.clone(),
            frequency: n_frequency,
            quantity,
        };
        let n_low = lower.get(quantity).ok_or_else(missing)?;
        values[quantity.index()] = match upper {
            None => n_low,
            Some(upper) => {
                let n_high = upper.get(quantity).ok_or_else(missing)?;
                interpolate_linear(
                    n_frequency,
                    (lower.frequency, n_low),
                    (upper.frequency, n_high),
                )
            }
        };
    }
    Ok(SpecLiquidPoint {
        frequency: n_frequency,
        values,
    })
}

/// Interpolate at each frequency in order; the first out-of-scope one aborts.
pub fn derive_liquid_points(
    sheet: &SpecLiquidSheet,
    l_frequencies: &[f64],
) -> Result<Vec<SpecLiquidPoint>, LiquidsError> {
    l_frequencies
        .iter()
        .map(|n_frequency| derive_liquid_point(sheet, *n_frequency))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::spec::SpecLiquidRow;

    fn create_sheet() -> SpecLiquidSheet {
        let row = |frequency: f64, n_permittivity: f64, n_conductivity: Option<f64>| {
            SpecLiquidRow {
                frequency,
                values: [
                    Some(40.0),
                    Some(1.40),
                    Some(n_permittivity),
                    n_conductivity,
                    Some(n_permittivity / 40.0 * 100.0 - 100.0),
                    Some(0.0),
                ],
            }
        };
        SpecLiquidSheet {
            path: PathBuf::from("head.xlsx"),
            filename: "head.xlsx".to_string(),
            rows: vec![
                row(1800.0, 39.6, Some(1.38)),
                row(1900.0, 39.2, Some(1.44)),
                row(2000.0, 38.8, None),
            ],
        }
    }

    #[test]
    fn interpolates_between_bracketing_rows() {
        let point = derive_liquid_point(&create_sheet(), 1850.0).expect("point");
        assert_abs_diff_eq!(point.get(EnumLiquidQuantity::Permittivity), 39.4, epsilon = 1e-12);
        assert_abs_diff_eq!(point.get(EnumLiquidQuantity::Conductivity), 1.41, epsilon = 1e-12);
        assert_abs_diff_eq!(point.get(EnumLiquidQuantity::PermittivityTarget), 40.0);
        assert_abs_diff_eq!(point.frequency, 1850.0);
    }

    #[test]
    fn exact_frequency_uses_that_row() {
        let point = derive_liquid_point(&create_sheet(), 1900.0).expect("point");
        assert_abs_diff_eq!(point.get(EnumLiquidQuantity::Permittivity), 39.2);
        assert_abs_diff_eq!(point.get(EnumLiquidQuantity::Conductivity), 1.44);
    }

    #[test]
    fn frequencies_outside_measured_range_are_out_of_scope() {
        let sheet = create_sheet();
        for n_frequency in [1750.0, 2100.0] {
            let err = derive_liquid_point(&sheet, n_frequency).expect_err("out of scope");
            assert!(matches!(err, LiquidsError::FrequencyOutOfScope { .. }));
            assert!(err.to_string().starts_with("Frequencies in head.xlsx out of scope"));
        }
    }

    #[test]
    fn blank_bracketing_cell_names_the_quantity() {
        let err = derive_liquid_point(&create_sheet(), 1950.0).expect_err("missing");
        assert!(matches!(
            err,
            LiquidsError::MissingValue {
                quantity: EnumLiquidQuantity::Conductivity,
                ..
            }
        ));
    }

    #[test]
    fn points_follow_requested_order() {
        let l_points = derive_liquid_points(&create_sheet(), &[1880.0, 1820.0]).expect("points");
        let l_freqs: Vec<f64> = l_points.iter().map(|p| p.frequency).collect();
        assert_eq!(l_freqs, vec![1880.0, 1820.0]);
        assert!(derive_liquid_points(&create_sheet(), &[1880.0, 2500.0]).is_err());
    }
}
