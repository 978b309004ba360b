//! R² scoring for the parameter fitter's piecewise linear regressions
//! (spec §4.E).

/// Coefficient of determination of `forecast` against `actual`.
///
/// When `actual` has zero total variance, matches sklearn's degenerate-case
/// behavior: 1.0 if the residual is also ~0 (a flat target fit exactly),
/// else 0.0.
pub fn r2(actual: &[f64], forecast: &[f64]) -> crate::error::Result<f64> {
    if actual.len() != forecast.len() || actual.is_empty() {
        return Err(crate::error::RouteLeakError::Internal(format!(
            "r2: actual and forecast must be non-empty and equal length, got {} vs {}",
            actual.len(),
            forecast.len()
        )));
    }

    let mean: f64 = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(forecast.iter()).map(|(a, f)| (a - f).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot.abs() < f64::EPSILON {
        return Ok(if ss_res.abs() < f64::EPSILON { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_fit_scores_one() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let forecast = actual.clone();
        assert_relative_eq!(r2(&actual, &forecast).unwrap(), 1.0, epsilon = 0.001);
    }

    #[test]
    fn constant_actual_with_zero_residual_scores_one() {
        let actual = vec![3.0, 3.0, 3.0];
        let forecast = vec![3.0, 3.0, 3.0];
        assert_relative_eq!(r2(&actual, &forecast).unwrap(), 1.0, epsilon = 0.001);
    }

    #[test]
    fn constant_actual_with_nonzero_residual_scores_zero() {
        let actual = vec![3.0, 3.0, 3.0];
        let forecast = vec![1.0, 2.0, 3.0];
        assert_relative_eq!(r2(&actual, &forecast).unwrap(), 0.0, epsilon = 0.001);
    }

    #[test]
    fn mismatched_lengths_error() {
        assert!(r2(&[1.0, 2.0], &[1.0]).is_err());
    }
}
