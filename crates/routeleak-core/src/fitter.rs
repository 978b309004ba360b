//! Parameter fitter (spec §4.E): pick detection parameter values by sweeping
//! each parameter over a grid (holding the other four neutral), fitting the
//! resulting "number of leaks found" curve with three consecutive linear
//! regressions, and reading the parameter value off the best-scoring pair
//! of breakpoints.

use std::collections::HashMap;

use anofox_regression::prelude::*;
use rayon::prelude::*;

use crate::detector::detect_route_leaks;
use crate::error::{Result, RouteLeakError};
use crate::types::{Params, Store};

/// The five tunable parameter names, in a fixed order.
pub const PARAM_NAMES: [&str; 5] = [
    "pfx_peak_min_value",
    "cfl_peak_min_value",
    "max_nb_peaks",
    "percent_similarity",
    "percent_std",
];

/// Parameter values that filter out nothing, used to hold the four
/// non-swept parameters inert while one is being fit.
fn neutral_params() -> Params {
    Params {
        pfx_peak_min_value: 0.0,
        cfl_peak_min_value: 0.0,
        max_nb_peaks: 400,
        percent_similarity: 0.0,
        percent_std: 2.0,
    }
}

fn lr_points_for(name: &str) -> Result<Vec<f64>> {
    match name {
        "cfl_peak_min_value" | "pfx_peak_min_value" => Ok((0..50).map(|v| v as f64).collect()),
        "percent_std" | "percent_similarity" => Ok((1..=10).map(|v| v as f64 / 10.0).collect()),
        "max_nb_peaks" => Ok((1..=50).map(|v| v as f64).collect()),
        other => Err(RouteLeakError::UnknownParameter(other.to_string())),
    }
}

/// Which breakpoint (1 = first, 2 = second) is the "most selective" one for
/// this parameter — used only as the default; `percent_std` overrides it
/// unconditionally (see below).
fn selective_breakpoint(name: &str) -> usize {
    match name {
        "max_nb_peaks" | "percent_std" => 1,
        _ => 2,
    }
}

/// Worker count for the grid-point sweep, honouring the reference
/// implementation's `max(1, ⌊CPUs/2⌋)` sizing.
fn fitter_pool_size() -> usize {
    std::thread::available_parallelism().map(|n| n.get() / 2).unwrap_or(1).max(1)
}

/// Run detection once per grid point for `name`, with every other parameter
/// held at its neutral value, and return the number of leaks found at each
/// point. Dispatched on a dedicated pool sized per spec §5, separate from
/// the per-AS detection pool.
fn calc_nb_leaks(name: &str, pfx: &Store, cfl: &Store, lin_reg_pts: &[f64]) -> Result<Vec<f64>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(fitter_pool_size())
        .build()
        .map_err(|e| RouteLeakError::Internal(e.to_string()))?;

    pool.install(|| {
        lin_reg_pts
            .par_iter()
            .map(|&v| {
                let mut params = neutral_params();
                params.set(name, v)?;
                let leaks = detect_route_leaks(pfx, cfl, &params)?;
                Ok(leaks.len() as f64)
            })
            .collect()
    })
}

/// R² of a single-regressor OLS fit of `nb_leaks` on `lin_reg_pts` restricted
/// to the 1-indexed, inclusive range `[l_bound, u_bound]`.
fn lr_score(lin_reg_pts: &[f64], nb_leaks: &[f64], l_bound: usize, u_bound: usize) -> f64 {
    let x = &lin_reg_pts[(l_bound - 1)..u_bound];
    let y = &nb_leaks[(l_bound - 1)..u_bound];

    let x_mat = faer::Mat::from_fn(x.len(), 1, |i, _| x[i]);
    let y_col = faer::Col::from_fn(y.len(), |i| y[i]);

    let fitted = match OlsRegressor::builder().with_intercept(true).build().fit(&x_mat, &y_col) {
        Ok(f) => f,
        Err(_) => return 0.0,
    };
    let predictions = fitted.predict(&x_mat);
    let predicted: Vec<f64> = (0..y.len()).map(|i| predictions[i]).collect();
    crate::metrics::r2(y, &predicted).unwrap_or(0.0)
}

/// Fit three consecutive straight lines to the whole `nb_leaks` curve and
/// return every `(average_score, breakpoint_1, breakpoint_2)` candidate
/// (both breakpoints 1-indexed into `lin_reg_pts`).
fn three_segment_fits(lin_reg_pts: &[f64], nb_leaks: &[f64]) -> Vec<(f64, usize, usize)> {
    let i0 = 1;
    let i3 = lin_reg_pts.len();
    let mut res = Vec::new();

    for i1 in (i0 + 2)..i3 {
        for i2 in (i1 + 2)..i3 {
            let s1 = lr_score(lin_reg_pts, nb_leaks, i0, i1);
            let s2 = lr_score(lin_reg_pts, nb_leaks, i1, i2);
            let s3 = lr_score(lin_reg_pts, nb_leaks, i2, i3);
            res.push(((s1 + s2 + s3) / 3.0, i1, i2));
        }
    }
    res
}

/// Order two candidate scores, treating NaN as strictly worse than any real
/// value so a failed fit can never win a tie against a scored one.
fn cmp_score(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Find the best-fitting value for a single parameter by sweeping its grid
/// and reading the winning breakpoint off the three-segment fit.
///
/// `percent_std` always returns the second breakpoint regardless of its own
/// selectivity ranking — this mirrors the reference heuristic's override
/// and is preserved deliberately, not a bug.
pub fn get_best_param_value(name: &str, pfx: &Store, cfl: &Store) -> Result<f64> {
    let lin_reg_pts = lr_points_for(name)?;
    let nb_leaks = calc_nb_leaks(name, pfx, cfl, &lin_reg_pts)?;

    let best = three_segment_fits(&lin_reg_pts, &nb_leaks)
        .into_iter()
        .max_by(|a, b| cmp_score(a.0, b.0))
        .ok_or_else(|| RouteLeakError::Internal(format!("not enough grid points to fit {name}")))?;

    let (score, i1, i2) = best;
    if score < 0.75 {
        log::warn!("low linear regression score ({score}) for parameter {name}");
    }

    let val1 = lin_reg_pts[i1 - 1];
    let val2 = lin_reg_pts[i2 - 1];

    if name == "percent_std" {
        Ok(val2)
    } else if selective_breakpoint(name) == 1 {
        Ok(val1)
    } else {
        Ok(val2)
    }
}

/// Fit every parameter not present in `overrides`, returning a complete
/// [`Params`] bundle.
pub fn fit_params(pfx: &Store, cfl: &Store, overrides: &HashMap<String, f64>) -> Result<Params> {
    let mut params = Params::default();
    for &name in &PARAM_NAMES {
        let value = match overrides.get(name) {
            Some(&v) => v,
            None => get_best_param_value(name, pfx, cfl)?,
        };
        params.set(name, value)?;
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_params_filter_nothing() {
        let p = neutral_params();
        assert_eq!(p.pfx_peak_min_value, 0.0);
        assert_eq!(p.max_nb_peaks, 400);
        assert_eq!(p.percent_std, 2.0);
    }

    #[test]
    fn lr_points_cover_expected_ranges() {
        assert_eq!(lr_points_for("pfx_peak_min_value").unwrap().len(), 50);
        assert_eq!(lr_points_for("percent_std").unwrap(), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]);
        assert_eq!(lr_points_for("max_nb_peaks").unwrap().len(), 50);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        assert!(lr_points_for("not_a_param").is_err());
    }
}
